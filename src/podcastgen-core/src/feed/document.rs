//! The podcast RSS document and its backfill rules.

use super::channel::{CHANNEL_FIELD_POLICIES, CONTENT_NS, ChannelInfo, FieldPolicy, ITUNES_NS};
use super::episode::EpisodeItem;
use super::xml::{XmlElement, XmlNode};
use crate::error::FeedError;

const RSS_VERSION: &str = "2.0";

/// An RSS 2.0 podcast feed: the `<rss>` attributes plus its `<channel>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedDocument {
    rss_attributes: Vec<(String, String)>,
    channel: XmlElement,
}

impl FeedDocument {
    /// A new feed with every mandatory channel field populated.
    pub fn fresh(info: &ChannelInfo) -> Self {
        let mut channel = XmlElement::new("channel");
        for (name, _) in CHANNEL_FIELD_POLICIES {
            channel.push(channel_field(name, info));
        }

        Self {
            rss_attributes: vec![
                ("version".to_string(), RSS_VERSION.to_string()),
                ("xmlns:itunes".to_string(), ITUNES_NS.to_string()),
                ("xmlns:content".to_string(), CONTENT_NS.to_string()),
            ],
            channel,
        }
    }

    pub fn parse(bytes: &[u8]) -> Result<Self, FeedError> {
        let root = XmlElement::parse(bytes)?;
        if root.name != "rss" {
            return Err(FeedError::Structure(format!(
                "expected <rss> root, found <{}>",
                root.name
            )));
        }

        let XmlElement {
            attributes,
            children,
            ..
        } = root;
        let channel = children
            .into_iter()
            .find_map(|node| match node {
                XmlNode::Element(elem) if elem.name == "channel" => Some(elem),
                _ => None,
            })
            .ok_or_else(|| FeedError::Structure("<rss> has no <channel>".into()))?;

        Ok(Self {
            rss_attributes: attributes,
            channel,
        })
    }

    /// Insert any mandatory channel field an older document lacks, following
    /// [`CHANNEL_FIELD_POLICIES`]. Returns the names of the fields touched.
    pub fn backfill(&mut self, info: &ChannelInfo) -> Vec<&'static str> {
        self.backfill_with(info, CHANNEL_FIELD_POLICIES)
    }

    /// [`backfill`](Self::backfill) against an explicit policy table.
    pub fn backfill_with(
        &mut self,
        info: &ChannelInfo,
        policies: &[(&'static str, FieldPolicy)],
    ) -> Vec<&'static str> {
        let mut touched = Vec::new();

        for (attr, value) in [("version", RSS_VERSION), ("xmlns:itunes", ITUNES_NS)] {
            if !self.rss_attributes.iter().any(|(k, _)| k == attr) {
                self.rss_attributes.push((attr.to_string(), value.to_string()));
            }
        }

        for &(name, policy) in policies {
            let replacement = channel_field(name, info);
            match self.channel_position(name) {
                None => {
                    self.insert_channel_field(replacement);
                    touched.push(name);
                }
                Some(index) if policy == FieldPolicy::Overwrite => {
                    if self.channel.children[index] != XmlNode::Element(replacement.clone()) {
                        self.channel.children[index] = XmlNode::Element(replacement);
                        touched.push(name);
                    }
                }
                Some(_) => {}
            }
        }

        if self.complete_owner_block(info) {
            touched.push("itunes:owner");
        }

        touched.dedup();
        touched
    }

    pub fn append_episode(&mut self, episode: &EpisodeItem) {
        self.channel.push(episode.to_element());
    }

    /// Episodes in document order (oldest first).
    pub fn episodes(&self) -> Vec<EpisodeItem> {
        self.channel
            .children_named("item")
            .map(EpisodeItem::from_element)
            .collect()
    }

    pub fn episode_count(&self) -> usize {
        self.channel.children_named("item").count()
    }

    pub fn contains_guid(&self, guid: &str) -> bool {
        self.channel
            .children_named("item")
            .any(|item| item.child_text("guid").as_deref() == Some(guid))
    }

    pub fn channel(&self) -> &XmlElement {
        &self.channel
    }

    pub fn channel_text(&self, name: &str) -> Option<String> {
        self.channel.child_text(name)
    }

    pub fn to_element(&self) -> XmlElement {
        XmlElement {
            name: "rss".to_string(),
            attributes: self.rss_attributes.clone(),
            children: vec![XmlNode::Element(self.channel.clone())],
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, FeedError> {
        self.to_element().to_pretty_bytes()
    }

    fn channel_position(&self, name: &str) -> Option<usize> {
        self.channel
            .children
            .iter()
            .position(|node| matches!(node, XmlNode::Element(e) if e.name == name))
    }

    /// Channel metadata goes ahead of the first `<item>`.
    fn insert_channel_field(&mut self, field: XmlElement) {
        let index = self.channel_position("item").unwrap_or(self.channel.children.len());
        self.channel.children.insert(index, XmlNode::Element(field));
    }

    fn complete_owner_block(&mut self, info: &ChannelInfo) -> bool {
        let Some(owner) = self.channel.child_mut("itunes:owner") else {
            return false;
        };
        let mut changed = false;
        for (name, value) in [
            ("itunes:name", &info.owner_name),
            ("itunes:email", &info.owner_email),
        ] {
            if owner.child(name).is_none() {
                owner.push(XmlElement::with_text(name, value));
                changed = true;
            }
        }
        changed
    }
}

/// The configured value of one mandatory channel field.
fn channel_field(name: &str, info: &ChannelInfo) -> XmlElement {
    match name {
        "title" => XmlElement::with_text(name, &info.title),
        "description" => XmlElement::with_text(name, &info.description),
        "link" => XmlElement::with_text(name, &info.link),
        "language" => XmlElement::with_text(name, &info.language),
        "copyright" => XmlElement::with_text(name, &info.copyright),
        "managingEditor" => XmlElement::with_text(name, &info.managing_editor),
        "webMaster" => XmlElement::with_text(name, &info.webmaster),
        "image" => XmlElement::new(name)
            .with_child(XmlElement::with_text("url", &info.cover_image_url))
            .with_child(XmlElement::with_text("title", &info.title))
            .with_child(XmlElement::with_text("link", &info.link)),
        "itunes:author" => XmlElement::with_text(name, &info.author),
        "itunes:owner" => XmlElement::new(name)
            .with_child(XmlElement::with_text("itunes:name", &info.owner_name))
            .with_child(XmlElement::with_text("itunes:email", &info.owner_email)),
        "itunes:category" => XmlElement::new(name).with_attr("text", &info.category),
        "itunes:explicit" => XmlElement::with_text(name, info.explicit_text()),
        other => XmlElement::new(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info() -> ChannelInfo {
        ChannelInfo::default().resolve("alice/daily-ai", 2026)
    }

    const OLD_FEED: &str = r#"<?xml version='1.0' encoding='utf-8'?>
<rss version="2.0" xmlns:itunes="http://www.itunes.com/dtds/podcast-1.0.dtd">
  <channel>
    <title>My Old Title</title>
    <description>Old description</description>
    <language>ja</language>
    <itunes:author>Somebody Else</itunes:author>
    <itunes:owner>
      <itunes:name>Alice</itunes:name>
    </itunes:owner>
    <item>
      <title>Episode 1</title>
      <guid isPermaLink="false">alice/daily-ai-20260101000000</guid>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn test_fresh_document_has_mandatory_fields() {
        let doc = FeedDocument::fresh(&info());
        for (name, _) in CHANNEL_FIELD_POLICIES {
            assert!(doc.channel().child(name).is_some(), "missing {name}");
        }
        let owner = doc.channel().child("itunes:owner").unwrap();
        assert_eq!(owner.child_text("itunes:name").as_deref(), Some("alice"));
        assert_eq!(
            owner.child_text("itunes:email").as_deref(),
            Some("podcast@example.com")
        );
        assert_eq!(doc.channel_text("itunes:explicit").as_deref(), Some("false"));
        assert_eq!(doc.episode_count(), 0);
    }

    #[test]
    fn test_parse_rejects_non_feeds() {
        assert!(FeedDocument::parse(b"<html><body/></html>").is_err());
        assert!(FeedDocument::parse(b"<rss version=\"2.0\"/>").is_err());
        assert!(FeedDocument::parse(b"not xml at all <<<").is_err());
    }

    #[test]
    fn test_backfill_fills_missing_and_keeps_existing() {
        let mut doc = FeedDocument::parse(OLD_FEED.as_bytes()).unwrap();
        let touched = doc.backfill(&info());

        assert!(touched.contains(&"copyright"));
        assert!(touched.contains(&"webMaster"));
        assert!(touched.contains(&"itunes:owner"));
        assert!(!touched.contains(&"title"));
        assert!(!touched.contains(&"itunes:author"));

        assert_eq!(doc.channel_text("title").as_deref(), Some("My Old Title"));
        assert_eq!(doc.channel_text("language").as_deref(), Some("ja"));
        assert_eq!(doc.channel_text("itunes:author").as_deref(), Some("Somebody Else"));
        assert_eq!(doc.channel_text("copyright").as_deref(), Some("© 2026 alice"));

        let owner = doc.channel().child("itunes:owner").unwrap();
        assert_eq!(owner.child_text("itunes:name").as_deref(), Some("Alice"));
        assert_eq!(
            owner.child_text("itunes:email").as_deref(),
            Some("podcast@example.com")
        );
    }

    #[test]
    fn test_backfill_inserts_before_items() {
        let mut doc = FeedDocument::parse(OLD_FEED.as_bytes()).unwrap();
        doc.backfill(&info());
        let names: Vec<&str> = doc
            .channel()
            .child_elements()
            .map(|e| e.name.as_str())
            .collect();
        assert_eq!(names.last(), Some(&"item"));
        assert_eq!(doc.episode_count(), 1);
    }

    #[test]
    fn test_backfill_is_idempotent() {
        let mut doc = FeedDocument::parse(OLD_FEED.as_bytes()).unwrap();
        doc.backfill(&info());
        let once = doc.clone();
        assert!(doc.backfill(&info()).is_empty());
        assert_eq!(doc, once);
    }

    #[test]
    fn test_backfill_overwrite_policy_replaces_value_in_place() {
        let policies = [
            ("title", FieldPolicy::FillIfAbsent),
            ("itunes:author", FieldPolicy::Overwrite),
        ];
        let mut doc = FeedDocument::parse(OLD_FEED.as_bytes()).unwrap();
        let position = |doc: &FeedDocument| {
            doc.channel()
                .child_elements()
                .position(|e| e.name == "itunes:author")
        };
        let before = position(&doc);

        let touched = doc.backfill_with(&info(), &policies);

        assert!(touched.contains(&"itunes:author"));
        assert!(!touched.contains(&"title"));
        assert_eq!(doc.channel_text("itunes:author").as_deref(), Some("AI Podcast Generator"));
        assert_eq!(doc.channel_text("title").as_deref(), Some("My Old Title"));
        assert_eq!(position(&doc), before);
        assert!(!doc.backfill_with(&info(), &policies).contains(&"itunes:author"));
    }

    #[test]
    fn test_backfill_adds_namespace_declaration() {
        let mut doc =
            FeedDocument::parse(b"<rss version=\"2.0\"><channel><title>x</title></channel></rss>")
                .unwrap();
        doc.backfill(&info());
        assert_eq!(doc.to_element().attr("xmlns:itunes"), Some(ITUNES_NS));
    }

    #[test]
    fn test_serialized_round_trip() {
        let mut doc = FeedDocument::fresh(&info());
        doc.append_episode(&EpisodeItem {
            title: "Ep".into(),
            description: "Quotes \"and\" <tags>".into(),
            pub_date: "Mon, 09 Mar 2026 07:05:03 +0000".into(),
            enclosure_url: "https://example.com/p.wav".into(),
            enclosure_type: "audio/wav".into(),
            enclosure_length: 99,
            guid: "g".into(),
            duration: "01:00".into(),
        });
        let bytes = doc.to_bytes().unwrap();
        let reparsed = FeedDocument::parse(&bytes).unwrap();
        assert_eq!(reparsed, doc);
        assert_eq!(reparsed.episodes(), doc.episodes());
    }
}

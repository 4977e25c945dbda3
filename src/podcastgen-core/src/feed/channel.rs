//! Channel-level identity used to create and backfill feeds.

use serde::Deserialize;

pub const ITUNES_NS: &str = "http://www.itunes.com/dtds/podcast-1.0.dtd";
pub const CONTENT_NS: &str = "http://purl.org/rss/1.0/modules/content/";

/// Fixed channel metadata, normally taken from the `[podcast]` config section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChannelInfo {
    pub title: String,
    pub description: String,
    pub link: String,
    pub language: String,
    pub managing_editor: String,
    pub webmaster: String,
    pub copyright: String,
    pub owner_name: String,
    pub owner_email: String,
    pub author: String,
    pub category: String,
    pub cover_image_url: String,
    pub explicit: bool,
}

impl Default for ChannelInfo {
    fn default() -> Self {
        Self {
            title: "AI News Podcast".to_string(),
            description: "A daily podcast of the latest AI news, generated automatically."
                .to_string(),
            link: "https://github.com/{repo}".to_string(),
            language: "en".to_string(),
            managing_editor: "podcast@example.com".to_string(),
            webmaster: "podcast@example.com".to_string(),
            copyright: "© {year} {owner}".to_string(),
            owner_name: "{owner}".to_string(),
            owner_email: "podcast@example.com".to_string(),
            author: "AI Podcast Generator".to_string(),
            category: "Technology".to_string(),
            cover_image_url: "https://{owner}.github.io/{name}/podcast-cover.jpg".to_string(),
            explicit: false,
        }
    }
}

impl ChannelInfo {
    /// Expand `{repo}`, `{owner}`, `{name}` and `{year}` placeholders.
    ///
    /// `repository` is an `owner/name` identifier; a bare name is used for
    /// both halves.
    pub fn resolve(&self, repository: &str, year: i32) -> Self {
        let (owner, name) = repository.split_once('/').unwrap_or((repository, repository));
        let year = year.to_string();
        let expand = |s: &str| {
            s.replace("{repo}", repository)
                .replace("{owner}", owner)
                .replace("{name}", name)
                .replace("{year}", &year)
        };

        Self {
            title: expand(&self.title),
            description: expand(&self.description),
            link: expand(&self.link),
            language: self.language.clone(),
            managing_editor: expand(&self.managing_editor),
            webmaster: expand(&self.webmaster),
            copyright: expand(&self.copyright),
            owner_name: expand(&self.owner_name),
            owner_email: expand(&self.owner_email),
            author: expand(&self.author),
            category: self.category.clone(),
            cover_image_url: expand(&self.cover_image_url),
            explicit: self.explicit,
        }
    }

    pub fn explicit_text(&self) -> &'static str {
        if self.explicit { "true" } else { "false" }
    }
}

/// How backfill treats a channel field that already has a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldPolicy {
    /// Replace whatever is there with the configured value.
    Overwrite,
    /// Only insert the configured value when the field is missing.
    FillIfAbsent,
}

/// Channel fields a podcast directory requires, with their backfill policy.
///
/// Order matches the order fields are emitted in a fresh document.
pub const CHANNEL_FIELD_POLICIES: &[(&str, FieldPolicy)] = &[
    ("title", FieldPolicy::FillIfAbsent),
    ("description", FieldPolicy::FillIfAbsent),
    ("link", FieldPolicy::FillIfAbsent),
    ("language", FieldPolicy::FillIfAbsent),
    ("copyright", FieldPolicy::FillIfAbsent),
    ("managingEditor", FieldPolicy::FillIfAbsent),
    ("webMaster", FieldPolicy::FillIfAbsent),
    ("image", FieldPolicy::FillIfAbsent),
    ("itunes:author", FieldPolicy::FillIfAbsent),
    ("itunes:owner", FieldPolicy::FillIfAbsent),
    ("itunes:category", FieldPolicy::FillIfAbsent),
    ("itunes:explicit", FieldPolicy::FillIfAbsent),
];

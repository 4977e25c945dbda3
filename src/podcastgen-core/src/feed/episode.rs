//! Episode `<item>` entries.

use std::time::Duration;

use chrono::{DateTime, Utc};

use super::xml::XmlElement;

/// Written to `<itunes:duration>` when the real length is unknown.
pub const PLACEHOLDER_DURATION: &str = "05:00";

const PUB_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S +0000";
const GUID_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// What the caller knows about a freshly produced episode.
#[derive(Debug, Clone)]
pub struct NewEpisodeInput {
    pub description: String,
    pub enclosure_url: String,
    pub enclosure_type: String,
    pub enclosure_length: u64,
    /// Playback length, when it could be measured.
    pub duration: Option<Duration>,
}

/// One `<item>` of the feed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EpisodeItem {
    pub title: String,
    pub description: String,
    pub pub_date: String,
    pub enclosure_url: String,
    pub enclosure_type: String,
    pub enclosure_length: u64,
    pub guid: String,
    pub duration: String,
}

impl EpisodeItem {
    /// Build an item from caller input; `guid` must already be unique.
    pub fn from_input(
        input: &NewEpisodeInput,
        title: String,
        guid: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            title,
            description: input.description.clone(),
            pub_date: format_pub_date(now),
            enclosure_url: input.enclosure_url.clone(),
            enclosure_type: input.enclosure_type.clone(),
            enclosure_length: input.enclosure_length,
            guid,
            duration: input
                .duration
                .map(format_duration)
                .unwrap_or_else(|| PLACEHOLDER_DURATION.to_string()),
        }
    }

    pub fn to_element(&self) -> XmlElement {
        XmlElement::new("item")
            .with_child(XmlElement::with_text("title", &self.title))
            .with_child(XmlElement::with_text("description", &self.description))
            .with_child(XmlElement::with_text("pubDate", &self.pub_date))
            .with_child(
                XmlElement::new("enclosure")
                    .with_attr("url", &self.enclosure_url)
                    .with_attr("type", &self.enclosure_type)
                    .with_attr("length", self.enclosure_length.to_string()),
            )
            .with_child(
                XmlElement::with_text("guid", &self.guid).with_attr("isPermaLink", "false"),
            )
            .with_child(XmlElement::with_text("itunes:duration", &self.duration))
    }

    /// Read an `<item>`; missing parts come back empty rather than failing,
    /// since older feeds may have been written by other tools.
    pub fn from_element(item: &XmlElement) -> Self {
        let text = |name: &str| item.child_text(name).unwrap_or_default();
        let enclosure = item.child("enclosure");
        let enclosure_attr =
            |key: &str| enclosure.and_then(|e| e.attr(key)).unwrap_or_default().to_string();

        Self {
            title: text("title"),
            description: text("description"),
            pub_date: text("pubDate"),
            enclosure_url: enclosure_attr("url"),
            enclosure_type: enclosure_attr("type"),
            enclosure_length: enclosure_attr("length").trim().parse().unwrap_or(0),
            guid: text("guid"),
            duration: text("itunes:duration"),
        }
    }
}

pub fn format_pub_date(now: DateTime<Utc>) -> String {
    now.format(PUB_DATE_FORMAT).to_string()
}

/// `{publisher_id}-{YYYYmmddHHMMSS}`, suffixed with `-2`, `-3`, ... while
/// `is_taken` reports a collision.
pub fn generate_guid(
    publisher_id: &str,
    now: DateTime<Utc>,
    is_taken: impl Fn(&str) -> bool,
) -> String {
    let base = format!("{}-{}", publisher_id, now.format(GUID_TIMESTAMP_FORMAT));
    if !is_taken(&base) {
        return base;
    }
    let suffixed = (2u32..)
        .map(|n| format!("{}-{}", base, n))
        .find(|candidate| !is_taken(candidate));
    suffixed.unwrap_or(base)
}

/// `MM:SS`, or `H:MM:SS` for episodes of an hour or more.
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}

/// Expand `{date}` in an episode title template.
pub fn render_title(template: &str, date_format: &str, now: DateTime<Utc>) -> String {
    template.replace("{date}", &now.format(date_format).to_string())
}

//! Recent news from RSS sources.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::NewsConfig;
use crate::error::{FeedError, PodcastError};
use crate::feed::xml::XmlElement;

/// A single headline fetched from a news feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    pub description: String,
    pub link: String,
}

/// Fetches and merges items from the configured news feeds.
pub struct NewsFetcher {
    config: NewsConfig,
    client: reqwest::Client,
}

impl NewsFetcher {
    pub fn new(config: NewsConfig) -> Result<Self, PodcastError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("podcastgen/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { config, client })
    }

    /// Fetch every source; a failing source is logged and skipped.
    pub async fn fetch_all(&self) -> Vec<NewsItem> {
        let mut items = Vec::new();

        for source in &self.config.sources {
            match self.fetch_source(source).await {
                Ok(found) => {
                    info!("Fetched {} items from {}", found.len(), source);
                    items.extend(found);
                }
                Err(e) => warn!("Failed to fetch news from {}: {}", source, e),
            }
        }

        items.truncate(self.config.max_items);
        items
    }

    async fn fetch_source(&self, url: &str) -> Result<Vec<NewsItem>, PodcastError> {
        let body = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        Ok(parse_feed_items(&body, self.config.items_per_source)?)
    }
}

/// Read the first `limit` `<item>`s of an RSS document.
pub fn parse_feed_items(xml: &[u8], limit: usize) -> Result<Vec<NewsItem>, FeedError> {
    let root = XmlElement::parse(xml)?;
    let channel = root
        .child("channel")
        .ok_or_else(|| FeedError::Structure("news feed has no <channel>".into()))?;

    Ok(channel
        .children_named("item")
        .take(limit)
        .map(|item| NewsItem {
            title: item.child_text("title").unwrap_or_default().trim().to_string(),
            description: item
                .child_text("description")
                .unwrap_or_default()
                .trim()
                .to_string(),
            link: item.child_text("link").unwrap_or_default().trim().to_string(),
        })
        .collect())
}

/// Numbered plain-text digest of news items for the script prompt.
pub fn format_news_digest(items: &[NewsItem]) -> String {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| format!("News {}: {}\n{}", i + 1, item.title, item.description))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Tech</title>
    <item>
      <title>Model &amp; chips</title>
      <description><![CDATA[<p>New accelerator announced</p>]]></description>
      <link>https://example.com/1</link>
    </item>
    <item>
      <title>Second</title>
      <link>https://example.com/2</link>
    </item>
    <item>
      <title>Third</title>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn test_parse_feed_items() {
        let items = parse_feed_items(SAMPLE.as_bytes(), 2).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "Model & chips");
        assert_eq!(items[0].description, "<p>New accelerator announced</p>");
        assert_eq!(items[1].link, "https://example.com/2");
        assert!(items[1].description.is_empty());
    }

    #[test]
    fn test_parse_feed_items_requires_channel() {
        assert!(parse_feed_items(b"<feed><entry/></feed>", 3).is_err());
    }

    #[test]
    fn test_format_news_digest() {
        let items = parse_feed_items(SAMPLE.as_bytes(), 2).unwrap();
        let digest = format_news_digest(&items);
        assert!(digest.starts_with("News 1: Model & chips\n"));
        assert!(digest.contains("\n\nNews 2: Second\n"));
    }
}

//! Podcast feed maintenance.
//!
//! A publish cycle is a full read-modify-write of one RSS document:
//! the previous bytes (if any) are parsed, backfilled and extended with one
//! new `<item>`, and the complete document is serialized again. Nothing here
//! locks the file; callers must not run two cycles against the same feed at
//! once.

pub mod channel;
pub mod document;
pub mod episode;
pub mod xml;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

pub use channel::{CHANNEL_FIELD_POLICIES, ChannelInfo, FieldPolicy};
pub use document::FeedDocument;
pub use episode::{EpisodeItem, NewEpisodeInput};

use crate::error::FeedError;

/// Everything besides the episode itself that shapes a feed update.
#[derive(Debug, Clone)]
pub struct FeedSettings {
    /// Channel metadata with placeholders already resolved.
    pub channel: ChannelInfo,
    /// Stable prefix for generated guids, e.g. `owner/repo`.
    pub publisher_id: String,
    /// Episode title, `{date}` is replaced by the publish date.
    pub episode_title: String,
    /// `strftime` pattern used for `{date}`.
    pub date_format: String,
}

/// Where the document that received the new episode came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedOrigin {
    /// No previous document existed.
    Created,
    /// A previous document existed but could not be parsed and was replaced.
    Rebuilt,
    /// The previous document was kept and extended.
    Updated,
}

/// Result of [`publish_episode`].
#[derive(Debug, Clone)]
pub struct FeedUpdate {
    pub bytes: Vec<u8>,
    pub origin: FeedOrigin,
    pub episode: EpisodeItem,
    pub episode_count: usize,
    pub backfilled: Vec<&'static str>,
}

/// Produce the next version of a feed with `input` appended as the newest
/// episode.
///
/// A corrupt `existing` document is discarded and rebuilt; only
/// serialization can fail.
pub fn publish_episode(
    existing: Option<&[u8]>,
    input: &NewEpisodeInput,
    settings: &FeedSettings,
    now: DateTime<Utc>,
) -> Result<FeedUpdate, FeedError> {
    let (mut document, origin, backfilled) = match existing {
        None => {
            info!("No existing feed, creating a new one");
            (FeedDocument::fresh(&settings.channel), FeedOrigin::Created, Vec::new())
        }
        Some(bytes) => match FeedDocument::parse(bytes) {
            Ok(mut document) => {
                let backfilled = document.backfill(&settings.channel);
                if !backfilled.is_empty() {
                    info!("Backfilled channel fields: {}", backfilled.join(", "));
                }
                (document, FeedOrigin::Updated, backfilled)
            }
            Err(e) => {
                warn!("Existing feed is unreadable ({}), rebuilding it from scratch", e);
                (FeedDocument::fresh(&settings.channel), FeedOrigin::Rebuilt, Vec::new())
            }
        },
    };

    let guid = episode::generate_guid(&settings.publisher_id, now, |g| document.contains_guid(g));
    let title = episode::render_title(&settings.episode_title, &settings.date_format, now);
    let item = EpisodeItem::from_input(input, title, guid, now);
    debug!("Appending episode {} ({})", item.title, item.guid);
    document.append_episode(&item);

    Ok(FeedUpdate {
        bytes: document.to_bytes()?,
        origin,
        episode_count: document.episode_count(),
        episode: item,
        backfilled,
    })
}

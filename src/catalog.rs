use crate::viewers::{ViewerCountError, ViewerCountParser};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Identifier of one live stream, taken from its link path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(String);

impl VideoId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for VideoId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveEntry {
    pub video_id: VideoId,
    pub viewers: u64,
}

/// Capabilities the extractor needs from one catalog card.
pub trait LiveCard {
    fn has_live_badge(&self) -> bool;
    fn link_href(&self) -> Option<String>;
    fn viewer_text(&self) -> Option<String>;
}

/// Plain-data card as produced by every [`CardSource`](crate::source::CardSource).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogCard {
    pub live_badge: bool,
    pub href: Option<String>,
    pub viewer_text: Option<String>,
}

impl CatalogCard {
    pub fn live(href: &str, viewer_text: &str) -> Self {
        Self {
            live_badge: true,
            href: Some(href.to_string()),
            viewer_text: Some(viewer_text.to_string()),
        }
    }
}

impl LiveCard for CatalogCard {
    fn has_live_badge(&self) -> bool {
        self.live_badge
    }

    fn link_href(&self) -> Option<String> {
        self.href.clone()
    }

    fn viewer_text(&self) -> Option<String> {
        self.viewer_text.clone()
    }
}

/// Result of one pass over the catalog.
///
/// `total_viewers` counts every badge-bearing card, including the ones whose
/// link did not resolve to a [`VideoId`]; `entries` only holds resolved cards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogScan {
    pub entries: Vec<LiveEntry>,
    pub total_viewers: u64,
    pub live_cards: usize,
    pub unresolved_cards: usize,
}

impl CatalogScan {
    pub fn video_ids(&self) -> Vec<VideoId> {
        self.entries.iter().map(|e| e.video_id.clone()).collect()
    }

    pub fn resolved_viewers(&self) -> u64 {
        self.entries.iter().map(|e| e.viewers).sum()
    }
}

#[derive(Debug, Clone)]
pub struct CatalogExtractor {
    live_path_marker: String,
    parser: ViewerCountParser,
}

impl CatalogExtractor {
    pub fn new(live_path_marker: impl Into<String>, parser: ViewerCountParser) -> Self {
        Self {
            live_path_marker: live_path_marker.into(),
            parser,
        }
    }

    /// `/live/abc123?si=x` -> `abc123`. Uses the last marker occurrence.
    pub fn video_id_from_href(&self, href: &str) -> Option<VideoId> {
        if self.live_path_marker.is_empty() {
            return None;
        }
        let (_, tail) = href.rsplit_once(self.live_path_marker.as_str())?;
        let id = tail.split('?').next().unwrap_or_default();
        if id.is_empty() {
            None
        } else {
            Some(VideoId::new(id))
        }
    }

    pub fn extract<I, C>(&self, cards: I) -> Result<CatalogScan, ViewerCountError>
    where
        I: IntoIterator<Item = C>,
        C: LiveCard,
    {
        let mut scan = CatalogScan::default();
        let mut seen = HashSet::new();

        for card in cards {
            if !card.has_live_badge() {
                continue;
            }
            scan.live_cards += 1;

            let video_id = card
                .link_href()
                .and_then(|href| self.video_id_from_href(&href));
            let viewer_text = card.viewer_text();
            let viewers = self.parser.parse_or_zero(viewer_text.as_deref())?;
            scan.total_viewers = scan.total_viewers.checked_add(viewers).ok_or_else(|| {
                ViewerCountError::OutOfRange(viewer_text.clone().unwrap_or_default())
            })?;

            match video_id {
                Some(id) => {
                    if seen.insert(id.clone()) {
                        scan.entries.push(LiveEntry {
                            video_id: id,
                            viewers,
                        });
                    } else {
                        log::debug!("Duplicate live card for {}", id);
                    }
                }
                None => {
                    scan.unresolved_cards += 1;
                    log::debug!("Live card without a resolvable link ({} viewers)", viewers);
                }
            }
        }

        if scan.unresolved_cards > 0 {
            log::warn!(
                "{} live card(s) had no resolvable video id but count toward total viewers",
                scan.unresolved_cards
            );
        }

        Ok(scan)
    }
}

impl Default for CatalogExtractor {
    fn default() -> Self {
        Self::new("/live/", ViewerCountParser::default())
    }
}

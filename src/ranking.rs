use crate::catalog::{CatalogScan, LiveEntry, VideoId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const DEFAULT_TOP_N: usize = 10;

/// How the dispatch targets are picked from a catalog scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum SelectionMode {
    Ranked {
        #[serde(default = "default_top_n")]
        top_n: usize,
    },
    Unranked,
}

impl Default for SelectionMode {
    fn default() -> Self {
        SelectionMode::Ranked {
            top_n: DEFAULT_TOP_N,
        }
    }
}

fn default_top_n() -> usize {
    DEFAULT_TOP_N
}

impl SelectionMode {
    pub fn select(&self, scan: &CatalogScan) -> Vec<VideoId> {
        match self {
            SelectionMode::Ranked { top_n } => rank_top(&scan.entries, *top_n)
                .into_iter()
                .map(|e| e.video_id)
                .collect(),
            SelectionMode::Unranked => unique_ids(&scan.entries).into_iter().collect(),
        }
    }
}

/// Highest viewer counts first; equal counts keep discovery order.
pub fn rank_top(entries: &[LiveEntry], n: usize) -> Vec<LiveEntry> {
    let mut ranked = entries.to_vec();
    ranked.sort_by(|a, b| b.viewers.cmp(&a.viewers));
    ranked.truncate(n);
    ranked
}

pub fn unique_ids(entries: &[LiveEntry]) -> HashSet<VideoId> {
    entries.iter().map(|e| e.video_id.clone()).collect()
}

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters collected while a pipeline runs.
///
/// Shared between stages through an `Arc`; each stage only bumps its own counters.
#[derive(Debug, Default)]
pub struct PipelineStats {
    pub lines_read: AtomicU64,
    pub read_faults: AtomicU64,
    pub blocks_assembled: AtomicU64,
    pub truncated_blocks: AtomicU64,
    pub redirects_filtered: AtomicU64,
    pub malformed_blocks: AtomicU64,
    pub pages_emitted: AtomicU64,
    pub links_extracted: AtomicU64,
    pub categories_extracted: AtomicU64,
}

/// Point-in-time copy of [`PipelineStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub lines_read: u64,
    pub read_faults: u64,
    pub blocks_assembled: u64,
    pub truncated_blocks: u64,
    pub redirects_filtered: u64,
    pub malformed_blocks: u64,
    pub blocks_dropped: u64,
    pub pages_emitted: u64,
    pub links_extracted: u64,
    pub categories_extracted: u64,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_lines(&self) {
        self.lines_read.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_read_faults(&self, count: u64) {
        self.read_faults.fetch_add(count, Ordering::Relaxed);
    }

    pub fn inc_blocks(&self) {
        self.blocks_assembled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_truncated(&self) {
        self.truncated_blocks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_redirects(&self) {
        self.redirects_filtered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_malformed(&self) {
        self.malformed_blocks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_pages(&self) {
        self.pages_emitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_links(&self, count: u64) {
        self.links_extracted.fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_categories(&self, count: u64) {
        self.categories_extracted.fetch_add(count, Ordering::Relaxed);
    }

    pub fn lines(&self) -> u64 {
        self.lines_read.load(Ordering::Relaxed)
    }

    pub fn faults(&self) -> u64 {
        self.read_faults.load(Ordering::Relaxed)
    }

    pub fn blocks(&self) -> u64 {
        self.blocks_assembled.load(Ordering::Relaxed)
    }

    pub fn truncated(&self) -> u64 {
        self.truncated_blocks.load(Ordering::Relaxed)
    }

    pub fn redirects(&self) -> u64 {
        self.redirects_filtered.load(Ordering::Relaxed)
    }

    pub fn malformed(&self) -> u64 {
        self.malformed_blocks.load(Ordering::Relaxed)
    }

    pub fn pages(&self) -> u64 {
        self.pages_emitted.load(Ordering::Relaxed)
    }

    pub fn links(&self) -> u64 {
        self.links_extracted.load(Ordering::Relaxed)
    }

    pub fn categories(&self) -> u64 {
        self.categories_extracted.load(Ordering::Relaxed)
    }

    /// Blocks that were assembled but never became pages, for any reason.
    pub fn dropped(&self) -> u64 {
        self.redirects() + self.malformed()
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            lines_read: self.lines(),
            read_faults: self.faults(),
            blocks_assembled: self.blocks(),
            truncated_blocks: self.truncated(),
            redirects_filtered: self.redirects(),
            malformed_blocks: self.malformed(),
            blocks_dropped: self.dropped(),
            pages_emitted: self.pages(),
            links_extracted: self.links(),
            categories_extracted: self.categories(),
        }
    }
}

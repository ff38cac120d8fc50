//! Stage tasks and the two pipeline entry points.
//!
//! ```text
//! reader -> lines -> blocks -> non-redirect blocks -> pages -> linked pages [-> categorized pages]
//! ```
//!
//! Every arrow is a capacity-1 channel, so at most one item is in flight per
//! handoff and page order is preserved end to end. A stage ends when its input
//! closes (normal shutdown) or when its output is gone (the caller stopped reading).

use crate::assemble::BlockAssembler;
use crate::config::STAGE_CHANNEL_CAPACITY;
use crate::decode::decode_block;
use crate::filter::is_redirect;
use crate::models::Page;
use crate::source::LineSource;
use crate::stats::{PipelineStats, StatsSnapshot};
use anyhow::{bail, Result};
use std::io::Read;
use std::sync::Arc;
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::task::JoinSet;
use tracing::{debug, info};

/// Which enrichment stages run after decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    /// Links only.
    Plain,
    /// Links and categories.
    Categorized,
}

/// A running pipeline: the final page queue plus ownership of its stage tasks.
///
/// Dropping the handle aborts every async stage; the blocking line reader stops
/// at its next handoff.
#[derive(Debug)]
pub struct Extraction {
    pages: Receiver<Page>,
    stats: Arc<PipelineStats>,
    tasks: JoinSet<()>,
}

impl Extraction {
    /// Next page in dump order, or `None` once the dump is exhausted.
    pub async fn recv(&mut self) -> Option<Page> {
        self.pages.recv().await
    }

    pub fn stats(&self) -> &Arc<PipelineStats> {
        &self.stats
    }

    /// Stops all stages. Pages not yet received are lost.
    pub fn cancel(&mut self) {
        self.pages.close();
        self.tasks.abort_all();
    }

    /// Drains the remaining pages into a vector and waits for all stages.
    pub async fn collect(mut self) -> Result<Vec<Page>> {
        let mut pages = Vec::new();
        while let Some(page) = self.pages.recv().await {
            pages.push(page);
        }
        self.finish().await?;
        Ok(pages)
    }

    /// Closes the output and waits for every stage to end.
    ///
    /// Returns an error if a stage panicked. Cancelled stages are not errors.
    pub async fn finish(mut self) -> Result<StatsSnapshot> {
        self.pages.close();
        while let Some(joined) = self.tasks.join_next().await {
            match joined {
                Ok(()) => {}
                Err(e) if e.is_cancelled() => {}
                Err(e) => bail!("Pipeline stage failed: {}", e),
            }
        }
        Ok(self.stats.snapshot())
    }
}

/// Streams `reader` through the pipeline, emitting pages with links.
///
/// Must be called from within a Tokio runtime.
pub fn parse<R>(reader: R) -> Extraction
where
    R: Read + Send + 'static,
{
    spawn_pipeline(reader, ParseMode::Plain)
}

/// Like [`parse`], but pages also carry their categories.
pub fn categorized_parse<R>(reader: R) -> Extraction
where
    R: Read + Send + 'static,
{
    spawn_pipeline(reader, ParseMode::Categorized)
}

pub fn spawn_pipeline<R>(reader: R, mode: ParseMode) -> Extraction
where
    R: Read + Send + 'static,
{
    let stats = Arc::new(PipelineStats::new());
    let mut tasks = JoinSet::new();

    let (line_tx, line_rx) = mpsc::channel(STAGE_CHANNEL_CAPACITY);
    let (block_tx, block_rx) = mpsc::channel(STAGE_CHANNEL_CAPACITY);
    let (kept_tx, kept_rx) = mpsc::channel(STAGE_CHANNEL_CAPACITY);
    let (page_tx, page_rx) = mpsc::channel(STAGE_CHANNEL_CAPACITY);
    let (linked_tx, linked_rx) = mpsc::channel(STAGE_CHANNEL_CAPACITY);

    {
        let stats = Arc::clone(&stats);
        tasks.spawn_blocking(move || read_lines(reader, line_tx, &stats));
    }
    tasks.spawn(assemble_blocks(line_rx, block_tx, Arc::clone(&stats)));
    tasks.spawn(filter_redirects(block_rx, kept_tx, Arc::clone(&stats)));
    tasks.spawn(decode_pages(kept_rx, page_tx, Arc::clone(&stats)));
    tasks.spawn(link_pages(
        page_rx,
        linked_tx,
        Arc::clone(&stats),
        mode == ParseMode::Plain,
    ));

    let pages = match mode {
        ParseMode::Plain => linked_rx,
        ParseMode::Categorized => {
            let (categorized_tx, categorized_rx) = mpsc::channel(STAGE_CHANNEL_CAPACITY);
            tasks.spawn(categorize_pages(linked_rx, categorized_tx, Arc::clone(&stats)));
            categorized_rx
        }
    };

    info!(?mode, stages = tasks.len(), "Pipeline started");

    Extraction {
        pages,
        stats,
        tasks,
    }
}

fn read_lines<R: Read>(reader: R, lines: Sender<Vec<u8>>, stats: &PipelineStats) {
    let mut source = LineSource::new(reader);
    let mut faults_seen = 0;

    while let Some(line) = source.next() {
        stats.inc_lines();
        let faults = source.faults();
        stats.add_read_faults(faults - faults_seen);
        faults_seen = faults;

        if lines.blocking_send(line).is_err() {
            debug!("Line consumer gone, stopping reader");
            return;
        }
    }

    stats.add_read_faults(source.faults() - faults_seen);
    debug!(lines = stats.lines(), "Line source exhausted");
}

async fn assemble_blocks(
    mut lines: Receiver<Vec<u8>>,
    blocks: Sender<Vec<u8>>,
    stats: Arc<PipelineStats>,
) {
    let mut assembler = BlockAssembler::new();

    while let Some(line) = lines.recv().await {
        if let Some(block) = assembler.push(&line) {
            stats.inc_blocks();
            if blocks.send(block).await.is_err() {
                return;
            }
        }
    }

    if assembler.finish() {
        stats.inc_truncated();
        debug!("Discarded unterminated trailing page block");
    }
    debug!(blocks = stats.blocks(), "Block assembler finished");
}

async fn filter_redirects(
    mut blocks: Receiver<Vec<u8>>,
    kept: Sender<Vec<u8>>,
    stats: Arc<PipelineStats>,
) {
    while let Some(block) = blocks.recv().await {
        if is_redirect(&block) {
            stats.inc_redirects();
            continue;
        }
        if kept.send(block).await.is_err() {
            return;
        }
    }
    debug!(redirects = stats.redirects(), "Redirect filter finished");
}

async fn decode_pages(
    mut blocks: Receiver<Vec<u8>>,
    pages: Sender<Page>,
    stats: Arc<PipelineStats>,
) {
    while let Some(block) = blocks.recv().await {
        match decode_block(&block) {
            Ok(page) => {
                if pages.send(page).await.is_err() {
                    return;
                }
            }
            Err(e) => {
                stats.inc_malformed();
                debug!(error = %e, bytes = block.len(), "Dropping undecodable page block");
            }
        }
    }
    debug!(malformed = stats.malformed(), "Block decoder finished");
}

async fn link_pages(
    mut pages: Receiver<Page>,
    linked: Sender<Page>,
    stats: Arc<PipelineStats>,
    last_stage: bool,
) {
    while let Some(mut page) = pages.recv().await {
        page.link();
        stats.add_links(page.links.len() as u64);
        if linked.send(page).await.is_err() {
            return;
        }
        if last_stage {
            stats.inc_pages();
        }
    }
    debug!(links = stats.links(), "Link extractor finished");
}

async fn categorize_pages(
    mut pages: Receiver<Page>,
    categorized: Sender<Page>,
    stats: Arc<PipelineStats>,
) {
    while let Some(mut page) = pages.recv().await {
        page.categorize();
        stats.add_categories(page.categories.len() as u64);
        if categorized.send(page).await.is_err() {
            return;
        }
        stats.inc_pages();
    }
    debug!(categories = stats.categories(), "Category extractor finished");
}

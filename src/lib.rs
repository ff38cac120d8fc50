//! Wikistream: concurrent streaming extraction of pages from Wikipedia XML dumps
//!
//! A dump of any size is streamed through a chain of stages, each running as its
//! own Tokio task and handing items to the next over a capacity-1 channel:
//!
//! 1. **Line Source** -- Reads the byte stream as lines; read faults are logged and skipped
//! 2. **Block Assembler** -- Folds the lines between `<page>` and `</page>` markers into
//!    one block; a truncated trailing block is discarded
//! 3. **Redirect Filter** -- Drops blocks carrying a `#REDIRECT [[Target]]` directive
//! 4. **Block Decoder** -- Decodes each block into a [`Page`] (title + revision text);
//!    malformed blocks are dropped
//! 5. **Link/Category Extractor** -- Fills in `links` and, in categorized mode, `categories`
//!
//! # Architecture
//!
//! - **Bounded memory** -- At most one item in flight per handoff, regardless of dump size
//! - **Strict ordering** -- No stage reorders, so pages come out in dump order
//! - **Item-level faults** -- Bad input shortens the output; it never aborts the run
//! - **Observable loss** -- [`PipelineStats`] counts redirects, malformed and truncated blocks
//! - **No leaked tasks** -- Dropping or cancelling an [`Extraction`] stops every stage
//!
//! # Key Modules
//!
//! - [`source`] -- Line source and dump opening (plain or bzip2)
//! - [`assemble`] -- Two-state page block assembler
//! - [`filter`] -- Redirect detection
//! - [`decode`] -- Page block decoding with quick-xml
//! - [`content`] -- Link and category extraction
//! - [`pipeline`] -- Stage tasks and the `parse` / `categorized_parse` entry points
//! - [`graph`] -- Link graph built from the page stream, with CSV export
//! - [`models`] -- Core data types (Page, Revision)
//! - [`stats`] -- Atomic counters for pipeline metrics
//! - [`config`] -- Markers and tuning constants
//!
//! # Example Usage
//!
//! ```no_run
//! # async fn run() -> anyhow::Result<()> {
//! let dump = wikistream::source::open_dump("enwiki-latest-pages-articles.xml.bz2")?;
//! let mut pages = wikistream::categorized_parse(dump);
//! while let Some(page) = pages.recv().await {
//!     println!("{} -> {:?}", page.title, page.links);
//! }
//! # Ok(())
//! # }
//! ```

pub mod assemble;
pub mod config;
pub mod content;
pub mod decode;
pub mod filter;
pub mod graph;
pub mod models;
pub mod pipeline;
pub mod source;
pub mod stats;

pub use models::{Page, Revision};
pub use pipeline::{categorized_parse, parse, Extraction, ParseMode};
pub use stats::{PipelineStats, StatsSnapshot};

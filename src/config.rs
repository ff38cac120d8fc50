/// Substring identifying a page-start marker line
pub const PAGE_START_MARKER: &str = "<page>";

/// Substring identifying a page-end marker line
pub const PAGE_END_MARKER: &str = "</page>";

/// Synthetic tag every assembled block starts with
pub const SYNTHETIC_OPEN_TAG: &[u8] = b"<page>";

/// Synthetic tag every assembled block ends with
pub const SYNTHETIC_CLOSE_TAG: &[u8] = b"</page>";

/// Capacity of each inter-stage channel (one in-flight item per handoff)
pub const STAGE_CHANNEL_CAPACITY: usize = 1;

/// Consecutive read faults after which the line source gives up on the stream
pub const MAX_CONSECUTIVE_READ_FAULTS: u32 = 16;

/// Prefix marking a bracketed reference as a category membership
pub const CATEGORY_PREFIX: &str = "Category:";

/// Progress update interval (tick every N pages)
pub const PROGRESS_INTERVAL: u64 = 1000;

/// Buffer size for the dump reader
pub const READ_BUFFER_SIZE: usize = 256 * 1024;

/// Buffer size for CSV and JSON-lines writers
pub const WRITE_BUFFER_SIZE: usize = 128 * 1024;

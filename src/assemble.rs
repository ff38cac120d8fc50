use crate::config::{PAGE_END_MARKER, PAGE_START_MARKER, SYNTHETIC_CLOSE_TAG, SYNTHETIC_OPEN_TAG};
use once_cell::sync::Lazy;
use regex::bytes::Regex;

static PAGE_START_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(&regex::escape(PAGE_START_MARKER)).unwrap());

static PAGE_END_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(&regex::escape(PAGE_END_MARKER)).unwrap());

pub fn is_page_start(line: &[u8]) -> bool {
    PAGE_START_REGEX.is_match(line)
}

pub fn is_page_end(line: &[u8]) -> bool {
    PAGE_END_REGEX.is_match(line)
}

/// Where the assembler is relative to page boundaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssemblerState {
    OutsidePage,
    /// Holds the block built so far, already seeded with the synthetic open tag.
    InsidePage(Vec<u8>),
}

impl AssemblerState {
    /// Applies one line. Returns the next state and, when a page just closed, its block.
    pub fn transition(self, line: &[u8]) -> (AssemblerState, Option<Vec<u8>>) {
        match self {
            AssemblerState::OutsidePage => {
                if is_page_start(line) {
                    (AssemblerState::InsidePage(SYNTHETIC_OPEN_TAG.to_vec()), None)
                } else {
                    (AssemblerState::OutsidePage, None)
                }
            }
            AssemblerState::InsidePage(mut block) => {
                if is_page_end(line) {
                    block.extend_from_slice(SYNTHETIC_CLOSE_TAG);
                    (AssemblerState::OutsidePage, Some(block))
                } else {
                    // Nested start markers are ordinary content; dumps are flat.
                    block.extend_from_slice(line);
                    block.push(b'\n');
                    (AssemblerState::InsidePage(block), None)
                }
            }
        }
    }
}

/// Folds a line sequence into complete page blocks.
#[derive(Debug)]
pub struct BlockAssembler {
    state: AssemblerState,
}

impl Default for BlockAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockAssembler {
    pub fn new() -> Self {
        Self {
            state: AssemblerState::OutsidePage,
        }
    }

    pub fn push(&mut self, line: &[u8]) -> Option<Vec<u8>> {
        let state = std::mem::replace(&mut self.state, AssemblerState::OutsidePage);
        let (next, block) = state.transition(line);
        self.state = next;
        block
    }

    /// Ends the stream. Returns true if an unterminated block was discarded.
    pub fn finish(self) -> bool {
        matches!(self.state, AssemblerState::InsidePage(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assemble(lines: &[&str]) -> (Vec<String>, bool) {
        let mut assembler = BlockAssembler::new();
        let blocks = lines
            .iter()
            .filter_map(|l| assembler.push(l.as_bytes()))
            .map(|b| String::from_utf8(b).unwrap())
            .collect();
        (blocks, assembler.finish())
    }

    #[test]
    fn markers_match_anywhere_in_line() {
        assert!(is_page_start(b"    <page>"));
        assert!(is_page_end(b"  </page>  "));
        assert!(!is_page_start(b"  </page>"));
        assert!(!is_page_end(b"<title>page</title>"));
    }

    #[test]
    fn single_page_is_wrapped_in_synthetic_tags() {
        let (blocks, truncated) = assemble(&["  <page>", "<title>A</title>", "  </page>"]);
        assert_eq!(blocks, vec!["<page><title>A</title>\n</page>"]);
        assert!(!truncated);
    }

    #[test]
    fn lines_outside_pages_are_ignored() {
        let (blocks, _) = assemble(&[
            "<mediawiki>",
            "<siteinfo>x</siteinfo>",
            "<page>",
            "body",
            "</page>",
            "noise",
            "</mediawiki>",
        ]);
        assert_eq!(blocks, vec!["<page>body\n</page>"]);
    }

    #[test]
    fn multiple_pages_in_order() {
        let (blocks, _) = assemble(&["<page>", "1", "</page>", "<page>", "2", "</page>"]);
        assert_eq!(blocks, vec!["<page>1\n</page>", "<page>2\n</page>"]);
    }

    #[test]
    fn end_marker_outside_page_is_ignored() {
        let (blocks, truncated) = assemble(&["</page>", "x", "<page>", "y", "</page>"]);
        assert_eq!(blocks, vec!["<page>y\n</page>"]);
        assert!(!truncated);
    }

    #[test]
    fn nested_start_marker_is_ordinary_content() {
        let (blocks, _) = assemble(&["<page>", "a", "<page>", "b", "</page>"]);
        assert_eq!(blocks, vec!["<page>a\n<page>\nb\n</page>"]);
    }

    #[test]
    fn trailing_partial_block_is_discarded() {
        let (blocks, truncated) = assemble(&["<page>", "1", "</page>", "<page>", "2"]);
        assert_eq!(blocks, vec!["<page>1\n</page>"]);
        assert!(truncated);
    }

    #[test]
    fn transition_function_covers_all_states() {
        let (s, out) = AssemblerState::OutsidePage.transition(b"text");
        assert_eq!(s, AssemblerState::OutsidePage);
        assert!(out.is_none());

        let (s, out) = s.transition(b"<page>");
        assert_eq!(s, AssemblerState::InsidePage(b"<page>".to_vec()));
        assert!(out.is_none());

        let (s, out) = s.transition(b"text");
        assert_eq!(s, AssemblerState::InsidePage(b"<page>text\n".to_vec()));
        assert!(out.is_none());

        let (s, out) = s.transition(b"</page>");
        assert_eq!(s, AssemblerState::OutsidePage);
        assert_eq!(out.unwrap(), b"<page>text\n</page>".to_vec());
    }
}

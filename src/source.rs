use crate::config::{MAX_CONSECUTIVE_READ_FAULTS, READ_BUFFER_SIZE};
use anyhow::{Context, Result};
use bzip2::read::MultiBzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use tracing::{debug, warn};

/// Opens a dump file, decompressing it on the fly when the name ends in `.bz2`.
pub fn open_dump(path: impl AsRef<Path>) -> Result<Box<dyn Read + Send>> {
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Failed to open wiki dump at: {}", path.display()))?;

    let compressed = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("bz2"));

    if compressed {
        debug!(path = %path.display(), "Opening bzip2-compressed dump");
        Ok(Box::new(MultiBzDecoder::new(file)))
    } else {
        Ok(Box::new(file))
    }
}

/// Lazy, single-pass sequence of raw lines read from a dump.
///
/// Line terminators (`\n`, `\r\n`) are stripped. A line that fails to read is
/// logged and skipped as a whole, including any bytes that arrive after the
/// fault up to its terminator. The sequence ends at end-of-input.
pub struct LineSource<R> {
    reader: R,
    buf: Vec<u8>,
    faults: u64,
    /// Set when a fault hit mid-line; the rest of that line is discarded.
    skip_partial: bool,
    finished: bool,
}

impl<R: Read> LineSource<BufReader<R>> {
    pub fn new(reader: R) -> Self {
        Self::from_buf_read(BufReader::with_capacity(READ_BUFFER_SIZE, reader))
    }
}

impl<R: BufRead> LineSource<R> {
    pub fn from_buf_read(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            faults: 0,
            skip_partial: false,
            finished: false,
        }
    }

    /// Number of read faults encountered so far.
    pub fn faults(&self) -> u64 {
        self.faults
    }
}

impl<R: BufRead> Iterator for LineSource<R> {
    type Item = Vec<u8>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let mut consecutive = 0u32;
        loop {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => {
                    self.finished = true;
                    return None;
                }
                Ok(_) if self.skip_partial => {
                    self.skip_partial = false;
                    debug!(
                        bytes = self.buf.len(),
                        "Discarding remainder of a line broken by a read fault"
                    );
                }
                Ok(_) => {
                    let mut line = std::mem::take(&mut self.buf);
                    if line.last() == Some(&b'\n') {
                        line.pop();
                        if line.last() == Some(&b'\r') {
                            line.pop();
                        }
                    }
                    return Some(line);
                }
                Err(e) => {
                    if !self.buf.is_empty() {
                        self.skip_partial = true;
                    }
                    self.faults += 1;
                    consecutive += 1;
                    warn!(error = %e, "Read fault, skipping line");
                    if consecutive >= MAX_CONSECUTIVE_READ_FAULTS {
                        warn!(
                            faults = consecutive,
                            "Too many consecutive read faults, ending line stream"
                        );
                        self.finished = true;
                        return None;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Cursor, Write};
    use tempfile::NamedTempFile;

    /// Yields its chunks in order, failing once wherever a `None` appears.
    struct FlakyReader {
        chunks: Vec<Option<&'static [u8]>>,
    }

    impl Read for FlakyReader {
        fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
            if self.chunks.is_empty() {
                return Ok(0);
            }
            match self.chunks.remove(0) {
                Some(chunk) => {
                    let n = chunk.len().min(out.len());
                    out[..n].copy_from_slice(&chunk[..n]);
                    Ok(n)
                }
                None => Err(io::Error::other("disk hiccup")),
            }
        }
    }

    struct BrokenReader;

    impl Read for BrokenReader {
        fn read(&mut self, _out: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::other("always broken"))
        }
    }

    #[test]
    fn splits_lines_and_strips_terminators() {
        let source = LineSource::new(Cursor::new("one\ntwo\r\nthree"));
        let lines: Vec<_> = source.collect();
        assert_eq!(lines, vec![b"one".to_vec(), b"two".to_vec(), b"three".to_vec()]);
    }

    #[test]
    fn empty_input_yields_nothing() {
        let mut source = LineSource::new(Cursor::new(""));
        assert!(source.next().is_none());
        assert!(source.next().is_none());
        assert_eq!(source.faults(), 0);
    }

    #[test]
    fn keeps_empty_lines() {
        let source = LineSource::new(Cursor::new("a\n\nb\n"));
        let lines: Vec<_> = source.collect();
        assert_eq!(lines, vec![b"a".to_vec(), Vec::new(), b"b".to_vec()]);
    }

    #[test]
    fn read_fault_is_skipped_and_stream_continues() {
        let reader = FlakyReader {
            chunks: vec![Some(b"first\n"), None, Some(b"second\n")],
        };
        let mut source = LineSource::new(reader);
        let lines: Vec<_> = source.by_ref().collect();
        assert_eq!(lines, vec![b"first".to_vec(), b"second".to_vec()]);
        assert_eq!(source.faults(), 1);
    }

    #[test]
    fn fault_mid_line_discards_rest_of_line() {
        let reader = FlakyReader {
            chunks: vec![
                Some(b"<page>\nbody\n  </pa"),
                None,
                Some(b"ge>\n<page>\nnext\n</page>\n"),
            ],
        };
        let mut source = LineSource::new(reader);
        let lines: Vec<_> = source.by_ref().collect();
        assert_eq!(
            lines,
            vec![
                b"<page>".to_vec(),
                b"body".to_vec(),
                b"<page>".to_vec(),
                b"next".to_vec(),
                b"</page>".to_vec(),
            ]
        );
        assert_eq!(source.faults(), 1);
    }

    #[test]
    fn fault_mid_last_line_ends_cleanly() {
        let reader = FlakyReader {
            chunks: vec![Some(b"whole\npart"), None, Some(b"ial")],
        };
        let mut source = LineSource::new(reader);
        let lines: Vec<_> = source.by_ref().collect();
        assert_eq!(lines, vec![b"whole".to_vec()]);
        assert_eq!(source.faults(), 1);
    }

    #[test]
    fn persistent_fault_ends_stream() {
        let mut source = LineSource::new(BrokenReader);
        assert!(source.next().is_none());
        assert_eq!(source.faults(), MAX_CONSECUTIVE_READ_FAULTS as u64);
        assert!(source.next().is_none());
    }

    #[test]
    fn open_dump_reads_plain_file() {
        let mut tmp = NamedTempFile::new().unwrap();
        tmp.write_all(b"<page>\n</page>\n").unwrap();
        tmp.flush().unwrap();

        let lines: Vec<_> = LineSource::new(open_dump(tmp.path()).unwrap()).collect();
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn open_dump_reports_missing_file() {
        let err = open_dump("/definitely/not/here.xml").err().unwrap();
        assert!(format!("{:#}", err).contains("Failed to open wiki dump"));
    }
}

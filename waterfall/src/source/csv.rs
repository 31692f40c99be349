//! Static allocation dumps
//!
//! Two columns per line, `timestamp_ms,size_bytes`. Lines that do not parse
//! (headers, comments, truncated rows) are skipped and only counted.

use log::{debug, info};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::domain::{AllocationEvent, LoadError};

#[derive(Debug, Clone)]
pub struct CsvSource {
    path: PathBuf,
}

impl CsvSource {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every parseable event, in file order.
    ///
    /// # Errors
    /// `Io` when the file cannot be read, `NoEvents` when not a single line parses.
    pub fn load_once(&self) -> Result<Vec<AllocationEvent>, LoadError> {
        let io_error = |source| LoadError::Io { path: self.path.clone(), source };

        let file = File::open(&self.path).map_err(io_error)?;
        let mut events = Vec::new();
        let mut skipped = 0usize;

        for line in BufReader::new(file).lines() {
            let line = line.map_err(io_error)?;
            match parse_line(&line) {
                Some(event) => events.push(event),
                None => skipped += 1,
            }
        }

        if skipped > 0 {
            debug!("{}: skipped {skipped} malformed lines", self.path.display());
        }
        if events.is_empty() {
            return Err(LoadError::NoEvents { path: self.path.clone(), skipped });
        }

        info!("Loaded {} events from {}", events.len(), self.path.display());
        Ok(events)
    }
}

/// Parse `"<elapsed_ms>,<size_bytes>"`; anything else is `None`
#[must_use]
pub fn parse_line(line: &str) -> Option<AllocationEvent> {
    let (time, size) = line.split_once(',')?;
    if size.contains(',') {
        return None;
    }
    let elapsed_ms: f64 = time.trim().parse().ok()?;
    let size_bytes: u64 = size.trim().parse().ok()?;
    elapsed_ms.is_finite().then_some(AllocationEvent::new(elapsed_ms, size_bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_line() {
        assert_eq!(parse_line("12.5,4096"), Some(AllocationEvent::new(12.5, 4096)));
        assert_eq!(parse_line(" 3 , 8 "), Some(AllocationEvent::new(3.0, 8)));
    }

    #[test]
    fn test_parse_rejects_malformed_lines() {
        for line in ["", "time,size", "1,2,3", "1.0", "abc,12", "1.0,-5", "NaN,8", "1.0,12.5"] {
            assert_eq!(parse_line(line), None, "line {line:?} should be skipped");
        }
    }
}

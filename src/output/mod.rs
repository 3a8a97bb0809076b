//! Output module for crawl results
//!
//! This module handles:
//! - Writing place records as JSON lines
//! - Exporting searched cell rectangles for map overlays
//! - Crawl statistics

pub mod stats;

pub use stats::{print_statistics, CrawlStatistics};

use crate::crawler::CellRecord;
use crate::places::PlaceRecord;
use crate::CrawlError;
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Writes each item as one JSON object per line
///
/// # Returns
///
/// * `Ok(usize)` - Number of lines written
/// * `Err(CrawlError)` - Serialization or IO failure
pub fn write_json_lines<W, T>(writer: &mut W, items: &[T]) -> Result<usize, CrawlError>
where
    W: Write,
    T: Serialize,
{
    for item in items {
        serde_json::to_writer(&mut *writer, item)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(items.len())
}

/// Writes place records to `path`, or to stdout when `path` is `None`
pub fn write_records(path: Option<&Path>, records: &[PlaceRecord]) -> Result<usize, CrawlError> {
    match path {
        Some(path) => {
            let mut writer = BufWriter::new(File::create(path)?);
            write_json_lines(&mut writer, records)
        }
        None => {
            let stdout = io::stdout();
            let mut writer = stdout.lock();
            write_json_lines(&mut writer, records)
        }
    }
}

/// Writes every processed cell with its final state to `path`
pub fn write_cells(path: &Path, cells: &[CellRecord]) -> Result<usize, CrawlError> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_json_lines(&mut writer, cells)
}

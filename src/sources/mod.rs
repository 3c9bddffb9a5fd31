//! Readers turning external datasets into [`Address`](crate::models::Address) records.

pub mod emapa_csv;
pub mod emapa_download;
pub mod emapa_gml;
pub mod overpass;
pub mod pbf;
pub mod teryt;

use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::warn;

use crate::error::{Result, SkipReason};

/// Records parsed from a source together with the count of dropped ones.
#[derive(Debug)]
pub struct ParsedBatch<T> {
    pub records: Vec<T>,
    pub skipped: usize,
}

impl<T> ParsedBatch<T> {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            skipped: 0,
        }
    }

    /// Keep a parsed record, or log and count a skipped one
    pub fn push(&mut self, result: std::result::Result<T, SkipReason>, context: &dyn std::fmt::Display) {
        match result {
            Ok(record) => self.records.push(record),
            Err(reason) => {
                warn!("Couldn't parse {}: {}", context, reason);
                self.skipped += 1;
            }
        }
    }
}

impl<T> Default for ParsedBatch<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Open a file for reading, transparently decompressing `.gz`
pub fn open_reader(path: &Path) -> Result<Box<dyn Read>> {
    let file = File::open(path)?;
    let reader: Box<dyn Read> = if path.extension().map_or(false, |e| e == "gz") {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(BufReader::new(file))
    };
    Ok(reader)
}

use crate::Result;
use crate::record::ImageRecord;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Read an ordered url listing from a JSON file.
pub fn read_urls(path: &Path) -> Result<Vec<ImageRecord>> {
    tracing::debug!("Reading url listing from: {}", path.display());

    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let records: Vec<ImageRecord> = serde_json::from_reader(reader)?;

    tracing::debug!("Loaded {} urls from {}", records.len(), path.display());

    Ok(records)
}

/// Write the url listing as a JSON array, preserving record order.
pub fn write_urls(records: &[ImageRecord], path: &Path) -> Result<()> {
    tracing::info!("Saving {} urls to {}", records.len(), path.display());

    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, records)?;

    Ok(())
}

/// Append freshly scraped records to an existing listing, keeping existing
/// entries first and dropping fresh records whose URL is already present.
pub fn merge(existing: Vec<ImageRecord>, fresh: Vec<ImageRecord>) -> Vec<ImageRecord> {
    let mut seen: HashSet<String> = existing.iter().map(|r| r.url.clone()).collect();
    let mut merged = existing;
    for record in fresh {
        if seen.insert(record.url.clone()) {
            merged.push(record);
        }
    }
    merged
}

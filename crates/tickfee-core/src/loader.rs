//! Decompresses a cached daily archive and parses it into a tick series.
//!
//! The archive holds a single headerless CSV with a fixed column schema:
//! trade id, price, quantity, quote quantity, timestamp in milliseconds,
//! buyer-maker flag, best-match flag. The CSV is extracted to a uniquely
//! named scratch file beside the archive and removed again on every exit
//! path, so concurrent loads of the same archive never share scratch bytes;
//! the compressed archive itself is never deleted.

use std::fs::File;
use std::io;
use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;
use tempfile::NamedTempFile;
use thiserror::Error;
use zip::ZipArchive;

/// One recorded trade event. Only `timestamp_ms` and `price` participate in
/// nearest-price resolution; the remaining fields are carried through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tick {
    pub trade_id: u64,
    pub price: Decimal,
    pub quantity: Decimal,
    pub quote_quantity: Decimal,
    pub timestamp_ms: i64,
    pub is_buyer_maker: bool,
    pub is_best_match: bool,
}

/// A full day's ticks in file order.
///
/// The series is not sorted by timestamp by contract: lookups must tolerate
/// arbitrary order. It is ephemeral and rebuilt from the archive per query.
#[derive(Debug, Clone, Default)]
pub struct TickSeries {
    ticks: Vec<Tick>,
}

impl TickSeries {
    pub fn from_ticks(ticks: Vec<Tick>) -> Self {
        Self { ticks }
    }

    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tick> {
        self.ticks.iter()
    }
}

/// Loader failures, translated by the service into day-tagged price errors.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("not a valid archive: {message}")]
    Corrupt { message: String },
    #[error("archive contains no usable ticks")]
    Empty,
}

impl LoadError {
    fn corrupt(message: impl ToString) -> Self {
        Self::Corrupt {
            message: message.to_string(),
        }
    }
}

/// Raw CSV row. Flag columns arrive as `True`/`False` with archive-dependent
/// capitalization, so they are decoded from text rather than serde booleans.
#[derive(Debug, Deserialize)]
struct TickRecord {
    trade_id: u64,
    price: Decimal,
    quantity: Decimal,
    quote_quantity: Decimal,
    timestamp_ms: i64,
    is_buyer_maker: String,
    is_best_match: String,
}

impl TickRecord {
    fn into_tick(self) -> Tick {
        Tick {
            trade_id: self.trade_id,
            price: self.price,
            quantity: self.quantity,
            quote_quantity: self.quote_quantity,
            timestamp_ms: self.timestamp_ms,
            is_buyer_maker: truthy(&self.is_buyer_maker),
            is_best_match: truthy(&self.is_best_match),
        }
    }
}

fn truthy(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("true")
}

/// Load the tick series stored in the archive at `path`.
pub fn load_series(path: &Path) -> Result<TickSeries, LoadError> {
    let file = File::open(path).map_err(LoadError::corrupt)?;
    let mut archive = ZipArchive::new(file).map_err(LoadError::corrupt)?;

    if archive.len() != 1 {
        return Err(LoadError::corrupt(format!(
            "expected a single data file, found {}",
            archive.len()
        )));
    }

    // The scratch name is unique per call; concurrent loads of the same
    // archive each parse their own extraction. Dropping the handle removes
    // the file on every exit path.
    let scratch = extract_entry(&mut archive, path)?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(scratch.path())
        .map_err(LoadError::corrupt)?;

    let mut ticks = Vec::new();
    for record in reader.deserialize::<TickRecord>() {
        // Rows that fail the fixed schema (e.g. a stray header line) are
        // skipped; the series is empty only when nothing parses.
        if let Ok(record) = record {
            ticks.push(record.into_tick());
        }
    }

    if ticks.is_empty() {
        return Err(LoadError::Empty);
    }

    Ok(TickSeries::from_ticks(ticks))
}

fn extract_entry(
    archive: &mut ZipArchive<File>,
    archive_path: &Path,
) -> Result<NamedTempFile, LoadError> {
    let dir = archive_path.parent().unwrap_or_else(|| Path::new("."));
    let mut entry = archive.by_index(0).map_err(LoadError::corrupt)?;
    let mut scratch = NamedTempFile::new_in(dir).map_err(LoadError::corrupt)?;
    io::copy(&mut entry, scratch.as_file_mut()).map_err(LoadError::corrupt)?;
    Ok(scratch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn write_archive(path: &Path, csv_body: &str) {
        let file = File::create(path).expect("create archive");
        let mut writer = ZipWriter::new(file);
        writer
            .start_file("BNBUSDT-trades-2024-05-28.csv", SimpleFileOptions::default())
            .expect("start entry");
        writer.write_all(csv_body.as_bytes()).expect("write entry");
        writer.finish().expect("finish archive");
    }

    // Only the compressed archives themselves may remain after a load.
    fn no_scratch_left(dir: &Path) -> bool {
        fs::read_dir(dir)
            .expect("readable dir")
            .map(|entry| entry.expect("entry").path())
            .all(|p| p.extension().map(|ext| ext == "zip").unwrap_or(false))
    }

    #[test]
    fn parses_fixed_schema_and_cleans_up() {
        let dir = tempfile::tempdir().expect("tempdir");
        let archive = dir.path().join("BNBUSDT-trades-2024-05-28.zip");
        write_archive(
            &archive,
            "1,598.90000000,0.50000000,299.45000000,1716854841000,True,True\n\
             2,599.10000000,1.00000000,599.10000000,1716854842000,False,True\n",
        );

        let series = load_series(&archive).expect("loads");
        assert_eq!(series.len(), 2);

        let first = series.iter().next().expect("first tick");
        assert_eq!(first.trade_id, 1);
        assert_eq!(first.price.to_string(), "598.90000000");
        assert_eq!(first.timestamp_ms, 1_716_854_841_000);
        assert!(first.is_buyer_maker);

        assert!(no_scratch_left(dir.path()));
        assert!(archive.is_file(), "archive itself is never deleted");
    }

    #[test]
    fn garbage_bytes_are_corrupt() {
        let dir = tempfile::tempdir().expect("tempdir");
        let archive = dir.path().join("BNBUSDT-trades-2024-05-28.zip");
        fs::write(&archive, b"this is not a zip").expect("write");

        let error = load_series(&archive).expect_err("must fail");
        assert!(matches!(error, LoadError::Corrupt { .. }));
        assert!(no_scratch_left(dir.path()));
    }

    #[test]
    fn zero_parsable_rows_is_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let archive = dir.path().join("BNBUSDT-trades-2024-05-28.zip");
        write_archive(&archive, "id,price,qty,quote_qty,time,maker,best\n");

        let error = load_series(&archive).expect_err("must fail");
        assert!(matches!(error, LoadError::Empty));
        assert!(no_scratch_left(dir.path()));
    }

    #[test]
    fn unparsable_rows_are_skipped_not_fatal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let archive = dir.path().join("BNBUSDT-trades-2024-05-28.zip");
        write_archive(
            &archive,
            "id,price,qty,quote_qty,time,maker,best\n\
             7,600.00000000,1.00000000,600.00000000,1716854843000,False,False\n",
        );

        let series = load_series(&archive).expect("loads");
        assert_eq!(series.len(), 1);
        assert_eq!(series.iter().next().expect("tick").trade_id, 7);
    }
}

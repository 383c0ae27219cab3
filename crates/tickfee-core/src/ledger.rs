//! Fee ledger ingestion.
//!
//! Input is a tabular export with the four required columns `Date(UTC)`,
//! `Fee Coin`, `Fee`, and `Price`. Rows parse eagerly into typed fields;
//! a row that fails to parse is retained untyped and surfaces as an errored
//! row downstream instead of propagating loose values. File-level problems
//! (missing file, unsupported extension, empty file, missing columns) fail
//! before any row is processed.

use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::UtcInstant;

/// Columns the input file must carry, by exact header name.
pub const REQUIRED_COLUMNS: [&str; 4] = ["Date(UTC)", "Fee Coin", "Fee", "Price"];

/// Headers appended to the output file.
pub const OUTPUT_PRICE_COLUMN: &str = "BNB Price";
pub const OUTPUT_FEE_COLUMN: &str = "Fee USDT";

/// Ledger-level failures. All of these terminate a run before processing.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("cannot read input file '{path}': {source}")]
    Read { path: PathBuf, source: csv::Error },

    #[error("unsupported input format '{path}', expected .csv or .tsv")]
    UnsupportedFormat { path: PathBuf },

    #[error("input file '{path}' is empty")]
    Empty { path: PathBuf },

    #[error("missing required columns: {}", columns.join(", "))]
    MissingColumns { columns: Vec<String> },

    #[error("cannot write output file '{path}': {source}")]
    Write { path: PathBuf, source: csv::Error },
}

/// Typed view of one ledger line, populated once at ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeRow {
    pub instant: UtcInstant,
    pub fee_coin: String,
    pub fee: Decimal,
    pub price: Decimal,
}

/// One input row: the raw cell values for pass-through output, plus the
/// typed fields when the row parsed cleanly.
#[derive(Debug, Clone)]
pub struct LedgerRow {
    pub values: Vec<String>,
    pub fields: Option<FeeRow>,
}

/// A fully ingested ledger.
#[derive(Debug, Clone)]
pub struct Ledger {
    pub headers: Vec<String>,
    pub rows: Vec<LedgerRow>,
}

fn delimiter_for(path: &Path) -> Option<u8> {
    match path.extension()?.to_str()? {
        "csv" => Some(b','),
        "tsv" => Some(b'\t'),
        _ => None,
    }
}

/// Read and type a fee ledger from a `.csv` or `.tsv` file.
pub fn read_ledger(path: &Path) -> Result<Ledger, LedgerError> {
    let delimiter = delimiter_for(path).ok_or_else(|| LedgerError::UnsupportedFormat {
        path: path.to_path_buf(),
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_path(path)
        .map_err(|source| LedgerError::Read {
            path: path.to_path_buf(),
            source,
        })?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(|source| LedgerError::Read {
            path: path.to_path_buf(),
            source,
        })?
        .iter()
        .map(str::to_owned)
        .collect();

    if headers.is_empty() {
        return Err(LedgerError::Empty {
            path: path.to_path_buf(),
        });
    }

    let columns = ColumnIndex::locate(&headers)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|source| LedgerError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let values: Vec<String> = record.iter().map(str::to_owned).collect();
        let fields = columns.parse_row(&values);
        rows.push(LedgerRow { values, fields });
    }

    Ok(Ledger { headers, rows })
}

/// Positions of the required columns within the header row.
struct ColumnIndex {
    date: usize,
    fee_coin: usize,
    fee: usize,
    price: usize,
}

impl ColumnIndex {
    fn locate(headers: &[String]) -> Result<Self, LedgerError> {
        let find = |name: &str| headers.iter().position(|h| h.as_str() == name);

        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|&name| find(name).is_none())
            .map(str::to_owned)
            .collect();
        if !missing.is_empty() {
            return Err(LedgerError::MissingColumns { columns: missing });
        }

        Ok(Self {
            date: find(REQUIRED_COLUMNS[0]).expect("checked above"),
            fee_coin: find(REQUIRED_COLUMNS[1]).expect("checked above"),
            fee: find(REQUIRED_COLUMNS[2]).expect("checked above"),
            price: find(REQUIRED_COLUMNS[3]).expect("checked above"),
        })
    }

    fn parse_row(&self, values: &[String]) -> Option<FeeRow> {
        let cell = |index: usize| values.get(index).map(|v| v.trim());

        let instant = UtcInstant::parse(cell(self.date)?).ok()?;
        let fee_coin = cell(self.fee_coin)?.to_owned();
        if fee_coin.is_empty() {
            return None;
        }
        let fee = cell(self.fee)?.parse::<Decimal>().ok()?;
        let price = cell(self.price)?.parse::<Decimal>().ok()?;

        Some(FeeRow {
            instant,
            fee_coin,
            fee,
            price,
        })
    }
}

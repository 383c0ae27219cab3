//! Fee reconciliation pipeline.
//!
//! Classifies each ledger row by fee currency, resolves reference-token fees
//! through the price lookup seam, and aggregates USD-equivalent totals. Rows
//! are partitioned into independent chunks processed by parallel workers;
//! each worker writes only its own output batch and batches are concatenated
//! in input order, so no synchronization is needed during the parallel phase.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::sync::Arc;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use time::{Date, OffsetDateTime};

use crate::domain::Symbol;
use crate::ledger::{Ledger, LedgerError, LedgerRow, OUTPUT_FEE_COLUMN, OUTPUT_PRICE_COLUMN};
use crate::service::PriceLookup;

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    /// Market pair used to price the reference token (e.g. `BNBUSDT`).
    pub symbol: Symbol,
    /// Fee currency that requires a price lookup.
    pub reference_coin: String,
    /// Fee currency already denominated in USD terms.
    pub quote_coin: String,
    /// Fraction of the full fee actually charged when paying with the
    /// reference token; the no-discount total divides by this.
    pub discount_rate: Decimal,
    /// The processing day. Rows on or after it are omitted as incomplete.
    pub today: Date,
    /// Number of parallel row chunks.
    pub workers: usize,
}

impl ReconcileOptions {
    pub fn new(symbol: Symbol) -> Self {
        Self {
            symbol,
            reference_coin: String::from("BNB"),
            quote_coin: String::from("USDT"),
            discount_rate: dec!(0.75),
            today: OffsetDateTime::now_utc().date(),
            workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
        }
    }
}

/// How a row left the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A USD fee value was attached.
    Processed,
    /// The row failed to parse or its price lookup failed; retained with
    /// null outputs.
    Errored,
    /// The row's trade falls on the processing day; excluded from output.
    Omitted,
}

/// One output row: original cells plus the two resolved columns.
#[derive(Debug, Clone)]
pub struct ReconciledRow {
    pub values: Vec<String>,
    pub fee_coin: Option<String>,
    pub reference_price: Option<Decimal>,
    pub fee_usd: Option<Decimal>,
    pub outcome: Outcome,
}

/// Aggregated console summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub reference_coin: String,
    pub total_fees: Decimal,
    pub total_without_discount: Decimal,
    pub breakdown: BTreeMap<String, Decimal>,
    pub processed: usize,
    pub errored: usize,
    pub omitted: usize,
}

impl Display for Summary {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Total fees paid: ${:.2}", self.total_fees)?;
        writeln!(
            f,
            "Total fees if {} was not used: ${:.2}",
            self.reference_coin, self.total_without_discount
        )?;
        writeln!(f)?;
        writeln!(f, "Fee breakdown by coin:")?;
        for (coin, fee) in &self.breakdown {
            writeln!(f, "{coin}: ${fee:.2}")?;
        }
        writeln!(f)?;
        writeln!(f, "Total rows processed: {}", self.processed)?;
        writeln!(f, "Rows with errors: {}", self.errored)?;
        write!(f, "Rows omitted (current day trades): {}", self.omitted)
    }
}

/// Full pipeline result: rows in input order plus the summary.
#[derive(Debug, Clone)]
pub struct ReconcileReport {
    pub headers: Vec<String>,
    pub rows: Vec<ReconciledRow>,
    pub summary: Summary,
}

impl ReconcileReport {
    /// Write the reconciled ledger as CSV with the two appended columns,
    /// skipping omitted rows.
    pub fn write_csv(&self, path: &Path) -> Result<(), LedgerError> {
        let write_error = |source: csv::Error| LedgerError::Write {
            path: path.to_path_buf(),
            source,
        };

        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_path(path)
            .map_err(write_error)?;

        let mut header = self.headers.clone();
        header.push(String::from(OUTPUT_PRICE_COLUMN));
        header.push(String::from(OUTPUT_FEE_COLUMN));
        writer.write_record(&header).map_err(write_error)?;

        for row in self.rows.iter().filter(|r| r.outcome != Outcome::Omitted) {
            let mut record = row.values.clone();
            record.push(decimal_cell(row.reference_price));
            record.push(decimal_cell(row.fee_usd));
            writer.write_record(&record).map_err(write_error)?;
        }

        writer
            .flush()
            .map_err(|source| write_error(csv::Error::from(source)))
    }
}

fn decimal_cell(value: Option<Decimal>) -> String {
    value.map(|v| v.normalize().to_string()).unwrap_or_default()
}

/// Per-worker context; cloned into each spawned chunk task.
#[derive(Debug, Clone)]
struct ChunkContext {
    symbol: Symbol,
    reference_coin: String,
    quote_coin: String,
    today: Date,
}

/// Run the reconciliation pipeline over an ingested ledger.
pub async fn reconcile(
    ledger: Ledger,
    lookup: Arc<dyn PriceLookup>,
    options: &ReconcileOptions,
) -> ReconcileReport {
    let Ledger { headers, rows } = ledger;

    let context = ChunkContext {
        symbol: options.symbol.clone(),
        reference_coin: options.reference_coin.clone(),
        quote_coin: options.quote_coin.clone(),
        today: options.today,
    };

    let workers = options.workers.max(1);
    let chunk_size = rows.len().div_ceil(workers).max(1);

    let mut handles = Vec::with_capacity(workers);
    let mut rows = rows.into_iter().peekable();
    while rows.peek().is_some() {
        let chunk: Vec<LedgerRow> = rows.by_ref().take(chunk_size).collect();
        let lookup = Arc::clone(&lookup);
        let context = context.clone();
        handles.push(tokio::spawn(async move {
            process_chunk(chunk, lookup, context).await
        }));
    }

    let mut reconciled = Vec::new();
    for handle in handles {
        reconciled.extend(handle.await.expect("fee worker should not panic"));
    }

    let summary = summarize(&reconciled, options);
    ReconcileReport {
        headers,
        rows: reconciled,
        summary,
    }
}

async fn process_chunk(
    rows: Vec<LedgerRow>,
    lookup: Arc<dyn PriceLookup>,
    context: ChunkContext,
) -> Vec<ReconciledRow> {
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        out.push(process_row(row, lookup.as_ref(), &context).await);
    }
    out
}

async fn process_row(
    row: LedgerRow,
    lookup: &dyn PriceLookup,
    context: &ChunkContext,
) -> ReconciledRow {
    let LedgerRow { values, fields } = row;

    let Some(fields) = fields else {
        return ReconciledRow {
            values,
            fee_coin: None,
            reference_price: None,
            fee_usd: None,
            outcome: Outcome::Errored,
        };
    };

    if fields.instant.date() >= context.today {
        return ReconciledRow {
            values,
            fee_coin: Some(fields.fee_coin),
            reference_price: None,
            fee_usd: None,
            outcome: Outcome::Omitted,
        };
    }

    if fields.fee_coin == context.reference_coin {
        return match lookup.lookup(&context.symbol, fields.instant).await {
            Ok(price) => ReconciledRow {
                values,
                fee_coin: Some(fields.fee_coin),
                reference_price: Some(price),
                fee_usd: Some(fields.fee * price),
                outcome: Outcome::Processed,
            },
            // Policy boundary: a failed lookup becomes a null value plus an
            // error count, never a pipeline abort.
            Err(_) => ReconciledRow {
                values,
                fee_coin: Some(fields.fee_coin),
                reference_price: None,
                fee_usd: None,
                outcome: Outcome::Errored,
            },
        };
    }

    let fee_usd = if fields.fee_coin == context.quote_coin {
        fields.fee
    } else {
        // Same-row approximation: value the fee with the trade's own price.
        fields.fee * fields.price
    };

    ReconciledRow {
        values,
        fee_coin: Some(fields.fee_coin),
        reference_price: None,
        fee_usd: Some(fee_usd),
        outcome: Outcome::Processed,
    }
}

fn summarize(rows: &[ReconciledRow], options: &ReconcileOptions) -> Summary {
    let mut summary = Summary {
        reference_coin: options.reference_coin.clone(),
        total_fees: Decimal::ZERO,
        total_without_discount: Decimal::ZERO,
        breakdown: BTreeMap::new(),
        processed: 0,
        errored: 0,
        omitted: 0,
    };

    for row in rows {
        match row.outcome {
            Outcome::Omitted => summary.omitted += 1,
            Outcome::Errored => summary.errored += 1,
            Outcome::Processed => {
                summary.processed += 1;
                let (Some(coin), Some(fee)) = (row.fee_coin.as_ref(), row.fee_usd) else {
                    continue;
                };
                summary.total_fees += fee;
                *summary.breakdown.entry(coin.clone()).or_default() += fee;
                summary.total_without_discount += if *coin == options.reference_coin {
                    fee / options.discount_rate
                } else {
                    fee
                };
            }
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::Future;
    use std::pin::Pin;

    use rust_decimal_macros::dec;
    use time::macros::date;

    use crate::domain::UtcInstant;
    use crate::error::PriceError;
    use crate::ledger::FeeRow;

    struct FixedPrice(Decimal);

    impl PriceLookup for FixedPrice {
        fn lookup<'a>(
            &'a self,
            _symbol: &'a Symbol,
            _instant: UtcInstant,
        ) -> Pin<Box<dyn Future<Output = Result<Decimal, PriceError>> + Send + 'a>> {
            let price = self.0;
            Box::pin(async move { Ok(price) })
        }
    }

    fn row(date: &str, coin: &str, fee: Decimal, price: Decimal) -> LedgerRow {
        let instant = UtcInstant::parse(date).expect("valid date");
        LedgerRow {
            values: vec![
                date.to_owned(),
                coin.to_owned(),
                fee.to_string(),
                price.to_string(),
            ],
            fields: Some(FeeRow {
                instant,
                fee_coin: coin.to_owned(),
                fee,
                price,
            }),
        }
    }

    fn options() -> ReconcileOptions {
        let mut options = ReconcileOptions::new(Symbol::parse("BNBUSDT").expect("valid"));
        options.today = date!(2024 - 06 - 01);
        options.workers = 3;
        options
    }

    fn ledger(rows: Vec<LedgerRow>) -> Ledger {
        Ledger {
            headers: vec![
                "Date(UTC)".into(),
                "Fee Coin".into(),
                "Fee".into(),
                "Price".into(),
            ],
            rows,
        }
    }

    #[tokio::test]
    async fn chunked_workers_preserve_input_order() {
        let rows: Vec<LedgerRow> = (0..10)
            .map(|i| row("2024-01-01 00:00:00", "USDT", Decimal::from(i), dec!(1)))
            .collect();

        let report = reconcile(ledger(rows), Arc::new(FixedPrice(dec!(200))), &options()).await;

        let fees: Vec<Decimal> = report.rows.iter().filter_map(|r| r.fee_usd).collect();
        let expected: Vec<Decimal> = (0..10).map(Decimal::from).collect();
        assert_eq!(fees, expected);
    }

    #[tokio::test]
    async fn discount_total_scales_reference_fees() {
        let rows = vec![
            row("2024-01-01 00:00:00", "BNB", dec!(0.1), dec!(100)),
            row("2024-01-02 00:00:00", "USDT", dec!(3), dec!(1)),
        ];

        let report = reconcile(ledger(rows), Arc::new(FixedPrice(dec!(150))), &options()).await;

        // BNB fee: 0.1 * 150 = 15; without discount 15 / 0.75 = 20.
        assert_eq!(report.summary.total_fees, dec!(18));
        assert_eq!(report.summary.total_without_discount, dec!(23));
        assert_eq!(report.summary.breakdown["BNB"], dec!(15));
        assert_eq!(report.summary.breakdown["USDT"], dec!(3));
    }
}

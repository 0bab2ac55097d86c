use clap::Parser;
use miette::{IntoDiagnostic, Result};
use payment_participant::application::processor::TransactionProcessor;
use payment_participant::domain::balance::Funds;
use payment_participant::domain::event::Event;
use payment_participant::domain::payment::PaymentStatus;
use payment_participant::domain::ports::{Store, StoreBox};
use payment_participant::error::PaymentError;
use payment_participant::infrastructure::StoreConfig;
use payment_participant::infrastructure::in_memory::InMemoryStore;
#[cfg(feature = "storage-rocksdb")]
use payment_participant::infrastructure::rocksdb::RocksDBStore;
use payment_participant::interfaces::csv::balance_reader::BalanceReader;
use payment_participant::interfaces::csv::balance_writer::BalanceWriter;
use payment_participant::interfaces::csv::event_reader::{EventReader, EventRecord, EventType};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Events CSV file (type, customer, order, amount)
    input: PathBuf,

    /// Opening balances CSV file (customer, available)
    #[arg(long)]
    balances: Option<PathBuf>,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// How long to wait for a balance row lock, in milliseconds
    #[arg(long, default_value_t = 5000)]
    lock_timeout_ms: u64,
}

fn open_store(db_path: Option<PathBuf>, config: StoreConfig) -> Result<StoreBox> {
    match db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(path) => {
            let store = RocksDBStore::open(path, config).into_diagnostic()?;
            Ok(Box::new(store))
        }
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(_) => {
            warn!(
                "Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
            );
            Ok(Box::new(InMemoryStore::with_config(config)))
        }
        None => Ok(Box::new(InMemoryStore::with_config(config))),
    }
}

/// Turns a CSV row into an event. Complete and cancel rows are matched to the
/// customer's pending payment for the order, or its latest one if none is
/// pending, so replays surface the terminal-state errors.
async fn resolve_event(
    store: &dyn Store,
    record: &EventRecord,
) -> payment_participant::error::Result<Event> {
    if record.r#type == EventType::Reserve {
        let amount = record.amount.ok_or_else(|| {
            PaymentError::ValidationError(format!(
                "reserve for order {} has no amount",
                record.order
            ))
        })?;
        return Event::reserve(record.order, amount);
    }

    let payments: Vec<_> = store
        .payments_by_order(record.order)
        .await?
        .into_iter()
        .filter(|p| p.customer_id == record.customer)
        .collect();
    let payment = payments
        .iter()
        .find(|p| p.status == PaymentStatus::Pending)
        .or_else(|| payments.last())
        .ok_or_else(|| {
            PaymentError::ValidationError(format!("no payment for order {}", record.order))
        })?;

    Ok(match record.r#type {
        EventType::Complete => Event::Complete {
            payment_id: payment.id,
        },
        _ => Event::Cancel {
            payment_id: payment.id,
        },
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_ansi(false)
        .init();

    let cli = Cli::parse();
    let config = StoreConfig {
        lock_timeout: Duration::from_millis(cli.lock_timeout_ms),
    };
    let processor = TransactionProcessor::new(open_store(cli.db_path, config)?);

    if let Some(path) = cli.balances {
        let file = File::open(path).into_diagnostic()?;
        for record in BalanceReader::new(file).records() {
            let record = match record {
                Ok(record) => record,
                Err(e) => {
                    error!(error = %e, "Error reading balance");
                    continue;
                }
            };
            let seeded = match Funds::new(record.available) {
                Ok(available) => processor.store().open_balance(record.customer, available).await,
                Err(e) => Err(e),
            };
            match seeded {
                Ok(_) => info!(customer = %record.customer, "balance opened"),
                Err(PaymentError::DuplicateKey(_)) => {
                    warn!(customer = %record.customer, "balance already exists, keeping stored funds")
                }
                Err(e) => error!(customer = %record.customer, error = %e, "Error opening balance"),
            }
        }
    }

    let file = File::open(cli.input).into_diagnostic()?;
    for record in EventReader::new(file).records() {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                error!(error = %e, "Error reading event");
                continue;
            }
        };
        match resolve_event(processor.store(), &record).await {
            Ok(event) => {
                if let Err(e) = processor.apply_event(record.customer, event).await {
                    if e.is_idempotent_replay() {
                        info!(order = %record.order, error = %e, "Event already applied");
                    } else {
                        error!(order = %record.order, error = %e, "Error processing event");
                    }
                }
            }
            Err(e) => error!(order = %record.order, error = %e, "Error resolving event"),
        }
    }

    let balances = processor.store().balances().await.into_diagnostic()?;
    let stdout = io::stdout();
    let mut writer = BalanceWriter::new(stdout.lock());
    writer.write_balances(balances).into_diagnostic()?;

    Ok(())
}

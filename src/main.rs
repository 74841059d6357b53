use clap::Parser;
use ledger_lending::application::transfer::LedgerTransferEngine;
use ledger_lending::config::Config;
use ledger_lending::domain::transaction::Transaction;
use ledger_lending::infrastructure::in_memory::InMemoryPorts;
use ledger_lending::interfaces::csv::account_reader::{AccountReader, seed_ledger};
use ledger_lending::interfaces::csv::account_writer::AccountWriter;
use ledger_lending::interfaces::csv::ledger_writer::LedgerWriter;
use ledger_lending::interfaces::csv::transfer_reader::TransferReader;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Accounts seed CSV file
    accounts: PathBuf,

    /// Transfers CSV file
    transfers: PathBuf,

    /// Write the transaction ledger (completed and denied) to this file.
    #[arg(long)]
    ledger_out: Option<PathBuf>,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env().into_diagnostic()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    #[allow(unused_mut)]
    let mut ports = InMemoryPorts::new()
        .with_qr_secret(config.qr_secret.clone())
        .into_ports();

    if let Some(db_path) = cli.db_path {
        #[cfg(feature = "storage-rocksdb")]
        {
            use ledger_lending::infrastructure::rocksdb::RocksDBStore;
            use std::sync::Arc;

            let store = RocksDBStore::open(db_path)?;
            ports.accounts = Arc::new(store.clone());
            ports.transactions = Arc::new(store.clone());
            ports.ledger = Arc::new(store);
        }
        #[cfg(not(feature = "storage-rocksdb"))]
        {
            let _ = db_path;
            eprintln!(
                "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
            );
        }
    }

    // Seed accounts
    let file = File::open(&cli.accounts).into_diagnostic()?;
    let seeds = AccountReader::new(file)
        .seeds()
        .collect::<ledger_lending::error::Result<Vec<_>>>()?;
    let ledger = seed_ledger(&ports, seeds).await?;

    let mut reserves = config.reserve_accounts.clone();
    reserves.extend(ledger.reserves.clone());
    let engine = LedgerTransferEngine::new(&ports, reserves);

    // Process transfers
    let file = File::open(&cli.transfers).into_diagnostic()?;
    let mut recorded: Vec<Transaction> = Vec::new();
    for request in TransferReader::new(file).requests() {
        match request {
            Ok(request) => match engine.transfer(request).await {
                Ok(tx) => recorded.push(tx),
                Err(e) => match e.denied_transaction() {
                    Some(denied) => recorded.push(denied.clone()),
                    None => tracing::error!(error = %e, "Error processing transfer"),
                },
            },
            Err(e) => tracing::error!(error = %e, "Error reading transfer"),
        }
    }

    // Output final balances
    let accounts = ports.accounts.get_all().await?;
    let stdout = io::stdout();
    AccountWriter::new(stdout.lock())
        .write_accounts(&accounts, |a| ledger.owner_label(a.owner_id))?;

    if let Some(path) = cli.ledger_out {
        let file = File::create(path).into_diagnostic()?;
        LedgerWriter::new(file).write_transactions(&recorded)?;
    }

    Ok(())
}

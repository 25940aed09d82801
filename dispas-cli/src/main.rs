//! Dispas CLI
//!
//! Command-line interface for Dispas stealth payments and batch distribution.

use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use dispas_api::{ApiConfig, ApiServer};
use dispas_core::traits::AnnouncementLog;
use dispas_core::types::{DistributionBatch, IdentityKeys, StealthMetaAddress};
use dispas_core::U256;
use dispas_crypto::generate_identity_keys;
use dispas_payout::validate_batch;
use dispas_registry::FileAnnouncer;
use dispas_scanner::{ScanProgress, Scanner, ScannerConfig};
use dispas_stealth::{StealthPaymentBuilder, StealthWallet};

/// Dispas - stealth payments and exact-sum batch distribution
#[derive(Parser)]
#[command(name = "dispas")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new identity key set
    Generate {
        /// Output file for keys (JSON)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Derive a one-time address for a recipient
    Create {
        /// Recipient's meta-address (`st:eth:0x...`)
        recipient: String,
        /// Native amount hint to announce, in the smallest unit
        #[arg(short, long)]
        amount: Option<String>,
        /// Append the announcement to this log file
        #[arg(short, long, env = "DISPAS_ANNOUNCEMENT_LOG")]
        log: Option<PathBuf>,
    },

    /// Scan an announcement log for payments
    Scan {
        /// Path to keys file
        #[arg(short, long)]
        keys: PathBuf,
        /// Announcement log file
        #[arg(short, long, env = "DISPAS_ANNOUNCEMENT_LOG")]
        log: PathBuf,
        /// First sequence to scan
        #[arg(long, default_value = "1")]
        from: u64,
        /// Number of scan workers
        #[arg(short, long, env = "DISPAS_SCAN_PARALLELISM")]
        parallelism: Option<usize>,
        /// Print the spending key of every discovered address
        #[arg(long)]
        show_keys: bool,
    },

    /// Validate a distribution batch without moving value
    Distribute {
        /// JSON file with `[{"recipient": {...}, "amount": "..."}]`
        batch: PathBuf,
        /// Value that would be attached, in the smallest unit
        #[arg(long)]
        value: String,
    },

    /// Run the API server
    Serve {
        /// Port to listen on
        #[arg(short, long, env = "DISPAS_PORT")]
        port: Option<u16>,
        /// Bind address
        #[arg(short, long, env = "DISPAS_BIND")]
        bind: Option<IpAddr>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "dispas=debug,info"
    } else {
        "dispas=info,warn"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Generate { output } => cmd_generate(output),
        Commands::Create { recipient, amount, log } => {
            cmd_create(&recipient, amount.as_deref(), log.as_deref()).await
        }
        Commands::Scan {
            keys,
            log,
            from,
            parallelism,
            show_keys,
        } => cmd_scan(&keys, &log, from, parallelism, show_keys).await,
        Commands::Distribute { batch, value } => cmd_distribute(&batch, &value),
        Commands::Serve { port, bind } => cmd_serve(port, bind).await,
    }
}

fn parse_amount(raw: &str) -> Result<U256> {
    raw.trim()
        .parse::<U256>()
        .with_context(|| format!("Invalid amount: {raw}"))
}

fn read_keys(path: &Path) -> Result<IdentityKeys> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open keys file {}", path.display()))?;
    serde_json::from_reader(file).context("Keys file is not a valid key set")
}

fn read_batch(path: &Path) -> Result<DistributionBatch> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open batch file {}", path.display()))?;
    serde_json::from_reader(file).context("Batch file is not a list of payments")
}

/// Generate a new identity key set
fn cmd_generate(output: Option<PathBuf>) -> Result<()> {
    println!("{}", "🔑 Generating identity keys...".cyan().bold());

    let keys = generate_identity_keys().context("Key generation failed")?;
    let meta = keys.meta_address();
    let keys_json = serde_json::to_string_pretty(&keys)?;

    if let Some(path) = output {
        std::fs::write(&path, keys_json)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("{} {}", "✅ Keys saved to:".green(), path.display());
    } else {
        println!("\n{}", "Keys (JSON):".yellow().bold());
        println!("{}", keys_json);
    }

    println!("\n{}", "Meta-address (register this):".yellow().bold());
    println!("   {}", meta);

    println!("\n{}", "⚠️  IMPORTANT: Keep your secret keys safe!".red().bold());
    println!("   The spending secret controls every payment you receive.");

    Ok(())
}

/// Derive a one-time address for a recipient
async fn cmd_create(recipient: &str, amount: Option<&str>, log: Option<&Path>) -> Result<()> {
    println!("{} {}", "💸 Creating stealth payment to:".cyan().bold(), recipient);

    let meta = StealthMetaAddress::from_uri(recipient).context("Invalid meta-address")?;

    let mut builder = StealthPaymentBuilder::new().recipient(meta);
    if let Some(raw) = amount {
        builder = builder.native_amount(parse_amount(raw)?);
    }
    let payment = builder.build().context("Failed to create stealth payment")?;

    println!("\n{}", "✅ Stealth payment created:".green().bold());
    println!("   {} {}", "Address:".yellow(), payment.stealth.address);
    println!("   {} {}", "View tag:".dimmed(), payment.stealth.view_tag);
    println!("   {} {}", "Ephemeral key:".dimmed(), payment.stealth.ephemeral_public_key);

    match log {
        Some(path) => {
            let file_log = FileAnnouncer::open(path)
                .await
                .with_context(|| format!("Failed to open announcement log {}", path.display()))?;
            let sequence = file_log
                .append(payment.announcement)
                .await
                .context("Failed to append announcement")?;
            println!("\n{} #{} in {}", "📋 Announced as".green(), sequence, path.display());
            println!("\n{}", "ℹ️  Next step: send funds to the stealth address above".cyan());
        }
        None => {
            println!("\n{}", "📋 Announcement (JSON):".yellow().bold());
            println!("{}", serde_json::to_string_pretty(&payment.announcement)?);
            println!("\n{}", "ℹ️  Next steps:".cyan());
            println!("   1. Send funds to the stealth address above");
            println!("   2. Append the announcement to the log");
        }
    }

    Ok(())
}

/// Scan an announcement log for payments
async fn cmd_scan(
    keys_path: &Path,
    log_path: &Path,
    from: u64,
    parallelism: Option<usize>,
    show_keys: bool,
) -> Result<()> {
    println!("{}", "🔎 Scanning for payments...".cyan().bold());

    let wallet = StealthWallet::from_keys(read_keys(keys_path)?);

    println!("   Loading log from: {}", log_path.display());
    let log = Arc::new(
        FileAnnouncer::open(log_path)
            .await
            .context("Failed to load announcement log")?,
    );

    let latest = log.latest_sequence().await?.unwrap_or(0);
    if latest < from {
        println!("\n{}", "⚠️  Nothing to scan in that range.".yellow());
        return Ok(());
    }

    let mut config = ScannerConfig::new();
    if let Some(workers) = parallelism {
        config = config.parallelism(workers);
    }
    let scanner = Scanner::with_config(wallet.view_only(), config);

    let pb = ProgressBar::new(latest - from + 1);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("#>-"),
    );

    let bar = pb.clone();
    let found = if from == 1 {
        scanner
            .scan_with_progress(
                log.clone(),
                Box::new(move |p: ScanProgress| bar.set_position(p.scanned)),
            )
            .await?
    } else {
        scanner.scan_window(log.clone(), from, latest).await?
    };

    pb.finish_and_clear();

    let stats = scanner.stats();
    println!(
        "   Scanned {} announcement(s), {} view-tag match(es)",
        stats.total_scanned, stats.view_tag_matches
    );

    if found.is_empty() {
        println!("\n{}", "No payments found.".yellow());
        return Ok(());
    }

    println!("\n{} {} payment(s) found:", "✅".green(), found.len());
    for matched in &found {
        println!("   {} {}", "Address:".green(), matched.stealth_address);
        print!("      Announcement #{}", matched.announcement.sequence);
        match matched.announcement.native_amount() {
            Some(amount) => println!(", amount {}", amount),
            None => println!(),
        }
        if show_keys {
            let key = wallet
                .spending_key_for(&matched.announcement)
                .context("Failed to derive spending key")?;
            println!("      {} 0x{}", "Private key:".red(), key.to_hex().as_str());
        }
    }

    Ok(())
}

/// Validate a distribution batch without moving value
fn cmd_distribute(batch_path: &Path, value: &str) -> Result<()> {
    println!("{}", "🧮 Validating distribution batch...".cyan().bold());

    let batch = read_batch(batch_path)?;
    let supplied = parse_amount(value)?;

    match validate_batch(&batch, supplied) {
        Ok(total) => {
            println!("\n{}", "✅ Batch is valid:".green().bold());
            println!("   {} {}", "Payments:".dimmed(), batch.len());
            println!("   {} {}", "Total:".dimmed(), total);
            for (index, payment) in batch.payments().iter().enumerate() {
                println!("   #{:<3} {} ← {}", index, payment.recipient, payment.amount);
            }
            Ok(())
        }
        Err(e) => {
            println!("\n{} {}", "❌".red(), e.code().red().bold());
            bail!("batch rejected: {e}")
        }
    }
}

/// Run API server
async fn cmd_serve(port: Option<u16>, bind: Option<IpAddr>) -> Result<()> {
    let mut config = ApiConfig::from_env().context("Invalid server configuration")?;
    if let Some(port) = port {
        config.port = port;
    }
    if let Some(bind) = bind {
        config.bind = bind;
    }
    let addr = config.socket_addr();

    println!("{}", "🚀 Starting Dispas API server...".cyan().bold());
    println!("   {} http://{}", "Listening on:".green(), addr);
    println!("   {} http://{}/health", "Health check:".dimmed(), addr);
    if let Some(path) = &config.announcement_log {
        println!("   {} {}", "Announcement log:".dimmed(), path.display());
    }
    println!("\n   Press Ctrl+C to stop.\n");

    let server = ApiServer::open(config)
        .await
        .context("Failed to initialise server state")?;
    server.run().await?;

    Ok(())
}

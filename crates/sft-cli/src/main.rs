//! sft: encrypted file-transfer client
//!
//! Commands:
//!   encrypt <file>...  - encrypt files client-side, upload, print the link
//!   decrypt <link>     - fetch, authenticate, and decrypt a transfer
//!
//! The service only ever sees sealed blobs and their SHA-256 digests; every
//! key is derived client-side from per-blob secrets carried inside the
//! (equally sealed) metadata, whose own secret lives in the link fragment.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use sft_core::config::SftConfig;
use sft_core::types::TransferInfo;
use sft_transfer::{ApiClient, Downloader, Listing, ProgressFn, Uploader};

#[derive(Parser, Debug)]
#[command(
    name = "sft",
    version,
    about = "Encrypted file-transfer client",
    long_about = "sft: encrypt and upload files to the transfer service, or fetch and \
                  decrypt them from a shareable link. All encryption is client-side."
)]
struct Cli {
    /// Path to sft.toml configuration file
    #[arg(
        long,
        short = 'c',
        env = "SFT_CONFIG",
        default_value = "~/.config/sft/config.toml"
    )]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Encrypt local files, upload them, and print the shareable link
    Encrypt {
        /// Files to encrypt and upload
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Prompt for a transfer password. Accepted for compatibility but
        /// not transmitted; the service reports has_password on download.
        #[arg(long, short = 'p')]
        password: bool,
    },

    /// Fetch, authenticate, and decrypt the files behind a shareable link
    Decrypt {
        /// Shareable link: <service>/download/<id>#<secret>
        link: String,

        /// List the transfer's files without downloading them
        #[arg(long, short = 's')]
        show: bool,

        /// Directory to write downloaded files into
        #[arg(long, short = 'o', default_value = ".")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Encrypt { files, password } => cmd_encrypt(&config, &files, password).await,
        Commands::Decrypt { link, show, output } => {
            cmd_decrypt(&config, &link, show, &output).await
        }
    }
}

// ── Config loading ────────────────────────────────────────────────────────────

fn load_config(path: &Path) -> Result<SftConfig> {
    let path = expand_tilde(path);
    if path.exists() {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("parsing config: {}", path.display()))
    } else {
        Ok(SftConfig::default())
    }
}

/// Expand `~` in path to the user's home directory
fn expand_tilde(path: &Path) -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_default();
    expand_tilde_with_home(path, &home)
}

fn expand_tilde_with_home(path: &Path, home: &str) -> PathBuf {
    let s = path.to_string_lossy();
    if let Some(rest) = s.strip_prefix("~/") {
        PathBuf::from(format!("{home}/{rest}"))
    } else {
        path.to_path_buf()
    }
}

// ── Progress bar helper ───────────────────────────────────────────────────────

fn make_progress_bar(prefix: &str) -> ProgressBar {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::with_template("{prefix:.bold} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("=>-"),
    );
    pb.set_prefix(prefix.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn chunk_progress(pb: &ProgressBar) -> ProgressFn {
    let pb = pb.clone();
    Box::new(move |done, total, message| {
        pb.set_length(total);
        pb.set_position(done);
        pb.set_message(message.to_string());
    })
}

// ── `sft encrypt` ─────────────────────────────────────────────────────────────

async fn cmd_encrypt(config: &SftConfig, files: &[PathBuf], password: bool) -> Result<()> {
    if password {
        let _password =
            rpassword::prompt_password("Password: ").context("reading password")?;
        tracing::warn!(
            "the service does not accept a client-set password yet; uploading without one"
        );
    }

    let api = ApiClient::new(config)?;
    let pb = make_progress_bar("encrypt");
    let progress = chunk_progress(&pb);

    let mut uploader = Uploader::new(&api, config);
    let outcome = uploader.run(files, Some(&progress)).await?;
    pb.finish_and_clear();

    println!(
        "Successfully encrypted and uploaded {} file(s) ({} bytes).",
        outcome.files.len(),
        outcome.total_bytes
    );
    println!("Download link:");
    println!("{}", outcome.link);
    Ok(())
}

// ── `sft decrypt` ─────────────────────────────────────────────────────────────

async fn cmd_decrypt(config: &SftConfig, link: &str, show: bool, output: &Path) -> Result<()> {
    let api = ApiClient::new(config)?;
    let mut downloader = Downloader::new(&api);

    let listing = downloader.fetch_listing(link).await?;
    print_transfer_info(&listing.session.transfer);

    if show {
        print_files(&listing);
        return Ok(());
    }

    std::fs::create_dir_all(output)
        .with_context(|| format!("creating output directory: {}", output.display()))?;

    let pb = make_progress_bar("decrypt");
    let progress = chunk_progress(&pb);
    let written = downloader.download_all(&listing, output, Some(&progress)).await?;
    pb.finish_and_clear();

    println!("Successfully downloaded {} file(s):", written.len());
    for path in &written {
        println!("  {}", path.display());
    }
    Ok(())
}

fn print_transfer_info(info: &TransferInfo) {
    println!("Created at:   {}", info.created_at);
    println!("Delete after: {}", info.delete_after);
    println!("Expires in:   {}", info.expires_in);
    println!("Has password: {}", info.has_password);
    println!();
}

fn print_files(listing: &Listing) {
    if listing.description.is_empty() {
        println!("Description:  (none)");
    } else {
        println!("Description:  {}", listing.description);
    }
    println!();
    if listing.files.is_empty() {
        println!("No files in this transfer.");
        return;
    }

    println!(
        "{:<4} {:<40} {:>10} {:>14}  {}",
        "#", "Name", "Downloads", "Size (bytes)", "Type"
    );
    for (index, entry) in listing.files.iter().enumerate() {
        println!(
            "{:<4} {:<40} {:>10} {:>14}  {}",
            index,
            entry.record.name,
            entry.remaining_count,
            entry.record.size,
            entry.record.content_type
        );
    }
}

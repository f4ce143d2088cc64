//! # bonprint CLI
//!
//! ## Usage
//!
//! ```bash
//! # Render descriptors to ESC/POS bytes without a printer
//! bonprint render receipt.json --out receipt.bin
//! bonprint render receipt.json --hex --base-size 1 --profile reference-ble
//!
//! # Print over RFCOMM to a paired printer
//! bonprint print receipt.json --mac 66:22:B3:1C:07:9A
//!
//! # List built-in printer profiles
//! bonprint profiles
//! ```
//!
//! Set `RUST_LOG=bonprint=debug` to trace connection transitions.

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use bonprint::{
    BonprintError, PrinterEvent, PrinterProfile,
    pipeline,
    printer::AbsoluteFontSize,
    session::{Session, SessionOptions},
    transport::RfcommAdapter,
};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// bonprint - Bluetooth receipt printer utility
#[derive(Parser, Debug)]
#[command(name = "bonprint")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render a JSON descriptor file to printer bytes
    Render {
        /// JSON array of element descriptors
        file: PathBuf,

        /// Write bytes to this file instead of stdout
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,

        /// Print a hex dump instead of raw bytes
        #[arg(long)]
        hex: bool,

        /// Base font size (0-3) added to every element's size
        #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=3))]
        base_size: u8,

        /// Built-in profile name or path to a profile JSON file
        #[arg(long, default_value = "reference")]
        profile: String,
    },

    /// Print a JSON descriptor file over Bluetooth RFCOMM
    Print {
        /// JSON array of element descriptors
        file: PathBuf,

        /// Printer MAC address
        #[arg(long)]
        mac: String,

        /// RFCOMM device number used if a binding must be created
        #[arg(long)]
        channel: Option<u8>,

        /// Base font size (0-3) added to every element's size
        #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=3))]
        base_size: u8,

        /// Built-in profile name or path to a profile JSON file
        #[arg(long, default_value = "reference")]
        profile: String,
    },

    /// List built-in printer profiles
    Profiles,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("bonprint=info")),
        )
        .with_writer(io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), BonprintError> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Render {
            file,
            out,
            hex,
            base_size,
            profile,
        } => {
            let profile = PrinterProfile::parse(&profile)?;
            let json = fs::read_to_string(&file)?;
            let bytes = pipeline::render_descriptors(
                &json,
                AbsoluteFontSize::from_ordinal(base_size),
                &profile,
            )?;
            info!(bytes = bytes.len(), profile = %profile.name, "rendered");

            let output = if hex { hex_dump(&bytes).into_bytes() } else { bytes };
            match out {
                Some(path) => fs::write(&path, output)?,
                None => io::stdout().write_all(&output)?,
            }
        }
        Commands::Print {
            file,
            mac,
            channel,
            base_size,
            profile,
        } => {
            let profile = PrinterProfile::parse(&profile)?;
            let json = fs::read_to_string(&file)?;
            let channel = channel.unwrap_or(profile.rfcomm_channel);
            print_file(
                &json,
                &mac,
                channel,
                SessionOptions {
                    profile,
                    base_size: AbsoluteFontSize::from_ordinal(base_size),
                    scan_on_open: false,
                },
            )
            .await?;
            println!("Printed successfully!");
        }
        Commands::Profiles => {
            for profile in PrinterProfile::built_in() {
                println!(
                    "{:<16} {} columns, {}-byte chunks, bitmap {}, reset {}",
                    profile.name,
                    profile.line_budget,
                    profile.chunk_limit,
                    if profile.supports_bitmap { "yes" } else { "no" },
                    if profile.reset_before_print { "yes" } else { "no" },
                );
            }
        }
    }

    Ok(())
}

async fn print_file(
    json: &str,
    mac: &str,
    channel: u8,
    options: SessionOptions,
) -> Result<(), BonprintError> {
    let adapter = RfcommAdapter::new(channel).with_printer(mac, "printer")?;
    let (session, mut events) = Session::new(Arc::new(adapter));
    session.open(options)?;
    session.connect_by_address(mac)?;

    let connected = tokio::time::timeout(CONNECT_TIMEOUT, async {
        while let Some(event) = events.recv().await {
            match event {
                PrinterEvent::DeviceConnected(_) => return Ok(()),
                PrinterEvent::ConnectFailed { description, .. } => {
                    return Err(BonprintError::transport(description));
                }
                _ => {}
            }
        }
        Err(BonprintError::transport("event stream closed"))
    })
    .await
    .map_err(|_| BonprintError::transport("timed out waiting for the printer"))?;
    connected?;

    let result = session.print_descriptors(json).await;
    session.close();
    result
}

/// 16 bytes per row: offset, hex, printable ASCII.
fn hex_dump(bytes: &[u8]) -> String {
    let mut out = String::new();
    for (row, chunk) in bytes.chunks(16).enumerate() {
        let hex: Vec<String> = chunk.iter().map(|b| format!("{:02X}", b)).collect();
        let ascii: String = chunk
            .iter()
            .map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { '.' })
            .collect();
        out.push_str(&format!("{:08X}  {:<47}  {}\n", row * 16, hex.join(" "), ascii));
    }
    out
}

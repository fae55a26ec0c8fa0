use amfiprot_core::connection::Connection;
use amfiprot_core::device::Device;
use amfiprot_core::endpoint::discover_default;
use amfiprot_core::transport::hid::HidTransport;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use clap_verbosity_flag::Verbosity;
use std::path::PathBuf;

/// Talks to an Amfiprot device over USB-HID.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// USB vendor ID of the device, in hex (e.g. 1a86).
    #[arg(long, value_parser = parse_hex_u16)]
    vid: u16,

    /// USB product ID of the device, in hex (e.g. 5512).
    #[arg(long, value_parser = parse_hex_u16)]
    pid: u16,

    /// HID interface number to claim.
    #[arg(long, default_value_t = 0)]
    interface: u8,

    /// Interrupt IN endpoint address.
    #[arg(long, default_value_t = 0x81)]
    endpoint_in: u8,

    /// Interrupt OUT endpoint address.
    #[arg(long, default_value_t = 0x01)]
    endpoint_out: u8,

    #[command(flatten)]
    verbosity: Verbosity,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Broadcast a discovery request and list responding endpoints.
    Discover,
    /// Print the device name of the first discovered endpoint.
    Name,
    /// Print the firmware version of the first discovered endpoint.
    FirmwareVersion,
    /// Read the full configuration snapshot and print it as JSON.
    ReadConfig {
        /// Write the snapshot to this file instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Write a configuration snapshot from a JSON file.
    WriteConfig {
        #[arg(long)]
        input: PathBuf,
    },
    /// Reboot the first discovered endpoint.
    Reboot,
}

fn parse_hex_u16(s: &str) -> Result<u16, String> {
    u16::from_str_radix(s.trim_start_matches("0x"), 16).map_err(|e| e.to_string())
}

async fn open_transport(cli: &Cli) -> Result<HidTransport> {
    let device_info = nusb::list_devices()
        .await?
        .find(|d| d.vendor_id() == cli.vid && d.product_id() == cli.pid)
        .context("no matching USB device found")?;
    let device = device_info.open().await?;
    let transport = HidTransport::open(&device, cli.interface, cli.endpoint_in, cli.endpoint_out).await?;
    Ok(transport)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity.tracing_level_filter())
        .init();

    let mut transport = open_transport(&cli).await?;
    let endpoints = discover_default(&mut transport).await?;
    if endpoints.is_empty() {
        anyhow::bail!("no endpoints responded to discovery");
    }
    tracing::info!(count = endpoints.len(), "discovered endpoints");

    // This CLI is a one-shot tool: a lost device is not reacquired mid-command.
    let mut connection = Connection::start(transport, || async {
        Err(amfiprot_core::AmfiprotError::ConnectionError)
    });

    let mut first_tx_id = None;
    for (tx_id, info) in &endpoints {
        println!("endpoint tx_id={tx_id} uuid={} name={:?}", info.uuid, info.name);
        first_tx_id.get_or_insert(*tx_id);
    }
    connection.sync_endpoints(endpoints);

    match cli.command {
        Command::Discover => {}
        Command::Name => {
            let tx_id = first_tx_id.context("no endpoint to query")?;
            let mut device = Device::new(&mut connection, tx_id);
            println!("{}", device.name().await?);
        }
        Command::FirmwareVersion => {
            let tx_id = first_tx_id.context("no endpoint to query")?;
            let mut device = Device::new(&mut connection, tx_id);
            let (major, minor, patch, build) = device.firmware_version().await?;
            println!("{major}.{minor}.{patch} (build {build})");
        }
        Command::ReadConfig { output } => {
            let tx_id = first_tx_id.context("no endpoint to query")?;
            let mut device = Device::new(&mut connection, tx_id);
            let snapshot = device.read_all_config().await?;
            let json = serde_json::to_string_pretty(&snapshot)?;
            match output {
                Some(path) => std::fs::write(path, json)?,
                None => println!("{json}"),
            }
        }
        Command::WriteConfig { input } => {
            let tx_id = first_tx_id.context("no endpoint to query")?;
            let json = std::fs::read_to_string(input)?;
            let snapshot = serde_json::from_str(&json)?;
            let mut device = Device::new(&mut connection, tx_id);
            device.write_all_config(&snapshot).await?;
            println!("configuration written");
        }
        Command::Reboot => {
            let tx_id = first_tx_id.context("no endpoint to query")?;
            let mut device = Device::new(&mut connection, tx_id);
            device.reboot().await?;
            println!("reboot requested");
        }
    }

    connection.stop().await;
    Ok(())
}

//! Echo every peer message back as a notification
//!
//! Run with `cargo run -p remotebit-ble --example echo [-- --verbose]`, then connect with
//! any BLE central, subscribe to the outbound characteristic and write to the inbound one.

use std::sync::Arc;

use clap::Parser;
use remotebit_ble::start_service;
use remotebit_core::{
    ChannelConfig, ChannelEvent, ComponentId, ReceivedComponent, RemoteBit, SecurityLevel,
    SendComponent, TxPower, MAX_PACKET_SIZE,
};
use tokio::sync::Notify;
use tracing::info;

#[derive(Parser)]
#[command(name = "echo")]
#[command(about = "Echo remote:bit peer messages back as notifications")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Advertised device name prefix
    #[arg(long, default_value = "remotebit")]
    name: String,

    /// Transmit power level (0-7)
    #[arg(long, default_value_t = 6)]
    tx_power: u8,

    /// Accept writes over unencrypted links
    #[arg(long)]
    open: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let security = if cli.open {
        SecurityLevel::Open
    } else {
        SecurityLevel::Encrypted
    };
    let config = ChannelConfig::new()
        .with_device_name_prefix(cli.name)
        .with_security(security)
        .with_tx_power(TxPower::saturating(cli.tx_power));
    let channel = start_service(config).await?;

    // Bridge data-received events to the async loop
    let wake = Arc::new(Notify::new());
    {
        let wake = wake.clone();
        channel.on_event(move |event: &ChannelEvent| {
            let (source, value) = event.bus_id();
            tracing::debug!("Event {}:{}", source, value);
            wake.notify_one();
        });
    }

    let mut remote = RemoteBit::new(channel);
    let button = ComponentId::new(0).ok_or("invalid component id")?;
    remote.on_received_values(ReceivedComponent::Button, button, |values| {
        info!("Button 0: {:?}", values);
    });

    info!("Echo service running, press Ctrl-C to stop");
    let mut buf = [0u8; MAX_PACKET_SIZE];
    loop {
        tokio::select! {
            _ = wake.notified() => {}
            _ = tokio::signal::ctrl_c() => break,
        }

        let capacity = remote.channel().capacity();
        let n = remote.channel().read(&mut buf[..capacity]);
        if n == 0 {
            continue;
        }
        info!("Received {} bytes", n);

        let message = &buf[..n];
        if remote.dispatcher().dispatch(message) {
            remote.send_values(SendComponent::Speed, button, &[n as u16]);
        } else {
            remote.channel().write(message);
        }
    }

    info!("Shutting down");
    Ok(())
}

fn setup_logging(verbose: bool) {
    let log_level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();
}

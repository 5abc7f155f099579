// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

mod config;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::signal;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::watch;
use tracing::{error, info, warn};

use trx_app::init_logging;
use trx_channel::{FileIqSource, SampleFormat, SdrPipeline};
use trx_core::decode::{DecodeEvent, DecodedMessage};
use trx_core::DynResult;

use config::ServerConfig;
use trx_decode_log::DecoderLoggers;

const PKG_DESCRIPTION: &str = concat!(env!("CARGO_PKG_NAME"), " - multi-channel SDR receiver");
const DECODE_BROADCAST_CAPACITY: usize = 256;
/// How long the DSP threads get to drain after Ctrl+C.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Parser)]
#[command(
    author = env!("CARGO_PKG_AUTHORS"),
    version = env!("CARGO_PKG_VERSION"),
    about = PKG_DESCRIPTION,
)]
struct Cli {
    /// Path to configuration file
    #[arg(long = "config", short = 'C', value_name = "FILE")]
    config: Option<PathBuf>,
    /// Print example configuration and exit
    #[arg(long = "print-config")]
    print_config: bool,
    /// IQ input file, or "-" for stdin
    #[arg(short = 'i', long = "input", value_name = "PATH")]
    input: Option<String>,
    /// IQ sample format (cs16, cu8, cf32)
    #[arg(long = "format")]
    format: Option<SampleFormat>,
    /// IQ sample rate in Hz
    #[arg(short = 's', long = "sample-rate")]
    sample_rate: Option<u32>,
    /// Throttle input to the sample rate
    #[arg(long = "realtime")]
    realtime: bool,
    /// Loop the input file
    #[arg(long = "repeat")]
    repeat: bool,
    /// Log level (trace, debug, info, warn, error)
    #[arg(long = "log-level")]
    log_level: Option<String>,
}

/// Command-line flags take precedence over the file.
fn apply_cli_overrides(cfg: &mut ServerConfig, cli: &Cli) {
    if let Some(ref input) = cli.input {
        cfg.input.path = input.clone();
    }
    if let Some(format) = cli.format {
        cfg.input.format = format;
    }
    if let Some(rate) = cli.sample_rate {
        cfg.input.sample_rate = rate;
    }
    cfg.input.realtime |= cli.realtime;
    cfg.input.repeat |= cli.repeat;
    if let Some(ref level) = cli.log_level {
        cfg.general.log_level = Some(level.clone());
    }
}

/// One-line human summary of a decoded message.
fn describe(message: &DecodedMessage) -> String {
    match message {
        DecodedMessage::Pocsag(msg) => {
            let text = if msg.alpha.is_empty() {
                &msg.numeric
            } else {
                &msg.alpha
            };
            format!("addr {} fn {} \"{}\"", msg.address, msg.function_bits, text)
        }
        DecodedMessage::Rds(data) => format!(
            "PI {:04X} PS {:?} RT {:?}",
            data.pi,
            data.program_service.as_deref().unwrap_or(""),
            data.radio_text.as_deref().unwrap_or("")
        ),
        DecodedMessage::Ax25(pkt) => {
            let mut route = format!("{}>{}", pkt.src_call, pkt.dest_call);
            if !pkt.path.is_empty() {
                route.push(',');
                route.push_str(&pkt.path);
            }
            format!("{}: {}", route, pkt.info)
        }
        DecodedMessage::Ais(msg) => match (msg.lat, msg.lon) {
            (Some(lat), Some(lon)) => format!(
                "type {} MMSI {} at {:.5},{:.5}",
                msg.message_type, msg.mmsi, lat, lon
            ),
            _ => format!("type {} MMSI {}", msg.message_type, msg.mmsi),
        },
        DecodedMessage::Radiosonde(frame) => {
            let mut line = format!(
                "{} frame {}",
                frame.serial.as_deref().unwrap_or("?"),
                frame
                    .frame_number
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| "?".to_string())
            );
            if let (Some(lat), Some(lon), Some(alt)) =
                (frame.latitude, frame.longitude, frame.altitude_m)
            {
                line.push_str(&format!(" at {:.5},{:.5} {:.0} m", lat, lon, alt));
            }
            line
        }
    }
}

/// Logs every decode and hands it to the file loggers. Ends once every
/// channel worker has dropped its sender.
async fn run_decode_reporter(
    mut decode_rx: broadcast::Receiver<DecodeEvent>,
    loggers: Option<Arc<DecoderLoggers>>,
) -> u64 {
    let mut count = 0;
    loop {
        match decode_rx.recv().await {
            Ok(event) => {
                count += 1;
                info!(
                    "[{}] {}: {}",
                    event.channel_id,
                    event.message.decoder_name(),
                    describe(&event.message)
                );
                if let Some(ref loggers) = loggers {
                    loggers.log(&event);
                }
            }
            Err(RecvError::Lagged(n)) => {
                warn!("decode reporter: dropped {} messages", n);
            }
            Err(RecvError::Closed) => break,
        }
    }
    count
}

#[tokio::main]
async fn main() -> DynResult<()> {
    let cli = Cli::parse();

    if cli.print_config {
        println!("{}", ServerConfig::example_combined_toml());
        return Ok(());
    }

    let (mut cfg, config_path) = if let Some(ref path) = cli.config {
        let cfg = ServerConfig::load_from_file(path)?;
        (cfg, Some(path.clone()))
    } else {
        ServerConfig::load_from_default_paths()?
    };
    apply_cli_overrides(&mut cfg, &cli);
    cfg.validate()
        .map_err(|e| format!("Invalid server configuration: {}", e))?;

    init_logging(cfg.general.log_level.as_deref());

    if let Some(ref path) = config_path {
        info!("Loaded configuration from {}", path.display());
    }

    let source = FileIqSource::open(&cfg.input.path, cfg.input.format, cfg.input.repeat)?;
    info!(
        "IQ input {} ({}, {} S/s{})",
        cfg.input.path,
        cfg.input.format,
        cfg.input.sample_rate,
        if cfg.input.realtime { ", realtime" } else { "" }
    );

    let decoder_logs = match DecoderLoggers::from_config(&cfg.decode_logs) {
        Ok(v) => v,
        Err(e) => {
            warn!("Decoder file logging disabled: {}", e);
            None
        }
    };

    let (decode_tx, decode_rx) = broadcast::channel::<DecodeEvent>(DECODE_BROADCAST_CAPACITY);
    let reporter = tokio::spawn(run_decode_reporter(decode_rx, decoder_logs));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let pipeline = SdrPipeline::start(
        Box::new(source),
        &cfg.input.pipeline(),
        &cfg.channel_settings(),
        decode_tx,
        shutdown_rx,
    )?;
    info!("{} channel(s) running", pipeline.channels().len());

    let mut pipeline_done = tokio::task::spawn_blocking(move || pipeline.join());

    tokio::select! {
        res = signal::ctrl_c() => {
            res?;
            info!("Ctrl+C received, shutting down");
            let _ = shutdown_tx.send(true);
            match tokio::time::timeout(SHUTDOWN_GRACE, &mut pipeline_done).await {
                Ok(Err(e)) => error!("DSP join failed: {:?}", e),
                Ok(Ok(())) => {}
                Err(_) => {
                    warn!("DSP threads still busy after {:?}; exiting", SHUTDOWN_GRACE);
                    return Ok(());
                }
            }
        }
        res = &mut pipeline_done => {
            if let Err(e) = res {
                error!("DSP join failed: {:?}", e);
            }
            info!("Input finished");
        }
    }

    match tokio::time::timeout(SHUTDOWN_GRACE, reporter).await {
        Ok(Ok(count)) => info!("{} message(s) decoded", count),
        Ok(Err(e)) => error!("Decode reporter failed: {:?}", e),
        Err(_) => warn!("Decode reporter did not finish"),
    }
    Ok(())
}

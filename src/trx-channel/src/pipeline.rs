// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Multi-channel pipeline: one reader thread hands bursts of IQ samples to
//! one worker thread per channel.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use num_complex::Complex;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, error, info, warn};
use trx_core::decode::{DecodeEvent, DecodedMessage};
use trx_core::ChannelSettings;

use crate::dsp::ChannelDsp;
use crate::source::{IqSource, IqSourceError};

/// Bursts buffered per channel before the reader blocks.
const BURST_QUEUE_DEPTH: usize = 16;
/// PCM broadcast capacity: enough for several frames of latency.
const PCM_BROADCAST_CAPACITY: usize = 32;

type Burst = Arc<Vec<Complex<f32>>>;

/// Control messages for a running channel, applied between bursts.
#[derive(Debug, Clone)]
pub enum ChannelCommand {
    ApplySettings(ChannelSettings),
    Resync,
}

/// Caller-side handle to one running channel.
#[derive(Debug, Clone)]
pub struct ChannelHandle {
    id: String,
    commands: mpsc::UnboundedSender<ChannelCommand>,
    pcm_tx: broadcast::Sender<Vec<f32>>,
}

impl ChannelHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Queue new settings. Returns false once the channel has stopped.
    pub fn apply_settings(&self, settings: ChannelSettings) -> bool {
        self.commands
            .send(ChannelCommand::ApplySettings(settings))
            .is_ok()
    }

    pub fn resync(&self) -> bool {
        self.commands.send(ChannelCommand::Resync).is_ok()
    }

    /// Demodulated audio in fixed-size frames at the channel's audio rate.
    pub fn subscribe_audio(&self) -> broadcast::Receiver<Vec<f32>> {
        self.pcm_tx.subscribe()
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Input IQ rate (Hz).
    pub sample_rate: u32,
    /// Samples per burst.
    pub block_size: usize,
    /// Pace reads to the sample rate instead of running flat out.
    pub realtime: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 2_048_000,
            block_size: 16_384,
            realtime: false,
        }
    }
}

/// Handle to the running DSP threads.
pub struct SdrPipeline {
    channels: Vec<ChannelHandle>,
    threads: Vec<JoinHandle<()>>,
}

impl SdrPipeline {
    /// Spawn the reader and one worker per channel.
    ///
    /// Decoded messages from every channel go out on `decode_tx`. The
    /// reader stops at end of stream or when `shutdown` turns true; workers
    /// then drain their queues and exit.
    pub fn start(
        source: Box<dyn IqSource>,
        config: &PipelineConfig,
        channels: &[ChannelSettings],
        decode_tx: broadcast::Sender<DecodeEvent>,
        shutdown: watch::Receiver<bool>,
    ) -> io::Result<Self> {
        trx_dsp::init();

        let mut handles = Vec::with_capacity(channels.len());
        let mut burst_senders = Vec::with_capacity(channels.len());
        let mut threads = Vec::with_capacity(channels.len() + 1);

        for settings in channels {
            let (burst_tx, burst_rx) = mpsc::channel::<Burst>(BURST_QUEUE_DEPTH);
            let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
            let (pcm_tx, _pcm_rx) = broadcast::channel::<Vec<f32>>(PCM_BROADCAST_CAPACITY);

            let dsp = ChannelDsp::new(settings, config.sample_rate, pcm_tx.clone());
            info!(
                "channel {}: {} at {:+.0} Hz, {} S/s processing",
                settings.id,
                dsp.mode(),
                dsp.settings().offset_hz,
                dsp.mode().processing_rate()
            );
            let decode_tx = decode_tx.clone();
            threads.push(
                thread::Builder::new()
                    .name(format!("chan-{}", settings.id))
                    .spawn(move || channel_worker(dsp, burst_rx, cmd_rx, decode_tx))?,
            );

            burst_senders.push(burst_tx);
            handles.push(ChannelHandle {
                id: settings.id.clone(),
                commands: cmd_tx,
                pcm_tx,
            });
        }

        let config = config.clone();
        threads.push(
            thread::Builder::new()
                .name("sdr-iq-read".to_string())
                .spawn(move || iq_read_loop(source, config, burst_senders, shutdown))?,
        );

        Ok(Self {
            channels: handles,
            threads,
        })
    }

    pub fn channels(&self) -> &[ChannelHandle] {
        &self.channels
    }

    pub fn channel(&self, id: &str) -> Option<&ChannelHandle> {
        self.channels.iter().find(|c| c.id == id)
    }

    /// Wait for the reader and every worker to finish.
    pub fn join(self) {
        for handle in self.threads {
            let name = handle.thread().name().unwrap_or("dsp").to_string();
            if handle.join().is_err() {
                error!("{} thread panicked", name);
            }
        }
    }
}

/// Reads bursts from `source` and hands each to every channel.
fn iq_read_loop(
    mut source: Box<dyn IqSource>,
    config: PipelineConfig,
    mut bursts: Vec<mpsc::Sender<Burst>>,
    shutdown: watch::Receiver<bool>,
) {
    let mut block = vec![Complex::new(0.0_f32, 0.0_f32); config.block_size.max(1)];
    let rate = f64::from(config.sample_rate.max(1));
    let started = Instant::now();
    let mut total: u64 = 0;

    loop {
        if *shutdown.borrow() {
            info!("IQ reader stopping");
            break;
        }
        let n = match source.read_into(&mut block) {
            Ok(0) => {
                thread::sleep(Duration::from_millis(1));
                continue;
            }
            Ok(n) => n,
            Err(IqSourceError::EndOfStream) => {
                info!(
                    "IQ stream ended after {} samples ({:.1} s)",
                    total,
                    total as f64 / rate
                );
                break;
            }
            Err(e) => {
                error!("{}", e);
                break;
            }
        };

        let burst: Burst = Arc::new(block[..n].to_vec());
        bursts.retain(|tx| tx.blocking_send(Arc::clone(&burst)).is_ok());
        if bursts.is_empty() {
            warn!("all channels stopped; IQ reader exiting");
            break;
        }

        total += n as u64;
        if config.realtime {
            let due = Duration::from_secs_f64(total as f64 / rate);
            if let Some(wait) = due.checked_sub(started.elapsed()) {
                thread::sleep(wait);
            }
        }
    }
}

/// Owns one channel's DSP. Commands are only looked at between bursts.
fn channel_worker(
    mut dsp: ChannelDsp,
    mut bursts: mpsc::Receiver<Burst>,
    mut commands: mpsc::UnboundedReceiver<ChannelCommand>,
    decode_tx: broadcast::Sender<DecodeEvent>,
) {
    let id = dsp.settings().id.clone();
    let mut messages = Vec::new();

    while let Some(burst) = bursts.blocking_recv() {
        while let Ok(command) = commands.try_recv() {
            match command {
                ChannelCommand::ApplySettings(mut settings) => {
                    settings.id = id.clone();
                    dsp.apply_settings(&settings, false);
                    info!("channel {}: settings applied ({})", id, dsp.mode());
                }
                ChannelCommand::Resync => {
                    debug!("channel {}: resync", id);
                    dsp.resync(&mut messages);
                }
            }
        }
        dsp.feed(&burst, &mut messages);
        publish(&id, &mut messages, &decode_tx);
    }

    dsp.resync(&mut messages);
    publish(&id, &mut messages, &decode_tx);
    debug!("channel {} stopped", id);
}

fn publish(id: &str, messages: &mut Vec<DecodedMessage>, decode_tx: &broadcast::Sender<DecodeEvent>) {
    for message in messages.drain(..) {
        // No subscribers is fine.
        let _ = decode_tx.send(DecodeEvent {
            channel_id: id.to_string(),
            message,
        });
    }
}

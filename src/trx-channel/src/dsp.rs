// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Per-channel DSP: frequency translation, resampling to the mode's
//! processing rate, squelch, the demodulator sink, and audio framing.

use num_complex::Complex;
use tokio::sync::broadcast;
use tracing::{debug, warn};
use trx_core::decode::DecodedMessage;
use trx_core::{ChannelSettings, DemodMode};
use trx_dsp::{Nco, Resampler, Squelch};

use crate::demod::{ChannelSink, SinkOutput};

/// Samples the squelch averages power over.
const SQUELCH_AVERAGE_LEN: usize = 32;

/// Per-channel DSP state: mixer, resampler, squelch, sink, frame accumulator.
pub struct ChannelDsp {
    settings: ChannelSettings,
    input_rate: u32,
    nco: Nco,
    resampler: Resampler<Complex<f32>>,
    squelch: Squelch,
    sink: ChannelSink,
    /// Baseband at the processing rate for the current burst.
    baseband: Vec<Complex<f32>>,
    out: SinkOutput,
    /// Accumulator for output PCM frames.
    frame_buf: Vec<f32>,
    pcm_tx: broadcast::Sender<Vec<f32>>,
}

fn resampler_cutoff(settings: &ChannelSettings) -> f64 {
    let rate = settings.mode.processing_rate() as f32;
    f64::from((settings.rf_bandwidth_hz / 2.0).min(rate * 0.45))
}

fn sanitize(settings: &ChannelSettings, input_rate: u32) -> ChannelSettings {
    let (clean, notes) = settings.sanitized(input_rate);
    for note in notes {
        warn!("channel {}: {}", settings.id, note);
    }
    clean
}

impl ChannelDsp {
    /// Build a channel over an input stream at `input_rate`. Completed
    /// audio frames go out on `pcm_tx`.
    pub fn new(
        settings: &ChannelSettings,
        input_rate: u32,
        pcm_tx: broadcast::Sender<Vec<f32>>,
    ) -> Self {
        let settings = sanitize(settings, input_rate);
        let rate = f64::from(input_rate.max(1));
        let mut nco = Nco::new();
        nco.set_freq(settings.offset_hz, rate);
        Self {
            nco,
            resampler: Resampler::new(
                rate,
                f64::from(settings.mode.processing_rate()),
                resampler_cutoff(&settings),
            ),
            squelch: Squelch::new(
                settings.squelch_power(),
                settings.squelch_gate,
                SQUELCH_AVERAGE_LEN,
            ),
            sink: ChannelSink::for_settings(&settings),
            baseband: Vec::new(),
            out: SinkOutput::default(),
            frame_buf: Vec::with_capacity(settings.audio_frame * 2),
            pcm_tx,
            input_rate,
            settings,
        }
    }

    pub fn settings(&self) -> &ChannelSettings {
        &self.settings
    }

    pub fn mode(&self) -> DemodMode {
        self.sink.mode()
    }

    pub fn squelch_open(&self) -> bool {
        self.squelch.is_open()
    }

    /// Swap in new settings between bursts. With `force`, or when the
    /// change alters the sink's structure, the sink is rebuilt and any
    /// frame being assembled is dropped.
    pub fn apply_settings(&mut self, settings: &ChannelSettings, force: bool) {
        let new = sanitize(settings, self.input_rate);
        let rate = f64::from(self.input_rate.max(1));

        if force || ChannelSink::needs_rebuild(&self.settings, &new) {
            debug!("channel {}: rebuilding {} sink", new.id, new.mode);
            self.sink = ChannelSink::for_settings(&new);
        } else {
            self.sink.update(&new);
        }

        if force {
            self.nco.reset();
            self.squelch.reset();
        }
        self.nco.set_freq(new.offset_hz, rate);
        self.resampler.configure(
            rate,
            f64::from(new.mode.processing_rate()),
            resampler_cutoff(&new),
            force,
        );
        self.squelch.set_threshold(new.squelch_power());
        self.squelch.set_gate(new.squelch_gate);
        if force || new.audio_rate != self.settings.audio_rate {
            self.frame_buf.clear();
        }
        self.settings = new;
    }

    /// Drop carrier, clock and frame state. A message still being
    /// assembled is pushed to `messages`.
    pub fn resync(&mut self, messages: &mut Vec<DecodedMessage>) {
        self.out.clear();
        self.sink.resync(&mut self.out);
        messages.append(&mut self.out.messages);
    }

    /// Run one burst of input samples through the chain.
    pub fn feed(&mut self, block: &[Complex<f32>], messages: &mut Vec<DecodedMessage>) {
        self.baseband.clear();
        for &sample in block {
            let mixed = sample * self.nco.next_iq();
            let baseband = &mut self.baseband;
            self.resampler.process(mixed, |y| baseband.push(y));
        }
        for s in &mut self.baseband {
            if !self.squelch.feed(f64::from(s.norm_sqr())) {
                *s = Complex::default();
            }
        }

        self.out.clear();
        self.sink.feed(&self.baseband, &mut self.out);
        messages.append(&mut self.out.messages);

        self.frame_buf.extend_from_slice(&self.out.audio);
        let frame_size = self.settings.audio_frame.max(1);
        while self.frame_buf.len() >= frame_size {
            let frame: Vec<f32> = self.frame_buf.drain(..frame_size).collect();
            // No receivers is fine.
            let _ = self.pcm_tx.send(frame);
        }
    }
}

// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use num_complex::Complex;
use trx_core::{ChannelSettings, DemodMode};
use trx_dsp::{CarrierLoop, FftFilter, PhaseDiscriminator, Pll, Resampler};

use super::{fm_scaling, DcBlocker, SinkOutput};

const SSB_FFT_LEN: usize = 1_024;
/// Lower edge of the SSB passband.
const SSB_LOW_CUT_HZ: f32 = 300.0;
const DC_POLE: f32 = 0.999;

/// Voice demodulator: NFM discriminator, AM envelope or synchronous
/// detector, or SSB sideband filter, followed by resampling to the
/// audio rate.
pub struct AnalogSink {
    mode: DemodMode,
    rate: u32,
    discri: PhaseDiscriminator,
    /// Carrier PLL for AM synchronous detection.
    carrier: Option<Pll>,
    sideband: Option<FftFilter>,
    dc: DcBlocker,
    audio: Resampler<f32>,
    audio_rate: u32,
    audio_cutoff_hz: f32,
    demod: Vec<f32>,
}

impl AnalogSink {
    pub fn new(settings: &ChannelSettings) -> Self {
        let mode = settings.mode;
        let rate = mode.processing_rate();
        let bw = settings.rf_bandwidth_hz;

        let carrier = (mode == DemodMode::Am && settings.am_sync).then(|| {
            let pll = &settings.pll;
            Pll::new(pll.bandwidth, pll.damping, pll.gain, 1)
        });
        let sideband = match mode {
            DemodMode::Usb | DemodMode::Lsb => {
                let mut filter = FftFilter::new(SSB_FFT_LEN);
                let low = SSB_LOW_CUT_HZ.min(bw / 2.0) / rate as f32;
                let high = bw / rate as f32;
                if mode == DemodMode::Usb {
                    filter.create_filter(low, high);
                } else {
                    filter.create_filter(-high, -low);
                }
                Some(filter)
            }
            _ => None,
        };

        // SSB bandwidth is one-sided, the others are centred on the carrier.
        let audio_bw = if sideband.is_some() { bw } else { bw / 2.0 };
        let audio_cutoff_hz = audio_bw.min(settings.audio_rate as f32 * 0.45);

        Self {
            mode,
            rate,
            discri: PhaseDiscriminator::new(fm_scaling(rate, settings.deviation_hz())),
            carrier,
            sideband,
            dc: DcBlocker::new(DC_POLE),
            audio: Resampler::new(
                f64::from(rate),
                f64::from(settings.audio_rate),
                f64::from(audio_cutoff_hz),
            ),
            audio_rate: settings.audio_rate,
            audio_cutoff_hz,
            demod: Vec::new(),
        }
    }

    pub fn mode(&self) -> DemodMode {
        self.mode
    }

    pub fn update(&mut self, settings: &ChannelSettings) {
        self.discri
            .set_fm_scaling(fm_scaling(self.rate, settings.deviation_hz()));
        if let Some(pll) = &mut self.carrier {
            let p = &settings.pll;
            pll.set_params(p.bandwidth, p.damping, p.gain);
        }
    }

    pub fn reset(&mut self) {
        self.discri.reset();
        if let Some(pll) = &mut self.carrier {
            pll.reset();
        }
        if let Some(filter) = &mut self.sideband {
            filter.reset();
        }
        self.dc.reset();
        self.audio.configure(
            f64::from(self.rate),
            f64::from(self.audio_rate),
            f64::from(self.audio_cutoff_hz),
            true,
        );
    }

    fn demodulate(&mut self, s: Complex<f32>) {
        match self.mode {
            DemodMode::Am => {
                let v = match &mut self.carrier {
                    Some(pll) => {
                        pll.feed(s);
                        (s * pll.complex().conj()).re
                    }
                    None => s.norm(),
                };
                self.demod.push(self.dc.process(v));
            }
            DemodMode::Usb | DemodMode::Lsb => {
                if let Some(block) = self.sideband.as_mut().and_then(|f| f.feed(s)) {
                    self.demod.extend(block.iter().map(|c| c.re));
                }
            }
            _ => {
                let v = self.discri.discriminate(s);
                self.demod.push(self.dc.process(v));
            }
        }
    }

    pub fn feed(&mut self, samples: &[Complex<f32>], out: &mut SinkOutput) {
        self.demod.clear();
        for &s in samples {
            self.demodulate(s);
        }
        self.audio.process_block(&self.demod, &mut out.audio);
    }
}

// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Receive-side channel pipeline: IQ sources, per-channel DSP and the
//! threads that run them.

pub mod demod;
pub mod dsp;
pub mod pipeline;
pub mod source;

pub use demod::{ChannelSink, SinkOutput};
pub use dsp::ChannelDsp;
pub use pipeline::{ChannelCommand, ChannelHandle, PipelineConfig, SdrPipeline};
pub use source::{FileIqSource, IqSource, IqSourceError, MockIqSource, SampleFormat};

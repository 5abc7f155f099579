// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

pub mod channel;
pub mod decode;
pub mod hdlc;
pub mod math;
pub mod sync;

pub type DynResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

pub use channel::{ChannelSettings, DemodMode, LoopSettings};
pub use decode::{DecodeEvent, DecodedMessage};
pub use hdlc::{HdlcDeframer, NrziDecoder};
pub use sync::{SyncMonitor, SyncState};

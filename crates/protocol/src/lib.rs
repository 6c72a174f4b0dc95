// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

#![cfg_attr(not(debug_assertions), deny(warnings))]

pub use decode::Decoder;
pub use encode::{encode, encode_to_vec};
pub use error::FrameError;
pub use frame::Frame;

mod decode;
mod encode;
mod error;
mod frame;

pub type Result<T> = std::result::Result<T, FrameError>;

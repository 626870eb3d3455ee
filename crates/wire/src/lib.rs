// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Frame protocol between the supervisor and its worker process.
//!
//! Wire format: 4-byte length prefix (big-endian) + JSON payload.
//! Parent→worker frames travel on the child's stdin, worker→parent frames
//! on its stdout.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod frame;
mod message;

pub use frame::{decode, encode, read_frame, write_frame, ProtocolError, MAX_FRAME_LEN};
pub use message::{LogFrame, LogLevel, ParentMessage, WorkerInput, WorkerMessage};

// Unless explicitly stated otherwise all files in this repository are licensed
// under the MIT/Apache-2.0 License, at your convenience
//
// This product includes software developed at Datadog (https://www.datadoghq.com/). Copyright 2020
// Datadog, Inc.
//
//! # gate-stream - a binary gate derived from a stream of signals.
//!
//! ## What is gate-stream
//!
//! gate-stream turns a stream of boolean *requests* (`true` = acquire,
//! `false` = release) into a stream of boolean *gate states*. The state is
//! derived from the running balance of acquires over releases:
//!
//! ```text
//! balance = number of acquires - number of releases seen so far
//! locked  = balance < 1
//! ```
//!
//! One state is produced for every event, in the same order, as soon as the
//! event arrives. There is no lock object to poll: consumers simply observe
//! the stream of transitions.
//!
//! Note the polarity. The gate reads as *locked* while no acquire is
//! outstanding and as *unlocked* once acquires outnumber releases.
//!
//! ### Streams
//!
//! Any [`Stream`](futures_lite::Stream) of events can be gated:
//!
//! ```
//! use futures_lite::{future::block_on, stream, StreamExt};
//! use gate_stream::GateStreamExt;
//!
//! let states: Vec<bool> = block_on(stream::iter(vec![true, true, false, false]).gate().collect());
//! assert_eq!(states, vec![false, false, false, true]);
//! ```
//!
//! Fallible upstreams use [`TryGateStreamExt::try_gate`]: errors are handed
//! downstream unchanged and end the stream.
//!
//! ### Subscriptions
//!
//! The balance belongs to the gated stream itself. Every call to `gate`,
//! [`GateOperator::apply`] and friends is an independent subscription that
//! starts from a zero balance, and dropping it discards the balance. Two
//! subscriptions never observe each other.
//!
//! ### Sources
//!
//! [`subject::LocalSubject`] is a hot, single-threaded source that fans
//! events out to several subscribers and can be completed or failed.
//!
//! The fold requires events to arrive one at a time. When they are produced
//! on several threads, funnel them through the [`shared`] module: either a
//! [`SharedGate`](shared::SharedGate), which locks around each fold, or a
//! [`channel`](shared::channel) with a single consuming
//! [`GateReceiver`](shared::GateReceiver).

#![warn(missing_docs, missing_debug_implementations, rust_2018_idioms)]

mod accumulator;
mod error;
mod operator;
pub mod shared;
mod stream;
pub mod subject;

pub use crate::{
    accumulator::{contribution, gate_state, GateAccumulator, UNLOCK_THRESHOLD},
    error::{GateError, ResourceType, Result},
    operator::GateOperator,
    stream::{GateStreamExt, Gated, TryGateStreamExt, TryGated},
};

/// Provides common imports that almost all gate-stream applications will need
pub mod prelude {
    #[doc(no_inline)]
    pub use crate::{
        GateAccumulator,
        GateError,
        GateOperator,
        GateStreamExt,
        TryGateStreamExt,
    };
}

// Unless explicitly stated otherwise all files in this repository are licensed under the
// MIT/Apache-2.0 License, at your convenience
//
// This product includes software developed at Datadog (https://www.datadoghq.com/). Copyright 2020 Datadog, Inc.
//
use crate::stream::{GateStreamExt, Gated, TryGateStreamExt, TryGated};
use futures_lite::Stream;
use log::debug;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

/// A reusable gate definition that can be attached to any number of
/// upstreams.
///
/// The operator holds no balance of its own. Each [`apply`] or [`try_apply`]
/// is a new subscription starting from a zero balance, so the same operator
/// can be attached to several upstreams, concurrently or one after the other,
/// without them observing each other.
///
/// Clones share the subscription counter reported by [`subscriptions`].
///
/// # Examples
///
/// ```
/// use futures_lite::{future::block_on, stream, StreamExt};
/// use gate_stream::GateOperator;
///
/// let operator = GateOperator::new();
/// let first: Vec<bool> = block_on(operator.apply(stream::iter(vec![true])).collect());
/// let second: Vec<bool> = block_on(operator.apply(stream::iter(vec![false])).collect());
/// assert_eq!(first, vec![false]);
/// assert_eq!(second, vec![true]);
/// assert_eq!(operator.subscriptions(), 2);
/// ```
///
/// [`apply`]: GateOperator::apply
/// [`try_apply`]: GateOperator::try_apply
/// [`subscriptions`]: GateOperator::subscriptions
#[derive(Debug, Clone, Default)]
pub struct GateOperator {
    subscriptions: Arc<AtomicU64>,
}

impl GateOperator {
    /// Creates a new operator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes to `upstream`, yielding its gate states.
    pub fn apply<S>(&self, upstream: S) -> Gated<S>
    where
        S: Stream<Item = bool>,
    {
        self.opened();
        upstream.gate()
    }

    /// Subscribes to a fallible `upstream`. Errors are passed through
    /// unchanged and end the subscription.
    pub fn try_apply<S, E>(&self, upstream: S) -> TryGated<S>
    where
        S: Stream<Item = Result<bool, E>>,
    {
        self.opened();
        upstream.try_gate()
    }

    /// How many subscriptions this operator (or any of its clones) created.
    pub fn subscriptions(&self) -> u64 {
        self.subscriptions.load(Ordering::Relaxed)
    }

    fn opened(&self) {
        let id = self.subscriptions.fetch_add(1, Ordering::Relaxed);
        debug!("gate subscription {} opened", id);
    }
}

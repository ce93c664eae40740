// Unless explicitly stated otherwise all files in this repository are licensed under the
// MIT/Apache-2.0 License, at your convenience
//
// This product includes software developed at Datadog (https://www.datadoghq.com/). Copyright 2020 Datadog, Inc.
//
//! Gates fed from more than one thread.
//!
//! The fold is only correct if events reach it one at a time. Producers that
//! live on different threads must therefore be serialized before the fold:
//!
//! * [`SharedGate`] serializes synchronous callers with a lock around the
//!   fold step.
//! * [`channel`] funnels events from any number of [`EventSender`]s into a
//!   single [`GateReceiver`], whose consumer loop is the only place the
//!   balance is touched.
use crate::{
    accumulator::GateAccumulator,
    error::{GateError, ResourceType, Result},
    stream::{GateStreamExt, Gated},
};
use flume::{r#async::RecvStream, TrySendError};
use futures_lite::Stream;
use log::debug;
use pin_project_lite::pin_project;
use std::{
    fmt,
    pin::Pin,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    task::{Context, Poll},
};

/// A gate whose fold step is guarded by a lock, so it can be fed
/// concurrently from several threads.
///
/// Clones share the same balance. Each clone is a producer handle onto one
/// subscription, not a new subscription; call [`reset`](Self::reset) to start
/// over.
#[derive(Debug, Clone, Default)]
pub struct SharedGate {
    inner: Arc<Mutex<GateAccumulator>>,
}

impl SharedGate {
    /// Creates a gate with a zero balance.
    pub fn new() -> Self {
        Self::default()
    }

    // The accumulator is always left consistent, so a panic in another
    // holder does not invalidate it.
    fn lock(&self) -> MutexGuard<'_, GateAccumulator> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Folds `event` into the shared balance and returns the resulting gate
    /// state. Concurrent calls are applied one after the other.
    pub fn fold(&self, event: bool) -> bool {
        self.lock().fold(event)
    }

    /// Net outstanding acquisitions seen so far.
    pub fn balance(&self) -> i64 {
        self.lock().balance()
    }

    /// The state after the last folded event.
    pub fn is_locked(&self) -> bool {
        self.lock().is_locked()
    }

    /// Discards the balance, starting a new subscription.
    pub fn reset(&self) {
        self.lock().reset()
    }
}

/// Builds a multi-producer channel feeding a single gate.
///
/// # Examples
///
/// ```
/// use futures_lite::{future::block_on, StreamExt};
/// use gate_stream::shared::GateChannelBuilder;
///
/// let (sender, receiver) = GateChannelBuilder::new()
///     .capacity(Some(16))
///     .name("door")
///     .build();
///
/// let producer = std::thread::spawn(move || {
///     sender.try_send(true).unwrap();
///     sender.try_send(false).unwrap();
/// });
/// producer.join().unwrap();
///
/// let states: Vec<bool> = block_on(receiver.collect());
/// assert_eq!(states, vec![false, true]);
/// ```
#[derive(Debug, Clone)]
pub struct GateChannelBuilder {
    capacity: Option<usize>,
    name: String,
}

impl Default for GateChannelBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GateChannelBuilder {
    /// Creates a builder for an unbounded, unnamed channel.
    pub fn new() -> Self {
        Self {
            capacity: None,
            name: String::from("unnamed"),
        }
    }

    /// Bounds the number of events waiting to be folded. `None` (the default)
    /// leaves the channel unbounded.
    #[must_use = "The builder must be built to be useful"]
    pub fn capacity(mut self, capacity: Option<usize>) -> Self {
        self.capacity = capacity;
        self
    }

    /// Names the gate in log messages.
    #[must_use = "The builder must be built to be useful"]
    pub fn name(mut self, name: &str) -> Self {
        self.name = String::from(name);
        self
    }

    /// Creates the channel.
    pub fn build(self) -> (EventSender, GateReceiver) {
        let (sender, receiver) = match self.capacity {
            Some(capacity) => flume::bounded(capacity),
            None => flume::unbounded(),
        };
        debug!(
            "gate channel {} created with capacity {:?}",
            self.name, self.capacity
        );
        (
            EventSender { sender },
            GateReceiver {
                events: receiver.into_stream().gate(),
                name: self.name,
            },
        )
    }
}

/// Creates an unbounded multi-producer channel feeding a single gate.
pub fn channel() -> (EventSender, GateReceiver) {
    GateChannelBuilder::new().build()
}

/// Creates a multi-producer channel holding at most `capacity` pending
/// events.
pub fn bounded(capacity: usize) -> (EventSender, GateReceiver) {
    GateChannelBuilder::new().capacity(Some(capacity)).build()
}

/// Producer side of a gate channel. Cheap to clone and `Send`.
#[derive(Debug, Clone)]
pub struct EventSender {
    sender: flume::Sender<bool>,
}

impl EventSender {
    /// Sends an event, waiting for room if the channel is bounded and full.
    ///
    /// Returns [`GateError::Closed`] if the receiver was dropped.
    pub async fn send(&self, event: bool) -> Result<()> {
        self.sender
            .send_async(event)
            .await
            .map_err(|_| GateError::Closed(ResourceType::Channel))
    }

    /// Sends an event without waiting.
    ///
    /// Returns [`GateError::WouldBlock`] if the channel is full and
    /// [`GateError::Closed`] if the receiver was dropped.
    pub fn try_send(&self, event: bool) -> Result<()> {
        self.sender.try_send(event).map_err(|err| match err {
            TrySendError::Full(_) => GateError::WouldBlock(ResourceType::Channel),
            TrySendError::Disconnected(_) => GateError::Closed(ResourceType::Channel),
        })
    }

    /// Whether the receiver is gone.
    pub fn is_closed(&self) -> bool {
        self.sender.is_disconnected()
    }
}

pin_project! {
    /// Consumer side of a gate channel: the single place where events from
    /// all senders are folded, in arrival order.
    ///
    /// Ends once every [`EventSender`] is dropped and the pending events are
    /// drained.
    #[must_use = "streams do nothing unless polled"]
    pub struct GateReceiver {
        #[pin]
        events: Gated<RecvStream<'static, bool>>,
        name: String,
    }
}

impl GateReceiver {
    /// Net outstanding acquisitions folded so far.
    pub fn balance(&self) -> i64 {
        self.events.balance()
    }

    /// The name given by [`GateChannelBuilder::name`].
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for GateReceiver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GateReceiver")
            .field("name", &self.name)
            .field("balance", &self.balance())
            .finish()
    }
}

impl Stream for GateReceiver {
    type Item = bool;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.project().events.poll_next(cx)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.events.size_hint()
    }
}

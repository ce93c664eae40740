// Unless explicitly stated otherwise all files in this repository are licensed under the
// MIT/Apache-2.0 License, at your convenience
//
// This product includes software developed at Datadog (https://www.datadoghq.com/). Copyright 2020 Datadog, Inc.
//
//! A hot, single-threaded source of acquire/release events.
//!
//! A [`LocalSubject`] publishes every event to the receivers that are
//! subscribed at the time of publication. Each [`SubjectReceiver`] is a
//! `Stream<Item = Result<bool, E>>`, ready to be attached to a gate with
//! [`try_gate`](crate::TryGateStreamExt::try_gate).
//!
//! Termination is final: after [`complete`](LocalSubject::complete) or
//! [`error`](LocalSubject::error) no more events are delivered, and
//! receivers drain what was already published before they observe the end.
//!
//! # Examples
//!
//! ```
//! use futures_lite::{future::block_on, StreamExt};
//! use gate_stream::{subject::LocalSubject, TryGateStreamExt};
//!
//! let subject = LocalSubject::<()>::new();
//! let mut gate = subject.subscribe().try_gate();
//!
//! subject.next(true).unwrap();
//! subject.next(false).unwrap();
//! subject.complete();
//!
//! block_on(async {
//!     assert_eq!(gate.next().await, Some(Ok(false)));
//!     assert_eq!(gate.next().await, Some(Ok(true)));
//!     assert_eq!(gate.next().await, None);
//! });
//! ```
use crate::error::{GateError, ResourceType, Result};
use futures_lite::Stream;
use log::debug;
use std::{
    cell::RefCell,
    collections::{BTreeMap, VecDeque},
    fmt,
    pin::Pin,
    rc::Rc,
    task::{Context, Poll, Waker},
};

#[derive(Debug)]
enum Termination<E> {
    Completed,
    Failed(E),
}

#[derive(Debug)]
struct Subscriber<E> {
    queue: VecDeque<std::result::Result<bool, E>>,
    waker: Option<Waker>,
    closed: bool,
}

impl<E> Subscriber<E> {
    fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            waker: None,
            closed: false,
        }
    }
}

#[derive(Debug)]
struct SubjectState<E> {
    subscribers: BTreeMap<u64, Subscriber<E>>,
    next_id: u64,
    termination: Option<Termination<E>>,
}

impl<E> SubjectState<E> {
    // Applies `deliver` to every live subscriber and collects the wakers to
    // be woken once the state is no longer borrowed.
    fn broadcast<F>(&mut self, mut deliver: F) -> Vec<Waker>
    where
        F: FnMut(&mut Subscriber<E>),
    {
        self.subscribers
            .values_mut()
            .filter_map(|subscriber| {
                deliver(subscriber);
                subscriber.waker.take()
            })
            .collect()
    }
}

fn wake_all(wakers: Vec<Waker>) {
    for waker in wakers {
        waker.wake();
    }
}

/// Publisher side of a hot event source. See the [module
/// documentation](self).
///
/// Dropping the subject completes it.
pub struct LocalSubject<E> {
    state: Rc<RefCell<SubjectState<E>>>,
}

/// Receiving side of a [`LocalSubject`] subscription.
///
/// Dropping the receiver disposes the subscription: nothing else is queued
/// for it and the other receivers are unaffected.
pub struct SubjectReceiver<E> {
    id: u64,
    state: Rc<RefCell<SubjectState<E>>>,
}

impl<E> fmt::Debug for LocalSubject<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("LocalSubject")
            .field("subscribers", &state.subscribers.len())
            .field("terminated", &state.termination.is_some())
            .finish()
    }
}

impl<E> fmt::Debug for SubjectReceiver<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubjectReceiver")
            .field("id", &self.id)
            .finish()
    }
}

impl<E> Default for LocalSubject<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> LocalSubject<E> {
    /// Creates a subject without subscribers.
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(SubjectState {
                subscribers: BTreeMap::new(),
                next_id: 0,
                termination: None,
            })),
        }
    }

    /// Publishes an event to every current subscriber.
    ///
    /// Publishing with no subscribers is not an error; the event is simply
    /// not observed by anyone.
    ///
    /// Returns [`GateError::Closed`] if the subject already completed or
    /// failed.
    pub fn next(&self, event: bool) -> Result<()> {
        let wakers = {
            let mut state = self.state.borrow_mut();
            if state.termination.is_some() {
                return Err(GateError::Closed(ResourceType::Subject));
            }
            state.broadcast(|subscriber| subscriber.queue.push_back(Ok(event)))
        };
        wake_all(wakers);
        Ok(())
    }

    /// Completes the subject. Receivers end after draining their queue.
    ///
    /// Completing a terminated subject has no effect.
    pub fn complete(&self) {
        let wakers = {
            let mut state = self.state.borrow_mut();
            if state.termination.is_some() {
                return;
            }
            debug!(
                "subject completed with {} subscribers",
                state.subscribers.len()
            );
            state.termination = Some(Termination::Completed);
            state.broadcast(|subscriber| subscriber.closed = true)
        };
        wake_all(wakers);
    }

    /// Number of receivers that have not been dropped.
    pub fn subscriber_count(&self) -> usize {
        self.state.borrow().subscribers.len()
    }

    /// Whether [`complete`](Self::complete) or [`error`](Self::error) was
    /// called.
    pub fn is_terminated(&self) -> bool {
        self.state.borrow().termination.is_some()
    }
}

impl<E: Clone> LocalSubject<E> {
    /// Subscribes to the events published from now on.
    ///
    /// Subscribing to a terminated subject yields a receiver that replays the
    /// terminal signal: it ends right away, after yielding the error if the
    /// subject failed.
    pub fn subscribe(&self) -> SubjectReceiver<E> {
        let mut state = self.state.borrow_mut();
        let id = state.next_id;
        state.next_id += 1;

        let mut subscriber = Subscriber::new();
        match &state.termination {
            None => {}
            Some(Termination::Completed) => subscriber.closed = true,
            Some(Termination::Failed(err)) => {
                subscriber.queue.push_back(Err(err.clone()));
                subscriber.closed = true;
            }
        }
        state.subscribers.insert(id, subscriber);
        debug!("subject subscription {} opened", id);

        SubjectReceiver {
            id,
            state: self.state.clone(),
        }
    }

    /// Fails the subject. Every receiver drains its queue, yields `err` and
    /// then ends.
    ///
    /// Failing a terminated subject has no effect.
    pub fn error(&self, err: E) {
        let wakers = {
            let mut state = self.state.borrow_mut();
            if state.termination.is_some() {
                return;
            }
            debug!("subject failed with {} subscribers", state.subscribers.len());
            let wakers = state.broadcast(|subscriber| {
                subscriber.queue.push_back(Err(err.clone()));
                subscriber.closed = true;
            });
            state.termination = Some(Termination::Failed(err));
            wakers
        };
        wake_all(wakers);
    }
}

impl<E> Drop for LocalSubject<E> {
    fn drop(&mut self) {
        self.complete();
    }
}

impl<E> Stream for SubjectReceiver<E> {
    type Item = std::result::Result<bool, E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut state = self.state.borrow_mut();
        let subscriber = match state.subscribers.get_mut(&self.id) {
            Some(subscriber) => subscriber,
            None => return Poll::Ready(None),
        };

        if let Some(item) = subscriber.queue.pop_front() {
            Poll::Ready(Some(item))
        } else if subscriber.closed {
            Poll::Ready(None)
        } else {
            subscriber.waker = Some(cx.waker().clone());
            Poll::Pending
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let state = self.state.borrow();
        match state.subscribers.get(&self.id) {
            Some(subscriber) if subscriber.closed => {
                (subscriber.queue.len(), Some(subscriber.queue.len()))
            }
            Some(subscriber) => (subscriber.queue.len(), None),
            None => (0, Some(0)),
        }
    }
}

impl<E> Drop for SubjectReceiver<E> {
    fn drop(&mut self) {
        // Nobody is waiting on a dropped receiver, so its waker goes with it.
        if self.state.borrow_mut().subscribers.remove(&self.id).is_some() {
            debug!("subject subscription {} disposed", self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TryGateStreamExt;
    use futures_lite::{
        future::{block_on, poll_once},
        StreamExt,
    };

    #[test]
    fn only_live_subscribers_see_events() {
        let subject = LocalSubject::<()>::new();
        subject.next(true).unwrap();

        let mut receiver = subject.subscribe();
        subject.next(false).unwrap();

        assert_eq!(block_on(receiver.next()), Some(Ok(false)));
        assert_eq!(block_on(poll_once(receiver.next())), None);
    }

    #[test]
    fn publishing_wakes_pending_receiver() {
        let subject = Rc::new(LocalSubject::<()>::new());
        let receiver = subject.subscribe();

        let publisher = subject.clone();
        block_on(async move {
            let consumer = async { receiver.try_gate().collect::<Vec<_>>().await };
            let producer = async {
                futures_lite::future::yield_now().await;
                publisher.next(true).unwrap();
                futures_lite::future::yield_now().await;
                publisher.next(false).unwrap();
                publisher.complete();
            };
            let (states, ()) = futures_lite::future::zip(consumer, producer).await;
            assert_eq!(states, vec![Ok(false), Ok(true)]);
        });
    }

    #[test]
    fn terminated_subject_rejects_events() {
        let subject = LocalSubject::<&str>::new();
        let mut receiver = subject.subscribe();
        subject.error("failed");
        subject.complete();
        subject.error("again");

        assert!(subject.is_terminated());
        assert_eq!(
            subject.next(true),
            Err(GateError::Closed(ResourceType::Subject))
        );
        block_on(async {
            assert_eq!(receiver.next().await, Some(Err("failed")));
            assert_eq!(receiver.next().await, None);
        });
    }

    #[test]
    fn late_subscriber_replays_termination() {
        let subject = LocalSubject::<&str>::new();
        subject.complete();
        assert_eq!(block_on(subject.subscribe().next()), None);

        let failed = LocalSubject::<&str>::new();
        failed.error("failed");
        let mut receiver = failed.subscribe();
        assert_eq!(receiver.size_hint(), (1, Some(1)));
        block_on(async {
            assert_eq!(receiver.next().await, Some(Err("failed")));
            assert_eq!(receiver.next().await, None);
        });
    }

    #[test]
    fn dropping_receiver_disposes_it() {
        let subject = LocalSubject::<()>::new();
        let first = subject.subscribe();
        let mut second = subject.subscribe();
        assert_eq!(subject.subscriber_count(), 2);

        drop(first);
        assert_eq!(subject.subscriber_count(), 1);

        subject.next(true).unwrap();
        assert_eq!(block_on(second.next()), Some(Ok(true)));
    }

    #[test]
    fn dropping_subject_completes() {
        let subject = LocalSubject::<()>::new();
        let mut receiver = subject.subscribe();
        subject.next(true).unwrap();
        drop(subject);

        block_on(async {
            assert_eq!(receiver.next().await, Some(Ok(true)));
            assert_eq!(receiver.next().await, None);
        });
    }
}

// Unless explicitly stated otherwise all files in this repository are licensed under the
// MIT/Apache-2.0 License, at your convenience
//
// This product includes software developed at Datadog (https://www.datadoghq.com/). Copyright 2020 Datadog, Inc.
//
use crate::accumulator::GateAccumulator;
use futures_lite::{ready, Stream};
use log::debug;
use pin_project_lite::pin_project;
use std::{
    pin::Pin,
    task::{Context, Poll},
};

pin_project! {
    /// Stream for the [`gate`](GateStreamExt::gate) method.
    ///
    /// Yields one gate state per upstream event, as soon as the event arrives.
    /// The balance lives inside this value, so every `Gated` is an independent
    /// subscription and dropping it discards the balance.
    #[derive(Debug)]
    #[must_use = "streams do nothing unless polled"]
    pub struct Gated<S> {
        #[pin]
        upstream: S,
        accumulator: GateAccumulator,
    }
}

impl<S> Gated<S> {
    pub(crate) fn new(upstream: S) -> Self {
        Self {
            upstream,
            accumulator: GateAccumulator::new(),
        }
    }

    /// Net outstanding acquisitions seen by this subscription.
    pub fn balance(&self) -> i64 {
        self.accumulator.balance()
    }

    /// Acquires a reference to the upstream stream.
    pub fn get_ref(&self) -> &S {
        &self.upstream
    }

    /// Ends the subscription, handing back the upstream stream. The balance
    /// is discarded.
    pub fn into_inner(self) -> S {
        self.upstream
    }
}

impl<S: Stream<Item = bool>> Stream for Gated<S> {
    type Item = bool;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        match ready!(this.upstream.poll_next(cx)) {
            Some(event) => Poll::Ready(Some(this.accumulator.fold(event))),
            None => {
                debug!(
                    "gate upstream completed with balance {}",
                    this.accumulator.balance()
                );
                Poll::Ready(None)
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.upstream.size_hint()
    }
}

pin_project! {
    /// Stream for the [`try_gate`](TryGateStreamExt::try_gate) method.
    ///
    /// `Ok` events are folded into gate states. The first `Err` is forwarded
    /// unchanged and terminates the subscription: the balance is discarded and
    /// the upstream is never polled again.
    #[derive(Debug)]
    #[must_use = "streams do nothing unless polled"]
    pub struct TryGated<S> {
        #[pin]
        upstream: S,
        accumulator: Option<GateAccumulator>,
    }
}

impl<S> TryGated<S> {
    pub(crate) fn new(upstream: S) -> Self {
        Self {
            upstream,
            accumulator: Some(GateAccumulator::new()),
        }
    }

    /// Net outstanding acquisitions seen by this subscription, or `None` once
    /// the upstream completed or failed.
    pub fn balance(&self) -> Option<i64> {
        self.accumulator.as_ref().map(GateAccumulator::balance)
    }

    /// Whether the upstream already signalled completion or an error.
    pub fn is_terminated(&self) -> bool {
        self.accumulator.is_none()
    }

    /// Acquires a reference to the upstream stream.
    pub fn get_ref(&self) -> &S {
        &self.upstream
    }

    /// Ends the subscription, handing back the upstream stream.
    pub fn into_inner(self) -> S {
        self.upstream
    }
}

impl<S, E> Stream for TryGated<S>
where
    S: Stream<Item = Result<bool, E>>,
{
    type Item = Result<bool, E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        let accumulator = match this.accumulator.as_mut() {
            Some(accumulator) => accumulator,
            None => return Poll::Ready(None),
        };

        match ready!(this.upstream.poll_next(cx)) {
            Some(Ok(event)) => Poll::Ready(Some(Ok(accumulator.fold(event)))),
            Some(Err(err)) => {
                debug!(
                    "gate upstream failed with balance {}",
                    accumulator.balance()
                );
                *this.accumulator = None;
                Poll::Ready(Some(Err(err)))
            }
            None => {
                debug!(
                    "gate upstream completed with balance {}",
                    accumulator.balance()
                );
                *this.accumulator = None;
                Poll::Ready(None)
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.accumulator.is_none() {
            (0, Some(0))
        } else {
            self.upstream.size_hint()
        }
    }
}

/// Extension trait attaching a gate to a stream of acquire/release events.
pub trait GateStreamExt: Stream<Item = bool> {
    /// Turns a stream of events (`true` = acquire, `false` = release) into a
    /// stream of gate states (`true` = locked), one state per event.
    ///
    /// # Examples
    ///
    /// ```
    /// use futures_lite::{future::block_on, stream, StreamExt};
    /// use gate_stream::GateStreamExt;
    ///
    /// let states: Vec<bool> = block_on(stream::iter(vec![true, true, false]).gate().collect());
    /// assert_eq!(states, vec![false, false, false]);
    /// ```
    fn gate(self) -> Gated<Self>
    where
        Self: Sized,
    {
        Gated::new(self)
    }
}

impl<S: Stream<Item = bool> + ?Sized> GateStreamExt for S {}

/// Extension trait attaching a gate to a fallible stream of events.
pub trait TryGateStreamExt<E>: Stream<Item = Result<bool, E>> {
    /// Like [`gate`](GateStreamExt::gate), but errors are passed through
    /// and end the stream.
    fn try_gate(self) -> TryGated<Self>
    where
        Self: Sized,
    {
        TryGated::new(self)
    }
}

impl<S, E> TryGateStreamExt<E> for S where S: Stream<Item = Result<bool, E>> + ?Sized {}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_lite::{
        future::{block_on, poll_once},
        stream,
        StreamExt,
    };

    #[test]
    fn one_state_per_event() {
        crate::test_utils::init_logging();

        let states: Vec<bool> =
            block_on(stream::iter(vec![true, false, false, true, true]).gate().collect());
        assert_eq!(states, vec![false, true, true, true, false]);
    }

    #[test]
    fn empty_upstream_ends_immediately() {
        let mut gated = stream::empty::<bool>().gate();
        assert_eq!(block_on(gated.next()), None);
        assert_eq!(gated.balance(), 0);
    }

    #[test]
    fn pending_upstream_is_forwarded() {
        let mut gated = stream::iter(vec![true]).chain(stream::pending()).gate();
        assert_eq!(block_on(poll_once(gated.next())), Some(Some(false)));
        assert_eq!(block_on(poll_once(gated.next())), None);
        assert_eq!(gated.balance(), 1);
    }

    #[test]
    fn size_hint_follows_upstream() {
        let gated = stream::iter(vec![true, false, true]).gate();
        assert_eq!(gated.size_hint(), (3, Some(3)));
    }

    #[test]
    fn subscriptions_do_not_share_balance() {
        let events = vec![true, true];
        let mut first = stream::iter(events.clone()).gate();
        let mut second = stream::iter(events).gate();

        block_on(async {
            assert_eq!(first.next().await, Some(false));
            assert_eq!(first.next().await, Some(false));
            assert_eq!(second.next().await, Some(false));
        });
        assert_eq!(first.balance(), 2);
        assert_eq!(second.balance(), 1);

        let upstream = first.into_inner();
        let mut resubscribed = upstream.chain(stream::iter(vec![false])).gate();
        assert_eq!(block_on(resubscribed.next()), Some(true));
        assert_eq!(resubscribed.balance(), -1);
    }

    #[test]
    fn error_is_forwarded_and_terminal() {
        let upstream = stream::iter(vec![Ok(true), Err("boom"), Ok(false)]);
        let mut gated = upstream.try_gate();

        block_on(async {
            assert_eq!(gated.next().await, Some(Ok(false)));
            assert_eq!(gated.balance(), Some(1));
            assert_eq!(gated.next().await, Some(Err("boom")));
            assert!(gated.is_terminated());
            assert_eq!(gated.balance(), None);
            assert_eq!(gated.next().await, None);
            assert_eq!(gated.next().await, None);
        });
        assert_eq!(gated.size_hint(), (0, Some(0)));

        // the event after the error was never pulled out of the upstream
        assert_eq!(gated.get_ref().size_hint(), (1, Some(1)));
    }

    #[test]
    fn try_gate_completes_with_upstream() {
        let upstream = stream::iter(vec![Ok::<_, ()>(false), Ok(true), Ok(true)]);
        let states: Vec<_> = block_on(upstream.try_gate().collect());
        assert_eq!(states, vec![Ok(true), Ok(true), Ok(false)]);
    }
}

// Unless explicitly stated otherwise all files in this repository are licensed under the
// MIT/Apache-2.0 License, at your convenience
//
// This product includes software developed at Datadog (https://www.datadoghq.com/). Copyright 2020 Datadog, Inc.
//
use log::trace;

/// Smallest balance at which the gate reports itself as unlocked.
pub const UNLOCK_THRESHOLD: i64 = 1;

/// Maps an event to its signed contribution to the balance: `+1` for an
/// acquire (`true`), `-1` for a release (`false`).
#[inline]
pub fn contribution(event: bool) -> i64 {
    if event {
        1
    } else {
        -1
    }
}

/// The gate state for a given balance: `true` (locked) whenever the balance
/// is below [`UNLOCK_THRESHOLD`].
#[inline]
pub fn gate_state(balance: i64) -> bool {
    balance < UNLOCK_THRESHOLD
}

/// Running fold of acquire/release events into a gate state.
///
/// Every call to [`fold`] consumes exactly one event and yields exactly one
/// state, so the produced sequence has the same length and order as the
/// consumed one. The initial zero balance is never reported as a state of
/// its own.
///
/// An accumulator belongs to a single subscription. Attach a fresh one
/// (or [`reset`] this one) whenever a new upstream is subscribed to.
///
/// [`fold`]: GateAccumulator::fold
/// [`reset`]: GateAccumulator::reset
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GateAccumulator {
    balance: i64,
}

impl GateAccumulator {
    /// Creates an accumulator with a zero balance.
    pub const fn new() -> Self {
        Self { balance: 0 }
    }

    /// Folds the next event into the balance and returns the resulting gate
    /// state.
    ///
    /// # Examples
    ///
    /// ```
    /// use gate_stream::GateAccumulator;
    ///
    /// let mut gate = GateAccumulator::new();
    /// assert!(!gate.fold(true));
    /// assert!(gate.fold(false));
    /// ```
    #[inline]
    pub fn fold(&mut self, event: bool) -> bool {
        self.balance += contribution(event);
        let locked = gate_state(self.balance);
        trace!(
            "gate event {} -> balance {}, locked {}",
            event,
            self.balance,
            locked
        );
        locked
    }

    /// Folds every event of `events` in order, returning one state per event.
    pub fn fold_all<I: IntoIterator<Item = bool>>(&mut self, events: I) -> Vec<bool> {
        events.into_iter().map(|event| self.fold(event)).collect()
    }

    /// Net outstanding acquisitions seen so far.
    pub fn balance(&self) -> i64 {
        self.balance
    }

    /// The state after the last folded event. Before any event the balance is
    /// zero, which reads as locked.
    pub fn is_locked(&self) -> bool {
        gate_state(self.balance)
    }

    /// Drops the accumulated balance, as if a new subscription had started.
    pub fn reset(&mut self) {
        self.balance = 0;
    }
}

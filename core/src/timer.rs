//! Cancellable deadline queue shared by every timed behaviour.
//!
//! Each entry is a `(deadline, token, payload)` triple. Owners advance the
//! queue's clock once per tick and then drain the entries whose deadlines have
//! passed with [`Timers::pop_due`]. Entries are yielded in deadline order,
//! ties broken by scheduling order, so a handler may re-arm a periodic timer
//! relative to the deadline it just observed and still catch up within the
//! same tick. Cancelling a token removes the entry outright; a cancelled or
//! already-fired token is inert.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// Handle returned when a timer is armed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerToken(u64);

/// Entry whose deadline has passed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Due<T> {
    /// Token the entry was armed with.
    pub token: TimerToken,
    /// Deadline the entry was armed for.
    pub deadline: Duration,
    /// Payload describing what should happen.
    pub payload: T,
}

/// Deadline-ordered timer queue driven by an explicit clock.
#[derive(Clone, Debug)]
pub struct Timers<T> {
    now: Duration,
    next_sequence: u64,
    queue: BTreeMap<(Duration, u64), T>,
    deadlines: HashMap<u64, Duration>,
}

impl<T> Default for Timers<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Timers<T> {
    /// Creates an empty queue whose clock starts at zero.
    #[must_use]
    pub fn new() -> Self {
        Self {
            now: Duration::ZERO,
            next_sequence: 0,
            queue: BTreeMap::new(),
            deadlines: HashMap::new(),
        }
    }

    /// Current time of the queue's clock.
    #[must_use]
    pub const fn now(&self) -> Duration {
        self.now
    }

    /// Moves the clock forward without firing anything.
    pub fn advance(&mut self, dt: Duration) {
        self.now = self.now.saturating_add(dt);
    }

    /// Arms a timer that expires `delay` after the current time.
    pub fn schedule(&mut self, delay: Duration, payload: T) -> TimerToken {
        self.schedule_at(self.now.saturating_add(delay), payload)
    }

    /// Arms a timer that expires at an absolute deadline.
    pub fn schedule_at(&mut self, deadline: Duration, payload: T) -> TimerToken {
        let sequence = self.next_sequence;
        self.next_sequence = self.next_sequence.wrapping_add(1);
        let _ = self.queue.insert((deadline, sequence), payload);
        let _ = self.deadlines.insert(sequence, deadline);
        TimerToken(sequence)
    }

    /// Disarms the timer, returning its payload if it was still pending.
    pub fn cancel(&mut self, token: TimerToken) -> Option<T> {
        let deadline = self.deadlines.remove(&token.0)?;
        self.queue.remove(&(deadline, token.0))
    }

    /// Reports whether the timer is still waiting to fire.
    #[must_use]
    pub fn is_pending(&self, token: TimerToken) -> bool {
        self.deadlines.contains_key(&token.0)
    }

    /// Deadline of a pending timer.
    #[must_use]
    pub fn deadline(&self, token: TimerToken) -> Option<Duration> {
        self.deadlines.get(&token.0).copied()
    }

    /// Time left before a pending timer fires.
    #[must_use]
    pub fn remaining(&self, token: TimerToken) -> Option<Duration> {
        self.deadline(token)
            .map(|deadline| deadline.saturating_sub(self.now))
    }

    /// Removes and returns the earliest entry whose deadline has passed.
    pub fn pop_due(&mut self) -> Option<Due<T>> {
        let (&(deadline, sequence), _) = self.queue.first_key_value()?;
        if deadline > self.now {
            return None;
        }

        let payload = self.queue.remove(&(deadline, sequence))?;
        let _ = self.deadlines.remove(&sequence);
        Some(Due {
            token: TimerToken(sequence),
            deadline,
            payload,
        })
    }

    /// Number of pending timers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Reports whether no timers are pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

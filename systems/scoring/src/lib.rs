#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Score and kill-streak multiplier bookkeeping.
//!
//! Each kill awards its base value times the current multiplier, then raises
//! the multiplier by one up to the configured cap. Once no kill lands for the
//! decay window, the multiplier falls back towards one a step at a time.

use std::time::Duration;

use blood_covenant_core::{Event, HighScoreError, HighScoreStore, ScoreTuning, TimerToken, Timers};

/// Configuration parameters required to construct the score engine.
#[derive(Clone, Debug)]
pub struct Config {
    tuning: ScoreTuning,
}

impl Config {
    /// Creates a configuration from score tuning.
    #[must_use]
    pub const fn new(tuning: ScoreTuning) -> Self {
        Self { tuning }
    }
}

/// Observable scoring state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScoreState {
    /// Points accumulated during the encounter.
    pub score: u64,
    /// Current kill-streak multiplier.
    pub multiplier: u32,
    /// Time at which the next multiplier decrement fires, if decaying.
    pub decay_deadline: Option<Duration>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Decay;

/// Pure system turning kills into score.
#[derive(Debug)]
pub struct ScoreEngine {
    tuning: ScoreTuning,
    timers: Timers<Decay>,
    decay: Option<TimerToken>,
    score: u64,
    multiplier: u32,
}

impl ScoreEngine {
    /// Creates an engine with zero score and a multiplier of one.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            tuning: config.tuning,
            timers: Timers::new(),
            decay: None,
            score: 0,
            multiplier: 1,
        }
    }

    /// Advances decay and scores every enemy death in the batch.
    pub fn handle(&mut self, events: &[Event], out_events: &mut Vec<Event>) {
        for event in events {
            match event {
                Event::TimeAdvanced { dt } => {
                    self.timers.advance(*dt);
                    while let Some(due) = self.timers.pop_due() {
                        if self.decay != Some(due.token) {
                            continue;
                        }
                        self.decay_step(due.deadline, out_events);
                    }
                }
                Event::EnemyDied { score_value, .. } => self.add_score(*score_value, out_events),
                _ => {}
            }
        }
    }

    /// Awards `base` times the multiplier, raises the multiplier and restarts
    /// decay.
    pub fn add_score(&mut self, base: u32, out_events: &mut Vec<Event>) {
        let awarded = u64::from(base).saturating_mul(u64::from(self.multiplier));
        self.score = self.score.saturating_add(awarded);
        out_events.push(Event::ScoreChanged {
            score: self.score,
            awarded,
        });

        if self.multiplier < self.tuning.max_multiplier {
            self.multiplier += 1;
            out_events.push(Event::MultiplierChanged {
                multiplier: self.multiplier,
            });
        }

        self.cancel_decay();
        self.decay = Some(self.timers.schedule(self.tuning.multiplier_decay_time, Decay));
        tracing::debug!(awarded, score = self.score, multiplier = self.multiplier, "score awarded");
    }

    /// Cancels decay and drops the multiplier straight back to one.
    pub fn reset_multiplier(&mut self, out_events: &mut Vec<Event>) {
        self.cancel_decay();
        if self.multiplier != 1 {
            self.multiplier = 1;
            out_events.push(Event::MultiplierChanged { multiplier: 1 });
        }
    }

    /// Persists the current score when it beats the stored high score.
    ///
    /// Returns whether a new high score was written.
    pub fn save_high_score(&self, store: &mut dyn HighScoreStore) -> Result<bool, HighScoreError> {
        let stored = store.load()?;
        if self.score <= stored {
            return Ok(false);
        }
        store.store(self.score)?;
        tracing::info!(score = self.score, previous = stored, "new high score");
        Ok(true)
    }

    /// Points accumulated so far.
    #[must_use]
    pub const fn score(&self) -> u64 {
        self.score
    }

    /// Current multiplier.
    #[must_use]
    pub const fn multiplier(&self) -> u32 {
        self.multiplier
    }

    /// Snapshot of the scoring state.
    #[must_use]
    pub fn state(&self) -> ScoreState {
        ScoreState {
            score: self.score,
            multiplier: self.multiplier,
            decay_deadline: self.decay.and_then(|token| self.timers.deadline(token)),
        }
    }

    fn decay_step(&mut self, deadline: Duration, out_events: &mut Vec<Event>) {
        self.decay = None;
        if self.multiplier <= 1 {
            return;
        }
        self.multiplier -= 1;
        out_events.push(Event::MultiplierChanged {
            multiplier: self.multiplier,
        });
        if self.multiplier > 1 {
            let next = deadline.saturating_add(self.tuning.decay_step);
            self.decay = Some(self.timers.schedule_at(next, Decay));
        }
    }

    fn cancel_decay(&mut self) {
        if let Some(token) = self.decay.take() {
            let _ = self.timers.cancel(token);
        }
    }
}

/// High-score store that lives only as long as the process.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InMemoryHighScore {
    value: u64,
}

impl InMemoryHighScore {
    /// Creates a store seeded with an existing high score.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self { value }
    }

    /// Stored high score.
    #[must_use]
    pub const fn value(&self) -> u64 {
        self.value
    }
}

impl HighScoreStore for InMemoryHighScore {
    fn load(&self) -> Result<u64, HighScoreError> {
        Ok(self.value)
    }

    fn store(&mut self, value: u64) -> Result<(), HighScoreError> {
        self.value = value;
        Ok(())
    }
}

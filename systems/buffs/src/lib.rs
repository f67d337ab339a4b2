#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Timed power-up effects on the player.
//!
//! The buff engine owns the player's baseline stats, applies collected
//! power-ups, and reverts them when their timers fire. At most one instance of
//! each power-up type is active; collecting the same type again replaces the
//! instance and restarts its timer. Stat changes reach the world through
//! [`Command::SetPlayerStats`], invincibility through
//! [`Command::SetPlayerInvincible`], and the Blood Frenzy drain through
//! [`Command::DamagePlayer`].

use std::{collections::BTreeMap, time::Duration};

use blood_covenant_core::{
    BuffTuning, Command, DamageSource, Event, PlayerStats, PowerUpDefinition, PowerUpKind,
    PowerUpTable, ReversionPolicy, TimerToken, Timers,
};

/// Configuration parameters required to construct the buff engine.
#[derive(Clone, Debug)]
pub struct Config {
    tuning: BuffTuning,
    baseline: PlayerStats,
    power_ups: PowerUpTable,
}

impl Config {
    /// Creates a configuration from tuning, the player's baseline stats, and
    /// the power-up table pickups refer to.
    #[must_use]
    pub fn new(tuning: BuffTuning, baseline: PlayerStats, power_ups: PowerUpTable) -> Self {
        Self {
            tuning,
            baseline,
            power_ups,
        }
    }
}

/// Active timed power-up.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BuffInstance {
    /// Power-up type.
    pub kind: PowerUpKind,
    /// Effect magnitude.
    pub effect_value: f32,
    /// Total duration of the effect.
    pub duration: Duration,
    /// Time at which the effect reverts.
    pub expires_at: Duration,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BuffTimer {
    Expire(PowerUpKind),
    Drain(PowerUpKind),
}

#[derive(Clone, Copy, Debug)]
struct ActiveBuff {
    instance: BuffInstance,
    expiry: TimerToken,
    drain: Option<TimerToken>,
}

/// Pure system applying and reverting power-up effects.
#[derive(Debug)]
pub struct BuffEngine {
    tuning: BuffTuning,
    baseline: PlayerStats,
    stats: PlayerStats,
    power_ups: PowerUpTable,
    timers: Timers<BuffTimer>,
    active: BTreeMap<PowerUpKind, ActiveBuff>,
}

impl BuffEngine {
    /// Creates a new engine; the baseline stats are captured here.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            tuning: config.tuning,
            baseline: config.baseline,
            stats: config.baseline,
            power_ups: config.power_ups,
            timers: Timers::new(),
            active: BTreeMap::new(),
        }
    }

    /// Fires due reversions and drain pulses, then applies collected pickups.
    pub fn handle(
        &mut self,
        events: &[Event],
        out_commands: &mut Vec<Command>,
        out_events: &mut Vec<Event>,
    ) {
        for event in events {
            match event {
                Event::TimeAdvanced { dt } => {
                    self.timers.advance(*dt);
                    while let Some(due) = self.timers.pop_due() {
                        match due.payload {
                            BuffTimer::Expire(kind) => {
                                self.expire(kind, due.token, out_commands, out_events);
                            }
                            BuffTimer::Drain(kind) => {
                                self.drain(kind, due.token, due.deadline, out_commands);
                            }
                        }
                    }
                }
                Event::PickupCollected { power_up, .. } => {
                    let Some(definition) = self.power_ups.get(*power_up).cloned() else {
                        tracing::warn!(power_up = power_up.get(), "collected an unknown power-up");
                        continue;
                    };
                    self.apply_power_up(&definition, out_commands, out_events);
                }
                _ => {}
            }
        }
    }

    /// Applies a power-up immediately.
    ///
    /// Lore pickups are forwarded to the lore display and create no timed state.
    /// Health packs heal once. Every other type replaces any active instance of
    /// the same type and reverts after its duration.
    pub fn apply_power_up(
        &mut self,
        definition: &PowerUpDefinition,
        out_commands: &mut Vec<Command>,
        out_events: &mut Vec<Event>,
    ) {
        let kind = definition.kind;
        if kind.is_lore() {
            match &definition.lore_text {
                Some(text) => out_commands.push(Command::ShowLore {
                    text: text.clone(),
                    audio_cue: definition.lore_audio_cue.clone(),
                }),
                None => tracing::warn!(name = %definition.name, "lore pickup carries no text"),
            }
            return;
        }
        if kind.is_instant() {
            out_commands.push(Command::HealPlayer {
                amount: definition.effect_value,
            });
            out_events.push(Event::BuffApplied {
                kind,
                duration: None,
            });
            return;
        }

        if let Some(previous) = self.active.remove(&kind) {
            let _ = self.timers.cancel(previous.expiry);
            if let Some(drain) = previous.drain {
                let _ = self.timers.cancel(drain);
            }
        }

        let now = self.timers.now();
        let instance = BuffInstance {
            kind,
            effect_value: definition.effect_value,
            duration: definition.duration,
            expires_at: now.saturating_add(definition.duration),
        };
        let expiry = self
            .timers
            .schedule_at(instance.expires_at, BuffTimer::Expire(kind));

        let mut drain = None;
        match kind {
            PowerUpKind::HolyWater => {
                out_commands.push(Command::SetPlayerInvincible { invincible: true });
            }
            PowerUpKind::BloodFrenzy => {
                out_commands.push(self.drain_pulse());
                let next = now.saturating_add(self.tuning.drain_interval);
                if !self.tuning.drain_interval.is_zero() && next < instance.expires_at {
                    drain = Some(self.timers.schedule_at(next, BuffTimer::Drain(kind)));
                }
            }
            _ => {}
        }
        let _ = self.active.insert(
            kind,
            ActiveBuff {
                instance,
                expiry,
                drain,
            },
        );

        if kind.scales_damage() || kind.scales_speed() {
            self.stats = match self.tuning.reversion {
                ReversionPolicy::Rederive => self.derive_stats(),
                ReversionPolicy::ResetAll => self.overwrite_stats(kind, definition.effect_value),
            };
            out_commands.push(Command::SetPlayerStats { stats: self.stats });
        }

        tracing::info!(
            ?kind,
            name = %definition.name,
            seconds = definition.duration.as_secs_f32(),
            "power-up activated"
        );
        out_events.push(Event::BuffApplied {
            kind,
            duration: Some(definition.duration),
        });
    }

    /// Whether a timed power-up of the provided type is active.
    #[must_use]
    pub fn has_buff(&self, kind: PowerUpKind) -> bool {
        self.active.contains_key(&kind)
    }

    /// Whether the player currently ignores damage.
    #[must_use]
    pub fn is_invincible(&self) -> bool {
        self.has_buff(PowerUpKind::HolyWater)
    }

    /// Active instances in type order.
    pub fn active(&self) -> impl Iterator<Item = &BuffInstance> {
        self.active.values().map(|buff| &buff.instance)
    }

    /// Time left before the provided type reverts.
    #[must_use]
    pub fn remaining(&self, kind: PowerUpKind) -> Option<Duration> {
        self.active
            .get(&kind)
            .and_then(|buff| self.timers.remaining(buff.expiry))
    }

    /// Stats the engine last pushed to the world.
    #[must_use]
    pub fn stats(&self) -> PlayerStats {
        self.stats
    }

    /// Stats captured at construction.
    #[must_use]
    pub fn baseline(&self) -> PlayerStats {
        self.baseline
    }

    fn expire(
        &mut self,
        kind: PowerUpKind,
        token: TimerToken,
        out_commands: &mut Vec<Command>,
        out_events: &mut Vec<Event>,
    ) {
        let Some(buff) = self.active.get(&kind) else {
            return;
        };
        if buff.expiry != token {
            return;
        }
        let drain = buff.drain;
        let _ = self.active.remove(&kind);
        if let Some(drain) = drain {
            let _ = self.timers.cancel(drain);
        }

        if kind == PowerUpKind::HolyWater {
            out_commands.push(Command::SetPlayerInvincible { invincible: false });
        }
        match self.tuning.reversion {
            ReversionPolicy::Rederive => {
                if kind.scales_damage() || kind.scales_speed() {
                    self.stats = self.derive_stats();
                    out_commands.push(Command::SetPlayerStats { stats: self.stats });
                }
            }
            ReversionPolicy::ResetAll => {
                self.stats = self.baseline;
                out_commands.push(Command::SetPlayerStats { stats: self.stats });
            }
        }

        tracing::info!(?kind, "power-up expired");
        out_events.push(Event::BuffExpired { kind });
    }

    fn drain(
        &mut self,
        kind: PowerUpKind,
        token: TimerToken,
        deadline: Duration,
        out_commands: &mut Vec<Command>,
    ) {
        let pulse = self.drain_pulse();
        let interval = self.tuning.drain_interval;
        let Some(buff) = self.active.get_mut(&kind) else {
            return;
        };
        if buff.drain != Some(token) {
            return;
        }

        out_commands.push(pulse);
        let next = deadline.saturating_add(interval);
        buff.drain = (next < buff.instance.expires_at)
            .then(|| self.timers.schedule_at(next, BuffTimer::Drain(kind)));
    }

    fn drain_pulse(&self) -> Command {
        Command::DamagePlayer {
            amount: self.tuning.drain_amount,
            source: DamageSource::Drain,
        }
    }

    fn derive_stats(&self) -> PlayerStats {
        self.active
            .values()
            .fold(self.baseline, |stats, buff| {
                let instance = &buff.instance;
                let stats = if instance.kind.scales_damage() {
                    stats.with_damage_scaled(instance.effect_value)
                } else {
                    stats
                };
                if instance.kind.scales_speed() {
                    stats.with_speed_scaled(instance.effect_value)
                } else {
                    stats
                }
            })
    }

    fn overwrite_stats(&self, kind: PowerUpKind, value: f32) -> PlayerStats {
        let mut stats = self.stats;
        if kind.scales_damage() {
            let scaled = self.baseline.with_damage_scaled(value);
            stats.melee_damage = scaled.melee_damage;
            stats.ranged_damage = scaled.ranged_damage;
        }
        if kind.scales_speed() {
            let scaled = self.baseline.with_speed_scaled(value);
            stats.walk_speed = scaled.walk_speed;
            stats.run_speed = scaled.run_speed;
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blood_covenant_core::PowerUpId;

    fn definition(kind: PowerUpKind, seconds: u64, value: f32) -> PowerUpDefinition {
        PowerUpDefinition {
            id: PowerUpId::new(0),
            name: format!("{kind:?}"),
            kind,
            duration: Duration::from_secs(seconds),
            effect_value: value,
            lore_text: None,
            lore_audio_cue: None,
        }
    }

    fn engine(reversion: ReversionPolicy) -> BuffEngine {
        BuffEngine::new(Config::new(
            BuffTuning {
                reversion,
                ..BuffTuning::default()
            },
            PlayerStats::default(),
            PowerUpTable::default(),
        ))
    }

    fn advance(engine: &mut BuffEngine, millis: u64, commands: &mut Vec<Command>) {
        let mut events = Vec::new();
        engine.handle(
            &[Event::TimeAdvanced {
                dt: Duration::from_millis(millis),
            }],
            commands,
            &mut events,
        );
    }

    fn drains(commands: &[Command]) -> usize {
        commands
            .iter()
            .filter(|command| {
                matches!(
                    command,
                    Command::DamagePlayer {
                        source: DamageSource::Drain,
                        ..
                    }
                )
            })
            .count()
    }

    #[test]
    fn blood_frenzy_drains_every_half_second_for_its_duration() {
        let mut engine = engine(ReversionPolicy::Rederive);
        let mut commands = Vec::new();
        let mut events = Vec::new();

        engine.apply_power_up(
            &definition(PowerUpKind::BloodFrenzy, 10, 2.0),
            &mut commands,
            &mut events,
        );
        assert_eq!(drains(&commands), 1);
        assert_eq!(engine.stats().melee_damage, 50.0);

        for _ in 0..120 {
            advance(&mut engine, 100, &mut commands);
        }

        assert_eq!(drains(&commands), 20);
        assert!(!engine.has_buff(PowerUpKind::BloodFrenzy));
        assert_eq!(engine.stats(), PlayerStats::default());
    }

    #[test]
    fn reapplying_restarts_the_timer_without_stacking() {
        let mut engine = engine(ReversionPolicy::Rederive);
        let mut commands = Vec::new();
        let mut events = Vec::new();
        let boost = definition(PowerUpKind::DamageBoost, 10, 2.0);

        engine.apply_power_up(&boost, &mut commands, &mut events);
        advance(&mut engine, 6_000, &mut commands);
        engine.apply_power_up(&boost, &mut commands, &mut events);

        assert_eq!(engine.active().count(), 1);
        assert_eq!(engine.stats().melee_damage, 50.0);
        assert_eq!(
            engine.remaining(PowerUpKind::DamageBoost),
            Some(Duration::from_secs(10))
        );

        advance(&mut engine, 6_000, &mut commands);
        assert!(engine.has_buff(PowerUpKind::DamageBoost));
        advance(&mut engine, 4_000, &mut commands);
        assert!(!engine.has_buff(PowerUpKind::DamageBoost));
    }

    #[test]
    fn damage_returns_only_when_blood_frenzy_itself_expires() {
        for policy in [ReversionPolicy::Rederive, ReversionPolicy::ResetAll] {
            let mut engine = engine(policy);
            let mut commands = Vec::new();
            let mut events = Vec::new();

            engine.apply_power_up(
                &definition(PowerUpKind::BloodFrenzy, 10, 2.0),
                &mut commands,
                &mut events,
            );
            advance(&mut engine, 1_000, &mut commands);
            engine.apply_power_up(
                &definition(PowerUpKind::HolyWater, 10, 1.0),
                &mut commands,
                &mut events,
            );
            assert!(engine.is_invincible());

            advance(&mut engine, 8_900, &mut commands);
            assert_eq!(engine.stats().melee_damage, 50.0, "{policy:?}");

            advance(&mut engine, 100, &mut commands);
            assert_eq!(engine.stats().melee_damage, 25.0, "{policy:?}");
            assert!(engine.is_invincible());

            advance(&mut engine, 1_000, &mut commands);
            assert!(!engine.is_invincible());
            assert!(commands.contains(&Command::SetPlayerInvincible { invincible: false }));
        }
    }

    #[test]
    fn rederive_keeps_unrelated_buffs_alive() {
        let mut engine = engine(ReversionPolicy::Rederive);
        let mut commands = Vec::new();
        let mut events = Vec::new();

        engine.apply_power_up(
            &definition(PowerUpKind::SpeedBoost, 20, 1.5),
            &mut commands,
            &mut events,
        );
        engine.apply_power_up(
            &definition(PowerUpKind::DamageBoost, 5, 2.0),
            &mut commands,
            &mut events,
        );
        advance(&mut engine, 5_000, &mut commands);

        assert_eq!(engine.stats().melee_damage, 25.0);
        assert_eq!(engine.stats().walk_speed, 3.0);
    }

    #[test]
    fn reset_all_clobbers_unrelated_buffs() {
        let mut engine = engine(ReversionPolicy::ResetAll);
        let mut commands = Vec::new();
        let mut events = Vec::new();

        engine.apply_power_up(
            &definition(PowerUpKind::SpeedBoost, 20, 1.5),
            &mut commands,
            &mut events,
        );
        engine.apply_power_up(
            &definition(PowerUpKind::DamageBoost, 5, 2.0),
            &mut commands,
            &mut events,
        );
        advance(&mut engine, 5_000, &mut commands);

        assert!(engine.has_buff(PowerUpKind::SpeedBoost));
        assert_eq!(engine.stats(), PlayerStats::default());
    }

    #[test]
    fn health_pack_heals_without_timed_state() {
        let mut engine = engine(ReversionPolicy::Rederive);
        let mut commands = Vec::new();
        let mut events = Vec::new();

        engine.apply_power_up(
            &definition(PowerUpKind::HealthPack, 10, 35.0),
            &mut commands,
            &mut events,
        );

        assert_eq!(commands, vec![Command::HealPlayer { amount: 35.0 }]);
        assert_eq!(engine.active().count(), 0);
        assert_eq!(
            events,
            vec![Event::BuffApplied {
                kind: PowerUpKind::HealthPack,
                duration: None,
            }]
        );
    }

    #[test]
    fn lore_pickups_route_to_the_lore_display() {
        let mut engine = engine(ReversionPolicy::Rederive);
        let mut commands = Vec::new();
        let mut events = Vec::new();
        let lore = PowerUpDefinition {
            lore_text: Some(String::from("Bound by moonlight.")),
            lore_audio_cue: Some(String::from("lore_moon")),
            ..definition(PowerUpKind::LorePickup, 10, 0.0)
        };

        engine.apply_power_up(&lore, &mut commands, &mut events);

        assert_eq!(
            commands,
            vec![Command::ShowLore {
                text: String::from("Bound by moonlight."),
                audio_cue: Some(String::from("lore_moon")),
            }]
        );
        assert!(events.is_empty());
        assert!(!engine.has_buff(PowerUpKind::LorePickup));
    }
}

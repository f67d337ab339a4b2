//! Enemy agent state machine.

use std::time::Duration;

use blood_covenant_core::{
    planar_distance, yaw_of, AttackVariant, Cue, CueSource, DamageSource, EnemyCapabilities,
    EnemyDefinition, EnemyId, EnemyKind, EnemyTuning, Event, Locomotion,
};
use glam::Vec3;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

/// Behaviour phase of an enemy agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EnemyPhase {
    /// Spawned but not yet updated.
    Idle,
    /// Moving toward the player.
    Pursuing,
    /// Holding position within attack range.
    Attacking,
    /// Dead and awaiting removal.
    Dead,
    /// Spawned without a definition; never acts and ignores damage.
    Inert,
}

/// Attack an agent landed on the player during its update.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Strike {
    pub(crate) enemy: EnemyId,
    pub(crate) damage: f32,
}

/// Per-tick inputs shared by every agent.
pub(crate) struct AgentContext<'a> {
    pub(crate) now: Duration,
    pub(crate) dt: Duration,
    pub(crate) player_position: Vec3,
    pub(crate) tuning: &'a EnemyTuning,
    pub(crate) rng: &'a mut ChaCha8Rng,
}

#[derive(Debug)]
struct Behaviour {
    definition: EnemyDefinition,
    health: f32,
    crawling: bool,
    last_attack: Duration,
    next_scream: Option<Duration>,
    next_idle: Option<Duration>,
    locomotion: Box<dyn Locomotion>,
}

#[derive(Debug)]
pub(crate) struct EnemyAgent {
    pub(crate) id: EnemyId,
    pub(crate) kind: EnemyKind,
    pub(crate) position: Vec3,
    pub(crate) heading: f32,
    phase: EnemyPhase,
    despawn_at: Option<Duration>,
    behaviour: Option<Behaviour>,
}

impl EnemyAgent {
    pub(crate) fn spawn(
        id: EnemyId,
        position: Vec3,
        definition: &EnemyDefinition,
        mut locomotion: Box<dyn Locomotion>,
        tuning: &EnemyTuning,
        now: Duration,
        rng: &mut ChaCha8Rng,
    ) -> Self {
        locomotion.set_speed(definition.move_speed);
        locomotion.set_enabled(true);

        let next_scream = definition
            .capabilities
            .contains(EnemyCapabilities::SCREAM)
            .then(|| {
                now + random_interval(rng, tuning.scream_interval_min, tuning.scream_interval_max)
            });
        let next_idle = definition
            .capabilities
            .contains(EnemyCapabilities::IDLE_VOCAL)
            .then(|| {
                now + random_interval(rng, tuning.idle_interval_min, tuning.idle_interval_max)
            });

        Self {
            id,
            kind: definition.kind,
            position,
            heading: 0.0,
            phase: EnemyPhase::Idle,
            despawn_at: None,
            behaviour: Some(Behaviour {
                health: definition.max_health,
                crawling: definition.starts_crawling,
                last_attack: Duration::ZERO,
                next_scream,
                next_idle,
                locomotion,
                definition: definition.clone(),
            }),
        }
    }

    /// Placeholder for a spawn without a definition, removed once `despawn_at` passes.
    pub(crate) fn inert(
        id: EnemyId,
        kind: EnemyKind,
        position: Vec3,
        despawn_at: Duration,
    ) -> Self {
        Self {
            id,
            kind,
            position,
            heading: 0.0,
            phase: EnemyPhase::Inert,
            despawn_at: Some(despawn_at),
            behaviour: None,
        }
    }

    pub(crate) const fn phase(&self) -> EnemyPhase {
        self.phase
    }

    /// Whether the agent can still be hit and act.
    pub(crate) fn is_live(&self) -> bool {
        !matches!(self.phase, EnemyPhase::Dead | EnemyPhase::Inert)
    }

    pub(crate) fn health(&self) -> (f32, f32) {
        self.behaviour
            .as_ref()
            .map_or((0.0, 0.0), |b| (b.health, b.definition.max_health))
    }

    pub(crate) fn is_crawling(&self) -> bool {
        self.behaviour.as_ref().is_some_and(|b| b.crawling)
    }

    pub(crate) fn velocity(&self) -> f32 {
        self.behaviour
            .as_ref()
            .map_or(0.0, |b| b.locomotion.velocity_magnitude())
    }

    pub(crate) fn body_radius(&self) -> f32 {
        self.behaviour
            .as_ref()
            .map_or(0.0, |b| b.definition.body_radius)
    }

    pub(crate) fn despawn_due(&self, now: Duration) -> bool {
        self.despawn_at.is_some_and(|deadline| deadline <= now)
    }

    /// Runs one update: movement, facing, attacks, and ambient vocalisations.
    pub(crate) fn advance(
        &mut self,
        context: &mut AgentContext<'_>,
        out_events: &mut Vec<Event>,
    ) -> Option<Strike> {
        if !self.is_live() {
            return None;
        }
        let Some(behaviour) = self.behaviour.as_mut() else {
            return None;
        };

        let range = behaviour.definition.attack_range;
        let distance = planar_distance(self.position, context.player_position);
        let mut strike = None;

        if distance <= range {
            self.phase = EnemyPhase::Attacking;
            behaviour.locomotion.set_destination(self.position);
            let since_attack = context.now.saturating_sub(behaviour.last_attack);
            if since_attack >= behaviour.definition.attack_cooldown {
                behaviour.last_attack = context.now;
                let variant = choose_variant(behaviour.definition.capabilities, context.rng);
                let damage = behaviour.definition.damage;
                tracing::debug!(enemy = self.id.get(), ?variant, damage, "enemy attacks");
                out_events.push(Event::Cue {
                    source: CueSource::Enemy(self.id),
                    cue: variant.cue(),
                    position: self.position,
                });
                out_events.push(Event::EnemyAttacked {
                    enemy: self.id,
                    variant,
                    damage,
                });
                strike = Some(Strike {
                    enemy: self.id,
                    damage,
                });
            }
        } else {
            self.phase = EnemyPhase::Pursuing;
            behaviour.locomotion.set_destination(context.player_position);
        }

        self.position = behaviour.locomotion.advance(self.position, context.dt);

        if distance <= range * context.tuning.facing_range_factor {
            if let Some(target) = yaw_of(context.player_position - self.position) {
                let blend = (context.tuning.turn_rate * context.dt.as_secs_f32()).min(1.0);
                self.heading = turn_toward(self.heading, target, blend);
            }
        }

        let tuning = context.tuning;
        if let Some(mut deadline) = behaviour.next_scream {
            while deadline <= context.now {
                out_events.push(Event::Cue {
                    source: CueSource::Enemy(self.id),
                    cue: Cue::Scream,
                    position: self.position,
                });
                let step = random_interval(
                    context.rng,
                    tuning.scream_interval_min,
                    tuning.scream_interval_max,
                );
                deadline = rearm(deadline, step, context.now);
            }
            behaviour.next_scream = Some(deadline);
        }
        if let Some(mut deadline) = behaviour.next_idle {
            while deadline <= context.now {
                if context.rng.gen::<f32>() < tuning.idle_chance {
                    out_events.push(Event::Cue {
                        source: CueSource::Enemy(self.id),
                        cue: Cue::Idle,
                        position: self.position,
                    });
                }
                let step = random_interval(
                    context.rng,
                    tuning.idle_interval_min,
                    tuning.idle_interval_max,
                );
                deadline = rearm(deadline, step, context.now);
            }
            behaviour.next_idle = Some(deadline);
        }

        strike
    }

    /// Applies damage; returns `true` when the hit killed the agent.
    pub(crate) fn take_damage(
        &mut self,
        amount: f32,
        source: DamageSource,
        tuning: &EnemyTuning,
        now: Duration,
        out_events: &mut Vec<Event>,
    ) -> bool {
        if !self.is_live() {
            tracing::trace!(enemy = self.id.get(), "damage ignored by inactive enemy");
            return false;
        }
        let Some(behaviour) = self.behaviour.as_mut() else {
            return false;
        };

        let before = behaviour.health;
        behaviour.health = (before - amount.max(0.0)).max(0.0);
        out_events.push(Event::EnemyDamaged {
            enemy: self.id,
            amount: before - behaviour.health,
            remaining: behaviour.health,
            source,
        });
        out_events.push(Event::Cue {
            source: CueSource::Enemy(self.id),
            cue: Cue::Hit,
            position: self.position,
        });

        let definition = &behaviour.definition;
        let threshold = definition.stand_up_health_threshold;
        if behaviour.crawling
            && definition.can_stand_up
            && definition.capabilities.contains(EnemyCapabilities::STAND_UP)
            && threshold > 0.0
            && definition.max_health > 0.0
            && behaviour.health / definition.max_health <= threshold
        {
            behaviour.crawling = false;
            behaviour
                .locomotion
                .set_speed(definition.move_speed * tuning.stand_up_speed_multiplier);
            tracing::debug!(enemy = self.id.get(), "crawling enemy stands up");
            out_events.push(Event::Cue {
                source: CueSource::Enemy(self.id),
                cue: Cue::StandUp,
                position: self.position,
            });
            out_events.push(Event::EnemyStoodUp { enemy: self.id });
        }

        if behaviour.health > 0.0 {
            return false;
        }

        self.phase = EnemyPhase::Dead;
        behaviour.locomotion.set_enabled(false);
        self.despawn_at = Some(now + tuning.despawn_delay);
        tracing::debug!(enemy = self.id.get(), kind = ?self.kind, "enemy died");
        out_events.push(Event::Cue {
            source: CueSource::Enemy(self.id),
            cue: Cue::Die,
            position: self.position,
        });
        out_events.push(Event::EnemyDied {
            enemy: self.id,
            kind: self.kind,
            position: self.position,
            score_value: behaviour.definition.score_value,
            drop_chance: behaviour.definition.power_up_drop_chance,
        });
        true
    }
}

fn random_interval(rng: &mut ChaCha8Rng, min: Duration, max: Duration) -> Duration {
    if min >= max {
        return min;
    }
    rng.gen_range(min..=max)
}

/// Next deadline after a firing at `deadline`. A zero step waits for the next update.
fn rearm(deadline: Duration, step: Duration, now: Duration) -> Duration {
    if step.is_zero() {
        return now + Duration::from_nanos(1);
    }
    deadline + step
}

fn choose_variant(capabilities: EnemyCapabilities, rng: &mut ChaCha8Rng) -> AttackVariant {
    let mut available = [AttackVariant::Primary; 3];
    let mut count = 1;
    if capabilities.contains(EnemyCapabilities::SECOND_ATTACK) {
        available[count] = AttackVariant::Secondary;
        count += 1;
    }
    if capabilities.contains(EnemyCapabilities::THIRD_ATTACK) {
        available[count] = AttackVariant::Tertiary;
        count += 1;
    }
    available[rng.gen_range(0..count)]
}

/// Rotates `current` toward `target` along the shortest arc by `blend` of the gap.
fn turn_toward(current: f32, target: f32, blend: f32) -> f32 {
    use std::f32::consts::{PI, TAU};

    let delta = (target - current + PI).rem_euclid(TAU) - PI;
    let heading = current + delta * blend;
    (heading + PI).rem_euclid(TAU) - PI
}

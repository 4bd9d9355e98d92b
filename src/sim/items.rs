//! Field items and skill effects
//!
//! Two populations share one list: permanent pickup boxes seeded at race
//! start, and projectiles spawned by skills. Both advance along the track
//! scalar and collide against cars with the same window test.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::state::{RaceEvent, RaceState};
use crate::consts::*;
use crate::increase;

/// The seven usable skills, in draw-table order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkillId {
    /// Fire projectile
    Agi,
    /// Ice projectile
    Bufu,
    /// Self speed burst
    Garu,
    /// Lightning strike on everyone ahead
    Zio,
    /// Light polarity, reverses steering ahead
    Hama,
    /// Dark polarity, reverses steering ahead
    Mudo,
    /// Short-range physical attack window
    Phys,
}

impl SkillId {
    pub const ALL: [SkillId; 7] = [
        SkillId::Agi,
        SkillId::Bufu,
        SkillId::Garu,
        SkillId::Zio,
        SkillId::Hama,
        SkillId::Mudo,
        SkillId::Phys,
    ];

    /// Position in per-car usage counters
    pub fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldItemKind {
    Pickup,
    Fireball,
    IceShard,
}

/// One thing sitting on or moving along the road
#[derive(Debug, Clone, Copy)]
pub struct FieldItem {
    pub kind: FieldItemKind,
    pub level: f32,
    /// Scalar speed along the track
    pub speed: f32,
    /// Spawning car; immune to its own projectile
    pub owner: Option<usize>,
    /// Lateral offset in road-width units
    pub x: f32,
    /// Track scalar position
    pub z: f32,
    /// Remaining seconds; pickups never expire
    pub life: f32,
}

impl FieldItem {
    pub fn pickup(z: f32, x: f32) -> Self {
        Self {
            kind: FieldItemKind::Pickup,
            level: 0.0,
            speed: 0.0,
            owner: None,
            x,
            z,
            life: f32::INFINITY,
        }
    }

    /// Projectiles launch ahead of the caster and always outrun the field
    fn projectile(kind: FieldItemKind, caster: usize, position: f32, x: f32, speed: f32) -> Self {
        Self {
            kind,
            level: 3.0,
            speed: speed.max(MAX_SPEED * 2.0),
            owner: Some(caster),
            x,
            z: position + 2.0 * SEGMENT_LENGTH,
            life: 10.0,
        }
    }
}

/// Fire the caster's held skill. The caller has already verified the car
/// holds an item and is free to act.
pub fn use_skill(race: &mut RaceState, caster: usize) {
    let Some(skill) = race.cars[caster].item.take() else {
        return;
    };
    race.cars[caster].item_use += 1;
    race.cars[caster].skills_used[skill.index()] += 1;
    race.push_event(RaceEvent::ItemUsed { car: caster, skill });

    let caster_place = race.cars[caster].place;
    let position = race.cars[caster].position;
    let player_x = race.cars[caster].player_x;
    let speed = race.cars[caster].speed;

    match skill {
        SkillId::Agi => {
            race.items.push(FieldItem::projectile(
                FieldItemKind::Fireball,
                caster,
                position,
                player_x,
                speed,
            ));
        }
        SkillId::Bufu => {
            race.items.push(FieldItem::projectile(
                FieldItemKind::IceShard,
                caster,
                position,
                player_x,
                speed,
            ));
        }
        SkillId::Garu => {
            let car = &mut race.cars[caster];
            car.speed_up = 0.6;
            car.speed = MAX_SPEED * 1.5;
        }
        SkillId::Zio => {
            let max_laps = race.max_laps;
            for i in 0..race.cars.len() {
                if i == caster {
                    continue;
                }
                let struck = {
                    let q = &race.cars[i];
                    q.place < caster_place && !q.finished(max_laps) && !q.recover
                };
                if struck {
                    let sign = if race.rng.random_bool(0.5) { 1.0 } else { -1.0 };
                    let q = &mut race.cars[i];
                    q.lightning += sign * (0.5 + q.place as f32 / 16.0);
                    q.flying = true;
                    q.boost = -1.0;
                    q.no_control += q.lightning.abs();
                    q.item_hit += 1;
                    q.health -= 25.0;
                }
            }
        }
        SkillId::Hama | SkillId::Mudo => {
            for i in 0..race.cars.len() {
                if i == caster {
                    continue;
                }
                let q = &mut race.cars[i];
                if q.place < caster_place && !q.polarity_busy() && q.no_control <= 0.0 && q.frozen <= 0.0
                {
                    match skill {
                        SkillId::Hama => q.hama.active = true,
                        _ => q.mudo.active = true,
                    }
                    q.item_hit += 1;
                }
            }
            let car = &mut race.cars[caster];
            match skill {
                SkillId::Hama => car.hama.casting = true,
                _ => car.mudo.casting = true,
            }
            race.push_event(RaceEvent::PolarityCast { car: caster, skill });
        }
        SkillId::Phys => {
            race.cars[caster].attack = 90.0;
        }
    }
}

/// Collide every item against every car, then advance and expire items.
///
/// The hit window is one tick of relative travel along the track scalar,
/// so fast closing speeds can't tunnel through an item between ticks.
pub fn update_items(race: &mut RaceState, dt: f32, pace: f32) {
    let track_length = race.road.track_length;
    let max_laps = race.max_laps;
    let mut events = Vec::new();

    let mut i = 0;
    while i < race.items.len() {
        let item = race.items[i];

        for c in 0..race.cars.len() {
            if item.owner == Some(c) {
                continue;
            }
            let car = &mut race.cars[c];
            let window = (dt * car.speed - dt * item.speed).abs();
            let hit = (car.position - item.z).abs() < window
                && (car.player_x - item.x).abs() <= 0.48
                && car.laps != max_laps
                && car.player_y <= 0.0;
            if !hit {
                continue;
            }

            match item.kind {
                FieldItemKind::Pickup => {
                    if car.item.is_none() {
                        car.item_scrolling = 2.5;
                        events.push(RaceEvent::ItemHit {
                            car: c,
                            kind: item.kind,
                        });
                    }
                }
                FieldItemKind::Fireball => {
                    if !car.recover {
                        let progress = car.progress(track_length) / track_length;
                        car.flying = true;
                        car.health -= 100.0;
                        car.no_control += item.level / 4.0 + progress * 0.6;
                        car.item_hit += 1;
                        events.push(RaceEvent::ItemHit {
                            car: c,
                            kind: item.kind,
                        });
                    }
                }
                FieldItemKind::IceShard => {
                    if !car.recover {
                        let progress = car.progress(track_length) / track_length;
                        car.flying = true;
                        car.health -= 50.0;
                        car.frozen = item.level - 1.0 + progress * 0.8;
                        car.item_hit += 1;
                        events.push(RaceEvent::ItemHit {
                            car: c,
                            kind: item.kind,
                        });
                    }
                }
            }
        }

        let item = &mut race.items[i];
        item.z = increase(item.z, dt * item.speed * pace, track_length);
        if item.z >= track_length {
            item.z -= track_length;
        }
        if item.kind != FieldItemKind::Pickup {
            item.life -= dt * pace;
            if item.life <= 0.0 {
                race.items.remove(i);
                continue;
            }
        }
        i += 1;
    }

    race.events.extend(events);
}

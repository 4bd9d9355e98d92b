//! Fixed timestep race tick
//!
//! Advances a race deterministically: intent collection and shaping, item
//! and projectile updates, per-car kinematics, lap accounting, and
//! standings. Every time-scaled quantity multiplies by a single pace
//! factor computed once per tick, so a slow frame stretches the whole
//! simulation uniformly instead of desyncing its parts.

use rand::Rng;

use super::cpu::drive_cpu_cars;
use super::items::{update_items, use_skill};
use super::state::{Car, Intent, RaceEvent, RacePhase, RaceState};
use crate::consts::*;
use crate::{accelerate, increase, limit, pace_factor};

/// Advance the race by one fixed timestep.
///
/// `human_intents` supplies raw intent for human cars in car-index order;
/// CPU cars generate their own. Returns true once every car has finished.
pub fn tick(race: &mut RaceState, human_intents: &[Intent], dt: f32, actual_fps: f32) -> bool {
    if race.paused {
        return race.phase == RacePhase::Finished;
    }

    let pace = pace_factor(actual_fps);
    race.ticks += 1;

    match race.phase {
        RacePhase::Countdown => {
            race.countdown += dt;
            for car in &mut race.cars {
                car.inputs = Intent::default();
            }
            if race.countdown >= COUNTDOWN_SECS {
                race.phase = RacePhase::Racing;
                log::info!("race start");
            }
        }
        RacePhase::Racing => {
            race.time += dt;
            let mut humans = human_intents.iter();
            for car in &mut race.cars {
                if car.is_human {
                    car.inputs = humans.next().copied().unwrap_or_default();
                }
            }
            drive_cpu_cars(race);
            for car in &mut race.cars {
                shape_intent(car, pace);
            }
            for i in 0..race.cars.len() {
                if race.cars[i].inputs.use_item {
                    use_skill(race, i);
                }
            }
        }
        RacePhase::Finished => {
            for car in &mut race.cars {
                car.inputs = Intent::default();
            }
        }
    }

    update_items(race, dt, pace);
    update_cars(race, dt, pace);
    wrap_laps(race);
    update_places(race);
    update_engine_bands(race);

    if race.phase == RacePhase::Racing && race.is_done() {
        race.phase = RacePhase::Finished;
        log::info!("race finished in {:.2}s", race.time);
    }

    race.phase == RacePhase::Finished
}

/// Turn raw intent into effective intent, applying status effects and the
/// mini-turbo bank. Shared by human and CPU cars so every effect binds
/// both the same way.
fn shape_intent(car: &mut Car, pace: f32) {
    let raw = car.inputs;
    car.shake = false;

    let mut shaped = Intent {
        accel: raw.accel,
        ..Intent::default()
    };

    if raw.shake_mash {
        if car.no_control > 0.0 {
            car.no_control -= 0.1;
            car.shake = true;
        }
        if car.frozen > 0.0 {
            car.frozen -= 0.1;
            car.shake = true;
        }
    }

    if car.no_control <= 0.0 && car.frozen <= 0.0 {
        let (mut left, mut right) = (raw.left, raw.right);
        if car.polarity_reversed() {
            std::mem::swap(&mut left, &mut right);
        }
        shaped.left = left;
        shaped.right = right;
    }

    if shaped.left || shaped.right {
        // Lightning drift already forces lateral movement without charging,
        // and reversed steering never banks a charge
        if car.lightning <= 0.0 && !car.polarity_reversed() {
            car.boost += 0.04 * pace;
        }
    } else {
        if car.boost > car.boost_diff {
            car.boost_diff = car.boost;
        }
        car.boost -= 0.1 * pace;
        if car.boost < 0.0 {
            car.boost += 0.1 * pace;
        }
    }

    shaped.use_item = raw.use_item
        && car.no_control <= 0.0
        && car.frozen <= 0.0
        && car.item.is_some()
        && car.item_scrolling <= 0.0;

    car.inputs = shaped;
}

fn update_cars(race: &mut RaceState, dt: f32, pace: f32) {
    let track_length = race.road.track_length;
    let n = race.cars.len();
    let mut events = Vec::new();

    for p in 0..n {
        // Rubber-band reference: the current leader's total progress
        let mut first_pos = 0.0;
        for q in 0..n {
            if q != p && race.cars[q].place == 1 {
                first_pos = race.cars[q].progress(track_length);
            }
        }

        let finished = race.cars[p].finished(race.max_laps);
        if finished {
            race.cars[p].item = None;
            race.cars[p].item_scrolling = 0.0;
        }

        if race.cars[p].lap_flash < 120 {
            race.cars[p].lap_flash += 1;
        }

        // Mini-turbo release: the bank pays out once the banked charge
        // clears the car's threshold, with a success roll that only starts
        // failing after a long streak
        if race.cars[p].boost_diff > race.cars[p].stats.threshold {
            let roll = race.rng.random_range(0..=race.cars[p].has_boosted + 1);
            let car = &mut race.cars[p];
            if roll <= 50 {
                car.has_boosted += 1;
                car.speed_up = 0.6;
                car.speed = MAX_SPEED * 1.2;
                car.boost = -car.boost_diff;
                car.boost_diff = 0.0;
                events.push(RaceEvent::MiniTurbo { car: p });
            } else {
                car.no_control += car.boost_diff / 10.0;
                car.boost = -2.0 * car.boost_diff;
                car.boost_diff = 0.0;
                events.push(RaceEvent::TurboFailed { car: p });
            }
        }

        // Launch arc from hits and knockouts
        {
            let car = &mut race.cars[p];
            if car.flying {
                car.player_y += LAUNCH_RATE + GRAVITY * car.accumulator * pace;
                car.accumulator += pace;
                if car.player_y <= 0.0 {
                    car.player_y = 0.0;
                    car.accumulator = 0.0;
                    car.flying = false;
                }
            }

            if car.no_control > 0.0 {
                car.no_control -= dt * car.stats.recovery * pace;
            }
        }

        // Physical attack window: damage everyone in range every tick it
        // stays open
        if race.cars[p].attack > 0.0 {
            race.cars[p].attack = (race.cars[p].attack - 8.0).max(0.0);
            let pos = race.cars[p].position;
            let x = race.cars[p].player_x;
            for q in 0..n {
                if q == p {
                    continue;
                }
                let other = &mut race.cars[q];
                if (pos - other.position).abs() < SEGMENT_LENGTH * 3.0
                    && (x - other.player_x).abs() <= 0.75
                    && !other.recover
                {
                    other.no_control += 0.2;
                    other.flying = true;
                    other.item_hit += 1;
                    other.health = (other.health - (10.0 * pace).floor()).max(0.0);
                }
            }
        }

        {
            let car = &mut race.cars[p];
            if car.health < 0.0 {
                car.health = 0.0;
            }

            // Knockout: spin out, relaunch, and start refilling
            if car.display_health <= 0.0 {
                car.no_control += 1.5;
                car.flying = true;
                car.display_health = car.stats.max_health;
                car.recover = true;
            }

            if car.health < car.display_health {
                if car.recover {
                    car.health += 3.0 * pace;
                    if car.health >= car.stats.max_health {
                        car.health = car.stats.max_health;
                        car.recover = false;
                    }
                } else {
                    car.display_health -= 5.0 * pace;
                }
            }

            if car.frozen > 0.0 {
                car.frozen -= dt * car.stats.recovery * pace;
            }

            car.hama.advance(pace);
            car.mudo.advance(pace);
        }

        // Slot-machine reroll while the pickup window runs
        if race.cars[p].item_scrolling > 0.0 {
            race.cars[p].item_scrolling -= dt * pace;
            let table = &race.cars[p].stats.skill_table;
            let k = race.rng.random_range(0..table.len());
            let pick = table[k];
            race.cars[p].item = Some(pick);
        }

        let car = &mut race.cars[p];

        // Lightning drift decays from either sign toward zero
        if car.lightning > 0.0 {
            car.lightning -= dt * car.stats.recovery * pace;
        } else if car.lightning < 0.0 {
            car.lightning += dt * car.stats.recovery * pace;
        }

        let f2 = 1.0 + car.speed_up * 5.0;
        if car.speed_up > 0.0 {
            car.speed_up -= dt * pace;
        }

        let old_seg = race.road.find_index(car.position);

        // Hugging the inside of a curve travels a shorter line
        let seg_curve = race.road.segments[old_seg].curve;
        let f4 = if seg_curve < 0.0 {
            ((24.0 - car.player_x * 2.0) / 24.0).max(1.0)
        } else if seg_curve > 0.0 {
            ((24.0 + car.player_x * 2.0) / 24.0).max(1.0)
        } else {
            1.0
        };

        // Rubber band: the further behind the leader, the larger the factor
        let f1 = ((first_pos - car.progress(track_length)) / (first_pos + 1.0) + 1.0).max(1.0);

        car.position = increase(
            car.position,
            dt * car.speed * f4 * f1 * pace,
            track_length * 2.0,
        );

        let new_seg = race.road.find_index(car.position);
        let new_curve = race.road.segments[new_seg].curve;

        let edge = car.player_x.abs() > 1.0;
        let dx = dt * car.speed / (MAX_SPEED * car.stats.max_speed_mod * f4 * f1)
            * if edge { 3.0 } else { 1.7 };

        if car.inputs.left {
            car.player_x -= dx * pace;
        } else if car.inputs.right {
            car.player_x += dx * pace;
        }

        if car.lightning < -0.1 {
            car.player_x -= dx * 2.5 * pace;
        } else if car.lightning > 0.1 {
            car.player_x += dx * 2.5 * pace;
        }

        // Centrifugal drift toward the outside of the curve
        if car.speed > 0.0 {
            car.player_x = accelerate(
                car.player_x,
                ACCEL * car.stats.accel_mod * new_curve / crate::road::curve::HARD * -1.0 * car.speed
                    / (MAX_SPEED * car.stats.max_speed_mod)
                    * 0.0005,
                dt * pace,
            );
        }

        // Forced slowdowns, strongest first
        if finished {
            car.speed = accelerate(car.speed, BRAKING * car.stats.braking_mod * 2.5, dt * pace);
        } else if car.frozen > 0.0 {
            car.speed = accelerate(car.speed, BRAKING * car.stats.braking_mod, dt * pace);
        } else if car.no_control > 0.0 {
            car.speed = accelerate(car.speed, DECEL * car.stats.decel_mod * 0.4, dt * pace);
        }

        if car.inputs.accel {
            if car.no_control <= 0.0 && car.frozen <= 0.0 {
                car.speed = accelerate(car.speed, ACCEL * car.stats.accel_mod * f1, dt * pace);
            }
        } else {
            car.speed = accelerate(car.speed, DECEL * car.stats.decel_mod, dt * pace);
        }

        if car.player_x.abs() > 1.0 && car.speed > OFFROAD_LIMIT * car.stats.offroad_limit_mod {
            car.speed = accelerate(
                car.speed,
                OFFROAD_DECEL * car.stats.offroad_decel_mod,
                dt * pace,
            );
        }

        car.player_x = limit(car.player_x, -MAX_PLAYER_X, MAX_PLAYER_X);

        // Engine jitter applies before the clamp so the cap stays a cap
        let jitter = race.rng.random_range(99..=101) as f32 / 100.0;
        let car = &mut race.cars[p];
        car.speed = limit(
            car.speed * jitter,
            0.0,
            MAX_SPEED * car.stats.max_speed_mod * f2,
        );

        race.update_car_segment(p, old_seg, new_seg);
    }

    race.events.extend(events);
}

/// Wrap positions past the line and account laps
fn wrap_laps(race: &mut RaceState) {
    let track_length = race.road.track_length;
    let time = race.time;
    let max_laps = race.max_laps;
    let mut events = Vec::new();

    for (i, car) in race.cars.iter_mut().enumerate() {
        if car.position >= track_length {
            car.position -= track_length;
            car.laps += 1;
            if car.laps < max_laps {
                car.lap_flash = 0;
                events.push(RaceEvent::LapCompleted {
                    car: i,
                    laps: car.laps,
                });
            } else if car.laps == max_laps {
                car.finish_time = Some(time);
                events.push(RaceEvent::CarFinished { car: i });
            }
        }
    }

    race.events.extend(events);
}

/// Standings by total progress. Finished cars keep their finish order by
/// adding a bonus that outruns anything still on track.
fn update_places(race: &mut RaceState) {
    let track_length = race.road.track_length;
    let n = race.cars.len();

    let mut keyed: Vec<(f32, usize)> = race
        .cars
        .iter()
        .enumerate()
        .map(|(i, car)| {
            let mut key = car.position + car.laps as f32 * track_length;
            if car.finished(race.max_laps) {
                key += (n as u32 - car.place) as f32 * track_length;
            }
            (key, i)
        })
        .collect();
    keyed.sort_by(|a, b| a.0.total_cmp(&b.0));

    for (rank, (_, i)) in keyed.iter().enumerate() {
        race.cars[*i].place = (n - rank) as u32;
    }
}

fn update_engine_bands(race: &mut RaceState) {
    let mut events = Vec::new();
    for (i, car) in race.cars.iter_mut().enumerate() {
        let band = car.current_engine_band();
        if band != car.engine_band {
            car.engine_band = band;
            events.push(RaceEvent::EngineBand { car: i, band });
        }
    }
    race.events.extend(events);
}

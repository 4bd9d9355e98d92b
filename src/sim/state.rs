//! Race state and core simulation types
//!
//! `RaceState` is the single aggregate owning everything a race needs:
//! the built road, the cars, live field items, timers, and the seeded
//! simulation RNG. It is created at race start and dropped at race end;
//! nothing here is global.

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::items::{FieldItem, FieldItemKind, SkillId};
use crate::consts::*;
use crate::data::CarStats;
use crate::road::{CourseLayout, Road};

/// Current phase of the race
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RacePhase {
    /// Pre-race countdown; the world ticks but no intent is accepted
    Countdown,
    /// Active racing
    Racing,
    /// Every car has finished
    Finished,
}

/// Raw per-tick intent for one car, from a human input collector or the
/// CPU driver. `shake_mash` is the discrete "mash out of a freeze" event.
#[derive(Debug, Clone, Copy, Default)]
pub struct Intent {
    pub left: bool,
    pub right: bool,
    pub accel: bool,
    pub use_item: bool,
    pub shake_mash: bool,
}

/// A timed steering-reversal debuff (hama or mudo) plus the caster-side
/// screen tint. The alpha ramps 0..512 and back; the debuff is in effect
/// whenever alpha is positive, which makes the tint and the control
/// reversal fade out together.
#[derive(Debug, Clone, Copy, Default)]
pub struct Debuff {
    pub active: bool,
    pub alpha: f32,
    pub casting: bool,
    pub cast_alpha: f32,
}

impl Debuff {
    pub fn advance(&mut self, pace: f32) {
        if self.active {
            self.alpha += 5.0 * pace;
            if self.alpha >= 512.0 {
                self.active = false;
            }
        } else if self.alpha > 0.0 {
            self.alpha = (self.alpha - 5.0 * pace).max(0.0);
        }

        if self.casting {
            self.cast_alpha += 5.0 * pace;
            if self.cast_alpha >= 512.0 {
                self.casting = false;
            }
        } else if self.cast_alpha > 0.0 {
            self.cast_alpha = (self.cast_alpha - 5.0 * pace).max(0.0);
        }
    }

    /// Under the debuff, or anywhere in a ramp (immunity window)
    pub fn busy(&self) -> bool {
        self.alpha > 0.0 || self.cast_alpha > 0.0
    }
}

/// Discrete events the core raises for external audio/achievement layers.
/// The core never blocks on these; they are drained by the caller per tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RaceEvent {
    ItemUsed { car: usize, skill: SkillId },
    ItemHit { car: usize, kind: FieldItemKind },
    MiniTurbo { car: usize },
    TurboFailed { car: usize },
    PolarityCast { car: usize, skill: SkillId },
    LapCompleted { car: usize, laps: u32 },
    CarFinished { car: usize },
    /// Engine pitch band changed (0 = silent, 1..=3 = low/mid/high)
    EngineBand { car: usize, band: u8 },
}

/// One racer
#[derive(Debug, Clone)]
pub struct Car {
    pub stats: CarStats,
    pub is_human: bool,

    /// Scalar distance along the track, wraps at track length
    pub position: f32,
    /// Lateral offset in road-width units; beyond ±1 is offroad
    pub player_x: f32,
    /// Preferred lane for the CPU driver (the spawn offset)
    pub lane: f32,
    /// Airborne height from launches
    pub player_y: f32,
    pub speed: f32,

    pub laps: u32,
    pub place: u32,
    pub finish_time: Option<f32>,

    /// Held item, if any
    pub item: Option<SkillId>,
    /// Remaining slot-machine reroll window after grabbing a pickup
    pub item_scrolling: f32,

    // Mini-turbo bank
    pub boost: f32,
    pub boost_diff: f32,
    pub has_boosted: u32,

    // Timed status counters
    pub no_control: f32,
    pub frozen: f32,
    /// Signed lightning drift magnitude (zio)
    pub lightning: f32,
    pub speed_up: f32,
    /// Physical attack active window
    pub attack: f32,
    pub hama: Debuff,
    pub mudo: Debuff,

    // Launch physics
    pub flying: bool,
    pub accumulator: f32,

    // Health, with the deliberately-lagging display value
    pub health: f32,
    pub display_health: f32,
    pub recover: bool,

    /// Shaped intent for the current tick
    pub inputs: Intent,

    // Cosmetic state surfaced to the renderer
    pub shake: bool,
    pub lap_flash: u32,

    // Achievement facts
    pub item_hit: u32,
    pub item_use: u32,
    pub skills_used: [u32; 7],

    pub engine_band: u8,
}

impl Car {
    pub fn new(stats: CarStats, is_human: bool, player_x: f32) -> Self {
        let health = stats.max_health;
        Self {
            stats,
            is_human,
            position: 0.0,
            player_x,
            lane: player_x,
            player_y: 0.0,
            speed: 0.0,
            laps: 0,
            place: 0,
            finish_time: None,
            item: None,
            item_scrolling: 0.0,
            boost: 0.0,
            boost_diff: 0.0,
            has_boosted: 0,
            no_control: 0.0,
            frozen: 0.0,
            lightning: 0.0,
            speed_up: 0.0,
            attack: 0.0,
            hama: Debuff::default(),
            mudo: Debuff::default(),
            flying: false,
            accumulator: 0.0,
            health,
            display_health: health,
            recover: false,
            inputs: Intent::default(),
            shake: false,
            lap_flash: 0,
            item_hit: 0,
            item_use: 0,
            skills_used: [0; 7],
            engine_band: 0,
        }
    }

    /// Steering is reversed while either polarity debuff is in effect
    pub fn polarity_reversed(&self) -> bool {
        self.hama.alpha > 0.0 || self.mudo.alpha > 0.0
    }

    /// Immune to new polarity casts while under or casting one
    pub fn polarity_busy(&self) -> bool {
        self.hama.busy() || self.mudo.busy()
    }

    pub fn finished(&self, max_laps: u32) -> bool {
        self.laps >= max_laps
    }

    /// Total distance covered, for standings and rubber-banding
    pub fn progress(&self, track_length: f32) -> f32 {
        self.position + (self.laps as f32 - 1.0) * track_length
    }

    /// Engine pitch band for the audio layer
    pub fn current_engine_band(&self) -> u8 {
        let meter = 70.0 * self.speed / (MAX_SPEED * self.stats.max_speed_mod);
        if meter >= 60.0 {
            3
        } else if meter >= 30.0 {
            2
        } else if meter > 0.0 {
            1
        } else {
            0
        }
    }
}

/// Everything a race owns, created at race start and dropped at race end
#[derive(Debug)]
pub struct RaceState {
    pub road: Road,
    pub cars: Vec<Car>,
    pub items: Vec<FieldItem>,

    pub phase: RacePhase,
    pub paused: bool,
    /// Elapsed countdown time, seconds
    pub countdown: f32,
    /// Elapsed race time, seconds
    pub time: f32,
    pub ticks: u64,
    pub max_laps: u32,

    pub events: Vec<RaceEvent>,

    pub seed: u64,
    /// Simulation RNG stream; visual jitter uses a separate free-running
    /// stream owned by the renderer
    pub rng: Pcg32,
}

impl RaceState {
    /// Build a race: generate the course, grid the cars on shuffled start
    /// lanes, seed the pickup boxes, and grant the starting lap.
    pub fn new(
        seed: u64,
        palette: crate::data::CoursePalette,
        roster: Vec<(CarStats, bool)>,
    ) -> Self {
        let mut rng = Pcg32::seed_from_u64(seed);
        let layout = CourseLayout::generate(&mut rng);
        let road = Road::build(&layout, palette, &mut rng);
        let track_length = road.track_length;

        let mut positions: Vec<f32> = (0..roster.len().min(6))
            .map(|i| -1.0 + i as f32 * (2.0 / 5.0))
            .collect();
        positions.shuffle(&mut rng);

        let cars: Vec<Car> = roster
            .into_iter()
            .zip(positions)
            .map(|((stats, is_human), x)| Car::new(stats, is_human, x))
            .collect();

        let mut state = Self {
            road,
            cars,
            items: Vec::new(),
            phase: RacePhase::Countdown,
            paused: false,
            countdown: 0.0,
            time: 0.0,
            ticks: 0,
            max_laps: MAX_LAPS,
            events: Vec::new(),
            seed,
            rng,
        };

        state.spawn_pickup_boxes(track_length);
        state.reset_segment_cars();

        // Starting lap grant: crossing the line for the "first" time
        for car in &mut state.cars {
            car.laps = 1;
        }

        log::info!(
            "race ready: {} segments, track length {}, {} cars",
            state.road.segments.len(),
            track_length,
            state.cars.len()
        );

        state
    }

    /// Pickup boxes sit at fixed track fractions, five lanes each. They are
    /// permanent scenery; collisions grant a reroll window, never consume.
    fn spawn_pickup_boxes(&mut self, track_length: f32) {
        for frac in [1.0, 6.0, 9.0, 12.0] {
            for x in [-0.8, 0.8, 0.0, -0.4, 0.4] {
                self.items
                    .push(FieldItem::pickup(track_length * frac / 16.0, x));
            }
        }
    }

    /// Rebuild per-segment car lists from scratch
    pub fn reset_segment_cars(&mut self) {
        for seg in &mut self.road.segments {
            seg.cars.clear();
        }
        for i in 0..self.cars.len() {
            let idx = self.road.find_index(self.cars[i].position);
            self.road.segments[idx].cars.push(i);
        }
    }

    /// Move a car between segment membership lists
    pub fn update_car_segment(&mut self, car: usize, old_seg: usize, new_seg: usize) {
        if old_seg != new_seg {
            self.road.segments[old_seg].cars.retain(|c| *c != car);
            self.road.segments[new_seg].cars.push(car);
        }
    }

    pub fn is_done(&self) -> bool {
        self.cars.iter().all(|c| c.finished(self.max_laps))
    }

    pub fn push_event(&mut self, event: RaceEvent) {
        self.events.push(event);
    }

    /// Drain the events raised since the last call (audio/achievements seam)
    pub fn take_events(&mut self) -> Vec<RaceEvent> {
        std::mem::take(&mut self.events)
    }

    /// Facts for the external achievement evaluator
    pub fn report(&self) -> RaceReport {
        RaceReport {
            race_time: self.time,
            cars: self
                .cars
                .iter()
                .map(|c| CarReport {
                    name: c.stats.name.clone(),
                    is_human: c.is_human,
                    place: c.place,
                    laps: c.laps,
                    final_health: c.health,
                    max_health: c.stats.max_health,
                    item_hit: c.item_hit,
                    item_use: c.item_use,
                    skills_used: c.skills_used,
                    finish_time: c.finish_time,
                })
                .collect(),
        }
    }
}

/// End-of-race facts per car, for external achievement evaluation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarReport {
    pub name: String,
    pub is_human: bool,
    pub place: u32,
    pub laps: u32,
    pub final_health: f32,
    pub max_health: f32,
    pub item_hit: u32,
    pub item_use: u32,
    pub skills_used: [u32; 7],
    pub finish_time: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceReport {
    pub race_time: f32,
    pub cars: Vec<CarReport>,
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::data::{CharacterSheet, CoursePalette, PersonaSheet};

    pub(crate) fn default_stats() -> CarStats {
        CarStats::derive(&CharacterSheet::default(), &PersonaSheet::default(), 0)
    }

    pub(crate) fn race(n: usize) -> RaceState {
        let roster = (0..n).map(|i| (default_stats(), i == 0)).collect();
        RaceState::new(77, CoursePalette::default(), roster)
    }

    #[test]
    fn test_new_race_grid() {
        let state = race(6);
        assert_eq!(state.cars.len(), 6);
        assert_eq!(state.phase, RacePhase::Countdown);
        // Start lanes are the shuffled grid offsets
        let mut lanes: Vec<f32> = state.cars.iter().map(|c| c.lane).collect();
        lanes.sort_by(f32::total_cmp);
        for (i, lane) in lanes.iter().enumerate() {
            assert!((lane - (-1.0 + i as f32 * 0.4)).abs() < 1e-6);
        }
        // Everyone starts on the granted lap
        assert!(state.cars.iter().all(|c| c.laps == 1));
    }

    #[test]
    fn test_pickup_boxes_seeded() {
        let state = race(2);
        let pickups = state
            .items
            .iter()
            .filter(|i| i.kind == FieldItemKind::Pickup)
            .count();
        assert_eq!(pickups, 20);
    }

    #[test]
    fn test_same_seed_same_course() {
        let a = race(3);
        let b = race(3);
        assert_eq!(a.road.segments.len(), b.road.segments.len());
        let lanes_a: Vec<f32> = a.cars.iter().map(|c| c.lane).collect();
        let lanes_b: Vec<f32> = b.cars.iter().map(|c| c.lane).collect();
        assert_eq!(lanes_a, lanes_b);
    }

    #[test]
    fn test_segment_membership_moves() {
        let mut state = race(2);
        let old = state.road.find_index(state.cars[0].position);
        assert!(state.road.segments[old].cars.contains(&0));
        state.update_car_segment(0, old, old + 5);
        assert!(!state.road.segments[old].cars.contains(&0));
        assert!(state.road.segments[old + 5].cars.contains(&0));
    }

    #[test]
    fn test_debuff_ramp_full_cycle() {
        let mut d = Debuff {
            active: true,
            ..Default::default()
        };
        let mut saw_peak = false;
        for _ in 0..400 {
            d.advance(1.0);
            if d.alpha >= 512.0 {
                saw_peak = true;
            }
        }
        assert!(saw_peak);
        assert!(!d.active);
        assert_eq!(d.alpha, 0.0);
    }

    #[test]
    fn test_engine_band_thresholds() {
        let mut car = Car::new(default_stats(), false, 0.0);
        assert_eq!(car.current_engine_band(), 0);
        car.speed = MAX_SPEED * car.stats.max_speed_mod;
        assert_eq!(car.current_engine_band(), 3);
        car.speed = MAX_SPEED * car.stats.max_speed_mod * 0.5;
        assert_eq!(car.current_engine_band(), 2);
        car.speed = MAX_SPEED * car.stats.max_speed_mod * 0.1;
        assert_eq!(car.current_engine_band(), 1);
    }
}

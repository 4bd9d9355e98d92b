//! CPU driver
//!
//! Fills in raw intent for every non-human car. The driver only produces
//! the same intent a human controller would; the shared shaping pass in
//! the tick applies polarity reversal, boost banking, and item gating, so
//! CPU cars obey every status effect the same way players do.

use rand::Rng;

use super::state::{Intent, RaceState};

/// One steering decision per CPU car per tick.
///
/// Steering pulls toward the inside of the current curve relative to the
/// car's preferred lane, and always pulls back from the road edges. Item
/// use is a 1-in-50 roll each tick on the simulation stream.
pub fn drive_cpu_cars(race: &mut RaceState) {
    for i in 0..race.cars.len() {
        if race.cars[i].is_human {
            continue;
        }

        let mut intent = Intent::default();
        let car = &race.cars[i];

        if car.no_control <= 0.0 && car.frozen <= 0.0 {
            let seg = race.road.find_segment(car.position);
            intent.left = (seg.curve < 0.0 && car.player_x > car.lane) || car.player_x > 1.0;
            intent.right = (seg.curve > 0.0 && car.player_x < car.lane) || car.player_x < -1.0;
            intent.accel = true;
            intent.use_item = race.rng.random_range(1..=50) == 1;
        }

        race.cars[i].inputs = intent;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::tests::race;

    #[test]
    fn test_human_intent_untouched() {
        let mut state = race(2);
        state.cars[0].inputs.left = true;
        drive_cpu_cars(&mut state);
        assert!(state.cars[0].inputs.left);
        assert!(state.cars[1].inputs.accel);
    }

    #[test]
    fn test_steers_back_from_edges() {
        let mut state = race(2);
        state.cars[1].player_x = 1.5;
        drive_cpu_cars(&mut state);
        assert!(state.cars[1].inputs.left);
        assert!(!state.cars[1].inputs.right);

        state.cars[1].player_x = -1.5;
        drive_cpu_cars(&mut state);
        assert!(state.cars[1].inputs.right);
        assert!(!state.cars[1].inputs.left);
    }

    #[test]
    fn test_frozen_car_coasts() {
        let mut state = race(2);
        state.cars[1].frozen = 1.0;
        drive_cpu_cars(&mut state);
        assert!(!state.cars[1].inputs.accel);
        assert!(!state.cars[1].inputs.left);
        assert!(!state.cars[1].inputs.right);
    }

    #[test]
    fn test_seeks_preferred_lane_in_curves() {
        let mut state = race(2);
        // Find a curved segment and park the car on its outside
        let idx = state
            .road
            .segments
            .iter()
            .position(|s| s.curve < 0.0)
            .expect("generated course has a left curve");
        let z = state.road.segments[idx].p1.z;
        state.cars[1].position = z;
        state.cars[1].lane = -0.5;
        state.cars[1].player_x = 0.5;
        drive_cpu_cars(&mut state);
        assert!(state.cars[1].inputs.left);
    }

    #[test]
    fn test_item_roll_is_deterministic() {
        let mut a = race(3);
        let mut b = race(3);
        for _ in 0..200 {
            drive_cpu_cars(&mut a);
            drive_cpu_cars(&mut b);
            for (x, y) in a.cars.iter().zip(&b.cars) {
                assert_eq!(x.inputs.use_item, y.inputs.use_item);
            }
        }
    }
}

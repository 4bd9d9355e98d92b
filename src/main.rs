//! Retro Rally headless demo
//!
//! Runs a full CPU-only race at the fixed sim rate, logging race events as
//! they happen and printing the end-of-race report as JSON. Useful for
//! checking course generation and race balance without a frontend.

use std::path::Path;

use retro_rally::Settings;
use retro_rally::consts::*;
use retro_rally::data::{CarStats, CharacterSheet, CoursePalette, PersonaSheet};
use retro_rally::render::Renderer;
use retro_rally::sim::{RaceEvent, RaceState, tick};

/// Default grid when no data files are present on disk
const ROSTER: [(&str, &str); 6] = [
    ("aki", "polydeuces"),
    ("mitsuru", "penthesilea"),
    ("junpei", "hermes"),
    ("yukari", "io"),
    ("fuuka", "lucia"),
    ("ken", "nemesis"),
];

fn load_roster(data_dir: &Path, engine: i32) -> Vec<(CarStats, bool)> {
    ROSTER
        .iter()
        .map(|(character, persona)| {
            let sheet = CharacterSheet::load(&data_dir.join(format!("characters/{character}.txt")));
            let persona = PersonaSheet::load(&data_dir.join(format!("personas/{persona}.txt")));
            (CarStats::derive(&sheet, &persona, engine), false)
        })
        .collect()
}

fn main() {
    env_logger::init();

    let settings = Settings::load(Path::new("settings.json"));
    let data_dir = Path::new("data");
    let engine = settings.engine_class.handicap();

    let seed = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| {
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0)
        });
    log::info!("starting race with seed {seed}");

    let palette = CoursePalette::load(&data_dir.join("courses/city.txt"));
    let roster = load_roster(data_dir, engine);
    let mut race = RaceState::new(seed, palette, roster);
    let mut renderer = Renderer::new(seed ^ 0x5DEECE66D, settings.draw_distance());

    // Hard cap so a pathological race can't spin forever
    let max_ticks = 60 * 60 * 30;
    let mut done = false;
    for _ in 0..max_ticks {
        done = tick(&mut race, &[], SIM_DT, TARGET_FPS);

        for event in race.take_events() {
            match event {
                RaceEvent::ItemUsed { car, skill } => {
                    log::info!("{} uses {skill:?}", race.cars[car].stats.name);
                }
                RaceEvent::MiniTurbo { car } => {
                    log::info!("{} pulls off a mini-turbo", race.cars[car].stats.name);
                }
                RaceEvent::LapCompleted { car, laps } => {
                    log::info!("{} starts lap {laps}", race.cars[car].stats.name);
                }
                RaceEvent::CarFinished { car } => {
                    log::info!(
                        "{} finishes at {:.2}s",
                        race.cars[car].stats.name,
                        race.time
                    );
                }
                _ => {}
            }
        }

        if done {
            break;
        }
    }

    if !done {
        log::warn!("race did not finish within {max_ticks} ticks");
    }

    // One frame from the leader's seat, to exercise the draw path
    let leader = race
        .cars
        .iter()
        .position(|c| c.place == 1)
        .unwrap_or_default();
    let ops = renderer.render_frame(&mut race, leader, TARGET_FPS);
    log::info!(
        "final frame: {} draw ops from {}'s camera",
        ops.len(),
        race.cars[leader].stats.name
    );

    let report = race.report();
    match serde_json::to_string_pretty(&report) {
        Ok(json) => println!("{json}"),
        Err(e) => log::error!("failed to serialize race report: {e}"),
    }
}

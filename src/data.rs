//! Stat, persona, and course-palette resolution
//!
//! Entity data lives in simple `key = value` text files. Raw numbers are
//! converted into the modifiers the simulation actually consumes here, at
//! load time. A missing or corrupt file is never fatal mid-race: loaders
//! fall back to in-memory defaults and log a warning.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::road::Rgb;
use crate::sim::items::SkillId;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("bad value for `{key}`: {value}")]
    BadValue { key: String, value: String },
}

/// Iterate `key = value` lines, skipping anything that doesn't match
fn kv_lines(text: &str) -> impl Iterator<Item = (&str, &str)> {
    text.lines().filter_map(|line| {
        let (key, value) = line.split_once('=')?;
        Some((key.trim(), value.trim()))
    })
}

fn parse_num<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, DataError> {
    value.parse().map_err(|_| DataError::BadValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_rgb(key: &str, value: &str) -> Result<Rgb, DataError> {
    let mut parts = value.split(',').map(str::trim);
    let mut next = |k: &str| -> Result<u8, DataError> {
        let p = parts.next().ok_or_else(|| DataError::BadValue {
            key: k.to_string(),
            value: value.to_string(),
        })?;
        parse_num(k, p)
    };
    Ok(Rgb([next(key)?, next(key)?, next(key)?]))
}

/// Raw per-character numbers, as they appear in a character data file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterSheet {
    pub name: String,
    pub max_speed: i32,
    pub accel: i32,
    pub offroad: i32,
    pub recovery: i32,
    pub threshold: i32,
    pub health: i32,
}

impl Default for CharacterSheet {
    fn default() -> Self {
        Self {
            name: "???".into(),
            max_speed: 4,
            accel: 4,
            offroad: 4,
            recovery: 4,
            threshold: 4,
            health: 1000,
        }
    }
}

impl CharacterSheet {
    pub fn parse(text: &str) -> Result<Self, DataError> {
        let mut sheet = Self::default();
        for (key, value) in kv_lines(text) {
            match key {
                "name" => sheet.name = value.to_string(),
                "max_speed" => sheet.max_speed = parse_num(key, value)?,
                "accel" => sheet.accel = parse_num(key, value)?,
                "offroad" => sheet.offroad = parse_num(key, value)?,
                "recovery" => sheet.recovery = parse_num(key, value)?,
                "threshold" => sheet.threshold = parse_num(key, value)?,
                "health" => sheet.health = parse_num(key, value)?,
                _ => {}
            }
        }
        Ok(sheet)
    }

    /// Load from disk, falling back to default stats on any failure
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path).map_err(DataError::from) {
            Ok(text) => match Self::parse(&text) {
                Ok(sheet) => sheet,
                Err(e) => {
                    log::warn!("corrupt character file {}: {e}, using defaults", path.display());
                    Self::default()
                }
            },
            Err(e) => {
                log::warn!("missing character file {}: {e}, using defaults", path.display());
                Self::default()
            }
        }
    }
}

/// Persona stat modifiers plus the weighted skill-draw table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaSheet {
    pub name: String,
    /// Additive modifiers: max_speed, accel, offroad, recovery, threshold
    pub stat_mod: [i32; 5],
    /// Draw probability per skill, 0..1
    pub weights: [f32; 7],
}

impl Default for PersonaSheet {
    fn default() -> Self {
        Self {
            name: "???".into(),
            stat_mod: [0; 5],
            // Uniform draw when no persona file is available
            weights: [1.0 / 7.0; 7],
        }
    }
}

impl PersonaSheet {
    pub fn parse(text: &str) -> Result<Self, DataError> {
        let mut sheet = Self::default();
        sheet.weights = [0.0; 7];
        for (key, value) in kv_lines(text) {
            match key {
                "name" => sheet.name = value.to_string(),
                "max_speed" => sheet.stat_mod[0] = parse_num(key, value)?,
                "accel" => sheet.stat_mod[1] = parse_num(key, value)?,
                "offroad" => sheet.stat_mod[2] = parse_num(key, value)?,
                "recovery" => sheet.stat_mod[3] = parse_num(key, value)?,
                "threshold" => sheet.stat_mod[4] = parse_num(key, value)?,
                "agi" => sheet.weights[0] = parse_num(key, value)?,
                "bufu" => sheet.weights[1] = parse_num(key, value)?,
                "garu" => sheet.weights[2] = parse_num(key, value)?,
                "zio" => sheet.weights[3] = parse_num(key, value)?,
                "hama" => sheet.weights[4] = parse_num(key, value)?,
                "mudo" => sheet.weights[5] = parse_num(key, value)?,
                "phys" => sheet.weights[6] = parse_num(key, value)?,
                _ => {}
            }
        }
        if sheet.weights.iter().all(|w| *w <= 0.0) {
            sheet.weights = PersonaSheet::default().weights;
        }
        Ok(sheet)
    }

    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path).map_err(DataError::from) {
            Ok(text) => match Self::parse(&text) {
                Ok(sheet) => sheet,
                Err(e) => {
                    log::warn!("corrupt persona file {}: {e}, using defaults", path.display());
                    Self::default()
                }
            },
            Err(e) => {
                log::warn!("missing persona file {}: {e}, using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Expand the per-skill probabilities into a flat choice table.
    ///
    /// Each skill contributes `weight * 50` entries, so a uniform draw from
    /// the table reproduces the configured odds with 2% granularity.
    pub fn choice_table(&self) -> Vec<SkillId> {
        let mut table = Vec::new();
        for (i, weight) in self.weights.iter().enumerate() {
            let n = (weight * 50.0) as usize;
            for _ in 0..n {
                table.push(SkillId::ALL[i]);
            }
        }
        if table.is_empty() {
            table.extend_from_slice(&SkillId::ALL);
        }
        table
    }
}

/// Fully derived per-car stat modifiers, ready for the simulation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarStats {
    pub name: String,
    pub max_speed_mod: f32,
    pub accel_mod: f32,
    pub braking_mod: f32,
    pub decel_mod: f32,
    pub offroad_decel_mod: f32,
    pub offroad_limit_mod: f32,
    pub recovery: f32,
    pub threshold: f32,
    pub max_health: f32,
    /// Weighted item-draw table (pre-expanded)
    pub skill_table: Vec<SkillId>,
}

impl CarStats {
    /// Combine character numbers, persona modifiers, and the engine class.
    ///
    /// The scaling constants are game balance: raw file values are small
    /// integers, modifiers come out near 1.0, and a heavier engine class
    /// trades top-end stats for raw health.
    pub fn derive(character: &CharacterSheet, persona: &PersonaSheet, engine: i32) -> Self {
        let m = &persona.stat_mod;
        let engine = engine as f32;

        let max_speed = 0.8 + 0.012 * (character.max_speed as f32 - 1.0 - engine + m[0] as f32);
        let accel_mod = (1.4 + 0.4 * (character.accel as f32 - 1.0 - engine + m[1] as f32)) * 1.02;
        let offroad_decel_mod =
            (accel_mod + 0.24 * (7.0 - (character.offroad as f32 - engine + m[2] as f32))) * 1.02;

        Self {
            name: character.name.clone(),
            max_speed_mod: max_speed * 1.02,
            accel_mod,
            braking_mod: max_speed * 0.5 * 1.02,
            decel_mod: max_speed * 0.5 * 1.02,
            offroad_decel_mod,
            offroad_limit_mod: 0.75,
            recovery: 1.2 + 0.1 * (character.recovery as f32 - 2.0 - engine + m[3] as f32),
            threshold: 1.5 * (7.0 - (character.threshold as f32 - engine + m[4] as f32)),
            max_health: (character.health as f32 - engine * 100.0).max(1.0),
            skill_table: persona.choice_table(),
        }
    }
}

/// Course texture colors and band lengths, resolved at load time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoursePalette {
    pub fog: Rgb,
    pub light_road: Rgb,
    pub dark_road: Rgb,
    pub light_offroad: Rgb,
    pub dark_offroad: Rgb,
    pub light_wall: Rgb,
    pub dark_wall: Rgb,
    pub light_rumble: Rgb,
    pub dark_rumble: Rgb,
    pub ceiling: Rgb,
    /// Segments sharing one wall color
    pub strip: usize,
    /// Segments sharing one road color
    pub road: usize,
}

impl Default for CoursePalette {
    fn default() -> Self {
        Self {
            fog: Rgb([0, 0, 0]),
            light_road: Rgb([100, 100, 100]),
            dark_road: Rgb([90, 90, 90]),
            light_offroad: Rgb([0, 110, 0]),
            dark_offroad: Rgb([0, 100, 0]),
            light_wall: Rgb([140, 140, 140]),
            dark_wall: Rgb([120, 120, 120]),
            light_rumble: Rgb([220, 220, 220]),
            dark_rumble: Rgb([180, 40, 40]),
            ceiling: Rgb([40, 40, 80]),
            strip: 3,
            road: 2,
        }
    }
}

impl CoursePalette {
    pub fn parse(text: &str) -> Result<Self, DataError> {
        let mut palette = Self::default();
        for (key, value) in kv_lines(text) {
            match key {
                "fog" => palette.fog = parse_rgb(key, value)?,
                "light_road" => palette.light_road = parse_rgb(key, value)?,
                "dark_road" => palette.dark_road = parse_rgb(key, value)?,
                "light_offroad" => palette.light_offroad = parse_rgb(key, value)?,
                "dark_offroad" => palette.dark_offroad = parse_rgb(key, value)?,
                "light_wall" => palette.light_wall = parse_rgb(key, value)?,
                "dark_wall" => palette.dark_wall = parse_rgb(key, value)?,
                "light_rumble" => palette.light_rumble = parse_rgb(key, value)?,
                "dark_rumble" => palette.dark_rumble = parse_rgb(key, value)?,
                "ceiling" => palette.ceiling = parse_rgb(key, value)?,
                "strip" => palette.strip = parse_num::<usize>(key, value)?.max(1),
                "road" => palette.road = parse_num::<usize>(key, value)?.max(1),
                _ => {}
            }
        }
        Ok(palette)
    }

    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path).map_err(DataError::from) {
            Ok(text) => match Self::parse(&text) {
                Ok(palette) => palette,
                Err(e) => {
                    log::warn!("corrupt stage file {}: {e}, using defaults", path.display());
                    Self::default()
                }
            },
            Err(e) => {
                log::warn!("missing stage file {}: {e}, using defaults", path.display());
                Self::default()
            }
        }
    }
}

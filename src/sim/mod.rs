//! Deterministic race simulation
//!
//! All gameplay logic lives here. This module must stay pure and
//! deterministic:
//! - Fixed timestep only
//! - Seeded RNG only (the fx stream never feeds back into sim state)
//! - Stable iteration order (cars and items by index)
//! - No rendering or platform dependencies

pub mod cpu;
pub mod items;
pub mod state;
pub mod tick;

pub use cpu::drive_cpu_cars;
pub use items::{FieldItem, FieldItemKind, SkillId, use_skill};
pub use state::{Car, Debuff, Intent, RaceEvent, RacePhase, RaceReport, RaceState};
pub use tick::tick;

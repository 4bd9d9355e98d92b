//! Backend-agnostic frame emission
//!
//! The renderer walks the road ahead of a viewer car and emits an ordered
//! list of draw ops: background rects, ground trapezoids, walls, then
//! sprites back to front. A platform layer rasterizes the ops however it
//! likes; nothing here touches a GPU or a window.
//!
//! Visual jitter (exhaust, engine bounce, shake) draws from a free-running
//! fx RNG owned by the renderer. The simulation stream is never used here,
//! so rendering cannot perturb race outcomes.

pub mod frame;
pub mod sprites;

pub use frame::{DrawOp, KartPose, Renderer, SpriteId};
pub use sprites::{SpritePlacement, place_sprite};

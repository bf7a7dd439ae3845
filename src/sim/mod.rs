/// Simulation: world state, the per-tick step, level loading and the
/// presentation-side models derived from them (HUD, particles).

pub mod event;
pub mod hud;
pub mod level;
pub mod particles;
pub mod step;
pub mod tiled;
pub mod world;

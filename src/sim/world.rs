/// WorldState: the complete state of the running level.
///
/// ## Layers
///
/// Three tile layers, all the same size:
///   - `background`: drawn only, never collides.
///   - `platforms` : `Tile::Solid` cells block the player; `Tile::Scenery`
///     cells are platform art without collision.
///   - `water`     : optional; any `Tile::Water` cell is lethal.
///
/// Tiles never change during play. Items are removed from `items` when
/// collected, so a restart reloads the whole level from its definition.
///
/// ## Camera / Viewport
///
/// World coordinates are pixels; the camera works in tile cells:
///   - `camera`: viewport into the world (top-left cell + size)
///   - Renderer maps: `screen(sx, sy) = world(camera.x + sx, camera.y + sy)`
///   - Camera follows the player with a dead-zone approach
///   - Maps smaller than the viewport are centered
///
/// The HUD is composed in screen space and never goes through the camera.

use crate::config::{PhysicsConfig, RulesConfig};
use crate::domain::entity::{Door, Item, Player, Spike};
use crate::domain::physics::{self, PhysicsParams};
use crate::domain::rules::{Outcome, Session};
use crate::domain::tile::TileGrid;
use super::level::LevelStart;
use super::particles::ParticleSystem;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    Playing,
    Won,
    Lost,
}

impl Phase {
    pub fn is_ended(self) -> bool {
        !matches!(self, Phase::Playing)
    }
}

/// Camera: a viewport into the world.
///
/// `(x, y)` is the world cell of the top-left visible cell.
/// `(view_w, view_h)` is how many world cells fit in the viewport.
/// These are computed from terminal size and set during `render()`.
#[derive(Clone, Debug)]
pub struct Camera {
    /// World X of the top-left visible cell (can be negative for centering)
    pub x: i32,
    /// World Y of the top-left visible cell
    pub y: i32,
    /// Number of world columns visible
    pub view_w: usize,
    /// Number of world rows visible
    pub view_h: usize,
}

impl Camera {
    pub fn new() -> Self {
        Camera { x: 0, y: 0, view_w: 0, view_h: 0 }
    }

    /// Update camera to follow a target cell within the given world bounds.
    /// Only scrolls when the target leaves the inner dead zone.
    pub fn follow(&mut self, target_x: usize, target_y: usize, world_w: usize, world_h: usize) {
        if self.view_w == 0 || self.view_h == 0 { return; }
        self.x = follow_axis(self.x, target_x as i32, self.view_w as i32, world_w as i32);
        self.y = follow_axis(self.y, target_y as i32, self.view_h as i32, world_h as i32);
    }

    /// Snap camera directly to center on a cell (no dead zone).
    /// Used on level load / restart.
    pub fn center_on(&mut self, target_x: usize, target_y: usize, world_w: usize, world_h: usize) {
        if self.view_w == 0 || self.view_h == 0 { return; }
        self.x = center_axis(target_x as i32, self.view_w as i32, world_w as i32);
        self.y = center_axis(target_y as i32, self.view_h as i32, world_h as i32);
    }

    /// Convert world cell to viewport cell.
    /// Returns None if outside the visible area.
    pub fn world_to_view(&self, wx: i32, wy: i32) -> Option<(usize, usize)> {
        let vx = wx - self.x;
        let vy = wy - self.y;
        if vx >= 0 && vx < self.view_w as i32 && vy >= 0 && vy < self.view_h as i32 {
            Some((vx as usize, vy as usize))
        } else {
            None
        }
    }
}

fn follow_axis(cam: i32, target: i32, view: i32, world: i32) -> i32 {
    if world <= view {
        return -((view - world) / 2);
    }
    // Dead zone: 20% margin on each side
    let margin = view / 5;
    let mut pos = cam;
    if target < pos + margin {
        pos = target - margin;
    } else if target > pos + view - margin - 1 {
        pos = target - view + margin + 1;
    }
    pos.max(0).min((world - view).max(0))
}

fn center_axis(target: i32, view: i32, world: i32) -> i32 {
    if world <= view {
        return -((view - world) / 2);
    }
    (target - view / 2).max(0).min((world - view).max(0))
}

pub struct WorldState {
    // ── Tile layers ──
    pub background: TileGrid,
    pub platforms: TileGrid,
    pub water: Option<TileGrid>,
    /// Map size in tiles
    pub width: usize,
    pub height: usize,
    pub tile_size: f32,

    // ── Entities ──
    pub player: Player,
    pub items: Vec<Item>,
    pub spikes: Vec<Spike>,
    pub doors: Vec<Door>,

    // ── Session ──
    pub session: Session,
    pub phase: Phase,
    /// Payload this level was entered with (used by restart).
    pub entry: LevelStart,
    /// Set by the step when the door opens onto another level; main consumes it.
    pub pending_level: Option<(usize, LevelStart)>,

    // ── Tuning ──
    pub physics: PhysicsConfig,
    pub rules: RulesConfig,

    // ── Meta ──
    pub current_level: usize,
    pub total_levels: usize,
    pub level_name: String,
    pub tick: u64,
    /// Simulation clock; advances only while playing and unpaused.
    pub time_ms: u64,
    pub footstep_timer_ms: u64,

    // ── UI ──
    pub message: String,
    pub message_timer: u32,
    pub anim_tick: u32,
    pub paused: bool,

    // ── Spawn ──
    pub spawn: (f32, f32),

    // ── Camera / VFX ──
    pub camera: Camera,
    pub particles: ParticleSystem,
}

// ── Terrain queries ──

impl WorldState {
    pub fn map_height_px(&self) -> f32 {
        self.height as f32 * self.tile_size
    }

    /// Is there water under this world point?
    pub fn water_at(&self, wx: f32, wy: f32) -> bool {
        match &self.water {
            Some(layer) => physics::tile_at_world(layer, self.tile_size, wx, wy).is_lethal(),
            None => false,
        }
    }

    /// Player centre as a tile cell (clamped into the map).
    pub fn player_cell(&self) -> (usize, usize) {
        let cx = (self.player.x / self.tile_size).floor().max(0.0) as usize;
        let cy = (self.player.y / self.tile_size).floor().max(0.0) as usize;
        (cx.min(self.width.saturating_sub(1)), cy.min(self.height.saturating_sub(1)))
    }

    pub fn physics_params(&self) -> PhysicsParams {
        PhysicsParams {
            gravity: self.physics.gravity,
            max_fall_speed: self.physics.max_fall_speed,
            substeps: self.physics.substeps,
            tile_size: self.tile_size,
        }
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.session.outcome
    }
}

// ── Construction ──

impl WorldState {
    pub fn new(physics: PhysicsConfig, rules: RulesConfig) -> Self {
        let max_health = rules.max_health;
        WorldState {
            background: TileGrid::default(),
            platforms: TileGrid::default(),
            water: None,
            width: 0,
            height: 0,
            tile_size: 18.0,
            player: Player::new(0.0, 0.0, physics.player_width, physics.player_height),
            items: vec![],
            spikes: vec![],
            doors: vec![],
            session: Session::new(0, max_health),
            phase: Phase::Playing,
            entry: LevelStart::default(),
            pending_level: None,
            physics,
            rules,
            current_level: 0,
            total_levels: 0,
            level_name: String::new(),
            tick: 0,
            time_ms: 0,
            footstep_timer_ms: 0,
            message: String::new(),
            message_timer: 0,
            anim_tick: 0,
            paused: false,
            spawn: (0.0, 0.0),
            camera: Camera::new(),
            particles: ParticleSystem::new(0x5EED),
        }
    }

    pub fn set_message(&mut self, msg: &str, duration: u32) {
        self.message = msg.to_string();
        self.message_timer = duration;
    }

    /// Tick the transient message; shared by every phase.
    pub fn tick_message(&mut self) {
        if self.message_timer > 0 {
            self.message_timer -= 1;
            if self.message_timer == 0 { self.message.clear(); }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camera_centers_small_maps() {
        let mut cam = Camera::new();
        cam.view_w = 40;
        cam.view_h = 20;
        cam.follow(5, 5, 20, 10);
        assert_eq!(cam.x, -10);
        assert_eq!(cam.y, -5);
    }

    #[test]
    fn camera_dead_zone_scrolls_only_near_edges() {
        let mut cam = Camera::new();
        cam.view_w = 20;
        cam.view_h = 10;
        cam.center_on(50, 5, 100, 10);
        assert_eq!(cam.x, 40);
        // Inside the dead zone: no scroll
        cam.follow(52, 5, 100, 10);
        assert_eq!(cam.x, 40);
        // Past the right margin: scroll
        cam.follow(60, 5, 100, 10);
        assert_eq!(cam.x, 60 - 20 + 4 + 1);
        // Clamped at the world edge
        cam.follow(99, 5, 100, 10);
        assert_eq!(cam.x, 80);
    }

    #[test]
    fn world_to_view_culls() {
        let mut cam = Camera::new();
        cam.view_w = 10;
        cam.view_h = 5;
        cam.x = 3;
        cam.y = 1;
        assert_eq!(cam.world_to_view(3, 1), Some((0, 0)));
        assert_eq!(cam.world_to_view(13, 1), None);
        assert_eq!(cam.world_to_view(2, 1), None);
    }

    #[test]
    fn phase_end_states() {
        assert!(!Phase::Playing.is_ended());
        assert!(Phase::Won.is_ended());
        assert!(Phase::Lost.is_ended());
    }
}

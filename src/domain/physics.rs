/// Arcade physics: one dynamic body against a static tile grid.
///
/// ## Model
///
///   - Gravity accelerates the body downward every substep, capped at
///     `max_fall_speed` so a single substep never skips a whole tile.
///   - Movement is resolved per axis: X first, then Y. Each axis moves the
///     body, then pushes it out of every solid tile it now overlaps.
///   - The left, right and top edges of the map are walls. The bottom is open;
///     falling out of the map is a gameplay decision, not a physics one.
///
/// ## Blocked flags
///
/// `Blocked::down` is the "grounded" signal: the body tried to move into a
/// solid tile below it during this step. Because gravity always pulls, a body
/// resting on the floor re-touches it every step and stays grounded.

use super::entity::Player;
use super::tile::{Tile, TileGrid};

/// Physics parameters for one step.
#[derive(Clone, Copy, Debug)]
pub struct PhysicsParams {
    pub gravity: f32,
    pub max_fall_speed: f32,
    pub substeps: u32,
    pub tile_size: f32,
}

/// Which sides of the body were blocked during a step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Blocked {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl Blocked {
    fn merge(&mut self, other: Blocked) {
        self.up |= other.up;
        self.down |= other.down;
        self.left |= other.left;
        self.right |= other.right;
    }
}

/// Tile under a world-space point.
#[inline]
pub fn tile_at_world(grid: &TileGrid, tile_size: f32, wx: f32, wy: f32) -> Tile {
    if wx < 0.0 || wy < 0.0 { return Tile::Empty; }
    grid.get_signed((wx / tile_size).floor() as i32, (wy / tile_size).floor() as i32)
}

/// Inclusive tile index range covered by the half-open span `[min, max)`.
#[inline]
fn tile_span(min: f32, max: f32, tile_size: f32) -> (i32, i32) {
    let lo = (min / tile_size).floor() as i32;
    let hi = ((max - 1e-3) / tile_size).floor() as i32;
    (lo, hi.max(lo))
}

/// Advance the player's body by `dt` seconds. Returns the blocked sides.
pub fn step_body(
    player: &mut Player,
    solids: &TileGrid,
    params: &PhysicsParams,
    dt: f32,
) -> Blocked {
    let mut blocked = Blocked::default();
    let substeps = params.substeps.max(1);
    let sdt = dt / substeps as f32;
    let world_w = solids.width as f32 * params.tile_size;

    for _ in 0..substeps {
        player.vy = (player.vy + params.gravity * sdt).min(params.max_fall_speed);

        player.x += player.vx * sdt;
        blocked.merge(resolve_x(player, solids, params.tile_size));

        player.y += player.vy * sdt;
        blocked.merge(resolve_y(player, solids, params.tile_size));

        blocked.merge(clamp_to_bounds(player, world_w));
    }

    player.grounded = blocked.down;
    blocked
}

fn resolve_x(player: &mut Player, solids: &TileGrid, ts: f32) -> Blocked {
    let mut blocked = Blocked::default();
    if player.vx == 0.0 { return blocked; }

    let body = player.body();
    let (tx0, tx1) = tile_span(body.x, body.right(), ts);
    let (ty0, ty1) = tile_span(body.y, body.bottom(), ts);

    for ty in ty0..=ty1 {
        for tx in tx0..=tx1 {
            if !solids.get_signed(tx, ty).is_solid() { continue; }
            let tile_left = tx as f32 * ts;
            let tile_right = tile_left + ts;
            if player.vx > 0.0 {
                player.x = player.x.min(tile_left - player.width / 2.0);
                blocked.right = true;
            } else {
                player.x = player.x.max(tile_right + player.width / 2.0);
                blocked.left = true;
            }
        }
    }

    if blocked.left || blocked.right {
        player.vx = 0.0;
    }
    blocked
}

fn resolve_y(player: &mut Player, solids: &TileGrid, ts: f32) -> Blocked {
    let mut blocked = Blocked::default();
    if player.vy == 0.0 { return blocked; }

    let body = player.body();
    let (tx0, tx1) = tile_span(body.x, body.right(), ts);
    let (ty0, ty1) = tile_span(body.y, body.bottom(), ts);

    for ty in ty0..=ty1 {
        for tx in tx0..=tx1 {
            if !solids.get_signed(tx, ty).is_solid() { continue; }
            let tile_top = ty as f32 * ts;
            let tile_bottom = tile_top + ts;
            if player.vy > 0.0 {
                // Landed
                player.y = player.y.min(tile_top - player.height / 2.0);
                blocked.down = true;
            } else {
                // Head bump
                player.y = player.y.max(tile_bottom + player.height / 2.0);
                blocked.up = true;
            }
        }
    }

    if blocked.down || blocked.up {
        player.vy = 0.0;
    }
    blocked
}

fn clamp_to_bounds(player: &mut Player, world_w: f32) -> Blocked {
    let mut blocked = Blocked::default();
    let half_w = player.width / 2.0;
    let half_h = player.height / 2.0;

    if player.x - half_w < 0.0 {
        player.x = half_w;
        player.vx = 0.0;
        blocked.left = true;
    } else if world_w > 0.0 && player.x + half_w > world_w {
        player.x = world_w - half_w;
        player.vx = 0.0;
        blocked.right = true;
    }

    if player.y - half_h < 0.0 {
        player.y = half_h;
        player.vy = player.vy.max(0.0);
        blocked.up = true;
    }
    blocked
}

/// The step function: advances the world by one tick.
///
/// Processing order:
///   1. Horizontal movement (held direction)
///   2. Jump gating (edge-triggered)
///   3. Physics (gravity + tile collision)
///   4. Item pickups
///   5. Spike contact (with cooldown)
///   6. Water under the feet
///   7. Door (key + fresh interact press)
///   8. Falling out of the map
///   9. Footstep timer
///
/// Every stage after physics may end the game. Once the end latch is set
/// the step is a no-op, so a replay needs a fresh `start_level`.

use crate::domain::entity::{Facing, FrameInput, ItemKind};
use crate::domain::physics;
use crate::domain::rules::{self, LossCause, Outcome, SpikeContact};
use super::event::GameEvent;
use super::level::LevelStart;
use super::world::{Phase, WorldState};

// ══════════════════════════════════════════════════════════════
// Main entry point
// ══════════════════════════════════════════════════════════════

pub fn step(world: &mut WorldState, input: FrameInput) -> Vec<GameEvent> {
    if world.phase != Phase::Playing || world.paused { return vec![]; }
    // Level transition waiting to be picked up by the game loop
    if world.pending_level.is_some() { return vec![]; }

    let mut events: Vec<GameEvent> = Vec::new();
    let dt_ms = world.physics.tick_rate_ms;
    world.tick += 1;
    world.time_ms += dt_ms;
    world.tick_message();

    if !world.player.active { return events; }

    resolve_horizontal(world, input.movement);
    resolve_jump(world, input.jump, &mut events);

    let params = world.physics_params();
    physics::step_body(&mut world.player, &world.platforms, &params, dt_ms as f32 / 1000.0);

    resolve_items(world, &mut events);
    if resolve_spikes(world, &mut events) { return events; }
    if resolve_water(world, &mut events) { return events; }
    if resolve_door(world, input.interact, &mut events) { return events; }
    if resolve_fall(world, &mut events) { return events; }
    resolve_footsteps(world, dt_ms, &mut events);

    events
}

// ══════════════════════════════════════════════════════════════
// Movement
// ══════════════════════════════════════════════════════════════

fn resolve_horizontal(world: &mut WorldState, movement: Option<Facing>) {
    let speed = world.physics.move_speed;
    let p = &mut world.player;
    match movement {
        Some(Facing::Left) => {
            p.vx = -speed;
            p.facing = Facing::Left;
        }
        Some(Facing::Right) => {
            p.vx = speed;
            p.facing = Facing::Right;
        }
        None => p.vx = 0.0,
    }
}

/// Ground contact refills every stage. Leaving the ground without jumping
/// spends the ground stage, so a ledge walk-off leaves only the air jumps.
fn resolve_jump(world: &mut WorldState, jump_pressed: bool, events: &mut Vec<GameEvent>) {
    let impulses = &world.physics.jump_impulses;
    let p = &mut world.player;

    if p.grounded {
        p.jumps_used = 0;
    } else if p.jumps_used == 0 {
        p.jumps_used = 1;
    }

    if !jump_pressed { return; }
    if !rules::can_jump(p.grounded, p.jumps_used, impulses.len()) { return; }

    p.vy = -rules::jump_impulse(impulses, p.jumps_used);
    p.jumps_used = p.jumps_used.saturating_add(1);
    p.grounded = false;
    events.push(GameEvent::Jumped {
        stage: p.jumps_used,
        x: p.x,
        y: p.y + p.height / 2.0,
    });
}

// ══════════════════════════════════════════════════════════════
// Overlaps
// ══════════════════════════════════════════════════════════════

fn resolve_items(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    let body = world.player.body();
    let mut collected = vec![];
    world.items.retain(|item| {
        if item.rect.overlaps(&body) {
            collected.push(item.clone());
            false
        } else {
            true
        }
    });

    for item in collected {
        match item.kind {
            ItemKind::Coin => world.session.add_score(world.rules.coin_score),
            ItemKind::Diamond => world.session.add_score(world.rules.diamond_score),
            ItemKind::Heart => { world.session.heal(1); }
            ItemKind::Key => {
                world.player.has_key = true;
                world.set_message("Got the key! Find the door.", 90);
            }
        }
        let (x, y) = item.rect.center();
        log::debug!("collected {:?}, score {}", item.kind, world.session.score);
        events.push(GameEvent::ItemCollected { kind: item.kind, x, y });
    }
}

/// Returns true if the game ended.
fn resolve_spikes(world: &mut WorldState, events: &mut Vec<GameEvent>) -> bool {
    let body = world.player.body();
    if !world.spikes.iter().any(|s| s.rect.overlaps(&body)) { return false; }

    match world.session.spike_contact(world.time_ms, world.rules.spike_cooldown_ms) {
        SpikeContact::Hurt(health) => {
            log::debug!("spike hit at {} ms, health {}", world.time_ms, health);
            events.push(GameEvent::SpikeHit { health });
            if health == 0 {
                end_game(world, Outcome::Lost(LossCause::OutOfHealth), events);
                return true;
            }
            false
        }
        SpikeContact::Cooldown => false,
        SpikeContact::Ignored => true,
    }
}

/// Returns true if the level is over (advance or win).
fn resolve_door(world: &mut WorldState, interact: bool, events: &mut Vec<GameEvent>) -> bool {
    let body = world.player.body();
    if !world.doors.iter().any(|d| d.rect.overlaps(&body)) { return false; }

    if !rules::door_opens(world.player.has_key, interact) {
        if interact {
            events.push(GameEvent::DoorLocked);
            world.set_message("You need a key!", 90);
        }
        return false;
    }

    let next = world.current_level + 1;
    let score = world.session.score;
    if next < world.total_levels {
        world.player.freeze();
        world.pending_level = Some((next, LevelStart { score }));
        log::info!("door opened, advancing to level {} with score {}", next + 1, score);
        events.push(GameEvent::LevelAdvanced { next, score });
    } else {
        end_game(world, Outcome::Won, events);
    }
    true
}

fn resolve_water(world: &mut WorldState, events: &mut Vec<GameEvent>) -> bool {
    let (fx, fy) = world.player.feet();
    if !world.water_at(fx, fy) { return false; }
    end_game(world, Outcome::Lost(LossCause::Drowned), events);
    true
}

fn resolve_fall(world: &mut WorldState, events: &mut Vec<GameEvent>) -> bool {
    if world.player.y <= world.map_height_px() { return false; }
    end_game(world, Outcome::Lost(LossCause::FellOut), events);
    true
}

// ══════════════════════════════════════════════════════════════
// Timers
// ══════════════════════════════════════════════════════════════

/// Walking on the ground emits a footstep every `footstep_interval_ms`,
/// the first one as soon as walking starts.
fn resolve_footsteps(world: &mut WorldState, dt_ms: u64, events: &mut Vec<GameEvent>) {
    let interval = world.rules.footstep_interval_ms;
    let p = &world.player;
    if !p.grounded || p.vx == 0.0 || interval == 0 {
        world.footstep_timer_ms = interval;
        return;
    }
    world.footstep_timer_ms += dt_ms;
    if world.footstep_timer_ms >= interval {
        world.footstep_timer_ms = 0;
        events.push(GameEvent::Footstep { x: p.x, y: p.y + p.height / 2.0 });
    }
}

// ══════════════════════════════════════════════════════════════
// End latch
// ══════════════════════════════════════════════════════════════

/// Enter the end state. Only the first call has any effect.
fn end_game(world: &mut WorldState, outcome: Outcome, events: &mut Vec<GameEvent>) {
    if !world.session.end(outcome) { return; }

    world.player.freeze();
    world.footstep_timer_ms = 0;
    match outcome {
        Outcome::Won => {
            world.phase = Phase::Won;
            events.push(GameEvent::GameWon { score: world.session.score });
        }
        Outcome::Lost(cause) => {
            world.phase = Phase::Lost;
            events.push(GameEvent::PlayerKilled { cause });
        }
    }
    log::info!("game ended: {:?} with score {}", outcome, world.session.score);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::domain::entity::{Door, Rect};
    use crate::sim::level::{parse_ascii_level, start_level, LevelDef};

    fn world_from(maps: &[&[&str]]) -> WorldState {
        let cfg = GameConfig::default();
        let mut w = WorldState::new(cfg.physics, cfg.rules);
        let levels: Vec<LevelDef> = maps.iter()
            .map(|rows| parse_ascii_level("test", rows).unwrap())
            .collect();
        start_level(&mut w, &levels, 0, LevelStart::default());
        w
    }

    fn held(dir: Facing) -> FrameInput {
        FrameInput { movement: Some(dir), ..FrameInput::default() }
    }

    fn run(w: &mut WorldState, input: FrameInput, ticks: usize) -> Vec<GameEvent> {
        let mut all = vec![];
        for _ in 0..ticks {
            all.extend(step(w, input));
        }
        all
    }

    fn count(events: &[GameEvent], pred: impl Fn(&GameEvent) -> bool) -> usize {
        events.iter().filter(|e| pred(e)).count()
    }

    #[test]
    fn three_coins_and_a_diamond_score_80() {
        let mut w = world_from(&[&[
            "          ",
            " P c c c d",
            "##########",
        ]]);
        let events = run(&mut w, held(Facing::Right), 60);
        assert_eq!(w.session.score, 80);
        assert!(w.items.is_empty());
        assert_eq!(count(&events, |e| matches!(e, GameEvent::ItemCollected { .. })), 4);
    }

    #[test]
    fn horizontal_velocity_and_facing() {
        let mut w = world_from(&[&["          ", "    P     ", "##########"]]);
        step(&mut w, held(Facing::Left));
        assert_eq!(w.player.vx, -200.0);
        assert_eq!(w.player.facing, Facing::Left);
        step(&mut w, held(Facing::Right));
        assert_eq!(w.player.vx, 200.0);
        assert_eq!(w.player.facing, Facing::Right);
        step(&mut w, FrameInput::default());
        assert_eq!(w.player.vx, 0.0);
        assert_eq!(w.player.facing, Facing::Right);
    }

    fn tall_room() -> WorldState {
        world_from(&[&[
            "      ",
            "      ",
            "      ",
            "      ",
            "      ",
            "      ",
            "      ",
            "      ",
            "  P   ",
            "######",
        ]])
    }

    #[test]
    fn double_jump_then_no_more() {
        let mut w = tall_room();
        run(&mut w, FrameInput::default(), 5);
        assert!(w.player.grounded);

        let jump = FrameInput { jump: true, ..FrameInput::default() };
        let e1 = step(&mut w, jump);
        assert!(matches!(e1[0], GameEvent::Jumped { stage: 1, .. }));
        let e2 = step(&mut w, jump);
        assert!(matches!(e2[0], GameEvent::Jumped { stage: 2, .. }));
        let e3 = step(&mut w, jump);
        assert_eq!(count(&e3, |e| matches!(e, GameEvent::Jumped { .. })), 0);

        // Landing refills both stages
        run(&mut w, FrameInput::default(), 120);
        assert!(w.player.grounded);
        assert_eq!(count(&step(&mut w, jump), |e| matches!(e, GameEvent::Jumped { .. })), 1);
    }

    #[test]
    fn walking_off_a_ledge_leaves_one_air_jump() {
        let mut w = world_from(&[&[
            "        ",
            "        ",
            "        ",
            "        ",
            "        ",
            "        ",
            " P      ",
            "##      ",
            "        ",
            "        ",
            "        ",
            "        ",
        ]]);
        run(&mut w, FrameInput::default(), 5);
        assert!(w.player.grounded);
        while w.player.grounded {
            step(&mut w, held(Facing::Right));
        }
        let jump = FrameInput { jump: true, ..FrameInput::default() };
        let events = run(&mut w, jump, 3);
        assert_eq!(count(&events, |e| matches!(e, GameEvent::Jumped { .. })), 1);
    }

    fn spike_pit() -> WorldState {
        world_from(&[&[
            " P ",
            " ^ ",
            "###",
        ]])
    }

    #[test]
    fn continuous_spike_contact_within_cooldown_hurts_once() {
        let mut w = spike_pit();
        // 62 ticks of 16 ms: under one second of contact
        let events = run(&mut w, FrameInput::default(), 62);
        assert_eq!(count(&events, |e| matches!(e, GameEvent::SpikeHit { .. })), 1);
        assert_eq!(w.session.health, 2);
    }

    #[test]
    fn spike_contact_past_cooldown_hurts_again() {
        let mut w = spike_pit();
        let events = run(&mut w, FrameInput::default(), 110);
        assert_eq!(count(&events, |e| matches!(e, GameEvent::SpikeHit { .. })), 2);
        assert_eq!(w.session.health, 1);
    }

    #[test]
    fn health_zero_ends_game_exactly_once_and_freezes_player() {
        let mut w = spike_pit();
        let events = run(&mut w, FrameInput::default(), 400);
        assert_eq!(w.session.health, 0);
        assert_eq!(w.phase, Phase::Lost);
        assert_eq!(w.outcome(), Some(Outcome::Lost(LossCause::OutOfHealth)));
        assert_eq!(count(&events, |e| matches!(e, GameEvent::PlayerKilled { .. })), 1);
        assert!(!w.player.active && !w.player.visible);

        // Input no longer moves the actor
        let (x, y) = (w.player.x, w.player.y);
        let after = run(&mut w, held(Facing::Right), 30);
        assert!(after.is_empty());
        assert_eq!((w.player.x, w.player.y), (x, y));
        assert_eq!(w.player.vx, 0.0);
    }

    #[test]
    fn end_game_is_idempotent() {
        let mut w = spike_pit();
        let mut events = vec![];
        end_game(&mut w, Outcome::Lost(LossCause::FellOut), &mut events);
        end_game(&mut w, Outcome::Won, &mut events);
        end_game(&mut w, Outcome::Lost(LossCause::Drowned), &mut events);
        assert_eq!(events, vec![GameEvent::PlayerKilled { cause: LossCause::FellOut }]);
        assert_eq!(w.phase, Phase::Lost);
    }

    #[test]
    fn hearts_heal_up_to_the_cap() {
        let mut w = world_from(&[&[
            "        ",
            " P hhh  ",
            "########",
        ]]);
        w.session.health = 1;
        run(&mut w, held(Facing::Right), 40);
        assert_eq!(w.session.health, 3);
        assert_eq!(w.items.len(), 0);
    }

    #[test]
    fn water_is_lethal_regardless_of_health() {
        let mut w = world_from(&[&[
            " P ",
            " ~ ",
            "###",
        ]]);
        assert_eq!(w.session.health, 3);
        let events = run(&mut w, FrameInput::default(), 30);
        assert_eq!(w.outcome(), Some(Outcome::Lost(LossCause::Drowned)));
        assert!(events.contains(&GameEvent::PlayerKilled { cause: LossCause::Drowned }));
    }

    #[test]
    fn water_beats_a_door_opened_on_the_same_tick() {
        let mut w = world_from(&[&[
            " P ",
            " ~ ",
            "###",
        ]]);
        let ts = w.tile_size;
        // Door over the lower half of the pool: touching it means the feet are wet
        w.doors.push(Door { rect: Rect::new(ts, ts * 1.5, ts, ts * 0.5) });
        w.player.has_key = true;
        let press = FrameInput { interact: true, ..FrameInput::default() };
        let events = run(&mut w, press, 30);
        assert_eq!(w.outcome(), Some(Outcome::Lost(LossCause::Drowned)));
        assert_eq!(count(&events, |e| matches!(e, GameEvent::GameWon { .. })), 0);
    }

    #[test]
    fn falling_out_of_the_map_is_a_loss() {
        let mut w = world_from(&[&[
            " P ",
            "   ",
        ]]);
        run(&mut w, FrameInput::default(), 60);
        assert_eq!(w.outcome(), Some(Outcome::Lost(LossCause::FellOut)));
    }

    #[test]
    fn door_needs_a_fresh_interact_press() {
        let mut w = world_from(&[&[
            "      ",
            " Pk D ",
            "######",
        ]]);
        // Walk onto the door holding right, never pressing interact
        run(&mut w, held(Facing::Right), 16);
        assert!(w.player.has_key);
        assert!(w.doors[0].rect.overlaps(&w.player.body()));
        run(&mut w, FrameInput::default(), 30);
        assert_eq!(w.phase, Phase::Playing);

        let press = FrameInput { interact: true, ..FrameInput::default() };
        let events = step(&mut w, press);
        assert_eq!(w.phase, Phase::Won);
        assert!(events.contains(&GameEvent::GameWon { score: 0 }));
    }

    #[test]
    fn door_without_key_stays_locked() {
        let mut w = world_from(&[&[
            "     ",
            " P D ",
            "#####",
        ]]);
        run(&mut w, held(Facing::Right), 12);
        assert!(w.doors[0].rect.overlaps(&w.player.body()));
        let press = FrameInput { interact: true, ..FrameInput::default() };
        let events = step(&mut w, press);
        assert_eq!(events, vec![GameEvent::DoorLocked]);
        assert_eq!(w.message, "You need a key!");
        assert_eq!(w.phase, Phase::Playing);
    }

    #[test]
    fn door_on_earlier_level_advances_with_score() {
        let mut w = world_from(&[
            &["      ", " Pkc D", "######"],
            &["   ", " P ", "###"],
        ]);
        run(&mut w, held(Facing::Right), 25);
        let press = FrameInput { interact: true, ..FrameInput::default() };
        let events = step(&mut w, press);
        assert!(events.contains(&GameEvent::LevelAdvanced { next: 1, score: 10 }));
        assert_eq!(w.pending_level, Some((1, LevelStart { score: 10 })));
        assert_eq!(w.phase, Phase::Playing);
        // Frozen until the loop loads the next level
        assert!(step(&mut w, held(Facing::Left)).is_empty());
    }

    #[test]
    fn footsteps_only_while_walking_on_ground() {
        let mut w = world_from(&[&[
            "                                        ",
            " P                                      ",
            "########################################",
        ]]);
        let idle = run(&mut w, FrameInput::default(), 30);
        assert_eq!(count(&idle, |e| matches!(e, GameEvent::Footstep { .. })), 0);
        let walking = run(&mut w, held(Facing::Right), 60);
        assert!(count(&walking, |e| matches!(e, GameEvent::Footstep { .. })) >= 3);
    }

    #[test]
    fn pause_freezes_simulation() {
        let mut w = spike_pit();
        w.paused = true;
        let events = run(&mut w, held(Facing::Right), 100);
        assert!(events.is_empty());
        assert_eq!(w.time_ms, 0);
        assert_eq!(w.session.health, 3);
    }
}

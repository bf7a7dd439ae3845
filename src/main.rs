/// Entry point and game loop.

mod config;
mod domain;
mod sim;
mod ui;

use std::fs::File;
use std::time::{Duration, Instant};

use crossterm::event::KeyCode;

use config::GameConfig;
use domain::entity::{Facing, FrameInput};
use sim::event::GameEvent;
use sim::level::{self, LevelDef, LevelStart};
use sim::step;
use sim::world::{Phase, WorldState};
use ui::gamepad::GamepadState;
use ui::input::InputState;
use ui::renderer::Renderer;
use ui::sound::{self, SoundEngine};

const FRAME_SLEEP: Duration = Duration::from_millis(5);

fn main() {
    let config = GameConfig::load();
    init_logging(&config);
    log::info!("tilehop starting, levels dir {}", config.levels_dir.display());

    let levels = level::load_level_set(&config);
    let mut world = WorldState::new(config.physics.clone(), config.rules.clone());
    level::start_level(&mut world, &levels, 0, LevelStart::default());

    let mut renderer = Renderer::new();

    if let Err(e) = renderer.init() {
        log::error!("terminal init failed: {}", e);
        eprintln!("Terminal init failed: {e}");
        return;
    }

    let sound = SoundEngine::new();

    let result = game_loop(&mut world, &levels, &mut renderer, sound.as_ref(), &config);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }

    if let Err(e) = &result {
        log::error!("game loop failed: {}", e);
        eprintln!("Game error: {e}");
    }

    log::info!("exiting with score {}", world.session.score);
    println!();
    println!("Thanks for playing Tilehop!");
    println!("Final Score: {}", world.session.score);
}

/// The terminal is in raw mode while playing, so logs go to a file.
/// `RUST_LOG` overrides the configured level.
fn init_logging(config: &GameConfig) {
    let file = match File::create(&config.log_file) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("cannot open log file {}: {e}", config.log_file.display());
            return;
        }
    };
    let env = env_logger::Env::default().default_filter_or(config.log_level.as_str());
    let _ = env_logger::Builder::from_env(env)
        .target(env_logger::Target::Pipe(Box::new(file)))
        .format_timestamp_millis()
        .try_init();
}

fn game_loop(
    world: &mut WorldState,
    levels: &[LevelDef],
    renderer: &mut Renderer,
    sound: Option<&SoundEngine>,
    config: &GameConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut kb = InputState::new();
    kb.honor_release = renderer.enable_key_release();
    let mut gp = GamepadState::new();
    gp.load_button_config(&config.gamepad);
    log::info!("gamepad connected: {}, key release events: {}", gp.connected, kb.honor_release);
    let mut last_tick = Instant::now();
    let tick_rate = Duration::from_millis(config.physics.tick_rate_ms);
    let dt = config.physics.tick_rate_ms as f32 / 1000.0;

    loop {
        kb.drain_events();
        gp.update();

        if kb.ctrl_c_pressed() {
            break;
        }

        // Clicks are per drain; presses wait for the next tick
        if world.phase.is_ended() {
            let clicked = renderer.replay_button
                .is_some_and(|b| kb.clicks.iter().any(|&(c, r)| b.contains(c, r)));
            if clicked {
                level::replay(world, levels);
            }
        }

        if last_tick.elapsed() >= tick_rate {
            if handle_meta(world, levels, &kb, &gp) {
                break;
            }

            if world.phase == Phase::Playing && !world.paused {
                let frame_input = FrameInput {
                    movement: detect_movement(&kb, &gp),
                    jump: kb.any_pressed(KEYS_JUMP) || gp.jump_pressed(),
                    interact: kb.any_pressed(KEYS_INTERACT) || gp.interact_pressed(),
                };
                let events = step::step(world, frame_input);
                process_events(world, sound, &events);

                if let Some((next, start)) = world.pending_level.take() {
                    level::start_level(world, levels, next, start);
                }
            }

            // VFX keep running on the end screen
            world.particles.update(dt);
            world.anim_tick = world.anim_tick.wrapping_add(1);

            kb.take_presses();
            gp.take_presses();
            last_tick = Instant::now();
        }

        renderer.render(world)?;
        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(())
}

fn process_events(world: &mut WorldState, sound: Option<&SoundEngine>, events: &[GameEvent]) {
    world.particles.spawn_for(events);
    if let Some(sfx) = sound {
        for effect in sound::sfx_for(events) {
            sfx.play(effect);
        }
    }
}

// ── Key Constants ──

const KEYS_LEFT: &[KeyCode] = &[KeyCode::Left, KeyCode::Char('a'), KeyCode::Char('A')];
const KEYS_RIGHT: &[KeyCode] = &[KeyCode::Right, KeyCode::Char('d'), KeyCode::Char('D')];
const KEYS_JUMP: &[KeyCode] = &[KeyCode::Char(' '), KeyCode::Up, KeyCode::Char('w'), KeyCode::Char('W')];
const KEYS_INTERACT: &[KeyCode] = &[KeyCode::Char('e'), KeyCode::Char('E')];
const KEYS_REPLAY: &[KeyCode] = &[KeyCode::Enter, KeyCode::Char('r'), KeyCode::Char('R')];
const KEYS_PAUSE: &[KeyCode] = &[KeyCode::Char('p'), KeyCode::Char('P')];
const KEYS_QUIT: &[KeyCode] = &[KeyCode::Esc, KeyCode::Char('q'), KeyCode::Char('Q')];

/// Left wins when both directions are held.
fn detect_movement(kb: &InputState, gp: &GamepadState) -> Option<Facing> {
    if kb.any_held(KEYS_LEFT) || kb.any_pressed(KEYS_LEFT) || gp.left_held() {
        Some(Facing::Left)
    } else if kb.any_held(KEYS_RIGHT) || kb.any_pressed(KEYS_RIGHT) || gp.right_held() {
        Some(Facing::Right)
    } else {
        None
    }
}

/// Meta keys: quit, replay, pause, restart. Returns true to quit.
fn handle_meta(world: &mut WorldState, levels: &[LevelDef], kb: &InputState, gp: &GamepadState) -> bool {
    if kb.any_pressed(KEYS_QUIT) || gp.quit_pressed() {
        return true;
    }

    // ── Ended: only replay responds ──
    if world.phase.is_ended() {
        if kb.any_pressed(KEYS_REPLAY) || gp.replay_pressed() {
            log::info!("replay requested");
            level::replay(world, levels);
        }
        return false;
    }

    // P / Start: Pause / Resume
    if kb.any_pressed(KEYS_PAUSE) || gp.replay_pressed() {
        world.paused = !world.paused;
        log::debug!("paused: {}", world.paused);
        return false;
    }

    // F2: Restart level (also from the pause screen)
    if kb.any_pressed(&[KeyCode::F(2)]) {
        level::restart_level(world, levels);
        world.set_message("Level restarted", 40);
        log::info!("level {} restarted", world.current_level + 1);
    }

    false
}

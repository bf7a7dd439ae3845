/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or incomplete.

use serde::Deserialize;
use std::path::PathBuf;

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub physics: PhysicsConfig,
    pub rules: RulesConfig,
    pub gamepad: GamepadConfig,
    pub levels_dir: PathBuf,
    pub log_file: PathBuf,
    pub log_level: String,
}

/// Arcade physics tuning. Units are world pixels and seconds.
#[derive(Clone, Debug)]
pub struct PhysicsConfig {
    pub tick_rate_ms: u64,
    pub substeps: u32,
    pub gravity: f32,
    pub move_speed: f32,
    /// Upward impulse per jump stage. Its length is the number of jumps
    /// allowed between two ground contacts.
    pub jump_impulses: Vec<f32>,
    pub max_fall_speed: f32,
    pub player_width: f32,
    pub player_height: f32,
}

#[derive(Clone, Debug)]
pub struct RulesConfig {
    pub coin_score: u32,
    pub diamond_score: u32,
    pub max_health: u32,
    pub spike_cooldown_ms: u64,
    pub replay_from_start: bool,
    pub footstep_interval_ms: u64,
}

#[derive(Clone, Debug)]
pub struct GamepadConfig {
    pub jump: Vec<String>,
    pub interact: Vec<String>,
    pub replay: Vec<String>,
    pub quit: Vec<String>,
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    physics: TomlPhysics,
    #[serde(default)]
    rules: TomlRules,
    #[serde(default)]
    gamepad: TomlGamepad,
    #[serde(default)]
    general: TomlGeneral,
}

#[derive(Deserialize, Debug)]
struct TomlPhysics {
    #[serde(default = "default_tick_rate")]
    tick_rate_ms: u64,
    #[serde(default = "default_substeps")]
    substeps: u32,
    #[serde(default = "default_gravity")]
    gravity: f32,
    #[serde(default = "default_move_speed")]
    move_speed: f32,
    #[serde(default = "default_jump_impulses")]
    jump_impulses: Vec<f32>,
    #[serde(default = "default_max_fall_speed")]
    max_fall_speed: f32,
    #[serde(default = "default_player_width")]
    player_width: f32,
    #[serde(default = "default_player_height")]
    player_height: f32,
}

#[derive(Deserialize, Debug)]
struct TomlRules {
    #[serde(default = "default_coin_score")]
    coin_score: u32,
    #[serde(default = "default_diamond_score")]
    diamond_score: u32,
    #[serde(default = "default_max_health")]
    max_health: u32,
    #[serde(default = "default_spike_cooldown")]
    spike_cooldown_ms: u64,
    #[serde(default = "default_replay_from_start")]
    replay_from_start: bool,
    #[serde(default = "default_footstep_interval")]
    footstep_interval_ms: u64,
}

#[derive(Deserialize, Debug)]
struct TomlGamepad {
    #[serde(default = "default_pad_jump")]
    jump: Vec<String>,
    #[serde(default = "default_pad_interact")]
    interact: Vec<String>,
    #[serde(default = "default_pad_replay")]
    replay: Vec<String>,
    #[serde(default = "default_pad_quit")]
    quit: Vec<String>,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default = "default_levels_dir")]
    levels_dir: String,
    #[serde(default = "default_log_file")]
    log_file: String,
    #[serde(default = "default_log_level")]
    log_level: String,
}

// ── Defaults ──

fn default_tick_rate() -> u64 { 16 }
fn default_substeps() -> u32 { 2 }
fn default_gravity() -> f32 { 1500.0 }
fn default_move_speed() -> f32 { 200.0 }
fn default_jump_impulses() -> Vec<f32> { vec![450.0, 450.0] }
fn default_max_fall_speed() -> f32 { 1000.0 }  // below tile_size / dt, no tunnelling
fn default_player_width() -> f32 { 14.0 }
fn default_player_height() -> f32 { 18.0 }

fn default_coin_score() -> u32 { 10 }
fn default_diamond_score() -> u32 { 50 }
fn default_max_health() -> u32 { 3 }
fn default_spike_cooldown() -> u64 { 1500 }
fn default_replay_from_start() -> bool { true }
fn default_footstep_interval() -> u64 { 280 }

fn default_pad_jump() -> Vec<String> { vec!["A".into()] }
fn default_pad_interact() -> Vec<String> { vec!["X".into(), "B".into()] }
fn default_pad_replay() -> Vec<String> { vec!["Start".into()] }
fn default_pad_quit() -> Vec<String> { vec!["Select".into()] }

fn default_levels_dir() -> String { "levels".into() }
fn default_log_file() -> String { "tilehop.log".into() }
fn default_log_level() -> String { "info".into() }

impl Default for TomlPhysics {
    fn default() -> Self {
        TomlPhysics {
            tick_rate_ms: default_tick_rate(),
            substeps: default_substeps(),
            gravity: default_gravity(),
            move_speed: default_move_speed(),
            jump_impulses: default_jump_impulses(),
            max_fall_speed: default_max_fall_speed(),
            player_width: default_player_width(),
            player_height: default_player_height(),
        }
    }
}

impl Default for TomlRules {
    fn default() -> Self {
        TomlRules {
            coin_score: default_coin_score(),
            diamond_score: default_diamond_score(),
            max_health: default_max_health(),
            spike_cooldown_ms: default_spike_cooldown(),
            replay_from_start: default_replay_from_start(),
            footstep_interval_ms: default_footstep_interval(),
        }
    }
}

impl Default for TomlGamepad {
    fn default() -> Self {
        TomlGamepad {
            jump: default_pad_jump(),
            interact: default_pad_interact(),
            replay: default_pad_replay(),
            quit: default_pad_quit(),
        }
    }
}

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral {
            levels_dir: default_levels_dir(),
            log_file: default_log_file(),
            log_level: default_log_level(),
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig::from_toml(TomlConfig::default(), &[])
    }
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        GameConfig::default().physics
    }
}

impl Default for RulesConfig {
    fn default() -> Self {
        GameConfig::default().rules
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let toml_cfg = load_toml(&search_dirs);
        GameConfig::from_toml(toml_cfg, &search_dirs)
    }

    /// Parse config text directly. Used by tests and tools.
    #[allow(dead_code)]
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        let cfg = toml::from_str::<TomlConfig>(text)?;
        Ok(GameConfig::from_toml(cfg, &[]))
    }

    fn from_toml(toml_cfg: TomlConfig, search_dirs: &[PathBuf]) -> Self {
        // Resolve levels directory
        let levels_dir_str = &toml_cfg.general.levels_dir;
        let levels_dir = if PathBuf::from(levels_dir_str).is_absolute() {
            PathBuf::from(levels_dir_str)
        } else {
            search_dirs.iter()
                .map(|d| d.join(levels_dir_str))
                .find(|p| p.is_dir())
                .unwrap_or_else(|| PathBuf::from(levels_dir_str))
        };

        let p = toml_cfg.physics;
        // An empty impulse table would forbid jumping entirely; keep one stage.
        let jump_impulses = if p.jump_impulses.is_empty() {
            default_jump_impulses()
        } else {
            p.jump_impulses
        };

        GameConfig {
            physics: PhysicsConfig {
                tick_rate_ms: p.tick_rate_ms.max(1),
                substeps: p.substeps.max(1),
                gravity: p.gravity,
                move_speed: p.move_speed,
                jump_impulses,
                max_fall_speed: p.max_fall_speed,
                player_width: p.player_width,
                player_height: p.player_height,
            },
            rules: RulesConfig {
                coin_score: toml_cfg.rules.coin_score,
                diamond_score: toml_cfg.rules.diamond_score,
                max_health: toml_cfg.rules.max_health.max(1),
                spike_cooldown_ms: toml_cfg.rules.spike_cooldown_ms,
                replay_from_start: toml_cfg.rules.replay_from_start,
                footstep_interval_ms: toml_cfg.rules.footstep_interval_ms,
            },
            gamepad: GamepadConfig {
                jump: toml_cfg.gamepad.jump,
                interact: toml_cfg.gamepad.interact,
                replay: toml_cfg.gamepad.replay,
                quit: toml_cfg.gamepad.quit,
            },
            levels_dir,
            log_file: PathBuf::from(toml_cfg.general.log_file),
            log_level: toml_cfg.general.log_level,
        }
    }
}

/// Candidate directories to search: exe dir + CWD + system paths (deduplicated).
pub fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    // 1. Directory of the running executable
    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    // 2. Current working directory
    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    // 3. XDG data home (~/.local/share/tilehop)
    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/tilehop");
        if xdg.is_dir() && !dirs.iter().any(|d| d == &xdg) {
            dirs.push(xdg);
        }
    }

    // 4. System data directory (/usr/share/tilehop)
    let sys = PathBuf::from("/usr/share/tilehop");
    if sys.is_dir() && !dirs.iter().any(|d| d == &sys) {
        dirs.push(sys);
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Search for config.toml in candidate directories.
///
/// Runs before the logger exists, so problems are reported on stderr
/// (the terminal is not in raw mode yet).
fn load_toml(search_dirs: &[PathBuf]) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(text) => match toml::from_str::<TomlConfig>(&text) {
                    Ok(cfg) => return cfg,
                    Err(e) => {
                        eprintln!("Warning: config.toml parse error: {e}");
                        eprintln!("Using default settings.");
                        return TomlConfig::default();
                    }
                },
                Err(e) => {
                    eprintln!("Warning: could not read {}: {e}", path.display());
                }
            }
        }
    }
    TomlConfig::default()
}

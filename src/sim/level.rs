/// Level set loading and level (re)starts.
///
/// ## Sources (priority order):
///   1. `levels/` directory: Tiled maps (`.tmj` / `.json`) and ASCII maps
///      (`.txt`), ordered by file name
///   2. Built-in embedded levels
///
/// A file that fails to load is logged and skipped; the embedded set is used
/// only when no file loads at all.
///
/// ## ASCII format (`.txt`):
///   Line 1: `# Level Name`
///   Lines: map rows (short rows are padded with empty space)
///
/// ## Tile legend:
///   ' ' = Empty            '.' = Background art
///   '#' = Solid platform   '=' = Platform art (no collision)
///   '~' = Water            'P' = Player spawn
///   'c' = Coin             'd' = Diamond
///   'h' = Heart            'k' = Key
///   '^' = Spikes           'D' = Door

use std::fmt;
use std::path::Path;

use crate::config::GameConfig;
use crate::domain::entity::{Door, Item, ItemKind, Player, Rect, Spike};
use crate::domain::rules::Session;
use crate::domain::tile::{Tile, TileGrid};
use crate::sim::tiled;
use crate::sim::world::{Phase, WorldState};

/// Tile size of ASCII levels, in pixels.
pub const ASCII_TILE_SIZE: f32 = 18.0;

/// Where the player appears when a map names no spawn point.
pub const DEFAULT_SPAWN: (f32, f32) = (50.0, 300.0);

/// Payload handed from one level to the next.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LevelStart {
    pub score: u32,
}

/// A loaded level, ready to be instantiated into the world.
#[derive(Clone, Debug)]
pub struct LevelDef {
    pub name: String,
    pub tile_size: f32,
    pub background: TileGrid,
    pub platforms: TileGrid,
    pub water: Option<TileGrid>,
    pub spawn: Option<(f32, f32)>,
    pub items: Vec<Item>,
    pub spikes: Vec<Spike>,
    pub doors: Vec<Door>,
}

#[derive(Debug)]
pub enum LevelError {
    /// File could not be read
    Io(std::io::Error),
    /// Not valid map JSON
    Parse(serde_json::Error),
    /// A required tile layer is absent
    MissingLayer(&'static str),
    /// Tile layer data does not match the map size
    LayerSize { layer: String, expected: usize, found: usize },
    /// Valid map using a feature this loader does not read
    Unsupported(String),
    /// ASCII level without any map rows
    Empty,
}

impl fmt::Display for LevelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LevelError::Io(e) => write!(f, "I/O error: {}", e),
            LevelError::Parse(e) => write!(f, "parse error: {}", e),
            LevelError::MissingLayer(role) => write!(f, "missing {} layer", role),
            LevelError::LayerSize { layer, expected, found } => {
                write!(f, "layer '{}' has {} tiles, expected {}", layer, found, expected)
            }
            LevelError::Unsupported(what) => write!(f, "unsupported: {}", what),
            LevelError::Empty => write!(f, "level has no map rows"),
        }
    }
}

impl std::error::Error for LevelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LevelError::Io(e) => Some(e),
            LevelError::Parse(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for LevelError {
    fn from(e: std::io::Error) -> Self {
        LevelError::Io(e)
    }
}

impl From<serde_json::Error> for LevelError {
    fn from(e: serde_json::Error) -> Self {
        LevelError::Parse(e)
    }
}

impl LevelDef {
    pub fn width(&self) -> usize {
        self.platforms.width
    }

    pub fn height(&self) -> usize {
        self.platforms.height
    }

    /// Spawn point, or the default one pulled inside the map.
    pub fn spawn_point(&self, player_w: f32, player_h: f32) -> (f32, f32) {
        if let Some(p) = self.spawn {
            return p;
        }
        let map_w = self.width() as f32 * self.tile_size;
        let map_h = self.height() as f32 * self.tile_size;
        let (x, y) = DEFAULT_SPAWN;
        (
            x.min(map_w - player_w / 2.0).max(player_w / 2.0),
            y.min(map_h - player_h / 2.0).max(player_h / 2.0),
        )
    }
}

// ══════════════════════════════════════════════════════════════
// Public API
// ══════════════════════════════════════════════════════════════

/// Every playable level, in order. Never empty.
pub fn load_level_set(config: &GameConfig) -> Vec<LevelDef> {
    let dir = &config.levels_dir;
    if dir.is_dir() {
        let levels = load_from_directory(dir);
        if !levels.is_empty() {
            log::info!("loaded {} level(s) from {}", levels.len(), dir.display());
            return levels;
        }
        log::warn!("no usable levels in {}, using built-in levels", dir.display());
    }
    let levels = embedded_levels();
    log::info!("using {} built-in level(s)", levels.len());
    levels
}

/// Instantiate level `idx` into the world with a fresh session.
/// Health resets; `start.score` carries over.
pub fn start_level(world: &mut WorldState, levels: &[LevelDef], idx: usize, start: LevelStart) {
    let def = match levels.get(idx) {
        Some(d) => d,
        None => {
            log::error!("level {} requested but only {} exist", idx, levels.len());
            return;
        }
    };

    world.background = def.background.clone();
    world.platforms = def.platforms.clone();
    world.water = def.water.clone();
    world.width = def.width();
    world.height = def.height();
    world.tile_size = def.tile_size;
    world.items = def.items.clone();
    world.spikes = def.spikes.clone();
    world.doors = def.doors.clone();

    let (pw, ph) = (world.physics.player_width, world.physics.player_height);
    world.spawn = def.spawn_point(pw, ph);
    world.player = Player::new(world.spawn.0, world.spawn.1, pw, ph);

    world.session = Session::new(start.score, world.rules.max_health);
    world.phase = Phase::Playing;
    world.entry = start;
    world.pending_level = None;
    world.current_level = idx;
    world.total_levels = levels.len();
    world.level_name = def.name.clone();
    world.tick = 0;
    world.time_ms = 0;
    world.footstep_timer_ms = world.rules.footstep_interval_ms;
    world.anim_tick = 0;
    world.paused = false;
    world.particles.clear();
    world.set_message(&format!("Level {}: {}", idx + 1, def.name), 90);

    let (cx, cy) = world.player_cell();
    world.camera.center_on(cx, cy, world.width, world.height);

    log::info!(
        "level {}/{} '{}' started with score {}",
        idx + 1, levels.len(), def.name, start.score,
    );
    for kind in ItemKind::ALL {
        let n = world.items.iter().filter(|i| i.kind == kind).count();
        log::debug!("  {:?} x{}", kind, n);
    }
}

/// Restart the current level with the payload it was entered with.
pub fn restart_level(world: &mut WorldState, levels: &[LevelDef]) {
    let (idx, entry) = (world.current_level, world.entry);
    start_level(world, levels, idx, entry);
}

/// Replay after the game ended: from the first level with a zero score,
/// or the current level when `replay_from_start` is off.
pub fn replay(world: &mut WorldState, levels: &[LevelDef]) {
    if world.rules.replay_from_start {
        start_level(world, levels, 0, LevelStart::default());
    } else {
        restart_level(world, levels);
    }
}

// ══════════════════════════════════════════════════════════════
// ASCII parsing
// ══════════════════════════════════════════════════════════════

/// Parse a single `.txt` level.
pub fn parse_ascii_file(content: &str, fallback_name: &str) -> Result<LevelDef, LevelError> {
    let mut name = String::new();
    let mut rows = vec![];
    for line in content.lines() {
        if name.is_empty() && rows.is_empty() && line.starts_with('#') && is_name_line(line) {
            name = line[1..].trim().to_string();
        } else {
            rows.push(line);
        }
    }
    if name.is_empty() {
        name = fallback_name.to_string();
    }
    parse_ascii_level(&name, &rows)
}

/// Distinguish `# Level Name` from a row of solid tiles.
fn is_name_line(line: &str) -> bool {
    line[1..].chars().any(|c| c.is_alphabetic())
}

pub fn parse_ascii_level(name: &str, rows: &[&str]) -> Result<LevelDef, LevelError> {
    let mut rows: Vec<&str> = rows.to_vec();
    while rows.last().map_or(false, |r| r.trim().is_empty()) {
        rows.pop();
    }
    if rows.is_empty() {
        return Err(LevelError::Empty);
    }

    let ts = ASCII_TILE_SIZE;
    let height = rows.len();
    // Short rows are treated as padded with empty space
    let width = rows.iter().map(|r| r.chars().count()).max().unwrap_or(0);

    let mut background = TileGrid::new(width, height);
    let mut platforms = TileGrid::new(width, height);
    let mut water = TileGrid::new(width, height);
    let mut spawn = None;
    let mut items = vec![];
    let mut spikes = vec![];
    let mut doors = vec![];

    for (y, row) in rows.iter().enumerate() {
        for (x, ch) in row.chars().enumerate() {
            let cell = Rect::new(x as f32 * ts, y as f32 * ts, ts, ts);
            match ch {
                '.' => background.set(x, y, Tile::Scenery),
                '#' => platforms.set(x, y, Tile::Solid),
                '=' => platforms.set(x, y, Tile::Scenery),
                '~' => water.set(x, y, Tile::Water),
                'P' => spawn = Some(cell.center()),
                'c' => items.push(Item::new(ItemKind::Coin, cell)),
                'd' => items.push(Item::new(ItemKind::Diamond, cell)),
                'h' => items.push(Item::new(ItemKind::Heart, cell)),
                'k' => items.push(Item::new(ItemKind::Key, cell)),
                // Spikes fill the lower half of their cell
                '^' => spikes.push(Spike { rect: Rect::new(cell.x, cell.y + ts / 2.0, ts, ts / 2.0) }),
                'D' => doors.push(Door { rect: cell }),
                _ => {}
            }
        }
    }

    let water = if water.count(Tile::Water) > 0 { Some(water) } else { None };

    Ok(LevelDef {
        name: name.to_string(),
        tile_size: ts,
        background,
        platforms,
        water,
        spawn,
        items,
        spikes,
        doors,
    })
}

// ══════════════════════════════════════════════════════════════
// Directory loading
// ══════════════════════════════════════════════════════════════

fn load_from_directory(dir: &Path) -> Vec<LevelDef> {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) => {
            log::warn!("cannot read {}: {}", dir.display(), e);
            return vec![];
        }
    };

    let mut paths: Vec<_> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|p| {
            p.extension()
                .map_or(false, |e| e == "tmj" || e == "json" || e == "txt")
        })
        .collect();
    paths.sort();

    let mut levels = vec![];
    for path in paths {
        match load_file(&path) {
            Ok(def) => {
                log::debug!("loaded {} as '{}'", path.display(), def.name);
                levels.push(def);
            }
            Err(e) => log::warn!("skipping {}: {}", path.display(), e),
        }
    }
    levels
}

fn load_file(path: &Path) -> Result<LevelDef, LevelError> {
    if path.extension().map_or(false, |e| e == "txt") {
        let content = std::fs::read_to_string(path)?;
        let stem = path.file_stem()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
        parse_ascii_file(&content, &stem)
    } else {
        tiled::load_tiled(path)
    }
}

// ══════════════════════════════════════════════════════════════
// Embedded fallback levels
// ══════════════════════════════════════════════════════════════

pub fn embedded_levels() -> Vec<LevelDef> {
    vec![
        make_embedded("Meadow Run", &[
            "                                                ",
            "    ..                     ...                  ",
            "                                        k       ",
            "   ...                               ######     ",
            "                  c c c                         ",
            "                 #######        d               ",
            "        h                      ####             ",
            "       ###              c                       ",
            "                      ####                      ",
            "  P         c c                  ^^         D   ",
            "#######   ########   #####   ##########  ###### ",
            "#######   ########   #####   ##########  ###### ",
            "#######   ########   #####   ##########  ###### ",
            "#######   ########   #####   ##########  ###### ",
        ]),
        make_embedded("Flooded Caves", &[
            "================================================",
            "                                                ",
            "   d                                        k   ",
            "  ####                                     #####",
            "            c  c                                ",
            "           ######          d                    ",
            "                         #####        ^^        ",
            "      h                            ######       ",
            "     ###         c c c                          ",
            " P              #######          ^^         D   ",
            "######~~~~######       ####~~~~######~~~~#######",
            "######~~~~######~~~~~~~####~~~~######~~~~#######",
            "################################################",
            "################################################",
        ]),
    ]
}

fn make_embedded(name: &str, map: &[&str]) -> LevelDef {
    match parse_ascii_level(name, map) {
        Ok(def) => def,
        // Built-in maps are never empty
        Err(_) => LevelDef {
            name: name.to_string(),
            tile_size: ASCII_TILE_SIZE,
            background: TileGrid::default(),
            platforms: TileGrid::default(),
            water: None,
            spawn: None,
            items: vec![],
            spikes: vec![],
            doors: vec![],
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PhysicsConfig, RulesConfig};

    fn world() -> WorldState {
        WorldState::new(PhysicsConfig::default(), RulesConfig::default())
    }

    #[test]
    fn embedded_levels_are_complete() {
        let levels = embedded_levels();
        assert_eq!(levels.len(), 2);
        for def in &levels {
            assert!(def.width() > 0 && def.height() > 0, "{}", def.name);
            assert!(def.spawn.is_some(), "{} has no spawn", def.name);
            assert!(!def.doors.is_empty(), "{} has no door", def.name);
            assert_eq!(
                def.items.iter().filter(|i| i.kind == ItemKind::Key).count(), 1,
                "{} needs exactly one key", def.name,
            );
        }
        assert!(levels[0].water.is_none());
        assert!(levels[1].water.is_some());
    }

    #[test]
    fn ascii_legend() {
        let def = parse_ascii_level("t", &[
            ".  =   ",
            " P ck ^",
            "###~~dD",
        ]).unwrap();
        assert_eq!(def.background.get(0, 0), Tile::Scenery);
        assert_eq!(def.platforms.get(3, 0), Tile::Scenery);
        assert_eq!(def.platforms.get(0, 2), Tile::Solid);
        assert_eq!(def.water.as_ref().map(|w| w.count(Tile::Water)), Some(2));
        assert_eq!(def.spawn, Some((27.0, 27.0)));
        assert_eq!(def.items.len(), 3);
        assert_eq!(def.spikes[0].rect, Rect::new(108.0, 27.0, 18.0, 9.0));
        assert_eq!(def.doors.len(), 1);
    }

    #[test]
    fn short_rows_are_padded() {
        let def = parse_ascii_level("t", &["#", "###", ""]).unwrap();
        assert_eq!((def.width(), def.height()), (3, 2));
        assert_eq!(def.platforms.get(2, 0), Tile::Empty);
    }

    #[test]
    fn ascii_file_name_line() {
        let def = parse_ascii_file("# Tiny Hill\n####\n", "stem").unwrap();
        assert_eq!(def.name, "Tiny Hill");
        assert_eq!(def.height(), 1);

        // A row of solid tiles is map data, not a name
        let def = parse_ascii_file("####\n####\n", "stem").unwrap();
        assert_eq!(def.name, "stem");
        assert_eq!(def.height(), 2);

        assert!(matches!(parse_ascii_file("# Only a name\n", "x"), Err(LevelError::Empty)));
    }

    #[test]
    fn default_spawn_is_clamped_into_small_maps() {
        let def = parse_ascii_level("t", &["    ", "####"]).unwrap();
        let (x, y) = def.spawn_point(14.0, 18.0);
        assert_eq!(x, 50.0);
        assert_eq!(y, 36.0 - 9.0);
    }

    #[test]
    fn start_level_resets_session_and_carries_score() {
        let levels = embedded_levels();
        let mut w = world();
        start_level(&mut w, &levels, 1, LevelStart { score: 70 });
        assert_eq!(w.current_level, 1);
        assert_eq!(w.total_levels, 2);
        assert_eq!(w.session.score, 70);
        assert_eq!(w.session.health, 3);
        assert_eq!(w.phase, Phase::Playing);
        assert!(w.water.is_some());
        assert!(w.player.active && w.player.visible);
        assert_eq!((w.player.x, w.player.y), w.spawn);
    }

    #[test]
    fn replay_goes_back_to_first_level() {
        let levels = embedded_levels();
        let mut w = world();
        start_level(&mut w, &levels, 1, LevelStart { score: 70 });
        w.session.score = 120;
        replay(&mut w, &levels);
        assert_eq!(w.current_level, 0);
        assert_eq!(w.session.score, 0);
    }

    #[test]
    fn restart_keeps_entry_score() {
        let levels = embedded_levels();
        let mut w = world();
        w.rules.replay_from_start = false;
        start_level(&mut w, &levels, 1, LevelStart { score: 70 });
        w.session.score = 120;
        w.items.clear();
        replay(&mut w, &levels);
        assert_eq!(w.current_level, 1);
        assert_eq!(w.session.score, 70);
        assert_eq!(w.items.len(), levels[1].items.len());
    }

    #[test]
    fn out_of_range_level_leaves_world_untouched() {
        let levels = embedded_levels();
        let mut w = world();
        start_level(&mut w, &levels, 0, LevelStart::default());
        start_level(&mut w, &levels, 9, LevelStart { score: 5 });
        assert_eq!(w.current_level, 0);
        assert_eq!(w.session.score, 0);
    }

    #[test]
    fn level_error_messages() {
        let e = LevelError::LayerSize { layer: "platform".into(), expected: 4, found: 3 };
        assert_eq!(e.to_string(), "layer 'platform' has 3 tiles, expected 4");
        assert_eq!(LevelError::MissingLayer("platform").to_string(), "missing platform layer");
    }
}

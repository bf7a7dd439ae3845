/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into `front` buffer (array of Cell)
///   2. Compare each cell with `back` buffer (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// Draw order: tile layers through the camera, then entities, then
/// particles, then the screen-space HUD and overlays on top.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    event::{
        DisableMouseCapture, EnableMouseCapture, KeyboardEnhancementFlags,
        PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::entity::{ItemKind, Rect};
use crate::domain::tile::Tile;
use crate::sim::hud::{Hud, ScreenRect, REPLAY_LABEL};
use crate::sim::particles::{Particle, ParticleKind};
use crate::sim::world::{Camera, Phase, WorldState};

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Cell {
    ch: [u8; 16],  // up to 16 bytes (supports ZWJ emoji sequences)
    ch_len: u8,
    fg: Color,
    bg: Color,
    wide: bool,    // true = this char occupies 2 terminal columns
    cont: bool,    // true = continuation of previous wide char (skip render)
}

impl Cell {
    /// Explicit dark background for all "empty" terminal cells, so the
    /// inter-row gap on VTE terminals matches the cell colour.
    const BASE_BG: Color = Color::Rgb { r: 22, g: 22, b: 35 };

    const BLANK: Cell = Cell {
        ch: [b' ', 0,0,0, 0,0,0,0, 0,0,0,0, 0,0,0,0],
        ch_len: 1,
        fg: Color::White,
        bg: Cell::BASE_BG,
        wide: false,
        cont: false,
    };

    const WIDE_CONT: Cell = Cell {
        ch: [0; 16],
        ch_len: 0,
        fg: Color::White,
        bg: Cell::BASE_BG,
        wide: false,
        cont: true,
    };

    /// Sentinel cell used to invalidate the back buffer.
    /// Different from any real cell, so every position will be diff'd.
    const INVALID: Cell = Cell {
        ch: [b'?', 0,0,0, 0,0,0,0, 0,0,0,0, 0,0,0,0],
        ch_len: 1,
        fg: Color::Magenta,
        bg: Color::Magenta,
        wide: false,
        cont: false,
    };

    /// Normalize bg: Color::Reset → BASE_BG so that every cell gets an
    /// explicit background color (never terminal-default).
    #[inline]
    fn norm_bg(bg: Color) -> Color {
        match bg {
            Color::Reset => Self::BASE_BG,
            other => other,
        }
    }

    fn from_char(c: char, fg: Color, bg: Color) -> Self {
        let mut cell = Self::BLANK;
        let len = c.encode_utf8(&mut cell.ch).len() as u8;
        cell.ch_len = len;
        cell.fg = fg;
        cell.bg = Self::norm_bg(bg);
        cell
    }

    fn from_char_wide(c: char, fg: Color, bg: Color) -> Self {
        let mut cell = Self::from_char(c, fg, bg);
        cell.wide = true;
        cell
    }

    fn as_str(&self) -> &str {
        std::str::from_utf8(&self.ch[..self.ch_len as usize]).unwrap_or("")
    }
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer {
            width: w,
            height: h,
            cells: vec![Cell::BLANK; w * h],
        }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    /// Write a string at (x, y) with given colors. Each char occupies 1 column.
    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width { break; }
            self.set(x + i, y, Cell::from_char(ch, fg, bg));
        }
    }

    /// Paint a whole row with a background colour.
    fn fill_row(&mut self, y: usize, bg: Color) {
        for x in 0..self.width {
            self.set(x, y, Cell::from_char(' ', Color::White, bg));
        }
    }

    /// A wide glyph spanning two columns.
    fn put_wide(&mut self, x: usize, y: usize, c: char) {
        if x + 1 >= self.width { return; }
        self.set(x, y, Cell::from_char_wide(c, Color::Reset, Color::Reset));
        self.set(x + 1, y, Cell::WIDE_CONT);
    }
}

// ── Layout ──

/// Each world tile = 2 terminal columns.
const CELL_W: usize = 2;

/// Vertical offsets
const HUD_ROW: usize = 0;
const MAP_ROW: usize = 2;
/// HUD + gap above the map, message + gap + help below it.
const RESERVED_ROWS: usize = MAP_ROW + 4;

const HUD_BG: Color = Color::Rgb { r: 20, g: 20, b: 60 };
const OVERLAY_BG: Color = Color::Rgb { r: 40, g: 40, b: 40 };

const HELP: &str = " ←→/AD:Move  Space/W/↑:Jump  E:Door  P:Pause  F2:Restart  Q/Esc:Quit";

/// Inclusive tile range covered by a world-space box.
fn cells_covered(rect: &Rect, tile_size: f32) -> (i32, i32, i32, i32) {
    let x0 = (rect.x / tile_size).floor() as i32;
    let y0 = (rect.y / tile_size).floor() as i32;
    // A box ending exactly on a tile edge does not reach into the next tile
    let x1 = ((rect.right() - 0.01) / tile_size).floor() as i32;
    let y1 = ((rect.bottom() - 0.01) / tile_size).floor() as i32;
    (x0, y0, x1.max(x0), y1.max(y0))
}

/// World pixel → (terminal column, map row) through the camera.
/// The half-tile decides which of the two columns of a cell is used.
fn world_to_screen(cam: &Camera, wx: f32, wy: f32, tile_size: f32) -> Option<(usize, usize)> {
    let tx = wx / tile_size;
    let ty = wy / tile_size;
    let (vx, vy) = cam.world_to_view(tx.floor() as i32, ty.floor() as i32)?;
    let half = if tx - tx.floor() >= 0.5 { 1 } else { 0 };
    Some((vx * CELL_W + half, MAP_ROW + vy))
}

/// Tile-aligned entity art at the start column of a view cell.
fn entity_cells(w: &WorldState, rect: &Rect) -> Vec<(usize, usize)> {
    let (x0, y0, x1, y1) = cells_covered(rect, w.tile_size);
    let mut out = vec![];
    for ty in y0..=y1 {
        for tx in x0..=x1 {
            if let Some((vx, vy)) = w.camera.world_to_view(tx, ty) {
                out.push((vx * CELL_W, MAP_ROW + vy));
            }
        }
    }
    out
}

fn item_glyph(kind: ItemKind) -> char {
    match kind {
        ItemKind::Coin => '🟡',
        ItemKind::Diamond => '💎',
        ItemKind::Heart => '💖',
        ItemKind::Key => '🔑',
    }
}

fn particle_glyph(p: &Particle) -> (char, Color) {
    let f = p.fade();
    let scale = |c: u8| (c as f32 * (0.35 + 0.65 * f)) as u8;
    match p.kind {
        ParticleKind::Spark => ('*', Color::Rgb { r: scale(255), g: scale(230), b: scale(120) }),
        ParticleKind::Sparkle => (if f > 0.5 { '✦' } else { '·' }, Color::Rgb { r: scale(255), g: scale(215), b: scale(60) }),
        ParticleKind::Dust => ('.', Color::Rgb { r: scale(170), g: scale(150), b: scale(120) }),
    }
}

/// End overlay box, centered in the viewport: (x, y, width, height).
fn end_box(view_cols: usize, view_rows: usize) -> (usize, usize, usize, usize) {
    let box_w = 44_usize.min(view_cols.max(1));
    let box_h = 9_usize.min(view_rows.max(1));
    let box_x = view_cols.saturating_sub(box_w) / 2;
    let box_y = MAP_ROW + view_rows.saturating_sub(box_h) / 2;
    (box_x, box_y, box_w, box_h)
}

/// Clickable area of the REPLAY button inside the end box.
fn replay_rect(box_x: usize, box_y: usize, box_w: usize) -> ScreenRect {
    let label_w = REPLAY_LABEL.chars().count();
    ScreenRect {
        col: (box_x + box_w.saturating_sub(label_w) / 2) as u16,
        row: (box_y + 6) as u16,
        width: label_w as u16,
        height: 1,
    }
}

// ── Renderer ──

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    last_phase: Option<Phase>,
    key_release: bool,
    /// Where the REPLAY button was drawn last frame, for mouse hit-testing.
    pub replay_button: Option<ScreenRect>,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            last_phase: None,
            key_release: false,
            replay_button: None,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            EnableMouseCapture,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        // Force full repaint on first frame: back ≠ front for every cell.
        self.back.cells.fill(Cell::INVALID);

        Ok(())
    }

    /// Ask the terminal for key release events. Returns whether it
    /// supports them; without them held keys expire on a timeout.
    pub fn enable_key_release(&mut self) -> bool {
        if !matches!(terminal::supports_keyboard_enhancement(), Ok(true)) {
            return false;
        }
        let flags = KeyboardEnhancementFlags::REPORT_EVENT_TYPES;
        self.key_release = execute!(self.writer, PushKeyboardEnhancementFlags(flags)).is_ok();
        log::debug!("key release events: {}", self.key_release);
        self.key_release
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        if self.key_release {
            execute!(self.writer, PopKeyboardEnhancementFlags)?;
        }
        execute!(
            self.writer,
            ResetColor,
            DisableMouseCapture,
            cursor::Show,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    pub fn render(&mut self, world: &mut WorldState) -> io::Result<()> {
        // Detect terminal resize
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }

        // Viewport = terminal cols / CELL_W wide, terminal rows - reserved rows high,
        // capped to the world so no space is wasted on void.
        let max_view_w = (self.term_w / CELL_W).max(1);
        let max_view_h = self.term_h.saturating_sub(RESERVED_ROWS).max(1);
        world.camera.view_w = if world.width > 0 { max_view_w.min(world.width) } else { max_view_w };
        world.camera.view_h = if world.height > 0 { max_view_h.min(world.height) } else { max_view_h };

        // Phase change → clear for a clean transition
        if self.last_phase != Some(world.phase) {
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
            self.last_phase = Some(world.phase);
        }

        let (px, py) = world.player_cell();
        world.camera.follow(px, py, world.width, world.height);

        self.front.clear();
        let hud = Hud::from_world(world);

        self.compose_map(world);
        self.compose_entities(world);
        self.compose_particles(world);
        self.compose_hud(world, &hud);
        self.compose_bars(world);

        self.replay_button = None;
        if hud.replay_visible() {
            self.compose_end_overlay(world, &hud);
        } else if world.paused {
            self.compose_pause_overlay(world);
        }

        self.flush_diff()?;

        // Swap: current front becomes next back
        std::mem::swap(&mut self.front, &mut self.back);

        Ok(())
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut need_move = true;
        let mut last_x: usize = 0;
        let mut last_y: usize = 0;

        // Explicit base colours; ResetColor would fall back to the terminal default.
        queue!(self.writer,
            SetForegroundColor(Color::White),
            SetBackgroundColor(Cell::BASE_BG),
        )?;

        for y in 0..self.front.height {
            let mut x = 0;
            while x < self.front.width {
                let cell = self.front.get(x, y);
                let prev = self.back.get(x, y);

                // Skip continuation cells (right half of wide emoji)
                if cell.cont {
                    if cell != prev { need_move = true; }
                    x += 1;
                    continue;
                }

                let cont_changed = cell.wide
                    && x + 1 < self.front.width
                    && self.front.get(x + 1, y) != self.back.get(x + 1, y);

                if cell == prev && !cont_changed {
                    need_move = true;
                    x += 1;
                    continue;
                }

                if need_move || x != last_x + 1 || y != last_y {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                    need_move = false;
                }

                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }

                queue!(self.writer, Print(cell.as_str()))?;

                if cell.wide {
                    // Wide char printed: cursor advanced 2 columns
                    last_x = x + 1;
                    x += 2;
                } else {
                    last_x = x;
                    x += 1;
                }
                last_y = y;
            }
        }

        self.writer.flush()
    }

    // ── Compose: build front buffer content ──

    fn compose_map(&mut self, w: &WorldState) {
        let cam = &w.camera;
        for vy in 0..cam.view_h {
            let wy = cam.y + vy as i32;
            let row = MAP_ROW + vy;
            if row >= self.front.height { break; }

            for vx in 0..cam.view_w {
                let wx = cam.x + vx as i32;
                let col = vx * CELL_W;
                if col + 1 >= self.front.width { break; }

                if wx < 0 || wy < 0 || wx >= w.width as i32 || wy >= w.height as i32 {
                    continue; // void stays blank
                }
                self.compose_tile(w, wx as usize, wy as usize, col, row);
            }
        }
    }

    /// Topmost layer wins: water, then platforms, then background.
    fn compose_tile(&mut self, w: &WorldState, gx: usize, gy: usize, col: usize, row: usize) {
        let water = w.water.as_ref().map(|l| l.get(gx, gy)).unwrap_or(Tile::Empty);
        let (c0, c1, fg, bg) = if water.is_lethal() {
            // Gentle ripple
            let ripple = ((w.anim_tick / 12) as usize + gx) % 2 == 0;
            let (a, b) = if ripple { ('≈', '~') } else { ('~', '≈') };
            (a, b, Color::Rgb { r: 140, g: 200, b: 255 }, Color::Rgb { r: 20, g: 60, b: 140 })
        } else {
            match w.platforms.get(gx, gy) {
                Tile::Solid => ('▓', '▓', Color::Rgb { r: 150, g: 110, b: 70 }, Color::Rgb { r: 90, g: 60, b: 35 }),
                Tile::Scenery => ('░', '░', Color::Rgb { r: 110, g: 140, b: 90 }, Color::Reset),
                _ if w.background.get(gx, gy).is_visible() => {
                    (' ', ' ', Color::Reset, Color::Rgb { r: 30, g: 40, b: 58 })
                }
                _ => return,
            }
        };
        self.front.set(col, row, Cell::from_char(c0, fg, bg));
        self.front.set(col + 1, row, Cell::from_char(c1, fg, bg));
    }

    fn compose_entities(&mut self, w: &WorldState) {
        let spike_fg = Color::Rgb { r: 220, g: 220, b: 230 };
        for spike in &w.spikes {
            for (col, row) in entity_cells(w, &spike.rect) {
                let bg = self.front.get(col, row).bg;
                self.front.set(col, row, Cell::from_char('▲', spike_fg, bg));
                self.front.set(col + 1, row, Cell::from_char('▲', spike_fg, bg));
            }
        }

        // The door glows once the key is held
        let door_fg = if w.player.has_key {
            Color::Rgb { r: 255, g: 220, b: 50 }
        } else {
            Color::Rgb { r: 160, g: 100, b: 50 }
        };
        for door in &w.doors {
            let cells = entity_cells(w, &door.rect);
            let top = cells.iter().map(|&(_, r)| r).min();
            for (col, row) in cells {
                if Some(row) == top {
                    self.front.put_wide(col, row, '🚪');
                } else {
                    self.front.set(col, row, Cell::from_char('▐', door_fg, Color::Reset));
                    self.front.set(col + 1, row, Cell::from_char('▌', door_fg, Color::Reset));
                }
            }
        }

        for item in &w.items {
            let (cx, cy) = item.rect.center();
            let tx = (cx / w.tile_size).floor() as i32;
            let ty = (cy / w.tile_size).floor() as i32;
            if let Some((vx, vy)) = w.camera.world_to_view(tx, ty) {
                self.front.put_wide(vx * CELL_W, MAP_ROW + vy, item_glyph(item.kind));
            }
        }

        if w.player.visible {
            let (px, py) = w.player_cell();
            if let Some((vx, vy)) = w.camera.world_to_view(px as i32, py as i32) {
                self.front.put_wide(vx * CELL_W, MAP_ROW + vy, '🧍');
            }
        }
    }

    /// Particles take one column each and keep the background they land on.
    /// Wide glyphs are never split.
    fn compose_particles(&mut self, w: &WorldState) {
        for p in &w.particles.particles {
            let Some((col, row)) = world_to_screen(&w.camera, p.x, p.y, w.tile_size) else {
                continue;
            };
            let under = self.front.get(col, row);
            if under.wide || under.cont { continue; }
            let (ch, fg) = particle_glyph(p);
            self.front.set(col, row, Cell::from_char(ch, fg, under.bg));
        }
    }

    fn compose_hud(&mut self, w: &WorldState, hud: &Hud) {
        self.front.fill_row(HUD_ROW, HUD_BG);

        let (full, empty) = hud.hearts;
        let hearts: String = "♥".repeat(full as usize) + &"♡".repeat(empty as usize);
        let mut x = 1;
        self.front.put_str(x, HUD_ROW, &hud.score_text, Color::White, HUD_BG);
        x += hud.score_text.chars().count() + 3;
        self.front.put_str(x, HUD_ROW, &hud.health_text, Color::White, HUD_BG);
        x += hud.health_text.chars().count() + 1;
        self.front.put_str(x, HUD_ROW, &hearts, Color::Rgb { r: 255, g: 80, b: 100 }, HUD_BG);
        x += hearts.chars().count() + 3;
        if hud.has_key {
            self.front.put_str(x, HUD_ROW, "KEY", Color::Rgb { r: 255, g: 220, b: 50 }, HUD_BG);
        }
        x += 6;
        self.front.put_str(x, HUD_ROW, &hud.level_text, Color::Rgb { r: 150, g: 150, b: 200 }, HUD_BG);

        if w.paused {
            let label = " PAUSED ";
            let px = self.front.width.saturating_sub(label.len() + 1);
            self.front.put_str(px, HUD_ROW, label, Color::Black, Color::Rgb { r: 255, g: 220, b: 50 });
        }
    }

    fn compose_bars(&mut self, w: &WorldState) {
        let view_h = w.camera.view_h;

        // ── Message bar ──
        let msg_row = MAP_ROW + view_h + 1;
        if msg_row < self.front.height && !w.message.is_empty() {
            let bg = Color::Rgb { r: 200, g: 180, b: 50 };
            self.front.fill_row(msg_row, bg);
            self.front.put_str(0, msg_row, &format!(" ◈ {} ", w.message), Color::Black, bg);
        }

        // ── Help bar ──
        let help_row = MAP_ROW + view_h + 3;
        if help_row < self.front.height {
            self.front.put_str(0, help_row, HELP, Color::DarkGrey, Color::Reset);
        }
    }

    fn compose_end_overlay(&mut self, w: &WorldState, hud: &Hud) {
        let Some(banner) = &hud.banner else { return };
        let view_cols = (w.camera.view_w * CELL_W).min(self.front.width);
        let (box_x, box_y, box_w, box_h) = end_box(view_cols, w.camera.view_h);

        for y in box_y..box_y + box_h {
            for x in box_x..box_x + box_w {
                self.front.set(x, y, Cell::from_char(' ', Color::Reset, OVERLAY_BG));
            }
        }

        let title_fg = match w.phase {
            Phase::Won => Color::Rgb { r: 255, g: 220, b: 50 },
            _ => Color::Rgb { r: 255, g: 60, b: 60 },
        };
        let centered = |s: &str| box_x + box_w.saturating_sub(s.chars().count()) / 2;

        let rule: String = "═".repeat(box_w.saturating_sub(4));
        self.front.put_str(box_x + 2, box_y + 1, &rule, title_fg, OVERLAY_BG);
        self.front.put_str(centered(banner.title), box_y + 2, banner.title, title_fg, OVERLAY_BG);
        self.front.put_str(box_x + 2, box_y + 3, &rule, title_fg, OVERLAY_BG);
        self.front.put_str(centered(&banner.detail), box_y + 4, &banner.detail, Color::White, OVERLAY_BG);

        // The button is only clickable when it fits on screen
        let button = replay_rect(box_x, box_y, box_w);
        if (button.row as usize) < self.front.height && (button.row as usize) < box_y + box_h {
            let btn_bg = Color::Rgb { r: 40, g: 140, b: 60 };
            self.front.put_str(button.col as usize, button.row as usize, REPLAY_LABEL, Color::White, btn_bg);
            self.replay_button = Some(button);
        }
        self.front.put_str(centered(banner.prompt), box_y + 8, banner.prompt, Color::Rgb { r: 180, g: 180, b: 180 }, OVERLAY_BG);
    }

    fn compose_pause_overlay(&mut self, w: &WorldState) {
        let blink = (w.anim_tick / 8) % 2 == 0;
        let view_cols = (w.camera.view_w * CELL_W).min(self.front.width);
        let view_rows = w.camera.view_h;
        let box_w = 30_usize.min(view_cols);
        let box_h = 8_usize.min(view_rows);
        let box_x = view_cols.saturating_sub(box_w) / 2;
        let box_y = MAP_ROW + view_rows.saturating_sub(box_h) / 2;

        for y in box_y..box_y + box_h {
            for x in box_x..box_x + box_w {
                self.front.set(x, y, Cell::from_char(' ', Color::Reset, OVERLAY_BG));
            }
        }

        let hdr = Color::Rgb { r: 255, g: 220, b: 50 };
        let key_c = Color::Rgb { r: 100, g: 200, b: 255 };
        let label = if blink { "▶  PAUSED  ◀" } else { "   PAUSED   " };
        self.front.put_str(box_x + 9, box_y + 1, label, hdr, OVERLAY_BG);
        self.front.put_str(box_x + 3, box_y + 3, "P    Resume", key_c, OVERLAY_BG);
        self.front.put_str(box_x + 3, box_y + 4, "F2   Restart Level", key_c, OVERLAY_BG);
        self.front.put_str(box_x + 3, box_y + 5, "Q    Quit", key_c, OVERLAY_BG);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::particles::ParticleSystem;

    #[test]
    fn put_str_clips_at_buffer_edge() {
        let mut buf = FrameBuffer::new(4, 1);
        buf.put_str(2, 0, "abcdef", Color::White, Color::Reset);
        assert_eq!(buf.get(2, 0).as_str(), "a");
        assert_eq!(buf.get(3, 0).as_str(), "b");
        // Reset background is normalized
        assert_eq!(buf.get(3, 0).bg, Cell::BASE_BG);
        assert_eq!(buf.get(9, 9), Cell::BLANK);
    }

    #[test]
    fn wide_glyph_needs_two_columns() {
        let mut buf = FrameBuffer::new(3, 1);
        buf.put_wide(0, 0, '💎');
        assert!(buf.get(0, 0).wide);
        assert!(buf.get(1, 0).cont);
        buf.put_wide(2, 0, '💎');
        assert_eq!(buf.get(2, 0), Cell::BLANK);
    }

    #[test]
    fn covered_cells_stop_at_tile_edges() {
        let r = Rect::new(18.0, 9.0, 18.0, 9.0);
        assert_eq!(cells_covered(&r, 18.0), (1, 0, 1, 0));
        let tall = Rect::new(18.0, 0.0, 18.0, 36.0);
        assert_eq!(cells_covered(&tall, 18.0), (1, 0, 1, 1));
    }

    #[test]
    fn world_pixels_map_to_half_cells() {
        let mut cam = Camera::new();
        cam.view_w = 10;
        cam.view_h = 5;
        cam.x = 2;
        assert_eq!(world_to_screen(&cam, 2.0 * 18.0 + 1.0, 0.0, 18.0), Some((0, MAP_ROW)));
        assert_eq!(world_to_screen(&cam, 3.0 * 18.0 + 12.0, 18.0, 18.0), Some((3, MAP_ROW + 1)));
        assert_eq!(world_to_screen(&cam, 0.0, 0.0, 18.0), None);
    }

    #[test]
    fn replay_button_sits_inside_the_end_box() {
        let (x, y, w, h) = end_box(80, 14);
        let button = replay_rect(x, y, w);
        assert!((button.col as usize) >= x);
        assert!((button.col + button.width) as usize <= x + w);
        assert!((button.row as usize) < y + h);
        assert!(button.contains(button.col, button.row));
    }

    #[test]
    fn fading_particles_dim() {
        let mut sys = ParticleSystem::new(7);
        sys.burst(ParticleKind::Dust, 0.0, 0.0, 1);
        let fresh = particle_glyph(&sys.particles[0]).1;
        sys.particles[0].life = sys.particles[0].max_life * 0.1;
        let old = particle_glyph(&sys.particles[0]).1;
        match (fresh, old) {
            (Color::Rgb { r: a, .. }, Color::Rgb { r: b, .. }) => assert!(b < a),
            _ => panic!("particles use rgb colours"),
        }
    }

    #[test]
    fn every_item_has_a_glyph() {
        let glyphs: Vec<char> = ItemKind::ALL.iter().map(|&k| item_glyph(k)).collect();
        for (i, g) in glyphs.iter().enumerate() {
            assert!(!glyphs[i + 1..].contains(g));
        }
    }
}

/// Keyboard and mouse input tracker.
///
/// Keyboard:
///   - Held keys drive movement; a key counts as held until its Release
///     event (when the terminal reports them) or until `HOLD_TIMEOUT`
///     passes without a Press/Repeat.
///   - Fresh presses (not-held → held) drive edge-triggered actions:
///     jump, interact, replay. Auto-repeat never produces a fresh press.
///   - Without Release events, a key must stay quiet for `REPEAT_WINDOW`
///     before its next Press counts as fresh. The OS auto-repeat delay is
///     longer than `HOLD_TIMEOUT`, so the first repeat of a held key would
///     otherwise look like a new press.
///
/// Mouse: left-button clicks are collected as terminal cells, for the
/// REPLAY button.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{
    self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEventKind,
};

/// After this duration without a Press/Repeat event, consider the key released.
/// Only used when the terminal doesn't report Release events.
const HOLD_TIMEOUT: Duration = Duration::from_millis(160);

/// Edge-detection window when Release events are unavailable.
/// Longer than common auto-repeat delays (250-600 ms).
const REPEAT_WINDOW: Duration = Duration::from_millis(650);

pub struct InputState {
    /// Timestamp of last Press/Repeat event for each key.
    last_active: HashMap<KeyCode, Instant>,

    /// Timestamp of last Press/Repeat, kept for `REPEAT_WINDOW`.
    last_seen: HashMap<KeyCode, Instant>,

    /// Keys that went from released to held since the last `take_presses`.
    /// Presses survive several drains so a frame without a sim tick loses none.
    fresh_presses: Vec<KeyCode>,

    /// Left clicks (column, row) since the last drain.
    pub clicks: Vec<(u16, u16)>,

    /// Raw key events collected during drain, for meta-key handling.
    pub raw_events: Vec<KeyEvent>,

    /// Whether to honor Release events. Only true when keyboard
    /// enhancement is confirmed working.
    pub honor_release: bool,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            last_active: HashMap::with_capacity(16),
            last_seen: HashMap::with_capacity(16),
            fresh_presses: Vec::with_capacity(8),
            clicks: Vec::with_capacity(2),
            raw_events: Vec::with_capacity(8),
            honor_release: false,
        }
    }

    /// Drain all pending terminal events and update key states.
    /// Call this once per frame.
    pub fn drain_events(&mut self) {
        self.raw_events.clear();
        self.clicks.clear();

        while poll(Duration::ZERO).unwrap_or(false) {
            match event::read() {
                Ok(Event::Key(key)) => self.on_key(key),
                Ok(Event::Mouse(m)) => {
                    if let MouseEventKind::Down(MouseButton::Left) = m.kind {
                        self.clicks.push((m.column, m.row));
                    }
                }
                _ => {}
            }
        }

        self.expire_stale();
    }

    /// Expire keys that have timed out (fallback for terminals without Release).
    fn expire_stale(&mut self) {
        let now = Instant::now();
        self.last_active.retain(|_, t| now.duration_since(*t) < HOLD_TIMEOUT);
        self.last_seen.retain(|_, t| now.duration_since(*t) < REPEAT_WINDOW);
    }

    fn on_key(&mut self, key: KeyEvent) {
        self.raw_events.push(key);
        match key.kind {
            KeyEventKind::Release if self.honor_release => {
                self.last_active.remove(&key.code);
                self.last_seen.remove(&key.code);
            }
            // Unconfirmed enhancement: rely on timeout expiry
            KeyEventKind::Release => {}
            _ => {
                let was_held = self.is_held(key.code) || self.recently_seen(key.code);
                let now = Instant::now();
                self.last_active.insert(key.code, now);
                self.last_seen.insert(key.code, now);
                if !was_held && !self.fresh_presses.contains(&key.code) {
                    self.fresh_presses.push(key.code);
                }
            }
        }
    }

    /// Auto-repeat guard; only meaningful without Release events.
    fn recently_seen(&self, code: KeyCode) -> bool {
        !self.honor_release
            && self.last_seen.get(&code).is_some_and(|t| t.elapsed() < REPEAT_WINDOW)
    }

    /// Is this key currently held down?
    pub fn is_held(&self, code: KeyCode) -> bool {
        self.last_active.get(&code)
            .map(|t| t.elapsed() < HOLD_TIMEOUT)
            .unwrap_or(false)
    }

    /// Convenience: is any of these keys held?
    pub fn any_held(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.is_held(*c))
    }

    /// Was this key freshly pressed since the last `take_presses`?
    pub fn was_pressed(&self, code: KeyCode) -> bool {
        self.fresh_presses.contains(&code)
    }

    pub fn any_pressed(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.was_pressed(*c))
    }

    /// Consume the accumulated presses. Called after each simulation tick.
    pub fn take_presses(&mut self) {
        self.fresh_presses.clear();
    }

    /// Check if any raw event this frame has Ctrl+C
    pub fn ctrl_c_pressed(&self) -> bool {
        self.raw_events.iter().any(|k| {
            k.modifiers.contains(KeyModifiers::CONTROL)
                && (k.code == KeyCode::Char('c') || k.code == KeyCode::Char('C'))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;

    fn key(code: KeyCode, kind: KeyEventKind) -> KeyEvent {
        KeyEvent { code, modifiers: KeyModifiers::NONE, kind, state: KeyEventState::NONE }
    }

    #[test]
    fn press_is_fresh_once_and_held() {
        let mut input = InputState::new();
        input.on_key(key(KeyCode::Char(' '), KeyEventKind::Press));
        assert!(input.was_pressed(KeyCode::Char(' ')));
        assert!(input.is_held(KeyCode::Char(' ')));

        input.take_presses();
        // Auto-repeat keeps it held but is not a new press
        input.on_key(key(KeyCode::Char(' '), KeyEventKind::Repeat));
        assert!(!input.was_pressed(KeyCode::Char(' ')));
        assert!(input.is_held(KeyCode::Char(' ')));
    }

    #[test]
    fn release_honored_only_when_enabled() {
        let mut input = InputState::new();
        input.on_key(key(KeyCode::Left, KeyEventKind::Press));
        input.on_key(key(KeyCode::Left, KeyEventKind::Release));
        assert!(input.is_held(KeyCode::Left));

        input.honor_release = true;
        input.on_key(key(KeyCode::Left, KeyEventKind::Release));
        assert!(!input.is_held(KeyCode::Left));
    }

    #[test]
    fn presses_accumulate_until_taken() {
        let mut input = InputState::new();
        input.on_key(key(KeyCode::Char('e'), KeyEventKind::Press));
        input.honor_release = true;
        input.on_key(key(KeyCode::Char('e'), KeyEventKind::Release));
        assert!(input.any_pressed(&[KeyCode::Char('e'), KeyCode::Char('E')]));
        input.take_presses();
        assert!(!input.was_pressed(KeyCode::Char('e')));
    }

    #[test]
    fn first_auto_repeat_after_hold_timeout_is_not_fresh() {
        let mut input = InputState::new();
        input.on_key(key(KeyCode::Char('e'), KeyEventKind::Press));
        input.take_presses();

        // Typical OS repeat delay: the hold timeout has lapsed by now
        std::thread::sleep(Duration::from_millis(300));
        input.expire_stale();
        assert!(!input.is_held(KeyCode::Char('e')));

        // Terminals without enhancement report repeats as Press
        input.on_key(key(KeyCode::Char('e'), KeyEventKind::Press));
        assert!(!input.was_pressed(KeyCode::Char('e')));
        assert!(input.is_held(KeyCode::Char('e')));
    }

    #[test]
    fn release_events_allow_immediate_repress() {
        let mut input = InputState::new();
        input.honor_release = true;
        input.on_key(key(KeyCode::Char(' '), KeyEventKind::Press));
        input.on_key(key(KeyCode::Char(' '), KeyEventKind::Release));
        input.take_presses();
        input.on_key(key(KeyCode::Char(' '), KeyEventKind::Press));
        assert!(input.was_pressed(KeyCode::Char(' ')));
    }

    #[test]
    fn ctrl_c_detection() {
        let mut input = InputState::new();
        input.raw_events.push(KeyEvent {
            code: KeyCode::Char('c'),
            modifiers: KeyModifiers::CONTROL,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        });
        assert!(input.ctrl_c_pressed());
    }
}

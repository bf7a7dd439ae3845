/// Gamepad input tracker using gilrs.
///
/// Button mapping is loaded from config.toml via `load_button_config()`.
/// Default mapping:
///   D-pad / Left Stick    →  Move left / right
///   D-pad Up / Stick Up   →  Jump
///   A                     →  Jump
///   X / B                 →  Interact (open door)
///   Start                 →  Replay / Pause
///   Select                →  Quit
///
/// Edge presses accumulate until `take_presses()`, mirroring the keyboard
/// tracker, so a press between two simulation ticks is never lost.

#[cfg(feature = "gamepad")]
use gilrs::{Axis, Button, EventType, Gilrs};

use crate::config::GamepadConfig;

#[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
const STICK_DEADZONE: f32 = 0.25;

/// Logical button identifiers (one per physical button).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Btn {
    A,       // South
    B,       // East
    X,       // West
    Y,       // North
    L1,
    R1,
    Start,
    Select,
}

const BTN_COUNT: usize = 8;

impl Btn {
    fn from_name(s: &str) -> Option<Btn> {
        match s.to_uppercase().as_str() {
            "A" | "SOUTH"  => Some(Btn::A),
            "B" | "EAST"   => Some(Btn::B),
            "X" | "WEST"   => Some(Btn::X),
            "Y" | "NORTH"  => Some(Btn::Y),
            "L1" | "LB" => Some(Btn::L1),
            "R1" | "RB" => Some(Btn::R1),
            "START" => Some(Btn::Start),
            "SELECT" | "BACK" => Some(Btn::Select),
            _ => None,
        }
    }

    #[cfg(feature = "gamepad")]
    fn from_gilrs(btn: Button) -> Option<Btn> {
        match btn {
            Button::South => Some(Btn::A),
            Button::East  => Some(Btn::B),
            Button::West  => Some(Btn::X),
            Button::North => Some(Btn::Y),
            Button::LeftTrigger  => Some(Btn::L1),
            Button::RightTrigger => Some(Btn::R1),
            Button::Start  => Some(Btn::Start),
            Button::Select => Some(Btn::Select),
            _ => None,
        }
    }
}

/// Per-button state: held (continuous) and just_pressed (edge).
#[derive(Clone, Copy, Debug, Default)]
struct BtnState {
    held: bool,
    just_pressed: bool,
}

impl BtnState {
    fn set(&mut self, held: bool) {
        if held && !self.held { self.just_pressed = true; }
        self.held = held;
    }
}

/// Action-to-button mapping (loaded from config).
#[derive(Debug, PartialEq)]
struct ActionMap {
    jump: Vec<Btn>,
    interact: Vec<Btn>,
    replay: Vec<Btn>,
    quit: Vec<Btn>,
}

impl Default for ActionMap {
    fn default() -> Self {
        ActionMap {
            jump:     vec![Btn::A],
            interact: vec![Btn::X, Btn::B],
            replay:   vec![Btn::Start],
            quit:     vec![Btn::Select],
        }
    }
}

impl ActionMap {
    /// Names that don't parse are skipped; an action left with no button
    /// keeps its default.
    fn from_config(cfg: &GamepadConfig) -> Self {
        fn parse_list(names: &[String], fallback: Vec<Btn>) -> Vec<Btn> {
            let parsed: Vec<Btn> = names.iter().filter_map(|s| Btn::from_name(s)).collect();
            if parsed.is_empty() { fallback } else { parsed }
        }
        let d = ActionMap::default();
        ActionMap {
            jump: parse_list(&cfg.jump, d.jump),
            interact: parse_list(&cfg.interact, d.interact),
            replay: parse_list(&cfg.replay, d.replay),
            quit: parse_list(&cfg.quit, d.quit),
        }
    }
}

pub struct GamepadState {
    #[cfg(feature = "gamepad")]
    gilrs: Option<Gilrs>,

    buttons: [BtnState; BTN_COUNT],

    dpad_up: BtnState,
    dpad_left: BtnState,
    dpad_right: BtnState,

    stick_up: BtnState,
    stick_left: BtnState,
    stick_right: BtnState,
    stick_x: f32,
    stick_y: f32,

    action_map: ActionMap,
    pub connected: bool,
}

impl GamepadState {
    pub fn new() -> Self {
        #[cfg(feature = "gamepad")]
        let (gilrs_opt, connected) = match Gilrs::new() {
            Ok(g) => {
                let has_pad = g.gamepads().next().is_some();
                (Some(g), has_pad)
            }
            Err(e) => {
                log::warn!("gamepad support unavailable: {}", e);
                (None, false)
            }
        };
        #[cfg(not(feature = "gamepad"))]
        let connected = false;

        GamepadState {
            #[cfg(feature = "gamepad")]
            gilrs: gilrs_opt,
            buttons: [BtnState::default(); BTN_COUNT],
            dpad_up: BtnState::default(),
            dpad_left: BtnState::default(),
            dpad_right: BtnState::default(),
            stick_up: BtnState::default(),
            stick_left: BtnState::default(),
            stick_right: BtnState::default(),
            stick_x: 0.0,
            stick_y: 0.0,
            action_map: ActionMap::default(),
            connected,
        }
    }

    pub fn load_button_config(&mut self, cfg: &GamepadConfig) {
        self.action_map = ActionMap::from_config(cfg);
    }

    /// Poll pending gamepad events. Call once per frame.
    pub fn update(&mut self) {
        #[cfg(feature = "gamepad")]
        self.poll_gilrs();
    }

    #[cfg(feature = "gamepad")]
    fn poll_gilrs(&mut self) {
        let gilrs = match &mut self.gilrs {
            Some(g) => g,
            None => return,
        };

        let events: Vec<_> = std::iter::from_fn(|| gilrs.next_event()).collect();

        for event in events {
            match event.event {
                EventType::ButtonPressed(btn, _) => {
                    self.connected = true;
                    self.set_button(btn, true);
                }
                EventType::ButtonReleased(btn, _) => {
                    self.connected = true;
                    self.set_button(btn, false);
                }
                EventType::AxisChanged(axis, value, _) => {
                    self.connected = true;
                    match axis {
                        Axis::LeftStickX => self.stick_x = value,
                        Axis::LeftStickY => self.stick_y = value,
                        _ => {}
                    }
                }
                EventType::Connected => {
                    log::info!("gamepad connected");
                    self.connected = true;
                }
                EventType::Disconnected => {
                    log::info!("gamepad disconnected");
                    self.connected = false;
                    self.release_all();
                }
                _ => {}
            }
        }

        self.derive_stick();
    }

    #[cfg(feature = "gamepad")]
    fn set_button(&mut self, gilrs_btn: Button, held: bool) {
        match gilrs_btn {
            Button::DPadUp    => self.dpad_up.set(held),
            Button::DPadLeft  => self.dpad_left.set(held),
            Button::DPadRight => self.dpad_right.set(held),
            other => {
                if let Some(btn) = Btn::from_gilrs(other) {
                    self.buttons[btn as usize].set(held);
                }
            }
        }
    }

    /// Digital states from the analog stick (y is up-positive).
    #[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
    fn derive_stick(&mut self) {
        let (x, y) = (self.stick_x, self.stick_y);
        self.stick_left.set(x < -STICK_DEADZONE);
        self.stick_right.set(x > STICK_DEADZONE);
        self.stick_up.set(y > STICK_DEADZONE);
    }

    // ── Action queries (config-driven) ──

    fn any_just_pressed(&self, btns: &[Btn]) -> bool {
        btns.iter().any(|&b| self.buttons[b as usize].just_pressed)
    }

    pub fn jump_pressed(&self) -> bool {
        self.any_just_pressed(&self.action_map.jump)
            || self.dpad_up.just_pressed
            || self.stick_up.just_pressed
    }
    pub fn interact_pressed(&self) -> bool {
        self.any_just_pressed(&self.action_map.interact)
    }
    pub fn replay_pressed(&self) -> bool {
        self.any_just_pressed(&self.action_map.replay)
    }
    pub fn quit_pressed(&self) -> bool {
        self.any_just_pressed(&self.action_map.quit)
    }

    pub fn left_held(&self) -> bool {
        self.dpad_left.held || self.stick_left.held
    }
    pub fn right_held(&self) -> bool {
        self.dpad_right.held || self.stick_right.held
    }

    /// Consume the accumulated edge presses. Called after each simulation tick.
    pub fn take_presses(&mut self) {
        for b in &mut self.buttons { b.just_pressed = false; }
        for s in [
            &mut self.dpad_up, &mut self.dpad_left, &mut self.dpad_right,
            &mut self.stick_up, &mut self.stick_left, &mut self.stick_right,
        ] {
            s.just_pressed = false;
        }
    }

    #[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
    fn release_all(&mut self) {
        self.buttons = [BtnState::default(); BTN_COUNT];
        self.dpad_up = BtnState::default();
        self.dpad_left = BtnState::default();
        self.dpad_right = BtnState::default();
        self.stick_x = 0.0;
        self.stick_y = 0.0;
        self.stick_up = BtnState::default();
        self.stick_left = BtnState::default();
        self.stick_right = BtnState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(jump: &[&str], interact: &[&str]) -> GamepadConfig {
        GamepadConfig {
            jump: jump.iter().map(|s| s.to_string()).collect(),
            interact: interact.iter().map(|s| s.to_string()).collect(),
            replay: vec![],
            quit: vec!["back".into()],
        }
    }

    #[test]
    fn button_names_are_case_insensitive() {
        assert_eq!(Btn::from_name("south"), Some(Btn::A));
        assert_eq!(Btn::from_name("Start"), Some(Btn::Start));
        assert_eq!(Btn::from_name("turbo"), None);
    }

    #[test]
    fn config_overrides_and_falls_back() {
        let map = ActionMap::from_config(&cfg(&["Y", "bogus"], &["nothing"]));
        assert_eq!(map.jump, vec![Btn::Y]);
        assert_eq!(map.interact, ActionMap::default().interact);
        assert_eq!(map.replay, vec![Btn::Start]);
        assert_eq!(map.quit, vec![Btn::Select]);
    }

    #[test]
    fn stick_edges_fire_once_until_taken() {
        let mut pad = GamepadState::new();
        pad.stick_y = 0.9;
        pad.derive_stick();
        assert!(pad.jump_pressed());
        pad.derive_stick();
        assert!(pad.jump_pressed(), "edge stays until consumed");
        pad.take_presses();
        pad.derive_stick();
        assert!(!pad.jump_pressed());

        pad.stick_x = -0.5;
        pad.derive_stick();
        assert!(pad.left_held());
        assert!(!pad.right_held());
    }
}

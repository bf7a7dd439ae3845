/// HUD view model, derived from the world every frame.
///
/// Screen-space only: nothing here reads the camera, and the renderer draws
/// it after (and on top of) the world view.

use crate::domain::rules::{LossCause, Outcome};
use super::world::WorldState;

pub const REPLAY_LABEL: &str = "[ REPLAY ]";

/// End-of-game overlay.
#[derive(Clone, Debug, PartialEq)]
pub struct EndBanner {
    pub title: &'static str,
    pub detail: String,
    pub prompt: &'static str,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Hud {
    pub score_text: String,
    pub health_text: String,
    pub level_text: String,
    /// Filled hearts, then empty ones, `max_health` in total.
    pub hearts: (u32, u32),
    pub has_key: bool,
    pub banner: Option<EndBanner>,
}

impl Hud {
    pub fn from_world(world: &WorldState) -> Self {
        let s = &world.session;
        let banner = s.outcome.map(|outcome| {
            let (title, why) = match outcome {
                Outcome::Won => ("You Win!", "The door is open"),
                Outcome::Lost(LossCause::OutOfHealth) => ("Game Over", "Out of health"),
                Outcome::Lost(LossCause::Drowned) => ("Game Over", "You drowned"),
                Outcome::Lost(LossCause::FellOut) => ("Game Over", "You fell"),
            };
            EndBanner {
                title,
                detail: format!("{}. Final score: {}", why, s.score),
                prompt: "Press ENTER or click REPLAY",
            }
        });

        Hud {
            score_text: format!("Score: {}", s.score),
            health_text: format!("Health: {}", s.health),
            level_text: format!(
                "Level {}/{}  {}",
                world.current_level + 1, world.total_levels.max(1), world.level_name,
            ),
            hearts: (s.health, s.max_health.saturating_sub(s.health)),
            has_key: world.player.has_key,
            banner,
        }
    }

    /// The replay control exists only once the game has ended.
    pub fn replay_visible(&self) -> bool {
        self.banner.is_some()
    }
}

/// A clickable region in terminal cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScreenRect {
    pub col: u16,
    pub row: u16,
    pub width: u16,
    pub height: u16,
}

impl ScreenRect {
    pub fn contains(&self, col: u16, row: u16) -> bool {
        col >= self.col
            && col < self.col.saturating_add(self.width)
            && row >= self.row
            && row < self.row.saturating_add(self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PhysicsConfig, RulesConfig};

    fn world() -> WorldState {
        let mut w = WorldState::new(PhysicsConfig::default(), RulesConfig::default());
        w.total_levels = 2;
        w.level_name = "Meadow Run".into();
        w
    }

    #[test]
    fn playing_hud_has_no_banner() {
        let mut w = world();
        w.session.score = 40;
        w.session.health = 2;
        let hud = Hud::from_world(&w);
        assert_eq!(hud.score_text, "Score: 40");
        assert_eq!(hud.health_text, "Health: 2");
        assert_eq!(hud.level_text, "Level 1/2  Meadow Run");
        assert_eq!(hud.hearts, (2, 1));
        assert!(!hud.replay_visible());
    }

    #[test]
    fn loss_shows_game_over_and_replay() {
        let mut w = world();
        w.session.health = 0;
        w.session.end(Outcome::Lost(LossCause::OutOfHealth));
        let hud = Hud::from_world(&w);
        let banner = hud.banner.clone().unwrap();
        assert_eq!(banner.title, "Game Over");
        assert_eq!(banner.detail, "Out of health. Final score: 0");
        assert!(hud.replay_visible());
    }

    #[test]
    fn win_banner() {
        let mut w = world();
        w.session.score = 130;
        w.session.end(Outcome::Won);
        let hud = Hud::from_world(&w);
        assert_eq!(hud.banner.map(|b| b.title), Some("You Win!"));
    }

    #[test]
    fn screen_rect_hit_test() {
        let r = ScreenRect { col: 10, row: 5, width: 10, height: 1 };
        assert!(r.contains(10, 5));
        assert!(r.contains(19, 5));
        assert!(!r.contains(20, 5));
        assert!(!r.contains(12, 6));
        assert!(!r.contains(9, 5));
    }
}

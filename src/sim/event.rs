/// Events emitted during a simulation step.
/// The presentation layer consumes these for particles and sound.

use crate::domain::entity::ItemKind;
use crate::domain::rules::LossCause;

#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    /// `stage` is 1 for a ground jump, 2 for the air jump, and so on.
    Jumped { stage: u8, x: f32, y: f32 },
    Footstep { x: f32, y: f32 },
    ItemCollected { kind: ItemKind, x: f32, y: f32 },
    SpikeHit { health: u32 },
    DoorLocked,
    PlayerKilled { cause: LossCause },
    LevelAdvanced { next: usize, score: u32 },
    GameWon { score: u32 },
}

/// Entities: Player, collectible Items, Spikes, Doors.
/// World units are pixels with y growing downward (tile row 0 is the top).

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Facing {
    Left,
    Right,
}

/// Frame input: held movement plus edge-triggered actions.
/// Movement = continuous (held key), jump/interact = fresh press this tick.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameInput {
    pub movement: Option<Facing>,
    pub jump: bool,
    pub interact: bool,
}

/// Axis-aligned box, top-left anchored.
#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Rect { x, y, w, h }
    }

    pub fn from_center(cx: f32, cy: f32, w: f32, h: f32) -> Self {
        Rect { x: cx - w / 2.0, y: cy - h / 2.0, w, h }
    }

    #[inline]
    pub fn right(&self) -> f32 { self.x + self.w }

    #[inline]
    pub fn bottom(&self) -> f32 { self.y + self.h }

    #[inline]
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    /// Strict overlap: boxes that merely share an edge do not overlap.
    #[inline]
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}

#[derive(Clone, Debug)]
pub struct Player {
    /// Body centre
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub width: f32,
    pub height: f32,
    pub facing: Facing,
    /// Resting on a solid tile after the last physics step.
    pub grounded: bool,
    /// Cleared when the game ends; an inactive player ignores input and physics.
    pub active: bool,
    pub visible: bool,
    /// Jumps spent since last touching the ground.
    pub jumps_used: u8,
    pub has_key: bool,
}

impl Player {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Player {
            x, y,
            vx: 0.0,
            vy: 0.0,
            width,
            height,
            facing: Facing::Right,
            grounded: false,
            active: true,
            visible: true,
            jumps_used: 0,
            has_key: false,
        }
    }

    pub fn body(&self) -> Rect {
        Rect::from_center(self.x, self.y, self.width, self.height)
    }

    /// Sample point just inside the bottom edge, used for water checks.
    pub fn feet(&self) -> (f32, f32) {
        (self.x, self.y + self.height / 2.0 - 2.0)
    }

    /// Deactivate and hide; velocity is zeroed so nothing drifts afterwards.
    pub fn freeze(&mut self) {
        self.active = false;
        self.visible = false;
        self.vx = 0.0;
        self.vy = 0.0;
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ItemKind {
    Coin,
    Diamond,
    Heart,
    Key,
}

impl ItemKind {
    pub const ALL: [ItemKind; 4] = [ItemKind::Coin, ItemKind::Diamond, ItemKind::Heart, ItemKind::Key];
}

/// A collectible. Removed from the world when picked up.
#[derive(Clone, Debug, PartialEq)]
pub struct Item {
    pub kind: ItemKind,
    pub rect: Rect,
}

impl Item {
    pub fn new(kind: ItemKind, rect: Rect) -> Self {
        Item { kind, rect }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Spike {
    pub rect: Rect,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Door {
    pub rect: Rect,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_overlap_is_strict() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let touching = Rect::new(10.0, 0.0, 10.0, 10.0);
        let inside = Rect::new(9.0, 9.0, 4.0, 4.0);
        assert!(!a.overlaps(&touching));
        assert!(a.overlaps(&inside));
        assert!(inside.overlaps(&a));
    }

    #[test]
    fn player_body_is_centred() {
        let p = Player::new(50.0, 40.0, 14.0, 18.0);
        let b = p.body();
        assert_eq!(b.x, 43.0);
        assert_eq!(b.y, 31.0);
        assert_eq!(b.center(), (50.0, 40.0));
        let (fx, fy) = p.feet();
        assert_eq!(fx, 50.0);
        assert_eq!(fy, 47.0);
    }

    #[test]
    fn freeze_hides_and_stops() {
        let mut p = Player::new(0.0, 0.0, 14.0, 18.0);
        p.vx = 200.0;
        p.vy = -450.0;
        p.freeze();
        assert!(!p.active);
        assert!(!p.visible);
        assert_eq!((p.vx, p.vy), (0.0, 0.0));
    }
}

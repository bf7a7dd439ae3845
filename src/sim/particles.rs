/// Transient world-space particles: jump sparks, coin sparkles, walking dust.
///
/// Purely cosmetic. The simulation never reads particles back, so they
/// keep animating after the game ends.

use super::event::GameEvent;
use crate::domain::entity::ItemKind;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ParticleKind {
    Spark,
    Sparkle,
    Dust,
}

#[derive(Clone, Debug)]
pub struct Particle {
    pub kind: ParticleKind,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    /// Seconds left
    pub life: f32,
    pub max_life: f32,
    /// Downward acceleration (negative floats the particle up)
    pub gravity: f32,
}

impl Particle {
    /// Advance one tick. Returns false when expired.
    pub fn tick(&mut self, dt: f32) -> bool {
        self.life -= dt;
        if self.life <= 0.0 { return false; }
        self.vy += self.gravity * dt;
        self.x += self.vx * dt;
        self.y += self.vy * dt;
        true
    }

    /// 1.0 = freshly spawned, 0.0 = about to vanish.
    pub fn fade(&self) -> f32 {
        if self.max_life <= 0.0 { return 0.0; }
        (self.life / self.max_life).clamp(0.0, 1.0)
    }
}

/// Seedable xorshift64, deterministic so bursts are testable.
#[derive(Clone, Debug)]
struct Rng {
    state: u64,
}

impl Rng {
    fn new(seed: u64) -> Self {
        Rng { state: if seed == 0 { 1 } else { seed } }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    /// Uniform in [-1, 1]
    fn signed_unit(&mut self) -> f32 {
        ((self.next_u64() & 0xFFFF) as f32 / 65535.0) * 2.0 - 1.0
    }
}

/// Cap so a burst storm can't grow without bound.
const MAX_PARTICLES: usize = 512;

pub struct ParticleSystem {
    pub particles: Vec<Particle>,
    rng: Rng,
}

impl ParticleSystem {
    pub fn new(seed: u64) -> Self {
        ParticleSystem { particles: Vec::with_capacity(64), rng: Rng::new(seed) }
    }

    pub fn clear(&mut self) {
        self.particles.clear();
    }

    /// Emit `count` particles of `kind` from a point.
    pub fn burst(&mut self, kind: ParticleKind, x: f32, y: f32, count: usize) {
        let (speed, life, gravity) = match kind {
            ParticleKind::Spark => (160.0, 0.20, 0.0),
            ParticleKind::Sparkle => (120.0, 0.35, 0.0),
            ParticleKind::Dust => (80.0, 0.20, -300.0),
        };
        for _ in 0..count {
            if self.particles.len() >= MAX_PARTICLES { break; }
            let (vx, vy) = match kind {
                // Dust drifts sideways and floats up
                ParticleKind::Dust => (self.rng.signed_unit() * speed, -self.rng.signed_unit().abs() * 20.0),
                _ => (self.rng.signed_unit() * speed, self.rng.signed_unit() * speed),
            };
            let life = life * (0.75 + 0.25 * self.rng.signed_unit().abs());
            self.particles.push(Particle { kind, x, y, vx, vy, life, max_life: life, gravity });
        }
    }

    /// Spawn the bursts that accompany simulation events.
    pub fn spawn_for(&mut self, events: &[GameEvent]) {
        for event in events {
            match *event {
                GameEvent::Jumped { x, y, .. } => self.burst(ParticleKind::Spark, x, y, 20),
                GameEvent::Footstep { x, y } => self.burst(ParticleKind::Dust, x, y, 2),
                GameEvent::ItemCollected { kind: ItemKind::Coin, x, y }
                | GameEvent::ItemCollected { kind: ItemKind::Diamond, x, y } => {
                    self.burst(ParticleKind::Sparkle, x, y, 16)
                }
                _ => {}
            }
        }
    }

    pub fn update(&mut self, dt: f32) {
        self.particles.retain_mut(|p| p.tick(dt));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn particle_expires() {
        let mut sys = ParticleSystem::new(42);
        sys.burst(ParticleKind::Spark, 0.0, 0.0, 10);
        assert_eq!(sys.particles.len(), 10);
        for _ in 0..30 { sys.update(1.0 / 60.0); }
        assert!(sys.particles.is_empty());
    }

    #[test]
    fn jump_and_coin_events_spawn_bursts() {
        let mut sys = ParticleSystem::new(1);
        sys.spawn_for(&[
            GameEvent::Jumped { stage: 1, x: 10.0, y: 10.0 },
            GameEvent::ItemCollected { kind: ItemKind::Coin, x: 5.0, y: 5.0 },
            GameEvent::ItemCollected { kind: ItemKind::Key, x: 5.0, y: 5.0 },
        ]);
        assert_eq!(sys.particles.len(), 36);
    }

    #[test]
    fn burst_count_is_capped() {
        let mut sys = ParticleSystem::new(3);
        for _ in 0..100 { sys.burst(ParticleKind::Sparkle, 0.0, 0.0, 16); }
        assert_eq!(sys.particles.len(), MAX_PARTICLES);
    }

    #[test]
    fn fade_runs_from_one_to_zero() {
        let mut p = Particle {
            kind: ParticleKind::Dust, x: 0.0, y: 0.0, vx: 0.0, vy: 0.0,
            life: 1.0, max_life: 1.0, gravity: 0.0,
        };
        assert!((p.fade() - 1.0).abs() < 1e-6);
        p.tick(0.5);
        assert!((p.fade() - 0.5).abs() < 1e-6);
    }
}

/// Gameplay rules: score, health, jump gating, door gating, end latch.
///
/// Pure state transitions with no knowledge of tiles or rendering.
/// The step function decides *when* a rule fires; this module decides
/// *what* it does.
///
/// ## Effect Table
/// ┌──────────────┬────────────────────────────────────┬──────────────────┐
/// │ Event         │ Effect                              │ Repeats?         │
/// ├──────────────┼────────────────────────────────────┼──────────────────┤
/// │ Coin          │ score += coin_score                 │ object removed   │
/// │ Diamond       │ score += diamond_score              │ object removed   │
/// │ Heart         │ health = min(health + 1, max)       │ object removed   │
/// │ Key           │ has_key = true                      │ object removed   │
/// │ Spike contact │ health = max(health - 1, 0)         │ after cooldown   │
/// │ Door contact  │ advance/win if key && fresh press   │ checked each tick│
/// └──────────────┴────────────────────────────────────┴──────────────────┘
///
/// ## End Latch
/// `Session::outcome` goes from `None` to `Some(..)` exactly once.
/// Every mutator is a no-op afterwards.

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LossCause {
    OutOfHealth,
    Drowned,
    FellOut,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Outcome {
    Won,
    Lost(LossCause),
}

/// Result of touching spikes this tick.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SpikeContact {
    /// Damage applied; carries the new health.
    Hurt(u32),
    /// Still inside the cooldown window from the previous hit.
    Cooldown,
    /// Session already ended.
    Ignored,
}

#[derive(Clone, Debug)]
pub struct Session {
    pub score: u32,
    pub health: u32,
    pub max_health: u32,
    pub last_spike_hit_ms: Option<u64>,
    pub outcome: Option<Outcome>,
}

impl Session {
    /// Fresh session for one level. `score` is the carried payload.
    pub fn new(score: u32, max_health: u32) -> Self {
        Session {
            score,
            health: max_health,
            max_health,
            last_spike_hit_ms: None,
            outcome: None,
        }
    }

    pub fn is_ended(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn add_score(&mut self, points: u32) {
        if self.is_ended() { return; }
        self.score = self.score.saturating_add(points);
    }

    /// Returns the new health.
    pub fn heal(&mut self, amount: u32) -> u32 {
        if !self.is_ended() {
            self.health = self.health.saturating_add(amount).min(self.max_health);
        }
        self.health
    }

    /// Returns the new health.
    pub fn damage(&mut self, amount: u32) -> u32 {
        if !self.is_ended() {
            self.health = self.health.saturating_sub(amount);
        }
        self.health
    }

    /// Spike contact at simulation time `now_ms`.
    /// A hit lands only if no prior hit exists or more than `cooldown_ms` passed.
    pub fn spike_contact(&mut self, now_ms: u64, cooldown_ms: u64) -> SpikeContact {
        if self.is_ended() { return SpikeContact::Ignored; }
        if let Some(last) = self.last_spike_hit_ms {
            if now_ms <= last + cooldown_ms {
                return SpikeContact::Cooldown;
            }
        }
        self.last_spike_hit_ms = Some(now_ms);
        SpikeContact::Hurt(self.damage(1))
    }

    /// Set the end latch. Returns true only for the call that set it.
    pub fn end(&mut self, outcome: Outcome) -> bool {
        if self.is_ended() { return false; }
        self.outcome = Some(outcome);
        true
    }
}

/// Can the actor jump now? Grounded always may; airborne may spend the
/// remaining stages.
pub fn can_jump(grounded: bool, jumps_used: u8, max_jumps: usize) -> bool {
    grounded || (jumps_used as usize) < max_jumps
}

/// Upward impulse for the next jump stage. Stages past the table reuse its last entry.
pub fn jump_impulse(impulses: &[f32], jumps_used: u8) -> f32 {
    let idx = (jumps_used as usize).min(impulses.len().saturating_sub(1));
    impulses.get(idx).copied().unwrap_or(0.0)
}

/// Door gate: key held AND interact freshly pressed this tick.
pub fn door_opens(has_key: bool, interact_pressed: bool) -> bool {
    has_key && interact_pressed
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Tiny LCG so sequence tests stay deterministic without extra crates.
    fn lcg(seed: &mut u32) -> u32 {
        *seed = seed.wrapping_mul(1103515245).wrapping_add(12345);
        *seed >> 16
    }

    #[test]
    fn coins_add_exactly_and_never_decrease() {
        let mut s = Session::new(0, 3);
        let mut prev = s.score;
        for _ in 0..50 {
            s.add_score(10);
            assert_eq!(s.score, prev + 10);
            prev = s.score;
        }
    }

    #[test]
    fn three_coins_and_a_diamond() {
        let mut s = Session::new(0, 3);
        for _ in 0..3 { s.add_score(10); }
        s.add_score(50);
        assert_eq!(s.score, 80);
    }

    #[test]
    fn health_stays_clamped_for_any_sequence() {
        let mut seed = 7;
        for _ in 0..20 {
            let mut s = Session::new(0, 3);
            for _ in 0..200 {
                if lcg(&mut seed) % 2 == 0 { s.heal(1); } else { s.damage(1); }
                assert!(s.health <= 3);
            }
        }
    }

    #[test]
    fn large_heal_saturates_at_max_health() {
        let mut s = Session::new(0, u32::MAX);
        s.damage(1);
        assert_eq!(s.heal(u32::MAX), u32::MAX);

        let mut s = Session::new(0, 5);
        s.damage(2);
        assert_eq!(s.heal(u32::MAX), 5);
    }

    #[test]
    fn spike_cooldown_blocks_second_hit_within_window() {
        let mut s = Session::new(0, 3);
        assert_eq!(s.spike_contact(0, 1500), SpikeContact::Hurt(2));
        assert_eq!(s.spike_contact(1000, 1500), SpikeContact::Cooldown);
        assert_eq!(s.health, 2);
    }

    #[test]
    fn spike_cooldown_allows_hit_after_window() {
        let mut s = Session::new(0, 3);
        assert_eq!(s.spike_contact(0, 1500), SpikeContact::Hurt(2));
        assert_eq!(s.spike_contact(1600, 1500), SpikeContact::Hurt(1));
    }

    #[test]
    fn continuous_contact_never_double_hits() {
        let mut s = Session::new(0, 3);
        let mut hits: Vec<u64> = vec![];
        for t in (0..6000).step_by(16) {
            if let SpikeContact::Hurt(_) = s.spike_contact(t, 1500) {
                hits.push(t);
            }
        }
        for pair in hits.windows(2) {
            assert!(pair[1] - pair[0] > 1500);
        }
        assert_eq!(s.health, 0);
    }

    #[test]
    fn end_latch_is_one_way() {
        let mut s = Session::new(40, 3);
        assert!(s.end(Outcome::Lost(LossCause::OutOfHealth)));
        assert!(!s.end(Outcome::Won));
        assert_eq!(s.outcome, Some(Outcome::Lost(LossCause::OutOfHealth)));

        // Frozen afterwards
        s.add_score(10);
        s.heal(1);
        assert_eq!(s.score, 40);
        assert_eq!(s.spike_contact(99_999, 1500), SpikeContact::Ignored);
    }

    #[test]
    fn jump_gating() {
        assert!(can_jump(true, 2, 2));
        assert!(can_jump(false, 1, 2));
        assert!(!can_jump(false, 2, 2));
        assert!(!can_jump(false, 1, 1));
    }

    #[test]
    fn jump_impulse_per_stage() {
        let table = [600.0, 300.0];
        assert_eq!(jump_impulse(&table, 0), 600.0);
        assert_eq!(jump_impulse(&table, 1), 300.0);
        assert_eq!(jump_impulse(&table, 5), 300.0);
        assert_eq!(jump_impulse(&[], 0), 0.0);
    }

    #[test]
    fn door_needs_key_and_fresh_press() {
        assert!(door_opens(true, true));
        assert!(!door_opens(true, false));
        assert!(!door_opens(false, true));
    }
}

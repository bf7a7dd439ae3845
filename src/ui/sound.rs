/// Sound engine: procedural chiptune effects via rodio.
///
/// Every effect is synthesized into an in-memory WAV buffer once, at start-up.
/// Playback is fire-and-forget through a detached `Sink`.
///
/// Build without the "sound" feature to drop audio entirely; the stub
/// `SoundEngine` keeps the same API and does nothing.

use crate::sim::event::GameEvent;

/// Which effect to play.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Sfx {
    Jump,
    Coin,
    Diamond,
    Heart,
    Key,
    Hurt,
    Locked,
    Die,
    Advance,
    Win,
    Footstep,
}

/// Map simulation events to effects, in event order.
pub fn sfx_for(events: &[GameEvent]) -> Vec<Sfx> {
    use crate::domain::entity::ItemKind;

    events.iter()
        .filter_map(|event| match event {
            GameEvent::Jumped { .. } => Some(Sfx::Jump),
            GameEvent::Footstep { .. } => Some(Sfx::Footstep),
            GameEvent::ItemCollected { kind, .. } => Some(match kind {
                ItemKind::Coin => Sfx::Coin,
                ItemKind::Diamond => Sfx::Diamond,
                ItemKind::Heart => Sfx::Heart,
                ItemKind::Key => Sfx::Key,
            }),
            // The death sound covers the last hit
            GameEvent::SpikeHit { health } if *health > 0 => Some(Sfx::Hurt),
            GameEvent::SpikeHit { .. } => None,
            GameEvent::DoorLocked => Some(Sfx::Locked),
            GameEvent::PlayerKilled { .. } => Some(Sfx::Die),
            GameEvent::LevelAdvanced { .. } => Some(Sfx::Advance),
            GameEvent::GameWon { .. } => Some(Sfx::Win),
        })
        .collect()
}

#[cfg(feature = "sound")]
mod inner {
    use std::collections::HashMap;
    use std::io::Cursor;
    use std::sync::Arc;

    use rodio::{OutputStream, OutputStreamHandle, Sink};

    use super::Sfx;

    const SAMPLE_RATE: u32 = 22050;
    const TAU: f32 = std::f32::consts::PI * 2.0;

    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        buffers: HashMap<Sfx, Arc<Vec<u8>>>,
    }

    impl SoundEngine {
        pub fn new() -> Option<Self> {
            let (stream, handle) = match OutputStream::try_default() {
                Ok(pair) => pair,
                Err(e) => {
                    log::warn!("no audio output, sound disabled: {}", e);
                    return None;
                }
            };

            let table: [(Sfx, Vec<f32>); 11] = [
                (Sfx::Jump, gen_sweep(280.0, 720.0, 0.12, 0.22)),
                (Sfx::Coin, gen_arpeggio(&[1319.0, 1976.0], 0.05, 0.22)),
                (Sfx::Diamond, gen_arpeggio(&[1047.0, 1319.0, 1568.0, 2093.0], 0.05, 0.22)),
                (Sfx::Heart, gen_arpeggio(&[523.0, 784.0], 0.09, 0.25)),
                (Sfx::Key, gen_arpeggio(&[1568.0, 1319.0, 2093.0], 0.06, 0.2)),
                (Sfx::Hurt, gen_noise_hit(0.14, 0.3)),
                (Sfx::Locked, gen_buzz(110.0, 0.18, 0.2)),
                (Sfx::Die, gen_descend()),
                (Sfx::Advance, gen_arpeggio(&[523.0, 659.0, 784.0, 1047.0], 0.09, 0.28)),
                (Sfx::Win, gen_fanfare()),
                (Sfx::Footstep, gen_noise_hit(0.04, 0.12)),
            ];
            let buffers = table.into_iter()
                .map(|(sfx, samples)| (sfx, Arc::new(make_wav(&samples))))
                .collect();

            Some(SoundEngine { _stream: stream, handle, buffers })
        }

        pub fn play(&self, sfx: Sfx) {
            let buf = match self.buffers.get(&sfx) {
                Some(b) => b,
                None => return,
            };
            if let Ok(sink) = Sink::try_new(&self.handle) {
                let cursor = Cursor::new(buf.as_ref().clone());
                if let Ok(src) = rodio::Decoder::new(cursor) {
                    sink.append(src);
                    sink.detach(); // fire-and-forget
                }
            }
        }
    }

    // ════════════════════════════════════════════════════════════
    //  Waveform generators: all produce Vec<f32> mono samples
    // ════════════════════════════════════════════════════════════

    fn samples_for(duration: f32) -> usize {
        (SAMPLE_RATE as f32 * duration) as usize
    }

    /// Pitch sweep with linear fade, used for the jump
    fn gen_sweep(from: f32, to: f32, duration: f32, volume: f32) -> Vec<f32> {
        let n = samples_for(duration);
        let mut phase = 0.0_f32;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                phase += (from + (to - from) * t) / SAMPLE_RATE as f32;
                // Square wave
                let wave = if (phase * TAU).sin() >= 0.0 { 1.0 } else { -1.0 };
                wave * (1.0 - t) * volume * 0.6
            })
            .collect()
    }

    /// Quick note sequence, sine + 3rd harmonic
    fn gen_arpeggio(notes: &[f32], note_dur: f32, volume: f32) -> Vec<f32> {
        let mut samples = Vec::new();
        for &freq in notes {
            let n = samples_for(note_dur);
            for i in 0..n {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32).powf(0.5);
                let wave = (t * freq * TAU).sin() * 0.7 + (t * freq * 3.0 * TAU).sin() * 0.3;
                samples.push(wave * env * volume);
            }
        }
        samples
    }

    /// Noise burst with a fast decay (hurt, footsteps)
    fn gen_noise_hit(duration: f32, volume: f32) -> Vec<f32> {
        let n = samples_for(duration);
        let mut rng: u32 = 0x1234_5678;
        (0..n)
            .map(|i| {
                rng = rng.wrapping_mul(1103515245).wrapping_add(12345);
                let noise = (rng >> 8) as f32 / (1u32 << 24) as f32 * 2.0 - 1.0;
                let env = (1.0 - i as f32 / n as f32).powf(2.0);
                noise * env * volume
            })
            .collect()
    }

    /// Low flat buzz for the locked door
    fn gen_buzz(freq: f32, duration: f32, volume: f32) -> Vec<f32> {
        let n = samples_for(duration);
        (0..n)
            .map(|i| {
                let t = i as f32 / SAMPLE_RATE as f32;
                // Sawtooth
                let saw = 2.0 * (t * freq - (t * freq + 0.5).floor());
                let env = 1.0 - i as f32 / n as f32 * 0.5;
                saw * env * volume
            })
            .collect()
    }

    /// Death: sad descending tones with a final fade
    fn gen_descend() -> Vec<f32> {
        let mut samples = gen_arpeggio(&[440.0, 370.0, 311.0, 261.0], 0.12, 0.3);
        let total = samples.len();
        let fade_len = total / 4;
        for (i, s) in samples.iter_mut().enumerate().skip(total - fade_len) {
            *s *= (total - i) as f32 / fade_len as f32;
        }
        samples
    }

    /// Victory: ascending run, then a held top note
    fn gen_fanfare() -> Vec<f32> {
        let mut samples = gen_arpeggio(&[523.0, 659.0, 784.0, 1047.0, 1319.0], 0.1, 0.3);
        let last = 1568.0_f32;
        let n = samples_for(0.35);
        for i in 0..n {
            let t = i as f32 / SAMPLE_RATE as f32;
            let env = 1.0 - i as f32 / n as f32;
            samples.push(((t * last * TAU).sin() * 0.8 + (t * last * 2.0 * TAU).sin() * 0.2) * env * 0.3);
        }
        samples
    }

    // ════════════════════════════════════════════════════════════
    //  WAV encoder: 16-bit PCM mono
    // ════════════════════════════════════════════════════════════

    fn make_wav(samples: &[f32]) -> Vec<u8> {
        let num_channels: u16 = 1;
        let bits_per_sample: u16 = 16;
        let byte_rate = SAMPLE_RATE * (num_channels as u32) * (bits_per_sample as u32) / 8;
        let block_align = num_channels * bits_per_sample / 8;
        let data_size = samples.len() as u32 * 2;
        let file_size = 36 + data_size;

        let mut buf = Vec::with_capacity(44 + data_size as usize);

        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&file_size.to_le_bytes());
        buf.extend_from_slice(b"WAVE");

        buf.extend_from_slice(b"fmt ");
        buf.extend_from_slice(&16u32.to_le_bytes());
        buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
        buf.extend_from_slice(&num_channels.to_le_bytes());
        buf.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
        buf.extend_from_slice(&byte_rate.to_le_bytes());
        buf.extend_from_slice(&block_align.to_le_bytes());
        buf.extend_from_slice(&bits_per_sample.to_le_bytes());

        buf.extend_from_slice(b"data");
        buf.extend_from_slice(&data_size.to_le_bytes());
        for &s in samples {
            let val = (s.clamp(-1.0, 1.0) * 32767.0) as i16;
            buf.extend_from_slice(&val.to_le_bytes());
        }
        buf
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn wav_header_and_size() {
            let wav = make_wav(&gen_noise_hit(0.01, 0.5));
            let n = samples_for(0.01);
            assert_eq!(&wav[0..4], b"RIFF");
            assert_eq!(&wav[8..12], b"WAVE");
            assert_eq!(wav.len(), 44 + n * 2);
        }

        #[test]
        fn generators_stay_in_range() {
            for s in gen_sweep(200.0, 800.0, 0.1, 0.3).into_iter()
                .chain(gen_buzz(110.0, 0.1, 0.2))
                .chain(gen_fanfare())
            {
                assert!((-1.0..=1.0).contains(&s));
            }
        }
    }
}

// ════════════════════════════════════════════════════════════
//  Public API: compiles to no-ops when the sound feature is off
// ════════════════════════════════════════════════════════════

#[cfg(feature = "sound")]
pub use inner::SoundEngine;

#[cfg(not(feature = "sound"))]
pub struct SoundEngine;

#[cfg(not(feature = "sound"))]
impl SoundEngine {
    pub fn new() -> Option<Self> { Some(SoundEngine) }
    pub fn play(&self, _sfx: Sfx) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::ItemKind;
    use crate::domain::rules::LossCause;

    #[test]
    fn events_map_to_effects() {
        let events = [
            GameEvent::Jumped { stage: 1, x: 0.0, y: 0.0 },
            GameEvent::ItemCollected { kind: ItemKind::Diamond, x: 0.0, y: 0.0 },
            GameEvent::SpikeHit { health: 2 },
            GameEvent::DoorLocked,
        ];
        assert_eq!(sfx_for(&events), vec![Sfx::Jump, Sfx::Diamond, Sfx::Hurt, Sfx::Locked]);
    }

    #[test]
    fn final_spike_hit_plays_only_death() {
        let events = [
            GameEvent::SpikeHit { health: 0 },
            GameEvent::PlayerKilled { cause: LossCause::OutOfHealth },
        ];
        assert_eq!(sfx_for(&events), vec![Sfx::Die]);
    }
}

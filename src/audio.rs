//! Sound cues
//!
//! The simulation only names cues. Each cue is described as a few
//! procedural tones; on wasm32 they are played through the Web Audio API,
//! elsewhere any `AudioCue` implementation can consume them.

/// Sound effect types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SoundEffect {
    /// Coin starts spinning
    CoinSpin,
    /// Spin paid out
    CoinReward,
    /// Spin paid nothing
    CoinMiss,
    /// Coin eaten by a slime
    CoinDestroyed,
    /// Helper swings
    HelperAttack,
    /// Slime starts crawling
    SlimeMove,
    /// Slime lunges at a coin
    SlimeAttack,
    /// Slime takes a hit
    SlimeHit,
    /// Level target reached
    LevelUp,
}

impl SoundEffect {
    pub const ALL: [SoundEffect; 9] = [
        SoundEffect::CoinSpin,
        SoundEffect::CoinReward,
        SoundEffect::CoinMiss,
        SoundEffect::CoinDestroyed,
        SoundEffect::HelperAttack,
        SoundEffect::SlimeMove,
        SoundEffect::SlimeAttack,
        SoundEffect::SlimeHit,
        SoundEffect::LevelUp,
    ];

    /// Asset key for this cue
    pub fn name(&self) -> &'static str {
        match self {
            SoundEffect::CoinSpin => "coinSpin",
            SoundEffect::CoinReward => "coinReward",
            SoundEffect::CoinMiss => "coinMiss",
            SoundEffect::CoinDestroyed => "coinDestroyed",
            SoundEffect::HelperAttack => "helperAttack",
            SoundEffect::SlimeMove => "slimeMove",
            SoundEffect::SlimeAttack => "slimeAttack",
            SoundEffect::SlimeHit => "slimeHit",
            SoundEffect::LevelUp => "levelUp",
        }
    }

    /// Procedural recipe for this cue
    pub fn tones(&self) -> &'static [Tone] {
        match self {
            SoundEffect::CoinSpin => recipes::COIN_SPIN,
            SoundEffect::CoinReward => recipes::COIN_REWARD,
            SoundEffect::CoinMiss => recipes::COIN_MISS,
            SoundEffect::CoinDestroyed => recipes::COIN_DESTROYED,
            SoundEffect::HelperAttack => recipes::HELPER_ATTACK,
            SoundEffect::SlimeMove => recipes::SLIME_MOVE,
            SoundEffect::SlimeAttack => recipes::SLIME_ATTACK,
            SoundEffect::SlimeHit => recipes::SLIME_HIT,
            SoundEffect::LevelUp => recipes::LEVEL_UP,
        }
    }
}

mod recipes {
    use super::Tone;
    use super::Waveform::*;

    /// Rising shimmer
    pub const COIN_SPIN: &[Tone] = &[
        Tone::sweep(Triangle, 600.0, 1200.0, 0.25, 0.0, 0.2),
        Tone::sweep(Sine, 1200.0, 1800.0, 0.12, 0.05, 0.2),
    ];
    /// Two-note chime
    pub const COIN_REWARD: &[Tone] = &[
        Tone::steady(Sine, 988.0, 0.3, 0.0, 0.12),
        Tone::steady(Sine, 1319.0, 0.3, 0.08, 0.3),
    ];
    pub const COIN_MISS: &[Tone] = &[Tone::sweep(Triangle, 300.0, 150.0, 0.25, 0.0, 0.25)];
    /// Crunch
    pub const COIN_DESTROYED: &[Tone] = &[
        Tone::sweep(Sawtooth, 200.0, 50.0, 0.35, 0.0, 0.3),
        Tone::steady(Square, 1400.0, 0.1, 0.0, 0.06),
    ];
    pub const HELPER_ATTACK: &[Tone] = &[Tone::sweep(Square, 500.0, 180.0, 0.2, 0.0, 0.1)];
    pub const SLIME_MOVE: &[Tone] = &[Tone::sweep(Sine, 120.0, 90.0, 0.15, 0.0, 0.2)];
    pub const SLIME_ATTACK: &[Tone] = &[Tone::sweep(Sawtooth, 90.0, 220.0, 0.25, 0.0, 0.15)];
    /// Squelch
    pub const SLIME_HIT: &[Tone] = &[
        Tone::sweep(Sine, 400.0, 120.0, 0.35, 0.0, 0.25),
        Tone::steady(Triangle, 60.0, 0.3, 0.0, 0.15),
    ];
    /// Rising arpeggio
    pub const LEVEL_UP: &[Tone] = &[
        Tone::steady(Square, 523.0, 0.2, 0.0, 0.12),
        Tone::steady(Square, 659.0, 0.2, 0.1, 0.12),
        Tone::steady(Square, 784.0, 0.2, 0.2, 0.12),
        Tone::steady(Square, 1047.0, 0.25, 0.3, 0.3),
    ];
}

/// Oscillator shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

/// One oscillator voice with an exponential fade-out
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tone {
    pub wave: Waveform,
    pub from_hz: f32,
    pub to_hz: f32,
    /// Peak gain before master volume
    pub gain: f32,
    /// Offset from cue start (seconds)
    pub start: f64,
    /// Audible length (seconds)
    pub length: f64,
}

impl Tone {
    const fn sweep(wave: Waveform, from_hz: f32, to_hz: f32, gain: f32, start: f64, length: f64) -> Self {
        Self {
            wave,
            from_hz,
            to_hz,
            gain,
            start,
            length,
        }
    }

    const fn steady(wave: Waveform, hz: f32, gain: f32, start: f64, length: f64) -> Self {
        Self::sweep(wave, hz, hz, gain, start, length)
    }
}

/// Fire-and-forget sound playback
pub trait AudioCue {
    fn play(&mut self, cue: SoundEffect);
}

/// Discards every cue
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAudio;

impl AudioCue for NullAudio {
    fn play(&mut self, _cue: SoundEffect) {}
}

/// Remembers cues in order (headless runs and tests)
#[derive(Debug, Clone, Default)]
pub struct RecordingAudio {
    pub played: Vec<SoundEffect>,
}

impl RecordingAudio {
    pub fn count(&self, cue: SoundEffect) -> usize {
        self.played.iter().filter(|c| **c == cue).count()
    }
}

impl AudioCue for RecordingAudio {
    fn play(&mut self, cue: SoundEffect) {
        self.played.push(cue);
    }
}

#[cfg(target_arch = "wasm32")]
pub use web::WebAudio;

#[cfg(target_arch = "wasm32")]
mod web {
    use web_sys::{AudioContext, GainNode, OscillatorNode, OscillatorType};

    use super::{AudioCue, SoundEffect, Tone, Waveform};

    /// Web Audio backend
    pub struct WebAudio {
        ctx: Option<AudioContext>,
        master_volume: f32,
        muted: bool,
    }

    impl Default for WebAudio {
        fn default() -> Self {
            Self::new()
        }
    }

    impl WebAudio {
        pub fn new() -> Self {
            // Fails outside a secure context
            let ctx = AudioContext::new().ok();
            if ctx.is_none() {
                log::warn!("Failed to create AudioContext - audio disabled");
            }
            Self {
                ctx,
                master_volume: 0.8,
                muted: false,
            }
        }

        /// Resume audio context (required after user gesture)
        pub fn resume(&self) {
            if let Some(ctx) = &self.ctx {
                let _ = ctx.resume();
            }
        }

        pub fn set_master_volume(&mut self, vol: f32) {
            self.master_volume = vol.clamp(0.0, 1.0);
        }

        pub fn set_muted(&mut self, muted: bool) {
            self.muted = muted;
        }

        fn create_osc(
            ctx: &AudioContext,
            freq: f32,
            wave: Waveform,
        ) -> Option<(OscillatorNode, GainNode)> {
            let osc = ctx.create_oscillator().ok()?;
            let gain = ctx.create_gain().ok()?;

            osc.set_type(match wave {
                Waveform::Sine => OscillatorType::Sine,
                Waveform::Square => OscillatorType::Square,
                Waveform::Sawtooth => OscillatorType::Sawtooth,
                Waveform::Triangle => OscillatorType::Triangle,
            });
            osc.frequency().set_value(freq);
            osc.connect_with_audio_node(&gain).ok()?;
            gain.connect_with_audio_node(&ctx.destination()).ok()?;

            Some((osc, gain))
        }

        fn voice(ctx: &AudioContext, tone: &Tone, vol: f32) {
            let Some((osc, gain)) = Self::create_osc(ctx, tone.from_hz, tone.wave) else {
                return;
            };
            let t = ctx.current_time() + tone.start;
            let end = t + tone.length;

            gain.gain().set_value_at_time(vol * tone.gain, t).ok();
            gain.gain().exponential_ramp_to_value_at_time(0.01, end).ok();
            if tone.to_hz != tone.from_hz {
                osc.frequency().set_value_at_time(tone.from_hz, t).ok();
                osc.frequency()
                    .exponential_ramp_to_value_at_time(tone.to_hz, end)
                    .ok();
            }

            osc.start_with_when(t).ok();
            osc.stop_with_when(end + 0.05).ok();
        }
    }

    impl AudioCue for WebAudio {
        fn play(&mut self, cue: SoundEffect) {
            let vol = if self.muted { 0.0 } else { self.master_volume };
            if vol <= 0.0 {
                return;
            }
            let Some(ctx) = &self.ctx else { return };

            // Browsers start the context suspended until a user gesture
            if ctx.state() == web_sys::AudioContextState::Suspended {
                let _ = ctx.resume();
            }
            for tone in cue.tones() {
                Self::voice(ctx, tone, vol);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_cue_has_audible_tones() {
        for cue in SoundEffect::ALL {
            let tones = cue.tones();
            assert!(!tones.is_empty(), "{:?} is silent", cue);
            for tone in tones {
                // Exponential ramps need strictly positive endpoints
                assert!(tone.from_hz > 0.0 && tone.to_hz > 0.0);
                assert!(tone.gain > 0.0 && tone.gain <= 1.0);
                assert!(tone.length > 0.0 && tone.start >= 0.0);
            }
        }
    }

    #[test]
    fn test_cue_names_unique() {
        let mut names: Vec<&str> = SoundEffect::ALL.iter().map(|c| c.name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), SoundEffect::ALL.len());
    }

    #[test]
    fn test_recording_audio_counts() {
        let mut audio = RecordingAudio::default();
        audio.play(SoundEffect::CoinSpin);
        audio.play(SoundEffect::CoinSpin);
        audio.play(SoundEffect::SlimeHit);
        assert_eq!(audio.count(SoundEffect::CoinSpin), 2);
        assert_eq!(audio.count(SoundEffect::LevelUp), 0);
    }
}

pub mod context;
pub mod device;

pub use context::{AudioContext, ContextState, GainId, GainParam, Oscillator, Waveform};
pub use device::{AudioDevice, RodioDevice};

use crate::config::Preferences;
use log::{debug, warn};

#[derive(thiserror::Error, Debug)]
pub enum AudioError {
    #[error("audio output unavailable: {0}")]
    Unsupported(String),
    #[error("audio context is closed")]
    ContextClosed,
    #[error("gain node no longer exists")]
    UnknownNode,
    #[error("unable to start audio output: {0}")]
    Play(#[from] rodio::PlayError),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tone {
    pub frequency: f64,
    pub start_offset: f64,
}

/// C5, E5, G5
pub const CHIME_TONES: [Tone; 3] = [
    Tone {
        frequency: 523.25,
        start_offset: 0.0,
    },
    Tone {
        frequency: 659.25,
        start_offset: 0.12,
    },
    Tone {
        frequency: 783.99,
        start_offset: 0.24,
    },
];
pub const CHIME_TONE_LENGTH: f64 = 0.32;
pub const CHIME_PEAK: f64 = 0.4;
const CHIME_ATTACK: f64 = 0.04;
const CHIME_RELEASE: f64 = 0.7;

const CLICK_FREQUENCY: f64 = 1760.0;
const CLICK_LENGTH: f64 = 0.03;

/// Schedule the completion chime on `context`, starting now. Returns the shared gain node.
pub fn schedule_chime(context: &mut AudioContext) -> Result<GainId, AudioError> {
    let now = context.current_time();
    let gain = context.create_gain()?;
    if let Some(param) = context.gain_param_mut(gain) {
        param
            .set_value_at_time(0.001, now)
            .exponential_ramp_to_value_at_time(CHIME_PEAK, now + CHIME_ATTACK)
            .exponential_ramp_to_value_at_time(0.00001, now + CHIME_RELEASE);
    }
    context.connect(gain);

    for tone in CHIME_TONES {
        let start = now + tone.start_offset;
        context.start(
            Oscillator {
                waveform: Waveform::Triangle,
                frequency: tone.frequency,
                start,
                stop: start + CHIME_TONE_LENGTH,
            },
            gain,
        )?;
    }
    Ok(gain)
}

/// Short blip played on each key press
pub fn schedule_click(context: &mut AudioContext) -> Result<GainId, AudioError> {
    let now = context.current_time();
    let gain = context.create_gain()?;
    if let Some(param) = context.gain_param_mut(gain) {
        param
            .set_value_at_time(0.001, now)
            .exponential_ramp_to_value_at_time(0.25, now + 0.004)
            .exponential_ramp_to_value_at_time(0.0001, now + CLICK_LENGTH);
    }
    context.connect(gain);
    context.start(
        Oscillator {
            waveform: Waveform::Triangle,
            frequency: CLICK_FREQUENCY,
            start: now,
            stop: now + CLICK_LENGTH,
        },
        gain,
    )?;
    Ok(gain)
}

/// Owns the one audio context of the process: created on first use, resumed when
/// suspended, closed by `dispose`.
#[derive(Debug)]
pub struct AudioCues<D: AudioDevice> {
    device: D,
    context: Option<AudioContext>,
    preferences: Preferences,
    unavailable_logged: bool,
}

impl<D: AudioDevice> AudioCues<D> {
    pub fn new(device: D, preferences: Preferences) -> Self {
        Self {
            device,
            context: None,
            preferences,
            unavailable_logged: false,
        }
    }

    pub fn set_preferences(&mut self, preferences: Preferences) {
        self.preferences = preferences;
    }

    pub fn play_completion(&mut self) {
        if !self.preferences.completion_sound {
            return;
        }
        self.play_with(schedule_chime);
    }

    pub fn play_keypress(&mut self) {
        if !self.preferences.keypress_sound {
            return;
        }
        self.play_with(schedule_click);
    }

    fn play_with(&mut self, schedule: fn(&mut AudioContext) -> Result<GainId, AudioError>) {
        if !self.ensure_context() {
            return;
        }
        let Some(context) = self.context.as_mut() else {
            return;
        };

        if let Err(e) = schedule(context) {
            warn!("Unable to schedule audio cue: {}", e);
            return;
        }
        let samples = context.render_until_idle();
        if let Err(e) = self.device.play(&samples, context.sample_rate()) {
            warn!("Unable to play audio cue: {}", e);
        }
    }

    /// create-if-absent, resume-if-suspended
    fn ensure_context(&mut self) -> bool {
        if self.context.is_none() {
            match self.device.open() {
                Ok(sample_rate) => {
                    debug!("Audio context created at {} Hz", sample_rate);
                    self.context = Some(AudioContext::new(sample_rate));
                }
                Err(e) => {
                    if !self.unavailable_logged {
                        warn!("Audio cues disabled: {}", e);
                        self.unavailable_logged = true;
                    }
                    return false;
                }
            }
        }

        match self.context.as_mut() {
            Some(context) if context.state() == ContextState::Suspended => {
                if let Err(e) = context.resume() {
                    warn!("Unable to resume audio context: {}", e);
                    return false;
                }
                true
            }
            Some(context) => context.state() == ContextState::Running,
            None => false,
        }
    }

    pub fn context_state(&self) -> Option<ContextState> {
        self.context.as_ref().map(|c| c.state())
    }

    pub fn context(&self) -> Option<&AudioContext> {
        self.context.as_ref()
    }

    pub fn suspend(&mut self) {
        if let Some(context) = self.context.as_mut() {
            let _ = context.suspend();
        }
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    /// Close and release the context; a later cue creates a fresh one.
    pub fn dispose(&mut self) {
        if let Some(mut context) = self.context.take() {
            context.close();
            debug!("Audio context closed");
        }
        self.device.close();
    }
}

use super::AudioError;
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContextState {
    Running,
    Suspended,
    Closed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GainId(usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Square,
    Triangle,
}

impl Waveform {
    /// Sample at `phase` in `[0, 1)`, amplitude 1.
    pub fn sample(&self, phase: f64) -> f64 {
        match self {
            Waveform::Sine => (phase * std::f64::consts::TAU).sin(),
            Waveform::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Triangle => 1.0 - 4.0 * (phase - 0.5).abs(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Ramp {
    Set,
    Linear,
    Exponential,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct AutomationEvent {
    time: f64,
    value: f64,
    ramp: Ramp,
}

/// Automated gain value; times are seconds on the owning context's clock.
#[derive(Clone, Debug, PartialEq)]
pub struct GainParam {
    default_value: f64,
    events: Vec<AutomationEvent>,
}

impl Default for GainParam {
    fn default() -> Self {
        Self {
            default_value: 1.0,
            events: Vec::new(),
        }
    }
}

impl GainParam {
    pub fn set_value_at_time(&mut self, value: f64, time: f64) -> &mut Self {
        self.push(AutomationEvent {
            time,
            value,
            ramp: Ramp::Set,
        })
    }

    pub fn linear_ramp_to_value_at_time(&mut self, value: f64, time: f64) -> &mut Self {
        self.push(AutomationEvent {
            time,
            value,
            ramp: Ramp::Linear,
        })
    }

    pub fn exponential_ramp_to_value_at_time(&mut self, value: f64, time: f64) -> &mut Self {
        self.push(AutomationEvent {
            time,
            value,
            ramp: Ramp::Exponential,
        })
    }

    fn push(&mut self, event: AutomationEvent) -> &mut Self {
        let at = self.events.partition_point(|e| e.time <= event.time);
        self.events.insert(at, event);
        self
    }

    pub fn value_at(&self, time: f64) -> f64 {
        let next_idx = self.events.partition_point(|e| e.time <= time);
        let previous = match next_idx.checked_sub(1).and_then(|i| self.events.get(i)) {
            Some(event) => *event,
            None => AutomationEvent {
                time: 0.0,
                value: self.default_value,
                ramp: Ramp::Set,
            },
        };

        let Some(next) = self.events.get(next_idx) else {
            return previous.value;
        };

        let span = next.time - previous.time;
        if span <= 0.0 {
            return previous.value;
        }
        let progress = ((time - previous.time) / span).clamp(0.0, 1.0);

        match next.ramp {
            Ramp::Set => previous.value,
            Ramp::Linear => previous.value + (next.value - previous.value) * progress,
            Ramp::Exponential => {
                if previous.value <= 0.0 || next.value <= 0.0 {
                    previous.value
                } else {
                    previous.value * (next.value / previous.value).powf(progress)
                }
            }
        }
    }
}

/// Oscillator scheduled against the context clock
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Oscillator {
    pub waveform: Waveform,
    pub frequency: f64,
    pub start: f64,
    pub stop: f64,
}

#[derive(Debug)]
struct GainNode {
    param: GainParam,
    connected: bool,
    sources: usize,
}

#[derive(Debug)]
struct Voice {
    oscillator: Oscillator,
    gain: GainId,
    phase: f64,
}

/// Offline render graph: oscillators feed gain nodes, connected gains feed the output.
///
/// The clock only advances while rendering in the `Running` state. When the last
/// oscillator feeding a gain node ends, the node is disconnected and released.
#[derive(Debug)]
pub struct AudioContext {
    sample_rate: u32,
    frame: u64,
    state: ContextState,
    gains: HashMap<GainId, GainNode>,
    voices: Vec<Voice>,
    next_gain: usize,
}

impl AudioContext {
    /// Contexts start suspended until explicitly resumed.
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate: sample_rate.max(1),
            frame: 0,
            state: ContextState::Suspended,
            gains: HashMap::new(),
            voices: Vec::new(),
            next_gain: 0,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn state(&self) -> ContextState {
        self.state
    }

    pub fn current_time(&self) -> f64 {
        self.frame as f64 / self.sample_rate as f64
    }

    pub fn resume(&mut self) -> Result<(), AudioError> {
        match self.state {
            ContextState::Closed => Err(AudioError::ContextClosed),
            _ => {
                self.state = ContextState::Running;
                Ok(())
            }
        }
    }

    pub fn suspend(&mut self) -> Result<(), AudioError> {
        match self.state {
            ContextState::Closed => Err(AudioError::ContextClosed),
            _ => {
                self.state = ContextState::Suspended;
                Ok(())
            }
        }
    }

    pub fn close(&mut self) {
        self.state = ContextState::Closed;
        self.voices.clear();
        self.gains.clear();
    }

    pub fn create_gain(&mut self) -> Result<GainId, AudioError> {
        self.ensure_open()?;
        let id = GainId(self.next_gain);
        self.next_gain += 1;
        self.gains.insert(
            id,
            GainNode {
                param: GainParam::default(),
                connected: false,
                sources: 0,
            },
        );
        Ok(id)
    }

    pub fn gain_param_mut(&mut self, id: GainId) -> Option<&mut GainParam> {
        self.gains.get_mut(&id).map(|node| &mut node.param)
    }

    pub fn connect(&mut self, id: GainId) {
        if let Some(node) = self.gains.get_mut(&id) {
            node.connected = true;
        }
    }

    pub fn disconnect(&mut self, id: GainId) {
        if let Some(node) = self.gains.get_mut(&id) {
            node.connected = false;
        }
    }

    pub fn is_connected(&self, id: GainId) -> bool {
        self.gains.get(&id).is_some_and(|node| node.connected)
    }

    pub fn start(&mut self, oscillator: Oscillator, gain: GainId) -> Result<(), AudioError> {
        self.ensure_open()?;
        let node = self
            .gains
            .get_mut(&gain)
            .ok_or(AudioError::UnknownNode)?;
        node.sources += 1;
        self.voices.push(Voice {
            oscillator,
            gain,
            phase: 0.0,
        });
        Ok(())
    }

    pub fn live_gains(&self) -> usize {
        self.gains.len()
    }

    pub fn active_voices(&self) -> usize {
        self.voices.len()
    }

    /// Time at which the last scheduled oscillator stops
    pub fn idle_at(&self) -> Option<f64> {
        self.voices
            .iter()
            .map(|voice| voice.oscillator.stop)
            .reduce(f64::max)
    }

    /// Render `frames` mono samples. A context that is not running yields nothing.
    pub fn render(&mut self, frames: usize) -> Vec<f32> {
        if self.state != ContextState::Running {
            return Vec::new();
        }

        let rate = self.sample_rate as f64;
        let mut out = Vec::with_capacity(frames);
        for offset in 0..frames {
            let time = (self.frame + offset as u64) as f64 / rate;
            let mut mixed = 0.0;
            for voice in &mut self.voices {
                let osc = voice.oscillator;
                if time < osc.start || time >= osc.stop {
                    continue;
                }
                let level = match self.gains.get(&voice.gain) {
                    Some(node) if node.connected => node.param.value_at(time),
                    _ => 0.0,
                };
                mixed += osc.waveform.sample(voice.phase) * level;
                voice.phase = (voice.phase + osc.frequency / rate).fract();
            }
            out.push(mixed.clamp(-1.0, 1.0) as f32);
        }
        self.frame += frames as u64;
        self.release_finished();
        out
    }

    /// Render until every scheduled oscillator has stopped.
    pub fn render_until_idle(&mut self) -> Vec<f32> {
        let Some(idle_at) = self.idle_at() else {
            return Vec::new();
        };
        let remaining = (idle_at - self.current_time()).max(0.0);
        let frames = (remaining * self.sample_rate as f64).ceil() as usize;
        self.render(frames)
    }

    fn release_finished(&mut self) {
        let now = self.current_time();
        let gains = &mut self.gains;
        self.voices.retain(|voice| {
            if voice.oscillator.stop > now {
                return true;
            }
            if let Some(node) = gains.get_mut(&voice.gain) {
                node.sources = node.sources.saturating_sub(1);
                if node.sources == 0 {
                    node.connected = false;
                    gains.remove(&voice.gain);
                }
            }
            false
        });
    }

    fn ensure_open(&self) -> Result<(), AudioError> {
        if self.state == ContextState::Closed {
            return Err(AudioError::ContextClosed);
        }
        Ok(())
    }
}

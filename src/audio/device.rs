use super::AudioError;
use log::debug;
use rodio::buffer::SamplesBuffer;
use rodio::{OutputStream, OutputStreamHandle, Sink};
use std::fmt;

pub const OUTPUT_SAMPLE_RATE: u32 = 44_100;

/// Where rendered audio ends up
pub trait AudioDevice {
    /// Prepare the output and report its sample rate.
    fn open(&mut self) -> Result<u32, AudioError>;
    /// Hand over mono samples; must not block on playback.
    fn play(&mut self, samples: &[f32], sample_rate: u32) -> Result<(), AudioError>;
    /// Release the output. A later `open` acquires it again.
    fn close(&mut self) {}
}

impl<D: AudioDevice + ?Sized> AudioDevice for Box<D> {
    fn open(&mut self) -> Result<u32, AudioError> {
        (**self).open()
    }

    fn play(&mut self, samples: &[f32], sample_rate: u32) -> Result<(), AudioError> {
        (**self).play(samples, sample_rate)
    }

    fn close(&mut self) {
        (**self).close()
    }
}

/// Plays cues in-process on the default output device
#[derive(Default)]
pub struct RodioDevice {
    output: Option<(OutputStream, OutputStreamHandle)>,
}

impl RodioDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.output.is_some()
    }
}

impl fmt::Debug for RodioDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RodioDevice")
            .field("open", &self.is_open())
            .finish()
    }
}

impl AudioDevice for RodioDevice {
    fn open(&mut self) -> Result<u32, AudioError> {
        if self.output.is_none() {
            let output = OutputStream::try_default()
                .map_err(|e| AudioError::Unsupported(e.to_string()))?;
            debug!("Opened default audio output");
            self.output = Some(output);
        }
        Ok(OUTPUT_SAMPLE_RATE)
    }

    fn play(&mut self, samples: &[f32], sample_rate: u32) -> Result<(), AudioError> {
        if samples.is_empty() {
            return Ok(());
        }
        let (_, handle) = self
            .output
            .as_ref()
            .ok_or_else(|| AudioError::Unsupported("audio output is not open".to_string()))?;

        // one sink per cue so a click never waits behind a chime
        let sink = Sink::try_new(handle)?;
        sink.append(SamplesBuffer::new(1, sample_rate, samples.to_vec()));
        sink.detach();
        Ok(())
    }

    fn close(&mut self) {
        if self.output.take().is_some() {
            debug!("Closed audio output");
        }
    }
}

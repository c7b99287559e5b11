use crate::util::{find_program, split_command};
use log::{debug, warn};
use rodio::decoder::DecoderError;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

#[derive(thiserror::Error, Debug)]
pub enum PlaybackError {
    #[error("no audio file or speech command available")]
    Unavailable,
    #[error("unable to start playback: {0}")]
    Io(#[from] std::io::Error),
    #[error("unable to decode audio file: {0}")]
    Decode(#[from] DecoderError),
    #[error("audio output unavailable: {0}")]
    Output(String),
}

/// Reads a sentence aloud
pub trait Speaker {
    /// Start playback and return without waiting for it. Anything still playing is
    /// stopped first. A pre-generated audio file wins over synthesized speech.
    fn speak(&mut self, text: &str, audio_url: Option<&str>) -> Result<(), PlaybackError>;

    fn stop(&mut self) {}
}

impl<S: Speaker + ?Sized> Speaker for Box<S> {
    fn speak(&mut self, text: &str, audio_url: Option<&str>) -> Result<(), PlaybackError> {
        (**self).speak(text, audio_url)
    }

    fn stop(&mut self) {
        (**self).stop()
    }
}

/// Map a stored audio location to a local file.
///
/// Remote URLs cannot be played and yield `None`. Existing paths are used as-is;
/// anything else is looked up by file name in `audio_dir`.
pub fn resolve_audio_path(audio_url: &str, audio_dir: Option<&Path>) -> Option<PathBuf> {
    if audio_url.contains("://") {
        return None;
    }
    let path = Path::new(audio_url);
    if path.is_file() {
        return Some(path.to_path_buf());
    }
    Some(audio_dir?.join(path.file_name()?))
}

/// Open and decode an audio file without touching the output device.
pub fn decode_file(path: &Path) -> Result<Decoder<BufReader<File>>, PlaybackError> {
    let file = File::open(path)?;
    Ok(Decoder::new(BufReader::new(file))?)
}

/// Plays sentence audio files on the default output, falling back to a speech command.
pub struct SentenceSpeaker {
    speech_command: Option<String>,
    audio_dir: Option<PathBuf>,
    output: Option<(OutputStream, OutputStreamHandle)>,
    sink: Option<Sink>,
    speech: Option<Child>,
    unavailable_logged: bool,
}

impl SentenceSpeaker {
    pub fn new(speech_command: Option<String>, audio_dir: Option<PathBuf>) -> Self {
        Self {
            speech_command,
            audio_dir,
            output: None,
            sink: None,
            speech: None,
            unavailable_logged: false,
        }
    }

    pub fn can_synthesize(&self) -> bool {
        self.speech_command
            .as_deref()
            .and_then(split_command)
            .is_some_and(|(program, _)| find_program(program).is_some())
    }

    fn play_file(&mut self, audio_url: &str) -> Result<Sink, PlaybackError> {
        let path = resolve_audio_path(audio_url, self.audio_dir.as_deref())
            .ok_or(PlaybackError::Unavailable)?;
        let source = decode_file(&path)?;

        if self.output.is_none() {
            let output =
                OutputStream::try_default().map_err(|e| PlaybackError::Output(e.to_string()))?;
            self.output = Some(output);
        }
        let Some((_, handle)) = self.output.as_ref() else {
            return Err(PlaybackError::Unavailable);
        };

        let sink = Sink::try_new(handle).map_err(|e| PlaybackError::Output(e.to_string()))?;
        sink.append(source);
        debug!("Playing sentence audio {}", path.display());
        Ok(sink)
    }

    fn synthesize(&self, text: &str) -> Result<Child, PlaybackError> {
        let (program, args) = self
            .speech_command
            .as_deref()
            .and_then(split_command)
            .ok_or(PlaybackError::Unavailable)?;
        if find_program(program).is_none() {
            return Err(PlaybackError::Unavailable);
        }
        let child = Command::new(program)
            .args(args)
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        Ok(child)
    }
}

impl fmt::Debug for SentenceSpeaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SentenceSpeaker")
            .field("speech_command", &self.speech_command)
            .field("audio_dir", &self.audio_dir)
            .field("output_open", &self.output.is_some())
            .finish()
    }
}

impl Speaker for SentenceSpeaker {
    fn speak(&mut self, text: &str, audio_url: Option<&str>) -> Result<(), PlaybackError> {
        self.stop();

        if let Some(url) = audio_url {
            match self.play_file(url) {
                Ok(sink) => {
                    self.sink = Some(sink);
                    return Ok(());
                }
                Err(e) => warn!("Audio playback failed, using speech instead: {}", e),
            }
        }

        match self.synthesize(text) {
            Ok(child) => {
                self.speech = Some(child);
                Ok(())
            }
            Err(PlaybackError::Unavailable) => {
                if !self.unavailable_logged {
                    warn!("Speech unavailable: configure speech_command");
                    self.unavailable_logged = true;
                }
                Err(PlaybackError::Unavailable)
            }
            Err(e) => Err(e),
        }
    }

    fn stop(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
        if let Some(mut child) = self.speech.take() {
            if let Ok(None) = child.try_wait() {
                let _ = child.kill();
            }
            let _ = child.wait();
        }
    }
}

impl Drop for SentenceSpeaker {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rodio::Source;

    fn write_tone(path: &Path, sample_rate: u32, frames: usize) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..frames {
            writer.write_sample(((i % 40) as i16 - 20) * 500).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_resolve_audio_path() {
        let dir = tempfile::tempdir().unwrap();
        let existing = dir.path().join("hello.wav");
        std::fs::write(&existing, b"").unwrap();

        assert_eq!(
            resolve_audio_path("https://cdn.example.com/a.wav", Some(dir.path())),
            None
        );
        assert_eq!(
            resolve_audio_path(existing.to_str().unwrap(), None),
            Some(existing.clone())
        );
        assert_eq!(
            resolve_audio_path("/audio/other.wav", Some(dir.path())),
            Some(dir.path().join("other.wav"))
        );
        assert_eq!(resolve_audio_path("/audio/other.wav", None), None);
    }

    #[test]
    fn test_decode_generated_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sentence.wav");
        write_tone(&path, 16_000, 1600);

        let source = decode_file(&path).unwrap();
        assert_eq!(source.channels(), 1);
        assert_eq!(source.sample_rate(), 16_000);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.wav");
        std::fs::write(&path, b"not audio at all").unwrap();

        assert_matches!(decode_file(&path).map(|_| ()), Err(PlaybackError::Decode(_)));
        assert_matches!(
            decode_file(&dir.path().join("missing.wav")).map(|_| ()),
            Err(PlaybackError::Io(_))
        );
    }

    #[test]
    fn test_unconfigured_speaker_is_unavailable() {
        let mut speaker = SentenceSpeaker::new(None, None);
        assert!(!speaker.can_synthesize());
        assert_matches!(
            speaker.speak("hello", None),
            Err(PlaybackError::Unavailable)
        );
        assert!(speaker.unavailable_logged);
    }

    #[test]
    fn test_unplayable_file_falls_back_to_speech() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.wav");
        std::fs::write(&path, b"not audio at all").unwrap();

        let mut speaker = SentenceSpeaker::new(
            Some("no-such-tts-dictate -v en".into()),
            Some(dir.path().to_path_buf()),
        );
        assert_matches!(
            speaker.speak("hello", Some(path.to_str().unwrap())),
            Err(PlaybackError::Unavailable)
        );
        // the output device is only opened once a file decodes
        assert!(speaker.output.is_none());
        assert!(speaker.sink.is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_speech_fallback_spawns_and_stops() {
        let Some(_) = find_program("sleep") else {
            return;
        };
        let mut speaker = SentenceSpeaker::new(Some("sleep".into()), None);
        assert!(speaker.can_synthesize());

        speaker.speak("5", None).unwrap();
        assert!(speaker.speech.is_some());

        // a second request replaces the first
        speaker.speak("5", Some("https://example.com/remote.wav")).unwrap();
        speaker.stop();
        assert!(speaker.speech.is_none());
    }
}

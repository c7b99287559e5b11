// Library surface shared by the binary and the integration tests.
pub mod aligner;
pub mod app;
pub mod app_dirs;
pub mod audio;
pub mod audio_gen;
pub mod config;
pub mod confetti;
pub mod normalize;
pub mod playback;
pub mod practice;
pub mod runtime;
pub mod sentences;
pub mod store;
pub mod timer;
pub mod ui;
pub mod util;

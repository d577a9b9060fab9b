//! Standard MIDI File playback: per-track decoding, tick-ordered merging and
//! drift-compensated real-time pacing.

pub mod error;
pub mod kdmapi;
pub mod midi;
pub mod output;
pub mod stats_logger;

pub use error::{LoadError, PlayError, SinkError};
pub use midi::loader::{MidiFile, load_midi_file, parse_midi_bytes, read_midi};
pub use midi::player::{PlaybackStats, Player, PlayerConfig};
pub use output::MessageSink;

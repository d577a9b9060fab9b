use thiserror::Error;

/// Failures that abort loading a MIDI file. No track survives any of them.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Could not read MIDI file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not a MIDI file")]
    NotMidi,

    #[error("Invalid header length {0}, expected 6")]
    InvalidHeaderLength(u32),

    #[error("SMPTE timing is not supported (time division {0:#06x})")]
    SmpteUnsupported(u16),

    #[error("Time division must not be zero")]
    ZeroTimeDivision,

    #[error("Memory allocation failed for a {requested} byte track")]
    OutOfMemory { requested: usize },
}

/// Failures while opening an output backend.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Failed to load the KDMAPI library: {0}")]
    LibraryLoad(#[from] libloading::Error),

    #[error("KDMAPI is not available")]
    Unavailable,

    #[error("Failed to initialize the KDMAPI stream")]
    StreamInit,

    #[error("Missing symbol `{0}`")]
    MissingSymbol(&'static str),

    #[error("MIDI output port error: {0}")]
    Port(String),
}

/// Failures while running playback.
#[derive(Error, Debug)]
pub enum PlayError {
    #[error("Failed to start the note-rate monitor: {0}")]
    MonitorSpawn(std::io::Error),
}

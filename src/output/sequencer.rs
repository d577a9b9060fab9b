use midir::{MidiOutput, MidiOutputConnection};

use crate::error::SinkError;
use crate::output::{MessageSink, unpack};

const CLIENT_NAME: &str = "MIDI Player";

/// Output through a connected sequencer port (ALSA on Linux).
pub struct SequencerSink {
    conn: MidiOutputConnection,
}

impl SequencerSink {
    /// Connect to the port with index `port`, or the first port whose name
    /// contains `port`.
    pub fn connect(port: &str) -> Result<Self, SinkError> {
        let out = MidiOutput::new(CLIENT_NAME).map_err(|e| SinkError::Port(e.to_string()))?;
        let ports = out.ports();

        let selected = match port.parse::<usize>() {
            Ok(idx) => ports.get(idx).cloned(),
            Err(_) => ports
                .iter()
                .find(|p| out.port_name(p).is_ok_and(|name| name.contains(port)))
                .cloned(),
        }
        .ok_or_else(|| SinkError::Port(format!("no MIDI output port matches `{port}`")))?;

        let name = out.port_name(&selected).unwrap_or_default();
        let conn = out
            .connect(&selected, "Out")
            .map_err(|e| SinkError::Port(e.to_string()))?;
        log::info!("Connected to MIDI port `{name}`");

        Ok(SequencerSink { conn })
    }
}

impl MessageSink for SequencerSink {
    fn send(&mut self, message: u32) {
        let (bytes, len) = unpack(message);
        if len == 0 {
            return;
        }
        if let Err(err) = self.conn.send(&bytes[..len]) {
            log::trace!("Dropped message {message:#08x}: {err}");
        }
    }
}

/// Names of the available output ports, by index.
pub fn list_ports() -> Result<Vec<String>, SinkError> {
    let out = MidiOutput::new(CLIENT_NAME).map_err(|e| SinkError::Port(e.to_string()))?;
    Ok(out
        .ports()
        .iter()
        .map(|p| out.port_name(p).unwrap_or_default())
        .collect())
}

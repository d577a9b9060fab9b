//! Output backends. The player only ever calls [`MessageSink::send`].

mod channel;
#[cfg(feature = "sequencer")]
mod sequencer;

pub use channel::ChannelSink;
#[cfg(feature = "sequencer")]
pub use sequencer::{SequencerSink, list_ports};

/// Receives packed short MIDI messages.
///
/// Byte 0 is the status, bytes 1 and 2 the data bytes. Delivery is
/// fire-and-forget: a sink swallows its own failures.
pub trait MessageSink {
    fn send(&mut self, message: u32);
}

impl<F: FnMut(u32)> MessageSink for F {
    fn send(&mut self, message: u32) {
        self(message)
    }
}

/// Number of raw bytes a packed channel message occupies on the wire.
/// Zero for anything that is not a channel message.
pub fn packed_len(status: u8) -> usize {
    match status {
        0x80..=0xBF | 0xE0..=0xEF => 3,
        0xC0..=0xDF => 2,
        _ => 0,
    }
}

/// The raw bytes of a packed channel message.
pub fn unpack(message: u32) -> ([u8; 3], usize) {
    let [status, data1, data2, _] = message.to_le_bytes();
    ([status, data1, data2], packed_len(status))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unpacks_by_status_class() {
        let (bytes, len) = unpack(0x00_40_3C_90);
        assert_eq!(&bytes[..len], &[0x90, 0x3C, 0x40]);

        let (bytes, len) = unpack(0x00_00_05_C2);
        assert_eq!(&bytes[..len], &[0xC2, 0x05]);

        let (_, len) = unpack(0x00_00_51_FF);
        assert_eq!(len, 0);
    }

    #[test]
    fn closures_are_sinks() {
        let mut sent = Vec::new();
        let mut sink = |m: u32| sent.push(m);
        sink.send(1);
        sink.send(2);
        assert_eq!(sent, vec![1, 2]);
    }
}

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};

use crate::output::MessageSink;

/// Relays messages to another thread, e.g. a host-language binding that
/// delivers them itself.
///
/// Never blocks the player: when the receiver falls behind and the queue
/// is full, messages are dropped.
pub struct ChannelSink {
    tx: Sender<u32>,
    dropped: u64,
}

impl ChannelSink {
    pub fn bounded(capacity: usize) -> (Self, Receiver<u32>) {
        let (tx, rx) = bounded(capacity);
        (ChannelSink { tx, dropped: 0 }, rx)
    }

    /// Messages lost to a full queue or a closed receiver.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl MessageSink for ChannelSink {
    fn send(&mut self, message: u32) {
        match self.tx.try_send(message) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                self.dropped += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relays_in_order() {
        let (mut sink, rx) = ChannelSink::bounded(4);
        sink.send(0x403C90);
        sink.send(0x003C80);
        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![0x403C90, 0x003C80]);
        assert_eq!(sink.dropped(), 0);
    }

    #[test]
    fn full_queue_drops_instead_of_blocking() {
        let (mut sink, rx) = ChannelSink::bounded(1);
        sink.send(1);
        sink.send(2);
        assert_eq!(sink.dropped(), 1);
        assert_eq!(rx.recv().unwrap(), 1);
    }
}

use crate::midi::tempo::Tempo;

/// Initial capacity of a track's meta/SysEx payload buffer.
const LONG_MSG_CAPACITY: usize = 256;

/// Growable payload buffer holding the body of the most recent meta or SysEx event.
#[derive(Debug, Clone)]
pub struct LongMessage {
    buf: Vec<u8>,
}

impl LongMessage {
    pub fn with_capacity(capacity: usize) -> Self {
        LongMessage {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Replace the contents with `bytes`, growing the buffer if needed.
    ///
    /// Growth failure terminates the process: the cursor cannot resume a
    /// stream whose payload it could not hold.
    pub fn fill_from(&mut self, bytes: &[u8]) {
        self.buf.clear();
        if let Err(err) = self.buf.try_reserve_exact(bytes.len()) {
            log::error!(
                "Memory allocation failed for a {} byte meta/sysex payload: {err}",
                bytes.len()
            );
            std::process::exit(1);
        }
        self.buf.extend_from_slice(bytes);
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }
}

/// What a meta event meant to the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaEvent {
    /// Set tempo, in microseconds per quarter note.
    Tempo(u32),
    EndOfTrack,
    Other(u8),
}

/// One track's raw event bytes and its decode position.
///
/// `data` is `None` exactly when the track has finished; a finished track is
/// never scheduled again.
#[derive(Debug, Clone)]
pub struct TrackData {
    data: Option<Vec<u8>>,
    pub long_msg: LongMessage,
    pub tick: u64,
    pub offset: usize,
    pub length: usize,
    pub message: u32,
    last_status: Option<u8>,
}

impl TrackData {
    /// Wrap the body of one `MTrk` chunk. The first delta-time is not decoded yet.
    pub fn new(data: Vec<u8>) -> Self {
        TrackData {
            length: data.len(),
            data: Some(data),
            long_msg: LongMessage::with_capacity(LONG_MSG_CAPACITY),
            tick: 0,
            offset: 0,
            message: 0,
            last_status: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.data.is_some()
    }

    /// True when every declared byte of the chunk has been consumed.
    pub fn is_exhausted(&self) -> bool {
        self.offset >= self.length
    }

    /// Release the event bytes and take the track out of scheduling.
    pub fn finish(&mut self) {
        self.data = None;
        self.length = 0;
    }

    fn next_byte(&mut self) -> Option<u8> {
        let byte = *self.data.as_ref()?.get(self.offset)?;
        if self.offset >= self.length {
            return None;
        }
        self.offset += 1;
        Some(byte)
    }

    fn peek_byte(&self) -> Option<u8> {
        if self.offset >= self.length {
            return None;
        }
        self.data.as_ref()?.get(self.offset).copied()
    }

    /// Decode a variable-length MIDI value from the data stream.
    ///
    /// Stops at the end of the track even if the continuation bit is still set.
    pub fn decode_variable_length(&mut self) -> u32 {
        let mut result = 0u32;
        while let Some(byte) = self.next_byte() {
            result = (result << 7) | u32::from(byte & 0x7F);
            if (byte & 0x80) == 0 {
                return result;
            }
        }
        if self.is_active() {
            log::debug!("Variable-length value truncated at offset {}", self.offset);
        }
        result
    }

    /// Advance the tick by the next delta-time value.
    pub fn update_tick(&mut self) {
        self.tick = self
            .tick
            .saturating_add(u64::from(self.decode_variable_length()));
    }

    /// Read the next status byte if present and update `message`.
    ///
    /// A data byte in the status position keeps the running status and is
    /// left for `update_message`. Meta and SysEx statuses are not retained as
    /// running status.
    pub fn update_command(&mut self) {
        let Some(byte) = self.peek_byte() else {
            return;
        };

        if byte >= 0x80 {
            self.offset += 1;
            self.message = u32::from(byte);
            if byte < 0xF0 {
                self.last_status = Some(byte);
            }
        } else {
            match self.last_status {
                Some(status) => self.message = u32::from(status),
                None => {
                    log::debug!("Data byte without running status at offset {}", self.offset);
                    self.message = 0;
                }
            }
        }
    }

    /// Read message params, or the payload of a meta/SysEx event into `long_msg`.
    pub fn update_message(&mut self) {
        let status = (self.message & 0xFF) as u8;
        let mut params = 0u32;

        match status {
            0x00..=0xBF | 0xE0..=0xEF => {
                if let Some(b1) = self.next_byte() {
                    params |= u32::from(b1) << 8;
                }
                if let Some(b2) = self.next_byte() {
                    params |= u32::from(b2) << 16;
                }
            }
            0xC0..=0xDF => {
                if let Some(b1) = self.next_byte() {
                    params |= u32::from(b1) << 8;
                }
            }
            0xF0 | 0xF7 | 0xFF => {
                if status == 0xFF {
                    // Meta event: first data byte is the meta type
                    if let Some(kind) = self.next_byte() {
                        params |= u32::from(kind) << 8;
                    }
                }

                let len = self.decode_variable_length() as usize;
                let end = self.offset.saturating_add(len).min(self.length);
                if end - self.offset < len {
                    log::debug!(
                        "Payload of {len} bytes truncated to {} at track end",
                        end - self.offset
                    );
                }
                if let Some(data) = self.data.as_ref() {
                    self.long_msg.fill_from(&data[self.offset..end]);
                }
                self.offset = end;
            }
            _ => {}
        }

        self.message = u32::from(status) | params;
    }

    /// Interpret the current meta event. End-of-track finishes the track.
    pub fn process_meta_event(&mut self, tempo: &mut Tempo) -> MetaEvent {
        let meta_type = ((self.message >> 8) & 0xFF) as u8;
        match meta_type {
            0x51 if self.long_msg.len() >= 3 => {
                let p = self.long_msg.as_slice();
                let t = (u32::from(p[0]) << 16) | (u32::from(p[1]) << 8) | u32::from(p[2]);
                tempo.set(t);
                MetaEvent::Tempo(t)
            }
            0x2F => {
                self.finish();
                MetaEvent::EndOfTrack
            }
            other => MetaEvent::Other(other),
        }
    }
}

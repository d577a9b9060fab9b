use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;
use std::time::Instant;

use crate::error::LoadError;
use crate::midi::track_data::TrackData;

/// A loaded Standard MIDI File, ready for scheduling.
#[derive(Debug)]
pub struct MidiFile {
    pub format: u16,
    /// Ticks per quarter note.
    pub time_div: u16,
    pub tracks: Vec<TrackData>,
}

/// Load a MIDI file from disk.
pub fn load_midi_file<P: AsRef<Path>>(filename: P) -> Result<MidiFile, LoadError> {
    let start = Instant::now();
    let file = File::open(&filename)?;
    let midi = read_midi(BufReader::new(file))?;

    log::info!(
        "Loaded {} tracks (format {}, {} ticks per quarter) in {:.2?}",
        midi.tracks.len(),
        midi.format,
        midi.time_div,
        start.elapsed()
    );
    Ok(midi)
}

/// Parse an in-memory MIDI file.
pub fn parse_midi_bytes(bytes: &[u8]) -> Result<MidiFile, LoadError> {
    read_midi(bytes)
}

/// Parse a MIDI file from any reader.
///
/// Chunks not tagged `MTrk` are skipped and do not count as tracks. Each
/// track's first delta-time is decoded before returning.
pub fn read_midi<R: Read>(mut reader: R) -> Result<MidiFile, LoadError> {
    // Read and verify the header
    let mut tag = [0u8; 4];
    reader.read_exact(&mut tag)?;
    if &tag != b"MThd" {
        return Err(LoadError::NotMidi);
    }

    let header_len = read_u32(&mut reader)?;
    if header_len != 6 {
        return Err(LoadError::InvalidHeaderLength(header_len));
    }

    let format = read_u16(&mut reader)?;
    let num_tracks = read_u16(&mut reader)? as usize;

    let time_div = read_u16(&mut reader)?;
    if (time_div & 0x8000) != 0 {
        return Err(LoadError::SmpteUnsupported(time_div));
    }
    if time_div == 0 {
        return Err(LoadError::ZeroTimeDivision);
    }

    log::debug!("Header: format {format}, {num_tracks} tracks, time division {time_div}");

    let mut tracks = Vec::with_capacity(num_tracks);

    while tracks.len() < num_tracks {
        match reader.read_exact(&mut tag) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                log::debug!(
                    "File ended after {} of {num_tracks} declared tracks",
                    tracks.len()
                );
                break;
            }
            Err(e) => return Err(e.into()),
        }
        let length = read_u32(&mut reader)? as usize;

        if &tag != b"MTrk" {
            log::debug!(
                "Skipping unknown chunk `{}` ({length} bytes)",
                String::from_utf8_lossy(&tag)
            );
            let skipped = io::copy(&mut reader.by_ref().take(length as u64), &mut io::sink())?;
            if skipped < length as u64 {
                break;
            }
            continue;
        }

        let mut data = Vec::new();
        data.try_reserve_exact(length)
            .map_err(|_| LoadError::OutOfMemory { requested: length })?;
        reader.by_ref().take(length as u64).read_to_end(&mut data)?;
        if data.len() < length {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("Track {} is truncated", tracks.len()),
            )
            .into());
        }

        let mut track = TrackData::new(data);
        track.update_tick();
        tracks.push(track);
    }

    Ok(MidiFile {
        format,
        time_div,
        tracks,
    })
}

fn read_u32<R: Read>(reader: &mut R) -> io::Result<u32> {
    let mut buf4 = [0u8; 4];
    reader.read_exact(&mut buf4)?;
    Ok(u32::from_be_bytes(buf4))
}

fn read_u16<R: Read>(reader: &mut R) -> io::Result<u16> {
    let mut buf2 = [0u8; 2];
    reader.read_exact(&mut buf2)?;
    Ok(u16::from_be_bytes(buf2))
}

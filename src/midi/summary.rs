use std::fmt;
use std::time::Duration;

use rayon::prelude::*;
use thousands::Separable;

use crate::midi::tempo::Tempo;
use crate::midi::track_data::{MetaEvent, TrackData};

#[derive(Debug, Default)]
struct TrackScan {
    events: u64,
    note_ons: u64,
    end_tick: u64,
    tempo_changes: Vec<(u64, u32)>,
}

/// Decode a copy of one track to the end.
fn scan_track(track: &TrackData, time_div: u16) -> TrackScan {
    let mut track = track.clone();
    // Tempo is applied in the merge below; this one only satisfies the decoder.
    let mut tempo = Tempo::new(time_div);
    let mut scan = TrackScan::default();

    while track.is_active() && !track.is_exhausted() {
        track.update_command();
        track.update_message();
        scan.events += 1;
        scan.end_tick = track.tick;

        match (track.message & 0xFF) as u8 {
            0x90..=0x9F => scan.note_ons += 1,
            0xFF => {
                if let MetaEvent::Tempo(t) = track.process_meta_event(&mut tempo) {
                    scan.tempo_changes.push((track.tick, t));
                }
            }
            _ => {}
        }

        if track.is_active() {
            track.update_tick();
        }
    }
    scan
}

/// Totals for a loaded file, computed without touching the playback cursors.
#[derive(Debug, Clone, PartialEq)]
pub struct MidiSummary {
    pub tracks: usize,
    pub events: u64,
    pub note_count: u64,
    pub total_ticks: u64,
    pub total_duration: Duration,
}

impl MidiSummary {
    pub fn scan(tracks: &[TrackData], time_div: u16) -> Self {
        let scans: Vec<TrackScan> = tracks
            .par_iter()
            .filter(|t| t.is_active())
            .map(|t| scan_track(t, time_div))
            .collect();

        let total_ticks = scans.iter().map(|s| s.end_tick).max().unwrap_or(0);

        // Tempo changes apply across tracks, in tick order; ties keep track order.
        let mut changes: Vec<(u64, u32)> = scans
            .iter()
            .flat_map(|s| s.tempo_changes.iter().copied())
            .collect();
        changes.sort_by_key(|&(tick, _)| tick);

        let mut tempo = Tempo::new(time_div);
        let mut last_tick = 0u64;
        let mut time_100ns = 0f64;
        for (tick, t) in changes {
            time_100ns += (tick - last_tick) as f64 * tempo.multiplier();
            last_tick = tick;
            tempo.set(t);
        }
        time_100ns += total_ticks.saturating_sub(last_tick) as f64 * tempo.multiplier();

        MidiSummary {
            tracks: tracks.len(),
            events: scans.iter().map(|s| s.events).sum(),
            note_count: scans.iter().map(|s| s.note_ons).sum(),
            total_ticks,
            total_duration: Duration::from_nanos((time_100ns * 100.0) as u64),
        }
    }
}

impl fmt::Display for MidiSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total_ms = self.total_duration.as_millis();
        let minutes = total_ms / 60_000;
        let seconds = (total_ms % 60_000) / 1_000;
        let millis = total_ms % 1_000;

        write!(
            f,
            "Parsed MIDI Summary:\n\
             - Tracks: {}\n\
             - Events: {}\n\
             - Note Count: {}\n\
             - Total Ticks: {}\n\
             - Total Duration: {:02}:{:02}.{:03}",
            self.tracks,
            self.events.separate_with_commas(),
            self.note_count.separate_with_commas(),
            self.total_ticks.separate_with_commas(),
            minutes,
            seconds,
            millis,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(bytes: &[u8]) -> TrackData {
        let mut track = TrackData::new(bytes.to_vec());
        track.update_tick();
        track
    }

    #[test]
    fn counts_and_times_across_tracks() {
        let tracks = vec![
            // Tempo map: 120 BPM, then 60 BPM from tick 100
            track(&[
                0x64, 0xFF, 0x51, 0x03, 0x0F, 0x42, 0x40, 0x00, 0xFF, 0x2F, 0x00,
            ]),
            track(&[
                0x00, 0x90, 0x3C, 0x40, 0x81, 0x48, 0x80, 0x3C, 0x00, 0x00, 0xFF, 0x2F, 0x00,
            ]),
        ];

        let summary = MidiSummary::scan(&tracks, 100);
        assert_eq!(summary.tracks, 2);
        assert_eq!(summary.events, 5);
        assert_eq!(summary.note_count, 1);
        assert_eq!(summary.total_ticks, 200);
        // 100 ticks at 0.5s/qn + 100 ticks at 1s/qn
        assert_eq!(summary.total_duration.as_millis(), 1_500);
    }

    #[test]
    fn scanning_leaves_cursors_untouched() {
        let tracks = vec![track(&[0x00, 0x90, 0x3C, 0x40, 0x00, 0xFF, 0x2F, 0x00])];
        MidiSummary::scan(&tracks, 96);
        assert!(tracks[0].is_active());
        assert_eq!(tracks[0].offset, 1);
    }

    #[test]
    fn display_uses_separators() {
        let summary = MidiSummary {
            tracks: 3,
            events: 1_234_567,
            note_count: 1_000,
            total_ticks: 42,
            total_duration: Duration::from_millis(61_005),
        };
        let text = summary.to_string();
        assert!(text.contains("Events: 1,234,567"));
        assert!(text.contains("Note Count: 1,000"));
        assert!(text.contains("Total Duration: 01:01.005"));
    }
}

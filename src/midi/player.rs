use std::sync::Arc;

use crate::error::PlayError;
use crate::midi::loader::MidiFile;
use crate::midi::pacer::DriftPacer;
use crate::midi::tempo::Tempo;
use crate::midi::track_data::{MetaEvent, TrackData};
use crate::midi::utils::Clock;
use crate::output::MessageSink;
use crate::stats_logger::{DEFAULT_FPS, NoteRateMonitor, StatsLogger};

/// Playback settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerConfig {
    /// Note-ons are sent only when their velocity is strictly above this.
    pub min_velocity: u8,
    /// Frames per second of the note-rate window.
    pub monitor_fps: usize,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        PlayerConfig {
            min_velocity: 1,
            monitor_fps: DEFAULT_FPS,
        }
    }
}

/// Counters for one playback run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackStats {
    /// Every event decoded, meta and SysEx included.
    pub events: u64,
    pub note_ons: u64,
    /// Note-ons at or below the velocity threshold.
    pub notes_filtered: u64,
    pub messages_sent: u64,
    pub sysex_skipped: u64,
    pub tempo_changes: u64,
    pub final_tick: u64,
}

/// Everything the dispatch step touches besides the track being drained.
struct Dispatcher {
    tempo: Tempo,
    min_velocity: u8,
    stats_logger: Arc<StatsLogger>,
    stats: PlaybackStats,
}

impl Dispatcher {
    fn dispatch<S: MessageSink>(&mut self, track: &mut TrackData, sink: &mut S) {
        self.stats.events += 1;
        let message = track.message;
        let msg_type = (message & 0xFF) as u8;

        match msg_type {
            0x90..=0x9F => {
                let velocity = ((message >> 16) & 0xFF) as u8;
                self.stats.note_ons += 1;
                self.stats_logger.increment();

                if velocity > self.min_velocity {
                    sink.send(message);
                    self.stats.messages_sent += 1;
                } else {
                    self.stats.notes_filtered += 1;
                }
            }
            0x80..=0xEF => {
                // Pass through all other channel messages
                sink.send(message);
                self.stats.messages_sent += 1;
            }
            0xFF => {
                if let MetaEvent::Tempo(t) = track.process_meta_event(&mut self.tempo) {
                    self.stats.tempo_changes += 1;
                    log::debug!("Tempo {t} us/qn ({:.2} BPM)", self.tempo.bpm());
                }
            }
            0xF0 | 0xF7 => {
                // SysEx is decoded only to skip its payload
                self.stats.sysex_skipped += 1;
                log::trace!("Skipped {} byte SysEx", track.long_msg.len());
            }
            _ => {
                log::debug!("Dropped message with invalid status {msg_type:#04x}");
            }
        }
    }
}

/// Merges all tracks by tick and dispatches their events to a sink.
pub struct Player {
    tracks: Vec<TrackData>,
    tick: u64,
    dispatcher: Dispatcher,
    monitor_fps: usize,
}

impl Player {
    pub fn new(midi: MidiFile, config: PlayerConfig) -> Self {
        Player {
            tracks: midi.tracks,
            tick: 0,
            dispatcher: Dispatcher {
                tempo: Tempo::new(midi.time_div),
                min_velocity: config.min_velocity,
                stats_logger: Arc::new(StatsLogger::new(config.monitor_fps)),
                stats: PlaybackStats::default(),
            },
            monitor_fps: config.monitor_fps,
        }
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn tempo(&self) -> &Tempo {
        &self.dispatcher.tempo
    }

    pub fn stats(&self) -> PlaybackStats {
        PlaybackStats {
            final_tick: self.tick,
            ..self.dispatcher.stats
        }
    }

    /// The note-on window shared with the monitor.
    pub fn stats_logger(&self) -> Arc<StatsLogger> {
        Arc::clone(&self.dispatcher.stats_logger)
    }

    pub fn active_tracks(&self) -> usize {
        self.tracks.iter().filter(|t| t.is_active()).count()
    }

    /// Drain every event due at the current tick, then advance the tick to
    /// the next pending event.
    ///
    /// Returns the tick delta advanced, or `None` once no track is active.
    pub fn step<S: MessageSink>(&mut self, sink: &mut S) -> Option<u64> {
        let tick = self.tick;

        for track in self.tracks.iter_mut().filter(|t| t.is_active()) {
            while track.is_active() && track.tick <= tick {
                if track.is_exhausted() {
                    log::debug!("Track ended without an end-of-track event");
                    track.finish();
                    break;
                }

                track.update_command();
                track.update_message();
                self.dispatcher.dispatch(track, sink);

                if track.is_active() {
                    track.update_tick();
                    if track.is_exhausted() {
                        track.finish();
                    }
                }
            }
        }

        // Find the next tick across all tracks
        let delta_tick = self
            .tracks
            .iter()
            .filter(|t| t.is_active())
            .map(|t| t.tick.saturating_sub(tick))
            .min()?;

        self.tick += delta_tick;
        Some(delta_tick)
    }

    /// Play every track to the end against `clock`, pacing between steps.
    pub fn run<S: MessageSink, C: Clock>(&mut self, sink: &mut S, clock: &C) -> PlaybackStats {
        let mut pacer = DriftPacer::new(clock.now_100ns());

        while let Some(delta_tick) = self.step(sink) {
            pacer.pace(delta_tick, self.dispatcher.tempo.multiplier(), clock);
        }

        self.stats()
    }

    /// Like [`Player::run`], with the note-rate monitor running alongside.
    ///
    /// `report` receives the trailing note rate once per monitor frame. The
    /// monitor is stopped and joined before this returns.
    pub fn play<S, C, R>(
        &mut self,
        sink: &mut S,
        clock: &C,
        report: R,
    ) -> Result<PlaybackStats, PlayError>
    where
        S: MessageSink,
        C: Clock,
        R: FnMut(u32) + Send + 'static,
    {
        log::debug!(
            "Playing {} tracks, monitor at {} fps",
            self.active_tracks(),
            self.monitor_fps
        );
        let monitor =
            NoteRateMonitor::spawn(self.stats_logger(), report).map_err(PlayError::MonitorSpawn)?;

        let stats = self.run(sink, clock);

        monitor.stop();
        Ok(stats)
    }
}

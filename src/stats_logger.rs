use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Sender, bounded, select, tick};

/// Default number of frames in the sliding one-second window.
pub const DEFAULT_FPS: usize = 144;

struct Ring {
    history: Vec<u32>,
    current_frame: usize,
}

/// Sliding window of note-on counts, one slot per frame.
///
/// The window covers `fps` frames, so its sum is the note rate over the last
/// notional second.
pub struct StatsLogger {
    fps: usize,
    ring: Mutex<Ring>,
}

impl StatsLogger {
    pub fn new(fps: usize) -> Self {
        let fps = fps.max(1);
        Self {
            fps,
            ring: Mutex::new(Ring {
                history: vec![0; fps],
                current_frame: 0,
            }),
        }
    }

    pub fn fps(&self) -> usize {
        self.fps
    }

    /// Length of one frame.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(1) / self.fps as u32
    }

    fn lock(&self) -> MutexGuard<'_, Ring> {
        self.ring.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Call this on every note-on.
    pub fn increment(&self) {
        let mut ring = self.lock();
        let idx = ring.current_frame;
        ring.history[idx] = ring.history[idx].saturating_add(1);
    }

    /// Advance the window by one frame, clearing the new slot.
    pub fn next_frame(&self) {
        let mut ring = self.lock();
        let next = (ring.current_frame + 1) % self.fps;
        ring.current_frame = next;
        ring.history[next] = 0;
    }

    /// Sum of the whole window.
    pub fn get_eps(&self) -> u32 {
        self.lock().history.iter().sum()
    }
}

/// Background thread that rotates a [`StatsLogger`] once per frame and
/// reports the trailing note rate.
pub struct NoteRateMonitor {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

impl NoteRateMonitor {
    pub fn spawn<R>(logger: Arc<StatsLogger>, mut report: R) -> io::Result<Self>
    where
        R: FnMut(u32) + Send + 'static,
    {
        let (stop, stopped) = bounded::<()>(1);
        let interval = logger.interval();

        let handle = thread::Builder::new()
            .name("note-rate".into())
            .spawn(move || {
                let ticker = tick(interval);
                loop {
                    select! {
                        recv(ticker) -> _ => {
                            logger.next_frame();
                            report(logger.get_eps());
                        }
                        recv(stopped) -> _ => break,
                    }
                }
            })?;

        Ok(NoteRateMonitor { stop, handle })
    }

    /// Signal the monitor to stop and wait for its thread to exit.
    pub fn stop(self) {
        let NoteRateMonitor { stop, handle } = self;
        drop(stop);
        if handle.join().is_err() {
            log::warn!("Note-rate monitor panicked");
        }
    }
}

// KDMAPI (OmniMIDI direct API) backend, loaded at runtime.

use libloading::{Library, Symbol};

use crate::error::SinkError;
use crate::output::MessageSink;

type IsAvailableFn = unsafe extern "C" fn() -> bool;
type InitializeFn = unsafe extern "C" fn() -> i32;
type TerminateFn = unsafe extern "C" fn() -> i32;
type ResetFn = unsafe extern "C" fn();
type SendDirectDataFn = unsafe extern "C" fn(u32) -> u32;

#[cfg(target_os = "windows")]
const LIBRARY_NAMES: &[&str] = &["OmniMIDI\\OmniMIDI", "OmniMIDI"];
#[cfg(target_os = "macos")]
const LIBRARY_NAMES: &[&str] = &["./libOmniMIDI.dylib", "libOmniMIDI.dylib"];
#[cfg(not(any(target_os = "windows", target_os = "macos")))]
const LIBRARY_NAMES: &[&str] = &["./libOmniMIDI.so", "libOmniMIDI.so"];

/// A loaded KDMAPI library. Owned by the caller; streams borrow from it.
pub struct Kdmapi {
    lib: Library,
}

impl Kdmapi {
    /// Load the first KDMAPI library found.
    pub fn load() -> Result<Self, SinkError> {
        let mut last_err = None;
        for name in LIBRARY_NAMES {
            // SAFETY: loading runs the library's initialisers; OmniMIDI has no
            // load-time requirements beyond being a well-formed library.
            match unsafe { Library::new(name) } {
                Ok(lib) => {
                    log::debug!("Loaded KDMAPI from `{name}`");
                    return Ok(Kdmapi { lib });
                }
                Err(err) => last_err = Some(err),
            }
        }
        Err(last_err.map_or(SinkError::Unavailable, SinkError::LibraryLoad))
    }

    fn symbol<T>(&self, name: &'static str) -> Result<Symbol<'_, T>, SinkError> {
        let mut cname = name.as_bytes().to_vec();
        cname.push(0);
        // SAFETY: every `T` used here matches the KDMAPI C declaration of `name`.
        unsafe { self.lib.get(&cname) }.map_err(|_| SinkError::MissingSymbol(name))
    }

    /// Calls `IsKDMAPIAvailable`
    pub fn is_available(&self) -> bool {
        match self.symbol::<IsAvailableFn>("IsKDMAPIAvailable") {
            Ok(f) => unsafe { f() },
            Err(_) => false,
        }
    }

    /// Calls `InitializeKDMAPIStream` and returns a stream that sends
    /// through `SendDirectData`.
    ///
    /// Automatically calls `TerminateKDMAPIStream` when dropped.
    pub fn open_stream(&self) -> Result<KdmapiStream<'_>, SinkError> {
        if !self.is_available() {
            return Err(SinkError::Unavailable);
        }
        let send_direct_data = self.symbol::<SendDirectDataFn>("SendDirectData")?;
        let initialize = self.symbol::<InitializeFn>("InitializeKDMAPIStream")?;

        if unsafe { initialize() } == 0 {
            return Err(SinkError::StreamInit);
        }

        Ok(KdmapiStream {
            send_direct_data,
            terminate: self.symbol("TerminateKDMAPIStream").ok(),
            reset: self.symbol("ResetKDMAPIStream").ok(),
        })
    }
}

/// An open KDMAPI stream.
pub struct KdmapiStream<'lib> {
    send_direct_data: Symbol<'lib, SendDirectDataFn>,
    terminate: Option<Symbol<'lib, TerminateFn>>,
    reset: Option<Symbol<'lib, ResetFn>>,
}

impl KdmapiStream<'_> {
    /// Calls `ResetKDMAPIStream`, silencing every voice.
    pub fn reset(&self) {
        if let Some(reset) = &self.reset {
            unsafe { reset() }
        }
    }
}

impl MessageSink for KdmapiStream<'_> {
    fn send(&mut self, message: u32) {
        unsafe {
            (self.send_direct_data)(message);
        }
    }
}

impl Drop for KdmapiStream<'_> {
    fn drop(&mut self) {
        if let Some(terminate) = &self.terminate {
            unsafe {
                terminate();
            }
        }
    }
}

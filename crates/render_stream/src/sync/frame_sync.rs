//! Frame synchronization object
//!
//! The controller node pulls [`FrameData`] from the link, applies it, and the
//! cluster broadcasts the serialized object so every follower applies the
//! same frame. Quit requests travel through the same payload and are acted on
//! one tick later, once followers have seen them.

use super::archive::{Archive, ArchiveError};
use super::FrameHost;
use crate::error::Result;
use crate::foundation::time::Stopwatch;
use crate::link::{FrameData, LinkError, LINK_VERSION_MAJOR, LINK_VERSION_MINOR};

/// Identifier the sync object is registered under with the cluster
pub const SYNC_OBJECT_ID: &str = "RenderStreamSyncFrameData";

/// Version of the payload layout following the protocol version
pub const DATA_VERSION: u32 = 4;

/// Await timeout used when none is configured, in milliseconds
pub const DEFAULT_AWAIT_TIMEOUT_MS: u32 = 500;

/// Delta used when the frame reports no usable rate
const FALLBACK_DELTA: f64 = 1.0 / 60.0;

/// Deferred quit state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuitState {
    /// Normal operation
    #[default]
    Running,
    /// Quit received; the process exits at the start of the next tick
    QuitPending,
}

/// What one receive call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// A frame was applied
    Applied,
    /// No frame this tick; the last applied state stays on screen
    NoFrame,
    /// Quit received and deferred to the next tick
    QuitPending,
    /// Exit was requested from the host
    Exited,
}

/// Frame delta from the controller's tracked clock
///
/// Uses `t_tracked - previous` when positive, otherwise the nominal
/// `denominator / numerator` rate. A non-positive difference is a clock
/// discontinuity on the controller and is logged.
pub fn derive_delta(previous: Option<f64>, frame: &FrameData) -> f64 {
    let nominal = frame.nominal_delta().unwrap_or(FALLBACK_DELTA);
    match previous {
        None => nominal,
        Some(previous) => {
            let delta = frame.t_tracked - previous;
            if delta > 0.0 {
                delta
            } else {
                log::warn!(
                    "Non-positive delta time! tTracked: {} previous: {previous}",
                    frame.t_tracked
                );
                nominal
            }
        }
    }
}

/// Replicated per-frame state
#[derive(Debug, Clone, Default)]
pub struct FrameSyncObject {
    quit: QuitState,
    frame_data_valid: bool,
    frame_data: FrameData,
    delta_time: f64,
    streams_changed: bool,
    last_tracked: Option<f64>,
    await_time_ms: f64,
    receive_time_ms: f64,
}

impl FrameSyncObject {
    /// Create an object with no valid frame
    pub fn new() -> Self {
        Self::default()
    }

    /// Deferred quit state
    pub const fn quit_state(&self) -> QuitState {
        self.quit
    }

    /// Whether the current frame data was applied this tick
    pub const fn is_frame_data_valid(&self) -> bool {
        self.frame_data_valid
    }

    /// Most recent frame data
    pub const fn frame_data(&self) -> &FrameData {
        &self.frame_data
    }

    /// Delta the controller derived for the current frame
    pub const fn delta_time(&self) -> f64 {
        self.delta_time
    }

    /// Whether the stream list changed since the last broadcast
    pub const fn streams_changed(&self) -> bool {
        self.streams_changed
    }

    /// Time the controller spent awaiting the last frame
    pub const fn await_time_ms(&self) -> f64 {
        self.await_time_ms
    }

    /// Time the follower spent receiving the last frame
    pub const fn receive_time_ms(&self) -> f64 {
        self.receive_time_ms
    }

    fn quit_now(host: &mut dyn FrameHost) {
        if let Err(e) = host.link().set_status_message("") {
            log::debug!("Unable to clear status message: {e}");
        }
        log::info!("Quitting due to link request");
        host.request_exit();
    }

    fn apply(host: &mut dyn FrameHost, frame: &FrameData, delta: f64) -> Result<()> {
        host.set_fixed_delta(delta);
        host.apply_frame(frame, delta)
    }

    /// Pull this tick's frame from the link and apply it (controller only)
    ///
    /// A streams-changed outcome repopulates the streams and awaits again, so
    /// a tick still gets real frame data.
    ///
    /// # Errors
    /// Propagates fatal errors from applying the frame.
    pub fn controller_receive(&mut self, host: &mut dyn FrameHost, timeout_ms: u32) -> Result<SyncOutcome> {
        if self.quit == QuitState::QuitPending {
            Self::quit_now(host);
            return Ok(SyncOutcome::Exited);
        }

        let stopwatch = Stopwatch::start_new();
        let outcome = loop {
            let awaited = host.link().await_frame_data(timeout_ms);
            match awaited {
                Err(LinkError::StreamsChanged) => {
                    log::info!("Streams changed, repopulating");
                    host.populate_streams();
                    self.streams_changed = true;
                }
                Err(LinkError::Quit) => {
                    self.frame_data_valid = false;
                    self.quit = QuitState::QuitPending;
                    break SyncOutcome::QuitPending;
                }
                Err(LinkError::Timeout) => {
                    if let Err(e) = host.link().set_status_message("Not requested") {
                        log::debug!("Unable to set status message: {e}");
                    }
                    self.frame_data_valid = false;
                    break SyncOutcome::NoFrame;
                }
                Err(e) => {
                    log::error!("Error awaiting frame data: {e}");
                    self.frame_data_valid = false;
                    break SyncOutcome::NoFrame;
                }
                Ok(frame) => {
                    if !self.frame_data_valid {
                        if let Err(e) = host.link().set_status_message("") {
                            log::debug!("Unable to clear status message: {e}");
                        }
                    }
                    self.delta_time = derive_delta(self.last_tracked, &frame);
                    self.last_tracked = Some(frame.t_tracked);
                    self.frame_data = frame;
                    self.frame_data_valid = true;
                    Self::apply(host, &frame, self.delta_time)?;
                    break SyncOutcome::Applied;
                }
            }
        };
        self.await_time_ms = stopwatch.elapsed_millis();
        Ok(outcome)
    }

    /// Apply the frame received through the cluster broadcast (follower only)
    ///
    /// The frame is stepped with the controller's replicated delta, never one
    /// derived from this node's own history.
    ///
    /// # Errors
    /// Propagates fatal errors from applying the frame.
    pub fn follower_receive(&mut self, host: &mut dyn FrameHost) -> Result<SyncOutcome> {
        let stopwatch = Stopwatch::start_new();
        if let Err(e) = host.link().set_follower(true) {
            log::error!("Unable to mark link as follower: {e}");
        }

        if self.streams_changed {
            log::info!("Controller reported changed streams, repopulating");
            host.populate_streams();
        }

        let outcome = if self.quit == QuitState::QuitPending {
            while host.link().begin_follower_frame(f64::MAX) != Err(LinkError::Quit) {
                log::warn!("Waiting for quit status from link");
            }
            Self::quit_now(host);
            SyncOutcome::Exited
        } else if self.frame_data_valid {
            let frame = self.frame_data;
            match host.link().begin_follower_frame(frame.t_tracked) {
                Err(LinkError::Quit) => {
                    Self::quit_now(host);
                    return Ok(SyncOutcome::Exited);
                }
                Err(e) => log::warn!("Unable to begin follower frame {}: {e}", frame.t_tracked),
                Ok(()) => {}
            }
            Self::apply(host, &frame, self.delta_time)?;
            SyncOutcome::Applied
        } else {
            SyncOutcome::NoFrame
        };
        self.receive_time_ms = stopwatch.elapsed_millis();
        Ok(outcome)
    }

    /// Map the replicated fields through an archive
    ///
    /// Saving clears the streams-changed edge once it has been written.
    ///
    /// # Errors
    /// Fails when loading a truncated payload or one from another version.
    pub fn map(&mut self, ar: &mut Archive<'_>) -> std::result::Result<(), ArchiveError> {
        let mut major = LINK_VERSION_MAJOR;
        let mut minor = LINK_VERSION_MINOR;
        let mut data = DATA_VERSION;
        ar.map_u32(&mut major)?;
        ar.map_u32(&mut minor)?;
        ar.map_u32(&mut data)?;
        if (major, minor, data) != (LINK_VERSION_MAJOR, LINK_VERSION_MINOR, DATA_VERSION) {
            return Err(ArchiveError::VersionMismatch { major, minor, data });
        }

        let mut quitting = self.quit == QuitState::QuitPending;
        ar.map_bool(&mut quitting)?;
        ar.map_bool(&mut self.frame_data_valid)?;
        ar.map_pod(&mut self.frame_data)?;
        ar.map_pod(&mut self.delta_time)?;
        ar.map_bool(&mut self.streams_changed)?;

        if ar.is_saving() {
            self.streams_changed = false;
        } else {
            self.quit = if quitting {
                QuitState::QuitPending
            } else {
                QuitState::Running
            };
        }
        Ok(())
    }

    /// Serialize for broadcast, clearing the streams-changed edge
    ///
    /// # Errors
    /// Saving into memory does not fail in practice.
    pub fn serialize(&mut self) -> std::result::Result<Vec<u8>, ArchiveError> {
        let mut bytes = Vec::new();
        self.map(&mut Archive::saving(&mut bytes))?;
        Ok(bytes)
    }

    /// Load a broadcast payload; on failure the object is left untouched
    ///
    /// # Errors
    /// Fails on truncated payloads and version mismatches.
    pub fn deserialize(&mut self, bytes: &[u8]) -> std::result::Result<(), ArchiveError> {
        let mut staged = self.clone();
        if let Err(e) = staged.map(&mut Archive::loading(bytes)) {
            log::error!("Controller payload rejected: {e}");
            return Err(e);
        }
        *self = staged;
        Ok(())
    }
}

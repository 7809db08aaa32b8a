//! Event markers for synchronizing recordings (e.g. EEG) with round outcomes
use serde::{Deserialize, Serialize};
use std::io;

use crate::constants::{MARKER_CODE_BANKED, MARKER_CODE_POPPED};
use crate::round::Outcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventMarker {
    Popped,
    Banked,
}

impl EventMarker {
    /// Numeric trigger code understood by the recording equipment.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Popped => MARKER_CODE_POPPED,
            Self::Banked => MARKER_CODE_BANKED,
        }
    }
}

impl From<Outcome> for EventMarker {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Popped => Self::Popped,
            Outcome::Banked => Self::Banked,
        }
    }
}

/// Destination for event markers. Implementations must not block on the
/// participant; a failed emit is logged by the session and play continues.
pub trait MarkerSink {
    /// Emit one marker.
    ///
    /// # Errors
    ///
    /// Returns the transport error when the marker could not be delivered.
    fn emit(&mut self, marker: EventMarker) -> io::Result<()>;
}

/// Sink that drops every marker.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl MarkerSink for NullSink {
    fn emit(&mut self, _marker: EventMarker) -> io::Result<()> {
        Ok(())
    }
}

/// Sink that keeps markers in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordingSink {
    pub markers: Vec<EventMarker>,
}

impl MarkerSink for RecordingSink {
    fn emit(&mut self, marker: EventMarker) -> io::Result<()> {
        self.markers.push(marker);
        Ok(())
    }
}

impl<S: MarkerSink + ?Sized> MarkerSink for Box<S> {
    fn emit(&mut self, marker: EventMarker) -> io::Result<()> {
        (**self).emit(marker)
    }
}

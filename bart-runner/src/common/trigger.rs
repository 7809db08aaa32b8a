use anyhow::{Context, Result};
use bart_engine::{EventMarker, MarkerSink};
use std::io::{self, Write};
use std::net::TcpStream;
use std::time::Duration;

const WRITE_TIMEOUT: Duration = Duration::from_millis(250);

/// Frame understood by the recording PC's trigger listener.
#[must_use]
pub fn trigger_frame(marker: EventMarker) -> String {
    format!("<TRIGGER>{}</TRIGGER>", marker.code())
}

/// Writes event markers as trigger frames to a byte stream.
pub struct TriggerSink<W> {
    writer: W,
}

impl TriggerSink<TcpStream> {
    /// Connect to a trigger listener at `addr` (`host:port`).
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub fn connect(addr: &str) -> Result<Self> {
        let stream =
            TcpStream::connect(addr).with_context(|| format!("connecting to trigger host {addr}"))?;
        stream.set_nodelay(true)?;
        stream.set_write_timeout(Some(WRITE_TIMEOUT))?;
        log::info!("sending event markers to {addr}");
        Ok(Self::new(stream))
    }
}

impl<W: Write> TriggerSink<W> {
    pub const fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> MarkerSink for TriggerSink<W> {
    fn emit(&mut self, marker: EventMarker) -> io::Result<()> {
        self.writer.write_all(trigger_frame(marker).as_bytes())?;
        self.writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::net::TcpListener;

    #[test]
    fn frames_carry_marker_codes() {
        let mut sink = TriggerSink::new(Vec::new());
        sink.emit(EventMarker::Popped).unwrap();
        sink.emit(EventMarker::Banked).unwrap();
        assert_eq!(
            String::from_utf8(sink.into_inner()).unwrap(),
            "<TRIGGER>9</TRIGGER><TRIGGER>7</TRIGGER>"
        );
    }

    #[test]
    fn sends_frames_over_tcp() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let mut sink = TriggerSink::connect(&addr).unwrap();
        let (mut peer, _) = listener.accept().unwrap();

        sink.emit(EventMarker::Banked).unwrap();
        drop(sink);

        let mut received = String::new();
        peer.read_to_string(&mut received).unwrap();
        assert_eq!(received, "<TRIGGER>7</TRIGGER>");
    }

    #[test]
    fn refused_connection_is_an_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);
        assert!(TriggerSink::connect(&addr).is_err());
    }
}

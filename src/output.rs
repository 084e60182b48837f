use std::io::{self, Write};
use std::sync::Mutex;

use crate::app::{ProgressEvent, ProgressSink};

/// Writes each progress message as one line.
pub struct StreamSink<W: Write> {
    writer: Mutex<W>,
}

impl<W: Write> StreamSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        match self.writer.into_inner() {
            Ok(writer) => writer,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl StreamSink<io::Stderr> {
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }
}

impl<W: Write> ProgressSink for StreamSink<W> {
    fn event(&self, event: ProgressEvent) {
        let mut writer = match self.writer.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let _ = writeln!(writer, "{}", event.message);
        let _ = writer.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_one_line_per_event() {
        let sink = StreamSink::new(Vec::new());
        sink.event(ProgressEvent::new("[1] first"));
        sink.event(ProgressEvent::new("Done."));
        let text = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(text, "[1] first\nDone.\n");
    }
}

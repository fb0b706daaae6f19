//! Reading and writing message streams.
//!
//! Messages travel between the command line and a component as NDJSON, one
//! message per line. Output can also be written as a single JSON array.

use crate::error::{ComponentError, Result};
use crate::message::Message;
use serde::Serialize;
use std::io::{BufRead, ErrorKind, Write};

/// NDJSON (Newline Delimited JSON) writer
///
/// Writes values as NDJSON, one JSON object per line.
pub struct NdjsonWriter<W: Write> {
    writer: W,
}

impl<W: Write> NdjsonWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Write a single value as an NDJSON line
    pub fn write<T: Serialize>(&mut self, value: &T) -> Result<()> {
        let json = serde_json::to_string(value)?;
        writeln!(self.writer, "{}", json)?;
        Ok(())
    }

    pub fn write_all<T: Serialize>(&mut self, values: &[T]) -> Result<()> {
        for value in values {
            self.write(value)?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// JSON array writer
pub struct JsonArrayWriter<W: Write> {
    writer: W,
    first: bool,
}

impl<W: Write> JsonArrayWriter<W> {
    /// Create the writer and write the opening bracket
    pub fn new(mut writer: W) -> Result<Self> {
        write!(writer, "[")?;
        Ok(Self { writer, first: true })
    }

    pub fn write<T: Serialize>(&mut self, value: &T) -> Result<()> {
        if !self.first {
            write!(self.writer, ",")?;
        }
        self.first = false;

        let json = serde_json::to_string(value)?;
        write!(self.writer, "{}", json)?;
        Ok(())
    }

    /// Close the bracket and flush
    pub fn finish(mut self) -> Result<()> {
        write!(self.writer, "]")?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Reads messages from NDJSON input, skipping blank lines.
///
/// Each item is either a message or the error for that line; a malformed
/// line is reported with its line number and does not stop the iteration.
pub struct MessageReader<R: BufRead> {
    lines: std::io::Lines<R>,
    line_number: usize,
}

impl<R: BufRead> MessageReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_number: 0,
        }
    }
}

impl<R: BufRead> Iterator for MessageReader<R> {
    type Item = Result<Message>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let read = self.lines.next()?;
            self.line_number += 1;

            let line = match read {
                Ok(line) => line,
                Err(err) if err.kind() == ErrorKind::InvalidData => {
                    return Some(Err(ComponentError::configuration(format!(
                        "Unreadable message on line {}: {}",
                        self.line_number, err
                    ))))
                }
                Err(err) => return Some(Err(err.into())),
            };

            if line.trim().is_empty() {
                continue;
            }

            return Some(serde_json::from_str(&line).map_err(|e| {
                ComponentError::configuration(format!("Invalid message on line {}: {}", self.line_number, e))
            }));
        }
    }
}

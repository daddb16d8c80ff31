//! Byte-driven console tying line input, tokenizer and dispatch together

use core::fmt::Write;

use super::line_buffer::CR;
use super::{execute, tokenize, ConsoleError, LineBuffer, LineEvent, Outcome};
use crate::config::CONFIG;
use crate::hal::Board;
use crate::measure::MeasurementEngine;

/// Version string (set by build.rs, includes git hash)
pub const VERSION: &str = env!("VERSION_STRING");

/// Console state machine
pub struct Console {
    line: LineBuffer,
}

impl Console {
    /// Create new console
    pub const fn new() -> Self {
        Self {
            line: LineBuffer::new(),
        }
    }

    /// Process a single input byte
    ///
    /// Returns Some(result) once a line completed and was dispatched, None if
    /// more input is needed. Errors have already been reported to `out`.
    pub fn process_byte<B: Board>(
        &mut self,
        byte: u8,
        engine: &mut MeasurementEngine<'_, B>,
        out: &mut dyn Write,
    ) -> Option<Result<Outcome, ConsoleError>> {
        let event = self.line.push(byte);
        if CONFIG.echo() {
            echo(out, event, byte);
        }
        if event != LineEvent::Complete {
            return None;
        }
        let result = self.dispatch(engine, out);
        self.line.clear();
        Some(result)
    }

    /// Tokenize and run the buffered line, reporting any error.
    fn dispatch<B: Board>(
        &self,
        engine: &mut MeasurementEngine<'_, B>,
        out: &mut dyn Write,
    ) -> Result<Outcome, ConsoleError> {
        let table = tokenize(self.line.as_bytes());
        let result = execute(&table, engine, out);
        if let Err(err) = result {
            let _ = write!(out, "\r\n{}\r\n", err);
        }
        result
    }

    /// Print welcome banner
    pub fn print_banner(&self, out: &mut dyn Write) {
        let _ = write!(out, "\r\n{}", VERSION);
        let _ = write!(out, "\r\nEnter the character\r\n");
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}

/// Echo one input byte the way the terminal expects it. Non-ASCII bytes
/// show as `?` so every stored byte echoes exactly one byte.
fn echo(out: &mut dyn Write, event: LineEvent, byte: u8) {
    let _ = match event {
        LineEvent::Pending => Ok(()),
        LineEvent::Stored(c) => out.write_char(echo_char(c)),
        LineEvent::Erased => out.write_str("\x08 \x08"),
        // a printable byte that filled the line
        LineEvent::Complete if byte != CR => {
            let _ = out.write_char(echo_char(byte));
            out.write_str("\r\n")
        }
        LineEvent::Complete => out.write_str("\r\n"),
    };
}

fn echo_char(c: u8) -> char {
    if c.is_ascii() {
        c as char
    } else {
        '?'
    }
}

//! Serial command console
//!
//! Blocking, one line at a time: bytes are buffered until CR, the line is
//! tokenized and dispatched, and the measurement runs to completion before
//! the next byte is read. Zero heap allocation.

pub mod commands;
pub mod console;
pub mod error;
pub mod line_buffer;
pub mod parser;

pub use commands::{execute, matches, parse_command, Command, Outcome, COMMANDS};
pub use console::{Console, VERSION};
pub use error::ConsoleError;
pub use line_buffer::{LineBuffer, LineEvent};
pub use parser::{tokenize, CharClass, FieldTable};

//! Command handlers

use core::fmt::Write;

use super::parser::FieldTable;
use super::ConsoleError;
use crate::frontend::ControlLine;
use crate::hal::Board;
use crate::measure::{auto_detect, report, MeasureError, MeasurementEngine};

/// A recognised command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Reset,
    Voltage,
    Io,
    Test,
    Resistance,
    Capacitance,
    Inductance,
    Auto,
}

/// Command descriptor
pub struct CommandDescriptor {
    pub name: &'static str,
    /// Argument fields required after the name.
    pub min_args: usize,
    pub command: Command,
}

/// All commands, in match priority order.
pub static COMMANDS: &[CommandDescriptor] = &[
    CommandDescriptor { name: "reset", min_args: 0, command: Command::Reset },
    CommandDescriptor { name: "voltage", min_args: 0, command: Command::Voltage },
    CommandDescriptor { name: "io", min_args: 2, command: Command::Io },
    CommandDescriptor { name: "test", min_args: 0, command: Command::Test },
    CommandDescriptor { name: "resistance", min_args: 0, command: Command::Resistance },
    CommandDescriptor { name: "capacitance", min_args: 0, command: Command::Capacitance },
    CommandDescriptor { name: "inductance", min_args: 0, command: Command::Inductance },
    CommandDescriptor { name: "auto", min_args: 0, command: Command::Auto },
];

/// What the caller must do after a command ran.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Done,
    /// Restart the controller.
    Restart,
}

/// Field 0 equals `name` ignoring case and at least `min_args` arguments
/// follow.
pub fn matches(table: &FieldTable<'_>, name: &str, min_args: usize) -> bool {
    table.command().eq_ignore_ascii_case(name) && table.arg_count() >= min_args
}

/// First command in priority order that matches the table.
pub fn parse_command(table: &FieldTable<'_>) -> Option<Command> {
    COMMANDS
        .iter()
        .find(|c| matches(table, c.name, c.min_args))
        .map(|c| c.command)
}

/// Dispatch a tokenized line.
pub fn execute<B: Board>(
    table: &FieldTable<'_>,
    engine: &mut MeasurementEngine<'_, B>,
    out: &mut dyn Write,
) -> Result<Outcome, ConsoleError> {
    let command = parse_command(table).ok_or(ConsoleError::UnknownCommand)?;

    match command {
        Command::Reset => return Ok(Outcome::Restart),
        Command::Voltage => report::result(out, &engine.voltage()),
        Command::Io => cmd_io(table, engine),
        Command::Test => engine.capture_probe(),
        Command::Resistance => report::result(out, &engine.resistance()?),
        Command::Capacitance => report::result(out, &engine.capacitance()?),
        Command::Inductance => {
            let prior = engine.latest_capture().ok_or(MeasureError::NoPriorCapture)?;
            engine.inductance(prior, |r| report::result(out, r));
        }
        Command::Auto => {
            auto_detect(engine, out)?;
        }
    }
    Ok(Outcome::Done)
}

// --- Command Implementations ---

/// `io <line> <state>`: unknown line names are ignored.
fn cmd_io<B: Board>(table: &FieldTable<'_>, engine: &mut MeasurementEngine<'_, B>) {
    let line = table.text(1).and_then(ControlLine::from_name);
    let on = table.text(2).is_some_and(|s| s.eq_ignore_ascii_case("ON"));
    if let Some(line) = line {
        engine.set_line(line, on);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::parser::tokenize;

    #[test]
    fn test_io_needs_two_args() {
        assert_eq!(parse_command(&tokenize(b"io MEAS_C ON")), Some(Command::Io));
        assert_eq!(parse_command(&tokenize(b"io MEAS_C")), None);
    }

    #[test]
    fn test_extra_args_accepted() {
        assert_eq!(parse_command(&tokenize(b"auto 1 2")), Some(Command::Auto));
    }
}

//! Command line tokenizer
//!
//! Characters fall in three classes: alpha (letters, `_`), numeric (digits,
//! `.`, `+`, `-`) and none (everything else). The command name is the run of
//! field characters at offset 0. Arguments start wherever the class changes
//! into alpha or numeric, scanning adjacent pairs over the whole 80-slot
//! buffer; offset 0 is never an argument start. At most 3 arguments.

use super::line_buffer::LINE_SIZE;

/// Maximum argument fields after the command name.
pub const MAX_ARGS: usize = 3;

/// Character class.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CharClass {
    Alpha,
    Numeric,
    None,
}

impl CharClass {
    pub fn is_field(self) -> bool {
        self != CharClass::None
    }
}

/// Classify one byte. Underscore is tested as alpha first.
pub fn classify(c: u8) -> CharClass {
    if c.is_ascii_alphabetic() || c == b'_' {
        CharClass::Alpha
    } else if c.is_ascii_digit() || matches!(c, b'.' | b'+' | b'-') {
        CharClass::Numeric
    } else {
        CharClass::None
    }
}

/// Fields of one command line. Borrows the line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldTable<'a> {
    line: &'a [u8],
    starts: [usize; MAX_ARGS],
    classes: [CharClass; MAX_ARGS],
    args: usize,
}

impl<'a> FieldTable<'a> {
    /// Command name, empty if the line starts with a non-field character.
    pub fn command(&self) -> &'a str {
        run_text(self.line, 0)
    }

    /// Field text. 0 is the command name, 1..=3 the arguments.
    pub fn text(&self, n: usize) -> Option<&'a str> {
        self.start(n).map(|start| run_text(self.line, start))
    }

    /// Class of field `n`, from its first character.
    pub fn class(&self, n: usize) -> Option<CharClass> {
        match n {
            0 => self.line.first().map(|&c| classify(c)).filter(|c| c.is_field()),
            _ if n <= self.args => Some(self.classes[n - 1]),
            _ => None,
        }
    }

    /// Byte offset of field `n` in the line.
    pub fn start(&self, n: usize) -> Option<usize> {
        match n {
            0 => Some(0),
            _ if n <= self.args => Some(self.starts[n - 1]),
            _ => None,
        }
    }

    /// Number of argument fields (command name excluded).
    pub fn arg_count(&self) -> usize {
        self.args
    }

    /// True when the line holds no field at all.
    pub fn is_empty(&self) -> bool {
        self.command().is_empty() && self.args == 0
    }

    /// Numeric value of field `n`, parsed from the raw line like C `atof`.
    /// Requesting a missing field yields `None`.
    pub fn get_number(&self, n: usize) -> Option<f32> {
        self.start(n).map(|start| atof(&self.line[start..]))
    }
}

/// Split a line into fields.
pub fn tokenize(line: &[u8]) -> FieldTable<'_> {
    let line = &line[..line.len().min(LINE_SIZE)];
    let class_at = |i: usize| line.get(i).map_or(CharClass::None, |&c| classify(c));

    let mut table = FieldTable {
        line,
        starts: [0; MAX_ARGS],
        classes: [CharClass::None; MAX_ARGS],
        args: 0,
    };

    for i in 0..LINE_SIZE - 1 {
        let (here, next) = (class_at(i), class_at(i + 1));
        if here != next && next.is_field() {
            if table.args == MAX_ARGS {
                break;
            }
            table.starts[table.args] = i + 1;
            table.classes[table.args] = next;
            table.args += 1;
        }
    }
    table
}

fn run_text(line: &[u8], start: usize) -> &str {
    let rest = &line[start.min(line.len())..];
    let end = rest
        .iter()
        .position(|&c| !classify(c).is_field())
        .unwrap_or(rest.len());
    // field characters are ASCII
    core::str::from_utf8(&rest[..end]).unwrap_or("")
}

/// Longest-prefix float parse: leading whitespace, sign, digits, fraction,
/// exponent. 0.0 when nothing parses.
pub fn atof(bytes: &[u8]) -> f32 {
    let skip = bytes
        .iter()
        .position(|&c| !matches!(c, b' ' | b'\t' | b'\n' | b'\r' | 0x0B | 0x0C))
        .unwrap_or(bytes.len());
    let s = &bytes[skip..];

    let digits = |from: usize| s[from..].iter().take_while(|c| c.is_ascii_digit()).count();

    let mut end = 0;
    if matches!(s.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    let int_digits = digits(end);
    end += int_digits;

    let mut frac_digits = 0;
    if s.get(end) == Some(&b'.') {
        frac_digits = digits(end + 1);
        if int_digits + frac_digits > 0 {
            end += 1 + frac_digits;
        }
    }
    if int_digits + frac_digits == 0 {
        return 0.0;
    }

    if matches!(s.get(end), Some(b'e' | b'E')) {
        let mut exp = end + 1;
        if matches!(s.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        let exp_digits = digits(exp);
        if exp_digits > 0 {
            end = exp + exp_digits;
        }
    }

    core::str::from_utf8(&s[..end])
        .ok()
        .and_then(|text| text.parse::<f32>().ok())
        .unwrap_or(0.0)
}

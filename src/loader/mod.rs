//!
//! Reads the files the program compiler produces: the program itself, the breakpoint file and
//! the listing file.
//!
//! A program file has one instruction per line, as four space separated integers:
//! `<opcode ordinal> <a> <b> <c>`. Line `n` (1-indexed) ends up at address `4 * (n - 1)`, so
//! empty lines are only accepted at the end of the file.
//!

use crate::instruction::{DecodeError, Instruction, Opcode};
use crate::simulator::Program;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;

pub mod error;
mod lines;

pub use error::{Context, Contextualize, LoadError};
use lines::Utf8LossyLinesExt;

fn parse_int(field: &str) -> Result<i32, LoadError> {
    field
        .parse()
        .map_err(|_| LoadError::BadInteger(field.to_string()))
}

/// Parses a single program line. Returns `None` for an empty line.
pub fn parse_line(line: &str) -> Result<Option<Instruction>, LoadError> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    match fields[..] {
        [] => Ok(None),
        [op, a, b, c] => {
            let ordinal = parse_int(op)?;
            let op = Opcode::from_ordinal(ordinal).ok_or(DecodeError::UnknownOpcode(ordinal))?;
            Ok(Some(Instruction::new(
                op,
                parse_int(a)?,
                parse_int(b)?,
                parse_int(c)?,
            )))
        }
        _ => Err(LoadError::FieldCount(fields.len())),
    }
}

/// Loads a program from its text. `name` is only used in error messages.
///
/// Loading stops at the first bad line. Registers are validated here, so a program that loads
/// can't fail to decode later.
pub fn load_str(text: &str, name: &str, capacity: usize) -> Result<Program, LoadError> {
    let mut program = Program::new(capacity);
    program.reserve(text.lines().count().min(capacity))?;

    let ctx = |line: usize, text: &str| Context {
        file: name.to_string(),
        line,
        text: text.to_string(),
    };

    let mut blank: Option<(usize, &str)> = None;
    for (number, line) in (1..).zip(text.lines()) {
        let parsed = parse_line(line).map_err(|e| e.with_context(ctx(number, line)))?;
        let Some(instruction) = parsed else {
            blank.get_or_insert((number, line));
            continue;
        };

        if let Some((number, line)) = blank {
            return Err(LoadError::EmptyLine.with_context(ctx(number, line)));
        }

        let stored = program
            .push(instruction)
            .map_err(|e| e.with_context(ctx(number, line)))?;
        if !stored {
            return Err(LoadError::TooLong(capacity).with_context(ctx(number, line)));
        }
    }

    Ok(program)
}

pub fn load_file(path: impl AsRef<Path>, capacity: usize) -> Result<Program, LoadError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    load_str(&text, &path.display().to_string(), capacity)
}

/// Parses whitespace separated, 1-indexed line numbers
pub fn parse_breakpoints(text: &str) -> Result<Vec<usize>, LoadError> {
    text.split_whitespace()
        .map(|s| {
            s.parse::<usize>()
                .ok()
                .filter(|&line| line > 0)
                .ok_or_else(|| LoadError::BadLineNumber(s.to_string()))
        })
        .collect()
}

pub fn load_breakpoints(path: impl AsRef<Path>) -> Result<Vec<usize>, LoadError> {
    parse_breakpoints(&fs::read_to_string(path)?)
}

/// Reads the listing file, the source line `i` of which belongs to program line `i`
pub fn load_listing(path: impl AsRef<Path>) -> Result<Vec<String>, LoadError> {
    let reader = BufReader::new(File::open(path)?);
    let lines = reader
        .utf8_lossy_lines()
        .collect::<Result<Vec<String>, _>>()?;
    Ok(lines)
}

use crate::instruction::DecodeError;
use crate::simulator::AllocationError;
use owo_colors::OwoColorize;
use std::{fmt, io};
use thiserror::Error;

/// Where in a program file an error was found
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Context {
    pub file: String,
    /// 1-indexed
    pub line: usize,
    pub text: String,
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "   {} {} at line {}",
            "-->".bright_blue().bold(),
            self.file.bright_yellow(),
            self.line.bright_yellow(),
        )?;
        writeln!(f, "{:^6}{} {}", self.line.bright_blue(), "|".bright_blue(), self.text)
    }
}

/// Anything that can go wrong reading a program, breakpoint or listing file
#[derive(Debug, Error)]
pub enum LoadError {
    /// Not the loader's fault, some std::io went wrong
    #[error("I/O Error: {0}")]
    IO(#[from] io::Error),

    #[error("Expected {} fields, but found {0}", "<opcode> <a> <b> <c>".bright_blue())]
    FieldCount(usize),

    #[error("Expected an integer, but found '{}'", .0.bright_yellow())]
    BadInteger(String),

    #[error("Expected a line number, but found '{}'", .0.bright_yellow())]
    BadLineNumber(String),

    #[error("Empty line in the middle of the program")]
    EmptyLine,

    #[error("The program doesn't fit in {0} instructions")]
    TooLong(usize),

    #[error("{0}")]
    Decode(#[from] DecodeError),

    #[error("{0}")]
    Allocation(#[from] AllocationError),

    #[error("{}\n{}", err.bold(), ctx)]
    WithContext { err: Box<LoadError>, ctx: Context },
}

pub trait Contextualize {
    fn with_context(self, ctx: Context) -> LoadError;
}

impl Contextualize for LoadError {
    fn with_context(self, ctx: Context) -> LoadError {
        match self {
            LoadError::WithContext { err, .. } => LoadError::WithContext { err, ctx },
            _ => LoadError::WithContext {
                err: Box::new(self),
                ctx,
            },
        }
    }
}

impl Contextualize for DecodeError {
    fn with_context(self, ctx: Context) -> LoadError {
        LoadError::from(self).with_context(ctx)
    }
}

impl LoadError {
    /// The error without any context attached
    pub fn root(&self) -> &LoadError {
        match self {
            LoadError::WithContext { err, .. } => err.root(),
            _ => self,
        }
    }

    /// Line the error was found at, if known
    pub fn line(&self) -> Option<usize> {
        match self {
            LoadError::WithContext { ctx, .. } => Some(ctx.line),
            _ => None,
        }
    }
}

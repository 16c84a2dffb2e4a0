use crate::instruction::Opcode;
use owo_colors::OwoColorize;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Access::Read => f.write_str("read"),
            Access::Write => f.write_str("write"),
        }
    }
}

/// A bus access that couldn't be performed. The access yields (or stores) nothing, and
/// execution continues.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("No valid memory address for {access} access: {addr:#x} (memory is {size:#x} bytes)")]
    OutOfRange {
        access: Access,
        addr: i32,
        size: usize,
    },

    #[error("Writing to GPIO_IN ({0:#x}) is not possible")]
    ReadOnly(i32),

    #[error("Reading from GPIO_OUT ({0:#x}) is not possible")]
    WriteOnly(i32),
}

/// Anything that went wrong while executing a single instruction
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExecError {
    #[error("{0}")]
    Address(#[from] AddressError),

    #[error("The '{}' instruction is currently not supported", .0.bright_yellow())]
    Unsupported(Opcode),

    #[error("Tried to access instruction at pc {pc:#x}, but code is only {:#x} bytes long", .len * 4)]
    EndOfProgram { pc: u32, len: usize },
}

impl ExecError {
    /// Whether the machine can keep going after this error
    pub fn is_fatal(&self) -> bool {
        matches!(self, ExecError::EndOfProgram { .. })
    }
}

/// Raised only while the machine is being built
#[derive(Debug, Error)]
#[error("Cannot allocate {what} ({bytes} bytes)")]
pub struct AllocationError {
    pub what: &'static str,
    pub bytes: usize,
}

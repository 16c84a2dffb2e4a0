use super::error::AllocationError;
use crate::instruction::{Canonical, DecodeError, Instruction};
use std::sync::atomic::{AtomicU32, Ordering};

/// A loaded program: the lines as the compiler wrote them, their canonical forms, and the
/// program counter.
///
/// The code never changes once the machine starts, so it can be shared freely. The program
/// counter is only written by the execution thread.
#[derive(Debug)]
pub struct Program {
    lines: Vec<Instruction>,
    code: Vec<Canonical>,
    capacity: usize,
    pc: AtomicU32,
}

impl Program {
    /// An empty program that may hold at most `capacity` instructions
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: Vec::new(),
            code: Vec::new(),
            capacity,
            pc: AtomicU32::new(0),
        }
    }

    /// Makes room for `additional` more instructions
    pub fn reserve(&mut self, additional: usize) -> Result<(), AllocationError> {
        let error = || AllocationError {
            what: "program",
            bytes: additional
                * (std::mem::size_of::<Instruction>() + std::mem::size_of::<Canonical>()),
        };
        self.lines.try_reserve(additional).map_err(|_| error())?;
        self.code.try_reserve(additional).map_err(|_| error())
    }

    /// Appends an instruction. Returns `Ok(false)` if the program is already full.
    pub fn push(&mut self, i: Instruction) -> Result<bool, DecodeError> {
        if self.is_full() {
            return Ok(false);
        }
        self.code.push(i.canonical()?);
        self.lines.push(i);
        Ok(true)
    }

    pub fn is_full(&self) -> bool {
        self.lines.len() >= self.capacity
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// The instruction the program counter points to
    pub fn fetch(&self, pc: u32) -> Option<Canonical> {
        self.code.get((pc >> 2) as usize).copied()
    }

    pub fn line(&self, index: usize) -> Option<&Instruction> {
        self.lines.get(index)
    }

    pub fn pc(&self) -> u32 {
        self.pc.load(Ordering::Relaxed)
    }

    pub fn set_pc(&self, pc: u32) {
        self.pc.store(pc, Ordering::Relaxed);
    }

    /// 1-indexed line the program counter is on
    pub fn current_line(&self) -> usize {
        (self.pc() >> 2) as usize + 1
    }

    /// Indices of at most `size` lines around the 0-indexed `center`, clamped to the program
    pub fn window(&self, center: usize, size: usize) -> std::ops::Range<usize> {
        let start = center
            .saturating_sub(size / 2)
            .min(self.len().saturating_sub(size));
        start..(start + size).min(self.len())
    }

    /// Builds an unbounded program out of already parsed instructions
    pub fn from_instructions(
        instructions: impl IntoIterator<Item = Instruction>,
    ) -> Result<Program, DecodeError> {
        let mut program = Program::new(usize::MAX);
        for i in instructions {
            program.push(i)?;
        }
        Ok(program)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::Opcode;

    fn nops(n: usize) -> Program {
        Program::from_instructions(std::iter::repeat(Instruction::EMPTY).take(n)).unwrap()
    }

    #[test]
    fn test_capacity() {
        let mut p = Program::new(2);
        assert_eq!(p.push(Instruction::EMPTY), Ok(true));
        assert_eq!(p.push(Instruction::EMPTY), Ok(true));
        assert_eq!(p.push(Instruction::EMPTY), Ok(false));
        assert_eq!(p.len(), 2);
    }

    #[test]
    fn test_bad_instruction_is_not_stored() {
        let mut p = Program::new(10);
        assert!(p.push(Instruction::new(Opcode::Add, 40, 0, 0)).is_err());
        assert!(p.is_empty());
    }

    #[test]
    fn test_fetch() {
        let p = nops(3);
        assert_eq!(p.fetch(0), Some(Canonical::Nop));
        assert_eq!(p.fetch(8), Some(Canonical::Nop));
        assert_eq!(p.fetch(12), None);

        p.set_pc(8);
        assert_eq!(p.current_line(), 3);
    }

    #[test]
    fn test_window() {
        let p = nops(100);
        assert_eq!(p.window(0, 10), 0..10);
        assert_eq!(p.window(50, 10), 45..55);
        assert_eq!(p.window(99, 10), 90..100);
        assert_eq!(nops(4).window(2, 10), 0..4);
    }
}

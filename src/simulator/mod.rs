//!
//! Runs a loaded program instruction by instruction.
//!
//! The [`Machine`] belongs to the execution thread. Other threads get a [`MachineView`], which
//! reads registers and the program counter without locking and takes the memory lock only to
//! copy the bus state.
//!

use crate::debugger::snapshot::{Panel, ProgramLine};
use crate::debugger::{Debugger, Gate, Snapshot};
use log::{error, info, warn};
use owo_colors::OwoColorize;
use std::fmt;
use std::sync::Arc;

pub mod display;
pub mod error;
pub mod executor;
pub mod into_register;
pub mod memory;
pub mod program;
pub mod registers;

pub use error::{AddressError, AllocationError, ExecError};
pub use executor::execute;
pub use memory::{Memory, SharedMemory};
pub use program::Program;
pub use registers::Registers;

/// Why [`Machine::run`] returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The instruction budget ran out
    LifetimeExhausted,
    /// The program counter left the program
    EndOfProgram { pc: u32 },
    Quit,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::LifetimeExhausted => f.write_str("instruction budget exhausted"),
            StopReason::EndOfProgram { pc } => write!(f, "end of program at pc {pc:#x}"),
            StopReason::Quit => f.write_str("quit requested"),
        }
    }
}

pub struct Machine {
    registers: Arc<Registers>,
    program: Arc<Program>,
    memory: SharedMemory,
}

impl Machine {
    pub fn new(program: Program, memory: Memory) -> Self {
        Self {
            registers: Arc::new(Registers::new()),
            program: Arc::new(program),
            memory: memory.shared(),
        }
    }

    /// Builds a machine with `memory_size` bytes of zeroed memory
    pub fn with_memory_size(program: Program, memory_size: usize) -> Result<Self, AllocationError> {
        Ok(Self::new(program, Memory::new(memory_size)?))
    }

    pub fn registers(&self) -> &Registers {
        &self.registers
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn memory(&self) -> &SharedMemory {
        &self.memory
    }

    /// A handle other threads can use to look at the machine while it runs
    pub fn view(&self) -> MachineView {
        MachineView {
            registers: self.registers.clone(),
            program: self.program.clone(),
            memory: self.memory.clone(),
        }
    }

    /// Executes exactly one instruction, ignoring the debugger
    pub fn step(&mut self) -> Result<(), ExecError> {
        let mut pc = self.program.pc();
        let op = self.program.fetch(pc).ok_or(ExecError::EndOfProgram {
            pc,
            len: self.program.len(),
        })?;

        let result = execute(op, &self.registers, &self.memory, &mut pc);
        self.program.set_pc(pc);
        result
    }

    /// Runs the program until the debugger quits, the program counter leaves the program, or
    /// `lifetime` instructions have been executed.
    ///
    /// Errors that don't stop the machine are logged and execution carries on.
    pub fn run(&mut self, debugger: &Debugger, lifetime: Option<u64>) -> StopReason {
        info!(
            "Running {} instructions{}",
            self.program.len(),
            lifetime
                .map(|l| format!(" (lifetime {l})"))
                .unwrap_or_default()
        );

        let mut executed: u64 = 0;
        let reason = loop {
            if lifetime.is_some_and(|l| executed >= l) {
                break StopReason::LifetimeExhausted;
            }

            if debugger.gate(self.program.current_line()) == Gate::Quit {
                break StopReason::Quit;
            }

            match self.step() {
                Ok(()) => {}
                Err(e) if e.is_fatal() => {
                    error!("{e}");
                    break StopReason::EndOfProgram {
                        pc: self.program.pc(),
                    };
                }
                Err(e @ ExecError::Address(_)) => warn!("{e}"),
                Err(e) => error!("{e}"),
            }

            executed += 1;
        };

        info!("Stopped after {executed} instructions: {reason}");
        reason
    }

    pub fn print_state(&self) {
        eprintln!("{}", "Registers:".bright_blue());
        let registers = self.registers.snapshot();
        for (i, value) in registers.iter().enumerate() {
            eprint!("{}{:02}: {:08x} ", "x".bright_blue(), i.bright_blue(), value);
            if i % 4 == 3 {
                eprintln!();
            }
        }
        eprintln!("{} {:08x}", "pc:".bright_blue(), self.program.pc());

        let latches = self.memory.lock().latches;
        eprintln!(
            "{} in {:02x} out {:02x} {} {:08x}",
            "GPIO:".bright_blue(),
            latches.gpio_in,
            latches.gpio_out,
            "display:".bright_blue(),
            latches.display
        );
    }
}

/// Read access to a running [`Machine`]
#[derive(Clone)]
pub struct MachineView {
    registers: Arc<Registers>,
    program: Arc<Program>,
    memory: SharedMemory,
}

impl MachineView {
    pub fn registers(&self) -> &Registers {
        &self.registers
    }

    /// Copies out everything the debugger shows. `window` is the number of program lines around
    /// the current one, and `listing` holds the source text of each line.
    pub fn snapshot(&self, debugger: &Debugger, window: usize, listing: &[String]) -> Snapshot {
        let pc = self.program.pc();
        let line = (pc >> 2) as usize + 1;

        let lines = self
            .program
            .window(line - 1, window)
            .filter_map(|i| {
                let instruction = *self.program.line(i)?;
                Some(ProgramLine {
                    number: i + 1,
                    instruction,
                    source: listing.get(i).cloned(),
                    breakpoint: debugger.is_breakpoint(i + 1),
                })
            })
            .collect();

        let memory_base = debugger.memory_base();
        let (latches, memory, panel) = {
            let bus = self.memory.lock();
            let memory = std::array::from_fn(|i| bus.peek(memory_base as i64 + i as i64));
            let panel = Panel {
                power: bus.display.power(),
                page: bus.display.page(),
                column: bus.display.column(),
                pixels: *bus.display.pixels(),
            };
            (bus.latches, memory, panel)
        };

        Snapshot {
            mode: debugger.mode(),
            pc,
            line,
            halted: debugger.halted_at(),
            lines,
            registers: self.registers.snapshot(),
            latches,
            memory_base,
            memory,
            panel,
        }
    }
}

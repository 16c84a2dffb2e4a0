use super::Mode;
use crate::instruction::Instruction;
use crate::simulator::display::{Pixels, COLS, ROWS};
use crate::simulator::memory::{Latches, MEMORY_WINDOW};
use owo_colors::OwoColorize;
use std::fmt;

/// A program line as shown in the debugger's program window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramLine {
    /// 1-indexed
    pub number: usize,
    pub instruction: Instruction,
    /// The matching line of the listing file, if there is one
    pub source: Option<String>,
    pub breakpoint: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Panel {
    pub power: bool,
    pub page: usize,
    pub column: usize,
    pub pixels: Pixels,
}

impl Panel {
    fn lit(&self, row: usize, col: usize) -> bool {
        self.power && (self.pixels[col] >> row) & 1 == 1
    }
}

/// Everything the debugger shows, copied out of the machine in one go
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub mode: Mode,
    pub pc: u32,
    pub line: usize,
    pub halted: Option<usize>,
    pub lines: Vec<ProgramLine>,
    pub registers: [i32; 32],
    pub latches: Latches,
    pub memory_base: i32,
    /// `None` past the end of memory
    pub memory: [Option<u8>; MEMORY_WINDOW],
    pub panel: Panel,
}

const BYTES_PER_ROW: usize = 16;

impl Snapshot {
    fn fmt_program(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", "Program:".bright_blue())?;
        for l in &self.lines {
            let marker = if l.number == self.line { "=>" } else { "  " };
            let bp = if l.breakpoint { "*" } else { " " };
            let text = format!("{:>6} {} {:<24}", l.number, marker, l.instruction.to_string());
            if l.number == self.line {
                write!(f, "{}{}", bp.bright_red(), text.bright_green())?;
            } else {
                write!(f, "{}{}", bp.bright_red(), text)?;
            }
            match &l.source {
                Some(source) => writeln!(f, " {}", source.dimmed())?,
                None => writeln!(f)?,
            }
        }
        Ok(())
    }

    fn fmt_registers(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", "Registers:".bright_blue())?;
        for (i, value) in self.registers.iter().enumerate() {
            write!(f, "{}{:02}: {:08x} ", "x".bright_blue(), i.bright_blue(), value)?;
            if i % 4 == 3 {
                writeln!(f)?;
            }
        }
        writeln!(
            f,
            "{} {:#x}  {} {:#04x}  {} {:#04x}  {} {:#010x}  {} {:#x}",
            "pc".bright_blue(),
            self.pc,
            "gpio_in".bright_blue(),
            self.latches.gpio_in,
            "gpio_out".bright_blue(),
            self.latches.gpio_out,
            "display".bright_blue(),
            self.latches.display,
            "i2c".bright_blue(),
            self.latches.i2c_rest,
        )
    }

    fn fmt_memory(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", "Memory:".bright_blue())?;
        for (row, bytes) in self.memory.chunks(BYTES_PER_ROW).enumerate() {
            let addr = self.memory_base as i64 + (row * BYTES_PER_ROW) as i64;
            write!(f, "{}", format!("{addr:08x}:").bright_blue())?;
            for b in bytes {
                match b {
                    Some(b) => write!(f, " {b:02x}")?,
                    None => write!(f, " --")?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }

    fn fmt_panel(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = &self.panel;
        writeln!(
            f,
            "{} {} page {} column {}",
            "Display:".bright_blue(),
            if p.power { "on" } else { "off" },
            p.page,
            p.column
        )?;

        let border = "-".repeat(COLS + 2);
        writeln!(f, "{border}")?;
        for row in (0..ROWS).step_by(2) {
            let line: String = (0..COLS)
                .map(|col| match (p.lit(row, col), p.lit(row + 1, col)) {
                    (true, true) => '█',
                    (true, false) => '▀',
                    (false, true) => '▄',
                    (false, false) => ' ',
                })
                .collect();
            writeln!(f, "|{line}|")?;
        }
        writeln!(f, "{border}")
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = match self.mode {
            Mode::Paused => "paused",
            Mode::Running => "running",
            Mode::Completing => "running to completion",
        };
        write!(f, "{} {mode}, line {}", "Mode:".bright_blue(), self.line)?;
        if let Some(line) = self.halted {
            write!(f, " {}", format!("(breakpoint at line {line})").bright_red())?;
        }
        writeln!(f)?;

        self.fmt_program(f)?;
        self.fmt_registers(f)?;
        self.fmt_memory(f)?;
        self.fmt_panel(f)
    }
}

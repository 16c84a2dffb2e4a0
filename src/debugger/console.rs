//!
//! Line-based front end for the debugger: commands come in on stdin, snapshots go out on stdout.
//!
//! | command       | effect                                   |
//! |---------------|------------------------------------------|
//! | *(empty)*, `s` | execute one instruction                  |
//! | `b`           | toggle between stepping and running to the next breakpoint |
//! | `r`           | run to completion, ignoring breakpoints  |
//! | `p`           | pause                                    |
//! | `m +N`, `m -N`| pan the memory view by N bytes           |
//! | `m N`         | move the memory view to address N (decimal or `0x` hex) |
//! | `t N`         | toggle the breakpoint on line N          |
//! | `q`           | quit                                     |
//!

use super::{Control, Debugger, Snapshot};
use crate::simulator::MachineView;
use log::{info, warn};
use owo_colors::OwoColorize;
use std::io::{self, BufRead, Write};
use std::thread;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("Unknown command '{}'", .0.bright_yellow())]
    Unknown(String),

    #[error("'{0}' expects an argument")]
    MissingArgument(char),

    #[error("Expected a number, found '{}'", .0.bright_yellow())]
    BadNumber(String),
}

fn parse_number(s: &str) -> Result<i32, CommandError> {
    let bad = || CommandError::BadNumber(s.to_string());
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };

    let value = match digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        Some(hex) => i64::from_str_radix(hex, 16),
        None => digits.parse::<i64>(),
    }
    .map_err(|_| bad())?;

    let value = if negative { -value } else { value };
    i32::try_from(value).map_err(|_| bad())
}

pub fn parse_command(line: &str) -> Result<Control, CommandError> {
    let line = line.trim();
    let mut parts = line.splitn(2, char::is_whitespace);
    let command = parts.next().unwrap_or_default();
    let argument = parts.next().map(str::trim).filter(|s| !s.is_empty());

    let needs = |c: char| argument.ok_or(CommandError::MissingArgument(c));

    Ok(match command {
        "" | "s" => Control::Step,
        "b" => Control::ToggleBreakpointMode,
        "r" => Control::RunToCompletion,
        "p" => Control::Pause,
        "q" => Control::Quit,
        "m" => {
            let arg = needs('m')?;
            let value = parse_number(arg)?;
            if arg.starts_with(['+', '-']) {
                Control::PanMemory(value)
            } else {
                Control::SetMemoryBase(value)
            }
        }
        "t" => {
            let arg = needs('t')?;
            let line = arg
                .parse::<usize>()
                .ok()
                .filter(|&l| l > 0)
                .ok_or_else(|| CommandError::BadNumber(arg.to_string()))?;
            Control::ToggleBreakpoint(line)
        }
        _ => return Err(CommandError::Unknown(line.to_string())),
    })
}

/// Feeds commands from `input` to the debugger until a quit command. Running out of input
/// also quits, since nothing could resume a paused machine after that.
pub fn input_loop(input: impl BufRead, debugger: &Debugger) {
    for line in input.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("Failed to read a debugger command: {e}");
                break;
            }
        };

        match parse_command(&line) {
            Ok(control) => {
                debugger.apply(control);
                if control == Control::Quit {
                    return;
                }
            }
            Err(e) => eprintln!("{e}"),
        }
    }
    info!("Debugger input closed, quitting");
    debugger.apply(Control::Quit);
}

/// What the render loop needs besides the machine
pub struct RenderOptions {
    pub refresh: Duration,
    /// Program lines shown around the current one
    pub window: usize,
    /// Source text shown next to each program line
    pub listing: Vec<String>,
}

/// Prints a snapshot of the machine whenever it changes, until the debugger quits
pub fn render_loop(view: &MachineView, debugger: &Debugger, options: &RenderOptions) {
    let mut last: Option<Snapshot> = None;
    while !debugger.quit_requested() {
        let snapshot = view.snapshot(debugger, options.window, &options.listing);
        if last.as_ref() != Some(&snapshot) {
            let mut out = io::stdout().lock();
            // clear the screen and go home
            let _ = write!(out, "\x1b[2J\x1b[H{snapshot}");
            let _ = out.flush();
            last = Some(snapshot);
        }
        thread::sleep(options.refresh);
    }
}

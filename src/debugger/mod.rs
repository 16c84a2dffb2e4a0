//!
//! Run/step/breakpoint control shared by the execution thread and the debugger front end.
//!
//! The execution thread calls [`Debugger::gate`] before every fetch. Everything else only
//! flips flags through [`Debugger::apply`], so the front end never touches machine state.
//!

use hashbrown::HashSet;
use log::info;
use parking_lot::{Condvar, Mutex, RwLock};
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU8, AtomicUsize, Ordering};
use std::time::Duration;

pub mod console;
pub mod snapshot;

pub use snapshot::Snapshot;

/// How long a paused execution thread sleeps before polling the flags again, in case it missed
/// a wakeup
const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Mode {
    /// Waiting for a step
    Paused,
    /// Free run until the next breakpoint
    Running,
    /// Free run, breakpoints ignored
    Completing,
}

impl Mode {
    fn from_u8(x: u8) -> Mode {
        match x {
            0 => Mode::Paused,
            1 => Mode::Running,
            _ => Mode::Completing,
        }
    }
}

/// Events the front end sends to the debugger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Step,
    /// Switches between stepping and running to the next breakpoint
    ToggleBreakpointMode,
    RunToCompletion,
    Pause,
    PanMemory(i32),
    SetMemoryBase(i32),
    ToggleBreakpoint(usize),
    Quit,
}

/// What the execution thread should do with the instruction it's about to fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Proceed,
    Quit,
}

pub struct Debugger {
    mode: AtomicU8,
    /// Steps requested while paused and not yet taken
    steps: AtomicUsize,
    quit: AtomicBool,
    /// Line the machine is being held at by a breakpoint, 0 if none
    halted: AtomicUsize,
    memory_base: AtomicI32,
    breakpoints: RwLock<HashSet<usize>>,

    wake_lock: Mutex<()>,
    wake: Condvar,
}

impl Debugger {
    pub fn new(mode: Mode, breakpoints: impl IntoIterator<Item = usize>) -> Self {
        Self {
            mode: AtomicU8::new(mode as u8),
            steps: AtomicUsize::new(0),
            quit: AtomicBool::new(false),
            halted: AtomicUsize::new(0),
            memory_base: AtomicI32::new(0),
            breakpoints: RwLock::new(breakpoints.into_iter().collect()),
            wake_lock: Mutex::new(()),
            wake: Condvar::new(),
        }
    }

    /// A debugger that never stops the machine
    pub fn headless() -> Self {
        Self::new(Mode::Completing, [])
    }

    pub fn mode(&self) -> Mode {
        Mode::from_u8(self.mode.load(Ordering::SeqCst))
    }

    fn set_mode(&self, mode: Mode) {
        self.mode.store(mode as u8, Ordering::SeqCst);
    }

    /// Stops the machine before its next instruction. Steps sent before this point are dropped.
    fn pause(&self) {
        self.steps.store(0, Ordering::SeqCst);
        self.set_mode(Mode::Paused);
    }

    /// Takes one pending step, if there is one
    fn take_step(&self) -> bool {
        self.steps
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    /// Line a breakpoint is currently holding the machine at
    pub fn halted_at(&self) -> Option<usize> {
        match self.halted.load(Ordering::SeqCst) {
            0 => None,
            line => Some(line),
        }
    }

    pub fn quit_requested(&self) -> bool {
        self.quit.load(Ordering::SeqCst)
    }

    pub fn memory_base(&self) -> i32 {
        self.memory_base.load(Ordering::SeqCst)
    }

    pub fn is_breakpoint(&self, line: usize) -> bool {
        self.breakpoints.read().contains(&line)
    }

    pub fn breakpoints(&self) -> Vec<usize> {
        let mut lines: Vec<_> = self.breakpoints.read().iter().copied().collect();
        lines.sort_unstable();
        lines
    }

    pub fn apply(&self, control: Control) {
        match control {
            // Only a paused machine takes steps
            Control::Step => {
                if self.mode() == Mode::Paused {
                    self.steps.fetch_add(1, Ordering::SeqCst);
                }
            }
            Control::ToggleBreakpointMode => match self.mode() {
                Mode::Paused => self.set_mode(Mode::Running),
                Mode::Running | Mode::Completing => self.pause(),
            },
            Control::RunToCompletion => self.set_mode(Mode::Completing),
            Control::Pause => self.pause(),
            Control::PanMemory(delta) => {
                let base = self.memory_base().saturating_add(delta).max(0);
                self.memory_base.store(base, Ordering::SeqCst);
            }
            Control::SetMemoryBase(base) => self.memory_base.store(base.max(0), Ordering::SeqCst),
            Control::ToggleBreakpoint(line) => {
                let mut breakpoints = self.breakpoints.write();
                if !breakpoints.remove(&line) {
                    breakpoints.insert(line);
                }
            }
            Control::Quit => self.quit.store(true, Ordering::SeqCst),
        }

        let _guard = self.wake_lock.lock();
        self.wake.notify_all();
    }

    /// Blocks until someone asks to quit
    pub fn wait_for_quit(&self) {
        let mut guard = self.wake_lock.lock();
        while !self.quit_requested() {
            self.wake.wait_for(&mut guard, POLL_INTERVAL);
        }
    }

    /// Decides whether the instruction at the 1-indexed `line` may run, blocking while the
    /// machine is paused.
    ///
    /// A breakpoint stops a running machine right before its line. The next step (or switching
    /// back to running) releases it, and it will trigger again the next time that line comes up.
    pub fn gate(&self, line: usize) -> Gate {
        loop {
            if self.quit_requested() {
                return Gate::Quit;
            }

            match self.mode() {
                Mode::Completing => break,
                Mode::Running => {
                    if self.halted_at() != Some(line) && self.is_breakpoint(line) {
                        info!("Breakpoint hit at line {line}");
                        self.pause();
                        self.halted.store(line, Ordering::SeqCst);
                        continue;
                    }
                    break;
                }
                Mode::Paused => {
                    if self.take_step() {
                        break;
                    }
                    let mut guard = self.wake_lock.lock();
                    self.wake.wait_for(&mut guard, POLL_INTERVAL);
                }
            }
        }

        self.halted.store(0, Ordering::SeqCst);
        Gate::Proceed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_mode_transitions() {
        let d = Debugger::new(Mode::Paused, []);
        d.apply(Control::ToggleBreakpointMode);
        assert_eq!(d.mode(), Mode::Running);
        d.apply(Control::ToggleBreakpointMode);
        assert_eq!(d.mode(), Mode::Paused);
        d.apply(Control::RunToCompletion);
        assert_eq!(d.mode(), Mode::Completing);
        d.apply(Control::ToggleBreakpointMode);
        assert_eq!(d.mode(), Mode::Paused);
        d.apply(Control::RunToCompletion);
        d.apply(Control::Pause);
        assert_eq!(d.mode(), Mode::Paused);
    }

    #[test]
    fn test_memory_pan() {
        let d = Debugger::headless();
        d.apply(Control::PanMemory(64));
        d.apply(Control::PanMemory(64));
        assert_eq!(d.memory_base(), 128);
        d.apply(Control::PanMemory(-1000));
        assert_eq!(d.memory_base(), 0);
        d.apply(Control::SetMemoryBase(0x100000));
        assert_eq!(d.memory_base(), 0x100000);
    }

    #[test]
    fn test_toggle_breakpoint() {
        let d = Debugger::new(Mode::Running, [3, 1]);
        assert_eq!(d.breakpoints(), vec![1, 3]);
        d.apply(Control::ToggleBreakpoint(3));
        d.apply(Control::ToggleBreakpoint(7));
        assert_eq!(d.breakpoints(), vec![1, 7]);
    }

    #[test]
    fn test_completing_ignores_breakpoints() {
        let d = Debugger::new(Mode::Completing, [1, 2]);
        assert_eq!(d.gate(1), Gate::Proceed);
        assert_eq!(d.gate(2), Gate::Proceed);
        assert_eq!(d.halted_at(), None);
    }

    #[test]
    fn test_running_passes_other_lines() {
        let d = Debugger::new(Mode::Running, [5]);
        for line in 1..5 {
            assert_eq!(d.gate(line), Gate::Proceed);
        }
    }

    #[test]
    fn test_paused_consumes_one_step() {
        let d = Debugger::new(Mode::Paused, []);
        d.apply(Control::Step);
        assert_eq!(d.gate(1), Gate::Proceed);

        d.apply(Control::Quit);
        assert_eq!(d.gate(2), Gate::Quit);
    }

    #[test]
    fn test_each_step_runs_one_instruction() {
        let d = Arc::new(Debugger::new(Mode::Paused, []));
        d.apply(Control::Step);
        d.apply(Control::Step);
        assert_eq!(d.gate(1), Gate::Proceed);
        assert_eq!(d.gate(2), Gate::Proceed);

        let gate = {
            let d = d.clone();
            thread::spawn(move || d.gate(3))
        };
        thread::sleep(Duration::from_millis(200));
        assert!(!gate.is_finished());
        d.apply(Control::Quit);
        assert_eq!(gate.join().unwrap(), Gate::Quit);
    }

    #[test]
    fn test_step_while_running_does_not_pass_breakpoint() {
        let d = Arc::new(Debugger::new(Mode::Running, [2]));
        d.apply(Control::Step);
        assert_eq!(d.gate(1), Gate::Proceed);

        let gate = {
            let d = d.clone();
            thread::spawn(move || d.gate(2))
        };
        thread::sleep(Duration::from_millis(200));
        assert_eq!(d.halted_at(), Some(2));
        assert!(!gate.is_finished());

        d.apply(Control::Step);
        assert_eq!(gate.join().unwrap(), Gate::Proceed);
    }

    #[test]
    fn test_pause_drops_pending_steps() {
        let d = Arc::new(Debugger::new(Mode::Paused, []));
        d.apply(Control::Step);
        d.apply(Control::ToggleBreakpointMode);
        d.apply(Control::ToggleBreakpointMode);
        d.apply(Control::Step);
        d.apply(Control::Pause);
        assert_eq!(d.mode(), Mode::Paused);

        let gate = {
            let d = d.clone();
            thread::spawn(move || d.gate(1))
        };
        thread::sleep(Duration::from_millis(200));
        assert!(!gate.is_finished());
        d.apply(Control::Quit);
        assert_eq!(gate.join().unwrap(), Gate::Quit);
    }

    #[test]
    fn test_breakpoint_holds_until_released() {
        let d = Arc::new(Debugger::new(Mode::Running, [2]));
        assert_eq!(d.gate(1), Gate::Proceed);

        let gate = {
            let d = d.clone();
            thread::spawn(move || d.gate(2))
        };

        while d.halted_at() != Some(2) {
            thread::yield_now();
        }
        assert_eq!(d.mode(), Mode::Paused);
        assert!(!gate.is_finished());

        // Resuming runs line 2 without stopping on it again
        d.apply(Control::ToggleBreakpointMode);
        assert_eq!(gate.join().unwrap(), Gate::Proceed);
        assert_eq!(d.halted_at(), None);
        assert_eq!(d.gate(3), Gate::Proceed);
    }
}

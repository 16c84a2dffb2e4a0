use super::into_register::{FromRegister, IntoRegister};
use crate::instruction::Reg;
use std::sync::atomic::{AtomicI32, Ordering};

/// The 32 general purpose registers. `x0` always reads as zero.
///
/// Only the execution thread writes here. Registers are atomics so the debugger can copy them
/// while the program runs, without going through the memory lock.
pub struct Registers([AtomicI32; 32]);

impl Default for Registers {
    fn default() -> Self {
        Self(std::array::from_fn(|_| AtomicI32::new(0)))
    }
}

impl Registers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<T: FromRegister>(&self, r: Reg) -> T {
        FromRegister::from(self.0[r.index()].load(Ordering::Relaxed))
    }

    pub fn set<T: IntoRegister>(&self, r: Reg, x: T) {
        if r != Reg::ZERO {
            self.0[r.index()].store(x.into(), Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> [i32; 32] {
        std::array::from_fn(|i| self.0[i].load(Ordering::Relaxed))
    }
}

use super::display::Display;
use super::error::{Access, AddressError, AllocationError};
use byteorder::{ByteOrder, NativeEndian};
use log::trace;
use parking_lot::Mutex;
use std::sync::Arc;

pub mod consts;
pub use consts::*;

/// The memory is shared between the execution thread, the GPIO ingress and the debugger.
/// Whoever touches it takes the lock for a single operation.
pub type SharedMemory = Arc<Mutex<Memory>>;

/// Peripheral registers exposed through the bus
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Latches {
    pub gpio_in: u8,
    pub gpio_out: u8,
    /// Last command word routed to the display
    pub display: i32,
    pub i2c_rest: i32,
}

pub struct Memory {
    data: Vec<u8>,
    pub latches: Latches,
    pub display: Display,
}

impl Memory {
    /// Allocates `size` bytes of zeroed memory
    pub fn new(size: usize) -> Result<Self, AllocationError> {
        let mut data = Vec::new();
        data.try_reserve_exact(size).map_err(|_| AllocationError {
            what: "memory",
            bytes: size,
        })?;
        data.resize(size, 0);

        Ok(Self {
            data,
            latches: Latches::default(),
            display: Display::new(),
        })
    }

    pub fn shared(self) -> SharedMemory {
        Arc::new(Mutex::new(self))
    }

    /// Checks that `addr` is in memory and returns it as an index. Backing store words also
    /// need their last byte to be in memory.
    fn check(&self, addr: i32, width: usize, access: Access) -> Result<usize, AddressError> {
        usize::try_from(addr)
            .ok()
            .filter(|&i| i + width <= self.data.len())
            .ok_or(AddressError::OutOfRange {
                access,
                addr,
                size: self.data.len(),
            })
    }

    fn in_window(addr: i32) -> bool {
        (I2C_MIN..=I2C_MAX).contains(&addr)
    }

    pub fn load_word(&self, addr: i32) -> Result<i32, AddressError> {
        self.check(addr, 1, Access::Read)?;

        match addr {
            GPIO_OUT => Err(AddressError::WriteOnly(addr)),
            GPIO_IN => Ok(self.latches.gpio_in as i32),
            DISPLAY => Ok(self.latches.display),
            _ if Self::in_window(addr) => Ok(self.latches.i2c_rest),
            _ => {
                let i = self.check(addr, 4, Access::Read)?;
                Ok(NativeEndian::read_i32(&self.data[i..]))
            }
        }
    }

    pub fn store_word(&mut self, addr: i32, value: i32) -> Result<(), AddressError> {
        self.check(addr, 1, Access::Write)?;

        match addr {
            GPIO_OUT => self.latches.gpio_out = value as u8,
            GPIO_IN => return Err(AddressError::ReadOnly(addr)),
            DISPLAY => {
                trace!("display command {value:#010x}");
                self.latches.display = value;
                self.display.send_command(value);
            }
            _ if Self::in_window(addr) => self.latches.i2c_rest = value,
            _ => {
                let i = self.check(addr, 4, Access::Write)?;
                NativeEndian::write_i32(&mut self.data[i..], value);
            }
        }

        Ok(())
    }

    /// Called by the GPIO ingress
    pub fn set_gpio_in(&mut self, value: u8) {
        self.latches.gpio_in = value;
    }

    /// Reads a byte of backing store without going through the peripherals. Used by the
    /// debugger's memory view.
    pub fn peek(&self, addr: i64) -> Option<u8> {
        usize::try_from(addr)
            .ok()
            .and_then(|i| self.data.get(i))
            .copied()
    }
}

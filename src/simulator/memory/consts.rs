pub const DEFAULT_MEMORY_SIZE: usize = 40_000_000;

pub const GPIO_OUT: i32 = 0x0010_0000;
pub const GPIO_IN: i32 = 0x0010_0001;

/// Peripheral window, both ends inclusive
pub const I2C_MIN: i32 = 0x0010_0004;
pub const I2C_MAX: i32 = 0x0010_0084;
pub const DISPLAY: i32 = 0x0010_0040;

/// Bytes shown by the debugger's memory view
pub const MEMORY_WINDOW: usize = 64;

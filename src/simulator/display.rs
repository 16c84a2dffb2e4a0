//!
//! Controller for a paged monochrome panel, in the style of the common 132x64 OLED drivers.
//!
//! The program talks to it by storing command words at the `DISPLAY` address. The top byte of
//! a command word is a mask whose set bits say which two of the remaining bytes carry the
//! identifier (the higher byte) and the data (the lower byte):
//!
//! | mask   | identifier | data    |
//! |--------|------------|---------|
//! | `0x06` | bits 16-23 | bits 8-15 |
//! | `0x05` | bits 16-23 | bits 0-7  |
//! | `0x03` | bits 8-15  | bits 0-7  |
//!
//! Words with any other mask are ignored.
//!

use log::{debug, trace};

pub const PAGES: usize = 8;
pub const COLS: usize = 132;
pub const ROWS: usize = PAGES * 8;

pub const POWER_OFF: u8 = 0xAE;
pub const POWER_ON: u8 = 0xAF;
pub const DRAW_COLUMN: u8 = 0xC0;

/// Splits a command word into (identifier, data)
fn split_command(word: u32) -> Option<(u8, u8)> {
    let [mask, b2, b1, b0] = word.to_be_bytes();
    match mask {
        0x06 => Some((b2, b1)),
        0x05 => Some((b2, b0)),
        0x03 => Some((b1, b0)),
        _ => None,
    }
}

/// Builds the command word for an identifier/data pair, using the `0x03` mask
pub fn command(identifier: u8, data: u8) -> i32 {
    i32::from_be_bytes([0x03, 0, identifier, data])
}

/// Panel memory, one `u64` per column: bit `r` is pixel row `r`
pub type Pixels = [u64; COLS];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Display {
    columns: Pixels,
    power: bool,
    page: usize,
    column: usize,
}

impl Default for Display {
    fn default() -> Self {
        Self {
            columns: [0; COLS],
            power: false,
            page: 0,
            column: 0,
        }
    }
}

impl Display {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn send_command(&mut self, word: i32) {
        let Some((id, data)) = split_command(word as u32) else {
            trace!("display: ignoring command word {word:#010x}");
            return;
        };

        match id {
            POWER_OFF => self.power = false,
            POWER_ON => self.power = true,
            0x00..=0x0F => self.column = ((self.column & !0x0F) | id as usize) % COLS,
            0x10..=0x1F => {
                self.column = (((id as usize & 0x0F) << 4) | (self.column & 0x0F)) % COLS
            }
            0xB0..=0xB7 => self.page = (id & 0x0F) as usize,
            DRAW_COLUMN => self.draw_column(data),
            _ => debug!("display: unknown command {id:#04x}"),
        }
    }

    /// Sets the 8 rows of the current page at the current column, LSB on top, and moves to the
    /// next column
    fn draw_column(&mut self, data: u8) {
        let shift = self.page * 8;
        let col = &mut self.columns[self.column];
        *col = (*col & !(0xFF << shift)) | ((data as u64) << shift);
        self.column = (self.column + 1) % COLS;
    }

    pub fn pixels(&self) -> &Pixels {
        &self.columns
    }

    pub fn power(&self) -> bool {
        self.power
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn column(&self) -> usize {
        self.column
    }
}

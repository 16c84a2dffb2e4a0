//!
//! tinyrv emulates a tiny RISC-V-like machine: 32 registers, a word addressed program store, a
//! byte addressable memory bus with a couple of memory mapped peripherals (GPIO latches and a
//! paged monochrome display behind an I2C window), and a step debugger.
//!
//! Programs come already compiled, one instruction per line as `<opcode> <a> <b> <c>`. There is
//! no assembler here, and no way to write self-modifying code: the program store is separate
//! from memory and never changes once loaded.
//!
//! The machine runs on its own thread. The debugger and the UDP GPIO ingress run on others and
//! only meet the execution thread at the memory lock and at the debugger's flags.
//!

pub mod config;
pub mod debugger;
pub mod ingress;
pub mod instruction;
pub mod loader;
pub mod simulator;

//! A CHIP-8 virtual machine.
//!
//! [`Chip8`] owns the whole machine: memory, registers, call stack, timers,
//! keypad and framebuffer. A host drives it by calling [`Chip8::step`] some
//! number of times per frame, [`Chip8::tick_timers`] at 60 Hz, feeding key
//! events through [`Chip8::set_key`] and presenting [`Chip8::framebuffer`].

mod chip8;
pub mod error;
pub mod framebuffer;
pub mod instruction;
pub mod keypad;
pub mod memory;
pub mod registers;

pub type Address = u16;
pub type Timer = u8;

pub const MEM_SIZE: usize = 4096;
pub const PROGRAM_START: Address = 0x200;
/// Addresses held in I and PC are 12 bits wide.
pub const ADDRESS_MASK: Address = 0x0FFF;

pub use chip8::Chip8;
pub use error::{ExecutionError, KeyError, RomError};
pub use framebuffer::{DISPLAY_HEIGHT, DISPLAY_WIDTH, Framebuffer};
pub use instruction::{Instruction, decode};
pub use registers::Register;

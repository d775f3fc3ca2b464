//! # Register File
//!
//! Holds the six programmer-visible registers of the 65C02S. The register file
//! has no behaviour beyond bounded reads and writes and the stack-pointer
//! bookkeeping; flag arithmetic lives in [`crate::flags`].

use crate::flags::UNUSED;
use crate::RangeError;
use serde::{Deserialize, Serialize};

/// Base address of the hardware stack page.
pub const STACK_PAGE: u16 = 0x0100;

/// Register selector for bounded access by debuggers and bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    /// Accumulator
    A,
    /// X index register
    X,
    /// Y index register
    Y,
    /// Program counter
    Pc,
    /// Stack pointer (offset into page one)
    S,
    /// Processor status
    P,
}

impl Register {
    /// Largest value the register can hold.
    pub fn max_value(self) -> u32 {
        match self {
            Register::Pc => 0xFFFF,
            _ => 0xFF,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Register::A => "A",
            Register::X => "X",
            Register::Y => "Y",
            Register::Pc => "PC",
            Register::S => "S",
            Register::P => "P",
        }
    }
}

/// The 65C02S register file.
///
/// Fields are public for direct use by instruction handlers and tests; every
/// field already has the hardware width, so the only way to hand the file an
/// out-of-range value is through [`Registers::set`], which checks it.
///
/// # Examples
///
/// ```
/// use lib65c02::{Register, Registers};
///
/// let mut regs = Registers::default();
/// regs.set(Register::A, 0x42).unwrap();
/// assert_eq!(regs.get(Register::A), 0x42);
///
/// // 0x100 does not fit in an 8-bit register
/// assert!(regs.set(Register::X, 0x100).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub pc: u16,
    pub s: u8,
    pub p: u8,
}

impl Default for Registers {
    fn default() -> Self {
        Self {
            a: 0,
            x: 0,
            y: 0,
            pc: 0,
            s: 0xFD,
            p: 0x34,
        }
    }
}

impl Registers {
    /// Creates a register file with the given power-on stack pointer and status.
    pub fn with_initial(s: u8, p: u8) -> Self {
        Self {
            s,
            p: p | UNUSED,
            ..Self::default()
        }
    }

    /// Reads a register, widened to 16 bits.
    ///
    /// Reading `P` always reports bit 5 set.
    pub fn get(&self, register: Register) -> u16 {
        match register {
            Register::A => self.a as u16,
            Register::X => self.x as u16,
            Register::Y => self.y as u16,
            Register::Pc => self.pc,
            Register::S => self.s as u16,
            Register::P => self.status() as u16,
        }
    }

    /// Writes a register after checking the value fits its width.
    ///
    /// # Errors
    ///
    /// Returns [`RangeError`] when `value` exceeds the register's width. The
    /// register is left untouched in that case.
    pub fn set(&mut self, register: Register, value: u32) -> Result<(), RangeError> {
        let max = register.max_value();
        if value > max {
            return Err(RangeError::new(register.label(), value, max));
        }

        match register {
            Register::A => self.a = value as u8,
            Register::X => self.x = value as u8,
            Register::Y => self.y = value as u8,
            Register::Pc => self.pc = value as u16,
            Register::S => self.s = value as u8,
            Register::P => self.p = value as u8 | UNUSED,
        }
        Ok(())
    }

    /// Status register as software observes it (bit 5 always set).
    pub fn status(&self) -> u8 {
        self.p | UNUSED
    }

    /// Returns the address to store the next pushed byte at, then moves `S` down.
    ///
    /// `S` wraps from `$00` to `$FF`, so the stack never leaves page one.
    pub fn push_stack(&mut self) -> u16 {
        let addr = STACK_PAGE | self.s as u16;
        self.s = self.s.wrapping_sub(1);
        addr
    }

    /// Moves `S` up, then returns the address of the byte to pull.
    pub fn pop_stack(&mut self) -> u16 {
        self.s = self.s.wrapping_add(1);
        STACK_PAGE | self.s as u16
    }

    /// Advances PC by `n` bytes, wrapping at `$FFFF`.
    pub(crate) fn advance_pc(&mut self, n: u16) {
        self.pc = self.pc.wrapping_add(n);
    }
}

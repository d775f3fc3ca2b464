//! # 65C02S Instruction Implementations
//!
//! Each instruction is a standalone handler taking an [`Exec`] view of the
//! engine: the register file, the bus, the in-flight context and the resolved
//! operand. Handlers run in the `Operate` phase, after address resolution, and
//! never return errors.
//!
//! ## Categories
//!
//! - **alu**: ADC, SBC, AND, ORA, EOR, CMP, CPX, CPY, BIT
//! - **bits**: TRB, TSB, RMBn, SMBn, BBRn, BBSn
//! - **branches**: BPL, BMI, BVC, BVS, BCC, BCS, BNE, BEQ, BRA
//! - **control**: JMP, JSR, RTS, RTI, BRK, NOP, WAI, STP, reserved slots
//! - **flags**: CLC, SEC, CLI, SEI, CLD, SED, CLV
//! - **inc_dec**: INC, DEC, INX, INY, DEX, DEY
//! - **load_store**: LDA, LDX, LDY, STA, STX, STY, STZ
//! - **shifts**: ASL, LSR, ROL, ROR
//! - **stack**: PHA, PHP, PHX, PHY, PLA, PLP, PLX, PLY
//! - **transfer**: TAX, TAY, TXA, TYA, TSX, TXS

pub mod alu;
pub mod bits;
pub mod branches;
pub mod control;
pub mod flags;
pub mod inc_dec;
pub mod load_store;
pub mod shifts;
pub mod stack;
pub mod transfer;

use crate::addressing::AddressingMode;
use crate::context::ExecutionContext;
use crate::cpu::RunState;
use crate::memory::MemoryBus;
use crate::registers::Registers;

/// The engine state a handler may touch while operating.
pub(crate) struct Exec<'a> {
    pub regs: &'a mut Registers,
    pub bus: &'a mut dyn MemoryBus,
    pub ctx: &'a mut ExecutionContext,
    pub mode: AddressingMode,
    pub run_state: &'a mut RunState,
    /// IRQ/BRK vector address, for BRK.
    pub irq_vector: u16,
}

impl<'a> Exec<'a> {
    /// Reads the operand: the accumulator, the immediate byte, or memory at the
    /// effective address.
    pub fn read_operand(&mut self) -> u8 {
        match self.mode {
            AddressingMode::Accumulator => self.regs.a,
            AddressingMode::Immediate => self.ctx.operand[0],
            _ => self.bus.read(self.ctx.effective_address),
        }
    }

    /// Writes the operand location (accumulator or memory).
    pub fn write_operand(&mut self, value: u8) {
        match self.mode {
            AddressingMode::Accumulator => self.regs.a = value,
            _ => self.bus.write(self.ctx.effective_address, value),
        }
    }

    /// Read-modify-write. In memory modes the target is read twice and then
    /// written once, as the 65C02S does; on the accumulator it is a plain
    /// register update. Returns the written value.
    pub fn modify(&mut self, f: impl FnOnce(&mut Registers, u8) -> u8) -> u8 {
        if self.mode == AddressingMode::Accumulator {
            let a = self.regs.a;
            let result = f(&mut *self.regs, a);
            self.regs.a = result;
            return result;
        }

        let addr = self.ctx.effective_address;
        let value = self.bus.read(addr);
        let _ = self.bus.read(addr);
        let result = f(&mut *self.regs, value);
        self.bus.write(addr, result);
        result
    }

    pub fn push(&mut self, value: u8) {
        let addr = self.regs.push_stack();
        self.bus.write(addr, value);
    }

    pub fn pull(&mut self) -> u8 {
        let addr = self.regs.pop_stack();
        self.bus.read(addr)
    }

    pub fn push_word(&mut self, value: u16) {
        let [lo, hi] = value.to_le_bytes();
        self.push(hi);
        self.push(lo);
    }

    pub fn pull_word(&mut self) -> u16 {
        let lo = self.pull();
        let hi = self.pull();
        u16::from_le_bytes([lo, hi])
    }

    pub fn read_word(&self, addr: u16) -> u16 {
        u16::from_le_bytes([self.bus.read(addr), self.bus.read(addr.wrapping_add(1))])
    }

    /// Schedules an N/Z update for the `UpdateFlags` phase.
    pub fn set_nz(&mut self, value: u8) {
        self.ctx.nz_result = Some(value);
    }

    /// Jumps to the resolved branch target when `taken`, charging +1 cycle,
    /// and +1 more when the target is in a different page.
    pub fn branch_to(&mut self, target: u16, taken: bool) {
        if !taken {
            return;
        }
        if crate::addressing::crosses_page(self.regs.pc, target) {
            self.ctx.extra_cycles += 1;
        }
        self.ctx.extra_cycles += 1;
        self.regs.pc = target;
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Runs a single handler against a flat memory without the engine.

    use super::*;
    use crate::addressing::resolve;
    use crate::memory::FlatMemory;
    use crate::opcodes::OPCODE_TABLE;

    pub struct Harness {
        pub regs: Registers,
        pub mem: FlatMemory,
        pub ctx: ExecutionContext,
        pub run_state: RunState,
    }

    impl Harness {
        pub fn new() -> Self {
            Self {
                regs: Registers::default(),
                mem: FlatMemory::new(),
                ctx: ExecutionContext::instruction(0xEA),
                run_state: RunState::Running,
            }
        }

        /// Executes `opcode` with operand bytes already "fetched"; PC is set
        /// past the instruction first. N/Z updates are applied immediately.
        pub fn run(&mut self, opcode: u8, operand: [u8; 2]) {
            let desc = &OPCODE_TABLE[opcode as usize];
            self.regs.pc = self.regs.pc.wrapping_add(desc.length as u16);
            self.ctx = ExecutionContext::instruction(opcode);
            self.ctx.operand = operand;
            let ea = resolve(desc.mode, operand, &self.regs, &self.mem);
            self.ctx.effective_address = ea.address;
            self.ctx.page_crossed = ea.page_crossed;

            let mut exec = Exec {
                regs: &mut self.regs,
                bus: &mut self.mem,
                ctx: &mut self.ctx,
                mode: desc.mode,
                run_state: &mut self.run_state,
                irq_vector: 0xFFFE,
            };
            (desc.handler)(&mut exec);

            if let Some(v) = self.ctx.nz_result {
                self.regs.update_nz(v);
            }
        }
    }
}

//! # Control Flow Instructions
//!
//! This module implements control flow operations:
//! - JMP: Jump (absolute, indirect, absolute indexed indirect)
//! - JSR / RTS: subroutine call and return
//! - RTI: return from interrupt
//! - BRK: software interrupt
//! - NOP and the reserved slots
//! - WAI / STP: halt until interrupt / until reset

use super::Exec;
use crate::cpu::RunState;
use crate::flags::{DECIMAL, IRQ_DISABLE};

/// JMP. The resolver has already followed any pointer.
pub(crate) fn jmp(exec: &mut Exec<'_>) {
    exec.regs.pc = exec.ctx.effective_address;
}

/// JSR. Pushes the address of the last byte of the instruction.
pub(crate) fn jsr(exec: &mut Exec<'_>) {
    let return_addr = exec.regs.pc.wrapping_sub(1);
    exec.push_word(return_addr);
    exec.regs.pc = exec.ctx.effective_address;
}

pub(crate) fn rts(exec: &mut Exec<'_>) {
    exec.regs.pc = exec.pull_word().wrapping_add(1);
}

/// RTI. Restores P (bits 4 and 5 untouched) and then PC.
pub(crate) fn rti(exec: &mut Exec<'_>) {
    let status = exec.pull();
    exec.regs.set_status_from_pull(status);
    exec.regs.pc = exec.pull_word();
}

/// BRK.
///
/// The signature byte has been fetched as an operand, so PC already points two
/// bytes past the opcode. Pushes PC and P with B set, sets I, clears D and
/// loads PC from the IRQ vector.
pub(crate) fn brk(exec: &mut Exec<'_>) {
    let pc = exec.regs.pc;
    exec.push_word(pc);
    let status = exec.regs.get_status_for_push(true);
    exec.push(status);
    exec.regs.set_flag(IRQ_DISABLE, true);
    exec.regs.set_flag(DECIMAL, false);
    exec.regs.pc = exec.read_word(exec.irq_vector);
}

pub(crate) fn nop(_exec: &mut Exec<'_>) {}

/// Reserved opcode: operand bytes have been consumed, nothing else happens.
pub(crate) fn reserved(_exec: &mut Exec<'_>) {}

/// WAI (Wait for Interrupt).
pub(crate) fn wai(exec: &mut Exec<'_>) {
    *exec.run_state = RunState::Waiting;
}

/// STP (Stop the clock). Only RESET resumes execution.
pub(crate) fn stp(exec: &mut Exec<'_>) {
    *exec.run_state = RunState::Stopped;
}

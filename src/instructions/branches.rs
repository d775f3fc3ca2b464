//! # Branch Instructions
//!
//! The eight conditional branches share one handler that asks the flag logic
//! for the opcode's predicate. BRA is always taken and its base count in the
//! table already includes the taken cycle.

use super::Exec;
use crate::addressing::crosses_page;

/// BPL, BMI, BVC, BVS, BCC, BCS, BNE, BEQ.
pub(crate) fn branch(exec: &mut Exec<'_>) {
    let taken = exec.regs.branch_condition(exec.ctx.opcode);
    let target = exec.ctx.effective_address;
    exec.branch_to(target, taken);
}

/// BRA (Branch Always).
pub(crate) fn bra(exec: &mut Exec<'_>) {
    let target = exec.ctx.effective_address;
    if crosses_page(exec.regs.pc, target) {
        exec.ctx.extra_cycles += 1;
    }
    exec.regs.pc = target;
}

//! # CPU Snapshots
//!
//! [`CpuState`] is the structured snapshot behind `get_state`/`set_state`. It
//! serialises with serde, so any format the host prefers can carry it.
//!
//! Restoring is all or nothing: [`CpuState::validate`] checks every field
//! before the engine changes anything.

use crate::config::CpuConfig;
use crate::context::{ContextKind, ExecutionContext, Phase};
use crate::cpu::RunState;
use crate::flags::UNUSED;
use crate::interrupts::{Line, PendingLines};
use crate::opcodes::descriptor;
use crate::registers::Registers;
use crate::StateError;
use serde::{Deserialize, Serialize};

/// Complete engine state, including an in-flight instruction.
///
/// # Examples
///
/// ```
/// use lib65c02::{Cpu, FlatMemory};
///
/// let mut cpu = Cpu::new(FlatMemory::new());
/// cpu.tick(1); // stop inside the first instruction
///
/// let json = serde_json::to_string(&cpu.snapshot()).unwrap();
/// let state = serde_json::from_str(&json).unwrap();
/// cpu.restore(&state).unwrap();
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuState {
    pub registers: Registers,
    pub run_state: RunState,
    pub cycles: u64,
    pub instructions: u64,
    #[serde(default)]
    pub interrupts_serviced: u64,
    #[serde(default)]
    pub stall_cycles: u64,
    /// Interrupt lines as seen by the controller.
    #[serde(default)]
    pub pending: PendingLines,
    /// Present when the snapshot was taken mid-instruction.
    pub context: Option<ExecutionContext>,
}

impl CpuState {
    /// Checks the snapshot against the configuration it will be restored into.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::InvalidField`] naming the first offending field.
    pub fn validate(&self, config: &CpuConfig) -> Result<(), StateError> {
        if self.registers.p & UNUSED == 0 {
            return Err(invalid("registers.p", "bit 5 must be set"));
        }
        match &self.context {
            Some(ctx) => validate_context(ctx, config),
            None => Ok(()),
        }
    }
}

fn validate_context(ctx: &ExecutionContext, config: &CpuConfig) -> Result<(), StateError> {
    if ctx.elapsed == 0 {
        return Err(invalid("context.elapsed", "an in-flight context has spent at least one cycle"));
    }
    if ctx.total != 0 && ctx.elapsed > ctx.total {
        return Err(invalid("context.elapsed", "exceeds the instruction's total cycles"));
    }
    if ctx.phase == Phase::Retire && ctx.total == 0 {
        return Err(invalid("context.total", "a retiring context must know its cycle count"));
    }

    match ctx.kind {
        ContextKind::Instruction => {
            let needed = descriptor(ctx.opcode).mode.operand_bytes();
            if ctx.fetched > needed {
                return Err(invalid(
                    "context.fetched",
                    "more operand bytes than the opcode's addressing mode takes",
                ));
            }
        }
        ContextKind::Interrupt(vector) => {
            let expected = match vector.line {
                Line::Reset => config.reset_vector,
                Line::Nmi => config.nmi_vector,
                Line::Irq => config.irq_vector,
            };
            if vector.address != expected {
                return Err(invalid(
                    "context.kind",
                    "vector address does not match the configured vector",
                ));
            }
        }
    }
    Ok(())
}

fn invalid(field: &str, reason: &str) -> StateError {
    StateError::InvalidField {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interrupts::InterruptVector;

    fn base_state() -> CpuState {
        CpuState {
            registers: Registers::default(),
            run_state: RunState::Running,
            cycles: 0,
            instructions: 0,
            interrupts_serviced: 0,
            stall_cycles: 0,
            pending: PendingLines::default(),
            context: None,
        }
    }

    #[test]
    fn test_valid_state() {
        assert!(base_state().validate(&CpuConfig::default()).is_ok());
    }

    #[test]
    fn test_rejects_clear_bit_5() {
        let mut state = base_state();
        state.registers.p = 0x04;
        assert!(matches!(
            state.validate(&CpuConfig::default()),
            Err(StateError::InvalidField { .. })
        ));
    }

    #[test]
    fn test_rejects_overfetched_context() {
        let mut state = base_state();
        let mut ctx = ExecutionContext::instruction(0xA9); // LDA #imm takes one byte
        ctx.fetched = 2;
        state.context = Some(ctx);
        assert!(state.validate(&CpuConfig::default()).is_err());
    }

    #[test]
    fn test_rejects_elapsed_past_total() {
        let mut state = base_state();
        let mut ctx = ExecutionContext::instruction(0xEA);
        ctx.phase = Phase::Retire;
        ctx.total = 2;
        ctx.elapsed = 3;
        state.context = Some(ctx);
        assert!(state.validate(&CpuConfig::default()).is_err());
    }

    #[test]
    fn test_rejects_foreign_vector() {
        let mut state = base_state();
        state.context = Some(ExecutionContext::interrupt(InterruptVector {
            address: 0x1234,
            line: Line::Irq,
        }));
        assert!(state.validate(&CpuConfig::default()).is_err());

        state.context = Some(ExecutionContext::interrupt(InterruptVector {
            address: 0xFFFE,
            line: Line::Irq,
        }));
        assert!(state.validate(&CpuConfig::default()).is_ok());
    }
}

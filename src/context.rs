//! In-flight instruction state.
//!
//! An [`ExecutionContext`] is created when the engine fetches an opcode (or
//! acknowledges an interrupt) and dropped when that instruction retires. It
//! holds exactly what is needed to resume after a tick ends mid-instruction.

use crate::interrupts::InterruptVector;
use serde::{Deserialize, Serialize};

/// Position of an instruction in the engine's state machine.
///
/// `Fetch` is the opcode cycle itself; the remaining phases run in order.
/// `ResolveAddress`, `Operate` and `UpdateFlags` take no cycles of their own:
/// they settle as soon as the last operand byte has arrived, after which the
/// instruction sits in `Retire` until its cycle count is used up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Fetch,
    Decode,
    ResolveAddress,
    Operate,
    UpdateFlags,
    Retire,
}

/// What the context is executing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContextKind {
    /// A fetched opcode.
    Instruction,
    /// A hardware interrupt (or RESET) service sequence.
    Interrupt(InterruptVector),
}

/// Transient per-instruction state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionContext {
    pub kind: ContextKind,
    /// Opcode being executed (zero for interrupt sequences).
    pub opcode: u8,
    pub phase: Phase,
    /// Operand bytes fetched so far, little-endian.
    pub operand: [u8; 2],
    /// Number of valid bytes in `operand`.
    pub fetched: u8,
    /// Effective address from the resolver.
    pub effective_address: u16,
    pub page_crossed: bool,
    /// Cycles spent on this instruction so far.
    pub elapsed: u8,
    /// Cycles this instruction takes in total; known once `UpdateFlags` has run.
    pub total: u8,
    /// Penalty cycles added by the handler itself (taken branches).
    pub extra_cycles: u8,
    /// Value the `UpdateFlags` phase loads N and Z from, if the handler set one.
    pub nz_result: Option<u8>,
}

impl ExecutionContext {
    /// Context for a freshly fetched opcode; the fetch cycle has been spent.
    pub fn instruction(opcode: u8) -> Self {
        Self {
            kind: ContextKind::Instruction,
            opcode,
            phase: Phase::Decode,
            operand: [0; 2],
            fetched: 0,
            effective_address: 0,
            page_crossed: false,
            elapsed: 1,
            total: 0,
            extra_cycles: 0,
            nz_result: None,
        }
    }

    /// Context for an acknowledged interrupt; the acknowledge cycle has been spent.
    pub fn interrupt(vector: InterruptVector) -> Self {
        Self {
            kind: ContextKind::Interrupt(vector),
            phase: Phase::Operate,
            total: INTERRUPT_CYCLES,
            ..Self::instruction(0)
        }
    }

    /// Whether the instruction has used all its cycles.
    pub fn is_complete(&self) -> bool {
        self.phase == Phase::Retire && self.elapsed >= self.total
    }
}

/// Cycles in every interrupt service sequence, RESET included.
pub const INTERRUPT_CYCLES: u8 = 7;

/// Cycle (counted from the acknowledge) on which an interrupt sequence pushes
/// state and loads the vector.
pub const INTERRUPT_SERVICE_CYCLE: u8 = 2;

//! Fuzz target for the cycle engine.
//!
//! Builds an arbitrary register file and memory image, then runs the CPU in
//! arbitrary tick budgets, checking that every budget is consumed in full and
//! the register file stays well-formed.

#![no_main]

use arbitrary::Arbitrary;
use lib65c02::{Cpu, FlatMemory, MemoryBus, Register};
use libfuzzer_sys::fuzz_target;

/// Arbitrary CPU initial state for fuzzing
#[derive(Debug, Arbitrary)]
struct FuzzCpuState {
    a: u8,
    x: u8,
    y: u8,
    s: u8,
    p: u8,
}

/// Memory region for fuzzing
#[derive(Debug, Arbitrary)]
struct FuzzMemory {
    /// Bytes at $8000, where execution starts
    program: [u8; 64],
    zero_page: [u8; 256],
    stack_page: [u8; 256],
    /// IRQ/BRK and NMI handlers land here
    handler: [u8; 16],
}

/// Complete fuzz input
#[derive(Debug, Arbitrary)]
struct FuzzInput {
    cpu_state: FuzzCpuState,
    memory: FuzzMemory,
    budgets: Vec<u8>,
    irq_at: Option<u8>,
    nmi_at: Option<u8>,
}

fuzz_target!(|input: FuzzInput| {
    let mut memory = FlatMemory::new();

    // RESET -> $8000, NMI and IRQ -> $9000
    memory.write(0xFFFC, 0x00);
    memory.write(0xFFFD, 0x80);
    memory.write(0xFFFA, 0x00);
    memory.write(0xFFFB, 0x90);
    memory.write(0xFFFE, 0x00);
    memory.write(0xFFFF, 0x90);

    memory.load(0x8000, &input.memory.program);
    memory.load(0x0000, &input.memory.zero_page);
    memory.load(0x0100, &input.memory.stack_page);
    memory.load(0x9000, &input.memory.handler);

    let mut cpu = Cpu::new(memory);
    let state = &input.cpu_state;
    for (register, value) in [
        (Register::A, state.a),
        (Register::X, state.x),
        (Register::Y, state.y),
        (Register::S, state.s),
        (Register::P, state.p),
    ] {
        assert!(cpu.set_register(register, value as u32).is_ok());
    }
    let line = cpu.interrupt_line("fuzz");

    for (i, &budget) in input.budgets.iter().take(64).enumerate() {
        if input.irq_at == Some(i as u8) {
            line.assert_irq();
        }
        if input.nmi_at == Some(i as u8) {
            line.assert_nmi();
        }

        let before = cpu.cycles();
        let consumed = cpu.tick(budget as u32);
        assert_eq!(consumed, budget as u32);
        assert_eq!(cpu.cycles() - before, budget as u64);
        // Bit 5 of P reads as 1 at all times
        assert_eq!(cpu.registers().p & 0x20, 0x20);
    }

    let snapshot = cpu.snapshot();
    assert!(cpu.restore(&snapshot).is_ok());
});

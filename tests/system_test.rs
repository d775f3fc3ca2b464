//! Scheduler, bus arbitration and snapshot tests for complete systems.
//!
//! Tests cover:
//! - Resumable ticking: any split of a cycle budget gives the same machine
//! - Device mapping errors
//! - Clock dividers
//! - External bus masters and DMA stalls
//! - Timer interrupts through the scheduler
//! - JSON state round-trip and rejection

use lib65c02::{
    AddressMappingError, CpuConfig, Device, DeviceState, DmaController, IntervalTimer, MappedMemory,
    MemoryBus, RamDevice, Register, RomDevice, SchedulerConfig, StateError, System,
    SystemState,
};
use std::cell::Cell;
use std::rc::Rc;

/// Sums 1..=10 into $10, then parks on BRA *.
const SUM_PROGRAM: &[u8] = &[
    0xA2, 0x0A, // LDX #10
    0x8A, //       loop: TXA
    0x18, //       CLC
    0x65, 0x10, // ADC $10
    0x85, 0x10, // STA $10
    0xCA, //       DEX
    0xD0, 0xF7, // BNE loop
    0x80, 0xFE, // BRA *
];

/// RAM at $0000-$EFFF with `program` at $8000, I/O at $F000-$F0FF and a
/// vector ROM at $FF00. RESET -> $8000, NMI and IRQ -> $9000.
fn setup_system(program: &[u8]) -> System {
    setup_system_with(SchedulerConfig::default(), program)
}

fn setup_system_with(config: SchedulerConfig, program: &[u8]) -> System {
    let mut system = System::with_config(CpuConfig::default(), config).unwrap();
    let mut ram = RamDevice::new(0xF000);
    ram.load_bytes(0x8000, program);
    ram.load_bytes(0x9000, &[0x80, 0xFE]); // BRA *
    system.map(0x0000, 0xEFFF, Box::new(ram)).unwrap();

    let mut rom = vec![0xEA; 0x100];
    rom[0xFA..].copy_from_slice(&[0x00, 0x90, 0x00, 0x80, 0x00, 0x90]);
    system
        .map(0xFF00, 0xFFFF, Box::new(RomDevice::new(rom)))
        .unwrap();
    system.reset();
    system
}

/// Counts the cycles it is ticked for.
struct CycleCounter {
    seen: Rc<Cell<u32>>,
}

impl Device for CycleCounter {
    fn name(&self) -> &str {
        "counter"
    }

    fn size(&self) -> u32 {
        1
    }

    fn tick(&mut self, cycles: u32) -> u32 {
        self.seen.set(self.seen.get() + cycles);
        cycles
    }

    fn read(&self, _offset: u16) -> u8 {
        self.seen.get() as u8
    }

    fn write(&mut self, _offset: u16, _value: u8) {}

    fn get_state(&self) -> DeviceState {
        DeviceState::Memory { bytes: Vec::new() }
    }

    fn validate_state(&self, _state: &DeviceState) -> Result<(), StateError> {
        Ok(())
    }

    fn set_state(&mut self, _state: &DeviceState) -> Result<(), StateError> {
        Ok(())
    }
}

// ========== Resumable Execution Tests ==========

#[test]
fn test_program_runs_to_completion() {
    let mut system = setup_system(SUM_PROGRAM);
    // 151 cycles of summing, then 100 passes through BRA *
    system.run_for_cycles(451);

    assert_eq!(system.bus().read(0x0010), 55);
    assert_eq!(system.cpu().pc(), 0x800B);
}

#[test]
fn test_tick_split_does_not_change_outcome() {
    let mut whole = setup_system(SUM_PROGRAM);
    whole.tick(137);

    let mut pieces = setup_system(SUM_PROGRAM);
    for budget in [1, 2, 3, 5, 8, 13, 21, 34, 50] {
        assert_eq!(pieces.tick(budget), budget);
    }

    assert_eq!(whole.snapshot(), pieces.snapshot());
}

#[test]
fn test_step_instruction_stops_at_boundaries() {
    let mut system = setup_system(SUM_PROGRAM);
    assert_eq!(system.step_instruction(), 2); // LDX #
    assert_eq!(system.step_instruction(), 2); // TXA
    assert_eq!(system.step_instruction(), 2); // CLC
    assert_eq!(system.step_instruction(), 3); // ADC zp
    assert!(system.cpu().at_instruction_boundary());
    assert_eq!(system.cpu().instructions(), 4);
}

// ========== Mapping Tests ==========

#[test]
fn test_overlapping_mapping_is_rejected() {
    let mut memory = MappedMemory::new();
    memory
        .add_device(0x0000, 0x7FFF, Box::new(RamDevice::new(0x8000)))
        .unwrap();

    let err = memory
        .add_device(0x7000, 0x8FFF, Box::new(RamDevice::new(0x2000)))
        .unwrap_err();
    assert_eq!(
        err,
        AddressMappingError::Overlap {
            new_start: 0x7000,
            new_end: 0x8FFF,
            existing_start: 0x0000,
            existing_end: 0x7FFF,
        }
    );
}

#[test]
fn test_device_smaller_than_range_is_rejected() {
    let mut memory = MappedMemory::new();
    let result = memory.add_device(0x1000, 0x1FFF, Box::new(RamDevice::new(0x100)));
    assert!(matches!(
        result,
        Err(AddressMappingError::InvalidRange { .. })
    ));
    assert!(memory.mappings().is_empty());
}

#[test]
fn test_unmapped_space_floats_high() {
    let mut system = setup_system(&[]);
    system.bus_mut().write(0xF080, 0x12);
    assert_eq!(system.bus().read(0xF080), 0xFF);
}

// ========== Clock Divider Tests ==========

#[test]
fn test_divider_carries_remainder() {
    let seen = Rc::new(Cell::new(0));
    let mut system = setup_system(&[0x80, 0xFE]);
    system
        .map_with_divider(
            0xF000,
            0xF000,
            Box::new(CycleCounter {
                seen: Rc::clone(&seen),
            }),
            4,
        )
        .unwrap();

    for _ in 0..10 {
        system.tick(3);
    }
    // 30 master cycles at a quarter rate
    assert_eq!(seen.get(), 7);
    assert_eq!(system.cpu().cycles(), 30);
}

// ========== Bus Mastership Tests ==========

#[test]
fn test_mastership_is_exclusive() {
    let mut system = setup_system(&[0xEA]);
    assert_eq!(system.bus_master(), "cpu");
    assert!(system.request_mastership("blitter"));
    assert!(!system.request_mastership("sound"));
    assert_eq!(system.bus_master(), "blitter");

    // Only the holder can release
    system.release_mastership("sound");
    assert_eq!(system.bus_master(), "blitter");
    system.release_mastership("blitter");
    assert_eq!(system.bus_master(), "cpu");
}

#[test]
fn test_stall_cycles_are_consumed() {
    let mut system = setup_system(&[0xEA, 0xEA]);
    system.request_mastership("blitter");

    assert_eq!(system.tick(10), 10);
    assert_eq!(system.cpu().cycles(), 10);
    assert_eq!(system.cpu().stall_cycles(), 10);
    assert_eq!(system.cpu().instructions(), 0);
}

#[test]
fn test_step_instruction_returns_while_bus_is_held() {
    let mut system = setup_system(&[0xEA, 0xEA]);
    assert!(system.request_mastership("debugger"));

    assert_eq!(system.step_instruction(), 1);
    assert_eq!(system.step_instruction(), 1);
    assert_eq!(system.cpu().pc(), 0x8000);
    assert_eq!(system.cpu().stall_cycles(), 2);

    system.release_mastership("debugger");
    assert_eq!(system.step_instruction(), 2);
    assert_eq!(system.cpu().pc(), 0x8001);
}

/// Programs a 2-byte copy from $2000 to $3000 on a controller at $F000.
fn map_dma(system: &mut System) {
    let dma = DmaController::new(system.interrupt_line("dma"));
    system.map(0xF000, 0xF005, Box::new(dma)).unwrap();
    for (offset, value) in [(0, 0x00), (1, 0x20), (2, 0x00), (3, 0x30), (4, 2)] {
        system.bus_mut().write(0xF000 + offset, value);
    }
    system.bus_mut().write(0x2000, 0x11);
    system.bus_mut().write(0x2001, 0x22);
}

#[test]
fn test_large_quantum_returns_bus_when_transfer_ends() {
    // STA $F005; then NOPs
    let mut program = vec![0x8D, 0x05, 0xF0];
    program.extend_from_slice(&[0xEA; 16]);
    let mut system = setup_system_with(SchedulerConfig { quantum: 10 }, &program);
    map_dma(&mut system);
    system.cpu_mut().set_register(Register::A, 0x01).unwrap();

    // First tick: STA and three NOPs, the grant lands at its end
    system.run_for_cycles(10);
    assert_eq!(system.bus_master(), "dma");
    assert_eq!(system.cpu().instructions(), 4);

    // Second tick: 4 transfer cycles, then the CPU runs three more NOPs
    system.run_for_cycles(10);
    assert_eq!(system.cpu().stall_cycles(), 4);
    assert_eq!(system.cpu().instructions(), 7);
    assert_eq!(system.cpu().cycles(), 20);
    assert_eq!(system.bus().read(0x3000), 0x11);
    assert_eq!(system.bus().read(0x3001), 0x22);
    assert_eq!(system.bus_master(), "cpu");
}

#[test]
fn test_dma_copy_with_completion_irq() {
    // CLI; STA $F005; BRA *
    let mut system = setup_system(&[0x58, 0x8D, 0x05, 0xF0, 0x80, 0xFE]);
    let dma = DmaController::new(system.interrupt_line("dma"));
    system.map(0xF000, 0xF005, Box::new(dma)).unwrap();
    for (offset, value) in [(0, 0x00), (1, 0x20), (2, 0x00), (3, 0x30), (4, 4)] {
        system.bus_mut().write(0xF000 + offset, value);
    }
    system.bus_mut().write(0x2000, 0xDE);
    system.bus_mut().write(0x2003, 0xEF);
    system.cpu_mut().set_register(Register::A, 0x03).unwrap();

    system.run_for_cycles(40);

    assert_eq!(system.bus().read(0x3000), 0xDE);
    assert_eq!(system.bus().read(0x3003), 0xEF);
    assert_eq!(system.cpu().stall_cycles(), 8);
    assert_eq!(system.cpu().interrupts_serviced(), 1);
    assert_eq!(system.bus_master(), "cpu");
}

// ========== Timer Tests ==========

#[test]
fn test_timer_irq_is_serviced_once_per_acknowledge() {
    // CLI; BRA *
    let mut system = setup_system(&[0x58, 0x80, 0xFE]);
    let timer = IntervalTimer::new(system.interrupt_line("timer"));
    system.map(0xF010, 0xF013, Box::new(timer)).unwrap();
    // Handler: LDA $F013 (acknowledge); RTI
    system.bus_mut().write(0x9000, 0xAD);
    system.bus_mut().write(0x9001, 0x13);
    system.bus_mut().write(0x9002, 0xF0);
    system.bus_mut().write(0x9003, 0x40);

    system.bus_mut().write(0xF010, 50);
    system.bus_mut().write(0xF011, 0);
    system.bus_mut().write(0xF012, 0x07); // run, IRQ, continuous

    system.run_for_cycles(200);

    assert_eq!(system.cpu().interrupts_serviced(), 3);
    let stats = system.interrupts().borrow().stats();
    assert_eq!(stats.irq, 3);
}

// ========== Snapshot Tests ==========

#[test]
fn test_state_survives_json_round_trip() {
    let mut system = setup_system(SUM_PROGRAM);
    let timer = IntervalTimer::new(system.interrupt_line("timer"));
    system.map(0xF010, 0xF013, Box::new(timer)).unwrap();
    // Stop in the middle of STA $10
    system.tick(10);
    assert!(!system.cpu().at_instruction_boundary());

    let json = serde_json::to_string(&system.snapshot()).unwrap();
    let state: SystemState = serde_json::from_str(&json).unwrap();

    let mut copy = setup_system(&[]);
    let timer = IntervalTimer::new(copy.interrupt_line("timer"));
    copy.map(0xF010, 0xF013, Box::new(timer)).unwrap();
    copy.restore(&state).unwrap();

    system.run_for_cycles(300);
    copy.run_for_cycles(300);
    assert_eq!(system.snapshot(), copy.snapshot());
    assert_eq!(copy.bus().read(0x0010), 55);
}

#[test]
fn test_restore_rejects_different_layout() {
    let mut system = setup_system(SUM_PROGRAM);
    let state = system.snapshot();

    let mut other = System::new();
    other
        .map(0x0000, 0xFFFF, Box::new(RamDevice::new(0x10000)))
        .unwrap();
    let err = other.restore(&state).unwrap_err();
    assert_eq!(
        err,
        StateError::DeviceCount {
            expected: 1,
            found: 2
        }
    );

    system.step_instruction();
    assert!(system.restore(&state).is_ok());
    assert_eq!(system.cpu().pc(), 0x8000);
}

#[test]
fn test_restore_rejects_bad_cpu_state() {
    let mut system = setup_system(SUM_PROGRAM);
    let mut state = system.snapshot();
    state.cpu.registers.p = 0x00;

    assert!(matches!(
        system.restore(&state),
        Err(StateError::InvalidField { .. })
    ));
    assert_eq!(system.cpu().registers().p, 0x34);
}

//! # CPU Engine
//!
//! [`Cpu`] owns the register file and drives each instruction through the
//! phases named by [`Phase`]:
//!
//! ```text
//! Fetch -> Decode -> ResolveAddress -> Operate -> UpdateFlags -> Retire
//!                                                                  |
//!                             InterruptCheck <---------------------+
//! ```
//!
//! ## Timing Model
//!
//! The engine advances one clock cycle at a time:
//!
//! - The opcode fetch is one cycle, and each operand byte is one more.
//! - Once the last operand byte is in, address resolution, the operation and
//!   the flag update settle within that same cycle. The instruction then waits
//!   in `Retire` until its full cycle count (base plus penalties) has elapsed.
//! - At each instruction boundary the interrupt controller is consulted before
//!   the next fetch. An acknowledged interrupt replaces the fetch with a
//!   7-cycle service sequence.
//!
//! Because the in-flight state lives in an [`ExecutionContext`], a
//! [`Cpu::tick`] may end anywhere inside an instruction and the next call picks
//! up where it left off.
//!
//! ## Bus Mastership
//!
//! Every cycle the engine first asks the bus whether the CPU is the current
//! master. While another master (a DMA transfer) holds the bus, the cycle is
//! counted as a stall and nothing else happens.

use crate::addressing::{resolve, AddressingMode};
use crate::config::CpuConfig;
use crate::context::{ContextKind, ExecutionContext, Phase, INTERRUPT_SERVICE_CYCLE};
use crate::devices::{Device, DeviceState};
use crate::flags::{DECIMAL, IRQ_DISABLE};
use crate::instructions::Exec;
use crate::interrupts::{InterruptController, InterruptLine, InterruptVector, Line, SharedInterrupts};
use crate::memory::MemoryBus;
use crate::opcodes::descriptor;
use crate::registers::{Register, Registers};
use crate::state::CpuState;
use crate::{RangeError, StateError};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;

/// Whether the engine is fetching instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    /// Normal execution.
    Running,
    /// Halted by `WAI` until any interrupt line is active.
    Waiting,
    /// Halted by `STP` until RESET.
    Stopped,
}

/// A 65C02S processor attached to a memory bus.
///
/// # Examples
///
/// ```
/// use lib65c02::{Cpu, FlatMemory, MemoryBus};
///
/// let mut memory = FlatMemory::new();
/// memory.write(0xFFFC, 0x00);
/// memory.write(0xFFFD, 0x80);
/// memory.load(0x8000, &[0xA9, 0x42]); // LDA #$42
///
/// let mut cpu = Cpu::new(memory);
/// assert_eq!(cpu.pc(), 0x8000);
///
/// assert_eq!(cpu.step(), 2);
/// assert_eq!(cpu.registers().a, 0x42);
/// assert_eq!(cpu.pc(), 0x8002);
/// ```
pub struct Cpu<M: MemoryBus> {
    regs: Registers,
    config: CpuConfig,
    bus: M,
    interrupts: SharedInterrupts,
    context: Option<ExecutionContext>,
    run_state: RunState,
    cycles: u64,
    instructions: u64,
    interrupts_serviced: u64,
    stall_cycles: u64,
}

impl<M: MemoryBus> Cpu<M> {
    /// Creates a CPU with the default configuration.
    ///
    /// The CPU comes up in its power-on state: `S` and `P` take their initial
    /// values and `PC` is loaded from the reset vector. Power-on consumes no
    /// cycles.
    pub fn new(bus: M) -> Self {
        Self::build(bus, CpuConfig::default())
    }

    /// Creates a CPU with an explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RangeError`] when a vector address leaves no room for its
    /// high byte.
    ///
    /// # Examples
    ///
    /// ```
    /// use lib65c02::{Cpu, CpuConfig, FlatMemory};
    ///
    /// let config = CpuConfig { initial_s: 0xFF, ..CpuConfig::default() };
    /// let cpu = Cpu::with_config(FlatMemory::new(), config).unwrap();
    /// assert_eq!(cpu.registers().s, 0xFF);
    /// ```
    pub fn with_config(bus: M, config: CpuConfig) -> Result<Self, RangeError> {
        config.validate()?;
        Ok(Self::build(bus, config))
    }

    fn build(bus: M, config: CpuConfig) -> Self {
        let interrupts = Rc::new(RefCell::new(InterruptController::new(&config)));
        let mut cpu = Self {
            regs: Registers::with_initial(config.initial_s, config.initial_p),
            config,
            bus,
            interrupts,
            context: None,
            run_state: RunState::Running,
            cycles: 0,
            instructions: 0,
            interrupts_serviced: 0,
            stall_cycles: 0,
        };
        cpu.regs.pc = cpu.read_word(cpu.config.reset_vector);
        log::debug!("power-on: PC=${:04X}", cpu.regs.pc);
        cpu
    }

    /// Returns the CPU to its power-on state.
    ///
    /// Registers take their configured initial values, PC is reloaded from the
    /// reset vector, any in-flight instruction is dropped, all interrupt lines
    /// are cleared and the counters restart at zero. For the timed 7-cycle
    /// RESET sequence, assert RESET on the interrupt controller instead.
    pub fn reset(&mut self) {
        self.regs = Registers::with_initial(self.config.initial_s, self.config.initial_p);
        self.regs.pc = self.read_word(self.config.reset_vector);
        self.context = None;
        self.run_state = RunState::Running;
        self.cycles = 0;
        self.instructions = 0;
        self.interrupts_serviced = 0;
        self.stall_cycles = 0;
        self.interrupts.borrow_mut().clear_all();
        log::info!("reset: PC=${:04X}", self.regs.pc);
    }

    /// Advances the CPU by `budget` clock cycles and returns the number
    /// consumed.
    ///
    /// Every cycle of the budget is used: instructions that do not fit are
    /// suspended mid-way, and cycles spent halted or without the bus still
    /// count.
    ///
    /// # Examples
    ///
    /// ```
    /// use lib65c02::{Cpu, FlatMemory, MemoryBus};
    ///
    /// let mut memory = FlatMemory::new();
    /// memory.write(0xFFFD, 0x80);
    /// memory.load(0x8000, &[0xAD, 0x00, 0x20]); // LDA $2000 (4 cycles)
    ///
    /// let mut cpu = Cpu::new(memory);
    /// assert_eq!(cpu.tick(3), 3);
    /// assert!(!cpu.at_instruction_boundary());
    /// cpu.tick(1);
    /// assert!(cpu.at_instruction_boundary());
    /// assert_eq!(cpu.pc(), 0x8003);
    /// ```
    pub fn tick(&mut self, budget: u32) -> u32 {
        for _ in 0..budget {
            self.cycle();
        }
        budget
    }

    /// Runs one instruction (or one interrupt service sequence) to completion
    /// and returns the cycles it took.
    ///
    /// When the CPU is halted by `WAI`/`STP` with nothing to wake it, or the
    /// bus belongs to another master, this returns after a single idle cycle.
    pub fn step(&mut self) -> u32 {
        let mut spent = 0;
        loop {
            let progressed = self.cycle();
            spent += 1;
            if self.context.is_none() || !progressed {
                return spent;
            }
        }
    }

    /// Runs one clock cycle. Returns false when the cycle was a stall or an
    /// idle halted cycle.
    fn cycle(&mut self) -> bool {
        self.cycles += 1;

        if !self.bus.cpu_has_bus() {
            self.stall_cycles += 1;
            return false;
        }

        let mut ctx = match self.context.take() {
            Some(mut ctx) => {
                ctx.elapsed = ctx.elapsed.saturating_add(1);
                self.advance(&mut ctx);
                ctx
            }
            None => match self.begin() {
                Some(ctx) => ctx,
                None => return false,
            },
        };

        if ctx.is_complete() {
            self.retire(&mut ctx);
        } else {
            self.context = Some(ctx);
        }
        true
    }

    /// Instruction boundary: interrupt check, then opcode fetch.
    fn begin(&mut self) -> Option<ExecutionContext> {
        let irq_disabled = self.regs.flag(IRQ_DISABLE);

        match self.run_state {
            RunState::Running => {}
            RunState::Waiting => {
                if !self.interrupts.borrow().has_any() {
                    return None;
                }
                log::debug!("WAI released at cycle {}", self.cycles);
                self.run_state = RunState::Running;
            }
            RunState::Stopped => {
                if !self.interrupts.borrow().reset_pending() {
                    return None;
                }
            }
        }

        let acknowledged = self.interrupts.borrow_mut().acknowledge(irq_disabled);
        if let Some(vector) = acknowledged {
            return Some(ExecutionContext::interrupt(vector));
        }

        let opcode = self.bus.read(self.regs.pc);
        self.regs.advance_pc(1);
        let mut ctx = ExecutionContext::instruction(opcode);
        if descriptor(opcode).mode.operand_bytes() == 0 {
            self.settle(&mut ctx);
        }
        Some(ctx)
    }

    fn advance(&mut self, ctx: &mut ExecutionContext) {
        match ctx.kind {
            ContextKind::Interrupt(vector) => {
                if ctx.phase != Phase::Retire && ctx.elapsed >= INTERRUPT_SERVICE_CYCLE {
                    self.service(ctx, vector);
                }
            }
            ContextKind::Instruction => match ctx.phase {
                Phase::Fetch | Phase::Decode => {
                    let needed = descriptor(ctx.opcode).mode.operand_bytes();
                    if ctx.fetched < needed {
                        ctx.operand[ctx.fetched as usize] = self.bus.read(self.regs.pc);
                        ctx.fetched += 1;
                        self.regs.advance_pc(1);
                    }
                    if ctx.fetched >= needed {
                        self.settle(ctx);
                    }
                }
                Phase::Retire => {}
                _ => self.settle(ctx),
            },
        }
    }

    /// Runs the zero-cost phases from wherever `ctx` stands up to `Retire`.
    fn settle(&mut self, ctx: &mut ExecutionContext) {
        let desc = descriptor(ctx.opcode);
        loop {
            match ctx.phase {
                Phase::Fetch | Phase::Decode => ctx.phase = Phase::ResolveAddress,
                Phase::ResolveAddress => {
                    let resolved = resolve(desc.mode, ctx.operand, &self.regs, &self.bus);
                    ctx.effective_address = resolved.address;
                    ctx.page_crossed = resolved.page_crossed;
                    ctx.phase = Phase::Operate;
                }
                Phase::Operate => {
                    let mut exec = Exec {
                        regs: &mut self.regs,
                        bus: &mut self.bus,
                        ctx: &mut *ctx,
                        mode: desc.mode,
                        run_state: &mut self.run_state,
                        irq_vector: self.config.irq_vector,
                    };
                    (desc.handler)(&mut exec);
                    ctx.phase = Phase::UpdateFlags;
                }
                Phase::UpdateFlags => {
                    if let Some(value) = ctx.nz_result {
                        self.regs.update_nz(value);
                    }
                    let mut total = desc.base_cycles + ctx.extra_cycles;
                    if desc.page_cross_penalty
                        && ctx.page_crossed
                        && desc.mode != AddressingMode::Relative
                    {
                        total += 1;
                    }
                    if desc.decimal_penalty && self.regs.flag(DECIMAL) {
                        total += 1;
                    }
                    ctx.total = total;
                    ctx.phase = Phase::Retire;
                }
                Phase::Retire => return,
            }
        }
    }

    /// Pushes state (except for RESET), sets I, clears D and loads the vector.
    fn service(&mut self, ctx: &mut ExecutionContext, vector: InterruptVector) {
        if vector.line != Line::Reset {
            let [lo, hi] = self.regs.pc.to_le_bytes();
            self.push(hi);
            self.push(lo);
            let status = self.regs.get_status_for_push(false);
            self.push(status);
        }
        self.regs.set_flag(IRQ_DISABLE, true);
        self.regs.set_flag(DECIMAL, false);
        if vector.line == Line::Reset {
            self.run_state = RunState::Running;
        }
        self.regs.pc = self.read_word(vector.address);
        ctx.phase = Phase::Retire;
        log::debug!(
            "servicing {:?}: vector ${:04X} -> PC=${:04X}",
            vector.line,
            vector.address,
            self.regs.pc
        );
    }

    fn retire(&mut self, ctx: &mut ExecutionContext) {
        match ctx.kind {
            ContextKind::Instruction => {
                self.instructions += 1;
                log::trace!(
                    "retired {} in {} cycles, PC=${:04X}",
                    descriptor(ctx.opcode).mnemonic,
                    ctx.elapsed,
                    self.regs.pc
                );
                if self.run_state != RunState::Running {
                    log::debug!("halted: {:?}", self.run_state);
                }
            }
            ContextKind::Interrupt(_) => self.interrupts_serviced += 1,
        }
    }

    fn push(&mut self, value: u8) {
        let addr = self.regs.push_stack();
        self.bus.write(addr, value);
    }

    fn read_word(&self, addr: u16) -> u16 {
        u16::from_le_bytes([self.bus.read(addr), self.bus.read(addr.wrapping_add(1))])
    }

    /// Returns the program counter.
    pub fn pc(&self) -> u16 {
        self.regs.pc
    }

    pub fn registers(&self) -> &Registers {
        &self.regs
    }

    /// Writes a register after checking the value fits its width.
    ///
    /// # Errors
    ///
    /// Returns [`RangeError`] when `value` exceeds the register's width.
    pub fn set_register(&mut self, register: Register, value: u32) -> Result<(), RangeError> {
        self.regs.set(register, value)
    }

    pub fn config(&self) -> &CpuConfig {
        &self.config
    }

    pub fn run_state(&self) -> RunState {
        self.run_state
    }

    /// The in-flight instruction, if the last tick ended inside one.
    pub fn context(&self) -> Option<&ExecutionContext> {
        self.context.as_ref()
    }

    /// Whether no instruction or interrupt sequence is in flight.
    pub fn at_instruction_boundary(&self) -> bool {
        self.context.is_none()
    }

    /// Total cycles consumed since power-on or the last [`Cpu::reset`].
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Retired instructions.
    pub fn instructions(&self) -> u64 {
        self.instructions
    }

    /// Completed interrupt service sequences, RESET included.
    pub fn interrupts_serviced(&self) -> u64 {
        self.interrupts_serviced
    }

    /// Cycles lost to another bus master.
    pub fn stall_cycles(&self) -> u64 {
        self.stall_cycles
    }

    pub fn bus(&self) -> &M {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut M {
        &mut self.bus
    }

    /// The interrupt controller shared with peripherals.
    pub fn interrupts(&self) -> SharedInterrupts {
        Rc::clone(&self.interrupts)
    }

    /// A request-line handle for a peripheral identified by `source`.
    pub fn interrupt_line(&self, source: &str) -> InterruptLine {
        InterruptController::line(&self.interrupts, source)
    }

    /// Captures registers, run state, counters, pending lines and any
    /// in-flight instruction.
    pub fn snapshot(&self) -> CpuState {
        CpuState {
            registers: self.regs,
            run_state: self.run_state,
            cycles: self.cycles,
            instructions: self.instructions,
            interrupts_serviced: self.interrupts_serviced,
            stall_cycles: self.stall_cycles,
            pending: self.interrupts.borrow().pending_lines(),
            context: self.context,
        }
    }

    /// Replaces the CPU state with `state`.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] if the snapshot is inconsistent; the CPU is left
    /// untouched in that case.
    pub fn restore(&mut self, state: &CpuState) -> Result<(), StateError> {
        state.validate(&self.config)?;
        self.apply(state);
        Ok(())
    }

    fn apply(&mut self, state: &CpuState) {
        self.regs = state.registers;
        self.run_state = state.run_state;
        self.cycles = state.cycles;
        self.instructions = state.instructions;
        self.interrupts_serviced = state.interrupts_serviced;
        self.stall_cycles = state.stall_cycles;
        self.context = state.context;
        self.interrupts.borrow_mut().restore_lines(&state.pending);
    }
}

impl<M: MemoryBus> Device for Cpu<M> {
    fn name(&self) -> &str {
        "cpu"
    }

    fn reset(&mut self) {
        Cpu::reset(self);
    }

    fn tick(&mut self, cycles: u32) -> u32 {
        Cpu::tick(self, cycles)
    }

    /// Reads through the CPU's bus; `offset` is a full bus address.
    fn read(&self, offset: u16) -> u8 {
        self.bus.read(offset)
    }

    fn write(&mut self, offset: u16, value: u8) {
        self.bus.write(offset, value);
    }

    fn get_state(&self) -> DeviceState {
        DeviceState::Cpu(Box::new(self.snapshot()))
    }

    fn validate_state(&self, state: &DeviceState) -> Result<(), StateError> {
        match state {
            DeviceState::Cpu(cpu) => cpu.validate(&self.config),
            other => Err(StateError::DeviceMismatch {
                expected: "cpu".to_string(),
                found: other.kind().to_string(),
            }),
        }
    }

    fn set_state(&mut self, state: &DeviceState) -> Result<(), StateError> {
        self.validate_state(state)?;
        if let DeviceState::Cpu(cpu) = state {
            self.apply(cpu);
        }
        Ok(())
    }
}

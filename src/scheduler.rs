//! # Tick Scheduler
//!
//! [`System`] is the master loop: a CPU on a [`MappedMemory`] bus plus the
//! interrupt controller they share. Each scheduler tick runs in a fixed order:
//!
//! 1. The CPU consumes its cycle budget. Every effect of those cycles is
//!    applied before anything else runs.
//! 2. Every mapped device ticks for the cycles the CPU consumed, and any bus
//!    transfer advances.
//! 3. The interrupt controller is queried; a pending request is serviced by
//!    the CPU at its next instruction boundary.
//!
//! With the default quantum of one cycle the CPU and devices run in exact
//! lock-step.
//!
//! ```
//! use lib65c02::{IntervalTimer, RamDevice, RomDevice, System};
//!
//! let mut system = System::new();
//! let mut ram = RamDevice::new(0xD000);
//! ram.load_bytes(0x8000, &[0x58, 0x80, 0xFE]); // CLI; BRA *
//! system.map(0x0000, 0xCFFF, Box::new(ram)).unwrap();
//!
//! let timer = IntervalTimer::new(system.interrupt_line("timer"));
//! system.map(0xD000, 0xD003, Box::new(timer)).unwrap();
//!
//! let mut rom = vec![0xEA; 0x1000];
//! rom[0xFFC] = 0x00; // reset vector -> $8000
//! rom[0xFFD] = 0x80;
//! system.map(0xF000, 0xFFFF, Box::new(RomDevice::new(rom))).unwrap();
//!
//! system.reset();
//! assert_eq!(system.cpu().pc(), 0x8000);
//! system.run_for_cycles(100);
//! assert_eq!(system.cpu().cycles(), 100);
//! ```

use crate::config::{CpuConfig, SchedulerConfig};
use crate::cpu::{Cpu, RunState};
use crate::devices::{AddressMappingError, BusState, Device, MappedMemory, NamedDeviceState};
use crate::interrupts::{InterruptLine, SharedInterrupts};
use crate::state::CpuState;
use crate::{RangeError, StateError};
use serde::{Deserialize, Serialize};

/// Snapshot of a whole [`System`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemState {
    pub cpu: CpuState,
    pub devices: Vec<NamedDeviceState>,
    #[serde(default)]
    pub bus: BusState,
}

/// CPU, bus and interrupt controller driven as one machine.
pub struct System {
    cpu: Cpu<MappedMemory>,
    config: SchedulerConfig,
}

impl System {
    /// A system with default configuration and an empty bus.
    pub fn new() -> Self {
        Self {
            cpu: Cpu::new(MappedMemory::new()),
            config: SchedulerConfig::default(),
        }
    }

    /// # Errors
    ///
    /// Returns [`RangeError`] if either configuration fails validation.
    pub fn with_config(cpu: CpuConfig, scheduler: SchedulerConfig) -> Result<Self, RangeError> {
        scheduler.validate()?;
        Ok(Self {
            cpu: Cpu::with_config(MappedMemory::new(), cpu)?,
            config: scheduler,
        })
    }

    /// Maps a device on the bus. See [`MappedMemory::add_device`].
    pub fn map(
        &mut self,
        start: u16,
        end: u16,
        device: Box<dyn Device>,
    ) -> Result<(), AddressMappingError> {
        self.cpu.bus_mut().add_device(start, end, device)
    }

    /// Maps a device clocked once every `divider` CPU cycles.
    pub fn map_with_divider(
        &mut self,
        start: u16,
        end: u16,
        device: Box<dyn Device>,
        divider: u32,
    ) -> Result<(), AddressMappingError> {
        self.cpu
            .bus_mut()
            .add_device_with_divider(start, end, device, divider)
    }

    /// A request-line handle for a peripheral called `source`.
    pub fn interrupt_line(&self, source: &str) -> InterruptLine {
        self.cpu.interrupt_line(source)
    }

    pub fn interrupts(&self) -> SharedInterrupts {
        self.cpu.interrupts()
    }

    /// Power-on reset of the CPU and every device.
    ///
    /// Devices reset first so the CPU reads its reset vector from a settled
    /// bus.
    pub fn reset(&mut self) {
        log::info!("system reset");
        self.cpu.bus_mut().reset_devices();
        self.cpu.reset();
    }

    /// Runs one scheduler tick of `budget` cycles and returns the cycles
    /// consumed.
    ///
    /// While a bus transfer is running the CPU and devices advance one cycle
    /// at a time, so the CPU gets the bus back on the cycle the transfer ends.
    pub fn tick(&mut self, budget: u32) -> u32 {
        let mut consumed = 0;
        while consumed < budget {
            let slice = if self.cpu.bus().dma_active() {
                1
            } else {
                budget - consumed
            };
            let ran = self.cpu.tick(slice);
            self.cpu.bus_mut().tick_devices(ran);
            consumed += ran;
        }

        let interrupts = self.cpu.interrupts();
        let controller = interrupts.borrow();
        if controller.has_any() {
            log::trace!(
                "after tick: reset={} irq={:?}",
                controller.reset_pending(),
                controller.irq_sources()
            );
        }
        consumed
    }

    /// Runs `cycles` cycles in ticks of the configured quantum.
    pub fn run_for_cycles(&mut self, cycles: u64) -> u64 {
        let quantum = self.config.quantum as u64;
        let mut remaining = cycles;
        while remaining > 0 {
            let budget = remaining.min(quantum) as u32;
            remaining -= self.tick(budget) as u64;
        }
        cycles
    }

    /// Ticks one cycle at a time until the current instruction (or interrupt
    /// sequence) retires. Returns the cycles taken.
    ///
    /// Stops after a single cycle when the CPU is halted by `WAI` or `STP`,
    /// or when it is waiting at a boundary for the bus. Inside an instruction
    /// it waits out bus transfers.
    pub fn step_instruction(&mut self) -> u32 {
        let before = self.retired();
        let mut spent = 0;
        loop {
            let stalls = self.cpu.stall_cycles();
            spent += self.tick(1);
            if self.retired() != before {
                return spent;
            }
            if self.cpu.at_instruction_boundary()
                && (self.cpu.run_state() != RunState::Running || self.cpu.stall_cycles() != stalls)
            {
                return spent;
            }
        }
    }

    fn retired(&self) -> u64 {
        self.cpu.instructions() + self.cpu.interrupts_serviced()
    }

    /// See [`MappedMemory::request_mastership`].
    pub fn request_mastership(&mut self, requestor: &str) -> bool {
        self.cpu.bus_mut().request_mastership(requestor)
    }

    /// See [`MappedMemory::release_mastership`].
    pub fn release_mastership(&mut self, requestor: &str) {
        self.cpu.bus_mut().release_mastership(requestor);
    }

    pub fn bus_master(&self) -> &str {
        self.cpu.bus().bus_master()
    }

    pub fn cpu(&self) -> &Cpu<MappedMemory> {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Cpu<MappedMemory> {
        &mut self.cpu
    }

    pub fn bus(&self) -> &MappedMemory {
        self.cpu.bus()
    }

    pub fn bus_mut(&mut self) -> &mut MappedMemory {
        self.cpu.bus_mut()
    }

    pub fn snapshot(&self) -> SystemState {
        SystemState {
            cpu: self.cpu.snapshot(),
            devices: self.cpu.bus().device_states(),
            bus: self.cpu.bus().bus_state(),
        }
    }

    /// Restores a snapshot taken from a system with the same device layout.
    ///
    /// Every part is validated before anything changes, so a rejected
    /// snapshot leaves the system exactly as it was.
    pub fn restore(&mut self, state: &SystemState) -> Result<(), StateError> {
        let valid = state
            .cpu
            .validate(self.cpu.config())
            .and_then(|_| self.cpu.bus().validate_states(&state.devices, &state.bus));
        if let Err(err) = valid {
            log::warn!("rejected system state: {}", err);
            return Err(err);
        }

        self.cpu.bus_mut().restore_states(&state.devices, &state.bus)?;
        self.cpu.restore(&state.cpu)?;
        log::debug!("restored system at cycle {}", state.cpu.cycles);
        Ok(())
    }
}

impl Default for System {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::{DeviceState, DmaController, IntervalTimer, RamDevice, RomDevice};
    use crate::flags::IRQ_DISABLE;
    use crate::memory::MemoryBus;
    use crate::registers::Register;

    /// RAM below $FF00, I/O space at $FF00-$FFEF, vectors in ROM at $FFF0.
    /// RESET -> $8000, NMI and IRQ -> $9000.
    fn setup_system(program: &[u8]) -> System {
        let mut system = System::new();
        let mut ram = RamDevice::new(0xFF00);
        ram.load_bytes(0x8000, program);
        ram.load_bytes(0x9000, &[0x80, 0xFE]); // BRA *
        system.map(0x0000, 0xFEFF, Box::new(ram)).unwrap();

        let mut vectors = vec![0; 16];
        vectors[0x0A..].copy_from_slice(&[0x00, 0x90, 0x00, 0x80, 0x00, 0x90]);
        system
            .map(0xFFF0, 0xFFFF, Box::new(RomDevice::new(vectors)))
            .unwrap();
        system.reset();
        system
    }

    #[test]
    fn test_with_config_rejects_zero_quantum() {
        let result = System::with_config(CpuConfig::default(), SchedulerConfig { quantum: 0 });
        assert!(result.is_err());
    }

    #[test]
    fn test_run_for_cycles_respects_quantum() {
        let mut system =
            System::with_config(CpuConfig::default(), SchedulerConfig { quantum: 7 }).unwrap();
        system
            .map(0x0000, 0xFFFF, Box::new(RamDevice::new(0x10000)))
            .unwrap();
        assert_eq!(system.run_for_cycles(20), 20);
        assert_eq!(system.cpu().cycles(), 20);
    }

    #[test]
    fn test_step_instruction() {
        let mut system = setup_system(&[0xA9, 0x42, 0xEA]);
        assert_eq!(system.cpu().pc(), 0x8000);
        assert_eq!(system.step_instruction(), 2);
        assert_eq!(system.cpu().registers().a, 0x42);
        assert_eq!(system.step_instruction(), 2);
        assert_eq!(system.cpu().pc(), 0x8003);
    }

    #[test]
    fn test_external_master_stalls_cpu() {
        let mut system = setup_system(&[0xEA, 0xEA]);
        assert!(system.request_mastership("blitter"));
        system.tick(5);
        assert_eq!(system.cpu().pc(), 0x8000);
        assert_eq!(system.cpu().stall_cycles(), 5);

        system.release_mastership("blitter");
        system.tick(2);
        assert_eq!(system.cpu().pc(), 0x8001);
    }

    #[test]
    fn test_dma_stalls_cpu_for_transfer() {
        // STA $FF05 starts the copy
        let mut system = setup_system(&[0x8D, 0x05, 0xFF, 0xEA]);
        let dma = DmaController::new(system.interrupt_line("dma"));
        system.map(0xFF00, 0xFF05, Box::new(dma)).unwrap();
        system.bus_mut().write(0xFF01, 0x02);
        system.bus_mut().write(0xFF03, 0x03);
        system.bus_mut().write(0xFF04, 2);
        system.bus_mut().write(0x0200, 0x5A);
        system.cpu_mut().set_register(Register::A, 0x01).unwrap();

        // The store's last cycle waits for the 2-byte transfer (4 bus cycles)
        assert_eq!(system.step_instruction(), 8);
        assert_eq!(system.cpu().stall_cycles(), 4);
        assert_eq!(system.bus().read(0x0300), 0x5A);
        assert_eq!(system.bus_master(), "cpu");
    }

    #[test]
    fn test_timer_interrupt_reaches_cpu() {
        // CLI; BRA *
        let mut system = setup_system(&[0x58, 0x80, 0xFE]);
        let timer = IntervalTimer::new(system.interrupt_line("timer"));
        system.map(0xFF00, 0xFF03, Box::new(timer)).unwrap();
        system.bus_mut().write(0xFF00, 10);
        system.bus_mut().write(0xFF01, 0);
        system.bus_mut().write(0xFF02, 0x03);

        system.run_for_cycles(40);
        assert_eq!(system.cpu().interrupts_serviced(), 1);
        assert!(system.cpu().registers().flag(IRQ_DISABLE));
        assert!((0x9000..0x9002).contains(&system.cpu().pc()));
    }

    #[test]
    fn test_restore_is_all_or_nothing() {
        let mut system = setup_system(&[0xA9, 0x42]);
        let saved = system.snapshot();
        system.step_instruction();

        let mut broken = saved.clone();
        broken.devices[0].state = DeviceState::Memory { bytes: vec![0; 3] };
        assert!(system.restore(&broken).is_err());
        assert_eq!(system.cpu().registers().a, 0x42);

        system.restore(&saved).unwrap();
        assert_eq!(system.cpu().registers().a, 0x00);
        assert_eq!(system.cpu().pc(), 0x8000);
    }
}

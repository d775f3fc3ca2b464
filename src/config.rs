//! # Construction-Time Configuration
//!
//! Configuration values are built once and handed to the engine and scheduler
//! constructors. Nothing here is global: two systems in one process can run with
//! different vectors or quanta.
//!
//! Both types derive serde traits so a host can load them from whatever format
//! it likes; this crate never reads files itself.

use crate::RangeError;
use serde::{Deserialize, Serialize};

/// Default RESET vector address.
pub const RESET_VECTOR: u16 = 0xFFFC;

/// Default IRQ/BRK vector address.
pub const IRQ_VECTOR: u16 = 0xFFFE;

/// Default NMI vector address.
pub const NMI_VECTOR: u16 = 0xFFFA;

/// CPU configuration consumed by [`Cpu::with_config`](crate::Cpu::with_config).
///
/// # Examples
///
/// ```
/// use lib65c02::CpuConfig;
///
/// let config = CpuConfig::default();
/// assert_eq!(config.reset_vector, 0xFFFC);
/// assert_eq!(config.initial_s, 0xFD);
/// assert_eq!(config.initial_p, 0x34);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CpuConfig {
    /// Address of the two-byte RESET vector.
    pub reset_vector: u16,
    /// Address of the two-byte IRQ/BRK vector.
    pub irq_vector: u16,
    /// Address of the two-byte NMI vector.
    pub nmi_vector: u16,
    /// Stack pointer loaded at power-on.
    pub initial_s: u8,
    /// Status register loaded at power-on (bit 5 is forced on regardless).
    pub initial_p: u8,
}

impl Default for CpuConfig {
    fn default() -> Self {
        Self {
            reset_vector: RESET_VECTOR,
            irq_vector: IRQ_VECTOR,
            nmi_vector: NMI_VECTOR,
            initial_s: 0xFD,
            initial_p: 0x34,
        }
    }
}

impl CpuConfig {
    /// Checks that every vector leaves room for its high byte.
    ///
    /// A vector at `$FFFF` would need its high byte from `$10000`, which does
    /// not exist on a 16-bit bus.
    pub fn validate(&self) -> Result<(), RangeError> {
        for (target, value) in [
            ("reset_vector", self.reset_vector),
            ("irq_vector", self.irq_vector),
            ("nmi_vector", self.nmi_vector),
        ] {
            if value == 0xFFFF {
                return Err(RangeError::new(target, value as u32, 0xFFFE));
            }
        }
        Ok(())
    }
}

/// Scheduler configuration consumed by [`System::with_config`](crate::System::with_config).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Cycle budget granted to the CPU per scheduler tick in
    /// [`System::run_for_cycles`](crate::System::run_for_cycles).
    ///
    /// A quantum of 1 keeps the CPU and every peripheral in exact lock-step.
    /// With a larger quantum, device effects (IRQs, DMA grants) land at the
    /// end of the tick; a running DMA transfer is still stepped cycle by
    /// cycle, and the CPU only stalls for the cycles the transfer uses.
    pub quantum: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { quantum: 1 }
    }
}

impl SchedulerConfig {
    /// Rejects a zero quantum, which would stall the run loop forever.
    pub fn validate(&self) -> Result<(), RangeError> {
        if self.quantum == 0 {
            return Err(RangeError {
                target: "quantum",
                value: 0,
                min: 1,
                max: u32::MAX,
            });
        }
        Ok(())
    }
}

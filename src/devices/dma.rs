//! DMA controller peripheral.
//!
//! Programs a block copy that the bus runs while holding mastership. The
//! controller only describes the transfer; [`super::MappedMemory`] performs
//! it, one read cycle and one write cycle per byte, and stalls the CPU for
//! the duration.
//!
//! Registers:
//!
//! - 0/1: source address (low, high)
//! - 2/3: destination address (low, high)
//! - 4: length in bytes, 0 meaning 256
//! - 5: write control (bit 0 start, bit 1 IRQ on completion);
//!   read status (bit 7 busy, bit 0 done). Reading status clears `done` and
//!   the completion IRQ.

use super::{Device, DeviceState, DmaTransfer};
use crate::interrupts::InterruptLine;
use crate::StateError;
use serde::{Deserialize, Serialize};
use std::cell::Cell;

pub const CTRL_START: u8 = 0x01;
pub const CTRL_IRQ_ON_DONE: u8 = 0x02;
pub const STATUS_BUSY: u8 = 0x80;
pub const STATUS_DONE: u8 = 0x01;

/// Snapshot of a [`DmaController`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DmaState {
    pub source: u16,
    pub destination: u16,
    pub length: u8,
    pub irq_on_done: bool,
    pub busy: bool,
    pub done: bool,
}

/// Block-copy engine that borrows the bus from the CPU.
pub struct DmaController {
    source: u16,
    destination: u16,
    length: u8,
    irq_on_done: bool,
    busy: bool,
    done: Cell<bool>,
    line: InterruptLine,
}

impl DmaController {
    pub fn new(line: InterruptLine) -> Self {
        Self {
            source: 0,
            destination: 0,
            length: 0,
            irq_on_done: false,
            busy: false,
            done: Cell::new(false),
            line,
        }
    }

    pub fn busy(&self) -> bool {
        self.busy
    }

    fn transfer_length(&self) -> u16 {
        if self.length == 0 {
            256
        } else {
            self.length as u16
        }
    }
}

impl Device for DmaController {
    fn name(&self) -> &str {
        self.line.source()
    }

    fn size(&self) -> u32 {
        6
    }

    fn reset(&mut self) {
        self.source = 0;
        self.destination = 0;
        self.length = 0;
        self.irq_on_done = false;
        self.busy = false;
        self.done.set(false);
        self.line.deassert_irq();
    }

    fn read(&self, offset: u16) -> u8 {
        match offset {
            0 => self.source as u8,
            1 => (self.source >> 8) as u8,
            2 => self.destination as u8,
            3 => (self.destination >> 8) as u8,
            4 => self.length,
            5 => {
                let mut status = 0;
                if self.busy {
                    status |= STATUS_BUSY;
                }
                if self.done.get() {
                    status |= STATUS_DONE;
                }
                self.done.set(false);
                self.line.deassert_irq();
                status
            }
            _ => 0xFF,
        }
    }

    fn write(&mut self, offset: u16, value: u8) {
        match offset {
            0 => self.source = (self.source & 0xFF00) | value as u16,
            1 => self.source = (self.source & 0x00FF) | ((value as u16) << 8),
            2 => self.destination = (self.destination & 0xFF00) | value as u16,
            3 => self.destination = (self.destination & 0x00FF) | ((value as u16) << 8),
            4 => self.length = value,
            5 => {
                self.irq_on_done = value & CTRL_IRQ_ON_DONE != 0;
                if value & CTRL_START != 0 && !self.busy {
                    self.busy = true;
                    self.done.set(false);
                    log::trace!(
                        "{}: start ${:04X} -> ${:04X}",
                        self.line.source(),
                        self.source,
                        self.destination
                    );
                }
            }
            _ => {}
        }
    }

    fn get_state(&self) -> DeviceState {
        DeviceState::Dma(DmaState {
            source: self.source,
            destination: self.destination,
            length: self.length,
            irq_on_done: self.irq_on_done,
            busy: self.busy,
            done: self.done.get(),
        })
    }

    fn validate_state(&self, state: &DeviceState) -> Result<(), StateError> {
        match state {
            DeviceState::Dma(dma) if dma.busy && dma.done => Err(StateError::InvalidField {
                field: "dma.done".to_string(),
                reason: "a transfer cannot be busy and done at once".to_string(),
            }),
            DeviceState::Dma(_) => Ok(()),
            other => Err(StateError::DeviceMismatch {
                expected: "dma".to_string(),
                found: other.kind().to_string(),
            }),
        }
    }

    fn set_state(&mut self, state: &DeviceState) -> Result<(), StateError> {
        self.validate_state(state)?;
        if let DeviceState::Dma(dma) = state {
            self.source = dma.source;
            self.destination = dma.destination;
            self.length = dma.length;
            self.irq_on_done = dma.irq_on_done;
            self.busy = dma.busy;
            self.done.set(dma.done);
        }
        Ok(())
    }

    fn dma_request(&self) -> Option<DmaTransfer> {
        if self.busy {
            Some(DmaTransfer {
                source: self.source,
                destination: self.destination,
                length: self.transfer_length(),
            })
        } else {
            None
        }
    }

    fn dma_complete(&mut self) {
        self.busy = false;
        self.done.set(true);
        if self.irq_on_done {
            self.line.assert_irq();
        }
    }
}

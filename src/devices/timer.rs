//! Interval timer peripheral.
//!
//! A 16-bit down-counter that raises IRQ on underflow. Four registers:
//!
//! | Offset | Read              | Write          |
//! |--------|-------------------|----------------|
//! | 0      | counter low byte  | latch low byte |
//! | 1      | counter high byte | latch high byte|
//! | 2      | control           | control        |
//! | 3      | status (clears)   | clear status   |
//!
//! Control bits: 0 = run, 1 = IRQ enable, 2 = continuous (reload from the
//! latch on underflow instead of stopping). Status bit 7 is the underflow
//! flag; reading status acknowledges it and drops the IRQ request.

use super::{Device, DeviceState};
use crate::interrupts::InterruptLine;
use crate::StateError;
use serde::{Deserialize, Serialize};
use std::cell::Cell;

pub const CTRL_RUN: u8 = 0x01;
pub const CTRL_IRQ_ENABLE: u8 = 0x02;
pub const CTRL_CONTINUOUS: u8 = 0x04;
pub const STATUS_UNDERFLOW: u8 = 0x80;

/// Snapshot of an [`IntervalTimer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerState {
    pub latch: u16,
    pub counter: u16,
    pub control: u8,
    pub underflow: bool,
}

/// Countdown timer wired to an IRQ source.
///
/// # Examples
///
/// ```rust
/// use lib65c02::{Device, InterruptController, IntervalTimer};
///
/// let interrupts = InterruptController::shared();
/// let mut timer = IntervalTimer::new(InterruptController::line(&interrupts, "timer"));
///
/// timer.write(0, 2); // latch = $0002
/// timer.write(1, 0);
/// timer.write(2, 0x03); // run, IRQ enabled
/// timer.tick(3); // 2, 1, 0, underflow
/// assert!(interrupts.borrow().is_pending(false));
///
/// assert_eq!(timer.read(3) & 0x80, 0x80); // acknowledges
/// assert!(!interrupts.borrow().is_pending(false));
/// ```
pub struct IntervalTimer {
    latch: u16,
    counter: u16,
    control: u8,
    underflow: Cell<bool>,
    line: InterruptLine,
}

impl IntervalTimer {
    pub fn new(line: InterruptLine) -> Self {
        Self {
            latch: 0xFFFF,
            counter: 0xFFFF,
            control: 0,
            underflow: Cell::new(false),
            line,
        }
    }

    fn running(&self) -> bool {
        self.control & CTRL_RUN != 0
    }

    /// One timer clock.
    fn clock(&mut self) {
        if !self.running() {
            return;
        }
        if self.counter > 0 {
            self.counter -= 1;
            return;
        }

        self.underflow.set(true);
        if self.control & CTRL_IRQ_ENABLE != 0 {
            self.line.assert_irq();
        }
        self.counter = self.latch;
        if self.control & CTRL_CONTINUOUS == 0 {
            self.control &= !CTRL_RUN;
        }
    }

    fn acknowledge(&self) {
        self.underflow.set(false);
        self.line.deassert_irq();
    }
}

impl Device for IntervalTimer {
    fn name(&self) -> &str {
        self.line.source()
    }

    fn size(&self) -> u32 {
        4
    }

    fn reset(&mut self) {
        self.latch = 0xFFFF;
        self.counter = 0xFFFF;
        self.control = 0;
        self.acknowledge();
    }

    fn tick(&mut self, cycles: u32) -> u32 {
        for _ in 0..cycles {
            self.clock();
        }
        cycles
    }

    fn read(&self, offset: u16) -> u8 {
        match offset {
            0 => self.counter as u8,
            1 => (self.counter >> 8) as u8,
            2 => self.control,
            3 => {
                let status = if self.underflow.get() { STATUS_UNDERFLOW } else { 0 };
                self.acknowledge();
                status
            }
            _ => 0xFF,
        }
    }

    fn write(&mut self, offset: u16, value: u8) {
        match offset {
            0 => self.latch = (self.latch & 0xFF00) | value as u16,
            1 => self.latch = (self.latch & 0x00FF) | ((value as u16) << 8),
            2 => {
                let starting = value & CTRL_RUN != 0 && !self.running();
                self.control = value & (CTRL_RUN | CTRL_IRQ_ENABLE | CTRL_CONTINUOUS);
                if starting {
                    self.counter = self.latch;
                }
            }
            3 => self.acknowledge(),
            _ => {}
        }
    }

    fn get_state(&self) -> DeviceState {
        DeviceState::Timer(TimerState {
            latch: self.latch,
            counter: self.counter,
            control: self.control,
            underflow: self.underflow.get(),
        })
    }

    fn validate_state(&self, state: &DeviceState) -> Result<(), StateError> {
        match state {
            DeviceState::Timer(timer) => {
                if timer.control & !(CTRL_RUN | CTRL_IRQ_ENABLE | CTRL_CONTINUOUS) != 0 {
                    return Err(StateError::InvalidField {
                        field: "timer.control".to_string(),
                        reason: "undefined control bits set".to_string(),
                    });
                }
                Ok(())
            }
            other => Err(StateError::DeviceMismatch {
                expected: "timer".to_string(),
                found: other.kind().to_string(),
            }),
        }
    }

    fn set_state(&mut self, state: &DeviceState) -> Result<(), StateError> {
        self.validate_state(state)?;
        if let DeviceState::Timer(timer) = state {
            self.latch = timer.latch;
            self.counter = timer.counter;
            self.control = timer.control;
            self.underflow.set(timer.underflow);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interrupts::{InterruptController, SharedInterrupts};

    fn setup_timer(latch: u16, control: u8) -> (IntervalTimer, SharedInterrupts) {
        let interrupts = InterruptController::shared();
        let mut timer = IntervalTimer::new(InterruptController::line(&interrupts, "timer"));
        timer.write(0, latch as u8);
        timer.write(1, (latch >> 8) as u8);
        timer.write(2, control);
        (timer, interrupts)
    }

    #[test]
    fn test_one_shot_stops_after_underflow() {
        let (mut timer, interrupts) = setup_timer(1, CTRL_RUN);
        timer.tick(2);
        assert_eq!(timer.read(2) & CTRL_RUN, 0);
        // IRQ not enabled
        assert!(!interrupts.borrow().has_any());
        assert_eq!(timer.read(3), STATUS_UNDERFLOW);
        assert_eq!(timer.read(3), 0);
    }

    #[test]
    fn test_continuous_reloads() {
        let (mut timer, interrupts) = setup_timer(3, CTRL_RUN | CTRL_CONTINUOUS | CTRL_IRQ_ENABLE);
        timer.tick(4);
        assert!(interrupts.borrow().has_any());
        assert_eq!(timer.read(0), 3);

        timer.write(3, 0);
        assert!(!interrupts.borrow().has_any());
        timer.tick(4);
        assert_eq!(interrupts.borrow().irq_sources(), vec!["timer".to_string()]);
    }

    #[test]
    fn test_reset_drops_request() {
        let (mut timer, interrupts) = setup_timer(0, CTRL_RUN | CTRL_IRQ_ENABLE);
        timer.tick(1);
        assert!(interrupts.borrow().has_any());
        timer.reset();
        assert!(!interrupts.borrow().has_any());
        assert_eq!(timer.read(2), 0);
    }

    #[test]
    fn test_state_rejects_unknown_control_bits() {
        let (mut timer, _) = setup_timer(5, 0);
        let state = DeviceState::Timer(TimerState {
            latch: 1,
            counter: 1,
            control: 0x80,
            underflow: false,
        });
        assert!(timer.set_state(&state).is_err());
        assert_eq!(timer.read(0), 0xFF);
    }
}

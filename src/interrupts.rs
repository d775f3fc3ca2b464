//! # Interrupt Controller
//!
//! Tracks the three request lines of the 65C02S and decides which one the
//! engine services next.
//!
//! ## Line Semantics
//!
//! - **RESET**: single pending flag, highest priority, cleared on acknowledge
//! - **NMI**: edge-triggered; an assert while the line is already high is not
//!   a new edge. The pending edge clears on acknowledge.
//! - **IRQ**: level-sensitive and shared. Each source asserts under its own id;
//!   the line is active while any source holds it. Acknowledging does not
//!   clear sources: the device that raised the request clears it, typically
//!   when the service routine touches its status register.
//!
//! Priority is fixed: RESET > NMI > IRQ, and IRQ only when the I flag is clear.
//!
//! ## Sharing
//!
//! The controller is shared between the engine and peripherals as
//! [`SharedInterrupts`]. Peripherals receive an [`InterruptLine`] handle
//! carrying their source id; they can raise and drop requests but never touch
//! the engine's registers.
//!
//! ```
//! use lib65c02::{InterruptController, Line};
//!
//! let shared = InterruptController::shared();
//! let timer = InterruptController::line(&shared, "timer");
//!
//! timer.assert_irq();
//! assert!(shared.borrow().is_pending(false));
//! // With I set, IRQ is masked
//! assert!(!shared.borrow().is_pending(true));
//!
//! shared.borrow_mut().assert_nmi();
//! let vector = shared.borrow_mut().acknowledge(false).unwrap();
//! assert_eq!(vector.line, Line::Nmi);
//! assert_eq!(vector.address, 0xFFFA);
//! ```

use crate::config::CpuConfig;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::{BTreeSet, VecDeque};
use std::rc::Rc;

/// Number of acknowledgements kept in the history ring.
pub const HISTORY_LIMIT: usize = 1000;

/// Source id used for requests made without a named peripheral.
pub const ANONYMOUS_SOURCE: &str = "external";

/// The controller as shared between the engine and peripherals.
pub type SharedInterrupts = Rc<RefCell<InterruptController>>;

/// An interrupt request line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Line {
    Reset,
    Nmi,
    Irq,
}

/// The line being serviced and the vector address to load PC from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterruptVector {
    pub address: u16,
    pub line: Line,
}

/// One acknowledged interrupt, kept for inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterruptRecord {
    /// Position in the acknowledgement sequence, starting at 0.
    pub sequence: u64,
    pub vector: InterruptVector,
    /// IRQ sources holding the line when it was acknowledged.
    pub irq_sources: Vec<String>,
}

/// Pending-line snapshot, as stored in CPU state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingLines {
    pub reset: bool,
    pub nmi: bool,
    /// Current NMI line level; a new edge needs the line to drop first.
    pub nmi_line: bool,
    pub irq_sources: Vec<String>,
}

/// Per-line acknowledgement counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InterruptStats {
    pub reset: u64,
    pub nmi: u64,
    pub irq: u64,
}

/// Interrupt request tracking and priority resolution.
#[derive(Debug)]
pub struct InterruptController {
    reset_pending: bool,
    nmi_pending: bool,
    nmi_line: bool,
    irq_sources: BTreeSet<String>,
    reset_vector: u16,
    nmi_vector: u16,
    irq_vector: u16,
    stats: InterruptStats,
    history: VecDeque<InterruptRecord>,
    sequence: u64,
}

impl Default for InterruptController {
    fn default() -> Self {
        Self::new(&CpuConfig::default())
    }
}

impl InterruptController {
    /// Creates a controller using the vector addresses from `config`.
    pub fn new(config: &CpuConfig) -> Self {
        Self {
            reset_pending: false,
            nmi_pending: false,
            nmi_line: false,
            irq_sources: BTreeSet::new(),
            reset_vector: config.reset_vector,
            nmi_vector: config.nmi_vector,
            irq_vector: config.irq_vector,
            stats: InterruptStats::default(),
            history: VecDeque::new(),
            sequence: 0,
        }
    }

    /// A shareable controller with the default vectors.
    pub fn shared() -> SharedInterrupts {
        Rc::new(RefCell::new(Self::default()))
    }

    /// A peripheral handle on `shared` that raises requests as `source`.
    pub fn line(shared: &SharedInterrupts, source: &str) -> InterruptLine {
        InterruptLine {
            controller: Rc::clone(shared),
            source: source.to_string(),
        }
    }

    /// Raises `line` on behalf of `source_id`.
    ///
    /// IRQ requests are keyed by source; NMI and RESET ignore the id.
    pub fn assert(&mut self, source_id: &str, line: Line) {
        match line {
            Line::Irq => {
                if self.irq_sources.insert(source_id.to_string()) {
                    log::trace!("IRQ asserted by {}", source_id);
                }
            }
            Line::Nmi => self.assert_nmi(),
            Line::Reset => self.assert_reset(),
        }
    }

    /// Drops `line` on behalf of `source_id`.
    ///
    /// For IRQ this removes only that source. For NMI it lowers the line level
    /// so the next assert is a fresh edge. For RESET it withdraws a pending
    /// reset that has not yet been serviced.
    pub fn deassert(&mut self, source_id: &str, line: Line) {
        match line {
            Line::Irq => {
                if self.irq_sources.remove(source_id) {
                    log::trace!("IRQ released by {}", source_id);
                }
            }
            Line::Nmi => self.deassert_nmi(),
            Line::Reset => self.reset_pending = false,
        }
    }

    /// Raises the NMI line. Only a low-to-high transition latches a request.
    pub fn assert_nmi(&mut self) {
        if !self.nmi_line {
            self.nmi_pending = true;
        }
        self.nmi_line = true;
    }

    /// Lowers the NMI line, arming the next edge.
    pub fn deassert_nmi(&mut self) {
        self.nmi_line = false;
    }

    /// Latches a RESET request.
    pub fn assert_reset(&mut self) {
        self.reset_pending = true;
    }

    /// Whether a line the engine would act on is active.
    ///
    /// `irq_disabled` is the engine's I flag; it masks IRQ only.
    pub fn is_pending(&self, irq_disabled: bool) -> bool {
        self.reset_pending || self.nmi_pending || (!irq_disabled && !self.irq_sources.is_empty())
    }

    /// Whether any line is active, masked or not. `WAI` wakes on this.
    pub fn has_any(&self) -> bool {
        self.is_pending(false)
    }

    /// Whether a RESET is latched. `STP` wakes only on this.
    pub fn reset_pending(&self) -> bool {
        self.reset_pending
    }

    /// Selects the highest-priority eligible line and returns its vector.
    ///
    /// RESET and the NMI edge are consumed; IRQ sources stay asserted.
    /// Returns `None` when nothing eligible is pending.
    pub fn acknowledge(&mut self, irq_disabled: bool) -> Option<InterruptVector> {
        let vector = if self.reset_pending {
            self.reset_pending = false;
            self.stats.reset += 1;
            InterruptVector {
                address: self.reset_vector,
                line: Line::Reset,
            }
        } else if self.nmi_pending {
            self.nmi_pending = false;
            self.stats.nmi += 1;
            InterruptVector {
                address: self.nmi_vector,
                line: Line::Nmi,
            }
        } else if !irq_disabled && !self.irq_sources.is_empty() {
            self.stats.irq += 1;
            InterruptVector {
                address: self.irq_vector,
                line: Line::Irq,
            }
        } else {
            return None;
        };

        self.record(vector);
        Some(vector)
    }

    /// Ids of sources currently holding IRQ, in sorted order.
    pub fn irq_sources(&self) -> Vec<String> {
        self.irq_sources.iter().cloned().collect()
    }

    /// Snapshot of every line's state.
    pub fn pending_lines(&self) -> PendingLines {
        PendingLines {
            reset: self.reset_pending,
            nmi: self.nmi_pending,
            nmi_line: self.nmi_line,
            irq_sources: self.irq_sources(),
        }
    }

    /// Replaces every line's state with `lines`.
    pub fn restore_lines(&mut self, lines: &PendingLines) {
        self.reset_pending = lines.reset;
        self.nmi_pending = lines.nmi;
        self.nmi_line = lines.nmi_line;
        self.irq_sources = lines.irq_sources.iter().cloned().collect();
    }

    /// Drops every request, leaving statistics and history alone.
    pub fn clear_all(&mut self) {
        self.reset_pending = false;
        self.nmi_pending = false;
        self.nmi_line = false;
        self.irq_sources.clear();
    }

    pub fn stats(&self) -> InterruptStats {
        self.stats
    }

    /// Acknowledgement history, oldest first, at most [`HISTORY_LIMIT`] entries.
    pub fn history(&self) -> impl Iterator<Item = &InterruptRecord> {
        self.history.iter()
    }

    fn record(&mut self, vector: InterruptVector) {
        if self.history.len() == HISTORY_LIMIT {
            self.history.pop_front();
        }
        self.history.push_back(InterruptRecord {
            sequence: self.sequence,
            vector,
            irq_sources: self.irq_sources(),
        });
        self.sequence += 1;
        log::debug!(
            "acknowledged {:?} -> vector ${:04X}",
            vector.line,
            vector.address
        );
    }
}

/// Handle a peripheral uses to raise and drop requests under its own id.
#[derive(Debug, Clone)]
pub struct InterruptLine {
    controller: SharedInterrupts,
    source: String,
}

impl InterruptLine {
    /// The id this handle asserts under.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn assert_irq(&self) {
        self.controller.borrow_mut().assert(&self.source, Line::Irq);
    }

    pub fn deassert_irq(&self) {
        self.controller.borrow_mut().deassert(&self.source, Line::Irq);
    }

    /// Raises NMI; call [`deassert_nmi`](Self::deassert_nmi) before the next edge.
    pub fn assert_nmi(&self) {
        self.controller.borrow_mut().assert_nmi();
    }

    pub fn deassert_nmi(&self) {
        self.controller.borrow_mut().deassert_nmi();
    }

    /// Raises and drops NMI. Latches one request and leaves the line ready
    /// for the next pulse.
    pub fn pulse_nmi(&self) {
        let mut controller = self.controller.borrow_mut();
        controller.assert_nmi();
        controller.deassert_nmi();
    }

    pub fn assert_reset(&self) {
        self.controller.borrow_mut().assert_reset();
    }

    /// Whether this handle's source currently holds IRQ.
    pub fn irq_asserted(&self) -> bool {
        self.controller.borrow().irq_sources.contains(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_reset_nmi_irq() {
        let mut ic = InterruptController::default();
        ic.assert("a", Line::Irq);
        ic.assert_nmi();
        ic.assert_reset();

        assert_eq!(ic.acknowledge(false).unwrap().line, Line::Reset);
        assert_eq!(ic.acknowledge(false).unwrap().line, Line::Nmi);
        let irq = ic.acknowledge(false).unwrap();
        assert_eq!(irq.line, Line::Irq);
        assert_eq!(irq.address, 0xFFFE);
    }

    #[test]
    fn test_irq_masked_by_i_flag() {
        let mut ic = InterruptController::default();
        ic.assert("timer", Line::Irq);
        assert!(!ic.is_pending(true));
        assert!(ic.has_any());
        assert!(ic.acknowledge(true).is_none());
        assert!(ic.acknowledge(false).is_some());
    }

    #[test]
    fn test_irq_level_survives_acknowledge() {
        let mut ic = InterruptController::default();
        ic.assert("via", Line::Irq);
        ic.acknowledge(false);
        assert!(ic.is_pending(false));
        ic.deassert("via", Line::Irq);
        assert!(!ic.is_pending(false));
    }

    #[test]
    fn test_irq_sources_are_a_set() {
        let mut ic = InterruptController::default();
        ic.assert("a", Line::Irq);
        ic.assert("a", Line::Irq);
        ic.assert("b", Line::Irq);
        ic.deassert("a", Line::Irq);
        assert!(ic.is_pending(false));
        assert_eq!(ic.irq_sources(), vec!["b".to_string()]);
        ic.deassert("b", Line::Irq);
        assert!(!ic.is_pending(false));
    }

    #[test]
    fn test_nmi_needs_new_edge() {
        let mut ic = InterruptController::default();
        ic.assert_nmi();
        assert_eq!(ic.acknowledge(true).unwrap().line, Line::Nmi);

        // Line still high: no new edge
        ic.assert_nmi();
        assert!(ic.acknowledge(true).is_none());

        ic.deassert_nmi();
        ic.assert_nmi();
        assert_eq!(ic.acknowledge(true).unwrap().line, Line::Nmi);
    }

    #[test]
    fn test_custom_vectors() {
        let config = CpuConfig {
            irq_vector: 0x1000,
            ..CpuConfig::default()
        };
        let mut ic = InterruptController::new(&config);
        ic.assert(ANONYMOUS_SOURCE, Line::Irq);
        assert_eq!(ic.acknowledge(false).unwrap().address, 0x1000);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut ic = InterruptController::default();
        for _ in 0..(HISTORY_LIMIT + 5) {
            ic.assert_reset();
            ic.acknowledge(true);
        }
        assert_eq!(ic.history().count(), HISTORY_LIMIT);
        assert_eq!(ic.history().next().unwrap().sequence, 5);
        assert_eq!(ic.stats().reset, (HISTORY_LIMIT + 5) as u64);
    }

    #[test]
    fn test_line_handle() {
        let shared = InterruptController::shared();
        let line = InterruptController::line(&shared, "uart");
        line.assert_irq();
        assert!(line.irq_asserted());
        assert_eq!(shared.borrow().irq_sources(), vec!["uart".to_string()]);
        line.deassert_irq();
        assert!(!line.irq_asserted());
    }

    #[test]
    fn test_restore_lines_round_trip() {
        let mut ic = InterruptController::default();
        ic.assert("x", Line::Irq);
        ic.assert_nmi();
        let lines = ic.pending_lines();

        let mut other = InterruptController::default();
        other.restore_lines(&lines);
        assert_eq!(other.pending_lines(), lines);
    }
}

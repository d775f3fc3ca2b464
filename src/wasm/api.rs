//! WASM API for the 65C02S emulator.
//!
//! Provides JavaScript-callable interfaces for CPU control, interrupt lines,
//! memory access and state export/import.

use crate::flags::{CARRY, DECIMAL, IRQ_DISABLE, NEGATIVE, OVERFLOW, ZERO};
use crate::{InterruptLine, MemoryBus, RamDevice, Register, System, SystemState};
use wasm_bindgen::prelude::*;

/// Source name of the IRQ line driven from JavaScript.
const EXTERNAL_SOURCE: &str = "external";

/// JavaScript-compatible error wrapper
#[wasm_bindgen]
#[derive(Debug, Clone)]
pub struct JsError {
    message: String,
}

#[wasm_bindgen]
impl JsError {
    #[wasm_bindgen(constructor)]
    pub fn new(message: &str) -> JsError {
        JsError {
            message: message.to_string(),
        }
    }

    #[wasm_bindgen(getter)]
    pub fn message(&self) -> String {
        self.message.clone()
    }
}

/// Main emulator interface for JavaScript
///
/// A 65C02S with 64KB of RAM mapped across the whole address space. Programs
/// are loaded with [`Emulator65C02::load_program`], which also points the
/// reset vector at them.
#[wasm_bindgen]
pub struct Emulator65C02 {
    system: System,
    external: InterruptLine,
    on_interrupt: Option<js_sys::Function>,
}

#[wasm_bindgen]
impl Emulator65C02 {
    /// Create a new emulator. `on_interrupt`, when given, is called with the
    /// new PC each time the CPU enters an interrupt handler.
    #[wasm_bindgen(constructor)]
    pub fn new(on_interrupt: Option<js_sys::Function>) -> Result<Emulator65C02, JsError> {
        let mut system = System::new();
        system
            .map(0x0000, 0xFFFF, Box::new(RamDevice::new(0x10000)))
            .map_err(|e| JsError::new(&e.to_string()))?;
        let external = system.interrupt_line(EXTERNAL_SOURCE);
        system.reset();

        Ok(Emulator65C02 {
            system,
            external,
            on_interrupt,
        })
    }

    /// Execute a single instruction and return the cycles it took
    pub fn step(&mut self) -> u32 {
        let before = self.system.cpu().interrupts_serviced();
        let cycles = self.system.step_instruction();
        self.notify(before);
        cycles
    }

    /// Run one scheduler tick of `budget` cycles
    pub fn tick(&mut self, budget: u32) -> u32 {
        let before = self.system.cpu().interrupts_serviced();
        let cycles = self.system.tick(budget);
        self.notify(before);
        cycles
    }

    /// Execute multiple cycles and return the cycles executed
    pub fn run_for_cycles(&mut self, cycles: u32) -> u32 {
        let before = self.system.cpu().interrupts_serviced();
        let ran = self.system.run_for_cycles(cycles as u64);
        self.notify(before);
        ran as u32
    }

    /// Power-on reset. RAM contents survive.
    pub fn reset(&mut self) {
        self.system.reset();
    }

    fn notify(&self, before: u64) {
        let Some(callback) = &self.on_interrupt else {
            return;
        };
        if self.system.cpu().interrupts_serviced() > before {
            let pc = JsValue::from(self.system.cpu().pc());
            let _ = callback.call1(&JsValue::NULL, &pc);
        }
    }

    // Register getters
    #[wasm_bindgen(getter)]
    pub fn a(&self) -> u8 {
        self.system.cpu().registers().a
    }

    #[wasm_bindgen(getter)]
    pub fn x(&self) -> u8 {
        self.system.cpu().registers().x
    }

    #[wasm_bindgen(getter)]
    pub fn y(&self) -> u8 {
        self.system.cpu().registers().y
    }

    #[wasm_bindgen(getter)]
    pub fn pc(&self) -> u16 {
        self.system.cpu().pc()
    }

    #[wasm_bindgen(getter)]
    pub fn s(&self) -> u8 {
        self.system.cpu().registers().s
    }

    #[wasm_bindgen(getter)]
    pub fn p(&self) -> u8 {
        self.system.cpu().registers().p
    }

    #[wasm_bindgen(getter)]
    pub fn cycles(&self) -> f64 {
        self.system.cpu().cycles() as f64 // Convert u64 to f64 for JavaScript
    }

    #[wasm_bindgen(getter)]
    pub fn instructions(&self) -> f64 {
        self.system.cpu().instructions() as f64
    }

    // Flag getters
    #[wasm_bindgen(getter)]
    pub fn flag_n(&self) -> bool {
        self.system.cpu().registers().flag(NEGATIVE)
    }

    #[wasm_bindgen(getter)]
    pub fn flag_v(&self) -> bool {
        self.system.cpu().registers().flag(OVERFLOW)
    }

    #[wasm_bindgen(getter)]
    pub fn flag_d(&self) -> bool {
        self.system.cpu().registers().flag(DECIMAL)
    }

    #[wasm_bindgen(getter)]
    pub fn flag_i(&self) -> bool {
        self.system.cpu().registers().flag(IRQ_DISABLE)
    }

    #[wasm_bindgen(getter)]
    pub fn flag_z(&self) -> bool {
        self.system.cpu().registers().flag(ZERO)
    }

    #[wasm_bindgen(getter)]
    pub fn flag_c(&self) -> bool {
        self.system.cpu().registers().flag(CARRY)
    }

    /// Set the program counter
    pub fn set_pc(&mut self, addr: u16) -> Result<(), JsError> {
        self.system
            .cpu_mut()
            .set_register(Register::Pc, addr as u32)
            .map_err(|e| JsError::new(&e.to_string()))
    }

    // Interrupt lines

    /// Hold the external IRQ line low
    pub fn assert_irq(&mut self) {
        self.external.assert_irq();
    }

    /// Release the external IRQ line
    pub fn deassert_irq(&mut self) {
        self.external.deassert_irq();
    }

    /// Pulse NMI. Each call latches one request.
    pub fn assert_nmi(&mut self) {
        self.external.pulse_nmi();
    }

    // Memory access methods

    /// Read a single byte from memory
    pub fn read_memory(&self, addr: u16) -> u8 {
        self.system.bus().read(addr)
    }

    /// Write a single byte to memory
    pub fn write_memory(&mut self, addr: u16, value: u8) {
        self.system.bus_mut().write(addr, value);
    }

    /// Read a 256-byte page from memory (for efficient display)
    pub fn get_memory_page(&self, page: u8) -> Vec<u8> {
        let start = (page as u16) << 8;
        (0..256)
            .map(|i| self.system.bus().read(start + i))
            .collect()
    }

    /// Load a program, point the reset vector at it and set PC
    pub fn load_program(&mut self, program: &[u8], start_addr: u16) -> Result<(), JsError> {
        for (i, &byte) in program.iter().enumerate() {
            let addr = start_addr.wrapping_add(i as u16);
            self.system.bus_mut().write(addr, byte);
        }
        let reset_vector = self.system.cpu().config().reset_vector;
        self.system.bus_mut().write(reset_vector, start_addr as u8);
        self.system
            .bus_mut()
            .write(reset_vector.wrapping_add(1), (start_addr >> 8) as u8);
        self.set_pc(start_addr)
    }

    // State

    /// Serialize the whole machine to JSON
    pub fn export_state(&self) -> Result<String, JsError> {
        serde_json::to_string(&self.system.snapshot()).map_err(|e| JsError::new(&e.to_string()))
    }

    /// Restore a machine exported by [`Emulator65C02::export_state`]. A
    /// rejected state leaves the emulator untouched.
    pub fn import_state(&mut self, json: &str) -> Result<(), JsError> {
        let state: SystemState =
            serde_json::from_str(json).map_err(|e| JsError::new(&e.to_string()))?;
        self.system
            .restore(&state)
            .map_err(|e| JsError::new(&e.to_string()))
    }
}

//! WebAssembly bindings for the lib65c02 emulator.
//!
//! This module exposes the CPU core and its scheduler to JavaScript, so a
//! browser page can drive a 65C02S machine and inspect it between ticks.

#[cfg(feature = "wasm")]
pub mod api;

#[cfg(feature = "wasm")]
pub use api::Emulator65C02;

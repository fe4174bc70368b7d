//! Userspace driver for the TI ADS1115 16-bit delta-sigma ADC.
//!
//! The ADS1115 sits on an I2C bus shared with other peripherals and exposes
//! a single converter behind an input multiplexer. This crate cycles through
//! six mux configurations round-robin, one single-shot conversion at a time,
//! driven by a periodic tick from the hosting thread. Ticks never block: bus
//! contention, an unfinished conversion, or a transient transfer failure all
//! abandon the tick and leave the sequencing intact for the next one.
//!
//! Converted readings (millivolts) land in a lock-free [`SampleStore`] that
//! a consumer thread can copy out at any time.

mod bit_mappings;
mod driver;
mod store;

pub use bit_mappings::*;
pub use driver::*;
pub use store::*;

//! # LadderRemote
//!
//! Self-calibrating emulator for a resistive-ladder wired remote control.
//!
//! ## Architecture
//!
//! The core is pure logic with no hardware dependencies:
//! - [`classify`] turns a sensed voltage into a button slot
//! - [`calibrate`] learns the per-slot voltage fingerprint and output levels
//! - [`config`] owns the calibration record and its persisted image
//! - [`dispatch`] routes recognized presses to the pulse emitter
//!
//! All hardware access goes through the [`LadderIo`] trait. The ESP-IDF
//! implementation lives in [`hal`]; host tests use the scripted [`SimIo`]
//! simulator. There is exactly one thread of control: every wait is a
//! polling loop that exits only on its physical condition.

#![cfg_attr(not(test), no_std)]

pub mod calibrate;
pub mod classify;
pub mod config;
pub mod dispatch;
pub mod emit;
pub mod io;
pub mod sample;

#[cfg(target_os = "espidf")]
pub mod hal;

pub use calibrate::{run_calibration, ActionSource, CalibrationOptions};
pub use classify::{classify, decode_slot, match_tolerance};
pub use config::{ActionTable, CalibrationRecord, StoreError, TriggerTable, WireAssignment};
pub use dispatch::dispatch_cycle;
pub use emit::{send_pulse, ReleasePolicy};
pub use io::{LadderIo, SimIo, SimStep};
pub use sample::{sample_to_voltage, ButtonSlot, InputFrame, Wire};

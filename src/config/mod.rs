//! Module: config
//!
//! Purpose: the calibration record, the single source of truth for
//! runtime classification, and its persistence.
//!
//! Architecture:
//! - `mod.rs`: record types (triggers, actions, wire assignment)
//! - `layout.rs`: fixed-offset persisted image over a byte-addressed store
//! - `nvs.rs`: ESP NVS backend (stubs off-target)
//!
//! Ownership: the dispatch loop holds a read-only view of the record for
//! the life of the process; only the calibration state machine constructs
//! one, and only it writes the store.

pub mod layout;
pub mod nvs;

use crate::sample::{ButtonSlot, Wire};

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::EspError;

/// Number of button slots.
pub const SLOT_COUNT: usize = ButtonSlot::COUNT;

/// Slots carried by each sense wire.
pub const SLOTS_PER_WIRE: usize = 4;

/// Learned trigger voltage per slot.
///
/// Slots 0..3 belong to wire A, 4..7 to wire B. Within one wire the four
/// values must decrease monotonically by index for the contiguous-range
/// classifier to be unambiguous; a table violating that is a calibration
/// defect, not checked at runtime.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct TriggerTable([f32; SLOT_COUNT]);

impl TriggerTable {
    /// Table from explicit per-slot voltages.
    pub const fn new(volts: [f32; SLOT_COUNT]) -> Self {
        Self(volts)
    }

    /// Trigger voltage for one slot.
    #[inline]
    pub fn get(&self, slot: ButtonSlot) -> f32 {
        self.0[slot.index()]
    }

    /// Record a learned trigger voltage.
    #[inline]
    pub fn set(&mut self, slot: ButtonSlot, volts: f32) {
        self.0[slot.index()] = volts;
    }

    /// The four triggers owned by one wire, in slot order.
    pub fn for_wire(&self, wire: Wire) -> [f32; SLOTS_PER_WIRE] {
        let base = wire.slot_offset();
        [
            self.0[base],
            self.0[base + 1],
            self.0[base + 2],
            self.0[base + 3],
        ]
    }

    /// All eight triggers in slot order.
    #[inline]
    pub fn values(&self) -> &[f32; SLOT_COUNT] {
        &self.0
    }
}

/// Output level per slot, in volts on the emulated line.
///
/// Either fixed at build time or learned during calibration; one code path
/// consumes both (see `calibrate::ActionSource`).
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct ActionTable([f32; SLOT_COUNT]);

impl ActionTable {
    /// Table from explicit per-slot levels.
    pub const fn new(volts: [f32; SLOT_COUNT]) -> Self {
        Self(volts)
    }

    /// Output level for one slot.
    #[inline]
    pub fn level(&self, slot: ButtonSlot) -> f32 {
        self.0[slot.index()]
    }

    /// Record a learned output level.
    #[inline]
    pub fn set_level(&mut self, slot: ButtonSlot, volts: f32) {
        self.0[slot.index()] = volts;
    }
}

/// Which wire produced each slot's trigger during calibration.
///
/// Packed bitmap, one bit per slot: clear = wire A, set = wire B.
/// Immutable after calibration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct WireAssignment(u8);

impl WireAssignment {
    /// Assignment from a packed bitmap.
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    /// Packed bitmap value.
    #[inline]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Wire that fired for the slot during calibration.
    #[inline]
    pub fn wire_for(self, slot: ButtonSlot) -> Wire {
        if self.0 & (1 << slot.index()) != 0 {
            Wire::B
        } else {
            Wire::A
        }
    }

    /// Record the wire a slot was captured on.
    pub fn assign(&mut self, slot: ButtonSlot, wire: Wire) {
        let mask = 1 << slot.index();
        match wire {
            Wire::A => self.0 &= !mask,
            Wire::B => self.0 |= mask,
        }
    }
}

/// The full calibration state: floor threshold, trigger fingerprint,
/// output levels and wire assignment.
///
/// Created by the calibration state machine, read-only everywhere else.
/// The action levels are not part of the persisted image; `layout::load`
/// rebuilds the record around the caller's table.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CalibrationRecord {
    /// Idle floor voltage; readings at or below never classify.
    pub floor: f32,
    /// Per-slot trigger voltages.
    pub triggers: TriggerTable,
    /// Per-slot output levels.
    pub actions: ActionTable,
    /// Per-slot capture wire.
    pub wires: WireAssignment,
}

/// Persistence errors.
#[derive(Debug)]
pub enum StoreError {
    /// Read or write outside the record image.
    OutOfBounds,
    /// Backing storage rejected the operation.
    Backend,
    /// NVS layer error.
    #[cfg(target_os = "espidf")]
    Nvs(EspError),
    /// No persistent backend on this platform.
    #[cfg(not(target_os = "espidf"))]
    NotAvailable,
}

impl core::fmt::Display for StoreError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::OutOfBounds => write!(f, "access outside the record image"),
            Self::Backend => write!(f, "backing storage failure"),
            #[cfg(target_os = "espidf")]
            Self::Nvs(e) => write!(f, "NVS error: {}", e),
            #[cfg(not(target_os = "espidf"))]
            Self::NotAvailable => write!(f, "persistent storage not available"),
        }
    }
}

#[cfg(target_os = "espidf")]
impl From<EspError> for StoreError {
    fn from(e: EspError) -> Self {
        StoreError::Nvs(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_table_per_wire_split() {
        let t = TriggerTable::new([8.0, 7.0, 6.0, 5.0, 4.0, 3.0, 2.0, 1.0]);
        assert_eq!(t.for_wire(Wire::A), [8.0, 7.0, 6.0, 5.0]);
        assert_eq!(t.for_wire(Wire::B), [4.0, 3.0, 2.0, 1.0]);
        assert_eq!(t.get(ButtonSlot::Mute), 2.0);
    }

    #[test]
    fn test_wire_assignment_round_trip() {
        let mut wires = WireAssignment::default();
        for slot in ButtonSlot::ALL {
            assert_eq!(wires.wire_for(slot), Wire::A);
        }

        wires.assign(ButtonSlot::VolumeUp, Wire::B);
        wires.assign(ButtonSlot::Mode, Wire::B);
        assert_eq!(wires.wire_for(ButtonSlot::VolumeUp), Wire::B);
        assert_eq!(wires.wire_for(ButtonSlot::Mode), Wire::B);
        assert_eq!(wires.wire_for(ButtonSlot::VolumeDown), Wire::A);
        assert_eq!(wires.bits(), 0b1000_0010);

        wires.assign(ButtonSlot::VolumeUp, Wire::A);
        assert_eq!(wires.wire_for(ButtonSlot::VolumeUp), Wire::A);
        assert_eq!(WireAssignment::from_bits(wires.bits()), wires);
    }

    #[test]
    fn test_action_table_set_level() {
        let mut actions = ActionTable::default();
        actions.set_level(ButtonSlot::Next, 1.63);
        assert_eq!(actions.level(ButtonSlot::Next), 1.63);
        assert_eq!(actions.level(ButtonSlot::Previous), 0.0);
    }
}

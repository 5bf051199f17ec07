//! Module: sample
//!
//! Purpose: analog sample conversion plus the closed identifier sets for
//! wires and button slots. One frame of inputs is the unit every polling
//! loop in the crate consumes.
//!
//! Safety: Safe. Pure functions and Copy types only.

/// Convert a raw ADC sample to a voltage.
///
/// Pure linear scaling against the full-scale reference:
/// `voltage = raw / (2^bits - 1) * reference`.
#[inline]
pub fn sample_to_voltage(raw: u16, resolution_bits: u8, reference_voltage: f32) -> f32 {
    let full_scale = ((1u32 << resolution_bits) - 1) as f32;
    raw as f32 / full_scale * reference_voltage
}

/// Physical sense wire identity.
///
/// Wire A carries slots 0..3, wire B slots 4..7. Wire A has strict
/// priority in the dispatch loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Wire {
    A,
    B,
}

impl Wire {
    /// Index of the first slot owned by this wire.
    #[inline]
    pub const fn slot_offset(self) -> usize {
        match self {
            Wire::A => 0,
            Wire::B => 4,
        }
    }
}

/// Logical button slot.
///
/// Eight slots across two wires. The names follow the head-unit functions
/// the slots drive; during calibration the first six double as the remote
/// command set (see `calibrate::RemoteCommand`).
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ButtonSlot {
    VolumeDown = 0,
    VolumeUp = 1,
    Previous = 2,
    Next = 3,
    MemoryDown = 4,
    MemoryUp = 5,
    Mute = 6,
    Mode = 7,
}

impl ButtonSlot {
    /// Number of slots.
    pub const COUNT: usize = 8;

    /// All slots in index order.
    pub const ALL: [ButtonSlot; Self::COUNT] = [
        ButtonSlot::VolumeDown,
        ButtonSlot::VolumeUp,
        ButtonSlot::Previous,
        ButtonSlot::Next,
        ButtonSlot::MemoryDown,
        ButtonSlot::MemoryUp,
        ButtonSlot::Mute,
        ButtonSlot::Mode,
    ];

    /// Slot for a raw index, `None` past the table.
    #[inline]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Slot for a per-wire classifier hit (0..3) on the given wire.
    #[inline]
    pub fn from_parts(wire: Wire, hit: usize) -> Option<Self> {
        if hit < 4 {
            Self::from_index(wire.slot_offset() + hit)
        } else {
            None
        }
    }

    /// Raw table index of this slot.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// One polled frame of inputs: both sense wire voltages plus the
/// configuration button state, sampled together.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InputFrame {
    /// Sense wire A voltage.
    pub wire_a: f32,
    /// Sense wire B voltage.
    pub wire_b: f32,
    /// Configuration button level (true = held).
    pub button: bool,
}

impl InputFrame {
    /// Frame with the given wire voltages and the button released.
    pub const fn wires(wire_a: f32, wire_b: f32) -> Self {
        Self {
            wire_a,
            wire_b,
            button: false,
        }
    }

    /// Reading for one wire.
    #[inline]
    pub fn for_wire(&self, wire: Wire) -> f32 {
        match wire {
            Wire::A => self.wire_a,
            Wire::B => self.wire_b,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_to_voltage_endpoints() {
        assert_eq!(sample_to_voltage(0, 10, 5.0), 0.0);
        assert_eq!(sample_to_voltage(1023, 10, 5.0), 5.0);
        assert_eq!(sample_to_voltage(4095, 12, 3.3), 3.3);
    }

    #[test]
    fn test_sample_to_voltage_midpoint() {
        let v = sample_to_voltage(512, 10, 5.0);
        assert!((v - 2.5024).abs() < 1e-3);
    }

    #[test]
    fn test_slot_index_round_trip() {
        for (i, slot) in ButtonSlot::ALL.iter().enumerate() {
            assert_eq!(slot.index(), i);
            assert_eq!(ButtonSlot::from_index(i), Some(*slot));
        }
        assert_eq!(ButtonSlot::from_index(8), None);
    }

    #[test]
    fn test_slot_from_parts() {
        assert_eq!(
            ButtonSlot::from_parts(Wire::A, 0),
            Some(ButtonSlot::VolumeDown)
        );
        assert_eq!(ButtonSlot::from_parts(Wire::A, 3), Some(ButtonSlot::Next));
        assert_eq!(
            ButtonSlot::from_parts(Wire::B, 0),
            Some(ButtonSlot::MemoryDown)
        );
        assert_eq!(ButtonSlot::from_parts(Wire::B, 3), Some(ButtonSlot::Mode));
        assert_eq!(ButtonSlot::from_parts(Wire::B, 4), None);
    }

    #[test]
    fn test_frame_for_wire() {
        let frame = InputFrame::wires(1.0, 2.0);
        assert_eq!(frame.for_wire(Wire::A), 1.0);
        assert_eq!(frame.for_wire(Wire::B), 2.0);
    }
}

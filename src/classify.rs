//! Module: classify
//!
//! Purpose: turn sensed voltages into button slots. Two distinct policies:
//!
//! - Contiguous-range classification for live presses. Each wire carries
//!   four triggers, monotonically decreasing by index (the sensed voltage
//!   shrinks as the button sits further down the divider chain). Scanning
//!   from slot 3 up to slot 0 with a running lower bound partitions
//!   `(floor, trigger[0])` into four non-overlapping windows, so at most
//!   one slot can match.
//! - Symmetric tolerance windows for the calibration command decoder. This
//!   is deliberately looser: first slot (scan order 0..7) whose window
//!   contains the reading on its assigned wire wins.
//!
//! Safety: Safe. Pure functions, no state.

use crate::config::{TriggerTable, WireAssignment};
use crate::sample::{ButtonSlot, InputFrame};

/// Classify a wire voltage against that wire's four triggers.
///
/// Slot 3 (furthest button) is checked first with the floor as its lower
/// bound; each trigger then becomes the lower bound of the next window up.
/// All comparisons are strict, so a reading sitting exactly on a trigger
/// or on the floor never matches.
///
/// Returns the per-wire slot index (0..3), or `None` when the reading
/// falls outside every window.
pub fn classify(voltage: f32, floor: f32, triggers: &[f32; 4]) -> Option<usize> {
    let mut lower = floor;
    for slot in (0..triggers.len()).rev() {
        if lower < voltage && voltage < triggers[slot] {
            return Some(slot);
        }
        lower = triggers[slot];
    }
    None
}

/// Symmetric tolerance window test: `trigger - tol < v < trigger + tol`.
#[inline]
pub fn match_tolerance(voltage: f32, trigger: f32, tolerance: f32) -> bool {
    trigger - tolerance < voltage && voltage < trigger + tolerance
}

/// Decode a frame into a slot using the tolerance-window policy.
///
/// Scans all eight slots in index order; each slot is compared against the
/// reading of the wire it was captured on. First match wins. Used only by
/// the calibration command decoder, never by the dispatch loop.
pub fn decode_slot(
    frame: &InputFrame,
    triggers: &TriggerTable,
    wires: WireAssignment,
    tolerance: f32,
) -> Option<ButtonSlot> {
    for slot in ButtonSlot::ALL {
        let reading = frame.for_wire(wires.wire_for(slot));
        if match_tolerance(reading, triggers.get(slot), tolerance) {
            return Some(slot);
        }
    }
    None
}

//! Module: dispatch
//!
//! Purpose: the normal-operation loop. Each cycle samples both wires,
//! classifies each against its own trigger windows, and replays the
//! matched slot's action level as a pulse that lasts as long as the
//! press does.

use log::debug;

use crate::classify::classify;
use crate::config::CalibrationRecord;
use crate::emit::{send_pulse, ReleasePolicy};
use crate::io::LadderIo;
use crate::sample::{ButtonSlot, Wire};

/// Polling interval between dispatch cycles.
pub const CYCLE_POLL_MS: u32 = 10;

/// One dispatch cycle: sample, classify, replay.
///
/// Wire A is checked before wire B; the first wire with a reading inside
/// one of its windows wins the cycle. Returns the slot that fired, or
/// `None` when both wires read idle.
pub fn dispatch_cycle<I: LadderIo>(
    io: &mut I,
    record: &CalibrationRecord,
    release: ReleasePolicy,
) -> Option<ButtonSlot> {
    let frame = io.poll_inputs();
    for wire in [Wire::A, Wire::B] {
        let voltage = frame.for_wire(wire);
        let triggers = record.triggers.for_wire(wire);
        if let Some(hit) = classify(voltage, record.floor, &triggers) {
            // classify only returns per-wire indices 0..3.
            let Some(slot) = ButtonSlot::from_parts(wire, hit) else {
                continue;
            };
            debug!("dispatch: {:?} at {:.3} V", slot, voltage);
            send_pulse(io, record.actions.level(slot), record.floor, release);
            return Some(slot);
        }
    }
    None
}

/// Run dispatch cycles forever.
pub fn run<I: LadderIo>(io: &mut I, record: &CalibrationRecord, release: ReleasePolicy) -> ! {
    loop {
        dispatch_cycle(io, record, release);
        io.delay_ms(CYCLE_POLL_MS);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ActionTable, TriggerTable, WireAssignment};
    use crate::emit::RELEASE_POLL_MS;
    use crate::io::{SimIo, SimStep};

    const IDLE: f32 = 5.0;

    fn record() -> CalibrationRecord {
        CalibrationRecord {
            floor: 0.1,
            // Wire A windows descend 2.0..0.5, wire B 1.8..0.4.
            triggers: TriggerTable::new([2.0, 1.5, 1.0, 0.5, 1.8, 1.4, 0.9, 0.4]),
            actions: ActionTable::new([2.18, 1.86, 1.43, 1.63, 0.66, 1.24, 1.24, 0.89]),
            wires: WireAssignment::from_bits(0b1111_0000),
        }
    }

    #[test]
    fn test_idle_cycle_fires_nothing() {
        let rec = record();
        let mut sim = SimIo::new();
        sim.push(SimStep::idle(IDLE));

        assert_eq!(dispatch_cycle(&mut sim, &rec, ReleasePolicy::BothWires), None);
        assert_eq!(sim.output_history(), &[] as &[f32]);
    }

    #[test]
    fn test_wire_a_press_replays_its_action() {
        let rec = record();
        let mut sim = SimIo::new();
        // 1.7 V on wire A falls in the topmost window (slot 0).
        sim.push(SimStep::wires(1.7, IDLE));
        // One sub-floor reading keeps the pulse engaged, then release.
        sim.push(SimStep::wires(0.05, IDLE));
        sim.push(SimStep::idle(IDLE));

        let hit = dispatch_cycle(&mut sim, &rec, ReleasePolicy::BothWires);
        assert_eq!(hit, Some(ButtonSlot::VolumeDown));
        assert_eq!(sim.output_history(), &[2.18]);
        assert_eq!(sim.output(), None);
        assert_eq!(sim.now_ms(), RELEASE_POLL_MS);
    }

    #[test]
    fn test_wire_b_press_maps_to_upper_slots() {
        let rec = record();
        let mut sim = SimIo::new();
        // Wire A idle, wire B at 0.7 V: third wire-B window, slot 6.
        sim.push(SimStep::wires(IDLE, 0.7));
        sim.push(SimStep::idle(IDLE));

        let hit = dispatch_cycle(&mut sim, &rec, ReleasePolicy::BothWires);
        assert_eq!(hit, Some(ButtonSlot::Mute));
        assert_eq!(sim.output_history(), &[1.24]);
    }

    #[test]
    fn test_wire_a_wins_when_both_active() {
        let rec = record();
        let mut sim = SimIo::new();
        sim.push(SimStep::wires(1.2, 0.7));
        sim.push(SimStep::idle(IDLE));

        let hit = dispatch_cycle(&mut sim, &rec, ReleasePolicy::BothWires);
        assert_eq!(hit, Some(ButtonSlot::VolumeUp));
        assert_eq!(sim.output_history(), &[1.86]);
    }

    #[test]
    fn test_reading_below_floor_is_ignored() {
        let rec = record();
        let mut sim = SimIo::new();
        sim.push(SimStep::wires(0.05, IDLE));

        assert_eq!(dispatch_cycle(&mut sim, &rec, ReleasePolicy::BothWires), None);
    }

    #[test]
    fn test_pulse_tracks_long_press() {
        let rec = record();
        let mut sim = SimIo::new();
        sim.push(SimStep::wires(0.7, IDLE));
        // Held below the floor for four release polls before letting go.
        sim.push_n(SimStep::wires(0.05, IDLE), 4);
        sim.push(SimStep::idle(IDLE));

        let hit = dispatch_cycle(&mut sim, &rec, ReleasePolicy::BothWires);
        assert_eq!(hit, Some(ButtonSlot::Previous));
        assert_eq!(sim.now_ms(), 4 * RELEASE_POLL_MS);
        assert_eq!(sim.output_off_count(), 1);
    }
}

//! Module: calibrate
//!
//! Purpose: the calibration state machine. Runs through three phases and
//! persists the result:
//!
//! 1. Floor measurement: both wires sampled for a fixed window, the
//!    minimum reading becomes the idle floor.
//! 2. Trigger learning: for each of the eight slots in turn, wait for a
//!    press (reading at or below the floor while the configuration button
//!    is held), record its voltage and wire.
//! 3. Action learning: for each slot, adjust a trial output level with
//!    remote commands decoded through tolerance windows over the
//!    just-learned triggers, until the user confirms. Skipped entirely
//!    when the action table is fixed at build time.
//!
//! Every wait here blocks until its physical condition occurs. There is
//! no timeout: calibration is an attended procedure and cannot complete
//! on its own.

use log::{debug, info};

use crate::classify::decode_slot;
use crate::config::layout::{self, ConfigStorage};
use crate::config::{ActionTable, CalibrationRecord, StoreError, TriggerTable, WireAssignment};
use crate::emit::{send_pulse, ReleasePolicy};
use crate::io::LadderIo;
use crate::sample::{ButtonSlot, Wire};

/// Window over which the idle floor is measured.
pub const FLOOR_WINDOW_MS: u32 = 500;

/// Polling interval for calibration wait loops.
pub const POLL_MS: u32 = 10;

/// Waiting-for-press feedback: blink count and total span.
const WAIT_BLINKS: u32 = 4;
const WAIT_BLINK_SPAN_MS: u32 = 500;

/// Delay after a captured slot before the next one is armed.
const SLOT_COOLDOWN_MS: u32 = 500;

/// Default recognition tolerance for command decoding, also the fine
/// adjustment step.
pub const DEFAULT_TOLERANCE_V: f32 = 0.025;

/// Starting trial level for action learning.
pub const DEFAULT_TRIAL_LEVEL_V: f32 = 2.5;

/// Coarse adjustment step, as a multiple of the fine step.
const COARSE_STEP_FACTOR: f32 = 4.0;

/// Indicator drive level during calibration feedback.
const INDICATOR_LEVEL_V: f32 = 5.0;

/// How long the configuration button must be held at power-on to force
/// recalibration.
pub const GESTURE_HOLD_MS: u32 = 1000;

/// Remote commands recognized during action learning.
///
/// The first six slots of the freshly learned table double as the command
/// set; the last two are ignored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemoteCommand {
    /// Lower the trial level by one fine step.
    FineDown,
    /// Raise the trial level by one fine step.
    FineUp,
    /// Raise the trial level by the coarse step.
    CoarseUp,
    /// Lower the trial level by the coarse step.
    CoarseDown,
    /// Emit a pulse at the trial level without advancing.
    TestPulse,
    /// Latch the trial level and advance to the next slot.
    Confirm,
}

impl RemoteCommand {
    /// Command bound to a decoded slot, `None` for the unbound slots.
    pub fn from_slot(slot: ButtonSlot) -> Option<Self> {
        match slot {
            ButtonSlot::VolumeDown => Some(Self::FineDown),
            ButtonSlot::VolumeUp => Some(Self::FineUp),
            ButtonSlot::Previous => Some(Self::CoarseUp),
            ButtonSlot::Next => Some(Self::CoarseDown),
            ButtonSlot::MemoryDown => Some(Self::TestPulse),
            ButtonSlot::MemoryUp => Some(Self::Confirm),
            ButtonSlot::Mute | ButtonSlot::Mode => None,
        }
    }
}

/// Where the action table comes from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ActionSource {
    /// Levels known at build time; the action-learning phase is skipped.
    Fixed(ActionTable),
    /// Levels learned interactively during calibration.
    Learned,
}

/// Tunables for one calibration run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CalibrationOptions {
    /// Command recognition tolerance and fine step.
    pub tolerance: f32,
    /// Initial trial level for action learning.
    pub trial_level: f32,
    /// Fixed or learned action table.
    pub actions: ActionSource,
    /// Release condition used for test pulses.
    pub release: ReleasePolicy,
}

impl Default for CalibrationOptions {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE_V,
            trial_level: DEFAULT_TRIAL_LEVEL_V,
            actions: ActionSource::Learned,
            release: ReleasePolicy::default(),
        }
    }
}

/// True when the configuration button is held through the power-on hold
/// window, the user's request to throw away the stored calibration.
pub fn startup_gesture_held<I: LadderIo>(io: &mut I, hold_ms: u32) -> bool {
    if !io.poll_inputs().button {
        return false;
    }
    io.delay_ms(hold_ms);
    io.poll_inputs().button
}

/// Run the full calibration sequence and persist the resulting record.
pub fn run_calibration<I: LadderIo, S: ConfigStorage>(
    io: &mut I,
    store: &mut S,
    opts: &CalibrationOptions,
) -> Result<CalibrationRecord, StoreError> {
    info!("calibration: measuring idle floor");
    let floor = measure_floor(io);
    info!("calibration: floor {:.3} V", floor);

    let (triggers, wires) = learn_triggers(io, floor);
    let actions = learn_actions(io, floor, &triggers, wires, opts);

    let record = CalibrationRecord {
        floor,
        triggers,
        actions,
        wires,
    };
    layout::save(store, &record)?;
    info!("calibration: record persisted");
    Ok(record)
}

/// Sample both wires over the measurement window; the lowest reading
/// seen becomes the floor. The indicator stays lit throughout.
fn measure_floor<I: LadderIo>(io: &mut I) -> f32 {
    io.set_indicator(INDICATOR_LEVEL_V);
    let start = io.now_ms();
    let mut floor = f32::MAX;
    while io.now_ms().wrapping_sub(start) < FLOOR_WINDOW_MS {
        let frame = io.poll_inputs();
        if frame.wire_a < floor {
            floor = frame.wire_a;
        }
        if frame.wire_b < floor {
            floor = frame.wire_b;
        }
        io.delay_ms(POLL_MS);
    }
    io.indicator_off();
    floor
}

/// Capture all eight trigger voltages, slot by slot. Wire A is checked
/// before wire B each poll; the indicator blinks while waiting.
fn learn_triggers<I: LadderIo>(io: &mut I, floor: f32) -> (TriggerTable, WireAssignment) {
    let mut triggers = TriggerTable::default();
    let mut wires = WireAssignment::default();

    for slot in ButtonSlot::ALL {
        info!("calibration: hold config and press button for {:?}", slot);
        loop {
            let frame = io.poll_inputs();
            if frame.button && frame.wire_a <= floor {
                triggers.set(slot, frame.wire_a);
                wires.assign(slot, Wire::A);
                break;
            }
            if frame.button && frame.wire_b <= floor {
                triggers.set(slot, frame.wire_b);
                wires.assign(slot, Wire::B);
                break;
            }
            blink(io, WAIT_BLINKS, WAIT_BLINK_SPAN_MS);
        }
        debug!(
            "calibration: {:?} captured at {:.3} V on {:?}",
            slot,
            triggers.get(slot),
            wires.wire_for(slot)
        );
        // Short acceptance flash, then let the user release.
        blink(io, 1, 2);
        io.delay_ms(SLOT_COOLDOWN_MS);
    }

    (triggers, wires)
}

/// Produce the action table: either the fixed build-time table or one
/// learned slot by slot through remote commands.
fn learn_actions<I: LadderIo>(
    io: &mut I,
    floor: f32,
    triggers: &TriggerTable,
    wires: WireAssignment,
    opts: &CalibrationOptions,
) -> ActionTable {
    match opts.actions {
        ActionSource::Fixed(table) => {
            info!("calibration: using fixed action table");
            table
        }
        ActionSource::Learned => {
            let mut actions = ActionTable::default();
            for slot in ButtonSlot::ALL {
                info!("calibration: adjust level for {:?}", slot);
                let mut level = opts.trial_level;
                loop {
                    match read_command(io, triggers, wires, opts.tolerance) {
                        RemoteCommand::FineDown => level -= opts.tolerance,
                        RemoteCommand::FineUp => level += opts.tolerance,
                        RemoteCommand::CoarseDown => level -= COARSE_STEP_FACTOR * opts.tolerance,
                        RemoteCommand::CoarseUp => level += COARSE_STEP_FACTOR * opts.tolerance,
                        RemoteCommand::TestPulse => send_pulse(io, level, floor, opts.release),
                        RemoteCommand::Confirm => break,
                    }
                    // The indicator brightness mirrors the trial level.
                    io.set_indicator(level);
                }
                actions.set_level(slot, level);
                info!("calibration: {:?} action {:.3} V", slot, level);
            }
            actions
        }
    }
}

/// Block until a bound remote command decodes. Holding a command button
/// repeats it at the polling cadence; that hold-to-repeat is intended.
fn read_command<I: LadderIo>(
    io: &mut I,
    triggers: &TriggerTable,
    wires: WireAssignment,
    tolerance: f32,
) -> RemoteCommand {
    loop {
        let frame = io.poll_inputs();
        if let Some(slot) = decode_slot(&frame, triggers, wires, tolerance) {
            if let Some(cmd) = RemoteCommand::from_slot(slot) {
                return cmd;
            }
        }
        io.delay_ms(POLL_MS);
    }
}

/// Blink the indicator `count` times spread over `span_ms`.
fn blink<I: LadderIo>(io: &mut I, count: u32, span_ms: u32) {
    if count == 0 {
        return;
    }
    let half = span_ms / (count * 2);
    for _ in 0..count {
        io.indicator_off();
        io.delay_ms(half);
        io.set_indicator(INDICATOR_LEVEL_V);
        io.delay_ms(half);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_bindings() {
        assert_eq!(
            RemoteCommand::from_slot(ButtonSlot::VolumeDown),
            Some(RemoteCommand::FineDown)
        );
        assert_eq!(
            RemoteCommand::from_slot(ButtonSlot::VolumeUp),
            Some(RemoteCommand::FineUp)
        );
        assert_eq!(
            RemoteCommand::from_slot(ButtonSlot::Previous),
            Some(RemoteCommand::CoarseUp)
        );
        assert_eq!(
            RemoteCommand::from_slot(ButtonSlot::Next),
            Some(RemoteCommand::CoarseDown)
        );
        assert_eq!(
            RemoteCommand::from_slot(ButtonSlot::MemoryDown),
            Some(RemoteCommand::TestPulse)
        );
        assert_eq!(
            RemoteCommand::from_slot(ButtonSlot::MemoryUp),
            Some(RemoteCommand::Confirm)
        );
        assert_eq!(RemoteCommand::from_slot(ButtonSlot::Mute), None);
        assert_eq!(RemoteCommand::from_slot(ButtonSlot::Mode), None);
    }

    #[test]
    fn test_default_options() {
        let opts = CalibrationOptions::default();
        assert_eq!(opts.tolerance, DEFAULT_TOLERANCE_V);
        assert_eq!(opts.trial_level, DEFAULT_TRIAL_LEVEL_V);
        assert_eq!(opts.actions, ActionSource::Learned);
        assert_eq!(opts.release, ReleasePolicy::BothWires);
    }
}

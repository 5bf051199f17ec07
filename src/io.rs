//! Module: io
//!
//! Purpose: the hardware seam. Everything the emulator touches (sense
//! wires, configuration button, output line, indicator, time) goes
//! through [`LadderIo`], so the calibration machine, pulse emitter and
//! dispatch loop are plain functions testable on the host.
//!
//! [`SimIo`] is the host-side implementation: a scripted simulator that
//! replays a fixed sequence of input frames and records output activity.

use crate::sample::InputFrame;

/// Hardware access for the ladder emulator.
///
/// One logical thread drives all of this; implementations never need to
/// be thread-safe. `delay_ms` and `now_ms` share the same clock.
pub trait LadderIo {
    /// Sample both sense wires and the configuration button together.
    fn poll_inputs(&mut self) -> InputFrame;

    /// Drive the output line to the given voltage level.
    fn set_output(&mut self, level: f32);

    /// Drop the output line to zero.
    fn output_off(&mut self);

    /// Drive the indicator to the given level (PWM-dimmable).
    fn set_indicator(&mut self, level: f32);

    /// Turn the indicator off.
    fn indicator_off(&mut self);

    /// Block for the given number of milliseconds.
    fn delay_ms(&mut self, ms: u32);

    /// Milliseconds since boot.
    fn now_ms(&mut self) -> u32;
}

/// One scripted step of simulator input.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimStep {
    pub wire_a: f32,
    pub wire_b: f32,
    pub button: bool,
}

impl SimStep {
    /// Both wires at the same idle voltage, button released.
    pub const fn idle(volts: f32) -> Self {
        Self {
            wire_a: volts,
            wire_b: volts,
            button: false,
        }
    }

    /// Explicit wire voltages, button released.
    pub const fn wires(wire_a: f32, wire_b: f32) -> Self {
        Self {
            wire_a,
            wire_b,
            button: false,
        }
    }

    /// Same step with the configuration button held.
    pub const fn with_button(mut self) -> Self {
        self.button = true;
        self
    }
}

/// Capacity of the simulator script and output log.
pub const SIM_CAPACITY: usize = 256;

/// Scripted [`LadderIo`] for host tests and dry runs.
///
/// `poll_inputs` consumes one scripted step per call and panics when the
/// script runs out; a wait loop that outlives its script is a test bug,
/// and a panic beats an infinite loop. Time advances only through
/// `delay_ms`.
pub struct SimIo {
    steps: [SimStep; SIM_CAPACITY],
    len: usize,
    cursor: usize,
    now_ms: u32,
    output_on: bool,
    output_level: f32,
    outputs: [f32; SIM_CAPACITY],
    output_count: usize,
    off_count: usize,
    indicator_level: f32,
    indicator_on: bool,
}

impl SimIo {
    /// Empty simulator; push steps before driving any loop.
    pub fn new() -> Self {
        Self {
            steps: [SimStep::idle(0.0); SIM_CAPACITY],
            len: 0,
            cursor: 0,
            now_ms: 0,
            output_on: false,
            output_level: 0.0,
            outputs: [0.0; SIM_CAPACITY],
            output_count: 0,
            off_count: 0,
            indicator_level: 0.0,
            indicator_on: false,
        }
    }

    /// Append one step to the script.
    pub fn push(&mut self, step: SimStep) {
        assert!(self.len < SIM_CAPACITY, "SimIo script full");
        self.steps[self.len] = step;
        self.len += 1;
    }

    /// Append the same step `n` times.
    pub fn push_n(&mut self, step: SimStep, n: usize) {
        for _ in 0..n {
            self.push(step);
        }
    }

    /// Steps consumed so far.
    pub fn steps_consumed(&self) -> usize {
        self.cursor
    }

    /// Steps left in the script.
    pub fn steps_remaining(&self) -> usize {
        self.len - self.cursor
    }

    /// Current output level, if the line is driven.
    pub fn output(&self) -> Option<f32> {
        if self.output_on {
            Some(self.output_level)
        } else {
            None
        }
    }

    /// Every level the output line was set to, in order. Writes past the
    /// log capacity are counted but not stored.
    pub fn output_history(&self) -> &[f32] {
        &self.outputs[..self.output_count.min(SIM_CAPACITY)]
    }

    /// How many times the output was dropped to zero.
    pub fn output_off_count(&self) -> usize {
        self.off_count
    }

    /// Current indicator level, if lit.
    pub fn indicator(&self) -> Option<f32> {
        if self.indicator_on {
            Some(self.indicator_level)
        } else {
            None
        }
    }
}

impl Default for SimIo {
    fn default() -> Self {
        Self::new()
    }
}

impl LadderIo for SimIo {
    fn poll_inputs(&mut self) -> InputFrame {
        assert!(
            self.cursor < self.len,
            "SimIo script exhausted after {} steps",
            self.len
        );
        let step = self.steps[self.cursor];
        self.cursor += 1;
        InputFrame {
            wire_a: step.wire_a,
            wire_b: step.wire_b,
            button: step.button,
        }
    }

    fn set_output(&mut self, level: f32) {
        self.output_on = true;
        self.output_level = level;
        if self.output_count < SIM_CAPACITY {
            self.outputs[self.output_count] = level;
        }
        self.output_count += 1;
    }

    fn output_off(&mut self) {
        self.output_on = false;
        self.off_count += 1;
    }

    fn set_indicator(&mut self, level: f32) {
        self.indicator_on = true;
        self.indicator_level = level;
    }

    fn indicator_off(&mut self) {
        self.indicator_on = false;
    }

    fn delay_ms(&mut self, ms: u32) {
        self.now_ms = self.now_ms.wrapping_add(ms);
    }

    fn now_ms(&mut self) -> u32 {
        self.now_ms
    }
}

//! Module: emit
//!
//! Purpose: pulse emitter. Drives the output line to a slot's learned
//! level and holds it for as long as the originating press lasts, so one
//! press produces exactly one pulse and holding passes through.
//!
//! A sense reading *below* the floor means "still engaged" here: the
//! pulse tracks the input, and the wait has no timeout and no
//! cancellation path.

use crate::io::LadderIo;

/// Polling interval while waiting for release.
pub const RELEASE_POLL_MS: u32 = 50;

/// Which sense readings must clear the floor before the pulse ends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ReleasePolicy {
    /// Hold while either wire reads below the floor; release only once
    /// both are at or above it.
    #[default]
    BothWires,
    /// Monitor wire A alone, as some single-wire adapters do. Wire B
    /// activity cannot sustain the pulse.
    WireAOnly,
}

impl ReleasePolicy {
    fn engaged(self, wire_a: f32, wire_b: f32, floor: f32) -> bool {
        match self {
            ReleasePolicy::BothWires => wire_a < floor || wire_b < floor,
            ReleasePolicy::WireAOnly => wire_a < floor,
        }
    }
}

/// Emit one pulse at `level` and block until release.
///
/// Sets the output, then polls the sense wires every [`RELEASE_POLL_MS`]
/// while the policy still reports engagement; on release the output is
/// dropped to zero before returning.
pub fn send_pulse<I: LadderIo>(io: &mut I, level: f32, floor: f32, policy: ReleasePolicy) {
    io.set_output(level);
    loop {
        let frame = io.poll_inputs();
        if !policy.engaged(frame.wire_a, frame.wire_b, floor) {
            break;
        }
        io.delay_ms(RELEASE_POLL_MS);
    }
    io.output_off();
}

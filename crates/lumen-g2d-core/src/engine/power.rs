//! Accelerator power gating.

use lumen_g2d_hal::Accelerator;

/// Local mirror of the engine power rail.
///
/// Only the task that owns the engine calls these, and the busy check
/// shares that ownership, so no new submission can race a power-off
/// decision.
pub(crate) struct PowerGate {
    on: bool,
}

impl PowerGate {
    pub const fn new() -> Self {
        Self { on: false }
    }

    pub fn is_on(&self) -> bool {
        self.on
    }

    /// Idempotent: the driver is called only on the off-to-on edge.
    pub fn power_on<A: Accelerator>(&mut self, dev: &mut A) -> Result<(), A::Error> {
        if !self.on {
            dev.power_on()?;
            self.on = true;
        }
        Ok(())
    }

    /// Power off only if the engine is provably idle. A busy engine is
    /// left powered; the decision falls to the next submission's call.
    pub fn power_off_if_idle<A: Accelerator>(&mut self, dev: &mut A) -> Result<bool, A::Error> {
        if self.on && !dev.is_busy() {
            dev.power_off()?;
            self.on = false;
            return Ok(true);
        }
        Ok(false)
    }
}

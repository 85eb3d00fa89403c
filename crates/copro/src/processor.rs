//! The DSP core seam.

use crate::{
    bus::Bus,
    routing::{InterruptLines, Vector},
};

/// A DSP core driven by the [`Engine`](crate::Engine).
pub trait Processor: InterruptLines + Send {
    /// Returns the core to its power-on state.
    fn reset(&mut self);

    /// Drives the core forward by _at most_ the specified amount of instructions. The actual
    /// number of instructions executed is returned.
    fn exec(&mut self, bus: &mut Bus<'_>, instructions: u32) -> u32;
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IdleStats {
    pub executed: u64,
    pub interrupts: u64,
    pub vectored_interrupts: u64,
    /// Mask of every vector received since the last reset.
    pub seen: u16,
}

/// A core which executes nothing but keeps count of what it is asked to do.
#[derive(Debug, Default)]
pub struct Idle {
    stats: IdleStats,
}

impl Idle {
    pub fn stats(&self) -> IdleStats {
        self.stats
    }
}

impl InterruptLines for Idle {
    fn signal_interrupt(&mut self, vector: Vector) {
        tracing::trace!(%vector, "idle core interrupted");
        self.stats.interrupts += 1;
        self.stats.seen |= vector.mask();
    }

    fn signal_vectored_interrupt(&mut self, vector: Vector) {
        tracing::trace!(%vector, "idle core interrupted (vectored)");
        self.stats.vectored_interrupts += 1;
        self.stats.seen |= vector.mask();
    }
}

impl Processor for Idle {
    fn reset(&mut self) {
        self.stats = IdleStats::default();
    }

    fn exec(&mut self, bus: &mut Bus<'_>, instructions: u32) -> u32 {
        // nothing to decode, but acknowledge like a handler would
        let pending = bus.icu.pending();
        if pending != 0 {
            bus.acknowledge(pending);
        }

        self.stats.executed += u64::from(instructions);
        instructions
    }
}

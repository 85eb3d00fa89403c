//! Interrupt control unit.

use crate::routing::{InterruptLines, InterruptSink, Vector};
use bitos::BitUtils;

/// How a vector reaches the processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Delivery {
    /// Through [`InterruptLines::signal_interrupt`].
    #[default]
    Direct,
    /// Through [`InterruptLines::signal_vectored_interrupt`].
    Vectored,
}

/// Routes raised vectors to the processor and keeps track of which ones are pending.
#[derive(Debug, Default)]
pub struct Icu {
    pending: u16,
    vectored: u16,
}

impl Icu {
    /// Raises `vector`, delivering it to `lines` right away.
    ///
    /// A vector which is already pending is delivered again: pending bits only exist for the
    /// processor to inspect and acknowledge.
    pub fn trigger_single<L>(&mut self, vector: Vector, lines: &mut L)
    where
        L: InterruptLines + ?Sized,
    {
        self.pending = self.pending.with_bit(vector.index(), true);

        match self.delivery(vector) {
            Delivery::Direct => {
                tracing::trace!(%vector, "delivering interrupt");
                lines.signal_interrupt(vector);
            }
            Delivery::Vectored => {
                tracing::trace!(%vector, "delivering vectored interrupt");
                lines.signal_vectored_interrupt(vector);
            }
        }
    }

    pub fn delivery(&self, vector: Vector) -> Delivery {
        if self.vectored.bit(vector.index()) {
            Delivery::Vectored
        } else {
            Delivery::Direct
        }
    }

    pub fn set_delivery(&mut self, vector: Vector, delivery: Delivery) {
        self.vectored = self
            .vectored
            .with_bit(vector.index(), delivery == Delivery::Vectored);
    }

    /// Mask of vectors raised and not yet acknowledged.
    pub fn pending(&self) -> u16 {
        self.pending
    }

    pub fn is_pending(&self, vector: Vector) -> bool {
        self.pending.bit(vector.index())
    }

    /// Clears the pending bits set in `mask`.
    pub fn acknowledge(&mut self, mask: u16) {
        self.pending &= !mask;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// An [`InterruptSink`] which raises vectors through an [`Icu`] into a set of interrupt lines.
pub struct Router<'a, L: ?Sized> {
    icu: &'a mut Icu,
    lines: &'a mut L,
}

impl<'a, L: InterruptLines + ?Sized> Router<'a, L> {
    pub fn new(icu: &'a mut Icu, lines: &'a mut L) -> Self {
        Self { icu, lines }
    }
}

impl<L: InterruptLines + ?Sized> InterruptSink for Router<'_, L> {
    #[inline(always)]
    fn raise(&mut self, vector: Vector) {
        self.icu.trigger_single(vector, &mut *self.lines);
    }
}

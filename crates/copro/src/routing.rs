//! Interrupt vectors and the static table binding peripheral events to them.
//!
//! Peripherals never see the [`Icu`](crate::icu::Icu) or the processor. They are handed an
//! [`InterruptSink`] on every call that may complete an event and raise the vector they were
//! constructed with, which always comes from [`ROUTES`].

use strum::{EnumCount, VariantArray};

/// Identifies one of the 16 interrupt sources of the ICU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Vector(u8);

impl Vector {
    pub const COUNT: usize = 16;

    /// Creates a new vector.
    ///
    /// # Panics
    /// Panics if `index` is not a valid vector (`0..16`).
    pub const fn new(index: u8) -> Self {
        assert!((index as usize) < Self::COUNT, "interrupt vector out of range");
        Self(index)
    }

    #[inline(always)]
    pub const fn index(self) -> u8 {
        self.0
    }

    /// The bit of this vector in a request or enable mask.
    #[inline(always)]
    pub const fn mask(self) -> u16 {
        1 << self.0
    }
}

impl std::fmt::Display for Vector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:X}", self.0)
    }
}

/// A peripheral event which can raise an interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumCount, VariantArray)]
pub enum Source {
    /// Timer 0 expired.
    Timer0,
    /// Timer 1 expired.
    Timer1,
    /// Btdmp 0 transmit queue drained.
    Btdmp0,
    /// Btdmp 1 transmit queue drained.
    Btdmp1,
    /// Host wrote to data slot 0 of the host to DSP channel.
    ApbpData0,
    /// Host wrote to data slot 1 of the host to DSP channel.
    ApbpData1,
    /// Host wrote to data slot 2 of the host to DSP channel.
    ApbpData2,
    /// Host set the semaphore of the host to DSP channel.
    ApbpSemaphore,
    /// A DMA transfer completed.
    Dma,
}

/// Event to vector assignments, indexed by [`Source`] discriminant.
pub static ROUTES: [(Source, Vector); Source::COUNT] = [
    (Source::Timer0, Vector::new(0xA)),
    (Source::Timer1, Vector::new(0x9)),
    (Source::Btdmp0, Vector::new(0xB)),
    (Source::Btdmp1, Vector::new(0xB)),
    (Source::ApbpData0, Vector::new(0xE)),
    (Source::ApbpData1, Vector::new(0xE)),
    (Source::ApbpData2, Vector::new(0xE)),
    (Source::ApbpSemaphore, Vector::new(0xE)),
    (Source::Dma, Vector::new(0xF)),
];

impl Source {
    /// The vector this event is wired to.
    #[inline(always)]
    pub fn vector(self) -> Vector {
        ROUTES[self as usize].1
    }

    /// The data slot events of the host to DSP channel, in slot order.
    pub const APBP_DATA: [Source; 3] = [Source::ApbpData0, Source::ApbpData1, Source::ApbpData2];
}

/// Capability handed to peripherals to raise an interrupt.
pub trait InterruptSink {
    fn raise(&mut self, vector: Vector);
}

/// The interrupt entry points of a processor.
pub trait InterruptLines {
    /// Signals a direct interrupt.
    fn signal_interrupt(&mut self, vector: Vector);

    /// Signals a vectored interrupt.
    fn signal_vectored_interrupt(&mut self, vector: Vector);
}

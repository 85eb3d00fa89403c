//! The DSP side view of the subsystem.

use crate::{
    apbp::Slot,
    dma::DmaPorts,
    engine::Peripherals,
    icu::{Icu, Router},
    memory::{Region, SharedMemory},
    miu::{Miu, Target},
    routing::{InterruptLines, InterruptSink, Vector},
};
use tinyvec::TinyVec;

/// An interrupt delivery recorded while the processor is busy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Direct(Vector),
    Vectored(Vector),
}

impl Default for Signal {
    fn default() -> Self {
        Self::Direct(Vector::new(0))
    }
}

/// Interrupt lines which hold deliveries until the processor can take them.
#[derive(Debug, Default)]
pub struct Deferred(TinyVec<[Signal; 8]>);

impl InterruptLines for Deferred {
    fn signal_interrupt(&mut self, vector: Vector) {
        self.0.push(Signal::Direct(vector));
    }

    fn signal_vectored_interrupt(&mut self, vector: Vector) {
        self.0.push(Signal::Vectored(vector));
    }
}

impl Deferred {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Delivers every held signal to `lines`, in the order they were raised.
    pub fn flush<L: InterruptLines + ?Sized>(&mut self, lines: &mut L) {
        for signal in self.0.drain(..) {
            match signal {
                Signal::Direct(vector) => lines.signal_interrupt(vector),
                Signal::Vectored(vector) => lines.signal_vectored_interrupt(vector),
            }
        }
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}

/// Everything the processor can reach while executing.
///
/// Interrupts raised through the bus are held and delivered as soon as the processor returns
/// control to the engine.
pub struct Bus<'a> {
    pub memory: &'a mut SharedMemory,
    pub miu: &'a mut Miu,
    pub peripherals: &'a mut Peripherals,
    pub icu: &'a mut Icu,
    deferred: &'a mut Deferred,
}

impl<'a> Bus<'a> {
    pub fn new(
        memory: &'a mut SharedMemory,
        miu: &'a mut Miu,
        peripherals: &'a mut Peripherals,
        icu: &'a mut Icu,
        deferred: &'a mut Deferred,
    ) -> Self {
        Self {
            memory,
            miu,
            peripherals,
            icu,
            deferred,
        }
    }

    /// Reads the instruction word at `addr`.
    #[inline(always)]
    pub fn read_program(&self, addr: u32) -> u16 {
        self.memory.read16(Region::Program, addr)
    }

    /// Reads the data word at `addr`.
    pub fn read_data(&self, addr: u16) -> u16 {
        match self.miu.translate(addr) {
            Target::Memory(word) => self.memory.read16(Region::Data, word),
            Target::Mmio(offset) => {
                tracing::trace!("unmapped MMIO read at offset 0x{offset:03X}");
                0
            }
        }
    }

    /// Writes the data word at `addr`.
    pub fn write_data(&mut self, addr: u16, value: u16) {
        match self.miu.translate(addr) {
            Target::Memory(word) => self.memory.write16(Region::Data, word, value),
            Target::Mmio(offset) => {
                tracing::trace!("unmapped MMIO write of 0x{value:04X} at offset 0x{offset:03X}");
            }
        }
    }

    pub fn cpu_data_ready(&self, slot: Slot) -> bool {
        self.peripherals.apbp_from_cpu.is_data_ready(slot)
    }

    /// Consumes data sent by the host.
    pub fn recv_from_cpu(&mut self, slot: Slot) -> u16 {
        self.peripherals.apbp_from_cpu.recv_data(slot)
    }

    pub fn cpu_semaphore_ready(&self) -> bool {
        self.peripherals.apbp_from_cpu.is_semaphore_ready()
    }

    /// Consumes the semaphore set by the host.
    pub fn recv_cpu_semaphore(&mut self) -> u16 {
        self.peripherals.apbp_from_cpu.get_semaphore()
    }

    /// Sends data to the host.
    pub fn send_to_cpu(&mut self, slot: Slot, value: u16) {
        let mut sink = Router::new(&mut *self.icu, &mut *self.deferred);
        self.peripherals
            .apbp_from_dsp
            .send_data(slot, value, &mut sink);
    }

    /// Sets the semaphore seen by the host.
    pub fn set_cpu_semaphore(&mut self, value: u16) {
        let mut sink = Router::new(&mut *self.icu, &mut *self.deferred);
        self.peripherals
            .apbp_from_dsp
            .set_semaphore(value, &mut sink);
    }

    /// Runs the transfer configured in DMA channel `channel`.
    ///
    /// # Panics
    /// Panics if `channel` is not a valid channel.
    pub fn dma_trigger(&mut self, channel: u8) {
        let ports = DmaPorts::new(&mut *self.memory, &mut self.peripherals.ahbm);
        let mut sink = Router::new(&mut *self.icu, &mut *self.deferred);
        self.peripherals.dma.trigger(channel, ports, &mut sink);
    }

    /// Counts an external event on timer `index`.
    ///
    /// # Panics
    /// Panics if `index` is not a valid timer.
    pub fn timer_event(&mut self, index: u8) {
        let mut sink = Router::new(&mut *self.icu, &mut *self.deferred);
        self.peripherals.timer_mut(index).count_event(&mut sink);
    }

    /// Queues a sample on Btdmp unit `index`. Returns `false` if its queue is full.
    ///
    /// # Panics
    /// Panics if `index` is not a valid unit.
    pub fn transmit(&mut self, index: u8, sample: i16) -> bool {
        self.peripherals.btdmp_mut(index).transmit(sample)
    }

    /// Raises `vector` as if a peripheral had.
    pub fn raise(&mut self, vector: Vector) {
        Router::new(&mut *self.icu, &mut *self.deferred).raise(vector);
    }

    /// Acknowledges the pending vectors in `mask`.
    pub fn acknowledge(&mut self, mask: u16) {
        self.icu.acknowledge(mask);
    }
}

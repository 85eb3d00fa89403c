//! DMA engine.
//!
//! Transfers run synchronously and to completion inside [`Dma::trigger`]. Bytes move one at a
//! time in ascending address order, and the completion interrupt is raised once after the last
//! one.

use crate::{
    ahbm::Ahbm,
    error::ContractError,
    memory::{Region, SharedMemory},
    routing::{InterruptSink, Vector},
};
use bitos::bitos;

pub const CHANNEL_COUNT: usize = 8;

/// An address space reachable by the DMA engine.
#[bitos(2)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Space {
    /// Data region of shared memory.
    #[default]
    Data = 0b00,
    /// Program region of shared memory.
    Program = 0b01,
    /// The host's external bus, through the AHBM bridge.
    External = 0b10,
    /// Nothing. Reads as zero, writes are dropped.
    Unmapped = 0b11,
}

#[bitos(16)]
#[derive(Debug, Clone, Copy, Default)]
pub struct ChannelControl {
    #[bits(0..2)]
    pub source_space: Space,
    #[bits(2..4)]
    pub destination_space: Space,
}

/// Configuration of a DMA channel. Addresses are byte addresses inside their space.
#[derive(Debug, Clone, Copy, Default)]
pub struct Channel {
    pub control: ChannelControl,
    pub source: u32,
    pub destination: u32,
    /// Length of the transfer, in bytes.
    pub length: u32,
}

impl Channel {
    /// Configures a transfer of `length` bytes from `source` to `destination`.
    pub fn configure(&mut self, source: (Space, u32), destination: (Space, u32), length: u32) {
        self.control = ChannelControl::default()
            .with_source_space(source.0)
            .with_destination_space(destination.0);
        self.source = source.1;
        self.destination = destination.1;
        self.length = length;
    }
}

/// What a transfer is allowed to touch: shared memory and the external bus.
pub struct DmaPorts<'a> {
    memory: &'a mut SharedMemory,
    ahbm: &'a mut Ahbm,
}

impl<'a> DmaPorts<'a> {
    pub fn new(memory: &'a mut SharedMemory, ahbm: &'a mut Ahbm) -> Self {
        Self { memory, ahbm }
    }

    fn read8(&mut self, space: Space, addr: u32) -> u8 {
        match space {
            Space::Data => self.memory.read8(Region::Data, addr),
            Space::Program => self.memory.read8(Region::Program, addr),
            Space::External => self.ahbm.read8(addr),
            Space::Unmapped => 0,
        }
    }

    fn write8(&mut self, space: Space, addr: u32, value: u8) {
        match space {
            Space::Data => self.memory.write8(Region::Data, addr, value),
            Space::Program => self.memory.write8(Region::Program, addr, value),
            Space::External => self.ahbm.write8(addr, value),
            Space::Unmapped => (),
        }
    }
}

#[derive(Debug)]
pub struct Dma {
    vector: Vector,
    channels: [Channel; CHANNEL_COUNT],
    completed: u64,
}

fn check_channel(index: u8) -> Result<usize, ContractError> {
    if (index as usize) < CHANNEL_COUNT {
        Ok(index as usize)
    } else {
        Err(ContractError::Channel { index })
    }
}

fn expect_channel(index: u8) -> usize {
    match check_channel(index) {
        Ok(index) => index,
        Err(e) => panic!("{e}"),
    }
}

impl Dma {
    /// Creates a DMA engine which raises `vector` when a transfer completes.
    pub fn new(vector: Vector) -> Self {
        Self {
            vector,
            channels: Default::default(),
            completed: 0,
        }
    }

    /// # Panics
    /// Panics if `index` is not a valid channel.
    pub fn channel(&self, index: u8) -> &Channel {
        &self.channels[expect_channel(index)]
    }

    /// # Panics
    /// Panics if `index` is not a valid channel.
    pub fn channel_mut(&mut self, index: u8) -> &mut Channel {
        &mut self.channels[expect_channel(index)]
    }

    pub fn try_channel_mut(&mut self, index: u8) -> Result<&mut Channel, ContractError> {
        Ok(&mut self.channels[check_channel(index)?])
    }

    /// Number of transfers completed since the last reset.
    pub fn completed(&self) -> u64 {
        self.completed
    }

    /// Runs the transfer configured in channel `index` to completion.
    ///
    /// # Panics
    /// Panics if `index` is not a valid channel.
    pub fn trigger(&mut self, index: u8, mut ports: DmaPorts<'_>, sink: &mut impl InterruptSink) {
        let channel = self.channels[expect_channel(index)];
        let source = channel.control.source_space();
        let destination = channel.control.destination_space();

        tracing::debug!(
            channel = index,
            length = channel.length,
            "DMA {source:?} 0x{:08X} -> {destination:?} 0x{:08X}",
            channel.source,
            channel.destination,
        );

        for offset in 0..channel.length {
            let value = ports.read8(source, channel.source.wrapping_add(offset));
            ports.write8(destination, channel.destination.wrapping_add(offset), value);
        }

        self.completed += 1;
        sink.raise(self.vector);
    }

    /// Clears the configuration of every channel.
    pub fn reset(&mut self) {
        *self = Self::new(self.vector);
    }
}

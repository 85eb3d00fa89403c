//! Emulation of a DSP coprocessor subsystem: shared memory, the peripherals around the DSP core
//! and the interrupt routing between them.
//!
//! The [`Engine`] owns every component and steps them together. The DSP core itself is supplied
//! by the host through the [`Processor`] trait.

pub mod ahbm;
pub mod apbp;
pub mod btdmp;
pub mod bus;
pub mod dma;
pub mod engine;
pub mod error;
pub mod icu;
pub mod memory;
pub mod miu;
pub mod processor;
pub mod routing;
pub mod timer;

pub use bus::Bus;
pub use engine::{Config, Engine, Peripherals};
pub use error::ContractError;
pub use memory::{Region, SharedMemory};
pub use processor::{Idle, Processor};
pub use routing::{InterruptLines, InterruptSink, Source, Vector};

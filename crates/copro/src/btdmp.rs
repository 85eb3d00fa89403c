//! Serial audio transmit unit.

use crate::routing::{InterruptSink, Vector};
use std::collections::VecDeque;

pub const FIFO_LEN: usize = 16;

/// Receives one stereo frame every transmit period.
pub type AudioCallback = Box<dyn FnMut([i16; 2]) + Send + 'static>;

pub struct Btdmp {
    name: &'static str,
    vector: Vector,
    enabled: bool,
    period: u16,
    elapsed: u16,
    fifo: VecDeque<i16>,
    audio_callback: Option<AudioCallback>,
}

impl std::fmt::Debug for Btdmp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Btdmp")
            .field("name", &self.name)
            .field("enabled", &self.enabled)
            .field("period", &self.period)
            .field("elapsed", &self.elapsed)
            .field("queued", &self.fifo.len())
            .finish_non_exhaustive()
    }
}

impl Btdmp {
    /// Creates a disabled unit which raises `vector` whenever its transmit queue drains.
    pub fn new(name: &'static str, vector: Vector) -> Self {
        Self {
            name,
            vector,
            enabled: false,
            period: 0,
            elapsed: 0,
            fifo: VecDeque::with_capacity(FIFO_LEN),
            audio_callback: None,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn set_audio_callback(&mut self, callback: AudioCallback) {
        self.audio_callback = Some(callback);
    }

    /// Sets the amount of steps between two transmitted frames.
    pub fn set_transmit_period(&mut self, period: u16) {
        self.period = period;
    }

    pub fn transmit_period(&self) -> u16 {
        self.period
    }

    pub fn set_transmit_enabled(&mut self, enabled: bool) {
        if enabled != self.enabled {
            tracing::debug!(unit = self.name, enabled, period = self.period, "transmit toggled");
        }

        self.enabled = enabled;
        self.elapsed = 0;
    }

    pub fn is_transmit_enabled(&self) -> bool {
        self.enabled
    }

    /// Queues a sample. Returns `false` and drops it if the queue is full.
    pub fn transmit(&mut self, sample: i16) -> bool {
        if self.fifo.len() == FIFO_LEN {
            tracing::warn!(unit = self.name, "transmit queue overflow, sample dropped");
            return false;
        }

        self.fifo.push_back(sample);
        true
    }

    pub fn transmit_empty(&self) -> bool {
        self.fifo.is_empty()
    }

    pub fn transmit_full(&self) -> bool {
        self.fifo.len() == FIFO_LEN
    }

    /// Advances the unit by one step.
    pub fn tick(&mut self, sink: &mut impl InterruptSink) {
        if !self.enabled || self.period == 0 {
            return;
        }

        self.elapsed += 1;
        if self.elapsed < self.period {
            return;
        }

        self.elapsed = 0;

        let was_empty = self.fifo.is_empty();
        let mut frame = [0; 2];
        let mut underrun = false;
        for sample in &mut frame {
            match self.fifo.pop_front() {
                Some(value) => *sample = value,
                None => underrun = true,
            }
        }

        if underrun {
            tracing::warn!(unit = self.name, "transmit queue underrun");
        }

        if let Some(callback) = &mut self.audio_callback {
            callback(frame);
        }

        if !was_empty && self.fifo.is_empty() {
            sink.raise(self.vector);
        }
    }

    /// Clears the queue and the transmit configuration. The audio callback stays installed.
    pub fn reset(&mut self) {
        self.enabled = false;
        self.period = 0;
        self.elapsed = 0;
        self.fifo.clear();
    }
}

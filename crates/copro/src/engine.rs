//! Composition root of the subsystem.

use crate::{
    ahbm::{Ahbm, AhbmCallbacks},
    apbp::{Apbp, Callback, Notify, Slot},
    btdmp::{AudioCallback, Btdmp},
    bus::{Bus, Deferred},
    dma::{Channel, Dma, DmaPorts},
    error::ContractError,
    icu::{Icu, Router},
    memory::SharedMemory,
    miu::Miu,
    processor::Processor,
    routing::Source,
    timer::Timer,
};

/// Host wiring installed at construction.
#[derive(Default)]
pub struct Config {
    /// Byte access into the host's address space, used by DMA transfers to the external space.
    pub ahbm: Option<AhbmCallbacks>,
    /// Receives every frame transmitted by Btdmp 0.
    pub audio_callback: Option<AudioCallback>,
}

/// Every peripheral of the subsystem.
#[derive(Debug)]
pub struct Peripherals {
    /// Host to DSP handshake channel.
    pub apbp_from_cpu: Apbp,
    /// DSP to host handshake channel.
    pub apbp_from_dsp: Apbp,
    pub timers: [Timer; 2],
    pub ahbm: Ahbm,
    pub dma: Dma,
    pub btdmp: [Btdmp; 2],
}

impl Peripherals {
    fn new() -> Self {
        let mut apbp_from_cpu = Apbp::new("cpu->dsp");
        for (slot, source) in Slot::ALL.into_iter().zip(Source::APBP_DATA) {
            apbp_from_cpu.set_data_notify(slot, Notify::Interrupt(source.vector()));
        }
        apbp_from_cpu.set_semaphore_notify(Notify::Interrupt(Source::ApbpSemaphore.vector()));

        Self {
            apbp_from_cpu,
            apbp_from_dsp: Apbp::new("dsp->cpu"),
            timers: [
                Timer::new(Source::Timer0.vector()),
                Timer::new(Source::Timer1.vector()),
            ],
            ahbm: Ahbm::default(),
            dma: Dma::new(Source::Dma.vector()),
            btdmp: [
                Btdmp::new("0", Source::Btdmp0.vector()),
                Btdmp::new("1", Source::Btdmp1.vector()),
            ],
        }
    }

    /// # Panics
    /// Panics if `index` is not a valid timer.
    pub fn timer_mut(&mut self, index: u8) -> &mut Timer {
        match self.timers.get_mut(index as usize) {
            Some(timer) => timer,
            None => panic!("{}", ContractError::Timer { index }),
        }
    }

    /// # Panics
    /// Panics if `index` is not a valid unit.
    pub fn btdmp_mut(&mut self, index: u8) -> &mut Btdmp {
        match self.btdmp.get_mut(index as usize) {
            Some(btdmp) => btdmp,
            None => panic!("{}", ContractError::Btdmp { index }),
        }
    }
}

/// The DSP subsystem: shared memory, peripherals, interrupt routing and the processor, stepped
/// together.
pub struct Engine<P> {
    memory: SharedMemory,
    miu: Miu,
    icu: Icu,
    peripherals: Peripherals,
    deferred: Deferred,
    processor: P,
    steps: u64,
}

impl<P: Processor> Engine<P> {
    pub fn new(processor: P, config: Config) -> Self {
        let mut peripherals = Peripherals::new();
        if let Some(callbacks) = config.ahbm {
            peripherals.ahbm.set_callbacks(callbacks);
        }

        if let Some(callback) = config.audio_callback {
            peripherals.btdmp[0].set_audio_callback(callback);
        }

        Self {
            memory: SharedMemory::default(),
            miu: Miu::default(),
            icu: Icu::default(),
            peripherals,
            deferred: Deferred::default(),
            processor,
            steps: 0,
        }
    }

    /// Returns every component to its power-on state. Host wiring and the ICU delivery modes
    /// survive, only its pending bits are cleared.
    pub fn reset(&mut self) {
        tracing::debug!("resetting subsystem");

        self.memory.clear();
        self.miu.reset();

        let p = &mut self.peripherals;
        p.apbp_from_cpu.reset();
        p.apbp_from_dsp.reset();
        p.timers[0].reset();
        p.timers[1].reset();
        p.ahbm.reset();
        p.dma.reset();
        p.btdmp[0].reset();
        p.btdmp[1].reset();

        // delivery modes are processor configuration and survive
        self.icu.acknowledge(u16::MAX);
        self.deferred.clear();
        self.processor.reset();
        self.steps = 0;
    }

    #[inline(always)]
    pub fn memory(&self) -> &SharedMemory {
        &self.memory
    }

    #[inline(always)]
    pub fn memory_mut(&mut self) -> &mut SharedMemory {
        &mut self.memory
    }

    pub fn miu_mut(&mut self) -> &mut Miu {
        &mut self.miu
    }

    pub fn icu(&self) -> &Icu {
        &self.icu
    }

    pub fn icu_mut(&mut self) -> &mut Icu {
        &mut self.icu
    }

    pub fn peripherals(&self) -> &Peripherals {
        &self.peripherals
    }

    /// Direct access to peripheral configuration, standing in for the MMIO registers.
    pub fn peripherals_mut(&mut self) -> &mut Peripherals {
        &mut self.peripherals
    }

    pub fn processor(&self) -> &P {
        &self.processor
    }

    pub fn processor_mut(&mut self) -> &mut P {
        &mut self.processor
    }

    /// Steps executed since construction or the last reset. A step counts even when the processor
    /// executes nothing in it.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Runs `f` with the DSP side view of the subsystem. Interrupts it raises are delivered once
    /// it returns.
    pub fn with_bus<R>(&mut self, f: impl FnOnce(&mut Bus<'_>) -> R) -> R {
        let mut bus = Bus::new(
            &mut self.memory,
            &mut self.miu,
            &mut self.peripherals,
            &mut self.icu,
            &mut self.deferred,
        );

        let result = f(&mut bus);
        self.deferred.flush(&mut self.processor);

        result
    }

    fn step(&mut self) {
        let mut bus = Bus::new(
            &mut self.memory,
            &mut self.miu,
            &mut self.peripherals,
            &mut self.icu,
            &mut self.deferred,
        );

        let executed = self.processor.exec(&mut bus, 1);
        if executed == 0 {
            tracing::trace!(step = self.steps, "processor executed nothing");
        }

        self.deferred.flush(&mut self.processor);

        let mut sink = Router::new(&mut self.icu, &mut self.processor);
        let p = &mut self.peripherals;
        p.timers[0].tick(&mut sink);
        p.timers[1].tick(&mut sink);
        p.btdmp[0].tick(&mut sink);
        p.btdmp[1].tick(&mut sink);

        self.steps += 1;
    }

    /// Runs the subsystem for `cycles` steps.
    pub fn run(&mut self, cycles: u32) {
        tracing::trace!(cycles, "running");
        for _ in 0..cycles {
            self.step();
        }
    }

    /// Whether data slot `index` of the host to DSP channel has been consumed.
    ///
    /// # Panics
    /// Panics if `index` is not a valid slot.
    pub fn send_data_is_empty(&self, index: u8) -> bool {
        !self.peripherals.apbp_from_cpu.is_data_ready(Slot::new(index))
    }

    /// Sends `value` to the DSP through data slot `index`.
    ///
    /// # Panics
    /// Panics if `index` is not a valid slot.
    pub fn send_data(&mut self, index: u8, value: u16) {
        let slot = Slot::new(index);
        let mut sink = Router::new(&mut self.icu, &mut self.processor);
        self.peripherals
            .apbp_from_cpu
            .send_data(slot, value, &mut sink);
    }

    /// # Panics
    /// Panics if `index` is not a valid slot.
    pub fn recv_data_is_ready(&self, index: u8) -> bool {
        self.peripherals.apbp_from_dsp.is_data_ready(Slot::new(index))
    }

    /// Consumes the data the DSP sent through slot `index`.
    ///
    /// # Panics
    /// Panics if `index` is not a valid slot.
    pub fn recv_data(&mut self, index: u8) -> u16 {
        self.peripherals.apbp_from_dsp.recv_data(Slot::new(index))
    }

    /// Calls `handler` whenever the DSP sends data through slot `index`.
    ///
    /// # Panics
    /// Panics if `index` is not a valid slot.
    pub fn set_recv_data_handler(&mut self, index: u8, handler: Callback) {
        self.peripherals
            .apbp_from_dsp
            .set_data_notify(Slot::new(index), Notify::Callback(handler));
    }

    /// Sets the semaphore seen by the DSP.
    pub fn set_semaphore(&mut self, value: u16) {
        let mut sink = Router::new(&mut self.icu, &mut self.processor);
        self.peripherals
            .apbp_from_cpu
            .set_semaphore(value, &mut sink);
    }

    pub fn semaphore_is_ready(&self) -> bool {
        self.peripherals.apbp_from_dsp.is_semaphore_ready()
    }

    /// Consumes the semaphore set by the DSP.
    pub fn get_semaphore(&mut self) -> u16 {
        self.peripherals.apbp_from_dsp.get_semaphore()
    }

    /// Calls `handler` whenever the DSP sets its semaphore.
    pub fn set_semaphore_handler(&mut self, handler: Callback) {
        self.peripherals
            .apbp_from_dsp
            .set_semaphore_notify(Notify::Callback(handler));
    }

    pub fn set_ahbm_callbacks(&mut self, callbacks: AhbmCallbacks) {
        self.peripherals.ahbm.set_callbacks(callbacks);
    }

    /// Receives every frame transmitted by Btdmp 0.
    pub fn set_audio_callback(&mut self, callback: AudioCallback) {
        self.peripherals.btdmp[0].set_audio_callback(callback);
    }

    /// # Panics
    /// Panics if `channel` is not a valid channel.
    pub fn dma_channel_mut(&mut self, channel: u8) -> &mut Channel {
        self.peripherals.dma.channel_mut(channel)
    }

    /// Runs the transfer configured in DMA channel `channel` to completion.
    ///
    /// # Panics
    /// Panics if `channel` is not a valid channel.
    pub fn dma_trigger(&mut self, channel: u8) {
        let ports = DmaPorts::new(&mut self.memory, &mut self.peripherals.ahbm);
        let mut sink = Router::new(&mut self.icu, &mut self.processor);
        self.peripherals.dma.trigger(channel, ports, &mut sink);
    }
}

impl<P> std::fmt::Debug for Engine<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("steps", &self.steps)
            .field("icu", &self.icu)
            .field("peripherals", &self.peripherals)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::processor::Idle;

    #[test]
    fn apbp_wired_to_routing_table() {
        let mut engine = Engine::new(Idle::default(), Config::default());

        engine.send_data(2, 7);
        engine.set_semaphore(1);

        assert_eq!(engine.processor().stats().interrupts, 2);
        assert_eq!(engine.processor().stats().seen, Source::ApbpData2.vector().mask());
        assert!(engine.icu().is_pending(Source::ApbpSemaphore.vector()));
    }

    #[test]
    fn steps_counted() {
        let mut engine = Engine::new(Idle::default(), Config::default());
        engine.run(25);
        engine.run(5);

        assert_eq!(engine.steps(), 30);
        assert_eq!(engine.processor().stats().executed, 30);

        engine.reset();
        assert_eq!(engine.steps(), 0);
    }

    #[test]
    #[should_panic(expected = "timer 2 is out of range")]
    fn invalid_timer_panics() {
        let mut engine = Engine::new(Idle::default(), Config::default());
        engine.with_bus(|bus| bus.timer_event(2));
    }

    #[test]
    #[should_panic(expected = "btdmp unit 5 is out of range")]
    fn invalid_btdmp_panics() {
        let mut engine = Engine::new(Idle::default(), Config::default());
        engine.with_bus(|bus| bus.transmit(5, 0));
    }

    #[test]
    fn stalled_processor_still_steps() {
        struct Stalled;

        impl crate::routing::InterruptLines for Stalled {
            fn signal_interrupt(&mut self, _: crate::routing::Vector) {}
            fn signal_vectored_interrupt(&mut self, _: crate::routing::Vector) {}
        }

        impl Processor for Stalled {
            fn reset(&mut self) {}

            fn exec(&mut self, _: &mut Bus<'_>, _: u32) -> u32 {
                0
            }
        }

        let mut engine = Engine::new(Stalled, Config::default());
        engine.peripherals_mut().timer_mut(0).start(2);
        engine.run(4);

        assert_eq!(engine.steps(), 4);
        assert_eq!(engine.icu().pending(), Source::Timer0.vector().mask());
    }

    #[test]
    #[should_panic(expected = "slot")]
    fn invalid_slot_panics() {
        let mut engine = Engine::new(Idle::default(), Config::default());
        engine.send_data(3, 0);
    }
}

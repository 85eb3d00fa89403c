//! Host <-> DSP handshake channel.
//!
//! One [`Apbp`] models a single direction: three data registers and a semaphore register, each
//! with a ready flag raised by the sender and cleared by the receiver.

use crate::{
    error::ContractError,
    routing::{InterruptSink, Vector},
};

/// A completion callback installed by the host.
pub type Callback = Box<dyn FnMut() + Send + 'static>;

/// A checked data slot index (`0..3`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot(u8);

impl Slot {
    pub const COUNT: usize = 3;
    pub const ALL: [Slot; 3] = [Slot(0), Slot(1), Slot(2)];

    pub fn try_new(index: u8) -> Result<Self, ContractError> {
        if (index as usize) < Self::COUNT {
            Ok(Self(index))
        } else {
            Err(ContractError::Slot { index })
        }
    }

    /// # Panics
    /// Panics if `index` is not a valid slot.
    pub fn new(index: u8) -> Self {
        match Self::try_new(index) {
            Ok(slot) => slot,
            Err(e) => panic!("{e}"),
        }
    }

    #[inline(always)]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// What happens when a register of the channel is written.
#[derive(Default)]
pub enum Notify {
    /// Nothing.
    #[default]
    None,
    /// Raise an interrupt.
    Interrupt(Vector),
    /// Call back into the host.
    Callback(Callback),
}

impl std::fmt::Debug for Notify {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Interrupt(vector) => f.debug_tuple("Interrupt").field(vector).finish(),
            Self::Callback(_) => write!(f, "Callback(..)"),
        }
    }
}

impl Notify {
    fn fire(&mut self, sink: &mut impl InterruptSink) {
        match self {
            Self::None => (),
            Self::Interrupt(vector) => sink.raise(*vector),
            Self::Callback(callback) => callback(),
        }
    }
}

#[derive(Debug, Default)]
struct Register {
    value: u16,
    ready: bool,
    notify: Notify,
}

impl Register {
    fn write(&mut self, value: u16, sink: &mut impl InterruptSink) {
        self.value = value;
        self.ready = true;
        self.notify.fire(sink);
    }

    fn read(&mut self) -> u16 {
        self.ready = false;
        self.value
    }

    fn reset(&mut self) {
        self.value = 0;
        self.ready = false;
    }
}

#[derive(Debug)]
pub struct Apbp {
    name: &'static str,
    data: [Register; 3],
    semaphore: Register,
}

impl Apbp {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            data: Default::default(),
            semaphore: Default::default(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Writes `value` into `slot`, marks it ready and notifies.
    ///
    /// Writing to a slot which is still ready overwrites the previous value.
    pub fn send_data(&mut self, slot: Slot, value: u16, sink: &mut impl InterruptSink) {
        let register = &mut self.data[slot.index()];
        if register.ready {
            tracing::debug!(
                channel = self.name,
                slot = slot.index(),
                "overwriting unread data 0x{:04X}",
                register.value
            );
        }

        tracing::trace!(channel = self.name, slot = slot.index(), "send 0x{value:04X}");
        register.write(value, sink);
    }

    pub fn is_data_ready(&self, slot: Slot) -> bool {
        self.data[slot.index()].ready
    }

    /// Reads `slot` and clears its ready flag. A slot which is not ready returns its stale value.
    pub fn recv_data(&mut self, slot: Slot) -> u16 {
        self.data[slot.index()].read()
    }

    /// Reads `slot` without consuming it.
    pub fn peek_data(&self, slot: Slot) -> u16 {
        self.data[slot.index()].value
    }

    pub fn set_semaphore(&mut self, value: u16, sink: &mut impl InterruptSink) {
        tracing::trace!(channel = self.name, "semaphore 0x{value:04X}");
        self.semaphore.write(value, sink);
    }

    /// Reads the semaphore and clears its ready flag.
    pub fn get_semaphore(&mut self) -> u16 {
        self.semaphore.read()
    }

    pub fn is_semaphore_ready(&self) -> bool {
        self.semaphore.ready
    }

    pub fn set_data_notify(&mut self, slot: Slot, notify: Notify) {
        self.data[slot.index()].notify = notify;
    }

    pub fn set_semaphore_notify(&mut self, notify: Notify) {
        self.semaphore.notify = notify;
    }

    /// Clears every register and ready flag. Notifications are left installed.
    pub fn reset(&mut self) {
        for register in &mut self.data {
            register.reset();
        }

        self.semaphore.reset();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    #[derive(Default)]
    struct Raised(Vec<Vector>);

    impl InterruptSink for Raised {
        fn raise(&mut self, vector: Vector) {
            self.0.push(vector);
        }
    }

    #[test]
    fn slot_bounds() {
        assert!(Slot::try_new(2).is_ok());
        assert!(matches!(
            Slot::try_new(3),
            Err(ContractError::Slot { index: 3 })
        ));
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn invalid_slot_panics() {
        let _ = Slot::new(7);
    }

    #[test]
    fn send_then_recv() {
        let mut apbp = Apbp::new("test");
        let mut sink = Raised::default();

        for slot in Slot::ALL {
            apbp.send_data(slot, 0x1000 + slot.index() as u16, &mut sink);
            assert!(apbp.is_data_ready(slot));
            assert_eq!(apbp.recv_data(slot), 0x1000 + slot.index() as u16);
            assert!(!apbp.is_data_ready(slot));

            // stale value, flag stays cleared
            assert_eq!(apbp.recv_data(slot), 0x1000 + slot.index() as u16);
            assert!(!apbp.is_data_ready(slot));
        }

        assert!(sink.0.is_empty());
    }

    #[test]
    fn last_write_wins() {
        let mut apbp = Apbp::new("test");
        let mut sink = Raised::default();
        let slot = Slot::new(1);

        apbp.send_data(slot, 1, &mut sink);
        apbp.send_data(slot, 2, &mut sink);

        assert!(apbp.is_data_ready(slot));
        assert_eq!(apbp.peek_data(slot), 2);
        assert!(apbp.is_data_ready(slot));
        assert_eq!(apbp.recv_data(slot), 2);
    }

    #[test]
    fn notifications() {
        let mut apbp = Apbp::new("test");
        let mut sink = Raised::default();
        let calls = Arc::new(AtomicUsize::new(0));

        apbp.set_data_notify(Slot::new(0), Notify::Interrupt(Vector::new(0xE)));
        apbp.set_semaphore_notify(Notify::Callback(Box::new({
            let calls = calls.clone();
            move || {
                calls.fetch_add(1, Ordering::Relaxed);
            }
        })));

        apbp.send_data(Slot::new(0), 5, &mut sink);
        apbp.send_data(Slot::new(1), 6, &mut sink);
        apbp.set_semaphore(0x8000, &mut sink);

        assert_eq!(sink.0, [Vector::new(0xE)]);
        assert_eq!(calls.load(Ordering::Relaxed), 1);
        assert!(apbp.is_semaphore_ready());
        assert_eq!(apbp.get_semaphore(), 0x8000);
        assert!(!apbp.is_semaphore_ready());
    }

    #[test]
    fn last_notify_install_wins() {
        let mut apbp = Apbp::new("test");
        let mut sink = Raised::default();

        apbp.set_data_notify(Slot::new(2), Notify::Interrupt(Vector::new(0x1)));
        apbp.set_data_notify(Slot::new(2), Notify::Interrupt(Vector::new(0x2)));
        apbp.send_data(Slot::new(2), 0, &mut sink);

        assert_eq!(sink.0, [Vector::new(0x2)]);
    }

    #[test]
    fn reset_keeps_notifications() {
        let mut apbp = Apbp::new("test");
        let mut sink = Raised::default();

        apbp.set_data_notify(Slot::new(0), Notify::Interrupt(Vector::new(0xE)));
        apbp.send_data(Slot::new(0), 0xFFFF, &mut sink);
        apbp.set_semaphore(1, &mut sink);
        apbp.reset();

        assert!(!apbp.is_data_ready(Slot::new(0)));
        assert_eq!(apbp.peek_data(Slot::new(0)), 0);
        assert!(!apbp.is_semaphore_ready());

        apbp.send_data(Slot::new(0), 1, &mut sink);
        assert_eq!(sink.0.len(), 2);
    }
}

//! Bridge to the external bus of the host.

/// Value read from the external bus when no host callback is installed.
pub const FLOATING_BUS: u8 = 0;

pub type Read8 = Box<dyn FnMut(u32) -> u8 + Send + 'static>;
pub type Write8 = Box<dyn FnMut(u32, u8) + Send + 'static>;

/// Byte access callbacks into the host's address space.
pub struct AhbmCallbacks {
    pub read8: Read8,
    pub write8: Write8,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    pub reads: u64,
    pub writes: u64,
}

#[derive(Default)]
pub struct Ahbm {
    read_external: Option<Read8>,
    write_external: Option<Write8>,
    stats: Stats,
}

impl std::fmt::Debug for Ahbm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ahbm")
            .field("installed", &self.is_connected())
            .field("stats", &self.stats)
            .finish()
    }
}

impl Ahbm {
    pub fn set_callbacks(&mut self, callbacks: AhbmCallbacks) {
        self.read_external = Some(callbacks.read8);
        self.write_external = Some(callbacks.write8);
    }

    pub fn is_connected(&self) -> bool {
        self.read_external.is_some() && self.write_external.is_some()
    }

    pub fn read8(&mut self, addr: u32) -> u8 {
        self.stats.reads += 1;
        match &mut self.read_external {
            Some(read) => read(addr),
            None => {
                tracing::trace!("external read from 0x{addr:08X} with no bus attached");
                FLOATING_BUS
            }
        }
    }

    pub fn write8(&mut self, addr: u32, value: u8) {
        self.stats.writes += 1;
        match &mut self.write_external {
            Some(write) => write(addr, value),
            None => {
                tracing::trace!("external write to 0x{addr:08X} with no bus attached, dropped");
            }
        }
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    /// Clears the access statistics. The host callbacks stay installed.
    pub fn reset(&mut self) {
        self.stats = Stats::default();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn floating_bus_without_callbacks() {
        let mut ahbm = Ahbm::default();

        assert_eq!(ahbm.read8(0x1234), FLOATING_BUS);
        ahbm.write8(0x1234, 0xFF);
        assert_eq!(
            ahbm.stats(),
            Stats {
                reads: 1,
                writes: 1
            }
        );
    }

    #[test]
    fn forwards_to_host() {
        let written = Arc::new(Mutex::new(Vec::new()));
        let mut ahbm = Ahbm::default();
        ahbm.set_callbacks(AhbmCallbacks {
            read8: Box::new(|addr| addr as u8 ^ 0xFF),
            write8: Box::new({
                let written = written.clone();
                move |addr, value| written.lock().unwrap().push((addr, value))
            }),
        });

        assert!(ahbm.is_connected());
        assert_eq!(ahbm.read8(0x10), 0xEF);
        ahbm.write8(0x20, 0x42);
        assert_eq!(*written.lock().unwrap(), [(0x20, 0x42)]);

        ahbm.reset();
        assert!(ahbm.is_connected());
        assert_eq!(ahbm.stats(), Stats::default());
    }
}

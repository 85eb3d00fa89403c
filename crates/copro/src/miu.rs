//! Memory interface unit: maps DSP data addresses onto shared memory and the MMIO window.

use crate::memory::REGION_LEN;

/// Length of the MMIO window, in words.
pub const MMIO_LEN: u16 = 0x800;
/// Default base of the MMIO window.
pub const DEFAULT_MMIO_BASE: u16 = 0x8000;

/// Where a DSP data address lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Word address inside the data region of shared memory.
    Memory(u32),
    /// Word offset inside the MMIO window.
    Mmio(u16),
}

#[derive(Debug)]
pub struct Miu {
    mmio_base: u16,
    page: u16,
}

impl Default for Miu {
    fn default() -> Self {
        Self {
            mmio_base: DEFAULT_MMIO_BASE,
            page: 0,
        }
    }
}

impl Miu {
    pub fn mmio_base(&self) -> u16 {
        self.mmio_base
    }

    /// Moves the MMIO window. The base is aligned down to the window length.
    pub fn set_mmio_base(&mut self, base: u16) {
        self.mmio_base = base & !(MMIO_LEN - 1);
        tracing::debug!("MMIO window moved to 0x{:04X}", self.mmio_base);
    }

    pub fn page(&self) -> u16 {
        self.page
    }

    /// Selects the 64K word page of data memory seen by the DSP.
    pub fn set_page(&mut self, page: u16) {
        self.page = page;
    }

    /// Translates a DSP data address.
    pub fn translate(&self, addr: u16) -> Target {
        let offset = addr.wrapping_sub(self.mmio_base);
        if offset < MMIO_LEN {
            return Target::Mmio(offset);
        }

        let words = (REGION_LEN / 2) as u32;
        let word = (((self.page as u32) << 16) | addr as u32) % words;
        Target::Memory(word)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_window() {
        let miu = Miu::default();

        assert_eq!(miu.translate(0x0000), Target::Memory(0));
        assert_eq!(miu.translate(0x7FFF), Target::Memory(0x7FFF));
        assert_eq!(miu.translate(0x8000), Target::Mmio(0));
        assert_eq!(miu.translate(0x87FF), Target::Mmio(0x7FF));
        assert_eq!(miu.translate(0x8800), Target::Memory(0x8800));
    }

    #[test]
    fn pages_and_reset() {
        let mut miu = Miu::default();
        miu.set_page(1);
        miu.set_mmio_base(0xF123);

        assert_eq!(miu.mmio_base(), 0xF000);
        assert_eq!(miu.translate(0x0010), Target::Memory(0x1_0010));
        assert_eq!(miu.translate(0xF010), Target::Mmio(0x10));

        miu.reset();
        assert_eq!(miu.page(), 0);
        assert_eq!(miu.mmio_base(), DEFAULT_MMIO_BASE);
    }

    #[test]
    fn window_at_top_of_address_space() {
        let mut miu = Miu::default();
        miu.set_mmio_base(0xF800);

        assert_eq!(miu.translate(0xF7FF), Target::Memory(0xF7FF));
        assert_eq!(miu.translate(0xF800), Target::Mmio(0));
        assert_eq!(miu.translate(0xFFFE), Target::Mmio(0x7FE));
        assert_eq!(miu.translate(0xFFFF), Target::Mmio(0x7FF));
        assert_eq!(miu.translate(0x0000), Target::Memory(0));
    }

    #[test]
    fn pages_wrap_around_data_region() {
        let mut miu = Miu::default();
        miu.set_page(2);

        assert_eq!(miu.translate(0x0004), Target::Memory(0x0004));
    }
}

//! Memory shared between the host and the DSP.

use easyerr::{Error, ResultExt};
use std::path::Path;
use util::boxed_array;

/// Length of the shared memory, in bytes.
pub const MEMORY_LEN: usize = 0x8_0000;
/// Length of each of the program and data regions, in bytes.
pub const REGION_LEN: usize = MEMORY_LEN / 2;

/// A half of the shared memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    /// Instruction memory, in the lower half.
    Program,
    /// Data memory, in the upper half.
    Data,
}

impl Region {
    /// Offset of the region in shared memory.
    #[inline(always)]
    pub const fn base(self) -> usize {
        match self {
            Self::Program => 0,
            Self::Data => REGION_LEN,
        }
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("image of {len} bytes at offset 0x{offset:X} does not fit in the {region:?} region")]
    OutOfBounds {
        region: Region,
        offset: usize,
        len: usize,
    },
    #[error(transparent)]
    Io { source: std::io::Error },
}

/// Storage for the shared memory. Has no behavior of its own.
pub struct SharedMemory {
    raw: Box<[u8; MEMORY_LEN]>,
}

impl Default for SharedMemory {
    fn default() -> Self {
        Self {
            raw: boxed_array(0),
        }
    }
}

impl std::fmt::Debug for SharedMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedMemory")
            .field("len", &MEMORY_LEN)
            .finish_non_exhaustive()
    }
}

impl SharedMemory {
    #[inline(always)]
    pub fn raw(&self) -> &[u8; MEMORY_LEN] {
        &self.raw
    }

    #[inline(always)]
    pub fn raw_mut(&mut self) -> &mut [u8; MEMORY_LEN] {
        &mut self.raw
    }

    /// Zeroes the whole memory.
    pub fn clear(&mut self) {
        self.raw.fill(0);
    }

    pub fn region(&self, region: Region) -> &[u8] {
        &self.raw[region.base()..][..REGION_LEN]
    }

    pub fn region_mut(&mut self, region: Region) -> &mut [u8] {
        &mut self.raw[region.base()..][..REGION_LEN]
    }

    /// Reads a byte of `region`. The offset wraps around the region.
    #[inline(always)]
    pub fn read8(&self, region: Region, offset: u32) -> u8 {
        self.raw[region.base() + offset as usize % REGION_LEN]
    }

    /// Writes a byte of `region`. The offset wraps around the region.
    #[inline(always)]
    pub fn write8(&mut self, region: Region, offset: u32, value: u8) {
        self.raw[region.base() + offset as usize % REGION_LEN] = value;
    }

    /// Reads the halfword at word address `addr` of `region`.
    #[inline(always)]
    pub fn read16(&self, region: Region, addr: u32) -> u16 {
        let offset = (addr as usize * 2) % REGION_LEN;
        util::read_u16_le(self.region(region), offset)
    }

    /// Writes the halfword at word address `addr` of `region`.
    #[inline(always)]
    pub fn write16(&mut self, region: Region, addr: u32, value: u16) {
        let offset = (addr as usize * 2) % REGION_LEN;
        util::write_u16_le(self.region_mut(region), offset, value);
    }

    /// Copies `bytes` into `region`, starting at byte `offset`.
    pub fn load(&mut self, region: Region, offset: usize, bytes: &[u8]) -> Result<(), LoadError> {
        let fits = offset
            .checked_add(bytes.len())
            .is_some_and(|end| end <= REGION_LEN);

        if !fits {
            return Err(LoadError::OutOfBounds {
                region,
                offset,
                len: bytes.len(),
            });
        }

        self.region_mut(region)[offset..][..bytes.len()].copy_from_slice(bytes);
        tracing::debug!(?region, offset, len = bytes.len(), "loaded image");

        Ok(())
    }

    /// Reads the file at `path` and loads it into `region` at byte `offset`. Returns the length of
    /// the image.
    pub fn load_file(
        &mut self,
        region: Region,
        offset: usize,
        path: &Path,
    ) -> Result<usize, LoadError> {
        let bytes = std::fs::read(path).context(LoadCtx::Io)?;
        self.load(region, offset, &bytes)?;

        Ok(bytes.len())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn regions_are_halves() {
        let mut memory = SharedMemory::default();
        memory.write8(Region::Data, 0, 0x12);
        memory.write8(Region::Program, 0, 0x34);

        assert_eq!(memory.raw()[REGION_LEN], 0x12);
        assert_eq!(memory.raw()[0], 0x34);
    }

    #[test]
    fn offsets_wrap_inside_region() {
        let mut memory = SharedMemory::default();
        memory.write8(Region::Program, REGION_LEN as u32 + 3, 0xAA);

        assert_eq!(memory.read8(Region::Program, 3), 0xAA);
        assert_eq!(memory.read8(Region::Data, 3), 0);
    }

    #[test]
    fn halfword_access() {
        let mut memory = SharedMemory::default();
        memory.write16(Region::Data, 0x10, 0xBEEF);

        assert_eq!(memory.region(Region::Data)[0x20..0x22], [0xEF, 0xBE]);
        assert_eq!(memory.read16(Region::Data, 0x10), 0xBEEF);
    }

    #[test]
    fn load_rejects_overflowing_images() {
        let mut memory = SharedMemory::default();
        let image = [0xFF; 16];

        assert!(memory.load(Region::Program, REGION_LEN - 8, &image).is_err());
        assert!(memory.load(Region::Program, usize::MAX, &image).is_err());
        assert!(memory.raw().iter().all(|b| *b == 0));

        memory.load(Region::Data, 8, &image).unwrap();
        assert_eq!(memory.region(Region::Data)[8..24], image);
    }

    #[test]
    fn clear_zeroes_everything() {
        let mut memory = SharedMemory::default();
        memory.raw_mut().fill(0x55);
        memory.clear();

        assert!(memory.raw().iter().all(|b| *b == 0));
    }
}

//! Small helpers shared by the workspace crates.

/// Returns a `Box<[T; LEN]>` filled with `elem`.
///
/// Large arrays are built on the heap directly, so this never places `[T; LEN]` on the stack.
#[inline(always)]
pub fn boxed_array<T: Clone, const LEN: usize>(elem: T) -> Box<[T; LEN]> {
    vec![elem; LEN].into_boxed_slice().try_into().ok().unwrap()
}

/// Reads a little endian halfword at `offset`.
#[inline(always)]
pub fn read_u16_le(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

/// Writes a little endian halfword at `offset`.
#[inline(always)]
pub fn write_u16_le(bytes: &mut [u8], offset: usize, value: u16) {
    bytes[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn boxed_array_is_filled() {
        let array: Box<[u8; 0x1000]> = boxed_array(0xAA);
        assert!(array.iter().all(|b| *b == 0xAA));
    }

    #[test]
    fn halfwords_are_little_endian() {
        let mut bytes = [0u8; 4];
        write_u16_le(&mut bytes, 1, 0x1234);
        assert_eq!(bytes, [0x00, 0x34, 0x12, 0x00]);
        assert_eq!(read_u16_le(&bytes, 1), 0x1234);
    }
}

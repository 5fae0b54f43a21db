use crc::{Crc, CRC_32_MPEG_2};

/// Size of the CRC trailer on every frame.
pub const CRC_SIZE: usize = 4;

const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_MPEG_2);

/// CRC-32/MPEG-2 of `bytes`: polynomial 0x04C11DB7, initial value 0xFFFFFFFF, no reflection and
/// no final XOR.
pub fn crc32(bytes: &[u8]) -> u32 {
    CRC32.checksum(bytes)
}

/// Whether the last four bytes of `frame` are the little-endian CRC of everything before them.
pub fn is_valid(frame: &[u8]) -> bool {
    if frame.len() < CRC_SIZE {
        return false;
    }
    let (body, trailer) = frame.split_at(frame.len() - CRC_SIZE);
    let mut expected = [0; CRC_SIZE];
    expected.copy_from_slice(trailer);
    crc32(body) == u32::from_le_bytes(expected)
}

//! IEEE 1212 serial-bus CRC-16
//!
//! The polynomial is x^16 + x^12 + x^5 + 1, applied to 32-bit quadlets four
//! bits at a time. Directory and leaf headers carry this checksum over the
//! quadlets that follow them, in emission order.

/// Fold one quadlet into a running CRC-16 accumulator.
pub fn update_crc16(crc: u16, quad: u32) -> u16 {
    let mut crc = crc as u32;
    let mut shift: i32 = 28;
    while shift >= 0 {
        let sum = ((crc >> 12) ^ (quad >> shift)) & 0xf;
        crc = ((crc << 4) ^ (sum << 12) ^ (sum << 5) ^ sum) & 0xffff;
        shift -= 4;
    }
    crc as u16
}

/// CRC-16 over a slice of quadlets, starting from zero.
pub fn compute_crc16(quads: &[u32]) -> u16 {
    quads.iter().fold(0, |crc, &quad| update_crc16(crc, quad))
}

/// CRC-16 over raw bytes interpreted as big-endian quadlets.
///
/// A trailing partial quadlet is zero padded, matching the padding the
/// compiler emits for leaf payloads.
pub fn compute_crc16_bytes(bytes: &[u8]) -> u16 {
    bytes.chunks(4).fold(0, |crc, chunk| {
        let mut quad = [0u8; 4];
        quad[..chunk.len()].copy_from_slice(chunk);
        update_crc16(crc, u32::from_be_bytes(quad))
    })
}

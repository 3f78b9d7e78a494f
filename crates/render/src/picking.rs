//! Encoded-id picking: a 32-bit id is written as four normalized color
//! channels, least significant byte first, and read back as RGBA8.

pub fn encode_pick_id(id: u32) -> [f32; 4] {
    id.to_le_bytes().map(|b| f32::from(b) / 255.0)
}

pub fn decode_pick_bytes(pixel: [u8; 4]) -> u32 {
    u32::from_le_bytes(pixel)
}

/// Recover an id from the normalized floats stored in an attribute.
pub fn decode_pick_floats(channels: &[f32]) -> u32 {
    let mut bytes = [0u8; 4];
    for (byte, value) in bytes.iter_mut().zip(channels) {
        *byte = (value * 255.0).round().clamp(0.0, 255.0) as u8;
    }
    u32::from_le_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn low_byte_goes_to_red() {
        assert_eq!(encode_pick_id(1), [1.0 / 255.0, 0.0, 0.0, 0.0]);
        assert_eq!(encode_pick_id(0x0100)[1], 1.0 / 255.0);
    }

    #[test]
    fn floats_decode_to_the_same_id() {
        for id in [1, 255, 256, 70_000, 0x01ff_fe03] {
            assert_eq!(decode_pick_floats(&encode_pick_id(id)), id);
        }
    }

    #[test]
    fn readback_bytes_decode() {
        assert_eq!(decode_pick_bytes([3, 1, 0, 0]), 259);
        assert_eq!(decode_pick_bytes([0; 4]), 0);
    }
}

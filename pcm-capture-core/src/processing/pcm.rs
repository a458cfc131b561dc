//! 16-bit PCM sample conversion.
//!
//! Normalization divides by 32768 so the full signed range maps into
//! `[-1.0, 1.0)`. Encoding clamps and scales by `i16::MAX`.

use crate::models::format::{ByteOrder, BYTES_PER_SAMPLE};

const NORMALIZE: f32 = 32768.0;

/// Decode the signed 16-bit sample starting at `bytes[0]`.
#[inline]
pub fn decode_sample(bytes: [u8; BYTES_PER_SAMPLE], order: ByteOrder) -> f32 {
    let value = match order {
        ByteOrder::Little => i16::from_le_bytes(bytes),
        ByteOrder::Big => i16::from_be_bytes(bytes),
    };
    value as f32 / NORMALIZE
}

/// Encode one integer sample in the given byte order.
#[inline]
pub fn encode_sample(value: i16, order: ByteOrder) -> [u8; BYTES_PER_SAMPLE] {
    match order {
        ByteOrder::Little => value.to_le_bytes(),
        ByteOrder::Big => value.to_be_bytes(),
    }
}

/// Convert a normalized float `[-1.0, 1.0]` to a 16-bit integer sample.
///
/// Clamps out-of-range values.
#[inline]
pub fn float_to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

/// Append integer samples to `out` as raw PCM bytes.
pub fn extend_from_i16(out: &mut Vec<u8>, samples: &[i16], order: ByteOrder) {
    out.reserve(samples.len() * BYTES_PER_SAMPLE);
    for &sample in samples {
        out.extend_from_slice(&encode_sample(sample, order));
    }
}

/// Append float samples to `out` as raw PCM bytes.
pub fn extend_from_f32(out: &mut Vec<u8>, samples: &[f32], order: ByteOrder) {
    out.reserve(samples.len() * BYTES_PER_SAMPLE);
    for &sample in samples {
        out.extend_from_slice(&encode_sample(float_to_i16(sample), order));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn decode_both_orders() {
        assert_relative_eq!(decode_sample([0x00, 0x40], ByteOrder::Little), 0.5);
        assert_relative_eq!(decode_sample([0x40, 0x00], ByteOrder::Big), 0.5);
        assert_relative_eq!(decode_sample([0x00, 0x80], ByteOrder::Little), -1.0);
        assert_relative_eq!(decode_sample([0xFF, 0xFF], ByteOrder::Big), -1.0 / 32768.0);
    }

    #[test]
    fn full_scale_stays_in_range() {
        let max = decode_sample(encode_sample(i16::MAX, ByteOrder::Little), ByteOrder::Little);
        let min = decode_sample(encode_sample(i16::MIN, ByteOrder::Little), ByteOrder::Little);
        assert!(max < 1.0 && max > 0.9999);
        assert_relative_eq!(min, -1.0);
    }

    #[test]
    fn float_conversion_clamps() {
        assert_eq!(float_to_i16(0.0), 0);
        assert_eq!(float_to_i16(1.0), i16::MAX);
        assert_eq!(float_to_i16(2.0), i16::MAX);
        assert_eq!(float_to_i16(-3.0), -i16::MAX);
    }

    #[test]
    fn extend_writes_requested_order() {
        let mut out = Vec::new();
        extend_from_i16(&mut out, &[0x1234], ByteOrder::Big);
        extend_from_i16(&mut out, &[0x1234], ByteOrder::Little);
        assert_eq!(out, vec![0x12, 0x34, 0x34, 0x12]);
    }
}

//! IEEE 754 half-precision storage type.
//!
//! Float16 branches keep their value as text like every other scalar; this
//! type only exists to convert to and from the 2-byte wire form. Conversions
//! round to nearest, ties to even.

use std::fmt;

/// A half-precision float stored as raw bits.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct F16(u16);

impl F16 {
    pub const ZERO: F16 = F16(0);
    pub const INFINITY: F16 = F16(0x7c00);
    pub const NEG_INFINITY: F16 = F16(0xfc00);
    pub const MAX: F16 = F16(0x7bff);

    #[inline]
    #[must_use]
    pub const fn from_bits(bits: u16) -> F16 {
        F16(bits)
    }

    #[inline]
    #[must_use]
    pub const fn to_bits(self) -> u16 {
        self.0
    }

    /// Rounds an `f32` to the nearest representable half. Values beyond the
    /// half range become infinities.
    #[must_use]
    pub fn from_f32(value: f32) -> F16 {
        let x = value.to_bits();
        let sign = ((x >> 16) & 0x8000) as u16;
        let exp = ((x >> 23) & 0xff) as i32;
        let man = x & 0x007f_ffff;

        if exp == 0xff {
            if man == 0 {
                return F16(sign | 0x7c00);
            }
            return F16(sign | 0x7e00 | (man >> 13) as u16);
        }

        let half_exp = exp - 127 + 15;
        if half_exp >= 0x1f {
            return F16(sign | 0x7c00);
        }

        if half_exp <= 0 {
            if 14 - half_exp > 24 {
                return F16(sign);
            }
            let man = man | 0x0080_0000;
            let mut half_man = man >> (14 - half_exp);
            let round_bit = 1u32 << (13 - half_exp);
            if (man & round_bit) != 0 && (man & (3 * round_bit - 1)) != 0 {
                half_man += 1;
            }
            return F16(sign | half_man as u16);
        }

        let bits = u32::from(sign) | ((half_exp as u32) << 10) | (man >> 13);
        let round_bit = 0x0000_1000;
        if (man & round_bit) != 0 && (man & (3 * round_bit - 1)) != 0 {
            F16((bits + 1) as u16)
        } else {
            F16(bits as u16)
        }
    }

    /// Widens to `f32`. Exact for every half value.
    #[must_use]
    pub fn to_f32(self) -> f32 {
        let bits = u32::from(self.0);
        let sign = (bits & 0x8000) << 16;
        let exp = (bits >> 10) & 0x1f;
        let man = bits & 0x03ff;

        if exp == 0 {
            if man == 0 {
                return f32::from_bits(sign);
            }
            // subnormal: man * 2^-24
            let magnitude = man as f32 / 16_777_216.0;
            return if sign != 0 { -magnitude } else { magnitude };
        }

        if exp == 0x1f {
            return f32::from_bits(sign | 0x7f80_0000 | (man << 13));
        }

        f32::from_bits(sign | ((exp + 127 - 15) << 23) | (man << 13))
    }

    #[must_use]
    pub fn is_nan(self) -> bool {
        (self.0 & 0x7c00) == 0x7c00 && (self.0 & 0x03ff) != 0
    }
}

impl From<F16> for f32 {
    fn from(value: F16) -> f32 {
        value.to_f32()
    }
}

impl fmt::Debug for F16 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "F16({})", self.to_f32())
    }
}

impl fmt::Display for F16 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_f32())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_values() {
        assert_eq!(F16::from_f32(1.0).to_bits(), 0x3c00);
        assert_eq!(F16::from_f32(-2.0).to_bits(), 0xc000);
        assert_eq!(F16::from_f32(0.5).to_bits(), 0x3800);
        assert_eq!(F16::from_f32(65504.0), F16::MAX);
        assert_eq!(F16::from_f32(0.0), F16::ZERO);
        assert_eq!(F16::from_bits(0x3c00).to_f32(), 1.0);
        assert_eq!(F16::from_bits(0x3555).to_f32(), 0.333_251_95);
    }

    #[test]
    fn test_overflow_and_special() {
        assert_eq!(F16::from_f32(1.0e6), F16::INFINITY);
        assert_eq!(F16::from_f32(-1.0e6), F16::NEG_INFINITY);
        assert_eq!(F16::from_f32(f32::INFINITY).to_f32(), f32::INFINITY);
        assert!(F16::from_f32(f32::NAN).is_nan());
        assert!(F16::from_f32(f32::NAN).to_f32().is_nan());
    }

    #[test]
    fn test_subnormals() {
        let smallest = F16::from_bits(0x0001);
        assert_eq!(smallest.to_f32(), 5.960_464_5e-8);
        assert_eq!(F16::from_f32(5.960_464_5e-8), smallest);
        assert_eq!(F16::from_f32(1.0e-10), F16::ZERO);
    }

    #[test]
    fn test_rounding_ties_to_even() {
        // 1 + 2^-11 sits halfway between 1.0 and the next half; rounds down to even
        assert_eq!(F16::from_f32(1.000_488_3).to_bits(), 0x3c00);
        // 1 + 3 * 2^-11 rounds up to even
        assert_eq!(F16::from_f32(1.001_464_8).to_bits(), 0x3c02);
    }

    #[test]
    fn test_widening_is_lossless() {
        for bits in (0u16..0x7c00).step_by(97) {
            let half = F16::from_bits(bits);
            assert_eq!(F16::from_f32(half.to_f32()), half);
        }
    }
}

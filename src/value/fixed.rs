use anyhow::{bail, Result};
use std::fmt;

const SCALE: i64 = 1_000_000;

/// A signed decimal with exactly six digits after the point, stored as an
/// integer scaled by 10^6. Six digits of a degree is about a centimetre on the
/// ground, which is as much precision as GPS metadata ever carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FixedDecimal(pub i64);

impl FixedDecimal {
    pub const ZERO: FixedDecimal = FixedDecimal(0);

    /// Parse `[-]digits[.digits]`. Fractional digits past the sixth are ignored.
    pub fn parse(s: &str) -> Result<Self> {
        let mut s = s.trim();
        let mut neg = false;
        if let Some(rest) = s.strip_prefix('-') {
            neg = true;
            s = rest;
        } else if let Some(rest) = s.strip_prefix('+') {
            s = rest;
        }
        if s.is_empty() || s == "." {
            bail!("invalid fixed decimal number");
        }
        let mut value: i64 = 0;
        let mut seen_point = false;
        let mut frac_digits = 0;
        for c in s.chars() {
            match c {
                '0'..='9' => {
                    if frac_digits >= 6 {
                        continue;
                    }
                    value = value
                        .checked_mul(10)
                        .and_then(|v| v.checked_add(i64::from(c as u8 - b'0')))
                        .ok_or_else(|| anyhow::anyhow!("fixed decimal number out of range"))?;
                    if seen_point {
                        frac_digits += 1;
                    }
                }
                '.' if !seen_point => seen_point = true,
                _ => bail!("invalid fixed decimal number"),
            }
        }
        while frac_digits < 6 {
            value = value
                .checked_mul(10)
                .ok_or_else(|| anyhow::anyhow!("fixed decimal number out of range"))?;
            frac_digits += 1;
        }
        Ok(FixedDecimal(if neg { -value } else { value }))
    }

    /// The value nearest to `num / den`, rounding half away from zero.
    ///
    /// # Panics
    ///
    /// Panics if `den` is not positive.
    pub fn from_fraction(num: i64, den: i64) -> Self {
        assert!(den > 0, "non-positive denominator");
        // One extra digit for rounding.
        let scaled = i128::from(num) * i128::from(SCALE) * 10 / i128::from(den);
        let rounded = if scaled % 10 >= 5 {
            scaled / 10 + 1
        } else if scaled % 10 <= -5 {
            scaled / 10 - 1
        } else {
            scaled / 10
        };
        FixedDecimal(rounded as i64)
    }

    pub fn from_int(n: i64) -> Self {
        FixedDecimal(n * SCALE)
    }

    /// Numerator and denominator of an equivalent fraction, reduced by
    /// common powers of ten.
    pub fn to_fraction(self) -> (i64, i64) {
        let (mut num, mut den) = (self.0, SCALE);
        while num % 10 == 0 && den > 1 {
            num /= 10;
            den /= 10;
        }
        (num, den)
    }

    /// Integer part, truncated toward zero.
    pub fn int(self) -> i64 {
        self.0 / SCALE
    }

    pub fn abs(self) -> Self {
        FixedDecimal(self.0.abs())
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn mul(self, other: FixedDecimal) -> Self {
        FixedDecimal((i128::from(self.0) * i128::from(other.0) / i128::from(SCALE)) as i64)
    }

    /// Fixed-point division, rounded half away from zero.
    pub fn div(self, other: FixedDecimal) -> Self {
        let scaled = i128::from(self.0) * i128::from(SCALE) * 10 / i128::from(other.0);
        let rounded = if scaled % 10 >= 5 {
            scaled / 10 + 1
        } else if scaled % 10 <= -5 {
            scaled / 10 - 1
        } else {
            scaled / 10
        };
        FixedDecimal(rounded as i64)
    }
}

impl std::ops::Add for FixedDecimal {
    type Output = FixedDecimal;
    fn add(self, rhs: FixedDecimal) -> FixedDecimal {
        FixedDecimal(self.0 + rhs.0)
    }
}

impl std::ops::Sub for FixedDecimal {
    type Output = FixedDecimal;
    fn sub(self, rhs: FixedDecimal) -> FixedDecimal {
        FixedDecimal(self.0 - rhs.0)
    }
}

impl std::ops::Neg for FixedDecimal {
    type Output = FixedDecimal;
    fn neg(self) -> FixedDecimal {
        FixedDecimal(-self.0)
    }
}

impl fmt::Display for FixedDecimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let s = format!("{}.{:06}", abs / SCALE as u64, abs % SCALE as u64);
        let s = s.trim_end_matches('0').trim_end_matches('.');
        if s == "0" || s.is_empty() {
            return f.write_str("0");
        }
        write!(f, "{sign}{s}")
    }
}

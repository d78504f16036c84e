use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};
use std::str::FromStr;

use crate::error::EditorError;

/// Timescale used when converting floating seconds into ticks (1/600 s)
pub const DEFAULT_TIMESCALE: i64 = 600;

/// Exact rational number used for every timestamp and duration.
///
/// Always stored reduced with a positive denominator, so derived equality
/// is exact rational equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rational {
    num: i64,
    den: i64,
}

impl Rational {
    pub const ZERO: Rational = Rational { num: 0, den: 1 };
    pub const ONE: Rational = Rational { num: 1, den: 1 };

    /// Create a reduced rational.
    ///
    /// # Panics
    ///
    /// Panics if `den` is zero.
    pub fn new(num: i64, den: i64) -> Self {
        assert!(den != 0, "rational denominator must be non-zero");
        Self::from_wide(num as i128, den as i128)
    }

    pub fn from_integer(value: i64) -> Self {
        Self { num: value, den: 1 }
    }

    /// Convert floating seconds to the nearest tick at `timescale`.
    pub fn from_seconds(seconds: f64, timescale: i64) -> Self {
        let timescale = timescale.max(1);
        let ticks = (seconds * timescale as f64).round() as i64;
        Self::new(ticks, timescale)
    }

    pub fn numerator(&self) -> i64 {
        self.num
    }

    pub fn denominator(&self) -> i64 {
        self.den
    }

    pub fn is_zero(&self) -> bool {
        self.num == 0
    }

    pub fn is_positive(&self) -> bool {
        self.num > 0
    }

    pub fn is_negative(&self) -> bool {
        self.num < 0
    }

    /// Lossy conversion, only for the render boundary and for display.
    pub fn as_seconds_f64(&self) -> f64 {
        self.num as f64 / self.den as f64
    }

    /// Whole seconds, rounded toward negative infinity
    pub fn floor_seconds(&self) -> i64 {
        self.num.div_euclid(self.den)
    }

    pub fn checked_div(self, rhs: Rational) -> Option<Rational> {
        if rhs.is_zero() {
            return None;
        }
        Some(Self::from_wide(
            self.num as i128 * rhs.den as i128,
            self.den as i128 * rhs.num as i128,
        ))
    }

    /// Round to the nearest tick at `timescale` (ties away from zero).
    pub fn round_to_timescale(self, timescale: i64) -> Rational {
        let timescale = timescale.max(1) as i128;
        let scaled = self.num as i128 * timescale;
        let den = self.den as i128;
        let ticks = if scaled >= 0 {
            (2 * scaled + den) / (2 * den)
        } else {
            -((-2 * scaled + den) / (2 * den))
        };
        Self::from_wide(ticks, timescale)
    }

    fn from_wide(num: i128, den: i128) -> Self {
        let (mut num, mut den) = if den < 0 { (-num, -den) } else { (num, den) };
        let g = gcd(num.unsigned_abs(), den.unsigned_abs()).max(1) as i128;
        num /= g;
        den /= g;

        match (i64::try_from(num), i64::try_from(den)) {
            (Ok(num), Ok(den)) => Self { num, den },
            // Out of i64 range: fall back to nanosecond resolution
            _ => {
                let scaled = num.saturating_mul(1_000_000_000) / den;
                Self::from_wide_saturating(scaled, 1_000_000_000)
            }
        }
    }

    fn from_wide_saturating(num: i128, den: i64) -> Self {
        let num = num.clamp(i64::MIN as i128 + 1, i64::MAX as i128) as i64;
        let g = gcd(num.unsigned_abs() as u128, den as u128).max(1) as i64;
        Self { num: num / g, den: den / g }
    }
}

fn gcd(mut a: u128, mut b: u128) -> u128 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

impl Default for Rational {
    fn default() -> Self {
        Self::ZERO
    }
}

impl From<i64> for Rational {
    fn from(value: i64) -> Self {
        Self::from_integer(value)
    }
}

impl Ord for Rational {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.num as i128 * other.den as i128).cmp(&(other.num as i128 * self.den as i128))
    }
}

impl PartialOrd for Rational {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Add for Rational {
    type Output = Rational;

    fn add(self, rhs: Rational) -> Rational {
        Rational::from_wide(
            self.num as i128 * rhs.den as i128 + rhs.num as i128 * self.den as i128,
            self.den as i128 * rhs.den as i128,
        )
    }
}

impl Sub for Rational {
    type Output = Rational;

    fn sub(self, rhs: Rational) -> Rational {
        self + (-rhs)
    }
}

impl Mul for Rational {
    type Output = Rational;

    fn mul(self, rhs: Rational) -> Rational {
        Rational::from_wide(
            self.num as i128 * rhs.num as i128,
            self.den as i128 * rhs.den as i128,
        )
    }
}

impl Div for Rational {
    type Output = Rational;

    /// # Panics
    ///
    /// Panics on division by zero; use [`Rational::checked_div`] when the divisor is untrusted.
    fn div(self, rhs: Rational) -> Rational {
        match self.checked_div(rhs) {
            Some(value) => value,
            None => panic!("rational division by zero"),
        }
    }
}

impl Neg for Rational {
    type Output = Rational;

    fn neg(self) -> Rational {
        Rational { num: -self.num, den: self.den }
    }
}

impl AddAssign for Rational {
    fn add_assign(&mut self, rhs: Rational) {
        *self = *self + rhs;
    }
}

impl SubAssign for Rational {
    fn sub_assign(&mut self, rhs: Rational) {
        *self = *self - rhs;
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.den == 1 {
            write!(f, "{}", self.num)
        } else {
            write!(f, "{}/{}", self.num, self.den)
        }
    }
}

impl FromStr for Rational {
    type Err = EditorError;

    /// Accepts `"3/2"`, `"2"`, or exact decimals such as `"1.25"` (no float rounding).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || EditorError::invalid_range(format!("not a number: '{}'", s));

        if let Some((num, den)) = s.split_once('/') {
            let num: i64 = num.trim().parse().map_err(|_| invalid())?;
            let den: i64 = den.trim().parse().map_err(|_| invalid())?;
            if den == 0 {
                return Err(invalid());
            }
            return Ok(Rational::new(num, den));
        }

        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s.strip_prefix('+').unwrap_or(s)),
        };
        let (whole, frac) = digits.split_once('.').unwrap_or((digits, ""));
        if whole.is_empty() && frac.is_empty() {
            return Err(invalid());
        }
        if !whole.chars().chain(frac.chars()).all(|c| c.is_ascii_digit()) || frac.len() > 12 {
            return Err(invalid());
        }

        let whole: i64 = if whole.is_empty() { 0 } else { whole.parse().map_err(|_| invalid())? };
        let scale = 10i64.pow(frac.len() as u32);
        let frac: i64 = if frac.is_empty() { 0 } else { frac.parse().map_err(|_| invalid())? };
        let value = Rational::from_integer(whole) + Rational::new(frac, scale);

        Ok(if negative { -value } else { value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reduction_and_sign() {
        let r = Rational::new(1200, -600);
        assert_eq!(r.numerator(), -2);
        assert_eq!(r.denominator(), 1);
        assert_eq!(Rational::new(3, 6), Rational::new(1, 2));
    }

    #[test]
    fn test_arithmetic_is_exact() {
        let third = Rational::new(1, 3);
        let sum = third + third + third;
        assert_eq!(sum, Rational::ONE);

        let tick = Rational::new(1, 600);
        let mut acc = Rational::ZERO;
        for _ in 0..600 {
            acc += tick;
        }
        assert_eq!(acc, Rational::ONE);
    }

    #[test]
    fn test_subtract_then_add_restores_value() {
        let values = [
            Rational::new(7, 600),
            Rational::new(-5, 3),
            Rational::from_integer(10),
            Rational::new(1001, 30000),
        ];
        for &a in &values {
            for &b in &values {
                assert_eq!((b - a) + a, b);
            }
        }
    }

    #[test]
    fn test_ordering() {
        assert!(Rational::new(1, 3) < Rational::new(1, 2));
        assert!(Rational::new(-1, 2) < Rational::ZERO);
        assert_eq!(Rational::new(2, 4).cmp(&Rational::new(1, 2)), Ordering::Equal);
    }

    #[test]
    fn test_parse_forms() {
        assert_eq!("3/2".parse::<Rational>().unwrap(), Rational::new(3, 2));
        assert_eq!("1.5".parse::<Rational>().unwrap(), Rational::new(3, 2));
        assert_eq!("2".parse::<Rational>().unwrap(), Rational::from_integer(2));
        assert_eq!("-0.25".parse::<Rational>().unwrap(), Rational::new(-1, 4));
        assert!("abc".parse::<Rational>().is_err());
        assert!("1/0".parse::<Rational>().is_err());
        assert!(".".parse::<Rational>().is_err());
    }

    #[test]
    fn test_checked_div_by_zero() {
        assert!(Rational::ONE.checked_div(Rational::ZERO).is_none());
        assert_eq!(Rational::from_integer(3).checked_div(Rational::new(3, 2)), Some(Rational::from_integer(2)));
    }

    #[test]
    fn test_round_to_timescale() {
        assert_eq!(Rational::new(1, 3).round_to_timescale(600), Rational::new(200, 600));
        assert_eq!(Rational::new(1, 1199).round_to_timescale(600), Rational::new(1, 600));
        assert_eq!(Rational::new(1, 1201).round_to_timescale(600), Rational::ZERO);
        assert_eq!(Rational::from_seconds(2.5, 600), Rational::new(5, 2));
    }

    #[test]
    fn test_floor_seconds() {
        assert_eq!(Rational::new(7, 2).floor_seconds(), 3);
        assert_eq!(Rational::new(-1, 2).floor_seconds(), -1);
    }
}

//! # Complex Number Module
//!
//! The handful of complex operations the sliding DFT recurrence needs.
//! Every operation returns a new value; operands are never mutated.

use std::ops::{Add, Mul, Sub};

/// A complex number with `f64` parts.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Complex {
    /// Real part.
    pub re: f64,
    /// Imaginary part.
    pub im: f64,
}

impl Complex {
    pub const ZERO: Complex = Complex { re: 0.0, im: 0.0 };

    pub const fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }

    /// Complex exponential: `e^re * (cos(im) + i*sin(im))`.
    pub fn exp(self) -> Self {
        let scale = self.re.exp();
        Self {
            re: scale * self.im.cos(),
            im: scale * self.im.sin(),
        }
    }

    /// Euclidean norm, `sqrt(re^2 + im^2)`.
    pub fn magnitude(self) -> f64 {
        (self.re * self.re + self.im * self.im).sqrt()
    }
}

impl From<f64> for Complex {
    fn from(re: f64) -> Self {
        Self { re, im: 0.0 }
    }
}

impl Add for Complex {
    type Output = Complex;

    fn add(self, rhs: Complex) -> Complex {
        Complex::new(self.re + rhs.re, self.im + rhs.im)
    }
}

impl Sub for Complex {
    type Output = Complex;

    fn sub(self, rhs: Complex) -> Complex {
        Complex::new(self.re - rhs.re, self.im - rhs.im)
    }
}

impl Mul for Complex {
    type Output = Complex;

    fn mul(self, rhs: Complex) -> Complex {
        Complex::new(
            self.re * rhs.re - self.im * rhs.im,
            self.re * rhs.im + self.im * rhs.re,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn test_arithmetic() {
        let a = Complex::new(1.0, 2.0);
        let b = Complex::new(3.0, -1.0);

        assert_eq!(a + b, Complex::new(4.0, 1.0));
        assert_eq!(a - b, Complex::new(-2.0, 3.0));
        // (1 + 2i)(3 - i) = 3 - i + 6i - 2i^2 = 5 + 5i
        assert_eq!(a * b, Complex::new(5.0, 5.0));
    }

    #[test]
    fn test_operands_are_untouched() {
        let a = Complex::new(0.5, -0.25);
        let b = Complex::from(2.0);
        let _ = a * b + a - b;
        assert_eq!(a, Complex::new(0.5, -0.25));
        assert_eq!(b, Complex::new(2.0, 0.0));
    }

    #[test]
    fn test_exp_on_unit_circle() {
        let quarter = Complex::new(0.0, PI / 2.0).exp();
        assert_relative_eq!(quarter.re, 0.0, epsilon = 1e-15);
        assert_relative_eq!(quarter.im, 1.0, epsilon = 1e-15);
        assert_relative_eq!(quarter.magnitude(), 1.0, epsilon = 1e-15);

        let scaled = Complex::new(1.0, PI).exp();
        assert_relative_eq!(scaled.re, -std::f64::consts::E, epsilon = 1e-12);
        assert_relative_eq!(scaled.im, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_magnitude() {
        assert_eq!(Complex::new(3.0, 4.0).magnitude(), 5.0);
        assert_eq!(Complex::ZERO.magnitude(), 0.0);
    }
}

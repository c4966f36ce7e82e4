//! Monic cubic integrands and their bounding rectangles.

use serde::Serialize;

use crate::core::IntegrationError;
use crate::math::quadrature::composite_gauss_legendre;

/// f(x) = (x - a)(x - b)(x - c).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Cubic {
    pub a: i32,
    pub b: i32,
    pub c: i32,
}

impl Cubic {
    pub fn new(a: i32, b: i32, c: i32) -> Self {
        Self { a, b, c }
    }

    #[inline(always)]
    pub fn eval(&self, x: f64) -> f64 {
        (x - self.a as f64) * (x - self.b as f64) * (x - self.c as f64)
    }

    /// Exact value at an integer abscissa.
    #[inline]
    pub fn eval_exact(&self, x: i64) -> i64 {
        (x - self.a as i64) * (x - self.b as i64) * (x - self.c as i64)
    }

    pub fn min_root(&self) -> i32 {
        self.a.min(self.b).min(self.c)
    }

    pub fn max_root(&self) -> i32 {
        self.a.max(self.b).max(self.c)
    }

    /// Elementary symmetric polynomials of the roots.
    fn symmetric(&self) -> (f64, f64, f64) {
        let (a, b, c) = (self.a as f64, self.b as f64, self.c as f64);
        (a + b + c, a * b + b * c + c * a, a * b * c)
    }

    /// F(x) with F' = f and F(0) = 0.
    pub fn antiderivative(&self, x: f64) -> f64 {
        let (s1, s2, s3) = self.symmetric();
        // x^4/4 - s1 x^3/3 + s2 x^2/2 - s3 x
        (((0.25 * x - s1 / 3.0) * x + 0.5 * s2) * x - s3) * x
    }

    /// Signed integral of f over `[lo, hi]`.
    pub fn integral(&self, lo: f64, hi: f64) -> f64 {
        self.antiderivative(hi) - self.antiderivative(lo)
    }

    /// Local extrema of f, in increasing order. Equal when all roots coincide.
    pub fn critical_points(&self) -> (f64, f64) {
        let (s1, s2, _) = self.symmetric();
        // f'(x) = 3x^2 - 2 s1 x + s2; discriminant / 4 = s1^2 - 3 s2 >= 0
        let half_disc = (s1 * s1 - 3.0 * s2).max(0.0).sqrt();
        ((s1 - half_disc) / 3.0, (s1 + half_disc) / 3.0)
    }
}

/// Integer bounding rectangle `[xmin, xmax] x [ymin, ymax]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IntegrationDomain {
    pub xmin: i32,
    pub xmax: i32,
    pub ymin: i32,
    pub ymax: i32,
}

impl IntegrationDomain {
    /// Pads the root span by one unit on each side and takes the curve values
    /// at the padded ends as vertical bounds.
    pub fn from_cubic(cubic: &Cubic) -> Result<Self, IntegrationError> {
        let xmin = cubic.min_root() as i64 - 1;
        let xmax = cubic.max_root() as i64 + 1;
        let narrow = |v: i64, what: &str| {
            i32::try_from(v).map_err(|_| {
                IntegrationError::InvalidArgument(format!(
                    "{what} = {v} does not fit the integer domain for roots {cubic:?}"
                ))
            })
        };

        Ok(Self {
            xmin: narrow(xmin, "xmin")?,
            xmax: narrow(xmax, "xmax")?,
            ymin: narrow(cubic.eval_exact(xmin), "ymin")?,
            ymax: narrow(cubic.eval_exact(xmax), "ymax")?,
        })
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.xmax as f64 - self.xmin as f64
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.ymax as f64 - self.ymin as f64
    }

    #[inline]
    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }
}

/// Signed point classification against the curve value `fx`.
///
/// +1 when `0 < y < fx`, -1 when `fx < y < 0`, otherwise 0.
#[inline(always)]
pub fn signed_contribution(fx: f64, y: f64) -> i64 {
    if fx > 0.0 && y > 0.0 && y < fx {
        1
    } else if fx < 0.0 && y < 0.0 && y > fx {
        -1
    } else {
        0
    }
}

/// A cubic together with the rectangle it is sampled over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CubicIntegral {
    pub cubic: Cubic,
    pub domain: IntegrationDomain,
}

impl CubicIntegral {
    pub fn from_roots(a: i32, b: i32, c: i32) -> Result<Self, IntegrationError> {
        let cubic = Cubic::new(a, b, c);
        let domain = IntegrationDomain::from_cubic(&cubic)?;
        Ok(Self { cubic, domain })
    }

    /// Reads the roots from the digits at positions 6, 7 and 8 of `id`.
    ///
    /// ```
    /// use matecarlo::math::CubicIntegral;
    ///
    /// let problem = CubicIntegral::from_id("231RDB026").unwrap();
    /// assert_eq!((problem.cubic.a, problem.cubic.b, problem.cubic.c), (0, 2, 6));
    /// assert_eq!((problem.domain.xmin, problem.domain.xmax), (-1, 7));
    /// ```
    pub fn from_id(id: &str) -> Result<Self, IntegrationError> {
        let digit = |pos: usize| {
            id.chars()
                .nth(pos)
                .and_then(|ch| ch.to_digit(10))
                .map(|d| d as i32)
                .ok_or_else(|| {
                    IntegrationError::InvalidArgument(format!(
                        "id `{id}` has no decimal digit at position {pos}"
                    ))
                })
        };
        Self::from_roots(digit(6)?, digit(7)?, digit(8)?)
    }

    #[inline]
    pub fn area(&self) -> f64 {
        self.domain.area()
    }

    /// Classifies one point of the rectangle.
    #[inline(always)]
    pub fn contribution(&self, x: f64, y: f64) -> i64 {
        signed_contribution(self.cubic.eval(x), y)
    }

    /// Analytic signed integral of f over `[xmin, xmax]`.
    pub fn analytic_value(&self) -> f64 {
        self.cubic
            .integral(self.domain.xmin as f64, self.domain.xmax as f64)
    }

    /// True when the curve never leaves the rectangle vertically.
    pub fn curve_fits_domain(&self) -> bool {
        let (lo, hi) = self.cubic.critical_points();
        let ymin = self.domain.ymin as f64;
        let ymax = self.domain.ymax as f64;
        [lo, hi].iter().all(|&x| {
            let fx = self.cubic.eval(x);
            fx >= ymin && fx <= ymax
        })
    }

    /// Value the estimator converges to: the integral of f clamped to
    /// `[ymin, ymax]`. Equals [`analytic_value`](Self::analytic_value) when
    /// the curve fits the rectangle.
    pub fn reference_value(&self) -> f64 {
        if self.curve_fits_domain() {
            return self.analytic_value();
        }
        let ymin = self.domain.ymin as f64;
        let ymax = self.domain.ymax as f64;
        composite_gauss_legendre(
            |x| self.cubic.eval(x).clamp(ymin, ymax),
            self.domain.xmin as f64,
            self.domain.xmax as f64,
            4096,
        )
    }
}

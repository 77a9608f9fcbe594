//! Response curves: piecewise functions of a normalized position
//!
//! Curves drive every "value at normalized position" parameter: acceptance
//! probability, step scaling, distortion strength and spherical density.

use crate::io::configuration::{CURVE_INTEGRAL_STEPS, MIN_CURVE_VALUE};
use serde::{Deserialize, Serialize};

/// Control point of a piecewise curve
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    /// Abscissa, usually in `[0, 1]`
    pub x: f64,
    /// Value at `x`
    pub y: f64,
}

impl CurvePoint {
    /// Point at `(x, y)`
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Piecewise function evaluated at a normalized position
///
/// Points must be sorted by strictly increasing `x`; evaluation clamps to the
/// first and last point. A curve without points evaluates to `1.0`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseCurve {
    /// Same value everywhere
    Constant {
        /// The value
        value: f64,
    },
    /// Straight segments between points
    Linear {
        /// Control points
        points: Vec<CurvePoint>,
    },
    /// Natural cubic spline through points
    Spline {
        /// Control points
        points: Vec<CurvePoint>,
    },
    /// `1 / inner`, with the inner value floored at [`MIN_CURVE_VALUE`]
    Reciprocal {
        /// Curve being inverted
        inner: Box<ResponseCurve>,
    },
}

impl Default for ResponseCurve {
    fn default() -> Self {
        Self::one()
    }
}

impl ResponseCurve {
    /// Neutral curve, `1.0` everywhere
    pub const fn one() -> Self {
        Self::Constant { value: 1.0 }
    }

    /// Piecewise-linear curve through `(x, y)` pairs
    pub fn linear(points: &[(f64, f64)]) -> Self {
        Self::Linear {
            points: points.iter().map(|&(x, y)| CurvePoint::new(x, y)).collect(),
        }
    }

    /// Natural cubic spline through `(x, y)` pairs
    pub fn spline(points: &[(f64, f64)]) -> Self {
        Self::Spline {
            points: points.iter().map(|&(x, y)| CurvePoint::new(x, y)).collect(),
        }
    }

    /// Value of the curve at `x`
    pub fn calc_value(&self, x: f64) -> f64 {
        match self {
            Self::Constant { value } => *value,
            Self::Linear { points } => linear_value(points, x),
            Self::Spline { points } => spline_value(points, x),
            Self::Reciprocal { inner } => 1.0 / inner.calc_value(x).max(MIN_CURVE_VALUE),
        }
    }

    /// Definite integral over `[from, to]` (negative when `to < from`)
    pub fn calc_integral(&self, from: f64, to: f64) -> f64 {
        if let Self::Constant { value } = self {
            return value * (to - from);
        }
        if (to - from).abs() <= f64::EPSILON {
            return 0.0;
        }

        // Composite Simpson rule
        let n = CURVE_INTEGRAL_STEPS;
        let h = (to - from) / n as f64;
        let mut sum = self.calc_value(from) + self.calc_value(to);
        for i in 1..n {
            let weight = if i % 2 == 1 { 4.0 } else { 2.0 };
            sum += weight * self.calc_value((i as f64).mul_add(h, from));
        }
        sum * h / 3.0
    }

    /// Reciprocal function `1 / self`
    #[must_use]
    pub fn reciprocal(&self) -> Self {
        match self {
            Self::Constant { value } => Self::Constant {
                value: 1.0 / value.max(MIN_CURVE_VALUE),
            },
            Self::Reciprocal { inner } => (**inner).clone(),
            other => Self::Reciprocal {
                inner: Box::new(other.clone()),
            },
        }
    }
}

fn clamped_ends(points: &[CurvePoint], x: f64) -> Option<f64> {
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return Some(1.0);
    };
    if x <= first.x {
        Some(first.y)
    } else if x >= last.x {
        Some(last.y)
    } else {
        None
    }
}

/// Index `k` such that `points[k].x <= x < points[k + 1].x`
fn segment_index(points: &[CurvePoint], x: f64) -> usize {
    let upper = points.partition_point(|p| p.x <= x);
    upper.saturating_sub(1).min(points.len().saturating_sub(2))
}

fn linear_value(points: &[CurvePoint], x: f64) -> f64 {
    if let Some(value) = clamped_ends(points, x) {
        return value;
    }
    let k = segment_index(points, x);
    let (Some(lo), Some(hi)) = (points.get(k), points.get(k + 1)) else {
        return 1.0;
    };
    let span = hi.x - lo.x;
    if span <= 0.0 {
        return lo.y;
    }
    let t = (x - lo.x) / span;
    (hi.y - lo.y).mul_add(t, lo.y)
}

/// Second derivatives of the natural spline (zero at both ends)
fn natural_second_derivatives(points: &[CurvePoint]) -> Vec<f64> {
    let n = points.len();
    let mut second = vec![0.0; n];
    if n < 3 {
        return second;
    }

    // Tridiagonal sweep
    let mut carry = vec![0.0; n];
    for i in 1..n - 1 {
        let (Some(prev), Some(cur), Some(next)) =
            (points.get(i - 1), points.get(i), points.get(i + 1))
        else {
            continue;
        };
        let sig = (cur.x - prev.x) / (next.x - prev.x);
        let prev_second = second.get(i - 1).copied().unwrap_or(0.0);
        let prev_carry = carry.get(i - 1).copied().unwrap_or(0.0);
        let p = sig.mul_add(prev_second, 2.0);
        let slope_change = (next.y - cur.y) / (next.x - cur.x) - (cur.y - prev.y) / (cur.x - prev.x);
        if let Some(s) = second.get_mut(i) {
            *s = (sig - 1.0) / p;
        }
        if let Some(c) = carry.get_mut(i) {
            *c = sig.mul_add(-prev_carry, 6.0 * slope_change / (next.x - prev.x)) / p;
        }
    }

    for k in (0..n - 1).rev() {
        let next_second = second.get(k + 1).copied().unwrap_or(0.0);
        let c = carry.get(k).copied().unwrap_or(0.0);
        if let Some(s) = second.get_mut(k) {
            *s = s.mul_add(next_second, c);
        }
    }
    second
}

fn spline_value(points: &[CurvePoint], x: f64) -> f64 {
    if let Some(value) = clamped_ends(points, x) {
        return value;
    }
    if points.len() < 3 {
        return linear_value(points, x);
    }
    let second = natural_second_derivatives(points);
    let k = segment_index(points, x);
    let (Some(lo), Some(hi)) = (points.get(k), points.get(k + 1)) else {
        return 1.0;
    };
    let h = hi.x - lo.x;
    if h <= 0.0 {
        return lo.y;
    }
    let s_lo = second.get(k).copied().unwrap_or(0.0);
    let s_hi = second.get(k + 1).copied().unwrap_or(0.0);
    let a = (hi.x - x) / h;
    let b = (x - lo.x) / h;
    a * lo.y + b * hi.y + ((a.powi(3) - a) * s_lo + (b.powi(3) - b) * s_hi) * h * h / 6.0
}

/// Where a curve-scaled parameter reads its abscissa from
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurveSource {
    /// The normalized placement position
    #[default]
    Position,
    /// The value pulled from the module wired to the back-reference input
    BackReference,
}

/// A base value scaled by a response curve
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScaledParam {
    /// Base value
    pub value: f64,
    /// Scaling curve
    #[serde(default)]
    pub curve: ResponseCurve,
    /// Abscissa source for the curve
    #[serde(default)]
    pub source: CurveSource,
}

impl ScaledParam {
    /// Base value with a neutral curve
    pub const fn fixed(value: f64) -> Self {
        Self {
            value,
            curve: ResponseCurve::one(),
            source: CurveSource::Position,
        }
    }

    /// Base value scaled by `curve` read at the placement position
    pub const fn with_curve(value: f64, curve: ResponseCurve) -> Self {
        Self {
            value,
            curve,
            source: CurveSource::Position,
        }
    }

    /// Whether evaluation needs the back-reference value
    pub fn reads_back_reference(&self) -> bool {
        self.source == CurveSource::BackReference
    }

    /// Abscissa for this parameter; falls back to `position` without a value
    pub fn abscissa(&self, position: f64, back_reference: Option<f64>) -> f64 {
        match (self.source, back_reference) {
            (CurveSource::BackReference, Some(value)) => value,
            _ => position,
        }
    }

    /// `value × curve(x)` where `x` follows [`ScaledParam::source`]
    pub fn evaluate(&self, position: f64, back_reference: Option<f64>) -> f64 {
        self.value * self.curve.calc_value(self.abscissa(position, back_reference))
    }
}

impl Default for ScaledParam {
    fn default() -> Self {
        Self::fixed(0.0)
    }
}

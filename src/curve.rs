//! Load curves driving prescribed boundary conditions, loads and rigid drivers.

use serde::{Deserialize, Serialize};

/// Scalar function of time.
pub trait Curve: Send + Sync {
    fn value(&self, time: f64) -> f64;
}

impl<F> Curve for F
where
    F: Fn(f64) -> f64 + Send + Sync,
{
    fn value(&self, time: f64) -> f64 {
        self(time)
    }
}

/// Behavior outside the range of the curve's points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Extend {
    /// Hold the first/last value
    #[default]
    Constant,
    /// Continue the slope of the first/last segment
    Extrapolate,
}

/// Piecewise linear curve through `(time, value)` points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadCurve {
    points: Vec<(f64, f64)>,
    #[serde(default)]
    extend: Extend,
}

impl LoadCurve {
    /// Points are sorted by time; duplicate times keep their given order.
    pub fn new(points: &[(f64, f64)]) -> Self {
        let mut points = points.to_vec();
        points.sort_by(|a, b| a.0.total_cmp(&b.0));
        LoadCurve {
            points,
            extend: Extend::Constant,
        }
    }

    /// Linear ramp from 0 at t=0 to `value` at t=`time`.
    pub fn ramp(time: f64, value: f64) -> Self {
        LoadCurve::new(&[(0., 0.), (time, value)])
    }

    pub fn with_extend(mut self, extend: Extend) -> Self {
        self.extend = extend;
        self
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    fn segment_value(p0: (f64, f64), p1: (f64, f64), t: f64) -> f64 {
        let dt = p1.0 - p0.0;
        if dt == 0. {
            p1.1
        } else {
            p0.1 + (p1.1 - p0.1) * (t - p0.0) / dt
        }
    }
}

impl Curve for LoadCurve {
    fn value(&self, time: f64) -> f64 {
        let n = self.points.len();
        match n {
            0 => 0.,
            1 => self.points[0].1,
            _ => {
                let (first, last) = (self.points[0], self.points[n - 1]);
                if time <= first.0 {
                    match self.extend {
                        Extend::Constant => first.1,
                        Extend::Extrapolate => {
                            Self::segment_value(first, self.points[1], time)
                        }
                    }
                } else if time >= last.0 {
                    match self.extend {
                        Extend::Constant => last.1,
                        Extend::Extrapolate => {
                            Self::segment_value(self.points[n - 2], last, time)
                        }
                    }
                } else {
                    // First segment whose end is past `time`
                    let i = self.points.partition_point(|p| p.0 <= time);
                    Self::segment_value(self.points[i - 1], self.points[i], time)
                }
            }
        }
    }
}

//! 样条展平：把参数曲线近似为限定偏差内的折线。
//!
//! 展平能力以 trait 形式注入聚合器，算法与容差都可替换、可单测。
//! 默认实现用 de Boor 求值 B 样条，逐节点跨度自适应二分，
//! 直到每条弦的中点偏差不超过容差。

use cutquote_core::document::Spline;
use cutquote_core::geometry::Point2;

/// 输出点列沿曲线有序，真实曲线与折线的偏差不超过 `tolerance`。
/// 退化样条（阶数无效、控制点不足、节点向量不合法）返回空序列，
/// 空序列测得长度 0，不产生错误。
pub trait CurveFlattener {
    fn flatten(&self, spline: &Spline, tolerance: f64) -> Vec<Point2>;
}

/// 容差下限，防止病态输入导致细分失控。
const MIN_TOLERANCE: f64 = 1e-6;

/// 默认展平器：de Boor 求值 + 自适应二分。
#[derive(Debug, Clone, Copy)]
pub struct DeBoorFlattener {
    max_depth: u32,
}

impl DeBoorFlattener {
    pub fn new() -> Self {
        Self { max_depth: 16 }
    }
}

impl Default for DeBoorFlattener {
    fn default() -> Self {
        Self::new()
    }
}

impl CurveFlattener for DeBoorFlattener {
    fn flatten(&self, spline: &Spline, tolerance: f64) -> Vec<Point2> {
        let tolerance = if tolerance.is_finite() {
            tolerance.max(MIN_TOLERANCE)
        } else {
            MIN_TOLERANCE
        };

        match BSpline::try_new(spline) {
            Some(curve) => curve.flatten(tolerance, self.max_depth),
            // 控制网不可用时退化为拟合点折线。
            None => fallback_polyline(spline),
        }
    }
}

fn fallback_polyline(spline: &Spline) -> Vec<Point2> {
    if spline.fit_points.len() >= 2 {
        spline.fit_points.clone()
    } else if spline.control_points.len() >= 2 {
        spline.control_points.clone()
    } else {
        Vec::new()
    }
}

/// 齐次坐标，de Boor 对有理样条按 (wx, wy, w) 插值。
#[derive(Debug, Clone, Copy)]
struct Homog {
    x: f64,
    y: f64,
    w: f64,
}

struct BSpline<'a> {
    degree: usize,
    control: &'a [Point2],
    knots: &'a [f64],
    weights: Option<&'a [f64]>,
}

impl<'a> BSpline<'a> {
    /// 校验控制网。不满足 B 样条基本约束时返回 None，调用方走退化路径。
    fn try_new(spline: &'a Spline) -> Option<Self> {
        let degree = usize::try_from(spline.degree).ok()?;
        if degree < 1 {
            return None;
        }
        let n = spline.control_points.len();
        if n < degree + 1 {
            return None;
        }
        if spline.knot_values.len() != n + degree + 1 {
            return None;
        }
        if spline
            .knot_values
            .iter()
            .any(|knot| !knot.is_finite())
        {
            return None;
        }
        if spline.knot_values.windows(2).any(|pair| pair[1] < pair[0]) {
            return None;
        }
        // 参数域必须有正跨度。
        if spline.knot_values[n] <= spline.knot_values[degree] {
            return None;
        }
        let weights = if spline.is_rational && spline.weights.len() == n {
            Some(spline.weights.as_slice())
        } else {
            None
        };
        Some(Self {
            degree,
            control: &spline.control_points,
            knots: &spline.knot_values,
            weights,
        })
    }

    #[inline]
    fn domain(&self) -> (f64, f64) {
        (self.knots[self.degree], self.knots[self.control.len()])
    }

    fn knot_span(&self, t: f64) -> usize {
        let n = self.control.len();
        let mut span = self.degree;
        while span + 1 < n && t >= self.knots[span + 1] {
            span += 1;
        }
        span
    }

    /// de Boor 算法在参数 t 处求值。
    fn evaluate(&self, t: f64) -> Point2 {
        let degree = self.degree;
        let (start, end) = self.domain();
        let t = t.clamp(start, end);
        let span = self.knot_span(t);

        let mut buffer: Vec<Homog> = (0..=degree)
            .map(|j| {
                let index = span - degree + j;
                let weight = self.weights.map_or(1.0, |weights| weights[index]);
                let point = self.control[index];
                Homog {
                    x: point.x() * weight,
                    y: point.y() * weight,
                    w: weight,
                }
            })
            .collect();

        for level in 1..=degree {
            for j in (level..=degree).rev() {
                let index = span - degree + j;
                let denom = self.knots[index + degree - level + 1] - self.knots[index];
                let alpha = if denom <= f64::EPSILON {
                    0.0
                } else {
                    (t - self.knots[index]) / denom
                };
                buffer[j] = Homog {
                    x: (1.0 - alpha) * buffer[j - 1].x + alpha * buffer[j].x,
                    y: (1.0 - alpha) * buffer[j - 1].y + alpha * buffer[j].y,
                    w: (1.0 - alpha) * buffer[j - 1].w + alpha * buffer[j].w,
                };
            }
        }

        let result = buffer[degree];
        if result.w.abs() <= f64::EPSILON {
            Point2::new(result.x, result.y)
        } else {
            Point2::new(result.x / result.w, result.y / result.w)
        }
    }

    fn flatten(&self, tolerance: f64, max_depth: u32) -> Vec<Point2> {
        let n = self.control.len();
        let (start, _) = self.domain();
        let mut points = vec![self.evaluate(start)];

        // 逐非零节点跨度展平，跨度内自适应细分。
        for span in self.degree..n {
            let t0 = self.knots[span];
            let t1 = self.knots[span + 1];
            if t1 <= t0 {
                continue;
            }
            let p0 = self.evaluate(t0);
            let p1 = self.evaluate(t1);
            self.subdivide(t0, p0, t1, p1, tolerance, max_depth, true, &mut points);
        }
        points
    }

    /// 把 (t0, t1) 段追加到 out（不含 t0 处的点）。
    /// `force` 保证每个跨度至少二分一次，避免对称曲线的中点恰落在弦上而漏分。
    #[allow(clippy::too_many_arguments)]
    fn subdivide(
        &self,
        t0: f64,
        p0: Point2,
        t1: f64,
        p1: Point2,
        tolerance: f64,
        depth: u32,
        force: bool,
        out: &mut Vec<Point2>,
    ) {
        let tm = 0.5 * (t0 + t1);
        let pm = self.evaluate(tm);
        if depth > 0 && (force || chord_deviation(p0, p1, pm) > tolerance) {
            self.subdivide(t0, p0, tm, pm, tolerance, depth - 1, false, out);
            self.subdivide(tm, pm, t1, p1, tolerance, depth - 1, false, out);
        } else {
            out.push(p1);
        }
    }
}

/// 点到弦（线段）的距离。
fn chord_deviation(start: Point2, end: Point2, point: Point2) -> f64 {
    let chord = start.vector_to(end);
    let len_sq = chord.length_squared();
    if len_sq <= f64::EPSILON {
        return start.distance_to(point);
    }
    let offset = start.vector_to(point);
    let t = (offset.x() * chord.x() + offset.y() * chord.y()) / len_sq;
    let t = t.clamp(0.0, 1.0);
    let nearest = Point2::new(start.x() + chord.x() * t, start.y() + chord.y() * t);
    nearest.distance_to(point)
}

//! 逐实体的长度计算。
//!
//! 每个函数对一种实体类型求切割路径长度。畸形输入不报错：
//! 返回 `None`（或 0）表示该实体按 0 计入，由聚合层统一处理，
//! 单个坏实体永远不会中断整份文档的度量。

use cutquote_core::document::{Arc, Circle, Line, LwPolyline, Spline, VertexPolyline};

use crate::flatten::CurveFlattener;

/// 直线段：起点到终点的欧氏距离。
#[inline]
pub fn line_length(line: &Line) -> f64 {
    line.start.distance_to(line.end)
}

/// 圆弧：扫过角 = |终止角 − 起始角|（度），超过 360 时取模；
/// 长度 = 半径 × 弧度角。半径非正或字段非有限值时视为退化弧。
pub fn arc_length(arc: &Arc) -> Option<f64> {
    if !arc.radius.is_finite() || !arc.start_angle.is_finite() || !arc.end_angle.is_finite() {
        return None;
    }
    if arc.radius <= 0.0 {
        return None;
    }
    let mut angle = (arc.end_angle - arc.start_angle).abs();
    if angle > 360.0 {
        angle %= 360.0;
    }
    Some(arc.radius * angle.to_radians())
}

/// 圆：周长 2πr。
pub fn circle_length(circle: &Circle) -> Option<f64> {
    if !circle.radius.is_finite() || circle.radius <= 0.0 {
        return None;
    }
    Some(std::f64::consts::TAU * circle.radius)
}

/// 轻量多段线：相邻顶点距离之和，闭合时补上末点回首点的一段。
/// 少于 2 个顶点长度为 0。bulge 弧段按弦长计。
pub fn lw_polyline_length(polyline: &LwPolyline) -> f64 {
    if polyline.vertices.len() < 2 {
        return 0.0;
    }
    let mut length = polyline
        .vertices
        .windows(2)
        .map(|pair| pair[0].position.distance_to(pair[1].position))
        .sum::<f64>();
    if polyline.is_closed {
        let first = polyline.vertices[0].position;
        let last = polyline.vertices[polyline.vertices.len() - 1].position;
        length += last.distance_to(first);
    }
    length
}

/// 重量级多段线：算法同轻量多段线，坐标取自各 VERTEX 记录。
/// 某条记录坐标缺失时只有与它相邻的线段按 0 计，不影响整条实体。
pub fn vertex_polyline_length(polyline: &VertexPolyline) -> f64 {
    if polyline.vertices.len() < 2 {
        return 0.0;
    }
    let mut length = polyline
        .vertices
        .windows(2)
        .filter_map(|pair| match (pair[0].location, pair[1].location) {
            (Some(start), Some(end)) => Some(start.distance_to(end)),
            _ => None,
        })
        .sum::<f64>();
    if polyline.is_closed {
        if let (Some(last), Some(first)) = (
            polyline.vertices[polyline.vertices.len() - 1].location,
            polyline.vertices[0].location,
        ) {
            length += last.distance_to(first);
        }
    }
    length
}

/// 样条：按偏差容差展平为折线后逐段求和。不补闭合段。
pub fn spline_length(spline: &Spline, flattener: &dyn CurveFlattener, tolerance: f64) -> f64 {
    let points = flattener.flatten(spline, tolerance);
    points
        .windows(2)
        .map(|pair| pair[0].distance_to(pair[1]))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flatten::DeBoorFlattener;
    use cutquote_core::document::{LwVertex, VertexRecord};
    use cutquote_core::geometry::Point2;
    use std::f64::consts::PI;

    fn line(x0: f64, y0: f64, x1: f64, y1: f64) -> Line {
        Line {
            start: Point2::new(x0, y0),
            end: Point2::new(x1, y1),
            layer: "0".to_string(),
        }
    }

    fn arc(radius: f64, start_angle: f64, end_angle: f64) -> Arc {
        Arc {
            center: Point2::new(0.0, 0.0),
            radius,
            start_angle,
            end_angle,
            layer: "0".to_string(),
        }
    }

    #[test]
    fn line_three_four_five() {
        assert!((line_length(&line(0.0, 0.0, 3.0, 4.0)) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn degenerate_line_measures_zero() {
        assert!(line_length(&line(2.0, 2.0, 2.0, 2.0)).abs() < f64::EPSILON);
    }

    #[test]
    fn half_circle_arc() {
        let length = arc_length(&arc(10.0, 0.0, 180.0)).expect("valid arc");
        assert!((length - 10.0 * PI).abs() < 1e-9);
    }

    #[test]
    fn arc_sweep_wraps_past_full_turn() {
        // 450° 归约为 90°，与直接给 90° 的弧等长。
        let wrapped = arc_length(&arc(4.0, 0.0, 450.0)).expect("valid arc");
        let quarter = arc_length(&arc(4.0, 0.0, 90.0)).expect("valid arc");
        assert!((wrapped - quarter).abs() < 1e-9);
    }

    #[test]
    fn zero_radius_arc_is_degenerate() {
        assert!(arc_length(&arc(0.0, 0.0, 90.0)).is_none());
        assert!(arc_length(&arc(-1.0, 0.0, 90.0)).is_none());
    }

    #[test]
    fn non_finite_arc_is_degenerate() {
        assert!(arc_length(&arc(f64::NAN, 0.0, 90.0)).is_none());
        assert!(arc_length(&arc(5.0, 0.0, f64::INFINITY)).is_none());
    }

    #[test]
    fn circle_circumference() {
        let circle = Circle {
            center: Point2::new(1.0, 1.0),
            radius: 3.0,
            layer: "0".to_string(),
        };
        let length = circle_length(&circle).expect("valid circle");
        assert!((length - 6.0 * PI).abs() < 1e-9);
    }

    #[test]
    fn zero_radius_circle_is_degenerate() {
        let circle = Circle {
            center: Point2::new(0.0, 0.0),
            radius: 0.0,
            layer: "0".to_string(),
        };
        assert!(circle_length(&circle).is_none());
    }

    fn triangle(is_closed: bool) -> LwPolyline {
        LwPolyline {
            vertices: vec![
                LwVertex::new(Point2::new(0.0, 0.0)),
                LwVertex::new(Point2::new(4.0, 0.0)),
                LwVertex::new(Point2::new(4.0, 3.0)),
            ],
            is_closed,
            layer: "0".to_string(),
        }
    }

    #[test]
    fn closed_polyline_includes_closing_segment() {
        assert!((lw_polyline_length(&triangle(true)) - 12.0).abs() < 1e-9);
    }

    #[test]
    fn open_polyline_omits_closing_segment() {
        assert!((lw_polyline_length(&triangle(false)) - 7.0).abs() < 1e-9);
    }

    #[test]
    fn short_polylines_measure_zero() {
        let empty = LwPolyline {
            vertices: vec![],
            is_closed: true,
            layer: "0".to_string(),
        };
        let single = LwPolyline {
            vertices: vec![LwVertex::new(Point2::new(1.0, 1.0))],
            is_closed: true,
            layer: "0".to_string(),
        };
        assert!(lw_polyline_length(&empty).abs() < f64::EPSILON);
        assert!(lw_polyline_length(&single).abs() < f64::EPSILON);
    }

    #[test]
    fn vertex_polyline_matches_lw_algorithm() {
        let polyline = VertexPolyline {
            vertices: vec![
                VertexRecord::at(Point2::new(0.0, 0.0)),
                VertexRecord::at(Point2::new(4.0, 0.0)),
                VertexRecord::at(Point2::new(4.0, 3.0)),
            ],
            is_closed: true,
            layer: "0".to_string(),
        };
        assert!((vertex_polyline_length(&polyline) - 12.0).abs() < 1e-9);
    }

    #[test]
    fn unreadable_vertex_drops_only_adjacent_segments() {
        // (0,0) → ? → (4,3)：两段都失效，只剩闭合段 5.0。
        let polyline = VertexPolyline {
            vertices: vec![
                VertexRecord::at(Point2::new(0.0, 0.0)),
                VertexRecord::unreadable(),
                VertexRecord::at(Point2::new(4.0, 3.0)),
            ],
            is_closed: true,
            layer: "0".to_string(),
        };
        assert!((vertex_polyline_length(&polyline) - 5.0).abs() < 1e-9);

        let open = VertexPolyline {
            is_closed: false,
            ..polyline
        };
        assert!(vertex_polyline_length(&open).abs() < f64::EPSILON);
    }

    #[test]
    fn spline_length_sums_flattened_chords() {
        // 控制点共线的二次 B 样条就是一条直线段。
        let spline = Spline {
            degree: 2,
            is_rational: false,
            is_closed: false,
            is_periodic: false,
            control_points: vec![
                Point2::new(0.0, 0.0),
                Point2::new(5.0, 0.0),
                Point2::new(10.0, 0.0),
            ],
            fit_points: vec![],
            knot_values: vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0],
            weights: vec![],
            layer: "0".to_string(),
        };
        let flattener = DeBoorFlattener::new();
        let length = spline_length(&spline, &flattener, 0.01);
        assert!((length - 10.0).abs() < 1e-6, "length = {length}");
    }
}

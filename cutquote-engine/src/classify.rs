//! 闭合回路（穿孔）判定。
//!
//! 激光/等离子切割每个封闭边界需要一次穿孔起刀；开放曲线沿边切入，
//! 不需要独立入刀点。判定规则按实体类型互斥，顺序不影响结果。

use std::f64::consts::TAU;

use cutquote_core::document::Entity;

/// 椭圆整周判定的参数容差（弧度），吸收浮点舍入误差。
pub const ELLIPSE_CLOSURE_TOLERANCE: f64 = 0.01;

/// 判定实体是否构成穿孔候选（封闭边界）。
///
/// - 圆：恒为真（定义即封闭）。
/// - 轻量/重量级多段线：取闭合标志。
/// - 椭圆：起始参数 ≈ 0 且终止参数 ≥ 2π − 容差，即整周扫掠。
/// - 直线、圆弧、样条、未识别类型：恒为假。
///   样条即使展平后几何上闭合也不计穿孔，沿用来源系统的行为。
pub fn is_piercing_candidate(entity: &Entity) -> bool {
    is_piercing_candidate_with_tolerance(entity, ELLIPSE_CLOSURE_TOLERANCE)
}

pub fn is_piercing_candidate_with_tolerance(entity: &Entity, ellipse_tolerance: f64) -> bool {
    match entity {
        Entity::Circle(_) => true,
        Entity::LwPolyline(polyline) => polyline.is_closed,
        Entity::VertexPolyline(polyline) => polyline.is_closed,
        Entity::Ellipse(ellipse) => {
            ellipse.start_parameter.abs() <= ellipse_tolerance
                && ellipse.end_parameter >= TAU - ellipse_tolerance
        }
        Entity::Line(_) | Entity::Arc(_) | Entity::Spline(_) | Entity::Unknown(_) => false,
    }
}

//! 度量聚合：单次遍历模型空间实体序列，累计切割总长与穿孔数。
//!
//! 折叠对加法可交换、可结合，实体顺序不影响结果；坏实体按 0 计入，
//! 永远不会中断整个文档的度量。无 I/O、无挂起点，可在任意实体间安全放弃。

use serde::Serialize;
use tracing::debug;

use cutquote_core::document::Entity;

use crate::classify;
use crate::errors::EngineError;
use crate::flatten::{CurveFlattener, DeBoorFlattener};
use crate::length;

/// 样条展平的默认偏差容差（文档单位）。
pub const DEFAULT_SPLINE_TOLERANCE: f64 = 0.01;

/// 一次度量的结果。序列化字段与报价接口一致：
/// `{ "length": <保留两位小数>, "piercing": <整数>, "area": 0 }`。
/// 本核心不做面积/排样计算，`area` 恒为 0。
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MeasurementResult {
    #[serde(rename = "length")]
    pub total_length: f64,
    #[serde(rename = "piercing")]
    pub piercing_count: u32,
    pub area: f64,
}

impl MeasurementResult {
    pub fn empty() -> Self {
        Self {
            total_length: 0.0,
            piercing_count: 0,
            area: 0.0,
        }
    }
}

/// 度量器。持有注入的展平能力与两项容差，一次 `measure` 调用
/// 处理一份文档的实体序列，期间只读实体、不保留任何状态。
pub struct Measurer {
    flattener: Box<dyn CurveFlattener>,
    spline_tolerance: f64,
    ellipse_closure_tolerance: f64,
}

impl Measurer {
    pub fn new() -> Self {
        Self::with_flattener(Box::new(DeBoorFlattener::new()))
    }

    pub fn with_flattener(flattener: Box<dyn CurveFlattener>) -> Self {
        Self {
            flattener,
            spline_tolerance: DEFAULT_SPLINE_TOLERANCE,
            ellipse_closure_tolerance: classify::ELLIPSE_CLOSURE_TOLERANCE,
        }
    }

    pub fn with_spline_tolerance(mut self, tolerance: f64) -> Result<Self, EngineError> {
        if !tolerance.is_finite() || tolerance <= 0.0 {
            return Err(EngineError::InvalidTolerance(tolerance));
        }
        self.spline_tolerance = tolerance;
        Ok(self)
    }

    pub fn with_ellipse_closure_tolerance(mut self, tolerance: f64) -> Result<Self, EngineError> {
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(EngineError::InvalidTolerance(tolerance));
        }
        self.ellipse_closure_tolerance = tolerance;
        Ok(self)
    }

    /// 对一个实体序列做一次完整度量。对任意合法序列全定义，从不失败。
    pub fn measure<'a, I>(&self, entities: I) -> MeasurementResult
    where
        I: IntoIterator<Item = &'a Entity>,
    {
        let mut total_length = 0.0;
        let mut piercing_count = 0u32;

        for entity in entities {
            match self.entity_length(entity) {
                Some(length) if length.is_finite() && length >= 0.0 => {
                    total_length += length;
                }
                _ => {
                    debug!(kind = entity.kind(), "实体长度不可用，按 0 计入");
                }
            }
            if classify::is_piercing_candidate_with_tolerance(
                entity,
                self.ellipse_closure_tolerance,
            ) {
                piercing_count += 1;
            }
        }

        MeasurementResult {
            total_length: round_half_up(total_length, 2),
            piercing_count,
            area: 0.0,
        }
    }

    /// 按类型分发到对应的长度计算。椭圆与未识别类型不在测长集合内，
    /// 静默按 0 计（椭圆仍参与穿孔判定）。
    fn entity_length(&self, entity: &Entity) -> Option<f64> {
        match entity {
            Entity::Line(line) => Some(length::line_length(line)),
            Entity::Arc(arc) => length::arc_length(arc),
            Entity::Circle(circle) => length::circle_length(circle),
            Entity::LwPolyline(polyline) => Some(length::lw_polyline_length(polyline)),
            Entity::VertexPolyline(polyline) => Some(length::vertex_polyline_length(polyline)),
            Entity::Spline(spline) => Some(length::spline_length(
                spline,
                self.flattener.as_ref(),
                self.spline_tolerance,
            )),
            Entity::Ellipse(_) | Entity::Unknown(_) => Some(0.0),
        }
    }
}

impl Default for Measurer {
    fn default() -> Self {
        Self::new()
    }
}

fn round_half_up(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

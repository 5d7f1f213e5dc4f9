//! DXF 文档加载器（解析协作方）。
//!
//! 只解析度量需要的实体集合：LINE、ARC、CIRCLE、LWPOLYLINE、
//! POLYLINE（VERTEX 序列）、ELLIPSE、SPLINE。识别集合之外的类型
//! 保留为 `Entity::Unknown`，实体级字段缺失同样退化为 Unknown，
//! 只有文档级结构错误（组码非法、段提前结束）才会使加载失败。

use std::fs;
use std::path::Path;

use thiserror::Error;
use cutquote_core::{
    document::{
        Arc, Circle, Document, Ellipse, Entity, Line, LwPolyline, LwVertex, Spline, Unknown,
        VertexPolyline, VertexRecord,
    },
    geometry::{Point2, Vector2},
};

#[derive(Debug, Error)]
pub enum IoError {
    #[error("读取文件 {path:?} 失败: {source}")]
    ReadError {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("文档结构非法: {0}")]
    InvalidDocument(String),
}

pub trait DocumentLoader {
    fn load(&self, path: &Path) -> Result<Document, IoError>;
}

pub struct DxfFacade;

impl DxfFacade {
    pub fn new() -> Self {
        Self
    }

    /// 直接解析 DXF 文本，测试与内存数据共用此入口。
    pub fn parse_str(&self, source: &str) -> Result<Document, IoError> {
        let parser = DxfParser::new(source);
        parser
            .parse()
            .map_err(|DxfError::Invalid { message }| IoError::InvalidDocument(message))
    }
}

impl Default for DxfFacade {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentLoader for DxfFacade {
    fn load(&self, path: &Path) -> Result<Document, IoError> {
        let data = fs::read_to_string(path).map_err(|source| IoError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        self.parse_str(&data)
    }
}

#[derive(Debug)]
enum DxfError {
    Invalid { message: String },
}

impl DxfError {
    fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }
}

struct DxfParser<'a> {
    reader: DxfReader<'a>,
}

impl<'a> DxfParser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            reader: DxfReader::new(source),
        }
    }

    fn parse(mut self) -> Result<Document, DxfError> {
        let mut document = Document::new();
        while let Some((code, value)) = self.reader.next_pair()? {
            if code != 0 {
                return Err(DxfError::invalid(format!(
                    "意外的组码 {code}（期望 0 表示 SECTION/EOF）"
                )));
            }
            match value.as_str() {
                "SECTION" => {
                    let (name_code, name) = self
                        .reader
                        .next_pair()?
                        .ok_or_else(|| DxfError::invalid("SECTION 缺少名称（组码 2）"))?;
                    if name_code != 2 {
                        return Err(DxfError::invalid(format!(
                            "SECTION 名称使用了组码 {name_code}（期望 2）"
                        )));
                    }
                    match name.as_str() {
                        "ENTITIES" => self.parse_entities(&mut document)?,
                        _ => self.skip_section()?,
                    }
                }
                "EOF" => break,
                unexpected => {
                    return Err(DxfError::invalid(format!(
                        "意外的标记 {unexpected}，期望 SECTION 或 EOF"
                    )));
                }
            }
        }
        Ok(document)
    }

    fn skip_section(&mut self) -> Result<(), DxfError> {
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) if value == "ENDSEC" => break,
                Some(_) => continue,
                None => {
                    return Err(DxfError::invalid("SECTION 未找到 ENDSEC 终止标记"));
                }
            }
        }
        Ok(())
    }

    fn parse_entities(&mut self, document: &mut Document) -> Result<(), DxfError> {
        loop {
            let (code, value) = match self.reader.next_pair()? {
                Some(pair) => pair,
                None => return Err(DxfError::invalid("ENTITIES 段提前结束")),
            };
            if code != 0 {
                return Err(DxfError::invalid(format!(
                    "ENTITIES 段遇到组码 {code}（期望 0 表示实体起始）"
                )));
            }

            match value.as_str() {
                "ENDSEC" => break,
                "SEQEND" => {
                    // 游离的 SEQEND，跳过其属性体。
                    self.skip_entity_body()?;
                }
                "POLYLINE" => {
                    let entity = self.parse_vertex_polyline()?;
                    document.add_entity(entity);
                }
                kind => {
                    let entity = self.parse_entity(kind)?;
                    document.add_entity(entity);
                }
            }
        }
        Ok(())
    }

    fn parse_entity(&mut self, kind: &str) -> Result<Entity, DxfError> {
        match kind {
            "LINE" => self.parse_line(),
            "ARC" => self.parse_arc(),
            "CIRCLE" => self.parse_circle(),
            "LWPOLYLINE" => self.parse_lwpolyline(),
            "ELLIPSE" => self.parse_ellipse(),
            "SPLINE" => self.parse_spline(),
            // 识别集合之外的类型保留为 Unknown，向前兼容而非报错。
            other => self.parse_unknown(other),
        }
    }

    fn parse_unknown(&mut self, kind: &str) -> Result<Entity, DxfError> {
        let mut layer = None;
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => {
                    self.reader.put_back((0, value));
                    break;
                }
                Some((8, value)) => layer = Some(value.trim().to_string()),
                Some(_) => continue,
                None => break,
            }
        }
        Ok(unknown_entity(kind, layer))
    }

    fn parse_line(&mut self) -> Result<Entity, DxfError> {
        let mut layer = None;
        let mut start_x = None;
        let mut start_y = None;
        let mut end_x = None;
        let mut end_y = None;
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => {
                    self.reader.put_back((0, value));
                    break;
                }
                Some((code, value)) => match code {
                    8 => layer = Some(value.trim().to_string()),
                    10 => start_x = parse_f64(&value),
                    20 => start_y = parse_f64(&value),
                    11 => end_x = parse_f64(&value),
                    21 => end_y = parse_f64(&value),
                    30 | 31 => {} // 忽略 Z 坐标
                    _ => {}
                },
                None => return Err(DxfError::invalid("LINE 未正确结束")),
            }
        }

        match (start_x, start_y, end_x, end_y) {
            (Some(sx), Some(sy), Some(ex), Some(ey)) => Ok(Entity::Line(Line {
                start: Point2::new(sx, sy),
                end: Point2::new(ex, ey),
                layer: layer_or_default(layer),
            })),
            // 字段残缺的实体退化为 Unknown，由度量层按 0 计入。
            _ => Ok(unknown_entity("LINE", layer)),
        }
    }

    fn parse_arc(&mut self) -> Result<Entity, DxfError> {
        let mut layer = None;
        let mut center_x = None;
        let mut center_y = None;
        let mut radius = None;
        let mut start_angle = None;
        let mut end_angle = None;
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => {
                    self.reader.put_back((0, value));
                    break;
                }
                Some((code, value)) => match code {
                    8 => layer = Some(value.trim().to_string()),
                    10 => center_x = parse_f64(&value),
                    20 => center_y = parse_f64(&value),
                    40 => radius = parse_f64(&value),
                    // 组码 50/51 本身就是度，按原值存储，弧长计算时再换算。
                    50 => start_angle = parse_f64(&value),
                    51 => end_angle = parse_f64(&value),
                    30 => {}
                    _ => {}
                },
                None => return Err(DxfError::invalid("ARC 未正确结束")),
            }
        }

        match (center_x, center_y, radius, start_angle, end_angle) {
            (Some(cx), Some(cy), Some(radius), Some(start_angle), Some(end_angle)) => {
                Ok(Entity::Arc(Arc {
                    center: Point2::new(cx, cy),
                    radius,
                    start_angle,
                    end_angle,
                    layer: layer_or_default(layer),
                }))
            }
            _ => Ok(unknown_entity("ARC", layer)),
        }
    }

    fn parse_circle(&mut self) -> Result<Entity, DxfError> {
        let mut layer = None;
        let mut center_x = None;
        let mut center_y = None;
        let mut radius = None;
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => {
                    self.reader.put_back((0, value));
                    break;
                }
                Some((code, value)) => match code {
                    8 => layer = Some(value.trim().to_string()),
                    10 => center_x = parse_f64(&value),
                    20 => center_y = parse_f64(&value),
                    40 => radius = parse_f64(&value),
                    30 => {}
                    _ => {}
                },
                None => return Err(DxfError::invalid("CIRCLE 未正确结束")),
            }
        }

        match (center_x, center_y, radius) {
            (Some(cx), Some(cy), Some(radius)) => {
                Ok(Entity::Circle(Circle {
                    center: Point2::new(cx, cy),
                    radius,
                    layer: layer_or_default(layer),
                }))
            }
            _ => Ok(unknown_entity("CIRCLE", layer)),
        }
    }

    fn parse_lwpolyline(&mut self) -> Result<Entity, DxfError> {
        let mut layer = None;
        let mut is_closed = false;
        let mut vertices: Vec<LwVertex> = Vec::new();
        let mut pending_x: Option<f64> = None;
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => {
                    self.reader.put_back((0, value));
                    break;
                }
                Some((code, value)) => match code {
                    8 => layer = Some(value.trim().to_string()),
                    70 => {
                        if let Some(flag) = parse_i32(&value) {
                            is_closed = flag & 0x01 == 0x01;
                        }
                    }
                    90 => {} // 顶点计数，按实际读到的为准
                    10 => pending_x = parse_f64(&value),
                    20 => {
                        if let (Some(x), Some(y)) = (pending_x.take(), parse_f64(&value)) {
                            vertices.push(LwVertex::new(Point2::new(x, y)));
                        }
                    }
                    42 => {
                        if let (Some(bulge), Some(last)) =
                            (parse_f64(&value), vertices.last_mut())
                        {
                            last.bulge = bulge;
                        }
                    }
                    30 => {}
                    _ => {}
                },
                None => return Err(DxfError::invalid("LWPOLYLINE 未正确结束")),
            }
        }

        Ok(Entity::LwPolyline(LwPolyline {
            vertices,
            is_closed,
            layer: layer_or_default(layer),
        }))
    }

    /// 重量级 POLYLINE：头部之后跟随 VERTEX…SEQEND 序列。
    /// 网格/多面体模式（组码 70 的 0x10/0x40 位）不是切割几何，整体保留为 Unknown。
    fn parse_vertex_polyline(&mut self) -> Result<Entity, DxfError> {
        let mut layer = None;
        let mut flags = 0i32;
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => {
                    self.reader.put_back((0, value));
                    break;
                }
                Some((code, value)) => match code {
                    8 => layer = Some(value.trim().to_string()),
                    70 => flags = parse_i32(&value).unwrap_or(0),
                    66 | 71 | 72 | 73 | 74 | 75 => {}
                    _ => {}
                },
                None => return Err(DxfError::invalid("POLYLINE 未正确结束")),
            }
        }

        let is_mesh = flags & 0x10 != 0 || flags & 0x40 != 0;
        let is_closed = flags & 0x01 != 0;
        let mut vertices: Vec<VertexRecord> = Vec::new();

        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => match value.as_str() {
                    "VERTEX" => vertices.push(self.parse_vertex_record()?),
                    "SEQEND" => {
                        self.skip_entity_body()?;
                        break;
                    }
                    _ => {
                        self.reader.put_back((0, value));
                        break;
                    }
                },
                Some(_) => {
                    return Err(DxfError::invalid(
                        "POLYLINE 遇到无效的记录，期望 VERTEX/SEQEND",
                    ));
                }
                None => {
                    return Err(DxfError::invalid(
                        "POLYLINE 缺少 SEQEND（组码 0, 值为 SEQEND）",
                    ));
                }
            }
        }

        if is_mesh {
            return Ok(unknown_entity("POLYLINE", layer));
        }

        Ok(Entity::VertexPolyline(VertexPolyline {
            vertices,
            is_closed,
            layer: layer_or_default(layer),
        }))
    }

    /// 单条 VERTEX 记录。坐标残缺时保留为不可读记录，
    /// 只影响相邻线段，不使整条多段线失效。
    fn parse_vertex_record(&mut self) -> Result<VertexRecord, DxfError> {
        let mut x = None;
        let mut y = None;
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => {
                    self.reader.put_back((0, value));
                    break;
                }
                Some((code, value)) => match code {
                    10 => x = parse_f64(&value),
                    20 => y = parse_f64(&value),
                    30 | 70 | 8 => {}
                    _ => {}
                },
                None => return Err(DxfError::invalid("VERTEX 未正确结束")),
            }
        }

        match (x, y) {
            (Some(x), Some(y)) => Ok(VertexRecord::at(Point2::new(x, y))),
            _ => Ok(VertexRecord::unreadable()),
        }
    }

    fn parse_ellipse(&mut self) -> Result<Entity, DxfError> {
        let mut layer = None;
        let mut center_x = None;
        let mut center_y = None;
        let mut major_x = None;
        let mut major_y = None;
        let mut ratio = None;
        let mut start_parameter = 0.0;
        let mut end_parameter = std::f64::consts::TAU;

        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => {
                    self.reader.put_back((0, value));
                    break;
                }
                Some((code, value)) => match code {
                    8 => layer = Some(value.trim().to_string()),
                    10 => center_x = parse_f64(&value),
                    20 => center_y = parse_f64(&value),
                    11 => major_x = parse_f64(&value),
                    21 => major_y = parse_f64(&value),
                    40 => ratio = parse_f64(&value),
                    41 => {
                        if let Some(parsed) = parse_f64(&value) {
                            start_parameter = parsed;
                        }
                    }
                    42 => {
                        if let Some(parsed) = parse_f64(&value) {
                            end_parameter = parsed;
                        }
                    }
                    30 | 31 | 210 | 220 | 230 => {}
                    _ => {}
                },
                None => return Err(DxfError::invalid("ELLIPSE 未正确结束")),
            }
        }

        match (center_x, center_y, major_x, major_y) {
            (Some(cx), Some(cy), Some(mx), Some(my)) => {
                Ok(Entity::Ellipse(Ellipse {
                    center: Point2::new(cx, cy),
                    major_axis: Vector2::new(mx, my),
                    ratio: ratio.unwrap_or(1.0),
                    start_parameter,
                    end_parameter,
                    layer: layer_or_default(layer),
                }))
            }
            _ => Ok(unknown_entity("ELLIPSE", layer)),
        }
    }

    fn parse_spline(&mut self) -> Result<Entity, DxfError> {
        let mut layer = None;
        let mut flags = 0i32;
        let mut degree: Option<i32> = None;
        let mut knot_values: Vec<f64> = Vec::new();
        let mut weights: Vec<f64> = Vec::new();
        let mut control_points: Vec<Point2> = Vec::new();
        let mut fit_points: Vec<Point2> = Vec::new();
        let mut pending_control_x: Option<f64> = None;
        let mut pending_fit_x: Option<f64> = None;

        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => {
                    self.reader.put_back((0, value));
                    break;
                }
                Some((code, value)) => match code {
                    8 => layer = Some(value.trim().to_string()),
                    70 => flags = parse_i32(&value).unwrap_or(0),
                    71 => degree = parse_i32(&value),
                    72 | 73 | 74 => {} // 计数信息，按实际读到的为准
                    40 => {
                        if let Some(knot) = parse_f64(&value) {
                            knot_values.push(knot);
                        }
                    }
                    41 => {
                        if let Some(weight) = parse_f64(&value) {
                            weights.push(weight);
                        }
                    }
                    10 => pending_control_x = parse_f64(&value),
                    20 => {
                        if let (Some(x), Some(y)) = (pending_control_x.take(), parse_f64(&value)) {
                            control_points.push(Point2::new(x, y));
                        }
                    }
                    11 => pending_fit_x = parse_f64(&value),
                    21 => {
                        if let (Some(x), Some(y)) = (pending_fit_x.take(), parse_f64(&value)) {
                            fit_points.push(Point2::new(x, y));
                        }
                    }
                    12 | 13 | 22 | 23 | 30 | 31 | 32 | 33 => {}
                    210 | 220 | 230 | 42 | 43 | 44 => {}
                    _ => {}
                },
                None => return Err(DxfError::invalid("SPLINE 未正确结束")),
            }
        }

        let Some(degree) = degree else {
            return Ok(unknown_entity("SPLINE", layer));
        };

        Ok(Entity::Spline(Spline {
            degree,
            is_rational: flags & 0x04 != 0,
            is_closed: flags & 0x01 != 0,
            is_periodic: flags & 0x02 != 0,
            control_points,
            fit_points,
            knot_values,
            weights,
            layer: layer_or_default(layer),
        }))
    }

    fn skip_entity_body(&mut self) -> Result<(), DxfError> {
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => {
                    self.reader.put_back((0, value));
                    break;
                }
                Some(_) => continue,
                None => break,
            }
        }
        Ok(())
    }
}

struct DxfReader<'a> {
    lines: std::str::Lines<'a>,
    buffer: Option<(i32, String)>,
    line_number: usize,
}

impl<'a> DxfReader<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            lines: source.lines(),
            buffer: None,
            line_number: 0,
        }
    }

    fn next_pair(&mut self) -> Result<Option<(i32, String)>, DxfError> {
        if let Some(pair) = self.buffer.take() {
            return Ok(Some(pair));
        }

        let code_line = match self.lines.next() {
            Some(line) => {
                self.line_number += 1;
                line
            }
            None => return Ok(None),
        };

        let value_line = match self.lines.next() {
            Some(line) => {
                self.line_number += 1;
                line
            }
            None => {
                return Err(DxfError::invalid(format!(
                    "文件在第 {} 行结束，缺少与组码对应的值行",
                    self.line_number
                )));
            }
        };

        let code = code_line.trim().parse::<i32>().map_err(|_| {
            DxfError::invalid(format!(
                "第 {} 行的组码 \"{}\" 无法解析为整数",
                self.line_number - 1,
                code_line.trim()
            ))
        })?;
        let value = value_line.trim_end_matches('\r').to_string();
        Ok(Some((code, value)))
    }

    fn put_back(&mut self, pair: (i32, String)) {
        if self.buffer.is_some() {
            panic!("内部错误：尝试多次回退 DXF pair");
        }
        self.buffer = Some(pair);
    }
}

fn layer_or_default(layer: Option<String>) -> String {
    layer.unwrap_or_else(|| "0".to_string())
}

fn unknown_entity(kind: &str, layer: Option<String>) -> Entity {
    Entity::Unknown(Unknown {
        kind: kind.to_string(),
        layer: layer_or_default(layer),
    })
}

/// 数值解析失败按字段缺失处理，实体级容错由上层统一兜底。
fn parse_f64(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok()
}

fn parse_i32(raw: &str) -> Option<i32> {
    raw.trim().parse::<i32>().ok()
}

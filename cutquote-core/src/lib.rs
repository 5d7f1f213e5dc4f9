pub mod geometry {
    use glam::DVec2;
    use serde::{Deserialize, Serialize};

    /// 二维点，内部以 `glam::DVec2` 表示。坐标单位即文档声明的线性单位（通常为毫米）。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Point2(pub DVec2);

    impl Point2 {
        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn from_vec(vec: DVec2) -> Self {
            Self(vec)
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        /// 到另一点的欧氏距离，所有长度计算的基础。
        #[inline]
        pub fn distance_to(self, other: Point2) -> f64 {
            self.0.distance(other.0)
        }

        #[inline]
        pub fn translate(self, offset: Vector2) -> Self {
            Self(self.0 + offset.0)
        }

        #[inline]
        pub fn vector_to(self, other: Point2) -> Vector2 {
            Vector2(other.0 - self.0)
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            self.0
        }
    }

    impl From<DVec2> for Point2 {
        fn from(value: DVec2) -> Self {
            Self::from_vec(value)
        }
    }

    /// 二维向量。提供基础运算，未来可扩展矩阵变换。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Vector2(pub DVec2);

    impl Vector2 {
        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn from_points(start: Point2, end: Point2) -> Self {
            Self(end.0 - start.0)
        }

        #[inline]
        pub fn length(self) -> f64 {
            self.0.length()
        }

        #[inline]
        pub fn length_squared(self) -> f64 {
            self.0.length_squared()
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            self.0
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }
    }

    impl From<DVec2> for Vector2 {
        fn from(value: DVec2) -> Self {
            Self(value)
        }
    }
}

pub mod document {
    use std::collections::HashMap;

    use serde::{Deserialize, Serialize};

    use crate::geometry::{Point2, Vector2};

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct EntityId(u64);

    impl EntityId {
        #[inline]
        pub fn new(raw: u64) -> Self {
            Self(raw)
        }

        /// 提供原始数值，便于序列化或日志输出。
        #[inline]
        pub fn get(self) -> u64 {
            self.0
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Layer {
        pub name: String,
        pub is_visible: bool,
    }

    impl Layer {
        #[inline]
        pub fn new(name: impl Into<String>) -> Self {
            Self {
                name: name.into(),
                is_visible: true,
            }
        }
    }

    /// 模型空间中可度量的实体集合。
    /// 未识别的 DXF 类型保留为 `Unknown`，度量阶段贡献 0，不视为错误。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub enum Entity {
        Line(Line),
        Arc(Arc),
        Circle(Circle),
        LwPolyline(LwPolyline),
        VertexPolyline(VertexPolyline),
        Ellipse(Ellipse),
        Spline(Spline),
        Unknown(Unknown),
    }

    impl Entity {
        #[inline]
        pub fn layer_name(&self) -> &str {
            match self {
                Entity::Line(line) => &line.layer,
                Entity::Arc(arc) => &arc.layer,
                Entity::Circle(circle) => &circle.layer,
                Entity::LwPolyline(polyline) => &polyline.layer,
                Entity::VertexPolyline(polyline) => &polyline.layer,
                Entity::Ellipse(ellipse) => &ellipse.layer,
                Entity::Spline(spline) => &spline.layer,
                Entity::Unknown(unknown) => &unknown.layer,
            }
        }

        /// 实体类型的简短标签，用于日志输出。
        pub fn kind(&self) -> &str {
            match self {
                Entity::Line(_) => "LINE",
                Entity::Arc(_) => "ARC",
                Entity::Circle(_) => "CIRCLE",
                Entity::LwPolyline(_) => "LWPOLYLINE",
                Entity::VertexPolyline(_) => "POLYLINE",
                Entity::Ellipse(_) => "ELLIPSE",
                Entity::Spline(_) => "SPLINE",
                Entity::Unknown(unknown) => &unknown.kind,
            }
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Line {
        pub start: Point2,
        pub end: Point2,
        pub layer: String,
    }

    /// 圆弧实体。角度以度为单位储存，与 DXF 组码 50/51 保持一致，允许越过 360。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Arc {
        pub center: Point2,
        pub radius: f64,
        pub start_angle: f64,
        pub end_angle: f64,
        pub layer: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Circle {
        pub center: Point2,
        pub radius: f64,
        pub layer: String,
    }

    /// 轻量多段线（LWPOLYLINE）：顶点直接内嵌坐标。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct LwPolyline {
        pub vertices: Vec<LwVertex>,
        pub is_closed: bool,
        pub layer: String,
    }

    #[derive(Debug, Clone, Copy, Serialize, Deserialize)]
    pub struct LwVertex {
        pub position: Point2,
        pub bulge: f64,
    }

    impl LwVertex {
        #[inline]
        pub fn new(position: Point2) -> Self {
            Self {
                position,
                bulge: 0.0,
            }
        }

        #[inline]
        pub fn with_bulge(position: Point2, bulge: f64) -> Self {
            Self { position, bulge }
        }
    }

    /// 重量级多段线（POLYLINE）：顶点由独立的 VERTEX 记录携带。
    /// 记录坐标缺失时 `location` 为 `None`，仅相邻线段按 0 处理，不影响整条实体。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct VertexPolyline {
        pub vertices: Vec<VertexRecord>,
        pub is_closed: bool,
        pub layer: String,
    }

    #[derive(Debug, Clone, Copy, Serialize, Deserialize)]
    pub struct VertexRecord {
        pub location: Option<Point2>,
    }

    impl VertexRecord {
        #[inline]
        pub fn at(position: Point2) -> Self {
            Self {
                location: Some(position),
            }
        }

        #[inline]
        pub fn unreadable() -> Self {
            Self { location: None }
        }
    }

    /// 椭圆实体，记录主轴向量与参数范围（单位为弧度）。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Ellipse {
        pub center: Point2,
        pub major_axis: Vector2,
        pub ratio: f64,
        pub start_parameter: f64,
        pub end_parameter: f64,
        pub layer: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Spline {
        pub degree: i32,
        pub is_rational: bool,
        pub is_closed: bool,
        pub is_periodic: bool,
        pub control_points: Vec<Point2>,
        pub fit_points: Vec<Point2>,
        pub knot_values: Vec<f64>,
        pub weights: Vec<f64>,
        pub layer: String,
    }

    /// 识别集合之外的实体类型，仅保留类型名以便日志追踪。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Unknown {
        pub kind: String,
        pub layer: String,
    }

    #[derive(Debug, Default, Clone, Serialize, Deserialize)]
    pub struct Document {
        layers: HashMap<String, Layer>,
        entities: Vec<(EntityId, Entity)>,
        next_entity_id: u64,
    }

    impl Document {
        pub fn new() -> Self {
            let mut doc = Self::default();
            doc.ensure_layer("0");
            doc
        }

        pub fn ensure_layer(&mut self, name: impl AsRef<str>) {
            let key = name.as_ref();
            self.layers
                .entry(key.to_string())
                .or_insert_with(|| Layer::new(key));
        }

        pub fn add_line(
            &mut self,
            start: Point2,
            end: Point2,
            layer: impl Into<String>,
        ) -> EntityId {
            let layer = layer.into();
            self.ensure_layer(&layer);
            let id = self.next_id();
            self.entities
                .push((id, Entity::Line(Line { start, end, layer })));
            id
        }

        pub fn add_arc(
            &mut self,
            center: Point2,
            radius: f64,
            start_angle: f64,
            end_angle: f64,
            layer: impl Into<String>,
        ) -> EntityId {
            let layer = layer.into();
            self.ensure_layer(&layer);
            let id = self.next_id();
            self.entities.push((
                id,
                Entity::Arc(Arc {
                    center,
                    radius,
                    start_angle,
                    end_angle,
                    layer,
                }),
            ));
            id
        }

        pub fn add_circle(
            &mut self,
            center: Point2,
            radius: f64,
            layer: impl Into<String>,
        ) -> EntityId {
            let layer = layer.into();
            self.ensure_layer(&layer);
            let id = self.next_id();
            self.entities.push((
                id,
                Entity::Circle(Circle {
                    center,
                    radius,
                    layer,
                }),
            ));
            id
        }

        pub fn add_lw_polyline<I>(
            &mut self,
            vertices: I,
            is_closed: bool,
            layer: impl Into<String>,
        ) -> EntityId
        where
            I: IntoIterator<Item = Point2>,
        {
            let collected = vertices.into_iter().map(LwVertex::new).collect::<Vec<_>>();
            self.add_lw_polyline_with_vertices(collected, is_closed, layer)
        }

        pub fn add_lw_polyline_with_vertices<I>(
            &mut self,
            vertices: I,
            is_closed: bool,
            layer: impl Into<String>,
        ) -> EntityId
        where
            I: IntoIterator<Item = LwVertex>,
        {
            let layer = layer.into();
            self.ensure_layer(&layer);
            let collected: Vec<LwVertex> = vertices.into_iter().collect();
            let id = self.next_id();
            self.entities.push((
                id,
                Entity::LwPolyline(LwPolyline {
                    vertices: collected,
                    is_closed,
                    layer,
                }),
            ));
            id
        }

        pub fn add_vertex_polyline<I>(
            &mut self,
            vertices: I,
            is_closed: bool,
            layer: impl Into<String>,
        ) -> EntityId
        where
            I: IntoIterator<Item = VertexRecord>,
        {
            let layer = layer.into();
            self.ensure_layer(&layer);
            let collected: Vec<VertexRecord> = vertices.into_iter().collect();
            let id = self.next_id();
            self.entities.push((
                id,
                Entity::VertexPolyline(VertexPolyline {
                    vertices: collected,
                    is_closed,
                    layer,
                }),
            ));
            id
        }

        pub fn add_ellipse(
            &mut self,
            center: Point2,
            major_axis: Vector2,
            ratio: f64,
            start_parameter: f64,
            end_parameter: f64,
            layer: impl Into<String>,
        ) -> EntityId {
            let layer = layer.into();
            self.ensure_layer(&layer);
            let id = self.next_id();
            self.entities.push((
                id,
                Entity::Ellipse(Ellipse {
                    center,
                    major_axis,
                    ratio,
                    start_parameter,
                    end_parameter,
                    layer,
                }),
            ));
            id
        }

        #[allow(clippy::too_many_arguments)]
        pub fn add_spline(
            &mut self,
            degree: i32,
            is_rational: bool,
            is_closed: bool,
            is_periodic: bool,
            control_points: Vec<Point2>,
            fit_points: Vec<Point2>,
            knot_values: Vec<f64>,
            weights: Vec<f64>,
            layer: impl Into<String>,
        ) -> EntityId {
            let layer = layer.into();
            self.ensure_layer(&layer);
            let id = self.next_id();
            self.entities.push((
                id,
                Entity::Spline(Spline {
                    degree,
                    is_rational,
                    is_closed,
                    is_periodic,
                    control_points,
                    fit_points,
                    knot_values,
                    weights,
                    layer,
                }),
            ));
            id
        }

        pub fn add_unknown(
            &mut self,
            kind: impl Into<String>,
            layer: impl Into<String>,
        ) -> EntityId {
            let layer = layer.into();
            self.ensure_layer(&layer);
            let id = self.next_id();
            self.entities.push((
                id,
                Entity::Unknown(Unknown {
                    kind: kind.into(),
                    layer,
                }),
            ));
            id
        }

        pub fn add_entity(&mut self, entity: Entity) -> EntityId {
            match entity {
                Entity::Line(line) => self.add_line(line.start, line.end, line.layer),
                Entity::Arc(arc) => self.add_arc(
                    arc.center,
                    arc.radius,
                    arc.start_angle,
                    arc.end_angle,
                    arc.layer,
                ),
                Entity::Circle(circle) => {
                    self.add_circle(circle.center, circle.radius, circle.layer)
                }
                Entity::LwPolyline(polyline) => self.add_lw_polyline_with_vertices(
                    polyline.vertices,
                    polyline.is_closed,
                    polyline.layer,
                ),
                Entity::VertexPolyline(polyline) => self.add_vertex_polyline(
                    polyline.vertices,
                    polyline.is_closed,
                    polyline.layer,
                ),
                Entity::Ellipse(ellipse) => self.add_ellipse(
                    ellipse.center,
                    ellipse.major_axis,
                    ellipse.ratio,
                    ellipse.start_parameter,
                    ellipse.end_parameter,
                    ellipse.layer,
                ),
                Entity::Spline(spline) => {
                    let Spline {
                        degree,
                        is_rational,
                        is_closed,
                        is_periodic,
                        control_points,
                        fit_points,
                        knot_values,
                        weights,
                        layer,
                    } = spline;
                    self.add_spline(
                        degree,
                        is_rational,
                        is_closed,
                        is_periodic,
                        control_points,
                        fit_points,
                        knot_values,
                        weights,
                        layer,
                    )
                }
                Entity::Unknown(unknown) => self.add_unknown(unknown.kind, unknown.layer),
            }
        }

        #[inline]
        pub fn layers(&self) -> impl Iterator<Item = &Layer> {
            self.layers.values()
        }

        /// 模型空间实体序列，按加入顺序迭代。度量过程只读，不会修改实体。
        #[inline]
        pub fn entities(&self) -> impl Iterator<Item = &(EntityId, Entity)> {
            self.entities.iter()
        }

        #[inline]
        pub fn entity(&self, id: EntityId) -> Option<&Entity> {
            self.entities.iter().find_map(|(entity_id, entity)| {
                if entity_id.get() == id.get() {
                    Some(entity)
                } else {
                    None
                }
            })
        }

        #[inline]
        fn next_id(&mut self) -> EntityId {
            let id = self.next_entity_id;
            self.next_entity_id += 1;
            EntityId(id)
        }
    }

}

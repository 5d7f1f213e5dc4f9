//! DXF 文本解析的集成测试，用内联的组码/值行构造夹具。

use cutquote_core::document::Entity;
use cutquote_io::{DxfFacade, IoError};

fn parse(source: &str) -> cutquote_core::document::Document {
    DxfFacade::new()
        .parse_str(source)
        .expect("fixture should parse")
}

fn entities(document: &cutquote_core::document::Document) -> Vec<&Entity> {
    document.entities().map(|(_, entity)| entity).collect()
}

#[test]
fn parses_line_with_coordinates() {
    let doc = parse(
        "0\nSECTION\n2\nENTITIES\n\
         0\nLINE\n8\nCUT\n10\n0.0\n20\n0.0\n11\n3.0\n21\n4.0\n\
         0\nENDSEC\n0\nEOF\n",
    );
    let entities = entities(&doc);
    assert_eq!(entities.len(), 1);
    match entities[0] {
        Entity::Line(line) => {
            assert_eq!(line.layer, "CUT");
            assert!((line.start.x() - 0.0).abs() < f64::EPSILON);
            assert!((line.end.x() - 3.0).abs() < f64::EPSILON);
            assert!((line.end.y() - 4.0).abs() < f64::EPSILON);
        }
        other => panic!("expected line, got {other:?}"),
    }
}

#[test]
fn arc_angles_stay_in_degrees() {
    let doc = parse(
        "0\nSECTION\n2\nENTITIES\n\
         0\nARC\n8\n0\n10\n1.0\n20\n2.0\n40\n5.0\n50\n30.0\n51\n120.0\n\
         0\nENDSEC\n0\nEOF\n",
    );
    match entities(&doc)[0] {
        Entity::Arc(arc) => {
            assert!((arc.radius - 5.0).abs() < f64::EPSILON);
            assert!((arc.start_angle - 30.0).abs() < f64::EPSILON);
            assert!((arc.end_angle - 120.0).abs() < f64::EPSILON);
        }
        other => panic!("expected arc, got {other:?}"),
    }
}

#[test]
fn lwpolyline_closed_flag_and_vertices() {
    let doc = parse(
        "0\nSECTION\n2\nENTITIES\n\
         0\nLWPOLYLINE\n8\n0\n90\n3\n70\n1\n\
         10\n0.0\n20\n0.0\n10\n4.0\n20\n0.0\n10\n4.0\n20\n3.0\n\
         0\nENDSEC\n0\nEOF\n",
    );
    match entities(&doc)[0] {
        Entity::LwPolyline(polyline) => {
            assert!(polyline.is_closed);
            assert_eq!(polyline.vertices.len(), 3);
            assert!((polyline.vertices[2].position.y() - 3.0).abs() < f64::EPSILON);
        }
        other => panic!("expected lwpolyline, got {other:?}"),
    }
}

#[test]
fn lwpolyline_bulge_attaches_to_preceding_vertex() {
    let doc = parse(
        "0\nSECTION\n2\nENTITIES\n\
         0\nLWPOLYLINE\n8\n0\n90\n2\n70\n0\n\
         10\n0.0\n20\n0.0\n42\n0.5\n10\n4.0\n20\n0.0\n\
         0\nENDSEC\n0\nEOF\n",
    );
    match entities(&doc)[0] {
        Entity::LwPolyline(polyline) => {
            assert!((polyline.vertices[0].bulge - 0.5).abs() < f64::EPSILON);
            assert!(polyline.vertices[1].bulge.abs() < f64::EPSILON);
        }
        other => panic!("expected lwpolyline, got {other:?}"),
    }
}

#[test]
fn heavy_polyline_reads_vertex_sequence() {
    let doc = parse(
        "0\nSECTION\n2\nENTITIES\n\
         0\nPOLYLINE\n8\nSHAPE\n66\n1\n70\n1\n\
         0\nVERTEX\n8\nSHAPE\n10\n0.0\n20\n0.0\n\
         0\nVERTEX\n8\nSHAPE\n10\n4.0\n20\n0.0\n\
         0\nVERTEX\n8\nSHAPE\n10\n4.0\n20\n3.0\n\
         0\nSEQEND\n8\nSHAPE\n\
         0\nENDSEC\n0\nEOF\n",
    );
    match entities(&doc)[0] {
        Entity::VertexPolyline(polyline) => {
            assert!(polyline.is_closed);
            assert_eq!(polyline.vertices.len(), 3);
            assert_eq!(polyline.layer, "SHAPE");
        }
        other => panic!("expected vertex polyline, got {other:?}"),
    }
}

#[test]
fn heavy_polyline_vertex_missing_coordinates_stays_unreadable() {
    let doc = parse(
        "0\nSECTION\n2\nENTITIES\n\
         0\nPOLYLINE\n8\n0\n70\n0\n\
         0\nVERTEX\n8\n0\n10\n0.0\n20\n0.0\n\
         0\nVERTEX\n8\n0\n10\nnot-a-number\n20\n1.0\n\
         0\nVERTEX\n8\n0\n10\n4.0\n20\n3.0\n\
         0\nSEQEND\n\
         0\nENDSEC\n0\nEOF\n",
    );
    match entities(&doc)[0] {
        Entity::VertexPolyline(polyline) => {
            assert_eq!(polyline.vertices.len(), 3);
            assert!(polyline.vertices[0].location.is_some());
            assert!(polyline.vertices[1].location.is_none());
            assert!(polyline.vertices[2].location.is_some());
        }
        other => panic!("expected vertex polyline, got {other:?}"),
    }
}

#[test]
fn mesh_polyline_becomes_unknown() {
    let doc = parse(
        "0\nSECTION\n2\nENTITIES\n\
         0\nPOLYLINE\n8\n0\n70\n16\n\
         0\nVERTEX\n8\n0\n10\n0.0\n20\n0.0\n\
         0\nSEQEND\n\
         0\nENDSEC\n0\nEOF\n",
    );
    match entities(&doc)[0] {
        Entity::Unknown(unknown) => assert_eq!(unknown.kind, "POLYLINE"),
        other => panic!("expected unknown, got {other:?}"),
    }
}

#[test]
fn ellipse_defaults_to_full_parameter_range() {
    let doc = parse(
        "0\nSECTION\n2\nENTITIES\n\
         0\nELLIPSE\n8\n0\n10\n0.0\n20\n0.0\n11\n4.0\n21\n0.0\n40\n0.5\n\
         0\nENDSEC\n0\nEOF\n",
    );
    match entities(&doc)[0] {
        Entity::Ellipse(ellipse) => {
            assert!(ellipse.start_parameter.abs() < f64::EPSILON);
            assert!((ellipse.end_parameter - std::f64::consts::TAU).abs() < 1e-12);
            assert!((ellipse.ratio - 0.5).abs() < f64::EPSILON);
        }
        other => panic!("expected ellipse, got {other:?}"),
    }
}

#[test]
fn spline_collects_knots_control_points_and_flags() {
    let doc = parse(
        "0\nSECTION\n2\nENTITIES\n\
         0\nSPLINE\n8\n0\n70\n4\n71\n2\n72\n6\n73\n3\n\
         40\n0.0\n40\n0.0\n40\n0.0\n40\n1.0\n40\n1.0\n40\n1.0\n\
         41\n1.0\n41\n0.70710678\n41\n1.0\n\
         10\n1.0\n20\n0.0\n10\n1.0\n20\n1.0\n10\n0.0\n20\n1.0\n\
         0\nENDSEC\n0\nEOF\n",
    );
    match entities(&doc)[0] {
        Entity::Spline(spline) => {
            assert_eq!(spline.degree, 2);
            assert!(spline.is_rational);
            assert!(!spline.is_closed);
            assert_eq!(spline.knot_values.len(), 6);
            assert_eq!(spline.weights.len(), 3);
            assert_eq!(spline.control_points.len(), 3);
            assert!((spline.control_points[1].y() - 1.0).abs() < f64::EPSILON);
        }
        other => panic!("expected spline, got {other:?}"),
    }
}

#[test]
fn unrecognized_entity_kind_is_kept_as_unknown() {
    let doc = parse(
        "0\nSECTION\n2\nENTITIES\n\
         0\nMTEXT\n8\nANNOT\n10\n1.0\n20\n1.0\n1\nhello\n\
         0\nCIRCLE\n8\n0\n10\n0.0\n20\n0.0\n40\n2.0\n\
         0\nENDSEC\n0\nEOF\n",
    );
    let entities = entities(&doc);
    assert_eq!(entities.len(), 2);
    match entities[0] {
        Entity::Unknown(unknown) => {
            assert_eq!(unknown.kind, "MTEXT");
            assert_eq!(unknown.layer, "ANNOT");
        }
        other => panic!("expected unknown, got {other:?}"),
    }
    assert!(matches!(entities[1], Entity::Circle(_)));
}

#[test]
fn malformed_entity_body_degrades_to_unknown() {
    // CIRCLE 缺少半径（组码 40），退化为 Unknown 而不使整份文档失败。
    let doc = parse(
        "0\nSECTION\n2\nENTITIES\n\
         0\nCIRCLE\n8\n0\n10\n0.0\n20\n0.0\n\
         0\nLINE\n8\n0\n10\n0.0\n20\n0.0\n11\n1.0\n21\n0.0\n\
         0\nENDSEC\n0\nEOF\n",
    );
    let entities = entities(&doc);
    assert_eq!(entities.len(), 2);
    match entities[0] {
        Entity::Unknown(unknown) => assert_eq!(unknown.kind, "CIRCLE"),
        other => panic!("expected degraded circle, got {other:?}"),
    }
    assert!(matches!(entities[1], Entity::Line(_)));
}

#[test]
fn non_entities_sections_are_skipped() {
    let doc = parse(
        "0\nSECTION\n2\nHEADER\n9\n$ACADVER\n1\nAC1027\n0\nENDSEC\n\
         0\nSECTION\n2\nTABLES\n0\nLAYER\n2\nCUT\n0\nENDSEC\n\
         0\nSECTION\n2\nENTITIES\n\
         0\nCIRCLE\n8\n0\n10\n0.0\n20\n0.0\n40\n1.0\n\
         0\nENDSEC\n0\nEOF\n",
    );
    assert_eq!(doc.entities().count(), 1);
}

#[test]
fn truncated_file_is_a_document_error() {
    let result = DxfFacade::new().parse_str(
        "0\nSECTION\n2\nENTITIES\n\
         0\nLINE\n8\n0\n10\n0.0\n",
    );
    match result {
        Err(IoError::InvalidDocument(_)) => {}
        other => panic!("expected document error, got {other:?}"),
    }
}

#[test]
fn non_integer_group_code_is_a_document_error() {
    let result = DxfFacade::new().parse_str("zero\nSECTION\n");
    assert!(matches!(result, Err(IoError::InvalidDocument(_))));
}

#[test]
fn missing_endsec_is_a_document_error() {
    let result = DxfFacade::new().parse_str(
        "0\nSECTION\n2\nENTITIES\n\
         0\nCIRCLE\n8\n0\n10\n0.0\n20\n0.0\n40\n1.0\n\
         0\nEOF\n",
    );
    assert!(matches!(result, Err(IoError::InvalidDocument(_))));
}

#[test]
fn empty_entities_section_yields_empty_document() {
    let doc = parse("0\nSECTION\n2\nENTITIES\n0\nENDSEC\n0\nEOF\n");
    assert_eq!(doc.entities().count(), 0);
}

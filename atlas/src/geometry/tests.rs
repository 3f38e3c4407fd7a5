use std::cmp::Ordering;

use super::*;

const EPS: f64 = 1e-9;

#[test]
fn rect_area_centroid_bounds() {
    let rect = Geometry::rect(2.0, 4.0, 6.0, 2.0);
    assert!((rect.area() - 12.0).abs() < EPS);
    let c = rect.centroid();
    assert!((c.x - 5.0).abs() < EPS);
    assert!((c.y - 5.0).abs() < EPS);

    let bounds = rect.bounds();
    assert_eq!(bounds.min, Point::new(2.0, 4.0));
    assert_eq!(bounds.max, Point::new(8.0, 6.0));
}

#[test]
fn clockwise_polygon_has_positive_area() {
    let cw = Geometry::Polygon {
        vertices: vec![
            Point::new(0.0, 0.0),
            Point::new(0.0, 4.0),
            Point::new(4.0, 4.0),
            Point::new(4.0, 0.0),
        ],
    };
    assert!((cw.area() - 16.0).abs() < EPS);
    let c = cw.centroid();
    assert!((c.x - 2.0).abs() < EPS && (c.y - 2.0).abs() < EPS);
}

#[test]
fn degenerate_polygon_centroid_is_vertex_mean() {
    let line = Geometry::Polygon {
        vertices: vec![Point::new(0.0, 0.0), Point::new(3.0, 0.0), Point::new(6.0, 0.0)],
    };
    assert_eq!(line.area(), 0.0);
    assert_eq!(line.centroid(), Point::new(3.0, 0.0));
}

#[test]
fn circle_geometry() {
    let circle = Geometry::circle(10.0, 10.0, 2.0);
    assert_eq!(circle.centroid(), Point::new(10.0, 10.0));
    assert_eq!(circle.bounds().min, Point::new(8.0, 8.0));
    assert!(circle.contains(Point::new(11.0, 11.0)));
    assert!(circle.contains(Point::new(12.0, 10.0)));
    assert!(!circle.contains(Point::new(12.0, 12.0)));
}

#[test]
fn point_contains_only_itself() {
    let point = Geometry::point(3.0, 4.0);
    assert!(point.contains(Point::new(3.0, 4.0)));
    assert!(!point.contains(Point::new(3.0, 4.5)));
    assert_eq!(point.area(), 0.0);
}

#[test]
fn concave_polygon_containment() {
    // U shape opening upwards.
    let u = Geometry::Polygon {
        vertices: vec![
            Point::new(0.0, 0.0),
            Point::new(6.0, 0.0),
            Point::new(6.0, 6.0),
            Point::new(4.0, 6.0),
            Point::new(4.0, 2.0),
            Point::new(2.0, 2.0),
            Point::new(2.0, 6.0),
            Point::new(0.0, 6.0),
        ],
    };
    assert!(u.contains(Point::new(1.0, 4.0)));
    assert!(u.contains(Point::new(3.0, 1.0)));
    assert!(!u.contains(Point::new(3.0, 4.0)));
    assert!(!u.contains(Point::new(7.0, 1.0)));
}

#[test]
fn bounding_box_iou() {
    let a = Geometry::rect(0.0, 0.0, 2.0, 2.0).bounds();
    let b = Geometry::rect(1.0, 0.0, 2.0, 2.0).bounds();
    // intersection 2, union 6
    assert!((a.iou(&b) - 1.0 / 3.0).abs() < EPS);
    assert!((a.iou(&a) - 1.0).abs() < EPS);

    let far = Geometry::rect(10.0, 10.0, 1.0, 1.0).bounds();
    assert_eq!(a.iou(&far), 0.0);

    let p = Geometry::point(1.0, 1.0).bounds();
    assert_eq!(p.iou(&p), 0.0);
}

#[test]
fn touching_boxes_intersect_without_area() {
    let a = Geometry::rect(0.0, 0.0, 1.0, 1.0).bounds();
    let b = Geometry::rect(1.0, 0.0, 1.0, 1.0).bounds();
    assert!(a.intersects(&b));
    assert_eq!(a.intersection_area(&b), 0.0);
    assert!(!a.intersects(&b.expanded(-0.1)));
}

#[test]
fn validation() {
    assert!(Geometry::circle(0.0, 0.0, 1.0).validate().is_ok());
    assert!(Geometry::circle(0.0, 0.0, -1.0).validate().is_err());
    assert!(Geometry::circle(f64::NAN, 0.0, 1.0).validate().is_err());
    assert!(Geometry::Polygon {
        vertices: vec![Point::new(0.0, 0.0), Point::new(1.0, 1.0)]
    }
    .validate()
    .is_err());
    assert!(Geometry::Polygon {
        vertices: vec![
            Point::new(0.0, 0.0),
            Point::new(f64::INFINITY, 1.0),
            Point::new(1.0, 0.0)
        ]
    }
    .validate()
    .is_err());
}

#[test]
fn total_cmp_orders_shapes() {
    let a = Geometry::circle(0.0, 0.0, 1.0);
    let b = Geometry::circle(0.0, 0.0, 2.0);
    let rect = Geometry::rect(0.0, 0.0, 1.0, 1.0);
    assert_eq!(a.total_cmp(&b), Ordering::Less);
    assert_eq!(b.total_cmp(&a), Ordering::Greater);
    assert_eq!(a.total_cmp(&rect), Ordering::Less);
    assert_eq!(rect.total_cmp(&rect.clone()), Ordering::Equal);
}

#[test]
fn geometry_serde_is_tagged() {
    let json = r#"{ "type": "circle", "centroid": { "x": 1.0, "y": 2.0 }, "radius": 3.0 }"#;
    let geometry: Geometry = serde_json::from_str(json).unwrap();
    assert_eq!(geometry, Geometry::circle(1.0, 2.0, 3.0));

    let json = r#"{ "type": "polygon", "vertices": [ {"x":0,"y":0}, {"x":1,"y":0}, {"x":1,"y":1} ] }"#;
    let geometry: Geometry = serde_json::from_str(json).unwrap();
    assert!(matches!(geometry, Geometry::Polygon { ref vertices } if vertices.len() == 3));
}

use super::*;
use crate::geometry::{Geometry, Point};

fn brute_force(boxes: &[BoundingBox], margin: f64) -> Vec<(usize, usize)> {
    let grown: Vec<BoundingBox> = boxes.iter().map(|b| b.expanded(margin)).collect();
    let mut pairs = Vec::new();
    for i in 0..grown.len() {
        for j in i + 1..grown.len() {
            if grown[i].intersects(&grown[j]) {
                pairs.push((i, j));
            }
        }
    }
    pairs
}

#[test]
fn finds_overlapping_pairs() {
    let boxes: Vec<BoundingBox> = [
        Geometry::rect(0.0, 0.0, 2.0, 2.0),
        Geometry::rect(1.0, 1.0, 2.0, 2.0),
        Geometry::rect(10.0, 10.0, 1.0, 1.0),
        Geometry::rect(10.5, 10.5, 1.0, 1.0),
        Geometry::rect(50.0, 0.0, 1.0, 1.0),
    ]
    .iter()
    .map(Geometry::bounds)
    .collect();

    let index = GridIndex::build(&boxes, 0.0);
    assert_eq!(index.candidate_pairs(), vec![(0, 1), (2, 3)]);
}

#[test]
fn margin_links_nearby_points() {
    let boxes: Vec<BoundingBox> = [Point::new(0.0, 0.0), Point::new(3.0, 0.0), Point::new(7.0, 0.0)]
        .iter()
        .map(|&p| BoundingBox::around(p, 0.0))
        .collect();

    assert!(GridIndex::build(&boxes, 0.0).candidate_pairs().is_empty());
    assert_eq!(GridIndex::build(&boxes, 1.5).candidate_pairs(), vec![(0, 1)]);
    assert_eq!(
        GridIndex::build(&boxes, 2.0).candidate_pairs(),
        vec![(0, 1), (1, 2)]
    );
}

#[test]
fn matches_brute_force_on_scattered_boxes() {
    // Deterministic scatter with mixed sizes, including one huge box.
    let mut boxes = Vec::new();
    for i in 0..60 {
        let x = ((i * 37) % 101) as f64;
        let y = ((i * 53) % 97) as f64;
        let size = 1.0 + (i % 5) as f64;
        boxes.push(Geometry::rect(x, y, size, size).bounds());
    }
    boxes.push(Geometry::rect(-5.0, -5.0, 200.0, 3.0).bounds());

    for margin in [0.0, 0.5, 3.0] {
        let index = GridIndex::build(&boxes, margin);
        assert_eq!(index.candidate_pairs(), brute_force(&boxes, margin), "margin {margin}");
    }
}

#[test]
fn empty_and_single() {
    assert!(GridIndex::build(&[], 1.0).candidate_pairs().is_empty());
    let one = [Geometry::rect(0.0, 0.0, 1.0, 1.0).bounds()];
    assert!(GridIndex::build(&one, 1.0).candidate_pairs().is_empty());
}

#[test]
fn mixed_sizes_report_each_pair_once() {
    let mut boxes = Vec::new();
    for i in 0..200 {
        let x = ((i * 37) % 400) as f64;
        let y = ((i * 91) % 400) as f64;
        boxes.push(Geometry::rect(x, y, 1.0, 1.0).bounds());
    }
    for i in 0..40 {
        let offset = i as f64 * 2.0;
        boxes.push(Geometry::rect(offset, offset, 300.0, 300.0).bounds());
    }

    let index = GridIndex::build(&boxes, 0.0);
    assert!(index.bucket_entries() <= 200 * 16);

    let pairs = index.candidate_pairs();
    let mut unique = pairs.clone();
    unique.dedup();
    assert_eq!(pairs, unique);
    assert_eq!(pairs, brute_force(&boxes, 0.0));
}

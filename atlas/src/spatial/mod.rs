//! Uniform-grid broad phase for overlap candidate search.
//!
//! Boxes are bucketed into square cells; only boxes sharing a cell are
//! reported as candidates. A pair is emitted only by the cell holding the
//! min corner of the two boxes' intersection, so shared cells do not repeat
//! it. Boxes spanning many cells skip the buckets and are tested against
//! every box directly. The index is conservative: every pair of
//! intersecting boxes is reported, so it never changes merge results.

#[cfg(test)]
mod tests;

use hashbrown::HashMap;

use crate::geometry::BoundingBox;

/// Upper bound on cells per axis, so one oversized box cannot allocate a huge grid.
const MAX_CELLS_PER_AXIS: f64 = 256.0;

/// Cell size used when every box is degenerate.
const FALLBACK_CELL_SIZE: f64 = 1.0;

/// Boxes spanning more cells than this on either axis are not bucketed.
const MAX_BUCKETED_SPAN: i64 = 4;

#[derive(Debug)]
pub struct GridIndex {
    boxes: Vec<BoundingBox>,
    cell_size: f64,
    origin_x: f64,
    origin_y: f64,
    cells: HashMap<(i64, i64), Vec<usize>>,
    oversized: Vec<bool>,
}

impl GridIndex {
    /// Indexes `boxes`, each grown by `margin` on every side.
    pub fn build(boxes: &[BoundingBox], margin: f64) -> Self {
        let boxes: Vec<BoundingBox> = boxes.iter().map(|b| b.expanded(margin)).collect();
        let cell_size = choose_cell_size(&boxes);
        let origin_x = boxes.iter().map(|b| b.min.x).fold(f64::INFINITY, f64::min);
        let origin_y = boxes.iter().map(|b| b.min.y).fold(f64::INFINITY, f64::min);

        let mut index = Self {
            oversized: vec![false; boxes.len()],
            boxes,
            cell_size,
            origin_x: if origin_x.is_finite() { origin_x } else { 0.0 },
            origin_y: if origin_y.is_finite() { origin_y } else { 0.0 },
            cells: HashMap::new(),
        };

        for item in 0..index.boxes.len() {
            let (x0, y0, x1, y1) = index.cell_span(&index.boxes[item]);
            if x1 - x0 >= MAX_BUCKETED_SPAN || y1 - y0 >= MAX_BUCKETED_SPAN {
                index.oversized[item] = true;
                continue;
            }
            for cy in y0..=y1 {
                for cx in x0..=x1 {
                    index.cells.entry((cx, cy)).or_default().push(item);
                }
            }
        }

        index
    }

    fn cell(&self, x: f64, y: f64) -> (i64, i64) {
        (
            ((x - self.origin_x) / self.cell_size).floor() as i64,
            ((y - self.origin_y) / self.cell_size).floor() as i64,
        )
    }

    fn cell_span(&self, b: &BoundingBox) -> (i64, i64, i64, i64) {
        let (x0, y0) = self.cell(b.min.x, b.min.y);
        let (x1, y1) = self.cell(b.max.x, b.max.y);
        (x0, y0, x1, y1)
    }

    /// The one cell that reports an intersecting pair of bucketed boxes.
    fn owning_cell(&self, a: &BoundingBox, b: &BoundingBox) -> (i64, i64) {
        self.cell(a.min.x.max(b.min.x), a.min.y.max(b.min.y))
    }

    /// Pairs `(i, j)`, `i < j`, whose grown boxes intersect, sorted and unique.
    pub fn candidate_pairs(&self) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        for (&cell, items) in &self.cells {
            for (k, &i) in items.iter().enumerate() {
                for &j in &items[k + 1..] {
                    let (a, b) = if i < j { (i, j) } else { (j, i) };
                    let (box_a, box_b) = (&self.boxes[a], &self.boxes[b]);
                    if box_a.intersects(box_b) && self.owning_cell(box_a, box_b) == cell {
                        pairs.push((a, b));
                    }
                }
            }
        }

        for i in (0..self.boxes.len()).filter(|&i| self.oversized[i]) {
            for j in 0..self.boxes.len() {
                // Oversized pairs are reported once, from their lower index.
                if j == i || (self.oversized[j] && j < i) {
                    continue;
                }
                if self.boxes[i].intersects(&self.boxes[j]) {
                    pairs.push((i.min(j), i.max(j)));
                }
            }
        }

        pairs.sort_unstable();
        pairs
    }

    #[cfg(test)]
    fn bucket_entries(&self) -> usize {
        self.cells.values().map(Vec::len).sum()
    }
}

/// Median box extent, bounded below so the grid stays small.
fn choose_cell_size(boxes: &[BoundingBox]) -> f64 {
    if boxes.is_empty() {
        return FALLBACK_CELL_SIZE;
    }

    let mut extents: Vec<f64> = boxes.iter().map(|b| b.width().max(b.height())).collect();
    extents.sort_unstable_by(f64::total_cmp);
    let median = extents[extents.len() / 2];

    let min_x = boxes.iter().map(|b| b.min.x).fold(f64::INFINITY, f64::min);
    let max_x = boxes.iter().map(|b| b.max.x).fold(f64::NEG_INFINITY, f64::max);
    let min_y = boxes.iter().map(|b| b.min.y).fold(f64::INFINITY, f64::min);
    let max_y = boxes.iter().map(|b| b.max.y).fold(f64::NEG_INFINITY, f64::max);
    let span = (max_x - min_x).max(max_y - min_y);

    let size = median.max(span / MAX_CELLS_PER_AXIS);
    if size.is_finite() && size > 0.0 {
        size
    } else {
        FALLBACK_CELL_SIZE
    }
}

//! Immutable region hierarchy.
//!
//! Regions are stored in a flat arena in pre-order, so:
//! - `all_regions()` is already the deterministic output order,
//! - the descendants of a region form the contiguous range that follows it,
//! - walking the arena backwards visits every child before its parent.


use std::ops::Range;

use hashbrown::{HashMap, HashSet};
use serde::{Deserialize, Serialize};

use crate::error::{OntologyDefect, Result};

/// Nested ontology node as exported by atlas tools: `{ id, name, children }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionSource {
    pub id: String,
    pub name: String,
    /// Area of the region in the image's unit (µm²). Only leaf areas are used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<RegionSource>,
}

impl RegionSource {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            area: None,
            children: Vec::new(),
        }
    }

    pub fn with_area(mut self, area: f64) -> Self {
        self.area = Some(area);
        self
    }

    pub fn with_children(mut self, children: Vec<RegionSource>) -> Self {
        self.children = children;
        self
    }
}

/// Flat ontology entry referencing its parent by id. Exactly one entry has no parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatRegion {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OntologySource {
    Nested(RegionSource),
    Flat(Vec<FlatRegion>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub id: String,
    pub name: String,
    pub depth: usize,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    /// Declared area; internal regions derive theirs from their children.
    pub area: f64,
    subtree_end: usize,
}

impl Region {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct OntologyTree {
    regions: Vec<Region>,
    index_by_id: HashMap<String, usize>,
}

/// Borrowed view of a node during construction, independent of the source layout.
struct PendingRegion<'a> {
    id: &'a str,
    name: &'a str,
    area: Option<f64>,
    children: Vec<usize>,
}

impl OntologyTree {
    pub fn from_source(source: &OntologySource) -> Result<Self> {
        match source {
            OntologySource::Nested(root) => Self::build(root),
            OntologySource::Flat(entries) => Self::from_flat(entries),
        }
    }

    /// Builds the tree from a nested source. Fails on duplicated ids.
    pub fn build(root: &RegionSource) -> Result<Self> {
        let mut pending: Vec<PendingRegion<'_>> = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();

        // Every node gets a pending slot; children refer to their slots.
        let mut stack: Vec<(&RegionSource, Option<usize>)> = vec![(root, None)];
        while let Some((node, parent)) = stack.pop() {
            check_id(&node.id)?;
            if !seen.insert(node.id.as_str()) {
                return Err(OntologyDefect::DuplicateId(node.id.clone()).into());
            }

            let slot = pending.len();
            pending.push(PendingRegion {
                id: &node.id,
                name: &node.name,
                area: node.area,
                children: Vec::with_capacity(node.children.len()),
            });
            if let Some(parent) = parent {
                pending[parent].children.push(slot);
            }
            for child in node.children.iter().rev() {
                stack.push((child, Some(slot)));
            }
        }

        Self::from_pending(pending, 0)
    }

    /// Builds the tree from flat `{ id, name, parent }` entries.
    ///
    /// Children keep the declaration order of the entries.
    pub fn from_flat(entries: &[FlatRegion]) -> Result<Self> {
        let mut slot_by_id: HashMap<&str, usize> = HashMap::with_capacity(entries.len());
        for (slot, entry) in entries.iter().enumerate() {
            check_id(&entry.id)?;
            if slot_by_id.insert(entry.id.as_str(), slot).is_some() {
                return Err(OntologyDefect::DuplicateId(entry.id.clone()).into());
            }
        }

        let mut pending: Vec<PendingRegion<'_>> = entries
            .iter()
            .map(|entry| PendingRegion {
                id: &entry.id,
                name: &entry.name,
                area: entry.area,
                children: Vec::new(),
            })
            .collect();

        let mut roots = Vec::new();
        for (slot, entry) in entries.iter().enumerate() {
            match &entry.parent {
                None => roots.push(slot),
                Some(parent) => {
                    let parent_slot = slot_by_id.get(parent.as_str()).copied().ok_or_else(|| {
                        OntologyDefect::MissingParent {
                            id: entry.id.clone(),
                            parent: parent.clone(),
                        }
                    })?;
                    pending[parent_slot].children.push(slot);
                }
            }
        }

        let root = match roots.as_slice() {
            [] => return Err(OntologyDefect::NoRoot.into()),
            [root] => *root,
            _ => {
                let ids = roots.iter().map(|&slot| entries[slot].id.clone()).collect();
                return Err(OntologyDefect::MultipleRoots(ids).into());
            }
        };

        Self::from_pending(pending, root)
    }

    /// Lays the pending nodes out in pre-order starting from `root`.
    fn from_pending(pending: Vec<PendingRegion<'_>>, root: usize) -> Result<Self> {
        let mut order: Vec<(usize, Option<usize>, usize)> = Vec::with_capacity(pending.len());
        let mut visited = vec![false; pending.len()];
        let mut stack = vec![(root, None, 0usize)];
        while let Some((slot, parent, depth)) = stack.pop() {
            if visited[slot] {
                continue;
            }
            visited[slot] = true;
            order.push((slot, parent, depth));
            let position = order.len() - 1;
            for &child in pending[slot].children.iter().rev() {
                stack.push((child, Some(position), depth + 1));
            }
        }

        if order.len() != pending.len() {
            let mut unreachable: Vec<String> = visited
                .iter()
                .enumerate()
                .filter(|(_, seen)| !**seen)
                .map(|(slot, _)| pending[slot].id.to_string())
                .collect();
            unreachable.sort();
            return Err(OntologyDefect::Cycle(unreachable).into());
        }

        let mut regions: Vec<Region> = Vec::with_capacity(order.len());
        let mut index_by_id = HashMap::with_capacity(order.len());
        for &(slot, parent, depth) in &order {
            let node = &pending[slot];
            let area = node.area.unwrap_or(0.0);
            if !area.is_finite() || area < 0.0 {
                return Err(OntologyDefect::InvalidArea {
                    id: node.id.to_string(),
                    area,
                }
                .into());
            }

            let index = regions.len();
            index_by_id.insert(node.id.to_string(), index);
            regions.push(Region {
                id: node.id.to_string(),
                name: node.name.to_string(),
                depth,
                parent,
                children: Vec::with_capacity(node.children.len()),
                area,
                subtree_end: index + 1,
            });
            if let Some(parent) = parent {
                regions[parent].children.push(index);
            }
        }

        for index in (0..regions.len()).rev() {
            let end = regions[index]
                .children
                .last()
                .map_or(index + 1, |&last| regions[last].subtree_end);
            regions[index].subtree_end = end;
        }

        Ok(Self {
            regions,
            index_by_id,
        })
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn root(&self) -> &Region {
        &self.regions[0]
    }

    /// All regions in pre-order.
    pub fn all_regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn region(&self, index: usize) -> &Region {
        &self.regions[index]
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index_by_id.get(id).copied()
    }

    pub fn get(&self, id: &str) -> Option<&Region> {
        self.index_of(id).map(|index| &self.regions[index])
    }

    /// `false` for internal regions and for ids not in the ontology.
    pub fn is_leaf(&self, id: &str) -> bool {
        self.get(id).is_some_and(Region::is_leaf)
    }

    /// Ancestors from the immediate parent up to the root; empty for the root.
    pub fn ancestors_of(&self, id: &str) -> Option<Vec<&Region>> {
        let index = self.index_of(id)?;
        Some(self.ancestors(index).map(|ancestor| &self.regions[ancestor]).collect())
    }

    pub fn ancestors(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        std::iter::successors(self.regions[index].parent, |&current| {
            self.regions[current].parent
        })
    }

    /// Pre-order index range of the strict descendants of `index`.
    pub fn descendants(&self, index: usize) -> Range<usize> {
        index + 1..self.regions[index].subtree_end
    }

    pub fn leaves(&self) -> impl Iterator<Item = usize> + '_ {
        self.regions
            .iter()
            .enumerate()
            .filter(|(_, region)| region.is_leaf())
            .map(|(index, _)| index)
    }

    /// Indices ordered so that every child comes before its parent.
    pub fn bottom_up(&self) -> impl Iterator<Item = usize> {
        (0..self.regions.len()).rev()
    }
}

fn check_id(id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(OntologyDefect::EmptyId.into());
    }
    Ok(())
}

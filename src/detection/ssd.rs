//! Anchor boxes of single shot detectors (SSDs).
//!
//! An SSD predicts every box relative to a fixed anchor. The palm detector only uses fixed-size
//! anchors, so an anchor is fully described by its center.

use std::ops::Index;

/// One output feature map: a square grid of cells, each predicting the same number of boxes.
#[derive(Debug, Clone, Copy)]
pub struct FeatureMap {
    grid: u32,
    anchors_per_cell: u32,
}

impl FeatureMap {
    /// A `grid x grid` feature map with `anchors_per_cell` boxes per cell.
    pub const fn new(grid: u32, anchors_per_cell: u32) -> Self {
        assert!(grid != 0 && anchors_per_cell != 0);
        Self {
            grid,
            anchors_per_cell,
        }
    }
}

/// Center of an anchor, relative to the network input (`0.0..1.0` on both axes).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    pub x: f32,
    pub y: f32,
}

/// All anchors of a network, in the order its outputs are laid out.
pub struct Anchors(Vec<Anchor>);

impl Anchors {
    /// Lays out the anchors of `maps`, row by row within each map.
    pub fn new(maps: &[FeatureMap]) -> Self {
        let anchors = maps
            .iter()
            .flat_map(|map| {
                let step = 1.0 / map.grid as f32;
                (0..map.grid * map.grid).flat_map(move |cell| {
                    let anchor = Anchor {
                        x: ((cell % map.grid) as f32 + 0.5) * step,
                        y: ((cell / map.grid) as f32 + 0.5) * step,
                    };
                    (0..map.anchors_per_cell).map(move |_| anchor)
                })
            })
            .collect();
        Self(anchors)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl Index<usize> for Anchors {
    type Output = Anchor;

    fn index(&self, index: usize) -> &Anchor {
        &self.0[index]
    }
}

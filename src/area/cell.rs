use crate::area::Bounds;
use serde::Serialize;

/// A rectangular search unit at a given subdivision depth
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Cell {
    /// Rectangle searched by this cell
    pub bounds: Bounds,

    /// Subdivision depth (0 for the root cell)
    pub depth: u32,
}

impl Cell {
    /// Creates the root cell spanning `bounds`
    pub fn root(bounds: Bounds) -> Self {
        Self { bounds, depth: 0 }
    }

    /// Splits the cell into four equal quadrants at the lat/lng midpoints
    ///
    /// Quadrants are returned in SW, SE, NW, NE order. Midpoints are shared
    /// edges, so the children tile the parent exactly.
    pub fn subdivide(&self) -> [Cell; 4] {
        let Bounds {
            south,
            west,
            north,
            east,
        } = self.bounds;
        let mid_lat = (south + north) / 2.0;
        let mid_lng = (west + east) / 2.0;
        let depth = self.depth + 1;

        let quad = |south, west, north, east| Cell {
            bounds: Bounds {
                south,
                west,
                north,
                east,
            },
            depth,
        };

        [
            quad(south, west, mid_lat, mid_lng),
            quad(south, mid_lng, mid_lat, east),
            quad(mid_lat, west, north, mid_lng),
            quad(mid_lat, mid_lng, north, east),
        ]
    }
}

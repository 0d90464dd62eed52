//! Connected-component labelling of coded interface grids.

use crate::interface::{code, neighbours, CodedGrid};

/// Island labels of a coded grid.
#[derive(Debug, Clone, PartialEq)]
pub struct IslandMap {
    nx: usize,
    ids: Vec<usize>,
    /// Number of islands found.
    pub island_count: usize,
    /// Islands with no cell able to reach an alignment site.
    pub islands_without_ag: usize,
}

impl IslandMap {
    /// Island id of `(ix, iy)`, counting from 1; 0 for empty cells.
    pub fn id(&self, ix: usize, iy: usize) -> usize {
        self.ids[iy * self.nx + ix]
    }

    /// Islands that can host at least one feature.
    pub fn islands_with_ag(&self) -> usize {
        self.island_count - self.islands_without_ag
    }
}

/// Label 8-connected islands.
///
/// Cells that host or reach a site ([`code::SITE`], [`code::CONNECTED`])
/// form one kind of cluster and bare occupied cells ([`code::ISOLATED`])
/// another; clusters of the second kind are the islands without AG. Ids
/// are handed out in x-major scan order.
pub fn count_islands(coded: &CodedGrid) -> IslandMap {
    let (nx, ny) = (coded.nx(), coded.ny());
    let mut ids = vec![0usize; nx * ny];
    let mut island_count = 0;
    let mut islands_without_ag = 0;

    let capable = |c: i8| c == code::SITE || c == code::CONNECTED;

    for ix in 0..nx {
        for iy in 0..ny {
            if ids[iy * nx + ix] != 0 {
                continue;
            }
            let c = coded.code(ix, iy);
            if c == code::EMPTY {
                continue;
            }
            let with_ag = capable(c);
            island_count += 1;
            if !with_ag {
                islands_without_ag += 1;
            }

            let mut stack = vec![(ix, iy)];
            ids[iy * nx + ix] = island_count;
            while let Some((cx, cy)) = stack.pop() {
                for (jx, jy) in neighbours(cx, cy, nx, ny) {
                    let slot = jy * nx + jx;
                    if ids[slot] != 0 {
                        continue;
                    }
                    let cj = coded.code(jx, jy);
                    let same_kind = if with_ag {
                        capable(cj)
                    } else {
                        cj == code::ISOLATED
                    };
                    if same_kind {
                        ids[slot] = island_count;
                        stack.push((jx, jy));
                    }
                }
            }
        }
    }

    tracing::debug!(island_count, islands_without_ag, "counted islands");
    IslandMap {
        nx,
        ids,
        island_count,
        islands_without_ag,
    }
}

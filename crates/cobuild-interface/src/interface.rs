//! Candidate alignment sites on a cut interface.

use crate::grid::OccupancyGrid;
use crate::placement::AgParameters;

/// Cell codes of a [`CodedGrid`].
pub mod code {
    /// Not part of the section.
    pub const EMPTY: i8 = 0;
    /// Occupied but unable to reach a site.
    pub const ISOLATED: i8 = -1;
    /// Can host a feature of the checked radius.
    pub const SITE: i8 = 1;
    /// Connected to a site through occupied cells.
    pub const CONNECTED: i8 = 2;
}

/// Occupancy grid annotated with [`code`] values.
#[derive(Debug, Clone, PartialEq)]
pub struct CodedGrid {
    nx: usize,
    ny: usize,
    codes: Vec<i8>,
    xs: Vec<f64>,
    ys: Vec<f64>,
    /// Radius the grid was checked for.
    pub radius: f64,
}

impl CodedGrid {
    /// Code grid from explicit values laid out `codes[iy * nx + ix]`.
    pub fn from_codes(nx: usize, ny: usize, codes: Vec<i8>, xs: Vec<f64>, ys: Vec<f64>) -> Self {
        debug_assert_eq!(codes.len(), nx * ny);
        Self {
            nx,
            ny,
            codes,
            xs,
            ys,
            radius: 0.0,
        }
    }

    /// Columns.
    pub fn nx(&self) -> usize {
        self.nx
    }

    /// Rows.
    pub fn ny(&self) -> usize {
        self.ny
    }

    /// Code at `(ix, iy)`.
    pub fn code(&self, ix: usize, iy: usize) -> i8 {
        self.codes[iy * self.nx + ix]
    }

    /// World position of `(ix, iy)`.
    pub fn position(&self, ix: usize, iy: usize) -> (f64, f64) {
        (self.xs[ix], self.ys[iy])
    }

    /// Number of cells carrying `value`.
    pub fn count(&self, value: i8) -> usize {
        self.codes.iter().filter(|&&c| c == value).count()
    }

    /// Cells carrying `value` in x-major scan order.
    pub fn cells_with(&self, value: i8) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..self.nx)
            .flat_map(move |ix| (0..self.ny).map(move |iy| (ix, iy)))
            .filter(move |&(ix, iy)| self.code(ix, iy) == value)
    }

    fn set(&mut self, ix: usize, iy: usize, value: i8) {
        self.codes[iy * self.nx + ix] = value;
    }
}

/// Mark where a feature of `radius` fits and which cells reach one.
///
/// A cell is a site when it is occupied, lies at least the clearance
/// `radius · fit_multiplier + offset` away from the section's outer extents,
/// and every cell within the clearance box is inside the grid and occupied. Occupied cells 8-connected
/// to a site are then flooded to [`code::CONNECTED`].
pub fn interface_check(grid: &OccupancyGrid, radius: f64, params: &AgParameters) -> CodedGrid {
    let (nx, ny) = (grid.nx(), grid.ny());
    let clearance = radius * params.fit_multiplier + params.offset;
    let gap_x = (clearance / grid.step_x()).ceil() as isize;
    let gap_y = (clearance / grid.step_y()).ceil() as isize;

    let mut codes = vec![code::EMPTY; nx * ny];
    for ix in 0..nx {
        for iy in 0..ny {
            if grid.get(ix, iy) {
                codes[iy * nx + ix] = code::ISOLATED;
            }
        }
    }
    let mut coded = CodedGrid {
        nx,
        ny,
        codes,
        xs: grid.xs().to_vec(),
        ys: grid.ys().to_vec(),
        radius,
    };

    for ix in 0..nx {
        for iy in 0..ny {
            let (x, y) = coded.position(ix, iy);
            if (x.abs() - grid.x_extreme()).abs() < clearance
                || (y.abs() - grid.y_extreme()).abs() < clearance
            {
                continue;
            }
            if coded.code(ix, iy) != code::ISOLATED {
                continue;
            }
            let clear = (-gap_x..=gap_x).all(|dx| {
                (-gap_y..=gap_y).all(|dy| match offset(ix, iy, dx, dy, nx, ny) {
                    Some((jx, jy)) => coded.code(jx, jy) != code::EMPTY,
                    None => false,
                })
            });
            if clear {
                coded.set(ix, iy, code::SITE);
            }
        }
    }

    flood_connected(&mut coded);
    coded
}

/// Grow [`code::CONNECTED`] out from every site until nothing changes.
fn flood_connected(coded: &mut CodedGrid) {
    let (nx, ny) = (coded.nx, coded.ny);
    let bound = nx.max(ny);
    let mut frontier: Vec<(usize, usize)> = coded.cells_with(code::SITE).collect();
    let mut rounds = 0usize;

    while !frontier.is_empty() {
        let mut next = Vec::new();
        for &(ix, iy) in &frontier {
            for (jx, jy) in neighbours(ix, iy, nx, ny) {
                if coded.code(jx, jy) == code::ISOLATED {
                    coded.set(jx, jy, code::CONNECTED);
                    next.push((jx, jy));
                }
            }
        }
        if !next.is_empty() {
            rounds += 1;
        }
        frontier = next;
    }

    if rounds > bound {
        tracing::warn!(rounds, bound, "connection flood ran past the grid dimension bound");
    }
}

/// In-bounds 8-neighbours of `(ix, iy)`.
pub(crate) fn neighbours(
    ix: usize,
    iy: usize,
    nx: usize,
    ny: usize,
) -> impl Iterator<Item = (usize, usize)> {
    (-1isize..=1)
        .flat_map(|dx| (-1isize..=1).map(move |dy| (dx, dy)))
        .filter(|&(dx, dy)| dx != 0 || dy != 0)
        .filter_map(move |(dx, dy)| offset(ix, iy, dx, dy, nx, ny))
}

fn offset(ix: usize, iy: usize, dx: isize, dy: isize, nx: usize, ny: usize) -> Option<(usize, usize)> {
    let jx = ix.checked_add_signed(dx)?;
    let jy = iy.checked_add_signed(dy)?;
    (jx < nx && jy < ny).then_some((jx, jy))
}

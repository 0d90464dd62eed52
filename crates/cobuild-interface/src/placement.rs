//! Alignment geometry (AG) parameters and site placement.

use serde::{Deserialize, Serialize};

use crate::error::{InterfaceError, Result};
use crate::grid::OccupancyGrid;
use crate::interface::{code, interface_check, CodedGrid};
use crate::islands::count_islands;

/// Alignment peg/socket settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgParameters {
    /// Place alignment features at all.
    pub enabled: bool,
    /// Minimum centre-to-centre spacing (mm).
    pub spacing: f64,
    /// Distance kept from the section edge (mm).
    pub offset: f64,
    /// Fewer features than this on an interface is reported.
    pub min_number: usize,
    /// Socket-to-peg size ratio.
    pub fit_multiplier: f64,
    /// Interface sampling spacing (mm).
    pub grid_density: f64,
    /// Smallest printable peg radius (mm).
    pub min_rad: f64,
    /// Smallest printable peg height (mm).
    pub min_height: f64,
    /// Radius increment per placement trial (mm).
    pub rad_inc: f64,
    /// Largest peg radius (mm).
    pub max_rad: f64,
}

impl Default for AgParameters {
    fn default() -> Self {
        Self {
            enabled: true,
            spacing: 20.0,
            offset: 2.0,
            min_number: 5,
            fit_multiplier: 1.15,
            grid_density: 1.0,
            min_rad: 0.5,
            min_height: 0.75,
            rad_inc: 0.5,
            max_rad: 4.0,
        }
    }
}

impl AgParameters {
    /// Coarse settings used when exercising interface placement on its own.
    pub fn interface_test() -> Self {
        Self {
            spacing: 5.0,
            offset: 1.0,
            min_rad: 5.0,
            rad_inc: 5.0,
            max_rad: 10.0,
            min_height: 7.5,
            ..Self::default()
        }
    }

    /// Check that the settings are usable.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("grid_density", self.grid_density),
            ("min_rad", self.min_rad),
            ("rad_inc", self.rad_inc),
            ("fit_multiplier", self.fit_multiplier),
        ];
        for (name, value) in positive {
            if !(value > 0.0) {
                return Err(InterfaceError::InvalidParameters(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        if self.max_rad < self.min_rad {
            return Err(InterfaceError::InvalidParameters(format!(
                "max_rad {} is smaller than min_rad {}",
                self.max_rad, self.min_rad
            )));
        }
        if self.offset < 0.0 || self.spacing < 0.0 || self.min_height < 0.0 {
            return Err(InterfaceError::InvalidParameters(
                "offset, spacing and min_height must not be negative".into(),
            ));
        }
        Ok(())
    }

    /// Spacing actually enforced between features.
    pub fn effective_spacing(&self) -> f64 {
        self.spacing.max(2.0 * self.max_rad + 2.0 * self.offset)
    }
}

/// One alignment feature location.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlignmentSite {
    /// Island id (from the minimum-radius labelling) the site belongs to.
    pub island: usize,
    /// Peg radius.
    pub radius: f64,
    /// Centre X.
    pub x: f64,
    /// Centre Y.
    pub y: f64,
}

/// Choose feature sites on an interface.
///
/// Islands are labelled once at `min_rad`. The radius then grows by
/// `rad_inc` while some island has no site and the radius stays within
/// `max_rad`; each island keeps the smallest radius that gave it a site.
/// When the search reaches `max_rad`, every island gets each of its sites
/// that is at least the effective spacing from an earlier one; otherwise
/// an island gets its first site in scan order.
pub fn ag_locations(grid: &OccupancyGrid, params: &AgParameters) -> Vec<AlignmentSite> {
    let base = interface_check(grid, params.min_rad, params);
    let islands = count_islands(&base);
    let mut best: Vec<Option<(f64, Vec<(usize, usize)>)>> = vec![None; islands.island_count + 1];
    record_sites(&base, |ix, iy| islands.id(ix, iy), &mut best);

    let mut searched = params.min_rad;
    let mut radius = params.min_rad + params.rad_inc;
    while uncovered(&best) > 0 && radius <= params.max_rad + 1e-9 {
        let coded = interface_check(grid, radius, params);
        record_sites(&coded, |ix, iy| islands.id(ix, iy), &mut best);
        searched = radius;
        radius += params.rad_inc;
    }
    let capped = searched + params.rad_inc > params.max_rad + 1e-9;

    let step_x = grid.step_x().abs().max(f64::EPSILON);
    let step_y = grid.step_y().abs().max(f64::EPSILON);
    let spacing = params.effective_spacing();
    let reach_x = (spacing / step_x).ceil() as usize;
    let reach_y = (spacing / step_y).ceil() as usize;

    let mut sites = Vec::new();
    for (island, entry) in best.iter().enumerate() {
        let Some((r, cells)) = entry else {
            continue;
        };
        let position = |(ix, iy): (usize, usize)| AlignmentSite {
            island,
            radius: *r,
            x: grid.xs()[ix],
            y: grid.ys()[iy],
        };
        if capped {
            let mut kept: Vec<(usize, usize)> = Vec::new();
            for &(ix, iy) in cells {
                let crowded = kept
                    .iter()
                    .any(|&(kx, ky)| kx.abs_diff(ix) <= reach_x && ky.abs_diff(iy) <= reach_y);
                if !crowded {
                    kept.push((ix, iy));
                }
            }
            sites.extend(kept.into_iter().map(position));
        } else if let Some(&first) = cells.first() {
            sites.push(position(first));
        }
    }

    tracing::debug!(
        islands = islands.island_count,
        without_ag = islands.islands_without_ag,
        radius = searched,
        sites = sites.len(),
        "placed alignment sites"
    );
    sites
}

/// Labelled islands (id 0 is empty space) that have no site yet.
fn uncovered(best: &[Option<(f64, Vec<(usize, usize)>)>]) -> usize {
    best.iter().skip(1).filter(|entry| entry.is_none()).count()
}

/// Record the sites of `coded` for islands that have none yet.
fn record_sites(
    coded: &CodedGrid,
    island_of: impl Fn(usize, usize) -> usize,
    best: &mut [Option<(f64, Vec<(usize, usize)>)>],
) {
    let mut found: Vec<Vec<(usize, usize)>> = vec![Vec::new(); best.len()];
    for (ix, iy) in coded.cells_with(code::SITE) {
        let id = island_of(ix, iy);
        if id > 0 && id < found.len() {
            found[id].push((ix, iy));
        }
    }
    for (id, cells) in found.into_iter().enumerate() {
        if !cells.is_empty() && best[id].is_none() {
            best[id] = Some((coded.radius, cells));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn params() -> AgParameters {
        AgParameters {
            spacing: 4.0,
            offset: 0.0,
            fit_multiplier: 1.0,
            min_rad: 1.0,
            rad_inc: 1.0,
            max_rad: 2.0,
            ..AgParameters::default()
        }
    }

    #[test]
    fn test_defaults_validate() {
        assert!(AgParameters::default().validate().is_ok());
        assert!(AgParameters::interface_test().validate().is_ok());
        let bad = AgParameters {
            max_rad: 0.1,
            ..AgParameters::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_effective_spacing() {
        let p = AgParameters::default();
        assert_relative_eq!(p.effective_spacing(), 20.0);
        let tight = AgParameters {
            spacing: 1.0,
            ..AgParameters::default()
        };
        assert_relative_eq!(tight.effective_spacing(), 12.0);
    }

    #[test]
    fn test_small_island_gets_single_min_radius_site() {
        // 3×3 block: fits radius 1 only at its centre.
        let grid = OccupancyGrid::from_fn(21, 21, [-10.0, -10.0], 1.0, |ix, iy| {
            ix.abs_diff(10) <= 1 && iy.abs_diff(10) <= 1
        });
        let sites = ag_locations(&grid, &params());
        assert_eq!(sites.len(), 1);
        assert_relative_eq!(sites[0].radius, 1.0);
        assert_relative_eq!(sites[0].x, 0.0);
        assert_relative_eq!(sites[0].y, 0.0);
    }

    #[test]
    fn test_large_island_reaches_cap_and_spreads_sites() {
        let grid = OccupancyGrid::from_fn(41, 41, [-20.0, -20.0], 1.0, |ix, iy| {
            ix.abs_diff(20) <= 15 && iy.abs_diff(20) <= 15
        });
        let p = AgParameters {
            min_rad: 2.0,
            ..params()
        };
        let sites = ag_locations(&grid, &p);
        assert!(sites.len() > 1);
        for s in &sites {
            assert_relative_eq!(s.radius, 2.0);
        }
        let spacing = p.effective_spacing();
        for (i, a) in sites.iter().enumerate() {
            for b in &sites[i + 1..] {
                let apart = (a.x - b.x).abs().max((a.y - b.y).abs());
                assert!(apart > spacing - 1e-9);
            }
        }
    }

    #[test]
    fn test_island_keeps_smallest_fitting_radius() {
        // 9×9 block fits radius 1, 2 and 3; the lone cell keeps the search
        // going up to max_rad.
        let grid = OccupancyGrid::from_fn(21, 21, [-10.0, -10.0], 1.0, |ix, iy| {
            let block = ix.abs_diff(10) <= 4 && iy.abs_diff(10) <= 4;
            block || (ix == 2 && iy == 18)
        });
        let p = AgParameters {
            max_rad: 3.0,
            ..params()
        };
        assert!(interface_check(&grid, 3.0, &p).count(code::SITE) > 0);

        let sites = ag_locations(&grid, &p);
        assert!(!sites.is_empty());
        for s in &sites {
            assert_relative_eq!(s.radius, p.min_rad);
            assert!(s.x.abs() <= 4.0 && s.y.abs() <= 4.0);
        }
    }

    #[test]
    fn test_two_islands_each_get_a_site() {
        let grid = OccupancyGrid::from_fn(31, 31, [-15.0, -15.0], 1.0, |ix, iy| {
            let left = ix.abs_diff(8) <= 2 && iy.abs_diff(15) <= 2;
            let right = ix.abs_diff(22) <= 2 && iy.abs_diff(15) <= 2;
            left || right
        });
        let sites = ag_locations(&grid, &params());
        let mut islands: Vec<usize> = sites.iter().map(|s| s.island).collect();
        islands.dedup();
        assert_eq!(islands.len(), 2);
    }
}

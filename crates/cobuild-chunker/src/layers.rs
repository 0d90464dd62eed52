//! Vertical layering: horizontal cuts chosen by the layer optimizer, with
//! alignment pegs and sockets across each cut.

use cobuild_interface::{
    ag_locations, count_islands, interface_check, optimize, ray_grid, AgParameters,
    AlignmentSite, CutMetrics, GridSettings, LayerPlan, LayerSettings,
};
use cobuild_kernel_math::Point3;
use cobuild_kernel_mesh::{split, MeshRaycaster, Plane, TriangleMesh};

use crate::chunk::AlignmentFeature;
use crate::config::ChunkingConfig;
use crate::error::Result;
use crate::plan::ChunkPlan;
use crate::robot::{Robot, RobotParameters};
use crate::scaled::{ensure_solid, scaled_into, start_scaled, PlanBuilder};

/// Layer search settings with the feature size taken from `ag`.
pub fn layer_settings(config: &ChunkingConfig, ag: &AgParameters) -> LayerSettings {
    LayerSettings {
        min_feature_height: ag.min_height,
        fit_multiplier: ag.fit_multiplier,
        ..config.layers.clone()
    }
}

/// Island statistics at every candidate cut.
///
/// Candidates are visited bottom-up; each cut is sampled on the piece above
/// it with an upward ray grid and checked at the minimum feature radius.
pub fn vertical_layers(
    model: &TriangleMesh,
    settings: &LayerSettings,
    ag: &AgParameters,
) -> Result<Vec<CutMetrics>> {
    let bounds = model.bounds();
    let cuts = settings.candidate_cuts(bounds.height())?;
    let grid = GridSettings::with_density(ag.grid_density);

    let mut remaining = model.clone();
    let mut metrics = Vec::with_capacity(cuts.len());
    for cut in cuts {
        let z = bounds.min.z + cut;
        let (_, upper) = split(&remaining, &Plane::horizontal(z)).into_pair();
        remaining = upper;
        if remaining.is_empty() {
            metrics.push(CutMetrics {
                z: cut,
                islands: 0,
                islands_without_ag: 0,
            });
            continue;
        }
        let occupancy = ray_grid(&remaining, z, &grid, true)?;
        let coded = interface_check(&occupancy, ag.min_rad, ag);
        let islands = count_islands(&coded);
        tracing::debug!(
            z,
            islands = islands.island_count,
            without_ag = islands.islands_without_ag,
            "measured candidate cut"
        );
        metrics.push(CutMetrics {
            z: cut,
            islands: islands.island_count,
            islands_without_ag: islands.islands_without_ag,
        });
    }
    Ok(metrics)
}

/// Best layer plan for `model`.
pub fn plan_layers(
    model: &TriangleMesh,
    config: &ChunkingConfig,
    ag: &AgParameters,
) -> Result<LayerPlan> {
    ensure_solid(model)?;
    let settings = layer_settings(config, ag);
    let height = model.bounds().height();
    let metrics = vertical_layers(model, &settings, ag)?;
    let plan = optimize(height, &metrics, &settings)?;
    tracing::info!(
        candidates = metrics.len(),
        layers = plan.layer_count(),
        cuts = ?plan.cuts,
        "chose vertical layers"
    );
    Ok(plan)
}

/// Cut `model` into vertical layers, then chunk every layer with
/// [`start_scaled`].
///
/// Chunk numbers continue across layers and every chunk of a layer depends
/// on every chunk of the layer below. Models no taller than `max_reach_z`
/// are chunked without layering.
#[tracing::instrument(skip(model, robot, config, ag))]
pub fn start_scaled_layers(
    model: &TriangleMesh,
    robot: &RobotParameters,
    config: &ChunkingConfig,
    ag: &AgParameters,
    robots: usize,
) -> Result<ChunkPlan> {
    config.validate_for(robot, robots)?;
    ag.validate()?;
    ensure_solid(model)?;

    let bounds = model.bounds();
    if bounds.height() <= config.layers.max_reach_z {
        tracing::debug!(
            height = bounds.height(),
            max_reach_z = config.layers.max_reach_z,
            "model fits in one layer"
        );
        return start_scaled(model, robot, config, robots);
    }

    let plan = plan_layers(model, config, ag)?;
    let grid = GridSettings::with_density(ag.grid_density);

    let mut layers = Vec::with_capacity(plan.layer_count());
    let mut interfaces: Vec<(f64, Vec<AlignmentSite>)> = Vec::with_capacity(plan.cuts.len());
    let mut remaining = model.clone();
    for (j, cut) in plan.cuts.iter().enumerate() {
        let z = bounds.min.z + cut;
        let (lower, upper) = split(&remaining, &Plane::horizontal(z)).into_pair();
        let sites = if ag.enabled && !upper.is_empty() {
            ag_locations(&ray_grid(&upper, z, &grid, true)?, ag)
        } else {
            Vec::new()
        };
        if ag.enabled && sites.len() < ag.min_number {
            tracing::warn!(
                cut = j,
                z,
                sites = sites.len(),
                min_number = ag.min_number,
                "fewer alignment features than requested"
            );
        }
        layers.push(lower);
        interfaces.push((z, sites));
        remaining = upper;
    }
    layers.push(remaining);

    let mut builder = PlanBuilder::new(robot, config, robots);
    for (j, layer) in layers.iter().enumerate() {
        builder.begin_layer(j);
        if layer.is_empty() {
            tracing::warn!(layer = j, "vertical layer is empty");
            continue;
        }
        scaled_into(&mut builder, layer)?;
    }

    for (j, (z, sites)) in interfaces.iter().enumerate() {
        attach_features(&mut builder.robots, j, *z, sites, ag, grid.tolerance);
    }

    let mut tops: Vec<f64> = plan.cuts.iter().map(|c| bounds.min.z + c).collect();
    tops.push(bounds.max.z);
    builder.finish(tops)
}

/// Put a peg on the layer-`lower` chunk under each site and a socket on the
/// chunk above it.
fn attach_features(
    robots: &mut [Robot],
    lower: usize,
    z: f64,
    sites: &[AlignmentSite],
    ag: &AgParameters,
    tolerance: f64,
) {
    let cell = (ag.grid_density * 4.0).max(f64::EPSILON);
    let casters = |layer: usize| -> Vec<((usize, usize), MeshRaycaster)> {
        robots
            .iter()
            .enumerate()
            .flat_map(|(r, robot)| {
                robot.chunks.iter().enumerate().filter_map(move |(c, chunk)| {
                    (chunk.layer == layer)
                        .then(|| chunk.mesh())
                        .flatten()
                        .map(|mesh| ((r, c), MeshRaycaster::new(mesh, cell)))
                })
            })
            .collect()
    };
    let below = casters(lower);
    let above = casters(lower + 1);

    let touching = |casters: &[((usize, usize), MeshRaycaster)], x: f64, y: f64, upward: bool| {
        casters.iter().find_map(|(slot, caster)| {
            caster
                .cast_vertical(x, y, upward)
                .filter(|hit| (hit.point.z - z).abs() <= tolerance)
                .map(|_| *slot)
        })
    };

    let mut placed = 0usize;
    for site in sites {
        let center = Point3::new(site.x, site.y, z);
        // The lower chunk's top face is seen by a downward cast, the upper
        // chunk's bottom face by an upward one.
        if let Some((r, c)) = touching(&below, site.x, site.y, false) {
            robots[r].chunks[c]
                .alignment
                .push(AlignmentFeature::peg(center, site.radius, lower));
            placed += 1;
        }
        if let Some((r, c)) = touching(&above, site.x, site.y, true) {
            robots[r].chunks[c].alignment.push(AlignmentFeature::socket(
                center,
                site.radius,
                ag.fit_multiplier,
                lower,
            ));
        }
    }
    tracing::debug!(cut = lower, sites = sites.len(), pegs = placed, "attached alignment features");
}

#[cfg(test)]
mod tests {
    use super::*;
    use cobuild_kernel_mesh::shapes::cuboid;

    #[test]
    fn test_vertical_layers_on_block() {
        let model = cuboid(Point3::new(-10.0, -10.0, 0.0), Point3::new(10.0, 10.0, 30.0));
        let settings = LayerSettings::default();
        let ag = AgParameters::default();
        let metrics = vertical_layers(&model, &settings, &ag).unwrap();
        assert_eq!(metrics.len(), settings.candidate_count(30.0).unwrap());
        for m in &metrics {
            assert_eq!(m.islands, 1);
            assert_eq!(m.islands_without_ag, 0);
        }
    }

    #[test]
    fn test_layer_settings_follow_alignment_parameters() {
        let ag = AgParameters {
            min_height: 2.0,
            fit_multiplier: 1.3,
            ..AgParameters::default()
        };
        let s = layer_settings(&ChunkingConfig::z_reference(), &ag);
        assert_eq!(s.min_feature_height, 2.0);
        assert_eq!(s.fit_multiplier, 1.3);
        assert_eq!(s.max_reach_z, 20.0);
    }
}

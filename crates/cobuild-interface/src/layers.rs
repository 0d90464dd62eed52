//! Vertical layer optimizer.
//!
//! The model height is divided into `N` evenly spaced candidate cuts. A plan
//! activates a subset of them; it is feasible when every resulting layer is
//! at most `max_reach_z` thick. Among feasible plans the winner minimizes, in
//! order:
//!
//! 1. the sum over active cuts of `1 + islands`,
//! 2. the sum over active cuts of islands without alignment features,
//! 3. the total deviation of layer thicknesses from `H / (k + 1)`.

use serde::{Deserialize, Serialize};

use crate::error::LayerError;

/// Slack on the reach check and on deviation ties.
const EPS: f64 = 1e-9;

/// Island statistics measured at one candidate cut.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CutMetrics {
    /// Height of the cut.
    pub z: f64,
    /// Islands on the interface.
    pub islands: usize,
    /// Islands that cannot host an alignment feature.
    pub islands_without_ag: usize,
}

/// Inputs that fix the candidate cut set and the search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerSettings {
    /// Thickest printable layer.
    pub max_reach_z: f64,
    /// Smallest alignment feature height.
    pub min_feature_height: f64,
    /// Alignment fit multiplier.
    pub fit_multiplier: f64,
    /// Lower bound on the number of candidate cuts.
    pub vertical_check_density: usize,
    /// Largest candidate count searched exhaustively.
    pub max_bruteforce_cuts: usize,
}

impl Default for LayerSettings {
    fn default() -> Self {
        Self {
            max_reach_z: 20.0,
            min_feature_height: 0.75,
            fit_multiplier: 1.15,
            vertical_check_density: 5,
            max_bruteforce_cuts: 20,
        }
    }
}

impl LayerSettings {
    /// Number of candidate cuts for a model `height` tall.
    pub fn candidate_count(&self, height: f64) -> Result<usize, LayerError> {
        let usable = self.max_reach_z - self.min_feature_height * self.fit_multiplier;
        if !(usable > 0.0) {
            return Err(LayerError::InvalidParameters(format!(
                "max_reach_z {} leaves no room for a {} mm feature",
                self.max_reach_z,
                self.min_feature_height * self.fit_multiplier
            )));
        }
        if !(height >= 0.0) {
            return Err(LayerError::InvalidParameters(format!(
                "height must be non-negative, got {height}"
            )));
        }
        let needed = (height / usable).ceil() as usize;
        Ok(self.vertical_check_density.max(needed))
    }

    /// Candidate cut heights above the model bottom: `(j + 1) · H / (N + 1)`.
    pub fn candidate_cuts(&self, height: f64) -> Result<Vec<f64>, LayerError> {
        let n = self.candidate_count(height)?;
        let h = height / (n + 1) as f64;
        Ok((0..n).map(|j| (j + 1) as f64 * h).collect())
    }
}

/// Lexicographic plan cost.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayerScore {
    /// Sum of `1 + islands` over active cuts.
    pub chunk_islands: usize,
    /// Sum of islands without alignment features over active cuts.
    pub islands_without_ag: usize,
    /// Total `|t − H/(k+1)|` over layers.
    pub deviation: f64,
}

impl LayerScore {
    fn better_than(&self, other: &LayerScore) -> bool {
        (self.chunk_islands, self.islands_without_ag) < (other.chunk_islands, other.islands_without_ag)
            || ((self.chunk_islands, self.islands_without_ag)
                == (other.chunk_islands, other.islands_without_ag)
                && self.deviation < other.deviation - EPS)
    }
}

/// Chosen cuts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerPlan {
    /// Indices of the active candidate cuts, ascending.
    pub active: Vec<usize>,
    /// Heights of the active cuts above the model bottom.
    pub cuts: Vec<f64>,
    /// Cost of the plan.
    pub score: LayerScore,
}

impl LayerPlan {
    /// Number of layers the plan produces.
    pub fn layer_count(&self) -> usize {
        self.cuts.len() + 1
    }

    /// Thickness of each layer, bottom first.
    pub fn thicknesses(&self, height: f64) -> Vec<f64> {
        let mut bottom = 0.0;
        let mut out = Vec::with_capacity(self.cuts.len() + 1);
        for &c in &self.cuts {
            out.push(c - bottom);
            bottom = c;
        }
        out.push(height - bottom);
        out
    }
}

/// Pick the best plan, exhaustively when the candidate set is small.
pub fn optimize(
    height: f64,
    metrics: &[CutMetrics],
    settings: &LayerSettings,
) -> Result<LayerPlan, LayerError> {
    if metrics.len() <= settings.max_bruteforce_cuts {
        optimize_bruteforce(height, metrics, settings)
    } else {
        tracing::debug!(
            candidates = metrics.len(),
            limit = settings.max_bruteforce_cuts,
            "candidate set too large for exhaustive search, using dynamic programming"
        );
        optimize_dp(height, metrics, settings)
    }
}

/// Enumerate all `2^N` subsets of candidate cuts.
pub fn optimize_bruteforce(
    height: f64,
    metrics: &[CutMetrics],
    settings: &LayerSettings,
) -> Result<LayerPlan, LayerError> {
    let n = metrics.len();
    if n > settings.max_bruteforce_cuts || n >= usize::BITS as usize {
        return Err(LayerError::TooManyCandidates {
            candidates: n,
            limit: settings.max_bruteforce_cuts,
        });
    }

    let mut best: Option<LayerPlan> = None;
    for mask in 0usize..(1usize << n) {
        let active: Vec<usize> = (0..n).filter(|&j| mask & (1 << j) != 0).collect();
        let Some(score) = score(height, metrics, &active, settings.max_reach_z) else {
            continue;
        };
        if best.as_ref().map_or(true, |b| score.better_than(&b.score)) {
            best = Some(plan(metrics, active, score));
        }
    }

    let best = best.ok_or(LayerError::Infeasible {
        height,
        max_reach_z: settings.max_reach_z,
    })?;
    tracing::info!(
        candidates = n,
        cuts = best.cuts.len(),
        chunk_islands = best.score.chunk_islands,
        "chose vertical layers by exhaustive search"
    );
    Ok(best)
}

/// Dynamic program over (last active cut, number of cuts).
///
/// The deviation term depends on the final cut count `k`, so each `k` is
/// solved with its own target thickness and the best `k` wins.
pub fn optimize_dp(
    height: f64,
    metrics: &[CutMetrics],
    settings: &LayerSettings,
) -> Result<LayerPlan, LayerError> {
    let n = metrics.len();
    let reach = settings.max_reach_z + EPS;
    let mut best: Option<LayerPlan> = None;

    for k in 0..=n {
        if k == 0 {
            if let Some(score) = score(height, metrics, &[], settings.max_reach_z) {
                best = Some(plan(metrics, Vec::new(), score));
            }
            continue;
        }
        let target = height / (k + 1) as f64;
        let cost = |j: usize| (1 + metrics[j].islands, metrics[j].islands_without_ag);

        // table[c][j]: best partial score using c + 1 cuts, the last at j.
        let mut table: Vec<Vec<Option<(LayerScore, usize)>>> = vec![vec![None; n]; k];
        for j in 0..n {
            let t = metrics[j].z;
            if t <= reach {
                let (a, b) = cost(j);
                table[0][j] = Some((
                    LayerScore {
                        chunk_islands: a,
                        islands_without_ag: b,
                        deviation: (t - target).abs(),
                    },
                    usize::MAX,
                ));
            }
        }
        for c in 1..k {
            for j in 0..n {
                let mut cell: Option<(LayerScore, usize)> = None;
                for i in 0..j {
                    let Some((prev, _)) = table[c - 1][i] else {
                        continue;
                    };
                    let t = metrics[j].z - metrics[i].z;
                    if t > reach {
                        continue;
                    }
                    let (a, b) = cost(j);
                    let candidate = LayerScore {
                        chunk_islands: prev.chunk_islands + a,
                        islands_without_ag: prev.islands_without_ag + b,
                        deviation: prev.deviation + (t - target).abs(),
                    };
                    if cell.map_or(true, |(s, _)| candidate.better_than(&s)) {
                        cell = Some((candidate, i));
                    }
                }
                table[c][j] = cell;
            }
        }

        let mut finish: Option<(LayerScore, usize)> = None;
        for j in 0..n {
            let Some((partial, _)) = table[k - 1][j] else {
                continue;
            };
            let t = height - metrics[j].z;
            if t > reach {
                continue;
            }
            let total = LayerScore {
                deviation: partial.deviation + (t - target).abs(),
                ..partial
            };
            if finish.map_or(true, |(s, _)| total.better_than(&s)) {
                finish = Some((total, j));
            }
        }

        let Some((total, last)) = finish else {
            continue;
        };
        let mut active = vec![last];
        let mut c = k - 1;
        let mut j = last;
        while c > 0 {
            let Some((_, prev)) = table[c][j] else {
                break;
            };
            active.push(prev);
            j = prev;
            c -= 1;
        }
        active.reverse();

        if best.as_ref().map_or(true, |b| total.better_than(&b.score)) {
            best = Some(plan(metrics, active, total));
        }
    }

    let best = best.ok_or(LayerError::Infeasible {
        height,
        max_reach_z: settings.max_reach_z,
    })?;
    tracing::info!(
        candidates = n,
        cuts = best.cuts.len(),
        chunk_islands = best.score.chunk_islands,
        "chose vertical layers by dynamic programming"
    );
    Ok(best)
}

/// Cost of activating `active`, or `None` when some layer is out of reach.
fn score(height: f64, metrics: &[CutMetrics], active: &[usize], max_reach_z: f64) -> Option<LayerScore> {
    let target = height / (active.len() + 1) as f64;
    let mut bottom = 0.0;
    let mut deviation = 0.0;
    let mut chunk_islands = 0;
    let mut islands_without_ag = 0;

    for &j in active {
        let t = metrics[j].z - bottom;
        if t > max_reach_z + EPS {
            return None;
        }
        deviation += (t - target).abs();
        chunk_islands += 1 + metrics[j].islands;
        islands_without_ag += metrics[j].islands_without_ag;
        bottom = metrics[j].z;
    }
    let t = height - bottom;
    if t > max_reach_z + EPS {
        return None;
    }
    deviation += (t - target).abs();

    Some(LayerScore {
        chunk_islands,
        islands_without_ag,
        deviation,
    })
}

fn plan(metrics: &[CutMetrics], active: Vec<usize>, score: LayerScore) -> LayerPlan {
    let cuts = active.iter().map(|&j| metrics[j].z).collect();
    LayerPlan {
        active,
        cuts,
        score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn uniform(height: f64, n: usize, islands: impl Fn(usize) -> (usize, usize)) -> Vec<CutMetrics> {
        let h = height / (n + 1) as f64;
        (0..n)
            .map(|j| {
                let (i, w) = islands(j);
                CutMetrics {
                    z: (j + 1) as f64 * h,
                    islands: i,
                    islands_without_ag: w,
                }
            })
            .collect()
    }

    fn settings(max_reach_z: f64) -> LayerSettings {
        LayerSettings {
            max_reach_z,
            ..LayerSettings::default()
        }
    }

    #[test]
    fn test_candidate_count_floor_and_need() {
        let s = settings(20.0);
        assert_eq!(s.candidate_count(10.0).unwrap(), 5);
        // 100 / (20 - 0.8625) = 5.2 -> 6
        assert_eq!(s.candidate_count(100.0).unwrap(), 6);
        let cuts = s.candidate_cuts(60.0).unwrap();
        assert_eq!(cuts.len(), 5);
        assert_relative_eq!(cuts[0], 10.0);
        assert_relative_eq!(cuts[4], 50.0);
    }

    #[test]
    fn test_unusable_reach_rejected() {
        let s = settings(0.5);
        assert!(matches!(s.candidate_count(10.0), Err(LayerError::InvalidParameters(_))));
    }

    #[test]
    fn test_height_100_reach_40_needs_two_cuts() {
        let metrics = uniform(100.0, 9, |_| (1, 0));
        let plan = optimize(100.0, &metrics, &settings(40.0)).unwrap();
        assert!(plan.cuts.len() >= 2);
        for t in plan.thicknesses(100.0) {
            assert!(t <= 40.0 + 1e-9);
        }
        assert_eq!(plan.layer_count(), 3);
    }

    #[test]
    fn test_short_model_needs_no_cut() {
        let metrics = uniform(10.0, 5, |_| (1, 0));
        let plan = optimize_bruteforce(10.0, &metrics, &settings(20.0)).unwrap();
        assert!(plan.cuts.is_empty());
        assert_eq!(plan.score.chunk_islands, 0);
    }

    #[test]
    fn test_prefers_cuts_with_fewer_islands() {
        // Needs one cut; cut 1 has fewer islands than its neighbours.
        let metrics = uniform(30.0, 3, |j| if j == 1 { (1, 0) } else { (4, 0) });
        let plan = optimize_bruteforce(30.0, &metrics, &settings(20.0)).unwrap();
        assert_eq!(plan.active, vec![1]);
    }

    #[test]
    fn test_infeasible() {
        let metrics = uniform(100.0, 2, |_| (1, 0));
        assert!(matches!(
            optimize_bruteforce(100.0, &metrics, &settings(20.0)),
            Err(LayerError::Infeasible { .. })
        ));
        assert!(matches!(
            optimize_dp(100.0, &metrics, &settings(20.0)),
            Err(LayerError::Infeasible { .. })
        ));
    }

    #[test]
    fn test_bruteforce_refuses_large_sets() {
        let metrics = uniform(100.0, 25, |_| (1, 0));
        assert!(matches!(
            optimize_bruteforce(100.0, &metrics, &settings(20.0)),
            Err(LayerError::TooManyCandidates { candidates: 25, .. })
        ));
        // optimize falls back instead.
        assert!(optimize(100.0, &metrics, &settings(20.0)).is_ok());
    }

    #[test]
    fn test_dp_matches_bruteforce() {
        for n in 1..=10usize {
            for reach in [25.0, 40.0, 60.0] {
                let metrics = uniform(100.0, n, |j| ((j * 7 + n) % 4, (j * 3) % 2));
                let s = settings(reach);
                let brute = optimize_bruteforce(100.0, &metrics, &s);
                let dp = optimize_dp(100.0, &metrics, &s);
                match (brute, dp) {
                    (Ok(b), Ok(d)) => {
                        assert_eq!(b.score.chunk_islands, d.score.chunk_islands);
                        assert_eq!(b.score.islands_without_ag, d.score.islands_without_ag);
                        assert_relative_eq!(b.score.deviation, d.score.deviation, epsilon = 1e-6);
                    }
                    (Err(_), Err(_)) => {}
                    (b, d) => panic!("n={n} reach={reach}: brute {b:?} vs dp {d:?}"),
                }
            }
        }
    }
}

//! Terrain sampling contract and path height smoothing.

use towerline_core::constants::{HEIGHT_ANOMALY_THRESHOLD, MAX_GRADE};
use towerline_core::GeoPosition;

/// Ground elevation provider. Implemented by the terrain/rendering layer.
///
/// Returns `None` while terrain data is not loaded yet; callers fall back
/// to a baseline height.
pub trait TerrainSampler {
    fn sample_height(&self, lat: f64, lon: f64) -> Option<f64>;
}

impl<F> TerrainSampler for F
where
    F: Fn(f64, f64) -> Option<f64>,
{
    fn sample_height(&self, lat: f64, lon: f64) -> Option<f64> {
        self(lat, lon)
    }
}

/// Sampler for when no terrain is available. Every sample is null.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTerrain;

impl TerrainSampler for NoTerrain {
    fn sample_height(&self, _lat: f64, _lon: f64) -> Option<f64> {
        None
    }
}

/// Anomaly thresholds for [`smooth_path_heights`].
#[derive(Debug, Clone, Copy)]
pub struct SmoothingParams {
    /// Allowed deviation from the neighbor interpolation (height units).
    pub anomaly_threshold: f64,
    /// Rise over run above which a waypoint is steep toward a neighbor.
    pub max_grade: f64,
}

impl Default for SmoothingParams {
    fn default() -> Self {
        Self {
            anomaly_threshold: HEIGHT_ANOMALY_THRESHOLD,
            max_grade: MAX_GRADE,
        }
    }
}

fn grade(rise: f64, run: f64) -> f64 {
    if run > 0.0 {
        rise.abs() / run
    } else if rise == 0.0 {
        0.0
    } else {
        f64::INFINITY
    }
}

fn interpolate(h0: f64, h1: f64, d0: f64, d1: f64) -> f64 {
    let total = d0 + d1;
    if total > 0.0 {
        h0 + (h1 - h0) * d0 / total
    } else {
        (h0 + h1) / 2.0
    }
}

/// Height differences below this are not counted as a change.
const HEIGHT_EPSILON: f64 = 1e-9;

fn is_anomalous(heights: &[f64], spacing: &[f64], i: usize, params: &SmoothingParams) -> bool {
    let (d0, d1) = (spacing[i - 1], spacing[i]);
    let expected = interpolate(heights[i - 1], heights[i + 1], d0, d1);
    let deviates = (heights[i] - expected).abs() > params.anomaly_threshold;
    let steep = grade(heights[i] - heights[i - 1], d0) > params.max_grade
        && grade(heights[i] - heights[i + 1], d1) > params.max_grade;
    deviates || steep
}

/// Re-interpolate every run of flagged waypoints by ground distance between
/// the unflagged waypoints on either side.
fn fill_runs(original: &[f64], spacing: &[f64], flagged: &[bool]) -> Vec<f64> {
    let n = original.len();
    let mut filled = original.to_vec();
    let mut i = 1;
    while i < n - 1 {
        if !flagged[i] {
            i += 1;
            continue;
        }
        let left = i - 1;
        let mut right = i;
        while flagged[right] {
            right += 1;
        }

        let span: f64 = spacing[left..right].iter().sum();
        let mut walked = 0.0;
        for j in left + 1..right {
            walked += spacing[j - 1];
            let t = if span > 0.0 { walked / span } else { 0.5 };
            filled[j] = original[left] + (original[right] - original[left]) * t;
        }
        i = right;
    }
    filled
}

/// Replace height anomalies in a single sweep. Returns how many waypoints changed.
///
/// A waypoint is anomalous when its height deviates from the interpolation
/// between its immediate neighbors by more than the threshold, or when its
/// grade toward both neighbors exceeds `max_grade`. Detection reads the
/// pre-smoothing heights. Each run of consecutive anomalies is re-interpolated
/// by ground distance between the unflagged waypoints on either side.
///
/// Filling a run changes the neighbors of its anchors, which can make an
/// anchor anomalous in turn. Such anchors join the run and the fill is
/// redone from the original heights until every unflagged waypoint passes
/// against the filled profile. The result is a fixed point: running the
/// sweep again changes nothing. The first and last waypoints are never
/// modified.
pub fn smooth_path_heights(points: &mut [GeoPosition], params: SmoothingParams) -> usize {
    let n = points.len();
    if n < 3 {
        return 0;
    }

    let original: Vec<f64> = points.iter().map(|p| p.height).collect();
    let spacing: Vec<f64> = points
        .windows(2)
        .map(|pair| pair[0].haversine_to(&pair[1]))
        .collect();

    let mut flagged = vec![false; n];
    for i in 1..n - 1 {
        flagged[i] = is_anomalous(&original, &spacing, i, &params);
    }

    // Flags only grow, so this settles within n - 2 rounds.
    let filled = loop {
        let filled = fill_runs(&original, &spacing, &flagged);
        let grown: Vec<usize> = (1..n - 1)
            .filter(|&i| !flagged[i] && is_anomalous(&filled, &spacing, i, &params))
            .collect();
        if grown.is_empty() {
            break filled;
        }
        for i in grown {
            flagged[i] = true;
        }
    };

    let mut changed = 0;
    for (point, height) in points.iter_mut().zip(filled) {
        if (point.height - height).abs() > HEIGHT_EPSILON {
            point.height = height;
            changed += 1;
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Waypoints 10 m apart heading north from the equator.
    fn profile(heights: &[f64]) -> Vec<GeoPosition> {
        let step = 10.0 / 111_194.93;
        heights
            .iter()
            .enumerate()
            .map(|(i, &h)| GeoPosition::new(i as f64 * step, 0.0, h))
            .collect()
    }

    fn heights(points: &[GeoPosition]) -> Vec<f64> {
        points.iter().map(|p| p.height).collect()
    }

    fn assert_close(a: &[f64], b: &[f64]) {
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b) {
            assert!((x - y).abs() < 1e-6, "{a:?} vs {b:?}");
        }
    }

    #[test]
    fn test_flat_profile_unchanged() {
        let mut points = profile(&[5.0, 5.0, 5.0, 5.0]);
        assert_eq!(smooth_path_heights(&mut points, SmoothingParams::default()), 0);
        assert_close(&heights(&points), &[5.0, 5.0, 5.0, 5.0]);
    }

    #[test]
    fn test_single_spike_removed() {
        let mut points = profile(&[0.0, 0.0, 0.0, 50.0, 0.0, 0.0, 0.0]);
        let changed = smooth_path_heights(&mut points, SmoothingParams::default());
        assert!(changed >= 1);
        assert_close(&heights(&points), &[0.0; 7]);
    }

    #[test]
    fn test_endpoints_never_modified() {
        let mut points = profile(&[80.0, 0.0, 0.0, 0.0, -60.0]);
        smooth_path_heights(&mut points, SmoothingParams::default());
        assert_eq!(points[0].height, 80.0);
        assert_eq!(points[4].height, -60.0);
    }

    #[test]
    fn test_gentle_slope_kept() {
        // 2 m rise per 10 m = 20% grade, smooth.
        let original = [0.0, 2.0, 4.0, 6.0, 8.0];
        let mut points = profile(&original);
        assert_eq!(smooth_path_heights(&mut points, SmoothingParams::default()), 0);
        assert_close(&heights(&points), &original);
    }

    #[test]
    fn test_steep_notch_flagged_by_grade() {
        // 8 m dip over 10 m on both sides: under the deviation threshold but 80% grade.
        let mut points = profile(&[0.0, 0.0, -8.0, 0.0, 0.0]);
        let changed = smooth_path_heights(&mut points, SmoothingParams::default());
        assert_eq!(changed, 1);
        assert_close(&heights(&points), &[0.0; 5]);
    }

    #[test]
    fn test_double_spike_interpolates_between_anchors() {
        let mut points = profile(&[0.0, 100.0, 100.0, 20.0]);
        smooth_path_heights(&mut points, SmoothingParams::default());
        let h = heights(&points);
        assert_eq!(h[0], 0.0);
        assert_eq!(h[3], 20.0);
        assert!(h[1] < h[2] && h[2] < h[3], "ramp expected: {h:?}");
    }

    #[test]
    fn test_second_sweep_is_stable() {
        let inputs: [&[f64]; 5] = [
            &[0.0, 0.0, 0.0, 50.0, 0.0, 0.0, 0.0],
            &[0.0, 100.0, 100.0, 0.0],
            &[10.0, 12.0, 40.0, 14.0, 16.0, -30.0, 18.0, 20.0],
            &[0.0, 1.0, 2.0, 3.0, 25.0, 5.0],
            &[12.0, -14.0, -10.0, 13.0, 5.0, 3.0],
        ];
        for input in inputs {
            let mut points = profile(input);
            smooth_path_heights(&mut points, SmoothingParams::default());
            let once = heights(&points);
            assert_eq!(
                smooth_path_heights(&mut points, SmoothingParams::default()),
                0,
                "second sweep reports changes for {input:?}"
            );
            assert_close(&heights(&points), &once);
        }
    }

    #[test]
    fn test_anchor_made_steep_by_fill_joins_run() {
        // Filling [1, 2] between 12 and 13 leaves -10 steep against the
        // filled values, so the whole middle ramps from 12 down to 5.
        let mut points = profile(&[12.0, -14.0, -10.0, 13.0, 5.0, 3.0]);
        let changed = smooth_path_heights(&mut points, SmoothingParams::default());
        assert_eq!(changed, 3);
        assert_close(&heights(&points), &[12.0, 10.25, 8.5, 6.75, 5.0, 3.0]);
    }

    #[test]
    fn test_short_paths_untouched() {
        let mut points = profile(&[0.0, 100.0]);
        assert_eq!(smooth_path_heights(&mut points, SmoothingParams::default()), 0);
        assert_eq!(points[1].height, 100.0);
    }

    #[test]
    fn test_closure_sampler() {
        let sampler = |lat: f64, _lon: f64| if lat > 0.0 { Some(12.0) } else { None };
        assert_eq!(sampler.sample_height(1.0, 0.0), Some(12.0));
        assert_eq!(sampler.sample_height(-1.0, 0.0), None);
        assert_eq!(NoTerrain.sample_height(0.0, 0.0), None);
    }
}

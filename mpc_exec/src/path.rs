//! # Reference path
//!
//! This module owns the circular reference path the vehicle is tracking and
//! provides the nearest-point search and window extraction used to localise
//! the vehicle on it. All wrapping of indices onto the path happens here, no
//! other module performs modular index arithmetic.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Vector2;

// Internal
use comms_if::sense::PathMsg;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The reference path the vehicle is tracking.
///
/// Points are ordered and the path is treated as a closed loop, so any index
/// (including negative ones) wraps onto the path's length. A path always
/// contains at least one point.
#[derive(Clone, Debug)]
pub struct RefPath {
    points_m: Vec<Vector2<f64>>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl RefPath {
    /// Build a path from a feed message, or `None` if the message carries no
    /// points.
    pub fn from_msg(msg: &PathMsg) -> Option<Self> {
        Self::from_points(
            msg.points_m
                .iter()
                .map(|p| Vector2::new(p[0], p[1]))
                .collect(),
        )
    }

    /// Build a path from a point sequence, or `None` if the sequence is
    /// empty.
    pub fn from_points(points_m: Vec<Vector2<f64>>) -> Option<Self> {
        if points_m.is_empty() {
            None
        } else {
            Some(Self { points_m })
        }
    }

    /// Get the number of points in the path.
    pub fn num_points(&self) -> usize {
        self.points_m.len()
    }

    /// Get the point at the given index, wrapping circularly.
    ///
    /// Negative indices wrap backwards from the end of the path.
    pub fn get_cyclic(&self, index: isize) -> Vector2<f64> {
        self.points_m[self.wrap(index)]
    }

    /// Find the index of the path point closest to the given position.
    ///
    /// Every point is scanned and the minimum squared distance wins. The
    /// comparison is a strict less-than, so ties resolve to the lowest index.
    pub fn find_closest(&self, position_m: &Vector2<f64>) -> usize {
        let mut closest_idx = 0;
        let mut closest_dist_sq = f64::INFINITY;

        for (i, point) in self.points_m.iter().enumerate() {
            let dist_sq = (point - position_m).norm_squared();
            if dist_sq < closest_dist_sq {
                closest_idx = i;
                closest_dist_sq = dist_sq;
            }
        }

        closest_idx
    }

    /// Extract an ordered window of points from the path.
    ///
    /// The window starts `back_offset` points before `start_idx` (biasing the
    /// window behind the vehicle improves the conditioning of the downstream
    /// fit) and collects `num_points` points separated by `stride`, wrapping
    /// circularly. Windows longer than the path revisit points.
    pub fn extract_window(
        &self,
        start_idx: usize,
        back_offset: usize,
        num_points: usize,
        stride: usize,
    ) -> Vec<Vector2<f64>> {
        let start = start_idx as isize - back_offset as isize;

        (0..num_points)
            .map(|k| self.get_cyclic(start + (k * stride) as isize))
            .collect()
    }

    /// Wrap an index onto the path's length.
    fn wrap(&self, index: isize) -> usize {
        index.rem_euclid(self.points_m.len() as isize) as usize
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn zigzag_path() -> RefPath {
        RefPath::from_points(vec![
            Vector2::new(0.0, 0.0),
            Vector2::new(1.0, 1.0),
            Vector2::new(2.0, -1.0),
            Vector2::new(3.0, 0.5),
            Vector2::new(4.0, 0.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_empty_path_rejected() {
        assert!(RefPath::from_points(Vec::new()).is_none());
    }

    #[test]
    fn test_find_closest_is_minimal() {
        let path = zigzag_path();
        let query = Vector2::new(2.2, -0.5);

        let closest = path.find_closest(&query);
        let closest_dist_sq = (path.get_cyclic(closest as isize) - query).norm_squared();

        // No other point may be strictly closer
        for i in 0..path.num_points() {
            let dist_sq = (path.get_cyclic(i as isize) - query).norm_squared();
            assert!(dist_sq >= closest_dist_sq);
        }
    }

    #[test]
    fn test_find_closest_tie_takes_lowest_index() {
        // Two points equidistant from the query, the lower index must win
        let path = RefPath::from_points(vec![
            Vector2::new(5.0, 5.0),
            Vector2::new(1.0, 0.0),
            Vector2::new(-1.0, 0.0),
        ])
        .unwrap();

        assert_eq!(path.find_closest(&Vector2::new(0.0, 0.0)), 1);

        // A path of identical points resolves to index 0
        let path = RefPath::from_points(vec![
            Vector2::new(2.0, 2.0),
            Vector2::new(2.0, 2.0),
            Vector2::new(2.0, 2.0),
        ])
        .unwrap();

        assert_eq!(path.find_closest(&Vector2::new(0.0, 0.0)), 0);
    }

    #[test]
    fn test_window_index_congruence() {
        let path = zigzag_path();

        let closest = 2;
        let back_offset = 4;
        let num_points = 8;
        let stride = 3;

        let window = path.extract_window(closest, back_offset, num_points, stride);
        assert_eq!(window.len(), num_points);

        // Every window point must equal the point at
        // (closest - back_offset + k * stride) mod len, even though the path
        // is shorter than the window
        let len = path.num_points() as isize;
        for (k, point) in window.iter().enumerate() {
            let expected_idx =
                (closest as isize - back_offset as isize + (k * stride) as isize).rem_euclid(len);
            assert_eq!(*point, path.get_cyclic(expected_idx));
        }
    }

    #[test]
    fn test_get_cyclic_wraps_negative_indices() {
        let path = zigzag_path();

        assert_eq!(path.get_cyclic(-1), Vector2::new(4.0, 0.0));
        assert_eq!(path.get_cyclic(-5), Vector2::new(0.0, 0.0));
        assert_eq!(path.get_cyclic(7), Vector2::new(2.0, -1.0));
    }
}

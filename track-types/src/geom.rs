//! Flat-earth geometry helpers shared by the tracker and anomaly engine
//! (§9: "Centroids are in a local flat-earth projection where (x,y) are
//! meters").

use nalgebra::Point2;

/// Euclidean distance between two centroids, in meters.
pub fn euclidean_dist(a: Point2<f64>, b: Point2<f64>) -> f64 {
    (a - b).norm()
}

/// Bearing from `a` to `b`, `atan2(dy, dx)` converted to degrees in
/// `[0, 360)` (§9).
pub fn bearing_degrees(a: Point2<f64>, b: Point2<f64>) -> f64 {
    let dy = b.y - a.y;
    let dx = b.x - a.x;
    let deg = dy.atan2(dx).to_degrees();
    if deg < 0.0 {
        deg + 360.0
    } else {
        deg
    }
}

/// Chebyshev-per-axis containment test used by the anomaly engine (§4.7,
/// §9 open question): both axis deltas strictly less than `radius_m`.
pub fn within_chebyshev_radius(a: Point2<f64>, b: Point2<f64>, radius_m: f64) -> bool {
    (a.x - b.x).abs() < radius_m && (a.y - b.y).abs() < radius_m
}

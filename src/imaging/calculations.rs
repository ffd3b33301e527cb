//! Pure calculation functions for image dimensions and shrink scales.
//!
//! All functions here are pure and testable without any I/O or images.

/// Calculate the dimensions that fit `source` inside a `max_dimension` box.
///
/// Preserves aspect ratio and never upscales: images whose longer edge is
/// already within the limit come back unchanged.
///
/// # Examples
/// ```
/// # use wikigal::imaging::fit_within;
/// // 2000x1500 landscape into a 1024 box → 1024x768
/// assert_eq!(fit_within((2000, 1500), 1024), (1024, 768));
///
/// // Already small enough → untouched
/// assert_eq!(fit_within((640, 480), 1024), (640, 480));
/// ```
pub fn fit_within(source: (u32, u32), max_dimension: u32) -> (u32, u32) {
    let (w, h) = source;
    let longer_edge = w.max(h);

    if longer_edge <= max_dimension {
        return (w, h);
    }

    let ratio = max_dimension as f64 / longer_edge as f64;
    if w >= h {
        // Landscape or square: width pins to the limit
        (max_dimension, scale_edge(h, ratio))
    } else {
        (scale_edge(w, ratio), max_dimension)
    }
}

/// Dimensions of `base` multiplied by `scale`, at least 1x1.
pub fn scaled_dimensions(base: (u32, u32), scale: f64) -> (u32, u32) {
    (scale_edge(base.0, scale), scale_edge(base.1, scale))
}

fn scale_edge(edge: u32, ratio: f64) -> u32 {
    ((edge as f64 * ratio).round() as u32).max(1)
}

/// Number of shrink steps available before the scale would drop below
/// `min_scale`.
///
/// With `step = 0.1` and `min_scale = 0.2` this is 8: the schedule runs
/// 0.9, 0.8, … 0.2. A small tolerance absorbs float representation error
/// so the boundary itself stays reachable.
pub fn max_shrink_steps(min_scale: f64, step: f64) -> u32 {
    if step <= 0.0 || min_scale >= 1.0 {
        return 0;
    }
    ((1.0 - min_scale) / step + 1e-9).floor().max(0.0) as u32
}

/// Cumulative scale after `steps` decrements of `step`, starting from 1.0.
///
/// Computed from the integer step count rather than by repeated subtraction.
/// Values within float error of `min_scale` snap to it, so the last step of
/// the schedule reports exactly the minimum.
pub fn cumulative_scale(steps: u32, step: f64, min_scale: f64) -> f64 {
    let scale = 1.0 - steps as f64 * step;
    if scale - min_scale < 1e-9 {
        min_scale
    } else {
        scale
    }
}

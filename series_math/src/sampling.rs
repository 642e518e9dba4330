//! Even-index downsampling for bounded payloads

/// Indices `round(linspace(0, n - 1, max_points))`, or all of `0..n` when
/// `n <= max_points`.
pub fn downsample_indices(n: usize, max_points: usize) -> Vec<usize> {
    if n <= max_points {
        return (0..n).collect();
    }
    if max_points == 0 {
        return Vec::new();
    }
    if max_points == 1 {
        return vec![0];
    }

    let step = (n - 1) as f64 / (max_points - 1) as f64;
    (0..max_points)
        .map(|i| ((i as f64 * step).round() as usize).min(n - 1))
        .collect()
}

/// Pick evenly spaced elements, always keeping the first and last
pub fn downsample<T: Clone>(items: &[T], max_points: usize) -> Vec<T> {
    downsample_indices(items.len(), max_points)
        .into_iter()
        .map(|i| items[i].clone())
        .collect()
}

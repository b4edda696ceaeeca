use crate::shared::plane::Plane;

/// Number of axes a plane stack spans: x, y and the slice position.
const DIM: usize = 3;

/// Statistical signature of a plane stack.
///
/// Layout: `[mean, x̄, ȳ, s̄, spread, σx, σy, σs]` — the overall intensity
/// mean and spread, then the intensity-weighted mean position and its
/// spread per axis. Lossy codecs perturb individual bytes; these moments
/// stay put, which makes the signature a cheap equivalence check for
/// round trips. Multi-channel planes contribute their per-pixel channel
/// mean.
pub fn signature(planes: &[Plane]) -> Vec<f64> {
    let mut result = vec![0.0; (DIM + 1) * 2];
    let Some(first) = planes.first() else {
        return result;
    };
    let (width, height) = (first.width(), first.height());

    for (slice, plane) in planes.iter().enumerate() {
        for y in 0..height {
            for x in 0..width {
                let mut value = 0.0;
                for c in 0..plane.channels() {
                    value += plane.sample(x, y, c);
                }
                let value = value / plane.channels() as f64;

                let pos = [x as f64, y as f64, slice as f64];
                result[0] += value;
                result[DIM + 1] += value * value;
                for i in 0..DIM {
                    result[i + 1] += value * pos[i];
                    result[i + 1 + DIM + 1] += value * pos[i] * pos[i];
                }
            }
        }
    }

    if result[0] != 0.0 {
        for i in 1..DIM + 1 {
            result[i] /= result[0];
            result[i + DIM + 1] =
                (result[i + DIM + 1] / result[0] - result[i] * result[i]).max(0.0).sqrt();
        }
    }

    let total = width as f64 * height as f64 * planes.len() as f64;
    result[0] /= total;
    result[DIM + 1] = (result[DIM + 1] / total - result[0] * result[0]).max(0.0).sqrt();

    result
}

/// Whether two signatures agree component-wise within `tolerance`.
pub fn matches(a: &[f64], b: &[f64], tolerance: f64) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b.iter())
            .all(|(x, y)| (x - y).abs() <= tolerance)
}

/// Whether two plane stacks carry statistically equivalent content.
pub fn planes_match(a: &[Plane], b: &[Plane], tolerance: f64) -> bool {
    matches(&signature(a), &signature(b), tolerance)
}

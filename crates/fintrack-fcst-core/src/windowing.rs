//! Sliding-window construction of supervised training samples.

/// Window width used by the sequence model.
pub const SEQUENCE_WINDOW: usize = 3;

/// One supervised sample: `width` consecutive values and the value that
/// followed them.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowedSample {
    pub input: Vec<f64>,
    pub target: f64,
}

/// Slide a window of `width` across `values`, pairing each window with its
/// successor value.
///
/// Produces exactly `len - width` samples, or none when `len <= width` or
/// `width == 0`. With `width == 1` this degenerates to the one-step pairs
/// the simple model trains on.
pub fn sliding_windows(values: &[f64], width: usize) -> Vec<WindowedSample> {
    if width == 0 || values.len() <= width {
        return Vec::new();
    }

    values
        .windows(width + 1)
        .map(|w| WindowedSample {
            input: w[..width].to_vec(),
            target: w[width],
        })
        .collect()
}

use fxhash::hash64;

/// Deterministic stand-in for a real model, used by [`EncoderMode::Fast`](crate::EncoderMode::Fast).
/// Generates sinusoid values derived from a hash of the input text, so equal text always maps to
/// the same vector and the run needs no model files.
pub(crate) fn make_stub_vector(text: &str, dim: usize) -> Vec<f32> {
    let h = hash64(text.as_bytes());
    (0..dim)
        .map(|idx| ((h >> (idx % 32)) as f32 * 0.0001 + idx as f32).sin())
        .collect()
}

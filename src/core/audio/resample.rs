//! Linear-interpolation sample rate conversion.

/// Resample mono float audio from `from_rate` to `to_rate`.
///
/// Output length is `round(len * to_rate / from_rate)`. Each output sample
/// interpolates linearly between the two nearest source samples and is
/// clamped to `[-1.0, 1.0]`. Equal rates return the input untouched.
pub fn resample(samples: Vec<f32>, from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() || from_rate == 0 || to_rate == 0 {
        return samples;
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let out_len = (samples.len() as f64 * to_rate as f64 / from_rate as f64).round() as usize;
    let last = samples.len() - 1;

    (0..out_len)
        .map(|i| {
            let pos = i as f64 * ratio;
            let x0 = (pos.floor() as usize).min(last);
            let x1 = (x0 + 1).min(last);
            let frac = (pos - x0 as f64) as f32;
            let value = samples[x0] + (samples[x1] - samples[x0]) * frac;
            value.clamp(-1.0, 1.0)
        })
        .collect()
}

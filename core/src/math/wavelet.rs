use std::f64::consts::PI;

/// Ricker (Mexican hat) wavelet with peak frequency `frequency` evaluated at lag `tau` seconds.
pub fn ricker(tau: f64, frequency: f64) -> f64 {
    let arg = (PI * frequency * tau).powi(2);
    (1.0 - 2.0 * arg) * (-arg).exp()
}

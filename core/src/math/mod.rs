pub mod fft;
pub mod geo;
pub mod stats;
pub mod wavelet;

pub use fft::FftHelper;
pub use geo::haversine_km;
pub use stats::StatsHelper;
pub use wavelet::ricker;

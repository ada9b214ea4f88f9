//! Modelo barométrico de altitude
//!
//! `h = 44330 · (1 − (p / p₀)^(1/5.255))`
//!
//! Pressões acima da referência produzem altitude negativa, o que é válido.

/// Pressão de referência padrão ISA (hPa)
pub const STANDARD_SEA_LEVEL_HPA: f32 = 1013.25;

const SCALE_M: f64 = 44330.0;
const EXPONENT: f64 = 1.0 / 5.255;

/// Altitude em metros para `pressure_hpa` relativa a `sea_level_hpa`.
///
/// Ambos devem ser positivos; use [`checked_altitude`] para dados de sensor.
pub fn altitude(pressure_hpa: f32, sea_level_hpa: f32) -> f32 {
    let ratio = f64::from(pressure_hpa) / f64::from(sea_level_hpa);
    (SCALE_M * (1.0 - ratio.powf(EXPONENT))) as f32
}

/// Como [`altitude`], mas `None` para entradas não positivas ou não finitas
pub fn checked_altitude(pressure_hpa: f32, sea_level_hpa: f32) -> Option<f32> {
    let valid = |v: f32| v.is_finite() && v > 0.0;
    if valid(pressure_hpa) && valid(sea_level_hpa) {
        Some(altitude(pressure_hpa, sea_level_hpa))
    } else {
        None
    }
}

//! # Calculadora de Métricas Derivadas
//! src/metrics/calculator.rs
//!
//! Fórmulas de delta entre dos muestras. Son funciones puras sobre slices
//! de muestras para poder verificarlas con secuencias sintéticas.
//!
//! ```text
//! promedio = (value₂ − value₁) / (base₂ − base₁)
//! rate/s   = (value₂ − value₁) / (t₂ − t₁)          t en segundos
//! lifetime = numerador_total / denominador_total
//! ```
//!
//! Un denominador (o delta de tiempo) igual a cero produce `0.0`, salvo en
//! `lifetime_average` que retorna `None` para que el caller decida.

use super::sample::Sample;

const NANOS_PER_SEC: f64 = 1_000_000_000.0;

/// Promedio entre dos muestras: Δvalue / Δbase
pub fn average_between(first: &Sample, second: &Sample) -> f64 {
    let delta_base = i128::from(second.base) - i128::from(first.base);
    if delta_base == 0 {
        return 0.0;
    }
    let delta_value = i128::from(second.value) - i128::from(first.value);
    delta_value as f64 / delta_base as f64
}

/// Rate por segundo entre dos muestras: Δvalue / Δt
pub fn rate_between(first: &Sample, second: &Sample) -> f64 {
    let delta_nanos = i128::from(second.timestamp_nanos) - i128::from(first.timestamp_nanos);
    if delta_nanos == 0 {
        return 0.0;
    }
    let delta_value = i128::from(second.value) - i128::from(first.value);
    delta_value as f64 / (delta_nanos as f64 / NANOS_PER_SEC)
}

/// Promedio de toda la vida: `None` si el denominador es cero
pub fn lifetime_average(numerator: u64, denominator: u64) -> Option<f64> {
    if denominator == 0 {
        None
    } else {
        Some(numerator as f64 / denominator as f64)
    }
}

/// Promedio desde la última muestra
///
/// - 0 muestras: 0
/// - 1 muestra: `lifetime` (0 si es `None`)
/// - 2+: delta entre las dos últimas
pub fn current_average(samples: &[Sample], lifetime: Option<f64>) -> f64 {
    match samples {
        [] => 0.0,
        [_] => lifetime.unwrap_or(0.0),
        [.., first, second] => average_between(first, second),
    }
}

/// Rate por segundo entre las dos últimas muestras; 0 con menos de dos
pub fn current_rate(samples: &[Sample]) -> f64 {
    match samples {
        [.., first, second] => rate_between(first, second),
        _ => 0.0,
    }
}

/// Promedio entre dos muestras arbitrarias (no necesariamente adyacentes)
///
/// Los índices se recortan a `[0, len-1]` sin error. Con 0 muestras retorna
/// 0 y con 1 muestra el promedio de toda la vida.
pub fn interval_average(samples: &[Sample], from: i64, to: i64, lifetime: Option<f64>) -> f64 {
    match samples.len() {
        0 => 0.0,
        1 => lifetime.unwrap_or(0.0),
        len => {
            let from = clamp_index(from, len);
            let to = clamp_index(to, len);
            average_between(&samples[from], &samples[to])
        }
    }
}

/// Recorta un índice con signo al rango válido de un slice no vacío
pub fn clamp_index(index: i64, len: usize) -> usize {
    let last = len.saturating_sub(1);
    if index <= 0 {
        0
    } else {
        usize::try_from(index).map_or(last, |i| i.min(last))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn avg(value: u64, base: u64) -> Sample {
        Sample::new(value, base, 0)
    }

    fn at(value: u64, secs: f64) -> Sample {
        Sample::new(value, 0, (secs * NANOS_PER_SEC) as u64)
    }

    #[test]
    fn test_average_between() {
        assert_eq!(average_between(&avg(60, 3), &avg(160, 4)), 100.0);
        assert_eq!(average_between(&avg(10, 1), &avg(30, 3)), 10.0);
    }

    #[test]
    fn test_average_between_zero_denominator() {
        assert_eq!(average_between(&avg(10, 2), &avg(50, 2)), 0.0);
    }

    #[test]
    fn test_average_between_reversed_window() {
        // from > to: los deltas negativos se cancelan
        assert_eq!(average_between(&avg(160, 4), &avg(60, 3)), 100.0);
    }

    #[test]
    fn test_rate_between() {
        assert_eq!(rate_between(&at(10, 1.0), &at(30, 3.0)), 10.0);
        assert_eq!(rate_between(&at(0, 0.0), &at(5, 0.5)), 10.0);
    }

    #[test]
    fn test_rate_between_same_timestamp() {
        assert_eq!(rate_between(&at(1, 2.0), &at(2, 2.0)), 0.0);
    }

    #[test]
    fn test_lifetime_average() {
        assert_eq!(lifetime_average(60, 3), Some(20.0));
        assert_eq!(lifetime_average(160, 4), Some(40.0));
        assert_eq!(lifetime_average(5, 2), Some(2.5));
        assert_eq!(lifetime_average(10, 0), None);
    }

    #[test]
    fn test_current_average_sample_counts() {
        assert_eq!(current_average(&[], Some(7.0)), 0.0);
        assert_eq!(current_average(&[avg(7, 1)], Some(7.0)), 7.0);
        assert_eq!(current_average(&[avg(7, 1)], None), 0.0);
    }

    #[test]
    fn test_current_average_matches_direct_recomputation() {
        let sizes = [10u64, 20, 30, 100, 5, 45];
        let mut samples = Vec::new();
        let mut total = 0;
        for (i, size) in sizes.iter().enumerate() {
            total += size;
            samples.push(avg(total, i as u64 + 1));

            let expected = if samples.len() < 2 {
                total as f64
            } else {
                *size as f64
            };
            let lifetime = lifetime_average(total, i as u64 + 1);
            assert_eq!(current_average(&samples, lifetime), expected);
        }
    }

    #[test]
    fn test_current_rate() {
        assert_eq!(current_rate(&[]), 0.0);
        assert_eq!(current_rate(&[at(1, 1.0)]), 0.0);

        let samples = [at(1, 0.0), at(2, 0.25), at(3, 0.5), at(9, 1.5)];
        assert_eq!(current_rate(&samples), 6.0);
    }

    #[test]
    fn test_interval_average() {
        // POSTs de 10, 20, 30, 100 bytes
        let samples = [avg(10, 1), avg(30, 2), avg(60, 3), avg(160, 4)];
        let lifetime = lifetime_average(160, 4);

        assert_eq!(interval_average(&samples, 0, 3, lifetime), 50.0);
        assert_eq!(interval_average(&samples, 1, 2, lifetime), 30.0);
        assert_eq!(interval_average(&samples, 2, 3, lifetime), 100.0);
    }

    #[test]
    fn test_interval_average_clamps_out_of_range() {
        let samples = [avg(10, 1), avg(30, 2), avg(60, 3), avg(160, 4)];
        let lifetime = lifetime_average(160, 4);

        let direct = average_between(&samples[0], &samples[3]);
        assert_eq!(interval_average(&samples, -5, 99, lifetime), direct);
        assert_eq!(interval_average(&samples, i64::MIN, i64::MAX, lifetime), direct);
        // Mismo índice en ambos extremos: delta cero
        assert_eq!(interval_average(&samples, 7, 8, lifetime), 0.0);
    }

    #[test]
    fn test_interval_average_small_histories() {
        assert_eq!(interval_average(&[], 0, 1, Some(3.0)), 0.0);
        assert_eq!(interval_average(&[avg(3, 1)], 0, 1, Some(3.0)), 3.0);
    }

    #[test]
    fn test_clamp_index() {
        assert_eq!(clamp_index(-1, 4), 0);
        assert_eq!(clamp_index(0, 4), 0);
        assert_eq!(clamp_index(2, 4), 2);
        assert_eq!(clamp_index(4, 4), 3);
        assert_eq!(clamp_index(i64::MAX, 4), 3);
    }
}

//! # Muestras e Historiales
//! src/metrics/sample.rs
//!
//! Una muestra es un snapshot inmutable de uno o dos contadores con su
//! timestamp monotónico. Cada métrica derivada tiene su propio historial,
//! que solo crece (nunca se trunca).
//!
//! Los threads lectores de conexiones escriben en paralelo; `push_with`
//! construye la muestra con el write lock tomado, así el orden de las
//! muestras coincide con el orden de los contadores que capturan. Los
//! lectores de métricas toman el read lock, calculan sobre el slice que ven
//! en ese momento y nunca guardan la longitud entre llamadas.

use std::sync::{PoisonError, RwLock};
use std::time::Instant;

use serde::Serialize;

/// Snapshot de contadores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Sample {
    /// Numerador (bytes acumulados) o valor del contador
    pub value: u64,
    /// Denominador (cantidad de POSTs); 0 en historiales de rate
    pub base: u64,
    /// Nanosegundos desde el epoch del reloj del store
    pub timestamp_nanos: u64,
}

impl Sample {
    pub fn new(value: u64, base: u64, timestamp_nanos: u64) -> Self {
        Self {
            value,
            base,
            timestamp_nanos,
        }
    }
}

/// Reloj monotónico de alta resolución
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    epoch: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }

    /// Nanosegundos transcurridos desde la creación del reloj
    pub fn now_nanos(&self) -> u64 {
        u64::try_from(self.epoch.elapsed().as_nanos()).unwrap_or(u64::MAX)
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Historial append-only de muestras
#[derive(Debug, Default)]
pub struct SampleHistory {
    samples: RwLock<Vec<Sample>>,
}

impl SampleHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, sample: Sample) {
        self.samples
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(sample);
    }

    /// Agrega la muestra que construye `make` sin soltar el lock
    pub fn push_with(&self, make: impl FnOnce() -> Sample) {
        let mut samples = self.samples.write().unwrap_or_else(PoisonError::into_inner);
        let sample = make();
        samples.push(sample);
    }

    pub fn len(&self) -> usize {
        self.read(|samples| samples.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn last(&self) -> Option<Sample> {
        self.read(|samples| samples.last().copied())
    }

    /// Ejecuta `f` sobre las muestras visibles en este momento
    pub fn read<T>(&self, f: impl FnOnce(&[Sample]) -> T) -> T {
        let samples = self.samples.read().unwrap_or_else(PoisonError::into_inner);
        f(&samples)
    }

    /// Copia completa del historial (para inspección y tests)
    pub fn to_vec(&self) -> Vec<Sample> {
        self.read(|samples| samples.to_vec())
    }
}

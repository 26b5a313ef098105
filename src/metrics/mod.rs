//! # Sistema de Métricas
//! src/metrics/mod.rs
//!
//! Contadores crudos y métricas derivadas:
//! - Requests exitosos / fallidos
//! - GETs y POSTs recibidos
//! - Tamaño promedio de payload POST (última muestra, toda la vida, intervalo)
//! - Requests por segundo

pub mod calculator;
pub mod collector;
pub mod counters;
pub mod sample;

pub use collector::{MetricsCollector, MetricsSnapshot};
pub use counters::{Counter, CounterKind, CounterSet};
pub use sample::{MonotonicClock, Sample, SampleHistory};

//! # Contadores Crudos
//! src/metrics/counters.rs
//!
//! Enteros no negativos actualizados atómicamente. Son monótonos salvo por
//! el reset a cero que hace `Server::start`.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifica cada contador crudo del servidor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CounterKind {
    /// Requests despachados con éxito (ruta o archivo estático)
    Success,
    /// Requests que terminaron en 404 o 500
    Failure,
    /// GETs recibidos y parseados
    GetRequests,
    /// POSTs recibidos y parseados
    PostRequests,
    /// Suma de `Content-Length` de los POSTs (numerador del promedio)
    PostBytes,
    /// POSTs contabilizados para el promedio (denominador)
    PostBase,
    /// Requests encolados (base del rate por segundo)
    Requests,
}

impl CounterKind {
    pub const ALL: [CounterKind; 7] = [
        CounterKind::Success,
        CounterKind::Failure,
        CounterKind::GetRequests,
        CounterKind::PostRequests,
        CounterKind::PostBytes,
        CounterKind::PostBase,
        CounterKind::Requests,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CounterKind::Success => "success",
            CounterKind::Failure => "failure",
            CounterKind::GetRequests => "get_requests",
            CounterKind::PostRequests => "post_requests",
            CounterKind::PostBytes => "post_bytes",
            CounterKind::PostBase => "post_base",
            CounterKind::Requests => "requests",
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for CounterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Un contador atómico
#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Incrementa en 1 y retorna el valor nuevo
    pub fn increment(&self) -> u64 {
        self.increment_by(1)
    }

    /// Incrementa en `n` y retorna el valor nuevo
    pub fn increment_by(&self, n: u64) -> u64 {
        self.value.fetch_add(n, Ordering::SeqCst) + n
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.value.store(0, Ordering::SeqCst);
    }
}

/// El conjunto fijo de contadores del servidor
#[derive(Debug, Default)]
pub struct CounterSet {
    counters: [Counter; 7],
}

impl CounterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: CounterKind) -> &Counter {
        &self.counters[kind.index()]
    }

    pub fn value(&self, kind: CounterKind) -> u64 {
        self.get(kind).get()
    }

    pub fn reset_all(&self) {
        self.counters.iter().for_each(Counter::reset);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_increment_returns_new_value() {
        let counter = Counter::new();
        assert_eq!(counter.increment(), 1);
        assert_eq!(counter.increment_by(10), 11);
        assert_eq!(counter.get(), 11);
    }

    #[test]
    fn test_reset() {
        let set = CounterSet::new();
        for kind in CounterKind::ALL {
            set.get(kind).increment_by(3);
        }
        set.reset_all();
        assert!(CounterKind::ALL.iter().all(|k| set.value(*k) == 0));
    }

    #[test]
    fn test_kinds_are_independent() {
        let set = CounterSet::new();
        set.get(CounterKind::Success).increment();
        set.get(CounterKind::Failure).increment_by(2);

        assert_eq!(set.value(CounterKind::Success), 1);
        assert_eq!(set.value(CounterKind::Failure), 2);
        assert_eq!(set.value(CounterKind::Requests), 0);
    }

    #[test]
    fn test_concurrent_increments() {
        let set = Arc::new(CounterSet::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let set = Arc::clone(&set);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        set.get(CounterKind::Requests).increment();
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(set.value(CounterKind::Requests), 8000);
    }
}

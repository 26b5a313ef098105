//! # Cola de Requests
//! src/server/queue.rs
//!
//! Cola FIFO thread-safe entre el listener y los workers.
//!
//! El orden de procesamiento entre workers **no** está garantizado: cada
//! worker compite por el siguiente elemento, así que dos requests encolados
//! en orden pueden terminar en orden inverso. Con un solo worker el orden
//! de procesamiento es el orden de encolado.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

struct QueueState<T> {
    items: VecDeque<T>,
    stopped: bool,
}

/// Cola FIFO con señal de "listo" y señal de stop
pub struct RequestQueue<T> {
    state: Arc<Mutex<QueueState<T>>>,

    /// Condvar para despertar workers (hay items o se pidió stop)
    ready: Arc<Condvar>,
}

impl<T> RequestQueue<T> {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(QueueState {
                items: VecDeque::new(),
                stopped: false,
            })),
            ready: Arc::new(Condvar::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Encola un item y despierta a un worker
    ///
    /// Si la cola ya fue detenida el item se devuelve al caller.
    pub fn push(&self, item: T) -> Result<(), T> {
        let mut state = self.lock();
        if state.stopped {
            return Err(item);
        }
        state.items.push_back(item);
        self.ready.notify_one();
        Ok(())
    }

    /// Desencola el primer item, bloqueando mientras la cola esté vacía
    ///
    /// Después de `stop` sigue entregando los items pendientes y retorna
    /// `None` cuando la cola queda vacía.
    pub fn pop(&self) -> Option<T> {
        let mut state = self.lock();
        loop {
            if let Some(item) = state.items.pop_front() {
                return Some(item);
            }
            if state.stopped {
                return None;
            }
            state = self
                .ready
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Desencola sin bloquear
    pub fn try_pop(&self) -> Option<T> {
        self.lock().items.pop_front()
    }

    /// Marca la cola como detenida y despierta a todos los workers
    pub fn stop(&self) {
        self.lock().stopped = true;
        self.ready.notify_all();
    }

    pub fn is_stopped(&self) -> bool {
        self.lock().stopped
    }

    /// Retira todos los items pendientes
    pub fn drain(&self) -> Vec<T> {
        self.lock().items.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for RequestQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for RequestQueue<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            ready: Arc::clone(&self.ready),
        }
    }
}

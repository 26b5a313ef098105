//! # Pool de Workers
//! src/server/worker.rs
//!
//! N threads con nombre que consumen la [`RequestQueue`] hasta que se
//! detiene. Cada start crea threads nuevos; no se reutilizan entre ciclos.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use super::queue::RequestQueue;

pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Crea `count` workers que procesan cada item con `handler`
    ///
    /// Si falla la creación de algún thread, la cola se detiene y los
    /// workers ya creados se esperan antes de retornar el error.
    pub fn spawn<T, F>(count: usize, queue: RequestQueue<T>, handler: F) -> io::Result<Self>
    where
        T: Send + 'static,
        F: Fn(T) + Send + Sync + 'static,
    {
        let handler = Arc::new(handler);
        let mut handles = Vec::with_capacity(count);

        for i in 0..count {
            let name = format!("worker-{}", i);
            let worker_queue = queue.clone();
            let handler = Arc::clone(&handler);

            let spawned = thread::Builder::new()
                .name(name.clone())
                .spawn(move || worker_loop(&name, worker_queue, handler.as_ref()));

            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    tracing::error!(worker = i, error = %e, "Failed to spawn worker thread");
                    queue.stop();
                    WorkerPool { handles }.join();
                    return Err(e);
                }
            }
        }

        tracing::debug!(workers = count, "Worker pool started");
        Ok(Self { handles })
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Espera a que terminen todos los workers
    ///
    /// La cola debe estar detenida o esto bloquea indefinidamente.
    pub fn join(self) {
        for handle in self.handles {
            let name = handle.thread().name().unwrap_or("worker").to_string();
            if handle.join().is_err() {
                tracing::error!(worker = %name, "Worker thread panicked");
            }
        }
    }
}

fn worker_loop<T, F: Fn(T)>(name: &str, queue: RequestQueue<T>, handler: &F) {
    tracing::debug!(worker = name, "Worker started");

    while let Some(item) = queue.pop() {
        handler(item);
    }

    tracing::debug!(worker = name, "Worker exiting");
}

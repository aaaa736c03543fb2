use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Shared background pool for work that must stay off the protocol I/O
/// thread. Jobs run in submission order per worker; completion is reported
/// through [`Promise`] handles.
pub struct WorkerPool {
    sender: Option<mpsc::Sender<Job>>,
    workers: Vec<thread::JoinHandle<()>>,
}

impl WorkerPool {
    pub fn new(threads: usize) -> Self {
        let (sender, receiver) = mpsc::channel::<Job>();
        let receiver = Arc::new(Mutex::new(receiver));
        let mut workers = Vec::with_capacity(threads.max(1));
        for _ in 0..threads.max(1) {
            let receiver = Arc::clone(&receiver);
            workers.push(thread::spawn(move || loop {
                let job = {
                    let guard = match receiver.lock() {
                        Ok(guard) => guard,
                        Err(_) => return,
                    };
                    guard.recv()
                };
                match job {
                    Ok(job) => job(),
                    Err(_) => return,
                }
            }));
        }
        Self {
            sender: Some(sender),
            workers,
        }
    }

    /// Submits a job. Jobs submitted after shutdown are silently dropped,
    /// matching the discard-on-disconnect model of in-flight resolutions.
    pub fn execute(&self, job: impl FnOnce() + Send + 'static) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(Box::new(job));
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.sender.take();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

/// One-shot completion handle for a background result.
pub struct Promise<T> {
    receiver: mpsc::Receiver<T>,
}

pub struct Completer<T> {
    sender: mpsc::Sender<T>,
}

impl<T> Promise<T> {
    pub fn pair() -> (Completer<T>, Promise<T>) {
        let (sender, receiver) = mpsc::channel();
        (Completer { sender }, Promise { receiver })
    }

    /// Blocks until the producing task completes or is dropped.
    pub fn wait(self) -> Result<T, String> {
        self.receiver
            .recv()
            .map_err(|_| "task dropped before completion".to_string())
    }

    pub fn wait_timeout(self, timeout: Duration) -> Result<T, String> {
        self.receiver.recv_timeout(timeout).map_err(|err| match err {
            mpsc::RecvTimeoutError::Timeout => "timed out waiting for task".to_string(),
            mpsc::RecvTimeoutError::Disconnected => "task dropped before completion".to_string(),
        })
    }

    pub fn try_take(&self) -> Option<T> {
        self.receiver.try_recv().ok()
    }
}

impl<T> Completer<T> {
    pub fn complete(self, value: T) {
        let _ = self.sender.send(value);
    }
}

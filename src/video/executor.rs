//! Serializes every graphics API call onto a single execution context.
//!
//! Callers on any thread submit boxed operations, which run against the
//! backend `Visitor` owned by the executor. Blocking submissions suspend the
//! caller until the operation has completed, non-blocking submissions return
//! immediately. Submissions from one thread run in the order they were made.
//!
//! Operations must never submit blocking calls themselves, non-blocking
//! submissions from inside an operation (e.g. a resource dropped by it) are
//! queued behind it.

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle, ThreadId};

use super::backends::Visitor;
use super::errors::*;

/// An operation to run on the GPU context.
pub type Op = Box<dyn FnOnce(&mut dyn Visitor) + Send>;

/// The single logical execution context on which all graphics API calls
/// happen.
pub trait Executor: Send + Sync {
    /// Runs `op` and returns only after it completed.
    fn call_blocking(&self, op: Op);

    /// Enqueues `op` and returns immediately.
    fn call_non_blocking(&self, op: Op);
}

impl dyn Executor {
    /// Runs `func` as a blocking call and hands its return value back to the
    /// caller.
    pub fn call<F, R>(&self, func: F) -> R
    where
        F: FnOnce(&mut dyn Visitor) -> R + Send + 'static,
        R: Send + 'static,
    {
        let slot = Arc::new(Mutex::new(None));

        {
            let slot = slot.clone();
            self.call_blocking(Box::new(move |visitor| {
                let rsp = func(visitor);
                *slot.lock().unwrap() = Some(rsp);
            }));
        }

        let rsp = slot.lock().unwrap().take();
        rsp.unwrap_or_else(|| panic!("blocking GPU call returned without running its operation"))
    }
}

/// Logs the failure of an operation nobody waits for.
pub(crate) fn report<T>(what: &str, rsp: crate::errors::Result<T>) {
    if let Err(err) = rsp {
        error!("[GPU] {} failed: {}", what, err);
    }
}

enum Command {
    Run(Op),
    Stop,
}

/// An executor that owns a dedicated thread, on which the backend visitor is
/// created and all operations are executed in submission order.
pub struct GpuThread {
    chan: Mutex<mpsc::Sender<Command>>,
    join: Mutex<Option<JoinHandle<()>>>,
    id: ThreadId,
}

impl GpuThread {
    /// Spawns the GPU thread. `factory` runs on the new thread, so it is the
    /// place to make a graphics context current before creating the visitor.
    pub fn spawn<F>(name: &str, factory: F) -> Result<Self>
    where
        F: FnOnce() -> crate::errors::Result<Box<dyn Visitor>> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let (init_tx, init_rx) = mpsc::channel();

        let join = thread::Builder::new()
            .name(name.into())
            .spawn(move || match factory() {
                Ok(visitor) => {
                    let _ = init_tx.send(Ok(()));
                    GpuThread::run(&rx, visitor);
                }
                Err(err) => {
                    let _ = init_tx.send(Err(Error::Backend(format!("{}", err))));
                }
            })
            .map_err(|err| Error::Executor(format!("{}", err)))?;

        let id = join.thread().id();
        match init_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                let _ = join.join();
                return Err(err);
            }
            Err(_) => return Err(Error::Executor("GPU thread died during start up.".into())),
        }

        info!("GPU thread '{}' started.", name);
        Ok(GpuThread {
            chan: Mutex::new(tx),
            join: Mutex::new(Some(join)),
            id,
        })
    }

    fn run(chan: &mpsc::Receiver<Command>, mut visitor: Box<dyn Visitor>) {
        while let Ok(cmd) = chan.recv() {
            match cmd {
                Command::Run(op) => {
                    let visitor = visitor.as_mut();
                    if panic::catch_unwind(AssertUnwindSafe(move || op(visitor))).is_err() {
                        error!("[GPU] operation panicked.");
                    }
                }
                Command::Stop => break,
            }
        }

        report("flush", visitor.flush());
    }

    fn send(&self, cmd: Command) {
        if self.chan.lock().unwrap().send(cmd).is_err() {
            panic!("GPU thread is gone.");
        }
    }
}

impl Executor for GpuThread {
    fn call_blocking(&self, op: Op) {
        let (tx, rx) = mpsc::channel();
        self.send(Command::Run(Box::new(move |visitor| {
            op(visitor);
            let _ = tx.send(());
        })));

        // The sender is dropped without a message if the operation panicked.
        if rx.recv().is_err() {
            panic!("blocking GPU operation panicked.");
        }
    }

    fn call_non_blocking(&self, op: Op) {
        self.send(Command::Run(op));
    }
}

impl Drop for GpuThread {
    fn drop(&mut self) {
        let _ = self.chan.lock().unwrap().send(Command::Stop);

        // The last owner might be released by an operation on the GPU thread
        // itself, which can not wait for its own exit.
        if thread::current().id() == self.id {
            return;
        }

        if let Some(join) = self.join.lock().unwrap().take() {
            let _ = join.join();
        }
    }
}

/// The kind of a submission recorded by `Immediate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    Blocking,
    NonBlocking,
}

/// An executor that runs every operation synchronously on the calling thread,
/// and records the kind of each submission. Used by tests and tools that do
/// not need a dedicated GPU thread.
pub struct Immediate {
    visitor: Mutex<Box<dyn Visitor + Send>>,
    pending: Mutex<VecDeque<Op>>,
    draining: Mutex<Option<ThreadId>>,
    submissions: Mutex<Vec<Submission>>,
}

impl Immediate {
    pub fn new(visitor: Box<dyn Visitor + Send>) -> Self {
        Immediate {
            visitor: Mutex::new(visitor),
            pending: Mutex::new(VecDeque::new()),
            draining: Mutex::new(None),
            submissions: Mutex::new(Vec::new()),
        }
    }

    /// Returns the kinds of all submissions so far, in order.
    pub fn submissions(&self) -> Vec<Submission> {
        self.submissions.lock().unwrap().clone()
    }

    pub fn clear_submissions(&self) {
        self.submissions.lock().unwrap().clear();
    }

    fn submit(&self, kind: Submission, op: Op) {
        self.submissions.lock().unwrap().push(kind);
        self.pending.lock().unwrap().push_back(op);

        let current = thread::current().id();
        if *self.draining.lock().unwrap() == Some(current) {
            // Submitted from inside a running operation, the outer loop picks
            // it up.
            return;
        }

        let mut visitor = self.visitor.lock().unwrap();
        *self.draining.lock().unwrap() = Some(current);

        loop {
            let op = self.pending.lock().unwrap().pop_front();
            match op {
                Some(op) => op(visitor.as_mut()),
                None => break,
            }
        }

        *self.draining.lock().unwrap() = None;
    }
}

impl Executor for Immediate {
    fn call_blocking(&self, op: Op) {
        self.submit(Submission::Blocking, op);
    }

    fn call_non_blocking(&self, op: Op) {
        self.submit(Submission::NonBlocking, op);
    }
}

#[cfg(test)]
mod test {
    use super::super::backends::software::SoftwareVisitor;
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn immediate_records_kinds() {
        let executor = Immediate::new(Box::new(SoftwareVisitor::new(false)));
        executor.call_non_blocking(Box::new(|_| {}));
        executor.call_blocking(Box::new(|_| {}));
        assert_eq!(
            executor.submissions(),
            vec![Submission::NonBlocking, Submission::Blocking]
        );
    }

    #[test]
    fn nested_submissions_run_after() {
        let executor: Arc<Immediate> =
            Arc::new(Immediate::new(Box::new(SoftwareVisitor::new(false))));
        let order = Arc::new(Mutex::new(Vec::new()));

        let inner = executor.clone();
        let o = order.clone();
        executor.call_blocking(Box::new(move |_| {
            let o2 = o.clone();
            inner.call_non_blocking(Box::new(move |_| o2.lock().unwrap().push(2)));
            o.lock().unwrap().push(1);
        }));

        assert_eq!(*order.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn gpu_thread_runs_in_order() {
        let executor = GpuThread::spawn("test-gpu", || {
            Ok(Box::new(SoftwareVisitor::new(false)) as Box<dyn Visitor>)
        })
        .unwrap();

        let executor: Arc<dyn Executor> = Arc::new(executor);
        let counter = Arc::new(AtomicUsize::new(0));
        let seen = Arc::new(Mutex::new(Vec::new()));

        for i in 0..100 {
            let counter = counter.clone();
            let seen = seen.clone();
            executor.call_non_blocking(Box::new(move |_| {
                seen.lock().unwrap().push(i);
                counter.fetch_add(1, Ordering::SeqCst);
            }));
        }

        let n = executor.call(|_| 7);
        assert_eq!(n, 7);
        assert_eq!(counter.load(Ordering::SeqCst), 100);
        assert_eq!(*seen.lock().unwrap(), (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn gpu_thread_factory_failure() {
        let rsp = GpuThread::spawn("test-gpu", || Err(format_err!("no context")));
        assert!(rsp.is_err());
    }
}

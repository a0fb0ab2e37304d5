//! Primary Thread Marshal
//!
//! Some host callbacks must observe UI-adjacent state and therefore run on
//! one designated thread. The marshal owns that thread: a block submitted
//! from it runs immediately, a block submitted from anywhere else is
//! enqueued and the caller returns without blocking.

use std::sync::mpsc;
use std::sync::Mutex;
use std::thread::{self, ThreadId};

type Block = Box<dyn FnOnce() + Send + 'static>;

/// Queue-or-run-immediately dispatcher for the primary execution context.
pub struct PrimaryThreadMarshal {
    primary: ThreadId,
    tx: Mutex<mpsc::Sender<Block>>,
}

impl PrimaryThreadMarshal {
    /// Start the dedicated primary thread.
    pub fn start() -> Self {
        let (tx, rx) = mpsc::channel::<Block>();
        let handle = thread::Builder::new()
            .name("airlift-primary".to_string())
            .spawn(move || {
                // Runs until every sender is gone.
                while let Ok(block) = rx.recv() {
                    block();
                }
            })
            .expect("failed to spawn primary thread");

        Self {
            primary: handle.thread().id(),
            tx: Mutex::new(tx),
        }
    }

    /// True when the caller is already on the primary thread.
    pub fn is_primary_thread(&self) -> bool {
        thread::current().id() == self.primary
    }

    /// Run `block` on the primary thread.
    ///
    /// Executes inline when already there; otherwise enqueues and returns
    /// immediately. Blocks submitted from other threads run in submission
    /// order.
    pub fn run_on_primary_thread<F>(&self, block: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.is_primary_thread() {
            block();
            return;
        }
        // A send only fails after the primary thread has exited, which
        // happens when the marshal itself is being torn down.
        let _ = self.tx.lock().unwrap().send(Box::new(block));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::channel;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_enqueued_block_runs_on_primary_thread() {
        let marshal = PrimaryThreadMarshal::start();
        let (tx, rx) = channel();

        assert!(!marshal.is_primary_thread());
        marshal.run_on_primary_thread(move || {
            tx.send(thread::current().id()).unwrap();
        });

        let ran_on = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(ran_on, marshal.primary);
    }

    #[test]
    fn test_blocks_run_in_submission_order() {
        let marshal = PrimaryThreadMarshal::start();
        let (tx, rx) = channel();

        for i in 0..10 {
            let tx = tx.clone();
            marshal.run_on_primary_thread(move || tx.send(i).unwrap());
        }

        let received: Vec<i32> = (0..10)
            .map(|_| rx.recv_timeout(Duration::from_secs(5)).unwrap())
            .collect();
        assert_eq!(received, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_runs_inline_when_already_on_primary_thread() {
        let marshal = Arc::new(PrimaryThreadMarshal::start());
        let (tx, rx) = channel();

        let inner = Arc::clone(&marshal);
        marshal.run_on_primary_thread(move || {
            // Re-entrant dispatch from the primary thread must run inline,
            // not deadlock behind the block currently executing.
            let flag = Arc::new(Mutex::new(false));
            let flag_inner = Arc::clone(&flag);
            inner.run_on_primary_thread(move || *flag_inner.lock().unwrap() = true);
            tx.send(*flag.lock().unwrap()).unwrap();
        });

        assert!(rx.recv_timeout(Duration::from_secs(5)).unwrap());
    }
}

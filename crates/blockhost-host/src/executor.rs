//! Dedicated control thread.
//!
//! Every non-real-time operation on a hosted unit (load, unload, state,
//! programs) runs here, one at a time, in submission order. The host owns
//! its executor; there is no process-wide instance.

use crate::error::Result;
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle, ThreadId};
use tracing::{debug, error};

pub(crate) type Task = Box<dyn FnOnce() + Send + 'static>;

enum Message {
    Run(Task),
    Shutdown,
}

/// Owned control thread draining a FIFO task queue. Shuts down on drop.
pub struct ControlExecutor {
    sender: Sender<Message>,
    thread_id: ThreadId,
    thread_handle: Mutex<Option<JoinHandle<()>>>,
    running: AtomicBool,
}

impl ControlExecutor {
    /// Spawn the control thread.
    pub fn start() -> Result<Self> {
        let (sender, receiver) = unbounded();
        let handle = thread::Builder::new()
            .name("blockhost-control".into())
            .spawn(move || Self::run_loop(receiver))?;
        let thread_id = handle.thread().id();
        debug!("Control executor started");

        Ok(Self {
            sender,
            thread_id,
            thread_handle: Mutex::new(Some(handle)),
            running: AtomicBool::new(true),
        })
    }

    fn run_loop(receiver: Receiver<Message>) {
        for message in receiver.iter() {
            match message {
                Message::Run(task) => {
                    if let Err(payload) = catch_unwind(AssertUnwindSafe(task)) {
                        error!("Control task panicked: {}", panic_message(&payload));
                    }
                }
                Message::Shutdown => break,
            }
        }
        debug!("Control executor stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn is_current_thread(&self) -> bool {
        thread::current().id() == self.thread_id
    }

    /// Queue `task`. Returns `false` once the executor has shut down.
    pub fn submit<F>(&self, task: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        if !self.is_running() {
            return false;
        }
        self.sender.send(Message::Run(Box::new(task))).is_ok()
    }

    /// Stop accepting work, let queued tasks finish and join the thread.
    ///
    /// Safe to call more than once. Called from the control thread itself it
    /// only signals; the thread exits after the current task.
    pub fn shutdown(&self) {
        if !self.running.swap(false, Ordering::AcqRel) {
            return;
        }
        let _ = self.sender.send(Message::Shutdown);

        if self.is_current_thread() {
            return;
        }
        if let Some(handle) = self.thread_handle.lock().take() {
            if handle.join().is_err() {
                error!("Control thread terminated abnormally");
            }
        }
    }
}

impl Drop for ControlExecutor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

pub(crate) fn panic_message(payload: &Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

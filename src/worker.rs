//! Persistent render workers.
//!
//! Each worker owns a single-slot task mailbox guarded by a mutex and two
//! condition variables: one signalling a posted task, one signalling that
//! the worker has gone idle. The main thread posts one strip per worker per
//! frame and then blocks on the idle condition of each; that barrier is the
//! only synchronization the buffer writes need. Workers exit when the `run`
//! flag is dropped under the same task condition.

use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

use crate::context::RenderingContext;
use crate::math::Rect;

/// A strip assignment. The raw context pointer stands in for the shared
/// borrow the worker takes while the frame barrier is open; the context
/// outlives every task because `draw` never returns before the barrier.
struct Task {
    context: *const RenderingContext,
    rect: Rect,
}

// SAFETY: the pointee is only dereferenced between post and barrier, while
// the posting thread keeps the context alive and refrains from mutation.
unsafe impl Send for Task {}

struct State {
    task: Option<Task>,
    busy: bool,
    run: bool,
}

struct Shared {
    state: Mutex<State>,
    task_cv: Condvar,
    idle_cv: Condvar,
}

pub(crate) struct RenderThread {
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
}

impl RenderThread {
    pub fn spawn(index: usize) -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                task: None,
                busy: false,
                run: true,
            }),
            task_cv: Condvar::new(),
            idle_cv: Condvar::new(),
        });

        let worker = Arc::clone(&shared);
        let handle = std::thread::Builder::new()
            .name(format!("render-{index}"))
            .spawn(move || run_loop(worker))
            .expect("failed to spawn render thread");

        RenderThread {
            shared,
            handle: Some(handle),
        }
    }

    /// Post a strip. Ignored if the worker is still busy; the frame
    /// protocol only posts to idle workers.
    pub fn execute(&self, context: *const RenderingContext, rect: Rect) {
        let mut state = self.shared.state.lock().unwrap();
        if state.busy {
            return;
        }
        state.busy = true;
        state.task = Some(Task { context, rect });
        self.shared.task_cv.notify_one();
    }

    /// Block until the worker has finished its task and gone idle.
    pub fn wait(&self) {
        let mut state = self.shared.state.lock().unwrap();
        while state.busy {
            state = self.shared.idle_cv.wait(state).unwrap();
        }
    }
}

impl Drop for RenderThread {
    fn drop(&mut self) {
        {
            let mut state = self.shared.state.lock().unwrap();
            state.run = false;
        }
        self.shared.task_cv.notify_one();
        if let Some(handle) = self.handle.take() {
            handle.join().ok();
        }
    }
}

fn run_loop(shared: Arc<Shared>) {
    loop {
        let task = {
            let mut state = shared.state.lock().unwrap();
            loop {
                if !state.run {
                    return;
                }
                if let Some(task) = state.task.take() {
                    break task;
                }
                state.busy = false;
                shared.idle_cv.notify_one();
                state = shared.task_cv.wait(state).unwrap();
            }
        };

        // SAFETY: see `Task`; the posting thread is parked on `wait` until
        // this worker flags itself idle again.
        let context = unsafe { &*task.context };
        context.rasterize_strip(task.rect);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workers_spawn_idle_and_shut_down() {
        let threads: Vec<_> = (0..4).map(RenderThread::spawn).collect();
        for thread in &threads {
            thread.wait(); // no task posted: returns immediately
        }
        drop(threads); // must not hang
    }
}

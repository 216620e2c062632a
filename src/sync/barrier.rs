//! Join barrier: run a continuation once every entered operation has left.
//!
//! The pending count goes up on [`JoinBarrier::enter`] and down on
//! [`JoinBarrier::leave`]. Continuations registered with
//! [`JoinBarrier::notify`] are spawned on the given runtime handle exactly
//! once, as soon as the count is back to zero. A barrier whose count is
//! already zero dispatches immediately.
//!
//! Use one barrier per fan-out group. Sharing an instance between unrelated
//! groups makes each group's continuation depend on the other's children.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::runtime::Handle;

type Continuation = Box<dyn FnOnce() + Send + 'static>;

#[derive(Default)]
struct State {
    pending: usize,
    continuations: Vec<(Handle, Continuation)>,
}

/// Counting barrier with enter/leave/notify.
#[derive(Clone, Default)]
pub struct JoinBarrier {
    state: Arc<Mutex<State>>,
}

impl JoinBarrier {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // The state stays consistent even if a holder panicked
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Number of entered operations that have not left yet.
    pub fn pending(&self) -> usize {
        self.lock().pending
    }

    pub fn enter(&self) {
        self.lock().pending += 1;
    }

    /// Enter and get a guard that leaves when dropped.
    pub fn enter_guard(&self) -> BarrierGuard {
        self.enter();
        BarrierGuard {
            barrier: self.clone(),
        }
    }

    pub fn leave(&self) {
        let ready = {
            let mut state = self.lock();
            if state.pending == 0 {
                tracing::error!("JoinBarrier::leave called without a matching enter");
                return;
            }
            state.pending -= 1;
            if state.pending == 0 {
                std::mem::take(&mut state.continuations)
            } else {
                Vec::new()
            }
        };

        for (handle, f) in ready {
            dispatch(&handle, f);
        }
    }

    /// Run `f` on `handle` once the pending count reaches zero.
    pub fn notify<F>(&self, handle: &Handle, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut state = self.lock();
        if state.pending > 0 {
            state.continuations.push((handle.clone(), Box::new(f)));
            return;
        }
        drop(state);
        dispatch(handle, Box::new(f));
    }
}

fn dispatch(handle: &Handle, f: Continuation) {
    handle.spawn(async move { f() });
}

/// Leaves its barrier on drop, so a failed or panicking child still closes its leg.
pub struct BarrierGuard {
    barrier: JoinBarrier,
}

impl Drop for BarrierGuard {
    fn drop(&mut self) {
        self.barrier.leave();
    }
}

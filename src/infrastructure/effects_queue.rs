use std::sync::mpsc;
use std::thread;

use crate::domain::ports::{EffectDispatcher, EffectTask};

/// Hands effect batches to a dedicated worker thread so a slow downstream
/// (email relay, chat store) never holds up the HTTP response that committed
/// the transition.
#[derive(Clone)]
pub struct EffectQueue {
    tx: mpsc::Sender<EffectTask>,
}

impl EffectQueue {
    /// Spawn the worker and wrap `inner` (normally the orchestrator) behind
    /// the queue. The worker exits when the last queue handle is dropped.
    pub fn start<D: EffectDispatcher>(inner: D) -> Self {
        let (tx, rx) = mpsc::channel::<EffectTask>();
        thread::Builder::new()
            .name("side-effects".to_string())
            .spawn(move || {
                while let Ok(task) = rx.recv() {
                    inner.dispatch(task);
                }
                log::info!("side-effect worker shutting down");
            })
            .expect("failed to spawn side-effect worker");
        EffectQueue { tx }
    }
}

impl EffectDispatcher for EffectQueue {
    fn dispatch(&self, task: EffectTask) {
        let order_id = task.order.id;
        if self.tx.send(task).is_err() {
            log::error!("order {order_id}: side-effect queue is closed, effects dropped");
        }
    }
}

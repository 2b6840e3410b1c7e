//! Named-event emitter used for "deposit" and "transaction" notifications.
//!
//! Items emitted before a listener subscribes are replayed to it, so a
//! listener registered after a deposit was detected still sees it. Every
//! listener invocation runs on its own task.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::RwLock;

type Listener<T> = Arc<dyn Fn(T) -> BoxFuture<'static, ()> + Send + Sync>;

struct EmitterState<T> {
    listeners: HashMap<String, Vec<Listener<T>>>,
    /// Kept for replay while the emitter lives. Unbounded: one entry per
    /// detected deposit or source transaction of a single transfer.
    history: HashMap<String, Vec<T>>,
}

pub struct EventEmitter<T> {
    state: Arc<RwLock<EmitterState<T>>>,
}

impl<T> Clone for EventEmitter<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<T: Clone + Send + 'static> Default for EventEmitter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + 'static> EventEmitter<T> {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(EmitterState {
                listeners: HashMap::new(),
                history: HashMap::new(),
            })),
        }
    }

    /// Registers `listener` for `event` and replays past emissions to it.
    pub async fn on<F, Fut>(&self, event: &str, listener: F)
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let listener: Listener<T> = Arc::new(move |item| Box::pin(listener(item)));
        let replay = {
            let mut state = self.state.write().await;
            state
                .listeners
                .entry(event.to_string())
                .or_default()
                .push(Arc::clone(&listener));
            state.history.get(event).cloned().unwrap_or_default()
        };
        for item in replay {
            tokio::spawn(listener(item));
        }
    }

    /// Records `item` and hands it to every listener of `event`.
    pub async fn emit(&self, event: &str, item: T) {
        let listeners = {
            let mut state = self.state.write().await;
            state
                .history
                .entry(event.to_string())
                .or_default()
                .push(item.clone());
            state.listeners.get(event).cloned().unwrap_or_default()
        };
        for listener in listeners {
            tokio::spawn(listener(item.clone()));
        }
    }

    /// Number of items emitted so far for `event`.
    pub async fn emitted(&self, event: &str) -> usize {
        self.state
            .read()
            .await
            .history
            .get(event)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

//! A loaded plugin generation

use std::cell::RefCell;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::rc::Rc;

use futures::FutureExt;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use uuid::Uuid;

use crate::domain::entities::HandlerDescriptor;

/// Flat per-plugin configuration (`plugin:<name>` section)
pub type PluginConfig = IndexMap<String, String>;

/// Scratch space shared by every handler of one plugin generation.
///
/// Single-threaded; never hold the borrow across an `.await`, which the
/// closure-based API makes hard to do by accident.
#[derive(Debug, Clone, Default)]
pub struct Temp(Rc<RefCell<Map<String, Value>>>);

impl Temp {
    pub fn get(&self, key: &str) -> Option<Value> {
        self.0.borrow().get(key).cloned()
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.borrow_mut().insert(key.into(), value.into());
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.0.borrow_mut().remove(key)
    }

    /// Run `f` with mutable access to the whole map
    pub fn with<R>(&self, f: impl FnOnce(&mut Map<String, Value>) -> R) -> R {
        f(&mut self.0.borrow_mut())
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    /// Whether both handles point at the same storage
    pub fn same_as(&self, other: &Temp) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// A named bundle of handlers, config, scratch state and background tasks.
///
/// Immutable once registered; a reload builds a new `Plugin`.
pub struct Plugin {
    name: String,
    module_path: String,
    instance_id: Uuid,
    handlers: Vec<HandlerDescriptor>,
    config: PluginConfig,
    temp: Temp,
    cancellation: CancellationToken,
    tasks: TaskTracker,
}

impl Plugin {
    pub fn new(
        name: impl Into<String>,
        module_path: impl Into<String>,
        handlers: Vec<HandlerDescriptor>,
        config: PluginConfig,
    ) -> Self {
        Self {
            name: name.into(),
            module_path: module_path.into(),
            instance_id: Uuid::new_v4(),
            handlers,
            config,
            temp: Temp::default(),
            cancellation: CancellationToken::new(),
            tasks: TaskTracker::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn module_path(&self) -> &str {
        &self.module_path
    }

    /// Unique per load, changes on every reload
    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    pub fn handlers(&self) -> &[HandlerDescriptor] {
        &self.handlers
    }

    pub fn config(&self) -> &PluginConfig {
        &self.config
    }

    pub fn temp(&self) -> &Temp {
        &self.temp
    }

    /// Token shared by this generation's background loops
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Ask the background loops to stop at their next suspension point.
    ///
    /// No loop can be spawned for this generation afterwards.
    pub fn cancel(&self) {
        self.cancellation.cancel();
        self.tasks.close();
    }

    /// Spawn a background loop on the current `LocalSet`.
    ///
    /// # Panics
    ///
    /// Panics when called outside a `LocalSet`.
    pub(crate) fn spawn_loop<F>(&self, background: F)
    where
        F: Future<Output = ()> + 'static,
    {
        let name = self.name.clone();
        self.tasks.spawn_local(async move {
            if AssertUnwindSafe(background).catch_unwind().await.is_err() {
                tracing::warn!("Background task of plugin '{}' panicked", name);
            }
        });
    }

    /// Background loops that have not returned yet
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Cancel, then wait until every background loop has returned.
    ///
    /// Any number of callers may wait on the same generation.
    pub async fn join_tasks(&self) {
        self.cancel();
        self.tasks.wait().await;
    }

    /// Command templates in registration order
    pub fn commands(&self) -> Vec<&str> {
        self.handlers.iter().filter_map(HandlerDescriptor::template).collect()
    }
}

impl std::fmt::Debug for Plugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Plugin")
            .field("name", &self.name)
            .field("module_path", &self.module_path)
            .field("instance_id", &self.instance_id)
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

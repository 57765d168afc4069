use std::{fmt, future::Future, pin::Pin};

/// Opaque identity of a scheduled task (UUID v4).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(String);

impl TaskId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

pub(crate) type BoxFuture = Pin<Box<dyn Future<Output = ()> + Send>>;
pub(crate) type BoxAction = Box<dyn FnOnce() -> BoxFuture + Send>;

/// One-shot unit of work with a set of dependencies.
///
/// The action runs at most once, after every dependency's action has returned.
pub struct ScheduledTask {
    pub(crate) id: TaskId,
    pub(crate) description: String,
    pub(crate) action: BoxAction,
    pub(crate) deps: Vec<TaskId>,
}

impl ScheduledTask {
    pub fn new<F, Fut>(description: impl Into<String>, action: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            id: TaskId::new(),
            description: description.into(),
            action: Box::new(move || Box::pin(action()) as BoxFuture),
            deps: Vec::new(),
        }
    }

    /// Adds dependencies. Duplicates are ignored; insertion order is kept.
    pub fn with_deps<I>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = TaskId>,
    {
        for dep in deps {
            if !self.deps.contains(&dep) {
                self.deps.push(dep);
            }
        }
        self
    }

    /// Shorthand for depending on a single task.
    pub fn after(self, dep: &ScheduledTask) -> Self {
        self.with_deps([dep.id.clone()])
    }

    #[inline]
    pub fn id(&self) -> &TaskId {
        &self.id
    }

    #[inline]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[inline]
    pub fn deps(&self) -> &[TaskId] {
        &self.deps
    }
}

impl fmt::Debug for ScheduledTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduledTask")
            .field("id", &self.id)
            .field("description", &self.description)
            .field("deps", &self.deps)
            .finish_non_exhaustive()
    }
}

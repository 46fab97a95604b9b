use std::collections::HashMap;

use piperpc_rpc::{ErrorObject, Params};
use serde_json::Value;

use crate::error::{PeerError, Result};

/// Declared calling convention of a handler, validated against each
/// incoming request's params shape before the handler runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamsStyle {
    /// Accepts a JSON array of positional arguments.
    Positional,
    /// Accepts a JSON object of named arguments.
    Named,
    /// Accepts either shape.
    Any,
}

impl ParamsStyle {
    /// Whether `params` matches this convention.
    pub fn accepts(&self, params: &Params) -> bool {
        match self {
            Self::Positional => params.is_list(),
            Self::Named => params.is_map(),
            Self::Any => true,
        }
    }

    /// Convention name for error text.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Positional => "positional",
            Self::Named => "named",
            Self::Any => "any",
        }
    }
}

/// A registered method handler.
///
/// Faults are ordinary values: returning an [`ErrorObject`] produces an
/// error response with the request's id, and the serve loop carries on.
pub type Handler = dyn Fn(Params) -> std::result::Result<Value, ErrorObject> + Send + Sync;

pub(crate) struct HandlerEntry {
    pub(crate) style: ParamsStyle,
    pub(crate) func: Box<Handler>,
}

/// Method-name-to-handler table.
///
/// Populate it fully, then move it into the dispatcher. Moving is what
/// pins the method set: nothing can be added or removed once serving
/// has begun.
#[derive(Default)]
pub struct HandlerRegistry {
    entries: HashMap<String, HandlerEntry>,
}

impl HandlerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Bind `method` to a handler. Each name can be bound exactly once.
    pub fn register<F>(
        &mut self,
        method: impl Into<String>,
        style: ParamsStyle,
        handler: F,
    ) -> Result<()>
    where
        F: Fn(Params) -> std::result::Result<Value, ErrorObject> + Send + Sync + 'static,
    {
        let method = method.into();
        if self.entries.contains_key(&method) {
            return Err(PeerError::DuplicateMethod(method));
        }
        self.entries.insert(
            method,
            HandlerEntry {
                style,
                func: Box::new(handler),
            },
        );
        Ok(())
    }

    pub(crate) fn lookup(&self, method: &str) -> Option<&HandlerEntry> {
        self.entries.get(method)
    }

    /// Whether a handler is bound to `method`.
    pub fn contains(&self, method: &str) -> bool {
        self.entries.contains_key(method)
    }

    /// Registered method names, in no particular order.
    pub fn methods(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of registered methods.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut methods: Vec<&str> = self.methods().collect();
        methods.sort_unstable();
        f.debug_struct("HandlerRegistry")
            .field("methods", &methods)
            .finish()
    }
}

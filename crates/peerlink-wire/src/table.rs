//! Field-dispatch table — maps stream field names to apply handlers.
//!
//! The table replaces reflection-driven construction: each recognized
//! field registers an explicit handler that decodes the encoded value
//! and applies it to the target under construction.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::error::{ParseError, WireResult};

/// Decode-and-apply handler for a single field.
type FieldHandler<T> = Box<dyn Fn(&mut T, &Value) -> Result<(), ParseError> + Send + Sync>;

/// Dispatch table mapping field names to handlers for a target type `T`.
///
/// Registration is exactly-once per name. Applying a stream visits pairs
/// in order; unknown names are skipped, and the first decode failure
/// aborts the parse (earlier fields stay applied).
pub struct FieldTable<T> {
    handlers: HashMap<String, FieldHandler<T>>,
}

impl<T> FieldTable<T> {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register the handler for `name`.
    ///
    /// Registering the same name twice is a programming error.
    pub fn register<F>(&mut self, name: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut T, &Value) -> Result<(), ParseError> + Send + Sync + 'static,
    {
        let replaced = self.handlers.insert(name.to_string(), Box::new(handler));
        debug_assert!(replaced.is_none(), "field `{name}` registered twice");
        self
    }

    /// True if `name` has a registered handler.
    pub fn recognizes(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Apply an ordered stream of `(name, value)` pairs to `target`.
    ///
    /// The target's default initialization must have run before this is
    /// called; absent fields keep their defaults.
    pub fn apply<'a, I>(&self, target: &mut T, stream: I) -> WireResult<()>
    where
        I: IntoIterator<Item = &'a (String, Value)>,
    {
        for (name, value) in stream {
            match self.handlers.get(name) {
                Some(handler) => handler(target, value)?,
                None => {
                    // Forward compatibility: newer writers may emit
                    // fields this reader does not know.
                    debug!(field = %name, "skipping unrecognized field");
                }
            }
        }
        Ok(())
    }
}

impl<T> Default for FieldTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode an encoded value into any `Deserialize` type, reporting a
/// failure as a [`ParseError`] naming `field`.
pub fn decode<V: DeserializeOwned>(field: &str, value: &Value) -> WireResult<V> {
    serde_json::from_value(value.clone()).map_err(|e| ParseError::Field {
        field: field.to_string(),
        reason: e.to_string(),
    })
}

// src/interception/context.rs
//! Per-call context capability
//!
//! The host passes an opaque context to every callback. The tracer needs
//! only a narrow view of it: a key/value bag for stashing the correlation
//! key, plus accessors for the SQL text, row count, errors and settings.

use crate::recording::event::{CapturedFields, CorrelationKey};
use crate::utils::errors::{Result, TraceError};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// Context key under which the correlation key is stashed
pub const CORRELATION_KEY: &str = "dbtrace";

/// What the tracer needs from a host call context
pub trait CallContext {
    /// Identifier of this call scope, independent of the correlation key
    fn instance_id(&self) -> String;

    fn get(&self, key: &str) -> Option<Value>;

    fn set(&mut self, key: &str, value: Value);

    /// SQL text as currently known; may be empty before execution
    fn sql(&self) -> String;

    fn rows_affected(&self) -> i64;

    /// Errors recorded on the call so far, in order
    fn errors(&self) -> Vec<String>;

    /// Values for those of `names` present on the call
    fn known_settings(&self, names: &[String]) -> BTreeMap<String, Value> {
        names
            .iter()
            .filter_map(|name| self.get(name).map(|v| (name.clone(), v)))
            .collect()
    }
}

/// Capture the traced fields from a context
pub fn extract(ctx: &dyn CallContext, known_settings: &[String]) -> CapturedFields {
    CapturedFields {
        query: ctx.sql(),
        rows_affected: ctx.rows_affected(),
        errors: ctx.errors(),
        settings: ctx.known_settings(known_settings),
    }
}

/// Store a correlation key on the context
pub fn stash_key(ctx: &mut dyn CallContext, key: &CorrelationKey) {
    ctx.set(CORRELATION_KEY, Value::String(key.to_string()));
}

/// Retrieve the correlation key stashed by `stash_key`
///
/// `Ok(None)` when nothing was stashed; an error when something else sits
/// under the key.
pub fn stashed_key(ctx: &dyn CallContext) -> Result<Option<CorrelationKey>> {
    match ctx.get(CORRELATION_KEY) {
        None => Ok(None),
        Some(Value::String(s)) => s.parse().map(Some),
        Some(other) => Err(TraceError::InvalidKey(other.to_string())),
    }
}

/// Plain in-memory call context
///
/// For hosts without a context type of their own.
#[derive(Debug, Clone, Default)]
pub struct ScopeContext {
    pub instance_id: String,
    pub sql: String,
    pub rows_affected: i64,
    pub errors: Vec<String>,
    pub values: HashMap<String, Value>,
}

impl ScopeContext {
    pub fn new(instance_id: impl Into<String>) -> Self {
        Self {
            instance_id: instance_id.into(),
            ..Default::default()
        }
    }

    pub fn with_sql(mut self, sql: impl Into<String>) -> Self {
        self.sql = sql.into();
        self
    }

    pub fn with_value(mut self, key: impl Into<String>, value: Value) -> Self {
        self.values.insert(key.into(), value);
        self
    }
}

impl CallContext for ScopeContext {
    fn instance_id(&self) -> String {
        self.instance_id.clone()
    }

    fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) {
        self.values.insert(key.to_string(), value);
    }

    fn sql(&self) -> String {
        self.sql.clone()
    }

    fn rows_affected(&self) -> i64 {
        self.rows_affected
    }

    fn errors(&self) -> Vec<String> {
        self.errors.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract() {
        let mut ctx = ScopeContext::new("inst-1")
            .with_sql("DELETE FROM users WHERE id = ?")
            .with_value("delete_option", json!("LIMIT 1"))
            .with_value("unrelated", json!(42));
        ctx.rows_affected = 1;
        ctx.errors.push("foreign key violation".to_string());

        let known = vec!["delete_option".to_string(), "query_option".to_string()];
        let fields = extract(&ctx, &known);

        assert_eq!(fields.query, "DELETE FROM users WHERE id = ?");
        assert_eq!(fields.rows_affected, 1);
        assert_eq!(fields.errors, vec!["foreign key violation".to_string()]);
        assert_eq!(fields.settings.len(), 1);
        assert_eq!(fields.settings["delete_option"], json!("LIMIT 1"));
    }

    #[test]
    fn test_stash_and_retrieve_key() {
        let mut ctx = ScopeContext::new("inst-1");
        assert!(stashed_key(&ctx).unwrap().is_none());

        let key = CorrelationKey::generate();
        stash_key(&mut ctx, &key);
        assert_eq!(stashed_key(&ctx).unwrap(), Some(key));
    }

    #[test]
    fn test_foreign_value_under_key() {
        let ctx = ScopeContext::new("inst-1").with_value(CORRELATION_KEY, json!(7));
        assert!(matches!(stashed_key(&ctx), Err(TraceError::InvalidKey(_))));

        let ctx = ScopeContext::new("inst-1").with_value(CORRELATION_KEY, json!("garbage"));
        assert!(matches!(stashed_key(&ctx), Err(TraceError::InvalidKey(_))));
    }
}

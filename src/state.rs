//! Scoped state store
//!
//! The state store is a dictionary-of-dictionaries keyed by [`Scope`]. Values
//! are addressed by dotted path (`private.user.name`); intermediate levels are
//! created on demand as nested maps. Every successful `set` also updates the
//! owning scope's `__last_value` slot.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{DanaError, Result};
use crate::value::Value;

/// Reserved key holding the most recently stored/evaluated value in a scope.
pub const LAST_VALUE_KEY: &str = "__last_value";

/// The seven fixed scopes that partition Dana's mutable state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Scope {
    Private,
    Public,
    System,
    Local,
    Temp,
    Agent,
    World,
}

impl Scope {
    pub const ALL: [Scope; 7] = [
        Scope::Private,
        Scope::Public,
        Scope::System,
        Scope::Local,
        Scope::Temp,
        Scope::Agent,
        Scope::World,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Private => "private",
            Scope::Public => "public",
            Scope::System => "system",
            Scope::Local => "local",
            Scope::Temp => "temp",
            Scope::Agent => "agent",
            Scope::World => "world",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Scope {
    type Err = DanaError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "private" => Ok(Scope::Private),
            "public" => Ok(Scope::Public),
            "system" => Ok(Scope::System),
            "local" => Ok(Scope::Local),
            "temp" => Ok(Scope::Temp),
            "agent" => Ok(Scope::Agent),
            "world" => Ok(Scope::World),
            other => Err(DanaError::state(format!("unknown scope: {other}"))),
        }
    }
}

/// Dictionary-of-dictionaries state store keyed by [`Scope`], with dotted-path
/// get/set and a per-scope `__last_value` slot.
#[derive(Debug, Default)]
pub struct StateStore {
    scopes: BTreeMap<Scope, BTreeMap<String, Value>>,
}

impl StateStore {
    pub fn new() -> Self {
        let mut scopes = BTreeMap::new();
        for scope in Scope::ALL {
            scopes.insert(scope, BTreeMap::new());
        }
        Self { scopes }
    }

    /// Reset all scopes to empty, as on explicit `reset()`.
    pub fn reset(&mut self) {
        for bucket in self.scopes.values_mut() {
            bucket.clear();
        }
    }

    /// Split a dotted path into `(scope, subkeys)`. The path must have at
    /// least one subkey: a bare scope name is never a valid reference.
    fn split_path(path: &str) -> Result<(Scope, Vec<&str>)> {
        let mut parts = path.split('.');
        let scope_name = parts
            .next()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| DanaError::state(format!("empty path: {path:?}")))?;
        let scope: Scope = scope_name.parse()?;
        let rest: Vec<&str> = parts.collect();
        if rest.is_empty() {
            return Err(DanaError::state(format!(
                "a scope name alone is not a valid reference: {path:?}"
            )));
        }
        Ok((scope, rest))
    }

    /// Get the value at `path`, or `default` if any segment is missing.
    pub fn get(&self, path: &str, default: Value) -> Value {
        let (scope, subkeys) = match Self::split_path(path) {
            Ok(v) => v,
            Err(_) => return default,
        };
        let bucket = match self.scopes.get(&scope) {
            Some(b) => b,
            None => return default,
        };

        let (first, rest) = subkeys.split_first().expect("non-empty by construction");
        let mut current = match bucket.get(*first) {
            Some(v) => v.clone(),
            None => return default,
        };

        for key in rest {
            current = match &current {
                Value::Map(m) => match m.borrow().get(*key) {
                    Some(v) => v.clone(),
                    None => return default,
                },
                _ => return default,
            };
        }
        current
    }

    /// Set the value at `path`, creating intermediate maps as needed, and
    /// update `scope.__last_value`.
    pub fn set(&mut self, path: &str, value: Value) -> Result<()> {
        let (scope, subkeys) = Self::split_path(path)?;
        if subkeys.last().copied() == Some(LAST_VALUE_KEY) {
            return Err(DanaError::state(format!(
                "{LAST_VALUE_KEY} is reserved and cannot be set directly: {path:?}"
            )));
        }
        let bucket = self
            .scopes
            .get_mut(&scope)
            .ok_or_else(|| DanaError::state(format!("unknown scope: {scope}")))?;

        let (last, init) = subkeys.split_last().expect("non-empty by construction");

        if init.is_empty() {
            bucket.insert((*last).to_string(), value.clone());
        } else {
            let (first, middle) = init.split_first().expect("non-empty");
            let root = bucket
                .entry((*first).to_string())
                .or_insert_with(|| Value::map(BTreeMap::new()));

            // Walk/create intermediate maps.
            let mut current = match root {
                Value::Map(m) => m.clone(),
                _ => {
                    let fresh = std::rc::Rc::new(std::cell::RefCell::new(BTreeMap::new()));
                    *root = Value::Map(fresh.clone());
                    fresh
                }
            };

            for key in middle {
                let next = {
                    let mut map = current.borrow_mut();
                    let entry = map
                        .entry((*key).to_string())
                        .or_insert_with(|| Value::map(BTreeMap::new()));
                    match entry {
                        Value::Map(m) => m.clone(),
                        _ => {
                            let fresh = std::rc::Rc::new(std::cell::RefCell::new(BTreeMap::new()));
                            *entry = Value::Map(fresh.clone());
                            fresh
                        }
                    }
                };
                current = next;
            }

            current.borrow_mut().insert((*last).to_string(), value.clone());
        }

        bucket.insert(LAST_VALUE_KEY.to_string(), value);
        Ok(())
    }

    /// Bypass the `__last_value` update; used internally for bookkeeping
    /// writes that should not shadow the user-visible last-value slot.
    pub fn set_raw(&mut self, scope: Scope, key: &str, value: Value) {
        self.scopes.entry(scope).or_default().insert(key.to_string(), value);
    }
}

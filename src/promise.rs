//! Promise / eager-resolve deferred values
//!
//! A [`Promise`] wraps the result of an LLM call that runs off the REPL's
//! synchronous control path. It is created already pending (backed by a
//! channel fed by a background task), already resolved (deterministic
//! fallback responses), or already failed.

use std::cell::RefCell;
use std::fmt;
use std::sync::mpsc::Receiver;

use crate::error::{DanaError, Result};
use crate::value::Value;

enum Inner {
    Pending(Receiver<std::result::Result<String, String>>),
    Resolved(Value),
    Failed(String),
}

/// A deferred value. See module docs.
pub struct Promise {
    label: String,
    inner: RefCell<Inner>,
}

impl Promise {
    /// A promise backed by a channel that a background task will eventually fill.
    pub fn pending(label: impl Into<String>, rx: Receiver<std::result::Result<String, String>>) -> Self {
        Self {
            label: label.into(),
            inner: RefCell::new(Inner::Pending(rx)),
        }
    }

    /// A promise that is already resolved, used for deterministic fallback
    /// responses when no LLM resource is configured.
    pub fn resolved(label: impl Into<String>, value: Value) -> Self {
        Self {
            label: label.into(),
            inner: RefCell::new(Inner::Resolved(value)),
        }
    }

    /// A promise that is already failed.
    pub fn failed(label: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            inner: RefCell::new(Inner::Failed(message.into())),
        }
    }

    /// Block until the promise reaches a terminal state, returning the value
    /// or propagating the failure as a `DanaError::Runtime`.
    pub fn resolve(&self) -> Result<Value> {
        let needs_recv = matches!(&*self.inner.borrow(), Inner::Pending(_));
        if needs_recv {
            let received = {
                let inner = self.inner.borrow();
                let Inner::Pending(rx) = &*inner else {
                    unreachable!("checked above");
                };
                rx.recv()
            };
            let outcome = match received {
                Ok(Ok(text)) => Inner::Resolved(Value::Str(text)),
                Ok(Err(msg)) => Inner::Failed(msg),
                Err(_) => Inner::Failed("LLM worker channel closed unexpectedly".to_string()),
            };
            *self.inner.borrow_mut() = outcome;
        }

        match &*self.inner.borrow() {
            Inner::Resolved(v) => Ok(v.clone()),
            Inner::Failed(msg) => Err(DanaError::runtime(msg.clone())),
            Inner::Pending(_) => unreachable!("resolved above"),
        }
    }

    /// Non-blocking short description. Opportunistically advances a pending
    /// promise if the background task has already finished, but never blocks.
    pub fn get_display_info(&self) -> String {
        {
            let should_try = matches!(&*self.inner.borrow(), Inner::Pending(_));
            if should_try {
                let attempt = {
                    let inner = self.inner.borrow();
                    let Inner::Pending(rx) = &*inner else {
                        unreachable!()
                    };
                    rx.try_recv().ok()
                };
                if let Some(outcome) = attempt {
                    *self.inner.borrow_mut() = match outcome {
                        Ok(text) => Inner::Resolved(Value::Str(text)),
                        Err(msg) => Inner::Failed(msg),
                    };
                }
            }
        }

        match &*self.inner.borrow() {
            Inner::Pending(_) => format!("<Promise[{}] pending>", self.label),
            Inner::Resolved(v) => format!("<Promise[{}] resolved: {}>", self.label, v),
            Inner::Failed(msg) => format!("<Promise[{}] failed: {}>", self.label, msg),
        }
    }

    /// Register a callback to run once the promise reaches a terminal state.
    /// Because the REPL has no background event loop of its own, registering
    /// a callback forces resolution immediately: a callback registered after
    /// resolution simply runs right away, exactly as the spec requires.
    pub fn add_on_delivery_callback(&self, cb: impl FnOnce(Result<Value>)) {
        cb(self.resolve());
    }

    pub fn is_pending(&self) -> bool {
        matches!(&*self.inner.borrow(), Inner::Pending(_))
    }
}

impl fmt::Display for Promise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.resolve() {
            Ok(v) => write!(f, "{v}"),
            Err(e) => write!(f, "LLM error: {e}"),
        }
    }
}

impl fmt::Debug for Promise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Promise({})", self.get_display_info())
    }
}

//! Call descriptions: the logical identity a fixture is keyed by.

use fixturegpt_core::{Fingerprint, Mode, Payload};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// A named call with captured arguments.
///
/// Arguments are resolved to JSON when they are added; a value with no JSON
/// form contributes its `Debug` text instead.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    name: String,
    args: Vec<Value>,
    kwargs: BTreeMap<String, Value>,
    mode: Option<Mode>,
}

impl Call {
    /// Start describing a call
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
            kwargs: BTreeMap::new(),
            mode: None,
        }
    }

    /// Append a positional argument.
    ///
    /// A value with no JSON form is fingerprinted by its `Debug` text. That
    /// text is only as stable as the type's `Debug` output: a `HashMap` with
    /// non-string keys prints in a per-process order, so such arguments should
    /// be passed as a `BTreeMap` or converted to JSON first.
    #[must_use]
    pub fn arg<T>(mut self, value: &T) -> Self
    where
        T: Serialize + fmt::Debug + ?Sized,
    {
        self.args.push(Payload::capture(value).into_value());
        self
    }

    /// Set a keyword argument, replacing any earlier value for `key`
    #[must_use]
    pub fn kwarg<T>(mut self, key: impl Into<String>, value: &T) -> Self
    where
        T: Serialize + fmt::Debug + ?Sized,
    {
        self.kwargs
            .insert(key.into(), Payload::capture(value).into_value());
        self
    }

    /// Override the configured mode for this call only
    #[must_use]
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Call label
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Positional arguments
    #[must_use]
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Keyword arguments
    #[must_use]
    pub fn kwargs(&self) -> &BTreeMap<String, Value> {
        &self.kwargs
    }

    /// Per-call mode override
    #[must_use]
    pub const fn mode(&self) -> Option<Mode> {
        self.mode
    }

    /// Fingerprint of name and arguments
    #[must_use]
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of(&self.name, &self.args, &self.kwargs)
    }
}

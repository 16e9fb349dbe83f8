//! Environment lookups and `${NAME}` substitution for configuration values.
//!
//! Provider identifiers (comment-service repository ids and the like) are
//! usually kept out of the committed configuration file. A string value such as
//! `"${GISCUS_REPO}"` is replaced with the value of that variable when the
//! configuration is loaded. An unset variable becomes the empty string.

use std::collections::HashMap;

/// Source of environment values.
pub trait EnvSource {
    /// Look up a variable by name.
    fn var(&self, name: &str) -> Option<String>;
}

/// The process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// A fixed set of variables, mostly useful in tests.
#[derive(Debug, Clone, Default)]
pub struct MapEnv(HashMap<String, String>);

impl MapEnv {
    /// Create an empty environment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a variable.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }
}

impl EnvSource for MapEnv {
    fn var(&self, name: &str) -> Option<String> {
        self.0.get(name).cloned()
    }
}

/// Replace every `${NAME}` in `text` with the value of `NAME`.
///
/// Unset variables expand to nothing. An unterminated `${` is copied through
/// unchanged.
pub fn interpolate(text: &str, env: &dyn EnvSource) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];

        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };

        let name = after[..end].trim();
        match env.var(name) {
            Some(value) => out.push_str(&value),
            None => tracing::debug!(var = name, "environment variable not set, using empty value"),
        }
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    out
}

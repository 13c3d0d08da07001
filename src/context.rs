//! Request-scoped metadata handed to the error handler.
//!
//! A [`Context`] is an immutable list of `(key, value)` pairs. Adding a value
//! produces a new context and leaves the parent untouched, so one context can
//! be shared by every boundary of a request.
//!
//! Keys are `&'static str`: metadata keys are compile-time constants
//! (`"request_id"`, `"user"`), which keeps the schema greppable. Values may
//! be owned, and owned values are zeroized on drop because request metadata
//! regularly carries session tokens.
//!
//! # Example
//!
//! ```rust
//! use caused_by::Context;
//!
//! let ctx = Context::background()
//!     .with_value("request_id", "r-42")
//!     .with_value("user", String::from("ada"));
//!
//! assert_eq!(ctx.value("user"), Some("ada"));
//! assert!(Context::background().is_background());
//! ```

use smallvec::SmallVec;
use std::borrow::Cow;
use std::fmt;
use zeroize::Zeroize;

// ============================================================================
// Context Value
// ============================================================================

/// A metadata value. Owned text is zeroized on drop, static text is left
/// alone since it lives in program memory.
#[derive(Clone, PartialEq, Eq)]
pub struct ContextValue {
    value: Cow<'static, str>,
}

impl ContextValue {
    /// The value as text.
    #[inline]
    pub fn as_str(&self) -> &str {
        self.value.as_ref()
    }
}

impl From<&'static str> for ContextValue {
    fn from(value: &'static str) -> Self {
        Self {
            value: Cow::Borrowed(value),
        }
    }
}

impl From<String> for ContextValue {
    fn from(value: String) -> Self {
        Self {
            value: Cow::Owned(value),
        }
    }
}

impl From<Cow<'static, str>> for ContextValue {
    fn from(value: Cow<'static, str>) -> Self {
        Self { value }
    }
}

impl Zeroize for ContextValue {
    fn zeroize(&mut self) {
        if let Cow::Owned(ref mut s) = self.value {
            s.zeroize();
        }
    }
}

impl Drop for ContextValue {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl fmt::Debug for ContextValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}

impl fmt::Display for ContextValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Context
// ============================================================================

/// Immutable request metadata.
///
/// The empty context is the *background* context, substituted by
/// [`handle`](crate::handle) when the caller has none.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Context {
    values: SmallVec<[(&'static str, ContextValue); 4]>,
}

impl Context {
    /// The empty root context.
    #[inline]
    pub fn background() -> Self {
        Self::default()
    }

    /// A copy of this context with `key` set to `value`.
    ///
    /// An existing key is shadowed, not replaced: [`Context::value`] returns
    /// the most recent one.
    #[must_use]
    pub fn with_value(&self, key: &'static str, value: impl Into<ContextValue>) -> Self {
        let mut values = self.values.clone();
        values.push((key, value.into()));
        Self { values }
    }

    /// The most recently set value for `key`.
    pub fn value(&self, key: &str) -> Option<&str> {
        self.values
            .iter()
            .rev()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    /// True for a context without any values.
    #[inline]
    pub fn is_background(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of stored pairs, shadowed ones included.
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Same as [`Context::is_background`].
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> + '_ {
        self.values.iter().map(|(k, v)| (*k, v.as_str()))
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_background() {
            return f.write_str("Context::background");
        }
        f.debug_map().entries(self.iter()).finish()
    }
}

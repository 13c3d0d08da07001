//! Full-detail rendering for logs.
//!
//! # Output Format
//!
//! A classified error renders as its message and stack. Each inner error
//! follows after a separator, down to the first unclassified inner error
//! (rendered as its message only) or the end of the chain:
//!
//! ```text
//! outer message
//! src/api.rs:40 (0x55d0c4a1b2c3)
//!     app::api::handle
//! ...
//!
//! Inner error:
//! inner message
//! src/db.rs:12 (0x55d0c4a1a0f0)
//!     app::db::query
//! ...
//! ```
//!
//! A panic payload carries no stack of its own, so non-error payloads are
//! rendered with the stack of the *current* call site instead.
//!
//! # Bounds
//!
//! Chains are walked at most [`MAX_CHAIN_DEPTH`] levels deep; anything
//! beyond is replaced by [`TRUNCATION_INDICATOR`].

use crate::classify::{self, CausedByError};
use crate::stack::{self, StackCapture};
use crate::Recovered;
use std::any::Any;
use std::borrow::Cow;
use std::error::Error as StdError;
use std::panic::Location;

/// Maximum number of chain levels rendered by [`for_log_error`].
pub const MAX_CHAIN_DEPTH: usize = 32;

/// Maximum length of a single recorded field.
pub const MAX_FIELD_OUTPUT_LEN: usize = 1024;

/// Marker appended wherever output was cut short.
pub const TRUNCATION_INDICATOR: &str = "...[TRUNCATED]";

/// Placed between an error and its inner error.
pub const INNER_SEPARATOR: &str = "\nInner error:\n";

/// Rendered in place of a panic payload that is neither an error nor text.
const OPAQUE_PAYLOAD: &str = "Box<dyn Any>";

// ============================================================================
// Formatters
// ============================================================================

/// Render a recovered value, error or panic payload.
#[track_caller]
pub fn for_log(value: &Recovered) -> String {
    match value {
        Recovered::Error(err) => for_log_error(err.as_ref()),
        Recovered::Panic(payload) => for_log_panic(&**payload),
    }
}

/// Render an error and its inner chain.
///
/// A plain, unclassified error renders as its message only.
///
/// ```rust
/// use caused_by::{for_log_error, wrap, bug, CausedBy};
///
/// let err = wrap(CausedBy::ByRuntime, bug("foo"), "bar");
/// let rendered = for_log_error(&err);
/// assert!(rendered.starts_with("bar\n"));
/// assert!(rendered.contains("\nInner error:\nfoo\n"));
///
/// let plain = std::io::Error::other("foo");
/// assert_eq!(for_log_error(&plain), "foo");
/// ```
pub fn for_log_error(err: &(dyn StdError + 'static)) -> String {
    match classify::as_classified(err) {
        Some(classified) => render_chain(classified),
        None => err.to_string(),
    }
}

/// Render a value recovered from `catch_unwind`.
///
/// Errors (classified or boxed) render like [`for_log_error`]. String and
/// primitive payloads render as their text followed by the current stack;
/// other payloads as `Box<dyn Any>` followed by the current stack.
#[track_caller]
pub fn for_log_panic(value: &(dyn Any + Send)) -> String {
    if let Some(recovered) = value.downcast_ref::<Recovered>() {
        return for_log(recovered);
    }
    if let Some(err) = classify::any_as_error(value) {
        return for_log_error(err);
    }
    if let Some(classified) = classify::as_classified_any(value) {
        return render_chain(classified);
    }

    let text = classify::payload_text(value);
    format!(
        "{}\n{}",
        text.as_deref().unwrap_or(OPAQUE_PAYLOAD),
        current_stack(Location::caller())
    )
}

fn render_chain(mut current: &dyn CausedByError) -> String {
    let mut out = current.error_stack();
    let mut depth = 1;
    while let Some(inner) = current.inner() {
        out.push_str(INNER_SEPARATOR);
        if depth == MAX_CHAIN_DEPTH {
            out.push_str(TRUNCATION_INDICATOR);
            break;
        }
        depth += 1;
        match classify::as_classified(inner) {
            Some(next) => {
                out.push_str(&next.error_stack());
                current = next;
            }
            None => {
                out.push_str(&inner.to_string());
                break;
            }
        }
    }
    out
}

fn current_stack(location: &'static Location<'static>) -> String {
    stack::render_with_caller(StackCapture::capture().frames(), location)
}

// ============================================================================
// Truncation
// ============================================================================

/// Cut `s` to at most [`MAX_FIELD_OUTPUT_LEN`] bytes.
pub(crate) fn truncate_with_indicator(s: &str) -> Cow<'_, str> {
    truncate_to(s, MAX_FIELD_OUTPUT_LEN)
}

/// Cut `s` to at most `max_len` bytes, on a character boundary, ending with
/// [`TRUNCATION_INDICATOR`]. Borrows when nothing needs cutting.
pub(crate) fn truncate_to(s: &str, max_len: usize) -> Cow<'_, str> {
    if s.len() <= max_len {
        return Cow::Borrowed(s);
    }
    if max_len <= TRUNCATION_INDICATOR.len() {
        return Cow::Borrowed(&TRUNCATION_INDICATOR[..max_len]);
    }

    let mut idx = max_len.saturating_sub(TRUNCATION_INDICATOR.len());
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }

    if idx == 0 {
        return Cow::Borrowed(TRUNCATION_INDICATOR);
    }

    let mut result = String::with_capacity(idx + TRUNCATION_INDICATOR.len());
    result.push_str(&s[..idx]);
    result.push_str(TRUNCATION_INDICATOR);
    Cow::Owned(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{bug, input, new_runtime, wrap, BoxError, CausedBy, Error};
    use std::io;

    #[test]
    fn classified_renders_message_then_stack() {
        let rendered = for_log_error(&bug("foo"));
        assert!(rendered.starts_with("foo\n"));
        assert!(rendered.len() > "foo\n".len());
    }

    #[test]
    fn plain_error_renders_message_only() {
        assert_eq!(for_log_error(&io::Error::other("foo")), "foo");
    }

    #[test]
    fn chain_ends_at_first_plain_error() {
        let err = new_runtime(io::Error::other("disk"));
        let rendered = for_log_error(&err);
        assert!(rendered.starts_with("disk\n"));
        assert!(rendered.ends_with("\nInner error:\ndisk"));
        assert_eq!(rendered.matches(INNER_SEPARATOR).count(), 1);
    }

    #[test]
    fn chain_depth_is_capped() {
        let mut err: Error = input("root");
        for level in 0..40 {
            err = wrap(CausedBy::ByInput, err, format!("level {level}"));
        }
        let rendered = for_log_error(&err);
        assert!(rendered.starts_with("level 39\n"));
        assert!(rendered.ends_with(TRUNCATION_INDICATOR));
        assert_eq!(rendered.matches(INNER_SEPARATOR).count(), MAX_CHAIN_DEPTH);
        assert!(!rendered.contains("level 0\n"));
    }

    #[test]
    fn text_payload_gets_current_stack() {
        let rendered = for_log_panic(&"boom");
        assert!(rendered.starts_with("boom\n"));
        assert!(rendered.len() > "boom\n".len());

        let rendered = for_log_panic(&String::from("owned"));
        assert!(rendered.starts_with("owned\n"));
    }

    #[test]
    fn primitive_payload_renders_its_value() {
        assert!(for_log_panic(&1i32).starts_with("1\n"));
        assert!(for_log_panic(&42u64).starts_with("42\n"));
        assert!(for_log_panic(&false).starts_with("false\n"));
    }

    #[test]
    fn opaque_payload_is_named() {
        let rendered = for_log_panic(&vec![1i32]);
        assert!(rendered.starts_with("Box<dyn Any>\n"));
    }

    #[test]
    fn error_payload_renders_as_error() {
        let boxed: BoxError = Box::new(io::Error::other("plain"));
        assert_eq!(for_log_panic(&boxed), "plain");
        assert!(for_log_panic(&bug("typed")).starts_with("typed\n"));
    }

    #[test]
    fn recovered_dispatches_on_variant() {
        let from_err = Recovered::from(input("bad input"));
        assert!(for_log(&from_err).starts_with("bad input\n"));

        let from_panic = Recovered::panic(Box::new("oops"));
        assert!(for_log(&from_panic).starts_with("oops\n"));
    }

    #[test]
    fn truncate_ascii() {
        let s = "a".repeat(MAX_FIELD_OUTPUT_LEN + 10);
        let truncated = truncate_with_indicator(&s);
        assert!(truncated.len() <= MAX_FIELD_OUTPUT_LEN);
        assert!(truncated.ends_with(TRUNCATION_INDICATOR));
    }

    #[test]
    fn no_truncate_when_under_limit() {
        let truncated = truncate_with_indicator("short string");
        assert!(matches!(truncated, Cow::Borrowed(_)));
        assert_eq!(truncated, "short string");
    }

    #[test]
    fn truncate_utf8_boundary() {
        // 'й' is two bytes.
        let s = "й".repeat(MAX_FIELD_OUTPUT_LEN);
        let truncated = truncate_with_indicator(&s);
        assert!(truncated.len() <= MAX_FIELD_OUTPUT_LEN);
        assert!(truncated.ends_with(TRUNCATION_INDICATOR));
    }

    #[test]
    fn exactly_at_limit() {
        let s = "a".repeat(MAX_FIELD_OUTPUT_LEN);
        let truncated = truncate_with_indicator(&s);
        assert!(matches!(truncated, Cow::Borrowed(_)));
        assert_eq!(truncated.len(), MAX_FIELD_OUTPUT_LEN);
    }

    #[test]
    fn tiny_limit_never_overshoots() {
        assert_eq!(truncate_to("abcdefghijklmnopqrstuvwxyz", 4), "...[");
        assert_eq!(truncate_to("abc", 0), "");
        // Four-byte characters leave no boundary before the cut.
        assert_eq!(truncate_to("🔥🔥🔥🔥🔥🔥", 17), TRUNCATION_INDICATOR);
    }
}

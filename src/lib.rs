//! # caused_by
//!
//! Errors classified by **who is responsible for them**.
//!
//! ## Design Philosophy
//!
//! 1. **Every error has an owner**: a bug, the runtime, an external service,
//!    bad input, or a misbehaving client
//! 2. **Classification survives wrapping**: each wrap either keeps or
//!    deliberately overrides it, never drops it
//! 3. **Unclassified means bug**: a foreign error nobody annotated is treated
//!    as `ByBug`, so someone looks at it
//! 4. **Stacks are cheap until read**: raw addresses at construction,
//!    symbols on first format
//! 5. **Panics and errors share one taxonomy**: recovered payloads resolve
//!    through the same functions
//!
//! ## Reporting Policy
//!
//! | CausedBy      | Who fixes it        | Report to          |
//! |---------------|---------------------|--------------------|
//! | `ByBug`       | developers          | bug tracking       |
//! | `ByRuntime`   | operations          | health monitoring  |
//! | `ByExternal`  | the external party  | health monitoring  |
//! | `ByInput`     | the user            | nobody (return it) |
//! | `ByClientBug` | the client author   | nobody (return it) |
//!
//! This crate only classifies. Deciding exit codes, HTTP statuses or what
//! the user sees is left to the caller.
//!
//! ## Quick Start
//!
//! ```rust
//! use caused_by::{get_caused_by, input, CausedBy, Result, ResultExt};
//! use std::fs;
//!
//! fn parse_port(s: &str) -> Result<u16> {
//!     s.parse().map_err(|_| input(format!("not a port: {s}")))
//! }
//!
//! fn read_config(path: &str) -> Result<String> {
//!     // I/O failures are the runtime's fault.
//!     fs::read_to_string(path).runtime()
//! }
//!
//! let err = parse_port("http").unwrap_err();
//! assert_eq!(err.caused_by(), CausedBy::ByInput);
//! assert_eq!(err.to_string(), "not a port: http");
//!
//! let err = read_config("/definitely/not/here").unwrap_err();
//! assert_eq!(get_caused_by(Some(&err)), CausedBy::ByRuntime);
//! ```
//!
//! ## Wrapping
//!
//! Rewrapping always nests: the new error owns the old one as its inner
//! error and records its own stack, so logs show every site the error
//! passed through.
//!
//! ```rust
//! use caused_by::{external, for_log_error, new_bug, wrap, CausedBy};
//!
//! let lookup = external("dns timeout");
//! let outer = wrap(CausedBy::ByRuntime, lookup, "resolve upstream");
//!
//! assert_eq!(outer.caused_by(), CausedBy::ByRuntime);
//! assert!(for_log_error(&outer).contains("\nInner error:\ndns timeout\n"));
//!
//! let rewrapped = new_bug(outer);
//! assert_eq!(rewrapped.to_string(), "resolve upstream");
//! assert!(rewrapped.inner().is_some());
//! ```
//!
//! ## Reporting
//!
//! ```rust
//! use caused_by::{guard, runtime, Context};
//!
//! // Reports the error through the process-wide handler.
//! let out: Option<()> = guard(Some(&Context::background()), || Err(runtime("disk full")));
//! assert!(out.is_none());
//! ```
//!
//! ## Features
//!
//! - `tokio`: `guard_task`, a boundary guard for spawned tokio tasks

#![warn(missing_docs)]
#![warn(clippy::all)]

use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt;
use std::panic::Location;
use std::result;

pub mod boundary;
pub mod classify;
pub mod codes;
pub mod context;
pub mod convenience;
pub mod definitions;
pub mod handler;
pub mod logging;
pub mod recorder;
pub mod stack;

pub use boundary::*;
pub use classify::*;
pub use codes::*;
pub use context::*;
pub use convenience::*;
pub use definitions::*;
pub use handler::*;
pub use logging::*;
pub use recorder::*;
pub use stack::{StackCapture, StackFrame};

/// Boxed error accepted by every wrap constructor.
///
/// `&str` and `String` convert into it, which is how non-error values are
/// wrapped.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Result alias defaulting to this crate's [`Error`].
pub type Result<T, E = Error> = result::Result<T, E>;

/// A classified error: an optional inner error, an optional message
/// override, a [`Code`] and the stack captured where it was created.
///
/// Values are immutable once built. The only interior state is the resolved
/// frame cache inside [`StackCapture`], filled at most once.
///
/// Build them with the free functions in [`convenience`] (`bug`,
/// `new_runtime`, `wrap`, ...) or the [`ResultExt`]/[`OptionExt`]
/// adapters.
#[must_use = "errors should be returned, handled or logged"]
pub struct Error {
    inner: Option<BoxError>,
    msg: Option<Cow<'static, str>>,
    code: Code,
    stack: StackCapture,
    location: &'static Location<'static>,
}

impl Error {
    /// Single construction point: records the caller and the stack.
    ///
    /// # Panics
    ///
    /// If `code` is `NOT_ERROR` or otherwise carries the `NoError` cause; no
    /// constructed error may claim "no error".
    #[track_caller]
    #[inline(never)]
    pub(crate) fn build(code: Code, inner: Option<BoxError>, msg: Option<Cow<'static, str>>) -> Self {
        assert!(
            code.caused() != CausedBy::NoError,
            "NoError cannot classify an error"
        );
        Self {
            inner,
            msg,
            code,
            stack: StackCapture::capture(),
            location: Location::caller(),
        }
    }

    /// The attached classification code.
    #[inline]
    pub const fn code(&self) -> Code {
        self.code
    }

    /// Shorthand for `self.code().caused()`.
    #[inline]
    pub const fn caused_by(&self) -> CausedBy {
        self.code.caused()
    }

    /// The wrapped error, if any.
    #[inline]
    pub fn inner(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.inner.as_deref()
    }

    /// Consume the error, returning what it wrapped.
    pub fn into_inner(self) -> Option<BoxError> {
        self.inner
    }

    /// True if this error carries its own message instead of its inner
    /// error's.
    #[inline]
    pub fn has_override(&self) -> bool {
        self.msg.is_some()
    }

    /// The display message, borrowed when it is an override.
    pub fn message(&self) -> Cow<'_, str> {
        match (&self.msg, &self.inner) {
            (Some(msg), _) => Cow::Borrowed(msg.as_ref()),
            (None, Some(inner)) => Cow::Owned(inner.to_string()),
            (None, None) => Cow::Borrowed(""),
        }
    }

    /// Source location of the constructor call.
    #[inline]
    pub fn location(&self) -> &'static Location<'static> {
        self.location
    }

    /// The raw capture.
    #[inline]
    pub fn stack_capture(&self) -> &StackCapture {
        &self.stack
    }

    /// Resolved frames, caller first.
    pub fn stack_frames(&self) -> &[StackFrame] {
        self.stack.frames()
    }

    /// The stack rendered one `file:line (pc)` / function pair per frame.
    ///
    /// Led by the recorded caller location whenever the first frame carries
    /// no source file (release or stripped builds), so the call site is
    /// always named.
    pub fn stack(&self) -> String {
        stack::render_with_caller(self.stack.frames(), self.location)
    }

    /// Message, newline, then the stack. Inner errors are not included; see
    /// [`for_log_error`] for the whole chain.
    pub fn error_stack(&self) -> String {
        format!("{}\n{}", self.message(), self.stack())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.msg, &self.inner) {
            (Some(msg), _) => f.write_str(msg),
            (None, Some(inner)) => fmt::Display::fmt(inner, f),
            (None, None) => Ok(()),
        }
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Error")
            .field("code", &self.code)
            .field("message", &self.message())
            .field("location", &format_args!("{}", self.location))
            .field("inner", &self.inner)
            .field("stack", &self.stack)
            .finish()
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner.as_deref().map(|e| e as &(dyn StdError + 'static))
    }
}

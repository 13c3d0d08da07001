//! Constructors, formatting macros and `Result`/`Option` adapters.
//!
//! # Families
//!
//! | From          | Function                          | Message            |
//! |---------------|-----------------------------------|--------------------|
//! | text          | `bug`, `runtime`, ..., `caused`   | the text           |
//! | format string | `bugf!`, `runtimef!`, ...         | the formatted text |
//! | an error      | `new_bug`, `new_runtime`, ...     | the inner message  |
//! | error + text  | `wrap`, `wrapf!`, `wrap_panic`    | the new text       |
//!
//! Wrap constructors accept anything convertible into a boxed error,
//! including `&str` and `String`, so arbitrary text can be wrapped too.
//!
//! # Rewrapping
//!
//! Wrapping always nests: the previous value becomes the new error's inner
//! error and a fresh stack is recorded at the wrap site. When the requested
//! cause matches the inner error's cause, its full code (discriminator
//! included) is kept. Otherwise the general code of the new cause is used.
//!
//! ```rust
//! use caused_by::{coded, new_bug, new_input, Code, CausedBy};
//!
//! let first = coded(Code::new(CausedBy::ByInput, 9), "bad field");
//! let same = new_input(first);
//! assert_eq!(same.code().low(), 9);
//!
//! let other = new_bug(same);
//! assert_eq!(other.code(), Code::general(CausedBy::ByBug));
//! assert_eq!(other.to_string(), "bad field");
//! ```
//!
//! # Absent errors
//!
//! There is no null error in Rust, so "wrapping nothing yields nothing" is
//! expressed by the adapters: [`ResultExt`] leaves `Ok` untouched and
//! [`OptionExt`] leaves `None` untouched. Neither builds an [`Error`] in
//! that case.
//!
//! ```rust
//! use caused_by::{OptionExt, ResultExt};
//!
//! let fine: Result<u8, std::io::Error> = Ok(1);
//! assert_eq!(fine.runtime().unwrap(), 1);
//!
//! let nothing: Option<std::io::Error> = None;
//! assert!(nothing.runtime().is_none());
//! ```

use crate::classify::{self, CausedByError};
use crate::{
    BoxError, CausedBy, Code, Error, GENERAL_BY_BUG, GENERAL_BY_CLIENT_BUG,
    GENERAL_BY_EXTERNAL, GENERAL_BY_INPUT, GENERAL_BY_RUNTIME,
};
use std::any::Any;
use std::borrow::Cow;
use std::error::Error as StdError;

// ============================================================================
// Code Definition Macro
// ============================================================================

/// Define per-site codes sharing one cause.
///
/// Expands to one `pub const` [`Code`] per entry. Doc comments and other
/// attributes on entries are kept.
///
/// ```rust
/// use caused_by::{define_codes, CausedBy};
///
/// define_codes! {
///     CausedBy::ByExternal => {
///         /// Payment provider unreachable.
///         EXTERNAL_PAYMENT_DOWN = 1,
///         EXTERNAL_SMTP_REJECTED = 2,
///     }
/// }
///
/// assert_eq!(EXTERNAL_SMTP_REJECTED.caused(), CausedBy::ByExternal);
/// ```
#[macro_export]
macro_rules! define_codes {
    ($cause:expr => { $( $(#[$meta:meta])* $name:ident = $low:expr ),+ $(,)? }) => {
        $(
            $(#[$meta])*
            pub const $name: $crate::Code = $crate::Code::new($cause, $low);
        )+
    };
}

// ============================================================================
// Text Constructors
// ============================================================================

/// Create a `ByBug` error from text. Drop-in for an ad-hoc string error.
#[track_caller]
pub fn new(text: impl Into<Cow<'static, str>>) -> Error {
    coded(GENERAL_BY_BUG, text)
}

/// Create a `ByBug` error from text.
#[track_caller]
pub fn bug(text: impl Into<Cow<'static, str>>) -> Error {
    coded(GENERAL_BY_BUG, text)
}

/// Create a `ByRuntime` error from text.
#[track_caller]
pub fn runtime(text: impl Into<Cow<'static, str>>) -> Error {
    coded(GENERAL_BY_RUNTIME, text)
}

/// Create a `ByExternal` error from text.
#[track_caller]
pub fn external(text: impl Into<Cow<'static, str>>) -> Error {
    coded(GENERAL_BY_EXTERNAL, text)
}

/// Create a `ByInput` error from text.
#[track_caller]
pub fn input(text: impl Into<Cow<'static, str>>) -> Error {
    coded(GENERAL_BY_INPUT, text)
}

/// Create a `ByClientBug` error from text.
#[track_caller]
pub fn client_bug(text: impl Into<Cow<'static, str>>) -> Error {
    coded(GENERAL_BY_CLIENT_BUG, text)
}

/// Create an error of the given cause from text.
///
/// # Panics
///
/// If `cause` is [`CausedBy::NoError`].
#[track_caller]
pub fn caused(cause: CausedBy, text: impl Into<Cow<'static, str>>) -> Error {
    coded(Code::general(cause), text)
}

/// Create an error with an explicit per-site code.
///
/// # Panics
///
/// If `code` is [`NOT_ERROR`](crate::NOT_ERROR).
#[track_caller]
pub fn coded(code: Code, text: impl Into<Cow<'static, str>>) -> Error {
    Error::build(code, None, Some(text.into()))
}

// ============================================================================
// Formatting Macros
// ============================================================================

/// `bug` with a format string.
///
/// ```rust
/// let err = caused_by::bugf!("index {} out of range", 3);
/// assert_eq!(err.to_string(), "index 3 out of range");
/// ```
#[macro_export]
macro_rules! bugf {
    ($($arg:tt)+) => {
        $crate::bug(::std::format!($($arg)+))
    };
}

/// `runtime` with a format string.
#[macro_export]
macro_rules! runtimef {
    ($($arg:tt)+) => {
        $crate::runtime(::std::format!($($arg)+))
    };
}

/// `external` with a format string.
#[macro_export]
macro_rules! externalf {
    ($($arg:tt)+) => {
        $crate::external(::std::format!($($arg)+))
    };
}

/// `input` with a format string.
///
/// ```rust
/// use caused_by::{inputf, CausedBy};
///
/// let err = inputf!("foo {}", 3);
/// assert_eq!(err.to_string(), "foo 3");
/// assert_eq!(err.caused_by(), CausedBy::ByInput);
/// ```
#[macro_export]
macro_rules! inputf {
    ($($arg:tt)+) => {
        $crate::input(::std::format!($($arg)+))
    };
}

/// `client_bug` with a format string.
#[macro_export]
macro_rules! client_bugf {
    ($($arg:tt)+) => {
        $crate::client_bug(::std::format!($($arg)+))
    };
}

/// `caused` with a format string.
#[macro_export]
macro_rules! causedf {
    ($cause:expr, $($arg:tt)+) => {
        $crate::caused($cause, ::std::format!($($arg)+))
    };
}

/// `wrap` with a format string.
///
/// ```rust
/// use caused_by::{wrapf, CausedBy};
///
/// let inner = std::io::Error::other("foo");
/// let err = wrapf!(CausedBy::ByBug, inner, "foo {}", "bar");
/// assert_eq!(err.to_string(), "foo bar");
/// assert_eq!(err.inner().map(|e| e.to_string()).as_deref(), Some("foo"));
/// ```
#[macro_export]
macro_rules! wrapf {
    ($cause:expr, $err:expr, $($arg:tt)+) => {
        $crate::wrap($cause, $err, ::std::format!($($arg)+))
    };
}

// ============================================================================
// Wrap Constructors
// ============================================================================

/// Code for wrapping `inner` under `cause`: the inner code when the cause
/// already matches, the general code of `cause` otherwise.
fn rewrap_code(cause: CausedBy, inner: &(dyn StdError + 'static)) -> Code {
    match classify::as_classified(inner) {
        Some(classified) if CausedByError::caused_by(classified) == cause => {
            CausedByError::code(classified)
        }
        _ => Code::general(cause),
    }
}

/// Classify an existing error as `ByBug`.
#[track_caller]
pub fn new_bug<E: Into<BoxError>>(err: E) -> Error {
    new_caused(CausedBy::ByBug, err)
}

/// Classify an existing error as `ByRuntime`.
#[track_caller]
pub fn new_runtime<E: Into<BoxError>>(err: E) -> Error {
    new_caused(CausedBy::ByRuntime, err)
}

/// Classify an existing error as `ByExternal`.
#[track_caller]
pub fn new_external<E: Into<BoxError>>(err: E) -> Error {
    new_caused(CausedBy::ByExternal, err)
}

/// Classify an existing error as `ByInput`.
#[track_caller]
pub fn new_input<E: Into<BoxError>>(err: E) -> Error {
    new_caused(CausedBy::ByInput, err)
}

/// Classify an existing error as `ByClientBug`.
#[track_caller]
pub fn new_client_bug<E: Into<BoxError>>(err: E) -> Error {
    new_caused(CausedBy::ByClientBug, err)
}

/// Classify an existing error. The message is delegated to `err`.
///
/// # Panics
///
/// If `cause` is [`CausedBy::NoError`].
#[track_caller]
pub fn new_caused<E: Into<BoxError>>(cause: CausedBy, err: E) -> Error {
    let inner = err.into();
    let code = rewrap_code(cause, inner.as_ref());
    Error::build(code, Some(inner), None)
}

/// Attach an explicit code to an existing error, whatever it carried
/// before.
#[track_caller]
pub fn new_coded<E: Into<BoxError>>(code: Code, err: E) -> Error {
    Error::build(code, Some(err.into()), None)
}

/// Classify an existing error and replace its message with `text`.
///
/// ```rust
/// use caused_by::{wrap, CausedBy};
///
/// let err = wrap(CausedBy::ByBug, "foo", "bar");
/// assert_eq!(err.to_string(), "bar");
/// assert_eq!(err.inner().map(|e| e.to_string()).as_deref(), Some("foo"));
/// ```
#[track_caller]
pub fn wrap<E: Into<BoxError>>(
    cause: CausedBy,
    err: E,
    text: impl Into<Cow<'static, str>>,
) -> Error {
    let inner = err.into();
    let code = rewrap_code(cause, inner.as_ref());
    Error::build(code, Some(inner), Some(text.into()))
}

/// Like [`wrap`] for a payload recovered from `catch_unwind`.
///
/// A classified payload stays the inner error as is. String payloads become
/// a plain inner error with their text. Anything else becomes the text
/// `Box<dyn Any>`.
#[track_caller]
pub fn wrap_panic(
    cause: CausedBy,
    payload: Box<dyn Any + Send>,
    text: impl Into<Cow<'static, str>>,
) -> Error {
    wrap(cause, classify::payload_into_error(payload), text)
}

// ============================================================================
// Adapters
// ============================================================================

/// Classify the error side of a `Result`.
///
/// `Ok` passes through; no [`Error`] is built for it.
///
/// ```rust
/// use caused_by::{CausedBy, ResultExt};
///
/// let parsed: Result<u32, _> = "x".parse::<u32>().input();
/// assert_eq!(parsed.unwrap_err().caused_by(), CausedBy::ByInput);
/// ```
pub trait ResultExt<T> {
    /// Classify `Err` as `ByBug`.
    fn bug(self) -> Result<T, Error>;

    /// Classify `Err` as `ByRuntime`.
    fn runtime(self) -> Result<T, Error>;

    /// Classify `Err` as `ByExternal`.
    fn external(self) -> Result<T, Error>;

    /// Classify `Err` as `ByInput`.
    fn input(self) -> Result<T, Error>;

    /// Classify `Err` as `ByClientBug`.
    fn client_bug(self) -> Result<T, Error>;

    /// Classify `Err` with the given cause.
    fn caused(self, cause: CausedBy) -> Result<T, Error>;

    /// Attach an explicit code to `Err`.
    fn coded(self, code: Code) -> Result<T, Error>;

    /// Classify `Err` and replace its message.
    fn wrap_err<S: Into<Cow<'static, str>>>(self, cause: CausedBy, text: S) -> Result<T, Error>;
}

impl<T, E: Into<BoxError>> ResultExt<T> for Result<T, E> {
    #[track_caller]
    fn bug(self) -> Result<T, Error> {
        self.caused(CausedBy::ByBug)
    }

    #[track_caller]
    fn runtime(self) -> Result<T, Error> {
        self.caused(CausedBy::ByRuntime)
    }

    #[track_caller]
    fn external(self) -> Result<T, Error> {
        self.caused(CausedBy::ByExternal)
    }

    #[track_caller]
    fn input(self) -> Result<T, Error> {
        self.caused(CausedBy::ByInput)
    }

    #[track_caller]
    fn client_bug(self) -> Result<T, Error> {
        self.caused(CausedBy::ByClientBug)
    }

    // `match` rather than `map_err`: the caller location does not flow into
    // closures.
    #[track_caller]
    fn caused(self, cause: CausedBy) -> Result<T, Error> {
        match self {
            Ok(value) => Ok(value),
            Err(err) => Err(new_caused(cause, err)),
        }
    }

    #[track_caller]
    fn coded(self, code: Code) -> Result<T, Error> {
        match self {
            Ok(value) => Ok(value),
            Err(err) => Err(new_coded(code, err)),
        }
    }

    #[track_caller]
    fn wrap_err<S: Into<Cow<'static, str>>>(self, cause: CausedBy, text: S) -> Result<T, Error> {
        match self {
            Ok(value) => Ok(value),
            Err(err) => Err(wrap(cause, err, text)),
        }
    }
}

/// Classify an optional error. `None` stays `None`.
pub trait OptionExt {
    /// Classify as `ByBug`.
    fn bug(self) -> Option<Error>;

    /// Classify as `ByRuntime`.
    fn runtime(self) -> Option<Error>;

    /// Classify as `ByExternal`.
    fn external(self) -> Option<Error>;

    /// Classify as `ByInput`.
    fn input(self) -> Option<Error>;

    /// Classify as `ByClientBug`.
    fn client_bug(self) -> Option<Error>;

    /// Classify with the given cause.
    fn caused(self, cause: CausedBy) -> Option<Error>;

    /// Attach an explicit code.
    fn coded(self, code: Code) -> Option<Error>;

    /// Classify and replace the message.
    fn wrap_err<S: Into<Cow<'static, str>>>(self, cause: CausedBy, text: S) -> Option<Error>;
}

impl<E: Into<BoxError>> OptionExt for Option<E> {
    #[track_caller]
    fn bug(self) -> Option<Error> {
        self.caused(CausedBy::ByBug)
    }

    #[track_caller]
    fn runtime(self) -> Option<Error> {
        self.caused(CausedBy::ByRuntime)
    }

    #[track_caller]
    fn external(self) -> Option<Error> {
        self.caused(CausedBy::ByExternal)
    }

    #[track_caller]
    fn input(self) -> Option<Error> {
        self.caused(CausedBy::ByInput)
    }

    #[track_caller]
    fn client_bug(self) -> Option<Error> {
        self.caused(CausedBy::ByClientBug)
    }

    #[track_caller]
    fn caused(self, cause: CausedBy) -> Option<Error> {
        match self {
            Some(err) => Some(new_caused(cause, err)),
            None => None,
        }
    }

    #[track_caller]
    fn coded(self, code: Code) -> Option<Error> {
        match self {
            Some(err) => Some(new_coded(code, err)),
            None => None,
        }
    }

    #[track_caller]
    fn wrap_err<S: Into<Cow<'static, str>>>(self, cause: CausedBy, text: S) -> Option<Error> {
        match self {
            Some(err) => Some(wrap(cause, err, text)),
            None => None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

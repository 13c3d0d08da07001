//! Process-wide error handler.
//!
//! Boundaries (request handlers, task roots, `main`) pass whatever they
//! recovered, a returned error or a panic payload, to [`handle`]. It logs
//! the full rendering and then calls the single installed [`Handler`],
//! which decides where the report goes: bug tracking, health monitoring,
//! nowhere.
//!
//! # Initialization Contract
//!
//! [`set_handler`] is meant to be called once, during single-threaded
//! startup, before any error is reported. The registry sits behind an
//! `RwLock` so that a late call is still memory-safe, but swapping handlers
//! while reports are in flight is not a supported use.
//!
//! # Example
//!
//! ```rust
//! use caused_by::{handle, set_handler, input, Context, Recovered};
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! static REPORTED: AtomicUsize = AtomicUsize::new(0);
//!
//! set_handler(Some(Arc::new(|_ctx: &Context, value: &Recovered| {
//!     if value.caused_by().is_internal() {
//!         REPORTED.fetch_add(1, Ordering::Relaxed);
//!     }
//! })));
//!
//! handle(None, &Recovered::from(input("bad date")));
//! assert_eq!(REPORTED.load(Ordering::Relaxed), 0);
//! ```

use crate::classify::{self, CausedByError};
use crate::{
    logging, BoxError, CausedBy, Code, Context, Error, BUG_HANDLER_PANICKED, GENERAL_BY_BUG,
};
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Callback receiving every reported value.
pub type Handler = Arc<dyn Fn(&Context, &Recovered) + Send + Sync>;

// ============================================================================
// Recovered
// ============================================================================

/// A value recovered at a boundary: a returned error or a panic payload.
pub enum Recovered {
    /// An error returned through `Result`.
    Error(BoxError),
    /// A payload caught by `catch_unwind` (or a panicked task).
    Panic(Box<dyn Any + Send>),
}

impl Recovered {
    /// Wrap a returned error.
    pub fn error<E: Into<BoxError>>(err: E) -> Self {
        Self::Error(err.into())
    }

    /// Wrap a panic payload.
    pub fn panic(payload: Box<dyn Any + Send>) -> Self {
        Self::Panic(payload)
    }

    /// True for panic payloads.
    #[inline]
    pub fn is_panic(&self) -> bool {
        matches!(self, Self::Panic(_))
    }

    /// The value's classification capability, if it has one.
    pub fn classified(&self) -> Option<&dyn CausedByError> {
        match self {
            Self::Error(err) => classify::as_classified(err.as_ref()),
            Self::Panic(payload) => classify::as_classified_any(&**payload),
        }
    }

    /// Full code; `GENERAL_BY_BUG` when unclassified.
    pub fn code(&self) -> Code {
        self.classified().map_or(GENERAL_BY_BUG, |c| c.code())
    }

    /// Who caused it; `ByBug` when unclassified.
    pub fn caused_by(&self) -> CausedBy {
        self.code().caused()
    }

    /// One-line message, without stack.
    pub fn message(&self) -> String {
        match self {
            Self::Error(err) => err.to_string(),
            Self::Panic(payload) => panic_message(&**payload),
        }
    }

    /// Convert into an error value. Panic payloads are converted the same
    /// way [`wrap_panic`](crate::wrap_panic) does.
    pub fn into_error(self) -> BoxError {
        match self {
            Self::Error(err) => err,
            Self::Panic(payload) => classify::payload_into_error(payload),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = classify::payload_text(payload) {
        return text;
    }
    if let Some(err) = classify::any_as_error(payload) {
        return err.to_string();
    }
    match classify::as_classified_any(payload) {
        Some(classified) => classified.to_string(),
        None => "Box<dyn Any>".to_string(),
    }
}

impl From<Error> for Recovered {
    fn from(err: Error) -> Self {
        Self::Error(Box::new(err))
    }
}

impl From<BoxError> for Recovered {
    fn from(err: BoxError) -> Self {
        Self::Error(err)
    }
}

impl fmt::Debug for Recovered {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error(err) => f.debug_tuple("Error").field(err).finish(),
            Self::Panic(_) => f.debug_tuple("Panic").field(&self.message()).finish(),
        }
    }
}

impl fmt::Display for Recovered {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Installed handler; `None` means the default one.
static HANDLER: RwLock<Option<Handler>> = RwLock::new(None);

static TEST_MODE: AtomicBool = AtomicBool::new(false);

#[inline]
fn read_handler() -> RwLockReadGuard<'static, Option<Handler>> {
    match HANDLER.read() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[inline]
fn write_handler() -> RwLockWriteGuard<'static, Option<Handler>> {
    match HANDLER.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Allow [`set_handler`]`(None)`. For test harnesses only.
pub fn enable_test_mode() {
    TEST_MODE.store(true, Ordering::SeqCst);
}

/// Forbid [`set_handler`]`(None)` again.
pub fn disable_test_mode() {
    TEST_MODE.store(false, Ordering::SeqCst);
}

/// True under `cfg(test)` or after [`enable_test_mode`].
pub fn is_test_mode() -> bool {
    cfg!(test) || TEST_MODE.load(Ordering::SeqCst)
}

/// Install `handler`.
///
/// `None` restores the default handler, which is only allowed in test
/// mode.
///
/// # Panics
///
/// On `None` outside test mode: production code must never remove the
/// handler without supplying a replacement.
pub fn set_handler(handler: Option<Handler>) {
    match handler {
        Some(handler) => *write_handler() = Some(handler),
        None => {
            assert!(
                is_test_mode(),
                "set_handler(None) is only allowed in test mode"
            );
            *write_handler() = None;
        }
    }
}

/// Report a recovered value.
///
/// Logs the full [`for_log`](crate::for_log) rendering at `error` level,
/// substitutes [`Context::background`] for a missing context and calls the
/// installed handler exactly once.
///
/// A panicking handler does not take the boundary down with it: the panic
/// is caught and logged with code `BUG_HANDLER_PANICKED`.
#[track_caller]
pub fn handle(ctx: Option<&Context>, value: &Recovered) {
    let code = value.code();
    let detail = logging::for_log(value);
    tracing::error!(
        target: "caused_by",
        caused_by = %code.caused(),
        code = %code,
        "{}",
        detail
    );

    let background;
    let ctx = match ctx {
        Some(ctx) => ctx,
        None => {
            background = Context::background();
            &background
        }
    };

    // Clone out of the lock so the handler may itself call `set_handler`.
    let installed = read_handler().clone();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| match installed {
        Some(handler) => handler(ctx, value),
        None => default_handler(ctx, value),
    }));

    if let Err(payload) = outcome {
        tracing::error!(
            target: "caused_by",
            caused_by = %BUG_HANDLER_PANICKED.caused(),
            code = %BUG_HANDLER_PANICKED,
            "error handler panicked: {}",
            panic_message(&*payload)
        );
    }
}

/// The handler in effect until [`set_handler`] installs another: one
/// `warn` line with the message and its classification.
pub fn default_handler(ctx: &Context, value: &Recovered) {
    let code = value.code();
    tracing::warn!(
        target: "caused_by",
        caused_by = %code.caused(),
        code = %code,
        panic = value.is_panic(),
        context = ?ctx,
        "{}",
        logging::truncate_with_indicator(&value.message())
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{bug, external, input, register_classified};
    use std::io;

    #[test]
    fn recovered_error_classification() {
        let value = Recovered::from(external("api down"));
        assert!(!value.is_panic());
        assert_eq!(value.caused_by(), CausedBy::ByExternal);
        assert_eq!(value.message(), "api down");

        let plain = Recovered::error(io::Error::other("plain"));
        assert_eq!(plain.code(), GENERAL_BY_BUG);
    }

    #[test]
    fn recovered_panic_classification() {
        let text = Recovered::panic(Box::new("boom"));
        assert!(text.is_panic());
        assert_eq!(text.caused_by(), CausedBy::ByBug);
        assert_eq!(text.message(), "boom");

        let typed = Recovered::panic(Box::new(input("bad")));
        assert_eq!(typed.caused_by(), CausedBy::ByInput);
        assert_eq!(typed.message(), "bad");

        let number = Recovered::panic(Box::new(7u8));
        assert_eq!(number.message(), "7");
        assert_eq!(number.caused_by(), CausedBy::ByBug);

        let opaque = Recovered::panic(Box::new(vec![7u8]));
        assert_eq!(opaque.message(), "Box<dyn Any>");
        assert_eq!(format!("{:?}", opaque), "Panic(\"Box<dyn Any>\")");
    }

    #[test]
    fn into_error_keeps_classification() {
        let err = Recovered::panic(Box::new(bug("inner"))).into_error();
        assert_eq!(classify::get_caused_by(Some(err.as_ref())), CausedBy::ByBug);
        assert_eq!(err.to_string(), "inner");

        let err = Recovered::panic(Box::new(String::from("text"))).into_error();
        assert_eq!(err.to_string(), "text");
    }

    #[test]
    fn registered_panic_payload_message() {
        #[derive(Debug)]
        struct Flaky;

        impl fmt::Display for Flaky {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("flaky upstream")
            }
        }

        impl std::error::Error for Flaky {}

        impl CausedByError for Flaky {
            fn inner(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
                None
            }
            fn code(&self) -> Code {
                Code::new(CausedBy::ByExternal, 1)
            }
            fn error_stack(&self) -> String {
                "flaky upstream\n".to_string()
            }
        }

        register_classified::<Flaky>();
        let value = Recovered::panic(Box::new(Flaky));
        assert_eq!(value.message(), "flaky upstream");
        assert_eq!(value.caused_by(), CausedBy::ByExternal);
    }

    #[test]
    fn test_mode_is_on_under_cfg_test() {
        assert!(is_test_mode());
    }

    #[test]
    fn default_handler_accepts_any_value() {
        default_handler(&Context::background(), &Recovered::panic(Box::new(1u32)));
        default_handler(
            &Context::background().with_value("request_id", "r1"),
            &Recovered::from(bug("b")),
        );
    }
}

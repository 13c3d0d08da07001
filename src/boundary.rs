//! Boundary guards.
//!
//! A boundary is where errors stop propagating: a request handler, a worker
//! loop iteration, a spawned task, `main`. The guards here run a unit of
//! work, and anything that escapes it (an `Err` or a panic) is passed to
//! [`handle`] instead of travelling further.
//!
//! ```rust
//! use caused_by::{guard, report, input, Context, ResultExt};
//!
//! let ctx = Context::background().with_value("job", "import");
//!
//! let rows = guard(Some(&ctx), || "12".parse::<u32>().input());
//! assert_eq!(rows, Some(12));
//!
//! let failed: Option<u32> = report(Some(&ctx), Err(input("empty file")));
//! assert!(failed.is_none());
//! ```

use crate::{handle, BoxError, Context, Recovered};
use std::panic::{self, AssertUnwindSafe};

/// Run `f`, reporting an `Err` or a panic through [`handle`].
///
/// Returns the `Ok` value, or `None` once something was reported. The
/// closure is treated as unwind safe: a boundary abandons whatever state the
/// failed unit of work touched.
#[track_caller]
pub fn guard<T, E, F>(ctx: Option<&Context>, f: F) -> Option<T>
where
    F: FnOnce() -> Result<T, E>,
    E: Into<BoxError>,
{
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => Some(value),
        Ok(Err(err)) => {
            handle(ctx, &Recovered::error(err));
            None
        }
        Err(payload) => {
            handle(ctx, &Recovered::panic(payload));
            None
        }
    }
}

/// Report the error side of `result` through [`handle`].
///
/// Meant for the last error of a scope that has nobody left to return it
/// to, such as a failed `close` or `flush` in a destructor path.
#[track_caller]
pub fn report<T, E>(ctx: Option<&Context>, result: Result<T, E>) -> Option<T>
where
    E: Into<BoxError>,
{
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            handle(ctx, &Recovered::error(err));
            None
        }
    }
}

/// Spawn `future` on the tokio runtime and report its failure.
///
/// - an `Err` output is reported as is
/// - a panic is reported with its payload
/// - a cancelled task is reported as `RUNTIME_TASK_CANCELLED`
///
/// Must be awaited from within a tokio runtime.
#[cfg(feature = "tokio")]
pub async fn guard_task<T, E, Fut>(ctx: Option<&Context>, future: Fut) -> Option<T>
where
    Fut: std::future::Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Into<BoxError> + Send + 'static,
{
    match tokio::spawn(future).await {
        Ok(Ok(value)) => Some(value),
        Ok(Err(err)) => {
            handle(ctx, &Recovered::error(err));
            None
        }
        Err(join) if join.is_panic() => {
            handle(ctx, &Recovered::panic(join.into_panic()));
            None
        }
        Err(join) => {
            let cancelled = crate::new_coded(crate::RUNTIME_TASK_CANCELLED, join);
            handle(ctx, &Recovered::from(cancelled));
            None
        }
    }
}

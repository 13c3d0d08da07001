//! Classification resolvers.
//!
//! Resolution never looks at a concrete type directly. It asks whether a
//! value exposes the [`CausedByError`] capability:
//!
//! - [`Error`] always does
//! - any other type does once it is registered with
//!   [`register_classified`]
//!
//! Everything else is unclassified and resolves to `ByBug`.
//!
//! Rust cannot ask a `dyn Error` whether its concrete type implements some
//! other trait, so third-party types announce themselves once at
//! initialization. After that they are recognized everywhere: resolvers,
//! [`for_log_error`](crate::for_log_error), rewrap detection.
//!
//! # Example
//!
//! ```rust
//! use caused_by::{
//!     get_caused_by, register_classified, CausedBy, CausedByError, Code,
//! };
//! use std::{error, fmt};
//!
//! #[derive(Debug)]
//! struct QuotaExceeded;
//!
//! impl fmt::Display for QuotaExceeded {
//!     fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
//!         f.write_str("quota exceeded")
//!     }
//! }
//!
//! impl error::Error for QuotaExceeded {}
//!
//! impl CausedByError for QuotaExceeded {
//!     fn inner(&self) -> Option<&(dyn error::Error + Send + Sync + 'static)> {
//!         None
//!     }
//!     fn code(&self) -> Code {
//!         Code::new(CausedBy::ByExternal, 3)
//!     }
//!     fn error_stack(&self) -> String {
//!         format!("{self}\n")
//!     }
//! }
//!
//! register_classified::<QuotaExceeded>();
//! assert_eq!(get_caused_by(Some(&QuotaExceeded)), CausedBy::ByExternal);
//! ```

use crate::{BoxError, CausedBy, Code, Error, GENERAL_BY_BUG, NOT_ERROR, Recovered};
use std::any::{Any, TypeId};
use std::error::Error as StdError;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Capability of a classified error.
///
/// Any type implementing this (and registered, unless it is this crate's
/// [`Error`]) is recognized by the resolvers and the log formatter.
pub trait CausedByError: StdError + Send + Sync + 'static {
    /// The wrapped error, if any.
    fn inner(&self) -> Option<&(dyn StdError + Send + Sync + 'static)>;

    /// The classification code.
    fn code(&self) -> Code;

    /// Message plus captured call stack.
    fn error_stack(&self) -> String;

    /// The responsible party.
    fn caused_by(&self) -> CausedBy {
        self.code().caused()
    }
}

impl CausedByError for Error {
    fn inner(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        Error::inner(self)
    }

    fn code(&self) -> Code {
        Error::code(self)
    }

    fn error_stack(&self) -> String {
        Error::error_stack(self)
    }
}

// ============================================================================
// Registry
// ============================================================================

type FromError = for<'a> fn(&'a (dyn StdError + 'static)) -> Option<&'a dyn CausedByError>;
type FromAny = for<'a> fn(&'a (dyn Any + Send)) -> Option<&'a dyn CausedByError>;
type TakeBox = fn(Box<dyn Any + Send>) -> Result<BoxError, Box<dyn Any + Send>>;

#[derive(Clone, Copy)]
struct Classifier {
    type_id: TypeId,
    from_error: FromError,
    from_any: FromAny,
    take_box: TakeBox,
}

/// Registered third-party classified types. Written during initialization,
/// read on every resolution.
static CLASSIFIERS: RwLock<Vec<Classifier>> = RwLock::new(Vec::new());

#[inline]
fn read_classifiers() -> RwLockReadGuard<'static, Vec<Classifier>> {
    match CLASSIFIERS.read() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[inline]
fn write_classifiers() -> RwLockWriteGuard<'static, Vec<Classifier>> {
    match CLASSIFIERS.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn downcast_error<'a, T: CausedByError>(
    err: &'a (dyn StdError + 'static),
) -> Option<&'a dyn CausedByError> {
    err.downcast_ref::<T>().map(|e| e as &dyn CausedByError)
}

fn downcast_any<'a, T: CausedByError>(
    value: &'a (dyn Any + Send),
) -> Option<&'a dyn CausedByError> {
    value.downcast_ref::<T>().map(|e| e as &dyn CausedByError)
}

fn take_box<T: CausedByError>(value: Box<dyn Any + Send>) -> Result<BoxError, Box<dyn Any + Send>> {
    value.downcast::<T>().map(|e| e as BoxError)
}

/// Make `T` recognizable as a classified error.
///
/// Idempotent. Call during process initialization, before errors of type `T`
/// start flowing.
pub fn register_classified<T: CausedByError>() {
    let type_id = TypeId::of::<T>();
    if type_id == TypeId::of::<Error>() {
        return;
    }
    let mut classifiers = write_classifiers();
    if classifiers.iter().any(|c| c.type_id == type_id) {
        return;
    }
    classifiers.push(Classifier {
        type_id,
        from_error: downcast_error::<T>,
        from_any: downcast_any::<T>,
        take_box: take_box::<T>,
    });
}

/// True if `T` is this crate's [`Error`] or has been registered.
pub fn is_registered<T: CausedByError>() -> bool {
    let type_id = TypeId::of::<T>();
    type_id == TypeId::of::<Error>() || read_classifiers().iter().any(|c| c.type_id == type_id)
}

/// View an error through its classification capability, if it has one.
pub fn as_classified<'a>(err: &'a (dyn StdError + 'static)) -> Option<&'a dyn CausedByError> {
    if let Some(own) = err.downcast_ref::<Error>() {
        return Some(own);
    }
    let classifiers = read_classifiers();
    classifiers.iter().find_map(|c| (c.from_error)(err))
}

/// View an arbitrary value (typically a panic payload) through its
/// classification capability, if it has one.
///
/// Recognizes [`Error`], registered types, `Box<dyn Error + Send + Sync>`
/// and [`Recovered`].
pub fn as_classified_any(value: &(dyn Any + Send)) -> Option<&dyn CausedByError> {
    if let Some(own) = value.downcast_ref::<Error>() {
        return Some(own);
    }
    if let Some(boxed) = value.downcast_ref::<BoxError>() {
        return as_classified(boxed.as_ref());
    }
    if let Some(recovered) = value.downcast_ref::<Recovered>() {
        return recovered.classified();
    }
    let classifiers = read_classifiers();
    classifiers.iter().find_map(|c| (c.from_any)(value))
}

/// View a panic payload as an error, if it is one.
pub(crate) fn any_as_error<'a>(
    value: &'a (dyn Any + Send),
) -> Option<&'a (dyn StdError + 'static)> {
    if let Some(own) = value.downcast_ref::<Error>() {
        return Some(own);
    }
    if let Some(boxed) = value.downcast_ref::<BoxError>() {
        return Some(boxed.as_ref());
    }
    None
}

/// Text of a string or primitive payload, e.g. from `panic!("..")` or
/// `panic_any(42)`.
pub(crate) fn payload_text(value: &(dyn Any + Send)) -> Option<String> {
    if let Some(text) = value.downcast_ref::<&'static str>() {
        return Some((*text).to_string());
    }
    if let Some(text) = value.downcast_ref::<String>() {
        return Some(text.clone());
    }

    macro_rules! display_primitives {
        ($($ty:ty),+ $(,)?) => {
            $(
                if let Some(v) = value.downcast_ref::<$ty>() {
                    return Some(v.to_string());
                }
            )+
        };
    }
    display_primitives!(
        i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, bool, char,
    );
    None
}

/// Turn a panic payload into an error value.
///
/// Classified payloads keep their identity, string and primitive payloads
/// become their text and anything else becomes the fixed text
/// `Box<dyn Any>`.
pub(crate) fn payload_into_error(payload: Box<dyn Any + Send>) -> BoxError {
    let payload = match payload.downcast::<Error>() {
        Ok(own) => return own,
        Err(other) => other,
    };
    let payload = match payload.downcast::<BoxError>() {
        Ok(boxed) => return *boxed,
        Err(other) => other,
    };
    let payload = match payload.downcast::<String>() {
        Ok(text) => return (*text).into(),
        Err(other) => other,
    };
    let mut payload = match payload.downcast::<&'static str>() {
        Ok(text) => return (*text).into(),
        Err(other) => other,
    };
    if let Some(text) = payload_text(&*payload) {
        return text.into();
    }
    let take: Vec<TakeBox> = read_classifiers().iter().map(|c| c.take_box).collect();
    for take_box in take {
        match take_box(payload) {
            Ok(classified) => return classified,
            Err(other) => payload = other,
        }
    }
    "Box<dyn Any>".into()
}

// ============================================================================
// Resolvers
// ============================================================================

/// Who caused `err`.
///
/// - `None` resolves to `NoError`
/// - a classified error resolves to its code's cause
/// - anything else resolves to `ByBug`
pub fn get_caused_by(err: Option<&(dyn StdError + 'static)>) -> CausedBy {
    get_error_code(err).caused()
}

/// Who caused a recovered panic.
///
/// Pass the payload from `catch_unwind` as `Some(&*payload)`. Non-error
/// payloads resolve to `ByBug`, `None` to `NoError`.
pub fn get_panic_caused_by(value: Option<&(dyn Any + Send)>) -> CausedBy {
    get_code(value).caused()
}

/// Full code of an arbitrary value.
///
/// `None` gives [`NOT_ERROR`], unclassified values [`GENERAL_BY_BUG`].
pub fn get_code(value: Option<&(dyn Any + Send)>) -> Code {
    match value {
        None => NOT_ERROR,
        Some(value) => as_classified_any(value).map_or(GENERAL_BY_BUG, |c| c.code()),
    }
}

/// Full code of an error. Same defaults as [`get_code`].
pub fn get_error_code(err: Option<&(dyn StdError + 'static)>) -> Code {
    match err {
        None => NOT_ERROR,
        Some(err) => as_classified(err).map_or(GENERAL_BY_BUG, |c| c.code()),
    }
}

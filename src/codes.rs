//! Responsibility classes and packed error codes.
//!
//! Every classified error carries a [`Code`]: a `u32` whose top byte is a
//! [`CausedBy`] value and whose low 24 bits are a free-form discriminator
//! chosen by the error site.
//!
//! # Layout
//!
//! ```text
//! ┌──────────────┬──────────────────────────────────────┐
//! │ CausedBy (8) │ discriminator (24)                   │
//! │ 0x01 .. 0x06 │ 0x000000 .. 0xFFFFFF                 │
//! └──────────────┴──────────────────────────────────────┘
//! ```
//!
//! The cause byte starts at `1`, so `Code(0)` is free to mean "no error"
//! ([`NOT_ERROR`](crate::NOT_ERROR)) and never collides with a real
//! `(cause, 0)` pair.
//!
//! # Example
//!
//! ```rust
//! use caused_by::{CausedBy, Code};
//!
//! const INPUT_MISSING_FIELD: Code = Code::new(CausedBy::ByInput, 7);
//!
//! assert_eq!(INPUT_MISSING_FIELD.caused(), CausedBy::ByInput);
//! assert_eq!(INPUT_MISSING_FIELD.low(), 7);
//! assert_eq!(INPUT_MISSING_FIELD.to_string(), "ByInput-000007");
//! ```

use std::fmt;

/// Bit offset of the cause byte inside a [`Code`].
pub const CAUSE_SHIFT: u32 = 24;

/// Mask selecting the cause byte of a [`Code`].
pub const CAUSE_MASK: u32 = 0xFF00_0000;

/// Mask selecting the discriminator of a [`Code`].
pub const LOW_MASK: u32 = 0x00FF_FFFF;

// ============================================================================
// CausedBy
// ============================================================================

/// Who is responsible for an error.
///
/// The discriminants are pre-shifted into the top byte so a `CausedBy` is
/// also the general [`Code`] of its family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u32)]
pub enum CausedBy {
    /// A programmer error. Report to bug tracking and apologize to the user;
    /// never show the detail verbatim.
    ByBug = 1 << CAUSE_SHIFT,

    /// OS, hardware or runtime failure: out of memory, disk read failure,
    /// a broken network interface. Report to health monitoring.
    ByRuntime = 2 << CAUSE_SHIFT,

    /// A depended-on external service or the network between us failed.
    /// Report to health monitoring; tell the user briefly who failed.
    ByExternal = 3 << CAUSE_SHIFT,

    /// Bad input. Return it with precise detail, no internal reporting.
    ByInput = 4 << CAUSE_SHIFT,

    /// Malformed request from client software rather than a human. Surface
    /// it to the client, no internal escalation.
    ByClientBug = 5 << CAUSE_SHIFT,

    /// Returned by the resolvers when there is no error at all. Never the
    /// classification of a constructed error.
    NoError = 6 << CAUSE_SHIFT,
}

impl CausedBy {
    /// Every value, including [`CausedBy::NoError`].
    pub const ALL: [CausedBy; 6] = [
        CausedBy::ByBug,
        CausedBy::ByRuntime,
        CausedBy::ByExternal,
        CausedBy::ByInput,
        CausedBy::ByClientBug,
        CausedBy::NoError,
    ];

    /// The five classes a real error can carry.
    pub const ERRORS: [CausedBy; 5] = [
        CausedBy::ByBug,
        CausedBy::ByRuntime,
        CausedBy::ByExternal,
        CausedBy::ByInput,
        CausedBy::ByClientBug,
    ];

    /// Raw pre-shifted value.
    #[inline]
    pub const fn bits(self) -> u32 {
        self as u32
    }

    /// Decode a cause byte that has already been shifted into place.
    ///
    /// Returns `None` for any value that is not exactly one of the variants.
    #[inline]
    pub const fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            0x0100_0000 => Some(Self::ByBug),
            0x0200_0000 => Some(Self::ByRuntime),
            0x0300_0000 => Some(Self::ByExternal),
            0x0400_0000 => Some(Self::ByInput),
            0x0500_0000 => Some(Self::ByClientBug),
            0x0600_0000 => Some(Self::NoError),
            _ => None,
        }
    }

    /// Stable name used in logs and `Display`.
    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ByBug => "ByBug",
            Self::ByRuntime => "ByRuntime",
            Self::ByExternal => "ByExternal",
            Self::ByInput => "ByInput",
            Self::ByClientBug => "ByClientBug",
            Self::NoError => "NoError",
        }
    }

    /// True for the classes whose errors should reach internal reporting
    /// (bug tracking or health monitoring).
    #[inline]
    pub const fn is_internal(self) -> bool {
        matches!(self, Self::ByBug | Self::ByRuntime | Self::ByExternal)
    }

    /// True if an error of this class may be shown to the caller verbatim.
    #[inline]
    pub const fn is_caller_visible(self) -> bool {
        matches!(self, Self::ByInput | Self::ByClientBug)
    }
}

impl fmt::Display for CausedBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Code Violations
// ============================================================================

/// Rejected input to [`Code::checked_new`] or [`Code::from_raw`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeError {
    /// Discriminator does not fit in 24 bits.
    LowOutOfRange {
        /// The rejected value.
        value: u32,
    },
    /// `NoError` cannot classify an error.
    NotAnErrorCause,
    /// The top byte of a raw code is not a known cause.
    UnknownCause {
        /// The rejected raw code.
        raw: u32,
    },
}

impl fmt::Display for CodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LowOutOfRange { value } => {
                write!(f, "code discriminator {:#x} exceeds 24 bits", value)
            }
            Self::NotAnErrorCause => f.write_str("NoError cannot classify an error"),
            Self::UnknownCause { raw } => {
                write!(f, "code {:#010x} has no known cause byte", raw)
            }
        }
    }
}

impl std::error::Error for CodeError {}

// ============================================================================
// Code
// ============================================================================

/// A packed classification code: cause byte plus 24-bit discriminator.
///
/// # Construction APIs
///
/// - [`Code::new`]: `const`, masks the discriminator to 24 bits
/// - [`Code::checked_new`]: rejects out-of-range input instead of masking
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Code(u32);

impl Code {
    /// Combine a cause with a discriminator.
    ///
    /// Bits of `low` above 24 are dropped so the cause byte can never be
    /// corrupted.
    ///
    /// # Panics
    ///
    /// Panics (at compile time in const contexts) if `cause` is
    /// [`CausedBy::NoError`].
    #[inline]
    pub const fn new(cause: CausedBy, low: u32) -> Self {
        assert!(
            !matches!(cause, CausedBy::NoError),
            "NoError cannot classify an error"
        );
        Self(cause.bits() | (low & LOW_MASK))
    }

    /// Runtime-validated constructor.
    ///
    /// # Errors
    ///
    /// [`CodeError::LowOutOfRange`] if `low` needs more than 24 bits,
    /// [`CodeError::NotAnErrorCause`] for `NoError`.
    #[inline]
    pub fn checked_new(cause: CausedBy, low: u32) -> Result<Self, CodeError> {
        if cause == CausedBy::NoError {
            return Err(CodeError::NotAnErrorCause);
        }
        if low > LOW_MASK {
            return Err(CodeError::LowOutOfRange { value: low });
        }
        Ok(Self(cause.bits() | low))
    }

    /// Reinterpret a raw `u32`, e.g. one read back from a log or a wire
    /// format.
    ///
    /// # Errors
    ///
    /// [`CodeError::UnknownCause`] when the top byte is not a known cause,
    /// [`CodeError::NotAnErrorCause`] when it is `NoError`. `0` is accepted
    /// and yields [`NOT_ERROR`](crate::NOT_ERROR).
    pub fn from_raw(raw: u32) -> Result<Self, CodeError> {
        if raw == 0 {
            return Ok(Self(0));
        }
        match CausedBy::from_bits(raw & CAUSE_MASK) {
            Some(CausedBy::NoError) => Err(CodeError::NotAnErrorCause),
            Some(_) => Ok(Self(raw)),
            None => Err(CodeError::UnknownCause { raw }),
        }
    }

    #[doc(hidden)]
    pub const fn __not_error() -> Self {
        Self(0)
    }

    /// The cause byte as a [`CausedBy`].
    ///
    /// `NOT_ERROR` yields `NoError`. A top byte that is not a known cause
    /// can only come from `from_raw` misuse and falls back to `ByBug`.
    #[inline]
    pub const fn caused(self) -> CausedBy {
        if self.0 == 0 {
            return CausedBy::NoError;
        }
        match CausedBy::from_bits(self.0 & CAUSE_MASK) {
            Some(cause) => cause,
            None => CausedBy::ByBug,
        }
    }

    /// The 24-bit discriminator.
    #[inline]
    pub const fn low(self) -> u32 {
        self.0 & LOW_MASK
    }

    /// Raw packed value.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// True for [`NOT_ERROR`](crate::NOT_ERROR).
    #[inline]
    pub const fn is_not_error(self) -> bool {
        self.0 == 0
    }

    /// The general code of `cause`'s family (discriminator `0`).
    #[inline]
    pub const fn general(cause: CausedBy) -> Self {
        Self::new(cause, 0)
    }
}

impl From<CausedBy> for Code {
    fn from(cause: CausedBy) -> Self {
        Self::general(cause)
    }
}

impl From<Code> for u32 {
    fn from(code: Code) -> Self {
        code.0
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_not_error() {
            return f.write_str("NotError");
        }
        write!(f, "{}-{:06x}", self.caused(), self.low())
    }
}

impl fmt::Debug for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Code")
            .field("caused", &self.caused())
            .field("low", &self.low())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

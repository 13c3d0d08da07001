//! Pre-defined codes.
//!
//! # General codes
//!
//! Each [`CausedBy`] family has a general code with discriminator `0`. The
//! plain constructors (`bug`, `new_input`, ...) attach these.
//!
//! # Per-site codes
//!
//! Applications give individual error sites their own discriminator with
//! [`define_codes!`](crate::define_codes):
//!
//! ```rust
//! use caused_by::{define_codes, CausedBy};
//!
//! define_codes! {
//!     CausedBy::ByInput => {
//!         INPUT_MISSING_FIELD = 1,
//!         INPUT_BAD_DATE      = 2,
//!     }
//! }
//!
//! assert_eq!(INPUT_BAD_DATE.low(), 2);
//! ```
//!
//! # Governance
//!
//! Discriminators in `ranges::CRATE_START..=ranges::CRATE_END` are reserved
//! for codes emitted by this crate itself. Applications should stay below
//! `ranges::CRATE_START`.

use crate::{define_codes, CausedBy, Code};

/// Discriminator ranges.
pub mod ranges {
    /// First discriminator available to applications (after the general `0`).
    pub const APP_START: u32 = 0x00_0001;
    /// Last discriminator available to applications.
    pub const APP_END: u32 = 0xFE_FFFF;
    /// First discriminator reserved for this crate.
    pub const CRATE_START: u32 = 0xFF_0000;
    /// Last discriminator reserved for this crate.
    pub const CRATE_END: u32 = 0xFF_FFFF;
}

/// Returned by [`get_code`](crate::get_code) for an absent value.
pub const NOT_ERROR: Code = Code::__not_error();

/// General `ByBug` code, also the default for unclassified errors.
pub const GENERAL_BY_BUG: Code = Code::general(CausedBy::ByBug);

/// General `ByRuntime` code.
pub const GENERAL_BY_RUNTIME: Code = Code::general(CausedBy::ByRuntime);

/// General `ByExternal` code.
pub const GENERAL_BY_EXTERNAL: Code = Code::general(CausedBy::ByExternal);

/// General `ByInput` code.
pub const GENERAL_BY_INPUT: Code = Code::general(CausedBy::ByInput);

/// General `ByClientBug` code.
pub const GENERAL_BY_CLIENT_BUG: Code = Code::general(CausedBy::ByClientBug);

// -----------------------------------------------------------------------------
// Crate-emitted codes (0xFF0000 - 0xFFFFFF)
// -----------------------------------------------------------------------------
define_codes! {
    CausedBy::ByRuntime => {
        /// A guarded task was cancelled before it produced a result.
        RUNTIME_TASK_CANCELLED = 0xFF_0001,
    }
}

define_codes! {
    CausedBy::ByBug => {
        /// The installed handler panicked while handling a report.
        BUG_HANDLER_PANICKED = 0xFF_0001,
    }
}

//! Call-stack capture with lazy symbol resolution.
//!
//! Capturing only walks the stack and records raw instruction pointers.
//! Symbolication (file, line, function) is expensive and happens on first
//! request, after which the frames are cached in a `OnceLock`.
//!
//! # Frame Stripping
//!
//! The walk starts inside the unwinder, so the first frames always belong to
//! the capture machinery and to this crate's constructors. At resolution
//! time the leading run of such frames (plus `core`/`std` glue between
//! them, e.g. `Result::map_err`) is dropped, so the first rendered frame is
//! the code that created the error.
//!
//! # Example
//!
//! ```rust
//! use caused_by::stack::StackCapture;
//!
//! let stack = StackCapture::capture();
//! assert!(!stack.program_counters().is_empty());
//! // Symbols are resolved here, once.
//! let rendered = stack.to_string();
//! # let _ = rendered;
//! ```

use smallvec::SmallVec;
use std::ffi::c_void;
use std::fmt;
use std::panic::Location;
use std::sync::OnceLock;

/// Maximum number of frames kept after internal frames are stripped.
pub const MAX_STACK_DEPTH: usize = 50;

/// Extra raw frames walked to cover the internal frames that get stripped.
pub const CAPTURE_HEADROOM: usize = 16;

/// Placeholder for a frame whose symbol could not be resolved.
const UNKNOWN: &str = "???";

/// Symbol prefixes that belong to the capture path.
const INTERNAL_PREFIXES: &[&str] = &["backtrace::", "<backtrace::", "caused_by::", "<caused_by::"];

/// Symbol prefixes of standard-library glue between internal frames.
const GLUE_PREFIXES: &[&str] = &[
    "core::", "<core::", "std::", "<std::", "alloc::", "<alloc::", "_Unwind", "__rust",
];

// ============================================================================
// Stack Frame
// ============================================================================

/// A resolved program location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackFrame {
    /// Source file, if debug info is available.
    pub file: Option<String>,
    /// Source line, if debug info is available.
    pub line: Option<u32>,
    /// Raw instruction pointer.
    pub pc: usize,
    /// Demangled function name without the trailing hash.
    pub function: String,
}

impl StackFrame {
    fn unresolved(pc: usize) -> Self {
        Self {
            file: None,
            line: None,
            pc,
            function: UNKNOWN.to_string(),
        }
    }

    /// True if this frame belongs to the capture path of this crate or the
    /// unwinder.
    pub fn is_internal(&self) -> bool {
        is_internal_symbol(&self.function)
    }
}

impl fmt::Display for StackFrame {
    /// `file:line (pc)` followed by the indented function name.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{}:{} ({:#x})",
            self.file.as_deref().unwrap_or(UNKNOWN),
            self.line.unwrap_or(0),
            self.pc
        )?;
        writeln!(f, "\t{}", self.function)
    }
}

fn is_internal_symbol(function: &str) -> bool {
    if function.contains("::tests::") {
        return false;
    }
    INTERNAL_PREFIXES.iter().any(|p| function.starts_with(p))
        || function.contains(" as caused_by::")
        || function.contains(" as backtrace::")
}

fn is_glue_symbol(function: &str) -> bool {
    GLUE_PREFIXES.iter().any(|p| function.starts_with(p))
        || function.contains(" as core::ops::function::")
}

// ============================================================================
// Stack Capture
// ============================================================================

/// Raw call-site addresses plus a lazily filled frame cache.
pub struct StackCapture {
    pcs: SmallVec<[usize; 32]>,
    frames: OnceLock<Vec<StackFrame>>,
}

impl StackCapture {
    /// Record the current call stack.
    ///
    /// Never inlined so the stripping logic always sees a stable frame for
    /// this function.
    #[inline(never)]
    pub fn capture() -> Self {
        let limit = MAX_STACK_DEPTH + CAPTURE_HEADROOM;
        let mut pcs = SmallVec::new();
        backtrace::trace(|frame| {
            pcs.push(frame.ip() as usize);
            pcs.len() < limit
        });
        Self {
            pcs,
            frames: OnceLock::new(),
        }
    }

    /// A capture with no frames.
    pub fn empty() -> Self {
        Self {
            pcs: SmallVec::new(),
            frames: OnceLock::new(),
        }
    }

    /// Raw addresses as captured, internal frames included.
    #[inline]
    pub fn program_counters(&self) -> &[usize] {
        &self.pcs
    }

    /// True if nothing was captured.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pcs.is_empty()
    }

    /// True once the frames have been symbolicated.
    #[inline]
    pub fn is_resolved(&self) -> bool {
        self.frames.get().is_some()
    }

    /// Resolved frames with internal frames stripped, at most
    /// [`MAX_STACK_DEPTH`].
    ///
    /// The first call pays for symbolication. Concurrent first calls block on
    /// the same initialization.
    pub fn frames(&self) -> &[StackFrame] {
        self.frames.get_or_init(|| resolve_frames(&self.pcs))
    }
}

fn resolve_frames(pcs: &[usize]) -> Vec<StackFrame> {
    let mut frames = Vec::with_capacity(pcs.len());
    for &pc in pcs {
        let before = frames.len();
        backtrace::resolve(pc as *mut c_void, |symbol| {
            frames.push(StackFrame {
                file: symbol.filename().map(|p| p.display().to_string()),
                line: symbol.lineno(),
                pc,
                function: symbol
                    .name()
                    .map(|name| format!("{:#}", name))
                    .unwrap_or_else(|| UNKNOWN.to_string()),
            });
        });
        if frames.len() == before {
            frames.push(StackFrame::unresolved(pc));
        }
    }

    strip_frames(frames)
}

/// Drop the leading internal run and cap the depth. Without a single
/// resolved symbol nothing can be told apart, so nothing is kept.
fn strip_frames(mut frames: Vec<StackFrame>) -> Vec<StackFrame> {
    if frames.iter().all(|f| f.function == UNKNOWN) {
        return Vec::new();
    }
    let skip = leading_internal_frames(&frames);
    frames.drain(..skip);
    frames.truncate(MAX_STACK_DEPTH);
    frames
}

/// Render `frames` in call order, led by a `file:line:col (caller)` line for
/// `caller` unless the first frame already names its source file.
pub fn render_with_caller(frames: &[StackFrame], caller: &Location<'_>) -> String {
    let mut out = String::new();
    if frames.first().is_none_or(|f| f.file.is_none()) {
        out.push_str(&format!("{} (caller)\n", caller));
    }
    for frame in frames {
        out.push_str(&frame.to_string());
    }
    out
}

/// Length of the leading run to strip: internal frames and the glue between
/// them, ending at the last internal frame of that run.
fn leading_internal_frames(frames: &[StackFrame]) -> usize {
    let mut end = 0;
    for (idx, frame) in frames.iter().enumerate() {
        if frame.is_internal() {
            end = idx + 1;
        } else if !is_glue_symbol(&frame.function) {
            break;
        }
    }
    end
}

impl fmt::Display for StackCapture {
    /// Frames joined in call order, innermost first.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for frame in self.frames() {
            write!(f, "{}", frame)?;
        }
        Ok(())
    }
}

impl fmt::Debug for StackCapture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StackCapture")
            .field("depth", &self.pcs.len())
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

//! Bounded in-memory record of handled reports.
//!
//! A [`Recorder`] keeps the most recent reports in a fixed-size ring with
//! FIFO eviction. Install [`Recorder::handler`] to capture everything that
//! reaches [`handle`](crate::handle), then inspect it from a status page, a
//! crash dump or a test.
//!
//! # Properties
//!
//! - **Bounded memory**: fixed entry count, every field capped in bytes
//! - **FIFO eviction**: the oldest report goes first
//! - **Cheap reads**: fields are `Arc<str>`, cloning a report only bumps
//!   reference counts
//! - **RwLock**: concurrent readers, exclusive writers
//!
//! # Example
//!
//! ```rust
//! use caused_by::{handle, runtime, set_handler, CausedBy, Recorder, Recovered};
//!
//! let recorder = Recorder::new(100, 2048);
//! set_handler(Some(recorder.handler()));
//!
//! handle(None, &Recovered::from(runtime("disk full")));
//!
//! let recent = recorder.recent(1);
//! assert_eq!(recent[0].caused_by, CausedBy::ByRuntime);
//! assert_eq!(&*recent[0].message, "disk full");
//! ```

use crate::logging::{self, truncate_to};
use crate::{CausedBy, Code, Context, Handler, Recovered};
use smallvec::SmallVec;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Cap on a single context value.
const MAX_CONTEXT_VALUE_LEN: usize = 128;

/// Cap on the one-line message.
const MAX_MESSAGE_LEN: usize = 512;

/// One recorded report.
#[derive(Clone, Debug)]
pub struct Report {
    /// Who caused it.
    pub caused_by: CausedBy,
    /// Full code.
    pub code: Code,
    /// True if it was a panic rather than a returned error.
    pub panic: bool,
    /// One-line message.
    pub message: Arc<str>,
    /// Full [`for_log`](crate::for_log) rendering, stacks included.
    pub detail: Arc<str>,
    /// Context pairs at the time of the report.
    pub context: Arc<[(Arc<str>, Arc<str>)]>,
}

struct Ring {
    entries: Box<[Option<Report>]>,
    head: usize,
    tail: usize,
    len: usize,
}

impl Ring {
    fn new(capacity: usize) -> Self {
        Self {
            entries: std::iter::repeat_with(|| None)
                .take(capacity)
                .collect::<Box<[Option<Report>]>>(),
            head: 0,
            tail: 0,
            len: 0,
        }
    }

    /// Returns the evicted report, if the ring was full.
    fn push(&mut self, report: Report) -> Option<Report> {
        let evicted = self.entries[self.tail].replace(report);
        self.tail = (self.tail + 1) % self.entries.len();
        if self.len < self.entries.len() {
            self.len += 1;
        } else {
            self.head = (self.head + 1) % self.entries.len();
        }
        evicted
    }

    /// Oldest first.
    fn iter(&self) -> impl DoubleEndedIterator<Item = &Report> {
        let head = self.head;
        let cap = self.entries.len();
        (0..self.len).filter_map(move |i| self.entries[(head + i) % cap].as_ref())
    }

    fn clear(&mut self) {
        for entry in self.entries.iter_mut() {
            *entry = None;
        }
        self.head = 0;
        self.tail = 0;
        self.len = 0;
    }
}

/// Fixed-capacity report ring. Clones share the same ring.
#[derive(Clone)]
pub struct Recorder {
    ring: Arc<RwLock<Ring>>,
    max_entries: usize,
    max_entry_bytes: usize,
    evictions: Arc<AtomicU64>,
}

impl Recorder {
    /// Keep at most `max_entries` reports (at least one), each field capped
    /// at `max_entry_bytes`.
    pub fn new(max_entries: usize, max_entry_bytes: usize) -> Self {
        let bounded = max_entries.max(1);
        Self {
            ring: Arc::new(RwLock::new(Ring::new(bounded))),
            max_entries: bounded,
            max_entry_bytes,
            evictions: Arc::new(AtomicU64::new(0)),
        }
    }

    #[inline]
    fn read_ring(&self) -> RwLockReadGuard<'_, Ring> {
        match self.ring.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    #[inline]
    fn write_ring(&self) -> RwLockWriteGuard<'_, Ring> {
        match self.ring.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Record a report, evicting the oldest when full.
    #[track_caller]
    pub fn record(&self, ctx: &Context, value: &Recovered) {
        let report = self.build_report(ctx, value);
        if self.write_ring().push(report).is_some() {
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[track_caller]
    fn build_report(&self, ctx: &Context, value: &Recovered) -> Report {
        let code = value.code();
        let message = value.message();
        let detail = logging::for_log(value);

        let mut remaining = self.max_entry_bytes;
        let mut pairs: SmallVec<[(Arc<str>, Arc<str>); 8]> = SmallVec::new();
        for (key, val) in ctx.iter() {
            if key.len() >= remaining {
                break;
            }
            let val = truncate_to(val, (remaining - key.len()).min(MAX_CONTEXT_VALUE_LEN));
            remaining -= key.len() + val.len();
            pairs.push((Arc::from(key), Arc::from(val.as_ref())));
        }

        Report {
            caused_by: code.caused(),
            code,
            panic: value.is_panic(),
            message: Arc::from(
                truncate_to(&message, self.max_entry_bytes.min(MAX_MESSAGE_LEN)).as_ref(),
            ),
            detail: Arc::from(truncate_to(&detail, self.max_entry_bytes).as_ref()),
            context: pairs.into_vec().into(),
        }
    }

    /// A [`Handler`] recording into this recorder.
    pub fn handler(&self) -> Handler {
        let recorder = self.clone();
        Arc::new(move |ctx: &Context, value: &Recovered| recorder.record(ctx, value))
    }

    /// The `count` most recent reports, newest first.
    pub fn recent(&self, count: usize) -> Vec<Report> {
        self.read_ring().iter().rev().take(count).cloned().collect()
    }

    /// Every report, newest first.
    pub fn all(&self) -> Vec<Report> {
        self.read_ring().iter().rev().cloned().collect()
    }

    /// Reports matching `predicate`, newest first.
    pub fn filtered<F>(&self, predicate: F) -> Vec<Report>
    where
        F: Fn(&Report) -> bool,
    {
        self.read_ring().iter().rev().filter(|r| predicate(r)).cloned().collect()
    }

    /// Number of stored reports.
    #[inline]
    pub fn len(&self) -> usize {
        self.read_ring().len
    }

    /// True when nothing is stored.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of stored reports.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.max_entries
    }

    /// Reports dropped to make room since creation.
    #[inline]
    pub fn eviction_count(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    /// Drop every stored report. The eviction count is kept.
    pub fn clear(&self) {
        self.write_ring().clear();
    }
}

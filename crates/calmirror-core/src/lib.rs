//! Core reconciliation engine: feed parsing, recurrence expansion,
//! override resolution and diffing.
//!
//! Everything in this crate is pure and deterministic: the only inputs are
//! feed text, a clock value supplied by the caller, and the remote mirror
//! listing. All I/O lives in the `calmirror-sync` and `calmirror-google`
//! crates.

pub mod diff;
pub mod event;
pub mod expand;
pub mod feed;
pub mod overrides;
pub mod time;

pub use diff::{DiffPlan, MirroredEvent, diff, restrict_to_relevance};
pub use event::{Frequency, NormalizedEvent, RecurrenceRule, instance_uid, unescape_text};
pub use expand::{expand_base, expand_events};
pub use feed::parse_feed;
pub use overrides::apply_overrides;
pub use time::{
    EventTime, TimeWindow, EXPANSION_LOOKAHEAD_DAYS, EXPANSION_LOOKBACK_DAYS,
    RELEVANCE_LOOKBACK_DAYS, normalize_timestamp, relevance_cutoff,
};

//! Trigger event parsing

pub mod jsonl;

pub use jsonl::{parse_event_line, read_events, ParsedEvents};

//! Test assertions for launch output and recorded events

use crate::fixtures::{Event, EventLog};

/// Assert that the launcher printed nothing
pub fn assert_no_debug_output(out: &[u8]) {
    assert!(
        out.is_empty(),
        "expected no debug output, got: {:?}",
        String::from_utf8_lossy(out)
    );
}

/// Assert that the launcher printed exactly `line` and nothing else
pub fn assert_single_line(out: &[u8], line: &str) {
    let text = String::from_utf8_lossy(out);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines, [line], "expected exactly one diagnostic line");
    assert!(text.ends_with('\n'), "diagnostic line should be newline-terminated");
}

/// Assert that the entry point ran exactly once and last
pub fn assert_entry_ran_once_last(log: &EventLog) {
    let events = log.events();
    assert_eq!(log.entry_count(), 1, "entry point should run exactly once: {events:?}");
    assert!(
        matches!(events.last(), Some(Event::Entry { .. })),
        "entry point should run last: {events:?}"
    );
}

/// Assert the exact recorded launch sequence
pub fn assert_events(log: &EventLog, expected: &[Event]) {
    assert_eq!(log.events(), expected, "unexpected launch sequence");
}

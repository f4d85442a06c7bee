//! Fixed-pattern matching over utterance text for delay and reminder intents
//!
//! Both tables are ordered: patterns are tried top to bottom and the first
//! hit wins, so earlier phrasings take precedence over the more general
//! ones below them. Callers rely on that ordering.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// A recognized request to defer the agent's next response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DelayRequest {
    pub delay_seconds: u64,
}

/// A recognized request to be reminded of a task after a duration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReminderRequest {
    pub duration_seconds: u64,
    pub task: String,
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("pattern compiles"))
        .collect()
}

static DELAY_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"(?i)wait for (?P<n>\d+) seconds?",
        r"(?i)delay (?:response|reply) by (?P<n>\d+) seconds?",
        r"(?i)pause for (?P<n>\d+) seconds?",
        r"(?i)hold for (?P<n>\d+) seconds?",
        r"(?i)wait (?P<n>\d+) seconds?",
        r"(?i)(?P<n>\d+) seconds? wait karo",
        r"(?i)(?P<n>\d+) seconds? ke baad jawab do",
        r"(?i)(?P<n>\d+) seconds? ruko",
    ])
});

static REMINDER_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"(?i)remind me in (?P<n>\d+) (?P<unit>second|minute|hour)s? to (?P<task>.+)",
        r"(?i)(?P<n>\d+) (?P<unit>second|minute|hour)s? ke baad yaad dila dena (?P<task>.+)",
        r"(?i)(?P<n>\d+) (?P<unit>second|minute|hour)s? baad (?P<task>.+?) yaad dila dena",
    ])
});

fn unit_multiplier(unit: &str) -> u64 {
    match unit.to_ascii_lowercase().as_str() {
        "minute" => 60,
        "hour" => 3600,
        _ => 1,
    }
}

// Utterances are short; anything that overflows u64 saturates.
fn parse_count(digits: &str) -> u64 {
    digits.parse().unwrap_or(u64::MAX)
}

/// Scan `text` for a response-delay request. `None` means no match,
/// never an error.
pub fn parse_delay(text: &str) -> Option<DelayRequest> {
    for pattern in DELAY_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(text) {
            return Some(DelayRequest {
                delay_seconds: parse_count(&caps["n"]),
            });
        }
    }
    None
}

/// Scan `text` for a reminder request. The task is the free-text remainder
/// captured by the matching pattern, trimmed and otherwise verbatim.
pub fn parse_reminder(text: &str) -> Option<ReminderRequest> {
    for pattern in REMINDER_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(text) {
            let count = parse_count(&caps["n"]);
            let multiplier = unit_multiplier(&caps["unit"]);
            return Some(ReminderRequest {
                duration_seconds: count.saturating_mul(multiplier),
                task: caps["task"].trim().to_string(),
            });
        }
    }
    None
}

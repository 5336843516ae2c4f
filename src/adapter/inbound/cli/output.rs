//! Terminal output for CLI handlers.
//!
//! Human-readable output uses colored symbols and indented fields. With
//! `--json` every helper emits one JSON line of the form
//! `{"type": ..., "payload": ...}` instead, so scripts can follow along.

use std::fmt::Display;

use owo_colors::OwoColorize;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde_json::{json, Value};

/// Output settings taken from the global CLI flags.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputConfig {
    /// One JSON line per event instead of text.
    pub json: bool,
    /// Only warnings, errors and command results.
    pub quiet: bool,
}

impl OutputConfig {
    #[must_use]
    pub const fn new(json: bool, quiet: bool) -> Self {
        Self { json, quiet }
    }
}

static OUTPUT: RwLock<OutputConfig> = parking_lot::const_rwlock(OutputConfig {
    json: false,
    quiet: false,
});

/// How an event is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Json,
    Text,
    Silent,
}

fn mode(always: bool) -> Mode {
    let config = *OUTPUT.read();
    if config.json {
        Mode::Json
    } else if config.quiet && !always {
        Mode::Silent
    } else {
        Mode::Text
    }
}

/// Emit `{"type": kind, "payload": payload}` in JSON mode, otherwise run
/// `text` unless quiet mode hides the event.
fn emit(kind: &str, always: bool, payload: impl FnOnce() -> Value, text: impl FnOnce()) {
    match mode(always) {
        Mode::Json => println!("{}", json!({ "type": kind, "payload": payload() })),
        Mode::Text => text(),
        Mode::Silent => {}
    }
}

/// Apply output settings from global CLI flags.
pub fn configure(config: OutputConfig) {
    *OUTPUT.write() = config;
}

/// Whether `--json` was given.
#[must_use]
pub fn is_json() -> bool {
    OUTPUT.read().json
}

/// Print the application name and version.
pub fn header(version: &str) {
    emit(
        "header",
        false,
        || json!({ "app": "krakenbot", "version": version }),
        || {
            println!("{} {}", "krakenbot".bold(), version.dimmed());
            println!();
        },
    );
}

/// Print a labeled value.
pub fn field(label: &str, value: impl Display) {
    let value = value.to_string();
    emit(
        "field",
        false,
        || json!({ "label": label, "value": value }),
        || println!("  {:<16} {}", label.dimmed(), value),
    );
}

/// Print a section title.
pub fn section(title: &str) {
    emit(
        "section",
        false,
        || json!({ "title": title }),
        || {
            println!();
            println!("{}", title.bold());
        },
    );
}

pub fn success(message: &str) {
    emit(
        "success",
        false,
        || json!({ "message": message }),
        || println!("  {} {}", "✓".green(), message),
    );
}

/// Print a warning; shown in quiet mode too.
pub fn warning(message: &str) {
    emit(
        "warning",
        true,
        || json!({ "message": message }),
        || println!("  {} {}", "⚠".yellow(), message),
    );
}

/// Print an error to stderr.
pub fn error(message: &str) {
    if is_json() {
        eprintln!("{}", json!({ "type": "error", "payload": { "message": message } }));
    } else {
        eprintln!("  {} {}", "×".red(), message);
    }
}

pub fn note(message: &str) {
    emit(
        "note",
        false,
        || json!({ "message": message }),
        || println!("  {}", message.dimmed()),
    );
}

/// Print a follow-up suggestion.
pub fn hint(message: &str) {
    emit(
        "hint",
        false,
        || json!({ "message": message }),
        || println!("  {}: {}", "hint".cyan().dimmed(), message.dimmed()),
    );
}

/// Print a rendered table or other multi-line block, indented.
pub fn lines(content: &str) {
    emit(
        "lines",
        false,
        || json!({ "content": content }),
        || {
            for line in content.lines() {
                println!("  {line}");
            }
        },
    );
}

/// Print a command's structured result as a single JSON document.
pub fn json_output(value: Value) {
    println!("{value}");
}

fn paint(value: impl Display, style: fn(&String) -> String) -> String {
    let value = value.to_string();
    if is_json() {
        value
    } else {
        style(&value)
    }
}

pub fn positive(value: impl Display) -> String {
    paint(value, |v| v.green().to_string())
}

pub fn negative(value: impl Display) -> String {
    paint(value, |v| v.red().to_string())
}

pub fn highlight(value: impl Display) -> String {
    paint(value, |v| v.cyan().to_string())
}

/// Signed P&L with two places, green above zero and red below.
pub fn pnl(value: Decimal) -> String {
    let text = format!("{:+.2}", value.round_dp(2));
    match value.cmp(&Decimal::ZERO) {
        std::cmp::Ordering::Greater => positive(text),
        std::cmp::Ordering::Less => negative(text),
        std::cmp::Ordering::Equal => text,
    }
}

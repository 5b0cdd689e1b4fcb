//! Terminal control-sequence stripping.
//!
//! Prompt comparison must happen on plain text: remote shells decorate
//! their output with CSI/OSC sequences and stray control bytes that would
//! defeat line equality checks.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref CONTROL_SEQ: Regex = Regex::new(
        r"(?x)
          \x1b \[ [0-9;?]* [\x20-/]* [@-~]     # CSI sequences
        | \x1b \] [^\x07\x1b]* (?:\x07|\x1b\\) # OSC sequences
        | \x1b [@-_]                           # two-byte ESC sequences
        | [\x00-\x08\x0b-\x1f\x7f]             # stray control bytes (keeps \t and \n)
        "
    )
    .expect("control sequence regex");
}

/// Remove terminal control sequences and stray control bytes.
///
/// Tabs and newlines survive; carriage returns do not, so callers can
/// split on `\n` without worrying about `\r\n` endings.
pub fn strip_controls(input: &str) -> String {
    CONTROL_SEQ.replace_all(input, "").into_owned()
}

/// The last line of `text` (content after the final `\n`).
pub fn last_line(text: &str) -> &str {
    match text.rfind('\n') {
        Some(pos) => &text[pos + 1..],
        None => text,
    }
}

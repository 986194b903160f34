//! Content cleaner: strips model preambles and garbled fragments from raw generations.
//!
//! Rules are declared once, in order, in `CLEAN_RULES`. Each rule runs exactly once per
//! `clean` call, in table order, so the expected transformation of any input can be read
//! straight off the table.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::trace;

/// A single `{pattern → replacement}` cleaning rule.
pub struct CleanRule {
    pub name: &'static str,
    pub pattern: Regex,
    pub replacement: &'static str,
}

impl CleanRule {
    fn new(name: &'static str, pattern: &str, replacement: &'static str) -> Self {
        Self {
            name,
            pattern: Regex::new(pattern).expect("valid regex"),
            replacement,
        }
    }

    pub fn apply(&self, text: &str) -> String {
        self.pattern.replace_all(text, self.replacement).into_owned()
    }
}

/// Ordered cleaning rules. Line endings are normalized first so later anchors see `\n` only.
pub static CLEAN_RULES: Lazy<Vec<CleanRule>> = Lazy::new(|| {
    vec![
        CleanRule::new("crlf", r"\r\n?", "\n"),
        CleanRule::new("code_fence", r"(?m)^[ \t]*```[A-Za-z]*[ \t]*$", ""),
        CleanRule::new(
            "apology_preamble",
            r"^\s*(?:申し訳(?:ありません|ございません)|すみません|(?i:i apologi[sz]e|sorry))[^\n]*\n+",
            "",
        ),
        CleanRule::new(
            "acknowledgement_preamble",
            r"^\s*(?:承知(?:いた)?しました|かしこまりました|了解(?:いた)?しました|はい[、。！!]|(?i:sure|certainly|of course|okay)\b)[^\n]*\n+",
            "",
        ),
        CleanRule::new(
            "here_is_preamble",
            r"^\s*(?:以下(?:は|が|に)[^\n]*(?:です|になります|ます)[。:：]?|(?i:here(?:'s| is| are)[^\n]*))\n+",
            "",
        ),
        CleanRule::new(
            "char_count_annotation",
            r"[（(]\s*(?:文字数[:：]?\s*)?\d+\s*(?:文字|字|(?i:chars?|characters?))\s*[）)]",
            "",
        ),
        CleanRule::new(
            "char_count_footer",
            r"(?m)^[ \t]*(?:文字数|(?i:character count))[ \t]*[:：][^\n]*$",
            "",
        ),
        CleanRule::new("markdown_bold", r"\*\*([^*\n]+)\*\*", "$1"),
        CleanRule::new("replacement_char", r"\x{FFFD}+", ""),
        CleanRule::new("dangling_hash", r"[ \t]*#[ \t]*\z", ""),
    ]
});

static RE_MULTI_NEWLINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

/// Cleans raw generated text. Pure; always returns a (possibly empty) string.
pub fn clean(raw: &str) -> String {
    let mut text = raw.to_string();
    for rule in CLEAN_RULES.iter() {
        let cleaned = rule.apply(&text);
        if cleaned != text {
            trace!(rule = rule.name, "clean rule matched");
        }
        text = cleaned;
    }
    RE_MULTI_NEWLINE
        .replace_all(&text, "\n\n")
        .trim()
        .to_string()
}

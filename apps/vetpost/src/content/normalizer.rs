//! Length normalizer: forces a post into its category's character window.
//!
//! The trailing tag is split off first and re-attached verbatim at the end; only the body
//! is ever shortened, extended or replaced. On return the result lies within the window
//! and ends with the tag (when the input carried one).

use once_cell::sync::Lazy;
use regex::Regex;

use super::models::{char_count, Category, LengthWindow};

/// Shorten/extend passes before the emergency step takes over.
pub const MAX_ADJUST_PASSES: usize = 5;

const SENTENCE_END: [char; 7] = ['。', '！', '？', '!', '?', '.', '\n'];

/// Category-specific material the normalizer pads with.
#[derive(Debug, Clone, Copy)]
pub struct TagProfile<'a> {
    pub tag: &'a str,
    /// Appended one at a time while the body is short.
    pub filler_phrases: &'a [&'a str],
    /// Repeated and cut to the exact shortfall once the phrases run out.
    pub long_filler: &'a str,
    /// Body used when a post cannot be brought into the window any other way.
    pub emergency_template: &'a str,
}

const CAT_FILLERS: &[&str] = &[
    "🐱",
    "愛猫の小さな変化に気づいてあげてくださいね。",
    "気になることがあれば早めに動物病院へ。",
];
const DOG_FILLERS: &[&str] = &[
    "🐕",
    "愛犬の健康管理に役立ててくださいね。",
    "気になることがあれば早めに動物病院へ。",
];

impl Category {
    pub fn profile(self) -> TagProfile<'static> {
        match self {
            Category::Cat => TagProfile {
                tag: self.tag(),
                filler_phrases: CAT_FILLERS,
                long_filler: "毎日の観察と早期発見が、大切な猫ちゃんの健康を守ります。",
                emergency_template: "愛猫の健康は毎日の観察から",
            },
            Category::Dog => TagProfile {
                tag: self.tag(),
                filler_phrases: DOG_FILLERS,
                long_filler: "毎日の積み重ねが、大切な愛犬の健康を守ります。",
                emergency_template: "愛犬の健康は毎日の積み重ねから",
            },
        }
    }
}

/// Ordered body-shortening rules: filler words first, then doubled whitespace.
static SHORTEN_RULES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    vec![
        (Regex::new(r"とても|非常に|本当に|すごく|かなり").expect("valid regex"), ""),
        (Regex::new(r"ぜひ|きっと|絶対に").expect("valid regex"), ""),
        (
            Regex::new(r"(?i)\b(?:very|really|truly|definitely|absolutely)\s+").expect("valid regex"),
            "",
        ),
        (Regex::new(r"[ \t\x{3000}]{2,}").expect("valid regex"), " "),
        (Regex::new(r"\n{3,}").expect("valid regex"), "\n\n"),
    ]
});

/// Normalizes `text` for `category` using its built-in profile.
pub fn normalize(text: &str, window: LengthWindow, category: Category) -> String {
    normalize_with(text, window, &category.profile())
}

pub fn normalize_with(text: &str, window: LengthWindow, profile: &TagProfile<'_>) -> String {
    let has_tag = text.contains(profile.tag);
    if window.contains(char_count(text)) && (!has_tag || text.ends_with(profile.tag)) {
        return text.to_string();
    }

    let (body, tag) = split_tag(text, profile.tag);
    let tag_len = char_count(tag);
    if tag_len > window.max {
        return tag.to_string();
    }

    let (core, sep) = split_trailing_whitespace(&body);
    let sep = if tag.is_empty() || tag_len + char_count(sep) > window.max {
        ""
    } else {
        sep
    };
    let reserved = tag_len + char_count(sep);
    let ceiling = window.max - reserved;
    let floor = window.min.saturating_sub(reserved);

    let mut core = core.to_string();
    for _ in 0..MAX_ADJUST_PASSES {
        let len = char_count(&core);
        if (floor..=ceiling).contains(&len) {
            break;
        }
        core = if len > ceiling {
            shorten(&core, ceiling)
        } else {
            extend(&core, floor, ceiling, profile)
        };
    }

    let len = char_count(&core);
    if len > ceiling {
        core = truncate_chars(&core, ceiling);
    } else if len < floor {
        let template = format!("{}・", profile.emergency_template);
        core = template.chars().cycle().take(floor).collect();
    }

    format!("{core}{sep}{tag}")
}

/// Splits off the last occurrence of `tag`. Text following the tag moves into the body.
/// Returns an empty tag when it is absent; a tag is never fabricated.
fn split_tag<'t>(text: &str, tag: &'t str) -> (String, &'t str) {
    let trimmed = text.trim_end();
    if tag.is_empty() {
        return (trimmed.to_string(), "");
    }
    match trimmed.rfind(tag) {
        Some(idx) => {
            let after = trimmed[idx + tag.len()..].trim();
            let mut body = trimmed[..idx].to_string();
            if !after.is_empty() {
                let keep = body.len() - body.trim_end().len();
                let ws = body[body.len() - keep..].to_string();
                body.truncate(body.len() - keep);
                body.push_str(after);
                body.push_str(&ws);
            }
            (body, tag)
        }
        None => (trimmed.to_string(), ""),
    }
}

fn split_trailing_whitespace(body: &str) -> (&str, &str) {
    let core = body.trim_end();
    (core, &body[core.len()..])
}

fn shorten(core: &str, budget: usize) -> String {
    let mut text = core.to_string();
    for (pattern, replacement) in SHORTEN_RULES.iter() {
        text = pattern.replace_all(&text, *replacement).into_owned();
        if char_count(&text) <= budget {
            return text;
        }
    }

    let mut kept = String::new();
    let mut kept_len = 0;
    for sentence in split_sentences(&text) {
        let len = char_count(sentence);
        if kept_len + len > budget {
            break;
        }
        kept.push_str(sentence);
        kept_len += len;
    }
    let kept = kept.trim_end();
    if !kept.is_empty() {
        return kept.to_string();
    }

    truncate_chars(&text, budget)
}

fn extend(core: &str, floor: usize, ceiling: usize, profile: &TagProfile<'_>) -> String {
    let mut text = core.to_string();
    for phrase in profile.filler_phrases {
        let len = char_count(&text);
        if len >= floor {
            return text;
        }
        if len + char_count(phrase) <= ceiling {
            text.push_str(phrase);
        }
    }

    let len = char_count(&text);
    if len < floor {
        text.extend(profile.long_filler.chars().cycle().take(floor - len));
    }
    text
}

/// Splits into sentences, each keeping its terminator and any trailing whitespace.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if !SENTENCE_END.contains(&c) {
            continue;
        }
        let mut end = i + c.len_utf8();
        while let Some(&(j, next)) = chars.peek() {
            if SENTENCE_END.contains(&next) || next.is_whitespace() {
                end = j + next.len_utf8();
                chars.next();
            } else {
                break;
            }
        }
        sentences.push(&text[start..end]);
        start = end;
    }
    if start < text.len() {
        sentences.push(&text[start..]);
    }
    sentences
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

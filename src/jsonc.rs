//! Lenient JSON reading for config files.
//!
//! tsconfig files, and most hand-written RequireJS/webpack JSON configs, are
//! "JSON with comments": `//` and `/* */` comments plus trailing commas are
//! accepted. Both are removed before the text is handed to `serde_json`.
//!
//! Script configs (`require.config({...})`, `module.exports = {...}`) are
//! JavaScript object literals; the literal is cut out of the script and read
//! as JSON5, which covers unquoted keys and single-quoted strings.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Lex {
    Code,
    Str { escaped: bool },
    LineComment,
    BlockComment,
}

/// Parse JSONC text into `T`.
pub fn parse_jsonc<T: DeserializeOwned>(source: &str) -> Result<T> {
    let cleaned = drop_trailing_commas(&strip_comments(source));
    serde_json::from_str(&cleaned).context("invalid JSON")
}

/// Parse JSON5 text into `T`.
pub fn parse_json5<T: DeserializeOwned>(source: &str) -> Result<T> {
    json5::from_str(source).context("invalid JSON5")
}

/// The first balanced `{...}` in a script, searching from just after the
/// first of `anchors` that occurs (or from the top when none does). Strings,
/// template literals and comments are skipped while matching braces.
pub fn object_literal_after<'a>(source: &'a str, anchors: &[&str]) -> Option<&'a str> {
    let start = anchors
        .iter()
        .find_map(|anchor| source.find(anchor).map(|idx| idx + anchor.len()))
        .unwrap_or(0);
    let body = &source[start..];

    let mut chars = body.char_indices().peekable();
    let mut open = None;
    let mut depth = 0usize;
    while let Some((idx, ch)) = chars.next() {
        match ch {
            '/' if chars.peek().is_some_and(|&(_, next)| next == '/') => {
                for (_, c) in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
            }
            '/' if chars.peek().is_some_and(|&(_, next)| next == '*') => {
                chars.next();
                let mut prev = '\0';
                for (_, c) in chars.by_ref() {
                    if prev == '*' && c == '/' {
                        break;
                    }
                    prev = c;
                }
            }
            '"' | '\'' | '`' => {
                let mut escaped = false;
                for (_, c) in chars.by_ref() {
                    if escaped {
                        escaped = false;
                    } else if c == '\\' {
                        escaped = true;
                    } else if c == ch {
                        break;
                    }
                }
            }
            '{' => {
                if depth == 0 {
                    open = Some(idx);
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    return open.map(|from| &body[from..=idx]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Remove comments, keeping newlines so serde's line numbers stay meaningful.
pub fn strip_comments(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut state = Lex::Code;
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        state = match state {
            Lex::Code => match (ch, chars.peek().copied()) {
                ('/', Some('/')) => {
                    chars.next();
                    Lex::LineComment
                }
                ('/', Some('*')) => {
                    chars.next();
                    Lex::BlockComment
                }
                ('"', _) => {
                    out.push(ch);
                    Lex::Str { escaped: false }
                }
                _ => {
                    out.push(ch);
                    Lex::Code
                }
            },
            Lex::Str { escaped } => {
                out.push(ch);
                match ch {
                    _ if escaped => Lex::Str { escaped: false },
                    '\\' => Lex::Str { escaped: true },
                    '"' => Lex::Code,
                    _ => Lex::Str { escaped: false },
                }
            }
            Lex::LineComment => {
                if ch == '\n' {
                    out.push(ch);
                    Lex::Code
                } else {
                    Lex::LineComment
                }
            }
            Lex::BlockComment => {
                if ch == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    Lex::Code
                } else {
                    if ch == '\n' {
                        out.push(ch);
                    }
                    Lex::BlockComment
                }
            }
        };
    }

    out
}

/// Remove commas that directly precede a closing `}` or `]`.
/// Expects comment-free input.
pub fn drop_trailing_commas(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut in_string = false;
    let mut escaped = false;

    for (idx, &ch) in chars.iter().enumerate() {
        if in_string {
            out.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => {
                in_string = true;
                out.push(ch);
            }
            ',' => {
                let next = chars[idx + 1..].iter().find(|c| !c.is_whitespace());
                if !matches!(next, Some('}') | Some(']')) {
                    out.push(ch);
                }
            }
            _ => out.push(ch),
        }
    }

    out
}

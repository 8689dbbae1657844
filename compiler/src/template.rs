// template.rs — Placeholder scanner for code templates
//
// Splits a code template into literal text, escaped dollars and macro
// invocations `$name(args)`, and parses a macro name plus its (already
// resolved) arguments into a typed `Placeholder`. Text-level only: the
// scanner knows nothing about ports or parameters.
//
// Preconditions: none.
// Postconditions: every `$` in the input is accounted for by a segment.
// Failure modes: malformed or unknown placeholders return a `ScanError`.
// Side effects: none.

use std::fmt;

// ── Segments ────────────────────────────────────────────────────────────────

/// One piece of a scanned template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    Text(&'a str),
    /// `\$`, producing a literal dollar sign.
    Dollar,
    Macro {
        name: &'a str,
        /// Raw argument text between the parentheses.
        args: &'a str,
        /// The whole token, `$name(args)`.
        source: &'a str,
    },
}

/// A malformed template or placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanError {
    pub token: String,
    pub message: String,
}

impl ScanError {
    fn new(token: impl Into<String>, message: impl Into<String>) -> Self {
        ScanError {
            token: token.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}': {}", self.token, self.message)
    }
}

impl std::error::Error for ScanError {}

/// Split `template` into segments.
pub fn scan(template: &str) -> Result<Vec<Segment<'_>>, ScanError> {
    let bytes = template.as_bytes();
    let mut segments = Vec::new();
    let mut text_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\\' if bytes.get(i + 1) == Some(&b'$') => {
                if text_start < i {
                    segments.push(Segment::Text(&template[text_start..i]));
                }
                segments.push(Segment::Dollar);
                i += 2;
                text_start = i;
            }
            b'$' => {
                if text_start < i {
                    segments.push(Segment::Text(&template[text_start..i]));
                }
                let name_start = i + 1;
                let mut name_end = name_start;
                while name_end < bytes.len() && is_ident_byte(bytes[name_end]) {
                    name_end += 1;
                }
                let excerpt_end = template[name_end..]
                    .chars()
                    .next()
                    .map_or(name_end, |c| name_end + c.len_utf8());
                if name_end == name_start {
                    return Err(ScanError::new(
                        &template[i..excerpt_end],
                        "'$' must start a placeholder; write '\\$' for a literal dollar",
                    ));
                }
                let close = extract_balanced(bytes, name_end, b'(', b')').ok_or_else(|| {
                    ScanError::new(
                        &template[i..excerpt_end],
                        "placeholder needs a balanced argument list",
                    )
                })?;
                segments.push(Segment::Macro {
                    name: &template[name_start..name_end],
                    args: &template[name_end + 1..close],
                    source: &template[i..=close],
                });
                i = close + 1;
                text_start = i;
            }
            _ => i += 1,
        }
    }
    if text_start < bytes.len() {
        segments.push(Segment::Text(&template[text_start..]));
    }
    Ok(segments)
}

/// Escape every `$` in `text` so it survives resolution as plain text.
pub fn quote_dollars(text: &str) -> String {
    text.replace('$', "\\$")
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Extract balanced delimiter content. Returns index of closing delimiter.
pub(crate) fn extract_balanced(bytes: &[u8], start: usize, open: u8, close: u8) -> Option<usize> {
    if start >= bytes.len() || bytes[start] != open {
        return None;
    }

    let mut depth = 0;
    let mut i = start;

    while i < bytes.len() {
        if bytes[i] == open {
            depth += 1;
        } else if bytes[i] == close {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
        }
        i += 1;
    }

    None
}

/// Split a string by commas at the top level (respecting nested `()`, `[]`
/// and string literals).
pub(crate) fn split_top_level_commas(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut in_string = false;
    let mut start = 0;
    let bytes = s.as_bytes();

    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'"' if i == 0 || bytes[i - 1] != b'\\' => in_string = !in_string,
            _ if in_string => {}
            b'(' | b'[' => depth += 1,
            b')' | b']' => depth -= 1,
            b',' if depth == 0 => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }

    parts.push(&s[start..]);
    parts
}

// ── Placeholders ────────────────────────────────────────────────────────────

/// Element index of a `$ref`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Index {
    Literal(u32),
    /// A target-language expression, for array buffers only.
    Expr(String),
}

/// A parsed placeholder token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placeholder {
    /// `$ref(name[#i][, idx])` and `$ref2(name, idx)`.
    Ref {
        name: String,
        channel: Option<u32>,
        index: Option<Index>,
    },
    /// `$val(param)`.
    Val(String),
    /// `$size(name)`.
    Size(String),
    /// `$precision(port[#i])`.
    Precision { port: String, channel: Option<u32> },
    /// `$starSymbol(name)`.
    StarSymbol(String),
    /// `$sharedSymbol(class, name)`.
    SharedSymbol { class: String, name: String },
    /// `$type(name)`.
    Type(String),
}

impl Placeholder {
    /// Parse macro `family` applied to `args`.
    pub fn parse(family: &str, args: &[&str]) -> Result<Placeholder, String> {
        let args: Vec<&str> = args.iter().map(|a| a.trim()).collect();
        match family {
            "ref" => match args.as_slice() {
                [target] => {
                    let (name, channel) = split_channel(target)?;
                    Ok(Placeholder::Ref {
                        name,
                        channel,
                        index: None,
                    })
                }
                [target, idx] => {
                    let (name, channel) = split_channel(target)?;
                    Ok(Placeholder::Ref {
                        name,
                        channel,
                        index: Some(parse_index(idx)?),
                    })
                }
                _ => Err(arity("ref", "1 or 2", args.len())),
            },
            "ref2" => match args.as_slice() {
                [target, idx] => {
                    let (name, channel) = split_channel(target)?;
                    Ok(Placeholder::Ref {
                        name,
                        channel,
                        index: Some(parse_index(idx)?),
                    })
                }
                _ => Err(arity("ref2", "2", args.len())),
            },
            "val" => single(family, &args).map(Placeholder::Val),
            "size" => single(family, &args).map(Placeholder::Size),
            "type" => single(family, &args).map(Placeholder::Type),
            "starSymbol" => single(family, &args).map(Placeholder::StarSymbol),
            "precision" => {
                let target = single(family, &args)?;
                let (port, channel) = split_channel(&target)?;
                Ok(Placeholder::Precision { port, channel })
            }
            "sharedSymbol" => match args.as_slice() {
                [class, name] if is_ident(class) && is_ident(name) => {
                    Ok(Placeholder::SharedSymbol {
                        class: class.to_string(),
                        name: name.to_string(),
                    })
                }
                [_, _] => Err("class and symbol names must be identifiers".to_string()),
                _ => Err(arity("sharedSymbol", "2", args.len())),
            },
            _ => Err(format!("unknown placeholder family '${}'", family)),
        }
    }
}

fn arity(family: &str, expected: &str, found: usize) -> String {
    format!("${} takes {} argument(s), found {}", family, expected, found)
}

fn single(family: &str, args: &[&str]) -> Result<String, String> {
    match args {
        [name] if is_ident(name) => Ok(name.to_string()),
        [name] => Err(format!("'{}' is not a name", name)),
        _ => Err(arity(family, "1", args.len())),
    }
}

fn is_ident(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Split `input#2` into (`input`, Some(2)). Channels are 1-based.
fn split_channel(target: &str) -> Result<(String, Option<u32>), String> {
    let (name, channel) = match target.split_once('#') {
        Some((name, ch)) => {
            let n: u32 = ch
                .trim()
                .parse()
                .map_err(|_| format!("channel '#{}' is not a number", ch.trim()))?;
            if n == 0 {
                return Err("channels are numbered from 1".to_string());
            }
            (name.trim(), Some(n))
        }
        None => (target, None),
    };
    if !is_ident(name) {
        return Err(format!("'{}' is not a port or parameter name", name));
    }
    Ok((name.to_string(), channel))
}

fn parse_index(idx: &str) -> Result<Index, String> {
    if idx.is_empty() {
        return Err("empty index".to_string());
    }
    if idx.bytes().all(|b| b.is_ascii_digit()) {
        idx.parse::<u32>()
            .map(Index::Literal)
            .map_err(|_| format!("index '{}' is too large", idx))
    } else if idx.starts_with('-') && idx[1..].bytes().all(|b| b.is_ascii_digit()) {
        Err(format!("negative index '{}'", idx))
    } else {
        Ok(Index::Expr(idx.to_string()))
    }
}

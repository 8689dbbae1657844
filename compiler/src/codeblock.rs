// codeblock.rs — Named code blocks
//
// A block library is text holding blocks of the form
//
//     /*** name ***/
//     body
//     /**/
//
//     /*** name($a, $b) ***/
//     body using $a and $b
//     /**/
//
// Blocks are keyed by (name, arity), so a name may be overloaded by
// argument count. `get` substitutes block arguments; placeholders are left
// for the resolver.

use std::collections::BTreeMap;
use std::fmt;

use crate::template::{extract_balanced, split_top_level_commas};

const OPEN: &str = "/***";
const HEADER_END: &str = "***/";
const CLOSE: &str = "/**/";

#[derive(Debug, Clone, PartialEq, Eq)]
struct CodeBlock {
    params: Vec<String>,
    body: String,
}

/// Error while reading a block library. `line` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlockError {
    pub line: usize,
    pub message: String,
}

impl fmt::Display for CodeBlockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for CodeBlockError {}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeBlockLibrary {
    blocks: BTreeMap<(String, usize), CodeBlock>,
}

impl CodeBlockLibrary {
    /// Parse every block in `text`. Text outside blocks is ignored.
    pub fn parse(text: &str) -> Result<CodeBlockLibrary, CodeBlockError> {
        let mut lib = CodeBlockLibrary::default();
        let mut pos = 0;
        while let Some(found) = text[pos..].find(OPEN) {
            let start = pos + found;
            let line = line_of(text, start);
            let header_start = start + OPEN.len();
            let header_len = text[header_start..].find(HEADER_END).ok_or(CodeBlockError {
                line,
                message: "unterminated block header".to_string(),
            })?;
            let header = text[header_start..header_start + header_len].trim();
            let (name, params) = parse_header(header).map_err(|message| CodeBlockError {
                line,
                message,
            })?;

            let mut body_start = header_start + header_len + HEADER_END.len();
            if text[body_start..].starts_with("\r\n") {
                body_start += 2;
            } else if text[body_start..].starts_with('\n') {
                body_start += 1;
            }
            let body_len = text[body_start..].find(CLOSE).ok_or(CodeBlockError {
                line,
                message: format!("block '{}' is not closed with {}", name, CLOSE),
            })?;
            let body = text[body_start..body_start + body_len].trim_end().to_string();

            let key = (name.clone(), params.len());
            if lib.blocks.contains_key(&key) {
                return Err(CodeBlockError {
                    line,
                    message: format!(
                        "block '{}' with {} argument(s) is defined twice",
                        name,
                        params.len()
                    ),
                });
            }
            lib.blocks.insert(key, CodeBlock { params, body });
            pos = body_start + body_len + CLOSE.len();
        }
        Ok(lib)
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Whether a block `name` exists with `arity` arguments.
    pub fn has(&self, name: &str, arity: usize) -> bool {
        self.blocks.contains_key(&(name.to_string(), arity))
    }

    /// Block keys as `name/arity`, sorted.
    pub fn keys(&self) -> Vec<String> {
        self.blocks
            .keys()
            .map(|(name, arity)| format!("{}/{}", name, arity))
            .collect()
    }

    /// The body of block `name`, with `args` substituted for its parameters.
    pub fn get(&self, name: &str, args: &[&str]) -> Result<String, String> {
        let block = self
            .blocks
            .get(&(name.to_string(), args.len()))
            .ok_or_else(|| {
                format!("no code block '{}' taking {} argument(s)", name, args.len())
            })?;
        if args.is_empty() {
            return Ok(block.body.clone());
        }
        Ok(substitute(&block.body, &block.params, args))
    }
}

fn line_of(text: &str, offset: usize) -> usize {
    text[..offset].bytes().filter(|&b| b == b'\n').count() + 1
}

/// `name` or `name($a, $b)`. Parameter names keep no `$`.
fn parse_header(header: &str) -> Result<(String, Vec<String>), String> {
    let (name, params) = match header.find('(') {
        None => (header, Vec::new()),
        Some(open) => {
            let close = extract_balanced(header.as_bytes(), open, b'(', b')')
                .filter(|&c| c == header.len() - 1)
                .ok_or_else(|| format!("malformed block header '{}'", header))?;
            let inner = header[open + 1..close].trim();
            let mut params = Vec::new();
            if !inner.is_empty() {
                for p in split_top_level_commas(inner) {
                    let p = p.trim();
                    let bare = p
                        .strip_prefix('$')
                        .filter(|b| !b.is_empty() && b.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'))
                        .ok_or_else(|| format!("block argument '{}' must look like $name", p))?;
                    if params.iter().any(|q| q == bare) {
                        return Err(format!("block argument '${}' repeated", bare));
                    }
                    params.push(bare.to_string());
                }
            }
            (header[..open].trim(), params)
        }
    };
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(format!("malformed block name '{}'", name));
    }
    Ok((name.to_string(), params))
}

/// Replace `$param` with its argument wherever `$param` is a whole
/// identifier not followed by `(`, so placeholder families stay intact.
fn substitute(body: &str, params: &[String], args: &[&str]) -> String {
    let bytes = body.as_bytes();
    let mut out = String::with_capacity(body.len());
    let mut i = 0;
    let mut copied = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && bytes.get(i + 1) == Some(&b'$') {
            i += 2;
            continue;
        }
        if bytes[i] != b'$' {
            i += 1;
            continue;
        }
        let start = i + 1;
        let mut end = start;
        while end < bytes.len() && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_') {
            end += 1;
        }
        let ident = &body[start..end];
        let is_call = bytes.get(end) == Some(&b'(');
        match params.iter().position(|p| p == ident) {
            Some(k) if !is_call => {
                out.push_str(&body[copied..i]);
                out.push_str(args[k]);
                copied = end;
            }
            _ => {}
        }
        i = end.max(i + 1);
    }
    out.push_str(&body[copied..]);
    out
}

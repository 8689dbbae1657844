// library.rs — Star class library
//
// Holds the built-in star classes and template stars loaded from `.star`
// files. A `.star` file declares classes with a STAR() macro followed by
// the code blocks that belong to it:
//
//     STAR(Scale,
//          IN(input, float),
//          OUT(output, float),
//          PARAM(factor, float, "2.0"),
//          INCLUDE(<math.h>))
//
//     /*** fireBlock ***/
//     $ref(output) = $val(factor) * $ref(input);
//     /**/
//
// The STAR() macro is scanned at the text level; `//` and `/* */` comments
// outside code blocks are skipped.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::codeblock::{CodeBlockError, CodeBlockLibrary};
use crate::codegen::{Section, StarCtx};
use crate::descriptor::{ClassSignature, ParamDecl, Phase, PhaseHooks, PortDecl, StarClass};
use crate::diag::GenResult;
use crate::stars;
use crate::template::{extract_balanced, split_top_level_commas};
use crate::types::{DataType, ParamType};

/// Errors that can occur while loading a library.
#[derive(Debug)]
pub enum LibraryError {
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },
    ParseError {
        file: PathBuf,
        line: usize,
        message: String,
    },
    DuplicateClass {
        name: String,
        first: String,
        second: String,
    },
}

impl fmt::Display for LibraryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LibraryError::IoError { path, source } => {
                write!(f, "{}: {}", path.display(), source)
            }
            LibraryError::ParseError {
                file,
                line,
                message,
            } => {
                write!(f, "{}:{}: {}", file.display(), line, message)
            }
            LibraryError::DuplicateClass {
                name,
                first,
                second,
            } => {
                write!(
                    f,
                    "duplicate star class '{}': first defined in {}, redefined in {}",
                    name, first, second
                )
            }
        }
    }
}

impl std::error::Error for LibraryError {}

impl LibraryError {
    pub(crate) fn from_blocks(file: &Path, line_offset: usize, e: CodeBlockError) -> Self {
        LibraryError::ParseError {
            file: file.to_path_buf(),
            line: line_offset + e.line,
            message: e.message,
        }
    }
}

// ── Library ─────────────────────────────────────────────────────────────────

/// Star classes by name. Iteration is in name order.
#[derive(Debug, Default)]
pub struct StarLibrary {
    classes: BTreeMap<String, (StarClass, String)>,
}

impl StarLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// A library holding every built-in star.
    pub fn with_builtins() -> Result<Self, LibraryError> {
        let mut lib = StarLibrary::new();
        for class in stars::builtin_classes()? {
            lib.register(class, "<builtin>")?;
        }
        Ok(lib)
    }

    pub fn register(&mut self, class: StarClass, origin: &str) -> Result<(), LibraryError> {
        if let Some((_, first)) = self.classes.get(&class.name) {
            return Err(LibraryError::DuplicateClass {
                name: class.name.clone(),
                first: first.clone(),
                second: origin.to_string(),
            });
        }
        self.classes
            .insert(class.name.clone(), (class, origin.to_string()));
        Ok(())
    }

    /// Load template stars from a `.star` file. Returns the number of classes found.
    pub fn load_file(&mut self, path: &Path) -> Result<usize, LibraryError> {
        let source = std::fs::read_to_string(path).map_err(|e| LibraryError::IoError {
            path: path.to_path_buf(),
            source: e,
        })?;
        self.load_str(&source, path)
    }

    /// Load template stars from `.star` text; `file` is used in errors.
    pub fn load_str(&mut self, source: &str, file: &Path) -> Result<usize, LibraryError> {
        let classes = scan_stars(source, file)?;
        let count = classes.len();
        let origin = file.display().to_string();
        for class in classes {
            self.register(class, &origin)?;
        }
        log::info!("loaded {} star class(es) from {}", count, origin);
        Ok(count)
    }

    pub fn lookup(&self, name: &str) -> Option<&StarClass> {
        self.classes.get(name).map(|(class, _)| class)
    }

    pub fn classes(&self) -> impl Iterator<Item = &StarClass> {
        self.classes.values().map(|(class, _)| class)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Canonical JSON of every class signature, in name order.
    pub fn canonical_json(&self) -> serde_json::Result<String> {
        let signatures: Vec<ClassSignature<'_>> = self.classes().map(|c| c.signature()).collect();
        serde_json::to_string(&signatures)
    }
}

// ── Template star hooks ─────────────────────────────────────────────────────

const FIRE_BLOCK: &str = "fireBlock";

fn template_hooks() -> PhaseHooks {
    PhaseHooks::new()
        .on(Phase::PreInitialize, template_preinitialize)
        .on(Phase::Initialize, template_initialize)
        .on(Phase::Fire, template_fire)
        .on(Phase::Wrapup, template_wrapup)
}

fn template_preinitialize(ctx: &mut StarCtx<'_>) -> GenResult<()> {
    if ctx.actor.blocks.has("sharedBlock", 0) {
        let body = ctx.block("sharedBlock", &[])?;
        ctx.shared("sharedBlock", &body)?;
    }
    emit_if_present(ctx, Section::Declaration, "preinitBlock")
}

fn template_initialize(ctx: &mut StarCtx<'_>) -> GenResult<()> {
    emit_if_present(ctx, Section::Initialize, "initBlock")
}

fn template_fire(ctx: &mut StarCtx<'_>) -> GenResult<()> {
    ctx.emit_block(Section::Fire, FIRE_BLOCK, &[])
}

fn template_wrapup(ctx: &mut StarCtx<'_>) -> GenResult<()> {
    emit_if_present(ctx, Section::Wrapup, "wrapupBlock")
}

fn emit_if_present(ctx: &mut StarCtx<'_>, section: Section, block: &str) -> GenResult<()> {
    if ctx.actor.blocks.has(block, 0) {
        ctx.emit_block(section, block, &[])?;
    }
    Ok(())
}

// ── Scanner ─────────────────────────────────────────────────────────────────

struct StarDecl {
    /// Byte offset of `STAR(`.
    start: usize,
    /// Byte offset just past the closing `)`.
    end: usize,
    line: usize,
    inner: String,
}

fn line_at(source: &str, offset: usize) -> usize {
    source[..offset].bytes().filter(|&b| b == b'\n').count() + 1
}

/// Scan a source string for STAR() declarations and their code blocks.
fn scan_stars(source: &str, file: &Path) -> Result<Vec<StarClass>, LibraryError> {
    let decls = find_declarations(source, file)?;

    let leading_end = decls.first().map(|d| d.start).unwrap_or(source.len());
    let leading = CodeBlockLibrary::parse(&source[..leading_end])
        .map_err(|e| LibraryError::from_blocks(file, 0, e))?;
    if !leading.is_empty() {
        return Err(LibraryError::ParseError {
            file: file.to_path_buf(),
            line: 1,
            message: "code block outside a STAR() declaration".to_string(),
        });
    }

    let mut classes = Vec::with_capacity(decls.len());
    for (i, decl) in decls.iter().enumerate() {
        let region_end = decls.get(i + 1).map(|d| d.start).unwrap_or(source.len());
        let region = &source[decl.end..region_end];
        let line_offset = line_at(source, decl.end) - 1;
        let blocks = CodeBlockLibrary::parse(region)
            .map_err(|e| LibraryError::from_blocks(file, line_offset, e))?;

        let mut class = parse_star_macro(&decl.inner, file, decl.line)?;
        if !blocks.has(FIRE_BLOCK, 0) {
            return Err(LibraryError::ParseError {
                file: file.to_path_buf(),
                line: decl.line,
                message: format!("STAR({}) has no {}", class.name, FIRE_BLOCK),
            });
        }
        class.hooks = template_hooks();
        class.blocks = Arc::new(blocks);
        classes.push(class);
    }
    Ok(classes)
}

/// Locate STAR() macros, skipping comments and code blocks.
fn find_declarations(source: &str, file: &Path) -> Result<Vec<StarDecl>, LibraryError> {
    let bytes = source.as_bytes();
    let mut decls = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let rest = &source[i..];
        if rest.starts_with("//") {
            // Line comment: skip to end of line
            i += rest.find('\n').unwrap_or(rest.len());
        } else if rest.starts_with("/***") {
            // Code block: the block parser reports malformed ones
            match rest.find("***/").and_then(|h| rest[h..].find("/**/").map(|c| h + c)) {
                Some(close) => i += close + 4,
                None => break,
            }
        } else if rest.starts_with("/*") {
            match rest[2..].find("*/") {
                Some(end) => i += end + 4,
                None => {
                    return Err(LibraryError::ParseError {
                        file: file.to_path_buf(),
                        line: line_at(source, i),
                        message: "unterminated comment".to_string(),
                    })
                }
            }
        } else if rest.starts_with("STAR(")
            && (i == 0 || !(bytes[i - 1].is_ascii_alphanumeric() || bytes[i - 1] == b'_'))
        {
            let paren = i + 4;
            let line = line_at(source, i);
            let close = extract_balanced(bytes, paren, b'(', b')').ok_or_else(|| {
                LibraryError::ParseError {
                    file: file.to_path_buf(),
                    line,
                    message: "unbalanced parentheses in STAR() macro".to_string(),
                }
            })?;
            decls.push(StarDecl {
                start: i,
                end: close + 1,
                line,
                inner: source[paren + 1..close].to_string(),
            });
            i = close + 1;
        } else {
            i += rest.chars().next().map(char::len_utf8).unwrap_or(1);
        }
    }
    Ok(decls)
}

/// Parse the inner content of a STAR(...) invocation.
fn parse_star_macro(inner: &str, file: &Path, line: usize) -> Result<StarClass, LibraryError> {
    let err = |message: String| LibraryError::ParseError {
        file: file.to_path_buf(),
        line,
        message,
    };
    let fields = split_top_level_commas(inner);
    let name = fields[0].trim();
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(err(format!("invalid star name '{}'", name)));
    }
    let mut class = StarClass::new(name);

    for field in &fields[1..] {
        let field = field.trim();
        let open = field
            .find('(')
            .ok_or_else(|| err(format!("expected KIND(...), found '{}'", field)))?;
        let close = extract_balanced(field.as_bytes(), open, b'(', b')')
            .filter(|&c| c == field.len() - 1)
            .ok_or_else(|| err(format!("malformed entry '{}'", field)))?;
        let kind = field[..open].trim();
        let args: Vec<&str> = split_top_level_commas(&field[open + 1..close])
            .into_iter()
            .map(str::trim)
            .collect();

        class = match kind {
            "IN" | "OUT" | "INMULTI" | "OUTMULTI" => {
                class.port(parse_port(kind, &args).map_err(err)?)
            }
            "PARAM" | "STATE" => class.param(parse_param(kind, &args).map_err(err)?),
            "INCLUDE" => match args.as_slice() {
                [header] if !header.is_empty() => class.include(header),
                _ => return Err(err("INCLUDE takes one header".to_string())),
            },
            other => return Err(err(format!("unknown entry kind '{}'", other))),
        };
    }
    Ok(class)
}

fn parse_port(kind: &str, args: &[&str]) -> Result<PortDecl, String> {
    let (name, ty, samples) = match args {
        [name, ty] => (*name, *ty, 1),
        [name, ty, n] if !kind.ends_with("MULTI") => {
            let samples: u32 = n
                .parse()
                .ok()
                .filter(|&s| s > 0)
                .ok_or_else(|| format!("sample count '{}' must be a positive integer", n))?;
            (*name, *ty, samples)
        }
        _ => return Err(format!("{}(name, type[, samples]) expected", kind)),
    };
    let dtype = DataType::from_name(ty).ok_or_else(|| format!("unknown port type '{}'", ty))?;
    let decl = match kind {
        "IN" => PortDecl::input(name, dtype),
        "OUT" => PortDecl::output(name, dtype),
        "INMULTI" => PortDecl::multi_input(name, dtype),
        _ => PortDecl::multi_output(name, dtype),
    };
    Ok(decl.with_samples(samples))
}

fn parse_param(kind: &str, args: &[&str]) -> Result<ParamDecl, String> {
    let [name, ty, default] = args else {
        return Err(format!("{}(name, type, \"default\") expected", kind));
    };
    let ty = if *ty == "yesno" {
        ParamType::yes_no()
    } else {
        ParamType::from_name(ty).ok_or_else(|| format!("unknown parameter type '{}'", ty))?
    };
    let default = default
        .strip_prefix('"')
        .and_then(|d| d.strip_suffix('"'))
        .unwrap_or(default);
    Ok(if kind == "STATE" {
        ParamDecl::state(name, ty, default)
    } else {
        ParamDecl::new(name, ty, default)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCALE: &str = r#"
// A template star.
STAR(Scale,
     IN(input, float),
     OUT(output, float, 2),
     PARAM(factor, float, "2.0"),
     STATE(count, int, "0"),
     INCLUDE(<math.h>))

/*** fireBlock ***/
$ref(output, 0) = $val(factor) * $ref(input);
$ref(output, 1) = $ref(output, 0);
/**/

/* STAR(Hidden, OUT(output, float)) is commented out */
"#;

    fn load(src: &str) -> Result<StarLibrary, LibraryError> {
        let mut lib = StarLibrary::new();
        lib.load_str(src, Path::new("test.star"))?;
        Ok(lib)
    }

    #[test]
    fn parse_template_star() {
        let lib = load(SCALE).unwrap();
        assert_eq!(lib.len(), 1);
        let class = lib.lookup("Scale").unwrap();
        assert_eq!(class.ports.len(), 2);
        assert_eq!(class.ports[1].samples, 2);
        assert_eq!(class.params[0].default, "2.0");
        assert!(class.params[1].mutable);
        assert_eq!(class.includes, vec!["<math.h>"]);
        assert!(class.blocks.has("fireBlock", 0));
        assert_eq!(class.hooks.for_phase(Phase::Fire).len(), 1);
    }

    #[test]
    fn duplicate_class_error() {
        let mut lib = load(SCALE).unwrap();
        let err = lib.load_str(SCALE, Path::new("again.star")).unwrap_err();
        match err {
            LibraryError::DuplicateClass { name, first, second } => {
                assert_eq!(name, "Scale");
                assert_eq!(first, "test.star");
                assert_eq!(second, "again.star");
            }
            other => panic!("expected DuplicateClass, got {other}"),
        }
    }

    #[test]
    fn unknown_type_error() {
        let src = "STAR(Bad, IN(input, quaternion))\n/*** fireBlock ***/\nx;\n/**/\n";
        let err = load(src).unwrap_err();
        assert!(err.to_string().contains("unknown port type 'quaternion'"), "{err}");
        assert!(err.to_string().starts_with("test.star:1:"), "{err}");
    }

    #[test]
    fn star_without_fire_block() {
        let err = load("STAR(Empty, OUT(output, float))\n").unwrap_err();
        assert!(err.to_string().contains("no fireBlock"), "{err}");
    }

    #[test]
    fn block_errors_report_file_lines() {
        let src = "STAR(A, OUT(output, float))\n\n/*** fireBlock ***/\nx;\n/**/\n/*** fireBlock ***/\ny;\n/**/\n";
        match load(src).unwrap_err() {
            LibraryError::ParseError { line, .. } => assert_eq!(line, 6),
            other => panic!("expected ParseError, got {other}"),
        }
    }

    #[test]
    fn block_before_any_star() {
        let src = "/*** fireBlock ***/\nx;\n/**/\nSTAR(A, OUT(output, float))\n";
        assert!(load(src).is_err());
    }

    #[test]
    fn builtins_load() {
        let lib = StarLibrary::with_builtins().unwrap();
        for name in ["Ramp", "Gain", "Add", "Quant", "Chop", "Printer", "AddFix"] {
            assert!(lib.lookup(name).is_some(), "missing {name}");
        }
    }

    #[test]
    fn canonical_json_is_stable() {
        let a = StarLibrary::with_builtins().unwrap().canonical_json().unwrap();
        let b = StarLibrary::with_builtins().unwrap().canonical_json().unwrap();
        assert_eq!(a, b);
        assert!(a.starts_with('['));
    }
}

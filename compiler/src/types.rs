// types.rs — Port element types, parameter types and parameter values
//
// Parameter defaults are declared as expression strings; `ParamValue::parse`
// is the literal evaluator that turns them (and netlist overrides) into
// typed values. `ParamValue::literal` is the inverse used by `$val(...)`.
//
// Preconditions: none.
// Postconditions: parsed values are finite and well-typed for their ParamType.
// Failure modes: malformed literals return an error message.
// Side effects: none.

use std::fmt;

use serde::Serialize;

use crate::precision::Precision;

// ── Port element types ──────────────────────────────────────────────────────

/// Element type carried by a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DataType {
    Float,
    Int,
    Complex,
    Fix,
    /// Polymorphic; resolved from connections during graph construction.
    Any,
}

impl DataType {
    /// C type used for buffers of this element type.
    pub fn c_type(self) -> &'static str {
        match self {
            DataType::Float | DataType::Any => "double",
            DataType::Int => "int",
            DataType::Complex => "complex",
            DataType::Fix => "fix",
        }
    }

    /// Parse a type name as written in `.star` library files.
    pub fn from_name(s: &str) -> Option<DataType> {
        match s {
            "float" | "double" => Some(DataType::Float),
            "int" => Some(DataType::Int),
            "complex" => Some(DataType::Complex),
            "fix" => Some(DataType::Fix),
            "anytype" => Some(DataType::Any),
            _ => None,
        }
    }

    /// Parse a type letter (`f`, `i`, `c`, `a`) or its long form.
    ///
    /// Anything else is rejected; there is no fallback type.
    pub fn from_letter(s: &str) -> Option<DataType> {
        match s.trim().to_ascii_lowercase().as_str() {
            "f" | "float" => Some(DataType::Float),
            "i" | "int" => Some(DataType::Int),
            "c" | "complex" => Some(DataType::Complex),
            "a" | "any" | "anytype" => Some(DataType::Any),
            _ => None,
        }
    }

    /// Whether a net from `self` into `other` is legal without a conversion star.
    pub fn converts_to(self, other: DataType) -> bool {
        self == other
            || matches!(
                (self, other),
                (DataType::Int, DataType::Float) | (DataType::Float, DataType::Int)
            )
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DataType::Float => "float",
            DataType::Int => "int",
            DataType::Complex => "complex",
            DataType::Fix => "fix",
            DataType::Any => "anytype",
        };
        f.write_str(s)
    }
}

// ── Parameter types ─────────────────────────────────────────────────────────

/// Declared type of a star parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ParamType {
    Int,
    Float,
    Str,
    IntArray,
    FloatArray,
    /// Fixed-point precision, `int.frac` or `int/length`; may be empty.
    Precision,
    /// One of a closed set of upper-case words (e.g. `YES`/`NO`, `AND`/`OR`).
    Enum(Vec<String>),
}

impl ParamType {
    pub fn enumeration(options: &[&str]) -> ParamType {
        ParamType::Enum(options.iter().map(|s| s.to_string()).collect())
    }

    pub fn yes_no() -> ParamType {
        ParamType::enumeration(&["YES", "NO"])
    }

    /// Parse a type name as written in `.star` library files.
    pub fn from_name(s: &str) -> Option<ParamType> {
        match s {
            "int" => Some(ParamType::Int),
            "float" | "double" => Some(ParamType::Float),
            "string" => Some(ParamType::Str),
            "intarray" => Some(ParamType::IntArray),
            "floatarray" => Some(ParamType::FloatArray),
            "precision" => Some(ParamType::Precision),
            _ => None,
        }
    }

    /// C type of a state variable holding a value of this type.
    pub fn c_type(&self) -> &'static str {
        match self {
            ParamType::Int | ParamType::IntArray => "int",
            ParamType::Float | ParamType::FloatArray => "double",
            ParamType::Str | ParamType::Enum(_) => "char*",
            ParamType::Precision => "fix_prec",
        }
    }
}

// ── Parameter values ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Str(String),
    IntArray(Vec<i64>),
    FloatArray(Vec<f64>),
    /// `None` is the empty precision: resolved later from the graph.
    Precision(Option<Precision>),
}

impl ParamValue {
    /// Evaluate a literal expression against the declared type.
    pub fn parse(ty: &ParamType, expr: &str) -> Result<ParamValue, String> {
        let text = expr.trim();
        match ty {
            ParamType::Int => parse_int(text).map(ParamValue::Int),
            ParamType::Float => parse_float(text).map(ParamValue::Float),
            ParamType::Str => Ok(ParamValue::Str(text.to_string())),
            ParamType::IntArray => split_array(text)
                .into_iter()
                .map(parse_int)
                .collect::<Result<Vec<_>, _>>()
                .map(ParamValue::IntArray),
            ParamType::FloatArray => split_array(text)
                .into_iter()
                .map(parse_float)
                .collect::<Result<Vec<_>, _>>()
                .map(ParamValue::FloatArray),
            ParamType::Precision => {
                if text.is_empty() {
                    Ok(ParamValue::Precision(None))
                } else {
                    Precision::parse(text).map(|p| ParamValue::Precision(Some(p)))
                }
            }
            ParamType::Enum(options) => {
                let upper = text.to_ascii_uppercase();
                if options.iter().any(|o| *o == upper) {
                    Ok(ParamValue::Str(upper))
                } else {
                    Err(format!(
                        "'{}' is not one of {}",
                        text,
                        options.join(", ")
                    ))
                }
            }
        }
    }

    /// The value as a target-language literal, as substituted by `$val`.
    pub fn literal(&self) -> String {
        match self {
            ParamValue::Int(n) => n.to_string(),
            ParamValue::Float(x) => float_literal(*x),
            ParamValue::Str(s) => s.clone(),
            ParamValue::IntArray(v) => {
                let items: Vec<String> = v.iter().map(|n| n.to_string()).collect();
                format!("{{{}}}", items.join(", "))
            }
            ParamValue::FloatArray(v) => {
                let items: Vec<String> = v.iter().map(|x| float_literal(*x)).collect();
                format!("{{{}}}", items.join(", "))
            }
            ParamValue::Precision(Some(p)) => p.to_string(),
            ParamValue::Precision(None) => String::new(),
        }
    }

    /// Element count for `$size`: arrays report their length, scalars 1.
    pub fn size(&self) -> usize {
        match self {
            ParamValue::IntArray(v) => v.len(),
            ParamValue::FloatArray(v) => v.len(),
            _ => 1,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParamValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            ParamValue::Float(x) => Some(*x),
            ParamValue::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

/// Format a double so that C reads it back as a floating literal.
pub fn float_literal(x: f64) -> String {
    // Debug keeps a trailing `.0` on integral values.
    format!("{:?}", x)
}

/// `s` as a quoted C string literal. Bytes outside printable ASCII become
/// three-digit octal escapes.
pub fn c_string_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for b in s.bytes() {
        match b {
            b'"' => out.push_str("\\\""),
            b'\\' => out.push_str("\\\\"),
            b'\n' => out.push_str("\\n"),
            b'\t' => out.push_str("\\t"),
            b'\r' => out.push_str("\\r"),
            0x20..=0x7e => out.push(b as char),
            _ => out.push_str(&format!("\\{:03o}", b)),
        }
    }
    out.push('"');
    out
}

fn parse_int(s: &str) -> Result<i64, String> {
    s.parse::<i64>()
        .map_err(|_| format!("expected an integer, found '{}'", s))
}

fn parse_float(s: &str) -> Result<f64, String> {
    match s.parse::<f64>() {
        Ok(x) if x.is_finite() => Ok(x),
        _ => Err(format!("expected a finite number, found '{}'", s)),
    }
}

/// Split `[1, 2, 3]`, `{1 2 3}` or `1 2 3` into element strings.
fn split_array(s: &str) -> Vec<&str> {
    let inner = s
        .strip_prefix('[')
        .and_then(|r| r.strip_suffix(']'))
        .or_else(|| s.strip_prefix('{').and_then(|r| r.strip_suffix('}')))
        .unwrap_or(s);
    inner
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|p| !p.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_literals_keep_a_decimal_point() {
        assert_eq!(float_literal(2.0), "2.0");
        assert_eq!(float_literal(-0.5), "-0.5");
        assert_eq!(ParamValue::Float(1.0).literal(), "1.0");
    }

    #[test]
    fn c_strings_are_escaped() {
        assert_eq!(c_string_literal("out.txt"), "\"out.txt\"");
        assert_eq!(c_string_literal("a\"b\\c"), r#""a\"b\\c""#);
        assert_eq!(c_string_literal("x\ny"), r#""x\ny""#);
        assert_eq!(c_string_literal("é"), r#""\303\251""#);
    }

    #[test]
    fn parse_scalars() {
        assert_eq!(ParamValue::parse(&ParamType::Int, " 42 "), Ok(ParamValue::Int(42)));
        assert_eq!(ParamValue::parse(&ParamType::Float, "1"), Ok(ParamValue::Float(1.0)));
        assert!(ParamValue::parse(&ParamType::Int, "1.5").is_err());
        assert!(ParamValue::parse(&ParamType::Float, "inf").is_err());
    }

    #[test]
    fn parse_arrays_in_every_spelling() {
        let expected = ParamValue::FloatArray(vec![0.5, 1.0, 2.0]);
        assert_eq!(ParamValue::parse(&ParamType::FloatArray, "[0.5, 1, 2]"), Ok(expected.clone()));
        assert_eq!(ParamValue::parse(&ParamType::FloatArray, "{0.5 1 2}"), Ok(expected.clone()));
        assert_eq!(ParamValue::parse(&ParamType::FloatArray, "0.5 1 2"), Ok(expected));
        assert_eq!(
            ParamValue::parse(&ParamType::IntArray, "[]"),
            Ok(ParamValue::IntArray(vec![]))
        );
    }

    #[test]
    fn array_literal_and_size() {
        let v = ParamValue::IntArray(vec![1, 2, 3]);
        assert_eq!(v.literal(), "{1, 2, 3}");
        assert_eq!(v.size(), 3);
        assert_eq!(ParamValue::Float(3.0).size(), 1);
    }

    #[test]
    fn enums_are_case_insensitive_and_closed() {
        let ty = ParamType::enumeration(&["AND", "OR"]);
        assert_eq!(ParamValue::parse(&ty, "or"), Ok(ParamValue::Str("OR".into())));
        let err = ParamValue::parse(&ty, "MAYBE").unwrap_err();
        assert!(err.contains("AND, OR"), "got: {err}");
    }

    #[test]
    fn empty_precision_is_variable() {
        assert_eq!(
            ParamValue::parse(&ParamType::Precision, ""),
            Ok(ParamValue::Precision(None))
        );
    }

    #[test]
    fn type_letters() {
        assert_eq!(DataType::from_letter("f"), Some(DataType::Float));
        assert_eq!(DataType::from_letter("I"), Some(DataType::Int));
        assert_eq!(DataType::from_letter("complex"), Some(DataType::Complex));
        assert_eq!(DataType::from_letter("a"), Some(DataType::Any));
        assert_eq!(DataType::from_letter("x"), None);
    }

    #[test]
    fn int_float_nets_convert_implicitly() {
        assert!(DataType::Int.converts_to(DataType::Float));
        assert!(!DataType::Complex.converts_to(DataType::Float));
        assert!(!DataType::Fix.converts_to(DataType::Float));
    }
}

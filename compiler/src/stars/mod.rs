// stars/mod.rs — Built-in star catalog
//
// Every built-in class is declared here in Rust: ports, parameters, and the
// hooks run in each phase. Fixed-point stars also carry a code block
// library (`fix_blocks.c`).
//
// Preconditions: none.
// Postconditions: class names are unique.
// Failure modes: a malformed embedded block library.
// Side effects: none.

mod arith;
mod control;
mod expr;
mod fix;
mod logic;
mod sink;
mod source;

use crate::codegen::StarCtx;
use crate::descriptor::StarClass;
use crate::diag::GenResult;
use crate::library::LibraryError;

/// All built-in star classes.
pub fn builtin_classes() -> Result<Vec<StarClass>, LibraryError> {
    let mut classes = Vec::new();
    classes.extend(source::classes());
    classes.extend(arith::classes());
    classes.extend(logic::classes());
    classes.extend(control::classes());
    classes.push(expr::class());
    classes.push(sink::class());
    classes.extend(fix::classes()?);
    Ok(classes)
}

/// Require at least one connected channel on multiport `port`.
pub(crate) fn require_width(ctx: &StarCtx<'_>, port: &str) -> GenResult<usize> {
    let width = ctx.width(port)?;
    if width == 0 {
        return Err(ctx.invalid(port, "no inputs connected"));
    }
    Ok(width)
}

/// `$ref(port#1) <op> $ref(port#2) ...` over every channel of `port`.
pub(crate) fn channel_terms(port: &str, width: usize, wrap: &str) -> Vec<String> {
    (1..=width)
        .map(|i| wrap.replace("{}", &format!("$ref({}#{})", port, i)))
        .collect()
}

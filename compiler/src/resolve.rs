// resolve.rs — Placeholder resolution
//
// Turns a code template into placeholder-free target code against the
// bindings of one actor instance: its ports, its parameters, the nets the
// ports are wired to, and the current firing index.
//
// Preconditions: buffers are planned before any port is referenced.
// Postconditions: the returned text contains no unescaped placeholder.
// Failure modes: every unresolvable token is a `GenError::Resolution`
//                naming the actor and the token.
// Side effects: the symbol table may claim symbols and queue state
//               variable declarations.

use crate::descriptor::{ActorDescriptor, Direction, Port};
use crate::diag::{GenError, GenResult};
use crate::graph::NetTable;
use crate::id::NetId;
use crate::precision::PrecisionState;
use crate::symbols::SymbolTable;
use crate::template::{scan, split_top_level_commas, Index, Placeholder, Segment};

/// Replacements are re-resolved while they contain placeholders, to this depth.
pub const MAX_DEPTH: usize = 16;

/// Everything a template of one actor may refer to.
#[derive(Clone, Copy)]
pub struct Binding<'a> {
    pub actor: &'a ActorDescriptor,
    pub nets: &'a NetTable,
    /// Zero-based firing within one schedule iteration.
    pub firing: u32,
}

/// Resolve every placeholder in `template`.
pub fn resolve(template: &str, binding: &Binding<'_>, symbols: &mut SymbolTable) -> GenResult<String> {
    resolve_at(template, binding, symbols, 0)
}

fn resolve_at(
    template: &str,
    binding: &Binding<'_>,
    symbols: &mut SymbolTable,
    depth: usize,
) -> GenResult<String> {
    let actor = &binding.actor.name;
    if depth > MAX_DEPTH {
        return Err(GenError::resolution(
            actor.as_str(),
            excerpt(template),
            format!("placeholder expansion nested deeper than {}", MAX_DEPTH),
        ));
    }

    let segments =
        scan(template).map_err(|e| GenError::resolution(actor.as_str(), e.token, e.message))?;
    let mut out = String::with_capacity(template.len());

    for segment in segments {
        match segment {
            Segment::Text(text) => out.push_str(text),
            Segment::Dollar => out.push('$'),
            Segment::Macro { name, args, source } => {
                let mut resolved_args = Vec::new();
                for arg in split_top_level_commas(args) {
                    resolved_args.push(resolve_at(arg, binding, symbols, depth + 1)?);
                }
                let arg_refs: Vec<&str> = resolved_args.iter().map(String::as_str).collect();
                let placeholder = Placeholder::parse(name, &arg_refs)
                    .map_err(|m| GenError::resolution(actor.as_str(), source, m))?;
                let text = expand(&placeholder, binding, symbols)
                    .map_err(|m| GenError::resolution(actor.as_str(), source, m))?;
                if text.contains('$') {
                    out.push_str(&resolve_at(&text, binding, symbols, depth + 1)?);
                } else {
                    out.push_str(&text);
                }
            }
        }
    }
    Ok(out)
}

fn excerpt(template: &str) -> String {
    template.chars().take(40).collect()
}

fn expand(
    placeholder: &Placeholder,
    binding: &Binding<'_>,
    symbols: &mut SymbolTable,
) -> Result<String, String> {
    let actor = binding.actor;
    match placeholder {
        Placeholder::Ref {
            name,
            channel,
            index,
        } => {
            if let Some(port) = actor.port(name) {
                port_reference(port, *channel, index.as_ref(), binding)
            } else if let Some(param) = actor.param(name) {
                if channel.is_some() {
                    return Err(format!("parameter '{}' has no channels", name));
                }
                let sym = symbols.state_variable(&actor.name, param)?;
                match index {
                    None => Ok(sym),
                    Some(Index::Literal(i)) => {
                        let size = param.value.size();
                        if (*i as usize) >= size {
                            return Err(format!(
                                "index {} out of range: '{}' has {} element(s)",
                                i, name, size
                            ));
                        }
                        Ok(format!("{}[{}]", sym, i))
                    }
                    Some(Index::Expr(e)) => Ok(format!("{}[{}]", sym, e)),
                }
            } else {
                Err(format!("no port or parameter named '{}'", name))
            }
        }
        Placeholder::Val(name) => match actor.param(name) {
            Some(param) => Ok(param.value.literal()),
            None if actor.port(name).is_some() => {
                Err(format!("'{}' is a port; $val applies to parameters", name))
            }
            None => Err(format!("no parameter named '{}'", name)),
        },
        Placeholder::Size(name) => {
            if let Some(param) = actor.param(name) {
                Ok(param.value.size().to_string())
            } else if let Some(port) = actor.port(name) {
                if port.multi {
                    Ok(port.width().to_string())
                } else {
                    Ok(port.samples.to_string())
                }
            } else {
                Err(format!("no port or parameter named '{}'", name))
            }
        }
        Placeholder::Precision { port, channel } => {
            let p = actor
                .port(port)
                .ok_or_else(|| format!("no port named '{}'", port))?;
            if p.dtype != crate::types::DataType::Fix {
                return Err(format!("'{}' is a {} port, not fixed-point", port, p.dtype));
            }
            let state = match p.direction {
                Direction::Output if channel.is_none() => p.precision.clone(),
                // A consumer that fixed its input precision reads with it.
                Direction::Input if matches!(p.precision, PrecisionState::Fixed(_)) => {
                    p.precision.clone()
                }
                _ => {
                    let net = channel_net(p, *channel)?;
                    match (&p.direction, &binding.nets.get(net).precision) {
                        (Direction::Input, PrecisionState::Unspecified) => {
                            return Err(format!(
                                "no precision arrives at '{}'; its producer never set one",
                                port
                            ))
                        }
                        (_, state) => state.clone(),
                    }
                }
            };
            state.expression().map_err(|m| format!("'{}': {}", port, m))
        }
        Placeholder::StarSymbol(name) => Ok(symbols.star_symbol(&actor.name, name)),
        Placeholder::SharedSymbol { class, name } => symbols.shared_symbol(class, name),
        Placeholder::Type(name) => {
            if let Some(port) = actor.port(name) {
                Ok(port.dtype.c_type().to_string())
            } else if let Some(param) = actor.param(name) {
                Ok(param.ty.c_type().to_string())
            } else {
                Err(format!("no port or parameter named '{}'", name))
            }
        }
    }
}

/// The net behind `port` for an optional 1-based channel.
fn channel_net(port: &Port, channel: Option<u32>) -> Result<NetId, String> {
    let width = port.width();
    let ch = match (port.multi, channel) {
        (true, None) => {
            return Err(format!(
                "'{}' is a multiport; name a channel as '{}#i'",
                port.name, port.name
            ))
        }
        (false, Some(c)) => {
            return Err(format!(
                "'{}' is not a multiport and has no channel #{}",
                port.name, c
            ))
        }
        (true, Some(c)) => c as usize,
        (false, None) => 1,
    };
    if width == 0 {
        return Err(format!("port '{}' is not connected", port.name));
    }
    if ch > width {
        return Err(format!(
            "channel #{} out of range: '{}' has {} connected channel(s)",
            ch, port.name, width
        ));
    }
    Ok(port.channels[ch - 1])
}

fn port_reference(
    port: &Port,
    channel: Option<u32>,
    index: Option<&Index>,
    binding: &Binding<'_>,
) -> Result<String, String> {
    let net = channel_net(port, channel)?;
    let buffer = binding.nets.get(net).buffer.as_ref().ok_or_else(|| {
        format!(
            "buffer for '{}' is not planned yet; ports can be referenced only after Initialize",
            port.name
        )
    })?;
    let base = binding.firing * port.samples;

    match index {
        Some(Index::Literal(i)) if *i >= port.samples => Err(format!(
            "index {} out of range: '{}' moves {} sample(s) per firing",
            i, port.name, port.samples
        )),
        Some(Index::Expr(_)) if buffer.size == 1 => Err(format!(
            "'{}' has a scalar buffer and cannot be indexed by an expression",
            port.name
        )),
        _ if buffer.size == 1 => Ok(buffer.name.clone()),
        Some(Index::Expr(e)) if base == 0 => Ok(format!("{}[{}]", buffer.name, e)),
        Some(Index::Expr(e)) => Ok(format!("{}[{} + ({})]", buffer.name, base, e)),
        Some(Index::Literal(i)) => Ok(format!("{}[{}]", buffer.name, base + i)),
        None => Ok(format!("{}[{}]", buffer.name, base)),
    }
}

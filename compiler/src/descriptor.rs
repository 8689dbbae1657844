// descriptor.rs — Star classes and actor descriptors
//
// A `StarClass` is the declaration of a star: ports, parameters with default
// expressions, required headers, and an ordered list of hooks per lifecycle
// phase. `StarClass::instantiate` produces an `ActorDescriptor`, the
// generation-time binding context of one star instance. Descriptors live
// only for the single generation pass.
//
// Preconditions: parameter overrides are literal expressions.
// Postconditions: every parameter holds a value of its declared type.
// Failure modes: unknown parameters, malformed values, rejected configuration.
// Side effects: none.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::codeblock::CodeBlockLibrary;
use crate::codegen::StarCtx;
use crate::diag::{GenError, GenResult};
use crate::id::{ActorId, NetId};
use crate::precision::PrecisionState;
use crate::types::{DataType, ParamType, ParamValue};

// ── Declarations ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Direction {
    Input,
    Output,
}

/// A port as declared by a star class.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortDecl {
    pub name: String,
    pub direction: Direction,
    /// A multiport (bus) gains one channel per connection.
    pub multi: bool,
    pub dtype: DataType,
    /// Samples consumed or produced per firing.
    pub samples: u32,
}

impl PortDecl {
    pub fn input(name: &str, dtype: DataType) -> Self {
        PortDecl {
            name: name.to_string(),
            direction: Direction::Input,
            multi: false,
            dtype,
            samples: 1,
        }
    }

    pub fn output(name: &str, dtype: DataType) -> Self {
        PortDecl {
            direction: Direction::Output,
            ..PortDecl::input(name, dtype)
        }
    }

    pub fn multi_input(name: &str, dtype: DataType) -> Self {
        PortDecl {
            multi: true,
            ..PortDecl::input(name, dtype)
        }
    }

    pub fn multi_output(name: &str, dtype: DataType) -> Self {
        PortDecl {
            multi: true,
            ..PortDecl::output(name, dtype)
        }
    }

    pub fn with_samples(mut self, samples: u32) -> Self {
        self.samples = samples;
        self
    }
}

/// A parameter as declared by a star class.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamDecl {
    pub name: String,
    pub ty: ParamType,
    /// Default expression, evaluated at instantiation.
    pub default: String,
    /// States may be rewritten by hooks during generation.
    pub mutable: bool,
}

impl ParamDecl {
    pub fn new(name: &str, ty: ParamType, default: &str) -> Self {
        ParamDecl {
            name: name.to_string(),
            ty,
            default: default.to_string(),
            mutable: false,
        }
    }

    pub fn state(name: &str, ty: ParamType, default: &str) -> Self {
        ParamDecl {
            mutable: true,
            ..ParamDecl::new(name, ty, default)
        }
    }
}

// ── Lifecycle ───────────────────────────────────────────────────────────────

/// Code-emission phases, in the order the assembler runs them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Phase {
    PreInitialize,
    Initialize,
    Fire,
    Wrapup,
}

impl Phase {
    pub const ALL: [Phase; 4] = [
        Phase::PreInitialize,
        Phase::Initialize,
        Phase::Fire,
        Phase::Wrapup,
    ];
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::PreInitialize => "preinitialize",
            Phase::Initialize => "initialize",
            Phase::Fire => "fire",
            Phase::Wrapup => "wrapup",
        };
        f.write_str(s)
    }
}

/// Generation-time state of one actor instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Lifecycle {
    Declared,
    PreInitialized,
    Initialized,
    FireEmitted,
    WrappedUp,
    Done,
}

impl Lifecycle {
    fn can_advance_to(self, next: Lifecycle) -> bool {
        use Lifecycle::*;
        matches!(
            (self, next),
            (Declared, PreInitialized)
                | (PreInitialized, Initialized)
                | (Initialized, FireEmitted)
                | (FireEmitted, FireEmitted)
                | (Initialized, WrappedUp)
                | (FireEmitted, WrappedUp)
                | (WrappedUp, Done)
        )
    }
}

// ── Hooks ───────────────────────────────────────────────────────────────────

/// A code-emitting hook for one phase.
pub type Hook = fn(&mut StarCtx<'_>) -> GenResult<()>;

/// A descriptor-construction hook; runs once parameter values are known.
pub type Configure = fn(&mut ActorDescriptor) -> GenResult<()>;

/// Ordered hook slots per phase. Composition is explicit: a derived star
/// appends its hooks after the base hooks it extends.
#[derive(Clone, Default)]
pub struct PhaseHooks {
    pub configure: Vec<Configure>,
    pub preinitialize: Vec<Hook>,
    pub initialize: Vec<Hook>,
    pub fire: Vec<Hook>,
    pub wrapup: Vec<Hook>,
}

impl PhaseHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, phase: Phase, hook: Hook) -> Self {
        match phase {
            Phase::PreInitialize => self.preinitialize.push(hook),
            Phase::Initialize => self.initialize.push(hook),
            Phase::Fire => self.fire.push(hook),
            Phase::Wrapup => self.wrapup.push(hook),
        }
        self
    }

    pub fn configure_with(mut self, f: Configure) -> Self {
        self.configure.push(f);
        self
    }

    /// Base hooks first, then `ext`'s hooks, slot by slot.
    pub fn extend(mut self, ext: PhaseHooks) -> Self {
        self.configure.extend(ext.configure);
        self.preinitialize.extend(ext.preinitialize);
        self.initialize.extend(ext.initialize);
        self.fire.extend(ext.fire);
        self.wrapup.extend(ext.wrapup);
        self
    }

    pub fn for_phase(&self, phase: Phase) -> &[Hook] {
        match phase {
            Phase::PreInitialize => &self.preinitialize,
            Phase::Initialize => &self.initialize,
            Phase::Fire => &self.fire,
            Phase::Wrapup => &self.wrapup,
        }
    }
}

impl fmt::Debug for PhaseHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhaseHooks")
            .field("configure", &self.configure.len())
            .field("preinitialize", &self.preinitialize.len())
            .field("initialize", &self.initialize.len())
            .field("fire", &self.fire.len())
            .field("wrapup", &self.wrapup.len())
            .finish()
    }
}

// ── Star class ──────────────────────────────────────────────────────────────

/// Declaration of a star: the template instances are created from.
#[derive(Debug, Clone)]
pub struct StarClass {
    pub name: String,
    pub ports: Vec<PortDecl>,
    pub params: Vec<ParamDecl>,
    pub includes: Vec<String>,
    pub hooks: PhaseHooks,
    pub blocks: Arc<CodeBlockLibrary>,
}

/// Serializable view of a class used for the library fingerprint.
#[derive(Debug, Serialize)]
pub struct ClassSignature<'a> {
    pub name: &'a str,
    pub ports: &'a [PortDecl],
    pub params: &'a [ParamDecl],
    pub includes: &'a [String],
    pub blocks: Vec<String>,
}

/// Failure to instantiate a star class.
#[derive(Debug, Clone, PartialEq)]
pub enum InstantiateError {
    UnknownParam(String),
    BadValue { param: String, message: String },
    Rejected(GenError),
}

impl fmt::Display for InstantiateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstantiateError::UnknownParam(p) => write!(f, "no parameter named '{}'", p),
            InstantiateError::BadValue { param, message } => {
                write!(f, "parameter '{}': {}", param, message)
            }
            InstantiateError::Rejected(e) => write!(f, "{}", e),
        }
    }
}

impl StarClass {
    pub fn new(name: &str) -> Self {
        StarClass {
            name: name.to_string(),
            ports: Vec::new(),
            params: Vec::new(),
            includes: Vec::new(),
            hooks: PhaseHooks::new(),
            blocks: Arc::new(CodeBlockLibrary::default()),
        }
    }

    pub fn port(mut self, decl: PortDecl) -> Self {
        self.ports.push(decl);
        self
    }

    pub fn param(mut self, decl: ParamDecl) -> Self {
        self.params.push(decl);
        self
    }

    pub fn include(mut self, header: &str) -> Self {
        self.includes.push(header.to_string());
        self
    }

    pub fn hooks(mut self, hooks: PhaseHooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn blocks(mut self, blocks: Arc<CodeBlockLibrary>) -> Self {
        self.blocks = blocks;
        self
    }

    pub fn signature(&self) -> ClassSignature<'_> {
        ClassSignature {
            name: &self.name,
            ports: &self.ports,
            params: &self.params,
            includes: &self.includes,
            blocks: self.blocks.keys(),
        }
    }

    /// Create a descriptor for instance `name`, applying parameter
    /// overrides in order and then the class's configure hooks.
    pub fn instantiate(
        &self,
        id: ActorId,
        name: &str,
        overrides: &[(&str, &str)],
    ) -> Result<ActorDescriptor, InstantiateError> {
        let mut params = Vec::with_capacity(self.params.len());
        for decl in &self.params {
            let value = ParamValue::parse(&decl.ty, &decl.default).map_err(|message| {
                InstantiateError::BadValue {
                    param: decl.name.clone(),
                    message: format!("default '{}': {}", decl.default, message),
                }
            })?;
            params.push(Parameter {
                name: decl.name.clone(),
                ty: decl.ty.clone(),
                expr: decl.default.clone(),
                value,
                mutable: decl.mutable,
            });
        }

        for &(pname, expr) in overrides {
            let param = params
                .iter_mut()
                .find(|p| p.name == pname)
                .ok_or_else(|| InstantiateError::UnknownParam(pname.to_string()))?;
            param.value = ParamValue::parse(&param.ty, expr).map_err(|message| {
                InstantiateError::BadValue {
                    param: pname.to_string(),
                    message,
                }
            })?;
            param.expr = expr.to_string();
        }

        let ports = self
            .ports
            .iter()
            .map(|d| Port {
                name: d.name.clone(),
                direction: d.direction,
                multi: d.multi,
                declared: d.dtype,
                dtype: d.dtype,
                samples: d.samples,
                precision: PrecisionState::Unspecified,
                channels: Vec::new(),
            })
            .collect();

        let mut actor = ActorDescriptor {
            id,
            name: name.to_string(),
            class: self.name.clone(),
            ports,
            params,
            includes: self.includes.clone(),
            hooks: self.hooks.clone(),
            blocks: Arc::clone(&self.blocks),
            lifecycle: Lifecycle::Declared,
        };

        for configure in self.hooks.configure.clone() {
            configure(&mut actor).map_err(InstantiateError::Rejected)?;
        }
        Ok(actor)
    }
}

// ── Instances ───────────────────────────────────────────────────────────────

/// A port of one actor instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Port {
    pub name: String,
    pub direction: Direction,
    pub multi: bool,
    /// Type as declared (may be `Any`).
    pub declared: DataType,
    /// Type after resolution.
    pub dtype: DataType,
    pub samples: u32,
    pub precision: PrecisionState,
    /// One net per connected channel, in connection order.
    pub channels: Vec<NetId>,
}

impl Port {
    pub fn width(&self) -> usize {
        self.channels.len()
    }
}

/// A parameter of one actor instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub ty: ParamType,
    /// The expression the current value was evaluated from.
    pub expr: String,
    pub value: ParamValue,
    pub mutable: bool,
}

/// The binding context of one star instance during generation.
#[derive(Debug, Clone)]
pub struct ActorDescriptor {
    pub id: ActorId,
    pub name: String,
    pub class: String,
    pub ports: Vec<Port>,
    pub params: Vec<Parameter>,
    pub includes: Vec<String>,
    pub hooks: PhaseHooks,
    pub blocks: Arc<CodeBlockLibrary>,
    lifecycle: Lifecycle,
}

impl ActorDescriptor {
    pub fn port(&self, name: &str) -> Option<&Port> {
        self.ports.iter().find(|p| p.name == name)
    }

    pub fn port_mut(&mut self, name: &str) -> Option<&mut Port> {
        self.ports.iter_mut().find(|p| p.name == name)
    }

    pub fn param(&self, name: &str) -> Option<&Parameter> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Value of a parameter that must exist; missing ones are a validation error.
    pub fn value(&self, name: &str) -> GenResult<&ParamValue> {
        self.param(name)
            .map(|p| &p.value)
            .ok_or_else(|| GenError::validation(&self.name, name, "no such parameter"))
    }

    /// Rewrite a state during generation. Constant parameters are read-only.
    pub fn set_param(&mut self, name: &str, value: ParamValue) -> GenResult<()> {
        let actor = self.name.clone();
        let param = self
            .params
            .iter_mut()
            .find(|p| p.name == name)
            .ok_or_else(|| GenError::validation(actor.as_str(), name, "no such parameter"))?;
        if !param.mutable {
            return Err(GenError::validation(actor, name, "parameter is not a state"));
        }
        param.value = value;
        Ok(())
    }

    /// Set the declared type of a port. Used by configure hooks.
    pub fn set_port_type(&mut self, name: &str, dtype: DataType) -> GenResult<()> {
        let actor = self.name.clone();
        let port = self
            .port_mut(name)
            .ok_or_else(|| GenError::validation(actor, name, "no such port"))?;
        port.declared = dtype;
        port.dtype = dtype;
        Ok(())
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    /// Fail unless the actor may move to `next`.
    pub fn check_transition(&self, next: Lifecycle) -> GenResult<()> {
        if self.lifecycle.can_advance_to(next) {
            Ok(())
        } else {
            Err(GenError::Lifecycle {
                actor: self.name.clone(),
                from: self.lifecycle,
                to: next,
            })
        }
    }

    /// Move to `next`, rejecting out-of-order transitions.
    pub fn advance(&mut self, next: Lifecycle) -> GenResult<()> {
        self.check_transition(next)?;
        self.lifecycle = next;
        Ok(())
    }
}

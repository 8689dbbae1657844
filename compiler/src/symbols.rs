// symbols.rs — Generated-symbol namespace
//
// One table per generation pass, passed explicitly through the assembler.
// Tracks every C identifier handed out so instance symbols, state
// variables and buffers never collide, the (class, name) registry of
// shared procedures with insert-once semantics, and the include set.

use std::collections::{HashMap, HashSet};

use crate::descriptor::Parameter;
use crate::diag::{GenError, GenResult};
use crate::types::{c_string_literal, ParamValue};

#[derive(Debug, Clone)]
struct SharedEntry {
    body: String,
    owner: String,
}

#[derive(Debug, Default)]
pub struct SymbolTable {
    taken: HashSet<String>,
    star: HashMap<(String, String), String>,
    states: HashMap<(String, String), String>,
    shared: HashMap<(String, String), SharedEntry>,
    shared_names: HashSet<String>,
    includes: HashSet<String>,
    pending: Vec<String>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a fresh identifier based on `base`, suffixing `_2`, `_3`, ...
    /// when it is already taken.
    pub fn claim(&mut self, base: &str) -> String {
        let mut candidate = base.to_string();
        let mut n = 2;
        while self.taken.contains(&candidate) {
            candidate = format!("{}_{}", base, n);
            n += 1;
        }
        self.taken.insert(candidate.clone());
        candidate
    }

    /// `$starSymbol(name)` for `instance`: stable across calls.
    pub fn star_symbol(&mut self, instance: &str, name: &str) -> String {
        let key = (instance.to_string(), name.to_string());
        if let Some(sym) = self.star.get(&key) {
            return sym.clone();
        }
        let sym = self.claim(&format!("{}_{}", instance, name));
        self.star.insert(key, sym.clone());
        sym
    }

    /// `$sharedSymbol(class, name)`: one name for every instance of `class`.
    /// Fails when an instance symbol already holds the name.
    pub fn shared_symbol(&mut self, class: &str, name: &str) -> Result<String, String> {
        let sym = format!("{}_{}", class, name);
        if self.shared_names.contains(&sym) {
            return Ok(sym);
        }
        if self.taken.contains(&sym) {
            return Err(format!(
                "shared symbol '{}' is already taken by an instance symbol",
                sym
            ));
        }
        self.taken.insert(sym.clone());
        self.shared_names.insert(sym.clone());
        Ok(sym)
    }

    /// The state variable backing `$ref(param)`. The first reference
    /// queues its declaration, initialized with the parameter's value.
    pub fn state_variable(&mut self, instance: &str, param: &Parameter) -> Result<String, String> {
        let key = (instance.to_string(), param.name.clone());
        if let Some(sym) = self.states.get(&key) {
            return Ok(sym.clone());
        }
        let ctype = param.ty.c_type();
        let decl = |sym: &str| match &param.value {
            ParamValue::Int(_) | ParamValue::Float(_) => Ok(format!(
                "static {} {} = {};",
                ctype,
                sym,
                param.value.literal()
            )),
            ParamValue::Str(s) => Ok(format!("static {} {} = {};", ctype, sym, c_string_literal(s))),
            ParamValue::IntArray(v) if !v.is_empty() => Ok(format!(
                "static {} {}[{}] = {};",
                ctype,
                sym,
                v.len(),
                param.value.literal()
            )),
            ParamValue::FloatArray(v) if !v.is_empty() => Ok(format!(
                "static {} {}[{}] = {};",
                ctype,
                sym,
                v.len(),
                param.value.literal()
            )),
            ParamValue::IntArray(_) | ParamValue::FloatArray(_) => {
                Err(format!("empty array '{}' has no storage", param.name))
            }
            ParamValue::Precision(_) => {
                Err(format!("precision parameter '{}' has no storage", param.name))
            }
        };
        let candidate = format!("{}_{}", instance, param.name);
        // Validate before claiming so a failed reference leaves no trace.
        decl(&candidate)?;
        let sym = self.claim(&candidate);
        self.pending.push(decl(&sym)?);
        self.states.insert(key, sym.clone());
        Ok(sym)
    }

    /// Register a shared procedure body. Returns `true` the first time the
    /// (class, name) pair is seen; a byte-identical body later is a no-op,
    /// any other body is a collision.
    pub fn register_shared(
        &mut self,
        class: &str,
        name: &str,
        body: &str,
        owner: &str,
    ) -> GenResult<bool> {
        let key = (class.to_string(), name.to_string());
        match self.shared.get(&key) {
            Some(entry) if entry.body == body => Ok(false),
            Some(entry) => Err(GenError::NamespaceCollision {
                class: class.to_string(),
                symbol: format!("{}_{}", class, name),
                first: entry.owner.clone(),
                second: owner.to_string(),
            }),
            None => {
                self.shared.insert(
                    key,
                    SharedEntry {
                        body: body.to_string(),
                        owner: owner.to_string(),
                    },
                );
                Ok(true)
            }
        }
    }

    /// Record a required header. Returns `true` the first time it is seen.
    pub fn include(&mut self, header: &str) -> bool {
        self.includes.insert(header.to_string())
    }

    /// Declarations queued by resolution since the last call.
    pub fn take_pending(&mut self) -> Vec<String> {
        std::mem::take(&mut self.pending)
    }
}

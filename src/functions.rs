//! The function registry (`spec.md` §4.5, §6).
//!
//! A pure/multi-valued/filter function is registered by name with ordered
//! arg and return field names, a variadic flag, and an optional
//! cardinality estimator. Filter functions declare no return names; they
//! only accept or reject a fully-bound prefix.

use std::collections::HashMap;

use crate::raw_value::RawValue;

/// How a registered function computes its result.
#[derive(Clone, Copy)]
pub enum FunctionEval {
    /// Exactly zero or one result tuple. `None` means the function is
    /// undefined on these inputs (the candidate is dropped, not an error).
    Pure(fn(&[RawValue]) -> Option<Vec<RawValue>>),
    /// Zero or more result tuples (`spec.md` §4.5 "optionally
    /// multi-valued").
    Multi(fn(&[RawValue]) -> Vec<Vec<RawValue>>),
    /// No outputs; only accepts or rejects.
    Filter(fn(&[RawValue]) -> bool),
}

#[derive(Clone)]
pub struct FunctionSpec {
    pub name: String,
    pub arg_names: Vec<String>,
    pub return_names: Vec<String>,
    pub variadic: bool,
    pub estimate: Option<fn(&[RawValue]) -> usize>,
    pub eval: FunctionEval,
}

impl FunctionSpec {
    pub fn arity(&self) -> usize {
        self.arg_names.len()
    }

    pub fn output_arity(&self) -> usize {
        self.return_names.len()
    }

    pub fn is_filter(&self) -> bool {
        matches!(self.eval, FunctionEval::Filter(_))
    }
}

/// Name → [`FunctionSpec`] lookup, populated at startup (`spec.md` §6:
/// "Pure/multi functions are registered by name at startup").
#[derive(Default, Clone)]
pub struct FunctionRegistry {
    functions: HashMap<String, FunctionSpec>,
}

impl FunctionRegistry {
    /// An empty registry — no built-ins.
    pub fn empty() -> Self {
        FunctionRegistry::default()
    }

    /// A registry pre-populated with the small set of arithmetic,
    /// comparison, and string built-ins a worked rule set needs
    /// (`SPEC_FULL.md` §6).
    pub fn new() -> Self {
        let mut registry = FunctionRegistry::empty();
        registry.register(builtins::plus());
        registry.register(builtins::minus());
        registry.register(builtins::times());
        registry.register(builtins::divide());
        registry.register(builtins::equal());
        registry.register(builtins::less_than());
        registry.register(builtins::less_or_equal());
        registry.register(builtins::greater_than());
        registry.register(builtins::greater_or_equal());
        registry.register(builtins::concat());
        registry
    }

    pub fn register(&mut self, spec: FunctionSpec) {
        self.functions.insert(spec.name.clone(), spec);
    }

    pub fn get(&self, name: &str) -> Option<&FunctionSpec> {
        self.functions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }
}

mod builtins {
    use super::{FunctionEval, FunctionSpec};
    use crate::raw_value::RawValue;

    fn binary_numeric(name: &str) -> FunctionSpec {
        FunctionSpec {
            name: name.to_string(),
            arg_names: vec!["a".into(), "b".into()],
            return_names: vec!["result".into()],
            variadic: false,
            estimate: None,
            eval: FunctionEval::Pure(match name {
                "+" => |args| numeric_pair(args).map(|(a, b)| vec![RawValue::number(a + b)]),
                "-" => |args| numeric_pair(args).map(|(a, b)| vec![RawValue::number(a - b)]),
                "*" => |args| numeric_pair(args).map(|(a, b)| vec![RawValue::number(a * b)]),
                "/" => |args| numeric_pair(args).filter(|&(_, b)| b != 0.0).map(|(a, b)| vec![RawValue::number(a / b)]),
                _ => unreachable!("binary_numeric only called with the four arithmetic operators"),
            }),
        }
    }

    fn numeric_pair(args: &[RawValue]) -> Option<(f64, f64)> {
        match args {
            [a, b] => Some((a.as_number()?, b.as_number()?)),
            _ => None,
        }
    }

    pub fn plus() -> FunctionSpec {
        binary_numeric("+")
    }

    pub fn minus() -> FunctionSpec {
        binary_numeric("-")
    }

    pub fn times() -> FunctionSpec {
        binary_numeric("*")
    }

    pub fn divide() -> FunctionSpec {
        binary_numeric("/")
    }

    fn filter(name: &str, eval: fn(&[RawValue]) -> bool) -> FunctionSpec {
        FunctionSpec {
            name: name.to_string(),
            arg_names: vec!["a".into(), "b".into()],
            return_names: Vec::new(),
            variadic: false,
            estimate: None,
            eval: FunctionEval::Filter(eval),
        }
    }

    pub fn equal() -> FunctionSpec {
        filter("==", |args| matches!(args, [a, b] if a == b))
    }

    pub fn less_than() -> FunctionSpec {
        filter("<", |args| matches!(args, [a, b] if a < b))
    }

    pub fn less_or_equal() -> FunctionSpec {
        filter("<=", |args| matches!(args, [a, b] if a <= b))
    }

    pub fn greater_than() -> FunctionSpec {
        filter(">", |args| matches!(args, [a, b] if a > b))
    }

    pub fn greater_or_equal() -> FunctionSpec {
        filter(">=", |args| matches!(args, [a, b] if a >= b))
    }

    pub fn concat() -> FunctionSpec {
        FunctionSpec {
            name: "concat".to_string(),
            arg_names: vec!["a".into(), "b".into()],
            return_names: vec!["result".into()],
            variadic: true,
            estimate: None,
            eval: FunctionEval::Pure(|args| {
                let mut out = String::new();
                for arg in args {
                    out.push_str(&arg.to_string());
                }
                Some(vec![RawValue::string(out)])
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_has_arithmetic_and_filters() {
        let registry = FunctionRegistry::new();
        assert!(registry.contains("+"));
        assert!(registry.get("<").unwrap().is_filter());
    }

    #[test]
    fn plus_adds_two_numbers() {
        let registry = FunctionRegistry::new();
        let spec = registry.get("+").unwrap();
        let FunctionEval::Pure(f) = spec.eval else { panic!("expected pure eval") };
        let result = f(&[RawValue::number(2.0), RawValue::number(3.0)]).unwrap();
        assert_eq!(result[0].as_number(), Some(5.0));
    }
}

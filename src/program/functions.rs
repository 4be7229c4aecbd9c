use crate::error::{Result, SymbindError};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Fixed function vocabulary a program may use.
///
/// Guarded operations follow the fitting engine's numeric policy: `div` and
/// `inv` return `1.0` when their denominator is exactly zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Function {
    Sum,
    Sub,
    Mul,
    Div,
    Pow,
    Max,
    Min,
    Abs,
    Neg,
    Inv,
    Square,
    Cos,
    Sin,
    Exp,
    Log,
}

/// Value returned by a guarded operation instead of dividing by zero.
pub const PROTECTED_DIVISION_SENTINEL: f64 = 1.0;

impl Function {
    pub const ALL: [Function; 15] = [
        Function::Sum,
        Function::Sub,
        Function::Mul,
        Function::Div,
        Function::Pow,
        Function::Max,
        Function::Min,
        Function::Abs,
        Function::Neg,
        Function::Inv,
        Function::Square,
        Function::Cos,
        Function::Sin,
        Function::Exp,
        Function::Log,
    ];

    /// Canonical name, as emitted by the engine.
    pub fn name(&self) -> &'static str {
        match self {
            Function::Sum => "sum",
            Function::Sub => "sub",
            Function::Mul => "mul",
            Function::Div => "div",
            Function::Pow => "pow",
            Function::Max => "max",
            Function::Min => "min",
            Function::Abs => "abs",
            Function::Neg => "neg",
            Function::Inv => "inv",
            Function::Square => "square",
            Function::Cos => "cos",
            Function::Sin => "sin",
            Function::Exp => "exp",
            Function::Log => "log",
        }
    }

    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            Function::Sum => &["add", "+"],
            Function::Sub => &["-"],
            Function::Mul => &["*"],
            Function::Div => &["/"],
            _ => &[],
        }
    }

    /// Name of the equivalent numpy ufunc, as printed in `np.<name>(...)`.
    pub fn numpy_name(&self) -> &'static str {
        match self {
            Function::Sum => "add",
            Function::Sub => "subtract",
            Function::Mul => "multiply",
            Function::Div => "divide",
            Function::Pow => "power",
            Function::Max => "maximum",
            Function::Min => "minimum",
            Function::Abs => "absolute",
            Function::Neg => "negative",
            Function::Inv => "reciprocal",
            other => other.name(),
        }
    }

    /// Infix symbol, for the four arithmetic operators.
    pub fn symbol(&self) -> Option<&'static str> {
        match self {
            Function::Sum => Some("+"),
            Function::Sub => Some("-"),
            Function::Mul => Some("*"),
            Function::Div => Some("/"),
            _ => None,
        }
    }

    pub fn arity(&self) -> usize {
        match self {
            Function::Sum
            | Function::Sub
            | Function::Mul
            | Function::Div
            | Function::Pow
            | Function::Max
            | Function::Min => 2,
            _ => 1,
        }
    }

    /// Applies the function to already-evaluated operands.
    ///
    /// `args.len()` must equal `arity()`; the parser enforces this.
    pub fn apply(&self, args: &[f64]) -> f64 {
        match self {
            Function::Sum => args[0] + args[1],
            Function::Sub => args[0] - args[1],
            Function::Mul => args[0] * args[1],
            Function::Div => {
                if args[1] == 0.0 {
                    PROTECTED_DIVISION_SENTINEL
                } else {
                    args[0] / args[1]
                }
            }
            Function::Pow => args[0].powf(args[1]),
            Function::Max => {
                if args[0] > args[1] {
                    args[0]
                } else {
                    args[1]
                }
            }
            Function::Min => {
                if args[0] < args[1] {
                    args[0]
                } else {
                    args[1]
                }
            }
            Function::Abs => args[0].abs(),
            Function::Neg => -args[0],
            Function::Inv => {
                if args[0] == 0.0 {
                    PROTECTED_DIVISION_SENTINEL
                } else {
                    1.0 / args[0]
                }
            }
            Function::Square => args[0] * args[0],
            Function::Cos => args[0].cos(),
            Function::Sin => args[0].sin(),
            Function::Exp => args[0].exp(),
            Function::Log => args[0].ln(),
        }
    }
}

impl std::fmt::Display for Function {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Name and alias lookup over the vocabulary.
pub struct FunctionRegistry {
    functions: HashMap<&'static str, Function>,
    numpy: HashMap<&'static str, Function>,
}

/// Prefix of numpy-qualified function names.
pub const NUMPY_PREFIX: &str = "np.";

static REGISTRY: Lazy<FunctionRegistry> = Lazy::new(FunctionRegistry::new);

impl FunctionRegistry {
    pub fn new() -> Self {
        let mut functions = HashMap::new();
        let mut numpy = HashMap::new();
        for function in Function::ALL {
            functions.insert(function.name(), function);
            for alias in function.aliases() {
                functions.insert(*alias, function);
            }
            numpy.insert(function.numpy_name(), function);
        }
        Self { functions, numpy }
    }

    /// Shared registry; the vocabulary is fixed so one instance suffices.
    pub fn global() -> &'static FunctionRegistry {
        &REGISTRY
    }

    /// Looks up a name or alias, case-insensitively as a fallback.
    /// `np.`-qualified names resolve through numpy ufunc names first.
    pub fn get(&self, name: &str) -> Option<Function> {
        if let Some(bare) = name.strip_prefix(NUMPY_PREFIX) {
            return self.numpy.get(bare).or_else(|| self.functions.get(bare)).copied();
        }
        self.functions
            .get(name)
            .or_else(|| self.functions.get(name.to_ascii_lowercase().as_str()))
            .copied()
    }

    /// Parses a comma-separated function set such as `"sum,sub,mul,div"`.
    ///
    /// Whitespace, case and aliases are tolerated; see
    /// [`FunctionRegistry::canonical_function_set`] for the form the engine
    /// accepts.
    pub fn parse_function_set(&self, funcs: &str) -> Result<Vec<Function>> {
        let mut set = Vec::new();
        for name in funcs.split(',').map(str::trim) {
            let function = self.get(name).ok_or_else(|| {
                SymbindError::Configuration(format!("Unknown function name '{}'", name))
            })?;
            if !set.contains(&function) {
                set.push(function);
            }
        }
        Ok(set)
    }

    /// The function set rewritten with canonical names, comma-separated
    /// without spaces: `"sum, MUL"` becomes `"sum,mul"`.
    pub fn canonical_function_set(&self, funcs: &str) -> Result<String> {
        let names: Vec<&str> = self
            .parse_function_set(funcs)?
            .iter()
            .map(Function::name)
            .collect();
        Ok(names.join(","))
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_resolves_aliases() {
        let registry = FunctionRegistry::new();
        assert_eq!(registry.get("sum"), Some(Function::Sum));
        assert_eq!(registry.get("add"), Some(Function::Sum));
        assert_eq!(registry.get("+"), Some(Function::Sum));
        assert_eq!(registry.get("DIV"), Some(Function::Div));
        assert_eq!(registry.get("foo"), None);
    }

    #[test]
    fn test_protected_division() {
        assert_eq!(Function::Div.apply(&[1.0, 0.0]), PROTECTED_DIVISION_SENTINEL);
        assert_eq!(Function::Div.apply(&[1.0, 4.0]), 0.25);
        assert_eq!(Function::Inv.apply(&[0.0]), PROTECTED_DIVISION_SENTINEL);
        assert_eq!(Function::Inv.apply(&[2.0]), 0.5);
    }

    #[test]
    fn test_parse_function_set() {
        let registry = FunctionRegistry::new();
        let set = registry.parse_function_set("sum, sub,mul,div").unwrap();
        assert_eq!(set, vec![Function::Sum, Function::Sub, Function::Mul, Function::Div]);
        assert!(registry.parse_function_set("sum,tan").is_err());
        assert!(registry.parse_function_set("").is_err());
    }

    #[test]
    fn test_canonical_function_set() {
        let registry = FunctionRegistry::new();
        assert_eq!(registry.canonical_function_set("sum, MUL").unwrap(), "sum,mul");
        assert_eq!(registry.canonical_function_set("+,*,add").unwrap(), "sum,mul");
        assert!(registry.canonical_function_set("sum,,mul").is_err());
    }

    #[test]
    fn test_numpy_names() {
        let registry = FunctionRegistry::new();
        assert_eq!(registry.get("np.add"), Some(Function::Sum));
        assert_eq!(registry.get("np.subtract"), Some(Function::Sub));
        assert_eq!(registry.get("np.multiply"), Some(Function::Mul));
        assert_eq!(registry.get("np.divide"), Some(Function::Div));
        assert_eq!(registry.get("np.power"), Some(Function::Pow));
        assert_eq!(registry.get("np.maximum"), Some(Function::Max));
        assert_eq!(registry.get("np.minimum"), Some(Function::Min));
        assert_eq!(registry.get("np.cos"), Some(Function::Cos));
        assert_eq!(registry.get("np.log"), Some(Function::Log));
        assert_eq!(registry.get("np.square"), Some(Function::Square));
        assert_eq!(registry.get("np.ones"), None);
        assert_eq!(registry.get("os.system"), None);
    }

    #[test]
    fn test_max_min() {
        assert_eq!(Function::Max.apply(&[1.0, 3.0]), 3.0);
        assert_eq!(Function::Min.apply(&[1.0, 3.0]), 1.0);
    }
}

use super::functions::{Function, FunctionRegistry};
use super::parser::MAX_DEPTH;
use crate::error::SymbindError;
use serde::{Deserialize, Serialize};

/// Expression tree of a symbolic program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SerialNode", into = "SerialNode")]
pub enum AstNode {
    Const(f64),
    /// Input feature, bound to column `index` of the evaluated matrix.
    Var(usize),
    Call {
        function: Function,
        args: Vec<AstNode>,
    },
}

impl AstNode {
    pub fn call(function: Function, args: Vec<AstNode>) -> Self {
        AstNode::Call { function, args }
    }

    /// Checks a tree built outside the parser: every call has its function's
    /// arity, every constant is finite and nesting stays within
    /// [`MAX_DEPTH`]. Walks iteratively, so arbitrarily deep input is safe.
    pub fn validate(&self) -> Result<(), SymbindError> {
        let mut pending = vec![(self, 0usize)];
        while let Some((node, depth)) = pending.pop() {
            if depth > MAX_DEPTH {
                return Err(SymbindError::malformed(
                    0,
                    format!("program nests deeper than {} levels", MAX_DEPTH),
                ));
            }
            match node {
                AstNode::Const(v) if !v.is_finite() => {
                    return Err(SymbindError::malformed(0, format!("non-finite constant {}", v)));
                }
                AstNode::Call { function, args } => {
                    if args.len() != function.arity() {
                        return Err(SymbindError::malformed(
                            0,
                            format!(
                                "function '{}' expects {} operands, got {}",
                                function,
                                function.arity(),
                                args.len()
                            ),
                        ));
                    }
                    pending.extend(args.iter().map(|a| (a, depth + 1)));
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Highest variable index referenced, if any.
    pub fn max_var_index(&self) -> Option<usize> {
        match self {
            AstNode::Const(_) => None,
            AstNode::Var(i) => Some(*i),
            AstNode::Call { args, .. } => args.iter().filter_map(AstNode::max_var_index).max(),
        }
    }

    pub fn is_constant(&self) -> bool {
        self.max_var_index().is_none()
    }

    /// Number of nodes in the tree.
    pub fn size(&self) -> usize {
        match self {
            AstNode::Call { args, .. } => 1 + args.iter().map(AstNode::size).sum::<usize>(),
            _ => 1,
        }
    }

    /// Height of the tree; a lone terminal has height 0.
    pub fn height(&self) -> usize {
        match self {
            AstNode::Call { args, .. } => 1 + args.iter().map(AstNode::height).max().unwrap_or(0),
            _ => 0,
        }
    }

    /// Evaluates the tree on one row of feature values.
    ///
    /// Callers check `max_var_index() < row.len()` beforehand.
    pub fn eval_row(&self, row: &[f64]) -> f64 {
        match self {
            AstNode::Const(v) => *v,
            AstNode::Var(i) => row[*i],
            AstNode::Call { function, args } => match args.as_slice() {
                [a] => function.apply(&[a.eval_row(row)]),
                [a, b] => function.apply(&[a.eval_row(row), b.eval_row(row)]),
                _ => {
                    let values: Vec<f64> = args.iter().map(|a| a.eval_row(row)).collect();
                    function.apply(&values)
                }
            },
        }
    }
}

/// Portable tree form: `{"type": "const"|"var"|"func", "value": ..., "operands": [...]}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialNode {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
    #[serde(default)]
    pub operands: Vec<SerialNode>,
}

impl From<AstNode> for SerialNode {
    fn from(node: AstNode) -> Self {
        match node {
            AstNode::Const(v) => SerialNode {
                kind: "const".to_string(),
                value: v.to_string(),
                operands: Vec::new(),
            },
            AstNode::Var(i) => SerialNode {
                kind: "var".to_string(),
                value: i.to_string(),
                operands: Vec::new(),
            },
            AstNode::Call { function, args } => SerialNode {
                kind: "func".to_string(),
                value: function.name().to_string(),
                operands: args.into_iter().map(SerialNode::from).collect(),
            },
        }
    }
}

impl TryFrom<SerialNode> for AstNode {
    type Error = SymbindError;

    fn try_from(serial: SerialNode) -> Result<Self, Self::Error> {
        let bad = |msg: String| SymbindError::malformed(0, msg);
        match serial.kind.as_str() {
            "const" => serial
                .value
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(AstNode::Const)
                .ok_or_else(|| bad(format!("invalid constant '{}'", serial.value))),
            "var" => serial
                .value
                .parse::<usize>()
                .map(AstNode::Var)
                .map_err(|_| bad(format!("invalid variable index '{}'", serial.value))),
            "func" => {
                let function = FunctionRegistry::global()
                    .get(&serial.value)
                    .ok_or_else(|| bad(format!("unknown function '{}'", serial.value)))?;
                if serial.operands.len() != function.arity() {
                    return Err(bad(format!(
                        "function '{}' expects {} operands, got {}",
                        function,
                        function.arity(),
                        serial.operands.len()
                    )));
                }
                let args = serial
                    .operands
                    .into_iter()
                    .map(AstNode::try_from)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(AstNode::Call { function, args })
            }
            other => Err(bad(format!("unknown node type '{}'", other))),
        }
    }
}

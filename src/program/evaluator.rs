use super::ast::AstNode;
use super::display::{render, DisplayFormat};
use super::parser;
use crate::data::Matrix;
use crate::error::{Result, SymbindError};
use rayon::prelude::*;

/// A parsed, immutable symbolic program.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    source: String,
    root: AstNode,
}

impl Program {
    /// Parses a program whose variables are named `X<i>`.
    pub fn parse(source: &str) -> Result<Self> {
        let root = parser::parse(source)?;
        log::debug!("Parsed program '{}' ({} nodes)", source, root.size());
        Ok(Self {
            source: source.to_string(),
            root,
        })
    }

    /// Parses a program that may also refer to features by name.
    pub fn parse_with_names(source: &str, feature_names: &[String]) -> Result<Self> {
        let root = parser::parse_with_names(source, feature_names)?;
        log::debug!("Parsed program '{}' ({} nodes)", source, root.size());
        Ok(Self {
            source: source.to_string(),
            root,
        })
    }

    /// Wraps a tree built outside the parser, after [`AstNode::validate`].
    pub fn from_ast(root: AstNode) -> Result<Self> {
        root.validate()?;
        Ok(Self {
            source: render(&root, DisplayFormat::Code),
            root,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn root(&self) -> &AstNode {
        &self.root
    }

    /// Minimum number of input columns the program needs.
    pub fn n_features_required(&self) -> usize {
        self.root.max_var_index().map_or(0, |i| i + 1)
    }

    fn check_width(&self, n_cols: usize) -> Result<()> {
        let required = self.n_features_required();
        if required > n_cols {
            return Err(SymbindError::Evaluation(format!(
                "program references X{} but the input has {} columns",
                required - 1,
                n_cols
            )));
        }
        Ok(())
    }

    /// Evaluates the program on one row of feature values.
    pub fn evaluate_row(&self, row: &[f64]) -> Result<f64> {
        self.check_width(row.len())?;
        Ok(self.root.eval_row(row))
    }

    /// One prediction per row of `x`, in row order.
    ///
    /// A program without variables yields its constant for every row. Rows
    /// are evaluated in parallel; the output is identical to a sequential
    /// pass.
    pub fn evaluate(&self, x: &Matrix) -> Result<Vec<f64>> {
        self.check_width(x.n_cols())?;
        let root = &self.root;
        Ok(x.rows().par_iter().map(|row| root.eval_row(row)).collect())
    }

    /// Same as [`Program::evaluate`] for any slice of rows.
    pub fn evaluate_rows<R: AsRef<[f64]> + Sync>(&self, rows: &[R]) -> Result<Vec<f64>> {
        for row in rows {
            self.check_width(row.as_ref().len())?;
        }
        let root = &self.root;
        Ok(rows.par_iter().map(|row| root.eval_row(row.as_ref())).collect())
    }

    pub fn display(&self, format: DisplayFormat) -> String {
        render(&self.root, format)
    }

    /// Tree form as JSON, see [`super::ast::SerialNode`].
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.root)?)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let root: AstNode = serde_json::from_str(raw)?;
        Self::from_ast(root)
    }
}

impl std::fmt::Display for Program {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

/// Parses `program_text` and evaluates it on `x`.
pub fn evaluate(program_text: &str, x: &Matrix) -> Result<Vec<f64>> {
    Program::parse(program_text)?.evaluate(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::Function;

    fn matrix(rows: Vec<Vec<f64>>) -> Matrix {
        Matrix::new(rows).unwrap()
    }

    #[test]
    fn test_constant_broadcast() {
        let x = Matrix::with_rows(10);
        assert_eq!(evaluate("3.5", &x).unwrap(), vec![3.5; 10]);
    }

    #[test]
    fn test_linear_program() {
        let x = matrix(vec![vec![0.0], vec![1.0], vec![2.0]]);
        assert_eq!(evaluate("mul(X0, 2)", &x).unwrap(), vec![0.0, 2.0, 4.0]);
    }

    #[test]
    fn test_protected_division_row() {
        let x = matrix(vec![vec![1.0, 0.0]]);
        let y = evaluate("div(X0, X1)", &x).unwrap();
        assert_eq!(y, vec![1.0]);
        assert!(y.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_too_few_columns() {
        let x = matrix(vec![vec![1.0, 2.0, 3.0]]);
        let err = evaluate("sum(X0, X5)", &x).unwrap_err();
        assert!(matches!(err, SymbindError::Evaluation(_)));
    }

    #[test]
    fn test_program_survives_bad_input() {
        let program = Program::parse("sum(X0, X2)").unwrap();
        assert!(program.evaluate(&matrix(vec![vec![1.0, 2.0]])).is_err());
        let y = program.evaluate(&matrix(vec![vec![1.0, 2.0, 3.0]])).unwrap();
        assert_eq!(y, vec![4.0]);
    }

    #[test]
    fn test_empty_input() {
        let x = Matrix::new(Vec::new()).unwrap();
        assert!(evaluate("7", &x).unwrap().is_empty());
    }

    #[test]
    fn test_evaluate_rows_matches_matrix() {
        let rows = vec![vec![1.0, 2.0], vec![-3.0, 0.5]];
        let program = Program::parse("X0 * X1 + cos(X0)").unwrap();
        assert_eq!(
            program.evaluate_rows(&rows).unwrap(),
            program.evaluate(&matrix(rows.clone())).unwrap()
        );
    }

    #[test]
    fn test_json_round_trip_keeps_semantics() {
        let program = Program::parse("div(sum(X0, 1), X1)").unwrap();
        let restored = Program::from_json(&program.to_json().unwrap()).unwrap();
        assert_eq!(restored.root(), program.root());
        assert_eq!(restored.source(), "div(sum(X0, 1), X1)");
    }

    #[test]
    fn test_from_ast_checks_arity() {
        let err = Program::from_ast(AstNode::call(Function::Div, vec![])).unwrap_err();
        assert!(matches!(err, SymbindError::MalformedProgram { .. }));

        let program = Program::from_ast(AstNode::call(
            Function::Inv,
            vec![AstNode::Const(-2.5)],
        ))
        .unwrap();
        assert_eq!(program.source(), "inv(-2.5)");
        assert_eq!(Program::parse(program.source()).unwrap().root(), program.root());
    }

    #[test]
    fn test_from_ast_rejects_non_finite_constant() {
        assert!(Program::from_ast(AstNode::Const(f64::NAN)).is_err());
    }
}

use super::ast::AstNode;
use std::fmt::Write;

/// Textual forms a program tree can be rendered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayFormat {
    /// Prefix call form, `sum(X0, mul(X1, 2))`. Parses back to the same tree.
    Code,
    /// Infix arithmetic, `X0+(X1*2)`.
    Infix,
    /// Graphviz digraph, one node per tree node.
    Dot,
    /// Indented directory-like listing.
    Tree,
}

impl std::str::FromStr for DisplayFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "code" => Ok(DisplayFormat::Code),
            "infix" | "eq" => Ok(DisplayFormat::Infix),
            "dot" | "graphviz" => Ok(DisplayFormat::Dot),
            "tree" | "dir" => Ok(DisplayFormat::Tree),
            other => Err(format!(
                "Unknown display format: {}. Valid: code, infix, dot, tree",
                other
            )),
        }
    }
}

pub fn render(node: &AstNode, format: DisplayFormat) -> String {
    match format {
        DisplayFormat::Code => code(node),
        DisplayFormat::Infix => infix(node),
        DisplayFormat::Dot => dot(node),
        DisplayFormat::Tree => tree(node, 4),
    }
}

fn label(node: &AstNode) -> String {
    match node {
        AstNode::Const(v) => v.to_string(),
        AstNode::Var(i) => format!("X{}", i),
        AstNode::Call { function, .. } => function.name().to_string(),
    }
}

fn code(node: &AstNode) -> String {
    match node {
        AstNode::Call { function, args } => {
            let args: Vec<String> = args.iter().map(code).collect();
            format!("{}({})", function.name(), args.join(", "))
        }
        _ => label(node),
    }
}

fn infix(node: &AstNode) -> String {
    match node {
        AstNode::Call { function, args } => match (function.symbol(), args.as_slice()) {
            (Some(symbol), [left, right]) => {
                format!("{}{}{}", parenthesize(left), symbol, parenthesize(right))
            }
            _ => {
                let args: Vec<String> = args.iter().map(infix).collect();
                format!("{}({})", function.name(), args.join(", "))
            }
        },
        AstNode::Const(v) if *v < 0.0 => format!("({})", v),
        _ => label(node),
    }
}

fn parenthesize(node: &AstNode) -> String {
    match node {
        AstNode::Call { function, .. } if function.symbol().is_some() => {
            format!("({})", infix(node))
        }
        _ => infix(node),
    }
}

fn dot(node: &AstNode) -> String {
    fn visit(node: &AstNode, counter: &mut usize, out: &mut String) {
        let id = *counter;
        let _ = writeln!(out, "  {} [label=\"{}\"];", id, label(node));
        if let AstNode::Call { args, .. } = node {
            for arg in args {
                *counter += 1;
                let _ = writeln!(out, "  {} -> {};", id, *counter);
                visit(arg, counter, out);
            }
        }
    }

    let mut out = String::from("digraph G {\n");
    let mut counter = 0;
    visit(node, &mut counter, &mut out);
    out.push('}');
    out
}

fn tree(node: &AstNode, tab_size: usize) -> String {
    fn visit(node: &AstNode, depth: usize, indent: &str, out: &mut String) {
        out.push_str(&indent.repeat(depth));
        out.push_str(&label(node));
        out.push('\n');
        if let AstNode::Call { args, .. } = node {
            for arg in args {
                visit(arg, depth + 1, indent, out);
            }
        }
    }

    let indent = " ".repeat(tab_size);
    let mut out = String::new();
    visit(node, 0, &indent, &mut out);
    out.trim_end_matches('\n').to_string()
}

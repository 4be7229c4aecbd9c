use super::ast::AstNode;
use super::functions::{Function, FunctionRegistry, NUMPY_PREFIX};
use super::lexer::{tokenize, Token, TokenKind};
use crate::error::{Result, SymbindError};

/// Deepest nesting accepted, both of the source text (parentheses, calls,
/// bars, signs) and of the resulting tree. Engine programs stay far below
/// this.
pub const MAX_DEPTH: usize = 256;

/// Keyword arguments tolerated after the operands of `np.divide`. Their
/// effect is the protected division `div` already applies.
const DIVIDE_KEYWORDS: [&str; 2] = ["out", "where"];

/// A parsed subtree and its height.
type Parsed = (AstNode, usize);

/// Recursive-descent parser for program texts.
///
/// Accepts the engine's prefix form (`div(X0, sum(X1, 3))`), its numpy form
/// (`np.add(X[:, 0], 2)`), its plain display (`|x0|`, `x1²`) and infix
/// arithmetic (`X0 / (X1 + 3)`). Identifiers are restricted to the function
/// vocabulary, `X<i>`/`x<i>`, `X[i]`, `X[:, i]` and the bound feature names.
pub struct Parser<'n> {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    feature_names: &'n [String],
    registry: &'static FunctionRegistry,
}

impl<'n> Parser<'n> {
    pub fn new(source: &str, feature_names: &'n [String]) -> Result<Self> {
        Ok(Self {
            tokens: tokenize(source)?,
            pos: 0,
            depth: 0,
            feature_names,
            registry: FunctionRegistry::global(),
        })
    }

    pub fn parse(mut self) -> Result<AstNode> {
        if self.peek().kind == TokenKind::End {
            return Err(SymbindError::malformed(0, "empty program"));
        }
        let (node, _) = self.expression()?;
        let token = self.peek();
        if token.kind != TokenKind::End {
            return Err(SymbindError::malformed(
                token.position,
                format!("unexpected trailing {:?}", token.kind),
            ));
        }
        Ok(node)
    }

    /// Builds a call node, rejecting trees taller than [`MAX_DEPTH`].
    fn node(&self, function: Function, args: Vec<Parsed>, position: usize) -> Result<Parsed> {
        let height = 1 + args.iter().map(|(_, h)| *h).max().unwrap_or(0);
        if height > MAX_DEPTH {
            return Err(SymbindError::malformed(
                position,
                format!("program nests deeper than {} levels", MAX_DEPTH),
            ));
        }
        let args = args.into_iter().map(|(node, _)| node).collect();
        Ok((AstNode::call(function, args), height))
    }

    fn peek(&self) -> &Token {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> &Token {
        // The token stream always ends with `End`, which is never consumed.
        &self.tokens[(self.pos + offset).min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::End {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token> {
        let token = self.advance();
        if token.kind != kind {
            return Err(SymbindError::malformed(
                token.position,
                format!("expected {}, found {:?}", what, token.kind),
            ));
        }
        Ok(token)
    }

    fn expression(&mut self) -> Result<Parsed> {
        let mut left = self.term()?;
        loop {
            let function = match self.peek().kind {
                TokenKind::Plus => Function::Sum,
                TokenKind::Minus => Function::Sub,
                _ => return Ok(left),
            };
            let position = self.advance().position;
            let right = self.term()?;
            left = self.node(function, vec![left, right], position)?;
        }
    }

    fn term(&mut self) -> Result<Parsed> {
        let mut left = self.unary()?;
        loop {
            let function = match self.peek().kind {
                TokenKind::Star => Function::Mul,
                TokenKind::Slash => Function::Div,
                _ => return Ok(left),
            };
            let position = self.advance().position;
            let right = self.unary()?;
            left = self.node(function, vec![left, right], position)?;
        }
    }

    /// Every nested construct passes through here, so the depth is tracked
    /// in one place.
    fn unary(&mut self) -> Result<Parsed> {
        if self.depth >= MAX_DEPTH {
            return Err(SymbindError::malformed(
                self.peek().position,
                format!("program nests deeper than {} levels", MAX_DEPTH),
            ));
        }
        self.depth += 1;
        let node = self.signed();
        self.depth -= 1;
        node
    }

    fn signed(&mut self) -> Result<Parsed> {
        match self.peek().kind {
            TokenKind::Minus => {
                let position = self.advance().position;
                match self.unary()? {
                    (AstNode::Const(v), _) => Ok((AstNode::Const(-v), 0)),
                    operand => self.node(Function::Neg, vec![operand], position),
                }
            }
            TokenKind::Plus => {
                self.advance();
                self.unary()
            }
            _ => self.postfix(),
        }
    }

    /// A primary followed by any number of `²`.
    fn postfix(&mut self) -> Result<Parsed> {
        let mut node = self.primary()?;
        while self.peek().kind == TokenKind::Squared {
            let position = self.advance().position;
            node = self.node(Function::Square, vec![node], position)?;
        }
        Ok(node)
    }

    fn primary(&mut self) -> Result<Parsed> {
        let token = self.advance();
        match token.kind {
            TokenKind::Number(v) => Ok((AstNode::Const(v), 0)),
            TokenKind::LParen => {
                let node = self.expression()?;
                self.expect(TokenKind::RParen, "')'")?;
                Ok(node)
            }
            TokenKind::Pipe => {
                let node = self.expression()?;
                self.expect(TokenKind::Pipe, "'|'")?;
                self.node(Function::Abs, vec![node], token.position)
            }
            TokenKind::Ident(name) => self.identifier(name, token.position),
            TokenKind::End => Err(SymbindError::malformed(
                token.position,
                "unexpected end of program",
            )),
            other => Err(SymbindError::malformed(
                token.position,
                format!("unexpected {:?}", other),
            )),
        }
    }

    fn identifier(&mut self, name: String, position: usize) -> Result<Parsed> {
        match self.peek().kind {
            TokenKind::LParen => return self.call(&name, position),
            TokenKind::LBracket if name == "X" || name == "x" => return self.indexed_variable(),
            _ => {}
        }
        if let Some(index) = self.feature_names.iter().position(|n| *n == name) {
            return Ok((AstNode::Var(index), 0));
        }
        if let Some(index) = variable_index(&name, position)? {
            return Ok((AstNode::Var(index), 0));
        }
        Err(SymbindError::malformed(
            position,
            format!("unknown identifier '{}'", name),
        ))
    }

    fn call(&mut self, name: &str, position: usize) -> Result<Parsed> {
        let function = self.registry.get(name).ok_or_else(|| {
            SymbindError::malformed(position, format!("unknown function '{}'", name))
        })?;
        let accepts_keywords = function == Function::Div && name.starts_with(NUMPY_PREFIX);
        self.expect(TokenKind::LParen, "'('")?;

        let mut args = Vec::with_capacity(function.arity());
        let mut seen_keyword = false;
        if self.peek().kind != TokenKind::RParen {
            loop {
                if self.at_keyword() {
                    if !accepts_keywords {
                        return Err(SymbindError::malformed(
                            self.peek().position,
                            format!("'{}' does not take keyword arguments", name),
                        ));
                    }
                    self.skip_keyword()?;
                    seen_keyword = true;
                } else if seen_keyword {
                    return Err(SymbindError::malformed(
                        self.peek().position,
                        "positional argument after keyword argument",
                    ));
                } else {
                    args.push(self.expression()?);
                }
                if self.peek().kind != TokenKind::Comma {
                    break;
                }
                self.advance();
            }
        }
        self.expect(TokenKind::RParen, "')'")?;

        if args.len() != function.arity() {
            return Err(SymbindError::malformed(
                position,
                format!(
                    "function '{}' expects {} arguments, got {}",
                    function,
                    function.arity(),
                    args.len()
                ),
            ));
        }
        self.node(function, args, position)
    }

    fn at_keyword(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Ident(_))
            && self.peek_at(1).kind == TokenKind::Equals
    }

    /// Consumes `name=value` without interpreting the value, stopping at the
    /// `,` or `)` that closes it.
    fn skip_keyword(&mut self) -> Result<()> {
        let token = self.advance();
        if let TokenKind::Ident(keyword) = &token.kind {
            if !DIVIDE_KEYWORDS.contains(&keyword.as_str()) {
                return Err(SymbindError::malformed(
                    token.position,
                    format!("unsupported keyword argument '{}'", keyword),
                ));
            }
        }
        self.expect(TokenKind::Equals, "'='")?;

        let mut nesting = 0usize;
        loop {
            let token = self.peek();
            match token.kind {
                TokenKind::LParen | TokenKind::LBracket => nesting += 1,
                TokenKind::RParen | TokenKind::RBracket if nesting == 0 => return Ok(()),
                TokenKind::RParen | TokenKind::RBracket => nesting -= 1,
                TokenKind::Comma if nesting == 0 => return Ok(()),
                TokenKind::End => {
                    return Err(SymbindError::malformed(
                        token.position,
                        "unexpected end of program",
                    ))
                }
                _ => {}
            }
            self.advance();
        }
    }

    /// `X[i]` or the numpy column form `X[:, i]`.
    fn indexed_variable(&mut self) -> Result<Parsed> {
        self.expect(TokenKind::LBracket, "'['")?;
        if self.peek().kind == TokenKind::Colon {
            self.advance();
            self.expect(TokenKind::Comma, "','")?;
        }
        let token = self.advance();
        let index = match token.kind {
            TokenKind::Number(v) if v >= 0.0 && v.fract() == 0.0 && v <= u32::MAX as f64 => {
                v as usize
            }
            _ => {
                return Err(SymbindError::malformed(
                    token.position,
                    "expected a column index",
                ))
            }
        };
        self.expect(TokenKind::RBracket, "']'")?;
        Ok((AstNode::Var(index), 0))
    }
}

/// `X3` / `x3` -> `Some(3)`; other identifiers -> `None`.
fn variable_index(name: &str, position: usize) -> Result<Option<usize>> {
    let digits = match name.strip_prefix('X').or_else(|| name.strip_prefix('x')) {
        Some(d) if !d.is_empty() && d.bytes().all(|b| b.is_ascii_digit()) => d,
        _ => return Ok(None),
    };
    digits.parse::<usize>().map(Some).map_err(|_| {
        SymbindError::malformed(position, format!("variable index out of range in '{}'", name))
    })
}

/// Parses `source` with variables named positionally.
pub fn parse(source: &str) -> Result<AstNode> {
    Parser::new(source, &[])?.parse()
}

/// Parses `source`, additionally binding each feature name to its position.
pub fn parse_with_names(source: &str, feature_names: &[String]) -> Result<AstNode> {
    Parser::new(source, feature_names)?.parse()
}

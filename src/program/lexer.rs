use crate::error::{Result, SymbindError};

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Number(f64),
    Ident(String),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Colon,
    Plus,
    Minus,
    Star,
    Slash,
    /// `|`, delimits an absolute value.
    Pipe,
    /// Postfix `²`.
    Squared,
    Equals,
    Greater,
    Less,
    End,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte offset of the token in the source text.
    pub position: usize,
}

pub fn tokenize(source: &str) -> Result<Vec<Token>> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        let start = i;
        let single = match c {
            b'(' => Some(TokenKind::LParen),
            b')' => Some(TokenKind::RParen),
            b'[' => Some(TokenKind::LBracket),
            b']' => Some(TokenKind::RBracket),
            b',' => Some(TokenKind::Comma),
            b':' => Some(TokenKind::Colon),
            b'+' => Some(TokenKind::Plus),
            b'-' => Some(TokenKind::Minus),
            b'*' => Some(TokenKind::Star),
            b'/' => Some(TokenKind::Slash),
            b'|' => Some(TokenKind::Pipe),
            b'=' => Some(TokenKind::Equals),
            b'>' => Some(TokenKind::Greater),
            b'<' => Some(TokenKind::Less),
            _ => None,
        };
        if let Some(kind) = single {
            tokens.push(Token { kind, position: start });
            i += 1;
            continue;
        }

        if c.is_ascii_whitespace() {
            i += 1;
        } else if c.is_ascii_digit() || c == b'.' {
            i = scan_number(bytes, i);
            let text = &source[start..i];
            let value = text
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| {
                    SymbindError::malformed(start, format!("invalid numeric literal '{}'", text))
                })?;
            tokens.push(Token {
                kind: TokenKind::Number(value),
                position: start,
            });
        } else if c.is_ascii_alphabetic() || c == b'_' {
            // Dotted names such as `np.add` form one identifier.
            while i < bytes.len()
                && (bytes[i].is_ascii_alphanumeric()
                    || bytes[i] == b'_'
                    || (bytes[i] == b'.' && bytes.get(i + 1).is_some_and(u8::is_ascii_alphabetic)))
            {
                i += 1;
            }
            tokens.push(Token {
                kind: TokenKind::Ident(source[start..i].to_string()),
                position: start,
            });
        } else if source[start..].starts_with('²') {
            tokens.push(Token {
                kind: TokenKind::Squared,
                position: start,
            });
            i += '²'.len_utf8();
        } else {
            let ch = source[start..].chars().next().unwrap_or('?');
            return Err(SymbindError::malformed(
                start,
                format!("unexpected character '{}'", ch),
            ));
        }
    }

    tokens.push(Token {
        kind: TokenKind::End,
        position: source.len(),
    });
    Ok(tokens)
}

/// Consumes digits, dots and an optional signed exponent. Malformed
/// sequences such as `1.2.3` are swallowed whole and rejected on parse.
fn scan_number(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
        i += 1;
    }
    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        let mut j = i + 1;
        if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
            j += 1;
        }
        if j < bytes.len() && bytes[j].is_ascii_digit() {
            while j < bytes.len() && bytes[j].is_ascii_digit() {
                j += 1;
            }
            i = j;
        }
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_call_tokens() {
        assert_eq!(
            kinds("mul(X0, 2.5e-1)"),
            vec![
                TokenKind::Ident("mul".to_string()),
                TokenKind::LParen,
                TokenKind::Ident("X0".to_string()),
                TokenKind::Comma,
                TokenKind::Number(0.25),
                TokenKind::RParen,
                TokenKind::End,
            ]
        );
    }

    #[test]
    fn test_positions() {
        let tokens = tokenize("  x1 +3").unwrap();
        assert_eq!(tokens[0].position, 2);
        assert_eq!(tokens[1].position, 5);
        assert_eq!(tokens[2].position, 6);
    }

    #[test]
    fn test_bad_literal() {
        let err = tokenize("sum(1.2.3, X0)").unwrap_err();
        assert!(matches!(err, SymbindError::MalformedProgram { position: 4, .. }));
    }

    #[test]
    fn test_overflowing_literal_rejected() {
        let err = tokenize("sum(X0, 1e400)").unwrap_err();
        assert!(matches!(err, SymbindError::MalformedProgram { position: 8, .. }));
    }

    #[test]
    fn test_engine_display_tokens() {
        assert_eq!(
            kinds("np.add(|x0|, x1²)"),
            vec![
                TokenKind::Ident("np.add".to_string()),
                TokenKind::LParen,
                TokenKind::Pipe,
                TokenKind::Ident("x0".to_string()),
                TokenKind::Pipe,
                TokenKind::Comma,
                TokenKind::Ident("x1".to_string()),
                TokenKind::Squared,
                TokenKind::RParen,
                TokenKind::End,
            ]
        );
    }

    #[test]
    fn test_unexpected_character() {
        assert!(tokenize("X0 ; X1").is_err());
        assert!(tokenize("__import__('os')").is_err());
    }
}

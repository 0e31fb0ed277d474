//! Tokenizer for schema and profile files

use super::ParseError;
use crate::location::Location;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    /// Identifier or keyword: `message`, `Dinosaur`, `int32`
    Ident(String),
    /// Numeric literal, kept as written: `42`, `-1`, `0x1F`, `1.5e3`
    Number(String),
    /// String literal with escapes processed
    Str(String),
    Symbol(char),
}

#[derive(Debug, Clone)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub column: usize,
    /// `//` comment lines immediately before this token
    pub documentation: String,
}

/// Split `source` into tokens, attaching leading comments as documentation.
///
/// A comment that starts on the same line as the previous token is a
/// trailing comment and is dropped.
pub(crate) fn tokenize(location: &Location, source: &str) -> Result<Vec<Token>, ParseError> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut pos = 0;
    let mut line = 1;
    let mut column = 1;
    let mut documentation: Vec<String> = Vec::new();
    let mut last_token_line = 0;

    let error = |line: usize, column: usize, message: String| ParseError {
        location: location.clone(),
        line,
        column,
        message,
    };

    while pos < chars.len() {
        let c = chars[pos];

        if c == '\n' {
            pos += 1;
            line += 1;
            column = 1;
            continue;
        }
        if c.is_whitespace() {
            pos += 1;
            column += 1;
            continue;
        }

        if c == '/' && chars.get(pos + 1) == Some(&'/') {
            let start = pos + 2;
            let mut end = start;
            while end < chars.len() && chars[end] != '\n' {
                end += 1;
            }
            if line != last_token_line {
                let text: String = chars[start..end].iter().collect();
                let text = text.strip_prefix(' ').unwrap_or(&text);
                documentation.push(text.trim_end().to_string());
            }
            column += end - pos;
            pos = end;
            continue;
        }

        if c == '/' && chars.get(pos + 1) == Some(&'*') {
            let (start_line, start_column) = (line, column);
            pos += 2;
            column += 2;
            loop {
                match chars.get(pos) {
                    None => {
                        return Err(error(start_line, start_column, "unterminated /* comment".to_string()));
                    }
                    Some('*') if chars.get(pos + 1) == Some(&'/') => {
                        pos += 2;
                        column += 2;
                        break;
                    }
                    Some('\n') => {
                        pos += 1;
                        line += 1;
                        column = 1;
                    }
                    Some(_) => {
                        pos += 1;
                        column += 1;
                    }
                }
            }
            continue;
        }

        let (token_line, token_column, token_start) = (line, column, pos);
        let kind = if c.is_ascii_alphabetic() || c == '_' {
            let start = pos;
            while pos < chars.len() && (chars[pos].is_ascii_alphanumeric() || chars[pos] == '_') {
                pos += 1;
            }
            TokenKind::Ident(chars[start..pos].iter().collect())
        } else if c.is_ascii_digit()
            || ((c == '-' || c == '+') && chars.get(pos + 1).is_some_and(|next| next.is_ascii_digit()))
        {
            let start = pos;
            pos += 1;
            while pos < chars.len() {
                let next = chars[pos];
                let exponent_sign = (next == '-' || next == '+')
                    && matches!(chars[pos - 1], 'e' | 'E')
                    && !chars[start..pos].iter().any(|ch| matches!(ch, 'x' | 'X'));
                if next.is_ascii_alphanumeric() || next == '.' || exponent_sign {
                    pos += 1;
                } else {
                    break;
                }
            }
            TokenKind::Number(chars[start..pos].iter().collect())
        } else if c == '"' || c == '\'' {
            let quote = c;
            pos += 1;
            let mut value = String::new();
            loop {
                match chars.get(pos) {
                    None | Some('\n') => {
                        return Err(error(token_line, token_column, "unterminated string literal".to_string()));
                    }
                    Some(&ch) if ch == quote => {
                        pos += 1;
                        break;
                    }
                    Some('\\') => {
                        let escaped = chars.get(pos + 1).copied().ok_or_else(|| {
                            error(token_line, token_column, "unterminated string literal".to_string())
                        })?;
                        value.push(match escaped {
                            'n' => '\n',
                            't' => '\t',
                            'r' => '\r',
                            '0' => '\0',
                            other => other,
                        });
                        pos += 2;
                    }
                    Some(&ch) => {
                        value.push(ch);
                        pos += 1;
                    }
                }
            }
            TokenKind::Str(value)
        } else if "{}()[]<>;,=.:-+/#@".contains(c) {
            pos += 1;
            TokenKind::Symbol(c)
        } else {
            return Err(error(line, column, format!("unexpected character '{}'", c)));
        };

        column = token_column + (pos - token_start);
        tokens.push(Token {
            kind,
            line: token_line,
            column: token_column,
            documentation: documentation.join("\n"),
        });
        documentation.clear();
        last_token_line = token_line;
    }

    Ok(tokens)
}

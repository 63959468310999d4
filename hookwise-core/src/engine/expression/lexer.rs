//! Tokenizer for condition expressions

use serde_json::Number;

#[derive(Debug, Clone, PartialEq)]
pub enum Tok {
    /// Identifier or keyword (`and`, `in`, `true`, ...)
    Ident(String),
    Str(String),
    Num(Number),
    /// `$` prefix marking a function call
    Dollar,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Dot,
    Minus,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    /// `=~`
    RegexMatch,
    /// `&&`
    AndAnd,
    /// `||`
    OrOr,
    /// `!`
    Bang,
}

/// A token plus its byte offset in the source
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub tok: Tok,
    pub pos: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxError {
    pub message: String,
    pub position: usize,
}

impl SyntaxError {
    fn new(message: impl Into<String>, position: usize) -> Self {
        Self {
            message: message.into(),
            position,
        }
    }
}

pub fn tokenize(source: &str) -> Result<Vec<Token>, SyntaxError> {
    let chars: Vec<(usize, char)> = source.char_indices().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    let peek = |i: usize| chars.get(i).map(|&(_, c)| c);

    while let Some(&(pos, c)) = chars.get(i) {
        if c.is_whitespace() {
            i += 1;
            continue;
        }

        let (tok, width) = match (c, peek(i + 1)) {
            ('=', Some('=')) => (Tok::Eq, 2),
            ('=', Some('~')) => (Tok::RegexMatch, 2),
            ('!', Some('=')) => (Tok::Ne, 2),
            ('<', Some('=')) => (Tok::Le, 2),
            ('>', Some('=')) => (Tok::Ge, 2),
            ('&', Some('&')) => (Tok::AndAnd, 2),
            ('|', Some('|')) => (Tok::OrOr, 2),
            ('<', _) => (Tok::Lt, 1),
            ('>', _) => (Tok::Gt, 1),
            ('!', _) => (Tok::Bang, 1),
            ('$', _) => (Tok::Dollar, 1),
            ('(', _) => (Tok::LParen, 1),
            (')', _) => (Tok::RParen, 1),
            ('[', _) => (Tok::LBracket, 1),
            (']', _) => (Tok::RBracket, 1),
            (',', _) => (Tok::Comma, 1),
            ('.', _) => (Tok::Dot, 1),
            ('-', _) => (Tok::Minus, 1),
            ('"' | '\'', _) => {
                let (text, end) = lex_string(&chars, i, c)?;
                tokens.push(Token {
                    tok: Tok::Str(text),
                    pos,
                });
                i = end;
                continue;
            }
            (c, _) if c.is_ascii_digit() => {
                let (number, end) = lex_number(&chars, i, source)?;
                tokens.push(Token {
                    tok: Tok::Num(number),
                    pos,
                });
                i = end;
                continue;
            }
            (c, _) if c.is_alphabetic() || c == '_' => {
                let start = i;
                while peek(i).is_some_and(|c| c.is_alphanumeric() || c == '_') {
                    i += 1;
                }
                let ident: String = chars[start..i].iter().map(|&(_, c)| c).collect();
                tokens.push(Token {
                    tok: Tok::Ident(ident),
                    pos,
                });
                continue;
            }
            ('=', _) => return Err(SyntaxError::new("single '=' (use '==')", pos)),
            (other, _) => {
                return Err(SyntaxError::new(
                    format!("unexpected character '{other}'"),
                    pos,
                ))
            }
        };
        tokens.push(Token { tok, pos });
        i += width;
    }

    Ok(tokens)
}

fn lex_string(
    chars: &[(usize, char)],
    start: usize,
    quote: char,
) -> Result<(String, usize), SyntaxError> {
    let mut out = String::new();
    let mut i = start + 1;
    loop {
        let Some(&(pos, c)) = chars.get(i) else {
            return Err(SyntaxError::new("unterminated string literal", chars[start].0));
        };
        match c {
            '\\' => {
                let Some(&(_, escaped)) = chars.get(i + 1) else {
                    return Err(SyntaxError::new("dangling escape", pos));
                };
                out.push(match escaped {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    '0' => '\0',
                    other => other,
                });
                i += 2;
            }
            c if c == quote => return Ok((out, i + 1)),
            c => {
                out.push(c);
                i += 1;
            }
        }
    }
}

fn lex_number(
    chars: &[(usize, char)],
    start: usize,
    source: &str,
) -> Result<(Number, usize), SyntaxError> {
    let digit_at = |i: usize| chars.get(i).is_some_and(|&(_, c)| c.is_ascii_digit());
    let mut i = start;
    while digit_at(i) {
        i += 1;
    }
    let mut is_float = false;
    if chars.get(i).is_some_and(|&(_, c)| c == '.') && digit_at(i + 1) {
        is_float = true;
        i += 1;
        while digit_at(i) {
            i += 1;
        }
    }

    let begin = chars[start].0;
    let end = chars.get(i).map(|&(p, _)| p).unwrap_or(source.len());
    let text = &source[begin..end];
    let number = if is_float {
        text.parse::<f64>().ok().and_then(Number::from_f64)
    } else {
        text.parse::<i64>().ok().map(Number::from)
    };
    number
        .map(|n| (n, i))
        .ok_or_else(|| SyntaxError::new(format!("invalid number '{text}'"), begin))
}

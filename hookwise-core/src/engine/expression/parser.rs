//! Recursive-descent parser producing the expression AST

use serde_json::Value;

use super::lexer::{tokenize, SyntaxError, Tok, Token};

/// Deepest nesting of groups, lists, calls and prefix operators accepted
pub const MAX_NESTING: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
    /// `=~`, regex search
    RegexMatch,
    /// `matches`, glob
    Glob,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Key(String),
    Index(i64),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    List(Vec<Expr>),
    Path {
        root: String,
        segments: Vec<Segment>,
        pos: usize,
    },
    Call {
        name: String,
        args: Vec<Expr>,
        pos: usize,
    },
    Not(Box<Expr>),
    Neg(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Compare {
        op: CompareOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

impl Expr {
    /// Visit every node, depth first
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a Expr)) {
        visit(self);
        match self {
            Expr::Literal(_) | Expr::Path { .. } => {}
            Expr::List(items) | Expr::Call { args: items, .. } => {
                for item in items {
                    item.walk(visit);
                }
            }
            Expr::Not(inner) | Expr::Neg(inner) => inner.walk(visit),
            Expr::And(lhs, rhs) | Expr::Or(lhs, rhs) | Expr::Compare { lhs, rhs, .. } => {
                lhs.walk(visit);
                rhs.walk(visit);
            }
        }
    }
}

pub fn parse(source: &str) -> Result<Expr, SyntaxError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        tokens,
        index: 0,
        end: source.len(),
        depth: 0,
    };
    let expr = parser.parse_or()?;
    match parser.peek() {
        None => Ok(expr),
        Some(token) => Err(SyntaxError {
            message: format!("unexpected {}", describe(&token.tok)),
            position: token.pos,
        }),
    }
}

struct Parser {
    tokens: Vec<Token>,
    index: usize,
    end: usize,
    depth: usize,
}

fn describe(tok: &Tok) -> String {
    match tok {
        Tok::Ident(name) => format!("'{name}'"),
        Tok::Str(s) => format!("string \"{s}\""),
        Tok::Num(n) => format!("number {n}"),
        Tok::Dollar => "'$'".into(),
        Tok::LParen => "'('".into(),
        Tok::RParen => "')'".into(),
        Tok::LBracket => "'['".into(),
        Tok::RBracket => "']'".into(),
        Tok::Comma => "','".into(),
        Tok::Dot => "'.'".into(),
        Tok::Minus => "'-'".into(),
        Tok::Eq => "'=='".into(),
        Tok::Ne => "'!='".into(),
        Tok::Lt => "'<'".into(),
        Tok::Le => "'<='".into(),
        Tok::Gt => "'>'".into(),
        Tok::Ge => "'>='".into(),
        Tok::RegexMatch => "'=~'".into(),
        Tok::AndAnd => "'&&'".into(),
        Tok::OrOr => "'||'".into(),
        Tok::Bang => "'!'".into(),
    }
}

fn is_keyword(tok: Option<&Token>, keyword: &str) -> bool {
    matches!(tok, Some(Token { tok: Tok::Ident(name), .. }) if name == keyword)
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.index)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.index + offset)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.index).cloned();
        if token.is_some() {
            self.index += 1;
        }
        token
    }

    fn error_here(&self, expected: &str) -> SyntaxError {
        match self.peek() {
            Some(token) => SyntaxError {
                message: format!("expected {expected}, found {}", describe(&token.tok)),
                position: token.pos,
            },
            None => SyntaxError {
                message: format!("expected {expected}, found end of expression"),
                position: self.end,
            },
        }
    }

    fn expect(&mut self, tok: Tok, expected: &str) -> Result<Token, SyntaxError> {
        match self.peek() {
            Some(token) if token.tok == tok => {
                self.advance().ok_or_else(|| self.error_here(expected))
            }
            _ => Err(self.error_here(expected)),
        }
    }

    fn eat(&mut self, tok: &Tok) -> bool {
        if self.peek().is_some_and(|t| &t.tok == tok) {
            self.index += 1;
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if is_keyword(self.peek(), keyword) {
            self.index += 1;
            true
        } else {
            false
        }
    }

    /// Run `parse` one nesting level deeper, refusing to go past [`MAX_NESTING`]
    fn nested(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<Expr, SyntaxError>,
    ) -> Result<Expr, SyntaxError> {
        if self.depth >= MAX_NESTING {
            return Err(SyntaxError {
                message: format!("expression nested deeper than {MAX_NESTING} levels"),
                position: self.peek().map_or(self.end, |t| t.pos),
            });
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn parse_or(&mut self) -> Result<Expr, SyntaxError> {
        self.nested(Self::parse_or_chain)
    }

    fn parse_or_chain(&mut self) -> Result<Expr, SyntaxError> {
        let mut lhs = self.parse_and()?;
        while self.eat_keyword("or") || self.eat(&Tok::OrOr) {
            let rhs = self.parse_and()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, SyntaxError> {
        let mut lhs = self.parse_not()?;
        while self.eat_keyword("and") || self.eat(&Tok::AndAnd) {
            let rhs = self.parse_not()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_not(&mut self) -> Result<Expr, SyntaxError> {
        if self.eat_keyword("not") || self.eat(&Tok::Bang) {
            return Ok(Expr::Not(Box::new(self.nested(Self::parse_not)?)));
        }
        self.parse_comparison()
    }

    fn comparison_op(&mut self) -> Option<CompareOp> {
        let (op, width) = match &self.peek()?.tok {
            Tok::Eq => (CompareOp::Eq, 1),
            Tok::Ne => (CompareOp::Ne, 1),
            Tok::Lt => (CompareOp::Lt, 1),
            Tok::Le => (CompareOp::Le, 1),
            Tok::Gt => (CompareOp::Gt, 1),
            Tok::Ge => (CompareOp::Ge, 1),
            Tok::RegexMatch => (CompareOp::RegexMatch, 1),
            Tok::Ident(word) if word == "in" => (CompareOp::In, 1),
            Tok::Ident(word) if word == "matches" => (CompareOp::Glob, 1),
            Tok::Ident(word) if word == "not" && is_keyword(self.peek_at(1), "in") => {
                (CompareOp::NotIn, 2)
            }
            _ => return None,
        };
        self.index += width;
        Some(op)
    }

    fn parse_comparison(&mut self) -> Result<Expr, SyntaxError> {
        let lhs = self.parse_unary()?;
        match self.comparison_op() {
            Some(op) => {
                let rhs = self.parse_unary()?;
                Ok(Expr::Compare {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                })
            }
            None => Ok(lhs),
        }
    }

    fn parse_unary(&mut self) -> Result<Expr, SyntaxError> {
        if self.eat(&Tok::Minus) {
            return Ok(Expr::Neg(Box::new(self.nested(Self::parse_unary)?)));
        }
        self.parse_term()
    }

    fn parse_term(&mut self) -> Result<Expr, SyntaxError> {
        let Some(token) = self.advance() else {
            return Err(self.error_here("a value"));
        };

        match token.tok {
            Tok::Str(s) => Ok(Expr::Literal(Value::String(s))),
            Tok::Num(n) => Ok(Expr::Literal(Value::Number(n))),
            Tok::LParen => {
                let inner = self.parse_or()?;
                self.expect(Tok::RParen, "')'")?;
                Ok(inner)
            }
            Tok::LBracket => Ok(Expr::List(self.parse_items(Tok::RBracket, "']'")?)),
            Tok::Dollar => {
                let name_token = self.advance();
                match name_token {
                    Some(Token {
                        tok: Tok::Ident(name),
                        ..
                    }) => self.parse_call(name, token.pos),
                    _ => Err(SyntaxError {
                        message: "expected a function name after '$'".into(),
                        position: token.pos,
                    }),
                }
            }
            Tok::Ident(name) => match name.as_str() {
                "true" | "True" => Ok(Expr::Literal(Value::Bool(true))),
                "false" | "False" => Ok(Expr::Literal(Value::Bool(false))),
                "null" | "none" | "None" => Ok(Expr::Literal(Value::Null)),
                "and" | "or" | "not" | "in" | "matches" => Err(SyntaxError {
                    message: format!("unexpected keyword '{name}'"),
                    position: token.pos,
                }),
                _ if self.peek().is_some_and(|t| t.tok == Tok::LParen) => {
                    self.parse_call(name, token.pos)
                }
                _ => self.parse_path(name, token.pos),
            },
            other => Err(SyntaxError {
                message: format!("expected a value, found {}", describe(&other)),
                position: token.pos,
            }),
        }
    }

    fn parse_call(&mut self, name: String, pos: usize) -> Result<Expr, SyntaxError> {
        self.expect(Tok::LParen, "'('")?;
        let args = self.parse_items(Tok::RParen, "')'")?;
        Ok(Expr::Call { name, args, pos })
    }

    /// Comma-separated expressions up to `close`; the opener is consumed
    fn parse_items(&mut self, close: Tok, expected: &str) -> Result<Vec<Expr>, SyntaxError> {
        let mut items = Vec::new();
        if self.eat(&close) {
            return Ok(items);
        }
        loop {
            items.push(self.parse_or()?);
            if self.eat(&Tok::Comma) {
                continue;
            }
            self.expect(close.clone(), expected)?;
            return Ok(items);
        }
    }

    fn parse_path(&mut self, root: String, pos: usize) -> Result<Expr, SyntaxError> {
        let mut segments = Vec::new();
        loop {
            if self.eat(&Tok::Dot) {
                let segment = match self.peek().map(|t| &t.tok) {
                    Some(Tok::Ident(key)) => Segment::Key(key.clone()),
                    Some(Tok::Num(n)) if n.is_u64() => Segment::Index(n.as_i64().unwrap_or(0)),
                    _ => return Err(self.error_here("a field name after '.'")),
                };
                self.index += 1;
                segments.push(segment);
            } else if self.eat(&Tok::LBracket) {
                let negative = self.eat(&Tok::Minus);
                let segment = match self.peek().map(|t| &t.tok) {
                    Some(Tok::Str(key)) if !negative => Segment::Key(key.clone()),
                    Some(Tok::Num(n)) if n.is_i64() => {
                        let index = n.as_i64().unwrap_or(0);
                        Segment::Index(if negative { -index } else { index })
                    }
                    _ => return Err(self.error_here("a string key or integer index")),
                };
                self.index += 1;
                self.expect(Tok::RBracket, "']'")?;
                segments.push(segment);
            } else {
                return Ok(Expr::Path {
                    root,
                    segments,
                    pos,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn path(root: &str, keys: &[&str]) -> Expr {
        Expr::Path {
            root: root.into(),
            segments: keys.iter().map(|k| Segment::Key(k.to_string())).collect(),
            pos: 0,
        }
    }

    #[test]
    fn test_precedence() {
        // not binds tighter than and, and tighter than or
        let expr = parse("not a or b and c").unwrap();
        let Expr::Or(lhs, rhs) = expr else {
            panic!("expected or at the top");
        };
        assert!(matches!(*lhs, Expr::Not(_)));
        assert!(matches!(*rhs, Expr::And(_, _)));
    }

    #[test]
    fn test_membership_and_not_in() {
        let expr = parse(r#""rm -rf" in tool_input.command"#).unwrap();
        assert_eq!(
            expr,
            Expr::Compare {
                op: CompareOp::In,
                lhs: Box::new(Expr::Literal(json!("rm -rf"))),
                rhs: Box::new(Expr::Path {
                    root: "tool_input".into(),
                    segments: vec![Segment::Key("command".into())],
                    pos: 12,
                }),
            }
        );

        let expr = parse("tool_name not in ['Read', 'Glob']").unwrap();
        assert!(matches!(
            expr,
            Expr::Compare {
                op: CompareOp::NotIn,
                ..
            }
        ));
    }

    #[test]
    fn test_calls_with_and_without_prefix() {
        let prefixed = parse("$is_path_under(tool_input.file_path, '/tmp')").unwrap();
        let bare = parse("is_path_under(tool_input.file_path, '/tmp')").unwrap();
        match (prefixed, bare) {
            (
                Expr::Call { name: a, args: x, .. },
                Expr::Call { name: b, args: y, .. },
            ) => {
                assert_eq!(a, b);
                assert_eq!(x.len(), 2);
                assert_eq!(y.len(), 2);
            }
            other => panic!("expected two calls, got {other:?}"),
        }
        assert!(matches!(
            parse("$git_has_staged()").unwrap(),
            Expr::Call { args, .. } if args.is_empty()
        ));
    }

    #[test]
    fn test_index_segments() {
        let expr = parse(r#"tool_input["edits"][0].old"#).unwrap();
        assert_eq!(
            expr,
            Expr::Path {
                root: "tool_input".into(),
                segments: vec![
                    Segment::Key("edits".into()),
                    Segment::Index(0),
                    Segment::Key("old".into())
                ],
                pos: 0,
            }
        );
    }

    #[test]
    fn test_literals() {
        assert_eq!(parse("true").unwrap(), Expr::Literal(json!(true)));
        assert_eq!(parse("None").unwrap(), Expr::Literal(Value::Null));
        assert_eq!(
            parse("[1, 'a']").unwrap(),
            Expr::List(vec![Expr::Literal(json!(1)), Expr::Literal(json!("a"))])
        );
        assert_eq!(path("cwd", &[]), parse("cwd").unwrap());
    }

    #[test]
    fn test_syntax_errors() {
        let err = parse("tool_name ==").unwrap_err();
        assert_eq!(err.position, 12);
        assert!(err.message.contains("end of expression"));

        let err = parse("(tool_name == 'Bash'").unwrap_err();
        assert!(err.message.contains("')'"));

        let err = parse("tool_name == 'a' 'b'").unwrap_err();
        assert_eq!(err.position, 17);

        assert!(parse("a == b == c").is_err());
        assert!(parse("$ 1").is_err());
        assert!(parse("and").is_err());
    }

    #[test]
    fn test_nesting_limit() {
        let within = format!("{}1{}", "(".repeat(MAX_NESTING - 1), ")".repeat(MAX_NESTING - 1));
        assert_eq!(parse(&within).unwrap(), Expr::Literal(json!(1)));

        let deep = format!("{}1{}", "(".repeat(50_000), ")".repeat(50_000));
        let err = parse(&deep).unwrap_err();
        assert!(err.message.contains("nested deeper"));
        assert_eq!(err.position, MAX_NESTING);

        assert!(parse(&format!("{}true", "not ".repeat(10_000))).is_err());
        assert!(parse(&format!("{}1", "-".repeat(10_000))).is_err());
        assert!(parse(&format!("{}1{}", "[".repeat(10_000), "]".repeat(10_000))).is_err());
        assert!(parse(&format!("{}1{}", "lower(".repeat(10_000), ")".repeat(10_000))).is_err());
    }
}

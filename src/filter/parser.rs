//! Recursive-descent parser that type-checks against the schema as it goes.

use super::lexer::{tokenize, Spanned, Token};
use super::{FieldType, FieldValue, FilterError, FilterSchema};

/// Deepest nesting of `!` and parentheses accepted.
pub(crate) const MAX_DEPTH: usize = 64;

/// Most `&&`, `||` and `!` operators accepted in one expression.
pub(crate) const MAX_OPERATORS: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StringMethod {
    Contains,
    StartsWith,
    EndsWith,
}

impl StringMethod {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "contains" => Some(StringMethod::Contains),
            "startsWith" => Some(StringMethod::StartsWith),
            "endsWith" => Some(StringMethod::EndsWith),
            _ => None,
        }
    }

    pub(crate) fn apply(self, value: &str, arg: &str) -> bool {
        match self {
            StringMethod::Contains => value.contains(arg),
            StringMethod::StartsWith => value.starts_with(arg),
            StringMethod::EndsWith => value.ends_with(arg),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    Const(bool),
    /// A bool field used directly as a condition.
    Field(String),
    Equals {
        field: String,
        value: FieldValue,
        negated: bool,
    },
    In {
        field: String,
        values: Vec<FieldValue>,
    },
    Method {
        field: String,
        method: StringMethod,
        arg: String,
    },
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Fields the expression reads, in first-seen order.
    pub(crate) fn fields(&self, out: &mut Vec<String>) {
        match self {
            Expr::Const(_) => {}
            Expr::Field(field)
            | Expr::Equals { field, .. }
            | Expr::In { field, .. }
            | Expr::Method { field, .. } => {
                if !out.contains(field) {
                    out.push(field.clone());
                }
            }
            Expr::Not(inner) => inner.fields(out),
            Expr::And(lhs, rhs) | Expr::Or(lhs, rhs) => {
                lhs.fields(out);
                rhs.fields(out);
            }
        }
    }
}

pub(crate) fn parse(src: &str, schema: &FilterSchema) -> Result<Expr, FilterError> {
    let mut parser = Parser {
        tokens: tokenize(src)?,
        pos: 0,
        schema,
        depth: 0,
        operators: 0,
    };
    let expr = parser.or()?;
    match parser.peek() {
        Token::Eof => Ok(expr),
        other => Err(parser.error(format!("unexpected {}", other.describe()))),
    }
}

struct Parser<'s> {
    tokens: Vec<Spanned>,
    pos: usize,
    schema: &'s FilterSchema,
    depth: usize,
    operators: usize,
}

impl Parser<'_> {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos].token
    }

    fn offset(&self) -> usize {
        self.tokens[self.pos].offset
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.pos].token.clone();
        if token != Token::Eof {
            self.pos += 1;
        }
        token
    }

    fn error(&self, message: String) -> FilterError {
        FilterError::Syntax {
            offset: self.offset(),
            message,
        }
    }

    fn expect(&mut self, expected: Token) -> Result<(), FilterError> {
        if *self.peek() == expected {
            self.advance();
            Ok(())
        } else {
            Err(self.error(format!(
                "expected {}, found {}",
                expected.describe(),
                self.peek().describe()
            )))
        }
    }

    /// Parse one nesting level below the current one.
    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, FilterError>,
    ) -> Result<T, FilterError> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error("expression nested too deeply".into()));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    /// Count one boolean operator against the expression budget.
    fn operator(&mut self) -> Result<(), FilterError> {
        if self.operators >= MAX_OPERATORS {
            return Err(self.error("expression has too many operators".into()));
        }
        self.operators += 1;
        Ok(())
    }

    fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Token::Ident(name) if name == keyword)
    }

    fn or(&mut self) -> Result<Expr, FilterError> {
        let mut lhs = self.and()?;
        while *self.peek() == Token::OrOr || self.is_keyword("OR") {
            self.operator()?;
            self.advance();
            let rhs = self.and()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn and(&mut self) -> Result<Expr, FilterError> {
        let mut lhs = self.unary()?;
        while *self.peek() == Token::AndAnd || self.is_keyword("AND") {
            self.operator()?;
            self.advance();
            let rhs = self.unary()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, FilterError> {
        if *self.peek() == Token::Bang || self.is_keyword("NOT") {
            self.operator()?;
            self.advance();
            let inner = self.nested(Self::unary)?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr, FilterError> {
        match self.peek().clone() {
            Token::LParen => {
                self.advance();
                let inner = self.nested(Self::or)?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Token::Ident(name) if name == "true" || name == "false" => {
                self.advance();
                Ok(Expr::Const(name == "true"))
            }
            Token::Ident(name) => {
                self.advance();
                self.condition(name)
            }
            other => Err(self.error(format!("expected a condition, found {}", other.describe()))),
        }
    }

    /// Everything that can follow a field reference.
    fn condition(&mut self, field: String) -> Result<Expr, FilterError> {
        let field_type = self
            .schema
            .lookup(&field)
            .ok_or_else(|| FilterError::UnknownField(field.clone()))?;

        match self.peek().clone() {
            Token::EqEq | Token::NotEq => {
                let negated = self.advance() == Token::NotEq;
                let value = self.literal(&field, field_type)?;
                Ok(Expr::Equals {
                    field,
                    value,
                    negated,
                })
            }
            Token::Ident(keyword) if keyword == "in" => {
                self.advance();
                self.expect(Token::LBracket)?;
                let mut values = vec![self.literal(&field, field_type)?];
                while *self.peek() == Token::Comma {
                    self.advance();
                    values.push(self.literal(&field, field_type)?);
                }
                self.expect(Token::RBracket)?;
                Ok(Expr::In { field, values })
            }
            Token::Dot => {
                self.advance();
                let method = match self.advance() {
                    Token::Ident(name) => StringMethod::from_name(&name).ok_or_else(|| {
                        FilterError::Syntax {
                            offset: self.tokens[self.pos - 1].offset,
                            message: format!("unknown method {:?}", name),
                        }
                    })?,
                    other => {
                        return Err(self.error(format!(
                            "expected a method name, found {}",
                            other.describe()
                        )))
                    }
                };
                if field_type != FieldType::String {
                    return Err(FilterError::TypeMismatch {
                        field,
                        expected: FieldType::String,
                        found: field_type,
                    });
                }
                self.expect(Token::LParen)?;
                let arg = match self.advance() {
                    Token::Str(arg) => arg,
                    other => {
                        return Err(self.error(format!(
                            "expected a string argument, found {}",
                            other.describe()
                        )))
                    }
                };
                self.expect(Token::RParen)?;
                Ok(Expr::Method { field, method, arg })
            }
            _ if field_type == FieldType::Bool => Ok(Expr::Field(field)),
            _ => Err(FilterError::NotACondition(field)),
        }
    }

    /// A literal compared against `field`, which must match its declared type.
    fn literal(&mut self, field: &str, field_type: FieldType) -> Result<FieldValue, FilterError> {
        let value = match self.peek().clone() {
            Token::Str(value) => FieldValue::String(value),
            Token::Ident(name) if name == "true" || name == "false" => {
                FieldValue::Bool(name == "true")
            }
            other => {
                return Err(self.error(format!("expected a literal, found {}", other.describe())))
            }
        };
        if value.field_type() != field_type {
            return Err(FilterError::TypeMismatch {
                field: field.to_string(),
                expected: field_type,
                found: value.field_type(),
            });
        }
        self.advance();
        Ok(value)
    }
}

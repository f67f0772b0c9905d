use super::FilterError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token {
    Ident(String),
    Str(String),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Dot,
    EqEq,
    NotEq,
    AndAnd,
    OrOr,
    Bang,
    Eof,
}

impl Token {
    pub(crate) fn describe(&self) -> String {
        match self {
            Token::Ident(name) => format!("identifier {:?}", name),
            Token::Str(value) => format!("string {:?}", value),
            Token::LParen => "'('".into(),
            Token::RParen => "')'".into(),
            Token::LBracket => "'['".into(),
            Token::RBracket => "']'".into(),
            Token::Comma => "','".into(),
            Token::Dot => "'.'".into(),
            Token::EqEq => "'=='".into(),
            Token::NotEq => "'!='".into(),
            Token::AndAnd => "'&&'".into(),
            Token::OrOr => "'||'".into(),
            Token::Bang => "'!'".into(),
            Token::Eof => "end of expression".into(),
        }
    }
}

/// A token and the byte offset where it starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Spanned {
    pub token: Token,
    pub offset: usize,
}

pub(crate) fn tokenize(src: &str) -> Result<Vec<Spanned>, FilterError> {
    let mut tokens = Vec::new();
    let mut chars = src.char_indices().peekable();

    while let Some(&(offset, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        let token = match c {
            '(' => single(&mut chars, Token::LParen),
            ')' => single(&mut chars, Token::RParen),
            '[' => single(&mut chars, Token::LBracket),
            ']' => single(&mut chars, Token::RBracket),
            ',' => single(&mut chars, Token::Comma),
            '.' => single(&mut chars, Token::Dot),
            '=' => {
                chars.next();
                expect_char(&mut chars, '=', offset, "'==' (a single '=' is not an operator)")?;
                Token::EqEq
            }
            '!' => {
                chars.next();
                if chars.peek().map(|&(_, c)| c) == Some('=') {
                    chars.next();
                    Token::NotEq
                } else {
                    Token::Bang
                }
            }
            '&' => {
                chars.next();
                expect_char(&mut chars, '&', offset, "'&&'")?;
                Token::AndAnd
            }
            '|' => {
                chars.next();
                expect_char(&mut chars, '|', offset, "'||'")?;
                Token::OrOr
            }
            '"' | '\'' => {
                chars.next();
                Token::Str(string_literal(&mut chars, c, offset)?)
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut ident = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        ident.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                Token::Ident(ident)
            }
            other => {
                return Err(FilterError::Syntax {
                    offset,
                    message: format!("unexpected character {:?}", other),
                })
            }
        };
        tokens.push(Spanned { token, offset });
    }

    tokens.push(Spanned {
        token: Token::Eof,
        offset: src.len(),
    });
    Ok(tokens)
}

type Chars<'a> = std::iter::Peekable<std::str::CharIndices<'a>>;

fn single(chars: &mut Chars<'_>, token: Token) -> Token {
    chars.next();
    token
}

fn expect_char(
    chars: &mut Chars<'_>,
    expected: char,
    offset: usize,
    what: &str,
) -> Result<(), FilterError> {
    match chars.next() {
        Some((_, c)) if c == expected => Ok(()),
        _ => Err(FilterError::Syntax {
            offset,
            message: format!("expected {}", what),
        }),
    }
}

fn string_literal(chars: &mut Chars<'_>, quote: char, offset: usize) -> Result<String, FilterError> {
    let mut value = String::new();
    loop {
        let Some((at, c)) = chars.next() else {
            return Err(FilterError::Syntax {
                offset,
                message: "unterminated string literal".into(),
            });
        };
        match c {
            c if c == quote => return Ok(value),
            '\\' => {
                let escaped = match chars.next() {
                    Some((_, 'n')) => '\n',
                    Some((_, 't')) => '\t',
                    Some((_, '\\')) => '\\',
                    Some((_, '"')) => '"',
                    Some((_, '\'')) => '\'',
                    _ => {
                        return Err(FilterError::Syntax {
                            offset: at,
                            message: "invalid escape sequence".into(),
                        })
                    }
                };
                value.push(escaped);
            }
            c => value.push(c),
        }
    }
}

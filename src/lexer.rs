//! Hand-rolled character scanner for the numerical P system source language.
//!
//! Mirrors the token catalog of the input grammar directly rather than
//! building a combined regex: one pass over the characters, longest-match
//! first for multi-character operators, keyword/function words resolved
//! by exact-string lookup once a maximal identifier run has been read.

use crate::error::PepError;
use crate::expr::Operator;

#[derive(Debug, Clone, PartialEq)]
pub enum Tok {
    Ident(String),
    IntLit(i64),
    FloatLit(f64),
    Func(Operator),
    NotEq,
    EqEq,
    Le,
    Ge,
    Assign,
    Semi,
    LParen,
    RParen,
    LCurly,
    RCurly,
    LBracket,
    RBracket,
    Comma,
    Arrow,
    Plus,
    Minus,
    Tilde,
    Star,
    Slash,
    Caret,
    Lt,
    Gt,
    Pipe,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: Tok,
    pub lexeme: String,
    pub line: usize,
    pub column: usize,
}

fn keyword(word: &str) -> Option<Operator> {
    use Operator::*;
    Some(match word {
        "asind" => Asind,
        "asin" => Asin,
        "sind" => Sind,
        "sin" => Sin,
        "acosd" => Acosd,
        "acos" => Acos,
        "cosd" => Cosd,
        "cos" => Cos,
        "atan2d" => Atan2d,
        "atan2" => Atan2,
        "atand" => Atand,
        "atan" => Atan,
        "tand" => Tand,
        "tan" => Tan,
        "acotd" => Acotd,
        "acot" => Acot,
        "cotd" => Cotd,
        "cot" => Cot,
        "sqrt" => Sqrt,
        "abs" => Abs,
        "log10" => Log10,
        "log2" => Log2,
        "log" => Log,
        "min" => Min,
        "max" => Max,
        _ => return None,
    })
}

pub fn tokenize(src: &str) -> Result<Vec<Token>, PepError> {
    let chars: Vec<char> = src.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0usize;
    let mut line = 1usize;
    let mut line_start = 0usize;

    while i < chars.len() {
        let c = chars[i];

        if c == '\n' {
            line += 1;
            i += 1;
            line_start = i;
            continue;
        }
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        if c == '#' {
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
            continue;
        }

        let start = i;
        let column = start - line_start;

        // numeric literal: NUMBER_FLOAT (\d+\.\d+) before NUMBER (\d+)
        if c.is_ascii_digit() {
            while i < chars.len() && chars[i].is_ascii_digit() {
                i += 1;
            }
            if i + 1 < chars.len() && chars[i] == '.' && chars[i + 1].is_ascii_digit() {
                i += 1;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
                let lexeme: String = chars[start..i].iter().collect();
                let val: f64 = lexeme.parse().map_err(|_| PepError::Lex { line, column })?;
                tokens.push(Token { kind: Tok::FloatLit(val), lexeme, line, column });
            } else {
                let lexeme: String = chars[start..i].iter().collect();
                let val: i64 = lexeme.parse().map_err(|_| PepError::Lex { line, column })?;
                tokens.push(Token { kind: Tok::IntLit(val), lexeme, line, column });
            }
            continue;
        }

        // identifier / keyword-function word
        if c.is_alphabetic() || c == '_' {
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            let word: String = chars[start..i].iter().collect();
            let kind = match keyword(&word) {
                Some(op) => Tok::Func(op),
                None => Tok::Ident(word.clone()),
            };
            tokens.push(Token { kind, lexeme: word, line, column });
            continue;
        }

        // two-char operators, longest match first
        let two: Option<&str> = if i + 1 < chars.len() {
            match (c, chars[i + 1]) {
                ('!', '=') => Some("!="),
                ('=', '=') => Some("=="),
                ('<', '=') => Some("<="),
                ('>', '=') => Some(">="),
                ('-', '>') => Some("->"),
                _ => None,
            }
        } else {
            None
        };
        if let Some(sym) = two {
            let kind = match sym {
                "!=" => Tok::NotEq,
                "==" => Tok::EqEq,
                "<=" => Tok::Le,
                ">=" => Tok::Ge,
                "->" => Tok::Arrow,
                _ => unreachable!(),
            };
            tokens.push(Token { kind, lexeme: sym.to_string(), line, column });
            i += 2;
            continue;
        }

        let kind = match c {
            '=' => Tok::Assign,
            ';' => Tok::Semi,
            '(' => Tok::LParen,
            ')' => Tok::RParen,
            '{' => Tok::LCurly,
            '}' => Tok::RCurly,
            '[' => Tok::LBracket,
            ']' => Tok::RBracket,
            ',' => Tok::Comma,
            '+' => Tok::Plus,
            '-' => Tok::Minus,
            '~' => Tok::Tilde,
            '*' => Tok::Star,
            '/' => Tok::Slash,
            '^' => Tok::Caret,
            '<' => Tok::Lt,
            '>' => Tok::Gt,
            '|' => Tok::Pipe,
            _ => return Err(PepError::Lex { line, column }),
        };
        tokens.push(Token { kind, lexeme: c.to_string(), line, column });
        i += 1;
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_punctuation_and_numbers() {
        let toks = tokenize("1 + 2.5 * (3 - 4)").unwrap();
        let kinds: Vec<_> = toks.iter().map(|t| t.kind.clone()).collect();
        assert_eq!(
            kinds,
            vec![
                Tok::IntLit(1),
                Tok::Plus,
                Tok::FloatLit(2.5),
                Tok::Star,
                Tok::LParen,
                Tok::IntLit(3),
                Tok::Minus,
                Tok::IntLit(4),
                Tok::RParen,
            ]
        );
    }

    #[test]
    fn recognizes_functions_before_identifiers() {
        let toks = tokenize("sin sine atan2d").unwrap();
        assert_eq!(toks[0].kind, Tok::Func(Operator::Sin));
        assert_eq!(toks[1].kind, Tok::Ident("sine".to_string()));
        assert_eq!(toks[2].kind, Tok::Func(Operator::Atan2d));
    }

    #[test]
    fn multi_char_operators_win_over_prefixes() {
        let toks = tokenize("a != b -> c").unwrap();
        assert_eq!(toks[1].kind, Tok::NotEq);
        assert_eq!(toks[3].kind, Tok::Arrow);
    }

    #[test]
    fn comments_are_skipped() {
        let toks = tokenize("1 # a comment\n+ 2").unwrap();
        assert_eq!(toks.len(), 3);
        assert_eq!(toks[2].line, 2);
    }

    #[test]
    fn column_is_relative_to_the_current_line() {
        let toks = tokenize("ab\n  cd").unwrap();
        assert_eq!((toks[0].line, toks[0].column), (1, 0));
        assert_eq!((toks[1].line, toks[1].column), (2, 2));
    }

    #[test]
    fn unknown_char_is_lex_error() {
        let err = tokenize("1 @ 2").unwrap_err();
        assert!(matches!(err, PepError::Lex { line: 1, column: 2 }));
    }
}

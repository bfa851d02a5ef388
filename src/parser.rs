//! Recursive-descent parser: one function per grammar nonterminal,
//! consuming the token stream produced by `lexer::tokenize` and handing
//! expression runs off to `expr::shunting_yard`.
//!
//! ```text
//! system    := 'num_ps' '=' '{' sysStmt+ '}' ';'
//! sysStmt   := 'H' '=' '{' nameList '}' ';'
//!            | 'structure' '=' structTok+ ';'
//!            | name '=' '{' memberStmt+ '}' ';'
//! memberStmt:= 'var' '=' '{' nameList '}' ';'
//!            | 'E' '=' '{' nameList '}' ';'
//!            | 'var0' '=' '{' numList '}' ';'
//!            | 'E0' '=' '{' numList '}' ';'
//!            | 'pr' '=' '{' program '}' ';'
//! program   := expr ( '->' distrib | '[' ID '->' ']' distrib )
//! distrib   := propTerm ( '+' propTerm )*
//! propTerm  := NUMBER '|' ID
//! ```

use std::collections::HashSet;

use crate::ast::{RawMembrane, RawSystem};
use crate::error::PepError;
use crate::expr::shunting_yard;
use crate::lexer::{tokenize, Tok, Token};
use crate::model::{DistributionFunction, DistributionRule, Program, ProductionFunction, StructTok};

pub fn parse(source: &str) -> Result<RawSystem, PepError> {
    let tokens = tokenize(source)?;
    Parser { tokens: &tokens, pos: 0 }.parse_system()
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn line(&self) -> usize {
        self.peek()
            .or_else(|| self.tokens.last())
            .map(|t| t.line)
            .unwrap_or(0)
    }

    fn column(&self) -> usize {
        self.peek()
            .or_else(|| self.tokens.last())
            .map(|t| t.column)
            .unwrap_or(0)
    }

    fn advance(&mut self) -> Result<&Token, PepError> {
        let tok = self.tokens.get(self.pos).ok_or_else(|| PepError::Parse {
            line: self.line(),
            column: self.column(),
            expected: "more input".into(),
            got: "end of file".into(),
        })?;
        self.pos += 1;
        Ok(tok)
    }

    fn peek_is(&self, kind: &Tok) -> bool {
        self.peek().map(|t| &t.kind == kind).unwrap_or(false)
    }

    fn peek_ident(&self) -> Option<&str> {
        match self.peek().map(|t| &t.kind) {
            Some(Tok::Ident(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    fn expect_punct(&mut self, kind: Tok) -> Result<(), PepError> {
        let line = self.line();
        let column = self.column();
        let tok = self.advance()?;
        if tok.kind == kind {
            Ok(())
        } else {
            Err(PepError::Parse { line, column, expected: format!("{kind:?}"), got: tok.lexeme.clone() })
        }
    }

    fn expect_keyword(&mut self, word: &str) -> Result<(), PepError> {
        let line = self.line();
        let column = self.column();
        let tok = self.advance()?;
        match &tok.kind {
            Tok::Ident(s) if s == word => Ok(()),
            _ => Err(PepError::Parse { line, column, expected: word.to_string(), got: tok.lexeme.clone() }),
        }
    }

    /// Accepts an `Ident` or an `IntLit` (converted to its decimal text),
    /// since membrane names may be purely numeric.
    fn expect_name(&mut self) -> Result<String, PepError> {
        let line = self.line();
        let column = self.column();
        let tok = self.advance()?;
        match &tok.kind {
            Tok::Ident(s) => Ok(s.clone()),
            Tok::IntLit(n) => Ok(n.to_string()),
            _ => Err(PepError::Parse { line, column, expected: "identifier".into(), got: tok.lexeme.clone() }),
        }
    }

    fn parse_name_list(&mut self) -> Result<Vec<String>, PepError> {
        let mut v = vec![self.expect_name()?];
        while self.peek_is(&Tok::Comma) {
            self.advance()?;
            v.push(self.expect_name()?);
        }
        Ok(v)
    }

    fn parse_signed_num(&mut self) -> Result<f64, PepError> {
        let negate = if self.peek_is(&Tok::Minus) {
            self.advance()?;
            true
        } else {
            false
        };
        let line = self.line();
        let column = self.column();
        let tok = self.advance()?;
        let val = match &tok.kind {
            Tok::IntLit(n) => *n as f64,
            Tok::FloatLit(f) => *f,
            _ => return Err(PepError::Parse { line, column, expected: "number".into(), got: tok.lexeme.clone() }),
        };
        Ok(if negate { -val } else { val })
    }

    fn parse_num_list(&mut self) -> Result<Vec<f64>, PepError> {
        let mut v = vec![self.parse_signed_num()?];
        while self.peek_is(&Tok::Comma) {
            self.advance()?;
            v.push(self.parse_signed_num()?);
        }
        Ok(v)
    }

    /// Reads the raw `structure` token stream up to (not including) the
    /// terminating `;`.
    fn parse_structure(&mut self) -> Result<Vec<StructTok>, PepError> {
        let mut out = Vec::new();
        loop {
            match self.peek().map(|t| &t.kind) {
                Some(Tok::LBracket) => {
                    out.push(StructTok::LBracket);
                    self.advance()?;
                }
                Some(Tok::RBracket) => {
                    out.push(StructTok::RBracket);
                    self.advance()?;
                }
                Some(Tok::Ident(_)) | Some(Tok::IntLit(_)) => {
                    out.push(StructTok::Name(self.expect_name()?));
                }
                _ => break,
            }
        }
        Ok(out)
    }

    /// Scans forward from the current position for the token that ends a
    /// production function: `->` or `[` (the enzymatic-program opener).
    /// Neither token can legally appear inside an expression, so the
    /// first occurrence is always the real terminator.
    fn find_expr_end(&self) -> Result<usize, PepError> {
        let mut i = self.pos;
        while i < self.tokens.len() {
            match self.tokens[i].kind {
                Tok::Arrow | Tok::LBracket => return Ok(i),
                _ => i += 1,
            }
        }
        Err(PepError::Parse {
            line: self.line(),
            column: self.column(),
            expected: "'->' or '['".into(),
            got: "end of file".into(),
        })
    }

    fn parse_program(&mut self) -> Result<Program<String>, PepError> {
        let end = self.find_expr_end()?;
        let (items, infix) = shunting_yard(&self.tokens[self.pos..end])?;
        self.pos = end;

        let enzyme = if self.peek_is(&Tok::LBracket) {
            self.advance()?;
            let name = self.expect_name()?;
            self.expect_punct(Tok::Arrow)?;
            self.expect_punct(Tok::RBracket)?;
            Some(name)
        } else {
            self.expect_punct(Tok::Arrow)?;
            None
        };

        let distrib = self.parse_distrib()?;
        Ok(Program { prod: ProductionFunction { infix, items }, distrib, enzyme })
    }

    fn parse_distrib(&mut self) -> Result<DistributionFunction<String>, PepError> {
        let mut rules = Vec::new();
        let mut lexemes = Vec::new();
        loop {
            let line = self.line();
            let column = self.column();
            let tok = self.advance()?;
            let proportion = match &tok.kind {
                Tok::IntLit(n) if *n > 0 => *n as u32,
                _ => {
                    return Err(PepError::Parse {
                        line,
                        column,
                        expected: "positive integer proportion".into(),
                        got: tok.lexeme.clone(),
                    })
                }
            };
            lexemes.push(proportion.to_string());
            self.expect_punct(Tok::Pipe)?;
            lexemes.push("|".to_string());
            let name = self.expect_name()?;
            lexemes.push(name.clone());
            rules.push(DistributionRule { proportion, target: name });

            if self.peek_is(&Tok::Plus) {
                self.advance()?;
                lexemes.push("+".to_string());
                continue;
            }
            break;
        }
        let proportion_total: u32 = rules.iter().map(|r| r.proportion).sum();
        Ok(DistributionFunction { rules, proportion_total, expression: lexemes.join(" ") })
    }

    fn parse_membrane(&mut self, name: String) -> Result<RawMembrane, PepError> {
        self.expect_punct(Tok::LCurly)?;
        let mut vars = Vec::new();
        let mut var0 = Vec::new();
        let mut enzymes = Vec::new();
        let mut e0 = Vec::new();
        let mut programs = Vec::new();

        while !self.peek_is(&Tok::RCurly) {
            let line = self.line();
            let column = self.column();
            let kw = self.peek_ident().map(|s| s.to_string()).ok_or_else(|| PepError::Parse {
                line,
                column,
                expected: "var|E|var0|E0|pr".into(),
                got: self.peek().map(|t| t.lexeme.clone()).unwrap_or_default(),
            })?;
            self.advance()?;
            self.expect_punct(Tok::Assign)?;
            match kw.as_str() {
                "var" => {
                    self.expect_punct(Tok::LCurly)?;
                    vars = self.parse_name_list()?;
                    self.expect_punct(Tok::RCurly)?;
                }
                "E" => {
                    self.expect_punct(Tok::LCurly)?;
                    enzymes = self.parse_name_list()?;
                    self.expect_punct(Tok::RCurly)?;
                }
                "var0" => {
                    self.expect_punct(Tok::LCurly)?;
                    var0 = self.parse_num_list()?;
                    self.expect_punct(Tok::RCurly)?;
                }
                "E0" => {
                    self.expect_punct(Tok::LCurly)?;
                    e0 = self.parse_num_list()?;
                    self.expect_punct(Tok::RCurly)?;
                }
                "pr" => {
                    self.expect_punct(Tok::LCurly)?;
                    programs.push(self.parse_program()?);
                    self.expect_punct(Tok::RCurly)?;
                }
                other => {
                    return Err(PepError::Parse {
                        line,
                        column,
                        expected: "var|E|var0|E0|pr".into(),
                        got: other.to_string(),
                    });
                }
            }
            self.expect_punct(Tok::Semi)?;
        }
        self.expect_punct(Tok::RCurly)?;
        self.expect_punct(Tok::Semi)?;

        if var0.len() != vars.len() {
            return Err(PepError::Parse {
                line: self.line(),
                column: self.column(),
                expected: format!("var0 of length {}", vars.len()),
                got: format!("length {}", var0.len()),
            });
        }
        if e0.len() != enzymes.len() {
            return Err(PepError::Parse {
                line: self.line(),
                column: self.column(),
                expected: format!("E0 of length {}", enzymes.len()),
                got: format!("length {}", e0.len()),
            });
        }

        Ok(RawMembrane { name, vars, var0, enzymes, e0, programs })
    }

    fn parse_system(&mut self) -> Result<RawSystem, PepError> {
        self.expect_keyword("num_ps")?;
        self.expect_punct(Tok::Assign)?;
        self.expect_punct(Tok::LCurly)?;

        let mut h: Vec<String> = Vec::new();
        let mut structure = Vec::new();
        let mut membranes = Vec::new();

        while !self.peek_is(&Tok::RCurly) {
            let line = self.line();
            let column = self.column();
            let word = self.peek_ident().map(|s| s.to_string()).ok_or_else(|| PepError::Parse {
                line,
                column,
                expected: "H, structure, or a membrane name".into(),
                got: self.peek().map(|t| t.lexeme.clone()).unwrap_or_default(),
            })?;

            match word.as_str() {
                "H" => {
                    self.advance()?;
                    self.expect_punct(Tok::Assign)?;
                    self.expect_punct(Tok::LCurly)?;
                    h = self.parse_name_list()?;
                    self.expect_punct(Tok::RCurly)?;
                    self.expect_punct(Tok::Semi)?;

                    let mut seen = HashSet::new();
                    for name in &h {
                        if !seen.insert(name.clone()) {
                            return Err(PepError::DuplicateMembrane(name.clone()));
                        }
                    }
                }
                "structure" => {
                    self.advance()?;
                    self.expect_punct(Tok::Assign)?;
                    structure = self.parse_structure()?;
                    self.expect_punct(Tok::Semi)?;
                }
                _ => {
                    if !h.contains(&word) {
                        return Err(PepError::Parse {
                            line,
                            column,
                            expected: "a membrane name declared in H".into(),
                            got: word,
                        });
                    }
                    self.advance()?;
                    self.expect_punct(Tok::Assign)?;
                    membranes.push(self.parse_membrane(word)?);
                }
            }
        }
        self.expect_punct(Tok::RCurly)?;
        self.expect_punct(Tok::Semi)?;

        for name in &h {
            if !membranes.iter().any(|m| &m.name == name) {
                return Err(PepError::Parse {
                    line: self.line(),
                    column: self.column(),
                    expected: format!("a block for membrane '{name}'"),
                    got: "end of file".into(),
                });
            }
        }

        Ok(RawSystem { h, structure, membranes })
    }
}

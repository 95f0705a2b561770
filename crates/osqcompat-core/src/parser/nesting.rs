//! Nesting bound checked on the token stream, before sqlparser builds a tree
//!
//! sqlparser folds operator chains into a tree one level deeper per operator
//! without recursing itself, but rendering, visiting and dropping that tree
//! all recurse. Deep input is therefore rejected here, while it is still a
//! flat token list.

use sqlparser::dialect::Dialect;
use sqlparser::keywords::Keyword;
use sqlparser::parser::ParserError;
use sqlparser::tokenizer::{Token, Tokenizer};

use crate::error::{DepthExceededError, ParseError};

/// Default bound on the estimated expression nesting of one query
pub const DEFAULT_MAX_NESTING: usize = 100;

/// Operators seen at one parenthesis (or CASE) level
#[derive(Debug, Default)]
struct Level {
    /// Operators in the current expression; a separator starts a new one
    ops: usize,
    /// UNION / EXCEPT / INTERSECT chain, kept until the level closes
    set_ops: usize,
}

impl Level {
    fn depth(&self) -> usize {
        self.ops + self.set_ops + 1
    }
}

/// Estimated nesting as the token stream is scanned.
///
/// The estimate at any point is the sum of the open levels' depths. Every
/// operator counts, so it is an upper bound on the depth of the parsed tree.
struct NestingEstimate {
    levels: Vec<Level>,
    total: usize,
}

impl NestingEstimate {
    fn new() -> Self {
        Self {
            levels: vec![Level::default()],
            total: 1,
        }
    }

    fn top(&mut self) -> &mut Level {
        let last = self.levels.len() - 1;
        &mut self.levels[last]
    }

    fn open(&mut self) {
        self.levels.push(Level::default());
        self.total += 1;
    }

    fn close(&mut self) {
        // Unbalanced closers are left for the parser to report
        if self.levels.len() > 1 {
            if let Some(level) = self.levels.pop() {
                self.total -= level.depth();
            }
        }
    }

    fn operator(&mut self) {
        self.top().ops += 1;
        self.total += 1;
    }

    fn set_operator(&mut self) {
        self.separator();
        self.top().set_ops += 1;
        self.total += 1;
    }

    fn separator(&mut self) {
        let ops = std::mem::take(&mut self.top().ops);
        self.total -= ops;
    }

    fn statement_end(&mut self) {
        *self = Self::new();
    }

    fn feed(&mut self, token: &Token) {
        match token {
            Token::LParen => self.open(),
            Token::RParen => self.close(),
            Token::Comma => self.separator(),
            Token::SemiColon => self.statement_end(),
            Token::Word(word) if word.quote_style.is_none() => match word.keyword {
                Keyword::CASE => self.open(),
                Keyword::END => self.close(),
                Keyword::UNION | Keyword::EXCEPT | Keyword::INTERSECT => self.set_operator(),
                Keyword::AND
                | Keyword::OR
                | Keyword::NOT
                | Keyword::IS
                | Keyword::IN
                | Keyword::LIKE
                | Keyword::ILIKE
                | Keyword::REGEXP
                | Keyword::MATCH
                | Keyword::BETWEEN
                | Keyword::COLLATE => self.operator(),
                Keyword::SELECT
                | Keyword::FROM
                | Keyword::WHERE
                | Keyword::GROUP
                | Keyword::HAVING
                | Keyword::ORDER
                | Keyword::LIMIT
                | Keyword::OFFSET
                | Keyword::ON
                | Keyword::USING
                | Keyword::WITH
                | Keyword::WHEN
                | Keyword::THEN
                | Keyword::ELSE => self.separator(),
                _ => {}
            },
            token if is_operator(token) => self.operator(),
            _ => {}
        }
    }
}

fn is_operator(token: &Token) -> bool {
    matches!(
        token,
        Token::Plus
            | Token::Minus
            | Token::Mul
            | Token::Div
            | Token::Mod
            | Token::StringConcat
            | Token::Eq
            | Token::DoubleEq
            | Token::Neq
            | Token::Lt
            | Token::Gt
            | Token::LtEq
            | Token::GtEq
            | Token::Ampersand
            | Token::Pipe
            | Token::Caret
            | Token::ShiftLeft
            | Token::ShiftRight
            | Token::Tilde
            | Token::Arrow
            | Token::LongArrow
    )
}

/// Fail with `DepthExceededError` when `sql` may nest deeper than `limit`
pub fn check_nesting(dialect: &dyn Dialect, sql: &str, limit: usize) -> Result<(), ParseError> {
    let tokens = Tokenizer::new(dialect, sql)
        .tokenize()
        .map_err(ParserError::from)?;

    let mut estimate = NestingEstimate::new();
    for token in &tokens {
        estimate.feed(token);
        if estimate.total > limit {
            return Err(DepthExceededError { limit }.into());
        }
    }
    Ok(())
}

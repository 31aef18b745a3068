//! Parser driver
//!
//! Drives a [ValidatedGrammar] over a token stream. Before every step the driver checks that the
//! grammar can take the next token, so malformed input surfaces as a [ParseError] rather than
//! reaching the zipper's logic-error panics.
//!
//! Parsing is incremental: [Parser::start] returns a [ParseState] that consumes one token per
//! [ParseState::feed] and yields the result on [ParseState::finish]. [Parser::parse] does both
//! for a whole token sequence.

use crate::config::ParserConfig;
use crate::validated::ValidatedGrammar;
use crate::value::{Token, TokenKind, Value};
use crate::zipper::{Context, Fold};
use log::trace;
use std::fmt;

/// Why a token stream was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError<K> {
    /// A token of `kind` cannot come at `position`.
    UnexpectedToken { position: usize, kind: K },
    /// The input ended at `position` but the grammar requires more tokens.
    UnexpectedEnd { position: usize },
    TokenLimitExceeded { limit: usize },
    DepthLimitExceeded { position: usize, limit: usize },
}

impl<K: fmt::Debug> fmt::Display for ParseError<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::UnexpectedToken { position, kind } => {
                write!(f, "unexpected token {:?} at position {}", kind, position)
            }
            ParseError::UnexpectedEnd { position } => {
                write!(f, "unexpected end of input at position {}", position)
            }
            ParseError::TokenLimitExceeded { limit } => {
                write!(f, "input exceeds the limit of {} token(s)", limit)
            }
            ParseError::DepthLimitExceeded { position, limit } => write!(
                f,
                "nesting at position {} exceeds the depth limit of {}",
                position, limit
            ),
        }
    }
}

impl<K: fmt::Debug> std::error::Error for ParseError<K> {}

/// Parses token streams against a validated grammar.
#[derive(Debug, Clone)]
pub struct Parser<'g, V, K> {
    grammar: &'g ValidatedGrammar<V, K>,
    config: ParserConfig,
}

impl<'g, V: Value, K: TokenKind> Parser<'g, V, K> {
    pub fn new(grammar: &'g ValidatedGrammar<V, K>) -> Self {
        Parser::with_config(grammar, ParserConfig::default())
    }

    pub fn with_config(grammar: &'g ValidatedGrammar<V, K>, config: ParserConfig) -> Self {
        Parser { grammar, config }
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// A fresh parse that has consumed nothing yet.
    pub fn start(&self) -> ParseState<'g, V, K> {
        ParseState {
            grammar: self.grammar,
            config: self.config.clone(),
            position: 0,
            cursor: Cursor::Start,
        }
    }

    pub fn parse<I>(&self, tokens: I) -> Result<V, ParseError<K>>
    where
        I: IntoIterator,
        I::Item: Token<Kind = K, Value = V>,
    {
        let mut state = self.start();
        for token in tokens {
            state = state.feed(token)?;
        }
        state.finish()
    }
}

#[derive(Debug, Clone)]
enum Cursor<'g, V, K> {
    Start,
    Folded(Fold<'g, V, K>),
}

/// An in-progress parse.
#[derive(Debug, Clone)]
pub struct ParseState<'g, V, K> {
    grammar: &'g ValidatedGrammar<V, K>,
    config: ParserConfig,
    position: usize,
    cursor: Cursor<'g, V, K>,
}

impl<'g, V: Value, K: TokenKind> ParseState<'g, V, K> {
    /// Number of tokens consumed so far.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Consumes one token.
    pub fn feed<T>(self, token: T) -> Result<Self, ParseError<K>>
    where
        T: Token<Kind = K, Value = V>,
    {
        let position = self.position;
        if let Some(limit) = self.config.max_tokens {
            if position >= limit {
                return Err(ParseError::TokenLimitExceeded { limit });
            }
        }

        let kind = token.kind();
        let focus = match self.cursor {
            Cursor::Start if self.grammar.accepts(&kind) => {
                Some(self.grammar.focus(&kind, Context::top()))
            }
            Cursor::Start => None,
            Cursor::Folded(fold) => fold.resume(&kind),
        };
        let focus = match focus {
            Some(focus) => focus,
            None => return Err(ParseError::UnexpectedToken { position, kind }),
        };

        if let Some(limit) = self.config.max_depth {
            if focus.depth() > limit {
                return Err(ParseError::DepthLimitExceeded { position, limit });
            }
        }

        trace!("token {} of kind {:?} at depth {}", position, kind, focus.depth());
        let fold = focus.advance(token);
        Ok(ParseState {
            grammar: self.grammar,
            config: self.config,
            position: position + 1,
            cursor: Cursor::Folded(fold),
        })
    }

    /// Ends the input and returns the parse result.
    pub fn finish(self) -> Result<V, ParseError<K>> {
        let value = match self.cursor {
            Cursor::Start => self.grammar.nullable_value().cloned(),
            Cursor::Folded(fold) => fold.finish(),
        };
        value.ok_or(ParseError::UnexpectedEnd {
            position: self.position,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Grammar;

    type G = Grammar<Vec<char>, char>;

    fn tokens(input: &str) -> Vec<(char, Vec<char>)> {
        input.chars().map(|c| (c, vec![c])).collect()
    }

    #[test]
    fn test_parse_sequence() {
        let validated = G::sequence(G::element('a'), G::element('b'))
            .validate()
            .unwrap();
        let parser = Parser::new(&validated);
        assert_eq!(parser.parse(tokens("ab")), Ok(vec!['a', 'b']));
        assert_eq!(
            parser.parse(tokens("b")),
            Err(ParseError::UnexpectedToken {
                position: 0,
                kind: 'b'
            })
        );
        assert_eq!(
            parser.parse(tokens("a")),
            Err(ParseError::UnexpectedEnd { position: 1 })
        );
    }

    #[test]
    fn test_empty_input_uses_nullable_value() {
        let validated = G::many(G::element('a'), vec!['.']).validate().unwrap();
        let parser = Parser::new(&validated);
        assert_eq!(parser.parse(tokens("")), Ok(vec!['.']));
    }

    #[test]
    fn test_incremental_feed() {
        let validated = G::many(G::element('a'), vec![]).validate().unwrap();
        let parser = Parser::new(&validated);
        let state = parser.start().feed(('a', vec!['a'])).unwrap();
        let state = state.feed(('a', vec!['a'])).unwrap();
        assert_eq!(state.position(), 2);
        assert_eq!(state.finish(), Ok(vec!['a', 'a']));
    }

    #[test]
    fn test_error_display() {
        let error: ParseError<char> = ParseError::UnexpectedToken {
            position: 3,
            kind: 'x',
        };
        assert_eq!(error.to_string(), "unexpected token 'x' at position 3");
    }
}

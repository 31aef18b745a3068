//! # zipll
//!
//! LL(1) grammar combinators with static conflict detection and a zipper-driven parser.
//!
//! Grammars are built from six node kinds (see [grammar]). Validation computes the FIRST set,
//! nullability, productivity and follow restrictions of every node as least fixed points, so
//! recursive grammars get exact answers, and rejects any grammar that is not LL(1) with the full
//! list of [Conflict]s. A validated grammar is then driven one token at a time: each token kind
//! positions a [Focus] on the element that consumes it, and the value is folded back up the
//! [Context].
//!
//! ```ignore
//! let list = Grammar::many(Grammar::element('a'), vec![]);
//! let validated = list.validate()?;
//! let value = Parser::new(&validated).parse(vec![('a', vec!['a']), ('a', vec!['a'])])?;
//! ```
//!
//! ## Testing
//!
//! Fluent assertions for grammars live in the [testing] module.

pub mod config;
pub mod grammar;
pub mod parser;
pub mod property;
pub mod testing;
pub mod validated;
pub mod value;
pub mod zipper;

pub use config::ParserConfig;
pub use grammar::{Conflict, Grammar, NodeId, ShouldNotFollow, Transformation, ValidationError};
pub use parser::{ParseError, ParseState, Parser};
pub use property::{Fact, InductiveProperty};
pub use validated::{Syntax, SyntaxId, ValidNode, ValidatedGrammar};
pub use value::{Token, TokenKind, Value};
pub use zipper::{Context, Focus, Fold, Frame, Suspension};

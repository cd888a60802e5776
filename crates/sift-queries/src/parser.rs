//! Filter expression parser
//!
//! Recursive descent over the token stream:
//!
//! ```text
//! expr      := term (conj term)*        -- one conj per nesting level
//! term      := "(" expr ")" | condition
//! condition := "substringof" "(" value "," prop ")"
//!            | ("startswith" | "endswith") "(" prop "," value ")"
//!            | prop op value
//! ```
//!
//! There is no precedence between `and` and `or`: a level that uses both is
//! rejected and must be disambiguated with parentheses.

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use sift_core::config::ParserConfig;
use sift_core::{FilterValue, ParseError, ParseResult};
use tracing::debug;

use crate::lexer::{tokenize, Token, TokenKind};
use crate::predicate::{Condition, Group, GroupOperator, Operator, Predicate};

static PROPERTY_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*(\.[A-Za-z_$][A-Za-z0-9_$]*)*$")
        .expect("property path pattern is valid")
});

/// Whether `path` is a well-formed dot-separated property path
pub fn is_property_path(path: &str) -> bool {
    PROPERTY_PATH.is_match(path)
}

impl Predicate {
    /// Parse filter text, returning `None` on any malformed input
    pub fn parse(text: &str) -> Option<Predicate> {
        match Self::try_parse(text) {
            Ok(predicate) => Some(predicate),
            Err(error) => {
                debug!(input = text, error = %error, "Rejected filter expression");
                None
            }
        }
    }

    /// Parse filter text, reporting why it was rejected
    pub fn try_parse(text: &str) -> ParseResult<Predicate> {
        Self::try_parse_with(text, &ParserConfig::default())
    }

    /// Parse filter text with explicit parser settings
    pub fn try_parse_with(text: &str, config: &ParserConfig) -> ParseResult<Predicate> {
        let tokens = tokenize(text)?;
        if tokens.is_empty() {
            return Err(ParseError::Empty);
        }

        let mut parser = Parser {
            tokens: &tokens,
            pos: 0,
            depth: 0,
            max_depth: config.max_depth,
        };
        let predicate = parser.parse_expr()?;

        match parser.peek() {
            None => Ok(predicate),
            Some(token) => Err(unexpected(token)),
        }
    }
}

impl FromStr for Predicate {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_parse(s)
    }
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
    max_depth: usize,
}

fn unexpected(token: &Token) -> ParseError {
    ParseError::UnexpectedToken {
        position: token.position,
        found: token.describe(),
    }
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind_at(&self, offset: usize) -> Option<&'a TokenKind> {
        self.tokens.get(self.pos + offset).map(|t| &t.kind)
    }

    fn next(&mut self) -> ParseResult<&'a Token> {
        let token = self.tokens.get(self.pos).ok_or(ParseError::UnexpectedEnd)?;
        self.pos += 1;
        Ok(token)
    }

    fn expect(&mut self, kind: TokenKind) -> ParseResult<()> {
        let token = self.next()?;
        if token.kind == kind {
            Ok(())
        } else {
            Err(unexpected(token))
        }
    }

    fn parse_expr(&mut self) -> ParseResult<Predicate> {
        let first = self.parse_term()?;
        let mut operator: Option<GroupOperator> = None;
        let mut children = vec![first];

        while let Some(token) = self.peek() {
            let conj = match &token.kind {
                TokenKind::Word(word) => GroupOperator::from_str(word),
                _ => None,
            };
            let Some(conj) = conj else {
                break;
            };

            match operator {
                Some(existing) if existing != conj => {
                    return Err(ParseError::MixedGroupOperators {
                        position: token.position,
                    });
                }
                _ => operator = Some(conj),
            }

            self.pos += 1;
            children.push(self.parse_term()?);
        }

        match operator {
            Some(op) => Ok(Predicate::Group(Group::new(op, children))),
            None => Ok(children.remove(0)),
        }
    }

    fn parse_term(&mut self) -> ParseResult<Predicate> {
        match self.peek_kind_at(0) {
            Some(TokenKind::LParen) => {
                self.pos += 1;
                self.depth += 1;
                if self.depth > self.max_depth {
                    return Err(ParseError::TooDeep {
                        max: self.max_depth,
                    });
                }
                let inner = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                self.depth -= 1;
                Ok(inner)
            }
            Some(_) => self.parse_condition().map(Predicate::Leaf),
            None => Err(ParseError::UnexpectedEnd),
        }
    }

    fn parse_condition(&mut self) -> ParseResult<Condition> {
        let token = self.next()?;
        let TokenKind::Word(word) = &token.kind else {
            return Err(unexpected(token));
        };

        if matches!(self.peek_kind_at(0), Some(TokenKind::LParen)) {
            if let Some(function) = Operator::from_function_name(word) {
                return self.parse_function(function);
            }
        }

        let property = self.property_from(token, word)?;

        let op_token = self.next()?;
        let operator = match &op_token.kind {
            TokenKind::Word(op) => Operator::from_str(op).ok_or_else(|| ParseError::UnknownOperator {
                position: op_token.position,
                operator: op.clone(),
            })?,
            _ => return Err(unexpected(op_token)),
        };

        let value = self.parse_value()?;
        Ok(Condition::new(property, operator, value))
    }

    fn parse_function(&mut self, operator: Operator) -> ParseResult<Condition> {
        self.expect(TokenKind::LParen)?;

        let condition = if operator == Operator::Contains {
            let value = self.parse_value()?;
            self.expect(TokenKind::Comma)?;
            let property = self.parse_property()?;
            Condition::new(property, operator, value)
        } else {
            let property = self.parse_property()?;
            self.expect(TokenKind::Comma)?;
            let value = self.parse_value()?;
            Condition::new(property, operator, value)
        };

        self.expect(TokenKind::RParen)?;
        Ok(condition)
    }

    fn parse_property(&mut self) -> ParseResult<String> {
        let token = self.next()?;
        match &token.kind {
            TokenKind::Word(word) => self.property_from(token, word),
            _ => Err(unexpected(token)),
        }
    }

    fn property_from(&self, token: &Token, word: &str) -> ParseResult<String> {
        if is_property_path(word) {
            Ok(word.to_string())
        } else {
            Err(ParseError::InvalidProperty {
                position: token.position,
                property: word.to_string(),
            })
        }
    }

    fn parse_value(&mut self) -> ParseResult<FilterValue> {
        let token = self.next()?;
        match &token.kind {
            TokenKind::Quoted(text) => Ok(FilterValue::String(text.clone())),
            TokenKind::Word(word) => Ok(FilterValue::from_bareword(word)),
            _ => Err(unexpected(token)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(property: &str, operator: Operator, value: impl Into<FilterValue>) -> Predicate {
        Predicate::condition(property, operator, value)
    }

    #[test]
    fn test_single_comparison() {
        assert_eq!(
            Predicate::try_parse("age gt 5").unwrap(),
            leaf("age", Operator::Gt, 5)
        );
        assert_eq!(
            Predicate::try_parse("owner.name eq 'John Smith'").unwrap(),
            leaf("owner.name", Operator::Eq, "John Smith")
        );
        assert_eq!(
            Predicate::try_parse("active eq true").unwrap(),
            leaf("active", Operator::Eq, true)
        );
        assert_eq!(
            Predicate::try_parse("status eq open").unwrap(),
            leaf("status", Operator::Eq, "open")
        );
    }

    #[test]
    fn test_functions() {
        assert_eq!(
            Predicate::try_parse("substringof('oh', name)").unwrap(),
            leaf("name", Operator::Contains, "oh")
        );
        assert_eq!(
            Predicate::try_parse("startswith(name, 'Jo')").unwrap(),
            leaf("name", Operator::StartsWith, "Jo")
        );
        assert_eq!(
            Predicate::try_parse("endswith(owner.name, 'hn')").unwrap(),
            leaf("owner.name", Operator::EndsWith, "hn")
        );
    }

    #[test]
    fn test_function_name_as_property() {
        assert_eq!(
            Predicate::try_parse("endswith eq 1").unwrap(),
            leaf("endswith", Operator::Eq, 1)
        );
    }

    #[test]
    fn test_uniform_group() {
        let parsed = Predicate::try_parse("a eq 1 and b eq 2 and c eq 3").unwrap();
        let group = parsed.as_group().unwrap();
        assert_eq!(group.operator, Some(GroupOperator::And));
        assert_eq!(group.children.len(), 3);
    }

    #[test]
    fn test_mixed_operators_rejected() {
        assert_eq!(
            Predicate::try_parse("a eq 1 and b eq 2 or c eq 3"),
            Err(ParseError::MixedGroupOperators { position: 18 })
        );
        assert!(Predicate::parse("a eq 1 and b eq 2 or c eq 3").is_none());
        assert!(Predicate::parse("(a eq 1 or b eq 2 and c eq 3)").is_none());
    }

    #[test]
    fn test_parenthesized_groups() {
        let parsed = Predicate::try_parse("(a eq 1 and b eq 2) or c eq 3").unwrap();
        let group = parsed.as_group().unwrap();
        assert_eq!(group.operator, Some(GroupOperator::Or));
        assert_eq!(group.children.len(), 2);
        assert_eq!(
            group.children[0].as_group().unwrap().operator,
            Some(GroupOperator::And)
        );

        let parsed = Predicate::try_parse("a eq 1 and (b eq 2 or (c eq 3 or d eq 4))").unwrap();
        assert_eq!(parsed.to_string(), "a eq 1 and (b eq 2 or (c eq 3 or d eq 4))");
    }

    #[test]
    fn test_redundant_parentheses() {
        assert_eq!(
            Predicate::try_parse("((age gt 5))").unwrap(),
            leaf("age", Operator::Gt, 5)
        );
    }

    #[test]
    fn test_malformed_inputs() {
        assert_eq!(Predicate::try_parse(""), Err(ParseError::Empty));
        assert_eq!(Predicate::try_parse("age gt"), Err(ParseError::UnexpectedEnd));
        assert!(matches!(
            Predicate::try_parse("age between 5"),
            Err(ParseError::UnknownOperator { .. })
        ));
        assert!(matches!(
            Predicate::try_parse("9lives eq 1"),
            Err(ParseError::InvalidProperty { .. })
        ));
        assert!(matches!(
            Predicate::try_parse("(age gt 5"),
            Err(ParseError::UnexpectedEnd)
        ));
        assert!(matches!(
            Predicate::try_parse("age gt 5)"),
            Err(ParseError::UnexpectedToken { .. })
        ));
        assert!(matches!(
            Predicate::try_parse("age gt 5 and"),
            Err(ParseError::UnexpectedEnd)
        ));
        assert!(matches!(
            Predicate::try_parse("age gt 5 age lt 3"),
            Err(ParseError::UnexpectedToken { .. })
        ));
        assert!(matches!(
            Predicate::try_parse("substringof(name, )"),
            Err(ParseError::UnexpectedToken { .. })
        ));
        assert!(Predicate::parse("()").is_none());
        assert!(Predicate::parse("name eq 'open").is_none());
    }

    #[test]
    fn test_max_depth() {
        let config = ParserConfig { max_depth: 2 };
        assert!(Predicate::try_parse_with("((a eq 1))", &config).is_ok());
        assert_eq!(
            Predicate::try_parse_with("(((a eq 1)))", &config),
            Err(ParseError::TooDeep { max: 2 })
        );
    }

    #[test]
    fn test_from_str() {
        let parsed: Predicate = "name ne 'Bob'".parse().unwrap();
        assert_eq!(parsed, leaf("name", Operator::Ne, "Bob"));
    }

    #[test]
    fn test_property_paths() {
        assert!(is_property_path("name"));
        assert!(is_property_path("owner.address.city"));
        assert!(is_property_path("_id"));
        assert!(!is_property_path("owner..name"));
        assert!(!is_property_path("owner."));
        assert!(!is_property_path("1abc"));
    }
}

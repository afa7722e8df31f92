//! Recursive-descent parser for path expressions.
//!
//! Grammar, loosest binding first:
//!
//! ```text
//! Expr     := And ('or' And)*
//! And      := Equality ('and' Equality)*
//! Equality := Relational (('=' | '!=') Relational)*
//! Relational := Additive (('<' | '<=' | '>' | '>=') Additive)*
//! Additive := Multiplicative (('+' | '-') Multiplicative)*
//! Multiplicative := Unary (('*' | 'div' | 'mod') Unary)*
//! Unary    := '-' Unary | Union
//! Union    := PathExpr ('|' PathExpr)*
//! PathExpr := LocationPath | Primary Predicate* (('/' | '//') RelativePath)?
//! ```
//!
//! After a complete operand, `*` is multiplication and `div`/`mod` are
//! operators; anywhere else they are name tests.

use crate::ast::*;
use crate::error::{ParseError, ParseErrorKind};

pub(crate) fn parse(input: &str) -> Result<Expr, ParseError> {
    let mut parser = PathParser { input, pos: 0 };
    parser.skip_whitespace();
    if parser.is_at_end() {
        return Err(parser.error(ParseErrorKind::Empty));
    }
    let expr = parser.parse_or()?;
    parser.skip_whitespace();
    match parser.peek() {
        None => Ok(expr),
        Some(c) => Err(parser.error(ParseErrorKind::UnexpectedChar(c))),
    }
}

struct PathParser<'a> {
    input: &'a str,
    pos: usize,
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.')
}

impl<'a> PathParser<'a> {
    // ------------------------------------------------------------------
    // Cursor helpers
    // ------------------------------------------------------------------

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.rest().chars().nth(n)
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn eat_str(&mut self, s: &str) -> bool {
        if self.rest().starts_with(s) {
            self.pos += s.len();
            true
        } else {
            false
        }
    }

    /// Consume an operator word such as `and` when it is not the prefix of a
    /// longer name.
    fn eat_keyword(&mut self, word: &str) -> bool {
        self.skip_whitespace();
        let rest = self.rest();
        if rest.starts_with(word) && !rest[word.len()..].starts_with(is_name_char) {
            self.pos += word.len();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, c: char) -> Result<(), ParseError> {
        self.skip_whitespace();
        match self.peek() {
            Some(found) if found == c => {
                self.advance();
                Ok(())
            }
            Some(found) => Err(self.error(ParseErrorKind::UnexpectedChar(found))),
            None => Err(self.error(ParseErrorKind::UnexpectedEnd)),
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn error(&self, kind: ParseErrorKind) -> ParseError {
        ParseError {
            kind,
            position: self.pos,
        }
    }

    fn unexpected(&self) -> ParseError {
        match self.peek() {
            Some(c) => self.error(ParseErrorKind::UnexpectedChar(c)),
            None => self.error(ParseErrorKind::UnexpectedEnd),
        }
    }

    /// Length of the name at the cursor, or 0. A `:` is part of the name only
    /// when it separates a prefix, never as the first char of `::`.
    fn name_len(&self) -> usize {
        let rest = self.rest();
        let mut chars = rest.char_indices().peekable();
        match chars.next() {
            Some((_, c)) if is_name_start(c) => {}
            _ => return 0,
        }
        let mut end = rest.len();
        while let Some((i, c)) = chars.next() {
            if is_name_char(c) {
                continue;
            }
            if c == ':' && chars.peek().is_some_and(|&(_, next)| is_name_start(next)) {
                continue;
            }
            end = i;
            break;
        }
        end
    }

    fn parse_name(&mut self) -> Option<&'a str> {
        let len = self.name_len();
        if len == 0 {
            return None;
        }
        let name = &self.rest()[..len];
        self.pos += len;
        Some(name)
    }

    /// The first non-whitespace char after the name at the cursor.
    fn char_after_name(&self) -> Option<char> {
        self.rest()[self.name_len()..].trim_start().chars().next()
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_and()?;
        while self.eat_keyword("or") {
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_equality()?;
        while self.eat_keyword("and") {
            let right = self.parse_equality()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_relational()?;
        loop {
            self.skip_whitespace();
            let op = if self.eat_str("!=") {
                CompareOp::NotEq
            } else if self.eat('=') {
                CompareOp::Eq
            } else {
                break;
            };
            let right = self.parse_relational()?;
            left = Expr::Compare {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_relational(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_additive()?;
        loop {
            self.skip_whitespace();
            let op = if self.eat_str("<=") {
                CompareOp::LtEq
            } else if self.eat('<') {
                CompareOp::Lt
            } else if self.eat_str(">=") {
                CompareOp::GtEq
            } else if self.eat('>') {
                CompareOp::Gt
            } else {
                break;
            };
            let right = self.parse_additive()?;
            left = Expr::Compare {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            self.skip_whitespace();
            let op = if self.eat('+') {
                ArithmeticOp::Add
            } else if self.eat('-') {
                ArithmeticOp::Subtract
            } else {
                break;
            };
            let right = self.parse_multiplicative()?;
            left = Expr::Arithmetic {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;
        loop {
            self.skip_whitespace();
            let op = if self.eat('*') {
                ArithmeticOp::Multiply
            } else if self.eat_keyword("div") {
                ArithmeticOp::Divide
            } else if self.eat_keyword("mod") {
                ArithmeticOp::Modulo
            } else {
                break;
            };
            let right = self.parse_unary()?;
            left = Expr::Arithmetic {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        self.skip_whitespace();
        if self.eat('-') {
            let inner = self.parse_unary()?;
            return Ok(Expr::Negate(Box::new(inner)));
        }
        self.parse_union()
    }

    fn parse_union(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_path_expr()?;
        loop {
            self.skip_whitespace();
            if !self.eat('|') {
                break;
            }
            let right = self.parse_path_expr()?;
            left = Expr::Union(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_path_expr(&mut self) -> Result<Expr, ParseError> {
        self.skip_whitespace();
        let starts_filter = match self.peek() {
            Some('/') => return self.parse_location_path().map(Expr::Path),
            Some('(' | '"' | '\'') => true,
            Some(c) if c.is_ascii_digit() => true,
            Some('.') => self.peek_nth(1).is_some_and(|c| c.is_ascii_digit()),
            Some(c) if is_name_start(c) => {
                let name = &self.rest()[..self.name_len()];
                self.char_after_name() == Some('(') && !NodeTest::is_node_type(name)
            }
            _ => false,
        };

        if !starts_filter {
            return self.parse_location_path().map(Expr::Path);
        }

        let primary = self.parse_primary()?;
        let predicates = self.parse_predicates()?;
        let mut steps = Vec::new();
        self.skip_whitespace();
        if self.rest().starts_with('/') {
            self.parse_step_separator(&mut steps);
            self.parse_relative_steps(&mut steps)?;
        }

        if predicates.is_empty() && steps.is_empty() {
            Ok(primary)
        } else {
            Ok(Expr::Filter {
                primary: Box::new(primary),
                predicates,
                steps,
            })
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        self.skip_whitespace();
        match self.peek() {
            Some('(') => {
                self.advance();
                let inner = self.parse_or()?;
                self.expect(')')?;
                Ok(inner)
            }
            Some('"' | '\'') => self.parse_literal().map(Expr::Literal),
            Some(c) if c.is_ascii_digit() || c == '.' => self.parse_number(),
            _ => self.parse_call(),
        }
    }

    fn parse_literal(&mut self) -> Result<String, ParseError> {
        let start = self.pos;
        let quote = self.advance().ok_or_else(|| self.unexpected())?;
        match self.rest().find(quote) {
            Some(len) => {
                let value = self.rest()[..len].to_string();
                self.pos += len + quote.len_utf8();
                Ok(value)
            }
            None => Err(ParseError {
                kind: ParseErrorKind::UnclosedString,
                position: start,
            }),
        }
    }

    fn parse_number(&mut self) -> Result<Expr, ParseError> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
        if self.eat('.') {
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }
        self.input[start..self.pos]
            .parse::<f64>()
            .map(Expr::Number)
            .map_err(|_| ParseError {
                kind: ParseErrorKind::InvalidNumber,
                position: start,
            })
    }

    fn parse_call(&mut self) -> Result<Expr, ParseError> {
        let start = self.pos;
        let name = self.parse_name().ok_or_else(|| self.unexpected())?;
        let function = Function::from_name(name).ok_or(ParseError {
            kind: ParseErrorKind::UnknownFunction(name.to_string()),
            position: start,
        })?;

        self.expect('(')?;
        let mut args = Vec::new();
        self.skip_whitespace();
        if !self.eat(')') {
            loop {
                args.push(self.parse_or()?);
                self.skip_whitespace();
                if self.eat(',') {
                    continue;
                }
                self.expect(')')?;
                break;
            }
        }

        let (min, max) = function.arity();
        if args.len() < min || max.is_some_and(|max| args.len() > max) {
            let expected = match max {
                Some(max) if max == min => min.to_string(),
                Some(max) => format!("{} to {}", min, max),
                None => format!("at least {}", min),
            };
            return Err(ParseError {
                kind: ParseErrorKind::Arity {
                    function: function.name(),
                    expected,
                    found: args.len(),
                },
                position: start,
            });
        }

        Ok(Expr::Call { function, args })
    }

    fn parse_predicates(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut predicates = Vec::new();
        loop {
            self.skip_whitespace();
            if !self.eat('[') {
                break;
            }
            predicates.push(self.parse_or()?);
            self.expect(']')?;
        }
        Ok(predicates)
    }

    // ------------------------------------------------------------------
    // Location paths
    // ------------------------------------------------------------------

    fn parse_location_path(&mut self) -> Result<LocationPath, ParseError> {
        self.skip_whitespace();
        let mut steps = Vec::new();

        if !self.rest().starts_with('/') {
            self.parse_relative_steps(&mut steps)?;
            return Ok(LocationPath {
                absolute: false,
                steps,
            });
        }

        let descendant = self.parse_step_separator(&mut steps);
        self.skip_whitespace();
        if descendant || self.at_step_start() {
            self.parse_relative_steps(&mut steps)?;
        }
        Ok(LocationPath {
            absolute: true,
            steps,
        })
    }

    /// Consume `/` or `//`, pushing the implicit step for `//`. Returns true
    /// for `//`.
    fn parse_step_separator(&mut self, steps: &mut Vec<Step>) -> bool {
        if self.eat_str("//") {
            steps.push(Step::new(Axis::DescendantOrSelf, NodeTest::Node));
            true
        } else {
            self.eat('/');
            false
        }
    }

    fn at_step_start(&self) -> bool {
        matches!(self.peek(), Some(c) if c == '.' || c == '@' || c == '*' || is_name_start(c))
    }

    fn parse_relative_steps(&mut self, steps: &mut Vec<Step>) -> Result<(), ParseError> {
        steps.push(self.parse_step()?);
        loop {
            self.skip_whitespace();
            if !self.rest().starts_with('/') {
                break;
            }
            self.parse_step_separator(steps);
            steps.push(self.parse_step()?);
        }
        Ok(())
    }

    fn parse_step(&mut self) -> Result<Step, ParseError> {
        self.skip_whitespace();
        if self.eat_str("..") {
            return Ok(Step::new(Axis::Parent, NodeTest::Node));
        }
        if self.eat('.') {
            return Ok(Step::new(Axis::SelfAxis, NodeTest::Node));
        }

        let axis = if self.eat('@') {
            Axis::Attribute
        } else if self.name_len() > 0 && self.rest()[self.name_len()..].trim_start().starts_with("::")
        {
            let start = self.pos;
            let name = self.parse_name().unwrap_or_default();
            let axis = Axis::from_name(name).ok_or(ParseError {
                kind: ParseErrorKind::UnknownAxis(name.to_string()),
                position: start,
            })?;
            self.skip_whitespace();
            self.eat_str("::");
            axis
        } else {
            Axis::Child
        };

        self.skip_whitespace();
        let test = self.parse_node_test()?;
        let predicates = self.parse_predicates()?;
        Ok(Step {
            axis,
            test,
            predicates,
        })
    }

    fn parse_node_test(&mut self) -> Result<NodeTest, ParseError> {
        if self.eat('*') {
            return Ok(NodeTest::Any);
        }
        let start = self.pos;
        let Some(name) = self.parse_name() else {
            return Err(match self.peek() {
                Some(_) => self.error(ParseErrorKind::ExpectedStep),
                None => self.error(ParseErrorKind::UnexpectedEnd),
            });
        };

        self.skip_whitespace();
        if !NodeTest::is_node_type(name) || !self.rest().starts_with('(') {
            // Rewind over whitespace that belongs to whatever follows.
            self.pos = start + name.len();
            return Ok(NodeTest::Name(name.to_string()));
        }

        self.expect('(')?;
        let test = match name {
            "text" => NodeTest::Text,
            "node" => NodeTest::Node,
            "comment" => NodeTest::Comment,
            _ => {
                self.skip_whitespace();
                let target = match self.peek() {
                    Some('"' | '\'') => Some(self.parse_literal()?),
                    _ => None,
                };
                NodeTest::ProcessingInstruction(target)
            }
        };
        self.expect(')')?;
        Ok(test)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(axis: Axis, test: NodeTest) -> Step {
        Step::new(axis, test)
    }

    fn name(n: &str) -> NodeTest {
        NodeTest::Name(n.to_string())
    }

    fn path(absolute: bool, steps: Vec<Step>) -> Expr {
        Expr::Path(LocationPath { absolute, steps })
    }

    #[test]
    fn test_relative_path() {
        assert_eq!(
            parse("Root/Item").unwrap(),
            path(
                false,
                vec![step(Axis::Child, name("Root")), step(Axis::Child, name("Item"))]
            )
        );
    }

    #[test]
    fn test_root_only() {
        assert_eq!(parse("/").unwrap(), path(true, vec![]));
    }

    #[test]
    fn test_double_slash() {
        assert_eq!(
            parse("//Item").unwrap(),
            path(
                true,
                vec![
                    step(Axis::DescendantOrSelf, NodeTest::Node),
                    step(Axis::Child, name("Item"))
                ]
            )
        );
    }

    #[test]
    fn test_abbreviations() {
        assert_eq!(
            parse("../@v").unwrap(),
            path(
                false,
                vec![step(Axis::Parent, NodeTest::Node), step(Axis::Attribute, name("v"))]
            )
        );
        assert_eq!(parse(".").unwrap(), path(false, vec![step(Axis::SelfAxis, NodeTest::Node)]));
    }

    #[test]
    fn test_explicit_axes() {
        let parsed = parse("following-sibling::Item/ancestor-or-self::*").unwrap();
        assert_eq!(
            parsed,
            path(
                false,
                vec![
                    step(Axis::FollowingSibling, name("Item")),
                    step(Axis::AncestorOrSelf, NodeTest::Any)
                ]
            )
        );
    }

    #[test]
    fn test_node_type_tests() {
        assert_eq!(parse("text()").unwrap(), path(false, vec![step(Axis::Child, NodeTest::Text)]));
        assert_eq!(
            parse("processing-instruction('go')").unwrap(),
            path(
                false,
                vec![step(
                    Axis::Child,
                    NodeTest::ProcessingInstruction(Some("go".to_string()))
                )]
            )
        );
    }

    #[test]
    fn test_element_named_like_node_type() {
        assert_eq!(parse("text").unwrap(), path(false, vec![step(Axis::Child, name("text"))]));
    }

    #[test]
    fn test_predicate_with_comparison() {
        let parsed = parse("Item[@Id = 'a' and @v != \"2\"]").unwrap();
        let Expr::Path(lp) = parsed else {
            panic!("expected a path");
        };
        assert_eq!(lp.steps[0].predicates.len(), 1);
        assert!(matches!(lp.steps[0].predicates[0], Expr::And(_, _)));
    }

    #[test]
    fn test_keyword_prefix_is_a_name() {
        // `order` must not be read as `or` + `der`.
        let parsed = parse("Item[order]").unwrap();
        let Expr::Path(lp) = parsed else {
            panic!("expected a path");
        };
        assert_eq!(
            lp.steps[0].predicates[0],
            path(false, vec![step(Axis::Child, name("order"))])
        );
    }

    #[test]
    fn test_function_call_and_filter() {
        assert!(matches!(
            parse("count(Item)").unwrap(),
            Expr::Call {
                function: Function::Count,
                ..
            }
        ));
        assert!(matches!(
            parse("(A | B)[1]/C").unwrap(),
            Expr::Filter { .. }
        ));
    }

    #[test]
    fn test_numbers_and_negation() {
        assert_eq!(parse("2.5").unwrap(), Expr::Number(2.5));
        assert_eq!(parse(".5").unwrap(), Expr::Number(0.5));
        assert_eq!(
            parse("-1").unwrap(),
            Expr::Negate(Box::new(Expr::Number(1.0)))
        );
    }

    #[test]
    fn test_arithmetic_precedence() {
        let number = |n: f64| Box::new(Expr::Number(n));
        assert_eq!(
            parse("1 + 2 * 3").unwrap(),
            Expr::Arithmetic {
                op: ArithmeticOp::Add,
                left: number(1.0),
                right: Box::new(Expr::Arithmetic {
                    op: ArithmeticOp::Multiply,
                    left: number(2.0),
                    right: number(3.0),
                }),
            }
        );
        assert!(matches!(
            parse("6 div 2 mod 2").unwrap(),
            Expr::Arithmetic {
                op: ArithmeticOp::Modulo,
                ..
            }
        ));
    }

    #[test]
    fn test_operator_words_are_names_in_operand_position() {
        assert_eq!(
            parse("div/mod").unwrap(),
            path(
                false,
                vec![step(Axis::Child, name("div")), step(Axis::Child, name("mod"))]
            )
        );
        let parsed = parse("* * 2").unwrap();
        let Expr::Arithmetic { op, left, .. } = parsed else {
            panic!("expected arithmetic");
        };
        assert_eq!(op, ArithmeticOp::Multiply);
        assert_eq!(*left, path(false, vec![step(Axis::Child, NodeTest::Any)]));
    }

    #[test]
    fn test_minus_after_call_subtracts() {
        let parsed = parse("R/x[last()-1]").unwrap();
        let Expr::Path(lp) = parsed else {
            panic!("expected a path");
        };
        assert!(matches!(
            lp.steps[1].predicates[0],
            Expr::Arithmetic {
                op: ArithmeticOp::Subtract,
                ..
            }
        ));
        // Inside a name, `-` is a name character.
        assert_eq!(
            parse("a-1").unwrap(),
            path(false, vec![step(Axis::Child, name("a-1"))])
        );
    }

    #[test]
    fn test_document_order_axes() {
        assert_eq!(
            parse("following::a/preceding::*").unwrap(),
            path(
                false,
                vec![
                    step(Axis::Following, name("a")),
                    step(Axis::Preceding, NodeTest::Any)
                ]
            )
        );
    }

    #[test]
    fn test_prefixed_name() {
        assert_eq!(
            parse("ns:Item").unwrap(),
            path(false, vec![step(Axis::Child, name("ns:Item"))])
        );
    }

    #[test]
    fn test_errors_carry_position() {
        assert_eq!(
            parse("Item[").unwrap_err(),
            ParseError {
                kind: ParseErrorKind::UnexpectedEnd,
                position: 5
            }
        );
        assert_eq!(parse("").unwrap_err().kind, ParseErrorKind::Empty);
        assert_eq!(
            parse("Item]").unwrap_err(),
            ParseError {
                kind: ParseErrorKind::UnexpectedChar(']'),
                position: 4
            }
        );
        assert_eq!(
            parse("'open").unwrap_err().kind,
            ParseErrorKind::UnclosedString
        );
    }

    #[test]
    fn test_unknown_function_and_axis() {
        assert_eq!(
            parse("frobnicate(1)").unwrap_err().kind,
            ParseErrorKind::UnknownFunction("frobnicate".to_string())
        );
        assert_eq!(
            parse("sideways::Item").unwrap_err().kind,
            ParseErrorKind::UnknownAxis("sideways".to_string())
        );
    }

    #[test]
    fn test_arity_errors() {
        assert!(matches!(
            parse("count()").unwrap_err().kind,
            ParseErrorKind::Arity { found: 0, .. }
        ));
        assert!(matches!(
            parse("concat('a')").unwrap_err().kind,
            ParseErrorKind::Arity { found: 1, .. }
        ));
        assert!(parse("concat('a', 'b', 'c')").is_ok());
    }
}

//! Recursive-descent parser for assertion expressions.
//!
//! ```text
//! expr           := withinExpr | comparisonExpr
//! withinExpr     := value WS "within" WS value WS "of" WS value WS? tolerance?
//! comparisonExpr := value WS comparator WS value WS? tolerance?
//! comparator     := "<=" | "<" | "=" | ">=" | ">"
//! tolerance      := ("+/-" | "±") WS? value
//! value          := percentage | timeValue | memoryValue | propertyPath
//! ```
//!
//! Keywords and unit words are case-insensitive. Leftover input is an error.

use crate::ast::{
    Assertion, Comparator, Comparison, MemoryValue, PercentageValue, PropertyAccess, TimeValue,
    Value, WithinRangeOf,
};
use crate::units::{MemoryUnit, TimeUnit};
use benchgate_error::ParseError;

const COMPARATORS: [(&str, Comparator); 5] = [
    ("<=", Comparator::LessThanOrEqual),
    ("<", Comparator::LessThan),
    ("=", Comparator::Equal),
    (">=", Comparator::GreaterThanOrEqual),
    (">", Comparator::GreaterThan),
];

const TOLERANCE_MARKERS: [&str; 2] = ["+/-", "±"];

const EXPECTED_OPERATOR: &[&str] = &["`within`", "`<=`", "`<`", "`=`", "`>=`", "`>`"];
const EXPECTED_VALUE: &[&str] = &["number", "property path"];
const EXPECTED_UNIT: &[&str] = &["`%`", "time unit", "memory unit"];

/// Parse one assertion expression.
pub fn parse(expression: &str) -> Result<Assertion, ParseError> {
    Parser::new(expression).assertion()
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        self.src.get(self.pos..).unwrap_or("")
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn error(&self, expected: &[&'static str]) -> ParseError {
        self.error_at(self.pos, expected)
    }

    fn error_at(&self, pos: usize, expected: &[&'static str]) -> ParseError {
        ParseError::new(self.src, pos, expected.to_vec())
    }

    fn eat_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(&pred) {
            self.bump();
        }
        &self.src[start..self.pos]
    }

    /// `WS?`
    fn skip_ws(&mut self) -> bool {
        !self.eat_while(char::is_whitespace).is_empty()
    }

    /// `WS`
    fn require_ws(&mut self, next: &[&'static str]) -> Result<(), ParseError> {
        if self.skip_ws() {
            return Ok(());
        }
        if self.rest().is_empty() {
            // Nothing left: report what should have followed the whitespace.
            return Err(self.error(next));
        }
        Err(self.error(&["whitespace"]))
    }

    fn eat(&mut self, literal: &str) -> bool {
        if self.rest().starts_with(literal) {
            self.pos += literal.len();
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        let matched = self
            .rest()
            .get(..keyword.len())
            .is_some_and(|s| s.eq_ignore_ascii_case(keyword));
        if matched {
            self.pos += keyword.len();
        }
        matched
    }

    fn assertion(mut self) -> Result<Assertion, ParseError> {
        let first = self.value()?;
        self.require_ws(EXPECTED_OPERATOR)?;

        let assertion = if self.eat_keyword("within") {
            self.require_ws(EXPECTED_VALUE)?;
            let range = self.value()?;
            self.require_ws(&["`of`"])?;
            if !self.eat_keyword("of") {
                return Err(self.error(&["`of`"]));
            }
            self.require_ws(EXPECTED_VALUE)?;
            let anchor = self.value()?;
            let tolerance = self.trailing_tolerance()?;
            Assertion::WithinRangeOf(WithinRangeOf {
                subject: first,
                range,
                anchor,
                tolerance,
            })
        } else {
            let operator = self
                .comparator()
                .ok_or_else(|| self.error(EXPECTED_OPERATOR))?;
            self.require_ws(EXPECTED_VALUE)?;
            let right = self.value()?;
            let tolerance = self.trailing_tolerance()?;
            Assertion::Comparison(Comparison {
                left: first,
                operator,
                right,
                tolerance,
            })
        };

        if !self.rest().is_empty() {
            return Err(self.error(&["end of input"]));
        }
        Ok(assertion)
    }

    /// `WS? tolerance?`
    fn trailing_tolerance(&mut self) -> Result<Option<Value>, ParseError> {
        self.skip_ws();
        if self.rest().is_empty() {
            return Ok(None);
        }
        if !TOLERANCE_MARKERS.iter().any(|m| self.eat(m)) {
            return Err(self.error(&["`+/-`", "`±`", "end of input"]));
        }
        self.skip_ws();
        self.value().map(Some)
    }

    fn comparator(&mut self) -> Option<Comparator> {
        COMPARATORS
            .iter()
            .find(|(symbol, _)| self.eat(symbol))
            .map(|(_, op)| *op)
    }

    /// percentage -> time -> memory -> property path
    fn value(&mut self) -> Result<Value, ParseError> {
        match self.peek() {
            Some(c) if c.is_ascii_digit() || c == '-' => self.quantity(),
            Some(c) if is_ident_start(c) => self.property_access().map(Value::PropertyAccess),
            _ => Err(self.error(EXPECTED_VALUE)),
        }
    }

    fn quantity(&mut self) -> Result<Value, ParseError> {
        let magnitude = self.number()?;
        self.skip_ws();

        if self.eat("%") {
            return Ok(Value::Percentage(PercentageValue { magnitude }));
        }

        let word_start = self.pos;
        let word = self.eat_while(|c| c.is_ascii_alphabetic());
        if let Some(unit) = TimeUnit::from_word(word) {
            return Ok(Value::Time(TimeValue { magnitude, unit }));
        }
        if let Some(unit) = MemoryUnit::from_word(word) {
            return Ok(Value::Memory(MemoryValue { magnitude, unit }));
        }
        Err(self.error_at(word_start, EXPECTED_UNIT))
    }

    /// `-?digits(.digits)?([eE][+-]?digits)?`
    fn number(&mut self) -> Result<f64, ParseError> {
        let start = self.pos;
        self.eat("-");
        if self.eat_while(|c| c.is_ascii_digit()).is_empty() {
            return Err(self.error_at(start, &["number"]));
        }

        let mut ahead = self.rest().chars();
        if ahead.next() == Some('.') && ahead.next().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
            self.eat_while(|c| c.is_ascii_digit());
        }

        let mut ahead = self.rest().chars();
        if matches!(ahead.next(), Some('e' | 'E')) {
            let digit_follows = match ahead.next() {
                Some('+' | '-') => ahead.next().is_some_and(|c| c.is_ascii_digit()),
                Some(c) => c.is_ascii_digit(),
                None => false,
            };
            if digit_follows {
                self.bump();
                self.eat("+");
                self.eat("-");
                self.eat_while(|c| c.is_ascii_digit());
            }
        }

        match self.src[start..self.pos].parse::<f64>() {
            Ok(n) if n.is_finite() => Ok(n),
            _ => Err(self.error_at(start, &["finite number"])),
        }
    }

    /// `identifier ("." identifier)+`
    fn property_access(&mut self) -> Result<PropertyAccess, ParseError> {
        let mut segments = vec![self.identifier()?];
        while self.eat(".") {
            segments.push(self.identifier()?);
        }
        if segments.len() < 2 {
            return Err(self.error(&["`.`"]));
        }
        Ok(PropertyAccess { segments })
    }

    fn identifier(&mut self) -> Result<String, ParseError> {
        if !self.peek().is_some_and(is_ident_start) {
            return Err(self.error(&["identifier"]));
        }
        Ok(self
            .eat_while(|c| c.is_ascii_alphanumeric() || c == '_')
            .to_string())
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

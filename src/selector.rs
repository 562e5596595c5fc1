use std::path::Path;

use crate::{
    data_table::{FeatureTable, PerformanceTable},
    datastructures::*,
    error::{EvaluationError, Result},
};

mod autofolio;
pub use autofolio::AutoFolio;

/// Prefix of the line a selector prints its schedule on.
pub const SCHEDULE_PREFIX: &str = "Selected Schedule [(algorithm, budget)]: ";

/// Builds a selector artifact from performance and feature data.
pub trait SelectorBuilder {
    /// Train a selector and store it at `output`.
    ///
    /// Returns whether construction reported success; callers additionally
    /// check that `output` exists.
    fn construct_selector(
        &mut self,
        performance: &PerformanceTable,
        features: &FeatureTable,
        output: &Path,
        config: &EvaluationConfig,
    ) -> Result<bool>;
}

/// Queries a trained selector for the schedule of one instance.
pub trait SchedulePredictor {
    /// Ordered schedule the selector at `selector` proposes for an instance
    /// with `feature_vector`.
    fn predict_schedule(
        &mut self,
        selector: &Path,
        feature_vector: &[f64],
    ) -> Result<Schedule>;
}

/// A collaborator that can both build and query selectors.
pub trait SelectorOracle: SelectorBuilder + SchedulePredictor {}

impl<T: SelectorBuilder + SchedulePredictor> SelectorOracle for T {}

/// Extract the schedule from a selector's standard output.
///
/// Empty output means the tool failed; output without a schedule line or
/// with an unreadable schedule is a parse error.
pub fn parse_schedule_response(output: &str) -> Result<Schedule> {
    let mut lines = output.lines().map(str::trim).filter(|l| !l.is_empty());
    let Some(first) = lines.clone().next() else {
        return Err(EvaluationError::external(
            "selector",
            "schedule prediction produced no output",
        ));
    };
    let prefix = SCHEDULE_PREFIX.trim_end();
    let line = lines.find(|l| l.starts_with(prefix)).ok_or_else(|| {
        EvaluationError::ScheduleParse(format!(
            "expected a line starting with '{prefix}', got '{first}'"
        ))
    })?;
    parse_schedule_literal(&line[prefix.len()..])
}

/// Parse a literal list of `(solver, budget)` pairs, e.g.
/// `[('minisat', 30.0), ("lingeling", 270)]`.
pub fn parse_schedule_literal(literal: &str) -> Result<Schedule> {
    let mut parser = LiteralParser::new(literal);
    let schedule = parser.schedule()?;
    parser.skip_whitespace();
    match parser.peek() {
        None => Ok(schedule),
        Some(c) => Err(parser.error(&format!("unexpected '{c}' after the schedule"))),
    }
}

struct LiteralParser<'a> {
    source: &'a str,
    chars: Vec<char>,
    position: usize,
}

impl<'a> LiteralParser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.chars().collect(),
            position: 0,
        }
    }

    fn error(&self, message: &str) -> EvaluationError {
        EvaluationError::ScheduleParse(format!(
            "{message} at character {} of '{}'",
            self.position, self.source
        ))
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.position).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.position += 1;
        }
        c
    }

    fn skip_whitespace(&mut self) {
        while self.peek().map_or(false, char::is_whitespace) {
            self.position += 1;
        }
    }

    fn expect(&mut self, expected: char) -> Result<()> {
        self.skip_whitespace();
        match self.bump() {
            Some(c) if c == expected => Ok(()),
            Some(c) => Err(self.error(&format!("expected '{expected}', found '{c}'"))),
            None => Err(self.error(&format!("expected '{expected}', found end of input"))),
        }
    }

    /// Consume `c` if it is the next non-whitespace character.
    fn accept(&mut self, c: char) -> bool {
        self.skip_whitespace();
        if self.peek() == Some(c) {
            self.position += 1;
            true
        } else {
            false
        }
    }

    fn schedule(&mut self) -> Result<Schedule> {
        self.expect('[')?;
        let mut schedule = Schedule::new();
        loop {
            if self.accept(']') {
                return Ok(schedule);
            }
            schedule.push(self.step()?);
            if !self.accept(',') {
                self.expect(']')?;
                return Ok(schedule);
            }
        }
    }

    fn step(&mut self) -> Result<ScheduleStep> {
        self.skip_whitespace();
        let close = match self.bump() {
            Some('(') => ')',
            Some('[') => ']',
            _ => return Err(self.error("expected a (solver, budget) pair")),
        };
        let solver = self.string()?;
        self.expect(',')?;
        let budget = self.number()?;
        self.accept(',');
        self.expect(close)?;
        if !budget.is_finite() || budget < 0.0 {
            return Err(self.error(&format!(
                "budget {budget} of solver '{solver}' is not a non-negative number"
            )));
        }
        Ok(ScheduleStep::new(solver, budget))
    }

    fn string(&mut self) -> Result<String> {
        self.skip_whitespace();
        let quote = match self.bump() {
            Some(q @ ('\'' | '"')) => q,
            _ => return Err(self.error("expected a quoted solver name")),
        };
        let mut value = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated string")),
                Some(c) if c == quote => return Ok(value),
                Some('\\') => match self.bump() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some(c) => value.push(c),
                    None => return Err(self.error("unterminated escape")),
                },
                Some(c) => value.push(c),
            }
        }
    }

    fn number(&mut self) -> Result<f64> {
        self.skip_whitespace();
        let start = self.position;
        while self
            .peek()
            .map_or(false, |c| c.is_ascii_alphanumeric() || "+-._".contains(c))
        {
            self.position += 1;
        }
        let token: String = self.chars[start..self.position]
            .iter()
            .filter(|&&c| c != '_')
            .collect();
        token
            .parse::<f64>()
            .map_err(|_| self.error(&format!("'{token}' is not a number")))
    }
}

//! The compiled-equation type that ties parser, evaluator, and the unit
//! formatter together.

use std::fmt::{self, Display, Formatter};

use crate::eval::{self, Vars};
use crate::parser;
use crate::result::{EqError, EqResult, ErrorKind};
use crate::tokens::{Token, Valop};
use crate::units::{self, ParsedUnit};
use crate::util::format_lg;

/// Result of one evaluation: the numeric value together with the unit
/// text chosen for it (empty for a dimensionless answer).
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub value: f64,
    pub unit: String,
}

/// A parsed equation, ready to be evaluated repeatedly against varying
/// variable values.
///
/// Parsing is paid once: the source is compiled into a flat RPN token
/// array and evaluation is a tight loop over it. A failed re-parse
/// leaves the previously compiled state untouched.
///
/// ```rust
/// # use std::error::Error;
/// # fn main() -> Result<(), Box<dyn Error>> {
/// use dimex::Equation;
///
/// let mut eq = Equation::new();
/// eq.parse("x + sin(pi * y)", &["x", "y"])?;
/// let ans = eq.evaluate(&[5.0, 0.25], false)?;
/// assert!((ans.value - 5.7071067811865475).abs() < 1e-12);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Equation {
    src: String,
    var_names: Vec<String>,
    tokens: Vec<Token>,
    target: Option<ParsedUnit>,
    last_error: Option<EqError>,
}

impl Equation {
    /// An empty equation; evaluating it reports [`ErrorKind::EvalNoEquation`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a trivial equation holding a single value. Its source
    /// text is the `%lg`-style rendering of the number.
    pub fn from_value(value: f64) -> Self {
        Equation {
            src: format_lg(value),
            tokens: vec![Token::new(Valop::Val(value), 0)],
            ..Default::default()
        }
    }

    /// Parses `src` into this instance. Identifiers resolve against
    /// `var_names` in order, and win over built-in names. On error the
    /// previous compiled state stays in place.
    pub fn parse(&mut self, src: &str, var_names: &[&str]) -> EqResult<()> {
        match parser::parse(src, var_names) {
            Ok(parsed) => {
                self.src = src.to_string();
                self.var_names = var_names.iter().map(|s| s.to_string()).collect();
                self.tokens = parsed.tokens;
                self.target = parsed.target;
                self.last_error = None;
                Ok(())
            }
            Err(e) => {
                self.last_error = Some(e);
                Err(e)
            }
        }
    }

    /// Evaluates against the given variable values; the n-th value
    /// belongs to the n-th parsed variable name. Assignments in the
    /// equation are rejected. With `allow_derived`, the answer's unit
    /// may be reported as a derived unit such as `Ohm` instead of base
    /// units.
    pub fn evaluate(&mut self, vars: &[f64], allow_derived: bool) -> EqResult<Answer> {
        self.run(Vars::Ro(vars), allow_derived)
    }

    /// Like [`evaluate`](Equation::evaluate), but assignments write
    /// through into `vars`.
    pub fn evaluate_assign(&mut self, vars: &mut [f64], allow_derived: bool) -> EqResult<Answer> {
        self.run(Vars::Rw(vars), allow_derived)
    }

    /// Evaluates and returns the bare value, or `0.0` on any error. The
    /// error stays retrievable through [`last_error`](Equation::last_error).
    pub fn answer(&mut self, vars: &[f64]) -> f64 {
        self.evaluate(vars, false).map(|a| a.value).unwrap_or(0.0)
    }

    /// [`answer`](Equation::answer) with assignment enabled.
    pub fn answer_assign(&mut self, vars: &mut [f64]) -> f64 {
        self.evaluate_assign(vars, false)
            .map(|a| a.value)
            .unwrap_or(0.0)
    }

    /// Parses and evaluates an expression that must not reference any
    /// variable.
    pub fn parse_constant(src: &str) -> EqResult<f64> {
        let mut eq = Equation::new();
        eq.parse(src, &[])?;
        eq.evaluate(&[], false).map(|a| a.value)
    }

    fn run(&mut self, mut vars: Vars, allow_derived: bool) -> EqResult<Answer> {
        let result = self.run_inner(&mut vars, allow_derived);
        self.last_error = result.as_ref().err().copied();
        result
    }

    fn run_inner(&self, vars: &mut Vars, allow_derived: bool) -> EqResult<Answer> {
        if self.tokens.is_empty() {
            return Err(EqError::new(ErrorKind::EvalNoEquation, 0));
        }
        let raw = eval::run(&self.tokens, vars)?;
        match &self.target {
            Some(t) => {
                if raw.dim != t.dim {
                    return Err(EqError::new(ErrorKind::UnitMismatch, self.src.len()));
                }
                Ok(Answer {
                    value: (raw.value - t.offset) / t.scale,
                    unit: t.text.clone(),
                })
            }
            None => Ok(Answer {
                value: raw.value,
                unit: units::unit_string(&raw.dim, allow_derived),
            }),
        }
    }

    /// True if any variable is referenced; parks the first reference's
    /// source offset in the error state.
    pub fn contains_any_variable(&mut self) -> bool {
        if self.tokens.is_empty() {
            self.last_error = Some(EqError::new(ErrorKind::NoEquation, 0));
            return false;
        }
        match self
            .tokens
            .iter()
            .find(|t| matches!(t.valop, Valop::Ref(_)))
        {
            Some(t) => {
                self.last_error = Some(EqError::new(ErrorKind::ContainsVar, t.pos));
                true
            }
            None => {
                self.last_error = None;
                false
            }
        }
    }

    /// True if the variable with the given index is referenced.
    pub fn contains_variable(&mut self, var_idx: usize) -> bool {
        let hit = self
            .tokens
            .iter()
            .find(|t| matches!(t.valop, Valop::Ref(r) if r == var_idx));
        match hit {
            Some(t) => {
                self.last_error = Some(EqError::new(ErrorKind::ContainsVar, t.pos));
                true
            }
            None => {
                self.last_error = None;
                false
            }
        }
    }

    /// True if the equation applies any unit.
    pub fn contains_units(&self) -> bool {
        self.tokens
            .iter()
            .any(|t| matches!(t.valop, Valop::Unit(_)))
    }

    pub fn source(&self) -> &str {
        &self.src
    }

    pub fn var_names(&self) -> &[String] {
        &self.var_names
    }

    /// The compiled token array, mainly for inspection in tests.
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn last_error(&self) -> Option<EqError> {
        self.last_error
    }

    /// Renders the last error as a one-line message: a short prefix, a
    /// window of up to 16 source characters around the offset with a
    /// `<--` marker, and the dictionary text of the code.
    ///
    /// Parse failures do not install their source, so it must be passed
    /// back in via `failed_src`; evaluation errors quote the stored
    /// source.
    pub fn error_message(&self, failed_src: Option<&str>) -> String {
        let mut msg = String::from("Equation error: ");
        let e = match self.last_error {
            Some(e) => e,
            None => {
                msg.push_str("No error");
                return msg;
            }
        };
        let src = if e.kind.is_eval() {
            Some(self.src.as_str())
        } else {
            failed_src
        };
        let quotable = !matches!(e.kind, ErrorKind::AllocFail | ErrorKind::NoEquation);
        if let (Some(src), true) = (src, quotable) {
            let from = e.pos.saturating_sub(16);
            let to = match e.kind {
                // show the whole unknown identifier
                ErrorKind::UnknownIdent => {
                    let tail = &src[e.pos.min(src.len())..];
                    let ident = tail
                        .bytes()
                        .take_while(|b| {
                            b.is_ascii_alphanumeric() || matches!(b, b'_' | b'\'' | b'"')
                        })
                        .count();
                    e.pos + ident
                }
                k if k.is_eval() => e.pos,
                _ => e.pos + 1,
            }
            .min(src.len());
            if e.pos > 16 {
                msg.push_str("...");
            }
            msg.push_str(&src[from.min(to)..to]);
            msg.push_str(" <-- ");
        }
        msg.push_str(e.kind.message());
        msg
    }
}

/// Displays the source string.
impl Display for Equation {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.src)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_failure_keeps_previous_state() {
        let mut eq = Equation::new();
        eq.parse("1 + 2", &[]).unwrap();
        let before = eq.tokens().to_vec();
        assert!(eq.parse("1 +", &[]).is_err());
        assert_eq!(eq.tokens(), &before[..]);
        assert_eq!(eq.source(), "1 + 2");
        assert_eq!(eq.last_error().unwrap().kind, ErrorKind::NumberExpected);
        // a successful re-parse clears the error
        eq.parse("4", &[]).unwrap();
        assert_eq!(eq.last_error(), None);
    }

    #[test]
    fn test_from_value_round_trip() {
        for v in [0.0, 1.5, -2.25, 3.25e-5, 1e21, 0.125] {
            let mut eq = Equation::from_value(v);
            assert_eq!(eq.evaluate(&[], false).unwrap().value, v);
        }
        assert_eq!(Equation::from_value(1.5).source(), "1.5");
    }

    #[test]
    fn test_from_value_source_reparses() {
        let eq = Equation::from_value(-0.375);
        let reparsed = Equation::parse_constant(eq.source()).unwrap();
        assert_eq!(reparsed, -0.375);
    }

    #[test]
    fn test_answer_swallows_errors() {
        let mut eq = Equation::new();
        eq.parse("1/0", &[]).unwrap();
        assert_eq!(eq.answer(&[]), 0.0);
        assert_eq!(eq.last_error().unwrap().kind, ErrorKind::DivZero);
    }

    #[test]
    fn test_parse_constant_rejects_variables() {
        assert_eq!(Equation::parse_constant("2 * 3 + 1").unwrap(), 7.0);
        let err = Equation::parse_constant("x + 1").unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownIdent);
    }

    #[test]
    fn test_contains_scans() {
        let mut eq = Equation::new();
        eq.parse("x + 2 s", &["x", "y"]).unwrap();
        assert!(eq.contains_any_variable());
        assert_eq!(eq.last_error().unwrap().pos, 0);
        assert!(eq.contains_variable(0));
        assert!(!eq.contains_variable(1));
        assert!(eq.contains_units());

        let mut plain = Equation::new();
        plain.parse("1 + 2", &[]).unwrap();
        assert!(!plain.contains_any_variable());
        assert!(!plain.contains_units());
    }

    #[test]
    fn test_error_message_window() {
        let mut eq = Equation::new();
        assert!(eq.parse("1 + bogus", &[]).is_err());
        let msg = eq.error_message(Some("1 + bogus"));
        assert_eq!(
            msg,
            "Equation error: 1 + bogus <-- Unknown function or variable"
        );

        eq.parse("1/0", &[]).unwrap();
        assert!(eq.evaluate(&[], false).is_err());
        let msg = eq.error_message(None);
        assert_eq!(msg, "Equation error: 1 <-- Division by zero");
    }

    #[test]
    fn test_display_is_source() {
        let mut eq = Equation::new();
        eq.parse("sin(x)/5", &["x"]).unwrap();
        assert_eq!(format!("{}", eq), "sin(x)/5");
    }
}

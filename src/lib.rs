//! Dimex is an embeddable arithmetic expression engine with SI-unit
//! tracking. A formula is parsed once into a flat token array and can
//! then be evaluated many times against varying variable values, which
//! makes it suitable for interactive tools that recompute the same
//! expression on every update. Evaluation returns the numeric value
//! together with a derived physical unit.
//!
//! The following snippet parses and evaluates a string without
//! variables.
//! ```rust
//! # use std::error::Error;
//! # fn main() -> Result<(), Box<dyn Error>> {
//! #
//! let value = dimex::eval_str("1.5 * ((cos(2*pi) + 23.0) / 2.0)")?;
//! assert!((value - 18.0).abs() < 1e-12);
//! #
//! #     Ok(())
//! # }
//! ```
//!
//! ## Variables
//!
//! Variable names are supplied to [`Equation::parse`] as an ordered
//! list; evaluation takes the values in the same order. Names win over
//! built-in constants and functions, so a variable may be called `e`
//! or `sign`.
//! ```rust
//! # use std::error::Error;
//! # fn main() -> Result<(), Box<dyn Error>> {
//! #
//! use dimex::Equation;
//! let mut eq = Equation::new();
//! eq.parse("x + sin(pi * y)", &["x", "y"])?;
//! let ans = eq.evaluate(&[5.0, 0.25], false)?;
//! assert!((ans.value - 5.7071067811865475).abs() < 1e-12);
//! #
//! #     Ok(())
//! # }
//! ```
//!
//! ## Units
//!
//! Quantities can carry SI units inline, including prefixes and the
//! hanging-denominator shorthand `3.1 V/A`. The answer reports the unit
//! that best matches the result's dimensions; `# unit` at the end of an
//! expression forces the answer into that unit instead.
//! ```rust
//! # use std::error::Error;
//! # fn main() -> Result<(), Box<dyn Error>> {
//! #
//! use dimex::Equation;
//! let mut eq = Equation::new();
//! eq.parse("3.1 V / 1 A", &[])?;
//! let ans = eq.evaluate(&[], true)?;
//! assert_eq!(ans.unit, "Ohm");
//!
//! eq.parse("100 degC # degF", &[])?;
//! let ans = eq.evaluate(&[], false)?;
//! assert!((ans.value - 212.0).abs() < 1e-9);
//! assert_eq!(ans.unit, "degF");
//! #
//! #     Ok(())
//! # }
//! ```
//!
//! ## Assignment
//!
//! With [`Equation::evaluate_assign`], `=` writes back into the
//! caller's variable array; the assignment itself evaluates to the
//! assigned value.
//! ```rust
//! # use std::error::Error;
//! # fn main() -> Result<(), Box<dyn Error>> {
//! #
//! use dimex::Equation;
//! let mut eq = Equation::new();
//! eq.parse("(x = 3) + x", &["x"])?;
//! let mut vars = [0.0];
//! assert_eq!(eq.evaluate_assign(&mut vars, false)?.value, 6.0);
//! assert_eq!(vars[0], 3.0);
//! #
//! #     Ok(())
//! # }
//! ```
//!
//! ## Errors
//!
//! Nothing panics across the public API: every failure is an
//! [`EqError`] carrying an [`ErrorKind`] with a stable numeric code and
//! the source offset where it was detected, and the instance keeps the
//! last failure for rendering via [`Equation::error_message`].

mod equation;
mod eval;
pub mod ops;
mod parser;
mod result;
#[cfg(feature = "serde")]
mod serde;
mod si;
mod tokens;
mod units;
mod util;

pub use equation::{Answer, Equation};
pub use result::{EqError, EqResult, ErrorKind};
pub use tokens::{Token, Valop};
pub use units::{parse_unit, Dim, ParsedUnit};

/// Parses a string, evaluates it without variables, and returns the
/// resulting number.
///
/// # Errors
///
/// An [`EqError`] is returned when parsing or evaluation fails, e.g.
/// for an invalid input string or one that references variables.
pub fn eval_str(text: &str) -> EqResult<f64> {
    Equation::parse_constant(text)
}

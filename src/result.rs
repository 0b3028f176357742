use std::{
    error::Error,
    fmt::{self, Display, Formatter},
};

/// Everything that can go wrong while parsing or evaluating an equation.
///
/// Each kind maps to a stable numeric code via [`ErrorKind::code`]. Parse
/// codes are below 100, evaluation codes are in the 100s, math codes in
/// the 200s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    // parse
    AllocFail,
    NoEquation,
    NumberExpected,
    UnknownIdent,
    BracketExpected,
    BinaryOpExpected,
    BracketsOpen,
    UnopenedBracket,
    NoAdvance,
    ContainsVar,
    NargBadCount,
    StackOverflow,
    AssignNotVar,
    UnitExpected,
    UnitAlreadyDefined,
    UnitIncompatible,
    IllegalChar,
    // evaluation
    UnknownBinaryOp,
    UnknownUnaryOp,
    UnknownNargOp,
    UnknownToken,
    StackNotEmpty,
    StackUnderflow,
    EvalContainsVar,
    BadToken,
    AssignNotAllowed,
    UnitMismatch,
    UnitNotDimless,
    EvalNoEquation,
    // math
    DivZero,
    Domain,
    SqrtNeg,
    LogZero,
    LogNeg,
    Overflow,
}

impl ErrorKind {
    /// Numeric code of this error kind.
    pub fn code(&self) -> i32 {
        match self {
            ErrorKind::AllocFail => -1,
            ErrorKind::NoEquation => -2,
            ErrorKind::NumberExpected => 1,
            ErrorKind::UnknownIdent => 2,
            ErrorKind::BracketExpected => 3,
            ErrorKind::BinaryOpExpected => 4,
            ErrorKind::BracketsOpen => 5,
            ErrorKind::UnopenedBracket => 6,
            ErrorKind::NoAdvance => 7,
            ErrorKind::ContainsVar => 8,
            ErrorKind::NargBadCount => 9,
            ErrorKind::StackOverflow => 10,
            ErrorKind::AssignNotVar => 11,
            ErrorKind::UnitExpected => 12,
            ErrorKind::UnitAlreadyDefined => 13,
            ErrorKind::UnitIncompatible => 14,
            ErrorKind::IllegalChar => 99,
            ErrorKind::UnknownBinaryOp => 101,
            ErrorKind::UnknownUnaryOp => 102,
            ErrorKind::UnknownNargOp => 103,
            ErrorKind::UnknownToken => 104,
            ErrorKind::StackNotEmpty => 105,
            ErrorKind::StackUnderflow => 106,
            ErrorKind::EvalContainsVar => 108,
            ErrorKind::BadToken => 109,
            ErrorKind::AssignNotAllowed => 110,
            ErrorKind::UnitMismatch => 111,
            ErrorKind::UnitNotDimless => 112,
            ErrorKind::EvalNoEquation => 199,
            ErrorKind::DivZero => 201,
            ErrorKind::Domain => 202,
            ErrorKind::SqrtNeg => 203,
            ErrorKind::LogZero => 204,
            ErrorKind::LogNeg => 205,
            ErrorKind::Overflow => 206,
        }
    }

    /// Short description suitable for the host's error dictionary.
    pub fn message(&self) -> &'static str {
        match self {
            ErrorKind::AllocFail => "Could not allocate buffer",
            ErrorKind::NoEquation => "Equation not defined",
            ErrorKind::NumberExpected => "Number, function, or variable expected",
            ErrorKind::UnknownIdent => "Unknown function or variable",
            ErrorKind::BracketExpected => "Bracket -(- expected",
            ErrorKind::BinaryOpExpected => "Binary operator expected",
            ErrorKind::BracketsOpen => "Missing -)- bracket(s)",
            ErrorKind::UnopenedBracket => "Too many -)- brackets",
            ErrorKind::NoAdvance => "No advance at token",
            ErrorKind::ContainsVar => "Constant expression expected",
            ErrorKind::NargBadCount => "Function has wrong number of arguments",
            ErrorKind::StackOverflow => "Parse stack overflow",
            ErrorKind::AssignNotVar => "Assignment must be to valid variable",
            ErrorKind::UnitExpected => "Unit expected",
            ErrorKind::UnitAlreadyDefined => "Result unit already defined",
            ErrorKind::UnitIncompatible => "Incompatible unit",
            ErrorKind::IllegalChar => "Illegal character",
            ErrorKind::UnknownBinaryOp => "Unknown binary operator",
            ErrorKind::UnknownUnaryOp => "Unknown unary operator",
            ErrorKind::UnknownNargOp => "Unknown n-argument operator",
            ErrorKind::UnknownToken => "Corrupted equation - unknown token",
            ErrorKind::StackNotEmpty => "Corrupted value stack - not empty",
            ErrorKind::StackUnderflow => "Value stack underflow",
            ErrorKind::EvalContainsVar => "Variable(s) not supplied",
            ErrorKind::BadToken => "Unexpected token type",
            ErrorKind::AssignNotAllowed => "Assignment not allowed",
            ErrorKind::UnitMismatch => "Incompatible units",
            ErrorKind::UnitNotDimless => "Dimensionless argument expected",
            ErrorKind::EvalNoEquation => "No equation to evaluate",
            ErrorKind::DivZero => "Division by zero",
            ErrorKind::Domain => "Domain error",
            ErrorKind::SqrtNeg => "Square root of negative number",
            ErrorKind::LogZero => "Log of zero",
            ErrorKind::LogNeg => "Log of negative number",
            ErrorKind::Overflow => "Overflow",
        }
    }

    /// True for codes raised while walking the token array or doing math,
    /// i.e., errors whose offset points into the stored source.
    pub fn is_eval(&self) -> bool {
        self.code() > 100
    }
}

/// An error together with the byte offset into the source string where it
/// was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EqError {
    pub kind: ErrorKind,
    pub pos: usize,
}

impl EqError {
    pub fn new(kind: ErrorKind, pos: usize) -> Self {
        EqError { kind, pos }
    }
}

impl Display for EqError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{} at offset {}", self.kind.message(), self.pos)
    }
}

impl Error for EqError {}

pub type EqResult<U> = Result<U, EqError>;

#[test]
fn test_codes_are_stable() {
    assert_eq!(ErrorKind::NumberExpected.code(), 1);
    assert_eq!(ErrorKind::IllegalChar.code(), 99);
    assert_eq!(ErrorKind::UnitMismatch.code(), 111);
    assert_eq!(ErrorKind::DivZero.code(), 201);
    assert!(ErrorKind::DivZero.is_eval());
    assert!(!ErrorKind::NargBadCount.is_eval());
}

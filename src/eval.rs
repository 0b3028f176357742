//! The stack machine that walks a compiled token array.
//!
//! Two stacks run in lock step: one for values, one for dimension
//! vectors, because unit checks are interleaved with the arithmetic.
//! Both are local to each call, so evaluating does not disturb the
//! compiled equation.

use smallvec::SmallVec;

use crate::ops::{self, narg, unary, Opcode};
use crate::result::{EqError, EqResult, ErrorKind};
use crate::si::UNITS;
use crate::tokens::{Token, Valop};
use crate::units::Dim;

const M_PI_180: f64 = std::f64::consts::PI / 180.0;

type ValStack = SmallVec<[f64; 32]>;
type DimStack = SmallVec<[Dim; 32]>;

/// Access to the caller's variable array. Assignment is only legal
/// through the writable variant.
pub(crate) enum Vars<'a> {
    Ro(&'a [f64]),
    Rw(&'a mut [f64]),
}

impl Vars<'_> {
    fn get(&self, idx: usize) -> Option<f64> {
        match self {
            Vars::Ro(v) => v.get(idx).copied(),
            Vars::Rw(v) => v.get(idx).copied(),
        }
    }
}

/// Raw evaluation result before any target unit or formatting applies.
pub(crate) struct RawAnswer {
    pub value: f64,
    pub dim: Dim,
}

fn pop2(vals: &mut ValStack, dims: &mut DimStack, pos: usize) -> EqResult<(f64, Dim)> {
    match (vals.pop(), dims.pop()) {
        (Some(v), Some(d)) => Ok((v, d)),
        _ => Err(EqError::new(ErrorKind::StackUnderflow, pos)),
    }
}

fn signum0(x: f64) -> i32 {
    if x == 0.0 {
        0
    } else if x < 0.0 {
        -1
    } else {
        1
    }
}

pub(crate) fn run(tokens: &[Token], vars: &mut Vars) -> EqResult<RawAnswer> {
    let mut vals = ValStack::new();
    let mut dims = DimStack::new();

    let mut i = 0usize;
    while i < tokens.len() {
        let tok = tokens[i];
        let at = tok.pos;
        match tok.valop {
            Valop::Val(v) | Valop::Prefix(v) => {
                vals.push(v);
                dims.push(Dim::ZERO);
            }
            Valop::Ref(r) => match vars.get(r) {
                Some(v) => {
                    vals.push(v);
                    dims.push(Dim::ZERO);
                }
                None => return Err(EqError::new(ErrorKind::EvalContainsVar, at)),
            },
            Valop::Unit(u) => {
                let (v, d) = pop2(&mut vals, &mut dims, at)?;
                let row = &UNITS[u];
                vals.push(row.offset + v * row.scale);
                dims.push(d + Dim(row.dims));
            }
            // counts are consumed together with their operator below
            Valop::Nargc(_) => return Err(EqError::new(ErrorKind::UnknownToken, at)),
            Valop::Op(op) => {
                i = apply_op(tokens, i, op, vars, &mut vals, &mut dims)?;
            }
        }
        i += 1;
    }

    if vals.len() > 1 {
        let at = tokens.last().map(|t| t.pos).unwrap_or(0);
        return Err(EqError::new(ErrorKind::StackNotEmpty, at));
    }
    match (vals.pop(), dims.pop()) {
        (Some(value), Some(dim)) => Ok(RawAnswer { value, dim }),
        _ => Err(EqError::new(ErrorKind::StackUnderflow, 0)),
    }
}

/// Applies one operator token; returns the possibly advanced token index
/// (assignment and variable-arity operators consume a trailing token).
fn apply_op(
    tokens: &[Token],
    i: usize,
    op: Opcode,
    vars: &mut Vars,
    vals: &mut ValStack,
    dims: &mut DimStack,
) -> EqResult<usize> {
    let at = tokens[i].pos;
    let err = |kind: ErrorKind| EqError::new(kind, at);

    if op == ops::SET {
        if !matches!(vars, Vars::Rw(_)) {
            return Err(err(ErrorKind::AssignNotAllowed));
        }
        let top = *vals.last().ok_or_else(|| err(ErrorKind::StackUnderflow))?;
        let next = i + 1;
        let r = match tokens.get(next) {
            Some(Token {
                valop: Valop::Ref(r),
                ..
            }) => *r,
            Some(_) => return Err(err(ErrorKind::BadToken)),
            None => return Err(err(ErrorKind::StackUnderflow)),
        };
        match vars {
            Vars::Rw(v) if r < v.len() => v[r] = top, // value stays on the stack
            _ => return Err(err(ErrorKind::EvalContainsVar)),
        }
        return Ok(next);
    }

    if op < ops::UNARY {
        let (arg2, u2) = pop2(vals, dims, at)?;
        let (arg1, u1) = pop2(vals, dims, at)?;
        let mut arg2 = arg2;

        match op {
            ops::DIV if arg2 == 0.0 => return Err(err(ErrorKind::DivZero)),
            ops::POW => {
                if arg1 < 0.0 {
                    arg2 = (arg2 + 0.5).floor(); // no fractional powers of negatives
                }
                if arg1 == 0.0 && arg2 < 0.0 {
                    return Err(err(ErrorKind::DivZero));
                }
            }
            _ => {}
        }

        let dim = match op {
            ops::ADD
            | ops::SUB
            | ops::OR
            | ops::AND
            | ops::LTE
            | ops::GTE
            | ops::LT
            | ops::GT
            | ops::NEQ
            | ops::EQ => {
                if u1 != u2 {
                    return Err(err(ErrorKind::UnitMismatch));
                }
                if op == ops::ADD || op == ops::SUB {
                    u2
                } else {
                    Dim::ZERO
                }
            }
            ops::MUL => u1 + u2,
            ops::DIV => u1 - u2,
            ops::POW => {
                if !u2.is_dimensionless() {
                    return Err(err(ErrorKind::UnitNotDimless));
                }
                u1 * arg2
            }
            _ => u2,
        };

        let val = match op {
            ops::PSH => {
                vals.push(arg1);
                dims.push(u1);
                arg2
            }
            ops::POP => arg2,
            ops::ADD => arg1 + arg2,
            ops::SUB => arg1 - arg2,
            ops::MUL => arg1 * arg2,
            ops::DIV => arg1 / arg2,
            ops::POW => {
                if arg1 == 0.0 && arg2 == 0.0 {
                    1.0
                } else {
                    arg1.powf(arg2)
                }
            }
            ops::OR => ((arg1 != 0.0) || (arg2 != 0.0)) as i32 as f64,
            ops::AND => ((arg1 != 0.0) && (arg2 != 0.0)) as i32 as f64,
            ops::LTE => (arg1 <= arg2) as i32 as f64,
            ops::GTE => (arg1 >= arg2) as i32 as f64,
            ops::LT => (arg1 < arg2) as i32 as f64,
            ops::GT => (arg1 > arg2) as i32 as f64,
            ops::NEQ => (arg1 != arg2) as i32 as f64,
            ops::EQ => (arg1 == arg2) as i32 as f64,
            _ => return Err(err(ErrorKind::UnknownBinaryOp)),
        };
        vals.push(val);
        dims.push(dim);
        return Ok(i);
    }

    if op < ops::NARG {
        let (arg, mut u) = pop2(vals, dims, at)?;
        let ucode = op - ops::UNARY;

        match ucode {
            unary::ACOS | unary::ASIN if arg.abs() > 1.0 => return Err(err(ErrorKind::Domain)),
            unary::LOG | unary::LOG10 if arg == 0.0 => return Err(err(ErrorKind::LogZero)),
            unary::LOG | unary::LOG10 if arg < 0.0 => return Err(err(ErrorKind::LogNeg)),
            unary::SQRT if arg < 0.0 => return Err(err(ErrorKind::SqrtNeg)),
            unary::EXP if arg > 709.0 => return Err(err(ErrorKind::Overflow)),
            _ => {}
        }

        match ucode {
            unary::ABS | unary::CEIL | unary::FLOOR | unary::ROUND => {}
            unary::SQRT => u = u * 0.5,
            _ => {
                if !u.is_dimensionless() {
                    return Err(err(ErrorKind::UnitNotDimless));
                }
            }
        }

        let val = match ucode {
            unary::ABS => arg.abs(),
            unary::SQRT => arg.sqrt(),
            unary::EXP => arg.exp(),
            unary::LOG => arg.ln(),
            unary::LOG10 => arg.log10(),
            unary::CEIL => arg.ceil(),
            unary::FLOOR => arg.floor(),
            unary::ROUND => (arg + 0.5).floor(),
            unary::COS => arg.cos(),
            unary::SIN => arg.sin(),
            unary::TAN => arg.tan(),
            unary::ACOS => arg.acos(),
            unary::ASIN => arg.asin(),
            unary::ATAN => arg.atan(),
            unary::COSH => arg.cosh(),
            unary::SINH => arg.sinh(),
            unary::TANH => arg.tanh(),
            unary::SIND => (arg * M_PI_180).sin(),
            unary::COSD => (arg * M_PI_180).cos(),
            unary::TAND => (arg * M_PI_180).tan(),
            unary::ASIND => arg.asin() / M_PI_180,
            unary::ACOSD => arg.acos() / M_PI_180,
            unary::ATAND => arg.atan() / M_PI_180,
            unary::NOT => {
                if arg == 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            unary::SIGN => signum0(arg) as f64,
            _ => return Err(err(ErrorKind::UnknownUnaryOp)),
        };
        vals.push(val);
        dims.push(u);
        return Ok(i);
    }

    let ncode = op - ops::NARG;
    match ncode {
        narg::MOD | narg::REM => {
            let (arg2, u2) = pop2(vals, dims, at)?;
            let (arg1, u1) = pop2(vals, dims, at)?;
            if arg2 == 0.0 {
                if ncode == narg::REM {
                    return Err(err(ErrorKind::DivZero));
                }
                vals.push(arg1); // mod(a, 0) is a
                dims.push(u1);
            } else {
                if u1 != u2 {
                    return Err(err(ErrorKind::UnitMismatch));
                }
                let mut val = arg1 - arg2 * (arg1 / arg2).floor();
                if ncode == narg::REM && signum0(arg1) != signum0(arg2) {
                    val -= arg2;
                }
                vals.push(val);
                dims.push(u2);
            }
            Ok(i)
        }
        narg::ATAN2 | narg::ATAN2D => {
            let (arg2, u2) = pop2(vals, dims, at)?;
            let (arg1, u1) = pop2(vals, dims, at)?;
            if u1 != u2 {
                return Err(err(ErrorKind::UnitMismatch));
            }
            let mut val = if arg2 == 0.0 {
                match signum0(arg1) {
                    0 => 0.0,
                    1 => std::f64::consts::FRAC_PI_2,
                    _ => -std::f64::consts::FRAC_PI_2,
                }
            } else {
                arg1.atan2(arg2)
            };
            if ncode == narg::ATAN2D {
                val /= M_PI_180;
            }
            vals.push(val);
            dims.push(Dim::ZERO);
            Ok(i)
        }
        narg::MAX | narg::MIN => {
            let next = i + 1;
            let n = match tokens.get(next) {
                Some(Token {
                    valop: Valop::Nargc(n),
                    ..
                }) => *n,
                Some(_) => return Err(err(ErrorKind::UnknownNargOp)),
                None => return Err(err(ErrorKind::StackUnderflow)),
            };
            let (mut val, u) = pop2(vals, dims, at)?;
            for _ in 1..n {
                let (arg, ua) = pop2(vals, dims, at)?;
                if ua != u {
                    return Err(err(ErrorKind::UnitMismatch));
                }
                if (ncode == narg::MAX && arg > val) || (ncode == narg::MIN && arg < val) {
                    val = arg;
                }
            }
            vals.push(val);
            dims.push(u);
            Ok(next)
        }
        narg::IF => {
            let (if_false, uf) = pop2(vals, dims, at)?;
            let (if_true, ut) = pop2(vals, dims, at)?;
            let (cond, uc) = pop2(vals, dims, at)?;
            if !uc.is_dimensionless() {
                return Err(err(ErrorKind::UnitNotDimless));
            }
            if cond == 0.0 {
                vals.push(if_false);
                dims.push(uf);
            } else {
                vals.push(if_true);
                dims.push(ut);
            }
            Ok(i)
        }
        _ => Err(err(ErrorKind::UnknownNargOp)),
    }
}

//! The dimension vector, the unit sub-expression parser used by the
//! `#unit` target clause, and the automatic answer-unit formatter.

use std::ops::{Add, Mul, Sub};

use crate::result::{EqError, EqResult, ErrorKind};
use crate::si::{self, NUM_BASE, NUM_INPUT, NUM_NAMED, UNITS};
use crate::util::{format_lg, scan_letters, scan_number};

/// Exponents over the seven SI base dimensions (kg, m, A, s, K, mol, cd).
///
/// Multiplying two quantities adds their vectors, dividing subtracts,
/// raising to a power scales.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Dim(pub [f64; NUM_BASE]);

impl Dim {
    pub const ZERO: Dim = Dim([0.0; NUM_BASE]);

    pub fn of_unit(idx: usize) -> Dim {
        Dim(UNITS[idx].dims)
    }

    pub fn is_dimensionless(&self) -> bool {
        self.0.iter().all(|d| *d == 0.0)
    }
}

impl Add for Dim {
    type Output = Dim;
    fn add(self, other: Dim) -> Dim {
        let mut out = self;
        for (o, r) in out.0.iter_mut().zip(other.0.iter()) {
            *o += r;
        }
        out
    }
}

impl Sub for Dim {
    type Output = Dim;
    fn sub(self, other: Dim) -> Dim {
        let mut out = self;
        for (o, r) in out.0.iter_mut().zip(other.0.iter()) {
            *o -= r;
        }
        out
    }
}

impl Mul<f64> for Dim {
    type Output = Dim;
    fn mul(self, factor: f64) -> Dim {
        let mut out = self;
        for o in out.0.iter_mut() {
            *o *= factor;
        }
        out
    }
}

/// Result of parsing a unit sub-expression such as `kg m/s2` or `degF`:
/// the dimension vector, the affine map into base units, and the
/// canonical text used when reporting the answer.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedUnit {
    pub dim: Dim,
    pub scale: f64,
    pub offset: f64,
    pub text: String,
}

/// Parses a unit sub-expression: space-separated atoms forming a
/// numerator, optionally followed by `/` and denominator atoms. An atom
/// is an optional SI prefix, a unit name, and an optional real power. A
/// leading `1` is skipped, so `1/s` and `/s` are the same.
///
/// Offset-bearing units (degC, degF) may not be combined with scales,
/// raised to powers, or placed in the denominator. Error offsets are
/// relative to the start of `text`.
pub fn parse_unit(text: &str) -> EqResult<ParsedUnit> {
    if text.is_empty() {
        return Err(EqError::new(ErrorKind::UnitExpected, 0));
    }
    let bytes = text.as_bytes();
    let mut out = String::new();
    let mut dim = Dim::ZERO;
    let mut cur = Dim::ZERO;
    let mut scale = 1.0;
    let mut offset = 0.0;
    let mut scl_cur: f64 = 1.0;
    let mut pwr_cur = 1.0;
    let mut sign = 1.0;
    let mut pending = false;
    let mut p = 0usize;

    while p < bytes.len() && bytes[p] == b' ' {
        p += 1;
    }
    if p < bytes.len() && bytes[p] == b'1' {
        p += 1; // "1/s", "1 mm"
    }

    loop {
        if pending {
            dim = dim + cur * (sign * pwr_cur);
            if sign > 0.0 {
                scale *= scl_cur.powf(pwr_cur);
            } else {
                scale /= scl_cur.powf(pwr_cur);
            }
            scl_cur = 1.0;
            pwr_cur = 1.0;
        }
        while p < bytes.len() && bytes[p] == b' ' {
            p += 1;
        }
        if p >= bytes.len() {
            break;
        }
        if !out.is_empty() && !out.ends_with('/') {
            out.push(' ');
        }

        if bytes[p] == b'/' {
            if sign < 1.0 {
                return Err(EqError::new(ErrorKind::IllegalChar, p));
            }
            out.push('/');
            pending = false;
            sign = -1.0;
            p += 1;
            continue;
        }

        // atom: optional prefix character, then a unit name
        let tok_full = scan_letters(&text[p..]);
        let mut q = p;
        let mut toklen = tok_full;
        let mut prefix: Option<char> = None;
        let unit_idx = loop {
            let tok = &text[q..q + toklen];
            if let Some(i) = UNITS[..NUM_INPUT].iter().position(|u| u.name == tok) {
                break i;
            }
            if prefix.is_some() || toklen <= 1 {
                return Err(EqError::new(ErrorKind::UnitExpected, p));
            }
            let c = bytes[q] as char;
            match si::prefix_value(c) {
                Some(v) => {
                    scl_cur *= v;
                    prefix = Some(c);
                    q += 1;
                    toklen -= 1;
                }
                None => return Err(EqError::new(ErrorKind::UnitExpected, p)),
            }
        };
        let unit = &UNITS[unit_idx];
        if (unit.scale != 1.0 && offset != 0.0)
            || (unit.offset != 0.0 && scale != 1.0)
            || (unit.offset != 0.0 && sign < 0.0)
        {
            return Err(EqError::new(ErrorKind::UnitIncompatible, p));
        }
        cur = Dim(unit.dims);
        scl_cur *= unit.scale;
        offset += unit.offset;
        pending = true;
        if let Some(c) = prefix {
            out.push(c);
        }
        out.push_str(unit.name);
        p = q + unit.name.len();

        // optional power
        let mut r = p;
        while r < bytes.len() && bytes[r] == b' ' {
            r += 1;
        }
        if let Some((val, len)) = scan_signed_number(&text[r..]) {
            if val < 0.0 && sign < 0.0 {
                return Err(EqError::new(ErrorKind::UnitExpected, r));
            }
            if offset != 0.0 {
                return Err(EqError::new(ErrorKind::UnitIncompatible, r));
            }
            pwr_cur = val;
            out.push_str(&format_lg(val));
            p = r + len;
        }
    }

    if out.ends_with('/') {
        return Err(EqError::new(ErrorKind::UnitExpected, p));
    }
    Ok(ParsedUnit {
        dim,
        scale,
        offset,
        text: out,
    })
}

// `scan_number` accepts no leading minus, so negative powers get their
// own scan here.
fn scan_signed_number(text: &str) -> Option<(f64, usize)> {
    if let Some(rest) = text.strip_prefix('-') {
        scan_number(rest).map(|(v, len)| (-v, len + 1))
    } else {
        scan_number(text)
    }
}

/// Chooses the named unit that best explains the dimension vector `dim`
/// and renders it as `numerator /denominator`.
///
/// Candidates are scored by the number of residual base axes and the
/// total residual power, fractional powers penalized; on a full tie a
/// positive multiple of the candidate wins over a negative one, which is
/// why `Hz` is reported instead of `/s`. With `allow_derived` false only
/// the seven base units compete.
pub(crate) fn unit_string(dim: &Dim, allow_derived: bool) -> String {
    let mut residual = *dim;
    let max_unit = if allow_derived { NUM_NAMED } else { NUM_BASE };

    let mut best_idx: Option<usize> = None;
    let mut best_scl = 0.0;
    let mut best_num = usize::MAX;
    let mut best_pwr = f64::INFINITY;
    for (iu, unit) in UNITS[..max_unit].iter().enumerate() {
        for ib in 0..NUM_BASE {
            if residual.0[ib] == 0.0 || unit.dims[ib] == 0.0 {
                continue;
            }
            let scl = residual.0[ib] / unit.dims[ib];
            let mut num = 1usize;
            let mut pwr = scl.abs();
            for k in 0..NUM_BASE {
                if k == ib {
                    continue;
                }
                let rem = residual.0[k] - scl * unit.dims[k];
                if rem == 0.0 {
                    continue;
                }
                num += 1;
                pwr += rem.abs().ceil();
                if rem.fract() != 0.0 {
                    pwr += 10.0;
                }
            }
            let better = num < best_num
                || (num == best_num && pwr < best_pwr)
                || (num == best_num && pwr == best_pwr && scl > 0.0 && best_scl < 0.0);
            if better {
                best_idx = Some(iu);
                best_scl = scl;
                best_num = num;
                best_pwr = pwr;
            }
        }
    }

    if let Some(i) = best_idx {
        residual = residual - Dim::of_unit(i) * best_scl;
    }

    let side = |upward: bool| -> String {
        let k = if upward { 1.0 } else { -1.0 };
        let mut out = String::new();
        if let Some(i) = best_idx {
            if (best_scl > 0.0) == upward {
                out.push_str(UNITS[i].name);
                if best_scl.abs() != 1.0 {
                    out.push_str(&format_lg(k * best_scl));
                }
            }
        }
        for b in 0..NUM_BASE {
            let d = k * residual.0[b];
            if d <= 0.0 {
                continue;
            }
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(UNITS[b].name);
            if d != 1.0 {
                out.push_str(&format_lg(d));
            }
        }
        out
    };

    let numer = side(true);
    let denom = side(false);
    match (numer.is_empty(), denom.is_empty()) {
        (_, true) => numer,
        (true, false) => format!("/{}", denom),
        (false, false) => format!("{} /{}", numer, denom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn dim_of(pairs: &[(usize, f64)]) -> Dim {
        let mut d = Dim::ZERO;
        for (axis, exp) in pairs {
            d.0[*axis] = *exp;
        }
        d
    }

    #[test]
    fn test_parse_simple() {
        let u = parse_unit("kg").unwrap();
        assert_eq!(u.dim, dim_of(&[(0, 1.0)]));
        assert_eq!(u.scale, 1.0);
        assert_eq!(u.offset, 0.0);
        assert_eq!(u.text, "kg");
    }

    #[test]
    fn test_parse_compound() {
        let u = parse_unit("kg m/s2").unwrap();
        assert_eq!(u.dim, dim_of(&[(0, 1.0), (1, 1.0), (3, -2.0)]));
        assert_eq!(u.scale, 1.0);
        assert_eq!(u.text, "kg m /s2");
    }

    #[test]
    fn test_parse_prefix() {
        let u = parse_unit("mm").unwrap();
        assert_eq!(u.dim, dim_of(&[(1, 1.0)]));
        assert!((u.scale - 1e-3).abs() < 1e-18);
        assert_eq!(u.text, "mm");

        let u = parse_unit("km2").unwrap();
        assert_eq!(u.dim, dim_of(&[(1, 2.0)]));
        assert!((u.scale - 1e6).abs() < 1e-6);
        assert_eq!(u.text, "km2");
    }

    #[test]
    fn test_parse_leading_one() {
        let u = parse_unit("1/s").unwrap();
        assert_eq!(u.dim, dim_of(&[(3, -1.0)]));
        assert_eq!(u.scale, 1.0);
        assert_eq!(u.text, "/s");
    }

    #[test]
    fn test_parse_offset_units() {
        let u = parse_unit("degF").unwrap();
        assert!((u.scale - 5.0 / 9.0).abs() < 1e-12);
        assert!((u.offset - (273.15 - 5.0 / 9.0 * 32.0)).abs() < 1e-12);
    }

    #[test]
    fn test_parse_errors() {
        assert_matches!(
            parse_unit(""),
            Err(EqError {
                kind: ErrorKind::UnitExpected,
                ..
            })
        );
        assert_matches!(
            parse_unit("bogus"),
            Err(EqError {
                kind: ErrorKind::UnitExpected,
                ..
            })
        );
        // second solidus
        assert_matches!(
            parse_unit("m/s/s"),
            Err(EqError {
                kind: ErrorKind::IllegalChar,
                ..
            })
        );
        // offsets may not move into the denominator or take powers
        assert_matches!(
            parse_unit("1/degC"),
            Err(EqError {
                kind: ErrorKind::UnitIncompatible,
                ..
            })
        );
        assert_matches!(
            parse_unit("degF2"),
            Err(EqError {
                kind: ErrorKind::UnitIncompatible,
                ..
            })
        );
        // trailing solidus
        assert_matches!(
            parse_unit("kg/"),
            Err(EqError {
                kind: ErrorKind::UnitExpected,
                ..
            })
        );
        // negative powers make no sense in the denominator
        assert_matches!(
            parse_unit("kg/m-1"),
            Err(EqError {
                kind: ErrorKind::UnitExpected,
                ..
            })
        );
    }

    #[test]
    fn test_answer_unit_derived() {
        // V/A resolves to Ohm when derived units are allowed
        let ohm = dim_of(&[(0, 1.0), (1, 2.0), (2, -2.0), (3, -3.0)]);
        assert_eq!(unit_string(&ohm, true), "Ohm");
        assert_eq!(unit_string(&ohm, false), "kg m2 /A2 s3");
    }

    #[test]
    fn test_answer_unit_prefers_positive_match() {
        let hz = dim_of(&[(3, -1.0)]);
        assert_eq!(unit_string(&hz, true), "Hz");
        assert_eq!(unit_string(&hz, false), "/s");
    }

    #[test]
    fn test_answer_unit_powers() {
        let area = dim_of(&[(1, 2.0)]);
        assert_eq!(unit_string(&area, false), "m2");
        assert_eq!(unit_string(&Dim::ZERO, true), "");
        let speed = dim_of(&[(1, 1.0), (3, -1.0)]);
        assert_eq!(unit_string(&speed, false), "m /s");
    }
}

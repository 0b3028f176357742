//! The shunting-yard expression parser.
//!
//! A single pass over the source converts it into a flat RPN token
//! array. Operator precedence and parenthesis depth are folded into one
//! integer comparison by adding [`ops::BRACKET`] to every stacked opcode
//! per open bracket. The operator stack also carries two kinds of
//! auxiliary entries, each sitting directly below the opcode it belongs
//! to: the variable index of a pending assignment, and the argument
//! count spliced in when a variable-arity call's bracket closes.

use lazy_static::lazy_static;
use regex::Regex;
use smallvec::SmallVec;

use crate::ops::{self, Opcode};
use crate::result::{EqError, EqResult, ErrorKind};
use crate::si::{self, NUM_INPUT, UNITS};
use crate::tokens::{Token, Valop};
use crate::units::{self, ParsedUnit};
use crate::util::{scan_letters, scan_number};

const ILLEGAL_CHARS: &str = "`~@$%[]{}?\\;:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LookFor {
    Number,
    BinaryOp,
    Bracket,
}

lazy_static! {
    static ref RE_IDENT: Regex = Regex::new(r#"^[A-Za-z_][A-Za-z_0-9'"]*"#).unwrap();
}

#[derive(Debug)]
pub(crate) struct Parsed {
    pub tokens: Vec<Token>,
    pub target: Option<ParsedUnit>,
}

type OpStack = SmallVec<[Opcode; 32]>;
type PosStack = SmallVec<[usize; 32]>;

struct Shunt {
    out: Vec<Token>,
    ops: OpStack,
    pos: PosStack,
}

impl Shunt {
    fn peek_back(&self, offs: i32) -> Opcode {
        let idx = self.ops.len() as i32 + offs;
        if idx < 0 {
            0
        } else {
            self.ops[idx as usize]
        }
    }

    fn pos_back(&self, offs: i32) -> usize {
        let idx = self.pos.len() as i32 + offs;
        if idx < 0 {
            0
        } else {
            self.pos[idx as usize]
        }
    }

    fn push_op(&mut self, op: Opcode, at: usize) {
        self.ops.push(op);
        self.pos.push(at);
    }

    /// Inserts an auxiliary entry at the back offset `offs`, i.e.,
    /// directly below the operator found there.
    fn insert_back(&mut self, value: Opcode, offs: i32) {
        let idx = (self.ops.len() as i32 + offs).max(0) as usize;
        let at = self.pos[idx];
        self.ops.insert(idx, value);
        self.pos.insert(idx, at);
    }

    /// Scans down the operator stack to the first entry at or below the
    /// current bracket level, skipping auxiliary entries, and counts the
    /// argument-separating pushes passed on the way. Returns the found
    /// entry (raw), its back offset, and the push count.
    fn scan_open(&self, brkt: Opcode) -> (Opcode, i32, i32) {
        let mut offs = 0i32;
        let mut pushes = 0i32;
        let found = loop {
            offs -= 1;
            let entry = self.peek_back(offs);
            if entry <= brkt {
                break entry;
            }
            if entry - brkt == ops::PSH {
                pushes += 1;
            }
            let plain = ops::strip(entry);
            if ops::is_narg(plain) && ops::narg_argc(plain) < 0 {
                offs -= 1; // skip the spliced argument count
            }
            if plain == ops::SET {
                offs -= 1; // skip the assignment variable reference
            }
        };
        (found, offs, pushes)
    }

    /// Drains stacked operators of precedence at or above `this_op` into
    /// the output. A drained assignment emits its variable reference, a
    /// drained variable-arity function its argument count, right after
    /// the operator token.
    fn process_ops(&mut self, this_op: Opcode, brkt: Opcode) {
        while let Some(&prev) = self.ops.last() {
            if prev < this_op {
                // relationals associate left to right even though their
                // codes ascend within the block
                let both_relational = ops::level(prev) == ops::level(this_op)
                    && ops::is_relational(ops::strip(prev))
                    && ops::is_relational(ops::strip(this_op));
                if !both_relational {
                    break;
                }
            }
            if this_op == ops::PSH + brkt && prev == this_op {
                break; // pushes at one level stay put to count arguments
            }
            self.ops.pop();
            let at = self.pos.pop().unwrap_or(0);
            let plain = ops::strip(prev);
            self.out.push(Token::new(Valop::Op(plain), at));
            if plain == ops::SET {
                let var = self.ops.pop().unwrap_or(0);
                let var_at = self.pos.pop().unwrap_or(0);
                self.out.push(Token::new(Valop::Ref(var as usize), var_at));
            }
            if ops::is_narg(plain) && ops::narg_argc(plain) < 0 {
                let argc = self.ops.pop().unwrap_or(0);
                let argc_at = self.pos.pop().unwrap_or(0);
                self.out
                    .push(Token::new(Valop::Nargc(argc as usize), argc_at));
            }
        }
    }
}

fn scan_binary(text: &str) -> Option<(Opcode, usize)> {
    const TWO_CHAR: [(&str, Opcode); 6] = [
        ("||", ops::OR),
        ("&&", ops::AND),
        ("<=", ops::LTE),
        (">=", ops::GTE),
        ("!=", ops::NEQ),
        ("==", ops::EQ),
    ];
    for (sym, op) in TWO_CHAR {
        if text.starts_with(sym) {
            return Some((op, 2));
        }
    }
    let op = match text.as_bytes().first()? {
        b',' => ops::PSH,
        b'+' => ops::ADD,
        b'-' => ops::SUB,
        b'*' => ops::MUL,
        b'/' => ops::DIV,
        b'^' => ops::POW,
        b'|' => ops::OR,
        b'&' => ops::AND,
        b'<' => ops::LT,
        b'>' => ops::GT,
        b'=' => ops::SET,
        _ => return None,
    };
    Some((op, 1))
}

/// Handles a unit name appearing inline in the expression, e.g. the `s`
/// of `1.5 s` or the `A` of `3.1 V/A`. Where a number was expected, a
/// hanging unit after `/` synthesizes a `1` operand and raises the
/// precedence so the division binds to it first; after `*` the pending
/// multiplication is simply dropped. Returns the consumed length, zero
/// when no unit starts here.
fn parse_equation_units(
    shunt: &mut Shunt,
    text: &str,
    at: usize,
    brkt: Opcode,
    look_for: LookFor,
) -> EqResult<usize> {
    let tok_full = scan_letters(&text[at..]);
    if tok_full == 0 {
        return Ok(0);
    }

    // try the token as a unit name, then behind a one-character prefix
    let mut start = at;
    let mut toklen = tok_full;
    let mut prefix: Option<f64> = None;
    let unit_idx = loop {
        let tok = &text[start..start + toklen];
        if let Some(idx) = UNITS[..NUM_INPUT].iter().position(|u| u.name == tok) {
            break idx;
        }
        if prefix.is_some() || toklen <= 1 {
            return Ok(0);
        }
        match si::prefix_value(text.as_bytes()[start] as char) {
            Some(value) => {
                prefix = Some(value);
                start += 1;
                toklen -= 1;
            }
            None => return Ok(0),
        }
    };

    let mut brkt = brkt;
    if look_for == LookFor::Number {
        match ops::strip(shunt.peek_back(-1)) {
            ops::DIV => {
                // hanging denominator: inject the implicit 1
                shunt.out.push(Token::new(Valop::Prefix(1.0), at));
                brkt += ops::BRACKET;
            }
            ops::MUL => {
                shunt.ops.pop();
                shunt.pos.pop();
            }
            _ => return Err(EqError::new(ErrorKind::NumberExpected, at)),
        }
    } else {
        shunt.process_ops(brkt + ops::BRACKET, brkt);
    }

    if let Some(value) = prefix {
        shunt.out.push(Token::new(Valop::Prefix(value), at));
        shunt.push_op(ops::MUL + brkt, at);
    }

    let top = ops::strip(shunt.peek_back(-1));
    let this_op = ops::MUL + brkt + if top == ops::DIV { ops::BRACKET } else { 0 };
    shunt.out.push(Token::new(Valop::Unit(unit_idx), at));
    shunt.process_ops(this_op, brkt);

    Ok(UNITS[unit_idx].name.len() + usize::from(prefix.is_some()))
}

pub(crate) fn parse(text: &str, var_names: &[&str]) -> EqResult<Parsed> {
    if let Some(bad) = text.bytes().position(|b| !b.is_ascii()) {
        return Err(EqError::new(ErrorKind::IllegalChar, bad));
    }
    let bytes = text.as_bytes();
    let mut shunt = Shunt {
        out: Vec::new(),
        ops: SmallVec::new(),
        pos: SmallVec::new(),
    };
    let mut target: Option<ParsedUnit> = None;
    let mut brkt: Opcode = 0;
    let mut look_for = LookFor::Number;
    let mut p = 0usize;

    while p < bytes.len() {
        while p < bytes.len() && bytes[p] == b' ' {
            p += 1;
        }
        if p >= bytes.len() {
            break;
        }
        let c = bytes[p] as char;
        if ILLEGAL_CHARS.contains(c) {
            return Err(EqError::new(ErrorKind::IllegalChar, p));
        }
        let mut scan = 0usize;

        match look_for {
            LookFor::Number => {
                if c.is_ascii_alphabetic() || c == '_' {
                    let tok_len = RE_IDENT.find(&text[p..]).map(|m| m.end()).unwrap_or(1);
                    let tok = &text[p..p + tok_len];
                    // variables first, so they can shadow built-in names
                    if let Some(idx) = var_names.iter().position(|n| *n == tok) {
                        shunt.out.push(Token::new(Valop::Ref(idx), p));
                        scan = tok_len;
                        look_for = LookFor::BinaryOp;
                    } else if let Some(cnst) = si::find_constant(tok) {
                        shunt.out.push(Token::new(Valop::Val(cnst.value), p));
                        if let Some(u) = cnst.unit {
                            shunt.out.push(Token::new(Valop::Unit(u), p));
                        }
                        scan = tok_len;
                        look_for = LookFor::BinaryOp;
                    } else if let Some(op) = ops::find_unary(tok) {
                        shunt.push_op(op + brkt, p);
                        scan = tok_len;
                        look_for = LookFor::Bracket;
                    } else if let Some(op) = ops::find_narg(tok) {
                        shunt.push_op(op + brkt, p);
                        scan = tok_len;
                        look_for = LookFor::Bracket;
                    } else {
                        scan = parse_equation_units(&mut shunt, text, p, brkt, look_for)?;
                        if scan > 0 {
                            look_for = LookFor::BinaryOp;
                        } else {
                            return Err(EqError::new(ErrorKind::UnknownIdent, p));
                        }
                    }
                } else if c == '!' {
                    // logical not; != cannot occur in operand position
                    shunt.push_op(ops::UNARY + ops::unary::NOT + brkt, p);
                    scan = 1;
                    look_for = LookFor::Bracket;
                } else if c == '-' {
                    // compiled as multiplication by -1 so that -2^2 = -4
                    shunt.out.push(Token::new(Valop::Val(-1.0), p));
                    shunt.push_op(ops::MUL + brkt, p);
                    scan = 1;
                } else if c == '+' {
                    scan = 1;
                } else if let Some((value, len)) = scan_number(&text[p..]) {
                    shunt.out.push(Token::new(Valop::Val(value), p));
                    scan = len;
                    look_for = LookFor::BinaryOp;
                } else if c == '(' {
                    brkt += ops::BRACKET;
                    scan = 1;
                } else if c == ')' && brkt > 0 {
                    // an empty argument list; report it as a count error
                    // when a variadic call is waiting on the bracket
                    let (found, offs, _) = shunt.scan_open(brkt);
                    let narg_op = found - (brkt - ops::BRACKET) - ops::NARG;
                    if (0..ops::narg::COUNT as Opcode).contains(&narg_op) {
                        return Err(EqError::new(
                            ErrorKind::NargBadCount,
                            shunt.pos_back(offs),
                        ));
                    }
                    return Err(EqError::new(ErrorKind::NumberExpected, p));
                } else {
                    scan = parse_equation_units(&mut shunt, text, p, brkt, look_for)?;
                    if scan == 0 {
                        return Err(EqError::new(ErrorKind::NumberExpected, p));
                    }
                    look_for = LookFor::BinaryOp;
                }
            }

            LookFor::BinaryOp => {
                if c == ')' {
                    let (found, offs, pushes) = shunt.scan_open(brkt);
                    brkt -= ops::BRACKET;
                    if brkt < 0 {
                        return Err(EqError::new(ErrorKind::UnopenedBracket, p));
                    }
                    scan = 1;
                    let args = pushes + 1;
                    let narg_op = found - brkt - ops::NARG;
                    if (0..ops::narg::COUNT as Opcode).contains(&narg_op) {
                        let declared = ops::NARG_ARGC[narg_op as usize];
                        if args < declared.abs() || (declared > 0 && args > declared) {
                            return Err(EqError::new(
                                ErrorKind::NargBadCount,
                                shunt.pos_back(offs),
                            ));
                        }
                        if declared < 0 {
                            shunt.insert_back(args, offs);
                        }
                    } else if args > 1 {
                        return Err(EqError::new(ErrorKind::NargBadCount, shunt.pos_back(offs)));
                    }
                } else if let Some((op, len)) = scan_binary(&text[p..]) {
                    scan = len;
                    if op == ops::SET {
                        match shunt.out.last().copied() {
                            Some(Token {
                                valop: Valop::Ref(var),
                                pos: var_at,
                            }) => {
                                // the reference becomes the assignment
                                // target rather than a value push
                                shunt.out.pop();
                                shunt.process_ops(ops::SET + brkt, brkt);
                                shunt.push_op(var as Opcode, var_at);
                                shunt.push_op(ops::SET + brkt, p);
                                look_for = LookFor::Number;
                            }
                            _ => return Err(EqError::new(ErrorKind::AssignNotVar, p)),
                        }
                    } else {
                        let mut op = op;
                        if op == ops::PSH {
                            // a comma outside any function call discards
                            // its first argument
                            if brkt <= 0 {
                                op = ops::POP;
                            }
                            let (found, _, _) = shunt.scan_open(brkt);
                            if found - brkt + ops::BRACKET == 0
                                || found < brkt - ops::BRACKET + ops::BINARY_MIN
                            {
                                op = ops::POP;
                            }
                        }
                        let this_op = op + brkt;
                        shunt.process_ops(this_op, brkt);
                        shunt.push_op(this_op, p);
                        look_for = LookFor::Number;
                    }
                } else {
                    scan = parse_equation_units(&mut shunt, text, p, brkt, look_for)?;
                    if scan == 0 {
                        if c == '#' {
                            match units::parse_unit(&text[p + 1..]) {
                                Ok(unit) => {
                                    target = Some(unit);
                                    scan = bytes.len() - p; // nothing may follow
                                }
                                Err(e) => return Err(EqError::new(e.kind, p + 1 + e.pos)),
                            }
                        } else {
                            return Err(EqError::new(ErrorKind::BinaryOpExpected, p));
                        }
                    }
                }
            }

            LookFor::Bracket => {
                if c == '(' {
                    brkt += ops::BRACKET;
                    scan = 1;
                    look_for = LookFor::Number;
                } else {
                    return Err(EqError::new(ErrorKind::BracketExpected, p));
                }
            }
        }

        if scan == 0 {
            return Err(EqError::new(ErrorKind::NoAdvance, p));
        }
        p += scan;
    }

    if brkt > 0 {
        return Err(EqError::new(ErrorKind::BracketsOpen, p));
    }
    if look_for == LookFor::Bracket {
        return Err(EqError::new(ErrorKind::BracketExpected, p));
    }
    if look_for == LookFor::Number {
        // point at the operator still waiting for its operand
        let at = if shunt.pos.is_empty() {
            p
        } else {
            shunt.pos_back(-1)
        };
        return Err(EqError::new(ErrorKind::NumberExpected, at));
    }

    shunt.process_ops(-1, brkt);
    shunt.out.retain(|t| t.valop != Valop::Op(ops::PSH));
    Ok(Parsed {
        tokens: shunt.out,
        target,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::{narg, unary, ADD, MUL, POP, SET};
    use assert_matches::assert_matches;

    fn parse_ok(text: &str, vars: &[&str]) -> Vec<Token> {
        parse(text, vars).unwrap().tokens
    }

    fn valops(tokens: &[Token]) -> Vec<Valop> {
        tokens.iter().map(|t| t.valop).collect()
    }

    #[test]
    fn test_rpn_order_and_positions() {
        let tokens = parse_ok("1 + 2*3.5e2", &[]);
        assert_eq!(
            tokens,
            vec![
                Token::new(Valop::Val(1.0), 0),
                Token::new(Valop::Val(2.0), 4),
                Token::new(Valop::Val(350.0), 6),
                Token::new(Valop::Op(MUL), 5),
                Token::new(Valop::Op(ADD), 2),
            ]
        );
    }

    #[test]
    fn test_brackets_reorder() {
        let tokens = parse_ok("(1 + 2) * 3", &[]);
        assert_eq!(
            valops(&tokens),
            vec![
                Valop::Val(1.0),
                Valop::Val(2.0),
                Valop::Op(ADD),
                Valop::Val(3.0),
                Valop::Op(MUL),
            ]
        );
    }

    #[test]
    fn test_unary_compiles_to_postfix() {
        let tokens = parse_ok("sin(0.5)", &[]);
        assert_eq!(
            valops(&tokens),
            vec![Valop::Val(0.5), Valop::Op(ops::UNARY + unary::SIN)]
        );
    }

    #[test]
    fn test_variables_resolve_in_order() {
        let tokens = parse_ok("y + x", &["x", "y"]);
        assert_eq!(
            valops(&tokens),
            vec![Valop::Ref(1), Valop::Ref(0), Valop::Op(ADD)]
        );
    }

    #[test]
    fn test_variable_shadows_constant() {
        let tokens = parse_ok("e", &["e"]);
        assert_eq!(valops(&tokens), vec![Valop::Ref(0)]);
        // without the variable, e is the elementary charge with a unit
        let tokens = parse_ok("e", &[]);
        assert_matches!(tokens[1].valop, Valop::Unit(12));
    }

    #[test]
    fn test_no_push_tokens_survive() {
        let tokens = parse_ok("max(1, 2, 3, 4)", &[]);
        assert!(tokens.iter().all(|t| t.valop != Valop::Op(ops::PSH)));
        // the count sits right after the function opcode
        assert_eq!(
            valops(&tokens),
            vec![
                Valop::Val(1.0),
                Valop::Val(2.0),
                Valop::Val(3.0),
                Valop::Val(4.0),
                Valop::Op(ops::NARG + narg::MAX),
                Valop::Nargc(4),
            ]
        );
    }

    #[test]
    fn test_fixed_arity_has_no_count() {
        let tokens = parse_ok("atan2(1, 2)", &[]);
        assert_eq!(
            valops(&tokens),
            vec![
                Valop::Val(1.0),
                Valop::Val(2.0),
                Valop::Op(ops::NARG + narg::ATAN2)
            ]
        );
    }

    #[test]
    fn test_comma_outside_call_pops() {
        let tokens = parse_ok("1, 2", &[]);
        assert_eq!(
            valops(&tokens),
            vec![Valop::Val(1.0), Valop::Val(2.0), Valop::Op(POP)]
        );
        let tokens = parse_ok("(1, 2)", &[]);
        assert_eq!(
            valops(&tokens),
            vec![Valop::Val(1.0), Valop::Val(2.0), Valop::Op(POP)]
        );
    }

    #[test]
    fn test_assignment_emits_trailing_ref() {
        let tokens = parse_ok("x = 3", &["x"]);
        assert_eq!(
            valops(&tokens),
            vec![Valop::Val(3.0), Valop::Op(SET), Valop::Ref(0)]
        );
    }

    #[test]
    fn test_assignment_to_high_index_variable() {
        let tokens = parse_ok("d = 1", &["a", "b", "c", "d", "e"]);
        assert_eq!(
            valops(&tokens),
            vec![Valop::Val(1.0), Valop::Op(SET), Valop::Ref(3)]
        );
    }

    #[test]
    fn test_leading_minus_multiplies() {
        let tokens = parse_ok("-x", &["x"]);
        assert_eq!(
            valops(&tokens),
            vec![Valop::Val(-1.0), Valop::Ref(0), Valop::Op(MUL)]
        );
    }

    #[test]
    fn test_hanging_unit_inserts_one() {
        let tokens = parse_ok("3.1 V/A", &[]);
        assert_eq!(
            valops(&tokens),
            vec![
                Valop::Val(3.1),
                Valop::Unit(13),
                Valop::Prefix(1.0),
                Valop::Unit(2),
                Valop::Op(ops::DIV),
            ]
        );
    }

    #[test]
    fn test_prefixed_unit() {
        let tokens = parse_ok("1 mm", &[]);
        assert_eq!(
            valops(&tokens),
            vec![
                Valop::Val(1.0),
                Valop::Prefix(1e-3),
                Valop::Unit(1),
                Valop::Op(MUL),
            ]
        );
    }

    #[test]
    fn test_target_unit_clause() {
        let parsed = parse("100 degC # degF", &[]).unwrap();
        let target = parsed.target.unwrap();
        assert_eq!(target.text, "degF");
        assert!((target.scale - 5.0 / 9.0).abs() < 1e-12);
    }

    #[test]
    fn test_errors() {
        assert_eq!(
            parse("1 +", &[]).unwrap_err(),
            EqError::new(ErrorKind::NumberExpected, 2)
        );
        assert_eq!(
            parse("(1+2", &[]).unwrap_err().kind,
            ErrorKind::BracketsOpen
        );
        assert_eq!(
            parse("sin", &[]).unwrap_err().kind,
            ErrorKind::BracketExpected
        );
        assert_eq!(
            parse("sin 2", &[]).unwrap_err().kind,
            ErrorKind::BracketExpected
        );
        assert_eq!(
            parse("atan2(1)", &[]).unwrap_err().kind,
            ErrorKind::NargBadCount
        );
        assert_eq!(
            parse("max()", &[]).unwrap_err().kind,
            ErrorKind::NargBadCount
        );
        assert_eq!(
            parse("sin(1, 2)", &[]).unwrap_err().kind,
            ErrorKind::NargBadCount
        );
        assert_eq!(
            parse("bogus(2)", &[]).unwrap_err(),
            EqError::new(ErrorKind::UnknownIdent, 0)
        );
        assert_eq!(
            parse("1 ) + 2", &[]).unwrap_err().kind,
            ErrorKind::UnopenedBracket
        );
        assert_eq!(
            parse("2 = 3", &[]).unwrap_err().kind,
            ErrorKind::AssignNotVar
        );
        assert_eq!(parse("1 @ 2", &[]).unwrap_err().kind, ErrorKind::IllegalChar);
        assert_eq!(parse("", &[]).unwrap_err().kind, ErrorKind::NumberExpected);
        assert_eq!(
            parse("1 2", &[]).unwrap_err().kind,
            ErrorKind::BinaryOpExpected
        );
    }

    #[test]
    fn test_relational_chain_stays_left_associative() {
        // (1 < 2) == 1, not 1 < (2 == 1)
        let tokens = parse_ok("1 < 2 == 1", &[]);
        assert_eq!(
            valops(&tokens),
            vec![
                Valop::Val(1.0),
                Valop::Val(2.0),
                Valop::Op(ops::LT),
                Valop::Val(1.0),
                Valop::Op(ops::EQ),
            ]
        );
    }

    #[test]
    fn test_reparse_is_stable() {
        let once = parse_ok("max(1, x^2, sin(pi/2)) # mm", &["x"]);
        let twice = parse_ok("max(1, x^2, sin(pi/2)) # mm", &["x"]);
        assert_eq!(once, twice);
    }
}

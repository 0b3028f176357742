use dimex::{Equation, Valop};
use proptest::prelude::*;

proptest! {
    // parsing arbitrary printable input must never panic; it may only
    // return an error with an offset inside the source
    #[test]
    fn parse_never_panics(src in "[ -~]{0,48}") {
        let mut eq = Equation::new();
        if let Err(e) = eq.parse(&src, &["x", "y"]) {
            prop_assert!(e.pos <= src.len());
        }
    }

    // whatever parses once parses identically again
    #[test]
    fn parse_is_deterministic(src in "[ -~]{0,48}") {
        let mut first = Equation::new();
        let mut second = Equation::new();
        let a = first.parse(&src, &["x", "y"]);
        let b = second.parse(&src, &["x", "y"]);
        prop_assert_eq!(a, b);
        if a.is_ok() {
            prop_assert_eq!(first.tokens(), second.tokens());
        }
    }

    // a parse that succeeds leaves no push opcodes behind
    #[test]
    fn no_push_tokens(src in "[ -~]{0,48}") {
        let mut eq = Equation::new();
        if eq.parse(&src, &["x", "y"]).is_ok() {
            prop_assert!(eq
                .tokens()
                .iter()
                .all(|t| t.valop != Valop::Op(dimex::ops::PSH)));
        }
    }

    // pure arithmetic over in-range values evaluates cleanly
    #[test]
    fn arithmetic_is_sound(x in -1e3f64..1e3, y in 0.001f64..1e3) {
        let mut eq = Equation::new();
        eq.parse("x*y + x/y - y", &["x", "y"]).unwrap();
        let ans = eq.evaluate(&[x, y], false).unwrap();
        prop_assert!((ans.value - (x * y + x / y - y)).abs() < 1e-9);
        prop_assert_eq!(ans.unit.as_str(), "");
    }

    // scaling a dimensioned quantity scales the answer, the unit stays
    #[test]
    fn unit_output_scales_linearly(x in 0.001f64..1e3) {
        let mut eq = Equation::new();
        eq.parse("x m / 1 s", &["x"]).unwrap();
        let one = eq.evaluate(&[1.0], false).unwrap();
        let scaled = eq.evaluate(&[x], false).unwrap();
        prop_assert!((scaled.value - x * one.value).abs() < 1e-9 * x.max(1.0));
        prop_assert_eq!(one.unit, scaled.unit);
    }
}

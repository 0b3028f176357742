use ::serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::Equation;

/// An equation serializes as the pair `(source, variable names)`;
/// deserialization re-parses, so the compiled token array is never part
/// of the wire format.
impl Serialize for Equation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (self.source(), self.var_names()).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Equation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (src, vars) = <(String, Vec<String>)>::deserialize(deserializer)?;
        let var_refs: Vec<&str> = vars.iter().map(|s| s.as_str()).collect();
        let mut eq = Equation::new();
        eq.parse(&src, &var_refs)
            .map_err(|e| de::Error::custom(format!("re-parse failed - {}", e)))?;
        Ok(eq)
    }
}

#[cfg(test)]
use serde_test::Token;

#[test]
fn test_ser_de() {
    let mut eq = Equation::new();
    eq.parse("x + sin(pi * y)", &["x", "y"]).unwrap();
    serde_test::assert_ser_tokens(
        &eq,
        &[
            Token::Tuple { len: 2 },
            Token::Str("x + sin(pi * y)"),
            Token::Seq { len: Some(2) },
            Token::Str("x"),
            Token::Str("y"),
            Token::SeqEnd,
            Token::TupleEnd,
        ],
    );

    let serialized = serde_json::to_string(&eq).unwrap();
    let mut deserialized = serde_json::from_str::<Equation>(serialized.as_str()).unwrap();
    assert_eq!(format!("{}", deserialized), "x + sin(pi * y)");
    let ans = deserialized.evaluate(&[5.0, 0.25], false).unwrap();
    assert!((ans.value - 5.7071067811865475).abs() < 1e-12);
}

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref RE_NUMBER: Regex =
        Regex::new(r"^([0-9]+\.?[0-9]*|\.[0-9]+)([eE][+-]?[0-9]+)?").unwrap();
}

/// Scans a numeric literal at the start of `text` and returns its value
/// and consumed length.
pub(crate) fn scan_number(text: &str) -> Option<(f64, usize)> {
    let m = RE_NUMBER.find(text)?;
    let parsed = m.as_str().parse::<f64>();
    parsed.ok().map(|v| (v, m.end()))
}

/// Length of the run of ASCII letters at the start of `text`; unit atoms
/// are drawn from letters only.
pub(crate) fn scan_letters(text: &str) -> usize {
    text.bytes().take_while(|b| b.is_ascii_alphabetic()).count()
}

/// Formats like C's `%lg`: six significant digits, fixed notation for
/// exponents in `[-4, 6)`, scientific otherwise, trailing zeros trimmed.
pub(crate) fn format_lg(v: f64) -> String {
    if v == 0.0 {
        return "0".to_string();
    }
    if v.is_nan() {
        return "nan".to_string();
    }
    if v.is_infinite() {
        return if v < 0.0 { "-inf" } else { "inf" }.to_string();
    }
    let sci = format!("{:.5e}", v);
    let (mant, exp) = match sci.split_once('e') {
        Some(parts) => parts,
        None => return sci,
    };
    let exp: i32 = exp.parse().unwrap_or(0);
    if (-4..6).contains(&exp) {
        let prec = (5 - exp).max(0) as usize;
        trim_zeros(format!("{:.*}", prec, v))
    } else {
        let m = trim_zeros(mant.to_string());
        format!("{}e{}{:02}", m, if exp < 0 { '-' } else { '+' }, exp.abs())
    }
}

fn trim_zeros(s: String) -> String {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_number() {
        assert_eq!(scan_number("5/6"), Some((5.0, 1)));
        assert_eq!(scan_number("23.414"), Some((23.414, 6)));
        assert_eq!(scan_number(".5+1"), Some((0.5, 2)));
        assert_eq!(scan_number("4."), Some((4.0, 2)));
        assert_eq!(scan_number("3.5e2*"), Some((350.0, 5)));
        assert_eq!(scan_number("1E-3"), Some((1e-3, 4)));
        assert_eq!(scan_number("."), None);
        assert_eq!(scan_number("x4"), None);
    }

    #[test]
    fn test_format_lg() {
        assert_eq!(format_lg(0.0), "0");
        assert_eq!(format_lg(2.0), "2");
        assert_eq!(format_lg(-1.0), "-1");
        assert_eq!(format_lg(0.5), "0.5");
        assert_eq!(format_lg(100.0), "100");
        assert_eq!(format_lg(0.0001), "0.0001");
        assert_eq!(format_lg(1e-5), "1e-05");
        assert_eq!(format_lg(1e21), "1e+21");
        assert_eq!(format_lg(123456789.0), "1.23457e+08");
        assert_eq!(format_lg(3.25e-5), "3.25e-05");
    }
}

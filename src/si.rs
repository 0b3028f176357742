//! Static SI catalogs: units, prefixes, and named physical constants.
//!
//! The unit table is ordered base units first, then derived units, then
//! input-only units, then the composite units attached to dimensioned
//! constants. Earlier rows take precedence when matching input, and
//! compiled `Unit` tokens index into this table.

/// Number of SI base dimensions: kg, m, A, s, K, mol, cd.
pub const NUM_BASE: usize = 7;
/// Base plus derived units, the candidates for output formatting.
pub const NUM_NAMED: usize = 16;
/// Units recognized in input, including input-only conversions.
pub const NUM_INPUT: usize = 26;

/// One row of the unit table: dimension exponents plus the affine map
/// into base units (`scale * x + offset`).
pub struct UnitRow {
    pub name: &'static str,
    pub dims: [f64; NUM_BASE],
    pub scale: f64,
    pub offset: f64,
}

const fn row(name: &'static str, dims: [f64; NUM_BASE], scale: f64, offset: f64) -> UnitRow {
    UnitRow {
        name,
        dims,
        scale,
        offset,
    }
}

pub static UNITS: [UnitRow; NUM_INPUT + 8] = [
    //              kg    m    A    s    K   mol  cd
    // SI base units
    row("kg", [1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0], 1.0, 0.0),
    row("m", [0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0], 1.0, 0.0),
    row("A", [0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0], 1.0, 0.0),
    row("s", [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0], 1.0, 0.0),
    row("K", [0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0], 1.0, 0.0),
    row("mol", [0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0], 1.0, 0.0),
    row("cd", [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0], 1.0, 0.0),
    // SI derived units
    row("W", [1.0, 2.0, 0.0, -3.0, 0.0, 0.0, 0.0], 1.0, 0.0),
    row("J", [1.0, 2.0, 0.0, -2.0, 0.0, 0.0, 0.0], 1.0, 0.0),
    row("Pa", [1.0, -1.0, 0.0, -2.0, 0.0, 0.0, 0.0], 1.0, 0.0),
    row("N", [1.0, 1.0, 0.0, -2.0, 0.0, 0.0, 0.0], 1.0, 0.0),
    row("Hz", [0.0, 0.0, 0.0, -1.0, 0.0, 0.0, 0.0], 1.0, 0.0),
    row("C", [0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 0.0], 1.0, 0.0),
    row("V", [1.0, 2.0, -1.0, -3.0, 0.0, 0.0, 0.0], 1.0, 0.0),
    row("F", [-1.0, -2.0, 2.0, 4.0, 0.0, 0.0, 0.0], 1.0, 0.0),
    row("Ohm", [1.0, 2.0, -2.0, -3.0, 0.0, 0.0, 0.0], 1.0, 0.0),
    // input-only units
    row("g", [1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0], 1.0e-3, 0.0),
    row("L", [0.0, 3.0, 0.0, 0.0, 0.0, 0.0, 0.0], 1.0e-3, 0.0),
    row("degC", [0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0], 1.0, 273.15),
    row(
        "degF",
        [0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0],
        5.0 / 9.0,
        273.15 - 5.0 / 9.0 * 32.0,
    ),
    row("mi", [0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0], 1609.344, 0.0),
    row("nmi", [0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0], 1852.0, 0.0),
    row("yd", [0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0], 0.9144, 0.0),
    row("ft", [0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0], 0.3048, 0.0),
    row("in", [0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0], 2.54e-2, 0.0),
    row("eV", [1.0, 2.0, 0.0, -2.0, 0.0, 0.0, 0.0], 1.60217646e-19, 0.0),
    // units of dimensioned constants, never matched in input
    row("m/s", [0.0, 1.0, 0.0, -1.0, 0.0, 0.0, 0.0], 1.0, 0.0),
    row("F/m", [-1.0, -3.0, 2.0, 4.0, 0.0, 0.0, 0.0], 1.0, 0.0),
    row("N/A2", [1.0, 1.0, -2.0, -2.0, 0.0, 0.0, 0.0], 1.0, 0.0),
    row("m3/kg s2", [-1.0, 3.0, 0.0, -2.0, 0.0, 0.0, 0.0], 1.0, 0.0),
    row("J s", [1.0, 2.0, 0.0, -1.0, 0.0, 0.0, 0.0], 1.0, 0.0),
    row("/mol", [0.0, 0.0, 0.0, 0.0, 0.0, -1.0, 0.0], 1.0, 0.0),
    row("J/K", [1.0, 2.0, 0.0, -2.0, -1.0, 0.0, 0.0], 1.0, 0.0),
    row("J/K mol", [1.0, 2.0, 0.0, -2.0, -1.0, -1.0, 0.0], 1.0, 0.0),
];

/// SI prefixes accepted in front of unit names.
pub static PREFIXES: [(char, f64); 11] = [
    ('T', 1e12),
    ('G', 1e9),
    ('M', 1e6),
    ('k', 1e3),
    ('h', 100.0),
    ('c', 0.01),
    ('m', 1e-3),
    ('u', 1e-6),
    ('n', 1e-9),
    ('p', 1e-12),
    ('f', 1e-15),
];

pub fn prefix_value(c: char) -> Option<f64> {
    PREFIXES.iter().find(|(p, _)| *p == c).map(|(_, v)| *v)
}

/// A named physical constant, optionally carrying a unit-table index.
pub struct ConstRow {
    pub name: &'static str,
    pub value: f64,
    pub unit: Option<usize>,
}

const fn cnst(name: &'static str, value: f64, unit: Option<usize>) -> ConstRow {
    ConstRow { name, value, unit }
}

use std::f64::consts::PI;

pub static CONSTANTS: [ConstRow; 17] = [
    cnst("pi", PI, None),
    cnst("c", 299792458.0, Some(NUM_INPUT)),          // m/s
    cnst("Z0", 376.730313461, Some(15)),              // Ohm
    cnst("e0", 8.854187817e-12, Some(NUM_INPUT + 1)), // F/m
    cnst("mu0", 4e-7 * PI, Some(NUM_INPUT + 2)),      // N/A2
    cnst("G", 6.67428e-11, Some(NUM_INPUT + 3)),      // m3/kg s2
    cnst("h", 6.62606896e-34, Some(NUM_INPUT + 4)),   // J s
    cnst("hbar", 6.62606896e-34 / (2.0 * PI), Some(NUM_INPUT + 4)),
    cnst("e", 1.602176487e-19, Some(12)), // C
    cnst("m_alpha", 6.64465620e-27, Some(0)),
    cnst("m_e", 9.10938215e-31, Some(0)),
    cnst("m_n", 1.674927211e-27, Some(0)),
    cnst("m_p", 1.672621637e-27, Some(0)),
    cnst("m_u", 1.660538782e-27, Some(0)),
    cnst("N_A", 6.02214179e23, Some(NUM_INPUT + 5)), // /mol
    cnst("kB", 1.3806504e-23, Some(NUM_INPUT + 6)),  // J/K
    cnst("R", 8.314472, Some(NUM_INPUT + 7)),        // J/K mol
];

pub fn find_constant(name: &str) -> Option<&'static ConstRow> {
    CONSTANTS.iter().find(|c| c.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_shape() {
        assert_eq!(UNITS.len(), NUM_INPUT + 8);
        assert_eq!(UNITS[15].name, "Ohm");
        assert_eq!(UNITS[18].name, "degC");
        assert_eq!(UNITS[18].offset, 273.15);
    }

    #[test]
    fn test_degf_maps_to_kelvin() {
        let degf = &UNITS[19];
        // 32 degF is the freezing point
        assert!((degf.scale * 32.0 + degf.offset - 273.15).abs() < 1e-9);
        // 212 degF is the boiling point
        assert!((degf.scale * 212.0 + degf.offset - 373.15).abs() < 1e-9);
    }

    #[test]
    fn test_constants() {
        assert_eq!(find_constant("pi").unwrap().unit, None);
        assert_eq!(find_constant("c").unwrap().value, 299792458.0);
        let hbar = find_constant("hbar").unwrap();
        assert_eq!(UNITS[hbar.unit.unwrap()].name, "J s");
        assert!(find_constant("q").is_none());
    }
}

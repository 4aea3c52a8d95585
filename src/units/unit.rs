//! Unit strings and dimension checking.
//!
//! Grammar accepted by the parser (enough for the IPAC/ECSV tables we read):
//!
//! - space or `*` separated factors: `erg cm-2 s-1`, `cm**-2 * s**-1`
//! - exponents written as `cm2`, `cm-2`, `cm^2` or `cm**2`
//! - `/` divides by everything after it, with optional parentheses:
//!   `1/(cm2 s TeV)`, `erg/cm2/s`
//! - bare numbers act as scale factors: `1e-12 erg/(cm2 s)`

use std::fmt;
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::constants::{ERG_PER_EV, PARSEC_CM};

/// Errors produced while parsing or checking units.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum UnitError {
    #[error("empty unit string")]
    Empty,
    #[error("unknown unit symbol '{0}'")]
    UnknownSymbol(String),
    #[error("invalid exponent in unit factor '{0}'")]
    BadExponent(String),
    #[error("unit '{unit}' is not a valid {expected} unit")]
    DimensionMismatch { unit: String, expected: &'static str },
    #[error("unit '{0}' is neither a differential flux nor an energy flux")]
    NotAFlux(String),
}

/// Exponents of the base dimensions (energy, length, time, magnetic field,
/// temperature).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Dimension {
    pub energy: i8,
    pub length: i8,
    pub time: i8,
    pub field: i8,
    pub temperature: i8,
}

impl Dimension {
    pub const NONE: Dimension = Dimension::new(0, 0, 0, 0, 0);

    pub const fn new(energy: i8, length: i8, time: i8, field: i8, temperature: i8) -> Self {
        Self {
            energy,
            length,
            time,
            field,
            temperature,
        }
    }

    /// `self + power · other`, or `None` if an exponent leaves the `i8` range.
    fn add_scaled(self, other: Dimension, power: i8) -> Option<Dimension> {
        let add = |own: i8, theirs: i8| theirs.checked_mul(power).and_then(|v| own.checked_add(v));
        Some(Dimension {
            energy: add(self.energy, other.energy)?,
            length: add(self.length, other.length)?,
            time: add(self.time, other.time)?,
            field: add(self.field, other.field)?,
            temperature: add(self.temperature, other.temperature)?,
        })
    }
}

/// A physical kind: ties a marker type to its dimension and base unit.
pub trait Kind: Copy + fmt::Debug + PartialEq + Send + Sync + 'static {
    const DIMENSION: Dimension;
    /// Human-readable name used in error messages.
    const NAME: &'static str;
    /// Symbol of the canonical base unit.
    const BASE_SYMBOL: &'static str;
}

macro_rules! kind {
    ($(#[$doc:meta])* $name:ident, $dim:expr, $label:literal, $base:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
        pub struct $name;

        impl Kind for $name {
            const DIMENSION: Dimension = $dim;
            const NAME: &'static str = $label;
            const BASE_SYMBOL: &'static str = $base;
        }
    };
}

kind!(
    /// Energy, base unit eV.
    Energy, Dimension::new(1, 0, 0, 0, 0), "energy", "eV"
);
kind!(
    /// Length, base unit cm.
    Length, Dimension::new(0, 1, 0, 0, 0), "length", "cm"
);
kind!(
    /// Magnetic field strength, base unit G.
    MagneticField, Dimension::new(0, 0, 0, 1, 0), "magnetic field", "G"
);
kind!(
    /// Temperature, base unit K.
    Temperature, Dimension::new(0, 0, 0, 0, 1), "temperature", "K"
);
kind!(
    /// Differential photon flux dN/dE, base unit 1/(cm2 s eV).
    DifferentialFlux, Dimension::new(-1, -2, -1, 0, 0), "differential flux", "1/(cm2 s eV)"
);
kind!(
    /// Energy flux (SED form E²dN/dE), base unit eV/(cm2 s).
    EnergyFlux, Dimension::new(1, -2, -1, 0, 0), "energy flux", "eV/(cm2 s)"
);
kind!(
    /// Energy density, base unit eV/cm3.
    EnergyDensity, Dimension::new(1, -3, 0, 0, 0), "energy density", "eV/cm3"
);
kind!(
    /// Particle number per unit energy, base unit 1/eV.
    InverseEnergy, Dimension::new(-1, 0, 0, 0, 0), "inverse energy", "1/eV"
);

/// A unit of kind `K`: its display symbol and its size in base units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Unit<K: Kind> {
    symbol: String,
    scale: f64,
    #[serde(skip)]
    kind: PhantomData<K>,
}

impl<K: Kind> Unit<K> {
    /// Parse a unit string and check it has the dimension of `K`.
    pub fn parse(text: &str) -> Result<Self, UnitError> {
        let parsed = parse_unit(text)?;
        if parsed.dimension != K::DIMENSION {
            return Err(UnitError::DimensionMismatch {
                unit: text.trim().to_string(),
                expected: K::NAME,
            });
        }
        Ok(Self::from_scale(text.trim(), parsed.scale))
    }

    /// The canonical base unit of `K`.
    pub fn base() -> Self {
        Self::from_scale(K::BASE_SYMBOL, 1.0)
    }

    fn from_scale(symbol: &str, scale: f64) -> Self {
        Self {
            symbol: symbol.to_string(),
            scale,
            kind: PhantomData,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Size of one of this unit in base units.
    pub fn scale(&self) -> f64 {
        self.scale
    }
}

impl<K: Kind> fmt::Display for Unit<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol)
    }
}

impl Unit<Energy> {
    pub fn ev() -> Self {
        Self::base()
    }
    pub fn kev() -> Self {
        Self::from_scale("keV", 1e3)
    }
    pub fn mev() -> Self {
        Self::from_scale("MeV", 1e6)
    }
    pub fn gev() -> Self {
        Self::from_scale("GeV", 1e9)
    }
    pub fn tev() -> Self {
        Self::from_scale("TeV", 1e12)
    }
    pub fn erg() -> Self {
        Self::from_scale("erg", 1.0 / ERG_PER_EV)
    }
}

impl Unit<Length> {
    pub fn cm() -> Self {
        Self::base()
    }
    pub fn kpc() -> Self {
        Self::from_scale("kpc", PARSEC_CM * 1e3)
    }
}

impl Unit<MagneticField> {
    pub fn gauss() -> Self {
        Self::base()
    }
    pub fn microgauss() -> Self {
        Self::from_scale("uG", 1e-6)
    }
}

impl Unit<EnergyDensity> {
    pub fn ev_per_cm3() -> Self {
        Self::base()
    }
    pub fn erg_per_cm3() -> Self {
        Self::from_scale("erg/cm3", 1.0 / ERG_PER_EV)
    }
}

impl Unit<InverseEnergy> {
    pub fn per_ev() -> Self {
        Self::base()
    }
}

impl Unit<Temperature> {
    pub fn kelvin() -> Self {
        Self::base()
    }
}

impl Unit<DifferentialFlux> {
    /// `1/(cm2 s <energy>)` for the given energy unit.
    pub fn per_energy(energy: &Unit<Energy>) -> Self {
        Self::from_scale(&format!("1/(cm2 s {})", energy.symbol), 1.0 / energy.scale)
    }
}

impl Unit<EnergyFlux> {
    pub fn erg_per_cm2_s() -> Self {
        Self::from_scale("erg/(cm2 s)", 1.0 / ERG_PER_EV)
    }

    /// `<energy>/(cm2 s)` for the given energy unit.
    pub fn energy_per_cm2_s(energy: &Unit<Energy>) -> Self {
        Self::from_scale(&format!("{}/(cm2 s)", energy.symbol), energy.scale)
    }
}

/// Flux column unit: either differential (dN/dE) or SED form (E²dN/dE).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FluxUnit {
    Differential(Unit<DifferentialFlux>),
    Sed(Unit<EnergyFlux>),
}

impl FluxUnit {
    pub fn parse(text: &str) -> Result<Self, UnitError> {
        let parsed = parse_unit(text)?;
        let symbol = text.trim();
        if parsed.dimension == DifferentialFlux::DIMENSION {
            Ok(FluxUnit::Differential(Unit::from_scale(symbol, parsed.scale)))
        } else if parsed.dimension == EnergyFlux::DIMENSION {
            Ok(FluxUnit::Sed(Unit::from_scale(symbol, parsed.scale)))
        } else {
            Err(UnitError::NotAFlux(symbol.to_string()))
        }
    }

    pub fn is_sed(&self) -> bool {
        matches!(self, FluxUnit::Sed(_))
    }

    pub fn symbol(&self) -> &str {
        match self {
            FluxUnit::Differential(u) => u.symbol(),
            FluxUnit::Sed(u) => u.symbol(),
        }
    }

    /// Convert a value in this unit, at photon energy `energy_ev`, into
    /// differential flux in 1/(cm2 s eV).
    pub fn to_differential_base(&self, value: f64, energy_ev: f64) -> f64 {
        match self {
            FluxUnit::Differential(u) => value * u.scale,
            FluxUnit::Sed(u) => value * u.scale / (energy_ev * energy_ev),
        }
    }

    /// Inverse of [`FluxUnit::to_differential_base`].
    pub fn from_differential_base(&self, value: f64, energy_ev: f64) -> f64 {
        match self {
            FluxUnit::Differential(u) => value / u.scale,
            FluxUnit::Sed(u) => value * energy_ev * energy_ev / u.scale,
        }
    }

    /// The same physical unit family expressed in the other form, built on
    /// `energy` (e.g. `1/(cm2 s TeV)` <-> `TeV/(cm2 s)`).
    pub fn with_form(&self, sed: bool, energy: &Unit<Energy>) -> FluxUnit {
        match (self, sed) {
            (FluxUnit::Sed(_), true) | (FluxUnit::Differential(_), false) => self.clone(),
            (FluxUnit::Differential(_), true) => FluxUnit::Sed(Unit::energy_per_cm2_s(energy)),
            (FluxUnit::Sed(_), false) => FluxUnit::Differential(Unit::per_energy(energy)),
        }
    }
}

impl fmt::Display for FluxUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

#[derive(Debug, Clone, Copy)]
struct ParsedUnit {
    scale: f64,
    dimension: Dimension,
}

fn symbol_table(symbol: &str) -> Option<(f64, Dimension)> {
    const E: Dimension = Dimension::new(1, 0, 0, 0, 0);
    const L: Dimension = Dimension::new(0, 1, 0, 0, 0);
    const T: Dimension = Dimension::new(0, 0, 1, 0, 0);
    const B: Dimension = Dimension::new(0, 0, 0, 1, 0);
    const K: Dimension = Dimension::new(0, 0, 0, 0, 1);

    let entry = match symbol {
        "eV" => (1.0, E),
        "keV" => (1e3, E),
        "MeV" => (1e6, E),
        "GeV" => (1e9, E),
        "TeV" => (1e12, E),
        "PeV" => (1e15, E),
        "erg" => (1.0 / ERG_PER_EV, E),
        "J" => (1e7 / ERG_PER_EV, E),

        "cm" => (1.0, L),
        "mm" => (0.1, L),
        "m" => (100.0, L),
        "km" => (1e5, L),
        "pc" => (PARSEC_CM, L),
        "kpc" => (PARSEC_CM * 1e3, L),
        "Mpc" => (PARSEC_CM * 1e6, L),

        "s" => (1.0, T),

        "G" => (1.0, B),
        "mG" => (1e-3, B),
        "uG" | "µG" | "μG" => (1e-6, B),
        "nG" => (1e-9, B),
        "T" => (1e4, B),

        "K" => (1.0, K),

        // Counts carry no dimension.
        "ph" | "photon" | "photons" | "ct" | "count" | "counts" => (1.0, Dimension::NONE),
        _ => return None,
    };
    Some(entry)
}

fn parse_unit(text: &str) -> Result<ParsedUnit, UnitError> {
    let normalized = text.trim().replace("**", "^");
    if normalized.is_empty() {
        return Err(UnitError::Empty);
    }

    let mut out = ParsedUnit {
        scale: 1.0,
        dimension: Dimension::NONE,
    };

    for (i, segment) in normalized.split('/').enumerate() {
        let sign: i8 = if i == 0 { 1 } else { -1 };
        let cleaned: String = segment
            .chars()
            .map(|c| if matches!(c, '(' | ')' | '*') { ' ' } else { c })
            .collect();
        let mut factors = 0usize;
        for token in cleaned.split_whitespace() {
            apply_factor(&mut out, token, sign)?;
            factors += 1;
        }
        if factors == 0 {
            return Err(UnitError::UnknownSymbol(text.trim().to_string()));
        }
    }

    Ok(out)
}

fn apply_factor(out: &mut ParsedUnit, token: &str, sign: i8) -> Result<(), UnitError> {
    let starts_numeric = token
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit() || matches!(c, '.' | '+' | '-'));
    if starts_numeric {
        let value: f64 = token
            .parse()
            .map_err(|_| UnitError::UnknownSymbol(token.to_string()))?;
        if !value.is_finite() || value == 0.0 {
            return Err(UnitError::UnknownSymbol(token.to_string()));
        }
        out.scale *= value.powi(i32::from(sign));
        return Ok(());
    }

    let split = token
        .char_indices()
        .find(|(_, c)| !c.is_alphabetic())
        .map(|(i, _)| i)
        .unwrap_or(token.len());
    let (symbol, rest) = token.split_at(split);
    let rest = rest.strip_prefix('^').unwrap_or(rest);
    let power: i8 = if rest.is_empty() {
        1
    } else {
        rest.parse()
            .map_err(|_| UnitError::BadExponent(token.to_string()))?
    };

    let (scale, dimension) =
        symbol_table(symbol).ok_or_else(|| UnitError::UnknownSymbol(symbol.to_string()))?;
    let overflow = || UnitError::BadExponent(token.to_string());
    let power = power.checked_mul(sign).ok_or_else(overflow)?;
    out.dimension = out.dimension.add_scaled(dimension, power).ok_or_else(overflow)?;
    out.scale *= scale.powi(i32::from(power));
    Ok(())
}

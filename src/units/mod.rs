//! Typed physical quantities.
//!
//! Values are stored in a fixed set of base units (eV, cm, s, G, K) and tagged
//! with a zero-sized kind marker, so an energy can never be passed where a
//! magnetic field is expected. Unit strings found in data files are parsed
//! once into a `Unit<K>` (or a `FluxUnit`) and checked against the kind.

pub mod constants;
pub mod quantity;
pub mod unit;

pub use quantity::*;
pub use unit::*;

use std::fmt;
use std::marker::PhantomData;
use std::ops::{Add, Div, Mul, Sub};

use serde::{Deserialize, Serialize};

use super::unit::{Kind, Unit};

/// A value of kind `K`, stored in the kind's base unit.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Quantity<K: Kind> {
    base: f64,
    #[serde(skip)]
    kind: PhantomData<K>,
}

impl<K: Kind> Quantity<K> {
    pub fn new(value: f64, unit: &Unit<K>) -> Self {
        Self::from_base(value * unit.scale())
    }

    pub fn from_base(base: f64) -> Self {
        Self {
            base,
            kind: PhantomData,
        }
    }

    /// Value in the base unit of `K`.
    pub fn base(&self) -> f64 {
        self.base
    }

    pub fn value_in(&self, unit: &Unit<K>) -> f64 {
        self.base / unit.scale()
    }

    /// Numeric value together with the unit it is expressed in.
    pub fn to(&self, unit: &Unit<K>) -> (f64, Unit<K>) {
        (self.value_in(unit), unit.clone())
    }

    pub fn is_finite(&self) -> bool {
        self.base.is_finite()
    }
}

impl<K: Kind> Add for Quantity<K> {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::from_base(self.base + rhs.base)
    }
}

impl<K: Kind> Sub for Quantity<K> {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::from_base(self.base - rhs.base)
    }
}

impl<K: Kind> Mul<f64> for Quantity<K> {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self {
        Self::from_base(self.base * rhs)
    }
}

impl<K: Kind> Div<f64> for Quantity<K> {
    type Output = Self;
    fn div(self, rhs: f64) -> Self {
        Self::from_base(self.base / rhs)
    }
}

/// Ratio of two quantities of the same kind.
impl<K: Kind> Div for Quantity<K> {
    type Output = f64;
    fn div(self, rhs: Self) -> f64 {
        self.base / rhs.base
    }
}

impl<K: Kind> fmt::Display for Quantity<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6e} {}", self.base, K::BASE_SYMBOL)
    }
}

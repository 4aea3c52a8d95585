//! Validated spectral data (energy, flux, asymmetric errors, upper limits).
//!
//! A `SpectralTable` is built from a generic [`Table`] and guarantees:
//!
//! - positive, finite energies
//! - finite fluxes
//! - positive, finite flux errors on every row that is not an upper limit
//! - a confidence level `cl` in `(0, 1)` for the upper limits
//!
//! Energies are held as typed quantities; fluxes are held as numbers in the
//! table's `FluxUnit`, because the flux form (differential or SED) matters to
//! the likelihood and the plots.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::data::table::{Column, Table};
use crate::error::AppError;
use crate::units::{Energy, FluxUnit, Quantity, Unit};

/// Upper-limit confidence level used when the table does not state one.
pub const DEFAULT_UL_CL: f64 = 0.9;

/// One spectral measurement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpectralRow {
    pub energy: Quantity<Energy>,
    pub energy_error_lo: Quantity<Energy>,
    pub energy_error_hi: Quantity<Energy>,
    /// Flux in the owning table's flux unit.
    pub flux: f64,
    pub flux_error_lo: f64,
    pub flux_error_hi: f64,
    pub ul: bool,
    /// Index of the input table this row came from.
    pub group: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectralTable {
    energy_unit: Unit<Energy>,
    flux_unit: FluxUnit,
    rows: Vec<SpectralRow>,
    cl: f64,
}

impl SpectralTable {
    pub fn new(
        energy_unit: Unit<Energy>,
        flux_unit: FluxUnit,
        rows: Vec<SpectralRow>,
        cl: f64,
    ) -> Result<Self, AppError> {
        if rows.is_empty() {
            return Err(AppError::new(3, "Spectral table has no rows"));
        }
        if !(cl > 0.0 && cl < 1.0) {
            return Err(AppError::input(format!(
                "Upper-limit confidence level must be in (0, 1), got {cl}"
            )));
        }
        for (i, row) in rows.iter().enumerate() {
            validate_row(i + 1, row)?;
        }
        Ok(Self {
            energy_unit,
            flux_unit,
            rows,
            cl,
        })
    }

    /// Build from a generic table with `energy`, `flux` and flux-error columns.
    pub fn from_table(table: &Table) -> Result<Self, AppError> {
        let energy_col = required(table, "energy")?;
        let energy_unit = Unit::<Energy>::parse(unit_of(energy_col)?)?;
        let flux_col = required(table, "flux")?;
        let flux_unit = FluxUnit::parse(unit_of(flux_col)?)?;

        let energy: Vec<Quantity<Energy>> = energy_col
            .floats()?
            .into_iter()
            .map(|v| Quantity::new(v, &energy_unit))
            .collect();
        let flux = flux_col.floats()?;
        let n = energy.len();
        if n == 0 {
            return Err(AppError::new(3, "Spectral table has no rows"));
        }

        let ul = match table.column("ul") {
            Some(col) => col.bools()?,
            None => vec![false; n],
        };

        let (flux_error_lo, flux_error_hi) = flux_errors(table, &flux_unit, &energy)?;
        let (energy_error_lo, energy_error_hi) = energy_errors(table, &energy_unit, &energy)?;

        let cl = match table.meta_f64("cl")? {
            Some(cl) => cl,
            None => {
                if ul.iter().any(|&u| u) {
                    warn!(
                        "Table has upper limits but no 'cl' keyword; assuming cl = {DEFAULT_UL_CL}"
                    );
                }
                DEFAULT_UL_CL
            }
        };

        let rows = (0..n)
            .map(|i| SpectralRow {
                energy: energy[i],
                energy_error_lo: energy_error_lo[i],
                energy_error_hi: energy_error_hi[i],
                flux: flux[i],
                flux_error_lo: if ul[i] && flux_error_lo[i].is_nan() { 0.0 } else { flux_error_lo[i] },
                flux_error_hi: if ul[i] && flux_error_hi[i].is_nan() { 0.0 } else { flux_error_hi[i] },
                ul: ul[i],
                group: 0,
            })
            .collect();

        Self::new(energy_unit, flux_unit, rows, cl)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[SpectralRow] {
        &self.rows
    }

    pub fn energy_unit(&self) -> &Unit<Energy> {
        &self.energy_unit
    }

    pub fn flux_unit(&self) -> &FluxUnit {
        &self.flux_unit
    }

    pub fn cl(&self) -> f64 {
        self.cl
    }

    pub fn is_sed(&self) -> bool {
        self.flux_unit.is_sed()
    }

    pub fn has_upper_limits(&self) -> bool {
        self.rows.iter().any(|r| r.ul)
    }

    /// Bin energies in eV.
    pub fn energies_ev(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.energy.base()).collect()
    }

    /// Fluxes in the table's flux unit.
    pub fn fluxes(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.flux).collect()
    }

    /// Fluxes converted to differential form in 1/(cm2 s eV).
    pub fn differential_flux_base(&self) -> Vec<f64> {
        self.rows
            .iter()
            .map(|r| self.flux_unit.to_differential_base(r.flux, r.energy.base()))
            .collect()
    }

    /// Re-express every row in other units (flux values, errors included).
    pub fn converted(&self, energy_unit: &Unit<Energy>, flux_unit: &FluxUnit) -> SpectralTable {
        let convert = |value: f64, e: f64| {
            flux_unit.from_differential_base(self.flux_unit.to_differential_base(value, e), e)
        };
        let rows = self
            .rows
            .iter()
            .map(|r| {
                let e = r.energy.base();
                SpectralRow {
                    flux: convert(r.flux, e),
                    flux_error_lo: convert(r.flux_error_lo, e),
                    flux_error_hi: convert(r.flux_error_hi, e),
                    ..*r
                }
            })
            .collect();
        SpectralTable {
            energy_unit: energy_unit.clone(),
            flux_unit: flux_unit.clone(),
            rows,
            cl: self.cl,
        }
    }

    /// SED form (E²dN/dE) in units built on this table's energy unit.
    pub fn to_sed(&self) -> SpectralTable {
        let unit = self.flux_unit.with_form(true, &self.energy_unit);
        self.converted(&self.energy_unit, &unit)
    }

    /// Differential form (dN/dE) in units built on this table's energy unit.
    pub fn to_differential(&self) -> SpectralTable {
        let unit = self.flux_unit.with_form(false, &self.energy_unit);
        self.converted(&self.energy_unit, &unit)
    }

    /// Concatenate tables in order, converting to the units of the first.
    ///
    /// `sed` selects the flux form of the result. Rows keep their input order
    /// and are tagged with the index of their source table. Tables with upper
    /// limits must agree on the confidence level.
    pub fn merge(tables: &[SpectralTable], sed: bool) -> Result<SpectralTable, AppError> {
        let first = tables
            .first()
            .ok_or_else(|| AppError::new(3, "No data tables to merge"))?;
        let energy_unit = first.energy_unit.clone();
        let flux_unit = first.flux_unit.with_form(sed, &energy_unit);

        let mut cl: Option<f64> = None;
        let mut rows = Vec::with_capacity(tables.iter().map(|t| t.len()).sum());
        for (group, table) in tables.iter().enumerate() {
            if table.has_upper_limits() {
                match cl {
                    Some(existing) if (existing - table.cl).abs() > 1e-12 => {
                        return Err(AppError::input(format!(
                            "Upper-limit confidence levels differ between tables ({existing} vs {})",
                            table.cl
                        )));
                    }
                    Some(_) => {}
                    None => cl = Some(table.cl),
                }
            }
            let converted = table.converted(&energy_unit, &flux_unit);
            rows.extend(converted.rows.into_iter().map(|r| SpectralRow { group, ..r }));
        }

        SpectralTable::new(energy_unit, flux_unit, rows, cl.unwrap_or(first.cl))
    }
}

fn validate_row(line: usize, row: &SpectralRow) -> Result<(), AppError> {
    let e = row.energy.base();
    if !(e.is_finite() && e > 0.0) {
        return Err(AppError::input(format!(
            "Row {line}: energy must be positive and finite, got {e} eV"
        )));
    }
    if !row.flux.is_finite() {
        return Err(AppError::input(format!("Row {line}: flux is not finite")));
    }
    if !row.ul {
        for (name, v) in [("flux_error_lo", row.flux_error_lo), ("flux_error_hi", row.flux_error_hi)] {
            if !(v.is_finite() && v > 0.0) {
                return Err(AppError::input(format!(
                    "Row {line}: {name} must be positive and finite for a measurement, got {v}"
                )));
            }
        }
    }
    Ok(())
}

fn required<'a>(table: &'a Table, name: &str) -> Result<&'a Column, AppError> {
    table
        .column(name)
        .ok_or_else(|| AppError::input(format!("Data table is missing the '{name}' column")))
}

fn unit_of(column: &Column) -> Result<&str, AppError> {
    column
        .unit
        .as_deref()
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| AppError::input(format!("Column '{}' has no unit", column.name)))
}

/// Flux error column values converted into `flux_unit` (they may carry their
/// own unit of the same family).
fn flux_error_values(
    column: &Column,
    flux_unit: &FluxUnit,
    energy: &[Quantity<Energy>],
) -> Result<Vec<f64>, AppError> {
    let values = column.floats()?;
    let Some(unit) = column.unit.as_deref().filter(|u| !u.trim().is_empty()) else {
        return Ok(values);
    };
    let own = FluxUnit::parse(unit)?;
    Ok(values
        .iter()
        .zip(energy)
        .map(|(&v, e)| flux_unit.from_differential_base(own.to_differential_base(v, e.base()), e.base()))
        .collect())
}

fn flux_errors(
    table: &Table,
    flux_unit: &FluxUnit,
    energy: &[Quantity<Energy>],
) -> Result<(Vec<f64>, Vec<f64>), AppError> {
    if let Some(col) = table.column("flux_error") {
        let v = flux_error_values(col, flux_unit, energy)?;
        return Ok((v.clone(), v));
    }
    match (table.column("flux_error_lo"), table.column("flux_error_hi")) {
        (Some(lo), Some(hi)) => Ok((
            flux_error_values(lo, flux_unit, energy)?,
            flux_error_values(hi, flux_unit, energy)?,
        )),
        _ => Err(AppError::input(
            "Data table needs either 'flux_error' or both 'flux_error_lo' and 'flux_error_hi'",
        )),
    }
}

fn energy_values(column: &Column, fallback: &Unit<Energy>) -> Result<Vec<Quantity<Energy>>, AppError> {
    let unit = match column.unit.as_deref().filter(|u| !u.trim().is_empty()) {
        Some(u) => Unit::<Energy>::parse(u)?,
        None => fallback.clone(),
    };
    Ok(column
        .floats()?
        .into_iter()
        .map(|v| Quantity::new(v, &unit))
        .collect())
}

type EnergyErrors = (Vec<Quantity<Energy>>, Vec<Quantity<Energy>>);

/// Energy error bars, from whichever description the table provides:
/// `energy_error`, `energy_error_lo`/`energy_error_hi`, `energy_width` or
/// `energy_lo`/`energy_hi` bin edges. Only used for plotting.
fn energy_errors(
    table: &Table,
    energy_unit: &Unit<Energy>,
    energy: &[Quantity<Energy>],
) -> Result<EnergyErrors, AppError> {
    let zero = vec![Quantity::from_base(0.0); energy.len()];
    let clean = |v: Vec<Quantity<Energy>>| -> Vec<Quantity<Energy>> {
        v.into_iter()
            .map(|q| if q.is_finite() { q } else { Quantity::from_base(0.0) })
            .collect()
    };

    if let Some(col) = table.column("energy_error") {
        let v = clean(energy_values(col, energy_unit)?);
        return Ok((v.clone(), v));
    }
    if let (Some(lo), Some(hi)) = (table.column("energy_error_lo"), table.column("energy_error_hi")) {
        return Ok((
            clean(energy_values(lo, energy_unit)?),
            clean(energy_values(hi, energy_unit)?),
        ));
    }
    if let Some(col) = table.column("energy_width") {
        let half: Vec<Quantity<Energy>> =
            clean(energy_values(col, energy_unit)?).into_iter().map(|w| w / 2.0).collect();
        return Ok((half.clone(), half));
    }
    if let (Some(lo), Some(hi)) = (table.column("energy_lo"), table.column("energy_hi")) {
        let lo = energy_values(lo, energy_unit)?;
        let hi = energy_values(hi, energy_unit)?;
        let err_lo = energy.iter().zip(&lo).map(|(&e, &l)| e - l).collect();
        let err_hi = energy.iter().zip(&hi).map(|(&e, &h)| h - e).collect();
        return Ok((clean(err_lo), clean(err_hi)));
    }
    Ok((zero.clone(), zero))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn column(name: &str, unit: Option<&str>, cells: &[&str]) -> Column {
        Column {
            name: name.to_string(),
            unit: unit.map(str::to_string),
            cells: cells.iter().map(|c| c.to_string()).collect(),
        }
    }

    fn vhe_table() -> Table {
        Table {
            columns: vec![
                column("energy", Some("TeV"), &["1.0", "10.0", "50.0"]),
                column("flux", Some("1/(cm2 s TeV)"), &["3e-11", "1e-13", "1e-15"]),
                column("flux_error_lo", Some("1/(cm2 s TeV)"), &["3e-12", "1e-14", "0"]),
                column("flux_error_hi", Some("1/(cm2 s TeV)"), &["4e-12", "2e-14", "0"]),
                column("ul", None, &["0", "0", "1"]),
            ],
            meta: BTreeMap::from([("cl".to_string(), "0.95".to_string())]),
        }
    }

    fn xray_table() -> Table {
        Table {
            columns: vec![
                column("energy", Some("keV"), &["1.0", "10.0"]),
                column("energy_width", Some("keV"), &["0.2", "2.0"]),
                column("flux", Some("erg/(cm2 s)"), &["2e-8", "1.5e-8"]),
                column("flux_error", Some("erg/(cm2 s)"), &["2e-9", "1.5e-9"]),
            ],
            meta: BTreeMap::new(),
        }
    }

    #[test]
    fn reads_asymmetric_errors_and_upper_limits() {
        let t = SpectralTable::from_table(&vhe_table()).unwrap();
        assert_eq!(t.len(), 3);
        assert_eq!(t.cl(), 0.95);
        assert!(t.rows()[2].ul);
        assert_eq!(t.rows()[0].flux_error_hi, 4e-12);
        assert_eq!(t.rows()[1].energy.base(), 1e13);
        assert!(!t.is_sed());
    }

    #[test]
    fn energy_width_gives_symmetric_energy_errors() {
        let t = SpectralTable::from_table(&xray_table()).unwrap();
        assert!((t.rows()[1].energy_error_lo.base() - 1000.0).abs() < 1e-9);
        assert_eq!(t.rows()[1].energy_error_lo, t.rows()[1].energy_error_hi);
        assert_eq!(t.cl(), DEFAULT_UL_CL);
        assert!(t.is_sed());
    }

    #[test]
    fn missing_columns_and_units_are_input_errors() {
        let mut t = vhe_table();
        t.columns.retain(|c| c.name != "flux_error_hi");
        assert_eq!(SpectralTable::from_table(&t).unwrap_err().exit_code(), 2);

        let mut t = vhe_table();
        t.columns[0].unit = None;
        let err = SpectralTable::from_table(&t).unwrap_err();
        assert!(err.message().contains("has no unit"));

        let mut t = vhe_table();
        t.columns[1].unit = Some("TeV".to_string());
        assert_eq!(SpectralTable::from_table(&t).unwrap_err().exit_code(), 2);
    }

    #[test]
    fn non_positive_energy_and_missing_errors_rejected() {
        let mut t = vhe_table();
        t.columns[0].cells[1] = "-1".to_string();
        assert!(SpectralTable::from_table(&t).is_err());

        let mut t = vhe_table();
        t.columns[2].cells[0] = "nan".to_string();
        let err = SpectralTable::from_table(&t).unwrap_err();
        assert!(err.message().contains("flux_error_lo"));
    }

    #[test]
    fn sed_round_trip_preserves_values() {
        let t = SpectralTable::from_table(&vhe_table()).unwrap();
        let sed = t.to_sed();
        assert_eq!(sed.flux_unit().symbol(), "TeV/(cm2 s)");
        // 1e-13 /TeV at 10 TeV is 1e-11 TeV in SED form.
        assert!((sed.rows()[1].flux / 1e-11 - 1.0).abs() < 1e-12);
        let back = sed.to_differential();
        for (a, b) in back.rows().iter().zip(t.rows()) {
            assert!((a.flux / b.flux - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn merge_uses_first_table_units_and_keeps_order() {
        let vhe = SpectralTable::from_table(&vhe_table()).unwrap();
        let xray = SpectralTable::from_table(&xray_table()).unwrap();

        let merged = SpectralTable::merge(&[xray.clone(), vhe.clone()], false).unwrap();
        assert_eq!(merged.len(), 5);
        assert_eq!(merged.energy_unit().symbol(), "keV");
        assert_eq!(merged.flux_unit().symbol(), "1/(cm2 s keV)");
        let groups: Vec<usize> = merged.rows().iter().map(|r| r.group).collect();
        assert_eq!(groups, vec![0, 0, 1, 1, 1]);
        // Not re-sorted: the X-ray rows stay first.
        assert!(merged.rows()[1].energy < merged.rows()[2].energy);
        assert_eq!(merged.cl(), 0.95);

        let diff = merged.differential_flux_base();
        let expected = vhe.differential_flux_base();
        assert!((diff[2] / expected[0] - 1.0).abs() < 1e-12);

        let sed = SpectralTable::merge(&[vhe, xray], true).unwrap();
        assert!(sed.is_sed());
        assert_eq!(sed.energy_unit().symbol(), "TeV");
    }

    #[test]
    fn merge_rejects_conflicting_confidence_levels() {
        let a = SpectralTable::from_table(&vhe_table()).unwrap();
        let mut other = vhe_table();
        other.meta.insert("cl".to_string(), "0.68".to_string());
        let b = SpectralTable::from_table(&other).unwrap();
        assert!(SpectralTable::merge(&[a, b], false).is_err());
        assert_eq!(SpectralTable::merge(&[], false).unwrap_err().exit_code(), 3);
    }
}

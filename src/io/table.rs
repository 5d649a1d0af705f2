//! Schema-mapped reference tables (evaluations, literature, model outputs).
//!
//! Reference tables come from many sources and name their columns
//! inconsistently (`energy`, `E_energy_MeV`, `mult_error_sup`, `err_mult_up`).
//! A `ColumnSchema` maps each logical field to a matching rule:
//!
//! - the header must contain at least one `include` substring
//! - the header must contain none of the `exclude` substrings
//!
//! Headers are compared lowercased and the first matching column wins. A field
//! that matches nothing is reported once and degrades to `None`.

use std::collections::HashSet;
use std::path::Path;

use csv::StringRecord;
use tracing::{debug, warn};

use crate::domain::NubarSeries;
use crate::error::{AppError, Stage};
use crate::io::ingest::{file_label, tokens, whitespace_reader};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalField {
    Energy,
    EnergyError,
    Multiplicity,
    MultiplicityErrorSymmetric,
    MultiplicityErrorSup,
    MultiplicityErrorInf,
}

impl LogicalField {
    pub fn name(self) -> &'static str {
        match self {
            LogicalField::Energy => "energy",
            LogicalField::EnergyError => "energy_error",
            LogicalField::Multiplicity => "multiplicity",
            LogicalField::MultiplicityErrorSymmetric => "multiplicity_error_symmetric",
            LogicalField::MultiplicityErrorSup => "multiplicity_error_sup",
            LogicalField::MultiplicityErrorInf => "multiplicity_error_inf",
        }
    }
}

/// Substring rule selecting one column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnRule {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl ColumnRule {
    pub fn new(include: &[&str], exclude: &[&str]) -> Self {
        Self {
            include: include.iter().map(|s| s.to_ascii_lowercase()).collect(),
            exclude: exclude.iter().map(|s| s.to_ascii_lowercase()).collect(),
        }
    }

    pub fn matches(&self, header: &str) -> bool {
        let header = header.to_ascii_lowercase();
        self.include.iter().any(|s| header.contains(s.as_str()))
            && !self.exclude.iter().any(|s| header.contains(s.as_str()))
    }
}

/// Ordered field -> rule mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSchema {
    pub rules: Vec<(LogicalField, ColumnRule)>,
}

impl Default for ColumnSchema {
    fn default() -> Self {
        use LogicalField::*;
        Self {
            rules: vec![
                (Energy, ColumnRule::new(&["energy"], &["err"])),
                (EnergyError, ColumnRule::new(&["energy_error", "err_nrj"], &[])),
                (Multiplicity, ColumnRule::new(&["mult"], &["err"])),
                (
                    MultiplicityErrorSymmetric,
                    ColumnRule::new(&["mult_error", "mult_err"], &["sup", "inf", "up", "low"]),
                ),
                (MultiplicityErrorSup, ColumnRule::new(&["mult_error_sup", "err_mult_up"], &[])),
                (MultiplicityErrorInf, ColumnRule::new(&["mult_error_inf", "err_mult_low"], &[])),
            ],
        }
    }
}

impl ColumnSchema {
    /// Each field may appear once and every rule needs an include pattern.
    pub fn validate(&self) -> Result<(), AppError> {
        let mut seen = HashSet::new();
        for (field, rule) in &self.rules {
            if !seen.insert(*field) {
                return Err(AppError::config(format!("Column schema maps `{}` twice.", field.name())));
            }
            if rule.include.is_empty() || rule.include.iter().any(String::is_empty) {
                return Err(AppError::config(format!(
                    "Column rule for `{}` needs non-empty include patterns.",
                    field.name()
                )));
            }
        }
        Ok(())
    }

    /// Resolve every field against a header row.
    pub fn resolve(&self, headers: &[&str]) -> ResolvedSchema {
        let mut columns = Vec::with_capacity(self.rules.len());
        let mut unmatched = Vec::new();
        for (field, rule) in &self.rules {
            match headers.iter().position(|h| rule.matches(h)) {
                Some(idx) => columns.push((*field, idx)),
                None => unmatched.push(*field),
            }
        }
        ResolvedSchema { columns, unmatched }
    }
}

/// Field -> column index, plus the fields that matched nothing.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResolvedSchema {
    pub columns: Vec<(LogicalField, usize)>,
    pub unmatched: Vec<LogicalField>,
}

impl ResolvedSchema {
    pub fn index(&self, field: LogicalField) -> Option<usize> {
        self.columns.iter().find(|(f, _)| *f == field).map(|(_, idx)| *idx)
    }
}

/// Multiplicity uncertainty as given by the table.
#[derive(Debug, Clone, PartialEq)]
pub enum MultError {
    Symmetric(Vec<f64>),
    Asymmetric { sup: Vec<f64>, inf: Vec<f64> },
}

impl MultError {
    /// Per-point 1-sigma; asymmetric errors are averaged.
    pub fn symmetrized(&self) -> Vec<f64> {
        match self {
            MultError::Symmetric(v) => v.clone(),
            MultError::Asymmetric { sup, inf } => sup.iter().zip(inf).map(|(s, i)| 0.5 * (s + i)).collect(),
        }
    }
}

/// A reference table reduced to its logical fields.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceTable {
    pub label: String,
    pub energy: Option<Vec<f64>>,
    pub energy_err: Option<Vec<f64>>,
    pub mult: Option<Vec<f64>>,
    pub mult_err: Option<MultError>,
}

impl ReferenceTable {
    pub fn len(&self) -> usize {
        self.mult
            .as_ref()
            .or(self.energy.as_ref())
            .map(Vec::len)
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Multiplicity column as an average neutron multiplicity series.
    ///
    /// A table without an error column yields zero errors.
    pub fn to_nubar_series(&self) -> Result<NubarSeries, AppError> {
        let values = self.mult.clone().ok_or_else(|| {
            AppError::data_shape("No multiplicity column; cannot build a nubar series.")
                .at(Stage::Ingest)
                .for_input(&self.label)
        })?;
        let errors = match &self.mult_err {
            Some(err) => err.symmetrized(),
            None => vec![0.0; values.len()],
        };
        Ok(NubarSeries { values, errors })
    }
}

/// Read a headed whitespace table through `schema`.
pub fn read_reference_table(path: &Path, schema: &ColumnSchema) -> Result<ReferenceTable, AppError> {
    let label = file_label(path);
    schema.validate().map_err(|e| e.at(Stage::Ingest).for_input(&label))?;

    let mut reader = whitespace_reader(path, true)?;
    let header_record = reader
        .headers()
        .map_err(|e| AppError::data_shape(format!("Failed to read header: {e}")).at(Stage::Ingest).for_input(&label))?
        .clone();
    let headers = tokens(&header_record);
    if headers.is_empty() {
        return Err(AppError::data_shape("Empty header line.").at(Stage::Ingest).for_input(label));
    }

    let resolved = schema.resolve(&headers);
    for field in &resolved.unmatched {
        warn!(file = %label, field = field.name(), "no column matches field");
    }

    let mut columns: Vec<(LogicalField, usize, Vec<f64>)> =
        resolved.columns.iter().map(|&(f, idx)| (f, idx, Vec::new())).collect();

    let mut record = StringRecord::new();
    loop {
        let has_more = reader
            .read_record(&mut record)
            .map_err(|e| AppError::data_shape(format!("Parse error: {e}")).at(Stage::Ingest).for_input(&label))?;
        if !has_more {
            break;
        }
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        let fields = tokens(&record);
        if fields.is_empty() {
            continue;
        }
        for (field, idx, values) in columns.iter_mut() {
            let cell = fields.get(*idx).ok_or_else(|| {
                AppError::data_shape(format!("Line {line}: missing `{}` value.", field.name()))
                    .at(Stage::Ingest)
                    .for_input(&label)
            })?;
            let value = cell.parse::<f64>().map_err(|_| {
                AppError::data_shape(format!("Line {line}: invalid `{}` value '{cell}'.", field.name()))
                    .at(Stage::Ingest)
                    .for_input(&label)
            })?;
            values.push(value);
        }
    }

    let mut take = |field: LogicalField| {
        columns
            .iter_mut()
            .find(|(f, _, _)| *f == field)
            .map(|(_, _, values)| std::mem::take(values))
    };

    let energy = take(LogicalField::Energy);
    let energy_err = take(LogicalField::EnergyError);
    let mult = take(LogicalField::Multiplicity);
    let symmetric = take(LogicalField::MultiplicityErrorSymmetric);
    let sup = take(LogicalField::MultiplicityErrorSup);
    let inf = take(LogicalField::MultiplicityErrorInf);

    let mult_err = match (sup, inf, symmetric) {
        (Some(sup), Some(inf), _) => Some(MultError::Asymmetric { sup, inf }),
        (_, _, Some(sym)) => Some(MultError::Symmetric(sym)),
        _ => None,
    };

    let table = ReferenceTable {
        label,
        energy,
        energy_err,
        mult,
        mult_err,
    };
    debug!(file = %table.label, rows = table.len(), "reference table loaded");
    Ok(table)
}

/// Read a nubar series with the default schema.
pub fn read_nubar(path: &Path) -> Result<NubarSeries, AppError> {
    read_reference_table(path, &ColumnSchema::default())?.to_nubar_series()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::io::Write;

    fn write_tmp(content: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[test]
    fn default_schema_resolves_common_headers() {
        let schema = ColumnSchema::default();
        let resolved = schema.resolve(&["energy", "mult", "mult_error"]);
        assert_eq!(resolved.index(LogicalField::Energy), Some(0));
        assert_eq!(resolved.index(LogicalField::Multiplicity), Some(1));
        assert_eq!(resolved.index(LogicalField::MultiplicityErrorSymmetric), Some(2));
        assert!(resolved.unmatched.contains(&LogicalField::EnergyError));
        assert!(resolved.unmatched.contains(&LogicalField::MultiplicityErrorSup));
    }

    #[test]
    fn energy_rule_skips_the_error_column() {
        let resolved = ColumnSchema::default().resolve(&["energy_error", "energy", "mult"]);
        assert_eq!(resolved.index(LogicalField::Energy), Some(1));
        assert_eq!(resolved.index(LogicalField::EnergyError), Some(0));
    }

    #[test]
    fn duplicate_field_is_a_config_error() {
        let mut schema = ColumnSchema::default();
        schema
            .rules
            .push((LogicalField::Energy, ColumnRule::new(&["e"], &[])));
        assert_eq!(schema.validate().unwrap_err().kind(), ErrorKind::Config);
    }

    #[test]
    fn asymmetric_errors_are_averaged_into_nubar() {
        let f = write_tmp("energy nubar_mult mult_error_sup mult_error_inf\n1 2.5 0.2 0.1\n2  2.6 0.4 0.2\n");
        let table = read_reference_table(f.path(), &ColumnSchema::default()).unwrap();
        assert!(table.energy_err.is_none());
        assert!(matches!(table.mult_err, Some(MultError::Asymmetric { .. })));

        let nubar = table.to_nubar_series().unwrap();
        assert_eq!(nubar.values, vec![2.5, 2.6]);
        assert!((nubar.errors[0] - 0.15).abs() < 1e-12);
        assert!((nubar.errors[1] - 0.3).abs() < 1e-12);
    }

    #[test]
    fn missing_error_column_gives_zero_errors() {
        let f = write_tmp("# JEFF nubar\nenergy mult\n1 2.5\n2 2.6\n");
        let nubar = read_nubar(f.path()).unwrap();
        assert_eq!(nubar.errors, vec![0.0, 0.0]);
    }

    #[test]
    fn missing_multiplicity_column_fails_conversion() {
        let f = write_tmp("energy sigma\n1 2.5\n");
        let err = read_nubar(f.path()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataShape);
    }

    #[test]
    fn non_numeric_mapped_cell_is_rejected() {
        let f = write_tmp("energy mult\n1 n/a\n");
        let err = read_reference_table(f.path(), &ColumnSchema::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataShape);
        assert!(err.message().contains("Line 2"));
    }
}

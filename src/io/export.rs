//! Export unfolded multiplicities as a text table.
//!
//! The table is meant to be read back by plotting scripts: one header line
//! `energy g_mult g_mult_err`, then three space-separated columns printed with
//! three significant digits (C `%.3g` semantics). No comment markers.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::domain::{HistogramEntry, UnfoldedMeasurementSeries};
use crate::error::{AppError, Stage};
use crate::io::ingest::file_label;

pub const UNFOLDED_HEADER: &str = "energy g_mult g_mult_err";

/// Write `energy g_mult g_mult_err` rows to `path`.
pub fn write_unfolded_table(path: &Path, series: &UnfoldedMeasurementSeries) -> Result<(), AppError> {
    let export_err = |what: &str, e: std::io::Error| {
        AppError::io(format!("Failed to {what} '{}': {e}", path.display()))
            .at(Stage::Export)
            .for_input(file_label(path))
    };

    let file = File::create(path).map_err(|e| export_err("create", e))?;
    let mut out = BufWriter::new(file);

    writeln!(out, "{UNFOLDED_HEADER}").map_err(|e| export_err("write", e))?;
    for p in &series.points {
        writeln!(
            out,
            "{} {} {}",
            format_sig(p.energy, 3),
            format_sig(p.multiplicity, 3),
            format_sig(p.total_err, 3)
        )
        .map_err(|e| export_err("write", e))?;
    }
    out.flush().map_err(|e| export_err("flush", e))?;
    Ok(())
}

/// Write `(x, y, weight)` triples in the histogram ingest layout.
pub fn write_histogram(path: &Path, entries: &[HistogramEntry]) -> Result<(), AppError> {
    let export_err = |e: std::io::Error| {
        AppError::io(format!("Failed to write histogram '{}': {e}", path.display()))
            .at(Stage::Export)
            .for_input(file_label(path))
    };

    let file = File::create(path).map_err(export_err)?;
    let mut out = BufWriter::new(file);
    writeln!(out, "# emitted detected count").map_err(export_err)?;
    for e in entries {
        writeln!(out, "{} {} {}", e.x, e.y, e.weight).map_err(export_err)?;
    }
    out.flush().map_err(export_err)?;
    Ok(())
}

/// Format like C's `%.{significant}g`.
///
/// Scientific notation when the decimal exponent is below -4 or at least
/// `significant`; trailing zeros are removed in both notations.
pub fn format_sig(value: f64, significant: usize) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }

    let p = significant.max(1);
    // Rounded to `p` digits first: the exponent after rounding decides the notation.
    let sci = format!("{:.*e}", p - 1, value);
    let Some((mantissa, exp)) = sci.split_once('e') else {
        return sci;
    };
    let Ok(exp) = exp.parse::<i32>() else {
        return sci;
    };

    if exp < -4 || exp >= p as i32 {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{sign}{:02}", trim_fraction(mantissa), exp.abs())
    } else {
        let decimals = (p as i32 - 1 - exp).max(0) as usize;
        trim_fraction(&format!("{value:.decimals$}")).to_string()
    }
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

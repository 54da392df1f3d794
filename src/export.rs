//! Writers for experiment results
//!
//! Plain comma separated text, one record per line. Anything that can be
//! written to an [`io::Write`] works; the `*_file` helpers open the file.

use std::fmt::Display;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use log::info;

use crate::automaton::{render_row, Cell, Series};
use crate::experiments::Outcome;

/// `x, y` per line
pub fn write_series_csv<W: Write>(out: &mut W, series: &Series) -> io::Result<()> {
    for (x, y) in series.points() {
        writeln!(out, "{x}, {y}")?;
    }
    Ok(())
}

/// `index, value` per line
pub fn write_values_csv<W: Write>(out: &mut W, values: &[f64]) -> io::Result<()> {
    for (i, value) in values.iter().enumerate() {
        writeln!(out, "{i}, {value}")?;
    }
    Ok(())
}

/// One row per line, cells separated by commas
pub fn write_grid_csv<W: Write, T: Display>(out: &mut W, rows: &[Vec<T>]) -> io::Result<()> {
    for row in rows {
        let line = row
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        writeln!(out, "{line}")?;
    }
    Ok(())
}

/// Text picture of a history, oldest snapshot on top
pub fn render_map(rows: &[Vec<Cell>]) -> String {
    rows.iter()
        .map(|row| render_row(row))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Writes any experiment outcome to `path` in the matching layout
pub fn write_outcome_file(path: &Path, outcome: &Outcome) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create output file {}", path.display()))?;
    let mut out = BufWriter::new(file);
    match outcome {
        Outcome::Map(rows) => write_grid_csv(&mut out, rows),
        Outcome::Values(values) => write_values_csv(&mut out, values),
        Outcome::Series(series) => write_series_csv(&mut out, series),
    }
    .and_then(|()| out.flush())
    .with_context(|| format!("Failed to write {}", path.display()))?;

    info!("Wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn series_lines() {
        let mut series = Series::default();
        series.push(0.1, 0.25);
        series.push(0.2, 0.5);
        let mut buffer = Vec::new();
        write_series_csv(&mut buffer, &series).unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap(), "0.1, 0.25\n0.2, 0.5\n");
    }

    #[test]
    fn grid_lines() {
        let mut buffer = Vec::new();
        write_grid_csv(&mut buffer, &[vec![-1, 2], vec![0, -1]]).unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap(), "-1, 2\n0, -1\n");
    }

    #[test]
    fn map_is_one_line_per_step() {
        let map = render_map(&[vec![1, -1, -1], vec![-1, 2, -1]]);
        assert_eq!(map, "1..\n.2.");
    }
}

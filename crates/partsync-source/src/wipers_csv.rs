//! Wipers application sheet (semicolon-delimited CSV).
//!
//! The sheet is positional: the column order is a contract with the
//! supplier, captured by [`WiperLayout`]. A reordered export is a new layout,
//! not something the parser guesses at.

use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use csv::{ReaderBuilder, StringRecord, Trim};
use partsync_core::slugify;

use crate::error::SourceError;
use crate::fields::{clean_cell, clean_reference, parse_month_year};
use crate::types::{
    DroppedRow, Loaded, MulticonnexionRefs, StandardRefs, WiperRefs, WiperVehicle,
};

/// Known column layouts of the wipers sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WiperLayout {
    /// PerfectVision export of May 2025: 5 header lines, 18 columns.
    #[default]
    PerfectVision2025_05,
}

impl WiperLayout {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            WiperLayout::PerfectVision2025_05 => "perfectvision-2025-05",
        }
    }

    #[must_use]
    pub fn header_lines(self) -> u64 {
        match self {
            WiperLayout::PerfectVision2025_05 => 5,
        }
    }

    #[must_use]
    pub fn min_columns(self) -> usize {
        match self {
            WiperLayout::PerfectVision2025_05 => 18,
        }
    }
}

impl std::fmt::Display for WiperLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for WiperLayout {
    type Err = SourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "perfectvision-2025-05" => Ok(WiperLayout::PerfectVision2025_05),
            other => Err(SourceError::UnknownLayout(other.to_string())),
        }
    }
}

// Column positions of the perfectvision-2025-05 layout.
const COL_ID: usize = 0;
const COL_BRAND: usize = 1;
const COL_MODEL: usize = 2;
const COL_PICTO1: usize = 3;
const COL_PICTO2: usize = 4;
const COL_DIRECTION: usize = 5;
const COL_START_MONTH: usize = 6;
const COL_START_YEAR: usize = 7;
const COL_END_MONTH: usize = 8;
const COL_END_YEAR: usize = 9;
const COL_MULTI_KIT_AVANT: usize = 10;
const COL_MULTI_CONDUCTEUR: usize = 11;
const COL_MULTI_MONO: usize = 12;
const COL_MULTI_PASSAGER: usize = 13;
const COL_STD_CONDUCTEUR: usize = 14;
const COL_STD_MONO: usize = 15;
const COL_STD_PASSAGER: usize = 16;
const COL_ARRIERE: usize = 17;

/// Parse the wipers sheet from any reader.
///
/// # Errors
///
/// Returns `SourceError::Csv` on an I/O failure while reading. Malformed
/// rows are dropped, not returned as errors.
pub fn parse_wipers<R: Read>(
    reader: R,
    layout: WiperLayout,
) -> Result<Loaded<WiperVehicle>, SourceError> {
    // The sheet never quotes fields; a leading `"` is part of the cell text.
    let mut rdr = ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .quoting(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let mut loaded = Loaded::default();
    for result in rdr.records() {
        let record = match result {
            Ok(r) => r,
            Err(e) if e.is_io_error() => {
                return Err(SourceError::Csv {
                    context: layout.name().to_string(),
                    source: e,
                });
            }
            Err(e) => {
                let line = e.position().map_or(0, csv::Position::line);
                if line > layout.header_lines() {
                    loaded
                        .dropped
                        .push(DroppedRow::new(to_usize(line), format!("unreadable row: {e}")));
                }
                continue;
            }
        };

        let line = record.position().map_or(0, csv::Position::line);
        if line <= layout.header_lines() {
            continue;
        }

        match vehicle_from_record(&record, to_usize(line), layout) {
            Ok(vehicle) => loaded.records.push(vehicle),
            Err(reason) => {
                tracing::debug!(line, reason = %reason, "dropping wipers row");
                loaded.dropped.push(DroppedRow::new(to_usize(line), reason));
            }
        }
    }

    Ok(loaded)
}

/// Load the wipers sheet at `path`.
///
/// # Errors
///
/// Returns `SourceError::Io` if the file cannot be opened.
pub fn load_wipers(path: &Path, layout: WiperLayout) -> Result<Loaded<WiperVehicle>, SourceError> {
    let file = std::fs::File::open(path).map_err(|e| SourceError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_wipers(std::io::BufReader::new(file), layout)
}

fn to_usize(line: u64) -> usize {
    usize::try_from(line).unwrap_or(usize::MAX)
}

fn vehicle_from_record(
    record: &StringRecord,
    line: usize,
    layout: WiperLayout,
) -> Result<WiperVehicle, String> {
    if record.len() < layout.min_columns() {
        return Err(format!(
            "expected at least {} columns, found {}",
            layout.min_columns(),
            record.len()
        ));
    }

    let cell = |idx: usize| record.get(idx).unwrap_or_default();

    let source_id = clean_cell(cell(COL_ID)).ok_or("missing id")?;
    let brand = clean_cell(cell(COL_BRAND)).ok_or("empty brand name")?;
    let model = clean_cell(cell(COL_MODEL)).ok_or("empty model name")?;
    if slugify(&brand).is_empty() || slugify(&model).is_empty() {
        return Err(format!("'{brand} {model}' has no slug characters"));
    }

    let reference = |idx: usize| clean_reference(cell(idx));
    let wipers = WiperRefs {
        multiconnexion: MulticonnexionRefs {
            kit_avant: reference(COL_MULTI_KIT_AVANT),
            cote_conducteur: reference(COL_MULTI_CONDUCTEUR),
            mono_balais: reference(COL_MULTI_MONO),
            cote_passager: reference(COL_MULTI_PASSAGER),
        },
        standard: StandardRefs {
            cote_conducteur: reference(COL_STD_CONDUCTEUR),
            mono_balais: reference(COL_STD_MONO),
            cote_passager: reference(COL_STD_PASSAGER),
        },
        arriere: reference(COL_ARRIERE),
    };
    if wipers.is_empty() {
        return Err("no wiper reference".to_string());
    }

    Ok(WiperVehicle {
        line,
        source_id,
        brand,
        model,
        picto1: clean_cell(cell(COL_PICTO1)),
        picto2: clean_cell(cell(COL_PICTO2)),
        direction: clean_cell(cell(COL_DIRECTION)).unwrap_or_default(),
        start_date: parse_month_year(cell(COL_START_MONTH), cell(COL_START_YEAR))?,
        end_date: parse_month_year(cell(COL_END_MONTH), cell(COL_END_YEAR))?,
        wipers,
        notes: None,
    })
}

#[cfg(test)]
#[path = "wipers_csv_test.rs"]
mod tests;

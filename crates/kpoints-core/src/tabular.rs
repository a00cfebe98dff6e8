//! CSV persistence for target tables and solver outputs.
//!
//! Target tables are read from `id,x,y,<var1>,...,<varm>`; the variable
//! column order fixes the criteria order.

use std::io::{Read, Write};

use csv::{ReaderBuilder, Trim, WriterBuilder};
use serde::Serialize;

use crate::error::{KpointsError, Result};
use crate::solver::SubsetCell;
use crate::table::{TargetCell, TargetTable};

const ID_HEADER: &str = "id";
const X_HEADER: &str = "x";
const Y_HEADER: &str = "y";

/// Parse a target table. Header names for id/x/y are matched case-insensitively.
pub fn read_target_table<R: Read>(reader: R) -> Result<TargetTable> {
    let mut rdr = ReaderBuilder::new().trim(Trim::All).from_reader(reader);
    let headers = rdr.headers()?.clone();
    if headers.len() < 4 {
        return Err(KpointsError::InvalidTable(format!(
            "expected columns id,x,y and at least one variable, got {}",
            headers.len()
        )));
    }
    for (i, expected) in [ID_HEADER, X_HEADER, Y_HEADER].iter().enumerate() {
        if !headers[i].eq_ignore_ascii_case(expected) {
            return Err(KpointsError::InvalidTable(format!(
                "column {} must be '{expected}', found '{}'",
                i + 1,
                &headers[i]
            )));
        }
    }
    let names: Vec<String> = headers.iter().skip(3).map(str::to_string).collect();

    let mut cells = Vec::new();
    for (row, record) in rdr.records().enumerate() {
        let record = record?;
        let line = row + 2;
        let field = |i: usize| -> Result<f64> {
            let raw = record.get(i).unwrap_or("");
            raw.parse::<f64>().map_err(|_| {
                KpointsError::InvalidTable(format!(
                    "line {line}, column '{}': cannot parse '{raw}'",
                    &headers[i]
                ))
            })
        };
        let id = record
            .get(0)
            .unwrap_or("")
            .parse::<u64>()
            .map_err(|_| KpointsError::InvalidTable(format!("line {line}: invalid cell id")))?;
        let values = (3..headers.len()).map(field).collect::<Result<Vec<f64>>>()?;
        cells.push(TargetCell { id, x: field(1)?, y: field(2)?, values });
    }
    TargetTable::new(names, cells)
}

/// Write the selected cells as `id,x,y`.
pub fn write_subset<W: Write>(writer: W, subset: &[SubsetCell]) -> Result<()> {
    write_rows(writer, subset)
}

/// Write any serializable rows with a header line.
pub fn write_rows<W: Write, T: Serialize>(writer: W, rows: &[T]) -> Result<()> {
    let mut wtr = WriterBuilder::new().from_writer(writer);
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush().map_err(|e| KpointsError::Csv(e.to_string()))?;
    Ok(())
}

//! Coordinate merge: reduced coordinates become axis columns of the table.
//!
//! The join is by row position only. Two documents may share text or
//! embeddings, so a content key would be ambiguous; position gives exactly one
//! coordinate row per table row. No join key is materialised.

use crate::error::{PipelineError, Result, Stage};
use crate::reduce::Coordinates;
use crate::table::{Column, RowAligned, Table};

const XYZ: [&str; 3] = ["x", "y", "z"];

/// Column names for `n_components` axes: `x`, `y`, `z` up to three,
/// `axis_0 .. axis_{n-1}` beyond that.
pub fn axis_names(n_components: usize) -> Vec<String> {
    if n_components <= XYZ.len() {
        XYZ[..n_components].iter().map(|s| s.to_string()).collect()
    } else {
        (0..n_components).map(|i| format!("axis_{}", i)).collect()
    }
}

/// Whether `name` is a column this module writes.
pub fn is_axis_column(name: &str) -> bool {
    XYZ.contains(&name)
        || name
            .strip_prefix("axis_")
            .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

/// Coordinates as a table with one number column per axis.
pub fn coordinate_table(coordinates: &Coordinates) -> Result<Table> {
    let columns = axis_names(coordinates.n_components())
        .into_iter()
        .enumerate()
        .map(|(j, name)| {
            let values: Vec<f64> = coordinates.axis(j).iter().map(|&v| v as f64).collect();
            (name, Column::from(values))
        });
    Table::from_columns(columns)
}

/// Attach coordinates to `table` by row position.
///
/// Axis columns from an earlier merge are dropped first, so merging twice
/// gives the same columns as merging once. The coordinate count must equal
/// the row count.
pub fn merge_coordinates(mut table: Table, coordinates: &Coordinates) -> Result<Table> {
    if coordinates.n_points() != table.n_rows() {
        return Err(PipelineError::shape(
            Stage::CoordinateMerge,
            table.n_rows(),
            coordinates.n_points(),
        ));
    }

    table.drop_columns_where(is_axis_column);

    let n_rows = table.n_rows();
    for (name, column) in coordinate_table(coordinates)?.into_columns() {
        let values = match column {
            Column::Number(values) => values,
            other => {
                return Err(PipelineError::ColumnType {
                    name,
                    expected: "number",
                    actual: other.kind(),
                })
            }
        };
        let aligned = RowAligned::with_len(Stage::CoordinateMerge, n_rows, values)?;
        table = table.with_column(name, Column::Number(aligned.into_inner()))?;
    }
    Ok(table)
}

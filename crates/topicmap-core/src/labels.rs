//! Label attachment: cluster labels become a categorical text column.

use crate::error::{Result, Stage};
use crate::table::{RowAligned, Table};

/// Add `column` holding the string form of each label (`"-1"` for noise).
///
/// Labels are stored as text so consumers treat topic identity as a category
/// rather than an ordered number. `labels` must have one entry per row.
pub fn attach_labels(table: Table, column: &str, labels: &[i32]) -> Result<Table> {
    let aligned = RowAligned::new(Stage::LabelAttachment, &table, labels.to_vec())?;
    table.with_aligned(column, aligned.map(|label| label.to_string()))
}

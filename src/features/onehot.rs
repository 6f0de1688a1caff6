use super::{Cell, WorkTable};
use anyhow::Result;
use tracing::debug;

/// Fields represented as binary indicator columns instead of integer codes.
const ONE_HOT_FIELDS: &[&str] = &["Country", "Gender", "age_group"];

/// Expand each one-hot field into `<field>_<value>` indicator columns, one
/// per sorted distinct observed value, removing the original column.
///
/// With `drop_reference` set (training), the first sorted value is dropped as
/// the redundant reference category. Inference must not drop anything: a
/// single record has exactly one observed value per field, and dropping it
/// would make every submission look like the reference category after
/// reconciliation. Instead the record emits all its indicators and the
/// reconciler discards whichever ones the reference list does not carry.
///
/// Either way the resulting column set depends on which categories the input
/// happened to contain; only reconciliation restores the training-time shape.
pub fn expand(table: &mut WorkTable, drop_reference: bool) -> Result<()> {
    for field in ONE_HOT_FIELDS {
        if !table.has_column(field) {
            continue;
        }
        let values = table.distinct_text(field);
        debug!(field, categories = values.len(), "one-hot expansion");

        for value in values.iter().skip(usize::from(drop_reference)) {
            let indicator: Vec<Cell> = table
                .text_column(field)
                .into_iter()
                .map(|cell| match cell {
                    Some(s) if s == *value => Cell::Num(1.0),
                    _ => Cell::Num(0.0),
                })
                .collect();
            table.push_column(&format!("{}_{}", field, value), indicator)?;
        }
        table.drop_column(field);
    }
    Ok(())
}

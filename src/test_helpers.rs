use crate::data::{CellValue, Row};

/// Build a row of text cells in the given column order.
pub fn row(cells: &[(&str, &str)]) -> Row {
    cells
        .iter()
        .map(|(name, value)| (name.to_string(), CellValue::Text(value.to_string())))
        .collect()
}

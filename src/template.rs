//! A single named command template and its generation against a row.

use crate::data::Row;
use std::fmt;

/// An immutable command template: a body string plus the column names it
/// needs from a row. `required_columns` may repeat a name when the same
/// placeholder appears more than once in the body.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    id: String,
    body: String,
    required_columns: Vec<String>,
}

impl Template {
    pub fn new(id: String, body: String, required_columns: Vec<String>) -> Self {
        Self {
            id,
            body,
            required_columns,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn required_columns(&self) -> &[String] {
        &self.required_columns
    }

    /// Substitute the row's values into the body and return the trimmed
    /// command string.
    ///
    /// Every required column must be present in the row; otherwise the full
    /// list of missing columns is reported at once. Replacement is literal
    /// substring replacement of the column name, so names containing
    /// characters that are special elsewhere (`.`, `+`, `(`...) need no
    /// escaping.
    pub fn generate(&self, row: &Row) -> Result<String, MissingColumnsError> {
        let mut missing: Vec<String> = Vec::new();
        for column in &self.required_columns {
            if !row.contains_key(column) && !missing.contains(column) {
                missing.push(column.clone());
            }
        }
        if !missing.is_empty() {
            return Err(MissingColumnsError {
                template_id: self.id.clone(),
                columns: missing,
            });
        }

        let mut generated = self.body.clone();
        for column in &self.required_columns {
            if let Some(value) = row.get(column) {
                generated = generated.replace(column.as_str(), &value.to_string());
            }
        }
        Ok(generated.trim().to_string())
    }
}

/// A row lacked one or more columns a template requires.
#[derive(Debug, Clone, PartialEq)]
pub struct MissingColumnsError {
    pub template_id: String,
    pub columns: Vec<String>,
}

impl fmt::Display for MissingColumnsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Cannot generate '{}': missing column(s): {}",
            self.template_id,
            self.columns.join(", ")
        )
    }
}

impl std::error::Error for MissingColumnsError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::CellValue;
    use crate::test_helpers::row;

    #[test]
    fn generate_replaces_every_occurrence() {
        let template = Template::new(
            "run".to_string(),
            "run --x A --y A".to_string(),
            vec!["A".to_string(), "A".to_string()],
        );
        let mut data = Row::new();
        data.insert("A".to_string(), CellValue::Number(5.0));

        assert_eq!(template.generate(&data).unwrap(), "run --x 5 --y 5");
    }

    #[test]
    fn generate_trims_surrounding_whitespace() {
        let template = Template::new(
            "t".to_string(),
            "  deploy --env Env ".to_string(),
            vec!["Env".to_string()],
        );
        let data = row(&[("Env", "staging")]);

        assert_eq!(template.generate(&data).unwrap(), "deploy --env staging");
    }

    #[test]
    fn generate_collects_all_missing_columns() {
        let template = Template::new(
            "t".to_string(),
            "-a A -b B -c C".to_string(),
            vec!["A".to_string(), "B".to_string(), "C".to_string()],
        );
        let data = row(&[("B", "1")]);

        let err = template.generate(&data).unwrap_err();
        assert_eq!(err.template_id, "t");
        assert_eq!(err.columns, vec!["A", "C"]);
    }

    #[test]
    fn generate_missing_single_column() {
        let template = Template::new("t".to_string(), "-f A".to_string(), vec!["A".to_string()]);
        let data = row(&[("B", "1")]);

        let err = template.generate(&data).unwrap_err();
        assert_eq!(err.columns, vec!["A"]);
    }

    #[test]
    fn generate_substitutes_literally_with_special_characters() {
        let template = Template::new(
            "t".to_string(),
            "grep C++ file".to_string(),
            vec!["C++".to_string()],
        );
        let data = row(&[("C++", "pattern")]);

        assert_eq!(template.generate(&data).unwrap(), "grep pattern file");
    }

    #[test]
    fn generate_leaves_row_untouched() {
        let template = Template::new("t".to_string(), "-f A".to_string(), vec!["A".to_string()]);
        let data = row(&[("A", "x")]);
        let before = data.clone();

        template.generate(&data).unwrap();
        assert_eq!(data, before);
    }
}

//! Template definition parsing and package persistence.
//!
//! A definition file holds one template per line:
//!
//! ```text
//! deploy : scp -r [Build] [Host]:/srv/app
//! restart : ssh [Host] systemctl restart app
//! ```
//!
//! A parsed package persists as a JSON object mapping each template id to
//! `{"command": <delimiter-stripped body>, "required_columns": [..]}`. The
//! field names are read by external tooling and must not change.

use crate::template::Template;
use indexmap::IndexMap;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Knobs for parsing template definition text.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Splits a definition line into id and command body.
    pub separator: String,
    /// Opens a column placeholder.
    pub left_delimiter: String,
    /// Closes a column placeholder.
    pub right_delimiter: String,
    /// What the delimiters are replaced with in the stored body.
    pub strip: String,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            separator: ":".to_string(),
            left_delimiter: "[".to_string(),
            right_delimiter: "]".to_string(),
            strip: String::new(),
        }
    }
}

#[derive(Debug)]
pub enum PackageError {
    /// A definition line has no id/body separator.
    MalformedLine { line: usize },
    /// A placeholder delimiter has no counterpart on the line.
    UnbalancedPlaceholder { line: usize, missing: String },
    /// A placeholder opens inside another placeholder.
    NestedPlaceholder { line: usize },
    /// The same template id was defined twice. `line` is set when the
    /// duplicate was found while parsing definition text.
    DuplicateId { id: String, line: Option<usize> },
    InvalidJson(String),
    IoError(std::io::Error),
}

impl fmt::Display for PackageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackageError::MalformedLine { line } => {
                write!(f, "Cannot parse template at line {}: missing separator", line)
            }
            PackageError::UnbalancedPlaceholder { line, missing } => write!(
                f,
                "Cannot parse template at line {}: missing delimiter '{}'",
                line, missing
            ),
            PackageError::NestedPlaceholder { line } => write!(
                f,
                "Cannot parse template at line {}: nested placeholders are not supported",
                line
            ),
            PackageError::DuplicateId { id, line: Some(line) } => {
                write!(f, "Duplicate template id '{}' at line {}", id, line)
            }
            PackageError::DuplicateId { id, line: None } => {
                write!(f, "Duplicate template id '{}'", id)
            }
            PackageError::InvalidJson(msg) => write!(f, "Invalid JSON in package: {}", msg),
            PackageError::IoError(e) => write!(f, "IO error reading package: {}", e),
        }
    }
}

impl std::error::Error for PackageError {}

impl From<std::io::Error> for PackageError {
    fn from(e: std::io::Error) -> Self {
        PackageError::IoError(e)
    }
}

/// A named, id-keyed collection of templates. Iteration order is the order
/// templates were defined in.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplatePackage {
    name: String,
    templates: IndexMap<String, Template>,
}

/// Persisted form of one template.
#[derive(Debug, Serialize, Deserialize)]
struct PackageEntry {
    command: String,
    required_columns: Vec<String>,
}

impl TemplatePackage {
    /// Parse definition text, one template per line, in source-line order.
    ///
    /// Fails on the first malformed line, unbalanced or nested placeholder,
    /// or repeated template id. Line numbers in errors are 1-based.
    pub fn parse(name: &str, text: &str, options: &ParseOptions) -> Result<Self, PackageError> {
        let mut templates = IndexMap::new();
        for (index, line) in text.lines().enumerate() {
            let line_number = index + 1;
            let Some((raw_id, definition)) = line.split_once(&options.separator) else {
                return Err(PackageError::MalformedLine { line: line_number });
            };

            let id = raw_id.trim().to_string();
            if templates.contains_key(&id) {
                return Err(PackageError::DuplicateId {
                    id,
                    line: Some(line_number),
                });
            }

            let required_columns = extract_columns(definition, options).map_err(|e| match e {
                ScanError::MissingDelimiter(missing) => PackageError::UnbalancedPlaceholder {
                    line: line_number,
                    missing,
                },
                ScanError::Nested => PackageError::NestedPlaceholder { line: line_number },
            })?;
            let body = strip_delimiters(definition, options);

            templates.insert(id.clone(), Template::new(id, body, required_columns));
        }
        Ok(Self {
            name: name.to_string(),
            templates,
        })
    }

    /// Rebuild a package from its persisted JSON form. A repeated top-level
    /// id is rejected, matching parse-time behavior.
    pub fn from_json(name: &str, json: &str) -> Result<Self, PackageError> {
        let RawEntries(entries) =
            serde_json::from_str(json).map_err(|e| PackageError::InvalidJson(e.to_string()))?;

        let mut templates = IndexMap::new();
        for (id, entry) in entries {
            if templates.contains_key(&id) {
                return Err(PackageError::DuplicateId { id, line: None });
            }
            templates.insert(
                id.clone(),
                Template::new(id, entry.command, entry.required_columns),
            );
        }
        Ok(Self {
            name: name.to_string(),
            templates,
        })
    }

    /// Load a persisted package; the package name is the file stem.
    pub fn load(path: &Path) -> Result<Self, PackageError> {
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("package");
        let content = fs::read_to_string(path)?;
        Self::from_json(name, &content)
    }

    /// Serialize to the persisted JSON form.
    pub fn to_json(&self) -> Result<String, PackageError> {
        let mut entries = serde_json::Map::new();
        for template in self.templates.values() {
            let entry = PackageEntry {
                command: template.body().to_string(),
                required_columns: template.required_columns().to_vec(),
            };
            let value =
                serde_json::to_value(entry).map_err(|e| PackageError::InvalidJson(e.to_string()))?;
            entries.insert(template.id().to_string(), value);
        }
        serde_json::to_string_pretty(&entries).map_err(|e| PackageError::InvalidJson(e.to_string()))
    }

    pub fn save_to(&self, path: &Path) -> Result<(), PackageError> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Write the package into `dir`, file name = package name. Returns the
    /// written path.
    pub fn save_in(&self, dir: &Path) -> Result<PathBuf, PackageError> {
        let path = dir.join(&self.name);
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, id: &str) -> Option<&Template> {
        self.templates.get(id)
    }

    pub fn templates(&self) -> impl Iterator<Item = &Template> {
        self.templates.values()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

enum ScanError {
    MissingDelimiter(String),
    Nested,
}

/// Walk the definition left to right collecting placeholder column names.
///
/// Rejects a right delimiter with no open placeholder (the left delimiter is
/// reported missing), an unclosed placeholder at end of line (the right
/// delimiter is reported missing), and a placeholder opening inside another.
fn extract_columns(definition: &str, options: &ParseOptions) -> Result<Vec<String>, ScanError> {
    let left = options.left_delimiter.as_str();
    let right = options.right_delimiter.as_str();
    if left.is_empty() || right.is_empty() {
        return Ok(Vec::new());
    }

    let mut columns = Vec::new();
    let mut open_at: Option<usize> = None;
    let mut cursor = 0;

    while cursor < definition.len() {
        let next_left = definition[cursor..].find(left).map(|i| cursor + i);
        let next_right = definition[cursor..].find(right).map(|i| cursor + i);

        let (is_left, position) = match (next_left, next_right) {
            (None, None) => break,
            (Some(l), None) => (true, l),
            (None, Some(r)) => (false, r),
            (Some(l), Some(r)) => {
                if l < r {
                    (true, l)
                } else {
                    (false, r)
                }
            }
        };

        if is_left {
            if open_at.is_some() {
                return Err(ScanError::Nested);
            }
            open_at = Some(position + left.len());
            cursor = position + left.len();
        } else {
            match open_at.take() {
                Some(start) => {
                    columns.push(definition[start..position].to_string());
                    cursor = position + right.len();
                }
                None => return Err(ScanError::MissingDelimiter(left.to_string())),
            }
        }
    }

    if open_at.is_some() {
        return Err(ScanError::MissingDelimiter(right.to_string()));
    }
    Ok(columns)
}

/// Replace every placeholder delimiter with the strip string, leaving the
/// column names exposed as literal text.
fn strip_delimiters(definition: &str, options: &ParseOptions) -> String {
    let mut body = definition.to_string();
    if !options.left_delimiter.is_empty() {
        body = body.replace(&options.left_delimiter, &options.strip);
    }
    if !options.right_delimiter.is_empty() {
        body = body.replace(&options.right_delimiter, &options.strip);
    }
    body
}

/// Persisted entries in document order. A derived map deserializer would
/// silently keep the last value for a repeated key; the visitor sees every
/// key as written so load can reject duplicates.
struct RawEntries(Vec<(String, PackageEntry)>);

impl<'de> Deserialize<'de> for RawEntries {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = RawEntries;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of template ids to package entries")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::new();
                while let Some((id, entry)) = map.next_entry::<String, PackageEntry>()? {
                    entries.push((id, entry));
                }
                Ok(RawEntries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}

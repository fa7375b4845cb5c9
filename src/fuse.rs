//! Combines a row sequence with a template package into an ordered list of
//! generated command strings.

use crate::data::Row;
use crate::package::TemplatePackage;
use crate::template::MissingColumnsError;
use indexmap::IndexMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// How generated commands are ordered in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// Row order, then within-row id order.
    #[default]
    Sequential,
    /// All commands of one template batched together, buckets ordered by the
    /// first appearance of their id in the data.
    Grouped,
}

impl Strategy {
    pub fn selector(&self) -> &'static str {
        match self {
            Strategy::Sequential => "seq",
            Strategy::Grouped => "group",
        }
    }
}

impl FromStr for Strategy {
    type Err = FuseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "seq" => Ok(Strategy::Sequential),
            "group" => Ok(Strategy::Grouped),
            other => Err(FuseError::UnsupportedStrategy(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FuseOptions {
    /// Row column holding the separated list of template ids to invoke.
    pub command_column: String,
    /// Separator between ids inside the command column.
    pub id_separator: String,
    pub strategy: Strategy,
}

impl Default for FuseOptions {
    fn default() -> Self {
        Self {
            command_column: "CMD".to_string(),
            id_separator: ";".to_string(),
            strategy: Strategy::Sequential,
        }
    }
}

#[derive(Debug)]
pub enum FuseError {
    /// A row referenced a template id the package does not contain.
    UnknownTemplateId { id: String, row: usize },
    /// Generation failed for a row; carries which row it was.
    MissingColumns {
        row: usize,
        source: MissingColumnsError,
    },
    UnsupportedStrategy(String),
    IoError(std::io::Error),
}

impl fmt::Display for FuseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FuseError::UnknownTemplateId { id, row } => {
                write!(f, "Cannot resolve template id '{}' at row {}", id, row)
            }
            FuseError::MissingColumns { row, source } => {
                write!(f, "{} at row {}", source, row)
            }
            FuseError::UnsupportedStrategy(selector) => {
                write!(f, "Not a supported fuse strategy: {}", selector)
            }
            FuseError::IoError(e) => write!(f, "IO error writing fused commands: {}", e),
        }
    }
}

impl std::error::Error for FuseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FuseError::MissingColumns { source, .. } => Some(source),
            FuseError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for FuseError {
    fn from(e: std::io::Error) -> Self {
        FuseError::IoError(e)
    }
}

/// The fusion engine. Borrows the rows and the package; every produced
/// command string is owned and independent.
///
/// Row indices reported in errors are 1-based: the first data row after the
/// header is row 1. Any failure aborts the whole run with no partial output.
pub struct CommandFuse<'a> {
    rows: &'a [Row],
    package: &'a TemplatePackage,
    options: FuseOptions,
}

impl<'a> CommandFuse<'a> {
    pub fn new(rows: &'a [Row], package: &'a TemplatePackage, options: FuseOptions) -> Self {
        Self {
            rows,
            package,
            options,
        }
    }

    /// Generate the commands under the configured strategy.
    pub fn fuse(&self) -> Result<Vec<String>, FuseError> {
        match self.options.strategy {
            Strategy::Sequential => self.fuse_sequential(),
            Strategy::Grouped => self.fuse_grouped(),
        }
    }

    /// Generate and write the commands to `path`, joined with `\n`.
    ///
    /// A single `\n` is used regardless of platform.
    pub fn fuse_to_file(&self, path: &Path) -> Result<Vec<String>, FuseError> {
        let commands = self.fuse()?;
        fs::write(path, commands.join("\n"))?;
        Ok(commands)
    }

    fn fuse_sequential(&self) -> Result<Vec<String>, FuseError> {
        let mut generated = Vec::new();
        self.for_each_command(|_, command| generated.push(command))?;
        Ok(generated)
    }

    fn fuse_grouped(&self) -> Result<Vec<String>, FuseError> {
        let mut buckets: IndexMap<String, Vec<String>> = IndexMap::new();
        self.for_each_command(|id, command| {
            buckets.entry(id.to_string()).or_default().push(command)
        })?;
        Ok(buckets.into_values().flatten().collect())
    }

    /// Walk rows in order, resolve each listed id and generate its command.
    /// Rows with a missing or empty command column contribute nothing.
    fn for_each_command(&self, mut emit: impl FnMut(&str, String)) -> Result<(), FuseError> {
        for (index, row) in self.rows.iter().enumerate() {
            let row_number = index + 1;
            let Some(value) = row.get(&self.options.command_column) else {
                continue;
            };
            let id_list = value.to_string();
            if id_list.is_empty() {
                continue;
            }

            for id in id_list.split(&self.options.id_separator).map(str::trim) {
                let Some(template) = self.package.get(id) else {
                    return Err(FuseError::UnknownTemplateId {
                        id: id.to_string(),
                        row: row_number,
                    });
                };
                let command = template.generate(row).map_err(|source| {
                    FuseError::MissingColumns {
                        row: row_number,
                        source,
                    }
                })?;
                emit(template.id(), command);
            }
        }
        Ok(())
    }
}

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use csv::{QuoteStyle, Terminator, WriterBuilder};

use thiserror::Error;
use tracing::info;

use crate::models::LineItem;
use crate::table::LineItemTable;

const CSV_HEADER: [&str; 4] = ["item", "quantity", "unitPrice", "price"];

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write export: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize line items: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to write CSV: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

/// Render the table as comma-separated text with a header row.
///
/// Descriptions are always quoted; numbers are written in their plain display form.
pub fn to_csv(table: &LineItemTable) -> Result<String, ExportError> {
    // Descriptions arrive pre-quoted, so the writer must not quote again
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Never)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(CSV_HEADER)?;
    for item in table.rows() {
        writer.write_record([
            quote_field(&item.description),
            item.quantity.to_string(),
            item.unit_price.to_string(),
            item.total_price.to_string(),
        ])?;
    }

    let bytes = writer.into_inner().map_err(|err| err.into_error())?;
    String::from_utf8(bytes).map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err).into())
}

/// Render the table rows as a pretty-printed JSON array.
pub fn to_json(table: &LineItemTable) -> Result<String, ExportError> {
    let rows: &[LineItem] = table.rows();
    Ok(serde_json::to_string_pretty(rows)?)
}

fn quote_field(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// File name stem for a breakdown name: lowercase alphanumerics joined by `-`.
pub fn file_stem(name: &str) -> String {
    let stem = name
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-");

    if stem.is_empty() { "breakdown".to_string() } else { stem }
}

/// Writes table exports into a directory
pub struct Exporter {
    output_dir: PathBuf,
}

impl Exporter {
    pub fn new(output_dir: impl AsRef<Path>) -> Result<Self, ExportError> {
        let path = output_dir.as_ref();
        if !path.exists() {
            fs::create_dir_all(path)?;
        }

        Ok(Self {
            output_dir: path.to_path_buf(),
        })
    }

    /// Write `table` as `<stem>.<ext>` and return the written path.
    pub fn export(
        &self,
        table: &LineItemTable,
        format: ExportFormat,
        stem: &str,
    ) -> Result<PathBuf, ExportError> {
        let content = match format {
            ExportFormat::Csv => to_csv(table)?,
            ExportFormat::Json => to_json(table)?,
        };

        let path = self.output_dir.join(format!("{}.{}", stem, format.extension()));
        let mut file = File::create(&path)?;
        file.write_all(content.as_bytes())?;

        info!(path = %path.display(), rows = table.len(), ?format, "exported line items");
        Ok(path)
    }
}

//! Loading the initial rows produced by document extraction.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::models::{LineItem, RawValue};
use crate::reconcile::{parse_amount, parse_leading_number};

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to read seed file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("seed file is not a list of line items: {0}")]
    Parse(#[from] serde_json::Error),
}

// Extraction output is loosely typed: numbers may arrive as strings or be missing.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct SeedRecord {
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    quantity: Option<RawValue>,
    #[serde(default)]
    unit_price: Option<RawValue>,
    #[serde(default)]
    total_price: Option<RawValue>,
}

impl From<SeedRecord> for LineItem {
    fn from(record: SeedRecord) -> Self {
        let quantity = match record.quantity {
            Some(RawValue::Number(n)) if n.is_finite() => n,
            Some(RawValue::Text(text)) => parse_leading_number(&text).unwrap_or(1.0),
            _ => 1.0,
        };

        LineItem {
            description: record.description.unwrap_or_default(),
            quantity,
            unit_price: record.unit_price.as_ref().map(parse_amount).unwrap_or(0.0),
            total_price: record.total_price.as_ref().map(parse_amount).unwrap_or(0.0),
        }
    }
}

pub fn parse_seed(json: &str) -> Result<Vec<LineItem>, SeedError> {
    let records: Vec<SeedRecord> = serde_json::from_str(json)?;
    Ok(records.into_iter().map(LineItem::from).collect())
}

pub fn load_seed(path: &Path) -> Result<Vec<LineItem>, SeedError> {
    let content = fs::read_to_string(path).map_err(|source| SeedError::Read {
        path: path.display().to_string(),
        source,
    })?;

    let items = parse_seed(&content)?;
    if items.is_empty() {
        warn!(path = %path.display(), "seed file contains no line items");
    } else {
        info!(path = %path.display(), rows = items.len(), "loaded seed line items");
    }

    Ok(items)
}

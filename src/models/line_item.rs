use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub description: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub total_price: f64,
}

impl LineItem {
    pub fn new(
        description: impl Into<String>,
        quantity: f64,
        unit_price: f64,
        total_price: f64,
    ) -> Self {
        Self {
            description: description.into(),
            quantity,
            unit_price,
            total_price,
        }
    }
}

// Column of a line item that the user can edit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineItemField {
    Description,
    Quantity,
    UnitPrice,
    TotalPrice,
}

impl LineItemField {
    pub const ALL: [LineItemField; 4] = [
        LineItemField::Description,
        LineItemField::Quantity,
        LineItemField::UnitPrice,
        LineItemField::TotalPrice,
    ];

    pub fn label(self) -> &'static str {
        match self {
            LineItemField::Description => "Description",
            LineItemField::Quantity => "Quantity",
            LineItemField::UnitPrice => "Unit Price",
            LineItemField::TotalPrice => "Total",
        }
    }

    pub fn is_numeric(self) -> bool {
        !matches!(self, LineItemField::Description)
    }

    /// Current value of this field on `item`, as the editor shows it.
    pub fn display_value(self, item: &LineItem) -> String {
        match self {
            LineItemField::Description => item.description.clone(),
            LineItemField::Quantity => item.quantity.to_string(),
            LineItemField::UnitPrice => item.unit_price.to_string(),
            LineItemField::TotalPrice => item.total_price.to_string(),
        }
    }
}

/// A value typed into a cell or delivered by the extraction step.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Text(String),
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Number(value)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::Text(value)
    }
}

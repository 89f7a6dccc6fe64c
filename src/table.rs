use tracing::debug;

use crate::models::{LineItem, LineItemField, RawValue};
use crate::reconcile::reconcile;

pub const DEFAULT_NEW_ITEM_LABEL: &str = "new item";

/// Ordered, editable set of line items for one breakdown.
///
/// Every operation is total: bad indices are ignored and bad numbers degrade
/// to zero, so no keystroke can leave the table unusable.
#[derive(Debug, Clone)]
pub struct LineItemTable {
    rows: Vec<LineItem>,
    new_item_label: String,
}

impl Default for LineItemTable {
    fn default() -> Self {
        Self::new(DEFAULT_NEW_ITEM_LABEL)
    }
}

impl LineItemTable {
    pub fn new(new_item_label: &str) -> Self {
        Self::from_items(Vec::new(), new_item_label)
    }

    pub fn from_items(rows: Vec<LineItem>, new_item_label: &str) -> Self {
        Self {
            rows,
            new_item_label: new_item_label.to_string(),
        }
    }

    pub fn rows(&self) -> &[LineItem] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&LineItem> {
        self.rows.get(index)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append a blank row and return its index.
    pub fn add_row(&mut self) -> usize {
        self.rows.push(LineItem::new(self.new_item_label.clone(), 1.0, 0.0, 0.0));
        debug!(rows = self.rows.len(), "added line item");
        self.rows.len() - 1
    }

    pub fn remove_row(&mut self, index: usize) -> Option<LineItem> {
        if index >= self.rows.len() {
            debug!(index, rows = self.rows.len(), "ignoring removal of missing row");
            return None;
        }
        Some(self.rows.remove(index))
    }

    /// Reconcile an edit into the row at `index`. Returns `false` when there is no such row.
    pub fn update_field(
        &mut self,
        index: usize,
        field: LineItemField,
        raw: impl Into<RawValue>,
    ) -> bool {
        let Some(current) = self.rows.get(index) else {
            debug!(index, ?field, "ignoring edit of missing row");
            return false;
        };

        let updated = reconcile(current, field, &raw.into());
        self.rows[index] = updated;
        true
    }

    pub fn grand_total(&self) -> f64 {
        self.rows.iter().map(|item| item.total_price).sum()
    }

    /// Fraction of the grand total contributed by the row at `index`.
    pub fn row_share(&self, index: usize) -> f64 {
        let total = self.grand_total();
        match self.rows.get(index) {
            Some(item) if total != 0.0 => item.total_price / total,
            _ => 0.0,
        }
    }

    /// Current rows and grand total, as handed to persistence.
    pub fn snapshot(&self) -> (Vec<LineItem>, f64) {
        (self.rows.clone(), self.grand_total())
    }
}

//! Keeps a line item's price figures consistent after a single-field edit.
//!
//! Editing the quantity or the unit price recomputes the total; editing the
//! total recomputes the unit price. Only the derived field is rounded, so the
//! field being typed into keeps exactly what the user entered.

use crate::models::{LineItem, LineItemField, RawValue};

/// Parse an edit value as a number. Anything unparseable becomes `0`.
pub fn parse_amount(raw: &RawValue) -> f64 {
    let value = match raw {
        RawValue::Number(n) => Some(*n),
        RawValue::Text(text) => parse_leading_number(text),
    };

    value.filter(|n| n.is_finite()).unwrap_or(0.0)
}

/// Read the number at the start of `text`, ignoring leading whitespace and
/// anything after it, so `"22.50 EUR"` reads as `22.5`.
pub fn parse_leading_number(text: &str) -> Option<f64> {
    let s = text.trim_start();
    let bytes = s.as_bytes();
    let digits_from = |mut at: usize| {
        while at < bytes.len() && bytes[at].is_ascii_digit() {
            at += 1;
        }
        at
    };

    let mut end = if matches!(bytes.first(), Some(b'+' | b'-')) { 1 } else { 0 };
    let int_end = digits_from(end);
    let mut digits = int_end - end;
    end = int_end;

    if bytes.get(end) == Some(&b'.') {
        let frac_end = digits_from(end + 1);
        digits += frac_end - (end + 1);
        if digits > 0 {
            end = frac_end;
        }
    }
    if digits == 0 {
        return None;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let sign = usize::from(matches!(bytes.get(end + 1), Some(b'+' | b'-')));
        let exp_start = end + 1 + sign;
        let exp_end = digits_from(exp_start);
        if exp_end > exp_start {
            end = exp_end;
        }
    }

    s[..end].parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Round to 2 decimal places, half away from zero.
pub fn round_currency(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Apply `raw` to `field` of `current` and recompute the dependent field.
pub fn reconcile(current: &LineItem, field: LineItemField, raw: &RawValue) -> LineItem {
    let mut item = current.clone();

    match field {
        LineItemField::Description => {
            item.description = match raw {
                RawValue::Text(text) => text.clone(),
                RawValue::Number(n) => n.to_string(),
            };
        }
        LineItemField::Quantity => {
            item.quantity = parse_amount(raw);
            item.total_price = round_currency(item.quantity * item.unit_price);
        }
        LineItemField::UnitPrice => {
            item.unit_price = parse_amount(raw);
            item.total_price = round_currency(item.quantity * item.unit_price);
        }
        LineItemField::TotalPrice => {
            item.total_price = parse_amount(raw);
            item.unit_price = if item.quantity > 0.0 {
                round_currency(item.total_price / item.quantity)
            } else {
                0.0
            };
        }
    }

    item
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn paint() -> LineItem {
        LineItem::new("Paint", 2.0, 150.0, 300.0)
    }

    #[test]
    fn quantity_edit_recomputes_total() {
        let item = reconcile(&paint(), LineItemField::Quantity, &RawValue::from(3.0));
        assert_eq!(item, LineItem::new("Paint", 3.0, 150.0, 450.0));
    }

    #[test]
    fn total_edit_recomputes_unit_price() {
        let current = LineItem::new("Tiles", 4.0, 25.0, 100.0);
        let item = reconcile(&current, LineItemField::TotalPrice, &RawValue::from("90"));
        assert_eq!(item.quantity, 4.0);
        assert_eq!(item.unit_price, 22.5);
        assert_eq!(item.total_price, 90.0);
    }

    #[test]
    fn total_edit_with_zero_quantity_zeroes_unit_price() {
        let current = LineItem::new("Grout", 0.0, 10.0, 0.0);
        let item = reconcile(&current, LineItemField::TotalPrice, &RawValue::from(50.0));
        assert_eq!(item.unit_price, 0.0);
        assert_eq!(item.total_price, 50.0);
    }

    #[test]
    fn empty_quantity_degrades_to_zero() {
        let item = reconcile(&paint(), LineItemField::Quantity, &RawValue::from(""));
        assert_eq!(item.quantity, 0.0);
        assert_eq!(item.total_price, 0.0);
    }

    #[test]
    fn garbage_unit_price_degrades_to_zero() {
        let item = reconcile(&paint(), LineItemField::UnitPrice, &RawValue::from("abc"));
        assert_eq!(item.unit_price, 0.0);
        assert_eq!(item.total_price, 0.0);
    }

    #[test]
    fn leading_number_is_read_from_text_with_units() {
        assert_eq!(parse_amount(&RawValue::from("22.50 EUR")), 22.5);
        assert_eq!(parse_amount(&RawValue::from("12,5abc")), 12.0);
        assert_eq!(parse_amount(&RawValue::from("  -3.5m2")), -3.5);
        assert_eq!(parse_amount(&RawValue::from(".5")), 0.5);
        assert_eq!(parse_amount(&RawValue::from("5.")), 5.0);
        assert_eq!(parse_amount(&RawValue::from("1e3 units")), 1000.0);
        assert_eq!(parse_amount(&RawValue::from("2e")), 2.0);
        assert_eq!(parse_amount(&RawValue::from("1e999")), 0.0);
        assert_eq!(parse_leading_number("-"), None);
        assert_eq!(parse_leading_number("."), None);
        assert_eq!(parse_leading_number("EUR 22.50"), None);
    }

    #[test]
    fn quantity_with_unit_suffix_reconciles() {
        let item = reconcile(&paint(), LineItemField::Quantity, &RawValue::from("3 pcs"));
        assert_eq!(item.quantity, 3.0);
        assert_eq!(item.total_price, 450.0);
    }

    #[test]
    fn non_finite_text_is_treated_as_zero() {
        assert_eq!(parse_amount(&RawValue::from("NaN")), 0.0);
        assert_eq!(parse_amount(&RawValue::from("inf")), 0.0);
        assert_eq!(parse_amount(&RawValue::from(" 7.25 ")), 7.25);
    }

    #[test]
    fn description_edit_leaves_numbers_alone() {
        let current = LineItem::new("Paint", 3.0, 0.333, 1.0);
        let raw = RawValue::from("Primer \"white\"");
        let item = reconcile(&current, LineItemField::Description, &raw);
        assert_eq!(item.description, "Primer \"white\"");
        assert_eq!(item.quantity, 3.0);
        assert_eq!(item.unit_price, 0.333);
        assert_eq!(item.total_price, 1.0);
    }

    #[test]
    fn edited_field_is_not_rounded() {
        let item = reconcile(&paint(), LineItemField::UnitPrice, &RawValue::from("10.005"));
        assert_eq!(item.unit_price, 10.005);
        assert_eq!(item.total_price, round_currency(2.0 * 10.005));
    }

    #[test]
    fn input_is_not_mutated() {
        let current = paint();
        let _ = reconcile(&current, LineItemField::Quantity, &RawValue::from(9.0));
        assert_eq!(current, paint());
    }

    #[test]
    fn rounding_is_half_away_from_zero() {
        assert_eq!(round_currency(0.125), 0.13);
        assert_eq!(round_currency(-0.125), -0.13);
        assert_eq!(round_currency(2.5), 2.5);
        assert_eq!(round_currency(1.0 / 3.0), 0.33);
    }

    #[test]
    fn negative_values_pass_through() {
        let item = reconcile(&paint(), LineItemField::Quantity, &RawValue::from(-1.0));
        assert_eq!(item.quantity, -1.0);
        assert_eq!(item.total_price, -150.0);
    }

    proptest! {
        #[test]
        fn quantity_edit_keeps_total_consistent(q in 0.0f64..10_000.0, u in 0.0f64..10_000.0) {
            let current = LineItem::new("x", 1.0, u, 0.0);
            let item = reconcile(&current, LineItemField::Quantity, &RawValue::from(q));
            prop_assert_eq!(item.total_price, round_currency(item.quantity * item.unit_price));
        }

        #[test]
        fn unit_price_edit_keeps_total_consistent(q in 0.0f64..10_000.0, u in 0.0f64..10_000.0) {
            let current = LineItem::new("x", q, 0.0, 0.0);
            let raw = RawValue::from(u.to_string());
            let item = reconcile(&current, LineItemField::UnitPrice, &raw);
            prop_assert_eq!(item.total_price, round_currency(item.quantity * item.unit_price));
        }

        #[test]
        fn total_edit_derives_unit_price(t in 0.0f64..100_000.0, q in 0.0f64..1_000.0) {
            let current = LineItem::new("x", q, 1.0, q);
            let item = reconcile(&current, LineItemField::TotalPrice, &RawValue::from(t));
            let expected = if q > 0.0 { round_currency(t / q) } else { 0.0 };
            prop_assert_eq!(item.unit_price, expected);
            prop_assert_eq!(item.total_price, t);
        }

        #[test]
        fn repeated_edit_is_idempotent(v in 0.0f64..10_000.0, field_idx in 0usize..4) {
            let field = LineItemField::ALL[field_idx];
            let raw = RawValue::from(v);
            let once = reconcile(&paint(), field, &raw);
            let twice = reconcile(&once, field, &raw);
            prop_assert_eq!(once, twice);
        }
    }
}

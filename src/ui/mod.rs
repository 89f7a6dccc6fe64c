pub mod line_items;

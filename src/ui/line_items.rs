use anyhow::Result;
use crossterm::event::{self, Event, KeyCode};
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame,
};

use crate::export::ExportFormat;
use crate::models::LineItemField;
use crate::table::LineItemTable;

// Represents the state of the line item editor
pub struct LineItemsState {
    name: String,
    table: LineItemTable,
    table_state: TableState,
    column: LineItemField,
    edit_buffer: Option<String>,
    show_delete_confirmation: bool,
    status: Option<String>,
    show_error: Option<String>,
}

impl LineItemsState {
    pub fn new(name: impl Into<String>, table: LineItemTable) -> Self {
        let mut table_state = TableState::default();
        if !table.is_empty() {
            table_state.select(Some(0));
        }

        Self {
            name: name.into(),
            table,
            table_state,
            column: LineItemField::Description,
            edit_buffer: None,
            show_delete_confirmation: false,
            status: None,
            show_error: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table(&self) -> &LineItemTable {
        &self.table
    }

    pub fn selected(&self) -> Option<usize> {
        self.table_state.selected().filter(|i| *i < self.table.len())
    }

    pub fn column(&self) -> LineItemField {
        self.column
    }

    pub fn is_editing(&self) -> bool {
        self.edit_buffer.is_some()
    }

    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status = Some(message.into());
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.show_error = Some(message.into());
    }

    pub fn next(&mut self) {
        if self.table.is_empty() {
            return;
        }

        let i = match self.table_state.selected() {
            Some(i) => {
                if i >= self.table.len() - 1 {
                    0
                } else {
                    i + 1
                }
            }
            None => 0,
        };
        self.table_state.select(Some(i));
    }

    pub fn previous(&mut self) {
        if self.table.is_empty() {
            return;
        }

        let i = match self.table_state.selected() {
            Some(i) => {
                if i == 0 {
                    self.table.len() - 1
                } else {
                    i - 1
                }
            }
            None => 0,
        };
        self.table_state.select(Some(i));
    }

    pub fn next_column(&mut self) {
        self.column = match self.column {
            LineItemField::Description => LineItemField::Quantity,
            LineItemField::Quantity => LineItemField::UnitPrice,
            LineItemField::UnitPrice => LineItemField::TotalPrice,
            LineItemField::TotalPrice => LineItemField::Description,
        };
    }

    pub fn previous_column(&mut self) {
        self.column = match self.column {
            LineItemField::Description => LineItemField::TotalPrice,
            LineItemField::Quantity => LineItemField::Description,
            LineItemField::UnitPrice => LineItemField::Quantity,
            LineItemField::TotalPrice => LineItemField::UnitPrice,
        };
    }

    pub fn add_line_item(&mut self) {
        let index = self.table.add_row();
        self.table_state.select(Some(index));
        self.column = LineItemField::Description;
    }

    pub fn delete_line_item(&mut self) {
        let Some(selected) = self.selected() else {
            return;
        };

        self.table.remove_row(selected);

        // Adjust selection after deletion
        if !self.table.is_empty() {
            let new_selection = if selected >= self.table.len() {
                self.table.len() - 1
            } else {
                selected
            };
            self.table_state.select(Some(new_selection));
        } else {
            self.table_state.select(None);
        }
    }

    pub fn start_editing(&mut self) {
        if let Some(item) = self.selected().and_then(|i| self.table.row(i)) {
            self.edit_buffer = Some(self.column.display_value(item));
        }
    }

    pub fn stop_editing(&mut self) {
        self.edit_buffer = None;
    }

    // Every keystroke is reconciled immediately so derived cells track the typing.
    fn edit_current_cell(&mut self, key: KeyCode) {
        let Some(index) = self.selected() else {
            self.edit_buffer = None;
            return;
        };
        let numeric = self.column.is_numeric();
        let Some(buffer) = self.edit_buffer.as_mut() else {
            return;
        };

        match key {
            KeyCode::Char(c) if !numeric || c.is_ascii_digit() || c == '.' || c == '-' => {
                buffer.push(c);
            }
            KeyCode::Backspace => {
                buffer.pop();
            }
            _ => return,
        }

        let raw = buffer.clone();
        self.table.update_field(index, self.column, raw);
    }
}

pub enum LineItemsAction {
    Quit,
    Export(ExportFormat),
    Promote,
}

pub fn render_line_items<B: Backend>(frame: &mut Frame<B>, state: &mut LineItemsState) {
    let size = frame.size();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints(
            [
                Constraint::Length(3), // Title
                Constraint::Min(6),    // Table
                Constraint::Length(3), // Totals and status
                Constraint::Length(3), // Help
            ]
            .as_ref(),
        )
        .split(size);

    let title = Paragraph::new(format!("Cost Breakdown: {}", state.name))
        .style(Style::default().fg(Color::Cyan))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(title, chunks[0]);

    render_table(frame, state, chunks[1]);

    let mut footer = vec![Span::styled(
        format!("Grand Total: {:.2}", state.table.grand_total()),
        Style::default().add_modifier(Modifier::BOLD),
    )];
    if let Some(status) = &state.status {
        footer.push(Span::raw("  |  "));
        footer.push(Span::styled(status.clone(), Style::default().fg(Color::Green)));
    }
    let totals = Paragraph::new(Spans::from(footer)).block(Block::default().borders(Borders::ALL));
    frame.render_widget(totals, chunks[2]);

    let help_text = if state.is_editing() {
        "Type to edit | Enter/Esc - Done | Tab - Next column"
    } else if state.table.is_empty() {
        "A - Add item | C - Export CSV | J - Export JSON | Q - Quit"
    } else {
        "Enter - Edit cell | Arrows/Tab - Move | A - Add | D - Delete | \
         C - CSV | J - JSON | P - Promote | Q - Quit"
    };
    let help = Paragraph::new(help_text)
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(help, chunks[3]);

    if state.show_delete_confirmation {
        render_delete_confirmation(frame, size);
    }

    if let Some(error) = &state.show_error {
        render_error(frame, size, error);
    }
}

fn render_table<B: Backend>(frame: &mut Frame<B>, state: &mut LineItemsState, area: Rect) {
    let block = Block::default().title("Line Items").borders(Borders::ALL);

    if state.table.is_empty() {
        let empty = Paragraph::new(vec![
            Spans::from(""),
            Spans::from("No line items yet. Press A to add one."),
        ])
        .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let header_cells = LineItemField::ALL
        .iter()
        .map(|field| {
            let style = if *field == state.column() {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else {
                Style::default().add_modifier(Modifier::BOLD)
            };
            Cell::from(field.label()).style(style)
        })
        .chain(std::iter::once(Cell::from("Share")));
    let header = Row::new(header_cells).height(1).bottom_margin(1);

    let selected = state.selected();
    let rows: Vec<Row> = state
        .table
        .rows()
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let cells = LineItemField::ALL.iter().map(|field| {
                let editing_here = selected == Some(index) && *field == state.column();
                match (&state.edit_buffer, editing_here) {
                    (Some(buffer), true) => Cell::from(format!("{}|", buffer))
                        .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
                    _ => Cell::from(match field {
                        LineItemField::Description => item.description.clone(),
                        LineItemField::Quantity => item.quantity.to_string(),
                        LineItemField::UnitPrice => format!("{:.2}", item.unit_price),
                        LineItemField::TotalPrice => format!("{:.2}", item.total_price),
                    }),
                }
            });
            let share = Cell::from(format!("{:.1}%", state.table.row_share(index) * 100.0));
            Row::new(cells.chain(std::iter::once(share)).collect::<Vec<_>>())
        })
        .collect();

    let table = Table::new(rows)
        .header(header)
        .block(block)
        .highlight_style(Style::default().bg(Color::Blue).fg(Color::White))
        .widths(&[
            Constraint::Percentage(40),
            Constraint::Percentage(12),
            Constraint::Percentage(16),
            Constraint::Percentage(18),
            Constraint::Percentage(14),
        ]);

    frame.render_stateful_widget(table, area, &mut state.table_state);
}

fn render_delete_confirmation<B: Backend>(frame: &mut Frame<B>, size: Rect) {
    let popup_area = centered_rect(50, 20, size);

    let popup = Paragraph::new(vec![
        Spans::from(""),
        Spans::from("Delete the selected line item?"),
        Spans::from(""),
        Spans::from("<Y> Yes  <N> No"),
    ])
    .block(Block::default().title("Confirm Delete").borders(Borders::ALL))
    .style(Style::default().fg(Color::White).bg(Color::Black));

    frame.render_widget(popup, popup_area);
}

fn render_error<B: Backend>(frame: &mut Frame<B>, size: Rect, error: &str) {
    let popup_area = centered_rect(60, 20, size);

    let error_msg = Paragraph::new(vec![
        Spans::from(""),
        Spans::from(error),
        Spans::from(""),
        Spans::from("Press any key to continue"),
    ])
    .block(Block::default().title("Error").borders(Borders::ALL))
    .style(Style::default().fg(Color::Red));

    frame.render_widget(error_msg, popup_area);
}

// Helper function to create a centered rect
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

pub fn handle_input(state: &mut LineItemsState) -> Result<Option<LineItemsAction>> {
    if let Event::Key(key) = event::read()? {
        return Ok(handle_key(state, key.code));
    }
    Ok(None)
}

pub fn handle_key(state: &mut LineItemsState, key: KeyCode) -> Option<LineItemsAction> {
    // A status message lasts until the next key
    state.status = None;

    // Any key dismisses an error popup
    if state.show_error.take().is_some() {
        return None;
    }

    if state.show_delete_confirmation {
        match key {
            KeyCode::Char('y') => {
                state.delete_line_item();
                state.show_delete_confirmation = false;
            }
            KeyCode::Char('n') | KeyCode::Esc => {
                state.show_delete_confirmation = false;
            }
            _ => {}
        }
        return None;
    }

    if state.is_editing() {
        match key {
            KeyCode::Enter | KeyCode::Esc => state.stop_editing(),
            KeyCode::Tab => {
                state.stop_editing();
                state.next_column();
            }
            _ => state.edit_current_cell(key),
        }
        return None;
    }

    match key {
        KeyCode::Char('q') | KeyCode::Esc => return Some(LineItemsAction::Quit),
        KeyCode::Char('a') => state.add_line_item(),
        KeyCode::Char('d') => {
            if state.selected().is_some() {
                state.show_delete_confirmation = true;
            }
        }
        KeyCode::Char('c') => return Some(LineItemsAction::Export(ExportFormat::Csv)),
        KeyCode::Char('j') => return Some(LineItemsAction::Export(ExportFormat::Json)),
        KeyCode::Char('p') => {
            if state.table.is_empty() {
                state.set_error("Add at least one line item before promoting.");
            } else {
                return Some(LineItemsAction::Promote);
            }
        }
        KeyCode::Enter => state.start_editing(),
        KeyCode::Down => state.next(),
        KeyCode::Up => state.previous(),
        KeyCode::Right | KeyCode::Tab => state.next_column(),
        KeyCode::Left | KeyCode::BackTab => state.previous_column(),
        _ => {}
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LineItem;
    use crate::table::DEFAULT_NEW_ITEM_LABEL;

    fn state_with(items: Vec<LineItem>) -> LineItemsState {
        LineItemsState::new("Kitchen", LineItemTable::from_items(items, DEFAULT_NEW_ITEM_LABEL))
    }

    fn type_text(state: &mut LineItemsState, text: &str) {
        for c in text.chars() {
            handle_key(state, KeyCode::Char(c));
        }
    }

    #[test]
    fn typing_a_total_updates_unit_price_live() {
        let mut state = state_with(vec![LineItem::new("Tiles", 4.0, 25.0, 100.0)]);
        state.column = LineItemField::TotalPrice;
        handle_key(&mut state, KeyCode::Enter);

        // Clear the "100" that editing starts with
        for _ in 0..3 {
            handle_key(&mut state, KeyCode::Backspace);
        }
        assert_eq!(state.table().rows()[0].unit_price, 0.0);

        type_text(&mut state, "90");
        let row = &state.table().rows()[0];
        assert_eq!(row.total_price, 90.0);
        assert_eq!(row.unit_price, 22.5);

        handle_key(&mut state, KeyCode::Enter);
        assert!(!state.is_editing());
    }

    #[test]
    fn numeric_cells_ignore_letters() {
        let mut state = state_with(vec![LineItem::new("Paint", 2.0, 150.0, 300.0)]);
        state.column = LineItemField::Quantity;
        handle_key(&mut state, KeyCode::Enter);
        type_text(&mut state, "x");
        assert_eq!(state.table().rows()[0].quantity, 2.0);

        handle_key(&mut state, KeyCode::Backspace);
        type_text(&mut state, "3");
        assert_eq!(state.table().rows()[0].total_price, 450.0);
    }

    #[test]
    fn editing_keys_do_not_trigger_commands() {
        let mut state = state_with(vec![LineItem::new("Paint", 2.0, 150.0, 300.0)]);
        handle_key(&mut state, KeyCode::Enter);
        assert!(handle_key(&mut state, KeyCode::Char('q')).is_none());
        type_text(&mut state, "ed");
        assert_eq!(state.table().rows()[0].description, "Paintqed");
    }

    #[test]
    fn add_then_delete_with_confirmation() {
        let mut state = state_with(Vec::new());
        assert_eq!(state.selected(), None);

        handle_key(&mut state, KeyCode::Char('a'));
        assert_eq!(state.selected(), Some(0));
        assert_eq!(state.table().rows()[0].description, "new item");

        handle_key(&mut state, KeyCode::Char('d'));
        handle_key(&mut state, KeyCode::Char('n'));
        assert_eq!(state.table().len(), 1);

        handle_key(&mut state, KeyCode::Char('d'));
        handle_key(&mut state, KeyCode::Char('y'));
        assert!(state.table().is_empty());
        assert_eq!(state.selected(), None);
    }

    #[test]
    fn selection_wraps() {
        let mut state = state_with(vec![
            LineItem::new("A", 1.0, 1.0, 1.0),
            LineItem::new("B", 1.0, 2.0, 2.0),
        ]);
        handle_key(&mut state, KeyCode::Up);
        assert_eq!(state.selected(), Some(1));
        handle_key(&mut state, KeyCode::Down);
        assert_eq!(state.selected(), Some(0));

        handle_key(&mut state, KeyCode::Left);
        assert_eq!(state.column(), LineItemField::TotalPrice);
    }

    #[test]
    fn commands_map_to_actions() {
        let mut state = state_with(vec![LineItem::new("A", 1.0, 1.0, 1.0)]);
        assert!(matches!(
            handle_key(&mut state, KeyCode::Char('c')),
            Some(LineItemsAction::Export(ExportFormat::Csv))
        ));
        assert!(matches!(
            handle_key(&mut state, KeyCode::Char('j')),
            Some(LineItemsAction::Export(ExportFormat::Json))
        ));
        assert!(matches!(
            handle_key(&mut state, KeyCode::Char('p')),
            Some(LineItemsAction::Promote)
        ));
        assert!(matches!(handle_key(&mut state, KeyCode::Char('q')), Some(LineItemsAction::Quit)));
    }

    #[test]
    fn status_clears_on_next_key() {
        let mut state = state_with(vec![LineItem::new("A", 1.0, 1.0, 1.0)]);
        state.set_status("Exported to exports/kitchen.csv");
        assert!(state.status.is_some());

        handle_key(&mut state, KeyCode::Down);
        assert!(state.status.is_none());
    }

    #[test]
    fn promoting_empty_table_shows_error() {
        let mut state = state_with(Vec::new());
        assert!(handle_key(&mut state, KeyCode::Char('p')).is_none());
        assert!(state.show_error.is_some());

        // The next key only dismisses the popup
        assert!(handle_key(&mut state, KeyCode::Char('q')).is_none());
        assert!(state.show_error.is_none());
    }
}

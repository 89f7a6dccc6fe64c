mod config;
mod db;
mod export;
mod logging;
mod models;
mod reconcile;
mod seed;
mod table;
mod ui;

use std::io;
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use tracing::{error, info, warn};
use tui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};

use crate::config::Config;
use crate::export::{file_stem, ExportFormat, Exporter};
use crate::logging::LogSink;
use crate::table::LineItemTable;
use crate::ui::line_items::{handle_input, render_line_items, LineItemsAction, LineItemsState};

#[derive(Parser)]
#[command(name = "cost-breakdown", about = "Edit, export and promote line-item cost breakdowns")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Edit a breakdown interactively
    Edit {
        /// JSON file of extracted line items to start from
        #[arg(long)]
        seed: Option<PathBuf>,
        /// Name used for exports and promotion
        #[arg(long)]
        name: Option<String>,
    },
    /// Export a seed file without opening the editor
    Export {
        #[arg(long)]
        seed: PathBuf,
        #[arg(long, value_enum)]
        format: ExportFormat,
        /// Output directory (defaults to EXPORT_DIR)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Print rows, their share of the total and the grand total
    Summary {
        #[arg(long)]
        seed: PathBuf,
    },
}

// Main application state
struct AppState {
    config: Config,
    db: Option<db::Database>,
    editor: LineItemsState,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::init()?;

    match cli.command.unwrap_or(Commands::Edit { seed: None, name: None }) {
        Commands::Edit { seed, name } => {
            let sink = match &config.log_file {
                Some(path) => LogSink::File(path),
                None => LogSink::Discard,
            };
            logging::init(sink)?;
            run_editor(config, seed.as_deref(), name).await
        }
        Commands::Export { seed, format, out } => {
            logging::init(LogSink::Stderr)?;
            let table = load_table(&config, Some(seed.as_path()))?;
            let exporter = Exporter::new(out.unwrap_or_else(|| config.export_dir.clone()))?;
            let stem = file_stem(&default_name(Some(seed.as_path())));
            let path = exporter.export(&table, format, &stem)?;
            println!("{}", path.display());
            Ok(())
        }
        Commands::Summary { seed } => {
            logging::init(LogSink::Stderr)?;
            let table = load_table(&config, Some(seed.as_path()))?;
            print_summary(&table);
            Ok(())
        }
    }
}

fn load_table(config: &Config, seed: Option<&Path>) -> Result<LineItemTable> {
    let items = match seed {
        Some(path) => seed::load_seed(path)?,
        None => Vec::new(),
    };
    Ok(LineItemTable::from_items(items, &config.new_item_label))
}

fn default_name(seed: Option<&Path>) -> String {
    seed.and_then(|path| path.file_stem())
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "breakdown".to_string())
}

fn print_summary(table: &LineItemTable) {
    if table.is_empty() {
        println!("No line items.");
        return;
    }

    for (index, item) in table.rows().iter().enumerate() {
        println!(
            "{:<40} {:>10} x {:>12.2} = {:>12.2}  ({:>5.1}%)",
            item.description,
            item.quantity,
            item.unit_price,
            item.total_price,
            table.row_share(index) * 100.0
        );
    }
    println!("Grand Total: {:.2}", table.grand_total());
}

async fn run_editor(config: Config, seed: Option<&Path>, name: Option<String>) -> Result<()> {
    let table = load_table(&config, seed)?;
    let name = name.unwrap_or_else(|| default_name(seed));
    info!(name = %name, rows = table.len(), "opening editor");

    let mut app_state = AppState {
        config,
        db: None,
        editor: LineItemsState::new(name, table),
    };

    // Setup terminal
    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app_state).await;

    // Restore terminal
    terminal::disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    if let Err(err) = &result {
        error!(error = %err, "editor exited with an error");
        println!("Error: {}", err);
    }

    result
}

async fn run_app<B: Backend>(terminal: &mut Terminal<B>, app_state: &mut AppState) -> Result<()> {
    loop {
        terminal.draw(|f| render_line_items(f, &mut app_state.editor))?;

        match handle_input(&mut app_state.editor)? {
            Some(LineItemsAction::Quit) => break,
            Some(LineItemsAction::Export(format)) => export_current(app_state, format),
            Some(LineItemsAction::Promote) => promote_current(app_state).await,
            None => {}
        }
    }

    Ok(())
}

fn export_current(app_state: &mut AppState, format: ExportFormat) {
    let stem = file_stem(app_state.editor.name());
    let result = Exporter::new(&app_state.config.export_dir)
        .and_then(|exporter| exporter.export(app_state.editor.table(), format, &stem));

    match result {
        Ok(path) => app_state.editor.set_status(format!("Exported to {}", path.display())),
        Err(err) => {
            warn!(error = %err, "export failed");
            app_state.editor.set_error(format!("Export failed: {}", err));
        }
    }
}

async fn promote_current(app_state: &mut AppState) {
    match try_promote(app_state).await {
        Ok(id) => app_state.editor.set_status(format!("Saved as breakdown #{}", id)),
        Err(err) => {
            warn!(error = %err, "promotion failed");
            app_state.editor.set_error(format!("Could not save breakdown: {}", err));
        }
    }
}

async fn try_promote(app_state: &mut AppState) -> Result<i32> {
    if app_state.db.is_none() {
        let Some(url) = app_state.config.database_url() else {
            anyhow::bail!("DATABASE_URL is not configured");
        };
        app_state.db = Some(db::init(url).await?);
    }

    let (rows, grand_total) = app_state.editor.table().snapshot();
    let name = app_state.editor.name().to_string();
    match &app_state.db {
        Some(db) => db.promote(&name, &rows, grand_total).await,
        None => anyhow::bail!("database connection unavailable"),
    }
}

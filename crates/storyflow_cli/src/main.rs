//! Command-line entry point for StoryFlow boards.
//!
//! # Responsibility
//! - Expose board list/create/show/import/export/delete over a local SQLite file.
//! - Keep output deterministic so scripts can consume it.

use clap::{Parser, Subcommand};
use log::error;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use storyflow_core::db::open_db;
use storyflow_core::{
    default_log_level, init_logging, BoardService, Section, SqliteBoardStore, Theme,
};

type CliResult = Result<(), Box<dyn Error>>;

#[derive(Debug, Parser)]
#[command(name = "storyflow", version, about = "Organize boards of nested sections")]
struct Cli {
    /// SQLite database file.
    #[arg(long, default_value = "storyflow.db")]
    db: PathBuf,

    /// trace|debug|info|warn|error. Defaults by build mode.
    #[arg(long)]
    log_level: Option<String>,

    /// Absolute directory for rotated log files. Logging is off without it.
    #[arg(long)]
    log_dir: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Checks core linkage.
    Ping,
    /// Lists boards, most recently updated first.
    List,
    /// Creates an empty board.
    Create {
        title: String,
        #[arg(long, default_value = "pastel", value_parser = parse_theme)]
        theme: Theme,
    },
    /// Prints a board as an indented section tree.
    Show { board_id: String },
    /// Appends a section at the top level or under `--parent`.
    AddSection {
        board_id: String,
        #[arg(long)]
        parent: Option<String>,
    },
    /// Writes a board as JSON into `--out`.
    Export {
        board_id: String,
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
    /// Imports a JSON board file as a new board.
    Import { file: PathBuf },
    /// Deletes a board. Requires `--yes`.
    Delete {
        board_id: String,
        #[arg(long)]
        yes: bool,
    },
}

fn parse_theme(value: &str) -> Result<Theme, String> {
    Theme::parse(value).ok_or_else(|| {
        let names: Vec<&str> = Theme::ALL.iter().map(Theme::as_str).collect();
        format!("unknown theme `{value}`; expected {}", names.join("|"))
    })
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Some(log_dir) = cli.log_dir.as_deref() {
        let level = cli.log_level.as_deref().unwrap_or(default_log_level());
        if let Err(err) = init_logging(level, log_dir) {
            eprintln!("logging disabled: {err}");
        }
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_command module=cli status=error error={err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> CliResult {
    if let Command::Ping = cli.command {
        println!("storyflow_core ping={}", storyflow_core::ping());
        println!("storyflow_core version={}", storyflow_core::core_version());
        return Ok(());
    }

    let conn = open_db(&cli.db)?;
    let store = SqliteBoardStore::try_new(&conn)?;
    let service = BoardService::new(&store);

    match &cli.command {
        Command::Ping => {}
        Command::List => {
            for summary in service.list_boards()? {
                println!(
                    "{}\t{}\t{}\t{} sections\t{}",
                    summary.id,
                    summary.title,
                    summary.theme.as_str(),
                    summary.section_count,
                    summary.updated_at.to_rfc3339()
                );
            }
        }
        Command::Create { title, theme } => {
            let board = service.create_board(title, *theme)?;
            println!("{}", board.id);
        }
        Command::Show { board_id } => {
            let board = service.get_board(board_id)?;
            println!("{} [{}]", board.title, board.theme.as_str());
            print_sections(&board.sections, 1);
        }
        Command::AddSection { board_id, parent } => {
            let section = service.add_section(board_id, parent.as_deref())?;
            println!("{}\t{}", section.id, section.title);
        }
        Command::Export { board_id, out } => {
            let exported = service.export_board(board_id)?;
            let path = out.join(&exported.file_name);
            std::fs::write(&path, exported.contents)?;
            println!("{}", path.display());
        }
        Command::Import { file } => {
            let document = std::fs::read_to_string(file)?;
            let board = service.import_board(&document)?;
            println!("{}", board.id);
        }
        Command::Delete { board_id, yes } => {
            if !service.delete_board(board_id, |_| *yes)? {
                return Err("refusing to delete without --yes".into());
            }
            println!("deleted {board_id}");
        }
    }
    Ok(())
}

fn print_sections(sections: &[Section], depth: usize) {
    for section in sections {
        println!(
            "{}- {} ({} todos, {} files) {}",
            "  ".repeat(depth),
            section.title,
            section.todos.len(),
            section.files.len(),
            section.id
        );
        print_sections(&section.subsections, depth + 1);
    }
}

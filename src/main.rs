use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::fs::{self, File};
use std::io::IsTerminal;
use std::process::ExitCode;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

use lieutenant::output::LinePrinter;
use lieutenant::prefs::location::{default_save_path, get_log_path};
use lieutenant::prefs::{Category, PreferenceStore};
use lieutenant::runner::{self, RunEvent, RunOptions};

#[derive(Parser)]
#[command(name = "lt", version)]
#[command(about = "Run a command and search its output")]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Stream output to stdout instead of the interactive UI
    #[arg(long)]
    plain: bool,

    /// Highlight matches of this pattern (plain mode). Lines are searched
    /// one at a time as they stream, so a match cannot span lines.
    #[arg(short, long, value_name = "PATTERN")]
    find: Option<String>,

    /// Command to run, resolved through the aliases and cmds preferences
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    argv: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect or edit the preferences file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the config file location
    Path,
    /// Print the merged preferences as JSON
    Show,
    /// Set one preference and save
    Set {
        /// settings, cmds or aliases
        category: Category,
        key: String,
        value: String,
    },
    /// Remove one preference and save
    Unset {
        /// settings, cmds or aliases
        category: Category,
        key: String,
    },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let interactive = cli.command.is_none() && !cli.plain && cfg!(feature = "interactive");
    init_logging(interactive);

    let (mut store, load_error) = PreferenceStore::discover();

    match cli.command {
        Some(Commands::Config { action }) => {
            if let Some(e) = load_error {
                return Err(e).context("Failed to load preferences");
            }
            handle_config_command(&mut store, action)?;
            Ok(ExitCode::SUCCESS)
        }
        #[cfg(feature = "interactive")]
        None if interactive => {
            lieutenant::tui::run(store, load_error, cli.argv)?;
            Ok(ExitCode::SUCCESS)
        }
        None => {
            if let Some(ref e) = load_error {
                eprintln!("Config not loaded, using defaults: {}", e);
            }
            run_plain(&store, cli.argv, cli.find)
        }
    }
}

/// Logs go to stderr, except under the full-screen UI where they would
/// corrupt the display and go to the app data directory instead
fn init_logging(interactive: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    if interactive {
        let file = get_log_path().and_then(|path| {
            fs::create_dir_all(path.parent()?).ok()?;
            File::create(&path).ok()
        });
        if let Some(file) = file {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        return;
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_plain(store: &PreferenceStore, argv: Vec<String>, find: Option<String>) -> Result<ExitCode> {
    let mut printer = LinePrinter::stdout(std::io::stdout().is_terminal(), find)?;

    let outcome = match runner::resolve_argv(&argv, store.prefs()) {
        Ok(resolved) => {
            let handle = runner::spawn(&resolved, RunOptions::attached());
            let mut outcome = Ok(());
            while let Some(event) = handle.recv() {
                match event {
                    RunEvent::Line(line) => printer.print_line(&line)?,
                    RunEvent::Finished(result) => outcome = result,
                }
            }
            outcome
        }
        Err(failure) => Err(failure),
    };

    if let Err(ref failure) = outcome {
        printer.print_failure(failure)?;
    }
    printer.print_summary()?;

    let code = runner::exit_code(&outcome);
    Ok(ExitCode::from(u8::try_from(code).unwrap_or(1)))
}

fn handle_config_command(store: &mut PreferenceStore, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Path => match store.location() {
            Some(path) => println!("{}", path.display()),
            None => println!("{} (not present)", default_save_path()?.display()),
        },
        ConfigAction::Show => {
            println!("{}", store.prefs().to_json_pretty()?);
        }
        ConfigAction::Set {
            category,
            key,
            value,
        } => {
            let value = store.prefs().value_from_text(category, &key, value);
            store.set(category, &key, value)?;
            let path = store.save().context("Failed to save preferences")?;
            println!("Saved {}", path.display());
        }
        ConfigAction::Unset { category, key } => {
            if !store.prefs_mut().remove(category, &key) {
                bail!("No {} entry named '{}'", category, key);
            }
            let path = store.save().context("Failed to save preferences")?;
            println!("Saved {}", path.display());
        }
    }

    Ok(())
}

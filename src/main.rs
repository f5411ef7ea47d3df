//! SliderSave CLI - Inspect and maintain save profiles from the command line

use clap::{Parser, Subcommand};
use slidersave::{
    codec,
    commands::{self, BackupCommand, Command, DeleteCommand, ListCommand, RestoreCommand},
    formatters::Formatter,
    savefile::FileKind,
    Formatters, ProfileManager, SaveConfig, SchemaRemap, Session,
};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "slidersave")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Directory holding the slot files (defaults to $SLIDERSAVE_DIR or ./saves)
    #[arg(short, long, global = true)]
    save_dir: Option<PathBuf>,

    /// JSON file with extra type remappings for old saves
    #[arg(long, global = true)]
    remap: Option<PathBuf>,

    /// Output formatter (shell, text, json)
    #[arg(short, long, default_value = "shell", global = true)]
    formatter: String,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an interactive session (the default)
    Shell,
    /// Summarize every slot
    List,
    /// Print every value stored in a slot
    Show {
        /// Slot index
        slot: usize,
        /// Read the backup instead of the save file
        #[arg(long)]
        backup: bool,
    },
    /// Refresh the backup of every slot
    Backup,
    /// Replace a slot with its backup
    Restore {
        /// Slot index
        slot: usize,
    },
    /// Delete a slot's save file (its backup is kept)
    Delete {
        /// Slot index
        slot: usize,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("slidersave=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("slidersave=warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> slidersave::Result<SaveConfig> {
    let mut config = match cli.save_dir {
        Some(ref dir) => SaveConfig::new(dir),
        None => SaveConfig::from_env(),
    };
    if let Some(ref path) = cli.remap {
        let json = std::fs::read_to_string(path)?;
        config = config.with_remap(SchemaRemap::from_json(&json)?);
    }
    Ok(config)
}

fn run(cli: Cli) -> slidersave::Result<()> {
    let config = load_config(&cli)?;
    let formatter = Formatters::by_name(&cli.formatter);
    let formatter = formatter.as_ref();

    match cli.command.unwrap_or(Commands::Shell) {
        Commands::Shell => run_shell(Session::open(config), formatter),
        Commands::Show { slot, backup } => show(config, slot, backup),
        Commands::List => one_shot(config, &ListCommand, formatter),
        Commands::Backup => one_shot(config, &BackupCommand, formatter),
        Commands::Restore { slot } => one_shot(config, &RestoreCommand { slot }, formatter),
        Commands::Delete { slot } => one_shot(config, &DeleteCommand { slot }, formatter),
    }
}

/// Run a single command against freshly loaded slots, failing the process
/// if it fails
///
/// No session is opened, so backups are only written by `backup` itself.
fn one_shot(
    config: SaveConfig,
    command: &dyn Command,
    formatter: &dyn Formatter,
) -> slidersave::Result<()> {
    let mut manager = ProfileManager::open(config);
    let result = commands::execute(command, &mut manager);
    formatter.write_to(&result, &mut io::stdout())?;
    if result.is_failure() {
        std::process::exit(1);
    }
    Ok(())
}

fn show(config: SaveConfig, slot: usize, backup: bool) -> slidersave::Result<()> {
    slidersave::SaveDir::check_slot(slot)?;
    let dir = slidersave::SaveDir::new(&config.save_dir);
    let kind = if backup { FileKind::Backup } else { FileKind::Primary };

    let bytes = match dir.read(slot, kind)? {
        Some(bytes) => bytes,
        None if backup => return Err(slidersave::Error::BackupNotFound(slot)),
        None => return Err(slidersave::Error::NoProfile(slot)),
    };
    let profile = codec::decode(&bytes, &config.remap)?;

    let mut stdout = io::stdout();
    writeln!(stdout, "{} ({})", profile.name, dir.path(slot, kind).display())?;
    writeln!(stdout, "  last saved: {}", profile.last_saved)?;
    writeln!(stdout, "  last area:  {}", profile.last_area)?;
    for (key, value) in profile.store.iter() {
        writeln!(stdout, "  {:<32} {:<9} {}", key, value.kind(), value)?;
    }
    Ok(())
}

fn run_shell(mut session: Session, formatter: &dyn Formatter) -> slidersave::Result<()> {
    let stdin = io::stdin();
    let mut stdin_lock = stdin.lock();
    let mut stdout = io::stdout();

    session.run(|result| {
        // Write formatted output
        if let Err(e) = formatter.write_to(result, &mut stdout) {
            eprintln!("Output error: {}", e);
            return None;
        }
        if let Err(e) = write!(stdout, "{}", formatter.prompt()).and_then(|_| stdout.flush()) {
            eprintln!("Flush error: {}", e);
            return None;
        }

        // Read next command
        let mut line = String::new();
        match stdin_lock.read_line(&mut line) {
            Ok(0) => None, // EOF
            Ok(_) => Some(line.trim().to_string()),
            Err(e) => {
                eprintln!("Input error: {}", e);
                None
            }
        }
    });

    let report = session.close();
    for (slot, error) in report.failed {
        eprintln!("Backup of slot {} failed: {}", slot, error);
    }
    Ok(())
}

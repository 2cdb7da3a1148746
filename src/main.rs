pub mod models {
    pub mod reading;
}

pub mod analysis {
    pub mod anomaly;
    pub mod daily;
    pub mod session;
    pub mod smoothing;
    pub mod stats;
}
pub mod config;
pub mod db {
    pub mod key;
    pub mod models;
}
pub mod output {
    pub mod plots;
    pub mod report;
    pub mod tables;
}
pub mod schema;
pub mod services {
    pub mod analyze;
    pub mod export;
    pub mod fake_data;
    pub mod import;
    pub mod snapshot;
}
pub mod timestamps;

use crate::config::{load_env_file, Config};
use crate::services::analyze::AnalysisOptions;
use crate::services::fake_data::GeneratorSettings;
use crate::services::{analyze, export, fake_data, import};
use diesel::prelude::*;
use diesel::PgConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use log::{error, info};
use std::ffi::OsString;
use std::path::PathBuf;

const USAGE: &str = "usage: water-quality [--env-file <path>] <command>

commands:
  analyze [--sessions] [--input <file>] [--output <dir>]
  import <file>      load a JSON snapshot into the database
  export <file>      dump the database to a JSON snapshot
  generate <file>    write a synthetic JSON snapshot";

#[derive(Debug)]
struct LoadedEnvFile {
    path: PathBuf,
    explicit: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Analyze {
        sessions: bool,
        input: Option<PathBuf>,
        output: Option<PathBuf>,
    },
    Import(PathBuf),
    Export(PathBuf),
    Generate(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Cli {
    env_file: Option<PathBuf>,
    command: Command,
}

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

fn apply_database_migrations(conn: &mut PgConnection) -> Result<(), String> {
    match conn.run_pending_migrations(MIGRATIONS) {
        Ok(applied) => {
            if applied.is_empty() {
                info!("Database schema is up to date; no migrations were applied");
            } else {
                let names = applied.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(", ");
                info!("Applied {} database migration(s): {}", applied.len(), names);
            }
            Ok(())
        }
        Err(e) => Err(format!("Applying database migrations failed: {}", e)),
    }
}

fn connect(cfg: &Config) -> Result<PgConnection, String> {
    let mut conn = PgConnection::establish(&cfg.database_url).map_err(|e| format!("DB connection failed: {}", e))?;
    info!("Connected to database");
    apply_database_migrations(&mut conn)?;
    Ok(conn)
}

fn run(command: Command) -> Result<(), String> {
    let cfg = Config::from_env()?;
    info!(
        "Config loaded (local_offset={}, honor_offset={}, smoothing_window={}, turbidity_limit={} NTU, ph_range={}..{}, plots_enabled={})",
        cfg.timestamps.local_offset,
        cfg.timestamps.honor_offset,
        cfg.smoothing_window,
        cfg.limits.turbidity_ntu,
        cfg.limits.ph_min,
        cfg.limits.ph_max,
        cfg.plots_enabled
    );

    match command {
        Command::Analyze { sessions, input, output } => {
            let opts = AnalysisOptions {
                input: input.unwrap_or_else(|| cfg.input_path.clone()),
                output_dir: output.unwrap_or_else(|| cfg.output_dir.clone()),
                sessions,
                timestamps: cfg.timestamps,
                limits: cfg.limits,
                smoothing_window: cfg.smoothing_window,
                plots_enabled: cfg.plots_enabled,
                font_path: cfg.plot_font_path.clone(),
            };
            info!(
                "Starting {} analysis of {} into {}",
                if sessions { "session" } else { "basic" },
                opts.input.display(),
                opts.output_dir.display()
            );
            let summary = analyze::run(&opts)?;
            info!("Analysis complete: {} reading(s) over {} day(s)", summary.reading_count, summary.day_count);
        }
        Command::Import(path) => {
            let mut conn = connect(&cfg)?;
            let inserted = import::run(&mut conn, &path, &cfg.timestamps)?;
            info!("Import complete: {} reading(s) stored", inserted);
        }
        Command::Export(path) => {
            let mut conn = connect(&cfg)?;
            let exported = export::run(&mut conn, &path, &cfg.timestamps)?;
            info!("Export complete: {} reading(s) written to {}", exported, path.display());
        }
        Command::Generate(path) => {
            let settings = GeneratorSettings {
                days: cfg.generator_days,
                step_secs: cfg.generator_step_secs,
                seed: cfg.generator_seed,
            };
            fake_data::run(&path, settings, &cfg.timestamps)?;
        }
    }

    Ok(())
}

fn set_once(slot: &mut Option<PathBuf>, flag: &str, value: Option<OsString>) -> Result<(), String> {
    if slot.is_some() {
        return Err(format!("`{}` provided more than once", flag));
    }
    let value = value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| format!("`{}` requires a path argument", flag))?;
    *slot = Some(PathBuf::from(value));
    Ok(())
}

fn single_path(name: &str, mut positional: Vec<PathBuf>) -> Result<PathBuf, String> {
    match positional.pop() {
        Some(path) if positional.is_empty() => Ok(path),
        _ => Err(format!("`{}` takes exactly one file argument\n\n{}", name, USAGE)),
    }
}

fn parse_cli<I>(args: I) -> Result<Cli, String>
where
    I: IntoIterator<Item = OsString>,
{
    let mut args = args.into_iter();
    let mut env_file: Option<PathBuf> = None;
    let mut command_name: Option<String> = None;
    let mut positional: Vec<PathBuf> = Vec::new();
    let mut sessions = false;
    let mut input: Option<PathBuf> = None;
    let mut output: Option<PathBuf> = None;

    while let Some(arg) = args.next() {
        let Some(s) = arg.to_str() else {
            // non-UTF-8 is only acceptable as a path operand
            if command_name.is_some() {
                positional.push(PathBuf::from(arg));
                continue;
            }
            return Err("argument contains invalid UTF-8".to_string());
        };
        match s {
            "--env-file" => set_once(&mut env_file, "--env-file", args.next())?,
            _ if s.starts_with("--env-file=") => {
                set_once(&mut env_file, "--env-file", Some(OsString::from(&s["--env-file=".len()..])))?
            }
            "--sessions" => sessions = true,
            "--input" => set_once(&mut input, "--input", args.next())?,
            "--output" => set_once(&mut output, "--output", args.next())?,
            "-h" | "--help" => return Err(USAGE.to_string()),
            _ if s.starts_with('-') => return Err(format!("unrecognised argument: {}\n\n{}", s, USAGE)),
            _ if command_name.is_none() => command_name = Some(s.to_string()),
            _ => positional.push(PathBuf::from(s)),
        }
    }

    let command_name = command_name.ok_or_else(|| format!("missing command\n\n{}", USAGE))?;
    let is_analyze = command_name == "analyze";
    if !is_analyze && (sessions || input.is_some() || output.is_some()) {
        return Err(format!("`--sessions`, `--input` and `--output` only apply to analyze\n\n{}", USAGE));
    }

    let command = match command_name.as_str() {
        "analyze" => {
            if !positional.is_empty() {
                return Err(format!("`analyze` takes no positional arguments\n\n{}", USAGE));
            }
            Command::Analyze { sessions, input, output }
        }
        "import" => Command::Import(single_path("import", positional)?),
        "export" => Command::Export(single_path("export", positional)?),
        "generate" => Command::Generate(single_path("generate", positional)?),
        other => return Err(format!("unknown command: {}\n\n{}", other, USAGE)),
    };

    Ok(Cli { env_file, command })
}

fn configure_env(env_file: Option<PathBuf>) -> Result<Option<LoadedEnvFile>, String> {
    if let Some(path) = env_file {
        if !path.is_file() {
            return Err(format!("env file not found: {}", path.display()));
        }
        load_env_file(&path)?;
        Ok(Some(LoadedEnvFile { path, explicit: true }))
    } else {
        let cwd = std::env::current_dir().map_err(|e| format!("unable to read current directory: {}", e))?;
        let default_path = cwd.join(".env");
        if default_path.is_file() {
            load_env_file(&default_path)?;
            Ok(Some(LoadedEnvFile {
                path: default_path,
                explicit: false,
            }))
        } else {
            Ok(None)
        }
    }
}

fn main() {
    let (command, loaded_env) = match parse_cli(std::env::args_os().skip(1))
        .and_then(|cli| configure_env(cli.env_file).map(|env| (cli.command, env)))
    {
        Ok(parsed) => parsed,
        Err(err) => {
            eprintln!("fatal: {}", err);
            std::process::exit(1);
        }
    };

    // Init logging after environment so RUST_LOG from .env is respected.
    let default_filter = env_logger::Env::default().default_filter_or("info");
    env_logger::Builder::from_env(default_filter)
        .format_timestamp_secs()
        .init();

    if let Some(info) = loaded_env.as_ref() {
        let origin = if info.explicit { "CLI-specified" } else { "default" };
        info!("Environment loaded from {} .env file: {}", origin, info.path.display());
    }

    info!(
        "water-quality {} (git {}) starting",
        env!("CARGO_PKG_VERSION"),
        env!("BUILD_TIME_GIT_HASH")
    );
    if let Err(e) = run(command) {
        error!("fatal: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, String> {
        parse_cli(args.iter().map(OsString::from))
    }

    #[test]
    fn analyze_flags_parse() {
        let cli = parse(&["--env-file", "prod.env", "analyze", "--sessions", "--output", "out"]).unwrap();
        assert_eq!(cli.env_file, Some(PathBuf::from("prod.env")));
        assert_eq!(
            cli.command,
            Command::Analyze {
                sessions: true,
                input: None,
                output: Some(PathBuf::from("out")),
            }
        );
    }

    #[test]
    fn sync_commands_take_one_file() {
        assert_eq!(
            parse(&["import", "data.json"]).unwrap().command,
            Command::Import(PathBuf::from("data.json"))
        );
        assert_eq!(
            parse(&["--env-file=.env.local", "export", "dump.json"]).unwrap(),
            Cli {
                env_file: Some(PathBuf::from(".env.local")),
                command: Command::Export(PathBuf::from("dump.json")),
            }
        );
        assert!(parse(&["import"]).is_err());
        assert!(parse(&["generate", "a.json", "b.json"]).is_err());
    }

    #[test]
    fn bad_invocations_are_rejected() {
        assert!(parse(&[]).unwrap_err().contains("missing command"));
        assert!(parse(&["frobnicate"]).unwrap_err().contains("unknown command"));
        assert!(parse(&["analyze", "--bogus"]).unwrap_err().contains("unrecognised argument"));
        assert!(parse(&["import", "--sessions", "x.json"]).is_err());
        assert!(parse(&["--env-file", "a", "--env-file", "b", "analyze"]).is_err());
        assert!(parse(&["--env-file="]).is_err());
        assert!(parse(&["analyze", "extra"]).is_err());
    }
}

mod coordinator;
mod headless;

use std::fs::File;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use orrery_core::config::Config;
use orrery_core::lifecycle::StateMachine;
use orrery_core::paths;
use orrery_core::pipeline::{PipelineEnv, PipelineOptions};
use orrery_core::platform::{BundleDir, JsonPreferenceStore, StdFileSystem};
use orrery_core::session::SessionOutcome;
use orrery_types::{EclipseKind, SearchRange};

use coordinator::{Coordinator, ShellError};
use headless::HeadlessEngine;

const USAGE: &str = "usage: orrery [--verbose] [status | load | search <object> <start_jd> <end_jd> [--kind solar|lunar|all] [--abort-after-ms N] [--json]]";

fn init_logging(verbose: bool) {
    use simplelog::*;

    let log_level = if verbose { LevelFilter::Debug } else { LevelFilter::Warn };

    let log_path = paths::log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let log_file = match File::create(&log_path).or_else(|_| File::create("/tmp/orrery.log")) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("orrery: logging disabled: {}", e);
            return;
        }
    };

    if let Err(e) = WriteLogger::init(log_level, Config::default(), log_file) {
        eprintln!("orrery: logging disabled: {}", e);
        return;
    }

    log::info!("orrery starting (log level: {:?})", log_level);
}

enum Command {
    Status,
    Load,
    Search {
        object: String,
        range: SearchRange,
        abort_after: Option<Duration>,
        json: bool,
    },
}

fn parse_command(args: &[String]) -> Result<Command, String> {
    let positional: Vec<&String> = {
        let mut out = Vec::new();
        let mut skip = false;
        for arg in args.iter().skip(1) {
            if skip {
                skip = false;
                continue;
            }
            match arg.as_str() {
                "--kind" | "--abort-after-ms" => skip = true,
                a if a.starts_with('-') => {}
                _ => out.push(arg),
            }
        }
        out
    };
    let flag_value = |name: &str| {
        args.iter()
            .position(|a| a == name)
            .and_then(|i| args.get(i + 1))
    };

    match positional.first().map(|s| s.as_str()) {
        None | Some("load") => Ok(Command::Load),
        Some("status") => Ok(Command::Status),
        Some("search") => {
            let [_, object, start, end] = positional.as_slice() else {
                return Err(USAGE.to_string());
            };
            let start_jd: f64 = start.parse().map_err(|_| format!("bad start date: {}", start))?;
            let end_jd: f64 = end.parse().map_err(|_| format!("bad end date: {}", end))?;
            let kinds = match flag_value("--kind").map(|s| s.as_str()) {
                None | Some("all") => EclipseKind::ALL,
                Some("solar") => EclipseKind::SOLAR,
                Some("lunar") => EclipseKind::LUNAR,
                Some(other) => return Err(format!("unknown eclipse kind: {}", other)),
            };
            let abort_after = match flag_value("--abort-after-ms") {
                Some(ms) => Some(Duration::from_millis(
                    ms.parse().map_err(|_| format!("bad --abort-after-ms: {}", ms))?,
                )),
                None => None,
            };
            Ok(Command::Search {
                object: object.to_string(),
                range: SearchRange::new(start_jd, end_jd, kinds),
                abort_after,
                json: args.iter().any(|a| a == "--json"),
            })
        }
        Some(other) => Err(format!("unknown command: {}\n{}", other, USAGE)),
    }
}

fn build_coordinator(config: &Config) -> std::io::Result<Coordinator<HeadlessEngine>> {
    let env = PipelineEnv {
        prefs: Arc::new(JsonPreferenceStore::open(paths::preferences_path())),
        settings: Arc::new(JsonPreferenceStore::open(paths::settings_path())),
        assets: Arc::new(BundleDir::new(paths::bundle_dir())),
        fs: Arc::new(StdFileSystem),
    };
    Coordinator::new(
        HeadlessEngine::new(),
        config,
        StateMachine::global(),
        env,
        PipelineOptions::from_config(config),
        &paths::lifecycle_snapshot_path(),
    )
}

fn run(command: Command, coordinator: &Coordinator<HeadlessEngine>) -> Result<(), ShellError> {
    match command {
        Command::Status => {
            println!("{}", coordinator.status_line());
        }
        Command::Load => {
            match coordinator.load()? {
                Some(launch) => println!(
                    "loaded {} ({} fps, language {})",
                    launch.config_file.display(),
                    launch.frame_rate,
                    launch.language
                ),
                None => println!("already loaded"),
            }
            let (frames, settings, loaded) = coordinator.with_engine(|engine| {
                (engine.frames(), engine.settings_len(), engine.launch().is_some())
            })?;
            log::debug!(
                "engine loaded={} with {} settings after {} frames",
                loaded,
                settings,
                frames
            );
        }
        Command::Search {
            object,
            range,
            abort_after,
            json,
        } => {
            coordinator.load()?;
            match coordinator.search(&object, range, abort_after)? {
                SessionOutcome::Completed(found) if json => {
                    let text = serde_json::to_string_pretty(&found).map_err(std::io::Error::from)?;
                    println!("{}", text);
                }
                SessionOutcome::Completed(found) => {
                    if found.is_empty() {
                        println!("no eclipses found");
                    }
                    for eclipse in found {
                        println!(
                            "JD {:.3}  {} eclipses {}",
                            eclipse.start_jd, eclipse.occulter, eclipse.receiver
                        );
                    }
                }
                SessionOutcome::Aborted => println!("search aborted"),
                SessionOutcome::Failed(e) => return Err(e.into()),
            }
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    let verbose = args.iter().any(|a| a == "--verbose" || a == "-v");
    init_logging(verbose);

    let command = match parse_command(&args) {
        Ok(command) => command,
        Err(message) => {
            eprintln!("{}", message);
            return ExitCode::from(2);
        }
    };

    let config = Config::load();
    let coordinator = match build_coordinator(&config) {
        Ok(coordinator) => coordinator,
        Err(e) => {
            eprintln!("orrery: could not start engine: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(previous) = coordinator.previous() {
        println!("previous run ended in {}", previous.state);
        if let Some(failure) = &previous.failure {
            println!("  cause: {}", failure);
        }
    }

    match run(command, &coordinator) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("orrery: {}", e);
            println!("{}", coordinator.status_line());
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(line: &str) -> Vec<String> {
        std::iter::once("orrery")
            .chain(line.split_whitespace())
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_default_command_is_load() {
        assert!(matches!(parse_command(&args("")), Ok(Command::Load)));
        assert!(matches!(parse_command(&args("--verbose")), Ok(Command::Load)));
        assert!(matches!(parse_command(&args("status -v")), Ok(Command::Status)));
    }

    #[test]
    fn test_parse_search() {
        let command = parse_command(&args(
            "search Earth 2451544.5 2451910.5 --kind lunar --abort-after-ms 250 --json",
        ))
        .unwrap();
        let Command::Search {
            object,
            range,
            abort_after,
            json,
        } = command
        else {
            panic!("expected a search command");
        };
        assert_eq!(object, "Earth");
        assert_eq!(range.kinds, EclipseKind::LUNAR);
        assert_eq!(range.start_jd, 2451544.5);
        assert_eq!(abort_after, Some(Duration::from_millis(250)));
        assert!(json);
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_command(&args("search Earth 1")).is_err());
        assert!(parse_command(&args("search Earth one 2")).is_err());
        assert!(parse_command(&args("search Earth 1 2 --kind partial")).is_err());
        assert!(parse_command(&args("launch")).is_err());
    }
}

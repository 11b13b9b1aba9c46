// SPDX-License-Identifier: GPL-3.0-only

use std::io::BufRead;
use std::path::PathBuf;
use std::process::ExitCode;

use argh::FromArgs;
use tracing::{error, info, warn};

use candela::monitor::DisplaySystem;
use candela::{Backend, BrightnessEngine, Config, platform};

#[derive(FromArgs, Debug)]
/// Adjust display brightness through the gamma ramp or DDC/CI
struct Args {
    /// path to an alternative config file
    #[argh(option)]
    config: Option<PathBuf>,

    /// keep the software brightness when a slider session ends
    #[argh(switch)]
    keep: bool,

    #[argh(subcommand)]
    command: Command,
}

#[derive(FromArgs, Debug)]
#[argh(subcommand)]
enum Command {
    Get(GetArgs),
    Set(SetArgs),
    Reset(ResetArgs),
    Switch(SwitchArgs),
    List(ListArgs),
    Slider(SliderArgs),
}

impl Command {
    /// One-shot writes leave the new gamma ramp in place after exit
    fn keeps_gamma(&self) -> bool {
        matches!(self, Command::Set(_) | Command::Reset(_) | Command::Switch(_))
    }

    /// Whether the command writes the gamma ramp and so needs a baseline
    fn writes_gamma(&self) -> bool {
        match self {
            Command::Set(SetArgs { backend, .. })
            | Command::Reset(ResetArgs { backend })
            | Command::Slider(SliderArgs { backend }) => *backend == Backend::Software,
            Command::Switch(SwitchArgs { from, to }) => *from == Backend::Software && from != to,
            Command::Get(_) | Command::List(_) => false,
        }
    }
}

#[derive(FromArgs, Debug)]
/// print the current brightness of a backend
#[argh(subcommand, name = "get")]
struct GetArgs {
    /// software or hardware
    #[argh(positional)]
    backend: Backend,
}

#[derive(FromArgs, Debug)]
/// set the brightness of a backend (software 1-100, hardware 0-100)
#[argh(subcommand, name = "set")]
struct SetArgs {
    /// software or hardware
    #[argh(positional)]
    backend: Backend,

    /// brightness level
    #[argh(positional)]
    level: i32,
}

#[derive(FromArgs, Debug)]
/// put a backend back to full brightness
#[argh(subcommand, name = "reset")]
struct ResetArgs {
    /// software or hardware
    #[argh(positional)]
    backend: Backend,
}

#[derive(FromArgs, Debug)]
/// hand control from one backend to the other
#[argh(subcommand, name = "switch")]
struct SwitchArgs {
    /// backend being left
    #[argh(positional)]
    from: Backend,

    /// backend taking over
    #[argh(positional)]
    to: Backend,
}

#[derive(FromArgs, Debug)]
/// list display devices and their physical monitors
#[argh(subcommand, name = "list")]
struct ListArgs {}

#[derive(FromArgs, Debug)]
/// read levels from stdin, one per line, until EOF
#[argh(subcommand, name = "slider")]
struct SliderArgs {
    /// software or hardware
    #[argh(positional)]
    backend: Backend,
}

fn setup_logs(default_filter: Option<&str>) {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let fmt_layer = fmt::layer().with_target(false).with_writer(std::io::stderr);
    let filter_layer = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(
            default_filter
                .map(str::to_string)
                .unwrap_or_else(|| format!("warn,{}=warn", env!("CARGO_CRATE_NAME"))),
        )
    });

    #[cfg(target_os = "linux")]
    if let Ok(journal_layer) = tracing_journald::layer() {
        tracing_subscriber::registry()
            .with(filter_layer)
            .with(fmt_layer)
            .with(journal_layer)
            .init();
        return;
    }

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}

fn run<S: DisplaySystem>(engine: &mut BrightnessEngine<S>, command: &Command) -> bool {
    match command {
        Command::Get(args) => {
            println!("{}", engine.get(args.backend));
            true
        }
        Command::Set(args) => engine.set(args.backend, args.level),
        Command::Reset(args) => engine.reset(args.backend),
        Command::Switch(args) => engine.switch_backend(args.from, args.to),
        Command::List(_) => {
            let statuses = match engine.status() {
                Ok(statuses) => statuses,
                Err(e) => {
                    error!("Failed to list display devices: {}", e);
                    return false;
                }
            };
            for status in statuses {
                let monitors = match status.physical_monitors {
                    Some(count) => count.to_string(),
                    None => "?".to_string(),
                };
                println!(
                    "{} {}  physical monitors: {}",
                    if status.primary { "*" } else { " " },
                    status.device.name,
                    monitors
                );
            }
            true
        }
        Command::Slider(args) => slider(engine, args.backend),
    }
}

/// Apply each level read from stdin in order, like slider drag events
fn slider<S: DisplaySystem>(engine: &mut BrightnessEngine<S>, backend: Backend) -> bool {
    let mut all_ok = true;
    for line in std::io::stdin().lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                error!("Failed to read stdin: {}", e);
                return false;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match line.parse::<i32>() {
            Ok(level) => {
                let ok = engine.set(backend, level);
                all_ok &= ok;
                println!("{} {}", level, if ok { "ok" } else { "failed" });
            }
            Err(_) => warn!("Ignoring non-numeric level '{}'", line),
        }
    }
    all_ok
}

fn main() -> ExitCode {
    let args: Args = argh::from_env();

    let config = Config::load(args.config.as_deref());
    let log_filter = config.as_ref().ok().and_then(|c| c.log_filter.clone());
    setup_logs(log_filter.as_deref());

    let config = config.unwrap_or_else(|e| {
        error!("errors loading config: {}", e);
        Config::default()
    });

    let system = match platform::connect(&config) {
        Ok(system) => system,
        Err(e) => {
            error!("failed to open display system: {:#}", e);
            eprintln!("candela: cannot access the display system: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let mut engine = BrightnessEngine::new(system, &config);
    if args.command.writes_gamma() && !engine.init_brightness_control() {
        warn!("Gamma baseline not captured, software brightness may be unavailable");
    }

    let ok = run(&mut engine, &args.command);

    if args.keep || args.command.keeps_gamma() {
        engine.keep_software_brightness();
    }
    engine.cleanup_brightness_control();
    info!("Done");

    if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}

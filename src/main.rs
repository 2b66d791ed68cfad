use clap::Parser;
use colored::*;
use env_logger::{Builder, Env};
use log::{error, info, Level};
use std::io::Write;

use caliper::config::{GlobalArgs, MeasureCommand, MeasureConfig};
use caliper::pipeline::run_measurement;

#[derive(clap::Subcommand)]
enum Commands {
    /// Measure detected objects in images using a depth map
    Measure(MeasureCommand),

    /// Show version information
    Version,
}

#[derive(Parser)]
#[command(name = "caliper")]
#[command(about = "Metric object measurement from detections and monocular depth")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

fn get_log_level_from_verbosity(
    verbosity: clap_verbosity_flag::Verbosity<clap_verbosity_flag::ErrorLevel>,
) -> log::LevelFilter {
    let adjusted_level = match verbosity.log_level_filter() {
        log::LevelFilter::Off => log::LevelFilter::Off,
        log::LevelFilter::Error => log::LevelFilter::Warn, // default -> WARN
        log::LevelFilter::Warn => log::LevelFilter::Info,  // -v -> INFO
        log::LevelFilter::Info => log::LevelFilter::Debug, // -vv -> DEBUG
        log::LevelFilter::Debug => log::LevelFilter::Trace, // -vvv -> TRACE
        log::LevelFilter::Trace => log::LevelFilter::Trace,
    };

    if verbosity.is_silent() {
        log::LevelFilter::Error // -q -> ERROR
    } else {
        adjusted_level
    }
}

fn main() {
    let cli = Cli::parse();

    if cli.global.no_color {
        colored::control::set_override(false);
    }

    // If the user didn't pass -v/-q and RUST_LOG is set, honor the env var.
    let use_env = !cli.global.verbosity.is_present() && std::env::var_os("RUST_LOG").is_some();

    let mut logger = if use_env {
        Builder::from_env(Env::default())
    } else {
        let mut b = Builder::new();
        b.filter_level(get_log_level_from_verbosity(cli.global.verbosity.clone()));
        b
    };

    logger
        .format(|buf, record| {
            let level_str = match record.level() {
                Level::Error => "ERROR".red().bold().to_string(),
                Level::Warn => "WARN".yellow().to_string(),
                Level::Info => "INFO".green().to_string(),
                Level::Debug => "DEBUG".blue().to_string(),
                Level::Trace => "TRACE".magenta().to_string(),
            };
            writeln!(buf, "[{}] {}", level_str, record.args())
        })
        .init();

    match cli.command {
        Some(Commands::Measure(measure_cmd)) => {
            let sources_desc = if measure_cmd.sources.len() == 1 {
                measure_cmd.sources[0].clone()
            } else {
                format!("{} inputs", measure_cmd.sources.len())
            };
            info!(
                "📏 Measuring: {} | depth unit: {} | calibration: {}",
                sources_desc,
                measure_cmd.depth_unit,
                measure_cmd
                    .calibration
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "built-in".to_string())
            );

            let config = match MeasureConfig::from_args(cli.global, measure_cmd) {
                Ok(config) => config,
                Err(e) => {
                    error!("❌ Invalid configuration: {e:#}");
                    std::process::exit(2);
                }
            };
            match run_measurement(&config) {
                Ok(_) => {}
                Err(e) => {
                    error!("❌ Measurement failed: {e:#}");
                    std::process::exit(1);
                }
            }
        }
        Some(Commands::Version) => {
            println!("caliper v{}", env!("CARGO_PKG_VERSION"));
            println!("Repository: {}", env!("CARGO_PKG_REPOSITORY"));
        }
        None => {
            use clap::CommandFactory;
            let mut cmd = Cli::command();
            cmd.print_help().unwrap();
        }
    }
}

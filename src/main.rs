use clap::Parser;
use diskmemo::cli::commands::{self, ExecOverrides};
use diskmemo::cli::{Cli, Commands};
use diskmemo::types::config::{Config, GeneralConfig};
use diskmemo::CacheResult;
use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*, EnvFilter};

fn main() {
    let cli = Cli::parse();

    // Load configuration first (no logging yet)
    let config = Config::load_or_default(&cli.config);

    let general = config
        .as_ref()
        .map(|c| c.general.clone())
        .unwrap_or_default();

    // CLI flags take precedence over config
    let log_level = if cli.quiet {
        "error".to_string()
    } else if cli.verbose {
        "debug".to_string()
    } else {
        general.log_level.clone()
    };

    init_logging(&log_level, &general);

    tracing::debug!("Configuration loaded from: {}", cli.config.display());

    if let Err(e) = run(cli, config) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(log_level: &str, general: &GeneralConfig) {
    let filter = EnvFilter::from_default_env().add_directive(
        format!("diskmemo={}", log_level)
            .parse()
            .unwrap_or_else(|_| LevelFilter::INFO.into()),
    );

    let json = general.log_format == "json";

    tracing_subscriber::registry()
        .with((!json).then(|| fmt::layer().with_writer(std::io::stderr)))
        .with(json.then(|| fmt::layer().json().with_writer(std::io::stderr)))
        .with(filter)
        .init();
}

fn run(cli: Cli, config: CacheResult<Config>) -> CacheResult<()> {
    match cli.command {
        Commands::Init { path, user } => {
            commands::init(path, user)?;
        }
        Commands::Exec {
            namespace,
            force,
            ignore_expiration,
            no_cache,
            ttl,
            show_log,
            command,
        } => {
            let overrides = ExecOverrides {
                force,
                ignore_expiration,
                no_cache,
                ttl,
            };
            commands::exec(&command, &namespace, &overrides, show_log, &config?)?;
        }
        Commands::Status => {
            commands::status(&config?)?;
        }
        Commands::Inspect { file } => {
            commands::inspect(&file)?;
        }
        Commands::Prune { all } => {
            commands::prune(all, &config?)?;
        }
        Commands::Config => {
            commands::config_cmd(&cli.config)?;
        }
        Commands::Version => {
            commands::version();
        }
    }

    Ok(())
}

//! Interactive configuration for diskmemo.
//!
//! Implemented with dialoguer prompts.

use std::path::{Path, PathBuf};
use std::time::Duration;

use dialoguer::{theme::ColorfulTheme, Confirm, Input, Select};

use crate::policy::format_elapsed;
use crate::types::config::Config;
use crate::CacheResult;

/// Runs the interactive configuration.
pub fn run_interactive_config(config_path: &Path) -> CacheResult<()> {
    let theme = ColorfulTheme::default();

    println!("\ndiskmemo configuration\n");

    let mut config = if config_path.exists() {
        Config::load(config_path)?
    } else {
        println!("Creating a new configuration...\n");
        Config::default_config()
    };

    loop {
        let options = vec![
            "General",
            "Disk cache policy",
            "Memory cache",
            "Save and exit",
            "Exit without saving",
        ];

        let selection = Select::with_theme(&theme)
            .with_prompt("What do you want to configure?")
            .items(&options)
            .default(0)
            .interact()?;

        match selection {
            0 => configure_general(&theme, &mut config)?,
            1 => configure_cache(&theme, &mut config)?,
            2 => configure_memory(&theme, &mut config)?,
            3 => {
                config.save(config_path)?;
                println!("\nConfiguration saved to: {}\n", config_path.display());
                break;
            }
            4 => {
                if Confirm::with_theme(&theme)
                    .with_prompt("Really exit without saving?")
                    .default(false)
                    .interact()?
                {
                    println!("\nExiting without saving.\n");
                    break;
                }
            }
            _ => {}
        }
    }

    Ok(())
}

fn configure_general(theme: &ColorfulTheme, config: &mut Config) -> CacheResult<()> {
    println!("\nGeneral\n");

    let log_levels = vec!["error", "warn", "info", "debug", "trace"];
    let current_idx = log_levels
        .iter()
        .position(|&l| l == config.general.log_level)
        .unwrap_or(2);
    let log_level_idx = Select::with_theme(theme)
        .with_prompt("Log level")
        .items(&log_levels)
        .default(current_idx)
        .interact()?;
    config.general.log_level = log_levels[log_level_idx].to_string();

    let log_formats = vec!["text", "json"];
    let current_format_idx = log_formats
        .iter()
        .position(|&f| f == config.general.log_format)
        .unwrap_or(0);
    let log_format_idx = Select::with_theme(theme)
        .with_prompt("Log format")
        .items(&log_formats)
        .default(current_format_idx)
        .interact()?;
    config.general.log_format = log_formats[log_format_idx].to_string();

    println!("\nGeneral settings updated.\n");
    Ok(())
}

/// Edits the five policy fields.
fn configure_cache(theme: &ColorfulTheme, config: &mut Config) -> CacheResult<()> {
    println!("\nDisk cache policy\n");
    let cache = &mut config.cache;

    cache.cache_enabled = Confirm::with_theme(theme)
        .with_prompt("Cache enabled?")
        .default(cache.cache_enabled)
        .interact()?;

    let dir: String = Input::with_theme(theme)
        .with_prompt("Cache directory")
        .default(cache.cache_dir.display().to_string())
        .interact_text()?;
    cache.cache_dir = PathBuf::from(dir);

    let current = cache
        .cache_expiration
        .map(|ttl| ttl.as_secs_f64().to_string())
        .unwrap_or_else(|| "none".to_string());
    let ttl: String = Input::with_theme(theme)
        .with_prompt("Expiration in seconds ('none' disables saving)")
        .default(current)
        .validate_with(|input: &String| parse_ttl(input).map(|_| ()))
        .interact_text()?;
    cache.cache_expiration = parse_ttl(&ttl).unwrap_or(cache.cache_expiration);

    cache.force_cache_expiration = Confirm::with_theme(theme)
        .with_prompt("Force expiration (always recompute)?")
        .default(cache.force_cache_expiration)
        .interact()?;

    cache.ignore_cache_expiration = Confirm::with_theme(theme)
        .with_prompt("Ignore expiration (serve entries of any age)?")
        .default(cache.ignore_cache_expiration)
        .interact()?;

    println!("\nCache policy updated.\n");
    Ok(())
}

fn configure_memory(theme: &ColorfulTheme, config: &mut Config) -> CacheResult<()> {
    println!("\nMemory cache\n");

    let capacity: usize = Input::with_theme(theme)
        .with_prompt("Maximum number of entries")
        .default(config.memory.capacity)
        .interact_text()?;
    config.memory.capacity = capacity.max(1);

    let ttl: u64 = Input::with_theme(theme)
        .with_prompt("TTL in seconds (0 = no expiry)")
        .default(config.memory.ttl_secs)
        .interact_text()?;
    config.memory.ttl_secs = ttl;

    println!("\nMemory cache configured.\n");
    Ok(())
}

fn parse_ttl(input: &str) -> Result<Option<Duration>, String> {
    let input = input.trim();
    if input.is_empty() || input.eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    input
        .parse::<f64>()
        .ok()
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .map(Some)
        .ok_or_else(|| format!("'{}' is not a number of seconds", input))
}

/// Shows a summary of the current configuration.
pub fn show_config_summary(config: &Config) {
    println!("\nCurrent configuration\n");

    println!("General:");
    println!("  Log level: {}", config.general.log_level);
    println!("  Log format: {}", config.general.log_format);

    println!("\nDisk cache:");
    println!("  Enabled: {}", yes_no(config.cache.cache_enabled));
    println!("  Directory: {}", config.cache.cache_dir.display());
    println!(
        "  Expiration: {}",
        config
            .cache
            .cache_expiration
            .map(format_elapsed)
            .unwrap_or_else(|| "none".to_string())
    );
    println!("  Force: {}", yes_no(config.cache.force_cache_expiration));
    println!("  Ignore: {}", yes_no(config.cache.ignore_cache_expiration));

    println!("\nMemory cache:");
    println!("  Capacity: {}", config.memory.capacity);
    println!("  TTL: {}s", config.memory.ttl_secs);

    println!();
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

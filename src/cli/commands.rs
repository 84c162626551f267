//! Implementation of the diskmemo CLI commands.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use anyhow::{bail, Context};
use chrono::{TimeZone, Utc};
use indicatif::{ProgressBar, ProgressStyle};

use crate::controller::{CallableId, DiskCache};
use crate::fingerprint::CallArgs;
use crate::policy::{format_elapsed, CacheSettings};
use crate::store::{age, BytesCodec, EntryRead, EntryStore};
use crate::types::config::{Config, CONFIG_FILE_NAME};
use crate::{CacheError, CacheResult};

/// Initializes configuration in the specified directory, or the per-user
/// config with `user`.
pub fn init(path: Option<PathBuf>, user: bool) -> CacheResult<()> {
    let (config_path, config) = if user {
        let path = Config::user_config_path()
            .ok_or_else(|| CacheError::config("no user config directory on this platform"))?;
        (path, Config::user_config())
    } else {
        let target_dir = path.unwrap_or_else(|| PathBuf::from("."));
        (target_dir.join(CONFIG_FILE_NAME), Config::default_config())
    };

    if let Some(dir) = config_path.parent() {
        if !dir.as_os_str().is_empty() && !dir.exists() {
            std::fs::create_dir_all(dir)?;
            tracing::info!("Directory created: {}", dir.display());
        }
    }

    if config_path.exists() {
        println!("Configuration already exists at: {}", config_path.display());
        println!("Use 'diskmemo config' to modify.");
        return Ok(());
    }

    if !user {
        if let Some(dir) = config_path.parent() {
            update_gitignore(dir)?;
        }
    }

    config.save(&config_path)?;

    println!("diskmemo initialized.");
    println!("Configuration created at: {}", config_path.display());
    println!("Cache directory: {}", config.cache.cache_dir.display());
    println!();
    println!("Next steps:");
    println!("  1. Adjust the policy: diskmemo config");
    println!("  2. Cache a command: diskmemo exec -- <program> [args...]");

    Ok(())
}

/// Updates or creates .gitignore to include .diskmemo/
fn update_gitignore(target_dir: &Path) -> CacheResult<()> {
    let gitignore_path = target_dir.join(".gitignore");
    let entry = ".diskmemo/";
    let comment = "# diskmemo - local cache";

    if gitignore_path.exists() {
        let content = std::fs::read_to_string(&gitignore_path)?;

        if content
            .lines()
            .any(|line| line.trim() == entry || line.trim() == ".diskmemo")
        {
            tracing::debug!(".gitignore already contains .diskmemo/");
            return Ok(());
        }

        let mut new_content = content.trim_end().to_string();
        if !new_content.is_empty() {
            new_content.push_str("\n\n");
        }
        new_content.push_str(comment);
        new_content.push('\n');
        new_content.push_str(entry);
        new_content.push('\n');

        std::fs::write(&gitignore_path, new_content)?;
        println!(".gitignore updated with .diskmemo/");
    } else {
        let content = format!("{}\n{}\n", comment, entry);
        std::fs::write(&gitignore_path, content)?;
        println!(".gitignore created with .diskmemo/");
    }

    Ok(())
}

/// Per-invocation overrides of the configured policy.
#[derive(Debug, Clone, Default)]
pub struct ExecOverrides {
    pub force: bool,
    pub ignore_expiration: bool,
    pub no_cache: bool,
    pub ttl: Option<f64>,
}

impl ExecOverrides {
    fn apply(&self, settings: &mut CacheSettings) -> CacheResult<()> {
        if self.force {
            settings.force_cache_expiration = true;
        }
        if self.ignore_expiration {
            settings.ignore_cache_expiration = true;
        }
        if self.no_cache {
            settings.cache_enabled = false;
        }
        if let Some(ttl) = self.ttl {
            let ttl = Duration::try_from_secs_f64(ttl)
                .map_err(|_| CacheError::config(format!("invalid --ttl {}", ttl)))?;
            settings.cache_expiration = Some(ttl);
        }
        Ok(())
    }
}

/// Runs a program through the disk cache and writes its stdout.
///
/// The program and its arguments are the fingerprint. A non-zero exit is a
/// failure and is never cached.
pub fn exec(
    command: &[String],
    namespace: &str,
    overrides: &ExecOverrides,
    show_log: bool,
    config: &Config,
) -> CacheResult<()> {
    let Some((program, program_args)) = command.split_first() else {
        return Err(CacheError::Command("no program given".to_string()));
    };

    let mut settings = config.cache.clone();
    overrides.apply(&mut settings)?;

    let mut cache = DiskCache::new(settings)?;
    let callable = CallableId::new(namespace, "exec");
    let args = command
        .iter()
        .fold(CallArgs::new(), |args, part| args.with_arg(part.as_str()));

    let memo = cache
        .run_with_codec(&callable, &args, &BytesCodec, || {
            run_program(program, program_args)
        })
        .map_err(|e| CacheError::Command(format!("{:#}", e)))?;

    if show_log {
        eprintln!("{}", memo.log);
    }

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&memo.value)?;
    stdout.flush()?;

    Ok(())
}

fn run_program(program: &str, args: &[String]) -> anyhow::Result<Vec<u8>> {
    tracing::debug!(program, ?args, "running program");

    let output = Command::new(program)
        .args(args)
        .output()
        .with_context(|| format!("failed to start '{}'", program))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("'{}' exited with {}: {}", program, output.status, stderr.trim());
    }

    Ok(output.stdout)
}

/// Shows the policy and a summary of the cache directory.
pub fn status(config: &Config) -> CacheResult<()> {
    let policy = &config.cache;
    let store = EntryStore::new(&policy.cache_dir);

    println!("Cache policy:");
    println!("  enabled:            {}", policy.cache_enabled);
    println!("  directory:          {}", policy.cache_dir.display());
    println!(
        "  expiration:         {}",
        policy
            .cache_expiration
            .map(format_elapsed)
            .unwrap_or_else(|| "not set".to_string())
    );
    println!("  force expiration:   {}", policy.force_cache_expiration);
    println!("  ignore expiration:  {}", policy.ignore_cache_expiration);
    println!();

    let entries = store.entries()?;
    let mut total_bytes = 0u64;
    let mut expired = 0usize;
    let mut corrupted = 0usize;

    for path in &entries {
        total_bytes += std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        match store.read(path) {
            EntryRead::Found(entry) => {
                if policy
                    .cache_expiration
                    .is_some_and(|ttl| age(entry.created_at) >= ttl)
                {
                    expired += 1;
                }
            }
            EntryRead::Corrupted(_) => corrupted += 1,
            EntryRead::Missing => {}
        }
    }

    println!("Entries:    {}", entries.len());
    println!("Total size: {} bytes", total_bytes);
    println!("Expired:    {}", expired);
    println!("Corrupted:  {}", corrupted);

    Ok(())
}

/// Prints the header of an entry file.
pub fn inspect(file: &Path) -> CacheResult<()> {
    let store = EntryStore::new(file.parent().unwrap_or_else(|| Path::new(".")));

    match store.read(file) {
        EntryRead::Missing => {
            return Err(CacheError::other(format!("no such entry: {}", file.display())));
        }
        EntryRead::Corrupted(reason) => {
            println!("{}: corrupted ({})", file.display(), reason);
        }
        EntryRead::Found(entry) => {
            let micros = (entry.created_at * 1_000_000.0) as i64;
            let created = Utc
                .timestamp_micros(micros)
                .single()
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| entry.created_at.to_string());

            println!("File:       {}", file.display());
            println!("Codec:      {}", entry.codec);
            println!("Created at: {}", created);
            println!("Age:        {}", format_elapsed(age(entry.created_at)));
            println!("Payload:    {} bytes", entry.payload.len());
        }
    }

    Ok(())
}

/// Deletes expired and corrupted entries, or every entry with `all`.
pub fn prune(all: bool, config: &Config) -> CacheResult<()> {
    let store = EntryStore::new(&config.cache.cache_dir);
    let entries = store.entries()?;

    if entries.is_empty() {
        println!("Nothing to prune in {}", store.dir().display());
        return Ok(());
    }

    let progress = ProgressBar::new(entries.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let mut removed = 0usize;
    for path in &entries {
        let stale = all
            || match store.read(path) {
                EntryRead::Found(entry) => config
                    .cache
                    .cache_expiration
                    .is_some_and(|ttl| age(entry.created_at) >= ttl),
                EntryRead::Corrupted(_) => true,
                EntryRead::Missing => false,
            };

        if stale && store.remove(path)? {
            removed += 1;
            tracing::debug!(path = %path.display(), "entry pruned");
        }
        progress.inc(1);
    }
    progress.finish_and_clear();

    println!("Removed {} of {} entries.", removed, entries.len());
    Ok(())
}

/// Edits the configuration interactively.
pub fn config_cmd(config_path: &Path) -> CacheResult<()> {
    use super::interactive::{run_interactive_config, show_config_summary};

    if config_path.exists() {
        let config = Config::load(config_path)?;
        show_config_summary(&config);
    }

    run_interactive_config(config_path)
}

/// Shows the version.
pub fn version() {
    println!("diskmemo {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Disk-backed memoization with TTL policies");
}

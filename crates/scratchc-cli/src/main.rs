//! `scratchc` CLI entry point: argument parsing, source collection, the
//! library's `compile_source`, and packaging, wired together with one
//! `tracing` subscriber installed here and nowhere else in the workspace.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;

use scratchc_cli::cli::{Cli, Command};
use scratchc_cli::error::CliError;
use scratchc_cli::{collect, config, logging, package};

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = config::load().unwrap_or_else(|err| {
        eprintln!("warning: {err}, using defaults");
        config::ScratchcConfig::default()
    });
    let _log_guard = logging::init(config.log_level.as_deref());

    match run(cli.command, &config) {
        Ok(output) => {
            println!("wrote {}", output.display());
            ExitCode::SUCCESS
        }
        Err(err) => {
            print_error(&err);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command, config: &config::ScratchcConfig) -> Result<PathBuf, CliError> {
    match command {
        Command::Translate { input, output } => translate(&input, output, &config.assets_dir),
    }
}

fn translate(input: &Path, output: Option<PathBuf>, assets_dir: &Path) -> Result<PathBuf, CliError> {
    let source = collect::collect_sources(std::slice::from_ref(&input.to_path_buf()))?;
    tracing::debug!(input = %input.display(), bytes = source.len(), "collected source");

    let envelope = scratchc::compile_source(&source)?;

    let output = output.unwrap_or_else(|| default_output_path(input));
    let output = package::ensure_sb3_suffix(output);
    package::write_sb3(&envelope, assets_dir, &output)?;
    tracing::info!(output = %output.display(), "wrote sb3 archive");
    Ok(output)
}

fn default_output_path(input: &Path) -> PathBuf {
    let stem = input.file_stem().map_or_else(|| "out".into(), |s| s.to_os_string());
    PathBuf::from(stem)
}

/// Prints a `CliError` to stderr. Feature-gate failures surface the banned
/// feature's name and position exactly as §6 documents; everything else
/// just prints its `Display` impl.
fn print_error(err: &CliError) {
    eprintln!("error: {err}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_output_path_replaces_extension() {
        assert_eq!(default_output_path(Path::new("program.js")), PathBuf::from("program"));
        assert_eq!(
            package::ensure_sb3_suffix(default_output_path(Path::new("program.js"))),
            PathBuf::from("program.sb3")
        );
    }
}

mod report;

use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use vfxbin::{Converter, EditSession, EngineConfig, ProcessConverter};

fn main() {
    env_logger::init();

    let cli = match parse_args() {
        Ok(cli) => cli,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    };

    let config = match &cli.config {
        Some(path) => match EngineConfig::load(path) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("error: {}: {err}", path.display());
                std::process::exit(2);
            }
        },
        None => EngineConfig::default(),
    };

    let session = match EditSession::open(&cli.input, config) {
        Ok(session) => session,
        Err(err) => {
            eprintln!("error: {}: {err}", cli.input.display());
            std::process::exit(1);
        }
    };

    report::print_table(&cli.input.display().to_string(), session.entities(), session.document().is_balanced(), cli.color);

    if let Some(output) = &cli.convert {
        if let Err(err) = convert(&cli.input, output, session.config()) {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    }
}

fn convert(input: &Path, output: &Path, config: &EngineConfig) -> Result<(), String> {
    let converter = ProcessConverter::from_config(config)
        .ok_or_else(|| "--convert needs \"converterPath\" in the config file".to_string())?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| format!("failed to start runtime: {err}"))?;
    let result = runtime.block_on(converter.to_binary(input, output)).map_err(|err| err.to_string())?;
    println!("wrote {}", result.output.display());
    Ok(())
}

struct CliConfig {
    input: PathBuf,
    config: Option<PathBuf>,
    convert: Option<PathBuf>,
    color: bool,
}

fn parse_args() -> Result<CliConfig, String> {
    let mut input: Option<PathBuf> = None;
    let mut config: Option<PathBuf> = None;
    let mut convert: Option<PathBuf> = None;
    let mut color = io::stdout().is_terminal();
    let mut args = std::env::args().skip(1);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-V" | "--version" => {
                println!("vfxbin {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--color" => color = true,
            "--no-color" => color = false,
            "--config" => {
                let value = args.next().ok_or_else(|| "error: --config expects a value".to_string())?;
                config = Some(PathBuf::from(value));
            }
            "--convert" => {
                let value = args.next().ok_or_else(|| "error: --convert expects a value".to_string())?;
                convert = Some(PathBuf::from(value));
            }
            _ if arg.starts_with("--config=") => {
                config = Some(PathBuf::from(arg.trim_start_matches("--config=")));
            }
            _ if arg.starts_with("--convert=") => {
                convert = Some(PathBuf::from(arg.trim_start_matches("--convert=")));
            }
            _ if arg.starts_with('-') => {
                return Err(format!("error: unknown option '{arg}'"));
            }
            _ => {
                if input.is_some() {
                    return Err("error: input provided multiple times".to_string());
                }
                input = Some(PathBuf::from(arg));
            }
        }
    }

    let input = input.ok_or_else(|| format!("error: no input file provided\n\n{}", help_text()))?;
    Ok(CliConfig { input, config, convert, color })
}

fn print_help() {
    println!("{}", help_text());
}

fn help_text() -> String {
    format!(
        "vfxbin {version}

Inspect visual-effect definition text: systems, emitters, resolver tables,
persistent-effect conditions and animation clips.

Usage:
  vfxbin [OPTIONS] <file>

Options:
  --config <path>            Engine config (JSON). Defaults apply to missing keys.
  --convert <output>         Convert <file> to binary with the configured converter.
  --color                    Force ANSI color output.
  --no-color                 Disable ANSI color output.
  -h, --help                 Show this help message.
  -V, --version              Print version information.

Logging:
  RUST_LOG=vfxbin=debug      Engine decisions (renames, skipped merges, lookups).
  RUST_LOG=vfxbin=trace      Also scanner diagnostics.

Exit codes:
  0  Success.
  1  Reading the file or conversion failed.
  2  Invalid arguments or config.
",
        version = env!("CARGO_PKG_VERSION")
    )
}

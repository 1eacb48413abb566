//! mural: always-on-top image viewer spanning every monitor.
//!
//! One small control window carries the keyboard focus and the status text;
//! each monitor additionally gets a borderless panel that images are routed
//! to by orientation.

#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod app;
mod config;
mod display;
mod hud;
mod image_loader;
mod loader;
mod scanner;

use std::path::PathBuf;

use tracing::info;
use tracing_subscriber::EnvFilter;

use app::ViewerApp;

const USAGE: &str = "\
usage: mural [options]

  -i, --directory <DIR>   directory to browse (default: current directory)
  -c, --clipboard         take the directory from the clipboard text
  -r, --recurse           include subdirectories
  -k, --keep-memory       cache prepared images in memory
  -h, --help              show this help";

/// Where the image directory comes from.
enum DirSource {
    Path(PathBuf),
    Clipboard,
}

struct CliArgs {
    source: DirSource,
    recurse: bool,
    keep_memory: bool,
}

/// What the argument list asks for: run the viewer, or print help and exit
/// successfully.
enum CliCommand {
    Run(CliArgs),
    Help,
}

/// Parse the argument list (program name already stripped).
fn parse_args(args: &[String]) -> Result<CliCommand, String> {
    let mut source: Option<DirSource> = None;
    let mut recurse = false;
    let mut keep_memory = false;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-i" | "--directory" => {
                if matches!(source, Some(DirSource::Clipboard)) {
                    return Err("-i and -c are mutually exclusive".into());
                }
                let value = iter
                    .next()
                    .ok_or_else(|| format!("{arg} requires a directory"))?;
                source = Some(DirSource::Path(PathBuf::from(value)));
            }
            "-c" | "--clipboard" => {
                if matches!(source, Some(DirSource::Path(_))) {
                    return Err("-i and -c are mutually exclusive".into());
                }
                source = Some(DirSource::Clipboard);
            }
            "-r" | "--recurse" => recurse = true,
            "-k" | "--keep-memory" => keep_memory = true,
            "-h" | "--help" => return Ok(CliCommand::Help),
            other => return Err(format!("unknown argument: {other}\n\n{USAGE}")),
        }
    }

    Ok(CliCommand::Run(CliArgs {
        source: source.unwrap_or(DirSource::Path(PathBuf::from("."))),
        recurse,
        keep_memory,
    }))
}

/// Clipboard text as a directory path. Surrounding quotes are stripped so
/// Explorer's "Copy as path" works directly.
fn clipboard_directory() -> Result<PathBuf, String> {
    let mut clipboard =
        arboard::Clipboard::new().map_err(|e| format!("clipboard unavailable: {e}"))?;
    let text = clipboard
        .get_text()
        .map_err(|e| format!("clipboard has no text: {e}"))?;

    let trimmed = text.trim().trim_matches('"');
    if trimmed.is_empty() {
        return Err("clipboard text is empty".into());
    }
    Ok(PathBuf::from(trimmed))
}

fn main() -> eframe::Result {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let cli = match parse_args(&args) {
        Ok(CliCommand::Run(cli)) => cli,
        Ok(CliCommand::Help) => {
            println!("{USAGE}");
            return Ok(());
        }
        Err(message) => {
            eprintln!("{message}");
            std::process::exit(2);
        }
    };

    let directory = match cli.source {
        DirSource::Path(path) => path,
        DirSource::Clipboard => match clipboard_directory() {
            Ok(path) => path,
            Err(message) => {
                eprintln!("{message}");
                std::process::exit(2);
            }
        },
    };

    let config = config::Config::load();
    let panels = display::detect_panels();
    info!(panels = panels.len(), dir = %directory.display(), "starting");

    let control_width = panels
        .first()
        .map(|p| (p.width / 2).max(320))
        .unwrap_or(960) as f32;
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("mural")
            .with_position(egui::pos2(0.0, 0.0))
            .with_inner_size(egui::vec2(control_width, 84.0))
            .with_always_on_top(),
        ..Default::default()
    };

    eframe::run_native(
        "mural",
        options,
        Box::new(move |cc| {
            Ok(Box::new(ViewerApp::new(
                cc,
                directory,
                cli.recurse,
                cli.keep_memory,
                config,
                panels,
            )))
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn run(list: &[&str]) -> CliArgs {
        match parse_args(&args(list)) {
            Ok(CliCommand::Run(cli)) => cli,
            _ => panic!("expected a run command"),
        }
    }

    #[test]
    fn defaults_to_current_directory() {
        let cli = run(&[]);
        assert!(matches!(cli.source, DirSource::Path(p) if p == PathBuf::from(".")));
        assert!(!cli.recurse);
        assert!(!cli.keep_memory);
    }

    #[test]
    fn directory_flag_takes_a_value() {
        let cli = run(&["-i", "/pics", "-r", "-k"]);
        assert!(matches!(cli.source, DirSource::Path(p) if p == PathBuf::from("/pics")));
        assert!(cli.recurse);
        assert!(cli.keep_memory);

        assert!(parse_args(&args(&["--directory"])).is_err());
    }

    #[test]
    fn directory_and_clipboard_are_exclusive() {
        assert!(parse_args(&args(&["-i", "/pics", "-c"])).is_err());
        assert!(parse_args(&args(&["-c", "-i", "/pics"])).is_err());
        let cli = run(&["--clipboard"]);
        assert!(matches!(cli.source, DirSource::Clipboard));
    }

    #[test]
    fn help_is_not_an_error() {
        assert!(matches!(parse_args(&args(&["-h"])), Ok(CliCommand::Help)));
        assert!(matches!(parse_args(&args(&["--help"])), Ok(CliCommand::Help)));
    }

    #[test]
    fn unknown_argument_is_rejected() {
        assert!(parse_args(&args(&["--frobnicate"])).is_err());
    }
}

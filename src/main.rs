//! Command-line front end.
//!
//! Usage:
//!   screensnap list                          Displays and capturable windows
//!   screensnap keys                          Editor and overlay key bindings
//!   screensnap fullscreen [--display <id>]   Capture a whole display
//!   screensnap window <id>                   Capture one window
//!   screensnap region <x> <y> <w> <h> [--display <id>]
//!                                            Capture physical pixels of a display
//!
//! Options:
//!   --out <dir>     Directory for saved captures (default: current directory)
//!   --jpeg <q>      Encode as JPEG at quality q instead of PNG
//!   --clipboard     Copy to the clipboard instead of saving a file
//!
//! Log verbosity follows RUST_LOG and defaults to `info`.

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use log::{error, info};

use screensnap::app::config::{Action, ShortcutConfig};
use screensnap::capture::{SourceFilter, SourceKind};
use screensnap::editor::{ClipboardSink, FileSink, SystemClipboard};
use screensnap::{
    AllowAll, CaptureConfig, CaptureError, CaptureMode, CaptureOptions, CaptureResult,
    OutputFormat, PhysicalRect, ScreenshotApp, XcapBackend,
};

enum Command {
    List,
    Keys,
    Capture(CaptureMode, CaptureOptions),
}

struct Cli {
    command: Command,
    out_dir: PathBuf,
    clipboard: bool,
}

fn usage() -> ! {
    eprintln!("Usage:");
    eprintln!("  screensnap list");
    eprintln!("  screensnap keys");
    eprintln!("  screensnap fullscreen [--display <id>]");
    eprintln!("  screensnap window <id>");
    eprintln!("  screensnap region <x> <y> <w> <h> [--display <id>]");
    eprintln!("Options: --out <dir>  --jpeg <quality>  --clipboard");
    process::exit(2);
}

fn parse_number<T: std::str::FromStr>(value: Option<&String>, what: &str) -> Result<T, String> {
    let value = value.ok_or_else(|| format!("missing {}", what))?;
    value
        .parse()
        .map_err(|_| format!("invalid {} '{}'", what, value))
}

fn parse_args(args: &[String]) -> Result<Cli, String> {
    let mut positional = Vec::new();
    let mut options = CaptureOptions::default();
    let mut out_dir = PathBuf::from(".");
    let mut clipboard = false;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--out" => {
                out_dir = iter
                    .next()
                    .map(PathBuf::from)
                    .ok_or("--out requires a directory")?;
            }
            "--jpeg" => {
                options.format = OutputFormat::Jpeg;
                options.quality = Some(parse_number(iter.next(), "JPEG quality")?);
            }
            "--display" => {
                options.display_id = Some(parse_number(iter.next(), "display id")?);
            }
            "--clipboard" => clipboard = true,
            flag if flag.starts_with("--") => return Err(format!("unknown option {}", flag)),
            _ => positional.push(arg.clone()),
        }
    }

    let command = match positional.first().map(String::as_str) {
        Some("list") | Some("displays") => Command::List,
        Some("keys") => Command::Keys,
        Some("fullscreen") => Command::Capture(CaptureMode::Fullscreen, options),
        Some("window") => {
            let id: u32 = parse_number(positional.get(1), "window id")?;
            options.source_id = Some(SourceKind::Window.source_id(id));
            Command::Capture(CaptureMode::Window, options)
        }
        Some("region") => {
            options.bounds = Some(PhysicalRect::new(
                parse_number(positional.get(1), "x")?,
                parse_number(positional.get(2), "y")?,
                parse_number(positional.get(3), "width")?,
                parse_number(positional.get(4), "height")?,
            ));
            Command::Capture(CaptureMode::Region, options)
        }
        Some(other) => return Err(format!("unknown command '{}'", other)),
        None => return Err("missing command".to_string()),
    };

    Ok(Cli {
        command,
        out_dir,
        clipboard,
    })
}

fn list(app: &ScreenshotApp) -> CaptureResult<()> {
    for display in app.displays() {
        let (width, height) = display.physical_size();
        println!(
            "display {:>4}  {:<20} {}x{} @ {}{}",
            display.id,
            display.name,
            width,
            height,
            display.scale_factor,
            if display.is_primary { "  (primary)" } else { "" }
        );
    }
    for source in app.sources(&SourceFilter::windows())? {
        println!("{:<13} {}", source.id, source.name);
    }
    Ok(())
}

fn keys(shortcuts: &ShortcutConfig) {
    for action in Action::ALL {
        println!(
            "{:<20} {}",
            action.label(),
            shortcuts.get_shortcut_label(action)
        );
    }
}

fn app() -> CaptureResult<ScreenshotApp> {
    ScreenshotApp::new(
        Arc::new(XcapBackend::new()),
        AllowAll,
        CaptureConfig::default(),
    )
}

fn run(cli: Cli) -> CaptureResult<()> {
    let (mode, options) = match cli.command {
        Command::Keys => {
            keys(&ShortcutConfig::default());
            return Ok(());
        }
        Command::List => return list(&app()?),
        Command::Capture(mode, options) => (mode, options),
    };

    let app = app()?;
    let sink: Box<dyn ClipboardSink> = if cli.clipboard {
        Box::new(SystemClipboard::new()?)
    } else {
        Box::new(FileSink::new(&cli.out_dir))
    };
    let screenshot = app.capture_to_clipboard(mode, &options, sink.as_ref())?;
    info!(
        "Captured {}x{} {}",
        screenshot.width,
        screenshot.height,
        screenshot.format.mime_type()
    );
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() || args.iter().any(|arg| arg == "--help" || arg == "-h") {
        usage();
    }

    let cli = match parse_args(&args) {
        Ok(cli) => cli,
        Err(message) => {
            eprintln!("{}", message);
            usage();
        }
    };

    if let Err(e) = run(cli) {
        error!("{}", e);
        let code = match e {
            CaptureError::PermissionDenied => 3,
            _ if e.is_retryable() => 75,
            _ => 1,
        };
        process::exit(code);
    }
}

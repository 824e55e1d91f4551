// ============================================================================
// HeritagePromo CLI — headless drawing replay and idea lookup
// ============================================================================
//
// Usage examples:
//   heritagepromo --events stroke.json --output drawing.png
//   heritagepromo -e scripts/*.json --output-dir out/ --format jpeg --ratio 2
//   heritagepromo -e plan.json --caption "경복궁" --output plan.jpg
//   heritagepromo --idea 불국사
//
// No GUI is opened in CLI mode.  Each event script is replayed onto a fresh
// surface through the same stroke tracker the drawing view uses.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use serde::Deserialize;

use crate::context::{PixelContext, Rgb};
use crate::export::{Exporter, ImageFormat};
use crate::settings::AppSettings;
use crate::stroke::{PointerInput, StrokeTracker};
use crate::surface::{Brush, StaticHost, SurfaceManager};

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// HeritagePromo headless mode.
///
/// Replay recorded pointer events into a drawing and export it, or ask for a
/// promotion idea, without opening the GUI.
#[derive(Parser, Debug)]
#[command(
    name = "heritagepromo",
    about = "HeritagePromo headless drawing export and idea lookup",
    long_about = "Replay JSON event scripts onto a drawing surface and export PNG/JPEG\n\
                  images, optionally with a caption, or print a promotion idea.\n\n\
                  Example:\n  \
                  heritagepromo --events stroke.json --output drawing.png\n  \
                  heritagepromo --idea 불국사"
)]
pub struct CliArgs {
    /// Event script file(s). Glob patterns accepted (e.g. "scripts/*.json").
    #[arg(short, long, num_args = 1.., value_name = "SCRIPT.json")]
    pub events: Vec<String>,

    /// Surface width in display units.
    #[arg(long, default_value_t = 600.0)]
    pub width: f32,

    /// Surface height in display units.
    #[arg(long, default_value_t = 400.0)]
    pub height: f32,

    /// Device pixel ratio of the simulated display.
    #[arg(long, default_value_t = 1.0)]
    pub ratio: f32,

    /// Output format: png or jpeg. Inferred from --output's extension when omitted.
    #[arg(short, long, value_name = "FORMAT")]
    pub format: Option<String>,

    /// JPEG quality between 0.0 and 1.0 (default 0.92).
    #[arg(short, long, value_name = "0.0-1.0")]
    pub quality: Option<f32>,

    /// Caption drawn at the top-left of the exported image.
    #[arg(short, long, value_name = "TEXT")]
    pub caption: Option<String>,

    /// Output file path. Only valid for a single script.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output directory; files take the script's stem.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Print a promotion idea for this heritage site and exit.
    #[arg(long, value_name = "NAME")]
    pub idea: Option<String>,

    /// Mirror log output to stderr and print per-file timing.
    #[arg(short, long)]
    pub verbose: bool,
}

impl CliArgs {
    /// Returns `true` when any CLI-mode flag is present in the real process arguments.
    pub fn is_cli_mode() -> bool {
        std::env::args().any(|a| a == "--events" || a == "-e" || a == "--idea" || a.starts_with("--idea="))
    }
}

// ============================================================================
// Event scripts
// ============================================================================

/// One step of an event script: a pointer event or a surface command.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ScriptStep {
    Pointer(PointerInput),
    Command(SurfaceCommand),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SurfaceCommand {
    Brush { color: String, width: u32 },
    Clear,
    Resize { width: f32, height: f32, ratio: Option<f32> },
}

/// Either a bare array of steps or `{ "steps": [...] }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ScriptFile {
    Steps(Vec<ScriptStep>),
    Wrapped { steps: Vec<ScriptStep> },
}

pub fn parse_script(json: &str) -> Result<Vec<ScriptStep>, serde_json::Error> {
    Ok(match serde_json::from_str::<ScriptFile>(json)? {
        ScriptFile::Steps(steps) | ScriptFile::Wrapped { steps } => steps,
    })
}

/// Replay `steps` onto a new surface mounted at the origin of a
/// `width × height` display with the given ratio.
pub fn replay(
    steps: &[ScriptStep],
    host: StaticHost,
    settings: &AppSettings,
) -> Result<SurfaceManager<PixelContext>, String> {
    let mut host = host;
    let mut surface = SurfaceManager::pixel()
        .with_resize_policy(settings.resize_policy)
        .with_brush(settings.default_brush());
    surface.initialize(&host).map_err(|e| e.to_string())?;

    let mut tracker = StrokeTracker::new();
    for (i, step) in steps.iter().enumerate() {
        match step {
            ScriptStep::Pointer(event) => {
                tracker.handle(event, &mut surface, &host);
            }
            ScriptStep::Command(SurfaceCommand::Brush { color, width }) => {
                let color = Rgb::from_hex(color).map_err(|e| format!("step {}: {}", i + 1, e))?;
                let brush = Brush::new(color, *width);
                surface.set_brush(brush.color, brush.width);
            }
            ScriptStep::Command(SurfaceCommand::Clear) => surface.clear(),
            ScriptStep::Command(SurfaceCommand::Resize { width, height, ratio }) => {
                host = StaticHost::new(*width, *height, ratio.unwrap_or(surface.ratio()));
                surface.handle_resize(&host).map_err(|e| format!("step {}: {}", i + 1, e))?;
            }
        }
    }
    Ok(surface)
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run CLI processing and return an OS exit code.
/// `0` = everything succeeded, `1` = one or more scripts (or the idea) failed.
pub fn run(args: CliArgs) -> ExitCode {
    crate::logger::set_mirror_stderr(args.verbose);
    let settings = AppSettings::load();

    if let Some(name) = &args.idea {
        return run_idea(name, &settings);
    }

    let inputs = resolve_inputs(&args.events);
    if inputs.is_empty() {
        eprintln!("error: no event scripts matched the given pattern(s).");
        return ExitCode::FAILURE;
    }

    if inputs.len() > 1 && args.output.is_some() && args.output_dir.is_none() {
        eprintln!(
            "error: {} scripts given but --output only accepts a single file path.\n\
             Use --output-dir to specify a destination directory.",
            inputs.len()
        );
        return ExitCode::FAILURE;
    }

    let format = match parse_format(args.format.as_deref(), args.output.as_deref()) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Some(dir) = &args.output_dir
        && let Err(e) = std::fs::create_dir_all(dir)
    {
        eprintln!("error: could not create output directory '{}': {}", dir.display(), e);
        return ExitCode::FAILURE;
    }

    let exporter = match &args.caption {
        Some(_) => Exporter::with_system_font(&settings.caption_font),
        None => Exporter::new(None),
    };

    let total = inputs.len();
    let multi = total > 1;
    let mut any_failure = false;

    for (idx, input_path) in inputs.iter().enumerate() {
        if multi || args.verbose {
            println!("[{}/{}] {}", idx + 1, total, input_path.display());
        }
        let file_start = Instant::now();

        let Some(output_path) = build_output_path(input_path, args.output.as_deref(), args.output_dir.as_deref(), format)
        else {
            eprintln!("  error: cannot determine output path for '{}'.", input_path.display());
            any_failure = true;
            continue;
        };

        match run_one(input_path, &output_path, &args, format, &exporter, &settings) {
            Ok(()) => {
                if args.verbose || multi {
                    println!(
                        "  → {} ({:.0}ms)",
                        output_path.display(),
                        file_start.elapsed().as_secs_f64() * 1000.0
                    );
                }
            }
            Err(e) => {
                log_err!("CLI: {} failed: {}", input_path.display(), e);
                eprintln!("  error: {}", e);
                any_failure = true;
            }
        }
    }

    if any_failure { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}

fn run_idea(name: &str, settings: &AppSettings) -> ExitCode {
    let name = name.trim();
    if name.is_empty() {
        eprintln!("error: {}", t!("alert.heritage_name_required"));
        return ExitCode::FAILURE;
    }
    let generator = crate::idea::connect(settings);
    match generator.generate(name) {
        Ok(idea) => {
            println!("{}", crate::idea::append_idea("", &idea));
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

// ============================================================================
// Per-script pipeline
// ============================================================================

fn run_one(
    input: &Path,
    output: &Path,
    args: &CliArgs,
    format: ImageFormat,
    exporter: &Exporter,
    settings: &AppSettings,
) -> Result<(), String> {
    let json = std::fs::read_to_string(input).map_err(|e| format!("read failed: {}", e))?;
    let steps = parse_script(&json).map_err(|e| format!("invalid event script: {}", e))?;

    let host = StaticHost::new(args.width, args.height, args.ratio);
    let surface = replay(&steps, host, settings)?;

    let image = match args.caption.as_deref().map(str::trim) {
        Some(caption) if !caption.is_empty() => exporter.export_with_caption(&surface, caption, format, args.quality),
        _ => exporter.export_image(&surface, format, args.quality),
    }
    .map_err(|e| e.to_string())?;

    std::fs::write(output, &image.bytes).map_err(|e| format!("write failed: {}", e))?;
    log_info!(
        "CLI: {} → {} ({}×{}, {} steps)",
        input.display(),
        output.display(),
        image.width,
        image.height,
        steps.len()
    );
    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

/// Expand glob patterns and literal paths into a deduplicated, ordered list.
fn resolve_inputs(patterns: &[String]) -> Vec<PathBuf> {
    let mut result: Vec<PathBuf> = Vec::new();

    for pattern in patterns {
        let as_path = Path::new(pattern);
        if as_path.exists() {
            if !result.iter().any(|p| p.as_path() == as_path) {
                result.push(as_path.to_path_buf());
            }
            continue;
        }

        match glob::glob(pattern) {
            Ok(entries) => {
                let mut matched = false;
                for entry in entries.flatten() {
                    if !result.contains(&entry) {
                        result.push(entry);
                    }
                    matched = true;
                }
                if !matched {
                    eprintln!("warning: pattern '{}' matched no files.", pattern);
                }
            }
            Err(e) => eprintln!("warning: invalid glob '{}': {}", pattern, e),
        }
    }

    result
}

/// Choose the format from `--format`, else from the output extension,
/// else PNG.  An explicit unknown format is an error.
fn parse_format(format_arg: Option<&str>, output: Option<&Path>) -> Result<ImageFormat, String> {
    if let Some(f) = format_arg {
        return ImageFormat::parse(f).ok_or_else(|| format!("unsupported format '{f}' (expected png or jpeg)"));
    }
    Ok(output
        .and_then(|out| out.extension())
        .and_then(|e| e.to_str())
        .and_then(ImageFormat::parse)
        .unwrap_or_default())
}

/// Output path: `--output`, else `--output-dir/<stem>.<ext>`, else next to
/// the script with the image extension.
fn build_output_path(
    input: &Path,
    output: Option<&Path>,
    output_dir: Option<&Path>,
    format: ImageFormat,
) -> Option<PathBuf> {
    if let Some(out) = output {
        return Some(out.to_path_buf());
    }

    let stem = input.file_stem()?.to_string_lossy().into_owned();
    let name = format!("{}.{}", stem, format.extension());
    match output_dir {
        Some(dir) => Some(dir.join(name)),
        None => Some(input.parent().unwrap_or(Path::new(".")).join(name)),
    }
}

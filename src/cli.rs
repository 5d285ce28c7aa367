// ============================================================================
// PixelReel CLI: headless project conversion and export
// ============================================================================
//
// Usage examples:
//   pixelreel -i walk.ssp -o walk.gif                  (format inferred from output ext)
//   pixelreel -i walk.ssp --format png --frame 2 -o frame2.png
//   pixelreel -i sprites/*.ssp --output-dir out/ --format sheet
//   pixelreel -i walk.ssp --info
//   pixelreel --new 32 -o blank.ssp
//   pixelreel --init-settings                          (write the settings file)
//
// Everything runs synchronously on the current thread; only GIF palette
// quantization fans out over rayon.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use image::RgbaImage;

use crate::components::preview::FrameRate;
use crate::io;
use crate::project::Project;
use crate::settings::AppSettings;

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// PixelReel headless sprite tool.
///
/// Inspect `.ssp` sprite projects and export them as PNG frames, sprite
/// sheets or animations.
#[derive(Parser, Debug)]
#[command(
    name = "pixelreel",
    version,
    about = "PixelReel headless sprite project converter",
    long_about = "Inspect .ssp sprite projects and export them without a GUI.\n\
                  Outputs: ssp (project), png (single frame), sheet (all frames\n\
                  side by side), gif and apng (animations).\n\n\
                  Example:\n  \
                  pixelreel -i walk.ssp -o walk.gif --fps 15\n  \
                  pixelreel -i sprites/*.ssp --output-dir out/ --format sheet"
)]
pub struct CliArgs {
    /// Input `.ssp` project(s). Glob patterns accepted (e.g. "sprites/*.ssp").
    #[arg(
        short,
        long,
        num_args = 1..,
        required_unless_present_any = ["new", "init_settings"],
        conflicts_with = "new"
    )]
    pub input: Vec<String>,

    /// Start from a blank project with this sprite size (2–128) instead of
    /// loading input files.
    #[arg(long, value_name = "SIZE")]
    pub new: Option<u32>,

    /// Output file path. Only valid for single-file input.
    /// For batch input use --output-dir instead.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output directory for batch processing.
    /// Files are written here with the original stem and the target format's extension.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Output format: ssp, png, sheet, gif, apng.
    /// When omitted, the format is inferred from --output's extension, defaulting to png.
    #[arg(short, long, value_name = "FORMAT")]
    pub format: Option<String>,

    /// Frame to write for png output, counted from 1. Defaults to the last frame.
    #[arg(long, value_name = "N")]
    pub frame: Option<usize>,

    /// Animation speed for gif / apng: 1, 15, 30, 45 or 60.
    #[arg(long, value_name = "FPS")]
    pub fps: Option<u32>,

    /// Print a summary of each project. Nothing is written unless an output
    /// option is given as well.
    #[arg(long)]
    pub info: bool,

    /// Print per-file timing information.
    #[arg(short, long)]
    pub verbose: bool,

    /// Write the current defaults to the settings file so they can be edited.
    /// Runs before any input is processed; on its own nothing else happens.
    #[arg(long)]
    pub init_settings: bool,
}

/// What a run writes for each project.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Ssp,
    Png,
    Sheet,
    Gif,
    Apng,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Ssp => io::SSP_EXTENSION,
            OutputFormat::Png | OutputFormat::Sheet => "png",
            OutputFormat::Gif => "gif",
            OutputFormat::Apng => "apng",
        }
    }

    /// Appended to the input stem so a sheet never lands on the frame PNG.
    fn stem_suffix(&self) -> &'static str {
        match self {
            OutputFormat::Sheet => "_sheet",
            _ => "",
        }
    }
}

/// Where a project comes from.
enum Source {
    File(PathBuf),
    Blank(u32),
}

impl Source {
    fn label(&self) -> String {
        match self {
            Source::File(p) => p.display().to_string(),
            Source::Blank(size) => format!("<new {}×{}>", size, size),
        }
    }
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run all CLI processing and return an OS exit code.
/// `0` = all files succeeded, `1` = one or more files failed.
pub fn run(args: CliArgs, settings: &AppSettings) -> ExitCode {
    if args.init_settings {
        let Some(path) = AppSettings::settings_path() else {
            eprintln!("error: no settings location is known for this platform.");
            return ExitCode::FAILURE;
        };
        if let Err(e) = write_settings(settings, &path) {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
        println!("Settings written to {}", path.display());
        if args.input.is_empty() && args.new.is_none() {
            return ExitCode::SUCCESS;
        }
    }

    let sources: Vec<Source> = match args.new {
        Some(size) => vec![Source::Blank(size)],
        None => resolve_inputs(&args.input).into_iter().map(Source::File).collect(),
    };
    if sources.is_empty() {
        eprintln!("error: no input files matched the given pattern(s).");
        return ExitCode::FAILURE;
    }

    // Multiple inputs require --output-dir, not --output
    if sources.len() > 1 && args.output.is_some() && args.output_dir.is_none() {
        eprintln!(
            "error: {} input files given but --output only accepts a single file path.\n\
             Use --output-dir to specify a destination directory for batch processing.",
            sources.len()
        );
        return ExitCode::FAILURE;
    }

    let format = match parse_format(args.format.as_deref(), args.output.as_deref()) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let fps_override = match args.fps {
        Some(fps) => match FrameRate::from_fps(fps) {
            Some(rate) => Some(rate),
            None => {
                eprintln!("error: unsupported frame rate {} (use 1, 15, 30, 45 or 60).", fps);
                return ExitCode::FAILURE;
            }
        },
        None => None,
    };

    let write_output =
        !args.info || args.output.is_some() || args.output_dir.is_some() || args.format.is_some();

    if write_output && let Some(dir) = &args.output_dir {
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!(
                "error: could not create output directory '{}': {}",
                dir.display(),
                e
            );
            return ExitCode::FAILURE;
        }
    }

    let total = sources.len();
    let multi = total > 1;
    let mut any_failure = false;

    for (idx, source) in sources.iter().enumerate() {
        if multi || args.verbose {
            println!("[{}/{}] {}", idx + 1, total, source.label());
        }

        let file_start = Instant::now();

        let mut project = match open_source(source, settings) {
            Ok(p) => p,
            Err(e) => {
                eprintln!("  error: {}", e);
                any_failure = true;
                continue;
            }
        };
        if let Some(rate) = fps_override {
            project.set_frame_rate(rate);
        }

        if args.info {
            print!("{}", describe(&project));
        }
        if !write_output {
            continue;
        }

        let input_path = match source {
            Source::File(p) => p.clone(),
            Source::Blank(_) => PathBuf::from(format!("{}.{}", project.name, io::SSP_EXTENSION)),
        };
        let Some(output_path) = build_output_path(
            &input_path,
            args.output.as_deref(),
            args.output_dir.as_deref(),
            format,
        ) else {
            eprintln!(
                "  error: cannot determine output path for '{}'.",
                input_path.display()
            );
            any_failure = true;
            continue;
        };

        match run_one(&mut project, &output_path, format, args.frame, settings) {
            Ok(()) => {
                crate::log_info!("CLI wrote {}", output_path.display());
                if args.verbose || multi {
                    println!(
                        "  → {} ({:.0}ms)",
                        output_path.display(),
                        file_start.elapsed().as_secs_f64() * 1000.0
                    );
                }
            }
            Err(e) => {
                crate::log_err!("CLI export to {} failed: {}", output_path.display(), e);
                eprintln!("  error: {}", e);
                any_failure = true;
            }
        }
    }

    if any_failure { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}

// ============================================================================
// Per-project pipeline
// ============================================================================

fn open_source(source: &Source, settings: &AppSettings) -> Result<Project, String> {
    match source {
        Source::File(path) => {
            Project::from_file(path, settings).map_err(|e| format!("load failed: {}", e))
        }
        Source::Blank(size) => Ok(Project::new_untitled(1, *size, settings)),
    }
}

fn run_one(
    project: &mut Project,
    output: &Path,
    format: OutputFormat,
    frame: Option<usize>,
    settings: &AppSettings,
) -> Result<(), String> {
    match format {
        OutputFormat::Ssp => project
            .save(output)
            .map_err(|e| format!("save failed: {}", e)),
        OutputFormat::Png => {
            let frames = project.frames();
            let index = match frame {
                Some(n) if n >= 1 && n <= frames.frame_count() => n - 1,
                Some(n) => {
                    return Err(format!(
                        "frame {} does not exist (project has {} frames)",
                        n,
                        frames.frame_count()
                    ));
                }
                None => frames.current_index(),
            };
            let buffer = frames
                .frame(index)
                .ok_or_else(|| format!("frame {} does not exist", index + 1))?;
            io::export_frame_png(buffer, output)
        }
        OutputFormat::Sheet => io::export_sprite_sheet(project.frames().frames(), output),
        OutputFormat::Gif => io::encode_animated_gif(
            &frame_images(project),
            project.frame_rate().fps(),
            settings.gif_max_colors,
            output,
        ),
        OutputFormat::Apng => {
            io::encode_animated_png(&frame_images(project), project.frame_rate().fps(), output)
        }
    }
}

fn frame_images(project: &Project) -> Vec<RgbaImage> {
    project
        .frames()
        .frames()
        .iter()
        .map(|f| f.as_rgba_image().clone())
        .collect()
}

/// Multi-line summary for `--info`.
fn describe(project: &Project) -> String {
    let frames = project.frames();
    let mut out = format!(
        "  {}: {}×{} px, {} frame{}\n",
        project.name,
        project.sprite_size(),
        project.sprite_size(),
        frames.frame_count(),
        if frames.frame_count() == 1 { "" } else { "s" }
    );
    for (i, f) in frames.frames().iter().enumerate() {
        out.push_str(&format!("    frame {}: {} painted pixels\n", i + 1, f.painted_count()));
    }
    out
}

// ============================================================================
// Helpers
// ============================================================================

/// Persist `settings` at `path`, creating the parent directory.
fn write_settings(settings: &AppSettings, path: &Path) -> Result<(), String> {
    settings.save_to(path).map_err(|e| {
        crate::log_warn!("Could not save settings to {}: {}", path.display(), e);
        format!("could not write settings to '{}': {}", path.display(), e)
    })?;
    crate::log_info!("Settings saved to {}", path.display());
    Ok(())
}

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
            Err(e) => {
                eprintln!("warning: invalid glob '{}': {}", pattern, e);
            }
        }
    }

    result
}

fn format_from_name(name: &str) -> Option<OutputFormat> {
    match name.to_lowercase().as_str() {
        "ssp" => Some(OutputFormat::Ssp),
        "png" => Some(OutputFormat::Png),
        "sheet" => Some(OutputFormat::Sheet),
        "gif" => Some(OutputFormat::Gif),
        "apng" => Some(OutputFormat::Apng),
        _ => None,
    }
}

/// Choose the [`OutputFormat`] from the `--format` string or infer it from
/// the output file extension. Defaults to PNG when neither is given.
fn parse_format(format_arg: Option<&str>, output: Option<&Path>) -> Result<OutputFormat, String> {
    if let Some(f) = format_arg {
        return format_from_name(f).ok_or_else(|| {
            format!("unknown format '{}' (expected ssp, png, sheet, gif or apng)", f)
        });
    }

    let ext = output
        .and_then(|out| out.extension())
        .and_then(|e| e.to_str())
        .unwrap_or("");
    Ok(format_from_name(ext).unwrap_or(OutputFormat::Png))
}

/// Compute the output path for a single input file.
///
/// Priority:
/// 1. `--output` (explicit path, used for single-file input)
/// 2. `--output-dir` (batch directory, derives filename from input stem)
/// 3. Fallback: same directory as input, same stem, new extension
///    (appends `_out` to stem if it would collide with the input path)
fn build_output_path(
    input: &Path,
    output: Option<&Path>,
    output_dir: Option<&Path>,
    format: OutputFormat,
) -> Option<PathBuf> {
    if let Some(out) = output {
        return Some(out.to_path_buf());
    }

    let ext = format.extension();
    let stem = format!(
        "{}{}",
        input.file_stem()?.to_string_lossy(),
        format.stem_suffix()
    );

    if let Some(dir) = output_dir {
        return Some(dir.join(format!("{}.{}", stem, ext)));
    }

    let parent = input.parent().unwrap_or(Path::new("."));
    let candidate = parent.join(format!("{}.{}", stem, ext));

    // Avoid silent overwrite of the input
    if candidate == input {
        Some(parent.join(format!("{}_out.{}", stem, ext)))
    } else {
        Some(candidate)
    }
}

#![deny(unsafe_code)]
//! CLI binary for the learngl tutorial scenes.
//!
//! Subcommands:
//! - `run <scene>`: open a window, run the scene until it closes, and
//!   optionally save the final frame as a PNG
//! - `list`: print available scenes

mod error;
mod logging;
mod window;

use clap::{ArgAction, Args, Parser, Subcommand};
use error::CliError;
use learngl_core::{AppConfig, FrameLoop, FrameStats, GlError, HeadlessWindow, Window};
use learngl_scenes::SceneKind;
use logging::{init_logging, LoggingConfig};
use serde_json::Value;
use std::path::PathBuf;
use std::process;
use window::DesktopWindow;

#[derive(Parser)]
#[command(name = "learngl", about = "OpenGL 3.3 tutorial scenes")]
struct Cli {
    /// Output as JSON instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// More log output (repeatable).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Less log output (repeatable).
    #[arg(short, long, action = ArgAction::Count, global = true, conflicts_with = "verbose")]
    quiet: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a scene in a window until Escape, window close or the frame limit.
    Run(RunArgs),
    /// List available scenes.
    List,
}

#[derive(Args, Debug, Default)]
struct RunArgs {
    /// Scene name (e.g. "quad").
    scene: String,

    /// JSON config file; flags below override its values.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Stop after this many frames.
    #[arg(short = 'n', long)]
    frames: Option<u64>,

    /// Window width in pixels.
    #[arg(short = 'W', long)]
    width: Option<u32>,

    /// Window height in pixels.
    #[arg(short = 'H', long)]
    height: Option<u32>,

    /// Directory holding textures and models.
    #[arg(long)]
    assets: Option<PathBuf>,

    /// glTF model for the model scene.
    #[arg(long)]
    model: Option<PathBuf>,

    /// Scene parameters as a JSON object, merged over the config's.
    #[arg(long)]
    params: Option<String>,

    /// Render with the in-memory backend instead of opening a window.
    #[arg(long)]
    headless: bool,

    /// Write the final frame to this PNG file.
    #[arg(long)]
    screenshot: Option<PathBuf>,
}

/// Loads the config file (if any) and applies flag overrides on top.
fn resolve_config(args: &RunArgs) -> Result<AppConfig, CliError> {
    let mut config = match &args.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };

    if let Some(frames) = args.frames {
        config.frame_limit = Some(frames);
    }
    if let Some(width) = args.width {
        config.window.width = width;
    }
    if let Some(height) = args.height {
        config.window.height = height;
    }
    if let Some(assets) = &args.assets {
        config.assets_dir = assets.clone();
    }
    if let Some(model) = &args.model {
        config.model_path = Some(model.clone());
    }
    if let Some(params) = &args.params {
        let extra: Value = serde_json::from_str(params)
            .map_err(|e| CliError::Input(format!("invalid --params JSON: {e}")))?;
        let Value::Object(extra) = extra else {
            return Err(CliError::Input("--params must be a JSON object".into()));
        };
        let mut merged = config.scene_params.as_value().clone();
        match &mut merged {
            Value::Object(base) => base.extend(extra),
            _ => merged = Value::Object(extra),
        }
        config.scene_params = merged.into();
    }
    // Nothing closes a headless window, so it always needs a limit.
    if args.headless && config.frame_limit.is_none() {
        log::info!("headless run without a frame limit; rendering one frame");
        config.frame_limit = Some(1);
    }

    config.validate()?;
    Ok(config)
}

fn run_scene(args: &RunArgs) -> Result<FrameStats, CliError> {
    if !SceneKind::list_scenes().contains(&args.scene.as_str()) {
        return Err(CliError::Input(format!(
            "unknown scene '{}' (available: {})",
            args.scene,
            SceneKind::list_scenes().join(", ")
        )));
    }
    let config = resolve_config(args)?;

    let mut frame_loop: FrameLoop<Box<dyn Window>> = FrameLoop::new()
        .with_frame_limit(config.frame_limit)
        .with_final_frame_capture(args.screenshot.is_some());
    frame_loop.open(|| -> Result<Box<dyn Window>, GlError> {
        if args.headless {
            Ok(Box::new(HeadlessWindow::new(
                config.window.width,
                config.window.height,
            )))
        } else {
            Ok(Box::new(DesktopWindow::open(&config.window)?))
        }
    })?;

    let mut scene = frame_loop
        .setup(|gpu, resources| SceneKind::from_name(&args.scene, &config, gpu, resources))?;
    let stats = frame_loop.run(&mut scene)?;

    if let Some(path) = &args.screenshot {
        let capture = frame_loop
            .take_capture()
            .ok_or_else(|| CliError::Io("no frame was rendered to capture".into()))?;
        learngl_scenes::snapshot::write_png(&capture, path)?;
    }
    Ok(stats)
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::List => {
            let scenes = SceneKind::list_scenes();
            if cli.json {
                let info = serde_json::json!({ "scenes": scenes });
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                println!("Scenes:");
                for name in scenes {
                    println!("  {name}");
                }
            }
        }
        Command::Run(args) => {
            let stats = run_scene(&args)?;
            let reason = stats
                .reason
                .map(|r| format!("{r:?}"))
                .unwrap_or_else(|| "none".to_string());
            if cli.json {
                let info = serde_json::json!({
                    "scene": args.scene,
                    "frames": stats.frames,
                    "seconds": stats.total.as_secs_f64(),
                    "close_reason": reason,
                    "screenshot": args.screenshot.as_ref().map(|p| p.display().to_string()),
                });
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                eprintln!(
                    "ran {} for {} frames in {:.2}s ({reason})",
                    args.scene,
                    stats.frames,
                    stats.total.as_secs_f64()
                );
                if let Some(path) = &args.screenshot {
                    eprintln!("final frame -> {}", path.display());
                }
            }
        }
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_logging(LoggingConfig::from_verbosity(cli.verbose, cli.quiet));
    let json_mode = cli.json;
    if let Err(e) = run(cli) {
        log::error!("{e}");
        if json_mode {
            let j = serde_json::json!({"error": e.to_string(), "exit_code": e.exit_code()});
            eprintln!("{}", serde_json::to_string_pretty(&j).unwrap_or_default());
        } else {
            eprintln!("error: {e}");
        }
        process::exit(e.exit_code());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use learngl_core::CloseReason;
    use std::io::Write;

    fn args(scene: &str) -> RunArgs {
        RunArgs {
            scene: scene.to_string(),
            ..RunArgs::default()
        }
    }

    #[test]
    fn cli_parses_run_with_overrides() {
        let cli = Cli::try_parse_from([
            "learngl", "run", "cubes", "-n", "3", "-W", "320", "--headless", "-v",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 1);
        let Command::Run(args) = cli.command else {
            panic!("expected run subcommand");
        };
        assert_eq!(args.scene, "cubes");
        assert_eq!(args.frames, Some(3));
        assert_eq!(args.width, Some(320));
        assert!(args.headless);
    }

    #[test]
    fn verbose_and_quiet_conflict() {
        assert!(Cli::try_parse_from(["learngl", "-v", "-q", "list"]).is_err());
    }

    #[test]
    fn flags_override_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"frame_limit": 100, "window": {{"width": 640}}, "scene_params": {{"count": 4}}}}"#
        )
        .unwrap();
        let run = RunArgs {
            config: Some(file.path().to_path_buf()),
            frames: Some(2),
            params: Some(r#"{"spin_speed": 30}"#.into()),
            ..args("cubes")
        };
        let config = resolve_config(&run).unwrap();
        assert_eq!(config.frame_limit, Some(2));
        assert_eq!(config.window.width, 640);
        assert_eq!(config.scene_params.u32("count", 0), 4);
        assert!((config.scene_params.f32("spin_speed", 0.0) - 30.0).abs() < 1e-6);
    }

    #[test]
    fn params_must_be_an_object() {
        let run = RunArgs {
            params: Some("[1, 2]".into()),
            ..args("quad")
        };
        let err = resolve_config(&run).unwrap_err();
        assert_eq!(err.exit_code(), 12);
    }

    #[test]
    fn invalid_override_fails_validation() {
        let run = RunArgs {
            width: Some(0),
            ..args("quad")
        };
        assert_eq!(resolve_config(&run).unwrap_err().exit_code(), 12);
    }

    #[test]
    fn headless_run_defaults_to_one_frame() {
        let run = RunArgs {
            headless: true,
            ..args("quad")
        };
        let stats = run_scene(&run).unwrap();
        assert_eq!(stats.frames, 1);
        assert_eq!(stats.reason, Some(CloseReason::FrameLimit));
    }

    #[test]
    fn unknown_scene_is_an_input_error() {
        let err = run_scene(&args("teapot")).unwrap_err();
        assert_eq!(err.exit_code(), 12);
        assert!(err.to_string().contains("teapot"));
    }

    #[test]
    fn headless_screenshot_writes_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("final.png");
        let run = RunArgs {
            headless: true,
            frames: Some(2),
            width: Some(16),
            height: Some(8),
            screenshot: Some(path.clone()),
            ..args("cubes")
        };
        let stats = run_scene(&run).unwrap();
        assert_eq!(stats.frames, 2);
        let written = std::fs::metadata(&path).unwrap();
        assert!(written.len() > 0);
    }

    #[test]
    fn missing_config_file_is_io_error() {
        let run = RunArgs {
            config: Some(PathBuf::from("/nonexistent/learngl.json")),
            ..args("quad")
        };
        assert_eq!(resolve_config(&run).unwrap_err().exit_code(), 13);
    }
}

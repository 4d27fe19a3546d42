#![deny(unsafe_code)]
//! Headless driver for flowtrail.
//!
//! Subcommands:
//! - `render`: run the frame loop for N ticks against a scene, write a PNG
//! - `list`: print available scenes
//! - `schema`: print the configuration parameter schema

mod error;

use clap::{Parser, Subcommand};
use error::CliError;
use flowtrail_core::{FlowConfig, Simulation};
use flowtrail_scenes::SceneKind;
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "flowtrail", about = "Camera-reactive particle flow visualizer")]
struct Cli {
    /// Output as JSON instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the simulation for N ticks and write a PNG of the presented frame.
    Render {
        /// Video scene standing in for the camera (see `list`).
        #[arg(long, default_value = "orbit")]
        scene: String,

        /// Viewport width in pixels.
        #[arg(short = 'W', long, default_value_t = 640)]
        width: usize,

        /// Viewport height in pixels.
        #[arg(short = 'H', long, default_value_t = 480)]
        height: usize,

        /// Number of ticks.
        #[arg(short, long, default_value_t = 300)]
        ticks: usize,

        /// PRNG seed for deterministic output.
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Configuration as a JSON object; `"camera": true` enables video.
        #[arg(long, default_value = r#"{"camera": true}"#)]
        params: String,

        /// Output file path.
        #[arg(short, long, default_value = "output.png")]
        output: PathBuf,
    },
    /// List available scenes.
    List,
    /// Print the parameter schema.
    Schema {
        /// Include the camera parameters.
        #[arg(long)]
        camera: bool,
    },
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
        Command::Schema { camera } => {
            let config = if camera {
                FlowConfig::with_camera()
            } else {
                FlowConfig::default()
            };
            println!("{}", serde_json::to_string_pretty(&config.param_schema())?);
        }
        Command::Render {
            scene,
            width,
            height,
            ticks,
            seed,
            params,
            output,
        } => {
            let params: serde_json::Value = serde_json::from_str(&params)
                .map_err(|e| CliError::Input(format!("invalid --params JSON: {e}")))?;
            let config = FlowConfig::from_json(&params);

            let source = SceneKind::from_name(&scene, seed)?;
            let (mut sim, _controls) = Simulation::new(config, width, height, seed)?;
            sim.attach_source(Box::new(source));

            (0..ticks).try_for_each(|_| sim.tick())?;

            flowtrail_scenes::snapshot::write_png(&sim, &output)?;

            if cli.json {
                let info = serde_json::json!({
                    "scene": scene,
                    "width": width,
                    "height": height,
                    "ticks": ticks,
                    "seed": seed,
                    "params": sim.config().params(),
                    "notice": sim.notice(),
                    "output": output.display().to_string(),
                });
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                if let Some(notice) = sim.notice() {
                    eprintln!("{notice}");
                }
                eprintln!(
                    "rendered {scene} ({width}x{height}, {ticks} ticks, seed {seed}) -> {}",
                    output.display()
                );
            }
            sim.shutdown();
        }
    }

    Ok(())
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    let json_mode = cli.json;
    if let Err(e) = run(cli) {
        log::debug!("exiting with code {}", e.exit_code());
        if json_mode {
            let j = serde_json::json!({"error": e.to_string(), "exit_code": e.exit_code()});
            eprintln!("{}", serde_json::to_string_pretty(&j).unwrap_or_default());
        } else {
            eprintln!("error: {e}");
        }
        process::exit(e.exit_code());
    }
}

//! # motion-engine
//!
//! Drives the animation core from the command line and prints resolved values as JSON.
//!
//! ## Commands
//! - `inspect`: load a scene description and dump the layer tree at a time
//! - `preset`: apply a text motion preset and sample per-glyph styles
//! - `slide`: run the slide-left preset and sample position and glyph offsets

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use motion_core::time::{frame_to_time, time_to_frame};
use motion_core::{
    Composition, GlyphOffsets, GlyphStyle, Layer, LayerType, SlideLeftPreset, TextLayer, TextMotionPreset,
    TransformExt,
};
use motion_core::{load_scene_str, Session};
use motion_data::motion::TextMotionOptions;
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "motion-engine")]
#[command(about = "Evaluate layered vector animations headlessly")]
#[command(version)]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Dump a scene's layer tree at a point in time
    Inspect {
        /// Path to the scene description (.json)
        scene: PathBuf,

        /// Time on the root timeline in microseconds
        #[arg(short, long, default_value_t = 0)]
        time: i64,
    },

    /// Apply a text motion preset and sample the glyph styles it produces
    Preset {
        #[arg(long, default_value = "Hello world")]
        text: String,

        /// Text motion options (.json); defaults apply when omitted
        #[arg(short, long)]
        options: Option<PathBuf>,

        #[arg(long, default_value_t = 48.0)]
        font_size: f32,

        /// Layer duration in microseconds
        #[arg(long, default_value_t = 2_000_000)]
        duration: i64,

        /// Frames between samples
        #[arg(long, default_value_t = 10)]
        step: usize,
    },

    /// Run the slide-left preset over a text layer
    Slide {
        #[arg(long, default_value = "Hello")]
        text: String,

        /// Preset duration in microseconds
        #[arg(long, default_value_t = 3_000_000)]
        duration: i64,

        #[arg(long, default_value_t = 240.0)]
        start_x: f32,

        #[arg(long, default_value_t = 40.0)]
        end_x: f32,

        #[arg(long, default_value_t = 0.6)]
        stagger: f64,

        #[arg(long, default_value_t = 1.0)]
        trailing: f64,

        /// Number of progress steps to sample
        #[arg(long, default_value_t = 4)]
        steps: u32,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match cli.command {
        Commands::Inspect { scene, time } => cmd_inspect(&scene, time),
        Commands::Preset {
            text,
            options,
            font_size,
            duration,
            step,
        } => cmd_preset(&text, options.as_deref(), font_size, duration, step),
        Commands::Slide {
            text,
            duration,
            start_x,
            end_x,
            stagger,
            trailing,
            steps,
        } => cmd_slide(&text, duration, start_x, end_x, stagger, trailing, steps),
    }
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("motion_engine=info,motion_core=warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[derive(Serialize)]
struct LayerReport {
    id: u32,
    name: String,
    layer_type: LayerType,
    current_time: i64,
    content_frame: i64,
    layer_frame: i64,
    progress: f64,
    content_version: u64,
    /// Column-major matrix and alpha; absent when the layer draws nothing.
    transform: Option<([f32; 9], f32)>,
    bounds: [f64; 4],
    #[serde(skip_serializing_if = "Option::is_none")]
    track_matte: Option<Box<LayerReport>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    children: Vec<LayerReport>,
}

fn report(layer: &Layer) -> LayerReport {
    let bounds = layer.bounds();
    let children = layer
        .as_composition()
        .map(|composition| {
            (0..composition.num_children())
                .filter_map(|index| composition.layer_at(index))
                .map(|child| report(&child))
                .collect()
        })
        .unwrap_or_default();
    LayerReport {
        id: layer.unique_id().get(),
        name: layer.layer_name(),
        layer_type: layer.layer_type(),
        current_time: layer.current_time(),
        content_frame: layer.content_frame(),
        layer_frame: layer.layer_frame(),
        progress: layer.progress(),
        content_version: layer.content_version(),
        transform: layer
            .get_transform()
            .map(|resolved| (resolved.matrix.to_cols_array(), resolved.alpha)),
        bounds: [bounds.x0, bounds.y0, bounds.x1, bounds.y1],
        track_matte: layer.track_matte_layer().map(|matte| Box::new(report(&matte))),
        children,
    }
}

fn cmd_inspect(scene: &Path, time: i64) -> Result<()> {
    let json = std::fs::read_to_string(scene)
        .with_context(|| format!("failed to read scene {}", scene.display()))?;
    let session = Session::new();
    let root: Composition = load_scene_str(&session, &json)
        .with_context(|| format!("failed to build scene {}", scene.display()))?;
    root.set_current_time(time);
    tracing::info!(layers = root.num_children(), time, "scene loaded");
    print_json(&report(&root))
}

#[derive(Serialize)]
struct PresetSample {
    frame: i64,
    styles: Vec<GlyphStyle>,
}

#[derive(Serialize)]
struct PresetReport {
    applied: bool,
    animators: usize,
    samples: Vec<PresetSample>,
}

fn cmd_preset(text: &str, options: Option<&Path>, font_size: f32, duration: i64, step: usize) -> Result<()> {
    let options: TextMotionOptions = match options {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read options {}", path.display()))?;
            serde_json::from_str(&json).with_context(|| format!("invalid options in {}", path.display()))?
        }
        None => TextMotionOptions {
            duration: duration as f64 / 2.0,
            ..TextMotionOptions::default()
        },
    };
    if step == 0 {
        bail!("--step must be at least 1");
    }

    let session = Session::new();
    let layer = TextLayer::make(&session, duration, text, font_size, "", "")
        .context("text layer duration must be positive")?;
    let rate = layer.frame_rate();
    let mut preset = TextMotionPreset::new(&layer, rate);
    let applied = preset.apply(&options);

    let total = time_to_frame(layer.duration(), rate);
    let mut samples = Vec::new();
    for frame in (0..total).step_by(step) {
        layer.set_current_time(frame_to_time(frame, rate));
        samples.push(PresetSample {
            frame,
            styles: layer.glyph_styles(),
        });
    }
    print_json(&PresetReport {
        applied,
        animators: layer.animators().len(),
        samples,
    })
}

#[derive(Serialize)]
struct SlideSample {
    progress: f64,
    layer_progress: f64,
    position_x: f32,
    offsets: Option<GlyphOffsets>,
}

fn cmd_slide(
    text: &str,
    duration: i64,
    start_x: f32,
    end_x: f32,
    stagger: f64,
    trailing: f64,
    steps: u32,
) -> Result<()> {
    let session = Session::new();
    let layer = TextLayer::make(&session, duration, text, 48.0, "", "")
        .context("text layer duration must be positive")?;
    let mut preset = SlideLeftPreset::make(&layer, duration, start_x, end_x, stagger, trailing)
        .context("slide preset rejected the layer")?;

    let steps = steps.max(1);
    let mut samples = Vec::new();
    for step in 0..=steps {
        let progress = f64::from(step) / f64::from(steps);
        preset.apply(progress);
        let position_x = layer
            .get_transform_2d()
            .map_or(0.0, |transform| transform.position_at(0).x);
        samples.push(SlideSample {
            progress,
            layer_progress: layer.progress(),
            position_x,
            offsets: layer.glyph_offsets(),
        });
    }
    print_json(&samples)
}

use clap::{ArgGroup, Parser, Subcommand};
use qrsmith::batch::{self, BatchJob, PayloadSource};
use qrsmith::config::{self, GradientConfig, IconConfig, QrConfig};
use qrsmith::imaging::{Opacity, QrcodeEncoder};
use qrsmith::logging::TracingLogger;
use qrsmith::types::{IconPosition, Rotation, Sizing};
use qrsmith::{animate, output, pipeline, writer};
use std::path::PathBuf;

/// Per-invocation overrides layered on top of `qrsmith.toml`.
#[derive(clap::Args, Clone, Default)]
struct StyleArgs {
    /// Error correction level: L, M, Q or H
    #[arg(long)]
    ec: Option<String>,

    /// Minimum QR version (1-40)
    #[arg(long = "symbol-version")]
    symbol_version: Option<u32>,

    /// Pixels per module
    #[arg(long)]
    module_size: Option<u32>,

    /// Quiet zone width in modules (0 = borderless)
    #[arg(long)]
    border: Option<u32>,

    /// Module color: CSS name or #RRGGBB
    #[arg(long)]
    fill: Option<String>,

    /// Background color: CSS name or #RRGGBB
    #[arg(long)]
    background: Option<String>,

    /// Gradient as START,END colors
    #[arg(long, value_parser = parse_gradient)]
    gradient: Option<(String, String)>,

    /// Run the gradient left to right instead of top to bottom
    #[arg(long, requires = "gradient")]
    horizontal: bool,

    /// Round the corners of the symbol
    #[arg(long)]
    rounded: bool,

    /// Logo to paste onto the symbol
    #[arg(long)]
    icon: Option<PathBuf>,

    /// Logo position
    #[arg(long, value_enum, requires = "icon")]
    icon_position: Option<IconPositionArg>,

    /// Logo opacity, 0.0 to 1.0
    #[arg(long, requires = "icon")]
    icon_opacity: Option<f32>,

    /// Text drawn under the symbol
    #[arg(long)]
    label: Option<String>,

    /// Final size as WIDTHxHEIGHT
    #[arg(long, value_parser = parse_size)]
    size: Option<[u32; 2]>,

    /// Accept any text, not just URLs
    #[arg(long)]
    any_text: bool,
}

#[derive(clap::ValueEnum, Clone, Copy)]
enum IconPositionArg {
    Center,
    TopLeft,
    BottomRight,
}

impl From<IconPositionArg> for IconPosition {
    fn from(arg: IconPositionArg) -> Self {
        match arg {
            IconPositionArg::Center => IconPosition::Center,
            IconPositionArg::TopLeft => IconPosition::TopLeft,
            IconPositionArg::BottomRight => IconPosition::BottomRight,
        }
    }
}

impl StyleArgs {
    fn apply(&self, config: &mut QrConfig) {
        if let Some(ec) = &self.ec {
            config.symbol.error_correction = ec.clone();
        }
        if let Some(v) = self.symbol_version {
            config.symbol.version = Sizing::Fixed(v);
        }
        if let Some(m) = self.module_size {
            config.symbol.module_size = Sizing::Fixed(m);
        }
        if let Some(b) = self.border {
            config.symbol.border = b;
        }
        if let Some(fill) = &self.fill {
            config.colors.fill = fill.clone();
        }
        if let Some(bg) = &self.background {
            config.colors.background = bg.clone();
        }
        if let Some((start, end)) = &self.gradient {
            config.style.gradient = Some(GradientConfig {
                start: start.clone(),
                end: end.clone(),
                rotation: if self.horizontal {
                    Rotation::Horizontal
                } else {
                    Rotation::Vertical
                },
            });
        }
        if self.rounded {
            config.style.rounded_corners = true;
        }
        if let Some(path) = &self.icon {
            let mut icon = config.icon.take().unwrap_or(IconConfig {
                path: path.clone(),
                position: IconPosition::default(),
                opacity: Opacity::default(),
            });
            icon.path = path.clone();
            if let Some(pos) = self.icon_position {
                icon.position = pos.into();
            }
            if let Some(opacity) = self.icon_opacity {
                icon.opacity = Opacity::new(opacity);
            }
            config.icon = Some(icon);
        }
        if let Some(label) = &self.label {
            config.label.text = Some(label.clone());
        }
        if let Some(size) = self.size {
            config.style.target_size = Some(size);
        }
        if self.any_text {
            config.symbol.require_url = false;
        }
    }
}

fn parse_gradient(s: &str) -> Result<(String, String), String> {
    match s.split_once(',') {
        Some((start, end)) if !start.trim().is_empty() && !end.trim().is_empty() => {
            Ok((start.trim().to_string(), end.trim().to_string()))
        }
        _ => Err(format!("expected START,END colors, got '{s}'")),
    }
}

fn parse_size(s: &str) -> Result<[u32; 2], String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{s}'"))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<u32>()
            .ok()
            .filter(|&n| n > 0)
            .ok_or_else(|| format!("invalid dimension '{v}'"))
    };
    Ok([parse(w)?, parse(h)?])
}

#[derive(Parser)]
#[command(name = "qrsmith")]
#[command(about = "Customized QR codes: single, batch, or animated")]
#[command(long_about = "\
Customized QR codes: single, batch, or animated

Settings come from qrsmith.toml in the config directory (all optional),
then from command-line flags.

Pipeline per code:
  payload → version/module size/EC level → symbol
          → gradient → rounded corners → icon → label → resize → file

Run 'qrsmith gen-config' to generate a documented qrsmith.toml.")]
#[command(version)]
struct Cli {
    /// Directory containing qrsmith.toml
    #[arg(long, default_value = ".", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate one QR code
    Generate {
        /// Text or URL to encode
        payload: String,

        /// Output file; the extension picks the format
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        style: StyleArgs,
    },
    /// Generate one QR code per payload
    #[command(group(ArgGroup::new("source").required(true).args(["payloads", "file", "csv"])))]
    Batch {
        /// Payloads given inline
        payloads: Vec<String>,

        /// Text file with one payload per line
        #[arg(long)]
        file: Option<PathBuf>,

        /// CSV file; payloads are read from the first column
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Output directory
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// File name prefix: {prefix}_{index}
        #[arg(long)]
        prefix: Option<String>,

        /// Text written to a metadata sidecar for every code
        #[arg(long)]
        metadata: Option<String>,

        /// Render codes in parallel
        #[arg(long)]
        parallel: bool,

        #[command(flatten)]
        style: StyleArgs,
    },
    /// Generate a looping GIF that cycles through fill colors
    Animate {
        /// Text or URL to encode
        payload: String,

        /// Output GIF
        #[arg(short, long)]
        output: PathBuf,

        /// Frame colors, comma separated
        #[arg(long, value_delimiter = ',')]
        colors: Option<Vec<String>>,

        /// How long each frame is shown
        #[arg(long)]
        frame_ms: Option<u32>,

        #[command(flatten)]
        style: StyleArgs,
    },
    /// Print a stock qrsmith.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "qrsmith=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let log = TracingLogger;
    let encoder = QrcodeEncoder::new();

    match cli.command {
        Command::Generate {
            payload,
            output: output_path,
            style,
        } => {
            let mut config = config::load_config(&cli.config)?;
            style.apply(&mut config);
            config.validate()?;
            let request = pipeline::GenerationRequest::from_config(&payload, output_path, &config);
            let written = pipeline::generate_to_file(&encoder, &request, &log)?;
            output::print_generate_output(&payload, &written);
        }
        Command::Batch {
            payloads,
            file,
            csv,
            out_dir,
            prefix,
            metadata,
            parallel,
            style,
        } => {
            let mut config = config::load_config(&cli.config)?;
            style.apply(&mut config);
            if let Some(dir) = out_dir {
                config.batch.output_dir = dir;
            }
            if let Some(prefix) = prefix {
                config.batch.prefix = prefix;
            }
            if metadata.is_some() {
                config.batch.metadata = metadata;
            }
            if parallel {
                config.batch.parallel = true;
            }
            config.validate()?;

            let source = match (file, csv) {
                (Some(path), _) => PayloadSource::Lines(path),
                (None, Some(path)) => PayloadSource::Csv(path),
                (None, None) => PayloadSource::List(payloads),
            };
            if config.batch.parallel {
                init_thread_pool(&config.batch);
            }
            let job = BatchJob::from_config(source, &config);

            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_batch_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let results = batch::run_batch(&job, &encoder, &log, Some(tx));
            printer.join().unwrap();
            let results = results?;
            println!();
            output::print_batch_summary(&results);
        }
        Command::Animate {
            payload,
            output: output_path,
            colors,
            frame_ms,
            style,
        } => {
            let mut config = config::load_config(&cli.config)?;
            style.apply(&mut config);
            if let Some(colors) = colors {
                config.animation.colors = colors;
            }
            if let Some(ms) = frame_ms {
                config.animation.frame_duration_ms = ms;
            }
            config.validate()?;

            let options = pipeline::RenderOptions::from_config(&config);
            let animation = animate::render_animation(
                &encoder,
                &payload,
                &options,
                &config.animation.colors,
                config.animation.frame_duration_ms,
                &log,
            )?;
            let path = writer::save_animation(&animation, &output_path)?;
            output::print_animate_output(&payload, &animation, &path);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Initialize the rayon thread pool based on batch config.
///
/// Caps at the number of available CPU cores: user can constrain down, not up.
fn init_thread_pool(batch: &config::BatchConfig) {
    let threads = config::effective_threads(batch);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

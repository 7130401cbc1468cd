use anyhow::{Context, Result};
use clap::Parser;
use greenkey::acquire::{ColorPick, PresetAcquisition};
use greenkey::config::Preset;
use greenkey::preview::{HeadlessPreview, Preview, SnapshotPreview};
use greenkey::{CancelToken, MediaPaths, Session};
use std::io::BufRead;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input image or video with a green screen
    foreground: PathBuf,

    /// Replacement background image or video
    background: PathBuf,

    /// Output file; if omitted, frames are only previewed
    output: Option<PathBuf>,

    /// Hue tolerance in percent of the color wheel (0-100) [default: 12]
    #[arg(long, value_parser = clap::value_parser!(u32).range(0..=100))]
    tolerance: Option<u32>,

    /// Edge softness radius in pixels [default: 2]
    #[arg(long, value_parser = clap::value_parser!(u32).range(0..=100))]
    softness: Option<u32>,

    /// Minimum saturation and value in percent for a pixel to be keyed (0-100) [default: 40]
    #[arg(long, value_parser = clap::value_parser!(u32).range(0..=100))]
    defringe: Option<u32>,

    /// Key color as #rrggbb
    #[arg(long, conflicts_with = "pick")]
    key_color: Option<String>,

    /// Pick the key color from the first foreground frame at X,Y [default: 0,0]
    #[arg(long, value_name = "X,Y")]
    pick: Option<ColorPick>,

    /// TOML file with keying settings; command line flags take precedence
    #[arg(long)]
    preset: Option<PathBuf>,

    /// Image file kept updated with the latest output frame
    #[arg(long)]
    preview: Option<PathBuf>,

    /// Update the preview every N frames
    #[arg(long, default_value_t = 1)]
    preview_every: u64,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

impl Args {
    /// Settings given on the command line, layered over the preset file
    fn key_preset(&self) -> Result<Preset> {
        let pick = match self.pick {
            Some(ColorPick::At { x, y }) => Some([x, y]),
            _ => None,
        };

        let cli = Preset {
            tolerance: self.tolerance,
            softness: self.softness,
            defringe: self.defringe,
            key_color: self.key_color.clone(),
            pick,
        };

        let file = match &self.preset {
            Some(path) => Preset::load(path).context("Failed to load preset")?,
            None => Preset::default(),
        };

        Ok(cli.over(file))
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    tracing::info!("greenkey starting");
    tracing::info!("Foreground: {}", args.foreground.display());
    tracing::info!("Background: {}", args.background.display());
    match &args.output {
        Some(output) => tracing::info!("Output: {}", output.display()),
        None => tracing::info!("Output: none (preview only)"),
    }

    let preset = args.key_preset()?;
    let params = preset.parameters().context("Invalid keying parameters")?;
    let pick = preset.color_pick().context("Invalid key color")?;
    let mut acquisition = PresetAcquisition::new(pick, params);

    let mut preview: Box<dyn Preview> = match &args.preview {
        Some(path) => Box::new(
            SnapshotPreview::new(path, args.preview_every)
                .context("Failed to set up preview")?,
        ),
        None => Box::new(HeadlessPreview),
    };

    let cancel = CancelToken::new();
    watch_keyboard(cancel.clone());

    let mut session = Session::new(
        MediaPaths {
            foreground: args.foreground,
            background: args.background,
            output: args.output,
        },
        cancel,
    );

    let summaries = session
        .run(&mut acquisition, preview.as_mut())
        .context("Keying failed")?;

    for summary in summaries {
        if summary.cancelled {
            tracing::info!("Stopped by user after {} frames", summary.frames);
        } else {
            tracing::info!("Done: {} frames", summary.frames);
        }
    }

    Ok(())
}

/// Raise `cancel` when the user types `q` or Esc followed by Enter
fn watch_keyboard(cancel: CancelToken) {
    tracing::info!("Type q + Enter to stop");

    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            let line = line.trim();
            if line.eq_ignore_ascii_case("q") || line.contains('\u{1b}') {
                cancel.cancel();
            }
        }
    });
}

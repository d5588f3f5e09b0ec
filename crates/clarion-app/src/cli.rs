//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clarion_core::AudioFormat;

/// Clarion - load, play, mute and crossfade named sounds
#[derive(Parser, Debug)]
#[command(name = "clarion")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file (JSON). Defaults to the platform config directory,
    /// then to the bundled demo manifest
    #[arg(short, long, global = true, env = "CLARION_CONFIG")]
    pub config: Option<PathBuf>,

    /// Asset root: a directory or an http(s) base URL
    #[arg(short, long, global = true, env = "CLARION_ASSETS")]
    pub assets: Option<String>,

    /// Force a file format instead of probing (ogg, mp3, wav, flac)
    #[arg(short, long, global = true, value_parser = parse_format)]
    pub format: Option<AudioFormat>,

    /// Render into memory instead of opening an output device
    #[arg(long, global = true)]
    pub offline: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List audio output devices
    Devices,

    /// Load sounds and report what was fetched
    Load {
        /// Sound ids (all registered sounds if empty)
        ids: Vec<String>,

        /// Load every sound in a group
        #[arg(short, long, conflicts_with = "ids")]
        group: Option<String>,
    },

    /// Load and play sounds
    Play {
        /// Sound ids
        #[arg(required = true)]
        ids: Vec<String>,

        /// Override the configured volume
        #[arg(short, long, allow_negative_numbers = true)]
        volume: Option<f32>,

        /// Loop until the playing time runs out
        #[arg(short, long = "loop")]
        looping: bool,

        /// How long to keep playing, in seconds
        #[arg(short, long, default_value_t = 3.0)]
        seconds: f64,
    },

    /// Play two sounds and crossfade from one to the other
    Crossfade {
        /// Sound to fade out
        from: String,

        /// Sound to fade in
        to: String,

        /// Fade duration in seconds (configured default if omitted)
        #[arg(short, long)]
        duration: Option<f64>,
    },

    /// Walk through every example in the manifest
    Demo,
}

fn parse_format(value: &str) -> Result<AudioFormat, String> {
    AudioFormat::from_extension(value).ok_or_else(|| {
        format!("unknown format '{value}' (expected ogg, mp3, wav or flac)")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_play() {
        let cli = Cli::try_parse_from([
            "clarion", "--offline", "-f", "mp3", "play", "coin", "laser", "-v", "0.2", "--loop",
        ])
        .unwrap_or_else(|e| panic!("{e}"));

        assert!(cli.offline);
        assert_eq!(cli.format, Some(AudioFormat::Mp3));
        match cli.command {
            Commands::Play {
                ids,
                volume,
                looping,
                seconds,
            } => {
                assert_eq!(ids, vec!["coin", "laser"]);
                assert_eq!(volume, Some(0.2));
                assert!(looping);
                assert!((seconds - 3.0).abs() < f64::EPSILON);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_rejects_unknown_format() {
        assert!(Cli::try_parse_from(["clarion", "-f", "aiff", "devices"]).is_err());
    }

    #[test]
    fn test_load_group_conflicts_with_ids() {
        assert!(Cli::try_parse_from(["clarion", "load", "coin", "--group", "sfx"]).is_err());
        assert!(Cli::try_parse_from(["clarion", "load", "--group", "sfx"]).is_ok());
    }
}

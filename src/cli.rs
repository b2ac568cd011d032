use crate::config::{SizeLockOverrides, TargetRange};
use crate::constants::{DEFAULT_MAX_BYTES, DEFAULT_MIN_BYTES};
use crate::error::Result;
use crate::utils::parse_byte_size;
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "sizelock",
    about = "Re-encode images into JPEGs whose size lands inside a byte window",
    long_about = "sizelock searches over output width and JPEG quality until the encoded file \
                  size falls inside a target window (1 MiB - 3 MiB by default). Undersized \
                  results grow resolution first; oversized results give up quality before \
                  resolution. The search is bounded and fails loudly instead of returning an \
                  out-of-range image.",
    version,
    after_help = "EXAMPLES:\n  \
    sizelock lock generated.png catalog.jpg\n  \
    sizelock lock shot.webp out.jpg --min-bytes 512KiB --max-bytes 2MiB --max-iterations 40\n  \
    sizelock batch \"./renders/*.png\" ./catalog -j 4\n  \
    sizelock info catalog.jpg"
)]
pub struct Args {
    #[arg(
        short = 'c',
        long,
        global = true,
        help = "TOML file with search tuning constants"
    )]
    pub config: Option<PathBuf>,

    #[arg(short = 'q', long, global = true, help = "Only print errors")]
    pub quiet: bool,

    #[arg(
        short = 'v',
        long,
        global = true,
        help = "Log every encode attempt",
        conflicts_with = "quiet"
    )]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(
        about = "Size-lock a single image",
        long_about = "Decode an image and re-encode it as a JPEG whose size lies inside the \
                      target window. Nothing is written if the search does not converge."
    )]
    Lock {
        #[arg(help = "Input image file path")]
        input: PathBuf,

        #[arg(help = "Output JPEG file path")]
        output: PathBuf,

        #[command(flatten)]
        range: RangeArgs,

        #[command(flatten)]
        tuning: TuningArgs,
    },

    #[command(
        about = "Size-lock multiple images in parallel",
        long_about = "Process a directory, file, or glob of images in parallel. Each output is \
                      written as <output>/<stem>.jpg. Files that fail are reported and skipped."
    )]
    Batch {
        #[arg(
            help = "Input directory, file pattern, or glob",
            long_help = "Input can be a directory path, file pattern, or glob expression. \
                         Examples: './renders', '*.png', '/path/to/images/*.{jpg,png}'"
        )]
        input: String,

        #[arg(help = "Output directory path")]
        output: PathBuf,

        #[command(flatten)]
        range: RangeArgs,

        #[command(flatten)]
        tuning: TuningArgs,

        #[arg(
            short = 'j',
            long,
            help = "Number of parallel threads (default: auto)",
            long_help = "Upper bound on worker threads. The effective count may be lower \
                         when memory or large inputs require it."
        )]
        threads: Option<usize>,

        #[arg(short = 'r', long, help = "Process subdirectories recursively")]
        recursive: bool,
    },

    #[command(
        about = "Display image information",
        long_about = "Show dimensions, format, and file size, and whether the file already \
                      sits inside the target window."
    )]
    Info {
        #[arg(help = "Image file path to analyze")]
        input: PathBuf,

        #[command(flatten)]
        range: RangeArgs,
    },
}

#[derive(ClapArgs, Debug, Clone)]
pub struct RangeArgs {
    #[arg(
        long,
        value_parser = parse_size_arg,
        default_value_t = DEFAULT_MIN_BYTES,
        help = "Smallest acceptable output size (e.g. 1048576, 1MiB)"
    )]
    pub min_bytes: u64,

    #[arg(
        long,
        value_parser = parse_size_arg,
        default_value_t = DEFAULT_MAX_BYTES,
        help = "Largest acceptable output size (e.g. 3145728, 3MiB)"
    )]
    pub max_bytes: u64,
}

impl RangeArgs {
    pub fn target(&self) -> Result<TargetRange> {
        TargetRange::new(self.min_bytes, self.max_bytes)
    }
}

#[derive(ClapArgs, Debug, Clone, Default)]
#[command(next_help_heading = "Search tuning")]
pub struct TuningArgs {
    #[arg(long, help = "Width of the first attempt in pixels")]
    pub start_width: Option<u32>,

    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100), help = "JPEG quality of the first attempt")]
    pub start_quality: Option<u8>,

    #[arg(long, help = "Maximum number of encode attempts")]
    pub max_iterations: Option<u32>,

    #[arg(long, help = "Pixels added or removed per width adjustment")]
    pub width_step: Option<u32>,

    #[arg(long, help = "Quality added when the result is too small")]
    pub quality_step_up: Option<u8>,

    #[arg(long, help = "Quality removed when the result is too big")]
    pub quality_step_down: Option<u8>,

    #[arg(long, help = "Quality at or below which oversized results shrink width instead")]
    pub quality_shrink_threshold: Option<u8>,

    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100), help = "Lowest quality the search may use")]
    pub quality_floor: Option<u8>,

    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100), help = "Highest quality the search may use")]
    pub quality_ceiling: Option<u8>,

    #[arg(long, help = "Narrowest width the search may use")]
    pub width_floor: Option<u32>,
}

impl From<&TuningArgs> for SizeLockOverrides {
    fn from(args: &TuningArgs) -> Self {
        Self {
            start_width: args.start_width,
            start_quality: args.start_quality,
            max_iterations: args.max_iterations,
            width_step: args.width_step,
            quality_step_up: args.quality_step_up,
            quality_step_down: args.quality_step_down,
            quality_shrink_threshold: args.quality_shrink_threshold,
            quality_floor: args.quality_floor,
            quality_ceiling: args.quality_ceiling,
            width_floor: args.width_floor,
        }
    }
}

fn parse_size_arg(value: &str) -> std::result::Result<u64, String> {
    parse_byte_size(value).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_lock_defaults_to_one_to_three_mib() {
        let args = Args::parse_from(["sizelock", "lock", "in.png", "out.jpg"]);
        match args.command {
            Commands::Lock { range, tuning, .. } => {
                assert_eq!(range.target().unwrap(), TargetRange::default());
                assert_eq!(SizeLockOverrides::from(&tuning), SizeLockOverrides::default());
            }
            _ => panic!("expected lock"),
        }
    }

    #[test]
    fn test_lock_parses_human_sizes_and_tuning() {
        let args = Args::parse_from([
            "sizelock",
            "lock",
            "in.png",
            "out.jpg",
            "--min-bytes",
            "512KiB",
            "--max-bytes",
            "2MiB",
            "--max-iterations",
            "40",
            "--start-width",
            "3200",
        ]);
        match args.command {
            Commands::Lock { range, tuning, .. } => {
                assert_eq!(range.min_bytes, 524_288);
                assert_eq!(range.max_bytes, 2_097_152);
                let overrides = SizeLockOverrides::from(&tuning);
                assert_eq!(overrides.max_iterations, Some(40));
                assert_eq!(overrides.start_width, Some(3200));
            }
            _ => panic!("expected lock"),
        }
    }

    #[test]
    fn test_rejects_bad_size_and_quality() {
        assert!(Args::try_parse_from(["sizelock", "lock", "a", "b", "--min-bytes", "lots"]).is_err());
        assert!(Args::try_parse_from(["sizelock", "lock", "a", "b", "--start-quality", "101"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = Args::parse_from(["sizelock", "info", "x.jpg", "-v", "--config", "t.toml"]);
        assert!(args.verbose);
        assert_eq!(args.config, Some(PathBuf::from("t.toml")));
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Args::try_parse_from(["sizelock", "-q", "-v", "info", "x.jpg"]).is_err());
    }
}

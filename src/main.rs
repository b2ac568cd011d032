use anyhow::Context;
use clap::Parser;
use sizelock::cli::{Args, Commands, RangeArgs, TuningArgs};
use sizelock::config::{resolve_config, SizeLockConfig, SizeLockOverrides};
use sizelock::utils::{calculate_compression_ratio, format_file_size};
use sizelock::{batch_lock_images, get_image_info, lock_file, logger, print_image_info, report};
use std::path::Path;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args = Args::parse();
    logger::init_logging(args.quiet, args.verbose);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("❌ {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let config_path = args.config.as_deref();

    match args.command {
        Commands::Lock {
            input,
            output,
            range,
            tuning,
        } => {
            let config = load_config(config_path, &tuning)?;
            lock_single(&input, &output, &range, &config)
        }
        Commands::Batch {
            input,
            output,
            range,
            tuning,
            threads,
            recursive,
        } => {
            let config = load_config(config_path, &tuning)?;
            let target = range.target()?;
            let summary =
                batch_lock_images(&input, &output, target, &config, recursive, threads)?;
            if summary.failed > 0 {
                anyhow::bail!(
                    "{} of {} files failed",
                    summary.failed,
                    summary.failed + summary.processed
                );
            }
            Ok(())
        }
        Commands::Info { input, range } => {
            let target = range.target()?;
            report!("📋 Getting info for: {:?}", input);
            let info = get_image_info(&input, target)
                .with_context(|| format!("reading {}", input.display()))?;
            print_image_info(&info, target);
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>, tuning: &TuningArgs) -> anyhow::Result<SizeLockConfig> {
    let overrides = SizeLockOverrides::from(tuning);
    resolve_config(path, &overrides).context("loading search tuning")
}

fn lock_single(
    input: &Path,
    output: &Path,
    range: &RangeArgs,
    config: &SizeLockConfig,
) -> anyhow::Result<()> {
    let target = range.target()?;

    report!("🔒 Size locking image: {:?}", input);
    report!("📁 Output: {:?}", output);
    report!(
        "🎯 Target: {} - {}",
        format_file_size(target.min_bytes()),
        format_file_size(target.max_bytes())
    );

    let (original_size, result) = lock_file(input, output, target, config)
        .with_context(|| format!("size locking {}", input.display()))?;

    report!(
        "📊 Original size: {} ({})",
        original_size,
        format_file_size(original_size)
    );
    report!(
        "📈 Output size: {} ({})",
        result.size_bytes,
        format_file_size(result.size_bytes)
    );
    report!("📏 Width: {}px, quality: {}", result.width, result.quality);
    report!(
        "🎯 Size change: {:.1}%",
        -calculate_compression_ratio(original_size, result.size_bytes)
    );
    report!("✅ Size lock complete");

    Ok(())
}

use crate::config::{SizeLockConfig, TargetRange};
use crate::constants::{
    LARGE_IMAGE_THRESHOLD_MIB, MAX_BATCH_FILES, MAX_BATCH_MEMORY_MIB, MAX_CONCURRENT_LARGE_IMAGES,
    MIN_AVAILABLE_MEMORY_MIB, OUTPUT_EXTENSION, PROGRESS_BAR_TEMPLATE,
};
use crate::error::{ReencodeError, Result};
use crate::processing::lock_file;
use crate::logger::is_quiet;
use crate::report;
use crate::utils::{calculate_compression_ratio, format_file_size, is_image_file};
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Instant;
use sysinfo::{MemoryRefreshKind, RefreshKind, System};
use tracing::warn;
use walkdir::WalkDir;

/// Totals for one batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub processed: usize,
    pub failed: usize,
    pub unconverged: usize,
    pub total_before: u64,
    pub total_after: u64,
}

/// Estimates decoded memory for an image file without loading it.
///
/// The search also holds a resized copy and the encoded output, so the
/// multipliers are on the generous side.
fn estimate_image_memory_usage(file_path: &Path) -> Result<f64> {
    let metadata = fs::metadata(file_path)?;
    let file_size_mib = metadata.len() as f64 / (1024.0 * 1024.0);

    let multiplier = match file_path.extension().and_then(|s| s.to_str()) {
        Some(ext) => match ext.to_lowercase().as_str() {
            "jpg" | "jpeg" => 8.0,
            "png" => 6.0,
            "webp" => 7.0,
            "bmp" | "tiff" | "tif" => 2.5,
            "gif" => 4.0,
            _ => 6.0,
        },
        None => 6.0,
    };

    Ok(file_size_mib * multiplier)
}

fn available_memory_mib() -> u64 {
    let mut sys =
        System::new_with_specifics(RefreshKind::new().with_memory(MemoryRefreshKind::new()));
    sys.refresh_memory();
    sys.available_memory() / (1024 * 1024)
}

/// Validates batch memory requirements before processing.
///
/// # Returns
/// * `Ok((total_memory_mib, large_image_count))`
/// * `Err(ReencodeError)` - If a file-count or memory limit would be exceeded
fn validate_batch_memory_limits(image_files: &[PathBuf]) -> Result<(f64, usize)> {
    if image_files.len() > MAX_BATCH_FILES {
        return Err(ReencodeError::BatchFileLimitExceeded(
            image_files.len(),
            MAX_BATCH_FILES,
        ));
    }

    let mut total_memory_mib = 0.0;
    let mut large_image_count = 0;

    for file_path in image_files {
        let memory_estimate = estimate_image_memory_usage(file_path)?;
        total_memory_mib += memory_estimate;

        if memory_estimate > LARGE_IMAGE_THRESHOLD_MIB {
            large_image_count += 1;
        }
    }

    let total_memory_mib_u64 = total_memory_mib.ceil() as u64;
    if total_memory_mib_u64 > MAX_BATCH_MEMORY_MIB {
        return Err(ReencodeError::BatchMemoryLimitExceeded(
            total_memory_mib_u64,
            MAX_BATCH_MEMORY_MIB,
        ));
    }

    let available_mem_mib = available_memory_mib();
    if total_memory_mib_u64 + MIN_AVAILABLE_MEMORY_MIB > available_mem_mib {
        return Err(ReencodeError::InsufficientMemory(
            total_memory_mib_u64,
            available_mem_mib,
        ));
    }

    Ok((total_memory_mib, large_image_count))
}

/// Thread count for a batch: bounded by CPUs, large images and free memory.
fn plan_parallelism(
    total_files: usize,
    estimated_memory_mib: f64,
    large_image_count: usize,
) -> usize {
    let baseline = num_cpus::get().min(total_files).max(1);
    let large_cap = if large_image_count >= MAX_CONCURRENT_LARGE_IMAGES {
        MAX_CONCURRENT_LARGE_IMAGES
    } else {
        baseline
    };

    let avg_per_file_mib =
        ((estimated_memory_mib / total_files.max(1) as f64).ceil() as u64).max(1);
    let usable_mib = available_memory_mib().saturating_sub(MIN_AVAILABLE_MEMORY_MIB);
    let mem_cap = (usable_mib / avg_per_file_mib).clamp(1, baseline as u64) as usize;

    large_cap.min(mem_cap).max(1)
}

/// Size-lock every image under `input` into `output`.
///
/// Per-file failures are logged and counted; they never abort the batch.
pub fn batch_lock_images(
    input: &str,
    output: &Path,
    target: TargetRange,
    config: &SizeLockConfig,
    recursive: bool,
    threads: Option<usize>,
) -> Result<BatchSummary> {
    report!("🚀 Starting batch size lock...");
    report!("📁 Input: {}", input);
    report!("📁 Output: {:?}", output);

    let start_time = Instant::now();

    let image_files = collect_image_files(input, recursive)?;
    let total_files = image_files.len();

    if total_files == 0 {
        report!("⚠️  No image files found in the input path");
        return Ok(BatchSummary::default());
    }

    report!("📊 Found {} image files to process", total_files);

    let (estimated_memory_mib, large_image_count) = validate_batch_memory_limits(&image_files)?;
    report!("  💾 Estimated memory usage: {:.1} MiB", estimated_memory_mib);
    report!(
        "  📏 Large images (>{}MiB): {}",
        LARGE_IMAGE_THRESHOLD_MIB, large_image_count
    );

    let planned = plan_parallelism(total_files, estimated_memory_mib, large_image_count);
    let parallelism = threads.map_or(planned, |t| t.clamp(1, planned.max(1)));
    report!("⚙️  Using {} parallel threads for processing", parallelism);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(parallelism)
        .build()
        .map_err(|e| ReencodeError::Io(std::io::Error::other(e)))?;

    fs::create_dir_all(output)
        .map_err(|_| ReencodeError::DirectoryCreationFailed(output.to_path_buf()))?;

    let jobs = plan_outputs(&image_files, output);

    let progress = if is_quiet() {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(total_files as u64)
    };
    if let Ok(style) = ProgressStyle::default_bar().template(PROGRESS_BAR_TEMPLATE) {
        progress.set_style(style.progress_chars("#>-"));
    }

    let processed = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);
    let unconverged = AtomicUsize::new(0);
    let total_before = AtomicU64::new(0);
    let total_after = AtomicU64::new(0);

    pool.install(|| {
        jobs.into_par_iter().for_each(|(input_path, planned)| {
            let outcome = planned
                .and_then(|output_path| lock_file(&input_path, &output_path, target, config));
            match outcome {
                Ok((before, result)) => {
                    total_before.fetch_add(before, Ordering::Relaxed);
                    total_after.fetch_add(result.size_bytes, Ordering::Relaxed);
                    processed.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    if e.is_convergence_failure() {
                        unconverged.fetch_add(1, Ordering::Relaxed);
                    }
                    failed.fetch_add(1, Ordering::Relaxed);
                    progress.suspend(|| {
                        warn!(file = %input_path.display(), error = %e, "failed to size lock")
                    });
                }
            }
            progress.inc(1);
        })
    });

    progress.finish_with_message("✅ Batch size lock complete");

    let summary = BatchSummary {
        processed: processed.into_inner(),
        failed: failed.into_inner(),
        unconverged: unconverged.into_inner(),
        total_before: total_before.into_inner(),
        total_after: total_after.into_inner(),
    };
    let elapsed_time = start_time.elapsed();

    report!("\n📊 Batch Summary:");
    report!("  📁 Files locked: {}", summary.processed);
    report!(
        "  📊 Total original size: {}",
        format_file_size(summary.total_before)
    );
    report!("  📊 Total output size: {}", format_file_size(summary.total_after));
    report!(
        "  🎯 Overall size change: {:.1}%",
        -calculate_compression_ratio(summary.total_before, summary.total_after)
    );
    report!("  ⏱️  Total time: {:?}", elapsed_time);
    if summary.failed > 0 {
        report!(
            "  ⚠️  Failed files: {} ({} did not converge)",
            summary.failed, summary.unconverged
        );
    }

    Ok(summary)
}

pub fn collect_image_files(input: &str, recursive: bool) -> Result<Vec<PathBuf>> {
    let mut image_files = Vec::new();

    let input_path = Path::new(input);
    let canonical_input = if input_path.exists() {
        input_path
            .canonicalize()
            .map_err(|_| ReencodeError::NoImageFilesFound(input.to_string()))?
    } else {
        // Not a path; try it as a glob below
        input_path.to_path_buf()
    };

    if canonical_input.is_file() {
        image_files.push(canonical_input);
    } else if canonical_input.is_dir() {
        let walker = if recursive {
            WalkDir::new(&canonical_input)
        } else {
            WalkDir::new(&canonical_input).max_depth(1)
        };

        for entry in walker
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'))
        {
            let entry = entry?;
            let path = entry.path();

            if path.is_file() && is_image_file(path) {
                if let Ok(canonical_path) = path.canonicalize() {
                    image_files.push(canonical_path);
                }
            }
        }
    } else if let Ok(glob_pattern) = glob(input) {
        for entry in glob_pattern.flatten() {
            if entry.is_file() && is_image_file(&entry) {
                if let Ok(canonical_path) = entry.canonicalize() {
                    image_files.push(canonical_path);
                }
            }
        }
    } else {
        return Err(ReencodeError::NoImageFilesFound(input.to_string()));
    }

    image_files.sort();
    Ok(image_files)
}

pub fn generate_output_path(input_path: &Path, output_dir: &Path) -> Result<PathBuf> {
    let file_stem = input_path.file_stem().ok_or_else(|| {
        ReencodeError::NoImageFilesFound(input_path.to_string_lossy().into_owned())
    })?;

    let output_filename = format!("{}.{}", file_stem.to_string_lossy(), OUTPUT_EXTENSION);
    Ok(output_dir.join(output_filename))
}

/// Pair each input with its output path.
///
/// Outputs are always `<stem>.jpg`, so `a.png` and `a.jpg` map to the same
/// file. The first input in sorted order keeps the path; later ones get an
/// `OutputCollision` error instead of overwriting it.
fn plan_outputs(image_files: &[PathBuf], output_dir: &Path) -> Vec<(PathBuf, Result<PathBuf>)> {
    let mut claimed: HashMap<PathBuf, &Path> = HashMap::new();

    image_files
        .iter()
        .map(|input| {
            let planned = generate_output_path(input, output_dir).and_then(|output| {
                match claimed.get(&output) {
                    Some(first) => Err(ReencodeError::OutputCollision {
                        input: input.clone(),
                        output,
                        first: first.to_path_buf(),
                    }),
                    None => {
                        claimed.insert(output.clone(), input);
                        Ok(output)
                    }
                }
            });
            (input.clone(), planned)
        })
        .collect()
}

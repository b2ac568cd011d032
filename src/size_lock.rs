//! Size-targeting re-encode search.
//!
//! Walks `(width, quality)` pairs until the encoded JPEG lands inside a
//! [`TargetRange`]. Undersized results grow width and nudge quality up;
//! oversized results drop quality first and only trade width once quality is
//! at the shrink threshold or the floor. Both knobs are clamped on every
//! attempt, including the first.

use crate::config::{SizeLockConfig, TargetRange};
use crate::error::{AttemptReport, ReencodeError, Result};
use crate::processing::{JpegEncode, SourceImage};
use tracing::{debug, info};

/// A candidate encoding parameter pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeAttempt {
    pub width: u32,
    pub quality: u8,
}

/// Output of one encode attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeResult {
    pub bytes: Vec<u8>,
    pub size_bytes: u64,
    pub width: u32,
    pub quality: u8,
}

impl EncodeResult {
    fn report(&self) -> AttemptReport {
        AttemptReport {
            size_bytes: self.size_bytes,
            width: self.width,
            quality: self.quality,
        }
    }
}

impl EncodeAttempt {
    fn start(config: &SizeLockConfig) -> Self {
        Self {
            width: config.start_width,
            quality: config.start_quality,
        }
        .clamped(config)
    }

    fn clamped(self, config: &SizeLockConfig) -> Self {
        Self {
            width: self.width.max(config.width_floor),
            quality: self
                .quality
                .max(config.quality_floor)
                .min(config.quality_ceiling),
        }
    }

    /// Parameters for the next attempt after encoding at `self` produced `size`.
    pub fn next(self, size: u64, target: TargetRange, config: &SizeLockConfig) -> Self {
        let Self {
            mut width,
            mut quality,
        } = self;

        if size < target.min_bytes() {
            width = width.saturating_add(config.width_step);
            quality = quality
                .saturating_add(config.quality_step_up)
                .min(config.quality_ceiling);
        } else if size > target.max_bytes() {
            // A threshold under the floor would never let width shrink
            if quality > config.quality_shrink_threshold.max(config.quality_floor) {
                quality = quality.saturating_sub(config.quality_step_down);
            } else {
                width = width.saturating_sub(config.width_step);
            }
        }

        Self { width, quality }.clamped(config)
    }
}

/// Re-encode `source` until its JPEG size lies inside `target`.
///
/// Performs at most `config.max_iterations` encodes. With zero iterations no
/// encode happens and the call fails straight away. The search also stops as
/// soon as an adjustment leaves both parameters unchanged, since the next
/// encode would reproduce the same size.
///
/// # Errors
/// * `InvalidConfig` - `config` fails [`SizeLockConfig::validate`]
/// * `SizeLockFailed` - the budget ran out (or the search stalled at its
///   clamps) before a result landed in range; carries the last attempt
/// * `Encode` - the encoder itself failed
pub fn reencode<E>(
    source: &SourceImage,
    target: TargetRange,
    config: &SizeLockConfig,
    encoder: &E,
) -> Result<EncodeResult>
where
    E: JpegEncode + ?Sized,
{
    config.validate()?;

    let mut attempt = EncodeAttempt::start(config);
    let mut last: Option<EncodeResult> = None;
    let mut attempts = 0;

    while attempts < config.max_iterations {
        let bytes = encoder.encode(source.image(), attempt.width, attempt.quality)?;
        attempts += 1;

        let result = EncodeResult {
            size_bytes: bytes.len() as u64,
            bytes,
            width: attempt.width,
            quality: attempt.quality,
        };
        debug!(
            attempt = attempts,
            width = result.width,
            quality = result.quality,
            size = result.size_bytes,
            "encoded candidate"
        );

        if target.contains(result.size_bytes) {
            last = Some(result);
            break;
        }

        let next = attempt.next(result.size_bytes, target, config);
        last = Some(result);
        if next == attempt {
            debug!(attempt = attempts, "search pinned at clamps");
            break;
        }
        attempt = next;
    }

    match last {
        Some(result) if target.contains(result.size_bytes) => {
            info!(
                attempts,
                width = result.width,
                quality = result.quality,
                size = result.size_bytes,
                "size lock converged"
            );
            Ok(result)
        }
        other => Err(ReencodeError::SizeLockFailed {
            attempts,
            last: other.as_ref().map(EncodeResult::report),
        }),
    }
}

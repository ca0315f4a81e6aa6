//! Pure width-planning functions.
//!
//! Everything here is testable without I/O or decoded images. The planner
//! turns a caller's [`SizeSpec`] into the ordered list of widths the
//! orchestrator will actually render: clamped to the source width and
//! deduplicated so a 3000px request and a 4000px request against a 2400px
//! source produce one 2400px variant, not two.

/// How the caller asks for output widths.
///
/// `Auto` is the default and yields a single variant at the source's own
/// width. `Range` interpolates `steps` widths linearly between `min` and
/// `max` inclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SizeSpec {
    /// Explicit list of target widths, rendered in the given order.
    Widths(Vec<u32>),
    /// A single target width.
    Single(u32),
    /// `steps` widths spread linearly between `min` and `max` inclusive.
    /// Fewer than two steps are treated as two (the endpoints).
    Range { min: u32, max: u32, steps: u32 },
    /// One variant at the unmodified source width.
    Auto,
}

impl Default for SizeSpec {
    fn default() -> Self {
        Self::Auto
    }
}

/// Compute the widths to render for a source image.
///
/// Each requested width is clamped to the source width, then deduplicated
/// preserving first-seen order — a later request that clamps onto an
/// already-planned width is dropped, not re-inserted. Zero-valued requests
/// are skipped. The result is never empty: an empty request list degrades
/// to a single variant at the source width.
pub fn plan_widths(source_width: u32, spec: &SizeSpec) -> Vec<u32> {
    let requested = match spec {
        SizeSpec::Widths(widths) => widths.clone(),
        SizeSpec::Single(width) => vec![*width],
        SizeSpec::Range { min, max, steps } => interpolate(*min, *max, *steps),
        SizeSpec::Auto => vec![u32::MAX],
    };

    let mut planned: Vec<u32> = Vec::with_capacity(requested.len());
    for size in requested {
        if size == 0 {
            continue;
        }
        let width = size.min(source_width);
        // Only plan widths that aren't an exact copy of one already planned
        if !planned.contains(&width) {
            planned.push(width);
        }
    }

    if planned.is_empty() {
        planned.push(source_width);
    }
    planned
}

/// Linear interpolation between `min` and `max` inclusive, rounded up to the
/// next integer at every step.
fn interpolate(min: u32, max: u32, steps: u32) -> Vec<u32> {
    let steps = steps.max(2);
    let span = max as f64 - min as f64;
    (0..steps)
        .map(|step| {
            let value = min as f64 + (span / (steps as f64 - 1.0)) * step as f64;
            value.ceil() as u32
        })
        .collect()
}

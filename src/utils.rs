//! # Utility Functions Module
//!
//! Small helpers shared by the encoder invocation and the CLI output.

use std::time::Duration;

/// Converts a vector of string-like items to Vec<String>.
///
/// # Example
/// ```rust
/// use space_media_compressor::utils::to_string_vec;
///
/// let args = to_string_vec(["-hide_banner", "-i", "input.mov"]);
/// assert_eq!(args.len(), 3);
/// ```
pub fn to_string_vec<T, I>(items: I) -> Vec<String>
where
    T: ToString,
    I: IntoIterator<Item = T>,
{
    items.into_iter().map(|item| item.to_string()).collect()
}

/// Macro for building argument vectors from mixed values.
///
/// # Example
/// ```rust
/// use space_media_compressor::args;
///
/// let crf = 26;
/// let args = args!["-crf", crf, "-y"];
/// assert_eq!(args, vec!["-crf", "26", "-y"]);
/// ```
#[macro_export]
macro_rules! args {
    [$($item:expr),* $(,)?] => {
        $crate::utils::to_string_vec([$($item.to_string()),*])
    };
}

/// Splits a preset parameter string into individual arguments
pub fn split_parameters(parameters: &str) -> Vec<String> {
    to_string_vec(parameters.split_whitespace())
}

/// Human readable elapsed time: `ms` below a second, then `sec`, `min` and `h`,
/// rounded to two decimals.
pub fn format_duration(elapsed: Duration) -> String {
    let ms = elapsed.as_secs_f64() * 1000.0;
    let round = |v: f64| (v * 100.0).round() / 100.0;

    if ms < 1000.0 {
        format!("{}ms", round(ms))
    } else if ms < 1000.0 * 60.0 {
        format!("{}sec", round(ms / 1000.0))
    } else if ms < 1000.0 * 60.0 * 60.0 {
        format!("{}min", round(ms / 1000.0 / 60.0))
    } else {
        format!("{}h", round(ms / 1000.0 / 60.0 / 60.0))
    }
}

//! Maps `Box<dyn Error>` from trait boundaries to typed `PourError`.
//!
//! The traits in `pourer_traits` use `Box<dyn Error + Send + Sync>` so any
//! backend can plug in; this module converts those to our typed error enum,
//! with an optional feature-gated path for `pourer_hardware::HwError`.

use crate::error::PourError;

/// Map a trait-boundary error to a typed `PourError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to string-based heuristics.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> PourError {
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<pourer_hardware::error::HwError>() {
            return match hw {
                pourer_hardware::error::HwError::Timeout => PourError::Timeout,
                other => PourError::Hardware(other.to_string()),
            };
        }
    }

    let s = e.to_string();
    if s.to_lowercase().contains("timeout") {
        PourError::Timeout
    } else {
        PourError::Hardware(s)
    }
}

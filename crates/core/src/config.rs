/// Default absolute tolerance for `equals` comparisons.
pub const DEFAULT_EQUALITY_TOL: f64 = 1e-9;

/// Default magnitude at or below which a pivot counts as zero.
pub const DEFAULT_PIVOT_TOL: f64 = 1e-12;

/// Numerical settings for triangular solves and determinants.
///
/// ```
/// use bayestree_core::config::SolveSettings;
///
/// let settings = SolveSettings::new().pivot_tolerance(1e-10);
/// assert_eq!(settings.pivot_tol(), 1e-10);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolveSettings {
    pivot_tol: f64,
    check_finite: bool,
}

impl SolveSettings {
    /// Create settings with the library defaults.
    pub fn new() -> Self {
        Self {
            pivot_tol: DEFAULT_PIVOT_TOL,
            check_finite: true,
        }
    }

    /// Set the pivot tolerance (default: 1e-12). Negative values are clamped to zero,
    /// so an exactly-zero pivot is always rejected.
    pub fn pivot_tolerance(mut self, tol: f64) -> Self {
        self.pivot_tol = tol.max(0.0);
        self
    }

    /// Whether to reject solutions containing NaN or infinite entries (default: true).
    pub fn check_finite(mut self, check: bool) -> Self {
        self.check_finite = check;
        self
    }

    pub fn pivot_tol(&self) -> f64 {
        self.pivot_tol
    }

    pub fn checks_finite(&self) -> bool {
        self.check_finite
    }
}

impl Default for SolveSettings {
    fn default() -> Self {
        Self::new()
    }
}

//! Numerical tolerances and collision defaults.

/// Squared distance below which two primitives are considered touching
/// at a coplanarity instant.
pub const DEFAULT_TOUCH_DISTANCE_SQ: f64 = 1.0e-12;

/// Default proximity padding for static broad-phase boxes.
pub const DEFAULT_PROXIMITY_EPSILON: f64 = 1.0e-4;

/// Default padding of swept boxes used by the remeshing safety oracle.
pub const DEFAULT_EDIT_PAD: f64 = 1.0e-6;

/// Slack allowed on barycentric weights outside `[0, 1]`.
pub const DEFAULT_BARYCENTRIC_TOLERANCE: f64 = 1.0e-6;

/// Cubic coefficients smaller than this fraction of the largest one are zeroed.
pub const DEFAULT_COEFFICIENT_THRESHOLD: f64 = 1.0e-12;

/// Relative threshold below which a cross-product normal is treated as zero.
pub const DEGENERATE_NORMAL_THRESHOLD: f64 = 1.0e-12;

/// Default padding of swept boxes for continuous-time broad-phase queries.
pub const DEFAULT_CONTINUOUS_PAD: f64 = 1.0e-6;

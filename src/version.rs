// Version information for the Fabstir Vision Node

/// Full version string with feature description
pub const VERSION: &str = "v0.1.0-object-detection-2026-08-06";

/// Semantic version number
pub const VERSION_NUMBER: &str = "0.1.0";

/// Build date
pub const BUILD_DATE: &str = "2026-08-06";

/// Supported features in this version
pub const FEATURES: &[&str] = &[
    "object-detection",
    "faster-rcnn",
    "coco-labels",
    "annotated-rendering",
    "detection-statistics",
    "background-cleanup",
];

/// Get formatted version string for logging
pub fn get_version_string() -> String {
    format!("Fabstir Vision Node {} ({})", VERSION_NUMBER, BUILD_DATE)
}

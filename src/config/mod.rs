// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Node configuration
//!
//! All settings are environment-driven with sensible defaults; the binary
//! layers CLI flags on top for the common overrides.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// HTTP listener settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Detection model settings.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Path to the exported ONNX detection model
    pub model_path: PathBuf,
    /// ONNX Runtime intra-op thread count
    pub intra_threads: usize,
    /// Hard bound on a single inference call
    pub inference_timeout: Duration,
    /// Threshold applied when the request does not carry one
    pub default_confidence_threshold: f32,
}

/// Upload and result directory settings.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub upload_dir: PathBuf,
    pub results_dir: PathBuf,
    /// Files older than this are removed by the sweeper
    pub max_file_age: Duration,
    /// Sweeper wake-up interval
    pub sweep_interval: Duration,
}

/// Request validation limits.
#[derive(Debug, Clone)]
pub struct UploadLimits {
    /// Maximum accepted upload size in bytes
    pub max_file_size: usize,
    /// Allowed file extensions, lowercase
    pub allowed_extensions: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub server: ServerConfig,
    pub detector: DetectorConfig,
    pub storage: StorageConfig,
    pub limits: UploadLimits,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            detector: DetectorConfig {
                model_path: PathBuf::from("./models/fasterrcnn_resnet50_fpn.onnx"),
                intra_threads: 4,
                inference_timeout: Duration::from_secs(30),
                default_confidence_threshold: 0.5,
            },
            storage: StorageConfig {
                upload_dir: PathBuf::from("uploads"),
                results_dir: PathBuf::from("results"),
                max_file_age: Duration::from_secs(3600),
                sweep_interval: Duration::from_secs(300),
            },
            limits: UploadLimits {
                max_file_size: 10 * 1024 * 1024, // 10MB
                allowed_extensions: vec![
                    "png".to_string(),
                    "jpg".to_string(),
                    "jpeg".to_string(),
                    "webp".to_string(),
                ],
            },
        }
    }
}

impl NodeConfig {
    /// Build the configuration from environment variables, falling back to
    /// defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            server: ServerConfig {
                host: env_or("API_HOST", defaults.server.host),
                port: env_parse("API_PORT", defaults.server.port),
            },
            detector: DetectorConfig {
                model_path: env::var("MODEL_PATH")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.detector.model_path),
                intra_threads: env_parse("ORT_INTRA_THREADS", defaults.detector.intra_threads),
                inference_timeout: Duration::from_secs(env_parse(
                    "INFERENCE_TIMEOUT_SECS",
                    defaults.detector.inference_timeout.as_secs(),
                )),
                default_confidence_threshold: env_parse(
                    "DEFAULT_CONFIDENCE_THRESHOLD",
                    defaults.detector.default_confidence_threshold,
                ),
            },
            storage: StorageConfig {
                upload_dir: env::var("UPLOAD_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.storage.upload_dir),
                results_dir: env::var("RESULTS_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.storage.results_dir),
                max_file_age: Duration::from_secs(env_parse(
                    "FILE_MAX_AGE_SECS",
                    defaults.storage.max_file_age.as_secs(),
                )),
                sweep_interval: Duration::from_secs(env_parse(
                    "SWEEP_INTERVAL_SECS",
                    defaults.storage.sweep_interval.as_secs(),
                )),
            },
            limits: UploadLimits {
                max_file_size: env_parse("MAX_FILE_SIZE", defaults.limits.max_file_size),
                allowed_extensions: defaults.limits.allowed_extensions,
            },
        }
    }
}

fn env_or(key: &str, default: String) -> String {
    env::var(key).unwrap_or(default)
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

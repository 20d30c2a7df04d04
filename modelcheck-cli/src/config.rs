//! Configuration loading from modelcheck.toml
//!
//! modelcheck configuration can be specified in a `modelcheck.toml` file in the project root.
//! The configuration is automatically discovered by walking up from the current directory.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name searched for by [`ModelCheckConfig::discover`]
pub const CONFIG_FILE_NAME: &str = "modelcheck.toml";

/// modelcheck configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelCheckConfig {
    /// Process-wide comparison defaults
    #[serde(default)]
    pub compare: CompareConfig,
    /// Artifact locations
    #[serde(default)]
    pub paths: PathsConfig,
    /// In-process host reference
    #[serde(default)]
    pub host: HostConfig,
    /// Accelerator benchmark tool
    #[serde(default)]
    pub accelerator: AcceleratorConfig,
    /// Device bridge
    #[serde(default)]
    pub device: DeviceConfig,
    /// Output configuration
    #[serde(default)]
    pub output: OutputConfig,
}

impl Default for ModelCheckConfig {
    fn default() -> Self {
        Self {
            compare: CompareConfig::default(),
            paths: PathsConfig::default(),
            host: HostConfig::default(),
            accelerator: AcceleratorConfig::default(),
            device: DeviceConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

/// Comparison defaults applied when a recipe does not override them
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareConfig {
    #[serde(default = "default_tolerance")]
    pub rtol: f64,
    #[serde(default = "default_tolerance")]
    pub atol: f64,
    /// Target run + compare rounds per recipe
    #[serde(default = "default_iteration")]
    pub iteration: u32,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            rtol: default_tolerance(),
            atol: default_tolerance(),
            iteration: default_iteration(),
        }
    }
}

fn default_tolerance() -> f64 {
    1e-5
}
fn default_iteration() -> u32 {
    1
}

/// Artifact locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory holding the compiled model files. A relative path in a
    /// configuration file is resolved against that file's directory.
    #[serde(default = "default_models_dir")]
    pub models_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            models_dir: default_models_dir(),
        }
    }
}

/// `models/` next to the running executable
fn default_models_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("models")))
        .unwrap_or_else(|| PathBuf::from("models"))
}

/// In-process reference interpreter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostConfig {
    /// Run the interpreter's graph optimizer before executing
    #[serde(default = "default_optimize")]
    pub optimize: bool,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            optimize: default_optimize(),
        }
    }
}

fn default_optimize() -> bool {
    true
}

/// Benchmark tool run on this machine for the `reference-accelerator` target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcceleratorConfig {
    /// Program and leading arguments
    #[serde(default = "default_benchmark_command")]
    pub command: Vec<String>,
    /// Extra flags passed on every run
    #[serde(default = "default_accelerator_flags")]
    pub flags: Vec<String>,
}

impl Default for AcceleratorConfig {
    fn default() -> Self {
        Self {
            command: default_benchmark_command(),
            flags: default_accelerator_flags(),
        }
    }
}

fn default_benchmark_command() -> Vec<String> {
    vec!["benchmark_model".to_string()]
}

fn default_accelerator_flags() -> Vec<String> {
    vec!["--use_npu=true".to_string()]
}

/// Device bridge configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Program and leading arguments used to reach the bridge
    #[serde(default = "default_adb")]
    pub adb: Vec<String>,
    /// Staging directory on the device
    #[serde(default = "default_remote_root")]
    pub remote_root: String,
    /// Benchmark executable, relative to `remote_root` unless absolute
    #[serde(default = "default_remote_benchmark")]
    pub benchmark: String,
    /// Extra flags passed to the remote benchmark
    #[serde(default)]
    pub flags: Vec<String>,
    /// Environment variable holding a device serial override
    #[serde(default = "default_serial_env")]
    pub serial_env: String,
    /// Restart the bridge daemon as root before the first run
    #[serde(default)]
    pub adb_root: bool,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            adb: default_adb(),
            remote_root: default_remote_root(),
            benchmark: default_remote_benchmark(),
            flags: Vec::new(),
            serial_env: default_serial_env(),
            adb_root: false,
        }
    }
}

fn default_adb() -> Vec<String> {
    vec!["adb".to_string()]
}
fn default_remote_root() -> String {
    "/data/local/tmp".to_string()
}
fn default_remote_benchmark() -> String {
    "benchmark_model".to_string()
}
fn default_serial_env() -> String {
    "ANDROID_SERIAL".to_string()
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Default output format: "human" or "json"
    #[serde(default = "default_format")]
    pub format: String,
    /// Output directory for reports
    #[serde(default = "default_output_dir")]
    pub directory: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            directory: default_output_dir(),
        }
    }
}

fn default_format() -> String {
    "human".to_string()
}
fn default_output_dir() -> String {
    "target/modelcheck".to_string()
}

impl ModelCheckConfig {
    /// Load configuration from a TOML file.
    ///
    /// Relative paths in the file are resolved against the file's directory.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        Ok(config)
    }

    fn resolve_paths(&mut self, base: &Path) {
        if self.paths.models_dir.is_relative() {
            self.paths.models_dir = base.join(&self.paths.models_dir);
        }
    }

    /// Try to discover and load configuration by walking up from current directory
    pub fn discover() -> Option<Self> {
        let dir = std::env::current_dir().ok()?;
        Self::discover_from(&dir)
    }

    /// Walk up from `start` looking for a configuration file
    pub fn discover_from(start: &Path) -> Option<Self> {
        let mut dir = start.to_path_buf();
        loop {
            let config_path = dir.join(CONFIG_FILE_NAME);
            if config_path.exists() {
                return match Self::load(&config_path) {
                    Ok(config) => Some(config),
                    Err(e) => {
                        tracing::warn!("Ignoring {}: {}", config_path.display(), e);
                        None
                    }
                };
            }
            if !dir.pop() {
                break;
            }
        }
        None
    }

    /// Generate a default configuration as TOML string
    pub fn default_toml() -> String {
        r#"# modelcheck Configuration

[compare]
# Strict policy: |target - host| <= atol + rtol * |host|
rtol = 1e-5
atol = 1e-5
# Target run + compare rounds per recipe
iteration = 1

[paths]
# Directory holding the compiled .tflite models, relative to this file.
# Without this key, `models/` next to the modelcheck executable is used.
models_dir = "models"

[host]
# In-process reference interpreter: optimize the graph before running
optimize = true

[accelerator]
# Benchmark tool (program and leading arguments)
command = ["benchmark_model"]
# Replaces the default flags when set
flags = ["--use_npu=true"]

[device]
adb = ["adb"]
# Staging directory on the device
remote_root = "/data/local/tmp"
# Benchmark executable, relative to remote_root
benchmark = "benchmark_model"
flags = []
# Environment variable selecting one of several attached devices
serial_env = "ANDROID_SERIAL"
# Run `adb root` before the first run
adb_root = false

[output]
# Default output format: human, json
format = "human"
# Output directory for reports
directory = "target/modelcheck"
"#
        .to_string()
    }
}

//! Loader for gridproof configuration with YAML + environment overlays.
//!
//! Sources are merged in this order, later ones winning:
//!
//! 1. built-in defaults (every field has one),
//! 2. the user-level file `<config_dir>/gridproof/gridproof.yaml` if requested,
//! 3. explicit files and inline YAML snippets, in the order they were added,
//! 4. `GRIDPROOF__`-prefixed environment variables (`__` separates nesting,
//!    e.g. `GRIDPROOF__TIMEOUTS__ELEMENT_MS=2000`).
//!
//! String values may reference environment variables as `$VAR` or `${VAR}`;
//! references are expanded recursively up to a fixed depth.
use config::{Config, ConfigError, Environment, File, FileFormat};
use gridproof_common::observability::{LogConfig, LogFormat};
use gridproof_common::wait::WaitConfig;
use gridproof_common::{BrowserKind, GridproofError};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "GRIDPROOF";
/// File name looked up in the working directory and the user config dir.
pub const DEFAULT_CONFIG_FILE: &str = "gridproof.yaml";
/// Where the screenshot lands unless configured otherwise.
pub const DEFAULT_OUTPUT: &str = "verification/verification.png";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GridproofConfig {
    #[serde(deserialize_with = "scalar_as_string")]
    pub version: Option<String>,
    /// Entry document of the application under test (path or URL).
    #[serde(deserialize_with = "scalar_as_string")]
    pub target: Option<String>,
    /// Screenshot destination; overwritten on every successful run.
    pub output: PathBuf,
    pub webdriver: WebDriverConfig,
    pub timeouts: TimeoutConfig,
    pub flow: FlowConfig,
    pub logging: LoggingConfig,
}

impl Default for GridproofConfig {
    fn default() -> Self {
        Self {
            version: None,
            target: None,
            output: PathBuf::from(DEFAULT_OUTPUT),
            webdriver: WebDriverConfig::default(),
            timeouts: TimeoutConfig::default(),
            flow: FlowConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl GridproofConfig {
    /// Reject values that would make a run meaningless before a browser is started.
    pub fn validate(&self) -> Result<(), GridproofError> {
        if self.output.as_os_str().is_empty() {
            return Err(GridproofError::Config("output path is empty".into()));
        }
        if self.webdriver.url.trim().is_empty() {
            return Err(GridproofError::Config("webdriver.url is empty".into()));
        }
        if self.webdriver.window.width == 0 || self.webdriver.window.height == 0 {
            return Err(GridproofError::Config(format!(
                "window size must be non-zero, got {}x{}",
                self.webdriver.window.width, self.webdriver.window.height
            )));
        }
        if self.timeouts.poll_interval_ms == 0 {
            return Err(GridproofError::Config(
                "timeouts.poll_interval_ms must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebDriverConfig {
    /// Endpoint of a running chromedriver/geckodriver.
    pub url: String,
    pub browser: BrowserKind,
    pub headless: bool,
    pub window: WindowSize,
    /// Extra browser command-line arguments.
    pub args: Vec<String>,
}

impl Default for WebDriverConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:9515".into(),
            browser: BrowserKind::Chrome,
            headless: true,
            window: WindowSize::default(),
            args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowSize {
    pub width: u32,
    pub height: u32,
}

impl Default for WindowSize {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 900,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upper bound for discovering each interactive element.
    pub element_ms: u64,
    /// Upper bound for post-conditions such as the board being populated.
    pub condition_ms: u64,
    pub poll_interval_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            element_ms: 5_000,
            condition_ms: 5_000,
            poll_interval_ms: 100,
        }
    }
}

impl TimeoutConfig {
    pub fn element_wait(&self) -> WaitConfig {
        WaitConfig::new(
            Duration::from_millis(self.element_ms),
            Duration::from_millis(self.poll_interval_ms),
        )
    }

    pub fn condition_wait(&self) -> WaitConfig {
        WaitConfig::new(
            Duration::from_millis(self.condition_ms),
            Duration::from_millis(self.poll_interval_ms),
        )
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    /// Custom step plan; the built-in new-puzzle journey is used when absent.
    pub steps: Option<Vec<StepSpec>>,
}

/// One step of a configured plan. The tag is `action`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum StepSpec {
    Navigate {
        #[serde(default)]
        id: Option<String>,
    },
    Click {
        #[serde(default)]
        id: Option<String>,
        target: TargetSpec,
    },
    Select {
        #[serde(default)]
        id: Option<String>,
        target: TargetSpec,
        option: String,
    },
    WaitForValue {
        #[serde(default)]
        id: Option<String>,
        target: TargetSpec,
    },
    Screenshot {
        #[serde(default)]
        id: Option<String>,
    },
}

/// How a step addresses an element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TargetSpec {
    Role { role: String, name: String },
    Label { label: String },
    Css { css: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: Option<PathBuf>,
    pub format: LogFormat,
    pub stderr: bool,
    /// Filter used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: None,
            format: LogFormat::Text,
            stderr: false,
            filter: "info".into(),
        }
    }
}

impl LoggingConfig {
    pub fn to_log_config(&self) -> LogConfig {
        LogConfig {
            log_dir: self.dir.clone(),
            emit_stderr: self.stderr,
            format: self.format,
            default_filter: self.filter.clone(),
            ..LogConfig::default()
        }
    }
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hides the `config` crate wiring (YAML + env overrides).
pub struct GridproofConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for GridproofConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl GridproofConfigLoader {
    /// Start from built-in defaults; `GRIDPROOF__` env overrides are applied at [`load`](Self::load).
    ///
    /// ```
    /// use gridproof_config::GridproofConfigLoader;
    ///
    /// let config = GridproofConfigLoader::new()
    ///     .with_yaml_str("version: '1'\noutput: shots/run.png")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.version.as_deref(), Some("1"));
    /// assert_eq!(config.output, std::path::PathBuf::from("shots/run.png"));
    /// assert_eq!(config.timeouts.element_ms, 5_000);
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
        }
    }

    /// Attach a YAML/TOML/JSON file that must exist; format is inferred by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that is silently skipped when missing.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Merge `<config_dir>/gridproof/gridproof.yaml` if it exists.
    pub fn with_user_defaults(self) -> Self {
        match user_config_path() {
            Some(path) => self.with_optional_file(path),
            None => self,
        }
    }

    /// Allow tests/CLI to merge inline YAML snippets.
    ///
    /// ```
    /// use gridproof_config::{GridproofConfigLoader, StepSpec, TargetSpec};
    ///
    /// let cfg = GridproofConfigLoader::new()
    ///     .with_yaml_str(
    ///         r#"
    /// flow:
    ///   steps:
    ///     - action: navigate
    ///     - action: click
    ///       id: open
    ///       target: { role: button, name: "New Game" }
    /// "#,
    ///     )
    ///     .load()
    ///     .unwrap();
    ///
    /// let steps = cfg.flow.steps.unwrap();
    /// assert_eq!(steps.len(), 2);
    /// assert_eq!(
    ///     steps[1],
    ///     StepSpec::Click {
    ///         id: Some("open".into()),
    ///         target: TargetSpec::Role { role: "button".into(), name: "New Game".into() },
    ///     }
    /// );
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self.builder.add_source(File::from_str(yaml, FileFormat::Yaml));
        self
    }

    /// Consume the builder and deserialize the merged sources into strongly typed config.
    pub fn load(self) -> Result<GridproofConfig, ConfigError> {
        let cfg = self
            .builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        let typed: GridproofConfig =
            serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))?;

        typed
            .validate()
            .map_err(|e| ConfigError::Message(e.to_string()))?;
        Ok(typed)
    }
}

/// Unquoted YAML scalars and parsed env values arrive as numbers or booleans.
fn scalar_as_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(other) => Err(D::Error::custom(format!("expected a string, found {other}"))),
    }
}

/// Location of the user-level config file, if the platform has a config dir.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("gridproof").join(DEFAULT_CONFIG_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn expands_simple_string() {
        temp_env::with_var("GP_FOO", Some("bar"), || {
            let mut v = json!("prefix-${GP_FOO}-suffix");
            expand_env_in_value(&mut v);
            assert_eq!(v, json!("prefix-bar-suffix"));
        });
    }

    #[test]
    fn expands_in_array_and_object() {
        temp_env::with_vars(
            [("GP_HOST", Some("localhost")), ("GP_PORT", Some("4444"))],
            || {
                let mut v = json!([
                    "http://$GP_HOST",
                    { "url": "http://${GP_HOST}:${GP_PORT}" },
                    42,
                    true,
                    null
                ]);
                expand_env_in_value(&mut v);
                assert_eq!(
                    v,
                    json!([
                        "http://localhost",
                        { "url": "http://localhost:4444" },
                        42,
                        true,
                        null
                    ])
                );
            },
        );
    }

    #[test]
    fn expands_recursively_across_env_values() {
        temp_env::with_vars(
            [
                ("GP_BAZ", Some("qux")),
                ("GP_BAR", Some("mid-${GP_BAZ}")),
                ("GP_TOP", Some("start-${GP_BAR}-end")),
            ],
            || {
                let mut v = json!("X=${GP_TOP}");
                expand_env_in_value(&mut v);
                assert_eq!(v, json!("X=start-mid-qux-end"));
            },
        );
    }

    #[test]
    fn stops_on_cycles() {
        temp_env::with_vars([("GP_A", Some("${GP_B}")), ("GP_B", Some("${GP_A}"))], || {
            let mut v = json!("x=${GP_A}-y");
            expand_env_in_value(&mut v);
            let s = v.as_str().unwrap();
            assert!(s.starts_with("x=") && s.ends_with("-y"));
            assert!(s.contains("${"));
        });
    }

    #[test]
    fn unknown_vars_are_left_as_is() {
        let mut v = json!("hi-${GP_DOES_NOT_EXIST}");
        expand_env_in_value(&mut v);
        assert_eq!(v, json!("hi-${GP_DOES_NOT_EXIST}"));
    }

    #[test]
    fn defaults_validate() {
        assert!(GridproofConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let mut cfg = GridproofConfig::default();
        cfg.timeouts.poll_interval_ms = 0;
        assert!(matches!(cfg.validate(), Err(GridproofError::Config(_))));
    }

    #[test]
    fn timeouts_convert_to_wait_configs() {
        let t = TimeoutConfig {
            element_ms: 250,
            condition_ms: 9_000,
            poll_interval_ms: 20,
        };
        assert_eq!(t.element_wait().timeout, Duration::from_millis(250));
        assert_eq!(t.condition_wait().timeout, Duration::from_millis(9_000));
        assert_eq!(t.condition_wait().interval, Duration::from_millis(20));
    }

    #[test]
    fn logging_section_maps_to_log_config() {
        let logging = LoggingConfig {
            dir: Some(PathBuf::from("/tmp/gp")),
            format: LogFormat::Json,
            stderr: true,
            filter: "debug".into(),
        };
        let lc = logging.to_log_config();
        assert_eq!(lc.app_name, "gridproof");
        assert_eq!(lc.format, LogFormat::Json);
        assert!(lc.emit_stderr);
        assert_eq!(lc.default_filter, "debug");
    }
}

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub network: NetworkConfig,
    pub timing: TimingConfig,
    pub buzzer: BuzzerConfig,
    pub executor: ExecutorConfig,
    pub serve: ServeConfig,
}

impl Config {
    /// Load configuration from the default path, creating it if missing
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from `path`, writing defaults there if it does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            let config: Config = toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config {}", path.display()))?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    /// Save configuration to `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Get config file path
    pub fn config_path() -> Result<PathBuf> {
        let home = std::env::var("HOME")?;
        Ok(PathBuf::from(home).join(".config/blinken-deck/config.toml"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Base address of the package catalog (no trailing slash needed)
    pub base_url: String,
    /// Transport-level timeout for a single request
    pub timeout_secs: u64,
    /// Largest response body accepted from the catalog
    pub max_package_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://192.168.1.100:8000".to_string(),
            timeout_secs: 30,
            max_package_bytes: 256 * 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding one file per installed package
    pub software_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        Self {
            software_dir: PathBuf::from(home).join(".blinken-deck/software"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub ssid: String,
    pub password: String,
}

/// Every bounded pause the device makes, in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub tick: u64,
    pub menu_poll: u64,
    pub arming_hold: u64,
    pub capture_window: u64,
    pub beep: u64,
    pub pin_debounce: u64,
    pub menu_settle: u64,
    pub post_gesture: u64,
    pub status_dwell: u64,
    pub link_notice: u64,
    pub exec_error_dwell: u64,
    pub splash: u64,
    pub input_settle: u64,
    pub input_debounce: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            tick: 50,
            menu_poll: 100,
            arming_hold: 3000,
            capture_window: 5000,
            beep: 100,
            pin_debounce: 300,
            menu_settle: 200,
            post_gesture: 500,
            status_dwell: 2000,
            link_notice: 1000,
            exec_error_dwell: 3000,
            splash: 2000,
            input_settle: 20,
            input_debounce: 200,
        }
    }
}

/// Named waits. Every blocking pause in the control loop is one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delay {
    /// Idle pause at the end of an ambient/arming/capture tick
    Tick,
    /// Idle pause at the end of a menu tick
    MenuPoll,
    /// Length of the confirmation tone
    Beep,
    /// Lockout after an accepted PIN button
    PinDebounce,
    /// Settle after a menu navigation or terminal action
    MenuSettle,
    /// Pause after a gesture flow ends, before ambient resumes
    PostGesture,
    /// Dwell on a status or error screen
    StatusDwell,
    /// Dwell on the "already connected" notice
    LinkNotice,
    /// Dwell on an execution error
    ExecErrorDwell,
    /// Boot splash
    Splash,
}

impl TimingConfig {
    pub fn delay(&self, delay: Delay) -> Duration {
        let ms = match delay {
            Delay::Tick => self.tick,
            Delay::MenuPoll => self.menu_poll,
            Delay::Beep => self.beep,
            Delay::PinDebounce => self.pin_debounce,
            Delay::MenuSettle => self.menu_settle,
            Delay::PostGesture => self.post_gesture,
            Delay::StatusDwell => self.status_dwell,
            Delay::LinkNotice => self.link_notice,
            Delay::ExecErrorDwell => self.exec_error_dwell,
            Delay::Splash => self.splash,
        };
        Duration::from_millis(ms)
    }

    pub fn arming_hold(&self) -> Duration {
        Duration::from_millis(self.arming_hold)
    }

    pub fn capture_window(&self) -> Duration {
        Duration::from_millis(self.capture_window)
    }

    pub fn input_settle(&self) -> Duration {
        Duration::from_millis(self.input_settle)
    }

    pub fn input_debounce(&self) -> Duration {
        Duration::from_millis(self.input_debounce)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuzzerConfig {
    pub frequency_hz: u32,
    /// PWM duty cycle out of u16::MAX
    pub duty: u16,
}

impl Default for BuzzerConfig {
    fn default() -> Self {
        Self {
            frequency_hz: 1000,
            duty: 32768,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Commands a package may execute before it is stopped
    pub max_steps: u64,
    /// Total time a package may spend in `wait`/`await`
    pub max_wait_ms: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_steps: 100_000,
            max_wait_ms: 60_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServeConfig {
    /// Address the companion catalog server binds to
    pub bind: String,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [server]
            base_url = "http://10.0.0.2:9000"

            [timing]
            arming_hold = 1500
            "#,
        )
        .unwrap();

        assert_eq!(config.server.base_url, "http://10.0.0.2:9000");
        assert_eq!(config.server.timeout_secs, 30);
        assert_eq!(config.timing.arming_hold(), Duration::from_millis(1500));
        assert_eq!(config.timing.capture_window(), Duration::from_secs(5));
        assert_eq!(config.buzzer.frequency_hz, 1000);
    }

    #[test]
    fn test_named_delays() {
        let timing = TimingConfig::default();
        assert_eq!(timing.delay(Delay::PinDebounce), Duration::from_millis(300));
        assert_eq!(timing.delay(Delay::ExecErrorDwell), Duration::from_secs(3));
        assert_eq!(timing.delay(Delay::Tick), Duration::from_millis(50));
    }

    #[test]
    fn test_load_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/config.toml");

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.executor.max_steps, 100_000);

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.serve.bind, "127.0.0.1:8000");
    }
}

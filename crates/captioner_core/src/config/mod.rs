//! Service configuration, stored as one TOML file with a table per
//! concern (`[paths]`, `[engine]`, `[layout]`, ...). Missing keys take
//! their defaults and unknown tables are dropped on load.
//!
//! # Example
//!
//! ```no_run
//! use captioner_core::config::{ConfigManager, ConfigSection};
//!
//! let mut config = ConfigManager::new(".config/captioner.toml");
//! config.load_or_create().unwrap();
//!
//! println!("Output folder: {}", config.settings().paths.output_folder);
//!
//! config.settings_mut().audio.music_gain_db = -1.5;
//! config.update_section(ConfigSection::Audio).unwrap();
//! ```

mod manager;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{
    AudioSettings, ConfigSection, DownloadSettings, EngineSettings, JobSettings, LayoutSettings,
    LoggingSettings, OverlaySettings, PathSettings, Settings,
};

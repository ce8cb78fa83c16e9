//! Configuration management using the prefer crate.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::codes::DEFAULT_PRIMARY_SHEET;
use crate::models::AcademicYear;

/// Academic year reported by the NAAC rollup when none is configured.
pub const DEFAULT_NAAC_YEAR: AcademicYear = AcademicYear { start: 2022 };

/// Frontend origin allowed by default.
pub const DEFAULT_CORS_ORIGIN: &str = "https://localhost:3000";

/// Application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base data directory (database, workbook, exports).
    pub data_dir: PathBuf,
    /// Database filename.
    pub database_filename: String,
    /// Classification workbook.
    pub workbook_path: PathBuf,
    /// Title of the governing sheet in the workbook.
    pub primary_sheet: String,
    /// Drive id of the classification spreadsheet.
    pub sheet_id: Option<String>,
    /// Names of the Drive folders to scan.
    pub folders: Vec<String>,
    /// Academic year used by the NAAC rollup.
    pub naac_year: AcademicYear,
    /// OAuth token file in authorized-user format.
    pub token_file: PathBuf,
    /// Address the API server binds to.
    pub bind: SocketAddr,
    /// Origins allowed to call the API from a browser.
    pub cors_origins: Vec<String>,
    /// User agent for HTTP requests.
    pub user_agent: String,
    /// Request timeout in seconds.
    pub request_timeout: u64,
    /// Delay between Drive requests in milliseconds.
    pub request_delay_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        // Falls back gracefully: data dir -> home dir -> current dir
        let data_dir = dirs::data_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("naac-drive");

        Self {
            workbook_path: data_dir.join("doc_classification.xlsx"),
            token_file: data_dir.join("token.json"),
            data_dir,
            database_filename: "naac.db".to_string(),
            primary_sheet: DEFAULT_PRIMARY_SHEET.to_string(),
            sheet_id: None,
            folders: Vec::new(),
            naac_year: DEFAULT_NAAC_YEAR,
            bind: SocketAddr::from(([127, 0, 0, 1], 8000)),
            cors_origins: vec![DEFAULT_CORS_ORIGIN.to_string()],
            user_agent: "naac-drive/0.3".to_string(),
            request_timeout: 30,
            request_delay_ms: 100,
        }
    }
}

impl Settings {
    /// Create settings with a custom data directory.
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            workbook_path: data_dir.join("doc_classification.xlsx"),
            token_file: data_dir.join("token.json"),
            data_dir,
            ..Default::default()
        }
    }

    /// Get the full path to the database.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_filename)
    }

    pub fn database_exists(&self) -> bool {
        self.database_path().exists()
    }

    /// Ensure the data directory exists.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.data_dir)
    }
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Target directory for data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// Database filename.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    /// Classification workbook path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workbook: Option<String>,
    /// Governing sheet title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_sheet: Option<String>,
    /// Drive id of the classification spreadsheet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sheet_id: Option<String>,
    /// Folder names to scan.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub folders: Vec<String>,
    /// NAAC rollup year label, e.g. "2022-2023".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub naac_year: Option<String>,
    /// OAuth token file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_file: Option<String>,
    /// Server bind address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind: Option<String>,
    /// Allowed CORS origins.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cors_origins: Vec<String>,
    /// User agent string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// Request timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<u64>,
    /// Delay between Drive requests in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_delay_ms: Option<u64>,

    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration using prefer crate.
    /// Automatically discovers naac-drive config files in standard locations.
    pub async fn load() -> Self {
        match prefer::load("naac-drive").await {
            Ok(pref_config) => {
                let target: Option<String> = pref_config.get("target").ok();
                let database: Option<String> = pref_config.get("database").ok();
                let workbook: Option<String> = pref_config.get("workbook").ok();
                let primary_sheet: Option<String> = pref_config.get("primary_sheet").ok();
                let sheet_id: Option<String> = pref_config.get("sheet_id").ok();
                let folders: Vec<String> = pref_config.get("folders").unwrap_or_default();
                let naac_year: Option<String> = pref_config.get("naac_year").ok();
                let token_file: Option<String> = pref_config.get("token_file").ok();
                let bind: Option<String> = pref_config.get("bind").ok();
                let cors_origins: Vec<String> =
                    pref_config.get("cors_origins").unwrap_or_default();
                let user_agent: Option<String> = pref_config.get("user_agent").ok();
                let request_timeout: Option<u64> = pref_config.get("request_timeout").ok();
                let request_delay_ms: Option<u64> =
                    pref_config.get("request_delay_ms").ok();

                let source_path = pref_config.source_path().cloned();

                Config {
                    target,
                    database,
                    workbook,
                    primary_sheet,
                    sheet_id,
                    folders,
                    naac_year,
                    token_file,
                    bind,
                    cors_origins,
                    user_agent,
                    request_timeout,
                    request_delay_ms,
                    source_path,
                }
            }
            Err(_) => {
                // No config file found, use defaults
                Self::default()
            }
        }
    }

    /// Load configuration from a specific JSON or TOML file.
    pub async fn load_from_path(path: &Path) -> Result<Self, String> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        let mut config = Self::parse(path, &contents)?;
        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    fn parse(path: &Path, contents: &str) -> Result<Self, String> {
        let is_toml = path
            .extension()
            .map(|e| e.eq_ignore_ascii_case("toml"))
            .unwrap_or(false);
        if is_toml {
            toml::from_str(contents).map_err(|e| format!("Failed to parse config file: {}", e))
        } else {
            serde_json::from_str(contents)
                .map_err(|e| format!("Failed to parse config file: {}", e))
        }
    }

    /// Get the base directory for resolving relative paths.
    /// Returns the config file's parent directory if available, otherwise None.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Resolve a path that may be relative to the config file.
    /// - Absolute paths are returned as-is
    /// - Paths starting with ~ are expanded
    /// - Relative paths are resolved relative to `base_dir` (config file location or CWD)
    pub fn resolve_path(&self, path_str: &str, base_dir: &Path) -> PathBuf {
        let expanded = shellexpand::tilde(path_str);
        let path = Path::new(expanded.as_ref());

        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }

    /// Apply configuration to settings.
    /// `base_dir` is used to resolve relative paths (typically config file dir or CWD).
    pub fn apply_to_settings(&self, settings: &mut Settings, base_dir: &Path) {
        if let Some(ref target) = self.target {
            let data_dir = self.resolve_path(target, base_dir);
            let defaults = Settings::with_data_dir(data_dir);
            settings.workbook_path = defaults.workbook_path;
            settings.token_file = defaults.token_file;
            settings.data_dir = defaults.data_dir;
        }
        if let Some(ref database) = self.database {
            settings.database_filename = database.clone();
        }
        if let Some(ref workbook) = self.workbook {
            settings.workbook_path = self.resolve_path(workbook, base_dir);
        }
        if let Some(ref sheet) = self.primary_sheet {
            settings.primary_sheet = sheet.clone();
        }
        if let Some(ref sheet_id) = self.sheet_id {
            settings.sheet_id = Some(sheet_id.clone());
        }
        if !self.folders.is_empty() {
            settings.folders = self.folders.clone();
        }
        if let Some(year) = self.naac_year.as_deref().and_then(|y| y.parse().ok()) {
            settings.naac_year = year;
        } else if let Some(ref year) = self.naac_year {
            tracing::warn!("Ignoring invalid naac_year '{}'", year);
        }
        if let Some(ref token_file) = self.token_file {
            settings.token_file = self.resolve_path(token_file, base_dir);
        }
        if let Some(bind) = self.bind.as_deref().and_then(|b| b.parse().ok()) {
            settings.bind = bind;
        } else if let Some(ref bind) = self.bind {
            tracing::warn!("Ignoring invalid bind address '{}'", bind);
        }
        if !self.cors_origins.is_empty() {
            settings.cors_origins = self.cors_origins.clone();
        }
        if let Some(ref user_agent) = self.user_agent {
            settings.user_agent = user_agent.clone();
        }
        if let Some(timeout) = self.request_timeout {
            settings.request_timeout = timeout;
        }
        if let Some(delay) = self.request_delay_ms {
            settings.request_delay_ms = delay;
        }
    }
}

/// Options for loading settings.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit config file path (overrides auto-discovery).
    pub config_path: Option<PathBuf>,
    /// Use CWD for relative paths instead of config file directory.
    pub use_cwd: bool,
    /// Override data directory (--data-dir flag).
    pub data_dir: Option<PathBuf>,
}

/// Load settings with explicit options.
pub async fn load_settings_with_options(options: LoadOptions) -> Settings {
    let config = match &options.config_path {
        Some(path) => match Config::load_from_path(path).await {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("{}; using defaults", e);
                Config::default()
            }
        },
        None => Config::load().await,
    };

    let mut settings = Settings::default();

    let base_dir = if options.use_cwd {
        std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
    } else {
        config.base_dir().unwrap_or_else(|| {
            std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
        })
    };

    config.apply_to_settings(&mut settings, &base_dir);

    // --data-dir override takes precedence for data locations
    if let Some(data_dir) = options.data_dir {
        let defaults = Settings::with_data_dir(data_dir);
        settings.data_dir = defaults.data_dir;
        if config.workbook.is_none() {
            settings.workbook_path = defaults.workbook_path;
        }
        if config.token_file.is_none() {
            settings.token_file = defaults.token_file;
        }
    }

    settings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_resolves_relative_paths() {
        let config = Config {
            target: Some("data".to_string()),
            workbook: Some("sheets/codes.xlsx".to_string()),
            folders: vec!["Criterion 1".to_string(), "Criterion 3".to_string()],
            naac_year: Some("2023-2024".to_string()),
            ..Default::default()
        };
        let mut settings = Settings::default();
        config.apply_to_settings(&mut settings, Path::new("/srv/naac"));

        assert_eq!(settings.data_dir, PathBuf::from("/srv/naac/data"));
        assert_eq!(settings.database_path(), PathBuf::from("/srv/naac/data/naac.db"));
        assert_eq!(settings.workbook_path, PathBuf::from("/srv/naac/sheets/codes.xlsx"));
        assert_eq!(settings.token_file, PathBuf::from("/srv/naac/data/token.json"));
        assert_eq!(settings.folders.len(), 2);
        assert_eq!(settings.naac_year, AcademicYear::new(2023));
    }

    #[test]
    fn test_invalid_values_keep_defaults() {
        let config = Config {
            naac_year: Some("next year".to_string()),
            bind: Some("not-an-address".to_string()),
            ..Default::default()
        };
        let mut settings = Settings::default();
        config.apply_to_settings(&mut settings, Path::new("/tmp"));

        assert_eq!(settings.naac_year, DEFAULT_NAAC_YEAR);
        assert_eq!(settings.bind, SocketAddr::from(([127, 0, 0, 1], 8000)));
    }

    #[test]
    fn test_parse_json_and_toml() {
        let json = Config::parse(
            Path::new("naac.json"),
            r#"{"folders": ["A"], "request_timeout": 10}"#,
        )
        .unwrap();
        assert_eq!(json.folders, vec!["A"]);
        assert_eq!(json.request_timeout, Some(10));

        let toml = Config::parse(
            Path::new("naac.toml"),
            "folders = [\"B\"]\nsheet_id = \"abc\"\n",
        )
        .unwrap();
        assert_eq!(toml.folders, vec!["B"]);
        assert_eq!(toml.sheet_id.as_deref(), Some("abc"));

        assert!(Config::parse(Path::new("naac.json"), "not json").is_err());
    }

    #[tokio::test]
    async fn test_load_settings_from_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("naac.json");
        std::fs::write(&path, r#"{"target": "store", "folders": ["Research"]}"#).unwrap();

        let settings = load_settings_with_options(LoadOptions {
            config_path: Some(path),
            ..Default::default()
        })
        .await;

        assert_eq!(settings.data_dir, dir.path().join("store"));
        assert_eq!(settings.folders, vec!["Research"]);
    }

    #[tokio::test]
    async fn test_data_dir_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("naac.json");
        std::fs::write(&path, r#"{"target": "store", "database": "custom.db"}"#).unwrap();

        let settings = load_settings_with_options(LoadOptions {
            config_path: Some(path),
            data_dir: Some(PathBuf::from("/var/lib/naac")),
            ..Default::default()
        })
        .await;

        assert_eq!(settings.database_path(), PathBuf::from("/var/lib/naac/custom.db"));
        assert_eq!(
            settings.workbook_path,
            PathBuf::from("/var/lib/naac/doc_classification.xlsx")
        );
    }
}

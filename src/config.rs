// Runtime configuration, read once from the environment (after `.env` is
// loaded). Only the values a command actually needs are required, so each
// command asks for them through the `require_*` accessors.

use std::path::PathBuf;
use std::str::FromStr;

use chrono_tz::Tz;
use thiserror::Error;

use crate::core::csv_sync::CsvSource;
use crate::core::snapshots::DEFAULT_TIME_ZONE;
use crate::infra::ai::DEFAULT_GEMINI_MODEL;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub call_source_folder_id: Option<String>,
    pub summary_root_folder_id: Option<String>,
    pub service_account_key_path: Option<String>,
    pub service_account_json: Option<String>,
    pub spreadsheet_id: Option<String>,
    pub csv_sources: Vec<CsvSource>,
    pub time_zone: Tz,
    pub data_dir: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let time_zone = match get("TIME_ZONE") {
            Some(name) => Tz::from_str(&name).map_err(|e| ConfigError::Invalid {
                name: "TIME_ZONE",
                reason: e.to_string(),
            })?,
            None => DEFAULT_TIME_ZONE,
        };

        let csv_sources = match get("CSV_SYNC_SOURCES") {
            Some(raw) => CsvSource::parse_list(&raw).map_err(|reason| ConfigError::Invalid {
                name: "CSV_SYNC_SOURCES",
                reason,
            })?,
            None => Vec::new(),
        };

        Ok(Self {
            gemini_api_key: get("GEMINI_API_KEY"),
            gemini_model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            call_source_folder_id: get("CALL_SOURCE_FOLDER_ID"),
            summary_root_folder_id: get("SUMMARY_ROOT_FOLDER_ID"),
            service_account_key_path: get("GOOGLE_SERVICE_ACCOUNT_KEY"),
            service_account_json: get("GOOGLE_SERVICE_ACCOUNT_JSON"),
            spreadsheet_id: get("SPREADSHEET_ID"),
            csv_sources,
            time_zone,
            data_dir: get("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data")),
        })
    }

    pub fn require_gemini_api_key(&self) -> Result<&str, ConfigError> {
        require(&self.gemini_api_key, "GEMINI_API_KEY")
    }

    pub fn require_call_source_folder_id(&self) -> Result<&str, ConfigError> {
        require(&self.call_source_folder_id, "CALL_SOURCE_FOLDER_ID")
    }

    pub fn require_summary_root_folder_id(&self) -> Result<&str, ConfigError> {
        require(&self.summary_root_folder_id, "SUMMARY_ROOT_FOLDER_ID")
    }

    pub fn require_spreadsheet_id(&self) -> Result<&str, ConfigError> {
        require(&self.spreadsheet_id, "SPREADSHEET_ID")
    }

    pub fn require_csv_sources(&self) -> Result<&[CsvSource], ConfigError> {
        if self.csv_sources.is_empty() {
            return Err(ConfigError::Missing("CSV_SYNC_SOURCES"));
        }
        Ok(&self.csv_sources)
    }

    pub fn has_service_account(&self) -> bool {
        self.service_account_key_path.is_some() || self.service_account_json.is_some()
    }

    pub fn properties_db_url(&self) -> String {
        format!("sqlite://{}", self.data_dir.join("properties.db").display())
    }

    pub fn triggers_path(&self) -> PathBuf {
        self.data_dir.join("triggers.json")
    }
}

fn require<'a>(value: &'a Option<String>, name: &'static str) -> Result<&'a str, ConfigError> {
    value.as_deref().ok_or(ConfigError::Missing(name))
}

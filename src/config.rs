//! Configuration management for tasktrack-bot.
//!
//! Configuration is read from environment variables:
//! - `TOKEN` - Required. Telegram bot token (`TELEGRAM_BOT_TOKEN` also accepted).
//! - `PUBLIC_URL` - Required. Public `https://` base URL; the Telegram webhook is `{PUBLIC_URL}/telegram`.
//! - `WEBHOOK_SECRET` - Optional. Secret token Telegram must echo on webhook calls.
//! - `INBOX_SECRET` - Optional. Value the `X-Secret` header must carry on `/inbox`. Unset rejects all inbox calls.
//! - `DEFAULT_CHAT_ID` - Optional. Chat used by `/inbox` when the body has none.
//! - `HOST` - Optional. Bind host. Defaults to `0.0.0.0`.
//! - `PORT` - Optional. Bind port. Defaults to `10000`.
//! - `TASK_STORE` - Optional. `memory`, `file` or `sheets`. Defaults to `sheets` when configured, else `file`.
//! - `DATA_FILE` - Optional. JSON store path. Defaults to `tasks.json`.
//! - `GSHEET_ID` - Optional. Spreadsheet id for the sheets store.
//! - `GSHEET_WORKSHEET` - Optional. Worksheet title. Defaults to `Tasks`.
//! - `GOOGLE_CREDENTIALS_JSON` / `GOOGLE_CREDENTIALS_B64` / `GOOGLE_APPLICATION_CREDENTIALS` -
//!   service account as inline JSON, base64 JSON, or a file path (first one set wins).
//! - `TZ_OFFSET` - Optional. Fixed UTC offset for timestamps, e.g. `+03:00`. Defaults to server local time.
//! - `TELEGRAM_API_URL` - Optional. Bot API base URL. Defaults to `https://api.telegram.org`.

use std::path::PathBuf;

use chrono::FixedOffset;
use thiserror::Error;

use crate::google::CredentialSource;
use crate::task_store::TaskStoreType;
use crate::telegram::DEFAULT_API_BASE_URL;

/// Path of the Telegram update endpoint under `PUBLIC_URL`.
pub const WEBHOOK_PATH: &str = "/telegram";

const DEFAULT_WORKSHEET: &str = "Tasks";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Google Sheets store settings.
#[derive(Clone)]
pub struct SheetsConfig {
    pub spreadsheet_id: String,
    pub worksheet: String,
    pub credentials: CredentialSource,
}

/// Task store selection and backend settings.
#[derive(Clone)]
pub struct StoreConfig {
    pub store_type: TaskStoreType,
    /// JSON store path
    pub data_file: PathBuf,
    /// Present when a spreadsheet id and credentials are configured
    pub sheets: Option<SheetsConfig>,
}

/// Service configuration.
#[derive(Clone)]
pub struct Config {
    /// Telegram bot token
    pub bot_token: String,

    /// Public base URL, without trailing slash
    pub public_url: String,

    /// Secret token expected in `X-Telegram-Bot-Api-Secret-Token`
    pub webhook_secret: Option<String>,

    /// Shared secret expected in `X-Secret` on the inbox endpoint
    pub inbox_secret: Option<String>,

    /// Fallback chat for inbox tasks
    pub default_chat_id: Option<i64>,

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Telegram Bot API base URL
    pub telegram_api_url: String,

    /// Fixed offset for rendered timestamps (local time when `None`)
    pub tz_offset: Option<FixedOffset>,

    /// Task store configuration
    pub store: StoreConfig,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if `TOKEN` or `PUBLIC_URL` is not
    /// set, or if `TASK_STORE=sheets` lacks a spreadsheet id or credentials.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Blank values count as unset.
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let bot_token = get("TOKEN")
            .or_else(|| get("TELEGRAM_BOT_TOKEN"))
            .ok_or_else(|| ConfigError::MissingEnvVar("TOKEN".to_string()))?;

        let public_url = get("PUBLIC_URL")
            .ok_or_else(|| ConfigError::MissingEnvVar("PUBLIC_URL".to_string()))?;
        let parsed = url::Url::parse(&public_url)
            .map_err(|e| ConfigError::InvalidValue("PUBLIC_URL".to_string(), e.to_string()))?;
        if parsed.scheme() != "https" {
            return Err(ConfigError::InvalidValue(
                "PUBLIC_URL".to_string(),
                "Telegram webhooks require an https:// URL".to_string(),
            ));
        }
        let public_url = public_url.trim_end_matches('/').to_string();

        let default_chat_id = match get("DEFAULT_CHAT_ID") {
            Some(raw) => {
                let id: i64 = raw.parse().map_err(|e| {
                    ConfigError::InvalidValue("DEFAULT_CHAT_ID".to_string(), format!("{}", e))
                })?;
                Some(id).filter(|id| *id != 0)
            }
            None => None,
        };

        let host = get("HOST").unwrap_or_else(|| "0.0.0.0".to_string());

        let port = get("PORT")
            .unwrap_or_else(|| "10000".to_string())
            .parse()
            .map_err(|e| ConfigError::InvalidValue("PORT".to_string(), format!("{}", e)))?;

        let tz_offset = match get("TZ_OFFSET") {
            Some(raw) => Some(parse_utc_offset(&raw).ok_or_else(|| {
                ConfigError::InvalidValue("TZ_OFFSET".to_string(), format!("expected +HH:MM, got {}", raw))
            })?),
            None => None,
        };

        let store = Self::store_from(&get)?;

        Ok(Self {
            bot_token,
            public_url,
            webhook_secret: get("WEBHOOK_SECRET"),
            inbox_secret: get("INBOX_SECRET"),
            default_chat_id,
            host,
            port,
            telegram_api_url: get("TELEGRAM_API_URL")
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            tz_offset,
            store,
        })
    }

    fn store_from<G>(get: &G) -> Result<StoreConfig, ConfigError>
    where
        G: Fn(&str) -> Option<String>,
    {
        let credentials = if let Some(raw) = get("GOOGLE_CREDENTIALS_JSON") {
            Some(CredentialSource::Json(raw))
        } else if let Some(raw) = get("GOOGLE_CREDENTIALS_B64") {
            Some(CredentialSource::Base64(raw))
        } else if let Some(raw) = get("GOOGLE_APPLICATION_CREDENTIALS") {
            // Some hosts only allow pasting the key itself into this variable.
            if raw.starts_with('{') {
                Some(CredentialSource::Json(raw))
            } else {
                Some(CredentialSource::File(PathBuf::from(raw)))
            }
        } else {
            None
        };

        let spreadsheet_id = get("GSHEET_ID");
        let sheets = match (spreadsheet_id.clone(), credentials.clone()) {
            (Some(spreadsheet_id), Some(credentials)) => Some(SheetsConfig {
                spreadsheet_id,
                worksheet: get("GSHEET_WORKSHEET").unwrap_or_else(|| DEFAULT_WORKSHEET.to_string()),
                credentials,
            }),
            _ => None,
        };

        let store_type = match get("TASK_STORE") {
            Some(raw) => raw
                .parse::<TaskStoreType>()
                .map_err(|e| ConfigError::InvalidValue("TASK_STORE".to_string(), e))?,
            None if sheets.is_some() => TaskStoreType::Sheets,
            None => TaskStoreType::File,
        };

        if store_type == TaskStoreType::Sheets && sheets.is_none() {
            let missing = if spreadsheet_id.is_none() {
                "GSHEET_ID"
            } else {
                "GOOGLE_APPLICATION_CREDENTIALS"
            };
            return Err(ConfigError::MissingEnvVar(missing.to_string()));
        }

        Ok(StoreConfig {
            store_type,
            data_file: get("DATA_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("tasks.json")),
            sheets,
        })
    }

    /// URL registered with Telegram's `setWebhook`.
    pub fn webhook_url(&self) -> String {
        format!("{}{}", self.public_url, WEBHOOK_PATH)
    }
}

/// Parse `+HH:MM`, `-HH:MM`, `+HHMM` or `+HH` into a fixed offset.
fn parse_utc_offset(raw: &str) -> Option<FixedOffset> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("utc") || raw.eq_ignore_ascii_case("z") {
        return FixedOffset::east_opt(0);
    }
    let (sign, rest) = match raw.as_bytes().first()? {
        b'+' => (1, &raw[1..]),
        b'-' => (-1, &raw[1..]),
        _ => return None,
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.is_empty() || digits.len() > 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let (hours, minutes) = if digits.len() <= 2 {
        (digits.parse::<i32>().ok()?, 0)
    } else {
        let split = digits.len() - 2;
        (digits[..split].parse::<i32>().ok()?, digits[split..].parse::<i32>().ok()?)
    };
    if hours > 14 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

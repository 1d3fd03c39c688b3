use serde::{Deserialize, Serialize};

use crate::domain::pricing::BASE_SEASON_LABEL;

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub booking: BookingConfig,
}

/// Which store adapter backs the engine.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// Inventory file loaded into memory.
    #[default]
    Memory,
    /// Headless CMS REST API.
    Cms,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    #[serde(default = "default_data_path")]
    pub data_path: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Sent as `Authorization: Bearer <key>` when set.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub collections: CollectionNames,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            data_path: default_data_path(),
            base_url: default_base_url(),
            request_timeout_secs: default_timeout(),
            user_agent: default_user_agent(),
            api_key: None,
            collections: CollectionNames::default(),
        }
    }
}

/// CMS collection slugs.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CollectionNames {
    #[serde(default = "default_resources_collection")]
    pub resources: String,
    #[serde(default = "default_bookings_collection")]
    pub bookings: String,
    #[serde(default = "default_blocks_collection")]
    pub blocks: String,
}

impl Default for CollectionNames {
    fn default() -> Self {
        Self {
            resources: default_resources_collection(),
            bookings: default_bookings_collection(),
            blocks: default_blocks_collection(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BookingConfig {
    /// Minimum stay for resources that do not set their own.
    #[serde(default = "default_min_units")]
    pub default_min_units: u32,
    /// Longest availability window a single query may ask for.
    #[serde(default = "default_max_window_days")]
    pub max_window_days: u32,
    #[serde(default = "default_base_season_label")]
    pub base_season_label: String,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            default_min_units: default_min_units(),
            max_window_days: default_max_window_days(),
            base_season_label: default_base_season_label(),
        }
    }
}

fn default_data_path() -> String {
    "inventory.yaml".into()
}

fn default_base_url() -> String {
    "http://localhost:3000".into()
}

fn default_timeout() -> u64 {
    15
}

fn default_user_agent() -> String {
    concat!("rental-availability/", env!("CARGO_PKG_VERSION")).into()
}

fn default_resources_collection() -> String {
    "resources".into()
}

fn default_bookings_collection() -> String {
    "bookings".into()
}

fn default_blocks_collection() -> String {
    "blocks".into()
}

fn default_min_units() -> u32 {
    1
}

fn default_max_window_days() -> u32 {
    400
}

fn default_base_season_label() -> String {
    BASE_SEASON_LABEL.into()
}

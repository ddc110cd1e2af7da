use std::net::IpAddr;

use camino::Utf8PathBuf;
use cync_model::DeviceType;
use cync_mqtt_bridge::MqttBridgeConfig;
use serde::Deserialize;

fn default_listen_host() -> String {
    "0.0.0.0".to_string()
}

fn default_listen_port() -> u16 {
    23779
}

fn default_max_tcp_conn() -> usize {
    64
}

fn default_cmd_broadcasts() -> usize {
    cync_commands::DEFAULT_CMD_BROADCASTS
}

fn default_kelvin_min() -> u32 {
    2000
}

fn default_kelvin_max() -> u32 {
    7000
}

/// Top-level on-disk configuration (§6: "consumed only as already-parsed
/// values"). The core treats every field here as given; it owns none of
/// the parsing policy (env vars, CLI overrides, file discovery).
#[derive(Debug, Clone, Deserialize)]
pub struct CyncLanConfig {
    #[serde(default = "default_listen_host")]
    pub listen_host: String,
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,
    pub tls_cert_path: Option<Utf8PathBuf>,
    pub tls_key_path: Option<Utf8PathBuf>,

    #[serde(default = "default_max_tcp_conn")]
    pub max_tcp_conn: usize,
    #[serde(default)]
    pub ip_whitelist: Vec<IpAddr>,
    #[serde(default = "default_cmd_broadcasts")]
    pub cmd_broadcasts: usize,

    /// Disabled by default; the source has this path commented out (§5,
    /// §9 "leave periodic refresh behind a config flag").
    #[serde(default)]
    pub periodic_mesh_refresh_secs: Option<u64>,

    #[serde(default = "default_kelvin_min")]
    pub kelvin_min: u32,
    #[serde(default = "default_kelvin_max")]
    pub kelvin_max: u32,

    #[serde(default)]
    pub mqtt: MqttConfig,

    #[serde(default)]
    pub devices: Vec<DeviceSeed>,
    #[serde(default)]
    pub groups: Vec<GroupSeed>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MqttConfig {
    #[serde(default = "default_mqtt_host")]
    pub host: String,
    #[serde(default = "default_mqtt_port")]
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    #[serde(default = "default_cync_topic")]
    pub cync_topic: String,
    #[serde(default = "default_hass_topic")]
    pub hass_topic: String,
}

fn default_mqtt_host() -> String {
    "localhost".to_string()
}

fn default_mqtt_port() -> u16 {
    1883
}

fn default_cync_topic() -> String {
    "cync_lan".to_string()
}

fn default_hass_topic() -> String {
    "homeassistant".to_string()
}

impl MqttConfig {
    pub fn to_bridge_config(&self) -> MqttBridgeConfig {
        MqttBridgeConfig {
            host: self.host.clone(),
            port: self.port,
            credentials: match (&self.username, &self.password) {
                (Some(user), Some(pass)) => Some((user.clone(), pass.clone())),
                _ => None,
            },
            cync_topic: self.cync_topic.clone(),
            hass_topic: self.hass_topic.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeviceSeed {
    pub id: u16,
    pub home_id: String,
    pub device_type: DeviceTypeSeed,
    pub name: String,
    #[serde(default)]
    pub mac: String,
    #[serde(default)]
    pub wifi_mac: String,
    #[serde(default)]
    pub bt_only: bool,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceTypeSeed {
    Light,
    Switch,
    Plug,
    Fan,
    Hvac,
}

impl From<DeviceTypeSeed> for DeviceType {
    fn from(seed: DeviceTypeSeed) -> Self {
        match seed {
            DeviceTypeSeed::Light => DeviceType::Light,
            DeviceTypeSeed::Switch => DeviceType::Switch,
            DeviceTypeSeed::Plug => DeviceType::Plug,
            DeviceTypeSeed::Fan => DeviceType::Fan,
            DeviceTypeSeed::Hvac => DeviceType::Hvac,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GroupSeed {
    pub id: u16,
    pub home_id: String,
    pub name: String,
    #[serde(default)]
    pub is_subgroup: bool,
    #[serde(default)]
    pub member_ids: Vec<u16>,
}

impl CyncLanConfig {
    pub fn from_toml_str(content: &str) -> Result<CyncLanConfig, toml::de::Error> {
        toml::from_str(content)
    }
}

use crate::Message;

/// Configuration of an MQTT connection.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub credentials: Option<(String, String)>,
    pub last_will: Option<Message>,

    /// Clean the MQTT session upon connect if set to `true`.
    ///
    /// Default: `false`.
    clean_session: bool,

    /// Capacity of the internal broadcast/queue channels.
    pub queue_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: String::from("localhost"),
            port: 1883,
            client_id: String::from("cync_lan"),
            credentials: None,
            last_will: None,
            clean_session: false,
            queue_capacity: 1024,
        }
    }
}

impl Config {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Config::default()
        }
    }

    pub fn with_client_id(self, client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            ..self
        }
    }

    pub fn with_credentials(self, username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            credentials: Some((username.into(), password.into())),
            ..self
        }
    }

    pub fn with_last_will(self, last_will: Message) -> Self {
        Self {
            last_will: Some(last_will),
            ..self
        }
    }

    pub fn with_clean_session(self) -> Self {
        Self {
            clean_session: true,
            ..self
        }
    }

    pub fn clean_session(&self) -> bool {
        self.clean_session
    }
}

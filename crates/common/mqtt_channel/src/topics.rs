use crate::errors::MqttError;
use rumqttc::QoS;

/// An MQTT topic
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Topic {
    pub name: String,
}

impl Topic {
    /// Check if the topic name is valid and build a new topic.
    pub fn new(name: &str) -> Result<Topic, MqttError> {
        let name = String::from(name);
        if rumqttc::valid_topic(&name) {
            Ok(Topic { name })
        } else {
            Err(MqttError::InvalidTopic { name })
        }
    }

    /// Build a topic filter filtering only that topic.
    pub fn filter(&self) -> TopicFilter {
        TopicFilter {
            patterns: vec![self.name.clone()],
            qos: QoS::AtLeastOnce,
        }
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

impl From<&str> for Topic {
    fn from(name: &str) -> Self {
        // Callers build these from already-validated interpolated segments
        // (hass_id, cync_topic, ...); a build-time typo in a topic template
        // is a programmer error, not a runtime condition.
        Topic::new(name).unwrap_or_else(|_| panic!("invalid topic: {name:?}"))
    }
}

/// An MQTT topic filter
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TopicFilter {
    pub patterns: Vec<String>,
    pub qos: QoS,
}

impl TopicFilter {
    /// Check if the pattern is valid and build a new topic filter.
    pub fn new(pattern: &str) -> Result<TopicFilter, MqttError> {
        let pattern = String::from(pattern);
        let qos = QoS::AtLeastOnce;
        if rumqttc::valid_filter(&pattern) {
            Ok(TopicFilter {
                patterns: vec![pattern],
                qos,
            })
        } else {
            Err(MqttError::InvalidFilter { pattern })
        }
    }

    /// Check if the pattern is valid and add it to this topic filter.
    pub fn add(&mut self, pattern: &str) -> Result<(), MqttError> {
        let pattern = String::from(pattern);
        if rumqttc::valid_filter(&pattern) {
            self.patterns.push(pattern);
            Ok(())
        } else {
            Err(MqttError::InvalidFilter { pattern })
        }
    }

    /// Check if the given topic matches this filter pattern.
    pub fn accept(&self, topic: &Topic) -> bool {
        self.patterns
            .iter()
            .any(|pattern| rumqttc::matches(&topic.name, pattern))
    }

    /// A clone of this topic filter with the given QoS.
    pub fn with_qos(self, qos: QoS) -> Self {
        Self { qos, ..self }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_valid_topic() {
        assert!(Topic::new("cync_lan/status/home-7").is_ok());
        assert!(Topic::new("homeassistant/light/home-7/config").is_ok());
    }

    #[test]
    fn check_invalid_topic() {
        assert!(Topic::new("/temp/+").is_err());
        assert!(Topic::new("/temp/#").is_err());
    }

    #[test]
    fn check_valid_topic_filter() {
        assert!(TopicFilter::new("cync_lan/set/#").is_ok());
        assert!(TopicFilter::new("homeassistant/+/status").is_ok());
    }

    #[test]
    fn filter_accepts_matching_topic() {
        let filter = TopicFilter::new("cync_lan/set/#").unwrap();
        let topic = Topic::new("cync_lan/set/home-7").unwrap();
        assert!(filter.accept(&topic));
    }

    #[test]
    fn filter_rejects_non_matching_topic() {
        let filter = TopicFilter::new("cync_lan/set/#").unwrap();
        let topic = Topic::new("cync_lan/status/home-7").unwrap();
        assert!(!filter.accept(&topic));
    }
}

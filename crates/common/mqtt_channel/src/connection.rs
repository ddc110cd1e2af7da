use crate::{Config, Message, MqttError, TopicFilter};
use rumqttc::{
    AsyncClient, ConnectionError, Event, EventLoop, Incoming, MqttOptions, Outgoing, Packet,
    StateError,
};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info};

/// A connection to some MQTT server, wrapping a `rumqttc` client/event-loop
/// pair behind two plain channels.
pub struct Connection {
    /// The channel of the input messages received by this connection.
    pub received: async_broadcast::Receiver<Message>,

    /// The channel of the output messages to be published on this connection.
    pub published: async_channel::Sender<Message>,
}

impl Connection {
    pub async fn connect(
        name: &str,
        config: &Config,
        topic: TopicFilter,
    ) -> Result<Connection, MqttError> {
        let (received_sender, received_receiver) =
            async_broadcast::broadcast(config.queue_capacity);
        let (published_sender, published_receiver) = async_channel::unbounded();

        let (mqtt_client, event_loop) =
            Connection::open(name, config, &topic, received_sender.clone()).await?;
        tokio::spawn(Connection::receiver_loop(event_loop, received_sender));
        tokio::spawn(Connection::sender_loop(
            mqtt_client,
            published_receiver,
            config.last_will.clone(),
        ));

        Ok(Connection {
            received: received_receiver,
            published: published_sender,
        })
    }

    fn mqtt_options(name: &str, config: &Config) -> MqttOptions {
        let mut mqtt_options = MqttOptions::new(name, &config.host, config.port);
        mqtt_options.set_clean_session(config.clean_session());
        if let Some((user, password)) = &config.credentials {
            mqtt_options.set_credentials(user, password);
        }
        if let Some(last_will) = &config.last_will {
            mqtt_options.set_last_will(rumqttc::LastWill::new(
                last_will.topic.name.clone(),
                last_will.payload_bytes().to_vec(),
                last_will.qos,
                last_will.retain,
            ));
        }
        mqtt_options
    }

    async fn open(
        name: &str,
        config: &Config,
        topic: &TopicFilter,
        message_sender: async_broadcast::Sender<Message>,
    ) -> Result<(AsyncClient, EventLoop), MqttError> {
        let mqtt_options = Connection::mqtt_options(name, config);
        let (mqtt_client, mut event_loop) = AsyncClient::new(mqtt_options, config.queue_capacity);

        let qos = topic.qos;
        info!(host = %config.host, port = config.port, "MQTT connecting to broker");

        loop {
            match event_loop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    info!("MQTT connection established");
                    if topic.patterns.is_empty() {
                        break;
                    }
                    for pattern in topic.patterns.iter() {
                        mqtt_client.subscribe(pattern, qos).await?;
                    }
                }

                Ok(Event::Incoming(Packet::SubAck(_))) => {
                    break;
                }

                Ok(Event::Incoming(Packet::Publish(msg))) => {
                    let _ = message_sender.broadcast(msg.into()).await;
                }

                Err(err) => {
                    error!("MQTT connection error: {err}");
                    Connection::pause_on_error(&err).await;
                }
                _ => (),
            }
        }

        Ok((mqtt_client, event_loop))
    }

    async fn receiver_loop(
        mut event_loop: EventLoop,
        message_sender: async_broadcast::Sender<Message>,
    ) {
        loop {
            match event_loop.poll().await {
                Ok(Event::Incoming(Packet::Publish(msg))) => {
                    let _ = message_sender.broadcast(msg.into()).await;
                }

                Ok(Event::Incoming(Incoming::Disconnect))
                | Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                    info!("MQTT connection closed");
                    break;
                }

                Err(err) => {
                    error!("MQTT connection error: {err}");
                    Connection::pause_on_error(&err).await;
                }
                _ => (),
            }
        }
        message_sender.close();
    }

    async fn sender_loop(
        mqtt_client: AsyncClient,
        messages_receiver: async_channel::Receiver<Message>,
        last_will: Option<Message>,
    ) {
        loop {
            match messages_receiver.recv().await {
                Err(async_channel::RecvError) => break,
                Ok(message) => {
                    let payload = Vec::from(message.payload_bytes());
                    if let Err(err) = mqtt_client
                        .publish(message.topic.name.clone(), message.qos, message.retain, payload)
                        .await
                    {
                        error!("failed to publish MQTT message: {err}");
                    }
                }
            }
        }

        // The broker only sends the last will on an ungraceful disconnect, so
        // publish it explicitly before disconnecting cleanly.
        if let Some(last_will) = last_will {
            let payload = Vec::from(last_will.payload_bytes());
            let _ = mqtt_client
                .publish(last_will.topic.name.clone(), last_will.qos, last_will.retain, payload)
                .await;
        }
        debug!("MQTT sender loop closing");
        let _ = mqtt_client.disconnect().await;
    }

    async fn pause_on_error(err: &ConnectionError) {
        let delay = matches!(
            err,
            ConnectionError::Io(_)
                | ConnectionError::MqttState(StateError::Io(_))
                | ConnectionError::MqttState(_)
        );
        if delay {
            sleep(Duration::from_secs(1)).await;
        }
    }
}

//! MQTT camera control
//!
//! Subscribes to a topic and turns each message into a camera pose update.
//! Messages are JSON objects with any of `x`, `y`, `z`, `yaw`, or plain text
//! with all four numbers separated by whitespace.

use crate::camera::{CameraPolicy, CameraState};
use crate::error::{Error, Result};
use rumqttc::{Client, Event, MqttOptions, Packet, QoS};
use serde::Deserialize;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 1883;
pub const DEFAULT_TOPIC: &str = "floorcaster/camera";

/// Partial camera pose; missing fields keep their current value
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct PoseUpdate {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub z: Option<f64>,
    pub yaw: Option<f64>,
}

impl PoseUpdate {
    /// Parse a message payload, JSON first, then "x y z yaw" text.
    /// Non-finite numbers are rejected.
    pub fn parse(payload: &[u8]) -> Option<Self> {
        let text = std::str::from_utf8(payload).ok()?.trim();
        if text.is_empty() {
            return None;
        }

        let update = if let Ok(update) = serde_json::from_str::<PoseUpdate>(text) {
            update
        } else {
            let values: Vec<f64> = text
                .split_whitespace()
                .map(str::parse)
                .collect::<std::result::Result<_, _>>()
                .ok()?;
            let [x, y, z, yaw] = values[..] else {
                return None;
            };
            PoseUpdate {
                x: Some(x),
                y: Some(y),
                z: Some(z),
                yaw: Some(yaw),
            }
        };

        let finite = [update.x, update.y, update.z, update.yaw]
            .iter()
            .flatten()
            .all(|v| v.is_finite());
        finite.then_some(update)
    }

    pub fn apply(&self, camera: &CameraState) -> CameraState {
        CameraState {
            x: self.x.unwrap_or(camera.x),
            y: self.y.unwrap_or(camera.y),
            z: self.z.unwrap_or(camera.z),
            yaw: self.yaw.unwrap_or(camera.yaw),
            t: camera.t,
        }
    }
}

/// Camera policy fed by pose updates from another thread
pub struct RemoteCamera {
    receiver: Receiver<PoseUpdate>,
    _thread: Option<thread::JoinHandle<()>>,
}

impl RemoteCamera {
    /// Use any sender of pose updates as the source
    pub fn from_receiver(receiver: Receiver<PoseUpdate>) -> Self {
        Self {
            receiver,
            _thread: None,
        }
    }

    /// Connect to the broker and subscribe to `topic`.
    /// Fails immediately if the broker cannot be reached.
    pub fn connect(host: &str, port: u16, topic: &str) -> Result<Self> {
        let host = if host.is_empty() { DEFAULT_HOST } else { host };
        let topic = if topic.is_empty() { DEFAULT_TOPIC } else { topic };

        let mut options = MqttOptions::new("floorcaster", host, port);
        options.set_keep_alive(Duration::from_secs(30));

        let (client, mut connection) = Client::new(options, 10);

        client
            .subscribe(topic, QoS::AtMostOnce)
            .map_err(|e| Error::Mqtt(format!("failed to subscribe to '{}': {}", topic, e)))?;

        // Poll once so an unreachable broker fails here rather than later
        match connection.iter().next() {
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                return Err(Error::Mqtt(format!(
                    "failed to connect to {}:{}: {}",
                    host, port, e
                )));
            }
            None => {
                return Err(Error::Mqtt(format!(
                    "failed to connect to {}:{}: connection closed",
                    host, port
                )));
            }
        }

        let (sender, receiver) = mpsc::channel();
        let topic_owned = topic.to_string();

        let handle = thread::spawn(move || {
            // The client must outlive the event loop or the connection drops
            let _client = client;
            Self::message_loop(connection, &sender, &topic_owned);
        });

        tracing::info!(host, port, topic, "MQTT camera control connected");

        Ok(Self {
            receiver,
            _thread: Some(handle),
        })
    }

    fn message_loop(mut connection: rumqttc::Connection, sender: &Sender<PoseUpdate>, topic: &str) {
        for event in connection.iter() {
            match event {
                Ok(Event::Incoming(Packet::Publish(publish))) if publish.topic == topic => {
                    match PoseUpdate::parse(&publish.payload) {
                        Some(update) => {
                            if sender.send(update).is_err() {
                                // Main thread gone
                                break;
                            }
                        }
                        None => tracing::warn!(
                            payload = %String::from_utf8_lossy(&publish.payload),
                            "ignoring malformed camera pose"
                        ),
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    // rumqttc reconnects on the next iteration
                    tracing::warn!("MQTT error: {}", e);
                    thread::sleep(Duration::from_secs(1));
                }
            }
        }
    }
}

impl CameraPolicy for RemoteCamera {
    fn update(&mut self, frame: u64, previous: &CameraState) -> CameraState {
        let mut camera = *previous;
        while let Ok(update) = self.receiver.try_recv() {
            camera = update.apply(&camera);
        }
        camera.t = frame;
        camera
    }

    fn name(&self) -> &str {
        "remote"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_partial() {
        let update = PoseUpdate::parse(br#"{"yaw": 1.5, "z": -2}"#).unwrap();
        assert_eq!(
            update,
            PoseUpdate {
                z: Some(-2.0),
                yaw: Some(1.5),
                ..PoseUpdate::default()
            }
        );
    }

    #[test]
    fn test_parse_plain_text() {
        let update = PoseUpdate::parse(b"  1 2.5 -3 0.25\n").unwrap();
        assert_eq!(update.x, Some(1.0));
        assert_eq!(update.y, Some(2.5));
        assert_eq!(update.z, Some(-3.0));
        assert_eq!(update.yaw, Some(0.25));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(PoseUpdate::parse(b""), None);
        assert_eq!(PoseUpdate::parse(b"hello"), None);
        assert_eq!(PoseUpdate::parse(b"1 2 3"), None);
        assert_eq!(PoseUpdate::parse(b"1 2 3 inf"), None);
        assert_eq!(PoseUpdate::parse(&[0xFF, 0xFE]), None);
    }

    #[test]
    fn test_apply_keeps_missing_fields() {
        let camera = CameraState::new(1.0, 2.0, 3.0, 0.5);
        let update = PoseUpdate {
            x: Some(-4.0),
            ..PoseUpdate::default()
        };
        assert_eq!(update.apply(&camera), CameraState::new(-4.0, 2.0, 3.0, 0.5));
    }

    #[test]
    fn test_remote_camera_applies_queued_updates_in_order() {
        let (sender, receiver) = mpsc::channel();
        let mut remote = RemoteCamera::from_receiver(receiver);

        let first = PoseUpdate {
            x: Some(1.0),
            ..PoseUpdate::default()
        };
        let second = PoseUpdate {
            x: Some(2.0),
            yaw: Some(0.5),
            ..PoseUpdate::default()
        };
        sender.send(first).unwrap();
        sender.send(second).unwrap();

        let camera = remote.update(5, &CameraState::default());
        assert_eq!(camera.x, 2.0);
        assert_eq!(camera.yaw, 0.5);
        assert_eq!(camera.t, 5);

        // Nothing pending: pose holds
        let next = remote.update(6, &camera);
        assert_eq!(next, CameraState { t: 6, ..camera });
    }
}

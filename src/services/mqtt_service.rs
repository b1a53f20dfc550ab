/// MQTT state publisher
///
/// Publishes the latest result of every point as JSON to a configured broker.
/// Topic structure: `{prefix}/{point_id}/state` (native value + attributes)
/// With helpers enabled also `{prefix}/{point_id}/dark` and
/// `{prefix}/{point_id}/dark_soon` as plain `ON`/`OFF` payloads.
/// Birth message: `{prefix}/system/status` (retained)

use std::time::Duration;

use rumqttc::{AsyncClient, LastWill, MqttOptions, QoS};
use serde_json::{Value, json};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::MqttConfig;
use crate::models::illuminance::{HelperFlag, UpdateResult, helper_state};
use crate::shared_state::{AppState, PointRuntime};

fn on_off(flag: bool) -> &'static str {
    if flag { "ON" } else { "OFF" }
}

pub fn state_payload(point: &PointRuntime, result: &UpdateResult) -> Value {
    json!({
        "point_id":     point.id,
        "point_name":   point.name,
        "timestamp":    result.computed_at.to_rfc3339(),
        "illuminance":  result.native_value(),
        "unit":         "lx",
        "attributes":   result.attributes(),
    })
}

/// Topic/payload pairs for one point. Helper topics appear only when
/// helpers are enabled and the projected field exists.
pub fn point_messages(prefix: &str, point: &PointRuntime, result: &UpdateResult) -> Vec<(String, String)> {
    let mut messages = vec![(
        format!("{}/{}/state", prefix, point.id),
        state_payload(point, result).to_string(),
    )];
    if point.config().helpers_enabled {
        for (flag, name) in [(HelperFlag::Dark, "dark"), (HelperFlag::DarkSoon, "dark_soon")] {
            if let Some(value) = helper_state(result, flag) {
                messages.push((format!("{}/{}/{}", prefix, point.id, name), on_off(value).to_string()));
            }
        }
    }
    messages
}

pub async fn run_publisher(cfg: MqttConfig, state: AppState, mut shutdown: watch::Receiver<bool>) {
    if !cfg.enabled || cfg.broker_host.is_empty() {
        info!("[MQTT] Disabled or no broker configured, skipping MQTT publisher");
        return;
    }

    let client_id = if cfg.client_id.is_empty() {
        format!("illuminance-plus-{}", uuid::Uuid::new_v4())
    } else {
        cfg.client_id.clone()
    };

    let interval_s = cfg.publish_interval_s.unwrap_or(30).max(1);
    let prefix = cfg.topic_prefix.trim_end_matches('/').to_string();
    let status_topic = format!("{}/system/status", prefix);

    info!(
        "[MQTT] Connecting to {}:{} (client_id={}, interval={}s)",
        cfg.broker_host, cfg.broker_port, client_id, interval_s
    );

    let mut opts = MqttOptions::new(&client_id, &cfg.broker_host, cfg.broker_port);
    opts.set_keep_alive(Duration::from_secs(30));
    opts.set_clean_session(true);
    opts.set_last_will(LastWill::new(
        &status_topic,
        json!({ "status": "OFFLINE" }).to_string(),
        QoS::AtLeastOnce,
        true,
    ));
    if let (Some(user), Some(pass)) = (&cfg.username, &cfg.password) {
        opts.set_credentials(user, pass);
    }

    let (client, mut eventloop) = AsyncClient::new(opts, 64);

    let birth_payload = json!({
        "status": "ONLINE",
        "version": env!("CARGO_PKG_VERSION"),
        "points": state.points.iter().map(|p| p.id.clone()).collect::<Vec<_>>(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });
    if let Err(e) = client
        .publish(&status_topic, QoS::AtLeastOnce, true, birth_payload.to_string().as_bytes())
        .await
    {
        warn!("[MQTT] Failed to queue birth message: {}", e);
    } else {
        info!("[MQTT] Birth message queued on {}", status_topic);
    }

    let mut ticker = tokio::time::interval(Duration::from_secs(interval_s));
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            event = eventloop.poll() => {
                match event {
                    Ok(rumqttc::Event::Incoming(rumqttc::Packet::ConnAck(_))) => {
                        state.set_mqtt_connected(true);
                        info!("[MQTT] Connected");
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!("[MQTT] Event loop error: {}, will reconnect", e);
                        state.set_mqtt_connected(false);
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                }
                continue;
            }
            _ = shutdown.changed() => {
                let _ = client.disconnect().await;
                info!("[MQTT] Publisher stopped");
                return;
            }
        }

        for point in state.points.iter() {
            let Some(result) = point.latest() else {
                continue;
            };
            for (topic, payload) in point_messages(&prefix, point, &result) {
                if let Err(e) = client.publish(&topic, QoS::AtMostOnce, false, payload.as_bytes()).await {
                    warn!("[MQTT] Publish error for {}: {}", topic, e);
                    state.set_mqtt_connected(false);
                } else {
                    debug!("[MQTT] {} <- {} bytes", topic, payload.len());
                }
            }
        }
    }
}

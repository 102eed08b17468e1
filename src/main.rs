// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `hs100-to-mqtt` binary.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use hs100_mqtt::bridge::{Bridge, NameResolver, Topics};
use hs100_mqtt::discovery::{Discovery, DiscoveryOptions};
use hs100_mqtt::protocol::{Bus, MqttBroker};
use hs100_mqtt::{Config, KasaPlug};

const DEVICE_EVENT_CAPACITY: usize = 64;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();
    init_tracing(&config.verbosity);

    info!(
        name = %config.name,
        mqtt_url = %config.mqtt_url,
        polling_interval_s = config.polling_interval().as_secs(),
        "Starting hs100-to-mqtt"
    );

    let names = NameResolver::load(&config.device_config).context("Failed to load device config")?;
    let topics = Topics::new(config.name.clone());

    let (broker, bus_events) = MqttBroker::builder()
        .url(&config.mqtt_url)
        .context("Invalid MQTT URL")?
        .client_id(config.client_id())
        .last_will(topics.bridge_online(), Value::Bool(false))
        .build();
    let broker = Arc::new(broker);

    let options = DiscoveryOptions::new()
        .with_interval(config.discovery_interval())
        .with_offline_tolerance(config.offline_tolerance)
        .with_static_hosts(config.static_hosts())
        .with_device_timeout(config.device_timeout());
    let (device_tx, device_events) = mpsc::channel(DEVICE_EVENT_CAPACITY);
    let discovery = Discovery::bind(options)
        .await
        .context("Failed to start discovery")?
        .spawn(device_tx);

    let bridge: Bridge<MqttBroker, KasaPlug> = Bridge::new(
        Arc::clone(&broker),
        names,
        config.name.clone(),
        config.polling_interval(),
    );

    tokio::select! {
        () = bridge.run(device_events, bus_events) => warn!("Event streams closed"),
        result = shutdown_signal() => result?,
    }

    discovery.abort();
    if let Err(e) = broker
        .publish(&topics.bridge_online(), &Value::Bool(false), true)
        .await
    {
        warn!(error = %e, "Failed to publish offline flag");
    }
    broker.disconnect().await.context("Failed to disconnect")?;

    info!("Stopped");
    Ok(())
}

/// `RUST_LOG` wins over `--verbosity`.
fn init_tracing(verbosity: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(verbosity))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn shutdown_signal() -> Result<()> {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut terminate =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .context("Failed to install SIGTERM handler")?;
        tokio::select! {
            result = ctrl_c => {
                result.context("Failed to listen for Ctrl+C")?;
                info!("Received Ctrl+C, shutting down");
            }
            _ = terminate.recv() => info!("Received SIGTERM, shutting down"),
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await.context("Failed to listen for Ctrl+C")?;
        info!("Received Ctrl+C, shutting down");
    }

    Ok(())
}

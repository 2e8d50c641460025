// MIT License
// MQTT bridge

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use serde::{Deserialize, Serialize};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::Mutex;
use tokio::time::{interval, Duration, Instant};
use tracing::{debug, error, info, warn};

use paradox_web_bridge::{
    ArmMode, CommandItem, HttpTransport, ModuleConfig, ParadoxPanel, StatusSnapshot,
};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "paradox2mqtt")]
#[command(about = "Bridge between a Paradox alarm panel's IP module and MQTT")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: String,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Config {
    panel: PanelToml,
    mqtt: MqttToml,
}

#[derive(Debug, Deserialize)]
struct PanelToml {
    hostname: String,
    #[serde(default = "default_module_password")]
    module_password: String,
    user_pin: String,
    #[serde(default = "default_init_timeout")]
    init_timeout_ms: u64,
    #[serde(default = "default_init_poll_delay")]
    init_poll_delay_ms: u64,
    #[serde(default)]
    request_delay_ms: u64,
    #[serde(default = "default_tick_interval")]
    tick_interval_ms: u64,
    #[serde(default = "default_status_interval")]
    status_interval_secs: u64,
    #[serde(default = "default_keep_alive_interval")]
    keep_alive_interval_secs: u64,
    #[serde(default = "default_terminal_backoff")]
    terminal_backoff_secs: u64,
}

fn default_module_password() -> String {
    "paradox".to_string()
}
fn default_init_timeout() -> u64 {
    20000
}
fn default_init_poll_delay() -> u64 {
    1000
}
fn default_tick_interval() -> u64 {
    1000
}
fn default_status_interval() -> u64 {
    300
}
fn default_keep_alive_interval() -> u64 {
    60
}
fn default_terminal_backoff() -> u64 {
    300
}

#[derive(Debug, Deserialize)]
struct MqttToml {
    url: String,
    #[serde(default = "default_client_id")]
    client_id: String,
    #[serde(default = "default_subscribe_topic")]
    subscribe_topic: String,
    #[serde(default = "default_publish_topic")]
    publish_topic: String,
}

fn default_client_id() -> String {
    "paradox-bridge".to_string()
}
fn default_subscribe_topic() -> String {
    "set/home/lock".to_string()
}
fn default_publish_topic() -> String {
    "get/home/lock".to_string()
}

fn build_module_config(toml: &PanelToml) -> ModuleConfig {
    ModuleConfig::builder()
        .hostname(&toml.hostname)
        .module_password(&toml.module_password)
        .user_pin(&toml.user_pin)
        .init_timeout_ms(toml.init_timeout_ms)
        .init_poll_delay_ms(toml.init_poll_delay_ms)
        .request_delay_ms(toml.request_delay_ms)
        .build()
}

// ---------------------------------------------------------------------------
// MQTT JSON types
// ---------------------------------------------------------------------------

// Inbound command (subscribed): {"status": {"arm": "<area>", "mode": "..."}, "messageId": ...}
#[derive(Deserialize)]
struct MqttCommand {
    status: MqttCommandStatus,
    #[serde(default, rename = "messageId")]
    message_id: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct MqttCommandStatus {
    arm: String,
    #[serde(default = "default_arm_mode")]
    mode: String,
}

fn default_arm_mode() -> String {
    "regular".to_string()
}

// Optimistic single-area acknowledgement, published immediately when an arm
// command is accepted so dashboards update before the next full refresh.
#[derive(Serialize)]
struct MqttArmAck {
    status: MqttArmAckStatus,
    #[serde(skip_serializing_if = "Option::is_none", rename = "messageId")]
    message_id: Option<serde_json::Value>,
}

#[derive(Serialize)]
struct MqttArmAckStatus {
    #[serde(rename = "areasStatus")]
    areas_status: Vec<MqttArmAckArea>,
}

#[derive(Serialize)]
struct MqttArmAckArea {
    name: String,
    status: u8,
    #[serde(rename = "statusName")]
    status_name: &'static str,
}

fn arm_ack_status(mode: ArmMode) -> (u8, &'static str) {
    match mode {
        ArmMode::Stay => (5, "stay"),
        ArmMode::Instant => (10, "instant"),
        ArmMode::Force | ArmMode::Regular => (2, "armed"),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn publish_json(client: &AsyncClient, topic: &str, payload: &impl Serialize, retain: bool) {
    match serde_json::to_string(payload) {
        Ok(json) => {
            if let Err(e) = client.publish(topic, QoS::AtLeastOnce, retain, json).await {
                error!("Failed to publish to {topic}: {e}");
            }
        }
        Err(e) => error!("Failed to serialize MQTT payload: {e}"),
    }
}

async fn publish_snapshot(client: &AsyncClient, topic: &str, snapshot: &StatusSnapshot) {
    publish_json(client, topic, snapshot, true).await;
}

async fn publish_arm_ack(
    client: &AsyncClient,
    topic: &str,
    area: &str,
    mode: ArmMode,
    message_id: Option<serde_json::Value>,
) {
    let (status, status_name) = arm_ack_status(mode);
    let msg = MqttArmAck {
        status: MqttArmAckStatus {
            areas_status: vec![MqttArmAckArea {
                name: area.to_string(),
                status,
                status_name,
            }],
        },
        message_id,
    };
    publish_json(client, topic, &msg, false).await;
}

// ---------------------------------------------------------------------------
// MQTT command handler
// ---------------------------------------------------------------------------

async fn handle_command(
    cmd: MqttCommand,
    client: &AsyncClient,
    topic: &str,
    panel: &Mutex<ParadoxPanel<HttpTransport>>,
) {
    let mode = match ArmMode::from_name(&cmd.status.mode) {
        Ok(mode) => mode,
        Err(e) => {
            warn!("Rejecting arm command: {e}");
            return;
        }
    };
    let area = cmd.status.arm;
    info!("Command: arm '{area}' ({mode:?})");

    {
        let mut panel_lock = panel.lock().await;
        panel_lock.enqueue(CommandItem::ArmArea {
            area: area.clone(),
            mode,
        });
        // Follow up with a refresh so the real armed state gets published
        panel_lock.enqueue(CommandItem::RefreshStatus);
    }

    publish_arm_ack(client, topic, &area, mode, cmd.message_id).await;
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    // RUST_LOG controls verbosity (e.g. RUST_LOG=debug or RUST_LOG=paradox_web_bridge=trace).
    // Default: info.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    // systemd journal already adds timestamps, so omit them when running under systemd
    if std::env::var_os("JOURNAL_STREAM").is_some() {
        tracing_subscriber::fmt().without_time().with_env_filter(env_filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let cli = Cli::parse();

    // Load config
    let config_text =
        std::fs::read_to_string(&cli.config).context("Failed to read config file")?;
    let config: Config = toml::from_str(&config_text).context("Failed to parse config file")?;

    let mut module_config = build_module_config(&config.panel);
    let mut panel_toml = config.panel;
    let mut mqtt_toml = config.mqtt;
    let (mut mqtt_host, mut mqtt_port) = parse_mqtt_url(&mqtt_toml.url)?;

    let mut sighup = signal(SignalKind::hangup())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    loop {
        info!("Bridging Paradox module at {}", module_config.hostname);
        let transport =
            HttpTransport::new(&module_config).context("Failed to build HTTP transport")?;
        let panel = Arc::new(Mutex::new(ParadoxPanel::new(
            module_config.clone(),
            transport,
        )));

        // Set up MQTT
        let mut mqtt_opts = MqttOptions::new(&mqtt_toml.client_id, &mqtt_host, mqtt_port);
        mqtt_opts.set_keep_alive(Duration::from_secs(30));
        let (client, mut eventloop) = AsyncClient::new(mqtt_opts, 256);

        client
            .subscribe(&mqtt_toml.subscribe_topic, QoS::AtLeastOnce)
            .await
            .context("Failed to subscribe to MQTT topic")?;
        info!("MQTT: subscribed to {}", mqtt_toml.subscribe_topic);

        // Task 1: tick driver — advances the session one step per tick,
        // schedules the periodic refresh and keep-alive, publishes snapshots
        let panel_tick = Arc::clone(&panel);
        let client_tick = client.clone();
        let topic_tick = mqtt_toml.publish_topic.clone();
        let tick_interval_ms = panel_toml.tick_interval_ms;
        let status_interval = Duration::from_secs(panel_toml.status_interval_secs);
        let keep_alive_interval = Duration::from_secs(panel_toml.keep_alive_interval_secs);
        let terminal_backoff = Duration::from_secs(panel_toml.terminal_backoff_secs);
        let tick_handle = tokio::spawn(async move {
            let mut ticker = interval(Duration::from_millis(tick_interval_ms));
            let mut last_refresh: Option<Instant> = None;
            let mut last_keep_alive = Instant::now();
            loop {
                ticker.tick().await;

                let snapshot = {
                    let mut panel_lock = panel_tick.lock().await;

                    let refresh_due = last_refresh
                        .is_none_or(|t| t.elapsed() >= status_interval);
                    if refresh_due {
                        panel_lock.enqueue(CommandItem::RefreshStatus);
                        last_refresh = Some(Instant::now());
                    }
                    if last_keep_alive.elapsed() >= keep_alive_interval {
                        panel_lock.enqueue(CommandItem::KeepAlive);
                        last_keep_alive = Instant::now();
                    }

                    if let Err(e) = panel_lock.process().await {
                        if e.is_terminal() {
                            error!("Session failed terminally: {e}; backing off");
                            drop(panel_lock);
                            tokio::time::sleep(terminal_backoff).await;
                            continue;
                        }
                        warn!("Session step failed: {e}");
                    }

                    panel_lock.take_latest_snapshot()
                };

                if let Some(snapshot) = snapshot {
                    debug!("Publishing status snapshot");
                    publish_snapshot(&client_tick, &topic_tick, &snapshot).await;
                }
            }
        });

        // Task 2: MQTT event loop (receives messages, handles commands)
        let panel_cmds = Arc::clone(&panel);
        let client_cmds = client.clone();
        let topic_cmds = mqtt_toml.publish_topic.clone();
        let sub_topic = mqtt_toml.subscribe_topic.clone();
        let mqtt_handle = tokio::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        // (Re)subscribe after every broker connect/reconnect.
                        // rumqttc does not auto-resubscribe, so without this a
                        // broker restart silently drops our subscription and we
                        // stop receiving commands.
                        info!("MQTT: connected, subscribing to {sub_topic}");
                        if let Err(e) =
                            client_cmds.subscribe(&sub_topic, QoS::AtLeastOnce).await
                        {
                            error!("Failed to subscribe to {sub_topic}: {e}");
                        }
                    }
                    Ok(Event::Incoming(Packet::Publish(msg))) => {
                        if msg.topic == sub_topic {
                            let payload = String::from_utf8_lossy(&msg.payload);
                            match serde_json::from_str::<MqttCommand>(&payload) {
                                Ok(cmd) => {
                                    info!("MQTT command received: {payload}");
                                    handle_command(cmd, &client_cmds, &topic_cmds, &panel_cmds)
                                        .await;
                                }
                                Err(e) => {
                                    warn!("Failed to parse MQTT command: {e}");
                                }
                            }
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!("MQTT event loop error: {e}");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        });

        // Wait for a signal
        info!("MQTT bridge running. Send SIGHUP to restart, SIGINT/SIGTERM to stop.");
        let restart = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received SIGINT, shutting down...");
                false
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down...");
                false
            }
            _ = sighup.recv() => {
                info!("Received SIGHUP, reloading config and restarting...");
                true
            }
        };

        // Abort tasks
        tick_handle.abort();
        mqtt_handle.abort();

        if !restart {
            break;
        }

        // Reload config from disk; keep previous config on failure
        info!("Reloading config from {}", cli.config);
        match std::fs::read_to_string(&cli.config)
            .context("Failed to read config file")
            .and_then(|text| {
                toml::from_str::<Config>(&text).context("Failed to parse config file")
            }) {
            Ok(new_config) => match parse_mqtt_url(&new_config.mqtt.url) {
                Ok((new_host, new_port)) => {
                    module_config = build_module_config(&new_config.panel);
                    panel_toml = new_config.panel;
                    mqtt_toml = new_config.mqtt;
                    mqtt_host = new_host;
                    mqtt_port = new_port;
                    info!("Config reloaded successfully");
                }
                Err(e) => warn!("Invalid MQTT URL in new config, keeping previous: {e}"),
            },
            Err(e) => warn!("Failed to reload config, keeping previous: {e}"),
        }

        info!("Restarting...");
    }

    info!("Shutdown complete");
    Ok(())
}

/// Parse an MQTT URL like "mqtt://host:port" into (host, port).
fn parse_mqtt_url(url: &str) -> Result<(String, u16)> {
    let stripped = url
        .strip_prefix("mqtt://")
        .or_else(|| url.strip_prefix("tcp://"))
        .unwrap_or(url);

    let (host, port_str) = stripped
        .rsplit_once(':')
        .context("MQTT URL must be in format mqtt://host:port")?;

    let port: u16 = port_str
        .parse()
        .context("Invalid MQTT port number")?;

    Ok((host.to_string(), port))
}

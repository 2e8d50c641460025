//! Example: Arm one area by name, then verify with a status refresh.

use std::time::Duration;

use paradox_web_bridge::{ArmMode, CommandItem, HttpTransport, ModuleConfig, ParadoxPanel};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = ModuleConfig::builder()
        .hostname("192.168.1.123")
        .module_password("paradox")
        .user_pin("1234")
        .build();

    let transport = HttpTransport::new(&config)?;
    let mut panel = ParadoxPanel::new(config, transport);

    println!("Arming 'House' (stay)...");
    panel.enqueue(CommandItem::ArmArea {
        area: "House".to_string(),
        mode: ArmMode::Stay,
    });
    panel.enqueue(CommandItem::RefreshStatus);

    loop {
        if let Err(e) = panel.process().await {
            anyhow::bail!("session failed: {e}");
        }

        if let Some(snapshot) = panel.take_latest_snapshot() {
            for area in &snapshot.areas {
                println!("Area {}: {}", area.name, area.status_name);
            }
            break;
        }

        tokio::time::sleep(Duration::from_secs(1)).await;
    }

    Ok(())
}

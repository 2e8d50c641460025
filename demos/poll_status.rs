//! Example: Poll a Paradox IP module and print area/zone status.

use std::time::Duration;

use paradox_web_bridge::{CommandItem, HttpTransport, ModuleConfig, ParadoxPanel};

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

    println!("Fetching status...");
    panel.enqueue(CommandItem::RefreshStatus);

    loop {
        if let Err(e) = panel.process().await {
            eprintln!("Session step failed: {e}");
            if e.is_terminal() {
                anyhow::bail!("giving up: {e}");
            }
        }

        if let Some(snapshot) = panel.take_latest_snapshot() {
            for area in &snapshot.areas {
                println!(
                    "Area {:2}: {:16} status={} ({})",
                    area.id, area.name, area.status, area.status_name
                );
                for zone in &area.zones {
                    println!(
                        "  Zone {:2}: {:16} status={} ({})",
                        zone.id, zone.name, zone.status, zone.status_name
                    );
                }
            }
            break;
        }

        tokio::time::sleep(Duration::from_secs(1)).await;
    }

    Ok(())
}

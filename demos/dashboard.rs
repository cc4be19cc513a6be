//! Headless dashboard demo
//!
//! Lists the first page of turnstiles, prints every live update pushed by the server
//! and unlocks the first locked turnstile it sees.
//!
//! Run with: TURNSTILE_ORIGIN=http://localhost:8080 cargo run --example dashboard

use turnstile_hal::turnstile::{Dashboard, Snapshot};
use turnstile_hal::ClientConfig;

fn print_snapshot(snapshot: &Snapshot) {
    println!("--- revision {} ---", snapshot.revision);
    if let Some(error) = &snapshot.error {
        println!("  error: {}", error);
    }
    let Some(page) = &snapshot.page else {
        println!("  (no page)");
        return;
    };
    println!(
        "  page {} of {} ({} turnstiles)",
        page.page.number + 1,
        page.page.total_pages,
        page.page.total_elements
    );
    for turnstile in &page.embedded.turnstiles {
        println!(
            "  #{:<4} {:<9} events: {:?} {}",
            turnstile.id,
            turnstile.current_state.to_string(),
            turnstile.events(),
            turnstile.message.as_deref().unwrap_or("")
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("turnstile_hal=info".parse()?),
        )
        .init();

    let config = ClientConfig::from_env()?;
    println!("Turnstile dashboard");
    println!("===================");
    println!("API:  {}", config.base_url);
    println!("Push: {}\n", config.ws_url);

    let dashboard = Dashboard::start(config).await?;
    let snapshot = dashboard.ready().await?;
    print_snapshot(&snapshot);

    let locked = snapshot
        .page
        .as_ref()
        .and_then(|page| page.embedded.turnstiles.iter().find(|t| t.locked).cloned());
    if let Some(turnstile) = locked {
        match dashboard.send_event(&turnstile, "coin").await {
            Ok(updated) => println!("\ncoin -> #{} is {}", updated.id, updated.current_state),
            Err(e) => println!("\ncoin failed: {}", e),
        }
    }

    let mut snapshots = dashboard.subscribe();
    let mut notices = dashboard.notice().subscribe();
    loop {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                if snapshot.in_flight == 0 {
                    print_snapshot(&snapshot);
                }
            }
            changed = notices.changed() => {
                if changed.is_err() {
                    break;
                }
                if let Some(message) = notices.borrow_and_update().clone() {
                    println!(">> {}", message);
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    dashboard.shutdown().await;
    Ok(())
}

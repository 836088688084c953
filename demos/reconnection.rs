use clearpath_realtime::{ConnectionState, HubOptions, RealtimeHub, topics};
use std::time::Duration;

/// Watches the hub's state machine while the network or server is disrupted
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize tracing to see logs
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    println!("🦀 Testing reconnection against the ClearPath realtime service\n");

    let options = HubOptions::from_env()?
        .with_backoff(Duration::from_millis(500), Duration::from_secs(8));
    let hub = RealtimeHub::new(options);
    hub.subscribe(topics::PACKAGE_UPDATES);
    hub.subscribe(topics::SYSTEM_HEALTH);

    // Test 1: Connect and verify
    println!("✅ Test 1: Initial connection...");
    hub.start();
    let mut watch = hub.watch();
    let opened = matches!(
        tokio::time::timeout(
            Duration::from_secs(15),
            watch.wait_for(|s| s.state == ConnectionState::Open),
        )
        .await,
        Ok(Ok(_))
    );
    if !opened {
        return Err(format!("did not connect: {:?}", hub.last_error()).into());
    }
    println!("✅ Connected, subscriptions: {:?}\n", hub.subscriptions());

    // Test 2: Manual stop should NOT trigger reconnection
    println!("✅ Test 2: Manual stop (should NOT auto-reconnect)...");
    hub.stop().await;
    println!("⏳ Waiting 5 seconds to verify no auto-reconnect...");
    tokio::time::sleep(Duration::from_secs(5)).await;
    if hub.state() != ConnectionState::Closed {
        return Err("Should NOT reconnect after manual stop".into());
    }
    println!("✅ Correctly stayed disconnected\n");

    // Test 3: Automatic reconnection
    println!("✅ Test 3: Testing automatic reconnection...");
    hub.start();
    println!("💡 Restart the realtime service or drop your network now.");
    println!("   Watching state changes for 60 seconds...\n");

    let deadline = tokio::time::sleep(Duration::from_secs(60));
    tokio::pin!(deadline);
    loop {
        tokio::select! {
            changed = watch.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = watch.borrow_and_update().clone();
                println!(
                    "   state={} retry={} error={:?}",
                    snapshot.state,
                    snapshot.retry_count,
                    snapshot.last_error.map(|e| e.to_string())
                );
                if snapshot.state == ConnectionState::Failed {
                    println!("❌ Retry budget exhausted");
                    break;
                }
            }
            _ = &mut deadline => break,
        }
    }

    hub.stop().await;
    println!("\n🎉 Done (final state: {})", hub.state());
    Ok(())
}

use clearpath_realtime::{HubOptions, MessageType, RealtimeHub, topics};

/// Streams live dashboard traffic from a running realtime service
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables (CLEARPATH_WS_HOST, CLEARPATH_ENV, ...)
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "clearpath_realtime=info".into()),
        )
        .init();

    let options = HubOptions::from_env()?;
    println!("📡 Connecting to: {}\n", options.endpoint_url()?);

    let hub = RealtimeHub::new(options);
    for topic in [
        topics::PACKAGE_UPDATES,
        topics::DASHBOARD_METRICS,
        topics::ANOMALIES,
        topics::NOTIFICATIONS,
    ] {
        hub.subscribe(topic);
    }

    let mut messages = hub.listen();
    hub.start();

    loop {
        tokio::select! {
            message = messages.recv() => {
                let Some(message) = message else { break };
                if message.kind.is_control() {
                    continue;
                }
                match message.kind {
                    MessageType::PackageUpdate => {
                        println!("📦 {} -> {}", message.data["package_id"], message.data["status"]);
                    }
                    MessageType::DashboardMetrics => {
                        println!("📊 metrics: {}", message.data);
                    }
                    MessageType::AnomalyDetected => {
                        println!("⚠️  anomaly: {}", message.data);
                    }
                    other => println!("📨 {}: {}", other, message.data),
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    println!("\nDisconnecting...");
    hub.stop().await;
    println!("Disconnected ({})", hub.state());

    Ok(())
}

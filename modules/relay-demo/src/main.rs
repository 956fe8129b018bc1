use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use relay_engine::{Dispatcher, ListenerError, LogErrors};
use relay_events::{Event, ListenerRegistry, Propagation, StoppableEvent};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod config;

use config::DemoConfig;

struct UserCreated {
    user_id: String,
    email: String,
    propagation: Propagation,
}

impl UserCreated {
    fn new(user_id: &str, email: &str) -> Arc<Self> {
        Arc::new(Self {
            user_id: user_id.to_string(),
            email: email.to_string(),
            propagation: Propagation::new(),
        })
    }
}

impl Event for UserCreated {
    fn as_stoppable(&self) -> Option<&dyn StoppableEvent> {
        Some(&self.propagation)
    }
}

/// Plain event: listeners fan out.
struct CacheWarmed {
    keys: usize,
}

impl Event for CacheWarmed {}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("relay=info".parse()?))
        .init();

    let config = DemoConfig::from_env()?;
    config.log();

    let registry = Arc::new(ListenerRegistry::new());

    registry.on_named(
        "welcome-email",
        |event: Arc<UserCreated>, _cancel: CancellationToken| async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            info!(email = event.email.as_str(), "Sending welcome email");
            anyhow::Ok(())
        },
    );
    registry.on_named(
        "audit-log",
        |event: Arc<UserCreated>, _cancel: CancellationToken| async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            info!(user_id = event.user_id.as_str(), "Logging user creation");
            anyhow::Ok(())
        },
    );
    registry.on_named(
        "cache-report",
        |event: Arc<CacheWarmed>, cancel: CancellationToken| async move {
            tokio::select! {
                _ = cancel.cancelled() => anyhow::bail!("cancelled before reporting"),
                _ = tokio::time::sleep(Duration::from_millis(200)) => {}
            }
            info!(keys = event.keys, "Cache warmed");
            anyhow::Ok(())
        },
    );
    registry.on_named(
        "cache-metrics",
        |_event: Arc<CacheWarmed>, _cancel: CancellationToken| async move {
            Err::<(), _>(anyhow::anyhow!("metrics backend unavailable"))
        },
    );

    let dispatcher = Dispatcher::builder(registry.clone())
        .config(config.dispatcher)
        .on_error(LogErrors)
        .build()?;

    // Fire and forget: the dispatch keeps running after the handle is dropped.
    drop(dispatcher.dispatch(UserCreated::new("123", "user@example.com")));

    // Wait for the event to finish.
    let event = dispatcher
        .dispatch(UserCreated::new("456", "user@example.com"))
        .await?;
    info!(user_id = event.user_id.as_str(), "Dispatch complete");

    // Bound the wait.
    match dispatcher
        .dispatch_with_timeout(UserCreated::new("789", "user@example.com"), config.timeout)
        .await
    {
        Ok(event) => info!(user_id = event.user_id.as_str(), "Dispatch complete within timeout"),
        Err(e) => error!(error = %e, "Dispatch did not complete"),
    }

    // Fan-out with failures routed to a custom handler.
    let reporting = Dispatcher::builder(registry)
        .config(config.dispatcher)
        .on_error(|error: ListenerError| {
            error!(listener = error.listener(), error = %error, "Listener failed");
        })
        .build()?;
    let event = reporting.dispatch(Arc::new(CacheWarmed { keys: 42 })).await?;
    info!(keys = event.keys, "Fan-out complete");

    Ok(())
}

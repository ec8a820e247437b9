//! Process wiring: start the RTM connection, the interaction endpoint, and the consume loop.

use crate::channels::{InboundEvent, RtmConnection, SlackApi};
use crate::config::Settings;
use crate::gateway::{self, ActionAcknowledger, GatewayState};
use crate::handler::{AttachmentPrompt, MessageHandler};
use crate::routing::EventRouter;
use anyhow::{anyhow, Result};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

const EVENT_BUFFER: usize = 64;

/// Run until a fatal event (error) or SIGINT/SIGTERM (Ok).
///
/// The HTTP listener is bound before anything else starts, so a busy port fails fast.
pub async fn run_bridge(settings: Settings) -> Result<()> {
    let api = SlackApi::new(settings.api_base.clone(), settings.identity.token.clone());

    let state = GatewayState::new(settings.verification.clone(), Arc::new(ActionAcknowledger));
    let gateway = gateway::bind_gateway(&settings.bind, settings.port, state).await?;
    let (stop_tx, mut stop_rx) = watch::channel(false);
    let mut server = tokio::spawn(gateway.serve(async move {
        let _ = stop_rx.changed().await;
    }));

    let (event_tx, mut event_rx) = mpsc::channel::<InboundEvent>(EVENT_BUFFER);
    let rtm = RtmConnection::new(api.clone()).start(event_tx);

    let router = EventRouter::new(MessageHandler::new(
        settings.identity.clone(),
        settings.target.clone(),
        Arc::new(AttachmentPrompt::new(api)),
    ));

    let outcome = tokio::select! {
        fatal = router.run(&mut event_rx) => Err(anyhow!(fatal)),
        joined = &mut server => {
            rtm.abort();
            return Err(match joined {
                Ok(Ok(())) => anyhow!("interaction endpoint stopped unexpectedly"),
                Ok(Err(e)) => e,
                Err(e) => anyhow!("interaction endpoint task failed: {}", e),
            });
        }
        _ = shutdown_signal() => {
            log::info!("shutdown signal received, stopping");
            Ok(())
        }
    };

    rtm.abort();
    let _ = stop_tx.send(true);
    match server.await {
        Ok(Err(e)) => log::warn!("{:#}", e),
        Err(e) => log::warn!("interaction endpoint task failed: {}", e),
        Ok(Ok(())) => {}
    }
    outcome
}

/// Future that completes when the process should shut down (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::warn!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                log::warn!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

//! The long-lived background process that owns the model.

use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use webmind_capability::SystemCapabilities;
use webmind_runtime::{LifecycleManager, RestoreOutcome, SubscriptionId};

use crate::protocol::{parse_request, Event, Request, Response};
use crate::relay::EventRelay;

/// Dispatches surface requests to the lifecycle manager and relays its
/// events back.
pub struct BackgroundService {
    manager: Arc<LifecycleManager>,
    relay: EventRelay,
    subscription: SubscriptionId,
    capabilities: SystemCapabilities,
}

impl BackgroundService {
    /// Attach to `manager` without touching the model.
    ///
    /// Call [`listen`](Self::listen) before [`restore`](Self::restore) to
    /// observe restore progress.
    pub fn new(manager: Arc<LifecycleManager>, capabilities: SystemCapabilities) -> Self {
        let relay = EventRelay::new();
        let subscription = manager.subscribe(Arc::new(relay.clone()));

        Self {
            manager,
            relay,
            subscription,
            capabilities,
        }
    }

    /// Attach and immediately restore the persisted model.
    pub async fn start(
        manager: Arc<LifecycleManager>,
        capabilities: SystemCapabilities,
    ) -> (Self, RestoreOutcome) {
        let service = Self::new(manager, capabilities);
        let outcome = service.restore().await;
        (service, outcome)
    }

    /// Re-acquire the model persisted as enabled, if any.
    pub async fn restore(&self) -> RestoreOutcome {
        let outcome = self.manager.restore().await;
        match &outcome {
            RestoreOutcome::Skipped => debug!("Nothing to restore"),
            RestoreOutcome::Restored(id) => info!("Restored model {}", id),
            RestoreOutcome::Failed(e) => warn!("Startup continues without a model: {}", e),
        }
        outcome
    }

    /// Receive events published from now on.
    pub fn listen(&self) -> broadcast::Receiver<Event> {
        self.relay.listen()
    }

    pub fn manager(&self) -> &Arc<LifecycleManager> {
        &self.manager
    }

    pub fn capabilities(&self) -> &SystemCapabilities {
        &self.capabilities
    }

    /// Handle one request.
    pub async fn handle(&self, request: Request) -> Response {
        debug!("Received request: {:?}", request);

        match request {
            Request::LoadModel { model_id } => match self.manager.load(&model_id).await {
                Ok(()) => Response::ok().with_state(self.manager.state()),
                Err(e) => Response::failure(e),
            },
            Request::ToggleModel => match self.manager.toggle_enabled().await {
                Ok(_) => Response::ok().with_state(self.manager.state()),
                Err(e) => Response::failure(e),
            },
            Request::GetModelState => Response::ok().with_state(self.manager.state()),
            Request::UnloadModel => match self.manager.unload().await {
                Ok(()) => Response::ok().with_state(self.manager.state()),
                Err(e) => Response::failure(e),
            },
            Request::Chat { message } => match self.manager.converse(&message).await {
                Ok(reply) => Response {
                    reply: Some(reply),
                    ..Response::ok()
                },
                Err(e) => Response::failure(e),
            },
            Request::GetCapabilities => Response {
                capabilities: Some(self.capabilities.clone()),
                ..Response::ok()
            },
        }
    }

    /// Handle one JSON request.
    ///
    /// Returns `None` for message types addressed to someone else.
    pub async fn handle_json(&self, text: &str) -> Option<Response> {
        match parse_request(text) {
            Ok(Some(request)) => Some(self.handle(request).await),
            Ok(None) => {
                debug!("Ignoring message not addressed to the background: {}", text);
                None
            }
            Err(e) => Some(Response::failure(e)),
        }
    }
}

impl Drop for BackgroundService {
    fn drop(&mut self) {
        self.manager.unsubscribe(self.subscription);
    }
}

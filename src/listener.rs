use crate::{address::Address, service_config::ServiceConfig, status::Status};
use parking_lot::ReentrantMutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Receives the outcome of every completed resolution pass.
///
/// At most one of the two methods is called per pass and neither is called
/// once [`Resolver::destroy`](crate::Resolver::destroy) has returned.
/// `service_config` and `service_config_error` are never both set.
#[auto_impl::auto_impl(&, Arc, Box)]
pub trait ResolverListener: Send + Sync {
    fn on_successful_resolution(
        &self,
        addresses: Vec<Address>,
        service_config: Option<ServiceConfig>,
        service_config_error: Option<Status>,
    );

    fn on_error(&self, status: Status);
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResolutionEvent {
    Resolved {
        addresses: Vec<Address>,
        service_config: Option<ServiceConfig>,
        service_config_error: Option<Status>,
    },
    Failed(Status),
}

/// Listener forwarding every outcome into an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelListener {
    sender: mpsc::UnboundedSender<ResolutionEvent>,
}

impl ChannelListener {
    fn send(&self, event: ResolutionEvent) {
        if self.sender.send(event).is_err() {
            trace!("Resolution event dropped, receiver is gone");
        }
    }
}

impl ResolverListener for ChannelListener {
    fn on_successful_resolution(
        &self,
        addresses: Vec<Address>,
        service_config: Option<ServiceConfig>,
        service_config_error: Option<Status>,
    ) {
        self.send(ResolutionEvent::Resolved {
            addresses,
            service_config,
            service_config_error,
        })
    }

    fn on_error(&self, status: Status) {
        self.send(ResolutionEvent::Failed(status))
    }
}

pub fn channel() -> (
    Arc<ChannelListener>,
    mpsc::UnboundedReceiver<ResolutionEvent>,
) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (Arc::new(ChannelListener { sender }), receiver)
}

/// Gate between a resolver and its listener.
///
/// Every callback runs under `lock`; [`shut`](Self::shut) cancels the token
/// and then takes the same lock, so once it returns no callback is running or
/// can start. The lock is re-entrant so a listener may destroy its resolver
/// from inside a callback.
pub(crate) struct Delivery {
    listener: Arc<dyn ResolverListener>,
    dead: CancellationToken,
    lock: ReentrantMutex<()>,
}

impl Delivery {
    pub fn new(listener: Arc<dyn ResolverListener>) -> Self {
        Self {
            listener,
            dead: CancellationToken::new(),
            lock: ReentrantMutex::new(()),
        }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.dead
    }

    pub fn is_shut(&self) -> bool {
        self.dead.is_cancelled()
    }

    /// Returns whether the listener was actually called.
    pub fn resolved(
        &self,
        addresses: Vec<Address>,
        service_config: Result<Option<ServiceConfig>, Status>,
    ) -> bool {
        if addresses.is_empty() {
            return self.failed(Status::unavailable("Resolution produced no addresses"));
        }

        let _guard = self.lock.lock();
        if self.dead.is_cancelled() {
            return false;
        }

        let (service_config, service_config_error) = match service_config {
            Ok(config) => (config, None),
            Err(status) => (None, Some(status)),
        };
        self.listener
            .on_successful_resolution(addresses, service_config, service_config_error);
        true
    }

    pub fn failed(&self, status: Status) -> bool {
        let _guard = self.lock.lock();
        if self.dead.is_cancelled() {
            return false;
        }

        self.listener.on_error(status);
        true
    }

    pub fn shut(&self) {
        self.dead.cancel();
        drop(self.lock.lock());
    }
}

use super::{Resolver, ResolverOptions};
use crate::{address::Address, listener::Delivery, ResolverListener, Result};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::{runtime::Handle, task::JoinHandle};

/// Resolver for targets naming their addresses directly.
///
/// Every `update_resolution` delivers the same list from a spawned task, so
/// outcomes still arrive asynchronously.
pub struct FixedResolver {
    inner: Arc<Inner>,
}

struct Inner {
    addresses: Vec<Address>,
    runtime: Handle,
    delivery: Delivery,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl FixedResolver {
    pub fn new(
        addresses: Vec<Address>,
        listener: Arc<dyn ResolverListener>,
        options: &ResolverOptions,
    ) -> Result<Self> {
        Ok(Self {
            inner: Arc::new(Inner {
                addresses,
                runtime: options.runtime_handle()?,
                delivery: Delivery::new(listener),
                task: Mutex::new(None),
            }),
        })
    }
}

impl Resolver for FixedResolver {
    fn update_resolution(&self) {
        let mut task = self.inner.task.lock();
        if self.inner.delivery.is_shut() {
            return;
        }
        if task.as_ref().is_some_and(|t| !t.is_finished()) {
            return;
        }

        let inner = self.inner.clone();
        *task = Some(self.inner.runtime.spawn(async move {
            inner.delivery.resolved(inner.addresses.clone(), Ok(None));
        }));
    }

    fn destroy(&self) {
        self.inner.delivery.shut();
        if let Some(task) = self.inner.task.lock().take() {
            task.abort();
        }
    }
}

impl Drop for FixedResolver {
    fn drop(&mut self) {
        self.destroy();
    }
}

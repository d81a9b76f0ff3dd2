use crate::{
    resolver::{
        dns::DnsResolverFactory,
        ip::{IpFamily, IpResolverFactory},
        uds::UdsResolverFactory,
    },
    Error, Resolver, ResolverListener, ResolverOptions, Result, Target,
};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tracing::debug;

/// Builds resolvers for one scheme.
///
/// Any `Fn(&Target, Arc<dyn ResolverListener>, ResolverOptions)` returning a
/// boxed resolver is a factory.
pub trait ResolverFactory: Send + Sync {
    /// Fails only when the target is malformed for this scheme or no runtime
    /// is available.
    fn build(
        &self,
        target: &Target,
        listener: Arc<dyn ResolverListener>,
        options: ResolverOptions,
    ) -> Result<Box<dyn Resolver>>;

    /// Authority a channel to `target` should present.
    fn default_authority(&self, target: &Target) -> String {
        target.path.clone()
    }
}

impl<F> ResolverFactory for F
where
    F: Fn(&Target, Arc<dyn ResolverListener>, ResolverOptions) -> Result<Box<dyn Resolver>>
        + Send
        + Sync,
{
    fn build(
        &self,
        target: &Target,
        listener: Arc<dyn ResolverListener>,
        options: ResolverOptions,
    ) -> Result<Box<dyn Resolver>> {
        self(target, listener, options)
    }
}

#[derive(Default)]
struct Factories {
    factories: FxHashMap<String, Arc<dyn ResolverFactory>>,
    default_scheme: Option<String>,
}

/// Table from scheme to resolver factory.
#[derive(Default)]
pub struct ResolverRegistry {
    inner: RwLock<Factories>,
}

impl ResolverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `factory` for `scheme`, replacing any previous one. Marking
    /// it as default moves the default away from any other scheme.
    pub fn register(&self, scheme: &str, factory: Arc<dyn ResolverFactory>, is_default: bool) {
        let scheme = scheme.to_ascii_lowercase();
        debug!("Registering resolver for scheme {}", scheme);

        let mut inner = self.inner.write();
        inner.factories.insert(scheme.clone(), factory);
        if is_default {
            inner.default_scheme = Some(scheme);
        }
    }

    /// Registers `dns` (as default), `ipv4`, `ipv6` and `unix`.
    ///
    /// Schemes that already have a factory and an already chosen default are
    /// left alone, so calling this again changes nothing.
    pub fn register_all(&self) {
        let mut inner = self.inner.write();

        let builtins: [(&str, Arc<dyn ResolverFactory>); 4] = [
            ("dns", Arc::new(DnsResolverFactory)),
            ("ipv4", Arc::new(IpResolverFactory::new(IpFamily::V4))),
            ("ipv6", Arc::new(IpResolverFactory::new(IpFamily::V6))),
            ("unix", Arc::new(UdsResolverFactory)),
        ];
        for (scheme, factory) in builtins {
            inner
                .factories
                .entry(scheme.to_owned())
                .or_insert(factory);
        }

        if inner.default_scheme.is_none() {
            inner.default_scheme = Some("dns".to_owned());
        }
    }

    pub fn parse_target(&self, target: &str) -> Target {
        let inner = self.inner.read();
        Target::parse(
            target,
            |scheme| inner.factories.contains_key(scheme),
            inner.default_scheme.as_deref(),
        )
    }

    /// Creates a resolver for `target` reporting to `listener`. Nothing is
    /// resolved until the first `update_resolution`.
    pub fn create_resolver(
        &self,
        target: &str,
        listener: Arc<dyn ResolverListener>,
        options: ResolverOptions,
    ) -> Result<Box<dyn Resolver>> {
        let (parsed, factory) = self.lookup_factory(target)?;
        debug!("Creating {} resolver for {}", parsed.scheme, target);
        factory.build(&parsed, listener, options)
    }

    pub fn default_authority(&self, target: &str) -> Result<String> {
        let (parsed, factory) = self.lookup_factory(target)?;
        Ok(factory.default_authority(&parsed))
    }

    /// Registered schemes, sorted.
    pub fn schemes(&self) -> Vec<String> {
        let mut schemes: Vec<_> = self.inner.read().factories.keys().cloned().collect();
        schemes.sort();
        schemes
    }

    pub fn default_scheme(&self) -> Option<String> {
        self.inner.read().default_scheme.clone()
    }

    pub fn is_registered(&self, scheme: &str) -> bool {
        self.inner
            .read()
            .factories
            .contains_key(&scheme.to_ascii_lowercase())
    }

    fn lookup_factory(&self, target: &str) -> Result<(Target, Arc<dyn ResolverFactory>)> {
        let parsed = self.parse_target(target);
        let factory = self
            .inner
            .read()
            .factories
            .get(&parsed.scheme)
            .cloned()
            .ok_or_else(|| Error::NoResolver(target.to_owned()))?;
        Ok((parsed, factory))
    }
}

lazy_static::lazy_static! {
    static ref GLOBAL: ResolverRegistry = ResolverRegistry::new();
}

/// The process-wide registry used by the free functions of this module.
pub fn global() -> &'static ResolverRegistry {
    &GLOBAL
}

pub fn register_resolver(scheme: &str, factory: Arc<dyn ResolverFactory>, is_default: bool) {
    global().register(scheme, factory, is_default)
}

pub fn register_all() {
    global().register_all()
}

pub fn create_resolver(
    target: &str,
    listener: Arc<dyn ResolverListener>,
    options: ResolverOptions,
) -> Result<Box<dyn Resolver>> {
    global().create_resolver(target, listener, options)
}

pub fn default_authority(target: &str) -> Result<String> {
    global().default_authority(target)
}

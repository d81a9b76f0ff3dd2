//! Resolver for `unix:` targets: `unix:relative/path`, `unix:/abs/path` or
//! `unix:///abs/path`.

use super::{fixed::FixedResolver, Resolver, ResolverOptions};
use crate::{address::Address, registry::ResolverFactory, Error, ResolverListener, Result, Target};
use std::{path::PathBuf, sync::Arc};

#[derive(Debug, Default, Clone)]
pub struct UdsResolverFactory;

impl UdsResolverFactory {
    fn path(target: &Target) -> Result<PathBuf> {
        let path = match target.authority.as_deref() {
            None => target.path.clone(),
            Some("") => format!("/{}", target.path),
            Some(authority) => {
                return Err(Error::invalid_target(
                    target.to_string(),
                    format!("Unexpected authority {}", authority),
                ))
            }
        };

        if path.is_empty() || path == "/" {
            return Err(Error::invalid_target(target.to_string(), "Socket path is empty"));
        }

        Ok(PathBuf::from(path))
    }
}

impl ResolverFactory for UdsResolverFactory {
    fn build(
        &self,
        target: &Target,
        listener: Arc<dyn ResolverListener>,
        options: ResolverOptions,
    ) -> Result<Box<dyn Resolver>> {
        let address = Address::Unix(Self::path(target)?);
        Ok(Box::new(FixedResolver::new(vec![address], listener, &options)?))
    }

    fn default_authority(&self, _target: &Target) -> String {
        "localhost".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{listener::ResolutionEvent, testing::RecordingListener};
    use rstest::*;

    #[rstest]
    #[case(Target::new("unix", None, "relative/socket"), "relative/socket")]
    #[case(Target::new("unix", None, "/tmp/socket"), "/tmp/socket")]
    #[case(Target::new("unix", Some(""), "tmp/socket"), "/tmp/socket")]
    fn socket_paths(#[case] target: Target, #[case] expected: &str) {
        assert_eq!(UdsResolverFactory::path(&target).unwrap(), PathBuf::from(expected));
    }

    #[rstest]
    #[case(Target::new("unix", None, ""))]
    #[case(Target::new("unix", Some(""), ""))]
    #[case(Target::new("unix", Some("host"), "tmp/socket"))]
    fn invalid_targets(#[case] target: Target) {
        assert!(UdsResolverFactory::path(&target).is_err());
    }

    #[tokio::test]
    async fn resolves_path() {
        let listener = Arc::new(RecordingListener::default());
        let resolver = UdsResolverFactory
            .build(
                &Target::new("unix", Some(""), "tmp/grpc.sock"),
                listener.clone(),
                ResolverOptions::default(),
            )
            .unwrap();
        resolver.update_resolution();

        assert_eq!(
            listener.wait_for(1).await,
            vec![ResolutionEvent::Resolved {
                addresses: vec![Address::Unix(PathBuf::from("/tmp/grpc.sock"))],
                service_config: None,
                service_config_error: None,
            }]
        );
    }
}

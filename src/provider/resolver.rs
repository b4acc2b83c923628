//! Namespace-aware client resolution.

use crate::interface::ClientResolver;
use crate::provider::{OperationContext, ProviderError, ProviderMeta};
use crate::vault::VaultClient;
use std::sync::{Arc, PoisonError};
use tracing::{debug, info};

/// Returns the client a handler must use for `ctx`.
///
/// A context naming a namespace gets a client bound to that namespace
/// (relative to the provider's root namespace). A context naming none falls
/// back to the import namespace, then to the root client.
pub fn get_client<R: ClientResolver + ?Sized>(
    ctx: OperationContext<'_>,
    meta: &R,
) -> Result<Arc<VaultClient>, ProviderError> {
    let ns = match ctx.namespace() {
        Some(ns) => Some(ns),
        None => {
            let ns = meta.import_namespace().filter(|ns| !ns.is_empty());
            if let Some(ns) = ns {
                info!("Using import namespace {:?}", ns);
            }
            ns
        }
    };

    match ns {
        Some(ns) => meta.namespaced_client(ns),
        None => meta.root_client(),
    }
}

impl ClientResolver for ProviderMeta {
    fn root_client(&self) -> Result<Arc<VaultClient>, ProviderError> {
        self.root()
    }

    fn namespaced_client(&self, namespace: &str) -> Result<Arc<VaultClient>, ProviderError> {
        // Held across lookup and insert so each namespace is cloned exactly once.
        let mut cache = self
            .client_cache
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        let root = self.root()?;
        if self.config.is_none() {
            return Err(ProviderError::NotConfigured("config"));
        }

        let ns = namespace.trim_matches('/');
        if ns.is_empty() {
            return Err(ProviderError::EmptyNamespace);
        }
        let ns = match root.namespace() {
            Some(parent) => format!("{}/{}", parent, ns),
            None => ns.to_string(),
        };

        if let Some(client) = cache.get(&ns) {
            return Ok(client.clone());
        }

        debug!("Creating client for namespace {:?}", ns);
        let client = Arc::new(root.with_namespace(&ns)?);
        cache.insert(ns, client.clone());
        Ok(client)
    }

    fn import_namespace(&self) -> Option<&str> {
        self.config
            .as_ref()
            .and_then(|c| c.import_namespace.as_deref())
    }
}

impl ProviderMeta {
    /// Fully-qualified namespaces with a cached client, sorted.
    pub fn cached_namespaces(&self) -> Vec<String> {
        let mut namespaces: Vec<String> = self
            .client_cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        namespaces.sort();
        namespaces
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::context::FIELD_NAMESPACE;
    use crate::provider::{InstanceState, ProviderConfig, ResourceData};

    fn meta_with_root_namespace(root_ns: &str) -> ProviderMeta {
        let mut client = VaultClient::new("http://127.0.0.1:8200", "root").unwrap();
        client.set_namespace(root_ns).unwrap();
        ProviderMeta::new(
            client,
            ProviderConfig {
                namespace: Some(root_ns.to_string()),
                ..ProviderConfig::with_address("http://127.0.0.1:8200")
            },
        )
    }

    fn data_in(ns: &str) -> ResourceData {
        let mut d = ResourceData::default();
        d.set(FIELD_NAMESPACE, ns);
        d
    }

    #[test]
    fn test_namespace_without_root() {
        let meta = meta_with_root_namespace("");
        let client = get_client((&data_in("teamA")).into(), &meta).unwrap();
        assert_eq!(client.namespace(), Some("teamA"));
    }

    #[test]
    fn test_namespace_is_prefixed_with_root() {
        let meta = meta_with_root_namespace("corp");
        let client = get_client((&data_in("teamA")).into(), &meta).unwrap();
        assert_eq!(client.namespace(), Some("corp/teamA"));
    }

    #[test]
    fn test_no_namespace_returns_root_without_caching() {
        let meta = meta_with_root_namespace("corp");
        let client = get_client((&ResourceData::default()).into(), &meta).unwrap();
        assert!(Arc::ptr_eq(&client, &meta.root_client().unwrap()));
        assert_eq!(client.namespace(), Some("corp"));
        assert!(meta.cached_namespaces().is_empty());
    }

    #[test]
    fn test_slashes_are_trimmed() {
        let meta = meta_with_root_namespace("corp");
        let plain = get_client((&data_in("child")).into(), &meta).unwrap();
        let slashed = get_client((&data_in("/child/")).into(), &meta).unwrap();
        assert!(Arc::ptr_eq(&plain, &slashed));
        assert_eq!(slashed.namespace(), Some("corp/child"));
        assert_eq!(meta.cached_namespaces(), vec!["corp/child".to_string()]);
    }

    #[test]
    fn test_second_resolution_reuses_cached_client() {
        let meta = meta_with_root_namespace("");
        let first = meta.namespaced_client("teamA").unwrap();
        let second = meta.namespaced_client("teamA").unwrap();
        let other = meta.namespaced_client("teamB").unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert!(!Arc::ptr_eq(&first, &other));
        assert_eq!(meta.cached_namespaces(), vec!["teamA", "teamB"]);
    }

    #[test]
    fn test_empty_namespace_is_rejected() {
        for root in ["", "corp"] {
            let meta = meta_with_root_namespace(root);
            for ns in ["", "/", "//"] {
                let err = meta.namespaced_client(ns).unwrap_err();
                assert!(matches!(err, ProviderError::EmptyNamespace), "{root:?} {ns:?}");
            }
            // A context naming only slashes is not treated as "no namespace".
            let err = get_client((&data_in("/")).into(), &meta).unwrap_err();
            assert!(matches!(err, ProviderError::EmptyNamespace));
        }
    }

    #[test]
    fn test_instance_state_context() {
        let meta = meta_with_root_namespace("corp");
        let mut state = InstanceState::default();
        state
            .attributes
            .insert(FIELD_NAMESPACE.to_string(), "teamB".to_string());
        let client = get_client((&state).into(), &meta).unwrap();
        assert_eq!(client.namespace(), Some("corp/teamB"));
    }

    #[test]
    fn test_import_namespace_fallback() {
        let client = VaultClient::new("http://127.0.0.1:8200", "root").unwrap();
        let meta = ProviderMeta::new(
            client,
            ProviderConfig {
                import_namespace: Some("imported".into()),
                ..ProviderConfig::with_address("http://127.0.0.1:8200")
            },
        );
        let resolved = get_client((&InstanceState::default()).into(), &meta).unwrap();
        assert_eq!(resolved.namespace(), Some("imported"));

        // An explicit namespace wins over the import namespace.
        let resolved = get_client((&data_in("explicit")).into(), &meta).unwrap();
        assert_eq!(resolved.namespace(), Some("explicit"));
    }

    #[test]
    fn test_unconfigured_meta() {
        let meta = ProviderMeta::default();
        assert!(matches!(
            meta.namespaced_client("teamA"),
            Err(ProviderError::NotConfigured("client"))
        ));
        assert!(matches!(
            get_client((&ResourceData::default()).into(), &meta),
            Err(ProviderError::NotConfigured("client"))
        ));
    }

    #[test]
    fn test_clone_failure_is_not_cached() {
        let meta = meta_with_root_namespace("");
        let err = meta.namespaced_client("bad\u{7f}ns").unwrap_err();
        assert!(matches!(err, ProviderError::Vault(_)));
        assert!(meta.cached_namespaces().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_resolution_clones_once() {
        let meta = Arc::new(meta_with_root_namespace("corp"));
        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let meta = meta.clone();
                tokio::spawn(async move { meta.namespaced_client("shared").unwrap() })
            })
            .collect();

        let clients: Vec<Arc<VaultClient>> = futures::future::join_all(tasks)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();
        for client in &clients[1..] {
            assert!(Arc::ptr_eq(&clients[0], client));
        }
        assert_eq!(meta.cached_namespaces(), vec!["corp/shared"]);
    }
}

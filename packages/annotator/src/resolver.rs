//! Asynchronous identifier resolution.
//!
//! Minting the six URIs of an annotation is delegated to an
//! [`IdentifierResolver`]. [`resolve_uris`] runs the six calls concurrently
//! and settles only when all of them have; the caller decides what to do
//! with a failure or a cancellation (the tagger leaves the entity pending).

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::config::DEFAULT_BASE_URI;
use crate::error::{AnnotatorError, Result};
use crate::types::{AnnotationUris, EntityAnnotation};

/// Source of the URIs of an annotation, enabling mocking in tests.
#[async_trait]
pub trait IdentifierResolver: Send + Sync {
    async fn entity_uri(&self, entity: &EntityAnnotation) -> Result<String>;
    async fn annotation_uri(&self, entity: &EntityAnnotation) -> Result<String>;
    async fn document_uri(&self, entity: &EntityAnnotation) -> Result<String>;
    async fn target_uri(&self, entity: &EntityAnnotation) -> Result<String>;
    async fn selector_uri(&self, entity: &EntityAnnotation) -> Result<String>;
    async fn user_uri(&self, entity: &EntityAnnotation) -> Result<String>;
}

/// Resolve all six URIs of an entity.
///
/// An identifier chosen in a lookup replaces the minted entity URI.
///
/// # Errors
/// * `AnnotatorError::ResolutionCancelled` if `cancel` fires first
/// * `AnnotatorError::Resolution` if any resolver call fails
pub async fn resolve_uris(
    resolver: &dyn IdentifierResolver,
    entity: &EntityAnnotation,
    cancel: &CancellationToken,
) -> Result<AnnotationUris> {
    let joined = async {
        tokio::try_join!(
            resolver.entity_uri(entity),
            resolver.annotation_uri(entity),
            resolver.document_uri(entity),
            resolver.target_uri(entity),
            resolver.selector_uri(entity),
            resolver.user_uri(entity),
        )
    };

    let (entity_uri, annotation, document, target, selector, user) = tokio::select! {
        biased;

        () = cancel.cancelled() => {
            tracing::debug!(entity_id = %entity.id, "identifier resolution cancelled");
            return Err(AnnotatorError::ResolutionCancelled(entity.id.clone()));
        }
        result = joined => result.map_err(|e| AnnotatorError::Resolution {
            entity_id: entity.id.clone(),
            reason: e.to_string(),
        })?,
    };

    Ok(AnnotationUris {
        entity: entity.info.lookup_id().map_or(entity_uri, str::to_string),
        annotation,
        document,
        target,
        selector,
        user,
    })
}

/// In-memory resolver minting `{base}/{segment}/{n}` URIs from one counter.
#[derive(Debug)]
pub struct SequentialResolver {
    base: String,
    counter: AtomicU64,
}

impl SequentialResolver {
    #[must_use]
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into().trim_end_matches('/').to_string(),
            counter: AtomicU64::new(0),
        }
    }

    fn mint(&self, segment: &str) -> String {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{}/{segment}/{n}", self.base)
    }
}

impl Default for SequentialResolver {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URI)
    }
}

#[async_trait]
impl IdentifierResolver for SequentialResolver {
    async fn entity_uri(&self, entity: &EntityAnnotation) -> Result<String> {
        Ok(self.mint(entity.kind.as_str()))
    }

    async fn annotation_uri(&self, _entity: &EntityAnnotation) -> Result<String> {
        Ok(self.mint("annotation"))
    }

    async fn document_uri(&self, _entity: &EntityAnnotation) -> Result<String> {
        Ok(format!("{}/document", self.base))
    }

    async fn target_uri(&self, _entity: &EntityAnnotation) -> Result<String> {
        Ok(self.mint("target"))
    }

    async fn selector_uri(&self, _entity: &EntityAnnotation) -> Result<String> {
        Ok(self.mint("selector"))
    }

    async fn user_uri(&self, _entity: &EntityAnnotation) -> Result<String> {
        Ok(format!("{}/user/anonymous", self.base))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EntityInfo, EntityKind};
    use std::time::Duration;

    /// Resolver whose selector call never finishes or fails.
    struct StuckResolver {
        fail: bool,
    }

    #[async_trait]
    impl IdentifierResolver for StuckResolver {
        async fn entity_uri(&self, _entity: &EntityAnnotation) -> Result<String> {
            Ok("http://id.cwrc.ca/person/1".into())
        }

        async fn annotation_uri(&self, _entity: &EntityAnnotation) -> Result<String> {
            Ok("http://id.cwrc.ca/annotation/1".into())
        }

        async fn document_uri(&self, _entity: &EntityAnnotation) -> Result<String> {
            Ok("http://id.cwrc.ca/document".into())
        }

        async fn target_uri(&self, _entity: &EntityAnnotation) -> Result<String> {
            Ok("http://id.cwrc.ca/target/1".into())
        }

        async fn selector_uri(&self, entity: &EntityAnnotation) -> Result<String> {
            if self.fail {
                return Err(AnnotatorError::UnknownId(entity.id.clone()));
            }
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok("http://id.cwrc.ca/selector/1".into())
        }

        async fn user_uri(&self, _entity: &EntityAnnotation) -> Result<String> {
            Ok("http://id.cwrc.ca/user/1".into())
        }
    }

    #[tokio::test]
    async fn test_sequential_resolver_mints_all_uris() {
        let resolver = SequentialResolver::new("http://example.org/");
        let entity = EntityAnnotation::new("ent_1", EntityKind::Place);
        let uris = resolve_uris(&resolver, &entity, &CancellationToken::new()).await.unwrap();

        assert!(uris.entity.starts_with("http://example.org/place/"));
        assert!(uris.annotation.starts_with("http://example.org/annotation/"));
        assert_eq!(uris.document, "http://example.org/document");
        assert_ne!(uris.target, uris.selector);
    }

    #[tokio::test]
    async fn test_lookup_id_overrides_entity_uri() {
        let resolver = SequentialResolver::default();
        let entity = EntityAnnotation::new("ent_1", EntityKind::Person).with_info(
            EntityInfo::default().with_lookup(serde_json::json!({"id": "http://viaf.org/viaf/96994048"})),
        );
        let uris = resolve_uris(&resolver, &entity, &CancellationToken::new()).await.unwrap();
        assert_eq!(uris.entity, "http://viaf.org/viaf/96994048");
    }

    #[tokio::test]
    async fn test_cancellation_wins_over_pending_call() {
        let resolver = StuckResolver { fail: false };
        let entity = EntityAnnotation::new("ent_5", EntityKind::Person);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let result = resolve_uris(&resolver, &entity, &cancel).await;
        assert!(matches!(result, Err(AnnotatorError::ResolutionCancelled(id)) if id == "ent_5"));
    }

    #[tokio::test]
    async fn test_failure_is_reported_per_entity() {
        let resolver = StuckResolver { fail: true };
        let entity = EntityAnnotation::new("ent_6", EntityKind::Person);
        let result = resolve_uris(&resolver, &entity, &CancellationToken::new()).await;
        assert!(matches!(result, Err(AnnotatorError::Resolution { entity_id, .. }) if entity_id == "ent_6"));
    }
}

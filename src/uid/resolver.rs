//! UID Resolver
//!
//! Cache-first lookups against the uid table. On a miss exactly one point
//! lookup is made; the result is cached only when the store returned exactly
//! one cell.

use crate::store::StoreClient;
use crate::tsdb::{to_hex, KeyLayout};
use crate::uid::{Lookup, UidCache, UidError, UidKind, UidResult};
use std::sync::Arc;

/// Default name of the uid table
pub const DEFAULT_UID_TABLE: &str = "tsdb-uid";

/// Resolves identifiers to names and names to identifiers
#[derive(Clone)]
pub struct UidResolver {
    store: Arc<dyn StoreClient>,
    cache: Arc<UidCache>,
    table: String,
    layout: KeyLayout,
}

impl UidResolver {
    pub fn new(
        store: Arc<dyn StoreClient>,
        cache: Arc<UidCache>,
        table: impl Into<String>,
        layout: KeyLayout,
    ) -> Self {
        Self {
            store,
            cache,
            table: table.into(),
            layout,
        }
    }

    /// Get the shared cache
    pub fn cache(&self) -> &Arc<UidCache> {
        &self.cache
    }

    /// Resolve an id to its name
    pub async fn resolve_name(&self, kind: UidKind, id: &[u8]) -> UidResult<String> {
        let name = self.lookup(Lookup::Name, kind, id, |_| Ok(())).await?;
        Ok(String::from_utf8_lossy(&name).into_owned())
    }

    /// Resolve a name to its id, checking the id width against the key layout
    pub async fn resolve_id(&self, kind: UidKind, name: &str) -> UidResult<Vec<u8>> {
        let expected = match kind {
            UidKind::Metric => self.layout.metric_width,
            UidKind::TagKey | UidKind::TagValue => self.layout.tag_width,
        };

        self.lookup(Lookup::Id, kind, name.as_bytes(), |id| {
            if id.len() == expected {
                Ok(())
            } else {
                Err(UidError::WidthMismatch {
                    kind,
                    key: name.to_string(),
                    expected,
                    actual: id.len(),
                })
            }
        })
        .await
    }

    async fn lookup<F>(&self, lookup: Lookup, kind: UidKind, key: &[u8], validate: F) -> UidResult<Vec<u8>>
    where
        F: Fn(&[u8]) -> UidResult<()>,
    {
        if let Some(value) = self.cache.get(lookup, kind, key).await {
            return Ok(value);
        }

        let column = lookup.column(kind);
        let cells = self.store.get(&self.table, key, &column).await?;

        if cells.len() != 1 {
            return Err(UidError::NotFound {
                kind,
                key: display_key(lookup, key),
                cells: cells.len(),
            });
        }

        let value = cells.into_iter().map(|cell| cell.value).next().unwrap_or_default();
        validate(&value)?;

        tracing::debug!(
            kind = %kind,
            key = %display_key(lookup, key),
            column = %column,
            "resolved uid"
        );

        self.cache.insert(lookup, kind, key, value.clone()).await;
        Ok(value)
    }
}

/// Names print as text, ids as hex
fn display_key(lookup: Lookup, key: &[u8]) -> String {
    match lookup {
        Lookup::Id => String::from_utf8_lossy(key).into_owned(),
        Lookup::Name => to_hex(key),
    }
}

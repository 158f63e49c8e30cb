//! Folder path resolution
//!
//! Walks the primary-parent chain of a file up to the account root and
//! returns the folder names in root-to-leaf order, anchored under a fixed
//! root label. Only the first listed parent is followed; files with several
//! parents are placed under the first one.
//!
//! The top of the chain is usually the account root folder, whose name is
//! the root label itself (`My Drive`). That folder is not emitted a second
//! time, so keys read `My Drive/Top/...` rather than `My Drive/My Drive/Top/...`.
//! Parentless folders with any other name (shared drives, orphaned folders)
//! are kept as the first segment below the label.

use std::{collections::HashSet, sync::Arc};

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::{
    domain::{FileMeta, FolderCache},
    ports::IMetadataProvider,
};

/// Default bound on the number of ancestors visited
pub const DEFAULT_MAX_DEPTH: usize = 100;

/// Result of a path walk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderPath {
    /// Root label followed by folder names, root to leaf
    pub segments: Vec<String>,
    /// True when the walk was abandoned and the file placed at the root
    pub fallback: bool,
}

/// Resolves folder ancestry through a run-scoped cache
pub struct PathResolver {
    metadata: Arc<dyn IMetadataProvider>,
    root_label: String,
    max_depth: usize,
}

impl PathResolver {
    /// Creates a new PathResolver
    ///
    /// # Arguments
    ///
    /// * `metadata` - Provider used on cache misses
    /// * `root_label` - First segment of every path (e.g. `My Drive`)
    /// * `max_depth` - Maximum number of ancestors visited before giving up
    pub fn new(
        metadata: Arc<dyn IMetadataProvider>,
        root_label: impl Into<String>,
        max_depth: usize,
    ) -> Self {
        Self {
            metadata,
            root_label: root_label.into(),
            max_depth,
        }
    }

    pub fn root_label(&self) -> &str {
        &self.root_label
    }

    /// Resolve the folder path above `primary_parent`
    ///
    /// A non-folder or missing ancestor ends the walk; whatever was collected
    /// so far is the path. A cycle or a chain deeper than `max_depth` yields
    /// the root label alone with `fallback` set.
    ///
    /// # Errors
    ///
    /// Returns an error if a metadata lookup fails.
    pub async fn resolve(
        &self,
        primary_parent: Option<&str>,
        cache: &mut FolderCache,
    ) -> Result<FolderPath> {
        let mut names: Vec<String> = Vec::new();
        let mut visited: HashSet<String> = HashSet::new();
        let mut next = primary_parent.map(str::to_string);

        while let Some(parent_id) = next.take() {
            if visited.len() >= self.max_depth || !visited.insert(parent_id.clone()) {
                warn!(
                    parent_id = %parent_id,
                    depth = visited.len(),
                    max_depth = self.max_depth,
                    "Folder ancestry is cyclic or too deep; placing file at root"
                );
                return Ok(self.root_only(true));
            }

            let Some(folder) = self.lookup(&parent_id, cache).await? else {
                debug!(parent_id = %parent_id, "Ancestor not found; ending walk");
                break;
            };
            if !folder.is_folder() {
                break;
            }

            next = folder.primary_parent().map(str::to_string);
            if next.is_none() && folder.name == self.root_label {
                // the account root itself is represented by the label
                break;
            }
            names.push(folder.display_name().to_string());
        }

        let mut segments = Vec::with_capacity(names.len() + 1);
        segments.push(self.root_label.clone());
        segments.extend(names.into_iter().rev());
        Ok(FolderPath {
            segments,
            fallback: false,
        })
    }

    fn root_only(&self, fallback: bool) -> FolderPath {
        FolderPath {
            segments: vec![self.root_label.clone()],
            fallback,
        }
    }

    async fn lookup(&self, id: &str, cache: &mut FolderCache) -> Result<Option<FileMeta>> {
        if let Some(meta) = cache.get(id) {
            return Ok(Some(meta.clone()));
        }
        let fetched = self
            .metadata
            .get_metadata(id)
            .await
            .with_context(|| format!("Failed to fetch metadata for ancestor {id}"))?;
        if let Some(meta) = &fetched {
            cache.insert(id.to_string(), meta.clone());
        }
        Ok(fetched)
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        sync::atomic::{AtomicUsize, Ordering},
    };

    use super::*;
    use crate::domain::mime;

    struct MapMetadata {
        items: HashMap<String, FileMeta>,
        calls: AtomicUsize,
    }

    impl MapMetadata {
        fn new(items: Vec<FileMeta>) -> Self {
            Self {
                items: items.into_iter().map(|m| (m.id.clone(), m)).collect(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait::async_trait]
    impl IMetadataProvider for MapMetadata {
        async fn get_metadata(&self, id: &str) -> anyhow::Result<Option<FileMeta>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if id == "broken" {
                anyhow::bail!("HTTP 500");
            }
            Ok(self.items.get(id).cloned())
        }
    }

    fn folder(id: &str, name: &str, parent: Option<&str>) -> FileMeta {
        FileMeta {
            id: id.to_string(),
            name: name.to_string(),
            mime_type: mime::FOLDER.to_string(),
            parents: parent.map(|p| vec![p.to_string()]).unwrap_or_default(),
            ..Default::default()
        }
    }

    fn resolver(items: Vec<FileMeta>) -> (PathResolver, Arc<MapMetadata>) {
        let provider = Arc::new(MapMetadata::new(items));
        (
            PathResolver::new(provider.clone(), "My Drive", DEFAULT_MAX_DEPTH),
            provider,
        )
    }

    #[tokio::test]
    async fn test_walks_to_root_in_order() {
        let (resolver, _) = resolver(vec![
            folder("root", "My Drive", None),
            folder("top", "Top", Some("root")),
            folder("child", "Child", Some("top")),
        ]);
        let mut cache = FolderCache::new();
        let path = resolver.resolve(Some("child"), &mut cache).await.unwrap();
        assert_eq!(path.segments, vec!["My Drive", "Top", "Child"]);
        assert!(!path.fallback);
    }

    #[tokio::test]
    async fn test_root_label_is_not_repeated() {
        let (resolver, _) = resolver(vec![
            folder("root", "My Drive", None),
            folder("nested", "My Drive", Some("root")),
            folder("team", "Team", None),
            folder("child", "Child", Some("team")),
        ]);
        let mut cache = FolderCache::new();

        let path = resolver.resolve(Some("root"), &mut cache).await.unwrap();
        assert_eq!(path.segments, vec!["My Drive"]);

        // only the parentless root collapses into the label
        let path = resolver.resolve(Some("nested"), &mut cache).await.unwrap();
        assert_eq!(path.segments, vec!["My Drive", "My Drive"]);

        let path = resolver.resolve(Some("child"), &mut cache).await.unwrap();
        assert_eq!(path.segments, vec!["My Drive", "Team", "Child"]);
    }

    #[tokio::test]
    async fn test_no_parent_is_root() {
        let (resolver, provider) = resolver(vec![]);
        let mut cache = FolderCache::new();
        let path = resolver.resolve(None, &mut cache).await.unwrap();
        assert_eq!(path.segments, vec!["My Drive"]);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cache_avoids_repeat_fetches() {
        let (resolver, provider) = resolver(vec![
            folder("top", "Top", None),
            folder("child", "Child", Some("top")),
        ]);
        let mut cache = FolderCache::new();
        resolver.resolve(Some("child"), &mut cache).await.unwrap();
        resolver.resolve(Some("child"), &mut cache).await.unwrap();
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.hits(), 2);
    }

    #[tokio::test]
    async fn test_cycle_falls_back_to_root() {
        let (resolver, provider) = resolver(vec![
            folder("a", "A", Some("b")),
            folder("b", "B", Some("a")),
        ]);
        let mut cache = FolderCache::new();
        let path = resolver.resolve(Some("a"), &mut cache).await.unwrap();
        assert_eq!(path.segments, vec!["My Drive"]);
        assert!(path.fallback);
        assert!(provider.calls.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_depth_bound_falls_back_to_root() {
        let mut items = vec![folder("f0", "F0", None)];
        for i in 1..10 {
            items.push(folder(&format!("f{i}"), &format!("F{i}"), Some(&format!("f{}", i - 1))));
        }
        let provider = Arc::new(MapMetadata::new(items));
        let resolver = PathResolver::new(provider, "My Drive", 5);
        let mut cache = FolderCache::new();
        let path = resolver.resolve(Some("f9"), &mut cache).await.unwrap();
        assert!(path.fallback);
        assert_eq!(path.segments, vec!["My Drive"]);
    }

    #[tokio::test]
    async fn test_non_folder_ancestor_stops_walk() {
        let mut odd = folder("odd", "Odd", Some("top"));
        odd.mime_type = "application/pdf".to_string();
        let (resolver, _) = resolver(vec![folder("top", "Top", None), odd]);
        let mut cache = FolderCache::new();
        let path = resolver.resolve(Some("odd"), &mut cache).await.unwrap();
        assert_eq!(path.segments, vec!["My Drive"]);
        assert!(!path.fallback);
    }

    #[tokio::test]
    async fn test_missing_ancestor_keeps_collected_names() {
        let (resolver, _) = resolver(vec![folder("child", "Child", Some("gone"))]);
        let mut cache = FolderCache::new();
        let path = resolver.resolve(Some("child"), &mut cache).await.unwrap();
        assert_eq!(path.segments, vec!["My Drive", "Child"]);
    }

    #[tokio::test]
    async fn test_unnamed_folder_uses_id() {
        let (resolver, _) = resolver(vec![folder("fid", "", None)]);
        let mut cache = FolderCache::new();
        let path = resolver.resolve(Some("fid"), &mut cache).await.unwrap();
        assert_eq!(path.segments, vec!["My Drive", "fid"]);
    }

    #[tokio::test]
    async fn test_lookup_error_propagates() {
        let (resolver, _) = resolver(vec![folder("child", "Child", Some("broken"))]);
        let mut cache = FolderCache::new();
        let err = resolver.resolve(Some("child"), &mut cache).await.unwrap_err();
        assert!(err.to_string().contains("broken"));
    }
}

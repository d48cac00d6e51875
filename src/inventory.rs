//! Registry inventory snapshot
//!
//! An [`Inventory`] maps repository -> tag -> resolved manifest (digest plus
//! ordered blob list). It is rebuilt from the registry for every delete, since
//! the shared-blob accounting is only as good as the snapshot it reads.
//!
//! A tag pointing at a manifest list is recorded with the union of its child
//! manifests' blobs, so every platform image keeps its layers alive.
//!
//! The snapshot is not protected against concurrent changes to the registry:
//! a tag pushed after [`Inventory::build`] returns is invisible to it.

use crate::error::{RegistryError, Result};
use crate::logging::Logger;
use crate::registry::{ManifestRef, RegistryApi};
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, Default)]
pub struct Inventory {
    repositories: BTreeMap<String, BTreeMap<String, ManifestRef>>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Walk catalog -> tags -> manifest for the whole registry
    pub async fn build<R>(registry: &R, logger: &Logger) -> Result<Self>
    where
        R: RegistryApi + ?Sized,
    {
        let mut inventory = Inventory::new();

        let repositories = registry.catalog().await?;
        logger.verbose(&format!("Building inventory of {} repositories", repositories.len()));

        for repository in &repositories {
            let tags = registry.tags(repository).await?;
            // Repositories without tags still belong to the snapshot
            inventory.repositories.entry(repository.clone()).or_default();

            for tag in &tags {
                let mut manifest = registry.manifest(repository, tag).await?;
                if manifest.is_list() {
                    manifest.blobs = resolve_blobs(registry, repository, &manifest).await?;
                }
                logger.detail(&format!(
                    "{}:{} -> {} ({} blobs)",
                    repository,
                    tag,
                    manifest.digest,
                    manifest.blobs.len()
                ));
                inventory.insert(repository, tag, manifest);
            }
        }

        Ok(inventory)
    }

    pub fn insert(&mut self, repository: &str, tag: &str, manifest: ManifestRef) {
        self.repositories
            .entry(repository.to_string())
            .or_default()
            .insert(tag.to_string(), manifest);
    }

    pub fn repositories(&self) -> impl Iterator<Item = &str> {
        self.repositories.keys().map(|r| r.as_str())
    }

    pub fn tags(&self, repository: &str) -> Vec<&str> {
        self.repositories
            .get(repository)
            .map(|tags| tags.keys().map(|t| t.as_str()).collect())
            .unwrap_or_default()
    }

    pub fn manifest(&self, repository: &str, tag: &str) -> Option<&ManifestRef> {
        self.repositories.get(repository)?.get(tag)
    }

    pub fn blobs(&self, repository: &str, tag: &str) -> Option<&[String]> {
        self.manifest(repository, tag).map(|m| m.blobs.as_slice())
    }

    pub fn manifest_digest(&self, repository: &str, tag: &str) -> Option<&str> {
        self.manifest(repository, tag).map(|m| m.digest.as_str())
    }

    /// Other tags of the repository that would break if the tag's manifest
    /// were deleted: aliases of the same digest and manifest lists naming it
    pub fn manifest_referrers(&self, repository: &str, tag: &str) -> Vec<&str> {
        let Some(target) = self.manifest(repository, tag) else {
            return Vec::new();
        };

        self.repositories
            .get(repository)
            .into_iter()
            .flat_map(|tags| tags.iter())
            .filter(|(other, _)| other.as_str() != tag)
            .filter(|(_, manifest)| {
                manifest.digest == target.digest || manifest.manifests.contains(&target.digest)
            })
            .map(|(other, _)| other.as_str())
            .collect()
    }

    /// Union of blobs referenced by every other tag of the same repository.
    /// Sharing across repositories is not modeled.
    pub fn retained_blobs(&self, repository: &str, excluding_tag: &str) -> HashSet<&str> {
        self.repositories
            .get(repository)
            .into_iter()
            .flat_map(|tags| tags.iter())
            .filter(|(tag, _)| tag.as_str() != excluding_tag)
            .flat_map(|(_, manifest)| manifest.blobs.iter().map(|b| b.as_str()))
            .collect()
    }

    /// Blobs only the given tag references, in manifest order, each once
    pub fn deletable_blobs(&self, repository: &str, tag: &str) -> Result<Vec<String>> {
        let target = self
            .blobs(repository, tag)
            .ok_or_else(|| RegistryError::NotFound {
                resource: format!("tag {}:{}", repository, tag),
                code: None,
                message: None,
            })?;
        let retained = self.retained_blobs(repository, tag);

        let mut seen = HashSet::new();
        Ok(target
            .iter()
            .filter(|blob| !retained.contains(blob.as_str()))
            .filter(|blob| seen.insert(blob.as_str()))
            .cloned()
            .collect())
    }
}

/// Blobs a manifest keeps alive. For a manifest list this is the union of
/// its children's blobs in child order; nested lists are rejected.
pub async fn resolve_blobs<R>(
    registry: &R,
    repository: &str,
    manifest: &ManifestRef,
) -> Result<Vec<String>>
where
    R: RegistryApi + ?Sized,
{
    if !manifest.is_list() {
        return Ok(manifest.blobs.clone());
    }

    let mut seen = HashSet::new();
    let mut blobs = Vec::new();
    for child_digest in &manifest.manifests {
        let child = registry.manifest(repository, child_digest).await?;
        if child.is_list() {
            return Err(RegistryError::protocol(
                format!("manifest {}@{}", repository, child_digest),
                format!("nested manifest list inside {}", manifest.digest),
            ));
        }
        for blob in child.blobs {
            if seen.insert(blob.clone()) {
                blobs.push(blob);
            }
        }
    }

    Ok(blobs)
}

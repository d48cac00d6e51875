//! Image manager - image-level operations on top of the registry calls
//!
//! - Size aggregation: sum of the verified blob sizes of one image:tag
//! - Safe delete: remove a tag and only the blobs no sibling tag still needs
//! - Listing: repository:tag entries with optional size and digest

use crate::config::ListOptions;
use crate::error::{RegistryError, Result};
use crate::image::digest::DigestUtils;
use crate::inventory::{Inventory, resolve_blobs};
use crate::logging::Logger;
use crate::registry::RegistryApi;
use globset::{Glob, GlobMatcher};

/// Outcome of a completed safe delete
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteReport {
    pub repository: String,
    pub tag: String,
    pub manifest_digest: String,
    /// Blobs removed, in manifest order
    pub deleted_blobs: Vec<String>,
    /// Blobs of the tag left in place because another tag references them
    pub retained_blobs: Vec<String>,
}

/// One line of an image listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageEntry {
    pub repository: String,
    pub tag: String,
    pub size: Option<u64>,
    pub digest: Option<String>,
}

impl ImageEntry {
    pub fn name(&self) -> String {
        format!("{}:{}", self.repository, self.tag)
    }
}

pub struct ImageManager<R: RegistryApi> {
    registry: R,
    output: Logger,
}

impl<R: RegistryApi> ImageManager<R> {
    pub fn new(registry: R, output: Logger) -> Self {
        Self { registry, output }
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// Total size of an image's blobs, across all platforms for a manifest
    /// list. Strict: the first blob error aborts the sum
    pub async fn image_size(&self, repository: &str, tag: &str) -> Result<u64> {
        let manifest = self.registry.manifest(repository, tag).await?;
        let blobs = resolve_blobs(&self.registry, repository, &manifest).await?;

        let mut total: u64 = 0;
        for blob in &blobs {
            let size = self.registry.blob_size(repository, blob).await?;
            self.output
                .detail(&format!("{} {}", DigestUtils::short(blob), size));
            total = total.checked_add(size).ok_or_else(|| {
                RegistryError::protocol(
                    format!("image {}:{}", repository, tag),
                    format!("total size overflows at blob {} ({} bytes)", blob, size),
                )
            })?;
        }

        Ok(total)
    }

    /// Delete `repository:tag` without removing blobs other tags of the
    /// repository still reference.
    ///
    /// Blobs go first and the manifest last, so a failed blob delete leaves
    /// the tag resolvable. Not safe to run concurrently with another delete
    /// against the same repository, and a tag pushed after the inventory was
    /// taken can lose blobs it shares with the deleted tag.
    pub async fn delete_image(&self, repository: &str, tag: &str) -> Result<DeleteReport> {
        let image = format!("{}:{}", repository, tag);
        self.output.verbose(&format!("Building inventory before deleting {}", image));

        let inventory = Inventory::build(&self.registry, &self.output).await?;
        let manifest = inventory
            .manifest(repository, tag)
            .ok_or_else(|| RegistryError::NotFound {
                resource: format!("tag {}", image),
                code: None,
                message: None,
            })?
            .clone();

        // The manifest delete is keyed by digest; removing it would also
        // remove every alias and break lists that point at it
        let referrers = inventory.manifest_referrers(repository, tag);
        if !referrers.is_empty() {
            let reason = format!(
                "manifest {} is also referenced by tag(s) {}",
                manifest.digest,
                referrers.join(", ")
            );
            self.output
                .error(&format!("Refusing to delete {}: {}", image, reason));
            return Err(RegistryError::Aborted {
                source: Box::new(RegistryError::protocol(format!("tag {}", image), reason)),
                image,
                deleted: Vec::new(),
            });
        }

        let deletable = inventory.deletable_blobs(repository, tag)?;
        let retained: Vec<String> = manifest
            .blobs
            .iter()
            .filter(|blob| !deletable.contains(blob))
            .cloned()
            .collect();

        self.output.verbose(&format!(
            "{}: {} blob(s) to delete, {} shared with other tags",
            image,
            deletable.len(),
            retained.len()
        ));
        for blob in &retained {
            self.output.detail(&format!("keep   {}", blob));
        }
        if deletable.is_empty() {
            self.output.warning(&format!(
                "{} shares all its blobs with other tags; only the manifest will be deleted",
                image
            ));
        }

        let mut deleted = Vec::with_capacity(deletable.len());
        for blob in &deletable {
            self.output.detail(&format!("delete {}", blob));
            if let Err(e) = self.registry.delete_blob(repository, blob).await {
                self.output
                    .error(&format!("Failed to delete blob {} of {}: {}", blob, image, e));
                return Err(RegistryError::Aborted {
                    image,
                    deleted,
                    source: Box::new(e),
                });
            }
            deleted.push(blob.clone());
        }

        self.registry
            .delete_manifest(repository, &manifest.digest)
            .await?;
        self.output
            .success(&format!("Deleted {} ({})", image, manifest.digest));

        Ok(DeleteReport {
            repository: repository.to_string(),
            tag: tag.to_string(),
            manifest_digest: manifest.digest,
            deleted_blobs: deleted,
            retained_blobs: retained,
        })
    }

    /// List `repository:tag` entries whose repository matches `filter`.
    ///
    /// Tag, size and digest failures are reported and skipped so one broken
    /// image does not hide the rest of the registry.
    pub async fn list_images(
        &self,
        filter: Option<&str>,
        options: ListOptions,
    ) -> Result<Vec<ImageEntry>> {
        let matcher = filter.map(compile_filter).transpose()?;
        let repositories = self.registry.catalog().await?;

        let mut entries = Vec::new();
        for repository in repositories {
            if let Some(matcher) = &matcher {
                if !matcher.is_match(&repository) {
                    continue;
                }
            }

            let tags = match self.registry.tags(&repository).await {
                Ok(tags) => tags,
                Err(e) => {
                    self.output.error(&e.to_string());
                    continue;
                }
            };

            for tag in tags {
                let mut entry = ImageEntry {
                    repository: repository.clone(),
                    tag,
                    size: None,
                    digest: None,
                };

                if options.size {
                    match self.image_size(&entry.repository, &entry.tag).await {
                        Ok(size) => entry.size = Some(size),
                        Err(e) => self.output.error(&format!("{}: {}", entry.name(), e)),
                    }
                }

                if options.digest {
                    match self.registry.manifest(&entry.repository, &entry.tag).await {
                        Ok(manifest) => entry.digest = Some(manifest.digest),
                        Err(e) => self.output.error(&format!("{}: {}", entry.name(), e)),
                    }
                }

                entries.push(entry);
            }
        }

        Ok(entries)
    }
}

fn compile_filter(pattern: &str) -> Result<GlobMatcher> {
    Glob::new(pattern)
        .map(|glob| glob.compile_matcher())
        .map_err(|e| RegistryError::config(format!("invalid filter {:?}: {}", pattern, e)))
}

//! Runner: connects to the registry and executes one subcommand

use crate::cli::args::{Args, Command, parse_reference};
use crate::config::{ListOptions, verbose_from_env};
use crate::error::Result;
use crate::image::image_manager::{ImageEntry, ImageManager};
use crate::logging::Logger;
use crate::registry::{RegistryClient, RegistryClientBuilder};

pub struct Runner {
    args: Args,
    output: Logger,
}

impl Runner {
    pub fn new(args: Args) -> Self {
        let output = if args.quiet {
            Logger::new_quiet()
        } else {
            Logger::new(args.verbose || verbose_from_env())
        };

        Self { args, output }
    }

    pub fn output(&self) -> &Logger {
        &self.output
    }

    pub async fn run(&self) -> Result<()> {
        match &self.args.command {
            Command::List { filter, .. } => {
                let manager = ImageManager::new(self.connect().await?, self.output.clone());
                self.list(&manager, filter.as_deref(), self.args.list_options())
                    .await
            }
            Command::Delete { image } => {
                // Reject a malformed reference before any network traffic
                let (repository, tag) = parse_reference(image)?;
                let manager = ImageManager::new(self.connect().await?, self.output.clone());
                self.delete(&manager, &repository, &tag).await
            }
        }
    }

    async fn connect(&self) -> Result<RegistryClient> {
        let config = self.args.registry_config();
        self.output
            .verbose(&format!("Connecting to registry {}", config.address));

        RegistryClientBuilder::new(config)
            .with_logger(self.output.clone())
            .connect()
            .await
    }

    async fn list(
        &self,
        manager: &ImageManager<RegistryClient>,
        filter: Option<&str>,
        options: ListOptions,
    ) -> Result<()> {
        let entries = manager.list_images(filter, options).await?;
        for entry in &entries {
            self.output.output(&self.format_entry(entry, options));
        }
        self.output.verbose(&format!(
            "{} image(s) listed in {}",
            entries.len(),
            self.output.format_duration(self.output.elapsed())
        ));
        Ok(())
    }

    fn format_entry(&self, entry: &ImageEntry, options: ListOptions) -> String {
        let mut line = entry.name();
        if options.size {
            let size = match entry.size {
                Some(size) if options.bytes => size.to_string(),
                Some(size) => self.output.format_size(size),
                None => "-".to_string(),
            };
            line.push('\t');
            line.push_str(&size);
        }
        if options.digest {
            line.push('\t');
            line.push_str(entry.digest.as_deref().unwrap_or("-"));
        }
        line
    }

    async fn delete(
        &self,
        manager: &ImageManager<RegistryClient>,
        repository: &str,
        tag: &str,
    ) -> Result<()> {
        self.output
            .section(&format!("Deleting {}:{}", repository, tag));

        let report = manager.delete_image(repository, tag).await?;

        self.output.info(&format!(
            "{} blob(s) deleted, {} kept for other tags",
            report.deleted_blobs.len(),
            report.retained_blobs.len()
        ));
        self.output.list("Deleted blobs", &report.deleted_blobs);
        if !report.retained_blobs.is_empty() {
            self.output.list("Kept (used by other tags)", &report.retained_blobs);
        }
        self.output.output(&format!(
            "deleted {}:{} {}",
            report.repository, report.tag, report.manifest_digest
        ));
        Ok(())
    }
}

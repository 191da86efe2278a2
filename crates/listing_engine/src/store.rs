use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use engine_logging::{engine_debug, engine_info, engine_warn};
use listing_core::{
    normalize_category, normalize_title, DedupIndex, ListingRecord, MetadataField, Resolution,
};

use crate::fetch::ImageFetcher;
use crate::images::{encode_png, ImageError};
use crate::persist::{ensure_output_dir, AtomicFileWriter, PersistError};

pub const METADATA_FILENAME: &str = "metadata.txt";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistOutcome {
    Persisted {
        directory: PathBuf,
        images_saved: usize,
        images_reused: usize,
        images_failed: usize,
    },
    /// Content-equal listing already stored in `directory` during this run.
    Skipped { directory: PathBuf },
    Failed(String),
}

#[derive(Debug, Default)]
struct ImageTally {
    saved: usize,
    reused: usize,
    failed: usize,
}

/// Lays listings out under `{root}/{Category}/{title}[_n]/`.
pub struct PersistenceEngine {
    root: PathBuf,
    images: Arc<dyn ImageFetcher>,
    index: DedupIndex,
}

impl PersistenceEngine {
    pub fn new(root: PathBuf, images: Arc<dyn ImageFetcher>) -> Self {
        Self {
            root,
            images,
            index: DedupIndex::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn index(&self) -> &DedupIndex {
        &self.index
    }

    /// Normalized titles persisted more than once, sorted by title.
    pub fn collisions(&self) -> Vec<(String, usize)> {
        self.index.collisions()
    }

    /// Write `record` unless a content-equal listing was already written this run.
    ///
    /// Only a missing title or category is returned as an error; I/O problems
    /// become `PersistOutcome::Failed` and leave the index untouched.
    pub async fn persist(&mut self, record: &ListingRecord) -> Result<PersistOutcome, PersistError> {
        let title = record
            .title()
            .map(normalize_title)
            .filter(|title| !title.is_empty())
            .ok_or(PersistError::MissingRequiredField(MetadataField::Title))?;
        let category = record
            .get(MetadataField::CategoryName)
            .and_then(normalize_category)
            .ok_or(PersistError::MissingRequiredField(
                MetadataField::CategoryName,
            ))?;

        let category_dir = self.root.join(&category);
        if let Err(err) = ensure_output_dir(&category_dir) {
            return Ok(PersistOutcome::Failed(format!(
                "cannot prepare {}: {err}",
                category_dir.display()
            )));
        }

        let directory = match self.index.resolve(&category, &title, record) {
            Resolution::AlreadyPersisted {
                category,
                directory,
            } => {
                let directory = self.root.join(category).join(directory);
                engine_info!("Unchanged listing {title}, already in {}", directory.display());
                return Ok(PersistOutcome::Skipped { directory });
            }
            Resolution::Exhausted => {
                return Ok(PersistOutcome::Failed(format!(
                    "no free directory name for {category}/{title}"
                )));
            }
            Resolution::Target { directory } => directory,
        };

        let writer = AtomicFileWriter::new(category_dir.join(&directory));
        let metadata = record.to_metadata_text();
        let metadata_path = writer.dir().join(METADATA_FILENAME);
        let unchanged = fs::read(&metadata_path)
            .map(|existing| existing == metadata.as_bytes())
            .unwrap_or(false);
        // Pictures of a different listing never stay next to this metadata.
        let keep = if unchanged {
            record.image_urls().len()
        } else {
            0
        };
        if let Err(err) = remove_stale_images(writer.dir(), &title, keep) {
            return Ok(PersistOutcome::Failed(format!(
                "cannot clear old images in {}: {err}",
                writer.dir().display()
            )));
        }
        if unchanged {
            engine_debug!("Unchanged {}", metadata_path.display());
        } else {
            if let Err(err) = writer.write(METADATA_FILENAME, &metadata) {
                return Ok(PersistOutcome::Failed(format!(
                    "cannot write {}: {err}",
                    metadata_path.display()
                )));
            }
            engine_debug!("Wrote {}", metadata_path.display());
        }

        let tally = self.persist_images(record, &title, &writer, unchanged).await;
        self.index.register(&category, &title, &directory, record);

        Ok(PersistOutcome::Persisted {
            directory: writer.dir().to_path_buf(),
            images_saved: tally.saved,
            images_reused: tally.reused,
            images_failed: tally.failed,
        })
    }

    async fn persist_images(
        &self,
        record: &ListingRecord,
        title: &str,
        writer: &AtomicFileWriter,
        metadata_unchanged: bool,
    ) -> ImageTally {
        let mut tally = ImageTally::default();
        for (index, url) in record.image_urls().iter().enumerate() {
            let filename = format!("{title}{index}.png");
            // Same listing as a previous run: keep pictures already on disk.
            if metadata_unchanged && writer.dir().join(&filename).is_file() {
                engine_debug!("Reusing {filename}");
                tally.reused += 1;
                continue;
            }
            match self.save_image(url, writer, &filename).await {
                Ok(path) => {
                    engine_debug!("Saved {}", path.display());
                    tally.saved += 1;
                }
                Err(err) => {
                    engine_warn!("Skipping image {index} of {title} ({url}): {err}");
                    tally.failed += 1;
                }
            }
        }
        tally
    }

    async fn save_image(
        &self,
        url: &str,
        writer: &AtomicFileWriter,
        filename: &str,
    ) -> Result<PathBuf, ImageError> {
        let bytes = self.images.fetch_image(url).await?;
        let png = encode_png(&bytes)?;
        Ok(writer.write_bytes(filename, &png)?)
    }
}

/// Delete `{title}{i}.png` for every `i >= keep` in `dir`.
fn remove_stale_images(dir: &Path, title: &str, keep: usize) -> io::Result<()> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(err),
    };
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name();
        let index = name
            .to_str()
            .and_then(|name| name.strip_prefix(title))
            .and_then(|rest| rest.strip_suffix(".png"))
            .filter(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|digits| digits.parse::<usize>().ok());
        if index.is_some_and(|index| index >= keep) {
            fs::remove_file(entry.path())?;
            engine_debug!("Removed stale {}", entry.path().display());
        }
    }
    Ok(())
}

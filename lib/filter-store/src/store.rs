//! Filesystem-backed artifact store
//!
//! Layout under the root:
//! - `entered_images/<id>.<ext>` original uploads, extension from the detected format
//! - `filtered_images/<id>.<ext>` filter outputs
//! - `records/<id>.json` one [`Record`] per artifact

use crate::record::{EnteredImage, FilteredImage, Record};
use anyhow::{Context, Result, bail};
use chrono::Utc;
use image_filter::{FilterDispatcher, FilterOutput, FilterPipeline, codec};
use std::{
    fs,
    path::{Path, PathBuf},
};
use uuid::Uuid;

pub const ENTERED_DIR: &str = "entered_images";
pub const FILTERED_DIR: &str = "filtered_images";
pub const RECORDS_DIR: &str = "records";

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// Open a store rooted at `root`, creating its directories if needed.
    ///
    /// # Errors
    /// Returns an error if any of the directories cannot be created
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        for dir in [ENTERED_DIR, FILTERED_DIR, RECORDS_DIR] {
            let path = root.join(dir);
            fs::create_dir_all(&path)
                .with_context(|| format!("create store directory {}", path.display()))?;
        }

        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Persist an uploaded original.
    ///
    /// The bytes must decode as an image; nothing is written otherwise.
    ///
    /// # Arguments
    /// * `bytes` - Encoded image as received from the uploader
    ///
    /// # Errors
    /// Returns an error if:
    /// - The bytes are not a readable image
    /// - The image file or its record cannot be written
    pub fn save_entered(&self, bytes: &[u8]) -> Result<EnteredImage> {
        let format = codec::detect_format(bytes).context("unrecognized upload")?;
        codec::decode(bytes).context("upload is not a readable image")?;

        let id = Uuid::new_v4();
        let ext = format.extensions_str().first().copied().unwrap_or("bin");
        let image_file = Path::new(ENTERED_DIR).join(format!("{id}.{ext}"));
        self.write_file(&image_file, bytes)?;

        let record = EnteredImage {
            id,
            created_at: Utc::now(),
            image_file,
        };
        if let Err(e) = self.write_record(&Record::Entered(record.clone())) {
            self.discard(id, &record.image_file);
            return Err(e);
        }

        log::info!("saved entered image {id} ({} bytes)", bytes.len());
        Ok(record)
    }

    /// Apply `identifier` to a stored original with the global catalog.
    pub fn apply_filter(
        &self,
        entered_id: Uuid,
        identifier: &str,
        pipeline: &FilterPipeline,
    ) -> Result<FilteredImage> {
        self.apply_filter_with(&FilterDispatcher::default(), entered_id, identifier, pipeline)
    }

    /// Apply `identifier` to a stored original and persist the output.
    ///
    /// # Arguments
    /// * `dispatcher` - Catalog to resolve the filter against
    /// * `entered_id` - Id of an [`EnteredImage`] in this store
    /// * `identifier` - Filter name, e.g. `sepia`
    /// * `pipeline` - Output format settings
    ///
    /// # Errors
    /// Returns an error if the original is missing or the filter fails. A
    /// failed filter leaves no file or record behind.
    pub fn apply_filter_with(
        &self,
        dispatcher: &FilterDispatcher<'_>,
        entered_id: Uuid,
        identifier: &str,
        pipeline: &FilterPipeline,
    ) -> Result<FilteredImage> {
        let source = self.entered(entered_id)?;
        let bytes = self.read_image(&source.image_file)?;

        let output = pipeline
            .run_with(dispatcher, identifier, &bytes)
            .with_context(|| format!("apply `{identifier}` to {entered_id}"))?;

        self.save_filtered(&source, &output)
    }

    /// Filter an upload and persist both sides. The filter runs first, so
    /// rejected uploads leave nothing behind.
    pub fn upload_and_filter(
        &self,
        bytes: &[u8],
        identifier: &str,
        pipeline: &FilterPipeline,
    ) -> Result<(EnteredImage, FilteredImage)> {
        self.upload_and_filter_with(&FilterDispatcher::default(), bytes, identifier, pipeline)
    }

    pub fn upload_and_filter_with(
        &self,
        dispatcher: &FilterDispatcher<'_>,
        bytes: &[u8],
        identifier: &str,
        pipeline: &FilterPipeline,
    ) -> Result<(EnteredImage, FilteredImage)> {
        let output = pipeline
            .run_with(dispatcher, identifier, bytes)
            .with_context(|| format!("apply `{identifier}` to upload"))?;

        let entered = self.save_entered(bytes)?;
        match self.save_filtered(&entered, &output) {
            Ok(filtered) => Ok((entered, filtered)),
            Err(e) => {
                self.discard(entered.id, &entered.image_file);
                Err(e)
            }
        }
    }

    fn save_filtered(&self, source: &EnteredImage, output: &FilterOutput) -> Result<FilteredImage> {
        let id = Uuid::new_v4();
        let image_file =
            Path::new(FILTERED_DIR).join(format!("{id}.{}", output.format.extension()));
        self.write_file(&image_file, &output.bytes)?;

        let record = FilteredImage {
            id,
            created_at: Utc::now(),
            image_file,
            source_id: source.id,
            filter: output.filter.to_string(),
        };
        if let Err(e) = self.write_record(&Record::Filtered(record.clone())) {
            self.discard(id, &record.image_file);
            return Err(e);
        }

        log::info!(
            "saved filtered image {id} from {} with `{}`",
            source.id,
            output.filter
        );
        Ok(record)
    }

    pub fn entered(&self, id: Uuid) -> Result<EnteredImage> {
        match self.record(id)? {
            Record::Entered(r) => Ok(r),
            Record::Filtered(_) => bail!("{id} is a filtered image, not an upload"),
        }
    }

    pub fn filtered(&self, id: Uuid) -> Result<FilteredImage> {
        match self.record(id)? {
            Record::Filtered(r) => Ok(r),
            Record::Entered(_) => bail!("{id} is an upload, not a filtered image"),
        }
    }

    /// All filtered images derived from `source_id`, oldest first.
    pub fn filtered_for(&self, source_id: Uuid) -> Result<Vec<FilteredImage>> {
        let mut items = self
            .records()?
            .into_iter()
            .filter_map(|record| match record {
                Record::Filtered(r) if r.source_id == source_id => Some(r),
                _ => None,
            })
            .collect::<Vec<_>>();

        items.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(items)
    }

    pub fn records(&self) -> Result<Vec<Record>> {
        let mut items = vec![];
        for entry in fs::read_dir(self.root.join(RECORDS_DIR))? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                items.push(read_record(&path)?);
            }
        }

        Ok(items)
    }

    pub fn read_image(&self, image_file: &Path) -> Result<Vec<u8>> {
        let path = self.root.join(image_file);
        fs::read(&path).with_context(|| format!("read {}", path.display()))
    }

    fn record(&self, id: Uuid) -> Result<Record> {
        let path = self.record_path(id);
        if !path.exists() {
            bail!("no record for {id}");
        }

        read_record(&path)
    }

    fn record_path(&self, id: Uuid) -> PathBuf {
        self.root.join(RECORDS_DIR).join(format!("{id}.json"))
    }

    fn write_file(&self, relative: &Path, bytes: &[u8]) -> Result<()> {
        let path = self.root.join(relative);
        fs::write(&path, bytes).with_context(|| format!("write {}", path.display()))
    }

    fn write_record(&self, record: &Record) -> Result<()> {
        let path = self.record_path(record.id());
        let tmp = path.with_extension("json.tmp");

        fs::write(&tmp, serde_json::to_vec_pretty(record)?)
            .with_context(|| format!("write record {}", tmp.display()))?;
        fs::rename(&tmp, &path).with_context(|| format!("write record {}", path.display()))?;
        Ok(())
    }

    /// Best-effort removal of a half-written artifact.
    fn discard(&self, id: Uuid, image_file: &Path) {
        let record = self.record_path(id);
        for path in [self.root.join(image_file), record.with_extension("json.tmp"), record] {
            if !path.exists() {
                continue;
            }

            if let Err(e) = fs::remove_file(&path) {
                log::warn!("remove {} failed: {e}", path.display());
            }
        }
    }
}

fn read_record(path: &Path) -> Result<Record> {
    let text = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parse {}", path.display()))
}

use std::path::{Path, PathBuf};
use std::sync::Arc;

use migrator_core::{Field, Row, RowError, RowOutcome, RowProcessor, RowSchema};
use migrator_logging::{migrator_debug, migrator_warn};

use crate::extract::{collect_image_sources, extract_plain_text};
use crate::fetch::MediaFetcher;
use crate::filename::storage_folder_name;
use crate::normalize::TextNormalizer;
use crate::transform::{HtmlTransformer, TransformOptions};

pub const DEFAULT_MEDIA_ROOT: &str = "DownloadedImages";
pub const HERO_SUBFOLDER: &str = "HEROIMAGE";

/// Single-image columns and whether they go to the hero subfolder.
const SINGLE_IMAGE_FIELDS: [(Field, bool); 3] = [
    (Field::HeroImageUrl, true),
    (Field::PreviewImageUrl, false),
    (Field::PreviewImageMediumUrl, false),
];

/// External collaborators a row needs.
#[derive(Clone)]
pub struct Capabilities {
    pub normalizer: Arc<dyn TextNormalizer>,
    pub fetcher: Arc<dyn MediaFetcher>,
}

#[derive(Debug, Clone)]
pub struct ProcessorSettings {
    pub media_root: PathBuf,
    pub hero_subfolder: String,
    pub transform: TransformOptions,
}

impl Default for ProcessorSettings {
    fn default() -> Self {
        Self {
            media_root: PathBuf::from(DEFAULT_MEDIA_ROOT),
            hero_subfolder: HERO_SUBFOLDER.to_string(),
            transform: TransformOptions::default(),
        }
    }
}

/// Turns one CMS export row into its migrated form, downloading its media
/// into `{media_root}/{slug}/` on the way.
pub struct ArticleProcessor {
    capabilities: Capabilities,
    settings: ProcessorSettings,
    transformer: HtmlTransformer,
}

impl ArticleProcessor {
    pub fn new(capabilities: Capabilities, settings: ProcessorSettings) -> Self {
        let transformer = HtmlTransformer::new(settings.transform);
        Self {
            capabilities,
            settings,
            transformer,
        }
    }

    /// Output columns: the input minus `status` and `all_images`.
    pub fn output_schema(input: &RowSchema) -> RowSchema {
        input.without(&[Field::Status, Field::AllImages])
    }

    fn normalize(&self, index: usize, text: &str) -> String {
        match self.capabilities.normalizer.normalize(text) {
            Ok(normalized) => normalized,
            Err(err) => {
                migrator_warn!("Row {}: keeping text unnormalized: {}", index, err);
                text.to_string()
            }
        }
    }

    /// Fetch `url` into `folder`; failures are logged and yield `None`.
    fn store(&self, index: usize, url: &str, folder: &Path) -> Option<String> {
        match self.capabilities.fetcher.fetch_and_store(url, folder) {
            Ok(stored) => {
                migrator_debug!("Row {}: {} -> {:?} ({:?})", index, url, stored.path, stored.status);
                Some(stored.filename)
            }
            Err(err) => {
                migrator_warn!("Row {}: media fetch failed for {}: {}", index, url, err);
                None
            }
        }
    }
}

impl RowProcessor for ArticleProcessor {
    fn process(&self, row: &Row) -> Result<RowOutcome, RowError> {
        if !row.is_well_formed() {
            return Err(RowError::Malformed(format!(
                "expected {} cells, found {}",
                row.schema().len(),
                row.cells().len()
            )));
        }
        let is_draft = row
            .get(Field::Status)
            .is_some_and(|status| status.trim().eq_ignore_ascii_case("draft"));
        if is_draft {
            return Ok(RowOutcome::Filtered);
        }

        let index = row.original_index();
        let schema = row.schema();
        let title = row.get(Field::Name).map(|name| self.normalize(index, name));
        let folder = self
            .settings
            .media_root
            .join(storage_folder_name(title.as_deref(), index));
        let mut out = row.clone();

        if schema.has(Field::PlainContent) {
            let text = row
                .get(Field::PlainContent)
                .map(|content| extract_plain_text(&self.normalize(index, content)));
            out.set(Field::PlainContent, text);
        }

        if let Some(body) = row.get(Field::RichBody) {
            let body = self.normalize(index, body);
            for src in collect_image_sources(&body) {
                self.store(index, &src, &folder);
            }
            out.set(Field::RichBody, Some(self.transformer.transform(&body)));
        }

        for (field, hero) in SINGLE_IMAGE_FIELDS {
            if !schema.has(field) {
                continue;
            }
            let target = if hero {
                folder.join(&self.settings.hero_subfolder)
            } else {
                folder.clone()
            };
            let filename = row
                .get(field)
                .map(str::trim)
                .filter(|url| !url.is_empty())
                .and_then(|url| self.store(index, url, &target))
                .unwrap_or_default();
            out.set(field, Some(filename));
        }

        if let Some(list) = row.get(Field::AllImages) {
            for url in list.split('|').map(str::trim).filter(|url| !url.is_empty()) {
                self.store(index, url, &folder);
            }
        }

        let mut out = out.project(Arc::new(Self::output_schema(schema)));
        for cell in out.cells_mut() {
            if let Some(text) = cell.as_mut() {
                *text = self.normalize(index, text);
            }
        }
        Ok(RowOutcome::Completed(out))
    }
}

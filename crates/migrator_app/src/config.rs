//! Run configuration, optionally loaded from a RON file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use migrator_core::{CoordinatorSettings, Field, FieldMapping, DEFAULT_BATCH_SIZE};
use migrator_engine::{
    FetchSettings, LinkMode, ProcessorSettings, TransformOptions, DEFAULT_MEDIA_ROOT,
    HERO_SUBFOLDER,
};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
pub enum LinkHandling {
    /// Keep links, pointing them at the URL path.
    Rewrite,
    /// Remove link wrappers, keeping their text.
    Unwrap,
}

impl From<LinkHandling> for LinkMode {
    fn from(value: LinkHandling) -> Self {
        match value {
            LinkHandling::Rewrite => LinkMode::RewriteHref,
            LinkHandling::Unwrap => LinkMode::Unwrap,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub redirect_limit: usize,
    pub max_bytes: u64,
    pub allowed_content_types: Vec<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        let defaults = FetchSettings::default();
        Self {
            connect_timeout_secs: defaults.connect_timeout.as_secs(),
            request_timeout_secs: defaults.request_timeout.as_secs(),
            redirect_limit: defaults.redirect_limit,
            max_bytes: defaults.max_bytes,
            allowed_content_types: defaults.allowed_content_types,
        }
    }
}

/// Header overrides; unset entries keep the CMS export defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ColumnConfig {
    pub status: Option<String>,
    pub name: Option<String>,
    pub plain_content: Option<String>,
    pub rich_body: Option<String>,
    pub hero_image: Option<String>,
    pub preview_image: Option<String>,
    pub preview_image_medium: Option<String>,
    pub all_images: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MigratorConfig {
    pub batch_size: usize,
    pub max_passes: Option<usize>,
    pub media_dir: PathBuf,
    pub hero_subfolder: String,
    pub report_dir: Option<PathBuf>,
    pub link_handling: LinkHandling,
    pub fetch: FetchConfig,
    pub columns: ColumnConfig,
}

impl Default for MigratorConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            max_passes: None,
            media_dir: PathBuf::from(DEFAULT_MEDIA_ROOT),
            hero_subfolder: HERO_SUBFOLDER.to_string(),
            report_dir: None,
            link_handling: LinkHandling::Rewrite,
            fetch: FetchConfig::default(),
            columns: ColumnConfig::default(),
        }
    }
}

impl MigratorConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(ron::from_str(content)?)
    }

    pub fn coordinator_settings(&self) -> CoordinatorSettings {
        CoordinatorSettings {
            batch_size: self.batch_size,
            max_passes: self.max_passes,
        }
    }

    pub fn processor_settings(&self) -> ProcessorSettings {
        ProcessorSettings {
            media_root: self.media_dir.clone(),
            hero_subfolder: self.hero_subfolder.clone(),
            transform: TransformOptions {
                link_mode: self.link_handling.into(),
            },
        }
    }

    pub fn fetch_settings(&self) -> FetchSettings {
        FetchSettings {
            connect_timeout: Duration::from_secs(self.fetch.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.fetch.request_timeout_secs),
            redirect_limit: self.fetch.redirect_limit,
            max_bytes: self.fetch.max_bytes,
            allowed_content_types: self.fetch.allowed_content_types.clone(),
        }
    }

    pub fn field_mapping(&self) -> FieldMapping {
        let columns = &self.columns;
        let overrides = [
            (Field::Status, &columns.status),
            (Field::Name, &columns.name),
            (Field::PlainContent, &columns.plain_content),
            (Field::RichBody, &columns.rich_body),
            (Field::HeroImageUrl, &columns.hero_image),
            (Field::PreviewImageUrl, &columns.preview_image),
            (Field::PreviewImageMediumUrl, &columns.preview_image_medium),
            (Field::AllImages, &columns.all_images),
        ];
        overrides
            .into_iter()
            .fold(FieldMapping::default(), |mapping, (field, header)| match header {
                Some(header) => mapping.with_header(field, header),
                None => mapping,
            })
    }
}

//! Migrator engine: HTML rewriting, text cleanup and media IO for CMS rows.
mod decode;
mod dom;
mod extract;
mod fetch;
mod filename;
mod normalize;
mod persist;
mod processor;
mod report;
mod slug;
mod transform;
mod types;

pub use decode::{decode_export, DecodeError, DecodedText};
pub use extract::{collect_image_sources, extract_plain_text};
pub use fetch::{FetchSettings, MediaFetcher, ReqwestMediaFetcher};
pub use filename::{fallback_media_filename, media_filename, reference_path, storage_folder_name};
pub use normalize::{NormalizeError, TextNormalizer, UnicodeCleanup};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use processor::{
    ArticleProcessor, Capabilities, ProcessorSettings, DEFAULT_MEDIA_ROOT, HERO_SUBFOLDER,
};
pub use report::{write_failure_report, ReportError, ReportOptions, ReportPaths};
pub use slug::{slugify, slugify_heading};
pub use transform::{
    strip_cms_comments, strip_enumeration, HtmlTransformer, LinkMode, TocEntry, TransformOptions,
    TransformOutput,
};
pub use types::{FailureKind, FetchError, StoreStatus, StoredMedia};

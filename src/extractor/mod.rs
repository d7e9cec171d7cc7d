pub mod api;
pub mod models;
pub mod selector;
pub mod traits;

pub use api::ApiExtractor;
pub use models::{Format, MediaKind, VideoInfo};
pub use selector::{select_format, select_format_with, QualityPolicy, SelectionOptions};
pub use traits::MetadataProvider;

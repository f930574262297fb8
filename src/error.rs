use std::path::PathBuf;
use thiserror::Error;

/// Why an annotation file could not be turned into an [`AnnotationRecord`].
///
/// [`AnnotationRecord`]: crate::types::AnnotationRecord
#[derive(Debug, Error)]
pub enum AnnotationIssue {
    #[error("invalid XML: {0}")]
    Xml(#[from] quick_xml::DeError),

    #[error("missing required element `{0}`")]
    MissingField(String),

    #[error("element `{field}` is not a valid number: {value:?}")]
    InvalidNumber { field: String, value: String },

    #[error("image size must be positive, got {width}x{height}")]
    EmptyImage { width: u32, height: u32 },
}

/// Errors raised while converting a VOC dataset.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("missing annotation for {}: {} does not exist", .image.display(), .annotation.display())]
    MissingAnnotation { image: PathBuf, annotation: PathBuf },

    #[error("failed to parse annotation {}: {reason}", .path.display())]
    AnnotationParse {
        path: PathBuf,
        #[source]
        reason: AnnotationIssue,
    },

    #[error("failed to re-encode image {}: {source}", .path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported output image extension: {0}")]
    UnsupportedOutputExtension(String),

    #[error("the class list is empty")]
    EmptyClassList,
}

impl ConvertError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Short name of the error kind, used in the final failure report.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingAnnotation { .. } => "MissingAnnotationError",
            Self::AnnotationParse { .. } => "AnnotationParseError",
            Self::Image { .. } => "ImageError",
            Self::Io { .. } => "IoError",
            Self::UnsupportedOutputExtension(_) | Self::EmptyClassList => "ConfigError",
        }
    }

    /// Whether the annotation-error policy applies to this error.
    pub fn is_annotation_error(&self) -> bool {
        matches!(
            self,
            Self::MissingAnnotation { .. } | Self::AnnotationParse { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ConvertError>;

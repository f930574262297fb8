//! Pascal VOC to YOLO format converter
//!
//! This library converts Pascal VOC XML annotations to YOLO label files and re-encodes
//! the matching images to a single output format.

pub mod config;
pub mod conversion;
pub mod dataset;
pub mod error;
pub mod io;
pub mod types;
pub mod utils;
pub mod voc;

// Re-export commonly used types and functions
pub use config::{Args, ConvertConfig, OnAnnotationError};
pub use conversion::{convert_record, normalize, render_label_file};
pub use dataset::{convert_dataset, run};
pub use error::{AnnotationIssue, ConvertError};
pub use io::setup_output_directories;
pub use types::{
    AnnotatedObject, AnnotationRecord, ClassRegistry, ImageDimensions, NormalizedBox, OutputDirs,
    PixelBox, ProcessingStats,
};

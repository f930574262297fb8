use std::path::PathBuf;

// Input image extensions accepted when none are given on the command line
pub const DEFAULT_INPUT_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

// Extension every exported image is re-encoded to by default
pub const DEFAULT_OUTPUT_EXTENSION: &str = "jpg";

// A progress line is logged every time this many images have been converted
pub const PROGRESS_LOG_INTERVAL: usize = 500;

/// Pixel size of an annotated image, read from the `<size>` element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

/// Axis-aligned box in pixel coordinates, in VOC field order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelBox {
    pub xmin: f64,
    pub xmax: f64,
    pub ymin: f64,
    pub ymax: f64,
}

/// YOLO box: center and size relative to the image dimensions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedBox {
    pub x_center: f64,
    pub y_center: f64,
    pub width: f64,
    pub height: f64,
}

// A single labeled object of a VOC annotation
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedObject {
    pub label: String,
    pub difficult: bool,
    pub bbox: PixelBox,
}

// The validated contents of one VOC annotation file
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationRecord {
    pub filename: Option<String>,
    pub size: ImageDimensions,
    pub objects: Vec<AnnotatedObject>,
}

/// Ordered list of class names. A class's position is its YOLO class ID.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassRegistry {
    names: Vec<String>,
}

impl ClassRegistry {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Position of the first entry equal to `label`.
    pub fn class_id(&self, label: &str) -> Option<usize> {
        self.names.iter().position(|name| name == label)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

// Paths of the output directories
#[derive(Debug, Clone)]
pub struct OutputDirs {
    pub root: PathBuf,
    pub images_dir: PathBuf,
    pub labels_dir: PathBuf,
}

// Struct to hold processing statistics
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProcessingStats {
    pub images_converted: usize,
    pub images_skipped: usize,
    pub objects_written: usize,
    pub objects_difficult: usize,
    pub objects_unlisted: usize,
}

impl ProcessingStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn merge(&mut self, other: &ProcessingStats) {
        self.images_converted += other.images_converted;
        self.images_skipped += other.images_skipped;
        self.objects_written += other.objects_written;
        self.objects_difficult += other.objects_difficult;
        self.objects_unlisted += other.objects_unlisted;
    }

    pub fn print_summary(&self) {
        log::info!("=== Conversion Summary ===");
        log::info!("Images converted: {}", self.images_converted);
        log::info!("Objects written: {}", self.objects_written);
        log::info!("Objects dropped (difficult): {}", self.objects_difficult);
        log::info!("Objects dropped (class not listed): {}", self.objects_unlisted);

        if self.images_skipped > 0 {
            log::warn!(
                "Images skipped (missing or malformed annotation): {}",
                self.images_skipped
            );
        }
    }
}

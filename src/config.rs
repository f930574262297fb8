use clap::{Parser, ValueEnum};
use image::ImageFormat;
use std::path::PathBuf;

use crate::error::{ConvertError, Result};
use crate::types::{ClassRegistry, DEFAULT_INPUT_EXTENSIONS, DEFAULT_OUTPUT_EXTENSION};

/// Command-line arguments for converting Pascal VOC annotations to YOLO format.
#[derive(Parser, Debug, Clone)]
#[command(
    version,
    long_about = None,
    after_help = "Example:\n  voc2yolo -d ./pascal_voc -i JPEGImages -l Annotations -c Bird Drone Quadcopter -e png jpeg -o ./yolo_format"
)]
pub struct Args {
    /// Pascal VOC directories to convert, one after another
    #[arg(short = 'd', long = "dirlst", num_args = 0..)]
    pub dirlst: Vec<PathBuf>,

    /// Image directory, relative to each VOC directory unless absolute
    #[arg(short = 'i', long = "imgd", default_value = "JPEGImages")]
    pub img_dir: PathBuf,

    /// Annotation directory, relative to each VOC directory unless absolute
    #[arg(short = 'l', long = "xml", default_value = "Annotations")]
    pub xml_dir: PathBuf,

    /// Ordered list of classes to keep; the position is the YOLO class id
    #[arg(short = 'c', long = "classes", num_args = 1.., required = true)]
    pub classes: Vec<String>,

    /// Input image extensions to convert (case-insensitive)
    #[arg(
        short = 'e',
        long = "ext",
        num_args = 1..,
        default_values = ["png", "jpg", "jpeg"],
        value_parser = validate_extension
    )]
    pub ext: Vec<String>,

    /// Output directory, receives images/ and labels/
    #[arg(short = 'o', long = "out", default_value = "./yolo_format")]
    pub output: PathBuf,

    /// Extension all output images are re-encoded to
    #[arg(long = "out_ext", default_value = DEFAULT_OUTPUT_EXTENSION, value_parser = validate_extension)]
    pub out_ext: String,

    /// What to do with an image whose annotation is missing or malformed
    #[arg(long = "on_error", value_enum, default_value = "abort")]
    pub on_error: OnAnnotationError,

    /// File receiving the name of every processed image
    #[arg(long = "log_file", default_value = "imagelog.txt")]
    pub log_file: PathBuf,

    /// Also write a dataset.yaml listing the class names
    #[arg(long = "dataset_yaml")]
    pub dataset_yaml: bool,
}

// Policy for images whose annotation cannot be used
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug, Default)]
pub enum OnAnnotationError {
    /// Stop the whole run at the first bad annotation
    #[default]
    Abort,
    /// Log a warning, skip the image and carry on
    Skip,
}

/// Everything a conversion run needs, resolved from [`Args`].
#[derive(Debug, Clone)]
pub struct ConvertConfig {
    pub source_dirs: Vec<PathBuf>,
    pub img_dir: PathBuf,
    pub xml_dir: PathBuf,
    pub classes: ClassRegistry,
    pub input_extensions: Vec<String>,
    pub output_dir: PathBuf,
    pub output_extension: String,
    pub output_format: ImageFormat,
    pub on_error: OnAnnotationError,
    pub progress_log: PathBuf,
    pub dataset_yaml: bool,
}

impl ConvertConfig {
    pub fn new(
        img_dir: impl Into<PathBuf>,
        xml_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        classes: ClassRegistry,
    ) -> Result<Self> {
        if classes.is_empty() {
            return Err(ConvertError::EmptyClassList);
        }
        let output_dir = output_dir.into();
        Ok(Self {
            source_dirs: Vec::new(),
            img_dir: img_dir.into(),
            xml_dir: xml_dir.into(),
            classes,
            input_extensions: DEFAULT_INPUT_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            progress_log: output_dir.join("imagelog.txt"),
            output_dir,
            output_extension: DEFAULT_OUTPUT_EXTENSION.to_string(),
            output_format: ImageFormat::Jpeg,
            on_error: OnAnnotationError::Abort,
            dataset_yaml: false,
        })
    }

    pub fn with_input_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.input_extensions = extensions
            .into_iter()
            .map(|ext| normalize_extension(ext.as_ref()))
            .collect();
        self
    }

    pub fn with_output_extension(mut self, extension: &str) -> Result<Self> {
        let extension = normalize_extension(extension);
        self.output_format = output_format_for(&extension)?;
        self.output_extension = extension;
        Ok(self)
    }

    pub fn with_on_error(mut self, on_error: OnAnnotationError) -> Self {
        self.on_error = on_error;
        self
    }

    pub fn with_progress_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.progress_log = path.into();
        self
    }

    /// Whether `extension` is one of the accepted input extensions.
    pub fn accepts_extension(&self, extension: &str) -> bool {
        let extension = extension.to_lowercase();
        self.input_extensions.iter().any(|ext| *ext == extension)
    }

    /// Image and annotation directories of every pass, in processing order.
    pub fn passes(&self) -> Vec<(PathBuf, PathBuf)> {
        if self.source_dirs.is_empty() {
            vec![(self.img_dir.clone(), self.xml_dir.clone())]
        } else {
            self.source_dirs
                .iter()
                .map(|source| (source.join(&self.img_dir), source.join(&self.xml_dir)))
                .collect()
        }
    }
}

impl Args {
    pub fn to_convert_config(&self) -> Result<ConvertConfig> {
        let mut config = ConvertConfig::new(
            &self.img_dir,
            &self.xml_dir,
            &self.output,
            ClassRegistry::new(self.classes.iter().cloned()),
        )?
        .with_input_extensions(&self.ext)
        .with_output_extension(&self.out_ext)?
        .with_on_error(self.on_error)
        .with_progress_log(&self.log_file);
        config.source_dirs = self.dirlst.clone();
        config.dataset_yaml = self.dataset_yaml;
        Ok(config)
    }
}

fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_lowercase()
}

fn output_format_for(extension: &str) -> Result<ImageFormat> {
    ImageFormat::from_extension(extension)
        .filter(|format| format.writing_enabled())
        .ok_or_else(|| ConvertError::UnsupportedOutputExtension(extension.to_string()))
}

// Validate an extension given on the command line, dropping a leading dot
pub fn validate_extension(s: &str) -> std::result::Result<String, String> {
    let ext = normalize_extension(s);
    if ext.is_empty() || ext.contains(['/', '\\', '.']) {
        Err(format!("invalid file extension: {:?}", s))
    } else {
        Ok(ext)
    }
}

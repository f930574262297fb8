use glob::{glob_with, MatchOptions, Pattern};
use image::{DynamicImage, ImageFormat, ImageReader};
use log::debug;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::config::ConvertConfig;
use crate::error::{ConvertError, Result};
use crate::types::{ClassRegistry, OutputDirs};
use crate::utils::{create_output_directory, lowercase_extension};

/// Set up the images/ and labels/ directories under `output_dir`
pub fn setup_output_directories(output_dir: &Path) -> Result<OutputDirs> {
    let root = create_output_directory(output_dir)?;
    let images_dir = create_output_directory(&root.join("images"))?;
    let labels_dir = create_output_directory(&root.join("labels"))?;

    Ok(OutputDirs {
        root,
        images_dir,
        labels_dir,
    })
}

/// List the images directly under `image_dir` whose extension is accepted, sorted by path.
///
/// Hidden files are not matched, like a shell `*`.
pub fn collect_image_files(image_dir: &Path, config: &ConvertConfig) -> Result<Vec<PathBuf>> {
    if !image_dir.is_dir() {
        return Err(ConvertError::io(
            image_dir,
            std::io::Error::new(std::io::ErrorKind::NotFound, "image directory not found"),
        ));
    }

    let pattern = format!(
        "{}/*",
        Pattern::escape(&image_dir.to_string_lossy())
    );
    let options = MatchOptions {
        require_literal_leading_dot: true,
        ..MatchOptions::new()
    };
    let entries = glob_with(&pattern, options).map_err(|e| {
        ConvertError::io(
            image_dir,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, e),
        )
    })?;

    let mut images = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| {
            let path = e.path().to_path_buf();
            ConvertError::io(path, e.into_error())
        })?;
        let accepted = lowercase_extension(&path)
            .is_some_and(|ext| config.accepts_extension(&ext));
        if accepted && path.is_file() {
            images.push(path);
        }
    }
    images.sort();
    debug!("Found {} images in {}", images.len(), image_dir.display());
    Ok(images)
}

/// Decode `source` and write it to `destination` in `format`.
pub fn export_image(source: &Path, destination: &Path, format: ImageFormat) -> Result<()> {
    let image_error = |path: &Path, e| ConvertError::Image {
        path: path.to_path_buf(),
        source: e,
    };
    // The format is sniffed from the content, so a mislabeled extension still decodes
    let image = ImageReader::open(source)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(|e| ConvertError::io(source, e))?
        .decode()
        .map_err(|e| image_error(source, e))?;

    // JPEG has no alpha channel
    let image = if format == ImageFormat::Jpeg && image.color().has_alpha() {
        DynamicImage::ImageRgb8(image.to_rgb8())
    } else {
        image
    };

    let file = File::create(destination).map_err(|e| ConvertError::io(destination, e))?;
    let mut writer = BufWriter::new(file);
    image
        .write_to(&mut writer, format)
        .map_err(|e| image_error(destination, e))?;
    writer.flush().map_err(|e| ConvertError::io(destination, e))
}

/// Write a label file, replacing any previous content.
pub fn write_label_file(path: &Path, yolo_data: &str) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path).map_err(|e| ConvertError::io(path, e))?);
    writer
        .write_all(yolo_data.as_bytes())
        .and_then(|_| writer.flush())
        .map_err(|e| ConvertError::io(path, e))
}

/// Log of processed image names for one directory pass.
pub struct ProgressLog {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl ProgressLog {
    /// Create or truncate the log at `path`.
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path).map_err(|e| ConvertError::io(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
        })
    }

    pub fn record(&mut self, file_name: &str) -> Result<()> {
        writeln!(self.writer, "{}", file_name).map_err(|e| ConvertError::io(&self.path, e))
    }

    pub fn finish(mut self) -> Result<()> {
        self.writer
            .flush()
            .map_err(|e| ConvertError::io(&self.path, e))
    }
}

/// Create the dataset.yaml file for YOLO training
pub fn create_dataset_yaml(output_dirs: &OutputDirs, classes: &ClassRegistry) -> Result<PathBuf> {
    let dataset_yaml_path = output_dirs.root.join("dataset.yaml");
    let absolute_path =
        fs::canonicalize(&output_dirs.root).map_err(|e| ConvertError::io(&output_dirs.root, e))?;

    let mut yaml_content = format!(
        "path: {}\ntrain: images\nval: images\n\nnc: {}\nnames:\n",
        absolute_path.to_string_lossy(),
        classes.len()
    );
    for (id, label) in classes.names().iter().enumerate() {
        yaml_content.push_str(&format!("    {}: {}\n", id, label));
    }

    let mut dataset_yaml = BufWriter::new(
        File::create(&dataset_yaml_path).map_err(|e| ConvertError::io(&dataset_yaml_path, e))?,
    );
    dataset_yaml
        .write_all(yaml_content.as_bytes())
        .and_then(|_| dataset_yaml.flush())
        .map_err(|e| ConvertError::io(&dataset_yaml_path, e))?;
    Ok(dataset_yaml_path)
}

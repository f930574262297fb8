use indicatif::ProgressBar;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};

use crate::config::{ConvertConfig, OnAnnotationError};
use crate::conversion::{filter_summary, render_label_file};
use crate::error::{ConvertError, Result};
use crate::io::{
    collect_image_files, create_dataset_yaml, export_image, setup_output_directories,
    write_label_file, ProgressLog,
};
use crate::types::{OutputDirs, ProcessingStats, PROGRESS_LOG_INTERVAL};
use crate::utils::{create_progress_bar, sanitized_stem};
use crate::voc::read_annotation;

/// Convert every VOC directory named by `config`, one after another.
pub fn run(config: &ConvertConfig) -> Result<ProcessingStats> {
    let output_dirs = setup_output_directories(&config.output_dir)?;
    let mut stats = ProcessingStats::new();

    for (image_dir, xml_dir) in config.passes() {
        info!(
            "Converting images from {} with annotations from {}",
            image_dir.display(),
            xml_dir.display()
        );
        let mut progress_log = ProgressLog::create(&config.progress_log)?;
        let pass_stats = convert_dataset(
            &image_dir,
            &xml_dir,
            &output_dirs,
            config,
            &mut progress_log,
        );
        // Keep whatever was logged before a failure; a conversion error wins over a
        // failed flush
        let flushed = progress_log.finish();
        stats.merge(&pass_stats?);
        flushed?;
    }

    if config.dataset_yaml {
        let path = create_dataset_yaml(&output_dirs, &config.classes)?;
        info!("Wrote {}", path.display());
    }

    stats.print_summary();
    Ok(stats)
}

/// Convert the images of one directory and their VOC annotations into `output_dirs`.
///
/// Images are handled in sorted order. With [`OnAnnotationError::Abort`] the first
/// missing or malformed annotation ends the pass with that error.
pub fn convert_dataset(
    image_dir: &Path,
    xml_dir: &Path,
    output_dirs: &OutputDirs,
    config: &ConvertConfig,
    progress_log: &mut ProgressLog,
) -> Result<ProcessingStats> {
    let images = collect_image_files(image_dir, config)?;
    let label = image_dir
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| image_dir.display().to_string());
    let pb = create_progress_bar(images.len() as u64, &label);
    let mut stats = ProcessingStats::new();

    let result = process_images(
        &images,
        xml_dir,
        output_dirs,
        config,
        progress_log,
        &pb,
        &mut stats,
    );
    match &result {
        Ok(()) => pb.finish_with_message("Conversion complete"),
        Err(_) => pb.abandon(),
    }
    result.map(|_| stats)
}

fn process_images(
    images: &[PathBuf],
    xml_dir: &Path,
    output_dirs: &OutputDirs,
    config: &ConvertConfig,
    progress_log: &mut ProgressLog,
    pb: &ProgressBar,
    stats: &mut ProcessingStats,
) -> Result<()> {
    for image_path in images {
        match process_image(image_path, xml_dir, output_dirs, config, stats) {
            Ok(()) => {
                let file_name = image_path
                    .file_name()
                    .map(|name| name.to_string_lossy())
                    .unwrap_or_default();
                progress_log.record(&file_name)?;
                stats.images_converted += 1;
                if stats.images_converted % PROGRESS_LOG_INTERVAL == 0 {
                    info!("{} input images processed", stats.images_converted);
                }
            }
            Err(e) if e.is_annotation_error() && config.on_error == OnAnnotationError::Skip => {
                warn!("Skipping {}: {}", image_path.display(), e);
                stats.images_skipped += 1;
            }
            Err(e) => return Err(e),
        }
        pb.inc(1);
    }
    Ok(())
}

/// Annotation path expected for `image_path`: same stem, `.xml` extension.
pub fn annotation_path_for(image_path: &Path, xml_dir: &Path) -> PathBuf {
    let stem = image_path.file_stem().unwrap_or_default();
    let mut file_name = stem.to_os_string();
    file_name.push(".xml");
    xml_dir.join(file_name)
}

/// Convert a single image and its annotation.
///
/// The annotation is read before anything is written, so an image skipped for a bad
/// annotation leaves no output behind.
pub fn process_image(
    image_path: &Path,
    xml_dir: &Path,
    output_dirs: &OutputDirs,
    config: &ConvertConfig,
    stats: &mut ProcessingStats,
) -> Result<()> {
    let xml_path = annotation_path_for(image_path, xml_dir);
    if !xml_path.is_file() {
        return Err(ConvertError::MissingAnnotation {
            image: image_path.to_path_buf(),
            annotation: xml_path,
        });
    }
    let record = read_annotation(&xml_path)?;

    let output_name = sanitized_stem(image_path);
    let image_output_path = output_dirs
        .images_dir
        .join(format!("{}.{}", output_name, config.output_extension));
    export_image(image_path, &image_output_path, config.output_format)?;

    let summary = filter_summary(&record, &config.classes);
    let label_output_path = output_dirs.labels_dir.join(format!("{}.txt", output_name));
    write_label_file(&label_output_path, &render_label_file(&record, &config.classes))?;
    debug!(
        "{} -> {} ({} kept, {} difficult, {} unlisted)",
        image_path.display(),
        label_output_path.display(),
        summary.kept,
        summary.difficult,
        summary.unlisted
    );

    stats.objects_written += summary.kept;
    stats.objects_difficult += summary.difficult;
    stats.objects_unlisted += summary.unlisted;
    Ok(())
}

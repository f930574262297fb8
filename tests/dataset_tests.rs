use image::{ImageFormat, RgbImage, RgbaImage};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use voc2yolo::{run, ClassRegistry, ConvertConfig, ConvertError, OnAnnotationError};

struct VocFixture {
    _temp_dir: TempDir,
    root: PathBuf,
    images: PathBuf,
    annotations: PathBuf,
    output: PathBuf,
}

impl VocFixture {
    fn new() -> Self {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path().to_path_buf();
        let images = root.join("voc/JPEGImages");
        let annotations = root.join("voc/Annotations");
        fs::create_dir_all(&images).unwrap();
        fs::create_dir_all(&annotations).unwrap();
        Self {
            output: root.join("yolo_format"),
            _temp_dir: temp_dir,
            root,
            images,
            annotations,
        }
    }

    fn add_image(&self, file_name: &str, width: u32, height: u32) {
        write_png(&self.images.join(file_name), width, height);
    }

    fn add_annotation(&self, stem: &str, xml: &str) {
        fs::write(self.annotations.join(format!("{}.xml", stem)), xml).unwrap();
    }

    fn config(&self, classes: &[&str]) -> ConvertConfig {
        ConvertConfig::new(
            &self.images,
            &self.annotations,
            &self.output,
            ClassRegistry::new(classes.iter().copied()),
        )
        .unwrap()
    }

    fn label(&self, stem: &str) -> PathBuf {
        self.output.join("labels").join(format!("{}.txt", stem))
    }

    fn exported_image(&self, stem: &str) -> PathBuf {
        self.output.join("images").join(format!("{}.jpg", stem))
    }

    fn progress_log(&self) -> String {
        fs::read_to_string(self.output.join("imagelog.txt")).unwrap()
    }
}

fn write_png(path: &Path, width: u32, height: u32) {
    RgbImage::from_pixel(width, height, image::Rgb([120, 60, 30]))
        .save_with_format(path, ImageFormat::Png)
        .unwrap();
}

fn voc_xml(width: u32, height: u32, objects: &[(&str, u8, [f64; 4])]) -> String {
    let mut xml = format!(
        "<annotation>\n  <size>\n    <width>{}</width>\n    <height>{}</height>\n    <depth>3</depth>\n  </size>\n",
        width, height
    );
    for (name, difficult, [xmin, xmax, ymin, ymax]) in objects {
        xml.push_str(&format!(
            "  <object>\n    <name>{}</name>\n    <difficult>{}</difficult>\n    <bndbox>\n      <xmin>{}</xmin>\n      <ymin>{}</ymin>\n      <xmax>{}</xmax>\n      <ymax>{}</ymax>\n    </bndbox>\n  </object>\n",
            name, difficult, xmin, ymin, xmax, ymax
        ));
    }
    xml.push_str("</annotation>\n");
    xml
}

#[test]
fn test_converts_single_image_end_to_end() {
    let fixture = VocFixture::new();
    fixture.add_image("bird.png", 200, 100);
    fixture.add_annotation("bird", &voc_xml(200, 100, &[("Bird", 0, [10.0, 50.0, 20.0, 60.0])]));

    let stats = run(&fixture.config(&["Bird"])).unwrap();

    assert_eq!(stats.images_converted, 1);
    assert_eq!(stats.objects_written, 1);
    assert_eq!(
        fs::read_to_string(fixture.label("bird")).unwrap(),
        "0 0.145 0.39 0.2 0.4\n"
    );
    assert_eq!(
        image::image_dimensions(fixture.exported_image("bird")).unwrap(),
        (200, 100)
    );
    assert_eq!(fixture.progress_log(), "bird.png\n");
}

#[test]
fn test_class_ids_follow_registry_and_difficult_is_dropped() {
    let fixture = VocFixture::new();
    fixture.add_image("sky.png", 100, 100);
    fixture.add_annotation(
        "sky",
        &voc_xml(
            100,
            100,
            &[
                ("Drone", 0, [0.0, 100.0, 0.0, 100.0]),
                ("Bird", 1, [10.0, 20.0, 10.0, 20.0]),
                ("Plane", 0, [10.0, 20.0, 10.0, 20.0]),
                ("Bird", 0, [20.0, 40.0, 20.0, 40.0]),
            ],
        ),
    );

    let stats = run(&fixture.config(&["Bird", "Drone"])).unwrap();

    assert_eq!(
        fs::read_to_string(fixture.label("sky")).unwrap(),
        "1 0.49 0.49 1.0 1.0\n0 0.29 0.29 0.2 0.2\n"
    );
    assert_eq!(stats.objects_written, 2);
    assert_eq!(stats.objects_difficult, 1);
    assert_eq!(stats.objects_unlisted, 1);
}

#[test]
fn test_rerun_overwrites_with_identical_labels() {
    let fixture = VocFixture::new();
    fixture.add_image("a.png", 64, 48);
    fixture.add_image("b.png", 64, 48);
    fixture.add_annotation("a", &voc_xml(64, 48, &[("Bird", 0, [1.0, 33.0, 2.0, 40.0])]));
    fixture.add_annotation(
        "b",
        &voc_xml(
            64,
            48,
            &[("Bird", 0, [5.0, 9.0, 5.0, 9.0]), ("Bird", 0, [10.0, 60.0, 0.0, 48.0])],
        ),
    );
    let config = fixture.config(&["Bird"]);

    run(&config).unwrap();
    let first_a = fs::read(fixture.label("a")).unwrap();
    let first_b = fs::read(fixture.label("b")).unwrap();

    run(&config).unwrap();
    assert_eq!(fs::read(fixture.label("a")).unwrap(), first_a);
    assert_eq!(fs::read(fixture.label("b")).unwrap(), first_b);
    assert_eq!(fixture.progress_log(), "a.png\nb.png\n");
}

#[test]
fn test_extension_filter_is_case_insensitive() {
    let fixture = VocFixture::new();
    for (file_name, stem) in [("x.PNG", "x"), ("y.png", "y"), ("z.Png", "z"), ("w.gif", "w")] {
        fixture.add_image(file_name, 8, 8);
        fixture.add_annotation(stem, &voc_xml(8, 8, &[("Bird", 0, [1.0, 4.0, 1.0, 4.0])]));
    }
    fs::write(fixture.images.join("notes.txt"), "not an image").unwrap();
    fixture.add_image(".hidden.png", 8, 8);

    let config = fixture.config(&["Bird"]).with_input_extensions(["png"]);
    let stats = run(&config).unwrap();

    assert_eq!(stats.images_converted, 3);
    assert_eq!(fixture.progress_log(), "x.PNG\ny.png\nz.Png\n");
    for stem in ["x", "y", "z"] {
        assert!(fixture.label(stem).is_file());
        assert!(fixture.exported_image(stem).is_file());
    }
    assert!(!fixture.label("w").exists());
}

#[test]
fn test_missing_annotation_aborts_run() {
    let fixture = VocFixture::new();
    fixture.add_image("a.png", 16, 16);
    fixture.add_image("b.png", 16, 16);
    fixture.add_annotation("b", &voc_xml(16, 16, &[("Bird", 0, [1.0, 4.0, 1.0, 4.0])]));

    let err = run(&fixture.config(&["Bird"])).unwrap_err();

    match &err {
        ConvertError::MissingAnnotation { image, annotation } => {
            assert!(image.ends_with("a.png"));
            assert!(annotation.ends_with("a.xml"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(err.kind(), "MissingAnnotationError");
    assert!(!fixture.exported_image("a").exists());
    assert!(!fixture.label("b").exists());
    assert_eq!(fixture.progress_log(), "");
}

#[test]
fn test_skip_policy_continues_after_bad_annotations() {
    let fixture = VocFixture::new();
    fixture.add_image("a.png", 16, 16);
    fixture.add_image("b.png", 16, 16);
    fixture.add_image("c.png", 16, 16);
    fixture.add_annotation("b", "<annotation><size><width>16</width></size></annotation>");
    fixture.add_annotation("c", &voc_xml(16, 16, &[("Bird", 0, [1.0, 4.0, 1.0, 4.0])]));

    let config = fixture
        .config(&["Bird"])
        .with_on_error(OnAnnotationError::Skip);
    let stats = run(&config).unwrap();

    assert_eq!(stats.images_converted, 1);
    assert_eq!(stats.images_skipped, 2);
    assert!(!fixture.label("a").exists());
    assert!(!fixture.label("b").exists());
    assert!(fixture.label("c").is_file());
    assert_eq!(fixture.progress_log(), "c.png\n");
}

#[test]
fn test_malformed_annotation_aborts_run() {
    let fixture = VocFixture::new();
    fixture.add_image("a.png", 16, 16);
    fixture.add_annotation("a", "<annotation><size><width>16</width></size></annotation>");

    let err = run(&fixture.config(&["Bird"])).unwrap_err();

    assert!(matches!(err, ConvertError::AnnotationParse { .. }));
    assert_eq!(err.kind(), "AnnotationParseError");
}

#[test]
fn test_multiple_source_directories() {
    let fixture = VocFixture::new();
    let mut sources = Vec::new();
    for (dir, stem) in [("set_a", "first"), ("set_b", "second")] {
        let source = fixture.root.join(dir);
        fs::create_dir_all(source.join("JPEGImages")).unwrap();
        fs::create_dir_all(source.join("Annotations")).unwrap();
        write_png(&source.join("JPEGImages").join(format!("{}.png", stem)), 10, 10);
        fs::write(
            source.join("Annotations").join(format!("{}.xml", stem)),
            voc_xml(10, 10, &[("Bird", 0, [2.0, 6.0, 2.0, 6.0])]),
        )
        .unwrap();
        sources.push(source);
    }

    let mut config = ConvertConfig::new(
        "JPEGImages",
        "Annotations",
        &fixture.output,
        ClassRegistry::new(["Bird"]),
    )
    .unwrap();
    config.source_dirs = sources;
    let stats = run(&config).unwrap();

    assert_eq!(stats.images_converted, 2);
    assert!(fixture.label("first").is_file());
    assert!(fixture.label("second").is_file());
    // The log only holds the last pass
    assert_eq!(fixture.progress_log(), "second.png\n");
}

#[test]
fn test_rgba_input_exports_to_jpeg() {
    let fixture = VocFixture::new();
    RgbaImage::from_pixel(12, 6, image::Rgba([1, 2, 3, 128]))
        .save_with_format(fixture.images.join("alpha.png"), ImageFormat::Png)
        .unwrap();
    fixture.add_annotation("alpha", &voc_xml(12, 6, &[]));

    run(&fixture.config(&["Bird"])).unwrap();

    assert_eq!(
        image::image_dimensions(fixture.exported_image("alpha")).unwrap(),
        (12, 6)
    );
    assert_eq!(fs::read_to_string(fixture.label("alpha")).unwrap(), "");
}

#[test]
fn test_writes_dataset_yaml() {
    let fixture = VocFixture::new();
    let mut config = fixture.config(&["Bird", "Drone"]);
    config.dataset_yaml = true;

    run(&config).unwrap();

    let yaml = fs::read_to_string(fixture.output.join("dataset.yaml")).unwrap();
    assert!(yaml.contains("path:"));
    assert!(yaml.contains("nc: 2"));
    assert!(yaml.contains("    0: Bird\n"));
    assert!(yaml.contains("    1: Drone\n"));
}

#[test]
fn test_label_values_at_640_width_match_legacy_rounding() {
    let fixture = VocFixture::new();
    fixture.add_image("wide.png", 640, 480);
    fixture.add_annotation(
        "wide",
        &voc_xml(
            640,
            480,
            &[
                ("Bird", 0, [0.0, 12.0, 10.0, 30.0]),
                ("Bird", 0, [20.0, 40.0, 10.0, 30.0]),
            ],
        ),
    );

    run(&fixture.config(&["Bird"])).unwrap();

    assert_eq!(
        fs::read_to_string(fixture.label("wide")).unwrap(),
        "0 0.007812 0.039583 0.01875 0.041667\n0 0.045313 0.039583 0.03125 0.041667\n"
    );
}

#[cfg(target_os = "linux")]
#[test]
fn test_conversion_error_is_reported_when_log_flush_fails() {
    let fixture = VocFixture::new();
    fixture.add_image("a.png", 16, 16);
    fixture.add_image("b.png", 16, 16);
    fixture.add_annotation("a", &voc_xml(16, 16, &[("Bird", 0, [1.0, 4.0, 1.0, 4.0])]));

    // Writes to /dev/full fail once the buffered log is flushed
    let config = fixture.config(&["Bird"]).with_progress_log("/dev/full");
    let err = run(&config).unwrap_err();

    assert_eq!(err.kind(), "MissingAnnotationError");
    assert!(fixture.label("a").is_file());
}

use crate::types::{AnnotationRecord, ClassRegistry, ImageDimensions, NormalizedBox, PixelBox};

/// Convert a VOC pixel box into a YOLO box relative to `size`.
///
/// The centers are shifted by one pixel before scaling. VOC coordinates are 1-based,
/// and the reference YOLO conversion tooling has always applied this offset, so the
/// exact values are kept for compatibility with existing label sets. Boxes reaching past
/// the image edges are not clamped.
pub fn normalize(size: ImageDimensions, bbox: PixelBox) -> NormalizedBox {
    let dw = 1.0 / size.width as f64;
    let dh = 1.0 / size.height as f64;
    let x = (bbox.xmin + bbox.xmax) / 2.0 - 1.0;
    let y = (bbox.ymin + bbox.ymax) / 2.0 - 1.0;
    let w = bbox.xmax - bbox.xmin;
    let h = bbox.ymax - bbox.ymin;

    NormalizedBox {
        x_center: x * dw,
        y_center: y * dh,
        width: w * dw,
        height: h * dh,
    }
}

/// Iterate over the objects of `record` that belong in the label file, as
/// `(class_id, box)` pairs in document order.
///
/// Difficult objects and objects whose label is not in `classes` are dropped.
pub fn convert_record<'a>(
    record: &'a AnnotationRecord,
    classes: &'a ClassRegistry,
) -> impl Iterator<Item = (usize, NormalizedBox)> + 'a {
    record
        .objects
        .iter()
        .filter(|object| !object.difficult)
        .filter_map(move |object| {
            classes
                .class_id(&object.label)
                .map(|class_id| (class_id, normalize(record.size, object.bbox)))
        })
}

/// Counts of kept and dropped objects for one record.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FilterSummary {
    pub kept: usize,
    pub difficult: usize,
    pub unlisted: usize,
}

pub fn filter_summary(record: &AnnotationRecord, classes: &ClassRegistry) -> FilterSummary {
    record
        .objects
        .iter()
        .fold(FilterSummary::default(), |mut summary, object| {
            if object.difficult {
                summary.difficult += 1;
            } else if classes.class_id(&object.label).is_none() {
                summary.unlisted += 1;
            } else {
                summary.kept += 1;
            }
            summary
        })
}

/// Round to 6 decimal places and print the shortest decimal form.
///
/// Rounding works on the exact binary value with ties to even, so 0.0078125 becomes
/// 0.007812, as in existing YOLO label sets.
pub fn format_coordinate(value: f64) -> String {
    let rounded: f64 = format!("{:.6}", value).parse().unwrap_or(value);
    let text = rounded.to_string();
    if rounded.is_finite() && !text.contains('.') {
        format!("{}.0", text)
    } else {
        text
    }
}

/// Render one label line, including the trailing newline.
pub fn format_label_line(class_id: usize, bbox: &NormalizedBox) -> String {
    format!(
        "{} {} {} {} {}\n",
        class_id,
        format_coordinate(bbox.x_center),
        format_coordinate(bbox.y_center),
        format_coordinate(bbox.width),
        format_coordinate(bbox.height)
    )
}

/// Convert an annotation record to the contents of its YOLO label file
pub fn render_label_file(record: &AnnotationRecord, classes: &ClassRegistry) -> String {
    let mut yolo_data = String::with_capacity(record.objects.len() * 48);
    for (class_id, bbox) in convert_record(record, classes) {
        yolo_data.push_str(&format_label_line(class_id, &bbox));
    }
    yolo_data
}

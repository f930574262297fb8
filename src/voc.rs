//! Pascal VOC annotation reader
//!
//! The XML is first deserialized into structs whose fields are all optional, so that a
//! missing element can be reported by its path instead of a generic serde message. The
//! raw structs are then validated into an [`AnnotationRecord`].

use log::debug;
use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;

use crate::error::{AnnotationIssue, ConvertError, Result};
use crate::types::{AnnotatedObject, AnnotationRecord, ImageDimensions, PixelBox};

type IssueResult<T> = std::result::Result<T, AnnotationIssue>;

#[derive(Debug, Deserialize)]
struct RawAnnotation {
    filename: Option<String>,
    size: Option<RawSize>,
    #[serde(default)]
    object: Vec<RawObject>,
}

#[derive(Debug, Deserialize)]
struct RawSize {
    width: Option<String>,
    height: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawObject {
    name: Option<String>,
    difficult: Option<String>,
    bndbox: Option<RawBndBox>,
}

#[derive(Debug, Deserialize)]
struct RawBndBox {
    xmin: Option<String>,
    xmax: Option<String>,
    ymin: Option<String>,
    ymax: Option<String>,
}

fn required<T>(value: Option<T>, field: impl FnOnce() -> String) -> IssueResult<T> {
    value.ok_or_else(|| AnnotationIssue::MissingField(field()))
}

// Surrounding whitespace is tolerated, as VOC files are often pretty-printed by hand
fn parse_number<T: FromStr>(field: &str, text: &str) -> IssueResult<T> {
    text.trim().parse().map_err(|_| AnnotationIssue::InvalidNumber {
        field: field.to_string(),
        value: text.to_string(),
    })
}

fn validate_size(raw: Option<RawSize>) -> IssueResult<ImageDimensions> {
    let size = required(raw, || "size".to_string())?;
    let width_text = required(size.width, || "size/width".to_string())?;
    let height_text = required(size.height, || "size/height".to_string())?;
    let width: u32 = parse_number("size/width", &width_text)?;
    let height: u32 = parse_number("size/height", &height_text)?;

    if width == 0 || height == 0 {
        return Err(AnnotationIssue::EmptyImage { width, height });
    }
    Ok(ImageDimensions { width, height })
}

fn validate_object(index: usize, raw: RawObject) -> IssueResult<AnnotatedObject> {
    let prefix = format!("object[{}]", index);
    let label = required(raw.name, || format!("{}/name", prefix))?;
    let difficult_text = required(raw.difficult, || format!("{}/difficult", prefix))?;
    let difficult: i64 = parse_number(&format!("{}/difficult", prefix), &difficult_text)?;
    let bndbox = required(raw.bndbox, || format!("{}/bndbox", prefix))?;

    let coordinate = |name: &str, value: Option<String>| -> IssueResult<f64> {
        let field = format!("{}/bndbox/{}", prefix, name);
        let text = required(value, || field.clone())?;
        parse_number::<f64>(&field, &text)
    };

    Ok(AnnotatedObject {
        label,
        difficult: difficult == 1,
        bbox: PixelBox {
            xmin: coordinate("xmin", bndbox.xmin)?,
            xmax: coordinate("xmax", bndbox.xmax)?,
            ymin: coordinate("ymin", bndbox.ymin)?,
            ymax: coordinate("ymax", bndbox.ymax)?,
        },
    })
}

/// Parse a VOC annotation document from a buffered reader.
pub fn parse_annotation<R: BufRead>(reader: R) -> IssueResult<AnnotationRecord> {
    let raw: RawAnnotation = quick_xml::de::from_reader(reader)?;
    let size = validate_size(raw.size)?;
    let objects = raw
        .object
        .into_iter()
        .enumerate()
        .map(|(index, object)| validate_object(index, object))
        .collect::<IssueResult<Vec<_>>>()?;

    Ok(AnnotationRecord {
        filename: raw.filename,
        size,
        objects,
    })
}

/// Parse a VOC annotation document held in memory.
pub fn parse_annotation_str(xml: &str) -> IssueResult<AnnotationRecord> {
    parse_annotation(xml.as_bytes())
}

/// Open and parse the annotation file at `path`.
pub fn read_annotation(path: &Path) -> Result<AnnotationRecord> {
    let file = File::open(path).map_err(|e| ConvertError::io(path, e))?;
    let record = parse_annotation(BufReader::new(file)).map_err(|reason| {
        ConvertError::AnnotationParse {
            path: path.to_path_buf(),
            reason,
        }
    })?;
    debug!(
        "Parsed {} ({} objects, {}x{})",
        path.display(),
        record.objects.len(),
        record.size.width,
        record.size.height
    );
    Ok(record)
}

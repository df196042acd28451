//! Visible signature mark for PDF artifacts
//!
//! Draws the text `SIGNED` in 18pt Helvetica, 50pt in from the left and
//! 50pt down from the top of the first page. Existing page content is
//! wrapped in `q`/`Q` so its graphics state cannot displace the mark.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use thiserror::Error;

pub const MARK_TEXT: &str = "SIGNED";
pub const MARK_FONT_SIZE: i64 = 18;
pub const MARK_INSET: f32 = 50.0;

/// Top-left corner of a US Letter page, used when no MediaBox is found
const DEFAULT_TOP_LEFT: (f32, f32) = (0.0, 792.0);

#[derive(Error, Debug)]
pub enum MarkError {
    #[error("not a readable PDF: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("failed to write PDF: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF has no pages")]
    NoPages,

    #[error("PDF is encrypted")]
    Encrypted,

    #[error("malformed PDF: {0}")]
    Malformed(String),
}

/// Apply the mark to the first page of `pdf` and return the new file
pub fn apply_mark(pdf: &[u8]) -> Result<Vec<u8>, MarkError> {
    let mut doc = Document::load_mem(pdf)?;
    if doc.is_encrypted() {
        return Err(MarkError::Encrypted);
    }

    let page_id = *doc.get_pages().get(&1).ok_or(MarkError::NoPages)?;
    let top_left = page_top_left(&doc, page_id);

    let mut resources = effective_resources(&doc, page_id)?;
    let font_name = unused_font_name(&doc, &resources);
    add_font(&mut doc, &mut resources, &font_name)?;

    let existing = existing_contents(&doc, page_id)?;
    let stamp = stamp_content(&font_name, top_left)?;

    let open_id = doc.add_object(Stream::new(dictionary! {}, b"q\n".to_vec()));
    let stamp_id = doc.add_object(Stream::new(dictionary! {}, stamp));

    let mut contents = Vec::with_capacity(existing.len() + 2);
    contents.push(Object::Reference(open_id));
    contents.extend(existing);
    contents.push(Object::Reference(stamp_id));

    let page = doc.get_dictionary_mut(page_id)?;
    page.set("Resources", resources);
    page.set("Contents", contents);

    let mut out = Vec::with_capacity(pdf.len() + 512);
    doc.save_to(&mut out)?;
    Ok(out)
}

/// Top-left corner of the page's MediaBox, inherited through the page tree if needed
fn page_top_left(doc: &Document, page_id: ObjectId) -> (f32, f32) {
    let mut node_id = Some(page_id);
    let mut depth = 0;

    while let Some(id) = node_id {
        let Ok(node) = doc.get_dictionary(id) else {
            break;
        };

        if let Ok(media_box) = node.get_deref(b"MediaBox", doc).and_then(Object::as_array) {
            let coords: Vec<f32> = media_box
                .iter()
                .filter_map(|o| doc.dereference(o).ok())
                .filter_map(|(_, o)| o.as_float().ok())
                .collect();
            if let [x0, y0, x1, y1] = coords.as_slice() {
                return (x0.min(*x1), y0.max(*y1));
            }
        }

        node_id = node.get(b"Parent").and_then(Object::as_reference).ok();
        depth += 1;
        if depth > 32 {
            break;
        }
    }

    DEFAULT_TOP_LEFT
}

/// Resources visible to the page, own or inherited, as a direct dictionary
fn effective_resources(doc: &Document, page_id: ObjectId) -> Result<Dictionary, MarkError> {
    let mut node_id = Some(page_id);
    let mut depth = 0;

    while let Some(id) = node_id {
        let node = doc.get_dictionary(id)?;
        if let Ok(resources) = node.get_deref(b"Resources", doc) {
            return resources
                .as_dict()
                .cloned()
                .map_err(|_| MarkError::Malformed("Resources is not a dictionary".to_string()));
        }

        node_id = node.get(b"Parent").and_then(Object::as_reference).ok();
        depth += 1;
        if depth > 32 {
            return Err(MarkError::Malformed("page tree too deep".to_string()));
        }
    }

    Ok(Dictionary::new())
}

fn font_dictionary<'a>(doc: &'a Document, resources: &'a Dictionary) -> Option<&'a Dictionary> {
    resources
        .get_deref(b"Font", doc)
        .and_then(Object::as_dict)
        .ok()
}

fn unused_font_name(doc: &Document, resources: &Dictionary) -> String {
    let fonts = font_dictionary(doc, resources);
    let taken = |name: &str| fonts.map(|f| f.has(name.as_bytes())).unwrap_or(false);

    let mut name = "FSigned".to_string();
    let mut n = 0;
    while taken(&name) {
        n += 1;
        name = format!("FSigned{}", n);
    }
    name
}

fn add_font(doc: &mut Document, resources: &mut Dictionary, font_name: &str) -> Result<(), MarkError> {
    let mut fonts = font_dictionary(doc, resources).cloned().unwrap_or_default();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    fonts.set(font_name, Object::Reference(font_id));
    resources.set("Font", fonts);

    Ok(())
}

fn existing_contents(doc: &Document, page_id: ObjectId) -> Result<Vec<Object>, MarkError> {
    let page = doc.get_dictionary(page_id)?;
    match page.get(b"Contents") {
        Ok(Object::Reference(id)) => match doc.get_object(*id)? {
            Object::Array(items) => Ok(items.clone()),
            _ => Ok(vec![Object::Reference(*id)]),
        },
        Ok(Object::Array(items)) => Ok(items.clone()),
        Ok(Object::Stream(_)) => Err(MarkError::Malformed(
            "inline content stream".to_string(),
        )),
        Ok(_) => Err(MarkError::Malformed("Contents has unexpected type".to_string())),
        Err(_) => Ok(Vec::new()),
    }
}

fn stamp_content(font_name: &str, (left, top): (f32, f32)) -> Result<Vec<u8>, MarkError> {
    let content = Content {
        operations: vec![
            Operation::new("Q", vec![]),
            Operation::new("q", vec![]),
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![font_name.into(), MARK_FONT_SIZE.into()]),
            Operation::new("Td", vec![(left + MARK_INSET).into(), (top - MARK_INSET).into()]),
            Operation::new("Tj", vec![Object::string_literal(MARK_TEXT)]),
            Operation::new("ET", vec![]),
            Operation::new("Q", vec![]),
        ],
    };
    let mut stamp = b"\n".to_vec();
    stamp.extend(content.encode()?);
    Ok(stamp)
}

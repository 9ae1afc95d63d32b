//! AcroForm walking with lopdf.
//!
//! Produces one descriptor line per terminal form field:
//!
//! ```text
//! <index> [<pages>] <type> <object-id> <qualified name>
//! ```
//!
//! Token 2 is the type and tokens 3.. form the name tail, whose first token
//! (the object id) is the ordinal the name normalizer strips.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use lopdf::{Dictionary, Document, Object, ObjectId};

/// Bound on field tree nesting in malformed documents.
const MAX_FIELD_DEPTH: usize = 32;

// Field flag bits (PDF 32000-1, tables 226/228/230), zero-based.
const FLAG_MULTILINE: i64 = 1 << 12;
const FLAG_PASSWORD: i64 = 1 << 13;
const FLAG_RADIO: i64 = 1 << 15;
const FLAG_PUSHBUTTON: i64 = 1 << 16;
const FLAG_COMBO: i64 = 1 << 17;

/// Turns a local PDF into its list of opaque field descriptors.
pub trait PdfFieldParser: Send + Sync {
    /// Fails when the file is not a PDF or carries no form fields.
    fn field_descriptors(&self, path: &Path) -> Result<Vec<String>>;
}

/// Parser backed by lopdf.
#[derive(Debug, Clone, Copy, Default)]
pub struct LopdfFieldParser;

impl PdfFieldParser for LopdfFieldParser {
    fn field_descriptors(&self, path: &Path) -> Result<Vec<String>> {
        let doc = Document::load(path)
            .with_context(|| format!("failed to load PDF {}", path.display()))?;
        descriptors_from_document(&doc)
    }
}

/// A terminal field as found in the field tree.
#[derive(Debug, Clone)]
struct RawField {
    object_id: ObjectId,
    name: String,
    field_type: &'static str,
    widgets: Vec<ObjectId>,
}

#[derive(Debug, Clone, Copy, Default)]
struct Inherited<'a> {
    field_type: Option<&'a [u8]>,
    flags: i64,
}

/// Descriptor lines for every named terminal field of a loaded document.
pub fn descriptors_from_document(doc: &Document) -> Result<Vec<String>> {
    let catalog = doc
        .catalog()
        .map_err(|e| anyhow!("missing document catalog: {e}"))?;

    let acroform = catalog
        .get(b"AcroForm")
        .ok()
        .and_then(|obj| resolve(doc, obj))
        .and_then(|obj| obj.as_dict().ok())
        .context("document has no AcroForm")?;

    let roots = acroform
        .get(b"Fields")
        .ok()
        .and_then(|obj| resolve(doc, obj))
        .and_then(|obj| obj.as_array().ok())
        .context("AcroForm has no Fields array")?;

    let mut fields = Vec::new();
    let mut visited = BTreeSet::new();
    for root in roots {
        if let Object::Reference(id) = root {
            collect_fields(doc, *id, None, Inherited::default(), 0, &mut visited, &mut fields);
        }
    }

    if fields.is_empty() {
        bail!("AcroForm declares no named form fields");
    }

    let pages = widget_pages(doc);
    Ok(fields
        .iter()
        .enumerate()
        .map(|(i, field)| render_descriptor(i + 1, field, &pages))
        .collect())
}

fn collect_fields<'a>(
    doc: &'a Document,
    id: ObjectId,
    parent_name: Option<&str>,
    inherited: Inherited<'a>,
    depth: usize,
    visited: &mut BTreeSet<ObjectId>,
    out: &mut Vec<RawField>,
) {
    if depth > MAX_FIELD_DEPTH {
        tracing::warn!("field tree deeper than {MAX_FIELD_DEPTH}, stopping at {id:?}");
        return;
    }
    // Each field object is walked once, so a /Kids cycle cannot fan out
    if !visited.insert(id) {
        tracing::debug!("field {id:?} already visited, skipping");
        return;
    }
    let Some(dict) = doc.get_object(id).ok().and_then(|o| o.as_dict().ok()) else {
        return;
    };

    let partial = dict_string(dict, b"T");
    let name = match (parent_name, partial) {
        (Some(parent), Some(partial)) => format!("{parent}.{partial}"),
        (None, Some(partial)) => partial,
        (Some(parent), None) => parent.to_string(),
        (None, None) => String::new(),
    };

    let inherited = Inherited {
        field_type: dict
            .get(b"FT")
            .ok()
            .and_then(|o| o.as_name().ok())
            .or(inherited.field_type),
        flags: dict
            .get(b"Ff")
            .ok()
            .and_then(|o| o.as_i64().ok())
            .unwrap_or(inherited.flags),
    };

    let kids: Vec<ObjectId> = dict
        .get(b"Kids")
        .ok()
        .and_then(|o| resolve(doc, o))
        .and_then(|o| o.as_array().ok())
        .map(|arr| arr.iter().filter_map(|k| k.as_reference().ok()).collect())
        .unwrap_or_default();

    // Kids carrying their own /T are child fields; the rest are widgets
    let (child_fields, widgets): (Vec<ObjectId>, Vec<ObjectId>) =
        kids.into_iter().partition(|kid| {
            doc.get_object(*kid)
                .ok()
                .and_then(|o| o.as_dict().ok())
                .is_some_and(|d| d.has(b"T"))
        });

    if !child_fields.is_empty() {
        for kid in child_fields {
            collect_fields(doc, kid, Some(&name), inherited, depth + 1, visited, out);
        }
        return;
    }

    if name.is_empty() {
        tracing::debug!("skipping unnamed field {id:?}");
        return;
    }

    out.push(RawField {
        object_id: id,
        name,
        field_type: type_token(inherited.field_type, inherited.flags),
        widgets: if widgets.is_empty() { vec![id] } else { widgets },
    });
}

/// Map a field type name plus flags onto the lowercase type token.
fn type_token(field_type: Option<&[u8]>, flags: i64) -> &'static str {
    match field_type {
        Some(b"Tx") if flags & FLAG_MULTILINE != 0 => "textarea",
        Some(b"Tx") if flags & FLAG_PASSWORD != 0 => "password",
        Some(b"Tx") => "text",
        Some(b"Btn") if flags & FLAG_PUSHBUTTON != 0 => "button",
        Some(b"Btn") if flags & FLAG_RADIO != 0 => "radio",
        Some(b"Btn") => "checkbox",
        Some(b"Ch") if flags & FLAG_COMBO != 0 => "combobox",
        Some(b"Ch") => "listbox",
        Some(b"Sig") => "signature",
        _ => "unknown",
    }
}

/// Which page (1-based) each annotation object sits on.
fn widget_pages(doc: &Document) -> BTreeMap<ObjectId, u32> {
    let mut pages = BTreeMap::new();
    for (number, page_id) in doc.get_pages() {
        let annots = doc
            .get_object(page_id)
            .ok()
            .and_then(|o| o.as_dict().ok())
            .and_then(|d| d.get(b"Annots").ok())
            .and_then(|o| resolve(doc, o))
            .and_then(|o| o.as_array().ok());
        for annot in annots.into_iter().flatten() {
            if let Ok(id) = annot.as_reference() {
                pages.entry(id).or_insert(number);
            }
        }
    }
    pages
}

fn render_descriptor(index: usize, field: &RawField, pages: &BTreeMap<ObjectId, u32>) -> String {
    let on_pages: BTreeSet<u32> = field
        .widgets
        .iter()
        .filter_map(|w| pages.get(w).copied())
        .collect();
    let pages = on_pages
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(",");

    format!(
        "{index} [{pages}] {} {} {}",
        field.field_type, field.object_id.0, field.name
    )
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

fn dict_string(dict: &Dictionary, key: &[u8]) -> Option<String> {
    match dict.get(key).ok()? {
        Object::String(bytes, _) => Some(decode_pdf_string(bytes)).filter(|s| !s.is_empty()),
        _ => None,
    }
}

/// Decode a PDF text string: UTF-16BE with BOM, else UTF-8, else Latin-1.
pub fn decode_pdf_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

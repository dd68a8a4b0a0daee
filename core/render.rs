use crate::assemble::TextBlock;
use crate::error::{AppError, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use log;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::io::{Cursor, Write};
use zip::CompressionMethod;
use zip::write::{SimpleFileOptions, ZipWriter};

const WORD_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const APPLICATION_NAME: &str = "code2doc";

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/><Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/><Override PartName="/docProps/app.xml" ContentType="application/vnd.openxmlformats-officedocument.extended-properties+xml"/></Types>"#;

const PACKAGE_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/><Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties" Target="docProps/app.xml"/></Relationships>"#;

/// Package-level attributes written alongside the paragraphs.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentMeta {
    pub creator: String,
    pub created: DateTime<Utc>,
}

impl DocumentMeta {
    pub fn new(creator: impl Into<String>) -> Self {
        Self {
            creator: creator.into(),
            created: Utc::now(),
        }
    }
}

/// Turns an ordered sequence of blocks into a binary document.
pub trait DocumentRenderer {
    fn render(&self, blocks: &[TextBlock], meta: &DocumentMeta) -> Result<Vec<u8>>;
}

/// Writes a minimal WordprocessingML (`.docx`) package: one unstyled
/// paragraph per block.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocxRenderer;

impl DocxRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl DocumentRenderer for DocxRenderer {
    fn render(&self, blocks: &[TextBlock], meta: &DocumentMeta) -> Result<Vec<u8>> {
        log::debug!("Rendering {} paragraphs as docx...", blocks.len());
        let parts: [(&str, Vec<u8>); 5] = [
            ("[Content_Types].xml", CONTENT_TYPES_XML.as_bytes().to_vec()),
            ("_rels/.rels", PACKAGE_RELS_XML.as_bytes().to_vec()),
            ("docProps/core.xml", core_properties_xml(meta)?),
            ("docProps/app.xml", app_properties_xml(blocks.len())?),
            ("word/document.xml", document_xml(blocks)?),
        ];

        let options =
            SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in parts {
            log::trace!("Writing part {} ({} bytes)", name, content.len());
            zip.start_file(name, options)?;
            zip.write_all(&content)?;
        }
        let bytes = zip.finish()?.into_inner();
        log::debug!("Rendered docx package of {} bytes.", bytes.len());
        Ok(bytes)
    }
}

fn xml_error(e: impl std::fmt::Display) -> AppError {
    AppError::Render(format!("XML write error: {}", e))
}

fn new_part_writer() -> Result<Writer<Vec<u8>>> {
    let mut writer = Writer::new(Vec::new());
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))
        .map_err(xml_error)?;
    Ok(writer)
}

fn write_text_element(
    writer: &mut Writer<Vec<u8>>,
    name: &str,
    attributes: &[(&str, &str)],
    text: &str,
) -> Result<()> {
    let start = BytesStart::new(name).with_attributes(attributes.iter().copied());
    writer.write_event(Event::Start(start)).map_err(xml_error)?;
    writer
        .write_event(Event::Text(BytesText::new(text)))
        .map_err(xml_error)?;
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(xml_error)?;
    Ok(())
}

/// False for characters XML 1.0 cannot carry. Tabs are split out into
/// `<w:tab/>` before this is applied.
fn is_xml_char(c: char) -> bool {
    !matches!(c, '\u{FFFE}' | '\u{FFFF}') && (!c.is_control() || matches!(c, '\t' | '\n' | '\r'))
}

fn document_xml(blocks: &[TextBlock]) -> Result<Vec<u8>> {
    let mut writer = new_part_writer()?;
    writer
        .write_event(Event::Start(
            BytesStart::new("w:document").with_attributes([("xmlns:w", WORD_NS)]),
        ))
        .map_err(xml_error)?;
    writer
        .write_event(Event::Start(BytesStart::new("w:body")))
        .map_err(xml_error)?;
    for block in blocks {
        write_paragraph(&mut writer, block.text())?;
    }
    writer
        .write_event(Event::Empty(BytesStart::new("w:sectPr")))
        .map_err(xml_error)?;
    writer
        .write_event(Event::End(BytesEnd::new("w:body")))
        .map_err(xml_error)?;
    writer
        .write_event(Event::End(BytesEnd::new("w:document")))
        .map_err(xml_error)?;
    Ok(writer.into_inner())
}

fn write_paragraph(writer: &mut Writer<Vec<u8>>, text: &str) -> Result<()> {
    writer
        .write_event(Event::Start(BytesStart::new("w:p")))
        .map_err(xml_error)?;
    writer
        .write_event(Event::Start(BytesStart::new("w:r")))
        .map_err(xml_error)?;
    for (i, segment) in text.split('\t').enumerate() {
        if i > 0 {
            writer
                .write_event(Event::Empty(BytesStart::new("w:tab")))
                .map_err(xml_error)?;
        }
        let clean: String = segment.chars().filter(|c| is_xml_char(*c)).collect();
        if clean.is_empty() {
            continue;
        }
        write_text_element(writer, "w:t", &[("xml:space", "preserve")], &clean)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new("w:r")))
        .map_err(xml_error)?;
    writer
        .write_event(Event::End(BytesEnd::new("w:p")))
        .map_err(xml_error)?;
    Ok(())
}

fn core_properties_xml(meta: &DocumentMeta) -> Result<Vec<u8>> {
    let timestamp = meta.created.to_rfc3339_opts(SecondsFormat::Secs, true);
    let creator: String = meta.creator.chars().filter(|c| is_xml_char(*c)).collect();
    let mut writer = new_part_writer()?;
    writer
        .write_event(Event::Start(
            BytesStart::new("cp:coreProperties").with_attributes([
                (
                    "xmlns:cp",
                    "http://schemas.openxmlformats.org/package/2006/metadata/core-properties",
                ),
                ("xmlns:dc", "http://purl.org/dc/elements/1.1/"),
                ("xmlns:dcterms", "http://purl.org/dc/terms/"),
                ("xmlns:dcmitype", "http://purl.org/dc/dcmitype/"),
                ("xmlns:xsi", "http://www.w3.org/2001/XMLSchema-instance"),
            ]),
        ))
        .map_err(xml_error)?;
    write_text_element(&mut writer, "dc:creator", &[], &creator)?;
    write_text_element(&mut writer, "cp:lastModifiedBy", &[], &creator)?;
    for name in ["dcterms:created", "dcterms:modified"] {
        write_text_element(
            &mut writer,
            name,
            &[("xsi:type", "dcterms:W3CDTF")],
            &timestamp,
        )?;
    }
    writer
        .write_event(Event::End(BytesEnd::new("cp:coreProperties")))
        .map_err(xml_error)?;
    Ok(writer.into_inner())
}

fn app_properties_xml(paragraphs: usize) -> Result<Vec<u8>> {
    let mut writer = new_part_writer()?;
    writer
        .write_event(Event::Start(BytesStart::new("Properties").with_attributes([(
            "xmlns",
            "http://schemas.openxmlformats.org/officeDocument/2006/extended-properties",
        )])))
        .map_err(xml_error)?;
    write_text_element(&mut writer, "Application", &[], APPLICATION_NAME)?;
    write_text_element(&mut writer, "Paragraphs", &[], &paragraphs.to_string())?;
    writer
        .write_event(Event::End(BytesEnd::new("Properties")))
        .map_err(xml_error)?;
    Ok(writer.into_inner())
}

//! FB2 serialization.
//!
//! Writes the assembled document through quick-xml: metadata, the
//! stylesheet enumerating every style the mapper can emit, one nested
//! section per feed group and entry, then the cover and image binaries.
//! Entry markup is already valid FB2 produced by the mapper and is embedded
//! raw.

use std::io::Write;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{DateTime, Local};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::app::Result;
use crate::book::EntryGroups;
use crate::config::BookConfig;
use crate::domain::ImageAsset;
use crate::markup::{style_names, style_rule};

pub const PROGRAM_NAME: &str = "bindery";

const FICTIONBOOK_NS: &str = "http://www.gribuser.ru/xml/fictionbook/2.0";
const XLINK_NS: &str = "http://www.w3.org/1999/xlink";

/// Serialize the whole document. Write failures are fatal for the run.
pub fn write_book<W: Write>(
    writer: W,
    config: &BookConfig,
    groups: &EntryGroups,
    binaries: &[ImageAsset],
    cover_png: &[u8],
) -> Result<()> {
    let now = Local::now();
    let entry_count: usize = groups.iter().map(|(_, entries)| entries.len()).sum();
    tracing::info!(
        "Serializing {} groups with {entry_count} entries and {} images",
        groups.len(),
        binaries.len()
    );

    let mut xml = Writer::new(writer);
    xml.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;

    let mut root = BytesStart::new("FictionBook");
    root.push_attribute(("xmlns", FICTIONBOOK_NS));
    root.push_attribute(("xmlns:l", XLINK_NS));
    xml.write_event(Event::Start(root))?;

    write_description(&mut xml, config, groups, entry_count, &now)?;
    write_stylesheet(&mut xml)?;
    write_body(&mut xml, groups)?;

    write_binary(&mut xml, "cover.png", "image/png", cover_png)?;
    for asset in binaries {
        write_binary(&mut xml, &asset.name, asset.content_type, &asset.bytes)?;
    }

    xml.write_event(Event::End(BytesEnd::new("FictionBook")))?;
    Ok(())
}

fn write_description<W: Write>(
    xml: &mut Writer<W>,
    config: &BookConfig,
    groups: &EntryGroups,
    entry_count: usize,
    now: &DateTime<Local>,
) -> Result<()> {
    xml.write_event(Event::Start(BytesStart::new("description")))?;

    xml.write_event(Event::Start(BytesStart::new("title-info")))?;
    text_element(xml, "genre", "comp_www")?;
    xml.write_event(Event::Start(BytesStart::new("author")))?;
    text_element(xml, "first-name", &now.format("%d.%m - %A - %H:%M").to_string())?;
    xml.write_event(Event::End(BytesEnd::new("author")))?;
    text_element(xml, "book-title", &config.title)?;
    text_element(xml, "lang", &config.language)?;
    xml.write_event(Event::Start(BytesStart::new("coverpage")))?;
    let mut cover_ref = BytesStart::new("image");
    cover_ref.push_attribute(("l:href", "#cover.png"));
    xml.write_event(Event::Empty(cover_ref))?;
    xml.write_event(Event::End(BytesEnd::new("coverpage")))?;
    text_element(
        xml,
        "annotation",
        &format!("Feeds: {}; entries: {entry_count}.", groups.len()),
    )?;
    xml.write_event(Event::End(BytesEnd::new("title-info")))?;

    xml.write_event(Event::Start(BytesStart::new("document-info")))?;
    xml.write_event(Event::Start(BytesStart::new("author")))?;
    text_element(xml, "nickname", PROGRAM_NAME)?;
    xml.write_event(Event::End(BytesEnd::new("author")))?;
    text_element(xml, "program-used", PROGRAM_NAME)?;
    text_element(xml, "date", &now.format("%Y-%m-%d").to_string())?;
    let id = format!(
        "{}{:02}",
        now.format("%Y%m%d%H%M%S"),
        now.timestamp_subsec_millis() / 10
    );
    text_element(xml, "id", &id)?;
    xml.write_event(Event::End(BytesEnd::new("document-info")))?;

    xml.write_event(Event::End(BytesEnd::new("description")))?;
    Ok(())
}

fn write_stylesheet<W: Write>(xml: &mut Writer<W>) -> Result<()> {
    xml.write_event(Event::Start(BytesStart::new("stylesheet")))?;
    let css = style_names()
        .iter()
        .map(|name| style_rule(name))
        .collect::<Vec<_>>()
        .join("\n");
    xml.write_event(Event::Text(BytesText::new(&css)))?;
    xml.write_event(Event::End(BytesEnd::new("stylesheet")))?;
    Ok(())
}

fn write_body<W: Write>(xml: &mut Writer<W>, groups: &EntryGroups) -> Result<()> {
    xml.write_event(Event::Start(BytesStart::new("body")))?;

    for (feed_title, entries) in groups {
        xml.write_event(Event::Start(BytesStart::new("section")))?;
        text_element(xml, "title", feed_title)?;

        for entry in entries {
            xml.write_event(Event::Start(BytesStart::new("section")))?;
            text_element(xml, "title", &entry.entry_title)?;
            text_element(
                xml,
                "subtitle",
                &entry.published_at.format("%d %B %Y (%A) - %H:%M:%S").to_string(),
            )?;
            // already FB2 markup, embed as-is
            xml.write_event(Event::Text(BytesText::from_escaped(entry.markup.as_str())))?;
            xml.write_event(Event::End(BytesEnd::new("section")))?;
        }

        xml.write_event(Event::End(BytesEnd::new("section")))?;
    }

    xml.write_event(Event::End(BytesEnd::new("body")))?;
    Ok(())
}

fn write_binary<W: Write>(
    xml: &mut Writer<W>,
    id: &str,
    content_type: &str,
    bytes: &[u8],
) -> Result<()> {
    let mut binary = BytesStart::new("binary");
    binary.push_attribute(("id", id));
    binary.push_attribute(("content-type", content_type));
    xml.write_event(Event::Start(binary))?;
    xml.write_event(Event::Text(BytesText::new(&BASE64.encode(bytes))))?;
    xml.write_event(Event::End(BytesEnd::new("binary")))?;
    Ok(())
}

fn text_element<W: Write>(xml: &mut Writer<W>, name: &str, text: &str) -> Result<()> {
    xml.write_event(Event::Start(BytesStart::new(name)))?;
    xml.write_event(Event::Text(BytesText::new(text)))?;
    xml.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::domain::TransformedEntry;

    fn sample_groups() -> EntryGroups {
        vec![(
            "Feed & Co".to_string(),
            vec![TransformedEntry {
                feed_title: "Feed & Co".to_string(),
                entry_title: "First <entry>".to_string(),
                published_at: Utc.with_ymd_and_hms(2026, 8, 7, 12, 30, 45).unwrap(),
                markup: "<p>Hello <style name=\"b\">world</style></p>".to_string(),
            }],
        )]
    }

    fn render(groups: &EntryGroups, binaries: &[ImageAsset]) -> String {
        let mut out = Vec::new();
        write_book(&mut out, &BookConfig::default(), groups, binaries, b"PNGDATA").unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_document_skeleton() {
        let doc = render(&sample_groups(), &[]);
        assert!(doc.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
        assert!(doc.contains(r#"<FictionBook xmlns="http://www.gribuser.ru/xml/fictionbook/2.0" xmlns:l="http://www.w3.org/1999/xlink">"#));
        assert!(doc.contains("<genre>comp_www</genre>"));
        assert!(doc.contains("<book-title>bindery feeds</book-title>"));
        assert!(doc.contains(r##"<coverpage><image l:href="#cover.png"/></coverpage>"##));
        assert!(doc.contains("<annotation>Feeds: 1; entries: 1.</annotation>"));
        assert!(doc.contains("<program-used>bindery</program-used>"));
        assert!(doc.ends_with("</FictionBook>"));
    }

    #[test]
    fn test_stylesheet_enumerates_styles() {
        let doc = render(&sample_groups(), &[]);
        assert!(doc.contains(".s {text-decoration: line-through;}"));
        assert!(doc.contains(".b {font-weight: bold;}"));
        assert!(doc.contains(".mono {font-family: monospace;}"));
        assert!(doc.contains(".xxlarge {font-size: xx-large;}"));
        assert!(doc.contains(".sc {font-variant: small-caps;}"));
        assert!(doc.contains(".col0 {color: #000000;}"));
        assert!(doc.contains(".colf {color: #ffffff;}"));
    }

    #[test]
    fn test_sections_and_subtitle_format() {
        let doc = render(&sample_groups(), &[]);
        assert!(doc.contains("<title>Feed &amp; Co</title>"));
        assert!(doc.contains("<title>First &lt;entry&gt;</title>"));
        assert!(doc.contains("<subtitle>07 August 2026 (Friday) - 12:30:45</subtitle>"));
        // markup is embedded raw, not re-escaped
        assert!(doc.contains("<p>Hello <style name=\"b\">world</style></p>"));
    }

    #[test]
    fn test_cover_binary_precedes_images() {
        let asset = ImageAsset::jpeg("1.jpg".to_string(), vec![0xff, 0xd8, 0xff]);
        let doc = render(&sample_groups(), &[asset]);

        let cover_at = doc
            .find(r#"<binary id="cover.png" content-type="image/png">"#)
            .unwrap();
        let image_at = doc
            .find(r#"<binary id="1.jpg" content-type="image/jpeg">"#)
            .unwrap();
        assert!(cover_at < image_at);
        assert!(doc.contains(&BASE64.encode(b"PNGDATA")));
        assert!(doc.contains(&BASE64.encode([0xff, 0xd8, 0xff])));
    }
}

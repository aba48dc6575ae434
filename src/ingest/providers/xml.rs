// src/ingest/providers/xml.rs
//! RSS 2.0, RSS 1.0 (RDF) and Atom documents into [`FetchedFeed`].
//!
//! Dates stay raw strings here; interpreting them is the normalizer's job.
//! Elements that feeds repeat by mistake (two `<link>`s, two `<description>`s)
//! are collected and the first non-blank one wins.

use std::borrow::Cow;

use anyhow::{anyhow, bail, Context, Result};
use once_cell::sync::OnceCell;
use quick_xml::de::from_str;
use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use regex::{Captures, Regex};
use serde::Deserialize;

use crate::ingest::types::{FetchedFeed, RawEntry};

/// Element text; attributes are ignored.
#[derive(Debug, Default, Deserialize)]
struct Text {
    #[serde(rename = "$text", default)]
    value: String,
}

fn text(all: Vec<Text>) -> Option<String> {
    all.into_iter()
        .map(|t| t.value)
        .find(|v| !v.trim().is_empty())
}

// ---- RSS 2.0 / RSS 1.0 ----

#[derive(Debug, Deserialize)]
struct Rss {
    channel: RssChannel,
}

#[derive(Debug, Deserialize)]
struct RssChannel {
    #[serde(default)]
    title: Vec<Text>,
    #[serde(rename = "item", default)]
    items: Vec<RssItem>,
}

/// RSS 1.0 puts `<item>` next to `<channel>` instead of inside it.
#[derive(Debug, Deserialize)]
struct Rdf {
    channel: Option<RdfChannel>,
    #[serde(rename = "item", default)]
    items: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RdfChannel {
    #[serde(default)]
    title: Vec<Text>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    #[serde(default)]
    title: Vec<Text>,
    #[serde(default)]
    link: Vec<Text>,
    #[serde(default)]
    guid: Vec<Guid>,
    #[serde(default)]
    description: Vec<Text>,
    #[serde(rename = "content:encoded", default)]
    content_encoded: Vec<Text>,
    #[serde(rename = "pubDate", default)]
    pub_date: Vec<Text>,
    #[serde(rename = "dc:date", default)]
    dc_date: Vec<Text>,
    #[serde(rename = "dcterms:created", default)]
    dcterms_created: Vec<Text>,
}

#[derive(Debug, Deserialize)]
struct Guid {
    #[serde(rename = "@isPermaLink")]
    is_perma_link: Option<String>,
    #[serde(rename = "$text", default)]
    value: String,
}

impl From<RssItem> for RawEntry {
    fn from(it: RssItem) -> Self {
        let link = text(it.link).or_else(|| {
            it.guid
                .into_iter()
                .filter(|g| g.is_perma_link.as_deref() != Some("false"))
                .map(|g| g.value)
                .find(|v| !v.trim().is_empty())
        });
        RawEntry {
            title: text(it.title),
            link,
            summary: None,
            description: text(it.description).or_else(|| text(it.content_encoded)),
            published: text(it.pub_date),
            updated: text(it.dc_date),
            created: text(it.dcterms_created),
        }
    }
}

// ---- Atom 1.0 (and the 0.3 date names) ----

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(default)]
    title: Vec<Text>,
    #[serde(rename = "entry", default)]
    entries: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    #[serde(default)]
    title: Vec<Text>,
    #[serde(rename = "link", default)]
    links: Vec<AtomLink>,
    #[serde(default)]
    summary: Vec<Text>,
    #[serde(default)]
    content: Vec<Text>,
    #[serde(default)]
    published: Vec<Text>,
    #[serde(default)]
    issued: Vec<Text>,
    #[serde(default)]
    updated: Vec<Text>,
    #[serde(default)]
    modified: Vec<Text>,
    #[serde(default)]
    created: Vec<Text>,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: Option<String>,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

fn pick_atom_link(links: Vec<AtomLink>) -> Option<String> {
    let alternate = links
        .iter()
        .position(|l| matches!(l.rel.as_deref(), None | Some("alternate")));
    let idx = alternate.unwrap_or(0);
    links.into_iter().nth(idx).and_then(|l| l.href)
}

impl From<AtomEntry> for RawEntry {
    fn from(e: AtomEntry) -> Self {
        RawEntry {
            title: text(e.title),
            link: pick_atom_link(e.links),
            summary: text(e.summary),
            description: text(e.content),
            published: text(e.published).or_else(|| text(e.issued)),
            updated: text(e.updated).or_else(|| text(e.modified)),
            created: text(e.created),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedKind {
    Rss,
    Rdf,
    Atom,
}

/// Sniff the root element. Prefixes are ignored (`rdf:RDF` -> `RDF`).
pub fn detect_kind(xml: &str) -> Result<FeedKind> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event().context("reading feed root element")? {
            Event::Start(e) | Event::Empty(e) => {
                let local = e.local_name();
                return match local.as_ref() {
                    b"rss" => Ok(FeedKind::Rss),
                    b"RDF" => Ok(FeedKind::Rdf),
                    b"feed" => Ok(FeedKind::Atom),
                    other => Err(anyhow!(
                        "unsupported feed root element <{}>",
                        String::from_utf8_lossy(other)
                    )),
                };
            }
            Event::Eof => bail!("document has no root element"),
            _ => {}
        }
    }
}

fn parse_document(xml: &str) -> Result<FetchedFeed> {
    let feed = match detect_kind(xml)? {
        FeedKind::Rss => {
            let rss: Rss = from_str(xml).context("parsing rss xml")?;
            FetchedFeed {
                title: text(rss.channel.title),
                entries: rss.channel.items.into_iter().map(RawEntry::from).collect(),
                anomaly: None,
            }
        }
        FeedKind::Rdf => {
            let rdf: Rdf = from_str(xml).context("parsing rdf xml")?;
            FetchedFeed {
                title: rdf.channel.and_then(|c| text(c.title)),
                entries: rdf.items.into_iter().map(RawEntry::from).collect(),
                anomaly: None,
            }
        }
        FeedKind::Atom => {
            let atom: AtomFeed = from_str(xml).context("parsing atom xml")?;
            FetchedFeed {
                title: text(atom.title),
                entries: atom.entries.into_iter().map(RawEntry::from).collect(),
                anomaly: None,
            }
        }
    };
    Ok(feed)
}

/// Atom `type="xhtml"` constructs carry child markup instead of text. Rewrite
/// them as escaped text so the serde structs see a plain string; titles lose
/// their tags, bodies keep them for the summary cleaner.
fn flatten_xhtml(xml: &str) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::with_capacity(xml.len()));
    loop {
        match reader.read_event().context("scanning xhtml constructs")? {
            Event::Start(e) if is_xhtml(&e) => {
                let end = e.to_end().into_owned();
                let inner = reader.read_text(e.name()).context("reading xhtml construct")?;
                let markup = unwrap_xhtml_div(&inner);
                let flat = if e.local_name().as_ref() == b"title" {
                    crate::ingest::clean_summary(markup)
                } else {
                    markup.to_string()
                };
                writer.write_event(Event::Start(e))?;
                writer.write_event(Event::Text(BytesText::new(&flat)))?;
                writer.write_event(Event::End(end))?;
            }
            Event::Eof => break,
            ev => writer.write_event(ev)?,
        }
    }
    String::from_utf8(writer.into_inner()).context("xhtml rewrite produced invalid utf-8")
}

fn is_xhtml(e: &BytesStart<'_>) -> bool {
    matches!(e.try_get_attribute("type"), Ok(Some(a)) if a.value.as_ref() == b"xhtml")
}

/// Strip the wrapping `<div xmlns="http://www.w3.org/1999/xhtml">`.
fn unwrap_xhtml_div(inner: &str) -> &str {
    static RE_DIV: OnceCell<Regex> = OnceCell::new();
    let re = RE_DIV.get_or_init(|| {
        Regex::new(r"(?s)^\s*<(?:[A-Za-z_][\w.-]*:)?div\b[^>]*>(.*)</(?:[A-Za-z_][\w.-]*:)?div>\s*$")
            .unwrap()
    });
    match re.captures(inner).and_then(|c| c.get(1)) {
        Some(m) => m.as_str().trim(),
        None => inner.trim(),
    }
}

/// Parse a feed document. Documents that only fail because of HTML named
/// entities (`&nbsp;`, `&mdash;`, ...) are repaired and flagged via `anomaly`.
pub fn parse_feed(xml: &str) -> Result<FetchedFeed> {
    let xml = xml.trim_start_matches('\u{feff}');
    let flattened;
    let xml = if xml.contains("xhtml") {
        match flatten_xhtml(xml) {
            Ok(out) => {
                flattened = out;
                flattened.as_str()
            }
            Err(e) => {
                tracing::debug!(target: "ingest", error = ?e, "xhtml rewrite skipped");
                xml
            }
        }
    } else {
        xml
    };
    match parse_document(xml) {
        Ok(feed) => Ok(feed),
        Err(first) => {
            let repaired = repair_html_entities(xml);
            if repaired == xml {
                return Err(first);
            }
            let mut feed = parse_document(&repaired).map_err(|_| first)?;
            feed.anomaly = Some("undefined entities in document were repaired".to_string());
            Ok(feed)
        }
    }
}

/// Decode with the charset named in the XML declaration (UTF-8 when absent),
/// then parse.
pub fn parse_feed_bytes(body: &[u8]) -> Result<FetchedFeed> {
    parse_feed(&decode_document(body))
}

fn decode_document(body: &[u8]) -> Cow<'_, str> {
    let mut reader = Reader::from_reader(body);
    // The first event is the declaration when there is one; reading it
    // switches the decoder to the declared encoding.
    let _ = reader.read_event();
    match reader.decoder().decode(body) {
        Ok(decoded) => decoded,
        Err(_) => String::from_utf8_lossy(body),
    }
}

/// Decode named entities XML does not define; unknown names become literal text.
fn repair_html_entities(xml: &str) -> String {
    static RE_ENTITY: OnceCell<Regex> = OnceCell::new();
    let re = RE_ENTITY.get_or_init(|| Regex::new(r"&([A-Za-z][A-Za-z0-9]*);").unwrap());
    re.replace_all(xml, |caps: &Captures| {
        let whole = &caps[0];
        match &caps[1] {
            "amp" | "lt" | "gt" | "quot" | "apos" => whole.to_string(),
            _ => {
                let decoded = html_escape::decode_html_entities(whole);
                if decoded == whole {
                    format!("&amp;{}", &whole[1..])
                } else {
                    html_escape::encode_text(&decoded).into_owned()
                }
            }
        }
    })
    .into_owned()
}

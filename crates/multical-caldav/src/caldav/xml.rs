//! XML bodies and multistatus parsing for WebDAV/CalDAV requests.
//!
//! Request bodies are written with the prefixes of the configured server
//! flavor. Responses are parsed into a small [`XmlElement`] tree with
//! namespaces resolved; which elements count as `href`, `prop`, ... is left to
//! the [`ResponseDialect`](super::dialect::ResponseDialect) in use.

use std::io::Cursor;

use chrono::{DateTime, Utc};
use multical_core::TimeWindow;
use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::name::ResolveResult;
use quick_xml::reader::NsReader;

use crate::error::{CalDavError, CalDavResult};

/// DAV namespace
pub const DAV_NS: &str = "DAV:";
/// CalDAV namespace
pub const CALDAV_NS: &str = "urn:ietf:params:xml:ns:caldav";

/// Properties requested inside `calendar-data` by calendar-query.
const QUERY_EVENT_PROPS: &[&str] = &[
    "SUMMARY",
    "UID",
    "DTSTART",
    "DTEND",
    "DURATION",
    "RRULE",
    "RDATE",
    "EXRULE",
    "EXDATE",
    "RECURRENCE-ID",
];

/// Namespace prefixes used when writing request bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prefixes {
    pub dav: &'static str,
    pub caldav: &'static str,
}

impl Prefixes {
    /// `D:` / `C:`
    pub const STANDARD: Self = Self {
        dav: "D",
        caldav: "C",
    };
    /// `d:` / `c:`
    pub const ICLOUD: Self = Self {
        dav: "d",
        caldav: "c",
    };
}

fn write_error<E>(e: E) -> CalDavError
where
    E: std::error::Error + Send + Sync + 'static,
{
    CalDavError::internal("failed to write XML request body").with_source(e)
}

/// Writes one request body with a fixed pair of prefixes.
struct BodyWriter {
    writer: Writer<Cursor<Vec<u8>>>,
    prefixes: Prefixes,
}

impl BodyWriter {
    fn new(prefixes: Prefixes) -> Self {
        Self {
            writer: Writer::new(Cursor::new(Vec::new())),
            prefixes,
        }
    }

    fn dav(&self, local: &str) -> String {
        format!("{}:{local}", self.prefixes.dav)
    }

    fn cal(&self, local: &str) -> String {
        format!("{}:{local}", self.prefixes.caldav)
    }

    /// Opens the root element and declares both namespaces on it.
    fn root(&mut self, name: &str) -> CalDavResult<()> {
        let mut start = BytesStart::new(name);
        let dav_decl = format!("xmlns:{}", self.prefixes.dav);
        let cal_decl = format!("xmlns:{}", self.prefixes.caldav);
        start.push_attribute((dav_decl.as_str(), DAV_NS));
        start.push_attribute((cal_decl.as_str(), CALDAV_NS));
        self.writer
            .write_event(Event::Start(start))
            .map_err(write_error)
    }

    fn start(&mut self, name: &str, attrs: &[(&str, &str)]) -> CalDavResult<()> {
        let mut start = BytesStart::new(name);
        for attr in attrs {
            start.push_attribute(*attr);
        }
        self.writer
            .write_event(Event::Start(start))
            .map_err(write_error)
    }

    fn empty(&mut self, name: &str, attrs: &[(&str, &str)]) -> CalDavResult<()> {
        let mut empty = BytesStart::new(name);
        for attr in attrs {
            empty.push_attribute(*attr);
        }
        self.writer
            .write_event(Event::Empty(empty))
            .map_err(write_error)
    }

    fn text(&mut self, name: &str, text: &str) -> CalDavResult<()> {
        self.start(name, &[])?;
        self.writer
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(write_error)?;
        self.end(name)
    }

    fn end(&mut self, name: &str) -> CalDavResult<()> {
        self.writer
            .write_event(Event::End(BytesEnd::new(name)))
            .map_err(write_error)
    }

    /// PROPFIND body requesting the given `(is_caldav, local)` properties.
    fn propfind(mut self, props: &[(bool, &str)]) -> CalDavResult<String> {
        let propfind = self.dav("propfind");
        let prop = self.dav("prop");
        self.root(&propfind)?;
        self.start(&prop, &[])?;
        for (is_caldav, local) in props {
            let name = if *is_caldav { self.cal(local) } else { self.dav(local) };
            self.empty(&name, &[])?;
        }
        self.end(&prop)?;
        self.end(&propfind)?;
        self.finish()
    }

    fn finish(self) -> CalDavResult<String> {
        String::from_utf8(self.writer.into_inner().into_inner()).map_err(write_error)
    }
}

/// PROPFIND body asking for `current-user-principal`.
pub fn principal_body(prefixes: Prefixes) -> CalDavResult<String> {
    BodyWriter::new(prefixes).propfind(&[(false, "current-user-principal")])
}

/// PROPFIND body asking for `calendar-home-set`.
pub fn home_set_body(prefixes: Prefixes) -> CalDavResult<String> {
    BodyWriter::new(prefixes).propfind(&[(true, "calendar-home-set")])
}

/// PROPFIND body used to enumerate the collections below a home set.
pub fn calendar_list_body(prefixes: Prefixes) -> CalDavResult<String> {
    BodyWriter::new(prefixes).propfind(&[
        (false, "resourcetype"),
        (false, "displayname"),
        (true, "supported-calendar-component-set"),
    ])
}

/// REPORT calendar-query body, time-ranged when a window is given.
pub fn calendar_query_body(prefixes: Prefixes, window: Option<&TimeWindow>) -> CalDavResult<String> {
    let mut w = BodyWriter::new(prefixes);
    let (query, prop, data, comp, cprop, filter, comp_filter) = (
        w.cal("calendar-query"),
        w.dav("prop"),
        w.cal("calendar-data"),
        w.cal("comp"),
        w.cal("prop"),
        w.cal("filter"),
        w.cal("comp-filter"),
    );

    w.root(&query)?;
    w.start(&prop, &[])?;
    w.empty(&w.dav("getetag"), &[])?;
    w.start(&data, &[])?;
    w.start(&comp, &[("name", "VCALENDAR")])?;
    w.empty(&cprop, &[("name", "VERSION")])?;
    w.start(&comp, &[("name", "VEVENT")])?;
    for name in QUERY_EVENT_PROPS {
        w.empty(&cprop, &[("name", name)])?;
    }
    w.end(&comp)?;
    w.empty(&comp, &[("name", "VTIMEZONE")])?;
    w.end(&comp)?;
    w.end(&data)?;
    w.end(&prop)?;

    w.start(&filter, &[])?;
    w.start(&comp_filter, &[("name", "VCALENDAR")])?;
    match window {
        Some(window) => {
            let start = format_compact_utc(window.start);
            let end = format_compact_utc(window.end);
            w.start(&comp_filter, &[("name", "VEVENT")])?;
            w.empty(
                &w.cal("time-range"),
                &[("start", start.as_str()), ("end", end.as_str())],
            )?;
            w.end(&comp_filter)?;
        }
        None => w.empty(&comp_filter, &[("name", "VEVENT")])?,
    }
    w.end(&comp_filter)?;
    w.end(&filter)?;
    w.end(&query)?;
    w.finish()
}

/// REPORT calendar-multiget body listing every href.
pub fn calendar_multiget_body(prefixes: Prefixes, hrefs: &[String]) -> CalDavResult<String> {
    let mut w = BodyWriter::new(prefixes);
    let (multiget, prop, href) = (w.cal("calendar-multiget"), w.dav("prop"), w.dav("href"));

    w.root(&multiget)?;
    w.start(&prop, &[])?;
    w.empty(&w.dav("getetag"), &[])?;
    w.empty(&w.cal("calendar-data"), &[])?;
    w.end(&prop)?;
    for h in hrefs {
        w.text(&href, h)?;
    }
    w.end(&multiget)?;
    w.finish()
}

/// Formats a timestamp as compact UTC (`YYYYMMDDTHHMMSSZ`).
pub fn format_compact_utc(dt: DateTime<Utc>) -> String {
    dt.format("%Y%m%dT%H%M%SZ").to_string()
}

/// One parsed XML element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlElement {
    /// Resolved namespace URI, `None` when unbound or undeclared.
    pub namespace: Option<String>,
    /// Local name, prefix stripped.
    pub name: String,
    pub attributes: Vec<(String, String)>,
    /// Concatenated text and CDATA content.
    pub text: String,
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Text content with surrounding whitespace removed.
    pub fn trimmed_text(&self) -> &str {
        self.text.trim()
    }

    /// Depth-first search over descendants (excluding `self`).
    pub fn find_all<'a>(&'a self, pred: &dyn Fn(&XmlElement) -> bool) -> Vec<&'a XmlElement> {
        let mut out = Vec::new();
        self.collect(pred, &mut out);
        out
    }

    fn collect<'a>(&'a self, pred: &dyn Fn(&XmlElement) -> bool, out: &mut Vec<&'a XmlElement>) {
        for child in &self.children {
            if pred(child) {
                out.push(child);
            }
            child.collect(pred, out);
        }
    }
}

fn parse_error<E>(e: E) -> CalDavError
where
    E: std::error::Error + Send + Sync + 'static,
{
    CalDavError::protocol("malformed XML response").with_source(e)
}

fn resolved_namespace(ns: ResolveResult<'_>) -> Option<String> {
    match ns {
        ResolveResult::Bound(ns) => Some(String::from_utf8_lossy(ns.as_ref()).into_owned()),
        // undeclared prefixes land here; dialects decide what that means
        ResolveResult::Unbound | ResolveResult::Unknown(_) => None,
    }
}

fn open_element(ns: ResolveResult<'_>, e: &BytesStart<'_>) -> CalDavResult<XmlElement> {
    let mut attributes = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(parse_error)?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value().map_err(parse_error)?.into_owned();
        attributes.push((key, value));
    }
    Ok(XmlElement {
        namespace: resolved_namespace(ns),
        name: String::from_utf8_lossy(e.local_name().as_ref()).into_owned(),
        attributes,
        text: String::new(),
        children: Vec::new(),
    })
}

/// Parses an XML document into its root element.
///
/// Syntax errors, unclosed elements and bodies without a root element are
/// protocol errors; an HTML error page on a 2xx response ends up here.
pub fn parse_document(xml: &str) -> CalDavResult<XmlElement> {
    let mut reader = NsReader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        let (ns, event) = reader.read_resolved_event().map_err(parse_error)?;
        match event {
            Event::Start(e) => {
                let element = open_element(ns, &e)?;
                stack.push(element);
            }
            Event::Empty(e) => {
                let element = open_element(ns, &e)?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None if root.is_none() => root = Some(element),
                    None => return Err(CalDavError::protocol("multiple root elements")),
                }
            }
            Event::End(_) => {
                let Some(element) = stack.pop() else {
                    return Err(CalDavError::protocol("unbalanced closing tag"));
                };
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None if root.is_none() => root = Some(element),
                    None => return Err(CalDavError::protocol("multiple root elements")),
                }
            }
            Event::Text(t) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&t.unescape().map_err(parse_error)?);
                }
            }
            Event::CData(c) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(CalDavError::protocol("unexpected end of XML document"));
    }
    root.ok_or_else(|| CalDavError::protocol("empty XML response"))
}

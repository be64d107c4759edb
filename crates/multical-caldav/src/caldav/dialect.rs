//! Reading multistatus responses.
//!
//! Servers disagree on how strictly they namespace their answers, so element
//! matching is a strategy picked from the configured
//! [`ServerFlavor`](super::config::ServerFlavor). Everything else (walking
//! `response`/`propstat`, filtering non-2xx property blocks, reading hrefs)
//! is shared.

use super::xml::{CALDAV_NS, DAV_NS, XmlElement};

/// A child collection listed by a calendar enumeration PROPFIND.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionEntry {
    pub href: String,
    pub display_name: Option<String>,
    /// `resourcetype` contains `collection`.
    pub is_collection: bool,
    /// Component names advertised by `supported-calendar-component-set`.
    pub components: Vec<String>,
}

impl CollectionEntry {
    /// An event calendar: a collection advertising VEVENT.
    pub fn is_event_calendar(&self) -> bool {
        self.is_collection && self.supports_events()
    }

    pub fn supports_events(&self) -> bool {
        self.components
            .iter()
            .any(|c| c.eq_ignore_ascii_case("VEVENT"))
    }
}

/// Parses the code out of a `HTTP/1.1 200 OK` status line.
pub fn parse_status_line(line: &str) -> Option<u16> {
    line.split_whitespace().nth(1)?.parse().ok()
}

fn is_success(status: Option<u16>) -> bool {
    status.is_none_or(|s| (200..300).contains(&s))
}

/// Element matching strategy for multistatus documents.
pub trait ResponseDialect: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether `element` is `local` in namespace `ns` under this dialect.
    fn matches(&self, element: &XmlElement, ns: &str, local: &str) -> bool;

    fn child<'a>(&self, element: &'a XmlElement, ns: &str, local: &str) -> Option<&'a XmlElement> {
        element.children.iter().find(|c| self.matches(c, ns, local))
    }

    fn children<'a>(
        &self,
        element: &'a XmlElement,
        ns: &str,
        local: &str,
    ) -> Vec<&'a XmlElement> {
        element
            .children
            .iter()
            .filter(|c| self.matches(c, ns, local))
            .collect()
    }

    /// The `response` elements of a multistatus root.
    ///
    /// A root that does not match `multistatus` yields nothing.
    fn responses<'a>(&self, root: &'a XmlElement) -> Vec<&'a XmlElement> {
        if !self.matches(root, DAV_NS, "multistatus") {
            return Vec::new();
        }
        self.children(root, DAV_NS, "response")
    }

    fn extract_href(&self, response: &XmlElement) -> Option<String> {
        let href = self.child(response, DAV_NS, "href")?.trimmed_text();
        (!href.is_empty()).then(|| href.to_string())
    }

    /// Response-level status, when the server sent one.
    fn extract_status(&self, response: &XmlElement) -> Option<u16> {
        self.child(response, DAV_NS, "status")
            .and_then(|s| parse_status_line(s.trimmed_text()))
    }

    /// A property from the response's successful `propstat` blocks.
    fn extract_property<'a>(
        &self,
        response: &'a XmlElement,
        ns: &str,
        local: &str,
    ) -> Option<&'a XmlElement> {
        self.children(response, DAV_NS, "propstat")
            .into_iter()
            .filter(|propstat| {
                let status = self
                    .child(propstat, DAV_NS, "status")
                    .and_then(|s| parse_status_line(s.trimmed_text()));
                is_success(status)
            })
            .filter_map(|propstat| self.child(propstat, DAV_NS, "prop"))
            .find_map(|prop| self.child(prop, ns, local))
    }

    /// The `href` values inside a property (principal, home sets).
    fn extract_property_hrefs(&self, response: &XmlElement, ns: &str, local: &str) -> Vec<String> {
        self.extract_property(response, ns, local)
            .map(|prop| {
                self.children(prop, DAV_NS, "href")
                    .into_iter()
                    .map(|h| h.trimmed_text().to_string())
                    .filter(|h| !h.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every listed resource with its collection properties.
    fn extract_collections(&self, root: &XmlElement) -> Vec<CollectionEntry> {
        self.responses(root)
            .into_iter()
            .filter_map(|response| {
                let href = self.extract_href(response)?;
                let display_name = self
                    .extract_property(response, DAV_NS, "displayname")
                    .map(|d| d.trimmed_text().to_string())
                    .filter(|d| !d.is_empty());
                let resource_type = self.extract_property(response, DAV_NS, "resourcetype");
                let is_collection =
                    resource_type.is_some_and(|rt| self.child(rt, DAV_NS, "collection").is_some());
                let components = self
                    .extract_property(response, CALDAV_NS, "supported-calendar-component-set")
                    .map(|set| {
                        self.children(set, CALDAV_NS, "comp")
                            .into_iter()
                            .filter_map(|c| c.attribute("name").map(str::to_string))
                            .collect()
                    })
                    .unwrap_or_default();

                Some(CollectionEntry {
                    href,
                    display_name,
                    is_collection,
                    components,
                })
            })
            .collect()
    }
}

/// Matches on resolved namespace URI plus local name.
#[derive(Debug, Clone, Copy, Default)]
pub struct NamespacedDialect;

impl ResponseDialect for NamespacedDialect {
    fn name(&self) -> &'static str {
        "namespaced"
    }

    fn matches(&self, element: &XmlElement, ns: &str, local: &str) -> bool {
        element.name == local && element.namespace.as_deref() == Some(ns)
    }
}

/// Matches on local name alone, whatever namespace the server used.
#[derive(Debug, Clone, Copy, Default)]
pub struct TagNameDialect;

impl ResponseDialect for TagNameDialect {
    fn name(&self) -> &'static str {
        "tag-name"
    }

    fn matches(&self, element: &XmlElement, _ns: &str, local: &str) -> bool {
        element.name.eq_ignore_ascii_case(local)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caldav::xml::parse_document;

    const LISTING: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<D:multistatus xmlns:D="DAV:" xmlns:C="urn:ietf:params:xml:ns:caldav">
  <D:response>
    <D:href>/dav/calendars/alice/</D:href>
    <D:propstat>
      <D:prop><D:resourcetype><D:collection/></D:resourcetype></D:prop>
      <D:status>HTTP/1.1 200 OK</D:status>
    </D:propstat>
  </D:response>
  <D:response>
    <D:href>/dav/calendars/alice/work/</D:href>
    <D:propstat>
      <D:prop>
        <D:resourcetype><D:collection/><C:calendar/></D:resourcetype>
        <D:displayname>Work</D:displayname>
        <C:supported-calendar-component-set>
          <C:comp name="VEVENT"/>
          <C:comp name="VTODO"/>
        </C:supported-calendar-component-set>
      </D:prop>
      <D:status>HTTP/1.1 200 OK</D:status>
    </D:propstat>
  </D:response>
  <D:response>
    <D:href>/dav/calendars/alice/tasks/</D:href>
    <D:propstat>
      <D:prop>
        <D:resourcetype><D:collection/><C:calendar/></D:resourcetype>
        <C:supported-calendar-component-set><C:comp name="VTODO"/></C:supported-calendar-component-set>
      </D:prop>
      <D:status>HTTP/1.1 200 OK</D:status>
    </D:propstat>
    <D:propstat>
      <D:prop><D:displayname/></D:prop>
      <D:status>HTTP/1.1 404 Not Found</D:status>
    </D:propstat>
  </D:response>
</D:multistatus>"#;

    #[test]
    fn namespaced_collections() {
        let root = parse_document(LISTING).unwrap();
        let entries = NamespacedDialect.extract_collections(&root);
        assert_eq!(entries.len(), 3);

        assert!(entries[0].is_collection);

        let work = &entries[1];
        assert_eq!(work.href, "/dav/calendars/alice/work/");
        assert_eq!(work.display_name.as_deref(), Some("Work"));
        assert!(work.is_collection);
        assert!(work.supports_events());

        let tasks = &entries[2];
        assert!(!tasks.supports_events());
        assert_eq!(tasks.display_name, None);
    }

    #[test]
    fn failed_propstat_is_ignored() {
        let xml = r#"<D:multistatus xmlns:D="DAV:">
  <D:response>
    <D:href>/p/</D:href>
    <D:propstat>
      <D:prop><D:current-user-principal><D:href>/wrong/</D:href></D:current-user-principal></D:prop>
      <D:status>HTTP/1.1 404 Not Found</D:status>
    </D:propstat>
  </D:response>
</D:multistatus>"#;
        let root = parse_document(xml).unwrap();
        let response = NamespacedDialect.responses(&root)[0];
        assert!(
            NamespacedDialect
                .extract_property(response, DAV_NS, "current-user-principal")
                .is_none()
        );
    }

    #[test]
    fn unknown_namespace_yields_nothing_for_namespaced() {
        let xml = r#"<multistatus xmlns="urn:example:other"><response><href>/a</href></response></multistatus>"#;
        let root = parse_document(xml).unwrap();
        assert!(NamespacedDialect.responses(&root).is_empty());
        assert!(NamespacedDialect.extract_collections(&root).is_empty());

        let responses = TagNameDialect.responses(&root);
        assert_eq!(responses.len(), 1);
        assert_eq!(TagNameDialect.extract_href(responses[0]).as_deref(), Some("/a"));
    }

    #[test]
    fn tag_name_dialect_reads_icloud_style() {
        let xml = r#"<multistatus xmlns="DAV:">
  <response>
    <href>/123/principal/</href>
    <propstat>
      <prop>
        <calendar-home-set xmlns="urn:ietf:params:xml:ns:caldav">
          <href xmlns="DAV:">https://p42-caldav.icloud.com/123/calendars/</href>
        </calendar-home-set>
      </prop>
      <status>HTTP/1.1 200 OK</status>
    </propstat>
  </response>
</multistatus>"#;
        let root = parse_document(xml).unwrap();
        let response = TagNameDialect.responses(&root)[0];
        assert_eq!(
            TagNameDialect.extract_property_hrefs(response, CALDAV_NS, "calendar-home-set"),
            vec!["https://p42-caldav.icloud.com/123/calendars/".to_string()]
        );
    }

    #[test]
    fn response_status() {
        let xml = r#"<D:multistatus xmlns:D="DAV:"><D:response><D:href>/gone.ics</D:href><D:status>HTTP/1.1 404 Not Found</D:status></D:response></D:multistatus>"#;
        let root = parse_document(xml).unwrap();
        let response = NamespacedDialect.responses(&root)[0];
        assert_eq!(NamespacedDialect.extract_status(response), Some(404));
        assert_eq!(parse_status_line("HTTP/1.1 207 Multi-Status"), Some(207));
        assert_eq!(parse_status_line("garbage"), None);
    }
}

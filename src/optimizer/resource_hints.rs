//! DNS and connection hints for third-party hosts

use super::State;
use crate::host::Host;
use crate::renderer::{Document, ElementData};
use std::collections::HashSet;

/// How many hosts get a preconnect in addition to dns-prefetch
pub const PRECONNECT_LIMIT: usize = 3;

const RESOURCE_SELECTOR: &str = "a[href], link[href], script[src], img[src]";

/// A host referenced by the page, with the scheme it was first seen under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalHost {
    pub scheme: String,
    pub host: String,
}

/// Distinct foreign hosts in discovery order
pub(crate) fn external_hosts(document: &Document, state: &State) -> Vec<ExternalHost> {
    let own_host = document.url().host_str().map(str::to_string);
    let elements = document
        .query_selector_all(RESOURCE_SELECTOR)
        .unwrap_or_default();

    let mut seen = HashSet::new();
    let mut hosts = Vec::new();
    for element in elements {
        let Some(reference) = document
            .attribute(element, "href")
            .or_else(|| document.attribute(element, "src"))
        else {
            continue;
        };
        let url = match document.resolve_url(reference) {
            Ok(url) => url,
            Err(e) => {
                state.warn(format!("Skipping resource: {}", e));
                continue;
            }
        };
        let Some(host) = url.host_str() else {
            continue;
        };
        if Some(host) == own_host.as_deref() || !seen.insert(host.to_string()) {
            continue;
        }
        hosts.push(ExternalHost {
            scheme: url.scheme().to_string(),
            host: host.to_string(),
        });
    }
    hosts
}

pub(crate) fn add_resource_hints(host: &mut dyn Host, state: &mut State) {
    let hosts = external_hosts(host.document(), state);
    let document = host.document_mut();
    let Some(head) = document.head() else {
        return;
    };

    for (index, external) in hosts.iter().enumerate() {
        let dns = document.create_element_with(
            ElementData::new("link")
                .with_attribute("rel", "dns-prefetch")
                .with_attribute("href", format!("//{}", external.host)),
        );
        document.append_child(head, dns);

        if index < PRECONNECT_LIMIT {
            let preconnect = document.create_element_with(
                ElementData::new("link")
                    .with_attribute("rel", "preconnect")
                    .with_attribute("href", format!("{}://{}", external.scheme, external.host))
                    .with_attribute("crossorigin", ""),
            );
            document.append_child(head, preconnect);
        }
    }
    state.log(format!("Added resource hints for {} domains", hosts.len()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::Page;
    use crate::optimizer::Config;
    use pretty_assertions::assert_eq;

    const HTML: &str = r#"<html><head>
        <link rel="stylesheet" href="https://fonts.example.org/css">
        <script src="https://cdn.example.net/app.js"></script>
        </head><body>
        <a href="/local">Local</a>
        <a href="https://example.com/also-local">Also local</a>
        <img src="https://images.example.io/a.png">
        <a href="http://blog.example.dev/">Blog</a>
        <a href="https://cdn.example.net/other.js">Dup</a>
        <a href="http://[::1">Broken</a>
        <a href="mailto:someone@example.org">Mail</a>
        </body></html>"#;

    fn page() -> Page {
        Page::load("https://example.com/", HTML).unwrap()
    }

    fn hint_hrefs(page: &Page, rel: &str) -> Vec<String> {
        let doc = page.document();
        doc.query_selector_all(&format!("link[rel={}]", rel))
            .unwrap()
            .into_iter()
            .map(|l| doc.attribute(l, "href").unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_external_hosts_in_discovery_order() {
        let page = page();
        let hosts: Vec<_> = external_hosts(page.document(), &State::new(Config::default()))
            .into_iter()
            .map(|h| h.host)
            .collect();
        assert_eq!(
            hosts,
            vec!["fonts.example.org", "cdn.example.net", "images.example.io", "blog.example.dev"]
        );
    }

    #[test]
    fn test_dns_prefetch_for_all_preconnect_for_three() {
        let mut page = page();
        add_resource_hints(&mut page, &mut State::new(Config::default()));

        assert_eq!(
            hint_hrefs(&page, "dns-prefetch"),
            vec![
                "//fonts.example.org",
                "//cdn.example.net",
                "//images.example.io",
                "//blog.example.dev"
            ]
        );
        assert_eq!(
            hint_hrefs(&page, "preconnect"),
            vec![
                "https://fonts.example.org",
                "https://cdn.example.net",
                "https://images.example.io"
            ]
        );
    }
}

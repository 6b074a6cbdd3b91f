//! Above-the-fold CSS extraction
//!
//! A style rule is critical when its selector matches at least one element
//! overlapping the first screen. `@font-face` and `@keyframes` always are;
//! other at-rules never are.

use super::State;
use crate::host::Host;
use crate::renderer::{CssRule, ElementData, NodeId};
use std::collections::HashSet;

/// `id` of the injected `<style>` element
pub const CRITICAL_STYLE_ID: &str = "critical-css";

/// Elements whose box overlaps `[0, viewport height]`
fn above_the_fold(host: &dyn Host) -> HashSet<NodeId> {
    let height = host.viewport().height;
    host.document()
        .elements()
        .into_iter()
        .filter(|&id| {
            let rect = host.bounding_client_rect(id).unwrap_or_default();
            rect.top() < height && rect.bottom() > 0.0
        })
        .collect()
}

/// Critical rules of every readable stylesheet, one per line
pub(crate) fn generate(host: &dyn Host, state: &State) -> String {
    let visible = above_the_fold(host);
    let document = host.document();
    let mut critical = Vec::new();

    for sheet in document.style_sheets() {
        let rules = match sheet.css_rules() {
            Ok(rules) => rules,
            Err(e) => {
                state.warn(format!("Skipping stylesheet: {}", e));
                continue;
            }
        };
        for rule in rules {
            match rule {
                CssRule::Style(style) => match document.query_selector_all(&style.selector_text) {
                    Ok(matched) if matched.iter().any(|id| visible.contains(id)) => {
                        critical.push(rule.css_text());
                    }
                    Ok(_) => {}
                    Err(e) => state.warn(format!("Skipping rule: {}", e)),
                },
                CssRule::FontFace(_) | CssRule::Keyframes(_) => critical.push(rule.css_text()),
                CssRule::Other(_) => {}
            }
        }
    }
    critical.join("\n")
}

/// Put the critical CSS in a `<style>` at the top of `<head>`
///
/// Nothing is inserted when no rule qualifies. An earlier injection is
/// replaced rather than duplicated.
pub(crate) fn apply(host: &mut dyn Host, state: &State) -> bool {
    let css = generate(&*host, state);
    if css.is_empty() {
        state.log("No critical CSS found");
        return false;
    }

    let document = host.document_mut();
    let Some(head) = document.head() else {
        return false;
    };
    if let Some(previous) = document.get_element_by_id(CRITICAL_STYLE_ID) {
        document.detach(previous);
    }

    let style = document
        .create_element_with(ElementData::new("style").with_attribute("id", CRITICAL_STYLE_ID));
    let text = document.create_text(css.as_str());
    document.append_child(style, text);
    document.prepend_child(head, style);

    state.info(format!("Applied {} bytes of critical CSS", css.len()));
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{Host, Page};
    use crate::optimizer::Config;
    use pretty_assertions::assert_eq;

    const HTML: &str = r#"<html><head><meta charset="utf-8">
        <style>
        .hero { color: red; }
        .footer { color: blue; }
        @media (max-width: 600px) { .hero { color: green; } }
        @font-face { font-family: X; src: url(x.woff2); }
        @keyframes spin { from { opacity: 0 } to { opacity: 1 } }
        p:hover { color: black; }
        p:unknown-thing { color: gray; }
        </style>
        </head><body>
        <div class="hero" style="height: 500px"></div>
        <div style="height: 2000px"></div>
        <div class="footer" style="height: 100px"></div>
        </body></html>"#;

    fn page(html: &str) -> Page {
        Page::builder("https://example.com/", html)
            .viewport(1024.0, 768.0)
            .build()
            .unwrap()
    }

    #[test]
    fn test_generate_picks_visible_rules() {
        let page = page(HTML);
        let css = generate(&page, &State::new(Config::default()));
        assert_eq!(
            css,
            [
                ".hero { color: red; }",
                "@font-face { font-family: X; src: url(x.woff2); }",
                "@keyframes spin { from { opacity: 0 } to { opacity: 1 } }",
            ]
            .join("\n")
        );
    }

    #[test]
    fn test_generate_follows_scroll() {
        let mut page = page(HTML);
        page.scroll_to(2000.0);
        let css = generate(&page, &State::new(Config::default()));
        assert!(css.contains(".footer"));
        assert!(!css.contains(".hero"));
    }

    #[test]
    fn test_apply_inserts_first_in_head() {
        let mut page = page(HTML);
        let state = State::new(Config::default());
        assert!(apply(&mut page, &state));
        assert!(apply(&mut page, &state));

        let doc = page.document();
        let head = doc.head().unwrap();
        let first = doc.element_children(head)[0];
        assert_eq!(doc.attribute(first, "id"), Some(CRITICAL_STYLE_ID));
        assert_eq!(doc.query_selector_all("#critical-css").unwrap().len(), 1);
    }

    #[test]
    fn test_apply_skips_empty_result() {
        let mut page = page(
            r#"<html><head><style>.missing { color: red; }</style></head><body><p>x</p></body></html>"#,
        );
        let state = State::new(Config::default());
        assert!(!apply(&mut page, &state));
        assert!(page.document().get_element_by_id(CRITICAL_STYLE_ID).is_none());
    }
}

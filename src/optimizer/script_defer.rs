//! Rewrites blocking external scripts to load deferred

use super::State;
use crate::host::Host;
use crate::renderer::{Document, ElementData, NodeId};

/// Attribute that keeps a script blocking
pub const CRITICAL_MARKER: &str = "data-critical";

/// Whether the script element should be rewritten with `defer`
pub fn should_defer(script: &ElementData) -> bool {
    let external = script.get_attribute("src").is_some_and(|src| !src.trim().is_empty());
    let is_module = script
        .get_attribute("type")
        .is_some_and(|t| t.trim().eq_ignore_ascii_case("module"));

    external
        && !script.has_attribute("async")
        && !script.has_attribute("defer")
        && !script.has_attribute("nomodule")
        && !script.has_attribute(CRITICAL_MARKER)
        && !is_module
}

pub(crate) fn defer_scripts(host: &mut dyn Host, state: &mut State) {
    let document = host.document_mut();
    for script in document.elements_by_tag("script") {
        if document.element(script).is_some_and(should_defer) {
            replace_deferred(document, script, state);
        }
    }
}

/// Swap `script` for a copy that carries `defer`
fn replace_deferred(document: &mut Document, script: NodeId, state: &mut State) {
    let Some(original) = document.element(script) else {
        return;
    };
    let mut deferred = original.clone();
    deferred.set_attribute("defer", "");
    let src = deferred.get_attribute("src").unwrap_or_default().to_string();

    let replacement = document.create_element_with(deferred);
    for child in document.children(script).to_vec() {
        document.append_child(replacement, child);
    }
    if document.replace_child(script, replacement) {
        state.metrics.resources_saved += 1;
        state.log(format!("Deferred script: {}", src));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::Page;
    use crate::optimizer::Config;
    use pretty_assertions::assert_eq;

    const HTML: &str = r#"<html><head>
        <script src="/app.js" id="app" data-x="1"></script>
        <script src="/a.js" async></script>
        <script src="/d.js" defer></script>
        <script src="/m.js" type="module"></script>
        <script src="/legacy.js" nomodule></script>
        <script src="/critical.js" data-critical></script>
        <script>console.log("inline")</script>
        </head><body><script src="/footer.js"></script></body></html>"#;

    #[test]
    fn test_should_defer() {
        assert!(should_defer(&ElementData::new("script").with_attribute("src", "/x.js")));
        assert!(!should_defer(&ElementData::new("script")));
        assert!(!should_defer(
            &ElementData::new("script")
                .with_attribute("src", "/x.js")
                .with_attribute("type", "Module")
        ));
    }

    #[test]
    fn test_only_blocking_scripts_are_rewritten() {
        let mut page = Page::load("https://example.com/", HTML).unwrap();
        let mut state = State::new(Config::default());
        defer_scripts(&mut page, &mut state);

        assert_eq!(state.metrics.resources_saved, 2);

        let doc = page.document();
        let deferred: Vec<_> = doc
            .query_selector_all("script[defer]")
            .unwrap()
            .into_iter()
            .map(|s| doc.attribute(s, "src").unwrap().to_string())
            .collect();
        assert_eq!(deferred, vec!["/app.js", "/d.js", "/footer.js"]);

        let app = doc.get_element_by_id("app").unwrap();
        assert_eq!(doc.attribute(app, "data-x"), Some("1"));
        assert_eq!(doc.attribute(app, "defer"), Some(""));
    }

    #[test]
    fn test_rewrite_is_not_repeated() {
        let mut page = Page::load("https://example.com/", HTML).unwrap();
        let mut state = State::new(Config::default());
        defer_scripts(&mut page, &mut state);
        defer_scripts(&mut page, &mut state);
        assert_eq!(state.metrics.resources_saved, 2);
    }
}

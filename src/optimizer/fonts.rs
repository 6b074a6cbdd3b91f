//! Font loading tweaks
//!
//! Every readable `@font-face` without a `font-display` gets `swap`, and the
//! first two distinct font files referenced by those rules are preloaded.

use super::State;
use crate::host::Host;
use crate::renderer::{CssRule, ElementData, NodeId};
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

/// How many font files get a preload hint
pub const PRELOAD_LIMIT: usize = 2;

static FONT_URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"url\(['"]?([^'")]+)['"]?\)"#).expect("Invalid font URL regex"));

/// First `url(...)` reference in a `src` descriptor
pub fn first_font_url(src: &str) -> Option<&str> {
    FONT_URL_RE
        .captures(src)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
}

pub(crate) fn optimize_fonts(host: &mut dyn Host, state: &mut State) {
    let document = host.document_mut();
    let page_url = document.url().clone();
    let mut font_urls: Vec<Url> = Vec::new();
    // `<style>` elements whose text must follow their edited rules
    let mut rewritten: Vec<(NodeId, String)> = Vec::new();

    for sheet in document.style_sheets_mut() {
        let base = sheet.href().cloned().unwrap_or_else(|| page_url.clone());
        let inline_owner = sheet.href().map_or(sheet.owner(), |_| None);
        let mut changed = false;
        let rules = match sheet.css_rules_mut() {
            Ok(rules) => rules,
            Err(e) => {
                state.warn(format!("Skipping stylesheet: {}", e));
                continue;
            }
        };

        for rule in rules.iter_mut() {
            let CssRule::FontFace(face) = rule else {
                continue;
            };
            if face.descriptor("font-display").is_none() {
                face.set_descriptor("font-display", "swap");
                state.log("Added font-display: swap");
                changed = true;
            }
            let Some(raw) = face.descriptor("src").and_then(first_font_url) else {
                continue;
            };
            match base.join(raw) {
                Ok(url) if !font_urls.contains(&url) => font_urls.push(url),
                Ok(_) => {}
                Err(e) => state.warn(format!("Skipping font URL '{}': {}", raw, e)),
            }
        }

        if let Some(owner) = inline_owner.filter(|_| changed) {
            rewritten.push((owner, sheet.css_text()));
        }
    }

    for (owner, css) in rewritten {
        document.set_text_content(owner, css);
    }

    let Some(head) = document.head() else {
        return;
    };
    for url in font_urls.into_iter().take(PRELOAD_LIMIT) {
        let hint = document.create_element_with(
            ElementData::new("link")
                .with_attribute("rel", "preload")
                .with_attribute("as", "font")
                .with_attribute("type", "font/woff2")
                .with_attribute("crossorigin", "anonymous")
                .with_attribute("href", url.as_str()),
        );
        document.append_child(head, hint);
        state.log(format!("Preloading font: {}", url));
    }
}

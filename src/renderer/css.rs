//! Stylesheet model and rule-by-rule CSS parser using cssparser
//!
//! Rules are kept close to their source text. Style rules carry their
//! selector text and declarations; `@font-face` carries its descriptors so
//! they can be edited; `@keyframes` and every other at-rule keep their body
//! verbatim.

use super::dom::NodeId;
use crate::utils::{PageError, Result};
use cssparser::{Delimiter, Delimiters, ParseError, Parser, ParserInput, Token};
use url::Url;

/// CSS declaration (property: value)
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    /// Lowercase property name
    pub property: String,
    /// Raw value text, without `!important`
    pub value: String,
    pub important: bool,
}

impl Declaration {
    pub fn new(property: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            value: value.into(),
            important: false,
        }
    }

    /// Serialized form, e.g. `color: red;`
    pub fn css_text(&self) -> String {
        if self.important {
            format!("{}: {} !important;", self.property, self.value)
        } else {
            format!("{}: {};", self.property, self.value)
        }
    }
}

fn block_text(declarations: &[Declaration]) -> String {
    declarations
        .iter()
        .map(Declaration::css_text)
        .collect::<Vec<_>>()
        .join(" ")
}

/// A plain selector rule
#[derive(Debug, Clone, PartialEq)]
pub struct StyleRule {
    pub selector_text: String,
    pub declarations: Vec<Declaration>,
}

/// An `@font-face` rule
#[derive(Debug, Clone, PartialEq)]
pub struct FontFaceRule {
    pub descriptors: Vec<Declaration>,
}

impl FontFaceRule {
    /// Value of a descriptor such as `font-display`
    pub fn descriptor(&self, name: &str) -> Option<&str> {
        self.descriptors
            .iter()
            .find(|d| d.property == name)
            .map(|d| d.value.as_str())
    }

    /// Set a descriptor, replacing an existing one in place
    pub fn set_descriptor(&mut self, name: &str, value: &str) {
        match self.descriptors.iter_mut().find(|d| d.property == name) {
            Some(existing) => existing.value = value.to_string(),
            None => self.descriptors.push(Declaration::new(name, value)),
        }
    }
}

/// An `@keyframes` rule (including vendor-prefixed forms)
#[derive(Debug, Clone, PartialEq)]
pub struct KeyframesRule {
    /// At-keyword without `@`, e.g. `keyframes` or `-webkit-keyframes`
    pub keyword: String,
    pub name: String,
    pub body: String,
}

/// A top-level rule of a stylesheet
#[derive(Debug, Clone, PartialEq)]
pub enum CssRule {
    Style(StyleRule),
    FontFace(FontFaceRule),
    Keyframes(KeyframesRule),
    /// Any other at-rule (`@media`, `@import`, ...), carried as text
    Other(String),
}

impl CssRule {
    /// Serialized text of the rule
    pub fn css_text(&self) -> String {
        match self {
            CssRule::Style(rule) => {
                format!("{} {{ {} }}", rule.selector_text, block_text(&rule.declarations))
            }
            CssRule::FontFace(rule) => format!("@font-face {{ {} }}", block_text(&rule.descriptors)),
            CssRule::Keyframes(rule) => {
                format!("@{} {} {{ {} }}", rule.keyword, rule.name, rule.body)
            }
            CssRule::Other(text) => text.clone(),
        }
    }
}

/// A stylesheet attached to the document
#[derive(Debug, Clone)]
pub struct StyleSheet {
    href: Option<Url>,
    owner: Option<NodeId>,
    /// `None` when the rules cannot be read (cross-origin)
    rules: Option<Vec<CssRule>>,
}

impl StyleSheet {
    /// Sheet from an inline `<style>` element
    pub fn inline(owner: Option<NodeId>, css: &str) -> Self {
        Self {
            href: None,
            owner,
            rules: Some(CssParser::new().parse(css)),
        }
    }

    /// Readable sheet loaded from `href`
    pub fn linked(owner: Option<NodeId>, href: Url, css: &str) -> Self {
        Self {
            href: Some(href),
            owner,
            rules: Some(CssParser::new().parse(css)),
        }
    }

    /// Sheet whose rules are hidden from the page
    pub fn cross_origin(owner: Option<NodeId>, href: Url) -> Self {
        Self {
            href: Some(href),
            owner,
            rules: None,
        }
    }

    pub fn href(&self) -> Option<&Url> {
        self.href.as_ref()
    }

    /// Element that owns the sheet (`<style>` or `<link>`)
    pub fn owner(&self) -> Option<NodeId> {
        self.owner
    }

    fn access_error(&self) -> PageError {
        PageError::StylesheetAccess(
            self.href
                .as_ref()
                .map(Url::to_string)
                .unwrap_or_else(|| "inline".to_string()),
        )
    }

    /// Rules of the sheet, or an access error for cross-origin sheets
    pub fn css_rules(&self) -> Result<&[CssRule]> {
        self.rules.as_deref().ok_or_else(|| self.access_error())
    }

    /// Serialized rules, one per line; empty for unreadable sheets
    pub fn css_text(&self) -> String {
        self.rules
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(CssRule::css_text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Mutable rules of the sheet, or an access error for cross-origin sheets
    pub fn css_rules_mut(&mut self) -> Result<&mut Vec<CssRule>> {
        let err = self.access_error();
        self.rules.as_mut().ok_or(err)
    }
}

/// CSS parser using cssparser crate
pub struct CssParser {}

impl CssParser {
    pub fn new() -> Self {
        Self {}
    }

    /// Parse CSS content into top-level rules; malformed rules are skipped
    pub fn parse(&self, content: &str) -> Vec<CssRule> {
        let mut input = ParserInput::new(content);
        let mut parser = Parser::new(&mut input);
        let mut rules = Vec::new();

        loop {
            parser.skip_whitespace();
            if parser.try_parse(cdo_or_cdc).is_ok() {
                continue;
            }
            if parser.is_exhausted() {
                break;
            }

            match self.parse_rule(&mut parser) {
                Ok(Some(rule)) => rules.push(rule),
                Ok(None) => {}
                Err(_) => self.skip_to_next_rule(&mut parser),
            }
        }

        rules
    }

    /// Parse the declarations of an inline `style` attribute
    pub fn parse_inline_style(&self, content: &str) -> Vec<Declaration> {
        let mut input = ParserInput::new(content);
        let mut parser = Parser::new(&mut input);
        self.parse_declarations(&mut parser)
    }

    /// Parse a single top-level rule; `None` when the rule was consumed but dropped
    fn parse_rule<'i>(&self, parser: &mut Parser<'i, '_>) -> std::result::Result<Option<CssRule>, ParseError<'i, ()>> {
        let at_keyword = parser.try_parse(|p| match p.next() {
            Ok(Token::AtKeyword(keyword)) => Ok(keyword.to_string()),
            _ => Err(()),
        });
        match at_keyword {
            Ok(keyword) => self.parse_at_rule(parser, keyword).map(Some),
            Err(_) => self.parse_style_rule(parser),
        }
    }

    fn parse_style_rule<'i>(
        &self,
        parser: &mut Parser<'i, '_>,
    ) -> std::result::Result<Option<CssRule>, ParseError<'i, ()>> {
        let selector_text = self.consume_until(parser, Delimiter::CurlyBracketBlock)?;
        parser.expect_curly_bracket_block()?;
        let declarations = parser
            .parse_nested_block(|p| Ok::<_, ParseError<'i, ()>>(self.parse_declarations(p)))?;

        if selector_text.is_empty() {
            return Ok(None);
        }

        Ok(Some(CssRule::Style(StyleRule {
            selector_text: collapse_whitespace(&selector_text),
            declarations,
        })))
    }

    fn parse_at_rule<'i>(
        &self,
        parser: &mut Parser<'i, '_>,
        keyword: String,
    ) -> std::result::Result<CssRule, ParseError<'i, ()>> {
        let prelude = self.consume_until(parser, Delimiter::CurlyBracketBlock | Delimiter::Semicolon)?;
        let has_block = matches!(parser.next(), Ok(Token::CurlyBracketBlock));

        if !has_block {
            // Statement at-rule such as @import or @charset
            return Ok(CssRule::Other(join_prelude(&keyword, &prelude) + ";"));
        }

        let lowered = keyword.to_ascii_lowercase();
        if lowered == "font-face" {
            let descriptors = parser
                .parse_nested_block(|p| Ok::<_, ParseError<'i, ()>>(self.parse_declarations(p)))?;
            return Ok(CssRule::FontFace(FontFaceRule { descriptors }));
        }

        let body = parser.parse_nested_block(|p| Ok::<_, ParseError<'i, ()>>(consume_all(p)))?;
        if lowered == "keyframes" || lowered.ends_with("-keyframes") {
            return Ok(CssRule::Keyframes(KeyframesRule {
                keyword,
                name: prelude,
                body,
            }));
        }

        Ok(CssRule::Other(format!("{} {{ {} }}", join_prelude(&keyword, &prelude), body)))
    }

    /// Collect the source text up to (not including) one of `delimiters`
    fn consume_until<'i>(
        &self,
        parser: &mut Parser<'i, '_>,
        delimiters: Delimiters,
    ) -> std::result::Result<String, ParseError<'i, ()>> {
        parser.parse_until_before(delimiters, |p| Ok::<_, ParseError<'i, ()>>(consume_all(p)))
    }

    /// Parse declarations inside a rule block
    fn parse_declarations<'i>(&self, parser: &mut Parser<'i, '_>) -> Vec<Declaration> {
        let mut declarations = Vec::new();

        loop {
            parser.skip_whitespace();
            if parser.is_exhausted() {
                break;
            }

            let result = parser.parse_until_after(Delimiter::Semicolon, |p| {
                let property = p.expect_ident()?.to_ascii_lowercase();
                p.expect_colon()?;
                let raw = consume_all(p);
                Ok::<_, ParseError<'i, ()>>(split_important(property, &raw))
            });

            // Malformed declarations are dropped; parse_until_after already
            // moved past the next semicolon.
            if let Ok(decl) = result {
                if !decl.value.is_empty() {
                    declarations.push(decl);
                }
            }
        }

        declarations
    }

    /// Skip to the next rule (after closing brace or semicolon)
    fn skip_to_next_rule(&self, parser: &mut Parser<'_, '_>) {
        loop {
            match parser.next() {
                Ok(Token::CurlyBracketBlock) | Ok(Token::Semicolon) | Err(_) => break,
                Ok(_) => continue,
            }
        }
    }
}

impl Default for CssParser {
    fn default() -> Self {
        Self::new()
    }
}

/// `<!--` and `-->` may wrap a whole sheet inside `<style>`
fn cdo_or_cdc(parser: &mut Parser<'_, '_>) -> std::result::Result<(), ()> {
    match parser.next() {
        Ok(Token::CDO) | Ok(Token::CDC) => Ok(()),
        _ => Err(()),
    }
}

/// Consume everything left in `parser`, returning the trimmed source slice
fn consume_all(parser: &mut Parser<'_, '_>) -> String {
    let start = parser.position();
    while parser.next_including_whitespace_and_comments().is_ok() {}
    parser.slice_from(start).trim().to_string()
}

fn join_prelude(keyword: &str, prelude: &str) -> String {
    if prelude.is_empty() {
        format!("@{}", keyword)
    } else {
        format!("@{} {}", keyword, prelude)
    }
}

fn split_important(property: String, raw: &str) -> Declaration {
    let lowered = raw.to_ascii_lowercase();
    if let Some(pos) = lowered.rfind("!important") {
        if lowered[pos + "!important".len()..].trim().is_empty() {
            return Declaration {
                property,
                value: raw[..pos].trim().to_string(),
                important: true,
            };
        }
    }
    Declaration {
        property,
        value: raw.to_string(),
        important: false,
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

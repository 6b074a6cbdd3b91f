//! CSS selector parsing and matching
//!
//! Selectors are tokenized with cssparser and matched right-to-left against
//! the arena DOM. Dynamic states (`:hover`, `:focus`, ...) and pseudo-elements
//! parse fine but never match, which is what a static page snapshot gives.

use super::dom::{Document, NodeId, NodeType};
use crate::utils::{PageError, Result};
use cssparser::{ParseError, Parser, ParserInput, Token};

type ParseResult<'i, T> = std::result::Result<T, ParseError<'i, ()>>;

/// How a compound relates to the compound on its left
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    /// `a b`
    Descendant,
    /// `a > b`
    Child,
    /// `a + b`
    NextSibling,
    /// `a ~ b`
    SubsequentSibling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttrOperator {
    Equals,
    Includes,
    DashMatch,
    Prefix,
    Suffix,
    Substring,
}

#[derive(Debug, Clone, PartialEq)]
enum NthKind {
    Child,
    LastChild,
    OfType,
    LastOfType,
}

#[derive(Debug, Clone, PartialEq)]
enum SimpleSelector {
    Universal,
    Type(String),
    Id(String),
    Class(String),
    Attribute {
        name: String,
        matcher: Option<(AttrOperator, String)>,
        case_insensitive: bool,
    },
    Root,
    Empty,
    Link,
    Checked,
    Disabled,
    Enabled,
    OnlyChild,
    OnlyOfType,
    Nth { kind: NthKind, a: i32, b: i32 },
    Not(SelectorList),
    Is(SelectorList),
    /// Pseudo-elements and user-interaction states
    Never,
}

#[derive(Debug, Clone, PartialEq)]
struct CompoundSelector(Vec<SimpleSelector>);

#[derive(Debug, Clone, PartialEq)]
struct ComplexSelector {
    /// Left to right; the combinator of the first part is unused
    parts: Vec<(Combinator, CompoundSelector)>,
}

/// A parsed, comma-separated selector list
#[derive(Debug, Clone, PartialEq)]
pub struct SelectorList(Vec<ComplexSelector>);

impl SelectorList {
    /// Parse selector text; syntax errors become `PageError::InvalidSelector`
    pub fn parse(text: &str) -> Result<Self> {
        let mut input = ParserInput::new(text);
        let mut parser = Parser::new(&mut input);
        parser
            .parse_entirely(parse_selector_list)
            .map_err(|_| PageError::InvalidSelector(text.to_string()))
    }

    /// Whether any selector in the list matches the element
    pub fn matches(&self, doc: &Document, id: NodeId) -> bool {
        doc.element(id).is_some() && self.0.iter().any(|s| s.matches(doc, id))
    }
}

fn parse_selector_list<'i>(parser: &mut Parser<'i, '_>) -> ParseResult<'i, SelectorList> {
    let selectors = parser.parse_comma_separated(parse_complex)?;
    Ok(SelectorList(selectors))
}

fn parse_complex<'i>(parser: &mut Parser<'i, '_>) -> ParseResult<'i, ComplexSelector> {
    parser.skip_whitespace();
    let mut parts = vec![(Combinator::Descendant, parse_compound(parser)?)];

    loop {
        let mut saw_whitespace = false;
        let combinator = loop {
            let state = parser.state();
            let token = match parser.next_including_whitespace() {
                Ok(token) => token.clone(),
                Err(_) => return Ok(ComplexSelector { parts }),
            };
            match token {
                Token::WhiteSpace(_) => saw_whitespace = true,
                Token::Delim('>') => break Combinator::Child,
                Token::Delim('+') => break Combinator::NextSibling,
                Token::Delim('~') => break Combinator::SubsequentSibling,
                _ if saw_whitespace => {
                    parser.reset(&state);
                    break Combinator::Descendant;
                }
                _ => return Err(parser.new_custom_error(())),
            }
        };
        parser.skip_whitespace();
        parts.push((combinator, parse_compound(parser)?));
    }
}

fn parse_compound<'i>(parser: &mut Parser<'i, '_>) -> ParseResult<'i, CompoundSelector> {
    let mut simples = Vec::new();

    loop {
        let state = parser.state();
        let token = match parser.next_including_whitespace() {
            Ok(token) => token.clone(),
            Err(_) => break,
        };
        let simple = match token {
            Token::Ident(name) if simples.is_empty() => {
                SimpleSelector::Type(name.to_ascii_lowercase())
            }
            Token::Delim('*') if simples.is_empty() => SimpleSelector::Universal,
            Token::IDHash(id) => SimpleSelector::Id(id.to_string()),
            Token::Delim('.') => {
                let next = parser.next_including_whitespace()?.clone();
                match next {
                    Token::Ident(class) => SimpleSelector::Class(class.to_string()),
                    _ => return Err(parser.new_custom_error(())),
                }
            }
            Token::SquareBracketBlock => parser.parse_nested_block(parse_attribute)?,
            Token::Colon => parse_pseudo(parser)?,
            _ => {
                parser.reset(&state);
                break;
            }
        };
        simples.push(simple);
    }

    if simples.is_empty() {
        return Err(parser.new_custom_error(()));
    }
    Ok(CompoundSelector(simples))
}

fn parse_attribute<'i>(parser: &mut Parser<'i, '_>) -> ParseResult<'i, SimpleSelector> {
    let name = parser.expect_ident()?.to_ascii_lowercase();
    if parser.is_exhausted() {
        return Ok(SimpleSelector::Attribute {
            name,
            matcher: None,
            case_insensitive: false,
        });
    }

    let token = parser.next()?.clone();
    let operator = match token {
        Token::Delim('=') => AttrOperator::Equals,
        Token::IncludeMatch => AttrOperator::Includes,
        Token::DashMatch => AttrOperator::DashMatch,
        Token::PrefixMatch => AttrOperator::Prefix,
        Token::SuffixMatch => AttrOperator::Suffix,
        Token::SubstringMatch => AttrOperator::Substring,
        _ => return Err(parser.new_custom_error(())),
    };
    let token = parser.next()?.clone();
    let value = match token {
        Token::Ident(v) | Token::QuotedString(v) => v.to_string(),
        _ => return Err(parser.new_custom_error(())),
    };
    let case_insensitive = parser
        .try_parse(|p| p.expect_ident_matching("i"))
        .is_ok();

    Ok(SimpleSelector::Attribute {
        name,
        matcher: Some((operator, value)),
        case_insensitive,
    })
}

fn parse_pseudo<'i>(parser: &mut Parser<'i, '_>) -> ParseResult<'i, SimpleSelector> {
    let token = parser.next_including_whitespace()?.clone();
    match token {
        // Pseudo-element (`::before`, `::part(x)`)
        Token::Colon => {
            let name = parser.next_including_whitespace()?.clone();
            match name {
                Token::Ident(_) => Ok(SimpleSelector::Never),
                Token::Function(_) => {
                    parser.parse_nested_block(|p| {
                        while p.next().is_ok() {}
                        Ok::<_, ParseError<'i, ()>>(())
                    })?;
                    Ok(SimpleSelector::Never)
                }
                _ => Err(parser.new_custom_error(())),
            }
        }
        Token::Ident(name) => {
            let simple = match name.to_ascii_lowercase().as_str() {
                "root" => SimpleSelector::Root,
                "empty" => SimpleSelector::Empty,
                "link" | "any-link" => SimpleSelector::Link,
                "checked" => SimpleSelector::Checked,
                "disabled" => SimpleSelector::Disabled,
                "enabled" => SimpleSelector::Enabled,
                "first-child" => nth(NthKind::Child, 0, 1),
                "last-child" => nth(NthKind::LastChild, 0, 1),
                "first-of-type" => nth(NthKind::OfType, 0, 1),
                "last-of-type" => nth(NthKind::LastOfType, 0, 1),
                "only-child" => SimpleSelector::OnlyChild,
                "only-of-type" => SimpleSelector::OnlyOfType,
                "hover" | "active" | "focus" | "focus-visible" | "focus-within" | "visited"
                | "target" | "target-within" | "before" | "after" | "first-line"
                | "first-letter" => SimpleSelector::Never,
                _ => return Err(parser.new_custom_error(())),
            };
            Ok(simple)
        }
        Token::Function(name) => {
            let lowered = name.to_ascii_lowercase();
            match lowered.as_str() {
                "not" => Ok(SimpleSelector::Not(
                    parser.parse_nested_block(parse_selector_list)?,
                )),
                "is" | "where" | "matches" | "-webkit-any" => Ok(SimpleSelector::Is(
                    parser.parse_nested_block(parse_selector_list)?,
                )),
                "nth-child" | "nth-last-child" | "nth-of-type" | "nth-last-of-type" => {
                    let kind = match lowered.as_str() {
                        "nth-child" => NthKind::Child,
                        "nth-last-child" => NthKind::LastChild,
                        "nth-of-type" => NthKind::OfType,
                        _ => NthKind::LastOfType,
                    };
                    let (a, b) = parser.parse_nested_block(|p| {
                        p.skip_whitespace();
                        let ab = cssparser::parse_nth(p)?;
                        Ok::<_, ParseError<'i, ()>>(ab)
                    })?;
                    Ok(nth(kind, a, b))
                }
                _ => Err(parser.new_custom_error(())),
            }
        }
        _ => Err(parser.new_custom_error(())),
    }
}

fn nth(kind: NthKind, a: i32, b: i32) -> SimpleSelector {
    SimpleSelector::Nth { kind, a, b }
}

impl ComplexSelector {
    fn matches(&self, doc: &Document, id: NodeId) -> bool {
        match self.parts.len() {
            0 => false,
            len => matches_from(doc, &self.parts, len - 1, id),
        }
    }
}

fn matches_from(
    doc: &Document,
    parts: &[(Combinator, CompoundSelector)],
    index: usize,
    id: NodeId,
) -> bool {
    let (combinator, compound) = &parts[index];
    if !compound.matches(doc, id) {
        return false;
    }
    if index == 0 {
        return true;
    }

    match combinator {
        Combinator::Child => {
            parent_element(doc, id).is_some_and(|p| matches_from(doc, parts, index - 1, p))
        }
        Combinator::Descendant => {
            let mut current = parent_element(doc, id);
            while let Some(ancestor) = current {
                if matches_from(doc, parts, index - 1, ancestor) {
                    return true;
                }
                current = parent_element(doc, ancestor);
            }
            false
        }
        Combinator::NextSibling => previous_siblings(doc, id)
            .last()
            .is_some_and(|s| matches_from(doc, parts, index - 1, *s)),
        Combinator::SubsequentSibling => previous_siblings(doc, id)
            .iter()
            .any(|s| matches_from(doc, parts, index - 1, *s)),
    }
}

fn parent_element(doc: &Document, id: NodeId) -> Option<NodeId> {
    doc.parent(id).filter(|p| doc.element(*p).is_some())
}

fn sibling_elements(doc: &Document, id: NodeId) -> Vec<NodeId> {
    match doc.parent(id) {
        Some(parent) => doc.element_children(parent),
        None => vec![id],
    }
}

fn previous_siblings(doc: &Document, id: NodeId) -> Vec<NodeId> {
    let siblings = sibling_elements(doc, id);
    let pos = siblings.iter().position(|s| *s == id).unwrap_or(0);
    siblings[..pos].to_vec()
}

/// 1-based position of `id` among the (optionally same-type) siblings
fn sibling_index(doc: &Document, id: NodeId, same_type: bool, from_end: bool) -> i32 {
    let tag = doc.tag_name(id);
    let mut siblings: Vec<NodeId> = sibling_elements(doc, id)
        .into_iter()
        .filter(|s| !same_type || doc.tag_name(*s) == tag)
        .collect();
    if from_end {
        siblings.reverse();
    }
    siblings.iter().position(|s| *s == id).map_or(0, |p| p as i32 + 1)
}

/// `an+b` test, widened so saturated coefficients cannot overflow
fn nth_matches(a: i32, b: i32, index: i32) -> bool {
    let (a, b, index) = (i64::from(a), i64::from(b), i64::from(index));
    if a == 0 {
        return index == b;
    }
    let diff = index - b;
    diff % a == 0 && diff / a >= 0
}

fn is_form_control(tag: &str) -> bool {
    matches!(
        tag,
        "button" | "input" | "select" | "textarea" | "option" | "optgroup" | "fieldset"
    )
}

impl CompoundSelector {
    fn matches(&self, doc: &Document, id: NodeId) -> bool {
        self.0.iter().all(|s| s.matches(doc, id))
    }
}

impl SimpleSelector {
    fn matches(&self, doc: &Document, id: NodeId) -> bool {
        let Some(element) = doc.element(id) else {
            return false;
        };
        match self {
            SimpleSelector::Universal => true,
            SimpleSelector::Type(tag) => element.tag_name == *tag,
            SimpleSelector::Id(value) => element.id() == Some(value.as_str()),
            SimpleSelector::Class(class) => element.has_class(class),
            SimpleSelector::Attribute {
                name,
                matcher,
                case_insensitive,
            } => {
                let Some(actual) = element.get_attribute(name) else {
                    return false;
                };
                let Some((operator, expected)) = matcher else {
                    return true;
                };
                let (actual, expected) = if *case_insensitive {
                    (actual.to_ascii_lowercase(), expected.to_ascii_lowercase())
                } else {
                    (actual.to_string(), expected.clone())
                };
                match operator {
                    AttrOperator::Equals => actual == expected,
                    AttrOperator::Includes => actual.split_whitespace().any(|w| w == expected),
                    AttrOperator::DashMatch => {
                        actual == expected || actual.starts_with(&format!("{}-", expected))
                    }
                    AttrOperator::Prefix => !expected.is_empty() && actual.starts_with(&expected),
                    AttrOperator::Suffix => !expected.is_empty() && actual.ends_with(&expected),
                    AttrOperator::Substring => !expected.is_empty() && actual.contains(&expected),
                }
            }
            SimpleSelector::Root => doc.parent(id) == Some(doc.root()),
            SimpleSelector::Empty => doc
                .children(id)
                .iter()
                .all(|c| matches!(doc.node(*c).map(|n| &n.node_type), Some(NodeType::Comment(_)))),
            SimpleSelector::Link => {
                matches!(element.tag_name.as_str(), "a" | "area" | "link")
                    && element.has_attribute("href")
            }
            SimpleSelector::Checked => {
                element.has_attribute("checked")
                    || (element.tag_name == "option" && element.has_attribute("selected"))
            }
            SimpleSelector::Disabled => {
                is_form_control(&element.tag_name) && element.has_attribute("disabled")
            }
            SimpleSelector::Enabled => {
                is_form_control(&element.tag_name) && !element.has_attribute("disabled")
            }
            SimpleSelector::OnlyChild => sibling_elements(doc, id).len() == 1,
            SimpleSelector::OnlyOfType => {
                sibling_index(doc, id, true, false) == 1 && sibling_index(doc, id, true, true) == 1
            }
            SimpleSelector::Nth { kind, a, b } => {
                let index = match kind {
                    NthKind::Child => sibling_index(doc, id, false, false),
                    NthKind::LastChild => sibling_index(doc, id, false, true),
                    NthKind::OfType => sibling_index(doc, id, true, false),
                    NthKind::LastOfType => sibling_index(doc, id, true, true),
                };
                nth_matches(*a, *b, index)
            }
            SimpleSelector::Not(list) => !list.matches(doc, id),
            SimpleSelector::Is(list) => list.matches(doc, id),
            SimpleSelector::Never => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::HtmlParser;
    use url::Url;

    fn doc() -> Document {
        HtmlParser::new()
            .parse(
                r##"<html><body>
                <nav class="top main"><a href="/home" id="home">Home</a><a href="#faq">FAQ</a></nav>
                <section id="hero" data-kind="banner-wide">
                    <h1>Title</h1>
                    <p class="lead">Lead</p>
                    <p>Second</p>
                    <input type="checkbox" checked disabled>
                </section>
                <div></div>
                </body></html>"##,
                Url::parse("https://example.com/").unwrap(),
            )
            .unwrap()
    }

    fn count(doc: &Document, selector: &str) -> usize {
        doc.query_selector_all(selector).unwrap().len()
    }

    #[test]
    fn test_simple_selectors() {
        let doc = doc();
        assert_eq!(count(&doc, "a"), 2);
        assert_eq!(count(&doc, "#home"), 1);
        assert_eq!(count(&doc, ".lead"), 1);
        assert_eq!(count(&doc, "nav.top.main"), 1);
        assert_eq!(count(&doc, "p, h1"), 3);
        assert_eq!(count(&doc, "*"), doc.elements().len());
    }

    #[test]
    fn test_attribute_selectors() {
        let doc = doc();
        assert_eq!(count(&doc, "a[href]"), 2);
        assert_eq!(count(&doc, r##"a[href^="#"]"##), 1);
        assert_eq!(count(&doc, "a[href='/home']"), 1);
        assert_eq!(count(&doc, "[data-kind|=banner]"), 1);
        assert_eq!(count(&doc, "[data-kind*=wide]"), 1);
        assert_eq!(count(&doc, "[data-kind$=WIDE i]"), 1);
        assert_eq!(count(&doc, "nav[class~=main]"), 1);
    }

    #[test]
    fn test_combinators() {
        let doc = doc();
        assert_eq!(count(&doc, "section p"), 2);
        assert_eq!(count(&doc, "body > p"), 0);
        assert_eq!(count(&doc, "h1 + p"), 1);
        assert_eq!(count(&doc, "h1 ~ p"), 2);
        assert_eq!(count(&doc, "nav  >  a#home"), 1);
    }

    #[test]
    fn test_pseudo_classes() {
        let doc = doc();
        assert_eq!(count(&doc, "p:first-of-type"), 1);
        assert_eq!(count(&doc, "nav a:last-child"), 1);
        assert_eq!(count(&doc, "section > :nth-child(2)"), 1);
        assert_eq!(count(&doc, "section > :nth-child(odd)"), 2);
        assert_eq!(count(&doc, "p:not(.lead)"), 1);
        assert_eq!(count(&doc, ":is(h1, .lead)"), 2);
        assert_eq!(count(&doc, "input:checked:disabled"), 1);
        assert_eq!(count(&doc, "div:empty"), 1);
        assert_eq!(count(&doc, ":root"), 1);
        assert_eq!(count(&doc, "a:link"), 2);
    }

    #[test]
    fn test_nth_with_extreme_coefficients() {
        let doc = doc();
        assert_eq!(count(&doc, "section > p:nth-child(2n-2147483648)"), 1);
        assert_eq!(count(&doc, "section > p:nth-child(-n-2147483648)"), 0);
        assert_eq!(count(&doc, "p:nth-child(-2147483648)"), 0);
        assert!(!nth_matches(i32::MAX, i32::MIN, 1));
        assert!(nth_matches(-1, i32::MAX, 3));
        assert!(nth_matches(i32::MIN, i32::MAX, i32::MAX));
    }

    #[test]
    fn test_dynamic_states_never_match() {
        let doc = doc();
        assert_eq!(count(&doc, "a:hover"), 0);
        assert_eq!(count(&doc, "p::before"), 0);
        assert_eq!(count(&doc, "a:focus, h1"), 1);
    }

    #[test]
    fn test_invalid_selectors() {
        for bad in ["", "#1abc", "a[", "p:unknown-thing", "a >", ".", "a,,b", "p:nth-child(x)"] {
            assert!(
                matches!(SelectorList::parse(bad), Err(PageError::InvalidSelector(_))),
                "expected '{}' to be rejected",
                bad
            );
        }
    }
}

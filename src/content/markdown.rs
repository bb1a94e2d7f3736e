//! Markdown rendering with heading anchors, syntax highlighting,
//! external link hardening and embedded components.
//!
//! Rendering is a fixed sequence of passes over the pulldown-cmark event
//! stream:
//!
//! 1. parse (GFM dialect) and autolink bare URLs
//! 2. give every heading a unique id and a self link
//! 3. highlight fenced code blocks
//! 4. open external links in a new tab with `noopener noreferrer`
//! 5. resolve embedded components against the registry
//!
//! Component tags are located (and unsafe raw HTML neutralised) right
//! after parsing, and rendered last so their children have already been
//! through every other pass.
//!
//! The renderer never touches the filesystem or network, so the same input
//! always produces the same output.

use lazy_static::lazy_static;
use pulldown_cmark::{
    html, CodeBlockKind, CowStr, Event, LinkType, Options, Parser, Tag, TagEnd, TextMergeStream,
};
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use syntect::highlighting::ThemeSet;
use syntect::html::highlighted_html_for_string;
use syntect::parsing::SyntaxSet;

use super::components::{ComponentProps, ComponentRegistry};
use crate::config::SiteConfig;
use crate::error::RenderError;
use crate::helpers::html_escape;

lazy_static! {
    static ref SYNTAX_SET: SyntaxSet = SyntaxSet::load_defaults_newlines();
    static ref THEME_SET: ThemeSet = ThemeSet::load_defaults();
    static ref BARE_URL: Regex = Regex::new(r"(?:https?://|www\.)[^\s<>]+").unwrap();
    static ref COMPONENT_TAG: Regex = Regex::new(
        r#"<(/)?([A-Z][A-Za-z0-9]*)((?:\s+[A-Za-z_:][-A-Za-z0-9_:.]*(?:\s*=\s*(?:"[^"]*"|'[^']*'))?)*)\s*(/)?>"#
    )
    .unwrap();
    static ref COMPONENT_ATTR: Regex = Regex::new(
        r#"([A-Za-z_:][-A-Za-z0-9_:.]*)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'))?"#
    )
    .unwrap();
    static ref UNSAFE_HTML: Regex = Regex::new(
        r"(?i)<\s*/?\s*(?:script|iframe|object|embed|style)\b|\son[a-z]+\s*=|javascript:"
    )
    .unwrap();
}

const DEFAULT_THEME: &str = "base16-ocean.dark";

/// A heading found while rendering, for building a table of contents
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Heading {
    pub level: u8,
    pub id: String,
    pub text: String,
}

/// Rendered HTML plus the headings it contains
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedBody {
    pub html: String,
    pub headings: Vec<Heading>,
}

/// Markdown renderer with syntax highlighting
#[derive(Debug, Clone)]
pub struct MarkdownRenderer {
    components: ComponentRegistry,
    highlight: bool,
    theme_name: String,
    harden_external_links: bool,
    /// Hosts whose links stay in the same tab
    internal_hosts: Vec<String>,
}

impl MarkdownRenderer {
    /// Create a new markdown renderer with the built-in components
    pub fn new() -> Self {
        Self {
            components: ComponentRegistry::with_builtins(),
            highlight: true,
            theme_name: DEFAULT_THEME.to_string(),
            harden_external_links: true,
            internal_hosts: Vec::new(),
        }
    }

    /// Create a renderer configured for a site
    pub fn from_config(config: &SiteConfig, components: ComponentRegistry) -> Self {
        let mut internal_hosts: Vec<String> = config
            .external_link
            .exclude
            .iter()
            .map(|h| h.to_ascii_lowercase())
            .collect();
        internal_hosts.extend(config.host());

        Self {
            components,
            highlight: config.highlight.enable,
            theme_name: config.highlight.theme.clone(),
            harden_external_links: config.external_link.enable,
            internal_hosts,
        }
    }

    /// Replace the component registry
    pub fn with_components(mut self, components: ComponentRegistry) -> Self {
        self.components = components;
        self
    }

    pub fn components(&self) -> &ComponentRegistry {
        &self.components
    }

    /// Render markdown to HTML
    pub fn render(&self, markdown: &str) -> Result<RenderedBody, RenderError> {
        let options = Options::ENABLE_TABLES
            | Options::ENABLE_FOOTNOTES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_TASKLISTS
            | Options::ENABLE_HEADING_ATTRIBUTES
            | Options::ENABLE_GFM;
        let parser = TextMergeStream::new(Parser::new_ext(markdown, options));

        let events = autolink_bare_urls(parser);
        let (events, components) = self.mark_components(events)?;
        let (events, headings) = anchor_headings(events);
        let events = self.highlight_code_blocks(events);
        let events = self.rewrite_links(events);
        let events = self.resolve_components(events, &components)?;

        let mut html_output = String::with_capacity(markdown.len() * 3 / 2);
        html::push_html(&mut html_output, events.into_iter());

        Ok(RenderedBody {
            html: html_output,
            headings,
        })
    }

    /// Render markdown and keep only the HTML
    pub fn render_html(&self, markdown: &str) -> Result<String, RenderError> {
        self.render(markdown).map(|body| body.html)
    }

    fn highlight_code_blocks<'a>(&self, events: Vec<Event<'a>>) -> Vec<Event<'a>> {
        if !self.highlight {
            return events;
        }
        let mut out = Vec::with_capacity(events.len());
        // Some(lang) while inside a code block
        let mut code_block: Option<Option<String>> = None;
        let mut code = String::new();

        for event in events {
            match event {
                Event::Start(Tag::CodeBlock(kind)) => {
                    let lang = match kind {
                        CodeBlockKind::Fenced(info) => info
                            .split(|c: char| c.is_whitespace() || c == ',' || c == '{')
                            .next()
                            .filter(|l| !l.is_empty())
                            .map(str::to_string),
                        CodeBlockKind::Indented => None,
                    };
                    code_block = Some(lang);
                    code.clear();
                }
                Event::End(TagEnd::CodeBlock) => {
                    let lang = code_block.take().flatten();
                    out.push(Event::Html(CowStr::from(
                        self.highlight_code(&code, lang.as_deref()),
                    )));
                }
                Event::Text(text) if code_block.is_some() => code.push_str(&text),
                other => out.push(other),
            }
        }

        out
    }

    /// Highlight a code block
    fn highlight_code(&self, code: &str, lang: Option<&str>) -> String {
        let lang = lang.unwrap_or("text");

        let syntax = SYNTAX_SET
            .find_syntax_by_token(lang)
            .or_else(|| SYNTAX_SET.find_syntax_by_extension(lang))
            .unwrap_or_else(|| SYNTAX_SET.find_syntax_plain_text());

        let theme = THEME_SET
            .themes
            .get(&self.theme_name)
            .or_else(|| THEME_SET.themes.get(DEFAULT_THEME));

        let highlighted =
            theme.and_then(|theme| highlighted_html_for_string(code, &SYNTAX_SET, syntax, theme).ok());

        match highlighted {
            Some(highlighted) => format!(
                r#"<figure class="highlight {}">{}</figure>"#,
                html_escape(lang),
                highlighted
            ),
            None => format!(
                r#"<pre><code class="language-{}">{}</code></pre>"#,
                html_escape(lang),
                html_escape(code)
            ),
        }
    }

    fn rewrite_links<'a>(&self, events: Vec<Event<'a>>) -> Vec<Event<'a>> {
        let mut out = Vec::with_capacity(events.len());
        // One entry per open link: true when its start tag was rewritten
        let mut open: Vec<bool> = Vec::new();

        for event in events {
            match event {
                Event::Start(Tag::Link {
                    link_type,
                    dest_url,
                    title,
                    id,
                }) => {
                    let safe_url = if is_unsafe_url(&dest_url) {
                        CowStr::from("#")
                    } else {
                        dest_url
                    };

                    if self.harden_external_links && self.is_external(&safe_url) {
                        let title_attr = if title.is_empty() {
                            String::new()
                        } else {
                            format!(r#" title="{}""#, html_escape(&title))
                        };
                        out.push(Event::Html(CowStr::from(format!(
                            r#"<a href="{}"{} target="_blank" rel="noopener noreferrer">"#,
                            html_escape(&safe_url),
                            title_attr
                        ))));
                        open.push(true);
                    } else {
                        out.push(Event::Start(Tag::Link {
                            link_type,
                            dest_url: safe_url,
                            title,
                            id,
                        }));
                        open.push(false);
                    }
                }
                Event::End(TagEnd::Link) => {
                    if open.pop().unwrap_or(false) {
                        out.push(Event::Html(CowStr::Borrowed("</a>")));
                    } else {
                        out.push(Event::End(TagEnd::Link));
                    }
                }
                other => out.push(other),
            }
        }

        out
    }

    /// Whether a link leaves the site
    fn is_external(&self, url: &str) -> bool {
        match link_host(url) {
            Some(host) => !self.internal_hosts.iter().any(|h| *h == host),
            None => false,
        }
    }

    /// Replace component tags in author-written HTML with markers and
    /// neutralise unsafe raw HTML. Names and nesting are checked here.
    fn mark_components<'a>(
        &self,
        events: Vec<Event<'a>>,
    ) -> Result<(Vec<Event<'a>>, Vec<ComponentTag>), RenderError> {
        let mut marker = ComponentMarker::new(&self.components);
        let mut block_html = String::new();

        for event in events {
            match event {
                // Block HTML arrives line by line; join it so tags spanning
                // several lines are still recognised
                Event::Html(text) => block_html.push_str(&text),
                other => {
                    if !block_html.is_empty() {
                        marker.feed_html(&std::mem::take(&mut block_html), false)?;
                    }
                    match other {
                        Event::InlineHtml(text) => marker.feed_html(&text, true)?,
                        other => marker.push(other),
                    }
                }
            }
        }
        if !block_html.is_empty() {
            marker.feed_html(&block_html, false)?;
        }

        marker.finish()
    }

    /// Render every marked component, innermost first
    fn resolve_components<'a>(
        &self,
        events: Vec<Event<'a>>,
        tags: &[ComponentTag],
    ) -> Result<Vec<Event<'a>>, RenderError> {
        if tags.is_empty() {
            return Ok(events);
        }

        let mut out: Vec<Event<'a>> = Vec::with_capacity(events.len());
        // (tag index, children collected so far)
        let mut stack: Vec<(usize, Vec<Event<'a>>)> = Vec::new();

        for event in events {
            let marker = match &event {
                Event::Html(text) => Marker::parse(text),
                _ => None,
            };

            let rendered = match marker {
                None => {
                    match stack.last_mut() {
                        Some((_, children)) => children.push(event),
                        None => out.push(event),
                    }
                    continue;
                }
                Some(Marker::Open(i)) => {
                    stack.push((i, Vec::new()));
                    continue;
                }
                Some(Marker::Void(i)) => {
                    let tag = &tags[i];
                    self.components.render(&tag.name, &tag.props, "")?
                }
                Some(Marker::Close(i)) => {
                    let (open, children) = stack.pop().filter(|(open, _)| *open == i).ok_or_else(
                        || RenderError::UnexpectedClose {
                            found: tags[i].name.clone(),
                            expected: None,
                        },
                    )?;
                    let tag = &tags[open];
                    let mut inner = String::new();
                    html::push_html(&mut inner, children.into_iter());
                    self.components.render(&tag.name, &tag.props, &inner)?
                }
            };

            let event = Event::Html(CowStr::from(rendered));
            match stack.last_mut() {
                Some((_, children)) => children.push(event),
                None => out.push(event),
            }
        }

        match stack.pop() {
            Some((i, _)) => Err(RenderError::UnclosedComponent(tags[i].name.clone())),
            None => Ok(out),
        }
    }
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// A component reference found in the source
#[derive(Debug, Clone)]
struct ComponentTag {
    name: String,
    props: ComponentProps,
}

// NUL is replaced in everything that passes the marker stage, so these
// markers cannot be forged from a post body
const MARKER_PREFIX: &str = "\u{0}component:";

fn scrub_nul(text: &str) -> String {
    text.replace('\u{0}', "\u{fffd}")
}

/// Placeholder left in the event stream where a component tag was
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    Open(usize),
    Close(usize),
    Void(usize),
}

impl Marker {
    fn to_event<'a>(self) -> Event<'a> {
        let text = match self {
            Marker::Open(i) => format!("{}open:{}", MARKER_PREFIX, i),
            Marker::Close(i) => format!("{}close:{}", MARKER_PREFIX, i),
            Marker::Void(i) => format!("{}void:{}", MARKER_PREFIX, i),
        };
        Event::Html(CowStr::from(text))
    }

    fn parse(text: &str) -> Option<Self> {
        let rest = text.strip_prefix(MARKER_PREFIX)?;
        let (kind, index) = rest.split_once(':')?;
        let index = index.parse().ok()?;
        match kind {
            "open" => Some(Marker::Open(index)),
            "close" => Some(Marker::Close(index)),
            "void" => Some(Marker::Void(index)),
            _ => None,
        }
    }
}

/// Finds component tags inside raw HTML and replaces them with markers
struct ComponentMarker<'r, 'a> {
    registry: &'r ComponentRegistry,
    tags: Vec<ComponentTag>,
    /// Tags whose closing tag has not been seen yet, with the container
    /// they were opened in
    open: Vec<(usize, Option<usize>)>,
    /// Ids of the Markdown containers (paragraphs, list items, table
    /// cells, ...) enclosing the current position, innermost last
    containers: Vec<usize>,
    next_container: usize,
    out: Vec<Event<'a>>,
}

impl<'r, 'a> ComponentMarker<'r, 'a> {
    fn new(registry: &'r ComponentRegistry) -> Self {
        Self {
            registry,
            tags: Vec::new(),
            open: Vec::new(),
            containers: Vec::new(),
            next_container: 0,
            out: Vec::new(),
        }
    }

    /// The innermost container, `None` at the top level. HTML blocks do
    /// not count: a component may open and close in separate ones.
    fn container(&self) -> Option<usize> {
        self.containers.last().copied()
    }

    fn push(&mut self, event: Event<'a>) {
        let event = match event {
            Event::Start(Tag::HtmlBlock) | Event::End(TagEnd::HtmlBlock) => event,
            Event::Start(_) => {
                self.containers.push(self.next_container);
                self.next_container += 1;
                event
            }
            Event::End(_) => {
                self.containers.pop();
                event
            }
            Event::Text(text) if text.contains('\u{0}') => {
                Event::Text(CowStr::from(scrub_nul(&text)))
            }
            other => other,
        };
        self.out.push(event);
    }

    fn emit_raw(&mut self, html: &str, inline: bool) {
        if html.is_empty() {
            return;
        }
        let text = CowStr::from(scrub_nul(html));
        let event = if UNSAFE_HTML.is_match(html) {
            // Shown as text instead of being executed
            Event::Text(text)
        } else if inline {
            Event::InlineHtml(text)
        } else {
            Event::Html(text)
        };
        self.out.push(event);
    }

    fn feed_html(&mut self, html: &str, inline: bool) -> Result<(), RenderError> {
        let mut last = 0;

        for caps in COMPONENT_TAG.captures_iter(html) {
            let Some(whole) = caps.get(0) else { continue };
            self.emit_raw(&html[last..whole.start()], inline);
            last = whole.end();

            let closing = caps.get(1).is_some();
            let name = caps[2].to_string();
            let self_closing = caps.get(4).is_some();

            if closing {
                let open = match self.open.pop() {
                    Some((i, container)) if self.tags[i].name == name => {
                        if container != self.container() {
                            return Err(RenderError::CrossesBlock(name));
                        }
                        i
                    }
                    Some((i, _)) => {
                        return Err(RenderError::UnexpectedClose {
                            found: name,
                            expected: Some(self.tags[i].name.clone()),
                        })
                    }
                    None => {
                        return Err(RenderError::UnexpectedClose {
                            found: name,
                            expected: None,
                        })
                    }
                };
                self.out.push(Marker::Close(open).to_event());
                continue;
            }

            if !self.registry.contains(&name) {
                return Err(RenderError::UnknownComponent(name));
            }
            let props = parse_props(caps.get(3).map(|m| m.as_str()).unwrap_or(""));
            let index = self.tags.len();
            self.tags.push(ComponentTag { name, props });

            if self_closing {
                self.out.push(Marker::Void(index).to_event());
            } else {
                self.open.push((index, self.container()));
                self.out.push(Marker::Open(index).to_event());
            }
        }

        self.emit_raw(&html[last..], inline);
        Ok(())
    }

    fn finish(mut self) -> Result<(Vec<Event<'a>>, Vec<ComponentTag>), RenderError> {
        match self.open.pop() {
            Some((i, _)) => Err(RenderError::UnclosedComponent(self.tags[i].name.clone())),
            None => Ok((self.out, self.tags)),
        }
    }
}

fn parse_props(attrs: &str) -> ComponentProps {
    COMPONENT_ATTR
        .captures_iter(attrs)
        .map(|caps| {
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .map(|m| m.as_str().to_string())
                .unwrap_or_else(|| "true".to_string());
            (caps[1].to_string(), value)
        })
        .collect()
}

/// Turn bare `https://...` and `www....` text into links
fn autolink_bare_urls<'a, I>(events: I) -> Vec<Event<'a>>
where
    I: Iterator<Item = Event<'a>>,
{
    let mut out = Vec::new();
    let mut link_depth = 0usize;
    let mut in_code_block = false;

    for event in events {
        match event {
            Event::Start(Tag::Link { .. }) | Event::Start(Tag::Image { .. }) => {
                link_depth += 1;
                out.push(event);
            }
            Event::End(TagEnd::Link) | Event::End(TagEnd::Image) => {
                link_depth = link_depth.saturating_sub(1);
                out.push(event);
            }
            Event::Start(Tag::CodeBlock(_)) => {
                in_code_block = true;
                out.push(event);
            }
            Event::End(TagEnd::CodeBlock) => {
                in_code_block = false;
                out.push(event);
            }
            Event::Text(text) if link_depth == 0 && !in_code_block => {
                split_bare_urls(text, &mut out);
            }
            other => out.push(other),
        }
    }

    out
}

fn split_bare_urls<'a>(text: CowStr<'a>, out: &mut Vec<Event<'a>>) {
    let mut last = 0;
    let mut found = false;

    for m in BARE_URL.find_iter(&text) {
        // A URL glued to a preceding word is not a link
        if m.start() > 0 {
            let prev = text[..m.start()].chars().next_back();
            if prev.is_some_and(|c| c.is_alphanumeric() || c == '/' || c == '@') {
                continue;
            }
        }

        let url = trim_url_end(m.as_str());
        if url.is_empty() || url == "www." || url.ends_with("://") {
            continue;
        }

        if m.start() > last {
            out.push(Event::Text(CowStr::from(text[last..m.start()].to_string())));
        }
        let dest = if url.starts_with("www.") {
            format!("http://{}", url)
        } else {
            url.to_string()
        };
        out.push(Event::Start(Tag::Link {
            link_type: LinkType::Autolink,
            dest_url: CowStr::from(dest),
            title: CowStr::Borrowed(""),
            id: CowStr::Borrowed(""),
        }));
        out.push(Event::Text(CowStr::from(url.to_string())));
        out.push(Event::End(TagEnd::Link));
        last = m.start() + url.len();
        found = true;
    }

    if !found {
        out.push(Event::Text(text));
    } else if last < text.len() {
        out.push(Event::Text(CowStr::from(text[last..].to_string())));
    }
}

/// Drop trailing punctuation, and closing parentheses that have no opening
/// partner inside the URL
fn trim_url_end(url: &str) -> &str {
    let mut url = url;
    loop {
        let Some(last) = url.chars().next_back() else {
            return url;
        };
        let trim = match last {
            '.' | ',' | ':' | ';' | '!' | '?' | '\'' | '"' | '*' | '_' | '~' => true,
            ')' => url.matches(')').count() > url.matches('(').count(),
            _ => false,
        };
        if !trim {
            return url;
        }
        url = &url[..url.len() - last.len_utf8()];
    }
}

/// Give each heading a unique id and prefix it with a link to itself
fn anchor_headings(events: Vec<Event<'_>>) -> (Vec<Event<'_>>, Vec<Heading>) {
    let mut out = Vec::with_capacity(events.len());
    let mut headings = Vec::new();
    let mut used: HashSet<String> = HashSet::new();
    let mut iter = events.into_iter();

    while let Some(event) = iter.next() {
        let (level, id, classes, attrs) = match event {
            Event::Start(Tag::Heading {
                level,
                id,
                classes,
                attrs,
            }) => (level, id, classes, attrs),
            other => {
                out.push(other);
                continue;
            }
        };

        let mut inner = Vec::new();
        let mut text = String::new();
        for event in iter.by_ref() {
            match &event {
                Event::End(TagEnd::Heading(_)) => break,
                Event::Text(t) | Event::Code(t) => text.push_str(t),
                _ => {}
            }
            inner.push(event);
        }

        let base = match id {
            Some(explicit) if !explicit.is_empty() => explicit.to_string(),
            _ => {
                let slug = slug::slugify(&text);
                if slug.is_empty() {
                    "section".to_string()
                } else {
                    slug
                }
            }
        };
        let anchor = unique_anchor(&base, &mut used);

        let level_num = level as u8;
        let mut open = format!(r#"<h{} id="{}""#, level_num, html_escape(&anchor));
        if !classes.is_empty() {
            let classes: Vec<String> = classes.iter().map(|c| c.to_string()).collect();
            open.push_str(&format!(r#" class="{}""#, html_escape(&classes.join(" "))));
        }
        for (key, value) in &attrs {
            match value {
                Some(value) => open.push_str(&format!(
                    r#" {}="{}""#,
                    html_escape(key),
                    html_escape(value)
                )),
                None => open.push_str(&format!(" {}", html_escape(key))),
            }
        }
        open.push_str(&format!(
            r##"><a class="anchor" href="#{}" aria-hidden="true">#</a>"##,
            html_escape(&anchor)
        ));

        out.push(Event::Html(CowStr::from(open)));
        out.extend(inner);
        out.push(Event::Html(CowStr::from(format!("</h{}>\n", level_num))));

        headings.push(Heading {
            level: level_num,
            id: anchor,
            text: text.trim().to_string(),
        });
    }

    (out, headings)
}

/// `base`, or `base-1`, `base-2`, ... whichever is free first
fn unique_anchor(base: &str, used: &mut HashSet<String>) -> String {
    let mut candidate = base.to_string();
    let mut n = 1;
    while used.contains(&candidate) {
        candidate = format!("{}-{}", base, n);
        n += 1;
    }
    used.insert(candidate.clone());
    candidate
}

/// Lowercase host of an absolute or protocol-relative URL
fn link_host(url: &str) -> Option<String> {
    let lower = url.trim().to_ascii_lowercase();
    let rest = lower
        .strip_prefix("https://")
        .or_else(|| lower.strip_prefix("http://"))
        .or_else(|| lower.strip_prefix("//"))?;
    let authority = rest.split(['/', '?', '#']).next().unwrap_or("");
    let host = authority.rsplit('@').next().unwrap_or(authority);
    let host = host.split(':').next().unwrap_or(host);
    if host.is_empty() {
        None
    } else {
        Some(host.to_string())
    }
}

fn is_unsafe_url(url: &str) -> bool {
    let lower: String = url
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();
    lower.starts_with("javascript:") || lower.starts_with("vbscript:") || lower.starts_with("data:")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(markdown: &str) -> String {
        MarkdownRenderer::new().render_html(markdown).unwrap()
    }

    #[test]
    fn test_render_basic_markdown() {
        let html = render("This is a test.");
        assert_eq!(html, "<p>This is a test.</p>\n");
    }

    #[test]
    fn test_heading_gets_anchor_and_self_link() {
        let body = MarkdownRenderer::new().render("## Hello World").unwrap();
        assert!(body.html.contains(r#"<h2 id="hello-world">"#));
        assert!(body.html.contains(r##"<a class="anchor" href="#hello-world" aria-hidden="true">#</a>Hello World</h2>"##));
        assert_eq!(
            body.headings,
            vec![Heading {
                level: 2,
                id: "hello-world".into(),
                text: "Hello World".into()
            }]
        );
    }

    #[test]
    fn test_duplicate_headings_are_suffixed() {
        let body = MarkdownRenderer::new()
            .render("# Setup\n\n## Setup\n\n### Setup-1\n\n## Setup")
            .unwrap();
        let ids: Vec<_> = body.headings.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["setup", "setup-1", "setup-1-1", "setup-2"]);

        let unique: HashSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), ids.len());
    }

    #[test]
    fn test_explicit_heading_id() {
        let body = MarkdownRenderer::new()
            .render("# Intro {#start .lead}\n\n# Start")
            .unwrap();
        assert!(body.html.contains(r#"<h1 id="start" class="lead">"#));
        assert_eq!(body.headings[1].id, "start-1");
    }

    #[test]
    fn test_render_code_block() {
        let html = render("```rust\nfn main() {}\n```");
        assert!(html.contains(r#"<figure class="highlight rust">"#));
        assert!(html.contains("<pre"));
        assert!(!html.contains("<code class=\"language-rust\">fn"));
    }

    #[test]
    fn test_unknown_language_falls_back_to_plain_text() {
        let html = render("```nosuchlang\n<b>x</b>\n```");
        assert!(html.contains(r#"<figure class="highlight nosuchlang">"#));
        assert!(html.contains("&lt;b&gt;"));
    }

    #[test]
    fn test_highlight_can_be_disabled() {
        let mut config = SiteConfig::default();
        config.highlight.enable = false;
        let renderer = MarkdownRenderer::from_config(&config, ComponentRegistry::new());
        let html = renderer.render_html("```rust\nlet x = 1;\n```").unwrap();
        assert_eq!(
            html,
            "<pre><code class=\"language-rust\">let x = 1;\n</code></pre>\n"
        );
    }

    #[test]
    fn test_external_links_are_hardened() {
        let html = render("[out](https://example.org/a) and [in](/posts/x)");
        assert!(html.contains(
            r#"<a href="https://example.org/a" target="_blank" rel="noopener noreferrer">out</a>"#
        ));
        assert!(html.contains(r#"<a href="/posts/x">in</a>"#));
    }

    #[test]
    fn test_site_host_is_not_external() {
        let mut config = SiteConfig::default();
        config.url = "https://me.dev".to_string();
        config.external_link.exclude = vec!["Docs.Me.dev".to_string()];
        let renderer = MarkdownRenderer::from_config(&config, ComponentRegistry::with_builtins());

        let html = renderer
            .render_html("[a](https://me.dev/x) [b](https://docs.me.dev) [c](https://other.dev)")
            .unwrap();
        assert!(html.contains(r#"<a href="https://me.dev/x">a</a>"#));
        assert!(html.contains(r#"<a href="https://docs.me.dev">b</a>"#));
        assert!(html.contains(r#"<a href="https://other.dev" target="_blank""#));
    }

    #[test]
    fn test_default_config_has_no_internal_host() {
        let renderer =
            MarkdownRenderer::from_config(&SiteConfig::default(), ComponentRegistry::with_builtins());
        let html = renderer.render_html("[a](http://example.com/x)").unwrap();
        assert!(html.contains(
            r#"<a href="http://example.com/x" target="_blank" rel="noopener noreferrer">a</a>"#
        ));
    }

    #[test]
    fn test_bare_urls_are_autolinked() {
        let html = render("See https://rust-lang.org. Or www.example.com, or `https://code.test`.");
        assert!(html.contains(r#"<a href="https://rust-lang.org" target="_blank" rel="noopener noreferrer">https://rust-lang.org</a>."#));
        assert!(html.contains(r#"<a href="http://www.example.com" target="_blank" rel="noopener noreferrer">www.example.com</a>,"#));
        assert!(html.contains("<code>https://code.test</code>"));
    }

    #[test]
    fn test_autolink_keeps_balanced_parens() {
        assert_eq!(
            trim_url_end("https://en.wikipedia.org/wiki/Rust_(language))"),
            "https://en.wikipedia.org/wiki/Rust_(language)"
        );
        assert_eq!(trim_url_end("https://a.b/c)."), "https://a.b/c");
    }

    #[test]
    fn test_gfm_extensions() {
        let html = render("| a | b |\n|---|---|\n| 1 | 2 |\n\n~~gone~~\n\n- [x] done");
        assert!(html.contains("<table>"));
        assert!(html.contains("<del>gone</del>"));
        assert!(html.contains(r#"type="checkbox""#));
    }

    #[test]
    fn test_component_block() {
        let html = render("Before\n\n<InfoText>\n\nRemember **this**.\n\n</InfoText>\n\nAfter");
        assert!(html.contains(
            r#"<aside class="info-text info-text-info"><p>Remember <strong>this</strong>.</p></aside>"#
        ));
        assert!(html.contains("<p>After</p>"));
    }

    #[test]
    fn test_component_inline_and_self_closing() {
        let html = render("Note: <InfoText tone=\"warning\">hot</InfoText>\n\n<InfoText />");
        assert!(html.contains(r#"<aside class="info-text info-text-warning">hot</aside>"#));
        assert!(html.contains(r#"<aside class="info-text info-text-info"></aside>"#));
    }

    #[test]
    fn test_unknown_component_is_an_error() {
        let err = MarkdownRenderer::new()
            .render_html("<Newsletter />")
            .unwrap_err();
        assert_eq!(err, RenderError::UnknownComponent("Newsletter".into()));

        let err = MarkdownRenderer::new()
            .with_components(ComponentRegistry::new())
            .render_html("<InfoText>x</InfoText>")
            .unwrap_err();
        assert_eq!(err, RenderError::UnknownComponent("InfoText".into()));
    }

    #[test]
    fn test_unbalanced_components_are_errors() {
        let renderer = MarkdownRenderer::new();
        assert_eq!(
            renderer.render_html("<InfoText>\n\nnever closed").unwrap_err(),
            RenderError::UnclosedComponent("InfoText".into())
        );
        assert!(matches!(
            renderer.render_html("stray </InfoText>").unwrap_err(),
            RenderError::UnexpectedClose { expected: None, .. }
        ));
    }

    #[test]
    fn test_component_must_close_in_its_own_block() {
        let renderer = MarkdownRenderer::new();
        let crosses = RenderError::CrossesBlock("InfoText".into());

        // Opened in a table cell, closed after the table
        let table = "| a |\n|---|\n| <InfoText> |\n\n</InfoText>\n";
        assert_eq!(renderer.render_html(table).unwrap_err(), crosses);

        // Opened in a list item, closed after the list
        let list = "- <InfoText>\n\n</InfoText>\n";
        assert_eq!(renderer.render_html(list).unwrap_err(), crosses);

        // Opened in one list item, closed in the next
        let items = "- a <InfoText>b\n- c</InfoText> d\n";
        assert_eq!(renderer.render_html(items).unwrap_err(), crosses);

        // Opened as a block, closed inside a paragraph
        let paragraph = "<InfoText>\n\nx\n\n</InfoText>tail\n";
        assert_eq!(renderer.render_html(paragraph).unwrap_err(), crosses);

        // Inside a single list item is fine
        let html = render("- a <InfoText>b</InfoText>\n");
        assert!(html.contains(r#"<li>a <aside class="info-text info-text-info">b</aside></li>"#));
    }

    #[test]
    fn test_markers_cannot_be_forged() {
        let html = render("<div>\n<InfoText>\u{0}component:close:0<InfoText />\n</InfoText>\n</div>");
        assert!(!html.contains('\u{0}'));
        assert_eq!(html.matches("<aside").count(), 2);
    }

    #[test]
    fn test_components_in_code_are_left_alone() {
        let html = render("`<Newsletter />`\n\n```html\n<Newsletter />\n```");
        assert!(html.contains("<code>&lt;Newsletter /&gt;</code>"));
    }

    #[test]
    fn test_plain_html_passes_through_but_scripts_do_not() {
        let html = render("<div class=\"note\">ok</div>\n\n<script>alert(1)</script>");
        assert!(html.contains(r#"<div class="note">ok</div>"#));
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_javascript_links_are_neutralised() {
        let html = render("[x](javascript:alert(1))");
        assert!(html.contains(r##"<a href="#">x</a>"##));
    }

    #[test]
    fn test_render_is_deterministic() {
        let markdown = "# A\n\n# A\n\n```rust\nlet x = 1;\n```\n\nhttps://x.dev\n\n<InfoText>hi</InfoText>";
        let renderer = MarkdownRenderer::new();
        let first = renderer.render(markdown).unwrap();
        let second = renderer.render(markdown).unwrap();
        assert_eq!(first, second);
    }
}

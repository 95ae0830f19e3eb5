//! Section parsing for markdown documents.
//!
//! A document body is split into top-level blocks by [pulldown_cmark], then grouped into
//! [`Section`]s:
//!
//! - Every level-1 heading, and all content before the first one, belongs to the root section.
//! - After the first level-1 heading, a heading of level > 1 opens a new nested section.
//! - Headings of level > 1 that appear before any level-1 heading are dropped.
//!
//! Titles come from the first heading of a section (autolinks excluded), falling back to the
//! first paragraph and then to [`NO_TITLE`]. Briefs are the first paragraph with every link
//! form excluded except ordinary inline links.

use pulldown_cmark::{
    Event as MdEvent, HeadingLevel, LinkType, Options, Parser as MdParser, Tag as MdTag,
    TagEnd as MdTagEnd,
};

use crate::paths::{relative_link_target, Slugger};

pub use pulldown_cmark;

pub const NO_TITLE: &str = "no title";
pub const ROOT_SECTION_DEPTH: usize = 1;

/// A top-level block of the document and every event nested inside it.
type Block<'a> = Vec<MdEvent<'a>>;

pub fn markdown_options() -> Options {
    let mut md_options = Options::empty();
    md_options.insert(Options::ENABLE_FOOTNOTES);
    md_options.insert(Options::ENABLE_STRIKETHROUGH);
    md_options.insert(Options::ENABLE_TABLES);
    md_options.insert(Options::ENABLE_TASKLISTS);
    md_options.insert(Options::ENABLE_WIKILINKS);
    md_options
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Heading level; the root section is always [`ROOT_SECTION_DEPTH`].
    pub depth: usize,
    pub title: String,
    pub brief: Option<String>,
    /// Normalized target ids of wiki links and relative links, in document order.
    pub links: Vec<String>,
    /// Index of the enclosing section. `None` only for the root.
    pub parent: Option<usize>,
    pub children: Vec<usize>,
}

impl Section {
    pub fn is_root(&self) -> bool {
        self.depth == ROOT_SECTION_DEPTH
    }
}

fn heading_depth(level: HeadingLevel) -> usize {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

fn block_heading(block: &Block<'_>) -> Option<usize> {
    match block.first() {
        Some(MdEvent::Start(MdTag::Heading { level, .. })) => Some(heading_depth(*level)),
        _ => None,
    }
}

fn is_paragraph(block: &Block<'_>) -> bool {
    matches!(block.first(), Some(MdEvent::Start(MdTag::Paragraph)))
}

/// Split a document into its top-level blocks.
fn top_level_blocks(body: &str) -> Vec<Block<'_>> {
    let mut blocks = Vec::new();
    let mut current: Block<'_> = Vec::new();
    let mut nesting = 0usize;
    for event in MdParser::new_ext(body, markdown_options()) {
        match &event {
            MdEvent::Start(_) => nesting += 1,
            MdEvent::End(_) => nesting = nesting.saturating_sub(1),
            _ => {}
        }
        let closes_block = nesting == 0;
        current.push(event);
        if closes_block {
            blocks.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }
    blocks
}

/// Which links contribute their text when flattening a block to plain text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextFilter {
    /// Drop autolinks only.
    Title,
    /// Drop autolinks and wiki links.
    Brief,
}

fn is_autolink(link_type: LinkType, dest_url: &str, text: &str) -> bool {
    match link_type {
        LinkType::Autolink | LinkType::Email => true,
        LinkType::WikiLink { .. } => false,
        _ => text == dest_url,
    }
}

fn push_text(event: &MdEvent<'_>, out: &mut String) {
    match event {
        MdEvent::Text(text) | MdEvent::Code(text) => out.push_str(text),
        MdEvent::SoftBreak | MdEvent::HardBreak => out.push('\n'),
        _ => {}
    }
}

/// Flatten a block to the concatenation of its text content.
fn plain_text(block: &Block<'_>, filter: TextFilter) -> String {
    let mut out = String::new();
    let mut events = block.iter();
    while let Some(event) = events.next() {
        if let MdEvent::Start(MdTag::Link {
            link_type,
            dest_url,
            ..
        }) = event
        {
            let mut text = String::new();
            for inner in events.by_ref() {
                if let MdEvent::End(MdTagEnd::Link) = inner {
                    break;
                }
                push_text(inner, &mut text);
            }
            let dropped = is_autolink(*link_type, dest_url, &text)
                || (filter == TextFilter::Brief
                    && matches!(link_type, LinkType::WikiLink { .. }));
            if !dropped {
                out.push_str(&text);
            }
            continue;
        }
        push_text(event, &mut out);
    }
    out
}

/// Section content gathered while scanning blocks.
#[derive(Default)]
struct SectionDraft<'a> {
    depth: usize,
    blocks: Vec<Block<'a>>,
    parent: Option<usize>,
    children: Vec<usize>,
}

/// Parses document bodies into sections. Owns the slug memoization table used for link
/// targets, so one parser should be reused across documents.
#[derive(Debug, Default)]
pub struct SectionParser {
    slugger: Slugger,
}

impl SectionParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slugger(&mut self) -> &mut Slugger {
        &mut self.slugger
    }

    /// Parse `body` (frontmatter already removed). The first returned section is always the
    /// root; the rest follow document order.
    pub fn parse(&mut self, body: &str) -> Vec<Section> {
        let mut drafts = vec![SectionDraft {
            depth: ROOT_SECTION_DEPTH,
            ..Default::default()
        }];
        // Stack of open sections, innermost last. The root never closes.
        let mut open: Vec<usize> = vec![0];
        let mut found_main_heading = false;
        let mut target = 0usize;

        for block in top_level_blocks(body) {
            match block_heading(&block) {
                Some(ROOT_SECTION_DEPTH) => {
                    found_main_heading = true;
                    open.truncate(1);
                    target = 0;
                }
                Some(depth) if found_main_heading => {
                    while let Some(&innermost) = open.last() {
                        if innermost == 0 || drafts[innermost].depth < depth {
                            break;
                        }
                        open.pop();
                    }
                    let parent = open.last().copied().unwrap_or(0);
                    let idx = drafts.len();
                    drafts.push(SectionDraft {
                        depth,
                        parent: Some(parent),
                        ..Default::default()
                    });
                    drafts[parent].children.push(idx);
                    open.push(idx);
                    target = idx;
                }
                Some(depth) => {
                    tracing::debug!(
                        "Dropping level {} heading before the first level 1 heading",
                        depth
                    );
                    continue;
                }
                None => {}
            }
            drafts[target].blocks.push(block);
        }

        drafts
            .into_iter()
            .map(|draft| self.finish(draft))
            .collect()
    }

    fn finish(&mut self, draft: SectionDraft<'_>) -> Section {
        let title = draft
            .blocks
            .iter()
            .find(|b| block_heading(b).is_some())
            .or_else(|| draft.blocks.iter().find(|b| is_paragraph(b)))
            .map(|b| plain_text(b, TextFilter::Title))
            .unwrap_or_else(|| NO_TITLE.to_string());
        let brief = draft
            .blocks
            .iter()
            .find(|b| is_paragraph(b))
            .map(|b| plain_text(b, TextFilter::Brief));

        let mut links = Vec::new();
        for event in draft.blocks.iter().flatten() {
            if let MdEvent::Start(MdTag::Link {
                link_type,
                dest_url,
                ..
            }) = event
            {
                match link_type {
                    LinkType::WikiLink { .. } => links.push(self.slugger.slug(dest_url)),
                    _ => {
                        if let Some(target) = relative_link_target(dest_url, &mut self.slugger) {
                            links.push(target);
                        }
                    }
                }
            }
        }

        Section {
            depth: draft.depth,
            title,
            brief,
            links,
            parent: draft.parent,
            children: draft.children,
        }
    }
}

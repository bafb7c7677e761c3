//! State structs that track context during event processing.

use std::collections::HashMap;

use pulldown_cmark::Alignment;

/// State for tracking code block rendering.
#[derive(Default)]
pub struct CodeBlockState {
    /// Whether we're inside a code block.
    active: bool,
    /// Language of current code block (e.g., "rust", "python").
    language: Option<String>,
    /// Buffer for code block content.
    buffer: String,
}

impl CodeBlockState {
    /// Start a new code block with optional language.
    pub fn start(&mut self, language: Option<String>) {
        self.active = true;
        self.language = language;
        self.buffer.clear();
    }

    /// End the current code block and return (language, content).
    pub fn end(&mut self) -> (Option<String>, String) {
        self.active = false;
        (self.language.take(), std::mem::take(&mut self.buffer))
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn push_str(&mut self, text: &str) {
        self.buffer.push_str(text);
    }

    pub fn push_newline(&mut self) {
        self.buffer.push('\n');
    }
}

/// State for tracking table rendering.
#[derive(Default)]
pub struct TableState {
    in_head: bool,
    alignments: Vec<Alignment>,
    cell_index: usize,
}

impl TableState {
    pub fn start(&mut self, alignments: Vec<Alignment>) {
        self.alignments = alignments;
        self.in_head = false;
        self.cell_index = 0;
    }

    pub fn start_head(&mut self) {
        self.in_head = true;
        self.cell_index = 0;
    }

    pub fn end_head(&mut self) {
        self.in_head = false;
    }

    pub fn start_row(&mut self) {
        self.cell_index = 0;
    }

    pub fn next_cell(&mut self) {
        self.cell_index += 1;
    }

    pub fn is_in_head(&self) -> bool {
        self.in_head
    }

    /// Get the alignment style for the current cell.
    pub fn current_alignment_style(&self) -> &'static str {
        match self.alignments.get(self.cell_index) {
            Some(Alignment::Left) => r#" style="text-align:left""#,
            Some(Alignment::Center) => r#" style="text-align:center""#,
            Some(Alignment::Right) => r#" style="text-align:right""#,
            Some(Alignment::None) | None => "",
        }
    }
}

/// Pending image waiting for its alt text.
pub struct PendingImage {
    pub src: String,
    pub title: String,
    pub alt: String,
}

/// State for tracking image alt text capture.
#[derive(Default)]
pub struct ImageState {
    pending: Option<PendingImage>,
}

impl ImageState {
    /// Start capturing alt text for an image.
    pub fn start(&mut self, src: String, title: String) {
        self.pending = Some(PendingImage {
            src,
            title,
            alt: String::new(),
        });
    }

    /// End image capture and return the collected image.
    pub fn end(&mut self) -> Option<PendingImage> {
        self.pending.take()
    }

    pub fn is_active(&self) -> bool {
        self.pending.is_some()
    }

    pub fn push_str(&mut self, text: &str) {
        if let Some(image) = &mut self.pending {
            image.alt.push_str(text);
        }
    }
}

/// What a paragraph has contained so far.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
enum ParagraphContent {
    #[default]
    Empty,
    /// Exactly one image with a non-empty title, nothing else.
    TitledImage { title: String },
    Mixed,
}

/// Tracks whether the current paragraph is a lone titled image.
///
/// Such paragraphs are rewritten into a `figure` block once the paragraph
/// closes, so the renderer remembers where the paragraph started in the
/// output buffer.
#[derive(Default)]
pub struct FigureState {
    start: Option<usize>,
    content: ParagraphContent,
}

impl FigureState {
    /// Start a paragraph at the given output offset.
    pub fn start_paragraph(&mut self, offset: usize) {
        self.start = Some(offset);
        self.content = ParagraphContent::Empty;
    }

    /// Record non-image content. Whitespace alone does not count.
    pub fn push_content(&mut self, text: &str) {
        if self.start.is_some() && !text.trim().is_empty() {
            self.content = ParagraphContent::Mixed;
        }
    }

    /// Record an image inside the paragraph.
    pub fn push_image(&mut self, title: &str) {
        if self.start.is_none() {
            return;
        }
        self.content = match self.content {
            ParagraphContent::Empty if !title.is_empty() => ParagraphContent::TitledImage {
                title: title.to_owned(),
            },
            _ => ParagraphContent::Mixed,
        };
    }

    /// End the paragraph.
    ///
    /// Returns the start offset and image title when the paragraph held only
    /// a titled image.
    pub fn end_paragraph(&mut self) -> Option<(usize, String)> {
        let start = self.start.take()?;
        match std::mem::take(&mut self.content) {
            ParagraphContent::TitledImage { title } => Some((start, title)),
            ParagraphContent::Empty | ParagraphContent::Mixed => None,
        }
    }
}

/// State for tracking headings and their anchor IDs.
#[derive(Default)]
pub struct HeadingState {
    /// Current heading level being processed (None if not in a heading).
    current_level: Option<u8>,
    /// Explicit `{#id}` attribute of the current heading.
    explicit_id: Option<String>,
    /// Heading plain text, slugified into the generated ID.
    text: String,
    /// Buffer for heading HTML (with inline formatting).
    html: String,
    /// Counter for generating unique heading IDs.
    id_counts: HashMap<String, usize>,
}

impl HeadingState {
    pub fn is_active(&self) -> bool {
        self.current_level.is_some()
    }

    /// Start tracking a heading.
    pub fn start_heading(&mut self, level: u8, explicit_id: Option<String>) {
        self.current_level = Some(level);
        self.explicit_id = explicit_id;
        self.text.clear();
        self.html.clear();
    }

    /// Complete the heading and assign its ID.
    /// Returns (level, id, html) or None if not in a heading.
    pub fn complete_heading(&mut self) -> Option<(u8, String, String)> {
        let level = self.current_level.take()?;
        let text = std::mem::take(&mut self.text);
        let html = std::mem::take(&mut self.html);

        let id = match self.explicit_id.take() {
            Some(id) => {
                *self.id_counts.entry(id.clone()).or_default() += 1;
                id
            }
            None => self.generate_id(&text),
        };

        Some((level, id, html))
    }

    /// Generate a unique ID for a heading.
    fn generate_id(&mut self, text: &str) -> String {
        let base_id = slugify(text);
        let count = self.id_counts.entry(base_id.clone()).or_default();
        let id = match *count {
            0 => base_id,
            n => format!("{base_id}-{n}"),
        };
        *count += 1;
        id
    }

    pub fn push_text(&mut self, text: &str) {
        self.text.push_str(text);
    }

    pub fn push_html(&mut self, html: &str) {
        self.html.push_str(html);
    }
}

/// Convert text to URL-safe slug.
///
/// Converts to lowercase, replaces whitespace/dashes/underscores with single dashes,
/// and removes other non-alphanumeric characters.
#[must_use]
pub fn slugify(text: &str) -> String {
    let mut result = String::new();
    let mut last_was_dash = true; // Prevents leading dash

    for c in text.trim().chars() {
        if c.is_ascii_alphanumeric() {
            result.push(c.to_ascii_lowercase());
            last_was_dash = false;
        } else if !last_was_dash && (c.is_whitespace() || c == '-' || c == '_') {
            result.push('-');
            last_was_dash = true;
        }
    }

    if result.ends_with('-') {
        result.pop();
    }

    result
}

/// Escape HTML special characters.
#[must_use]
pub fn escape_html(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#39;"),
            _ => result.push(c),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Heading 1"), "heading-1");
        assert_eq!(slugify("What's New?"), "whats-new");
        assert_eq!(slugify("  Spaces  "), "spaces");
        assert_eq!(slugify("Multiple   Spaces"), "multiple-spaces");
        assert_eq!(slugify("snake_case"), "snake-case");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<p>"), "&lt;p&gt;");
        assert_eq!(escape_html("a & b"), "a &amp; b");
        assert_eq!(escape_html(r#""quoted""#), "&quot;quoted&quot;");
        assert_eq!(escape_html("it's"), "it&#39;s");
    }

    #[test]
    fn test_code_block_state() {
        let mut state = CodeBlockState::default();
        assert!(!state.is_active());

        state.start(Some("rust".to_owned()));
        assert!(state.is_active());

        state.push_str("fn main() {}");
        let (lang, content) = state.end();
        assert_eq!(lang.as_deref(), Some("rust"));
        assert_eq!(content, "fn main() {}");
        assert!(!state.is_active());
    }

    #[test]
    fn test_table_state() {
        let mut state = TableState::default();
        state.start(vec![Alignment::Left, Alignment::None]);

        state.start_head();
        assert!(state.is_in_head());
        assert_eq!(
            state.current_alignment_style(),
            r#" style="text-align:left""#
        );

        state.next_cell();
        assert_eq!(state.current_alignment_style(), "");

        state.end_head();
        assert!(!state.is_in_head());
    }

    #[test]
    fn test_image_state_collects_alt() {
        let mut state = ImageState::default();
        state.start("a.png".to_owned(), String::new());
        assert!(state.is_active());
        state.push_str("alt ");
        state.push_str("text");

        let image = state.end().unwrap();
        assert_eq!(image.src, "a.png");
        assert_eq!(image.alt, "alt text");
        assert!(!state.is_active());
    }

    #[test]
    fn test_figure_state_lone_titled_image() {
        let mut state = FigureState::default();
        state.start_paragraph(7);
        state.push_content("  ");
        state.push_image("Caption");
        assert_eq!(state.end_paragraph(), Some((7, "Caption".to_owned())));
    }

    #[test]
    fn test_figure_state_mixed_paragraph() {
        let mut state = FigureState::default();
        state.start_paragraph(0);
        state.push_content("see");
        state.push_image("Caption");
        assert_eq!(state.end_paragraph(), None);

        state.start_paragraph(0);
        state.push_image("");
        assert_eq!(state.end_paragraph(), None);
    }

    #[test]
    fn test_heading_ids_are_unique() {
        let mut state = HeadingState::default();
        let ids: Vec<_> = (0..2)
            .map(|_| {
                state.start_heading(2, None);
                state.push_text("FAQ");
                state.complete_heading().unwrap().1
            })
            .collect();
        assert_eq!(ids, ["faq", "faq-1"]);
    }

    #[test]
    fn test_heading_explicit_id() {
        let mut state = HeadingState::default();
        state.start_heading(1, Some("custom".to_owned()));
        state.push_text("Title");
        let (level, id, _) = state.complete_heading().unwrap();
        assert_eq!(level, 1);
        assert_eq!(id, "custom");
    }
}

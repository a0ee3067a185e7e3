//! Drives the answer region: raw text while the stream is live, sanitized
//! markdown once it has ended.

use pulldown_cmark::{Options, Parser, html};

/// Shown between submitting a question and the first answer text.
pub const PLACEHOLDER: &str = "Thinking...";

/// The only thing a failed ask ever displays.
pub const FAILURE_MESSAGE: &str = "Failed to ask Claude";

/// Converts markdown to HTML and strips anything executable from the result.
pub fn render_markdown(markdown: &str) -> String {
    let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS;
    let parser = Parser::new_ext(markdown, options);

    let mut raw = String::with_capacity(markdown.len() + markdown.len() / 2);
    html::push_html(&mut raw, parser);

    sanitize(&raw)
}

/// Removes scripts, event handler attributes, unsafe URL schemes and any
/// other markup outside the allow-list. Sanitizing its own output is a no-op.
pub fn sanitize(html: &str) -> String {
    ammonia::clean(html)
}

/// The page region an answer is shown in.
pub trait AnswerView {
    /// Clears the region and shows the waiting indicator.
    fn show_placeholder(&mut self, text: &str);
    /// Replaces the region with plain text; nothing in `text` is interpreted as markup.
    fn set_text(&mut self, text: &str);
    /// Replaces the region with already-sanitized HTML.
    fn set_html(&mut self, html: &str);
    /// Drops the waiting indicator if it is still shown and appends `message`
    /// below whatever text is already there.
    fn show_error(&mut self, message: &str);
}

/// What an [`AnswerView`] currently holds.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub enum Region {
    #[default]
    Empty,
    Placeholder(String),
    Text(String),
    Html(String),
}

/// In-memory answer region. Keeps every state it went through so callers can
/// check what a reader would have seen.
#[derive(Debug, Default, Clone)]
pub struct Panel {
    region: Region,
    error: Option<String>,
    text_updates: Vec<String>,
    html_writes: usize,
}

impl Panel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn region(&self) -> &Region {
        &self.region
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Every plain-text value the region held, in order.
    pub fn text_updates(&self) -> &[String] {
        &self.text_updates
    }

    pub fn html_writes(&self) -> usize {
        self.html_writes
    }

    pub fn html(&self) -> Option<&str> {
        match &self.region {
            Region::Html(html) => Some(html),
            _ => None,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match &self.region {
            Region::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl AnswerView for Panel {
    fn show_placeholder(&mut self, text: &str) {
        self.region = Region::Placeholder(text.to_string());
        self.error = None;
    }

    fn set_text(&mut self, text: &str) {
        self.region = Region::Text(text.to_string());
        self.text_updates.push(text.to_string());
    }

    fn set_html(&mut self, html: &str) {
        self.region = Region::Html(html.to_string());
        self.html_writes += 1;
    }

    fn show_error(&mut self, message: &str) {
        if matches!(self.region, Region::Placeholder(_)) {
            self.region = Region::Empty;
        }
        self.error = Some(message.to_string());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Waiting,
    Streaming,
    Finished,
    Failed,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Finished | Phase::Failed)
    }
}

/// Moves a view through one ask. After `finish` or `fail` every further call
/// is ignored, so the final HTML is written exactly once and a failure can
/// never be overwritten by late text.
#[derive(Debug)]
pub struct Renderer<V> {
    view: V,
    phase: Phase,
}

impl<V: AnswerView> Renderer<V> {
    pub fn new(view: V) -> Self {
        Self {
            view,
            phase: Phase::Idle,
        }
    }

    pub fn begin(&mut self) {
        if self.phase.is_terminal() {
            return;
        }
        self.view.show_placeholder(PLACEHOLDER);
        self.phase = Phase::Waiting;
    }

    /// Live path: `accumulated` is the whole answer so far, not a delta.
    pub fn update(&mut self, accumulated: &str) {
        if self.phase.is_terminal() {
            return;
        }
        self.view.set_text(accumulated);
        self.phase = Phase::Streaming;
    }

    pub fn finish(&mut self, text: String) {
        if self.phase.is_terminal() {
            return;
        }
        let html = render_markdown(&text);
        self.view.set_html(&html);
        self.phase = Phase::Finished;
    }

    pub fn fail(&mut self) {
        if self.phase.is_terminal() {
            return;
        }
        self.view.show_error(FAILURE_MESSAGE);
        self.phase = Phase::Failed;
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn into_view(self) -> V {
        self.view
    }
}

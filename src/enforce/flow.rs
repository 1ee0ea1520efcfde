/// Kind of observed activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowKind {
    WebRequest,
    Screenshot,
    Messaging,
    AppUsage,
}

/// A single observed activity to decide on: a web request, a captured
/// screen, a message, or an app-usage sample.
#[derive(Debug, Clone)]
pub struct Flow {
    pub kind: FlowKind,
    pub url: Option<String>,
    /// Category tags already attached by the observer.
    pub categories: Vec<String>,
    /// Content sample available for classification on the daemon side.
    pub content: Option<String>,
    pub screenshot_ref: Option<String>,
}

impl Flow {
    pub fn web_request(url: impl Into<String>) -> Self {
        Self {
            kind: FlowKind::WebRequest,
            url: Some(url.into()),
            categories: Vec::new(),
            content: None,
            screenshot_ref: None,
        }
    }

    pub fn with_categories(mut self, categories: Vec<String>) -> Self {
        self.categories = categories;
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }
}

use serde::Serialize;

/// A decoded page record.
///
/// `title` and `revision` come from the page block; `links` and `categories`
/// are filled in by the extraction stages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Page {
    pub title: String,
    pub revision: Revision,
    pub links: Vec<String>,
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Revision {
    pub text: String,
}

impl Page {
    pub fn new(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            revision: Revision { text: text.into() },
            links: Vec::new(),
            categories: Vec::new(),
        }
    }

    pub fn text(&self) -> &str {
        &self.revision.text
    }
}

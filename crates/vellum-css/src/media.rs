//! Media Lists
//!
//! Simple named media constraints. An empty list on either side of a
//! comparison matches unconditionally; otherwise any case-insensitive
//! overlap matches. Unresolvable matches default to "matches".

use std::fmt;

/// Ordered list of media names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaList {
    media: Vec<String>,
}

impl MediaList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            media: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.media.len()
    }

    pub fn is_empty(&self) -> bool {
        self.media.is_empty()
    }

    pub fn item(&self, index: usize) -> Option<&str> {
        self.media.get(index).map(String::as_str)
    }

    /// Append a medium; duplicates (case-insensitive) are dropped first so
    /// the new entry lands at the end.
    pub fn append_medium(&mut self, medium: &str) {
        self.delete_medium(medium);
        self.media.push(medium.to_owned());
    }

    /// Remove a medium; silently ignores absence.
    pub fn delete_medium(&mut self, medium: &str) {
        self.media.retain(|m| !m.eq_ignore_ascii_case(medium));
    }

    /// Whether this list admits a view with the given active media.
    pub fn matches(&self, view: &MediaList) -> bool {
        if self.media.is_empty() || view.media.is_empty() {
            return true;
        }
        self.media.iter().any(|m| {
            view.media.iter().any(|v| v.eq_ignore_ascii_case(m)) || m.eq_ignore_ascii_case("all")
        })
    }

    pub fn media_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for MediaList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.media.join(", "))
    }
}

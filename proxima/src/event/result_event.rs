use std::fmt::{Display, Formatter};

/// What kind of result a notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultKind {
    Relation,
    Index,
}

/// Notification that a relation or index joined or left a database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultEvent {
    Added { kind: ResultKind, name: String },
    Removed { kind: ResultKind, name: String },
}

impl ResultEvent {
    pub fn added(kind: ResultKind, name: &str) -> Self {
        ResultEvent::Added {
            kind,
            name: name.to_string(),
        }
    }

    pub fn removed(kind: ResultKind, name: &str) -> Self {
        ResultEvent::Removed {
            kind,
            name: name.to_string(),
        }
    }

    pub fn kind(&self) -> ResultKind {
        match self {
            ResultEvent::Added { kind, .. } | ResultEvent::Removed { kind, .. } => *kind,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ResultEvent::Added { name, .. } | ResultEvent::Removed { name, .. } => name,
        }
    }
}

impl Display for ResultEvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ResultEvent::Added { kind, name } => write!(f, "added {:?} {}", kind, name),
            ResultEvent::Removed { kind, name } => write!(f, "removed {:?} {}", kind, name),
        }
    }
}

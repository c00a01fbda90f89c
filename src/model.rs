use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TodoError};

// --- Priority ---
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    /// Any other label found on disk. Kept verbatim so a rewrite does not
    /// lose it; sorts like `Medium`.
    #[serde(untagged)]
    Other(String),
}

impl Priority {
    /// Sort rank: high first, low last.
    pub fn rank(&self) -> u8 {
        match self {
            Priority::High => 0,
            Priority::Medium | Priority::Other(_) => 1,
            Priority::Low => 2,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Other(label) => label,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(format!("unknown priority {other:?} (expected low, medium or high)")),
        }
    }
}

// --- Stored item ---
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Item {
    /** Assigned by the service on create, never by the client */
    pub id: u64,

    /** Required short summary */
    pub title: String,

    /** Required long description */
    pub description: String,

    #[serde(default)]
    pub completed: bool,

    #[serde(default)]
    pub priority: Priority,

    /** Free-form text; absent means no due date */
    #[serde(rename = "dueDate", default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
}

// --- Client-supplied fields (create / full replace) ---
/// Everything in [`Item`] except the id. An `id` key in incoming JSON is
/// ignored, so a client can never choose or change one.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Draft {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub priority: Priority,
    #[serde(rename = "dueDate", default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
}

impl Draft {
    /// Creates a new builder chain (*without* a title).
    pub fn builder() -> DraftBuilder<MissingTitle> {
        DraftBuilder {
            title: None,
            description: String::new(),
            completed: false,
            priority: Priority::default(),
            due_date: None,
            _state: std::marker::PhantomData,
        }
    }

    /// Boundary checks the type system can't express.
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(TodoError::invalid("title must not be blank"));
        }
        if let Priority::Other(label) = &self.priority {
            return Err(TodoError::invalid(format!(
                "priority must be low, medium or high, got {label:?}"
            )));
        }
        Ok(())
    }

    pub fn into_item(self, id: u64) -> Item {
        Item {
            id,
            title: self.title,
            description: self.description,
            completed: self.completed,
            priority: self.priority,
            due_date: self.due_date,
        }
    }
}

impl From<Item> for Draft {
    fn from(item: Item) -> Self {
        Draft {
            title: item.title,
            description: item.description,
            completed: item.completed,
            priority: item.priority,
            due_date: item.due_date,
        }
    }
}

// --- Zero size markers for the "typed-state" builder ---
pub struct MissingTitle;
pub struct HasTitle;

pub struct DraftBuilder<TitleState> {
    /// Only `title` has no sensible default; `.build()` is unreachable
    /// until it is set.
    title: Option<String>,
    description: String,
    completed: bool,
    priority: Priority,
    due_date: Option<String>,

    _state: std::marker::PhantomData<TitleState>,
}

impl DraftBuilder<MissingTitle> {
    pub fn title<S: Into<String>>(self, t: S) -> DraftBuilder<HasTitle> {
        DraftBuilder {
            title: Some(t.into()),
            description: self.description,
            completed: self.completed,
            priority: self.priority,
            due_date: self.due_date,
            _state: std::marker::PhantomData, // Flips to HasTitle marker
        }
    }
}

impl<TitleState> DraftBuilder<TitleState> {
    pub fn description<S: Into<String>>(mut self, d: S) -> Self {
        self.description = d.into();
        self
    }

    pub fn completed(mut self, done: bool) -> Self {
        self.completed = done;
        self
    }

    pub fn priority(mut self, p: Priority) -> Self {
        self.priority = p;
        self
    }

    pub fn due<S: Into<String>>(mut self, d: Option<S>) -> Self {
        self.due_date = d.map(Into::into);
        self
    }
}

impl DraftBuilder<HasTitle> {
    /// Consume builder and return the finished [`Draft`].
    pub fn build(self) -> Draft {
        Draft {
            title: self.title.unwrap_or_default(),
            description: self.description,
            completed: self.completed,
            priority: self.priority,
            due_date: self.due_date,
        }
    }
}

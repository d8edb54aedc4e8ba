//! Capabilities the host hands to extensions.
//!
//! The chat platform itself lives outside this crate. Extensions only see a
//! resolved [`UserRef`] for the person they are asked about and a [`Notifier`]
//! that delivers structured [`Embed`] content back to whoever asked.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::config::BotConfig;
use crate::error::{Error, Result};

/// A user resolved from an inbound event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    /// Numeric account id on the platform.
    pub id: u64,
    /// Name shown next to the embed.
    pub display_name: String,
    /// Avatar image, if the platform provided one.
    pub avatar_url: Option<String>,
}

impl UserRef {
    pub fn new(id: u64, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            avatar_url: None,
        }
    }

    pub fn with_avatar(mut self, url: impl Into<String>) -> Self {
        self.avatar_url = Some(url.into());
        self
    }
}

/// Author line of an embed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedAuthor {
    pub name: String,
    pub icon_url: Option<String>,
}

/// One titled value in an embed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// Structured display content delivered to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Embed {
    pub title: String,
    pub description: Option<String>,
    /// RGB colour.
    pub color: u32,
    pub author: Option<EmbedAuthor>,
    pub fields: Vec<EmbedField>,
}

impl Embed {
    pub const GREEN: u32 = 0x2ecc71;

    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            color: 0,
            author: None,
            fields: Vec::new(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn color(mut self, color: u32) -> Self {
        self.color = color;
        self
    }

    pub fn author(mut self, name: impl Into<String>, icon_url: Option<String>) -> Self {
        self.author = Some(EmbedAuthor {
            name: name.into(),
            icon_url,
        });
        self
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        self.fields.push(EmbedField {
            name: name.into(),
            value: value.into(),
            inline,
        });
        self
    }

    /// Value of the first field called `name`.
    pub fn field_value(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }
}

impl fmt::Display for Embed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(author) = &self.author {
            writeln!(f, "[{}]", author.name)?;
        }
        writeln!(f, "{}", self.title)?;
        if let Some(description) = &self.description {
            writeln!(f, "{}", description)?;
        }
        for field in &self.fields {
            writeln!(f, "  {}: {}", field.name, field.value)?;
        }
        Ok(())
    }
}

/// Delivers embeds to the caller that triggered them.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, embed: &Embed) -> Result<()>;
}

pub type DynNotifier = Arc<dyn Notifier>;

/// Prints embeds to stdout, as text or as one JSON object per line.
#[derive(Debug, Default)]
pub struct ConsoleNotifier {
    json: bool,
}

impl ConsoleNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn json() -> Self {
        Self { json: true }
    }
}

#[async_trait]
impl Notifier for ConsoleNotifier {
    async fn send(&self, embed: &Embed) -> Result<()> {
        if self.json {
            let line = serde_json::to_string(embed).map_err(|e| Error::Notify(e.to_string()))?;
            println!("{}", line);
        } else {
            print!("{}", embed);
        }
        Ok(())
    }
}

/// Keeps every embed in memory.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    sent: Mutex<Vec<Embed>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Embed> {
        self.sent.lock().clone()
    }

    pub fn last(&self) -> Option<Embed> {
        self.sent.lock().last().cloned()
    }
}

#[async_trait]
impl Notifier for MemoryNotifier {
    async fn send(&self, embed: &Embed) -> Result<()> {
        self.sent.lock().push(embed.clone());
        Ok(())
    }
}

/// Everything an extension factory gets from the host.
#[derive(Clone)]
pub struct HostContext {
    pub config: Arc<BotConfig>,
    pub notifier: DynNotifier,
}

impl HostContext {
    pub fn new(config: BotConfig, notifier: DynNotifier) -> Self {
        Self {
            config: Arc::new(config),
            notifier,
        }
    }
}

//! Chat transport abstraction and reply payloads

use async_trait::async_trait;
use std::io::Write;

use crate::error::Result;

/// One field group of an embed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
}

/// Structured reply; rendering is left to the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Embed {
    pub color: u32,
    pub thumbnail_url: Option<String>,
    pub fields: Vec<EmbedField>,
    pub footer: String,
}

impl Embed {
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(EmbedField {
            name: name.into(),
            value: value.into(),
        });
        self
    }
}

/// Outbound message body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    Embed(Embed),
}

impl Reply {
    /// Plain-text rendering, used by the console transport and logs
    pub fn to_plain_text(&self) -> String {
        match self {
            Reply::Text(text) => text.clone(),
            Reply::Embed(embed) => {
                let mut out = String::new();
                for field in &embed.fields {
                    out.push_str(&format!("[{}]\n{}\n", field.name, field.value.trim_end()));
                }
                out.push_str(&format!("-- {}", embed.footer));
                out
            }
        }
    }
}

/// Inbound chat message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub sender_id: u64,
    pub channel_id: u64,
    pub message_id: u64,
    pub text: String,
}

/// Outbound side of the chat connection
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send_message(&self, channel_id: u64, reply: &Reply) -> Result<()>;

    async fn add_reaction(&self, channel_id: u64, message_id: u64, symbol: &str) -> Result<()>;
}

/// Writes replies to stdout
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleTransport;

impl ConsoleTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ChatTransport for ConsoleTransport {
    async fn send_message(&self, _channel_id: u64, reply: &Reply) -> Result<()> {
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{}", reply.to_plain_text())?;
        Ok(())
    }

    async fn add_reaction(&self, _channel_id: u64, _message_id: u64, symbol: &str) -> Result<()> {
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "(reacted {symbol})")?;
        Ok(())
    }
}

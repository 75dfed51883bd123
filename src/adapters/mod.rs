pub mod discord;
pub mod source;
pub mod transport;

pub use discord::{run_gateway, DiscordHandler, DiscordTransport, Welcome};
pub use source::{build_client, build_sources, DataSource, HttpSource};
#[cfg(test)]
pub use transport::MockChatTransport;
pub use transport::{ChatTransport, ConsoleTransport, Embed, EmbedField, InboundMessage, Reply};

//! Command dispatcher
//!
//! Maps one inbound message to at most one outbound reply, reading only the
//! current snapshot. Missing data is answered with an apology, unknown
//! commands are ignored, and transport failures are logged and dropped.

use std::sync::Arc;
use tracing::{debug, info, warn};

use super::commands::{self, CommandSpec};
use crate::adapters::{ChatTransport, InboundMessage, Reply};
use crate::config::DeploymentConfig;
use crate::domain::{Readiness, Snapshot};

pub const COMMAND_PREFIX: char = '!';

/// Sent when a command's data has not been fetched yet
pub const NOT_READY_MESSAGE: &str =
    "Whoops! I'm still gathering data for you, please try again later. 😄";

/// A parsed command: keyword plus the unused remainder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command<'a> {
    pub keyword: &'a str,
    pub rest: &'a str,
}

impl<'a> Command<'a> {
    /// Parse `!keyword rest...`; `None` if the prefix is missing.
    ///
    /// The keyword ends at the first space only.
    pub fn parse(text: &'a str) -> Option<Self> {
        let body = text.strip_prefix(COMMAND_PREFIX)?;
        let (keyword, rest) = body.split_once(' ').unwrap_or((body, ""));
        Some(Self { keyword, rest })
    }
}

/// What a dispatch decided to send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub keyword: &'static str,
    pub reply: Reply,
    pub reaction: Option<&'static str>,
    /// False when the apology was sent instead of data
    pub ready: bool,
}

pub struct Dispatcher {
    snapshot: Arc<Snapshot>,
    deployment: DeploymentConfig,
}

impl Dispatcher {
    pub fn new(snapshot: Arc<Snapshot>, deployment: DeploymentConfig) -> Self {
        Self {
            snapshot,
            deployment,
        }
    }

    pub fn deployment(&self) -> &DeploymentConfig {
        &self.deployment
    }

    /// Decide the reply for a message without sending anything
    pub fn respond(&self, text: &str) -> Option<Outcome> {
        let command = Command::parse(text)?;
        let Some(spec) = commands::find(command.keyword) else {
            debug!("Ignoring unknown command !{}", command.keyword);
            return None;
        };

        Some(self.evaluate(spec))
    }

    fn evaluate(&self, spec: &'static CommandSpec) -> Outcome {
        let required = (spec.required)(&self.deployment);
        match self.snapshot.view().resolve(&required) {
            Readiness::Ready(data) => Outcome {
                keyword: spec.keyword,
                reply: (spec.render)(&data, &self.deployment),
                reaction: spec.reaction,
                ready: true,
            },
            Readiness::NotReady { missing } => {
                let missing: Vec<String> = missing.iter().map(ToString::to_string).collect();
                info!(
                    "!{} requested before data was ready (missing {})",
                    spec.keyword,
                    missing.join(", ")
                );
                Outcome {
                    keyword: spec.keyword,
                    reply: Reply::Text(NOT_READY_MESSAGE.to_string()),
                    reaction: None,
                    ready: false,
                }
            }
        }
    }

    /// Handle one inbound message; returns whether a reply was attempted
    pub async fn dispatch(&self, transport: &dyn ChatTransport, message: &InboundMessage) -> bool {
        let Some(outcome) = self.respond(&message.text) else {
            return false;
        };

        match transport.send_message(message.channel_id, &outcome.reply).await {
            Ok(()) => info!(
                "!{} reply sent to channel {} for user {}",
                outcome.keyword, message.channel_id, message.sender_id
            ),
            Err(e) => warn!("Failed to send !{} reply: {}", outcome.keyword, e),
        }

        if let Some(symbol) = outcome.reaction {
            if let Err(e) = transport
                .add_reaction(message.channel_id, message.message_id, symbol)
                .await
            {
                warn!("Failed to react to !{}: {}", outcome.keyword, e);
            }
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MockChatTransport;
    use crate::domain::{HashrateSource, NetworkInfo, Payload, PriceInfo, ReferenceAssetInfo};
    use crate::error::HashBotError;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn message(text: &str) -> InboundMessage {
        InboundMessage {
            sender_id: 1,
            channel_id: 7,
            message_id: 99,
            text: text.to_string(),
        }
    }

    fn dispatcher(snapshot: Arc<Snapshot>) -> Dispatcher {
        Dispatcher::new(snapshot, DeploymentConfig::default())
    }

    fn priced_snapshot() -> Arc<Snapshot> {
        let snapshot = Arc::new(Snapshot::new());
        snapshot.replace(Payload::Price(PriceInfo {
            price: Some(dec!(0.00000120)),
            initial_price: Some(dec!(0.00000100)),
            volume: Some(dec!(0.5)),
            ..Default::default()
        }));
        snapshot.replace(Payload::ReferenceAsset(ReferenceAssetInfo {
            asset: "bitcoin".to_string(),
            fiat: "usd".to_string(),
            fiat_price: dec!(50000),
        }));
        snapshot
    }

    #[test]
    fn test_parse_command() {
        assert_eq!(
            Command::parse("!price btc now"),
            Some(Command {
                keyword: "price",
                rest: "btc now"
            })
        );
        assert_eq!(
            Command::parse("!help"),
            Some(Command {
                keyword: "help",
                rest: ""
            })
        );
        assert_eq!(Command::parse("help"), None);
        assert_eq!(Command::parse(""), None);
        assert_eq!(Command::parse(" !help"), None);
    }

    #[test]
    fn test_keyword_ends_at_first_space_only() {
        assert_eq!(Command::parse("!help\nfoo").unwrap().keyword, "help\nfoo");
        assert_eq!(Command::parse("!height\tnow").unwrap().keyword, "height\tnow");

        let d = dispatcher(Arc::new(Snapshot::new()));
        assert!(d.respond("!help\nfoo").is_none());
        assert!(d.respond("!help foo").is_some());
    }

    #[test]
    fn test_out_of_range_quotes_do_not_panic() {
        let snapshot = priced_snapshot();
        snapshot.replace(Payload::Price(PriceInfo {
            price: Some(Decimal::from_i128_with_scale(2 * 10i128.pow(24), 0)),
            initial_price: Some(dec!(0.00000100)),
            volume: Some(dec!(0.5)),
            ..Default::default()
        }));
        snapshot.replace(Payload::Network(NetworkInfo {
            hashrate: Some(Decimal::from_i128_with_scale(7 * 10i128.pow(28), 0)),
            ..Default::default()
        }));
        let d = Dispatcher::new(
            snapshot,
            DeploymentConfig {
                hashrate_source: HashrateSource::Reported,
                ..Default::default()
            },
        );

        let price = d.respond("!price").unwrap();
        assert!(price.ready);
        let Reply::Embed(embed) = price.reply else {
            panic!("price should be an embed");
        };
        assert!(embed.fields[0].value.contains("Fiat Value: **n/a**"));

        assert_eq!(
            d.respond("!difficulty").unwrap().reply,
            Reply::Text("The current difficulty is **n/a**".to_string())
        );
    }

    #[test]
    fn test_non_command_and_unknown_are_silent() {
        let d = dispatcher(Arc::new(Snapshot::new()));
        assert!(d.respond("hello there").is_none());
        assert!(d.respond("!moon").is_none());
        assert!(d.respond("!").is_none());
    }

    #[test]
    fn test_not_ready_apologises() {
        let d = dispatcher(Arc::new(Snapshot::new()));
        for keyword in ["difficulty", "hashrate", "height", "network", "price", "supply", "mcap"] {
            let outcome = d.respond(&format!("!{keyword}")).unwrap();
            assert!(!outcome.ready);
            assert_eq!(outcome.reply, Reply::Text(NOT_READY_MESSAGE.to_string()));
            assert_eq!(outcome.reaction, None);
        }
    }

    #[test]
    fn test_partially_filled_slot_is_not_ready() {
        let snapshot = Arc::new(Snapshot::new());
        // hashrate present but the deployment derives from difficulty
        snapshot.replace(Payload::Network(NetworkInfo {
            height: Some(10),
            hashrate: Some(dec!(10000)),
            ..Default::default()
        }));
        let d = dispatcher(snapshot);

        assert!(!d.respond("!hashrate").unwrap().ready);
        assert!(d.respond("!height").unwrap().ready);
    }

    #[test]
    fn test_help_ready_without_data() {
        let d = dispatcher(Arc::new(Snapshot::new()));
        let outcome = d.respond("!help").unwrap();
        assert!(outcome.ready);
        let Reply::Text(text) = outcome.reply else {
            panic!("help should be text");
        };
        assert!(text.contains("!network"));
    }

    #[tokio::test]
    async fn test_dispatch_sends_exactly_one_apology() {
        let mut transport = MockChatTransport::new();
        transport
            .expect_send_message()
            .withf(|channel, reply| {
                *channel == 7 && *reply == Reply::Text(NOT_READY_MESSAGE.to_string())
            })
            .times(1)
            .returning(|_, _| Ok(()));
        transport.expect_add_reaction().never();

        let d = dispatcher(Arc::new(Snapshot::new()));
        assert!(d.dispatch(&transport, &message("!price")).await);
    }

    #[tokio::test]
    async fn test_dispatch_unknown_sends_nothing() {
        let mut transport = MockChatTransport::new();
        transport.expect_send_message().never();
        transport.expect_add_reaction().never();

        let d = dispatcher(priced_snapshot());
        assert!(!d.dispatch(&transport, &message("!wen")).await);
        assert!(!d.dispatch(&transport, &message("price")).await);
    }

    #[tokio::test]
    async fn test_dispatch_price_reacts() {
        let mut transport = MockChatTransport::new();
        transport
            .expect_send_message()
            .withf(|_, reply| matches!(reply, Reply::Embed(_)))
            .times(1)
            .returning(|_, _| Ok(()));
        transport
            .expect_add_reaction()
            .withf(|channel, message_id, symbol| *channel == 7 && *message_id == 99 && symbol == "📈")
            .times(1)
            .returning(|_, _, _| Ok(()));

        let d = dispatcher(priced_snapshot());
        assert!(d.dispatch(&transport, &message("!price")).await);
    }

    #[tokio::test]
    async fn test_dispatch_swallows_transport_errors() {
        let mut transport = MockChatTransport::new();
        transport
            .expect_send_message()
            .times(1)
            .returning(|_, _| Err(HashBotError::Transport("gateway closed".to_string())));
        transport
            .expect_add_reaction()
            .times(1)
            .returning(|_, _, _| Err(HashBotError::Transport("gateway closed".to_string())));

        let d = dispatcher(priced_snapshot());
        assert!(d.dispatch(&transport, &message("!price")).await);
    }
}

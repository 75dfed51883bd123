//! Command table
//!
//! Each entry names the snapshot fields it needs and a renderer that only
//! runs once all of them are present. The help text is generated from this
//! table, so adding an entry is enough to advertise it.

use rust_decimal::Decimal;

use crate::adapters::{Embed, Reply};
use crate::config::DeploymentConfig;
use crate::domain::{
    atomic_to_coins, avg_tx_per_block, difficulty, emission_percent, fiat_price,
    format_decimal, format_signed_percent, format_with_thousands, hashrate_khs, market_cap,
    percent_change_24h, Field, Resolved,
};

/// Renders a reply from resolved fields
pub type Renderer = fn(&Resolved, &DeploymentConfig) -> Reply;

/// Lists the fields a command needs under a deployment
pub type Requirements = fn(&DeploymentConfig) -> Vec<Field>;

/// One entry of the command table
pub struct CommandSpec {
    pub keyword: &'static str,
    pub description: &'static str,
    pub required: Requirements,
    pub render: Renderer,
    /// Reaction added to the triggering message after a full reply
    pub reaction: Option<&'static str>,
}

impl std::fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandSpec")
            .field("keyword", &self.keyword)
            .field("reaction", &self.reaction)
            .finish_non_exhaustive()
    }
}

pub static COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        keyword: "difficulty",
        description: "Displays current difficulty.",
        required: hashrate_requirements,
        render: render_difficulty,
        reaction: None,
    },
    CommandSpec {
        keyword: "hashrate",
        description: "Displays current network hashrate.",
        required: hashrate_requirements,
        render: render_hashrate,
        reaction: None,
    },
    CommandSpec {
        keyword: "height",
        description: "Displays current block height.",
        required: |_| vec![Field::Height],
        render: render_height,
        reaction: None,
    },
    CommandSpec {
        keyword: "help",
        description: "Displays this menu.",
        required: |_| Vec::new(),
        render: render_help,
        reaction: None,
    },
    CommandSpec {
        keyword: "mcap",
        description: "Displays current market cap.",
        required: |_| vec![Field::GeneratedCoins, Field::Price, Field::ReferenceFiatPrice],
        render: render_mcap,
        reaction: None,
    },
    CommandSpec {
        keyword: "network",
        description: "Displays network information.",
        required: network_requirements,
        render: render_network,
        reaction: None,
    },
    CommandSpec {
        keyword: "price",
        description: "Displays current price and 24h change.",
        required: |_| {
            vec![
                Field::Price,
                Field::Price24hAgo,
                Field::Volume24h,
                Field::ReferenceFiatPrice,
            ]
        },
        render: render_price,
        reaction: Some("📈"),
    },
    CommandSpec {
        keyword: "supply",
        description: "Displays circulating supply and emission.",
        required: |_| vec![Field::GeneratedCoins],
        render: render_supply,
        reaction: None,
    },
];

/// Look up a command by keyword
pub fn find(keyword: &str) -> Option<&'static CommandSpec> {
    COMMANDS.iter().find(|c| c.keyword == keyword)
}

fn hashrate_requirements(deployment: &DeploymentConfig) -> Vec<Field> {
    vec![deployment.hashrate_source.field()]
}

fn network_requirements(deployment: &DeploymentConfig) -> Vec<Field> {
    vec![
        deployment.hashrate_source.field(),
        Field::Height,
        Field::TxCount,
        Field::TxPoolSize,
        Field::GeneratedCoins,
        Field::BlockReward,
    ]
}

fn current_hashrate(data: &Resolved, deployment: &DeploymentConfig) -> Decimal {
    let source = deployment.hashrate_source;
    hashrate_khs(source, data.get(source.field()), deployment.block_target_secs)
}

fn current_difficulty(data: &Resolved, deployment: &DeploymentConfig) -> Option<Decimal> {
    let source = deployment.hashrate_source;
    difficulty(source, data.get(source.field()), deployment.block_target_secs)
}

/// Format a derived value, or `n/a` when the inputs put it out of range
fn or_na(value: Option<Decimal>, dp: u32) -> String {
    value
        .map(|v| format_decimal(v, dp))
        .unwrap_or_else(|| "n/a".to_string())
}

fn fiat_or_na(value: Option<Decimal>, deployment: &DeploymentConfig) -> String {
    value
        .map(|v| format!("{}{}", deployment.fiat_symbol, format_decimal(v, 2)))
        .unwrap_or_else(|| "n/a".to_string())
}

fn base_embed(deployment: &DeploymentConfig) -> Embed {
    Embed {
        color: deployment.embed_color,
        thumbnail_url: deployment.thumbnail_url.clone(),
        fields: Vec::new(),
        footer: deployment.footer.clone(),
    }
}

fn render_difficulty(data: &Resolved, deployment: &DeploymentConfig) -> Reply {
    Reply::Text(format!(
        "The current difficulty is **{}**",
        or_na(current_difficulty(data, deployment), 0)
    ))
}

fn render_hashrate(data: &Resolved, deployment: &DeploymentConfig) -> Reply {
    Reply::Text(format!(
        "The current global hashrate is **{} KH/s**",
        format_decimal(current_hashrate(data, deployment), 2)
    ))
}

fn render_height(data: &Resolved, _deployment: &DeploymentConfig) -> Reply {
    Reply::Text(format!(
        "The current block height is **{}**",
        format_with_thousands(data.get_u64(Field::Height))
    ))
}

fn render_help(_data: &Resolved, _deployment: &DeploymentConfig) -> Reply {
    let mut text = String::from("```");
    for command in COMMANDS {
        let usage = format!("!{}", command.keyword);
        text.push_str(&format!("{usage:<14}:   {}\n", command.description));
    }
    text.push_str("```");
    Reply::Text(text)
}

fn render_network(data: &Resolved, deployment: &DeploymentConfig) -> Reply {
    let ticker = &deployment.ticker;
    let avg_tx = or_na(avg_tx_per_block(data.get(Field::TxCount), data.get(Field::Height)), 2);
    let emitted = or_na(
        emission_percent(data.get(Field::GeneratedCoins), deployment.total_supply),
        2,
    );
    let circulating = atomic_to_coins(data.get(Field::GeneratedCoins), deployment.coin_decimals);
    let reward = atomic_to_coins(data.get(Field::BlockReward), deployment.coin_decimals);

    let embed = base_embed(deployment)
        .field(
            "Stats",
            format!(
                "Network Hashrate: **{} KH/s**\nDifficulty: **{}**\nCurrent Height: **{}**\n",
                format_decimal(current_hashrate(data, deployment), 2),
                or_na(current_difficulty(data, deployment), 0),
                format_with_thousands(data.get_u64(Field::Height)),
            ),
        )
        .field(
            "Transactions",
            format!(
                "TX in Mempool: **{}**\nAvg TX/Block: **{}**",
                format_with_thousands(data.get_u64(Field::TxPoolSize)),
                avg_tx,
            ),
        )
        .field(
            "Supply",
            format!(
                "Circulating: **{} {ticker}**\nEmitted: **{emitted}%**\nBlock Reward: **{} {ticker}**",
                format_decimal(circulating, deployment.coin_decimals),
                format_decimal(reward, deployment.coin_decimals),
            ),
        );

    Reply::Embed(embed)
}

fn render_price(data: &Resolved, deployment: &DeploymentConfig) -> Reply {
    let reference = &deployment.reference_ticker;
    let latest = data.get(Field::Price);
    let change = percent_change_24h(latest, data.get(Field::Price24hAgo))
        .map(format_signed_percent)
        .unwrap_or_else(|| "n/a".to_string());
    let fiat = fiat_or_na(fiat_price(latest, data.get(Field::ReferenceFiatPrice)), deployment);

    let embed = base_embed(deployment)
        .field(
            format!("{} Price", deployment.coin_name),
            format!(
                "Current: **{} {reference}**\n24h Change: **{change}**\nFiat Value: **{fiat}**",
                format_decimal(latest, 8),
            ),
        )
        .field(
            "Volume",
            format!(
                "24h Volume: **{} {reference}**",
                format_decimal(data.get(Field::Volume24h), 2)
            ),
        );

    Reply::Embed(embed)
}

fn render_supply(data: &Resolved, deployment: &DeploymentConfig) -> Reply {
    let generated = data.get(Field::GeneratedCoins);
    let circulating = atomic_to_coins(generated, deployment.coin_decimals);
    let emitted = or_na(emission_percent(generated, deployment.total_supply), 2);

    Reply::Text(format!(
        "Current circulating supply is **{} {}** (**{emitted}%** of max supply emitted)",
        format_decimal(circulating, deployment.coin_decimals),
        deployment.ticker,
    ))
}

fn render_mcap(data: &Resolved, deployment: &DeploymentConfig) -> Reply {
    let circulating = atomic_to_coins(data.get(Field::GeneratedCoins), deployment.coin_decimals);
    let cap = market_cap(
        circulating,
        data.get(Field::Price),
        data.get(Field::ReferenceFiatPrice),
    );

    Reply::Text(format!(
        "The current market cap is **{}**",
        fiat_or_na(cap, deployment)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{HashrateSource, NetworkInfo, Payload, PriceInfo, Readiness, ReferenceAssetInfo, Snapshot, TransactionInfo};
    use rust_decimal_macros::dec;

    fn full_snapshot() -> Snapshot {
        let snapshot = Snapshot::new();
        snapshot.replace(Payload::Network(NetworkInfo {
            height: Some(1_000_000),
            difficulty: Some(dec!(1200000)),
            hashrate: Some(dec!(10000)),
            tx_count: Some(2_500_000),
            tx_pool_size: Some(12),
            ..Default::default()
        }));
        snapshot.replace(Payload::Transactions(TransactionInfo {
            already_generated_coins: Some(dec!(1840000000000000)),
            already_generated_transactions: Some(2_500_000),
            reward: Some(dec!(2919517)),
            height: Some(1_000_000),
        }));
        snapshot.replace(Payload::Price(PriceInfo {
            success: Some(true),
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

    fn deployment() -> DeploymentConfig {
        DeploymentConfig {
            total_supply: dec!(3680000000000000),
            ..Default::default()
        }
    }

    fn render(keyword: &str, deployment: &DeploymentConfig) -> Reply {
        render_from(&full_snapshot(), keyword, deployment)
    }

    fn render_from(snapshot: &Snapshot, keyword: &str, deployment: &DeploymentConfig) -> Reply {
        let command = find(keyword).unwrap();
        let view = snapshot.view();
        match view.resolve(&(command.required)(deployment)) {
            Readiness::Ready(data) => (command.render)(&data, deployment),
            Readiness::NotReady { missing } => panic!("{keyword} missing {missing:?}"),
        }
    }

    fn text(reply: Reply) -> String {
        match reply {
            Reply::Text(text) => text,
            Reply::Embed(embed) => panic!("expected text, got embed {embed:?}"),
        }
    }

    #[test]
    fn test_every_command_renders_from_declared_fields() {
        // renderers read through Resolved, which panics in debug builds on
        // fields that were not declared as required
        for source in [HashrateSource::Difficulty, HashrateSource::Reported] {
            let deployment = DeploymentConfig {
                hashrate_source: source,
                ..deployment()
            };
            for command in COMMANDS {
                render(command.keyword, &deployment);
            }
        }
    }

    #[test]
    fn test_every_field_is_read_by_some_command() {
        let mut used = Vec::new();
        for source in [HashrateSource::Difficulty, HashrateSource::Reported] {
            let deployment = DeploymentConfig {
                hashrate_source: source,
                ..deployment()
            };
            for command in COMMANDS {
                used.extend((command.required)(&deployment));
            }
        }
        for field in Field::ALL {
            assert!(used.contains(&field), "{field} is never required");
        }
    }

    #[test]
    fn test_keywords_are_unique() {
        let mut keywords: Vec<_> = COMMANDS.iter().map(|c| c.keyword).collect();
        keywords.sort_unstable();
        keywords.dedup();
        assert_eq!(keywords.len(), COMMANDS.len());
    }

    #[test]
    fn test_help_lists_every_command() {
        let help = text(render("help", &deployment()));
        assert!(help.starts_with("```!difficulty   :   Displays current difficulty.\n"));
        assert!(help.ends_with("```"));
        for command in COMMANDS {
            assert!(help.contains(&format!("!{}", command.keyword)), "{help}");
        }
    }

    #[test]
    fn test_help_requires_nothing() {
        assert!((find("help").unwrap().required)(&deployment()).is_empty());
    }

    #[test]
    fn test_hashrate_from_difficulty() {
        assert_eq!(
            text(render("hashrate", &deployment())),
            "The current global hashrate is **10.00 KH/s**"
        );
    }

    #[test]
    fn test_hashrate_from_reported_field() {
        let deployment = DeploymentConfig {
            hashrate_source: HashrateSource::Reported,
            block_target_secs: 30,
            ..deployment()
        };
        assert_eq!(
            text(render("hashrate", &deployment)),
            "The current global hashrate is **10.00 KH/s**"
        );
        assert_eq!(
            text(render("difficulty", &deployment)),
            "The current difficulty is **300,000**"
        );
    }

    #[test]
    fn test_requirements_follow_hashrate_source() {
        let reported = DeploymentConfig {
            hashrate_source: HashrateSource::Reported,
            ..deployment()
        };
        let command = find("hashrate").unwrap();
        assert_eq!((command.required)(&deployment()), vec![Field::Difficulty]);
        assert_eq!((command.required)(&reported), vec![Field::Hashrate]);
    }

    #[test]
    fn test_height_and_difficulty_grouped() {
        assert_eq!(
            text(render("height", &deployment())),
            "The current block height is **1,000,000**"
        );
        assert_eq!(
            text(render("difficulty", &deployment())),
            "The current difficulty is **1,200,000**"
        );
    }

    #[test]
    fn test_supply_reports_emission() {
        assert_eq!(
            text(render("supply", &deployment())),
            "Current circulating supply is **18,400,000,000,000.00 TRTL** (**50.00%** of max supply emitted)"
        );
    }

    #[test]
    fn test_mcap_in_fiat() {
        // 18.4e12 coins * 0.0000012 BTC * 50000 USD
        assert_eq!(
            text(render("mcap", &deployment())),
            "The current market cap is **$1,104,000,000,000.00**"
        );
    }

    #[test]
    fn test_network_embed_fields() {
        let Reply::Embed(embed) = render("network", &deployment()) else {
            panic!("network should render an embed");
        };
        assert_eq!(embed.color, 3_066_993);
        let names: Vec<_> = embed.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Stats", "Transactions", "Supply"]);
        assert!(embed.fields[0].value.contains("Network Hashrate: **10.00 KH/s**"));
        assert!(embed.fields[1].value.contains("TX in Mempool: **12**"));
        assert!(embed.fields[1].value.contains("Avg TX/Block: **2.50**"));
        assert!(embed.fields[2].value.contains("Emitted: **50.00%**"));
        assert!(embed.fields[2].value.contains("Block Reward: **29,195.17 TRTL**"));
    }

    #[test]
    fn test_price_embed_fields() {
        let Reply::Embed(embed) = render("price", &deployment()) else {
            panic!("price should render an embed");
        };
        assert_eq!(embed.fields[0].name, "TurtleCoin Price");
        let price = &embed.fields[0].value;
        assert!(price.contains("Current: **0.00000120 BTC**"), "{price}");
        assert!(price.contains("24h Change: **+20.00%**"), "{price}");
        assert!(price.contains("Fiat Value: **$0.06**"), "{price}");
        assert!(embed.fields[1].value.contains("24h Volume: **0.50 BTC**"));
        assert_eq!(find("price").unwrap().reaction, Some("📈"));
    }

    fn big(mantissa: i128, exp: u32) -> Decimal {
        Decimal::from_i128_with_scale(mantissa * 10i128.pow(exp), 0)
    }

    #[test]
    fn test_out_of_range_quotes_render_na() {
        let snapshot = full_snapshot();
        snapshot.replace(Payload::Price(PriceInfo {
            success: Some(true),
            price: Some(big(2, 24)),
            initial_price: Some(dec!(0.00000100)),
            volume: Some(dec!(0.5)),
            ..Default::default()
        }));
        snapshot.replace(Payload::Network(NetworkInfo {
            height: Some(1_000_000),
            difficulty: Some(dec!(1200000)),
            hashrate: Some(big(7, 28)),
            tx_count: Some(2_500_000),
            tx_pool_size: Some(12),
            ..Default::default()
        }));
        let reported = DeploymentConfig {
            hashrate_source: HashrateSource::Reported,
            ..deployment()
        };

        let Reply::Embed(price) = render_from(&snapshot, "price", &reported) else {
            panic!("price should render an embed");
        };
        let value = &price.fields[0].value;
        assert!(value.contains("24h Change: **n/a**"), "{value}");
        assert!(value.contains("Fiat Value: **n/a**"), "{value}");

        assert_eq!(
            text(render_from(&snapshot, "mcap", &reported)),
            "The current market cap is **n/a**"
        );
        assert_eq!(
            text(render_from(&snapshot, "difficulty", &reported)),
            "The current difficulty is **n/a**"
        );

        let Reply::Embed(network) = render_from(&snapshot, "network", &reported) else {
            panic!("network should render an embed");
        };
        assert!(network.fields[0].value.contains("Difficulty: **n/a**"));
    }

    #[test]
    fn test_emission_na_when_supply_overflows() {
        let snapshot = full_snapshot();
        snapshot.replace(Payload::Transactions(TransactionInfo {
            already_generated_coins: Some(Decimal::MAX),
            already_generated_transactions: Some(1),
            reward: Some(dec!(1)),
            height: Some(1),
        }));
        let deployment = DeploymentConfig {
            total_supply: dec!(0.5),
            ..deployment()
        };
        let supply = text(render_from(&snapshot, "supply", &deployment));
        assert!(supply.contains("(**n/a%** of max supply emitted)"), "{supply}");
    }

    #[test]
    fn test_unknown_keyword() {
        assert!(find("moon").is_none());
        assert!(find("").is_none());
    }
}

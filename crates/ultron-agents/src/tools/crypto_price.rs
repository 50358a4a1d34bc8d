use std::collections::{BTreeMap, HashMap};

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, warn};
use ultron_common::ToolError;

/// Ticker symbols the price source knows under a different id.
const SYMBOL_IDS: &[(&str, &str)] = &[
    ("BTC", "bitcoin"),
    ("ETH", "ethereum"),
    ("SOL", "solana"),
    ("DOGE", "dogecoin"),
    ("ADA", "cardano"),
    ("XRP", "ripple"),
    ("DOT", "polkadot"),
    ("LTC", "litecoin"),
    ("BNB", "binancecoin"),
    ("MATIC", "matic-network"),
    ("AVAX", "avalanche-2"),
    ("LINK", "chainlink"),
    ("USDT", "tether"),
    ("USDC", "usd-coin"),
];

/// Current USD price lookup for a batch of cryptocurrency symbols.
#[derive(Clone)]
pub struct CryptoPriceTool {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct PriceArgs {
    symbols: Vec<String>,
}

/// One entry of the `/simple/price` response.
#[derive(Debug, Deserialize)]
struct SimplePrice {
    usd: Option<f64>,
    usd_24h_change: Option<f64>,
    usd_market_cap: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceQuote {
    pub price: Option<f64>,
    pub change_24h: Option<f64>,
    pub market_cap: Option<f64>,
}

impl CryptoPriceTool {
    pub const NAME: &'static str = "get_crypto_price";
    pub const DESCRIPTION: &'static str = "Get the current USD price, 24 hour change and market \
         cap for one or more cryptocurrencies. Pass ticker symbols such as BTC or ETH.";

    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn input_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "symbols": {
                    "type": "array",
                    "items": { "type": "string" },
                    "minItems": 1,
                    "description": "Ticker symbols to look up, e.g. [\"BTC\", \"ETH\"]."
                }
            },
            "required": ["symbols"]
        })
    }

    pub async fn invoke(&self, args: &Value) -> Result<Value, ToolError> {
        let args: PriceArgs =
            serde_json::from_value(args.clone()).map_err(|e| invalid_arguments(e.to_string()))?;
        if args.symbols.is_empty() {
            return Err(invalid_arguments("at least one symbol is required"));
        }

        let quotes = self.lookup(&args.symbols).await?;
        serde_json::to_value(quotes).map_err(|e| ToolError::ExternalLookup(e.to_string()))
    }

    /// Fetch quotes for `symbols`, keyed by the uppercased symbol.
    ///
    /// Symbols the source does not recognise are left out of the result.
    pub async fn lookup(&self, symbols: &[String]) -> Result<BTreeMap<String, PriceQuote>, ToolError> {
        let wanted: Vec<(String, String)> = symbols
            .iter()
            .map(|s| {
                let symbol = s.trim().to_uppercase();
                let id = external_id(&symbol);
                (symbol, id)
            })
            .collect();

        let mut ids: Vec<&str> = wanted.iter().map(|(_, id)| id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        let ids = ids.join(",");

        debug!(ids = %ids, "requesting crypto prices");

        let response = self
            .client
            .get(format!("{}/simple/price", self.base_url))
            .query(&[
                ("ids", ids.as_str()),
                ("vs_currencies", "usd"),
                ("include_24hr_change", "true"),
                ("include_market_cap", "true"),
            ])
            .send()
            .await
            .map_err(|e| ToolError::ExternalLookup(format!("price request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "price source returned an error");
            return Err(ToolError::ExternalLookup(format!(
                "price source returned {status}: {body}"
            )));
        }

        let prices: HashMap<String, SimplePrice> = response
            .json()
            .await
            .map_err(|e| ToolError::ExternalLookup(format!("invalid price response: {e}")))?;

        Ok(wanted
            .into_iter()
            .filter_map(|(symbol, id)| {
                prices.get(&id).map(|p| {
                    (
                        symbol,
                        PriceQuote {
                            price: p.usd,
                            change_24h: p.usd_24h_change,
                            market_cap: p.usd_market_cap,
                        },
                    )
                })
            })
            .collect())
    }
}

/// Price-source id for a ticker symbol; unknown symbols pass through lower-cased.
pub fn external_id(symbol: &str) -> String {
    SYMBOL_IDS
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(symbol))
        .map(|(_, id)| id.to_string())
        .unwrap_or_else(|| symbol.to_lowercase())
}

fn invalid_arguments(reason: impl Into<String>) -> ToolError {
    ToolError::InvalidArguments {
        tool: CryptoPriceTool::NAME.to_string(),
        reason: reason.into(),
    }
}

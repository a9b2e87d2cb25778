//! HTTP client for the Jupiter quote and swap-build endpoints.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use url::Url;

use crate::types::{
    MultiHopQuote, NotTradable, Quote, SwapBuildOptions, SwapBuildRequest, SwapBuildResponse,
    SwapRoute,
};

/// Syntactically valid payer for quote-time swap builds when the true
/// payer is not yet known (the system program address). Routes built
/// against it must be rebuilt with the real payer before settlement.
pub const PLACEHOLDER_PAYER: &str = "11111111111111111111111111111111";

/// Route and swap-transaction source the composer depends on.
///
/// [`JupiterClient`] is the production implementation; tests substitute
/// call-counting fakes.
#[async_trait]
pub trait RouteSource: Send + Sync {
    /// Quotes a single-hop conversion.
    async fn quote(
        &self,
        input_mint: &str,
        output_mint: &str,
        amount: u64,
        slippage_bps: u16,
    ) -> Result<Quote, NotTradable>;

    /// Quotes a two-hop conversion when no direct route exists, chaining
    /// the first hop's output into the second hop's input exactly.
    async fn multi_hop_quote(
        &self,
        input_mint: &str,
        via_mint: &str,
        output_mint: &str,
        amount: u64,
        slippage_bps: u16,
    ) -> Result<MultiHopQuote, NotTradable>;

    /// Requests a ready-to-merge transaction for the final hop of a route.
    async fn build_swap_transaction(
        &self,
        quote: &Quote,
        payer: &str,
        options: SwapBuildOptions,
    ) -> Result<SwapRoute, NotTradable>;
}

/// Client for the Jupiter lite API.
#[derive(Debug, Clone)]
pub struct JupiterClient {
    http: Client,
    base_url: Url,
    /// Extra attempts after the first failure. Zero by default: quotes are
    /// latency sensitive and stale quotes are rejected downstream anyway.
    retry_budget: u32,
}

impl JupiterClient {
    /// Creates a client with a per-request timeout and no retries.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`reqwest::Error`] if the HTTP client cannot
    /// be constructed.
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url,
            retry_budget: 0,
        })
    }

    /// Overrides the retry budget (extra attempts after the first).
    #[must_use]
    pub const fn with_retry_budget(mut self, retry_budget: u32) -> Self {
        self.retry_budget = retry_budget;
        self
    }

    fn endpoint(&self, path: &str) -> Result<Url, NotTradable> {
        self.base_url.join(path).map_err(|e| NotTradable {
            reason: format!("aggregator URL: {e}"),
        })
    }

    async fn attempt_quote(
        &self,
        url: Url,
        input_mint: &str,
        output_mint: &str,
        amount: u64,
        slippage_percent: &str,
    ) -> Result<Quote, NotTradable> {
        let response = self
            .http
            .get(url)
            .query(&[
                ("inputMint", input_mint),
                ("outputMint", output_mint),
                ("amount", amount.to_string().as_str()),
                ("slippageBps", slippage_percent),
                ("onlyDirectRoutes", "false"),
                ("asLegacyTransaction", "false"),
            ])
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| NotTradable {
                reason: format!("quote request failed: {e}"),
            })?;
        response.json::<Quote>().await.map_err(|e| NotTradable {
            reason: format!("quote response malformed: {e}"),
        })
    }
}

/// The aggregator names its parameter in bps but expects a percentage, so
/// basis points are divided by 100 before sending.
fn slippage_percent(slippage_bps: u16) -> String {
    if slippage_bps % 100 == 0 {
        (slippage_bps / 100).to_string()
    } else {
        (f64::from(slippage_bps) / 100.0).to_string()
    }
}

#[async_trait]
impl RouteSource for JupiterClient {
    async fn quote(
        &self,
        input_mint: &str,
        output_mint: &str,
        amount: u64,
        slippage_bps: u16,
    ) -> Result<Quote, NotTradable> {
        let url = self.endpoint("swap/v1/quote")?;
        let percent = slippage_percent(slippage_bps);

        let mut last_failure = None;
        for attempt in 0..=self.retry_budget {
            match self
                .attempt_quote(url.clone(), input_mint, output_mint, amount, &percent)
                .await
            {
                Ok(quote) => {
                    tracing::debug!(
                        input_mint,
                        output_mint,
                        amount,
                        out_amount = %quote.out_amount,
                        "quoted route"
                    );
                    return Ok(quote);
                }
                Err(failure) => {
                    tracing::debug!(attempt, reason = %failure.reason, "quote attempt failed");
                    last_failure = Some(failure);
                }
            }
        }
        Err(last_failure.unwrap_or_else(|| NotTradable {
            reason: "quote retry budget exhausted".to_owned(),
        }))
    }

    async fn multi_hop_quote(
        &self,
        input_mint: &str,
        via_mint: &str,
        output_mint: &str,
        amount: u64,
        slippage_bps: u16,
    ) -> Result<MultiHopQuote, NotTradable> {
        let first = self
            .quote(input_mint, via_mint, amount, slippage_bps)
            .await?;
        let chained_amount = first.out_amount_base_units()?;
        let second = self
            .quote(via_mint, output_mint, chained_amount, slippage_bps)
            .await?;
        Ok(MultiHopQuote { first, second })
    }

    async fn build_swap_transaction(
        &self,
        quote: &Quote,
        payer: &str,
        options: SwapBuildOptions,
    ) -> Result<SwapRoute, NotTradable> {
        let url = self.endpoint("swap/v1")?;
        let request = SwapBuildRequest {
            quote_response: quote,
            user_public_key: payer,
            wrap_unwrap_sol: options.wrap_unwrap_sol,
            dynamic_compute_unit_limit: options.dynamic_compute_unit_limit,
            prioritization_fee_lamports: options.prioritization_fee_lamports,
        };
        let response = self
            .http
            .post(url)
            .json(&request)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| NotTradable {
                reason: format!("swap build failed: {e}"),
            })?;
        let built: SwapBuildResponse = response.json().await.map_err(|e| NotTradable {
            reason: format!("swap build response malformed: {e}"),
        })?;
        Ok(SwapRoute {
            quote: quote.clone(),
            swap_transaction: built.swap_transaction,
            last_valid_block_height: built.last_valid_block_height,
            placeholder_payer: payer == PLACEHOLDER_PAYER,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn quote_json(input_mint: &str, output_mint: &str, in_amount: &str, out_amount: &str) -> serde_json::Value {
        serde_json::json!({
            "inputMint": input_mint,
            "outputMint": output_mint,
            "inAmount": in_amount,
            "outAmount": out_amount,
            "routePlan": [],
            "contextSlot": 1
        })
    }

    async fn client(server: &MockServer) -> JupiterClient {
        JupiterClient::new(server.uri().parse().unwrap(), Duration::from_secs(2)).unwrap()
    }

    #[tokio::test]
    async fn quote_sends_slippage_as_a_percentage() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/swap/v1/quote"))
            .and(query_param("inputMint", "SOLMINT"))
            .and(query_param("outputMint", "TOKEN"))
            .and(query_param("amount", "300000"))
            .and(query_param("slippageBps", "1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(quote_json("SOLMINT", "TOKEN", "300000", "990000")),
            )
            .expect(1)
            .mount(&server)
            .await;

        let quote = client(&server)
            .await
            .quote("SOLMINT", "TOKEN", 300_000, 100)
            .await
            .unwrap();
        assert_eq!(quote.out_amount_base_units().unwrap(), 990_000);
    }

    #[test]
    fn fractional_slippage_keeps_its_decimals() {
        assert_eq!(slippage_percent(150), "1.5");
        assert_eq!(slippage_percent(100), "1");
        assert_eq!(slippage_percent(0), "0");
        assert_eq!(slippage_percent(10_000), "100");
    }

    #[tokio::test]
    async fn server_errors_degrade_to_not_tradable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/swap/v1/quote"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let result = client(&server).await.quote("A", "B", 1, 50).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn retry_budget_grants_extra_attempts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/swap/v1/quote"))
            .respond_with(ResponseTemplate::new(502))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/swap/v1/quote"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(quote_json("A", "B", "10", "20")),
            )
            .expect(1)
            .mount(&server)
            .await;

        let quote = client(&server)
            .await
            .with_retry_budget(1)
            .quote("A", "B", 10, 50)
            .await
            .unwrap();
        assert_eq!(quote.out_amount, "20");
    }

    #[tokio::test]
    async fn multi_hop_chains_the_first_output_into_the_second_input() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/swap/v1/quote"))
            .and(query_param("inputMint", "USDC"))
            .and(query_param("amount", "300000"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(quote_json("USDC", "SOL", "300000", "1500")),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/swap/v1/quote"))
            .and(query_param("inputMint", "SOL"))
            .and(query_param("amount", "1500"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(quote_json("SOL", "TOKEN", "1500", "42000")),
            )
            .expect(1)
            .mount(&server)
            .await;

        let chained = client(&server)
            .await
            .multi_hop_quote("USDC", "SOL", "TOKEN", 300_000, 100)
            .await
            .unwrap();
        assert_eq!(chained.first.out_amount, "1500");
        assert_eq!(chained.second.in_amount, "1500");
        assert_eq!(chained.total_out_base_units().unwrap(), 42_000);
    }

    #[tokio::test]
    async fn swap_build_posts_the_quote_and_flags_the_placeholder() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/swap/v1"))
            .and(body_partial_json(serde_json::json!({
                "userPublicKey": PLACEHOLDER_PAYER,
                "wrapUnwrapSol": true,
                "dynamicComputeUnitLimit": true
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "swapTransaction": "c3dhcC1ieXRlcw==",
                "lastValidBlockHeight": 5555
            })))
            .expect(1)
            .mount(&server)
            .await;

        let quote: Quote =
            serde_json::from_value(quote_json("SOL", "TOKEN", "1500", "42000")).unwrap();
        let route = client(&server)
            .await
            .build_swap_transaction(&quote, PLACEHOLDER_PAYER, SwapBuildOptions::default())
            .await
            .unwrap();
        assert_eq!(route.swap_transaction, "c3dhcC1ieXRlcw==");
        assert_eq!(route.last_valid_block_height, 5555);
        assert!(route.placeholder_payer);
    }
}

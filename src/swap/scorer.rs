use std::cmp::Ordering;

use tracing::{debug, instrument};

use super::quote::QuoteGateway;
use super::types::{QuoteRequest, RiskLevel, RouteComparison, RouteFilter, RoutingMode};
use crate::aggregator::QuoteResponse;
use crate::error::{log_error, Result, SwapError};

/// Weights combining output, price impact and hop count into one score.
///
/// The terms are in different units, so the defaults are tuning values
/// rather than a normalization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScorerWeights {
    /// Raw output amount is divided by this before scoring.
    pub output_divisor: f64,
    /// Penalty per percent of price impact.
    pub price_impact_weight: f64,
    /// Speed bonus numerator; a route earns `speed_weight * 10 / hops`.
    pub speed_weight: f64,
    /// Awarded to the highest-output route when cheapest routes are preferred.
    pub cheapest_bonus: f64,
    pub base_execution_seconds: f64,
    pub per_hop_seconds: f64,
}

impl Default for ScorerWeights {
    fn default() -> Self {
        Self {
            output_divisor: 1e6,
            price_impact_weight: 100.0,
            speed_weight: 10.0,
            cheapest_bonus: 1000.0,
            base_execution_seconds: 2.0,
            per_hop_seconds: 0.5,
        }
    }
}

/// Ranks candidate routes for a pair and classifies their risk.
#[derive(Clone)]
pub struct RouteScorer {
    gateway: QuoteGateway,
    weights: ScorerWeights,
    comparison_slippage_bps: u16,
}

impl RouteScorer {
    pub fn new(
        gateway: QuoteGateway,
        weights: ScorerWeights,
        comparison_slippage_bps: u16,
    ) -> Self {
        Self {
            gateway,
            weights,
            comparison_slippage_bps,
        }
    }

    pub fn weights(&self) -> &ScorerWeights {
        &self.weights
    }

    /// Fetches candidate routes and returns those passing `filter`, best first.
    ///
    /// The aggregator returns its single best route per query, so candidates
    /// are the unrestricted route plus the best direct route when one exists.
    #[instrument(skip(self, filter), fields(input = %input_asset, output = %output_asset, amount))]
    pub async fn compare_routes(
        &self,
        input_asset: &str,
        output_asset: &str,
        amount: u64,
        filter: Option<&RouteFilter>,
    ) -> Result<Vec<RouteComparison>> {
        let filter = filter.cloned().unwrap_or_default();
        let slippage_bps = filter
            .max_slippage_bps
            .unwrap_or(self.comparison_slippage_bps);

        let any_route =
            QuoteRequest::new(input_asset, output_asset, amount).with_slippage(slippage_bps);
        let direct_route = any_route.clone().with_routing_mode(RoutingMode::DirectOnly);

        let (primary, direct) = futures::join!(
            self.gateway.request_quote(&any_route),
            self.gateway.request_quote(&direct_route)
        );

        let primary = primary.map_err(|e| match e {
            SwapError::InvalidRequest(_) => e,
            other => {
                log_error(&other, "Route options request failed");
                SwapError::route_options_failed(&other)
            }
        })?;

        let mut candidates = vec![primary];
        match direct {
            Ok(route) => {
                if !candidates.iter().any(|existing| same_route(existing, &route)) {
                    candidates.push(route);
                }
            }
            Err(e) => debug!(error = %e, "No direct route available"),
        }

        Ok(self.rank(candidates, &filter))
    }

    /// Filters, scores and orders candidates. Pure; no network access.
    pub fn rank(
        &self,
        candidates: Vec<QuoteResponse>,
        filter: &RouteFilter,
    ) -> Vec<RouteComparison> {
        let admitted: Vec<QuoteResponse> = candidates
            .into_iter()
            .filter(|route| filter.admits(&route.dex_path()))
            .collect();

        let best_output = admitted
            .iter()
            .filter_map(|route| route.out_amount_u64().ok())
            .max();

        let mut comparisons: Vec<RouteComparison> = admitted
            .into_iter()
            .map(|route| {
                let is_cheapest =
                    best_output.is_some() && route.out_amount_u64().ok() == best_output;
                let hops = route.hop_count();
                let price_impact = route.price_impact_percent();
                RouteComparison {
                    score: self.score(&route, filter, is_cheapest),
                    estimated_execution_seconds: self.weights.base_execution_seconds
                        + hops as f64 * self.weights.per_hop_seconds,
                    risk_level: RiskLevel::classify(price_impact, hops),
                    dex_path: route.dex_path(),
                    route,
                }
            })
            .collect();

        comparisons.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.route.hop_count().cmp(&b.route.hop_count()))
                .then_with(|| {
                    a.route
                        .price_impact_percent()
                        .partial_cmp(&b.route.price_impact_percent())
                        .unwrap_or(Ordering::Equal)
                })
        });

        comparisons
    }

    pub fn score(&self, route: &QuoteResponse, filter: &RouteFilter, is_cheapest: bool) -> f64 {
        let output = route.out_amount_u64().unwrap_or(0) as f64;
        let mut score = output / self.weights.output_divisor;
        score -= route.price_impact_percent() * self.weights.price_impact_weight;

        if filter.prefer_speed {
            let hops = route.hop_count().max(1) as f64;
            score += self.weights.speed_weight * 10.0 / hops;
        }
        if filter.prefer_cheapest && is_cheapest {
            score += self.weights.cheapest_bonus;
        }
        score
    }
}

fn same_route(a: &QuoteResponse, b: &QuoteResponse) -> bool {
    a.out_amount == b.out_amount && a.route_plan == b.route_plan
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::aggregator::types::fixtures::{quote_with_hops, SOL_MINT, USDC_MINT};
    use crate::swap::testing::StubAggregator;
    use pretty_assertions::assert_eq;

    fn scorer(stub: Arc<StubAggregator>) -> RouteScorer {
        RouteScorer::new(QuoteGateway::new(stub, 50), ScorerWeights::default(), 100)
    }

    fn offline_scorer() -> RouteScorer {
        scorer(Arc::new(StubAggregator::default()))
    }

    #[test]
    fn test_rank_sorts_descending_by_score() {
        let candidates = vec![
            quote_with_hops(500_000_000, "0.1", &["Orca"]),
            quote_with_hops(700_000_000, "0.1", &["Raydium", "Orca"]),
            quote_with_hops(600_000_000, "3.0", &["Meteora"]),
        ];
        let ranked = offline_scorer().rank(candidates, &RouteFilter::default());

        assert_eq!(ranked.len(), 3);
        for pair in ranked.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        assert_eq!(ranked[0].dex_path, vec!["Raydium".to_string(), "Orca".to_string()]);
        assert!((ranked[0].score - (700.0 - 10.0)).abs() < 1e-9);
    }

    #[test]
    fn test_rank_breaks_ties_by_hops_then_impact() {
        let candidates = vec![
            quote_with_hops(1_000_000, "0", &["A", "B"]),
            quote_with_hops(1_000_000, "0", &["C"]),
        ];
        let ranked = offline_scorer().rank(candidates, &RouteFilter::default());
        assert_eq!(ranked[0].dex_path, vec!["C".to_string()]);
    }

    #[test]
    fn test_speed_bonus_is_inverse_to_hops() {
        let filter = RouteFilter {
            prefer_speed: true,
            ..RouteFilter::default()
        };
        let scorer = offline_scorer();
        let one_hop = scorer.score(&quote_with_hops(0, "0", &["A"]), &filter, false);
        let two_hops = scorer.score(&quote_with_hops(0, "0", &["A", "B"]), &filter, false);
        assert_eq!(one_hop, 100.0);
        assert_eq!(two_hops, 50.0);
    }

    #[test]
    fn test_cheapest_bonus_goes_to_highest_output() {
        let filter = RouteFilter {
            prefer_cheapest: true,
            ..RouteFilter::default()
        };
        let ranked = offline_scorer().rank(
            vec![
                quote_with_hops(2_000_000, "0", &["A"]),
                quote_with_hops(1_000_000, "0", &["B"]),
            ],
            &filter,
        );
        assert_eq!(ranked[0].score, 1002.0);
        assert_eq!(ranked[1].score, 1.0);
    }

    #[test]
    fn test_estimated_time_and_risk() {
        let ranked = offline_scorer().rank(
            vec![quote_with_hops(1_000_000, "0.75", &["A", "B", "C"])],
            &RouteFilter::default(),
        );
        assert_eq!(ranked[0].estimated_execution_seconds, 3.5);
        assert_eq!(ranked[0].risk_level, RiskLevel::Medium);
    }

    #[tokio::test]
    async fn test_include_filter_without_match_is_empty_and_stable() {
        let quote = quote_with_hops(1_000_000, "0.1", &["Orca"]);
        let stub = Arc::new(StubAggregator::with_quote(quote));
        let scorer = scorer(stub);
        let filter = RouteFilter {
            include_dexes: Some(vec!["X".to_string()]),
            ..RouteFilter::default()
        };

        let first = scorer
            .compare_routes(USDC_MINT, SOL_MINT, 1_000, Some(&filter))
            .await
            .unwrap();
        let second = scorer
            .compare_routes(USDC_MINT, SOL_MINT, 1_000, Some(&filter))
            .await
            .unwrap();
        assert!(first.is_empty());
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_compare_routes_uses_wider_slippage_and_dedupes() {
        let quote = quote_with_hops(1_000_000, "0.1", &["Orca"]);
        let stub = Arc::new(StubAggregator::with_quote(quote));
        let ranked = scorer(stub.clone())
            .compare_routes(USDC_MINT, SOL_MINT, 1_000, None)
            .await
            .unwrap();

        assert_eq!(ranked.len(), 1);
        let queries = stub.quote_queries.lock();
        assert_eq!(queries.len(), 2);
        assert!(queries.iter().all(|q| q.slippage_bps == 100));
    }

    #[tokio::test]
    async fn test_compare_routes_keeps_distinct_direct_route() {
        let stub = Arc::new(StubAggregator::default());
        stub.set_quote(false, Ok(quote_with_hops(2_000_000, "0.2", &["Raydium", "Orca"])));
        stub.set_quote(true, Ok(quote_with_hops(1_900_000, "0.1", &["Orca"])));

        let ranked = scorer(stub)
            .compare_routes(USDC_MINT, SOL_MINT, 1_000, None)
            .await
            .unwrap();
        assert_eq!(ranked.len(), 2);
    }

    #[tokio::test]
    async fn test_primary_failure_is_route_options_failed() {
        let stub = Arc::new(StubAggregator::default());
        stub.set_quote(false, Err(SwapError::api("jupiter", "bad gateway", Some(502))));
        stub.set_quote(true, Ok(quote_with_hops(1_000_000, "0", &["Orca"])));

        let err = scorer(stub)
            .compare_routes(USDC_MINT, SOL_MINT, 1_000, None)
            .await
            .unwrap_err();
        assert!(matches!(err, SwapError::RouteOptionsFailed { status: Some(502), .. }));
    }
}

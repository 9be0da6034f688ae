use std::collections::{BTreeMap, HashMap};

use agora_core::{MarketId, Price, Time};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

use crate::cholesky::cholesky;
use crate::{FundamentalsError, FundamentalsResult};

/// Default number of steps produced per generation round
pub const DEFAULT_CHUNK_SIZE: Time = 100;

/// Process parameters and realised path of one market
#[derive(Debug, Clone)]
struct Series {
    drift: f64,
    volatility: f64,
    initial: Price,
    start_at: Time,
    prices: Vec<Price>,
}

/// Correlated geometric Brownian motion generator
///
/// Paths are produced lazily in chunks: asking for a time beyond the
/// generated horizon extends every active market at once, so correlated
/// markets always share the same draws. The output is deterministic given
/// the seed, the registered markets, their parameters and the order in
/// which prices are requested.
#[derive(Debug, Clone)]
pub struct Fundamentals {
    rng: StdRng,
    market_ids: Vec<MarketId>,
    series: HashMap<MarketId, Series>,
    /// Keyed by (smaller id, larger id)
    correlations: BTreeMap<(MarketId, MarketId), f64>,
    generated_until: Time,
    chunk_size: Time,
}

impl Fundamentals {
    pub fn new(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    pub fn with_rng(rng: StdRng) -> Self {
        Self {
            rng,
            market_ids: Vec::new(),
            series: HashMap::new(),
            correlations: BTreeMap::new(),
            generated_until: 0,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: Time) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Furthest step for which every active market has a price
    pub fn generated_until(&self) -> Time {
        self.generated_until
    }

    pub fn market_ids(&self) -> &[MarketId] {
        &self.market_ids
    }

    pub fn contains(&self, market_id: MarketId) -> bool {
        self.series.contains_key(&market_id)
    }

    pub fn drift(&self, market_id: MarketId) -> FundamentalsResult<f64> {
        Ok(self.get_series(market_id)?.drift)
    }

    pub fn volatility(&self, market_id: MarketId) -> FundamentalsResult<f64> {
        Ok(self.get_series(market_id)?.volatility)
    }

    pub fn initial(&self, market_id: MarketId) -> FundamentalsResult<Price> {
        Ok(self.get_series(market_id)?.initial)
    }

    pub fn correlation(&self, market_id1: MarketId, market_id2: MarketId) -> Option<f64> {
        self.correlations
            .get(&pair_key(market_id1, market_id2))
            .copied()
    }

    /// Register a market whose price is `initial` on every step up to `start_at`
    pub fn add_market(
        &mut self,
        market_id: MarketId,
        initial: Price,
        drift: f64,
        volatility: f64,
        start_at: Time,
    ) -> FundamentalsResult<()> {
        if self.series.contains_key(&market_id) {
            return Err(FundamentalsError::DuplicateMarket(market_id));
        }
        if volatility < 0.0 {
            return Err(FundamentalsError::NegativeVolatility(volatility));
        }
        if initial <= 0.0 {
            return Err(FundamentalsError::NonPositiveInitial(initial));
        }
        let start_at = start_at.max(0);

        self.market_ids.push(market_id);
        self.series.insert(
            market_id,
            Series {
                drift,
                volatility,
                initial,
                start_at,
                prices: vec![initial; start_at as usize + 1],
            },
        );
        self.generated_until = self.generated_until.min(start_at);
        log::debug!(
            "fundamentals: market {market_id} initial={initial} drift={drift} volatility={volatility} start_at={start_at}"
        );
        Ok(())
    }

    pub fn remove_market(&mut self, market_id: MarketId) -> FundamentalsResult<()> {
        self.series
            .remove(&market_id)
            .ok_or(FundamentalsError::UnknownMarket(market_id))?;
        self.market_ids.retain(|id| *id != market_id);
        self.correlations
            .retain(|(a, b), _| *a != market_id && *b != market_id);
        Ok(())
    }

    /// Change volatility from `time` onwards. Later steps are regenerated.
    pub fn change_volatility(
        &mut self,
        market_id: MarketId,
        volatility: f64,
        time: Time,
    ) -> FundamentalsResult<()> {
        if volatility < 0.0 {
            return Err(FundamentalsError::NegativeVolatility(volatility));
        }
        self.get_series_mut(market_id)?.volatility = volatility;
        self.rewind_to(time);
        Ok(())
    }

    /// Change drift from `time` onwards. Later steps are regenerated.
    pub fn change_drift(&mut self, market_id: MarketId, drift: f64, time: Time) -> FundamentalsResult<()> {
        self.get_series_mut(market_id)?.drift = drift;
        self.rewind_to(time);
        Ok(())
    }

    pub fn set_correlation(
        &mut self,
        market_id1: MarketId,
        market_id2: MarketId,
        corr: f64,
        time: Time,
    ) -> FundamentalsResult<()> {
        if !(-1.0..=1.0).contains(&corr) {
            return Err(FundamentalsError::CorrelationOutOfRange(corr));
        }
        if market_id1 == market_id2 {
            return Err(FundamentalsError::SelfCorrelation(market_id1));
        }
        self.get_series(market_id1)?;
        self.get_series(market_id2)?;
        self.correlations
            .insert(pair_key(market_id1, market_id2), corr);
        self.rewind_to(time);
        Ok(())
    }

    pub fn remove_correlation(
        &mut self,
        market_id1: MarketId,
        market_id2: MarketId,
        time: Time,
    ) -> FundamentalsResult<()> {
        if market_id1 == market_id2 {
            return Err(FundamentalsError::SelfCorrelation(market_id1));
        }
        self.correlations
            .remove(&pair_key(market_id1, market_id2))
            .ok_or(FundamentalsError::UnknownCorrelation(market_id1, market_id2))?;
        self.rewind_to(time);
        Ok(())
    }

    pub fn get_fundamental_price(&mut self, market_id: MarketId, time: Time) -> FundamentalsResult<Price> {
        self.get_series(market_id)?;
        while time >= self.generated_until {
            self.generate_next()?;
        }
        self.price_at(market_id, time)
    }

    pub fn get_fundamental_prices(
        &mut self,
        market_id: MarketId,
        times: &[Time],
    ) -> FundamentalsResult<Vec<Price>> {
        self.get_series(market_id)?;
        if let Some(&latest) = times.iter().max() {
            while latest >= self.generated_until {
                self.generate_next()?;
            }
        }
        times
            .iter()
            .map(|&time| self.price_at(market_id, time))
            .collect()
    }

    /// Overwrite an already generated price and regenerate everything after it
    /// from the new anchor.
    pub fn set_fundamental_price(
        &mut self,
        market_id: MarketId,
        time: Time,
        price: Price,
    ) -> FundamentalsResult<()> {
        let series = self.get_series_mut(market_id)?;
        let slot = usize::try_from(time)
            .ok()
            .and_then(|index| series.prices.get_mut(index))
            .ok_or(FundamentalsError::MissingPrice { market_id, time })?;
        *slot = price;
        self.rewind_to(time);
        Ok(())
    }

    fn rewind_to(&mut self, time: Time) {
        self.generated_until = self.generated_until.min(time.max(0));
    }

    fn price_at(&self, market_id: MarketId, time: Time) -> FundamentalsResult<Price> {
        let series = self.get_series(market_id)?;
        usize::try_from(time)
            .ok()
            .and_then(|index| series.prices.get(index))
            .copied()
            .ok_or(FundamentalsError::MissingPrice { market_id, time })
    }

    fn get_series(&self, market_id: MarketId) -> FundamentalsResult<&Series> {
        self.series
            .get(&market_id)
            .ok_or(FundamentalsError::UnknownMarket(market_id))
    }

    fn get_series_mut(&mut self, market_id: MarketId) -> FundamentalsResult<&mut Series> {
        self.series
            .get_mut(&market_id)
            .ok_or(FundamentalsError::UnknownMarket(market_id))
    }

    /// Extend every active market by one chunk.
    ///
    /// A chunk is at most `chunk_size` long and never crosses a pending
    /// `start_at`, so markets joining later enter the covariance matrix
    /// exactly at their start step.
    fn generate_next(&mut self) -> FundamentalsResult<()> {
        let from = self.generated_until;
        let next_start = self
            .series
            .values()
            .map(|s| s.start_at)
            .filter(|start_at| *start_at > from)
            .min();
        let length = match next_start {
            Some(start_at) => (start_at - from).min(self.chunk_size),
            None => self.chunk_size,
        };
        let next_until = from + length;

        let targets: Vec<MarketId> = self
            .market_ids
            .iter()
            .copied()
            .filter(|id| self.series.get(id).is_some_and(|s| s.start_at < next_until))
            .collect();
        let log_returns = self.generate_log_returns(&targets, length as usize)?;

        for (market_id, returns) in targets.iter().zip(log_returns) {
            let series = self.get_series_mut(*market_id)?;
            let anchor_index = from as usize;
            let mut price = series
                .prices
                .get(anchor_index)
                .copied()
                .ok_or(FundamentalsError::MissingPrice {
                    market_id: *market_id,
                    time: from,
                })?;
            series.prices.truncate(anchor_index + 1);
            series.prices.reserve(returns.len());
            for r in returns {
                price *= r.exp();
                series.prices.push(price);
            }
        }

        self.generated_until = next_until;
        Ok(())
    }

    /// Log returns per target market, in `targets` order.
    ///
    /// Markets with positive volatility draw `L·W + μ` where `L` is the
    /// Cholesky factor of `diag(σ)·ρ·diag(σ)`; the others follow their drift.
    fn generate_log_returns(
        &mut self,
        targets: &[MarketId],
        length: usize,
    ) -> FundamentalsResult<Vec<Vec<f64>>> {
        let stochastic: Vec<MarketId> = targets
            .iter()
            .copied()
            .filter(|id| self.series.get(id).is_some_and(|s| s.volatility != 0.0))
            .collect();
        let n = stochastic.len();
        let index_of: HashMap<MarketId, usize> =
            stochastic.iter().enumerate().map(|(i, id)| (*id, i)).collect();

        let mut corr = vec![vec![0.0; n]; n];
        for (i, row) in corr.iter_mut().enumerate() {
            row[i] = 1.0;
        }
        for (&(id1, id2), &rho) in &self.correlations {
            if let (Some(&i), Some(&j)) = (index_of.get(&id1), index_of.get(&id2)) {
                corr[i][j] = rho;
                corr[j][i] = rho;
            }
        }

        let vols: Vec<f64> = stochastic
            .iter()
            .map(|id| self.volatility(*id))
            .collect::<FundamentalsResult<_>>()?;
        let cov: Vec<Vec<f64>> = (0..n)
            .map(|i| (0..n).map(|j| vols[i] * corr[i][j] * vols[j]).collect())
            .collect();
        let l = cholesky(&cov)?;

        let mut w = vec![vec![0.0; length]; n];
        for row in w.iter_mut() {
            for value in row.iter_mut() {
                *value = self.rng.sample(StandardNormal);
            }
        }

        targets
            .iter()
            .map(|id| -> FundamentalsResult<Vec<f64>> {
                let drift = self.drift(*id)?;
                Ok(match index_of.get(id) {
                    Some(&i) => (0..length)
                        .map(|k| (0..=i).map(|j| l[i][j] * w[j][k]).sum::<f64>() + drift)
                        .collect(),
                    None => vec![drift; length],
                })
            })
            .collect()
    }
}

fn pair_key(a: MarketId, b: MarketId) -> (MarketId, MarketId) {
    if a <= b { (a, b) } else { (b, a) }
}

//! Fundamental / chart / noise agent
//!
//! Blends three expected log returns into one forecast and quotes a single
//! limit order around the forecast price.

use agora_config::Settings;
use agora_core::{Action, MarketId, Order, Side, Time};
use agora_market::{Exchange, Market};
use rand::Rng;
use rand_distr::StandardNormal;

use crate::agent::{Agent, AgentBase};
use crate::error::invalid;
use crate::{AgentError, AgentResult};

/// How the order price is derived from the expected future price
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarginType {
    /// Quote at `efp * (1 -/+ margin)`
    Fixed,
    /// Quote at `efp + N(0, 1) * margin`
    Normal,
}

#[derive(Debug, Clone)]
pub struct FcnAgent {
    base: AgentBase,
    fundamental_weight: f64,
    chart_weight: f64,
    noise_weight: f64,
    noise_scale: f64,
    time_window_size: Time,
    order_margin: f64,
    margin_type: MarginType,
    mean_reversion_time: Time,
}

impl FcnAgent {
    pub fn new(base: AgentBase) -> Self {
        Self {
            base,
            fundamental_weight: 0.0,
            chart_weight: 0.0,
            noise_weight: 0.0,
            noise_scale: 0.0,
            time_window_size: 0,
            order_margin: 0.0,
            margin_type: MarginType::Fixed,
            mean_reversion_time: 0,
        }
    }

    pub fn margin_type(&self) -> MarginType {
        self.margin_type
    }

    pub fn time_window_size(&self) -> Time {
        self.time_window_size
    }

    pub fn mean_reversion_time(&self) -> Time {
        self.mean_reversion_time
    }

    /// Read the FCN parameters only; the portfolio is left alone
    fn setup_parameters(&mut self, settings: &Settings) -> AgentResult<()> {
        let rng = self.base.rng_mut();
        self.fundamental_weight = settings.random_f64("fundamentalWeight", rng)?;
        self.chart_weight = settings.random_f64("chartWeight", rng)?;
        self.noise_weight = settings.random_f64("noiseWeight", rng)?;
        self.noise_scale = settings.random_f64("noiseScale", rng)?;
        self.time_window_size = settings.random_f64("timeWindowSize", rng)? as Time;
        self.order_margin = settings.random_f64("orderMargin", rng)?;
        self.margin_type = match settings.optional_str("marginType")? {
            None | Some("fixed") => MarginType::Fixed,
            Some(_) => MarginType::Normal,
        };
        self.mean_reversion_time = settings
            .optional_random_f64("meanReversionTime", rng)?
            .map_or(self.time_window_size, |value| value as Time);

        for (name, weight) in [
            ("fundamentalWeight", self.fundamental_weight),
            ("chartWeight", self.chart_weight),
            ("noiseWeight", self.noise_weight),
        ] {
            if weight < 0.0 {
                return Err(invalid(name, format!("must be non-negative, got {weight}")));
            }
        }
        if self.fundamental_weight + self.chart_weight + self.noise_weight <= 0.0 {
            return Err(invalid("fundamentalWeight", "weights must not all be zero"));
        }
        if self.time_window_size < 1 {
            return Err(invalid(
                "timeWindowSize",
                format!("must be at least 1, got {}", self.time_window_size),
            ));
        }
        match self.margin_type {
            MarginType::Fixed if !(0.0..=1.0).contains(&self.order_margin) => {
                Err(invalid("orderMargin", "fixed margin must lie in [0, 1]"))
            }
            MarginType::Normal if self.order_margin < 0.0 => {
                Err(invalid("orderMargin", "must be non-negative"))
            }
            _ => Ok(()),
        }
    }

    /// Orders for one market, empty when the market is not accessible
    pub fn submit_orders_by_market(&mut self, market: &Market) -> AgentResult<Vec<Action>> {
        if !self.base.is_market_accessible(market.market_id()) {
            return Ok(Vec::new());
        }
        let time = market.get_time();
        let window = time.min(self.time_window_size);
        let market_price = market.market_price()?;

        let fundamental_scale = 1.0 / self.mean_reversion_time.max(1) as f64;
        let fundamental_log_return =
            fundamental_scale * (market.fundamental_price()? / market_price).ln();
        self.check_finite(fundamental_log_return, "fundamental log return")?;

        let chart_scale = 1.0 / window.max(1) as f64;
        let chart_log_return =
            chart_scale * (market_price / market.get_market_price(time - window)?).ln();
        self.check_finite(chart_log_return, "chart log return")?;

        let noise: f64 = self.base.rng_mut().sample(StandardNormal);
        let noise_log_return = self.noise_scale * noise;

        let total_weight = self.fundamental_weight + self.chart_weight + self.noise_weight;
        let expected_log_return = (self.fundamental_weight * fundamental_log_return
            + self.chart_weight * chart_log_return
            + self.noise_weight * noise_log_return)
            / total_weight;
        let expected_future_price =
            market_price * (expected_log_return * self.time_window_size as f64).exp();
        self.check_finite(expected_future_price, "expected future price")?;

        let side = if expected_future_price > market_price {
            Side::Buy
        } else if expected_future_price < market_price {
            Side::Sell
        } else {
            return Ok(Vec::new());
        };
        let order_price = match (self.margin_type, side) {
            (MarginType::Fixed, Side::Buy) => expected_future_price * (1.0 - self.order_margin),
            (MarginType::Fixed, Side::Sell) => expected_future_price * (1.0 + self.order_margin),
            (MarginType::Normal, _) => {
                let shift: f64 = self.base.rng_mut().sample(StandardNormal);
                expected_future_price + shift * self.order_margin
            }
        };

        let order = Order::limit(
            self.base.agent_id(),
            market.market_id(),
            side,
            order_price,
            1,
        )
        .with_ttl(self.time_window_size);
        Ok(vec![order.into()])
    }

    fn check_finite(&self, value: f64, quantity: &'static str) -> AgentResult<()> {
        if value.is_finite() {
            Ok(())
        } else {
            Err(AgentError::NonFinite {
                agent_id: self.base.agent_id(),
                quantity,
            })
        }
    }
}

impl Agent for FcnAgent {
    fn base(&self) -> &AgentBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut AgentBase {
        &mut self.base
    }

    fn class_name(&self) -> &str {
        "FCNAgent"
    }

    fn setup(
        &mut self,
        settings: &Settings,
        accessible_markets: &[MarketId],
        _exchange: &Exchange,
    ) -> AgentResult<()> {
        self.base.setup(settings, accessible_markets)?;
        self.setup_parameters(settings)
    }

    fn submit_orders(&mut self, exchange: &Exchange) -> AgentResult<Vec<Action>> {
        let mut actions = Vec::new();
        for market in exchange.markets() {
            actions.extend(self.submit_orders_by_market(market)?);
        }
        Ok(actions)
    }
}

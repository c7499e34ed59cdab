//! Portfolio holdings and the position-level arithmetic built on them.
//!
//! A [`Holding`] is immutable for the duration of a run. Values the source
//! file carries explicitly (investment, current value, P&L) take precedence
//! over the ones derived from price and quantity.

use serde::{Deserialize, Serialize};

/// Market-capitalisation bucket. Large > ₹20,000 Cr, Mid ₹5,000-20,000 Cr,
/// Small < ₹5,000 Cr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum MarketCap {
    Large,
    Mid,
    Small,
    #[default]
    Unknown,
}

impl MarketCap {
    pub const ALL: [MarketCap; 3] = [MarketCap::Large, MarketCap::Mid, MarketCap::Small];

    pub fn label(self) -> &'static str {
        match self {
            MarketCap::Large => "Large Cap",
            MarketCap::Mid => "Mid Cap",
            MarketCap::Small => "Small Cap",
            MarketCap::Unknown => "Unknown",
        }
    }

    /// Lenient parse: "Large Cap", "large", "LARGE_CAP", "Midcap" all work.
    pub fn parse(raw: &str) -> Self {
        let norm: String = raw
            .chars()
            .filter(|c| c.is_ascii_alphabetic())
            .collect::<String>()
            .to_lowercase();
        match norm.trim_end_matches("cap") {
            "large" => MarketCap::Large,
            "mid" => MarketCap::Mid,
            "small" => MarketCap::Small,
            _ => MarketCap::Unknown,
        }
    }

    /// Bucket from a market cap in ₹ crore.
    pub fn from_crore(cap: f64) -> Self {
        if cap > 20_000.0 {
            MarketCap::Large
        } else if cap >= 5_000.0 {
            MarketCap::Mid
        } else {
            MarketCap::Small
        }
    }
}

// Accept the bucket as free text in CSV and JSON.
impl<'de> Deserialize<'de> for MarketCap {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::de::Deserializer<'de>,
    {
        let v = serde_json::Value::deserialize(deserializer).map_err(serde::de::Error::custom)?;
        Ok(match v {
            serde_json::Value::String(s) => MarketCap::parse(&s),
            serde_json::Value::Number(n) => n.as_f64().map(MarketCap::from_crore).unwrap_or_default(),
            _ => MarketCap::Unknown,
        })
    }
}

/// Capital-gain classification. Only used for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GainType {
    Ltcg,
    Stcg,
}

impl GainType {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_uppercase().as_str() {
            "LTCG" => Some(GainType::Ltcg),
            "STCG" => Some(GainType::Stcg),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub symbol: String,
    pub quantity: f64,
    pub avg_cost: f64,
    pub current_price: f64,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub market_cap: MarketCap,
    #[serde(default)]
    pub gain_type: Option<GainType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub investment: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reported_pnl: Option<f64>,
}

impl Holding {
    pub fn new(symbol: &str, quantity: f64, avg_cost: f64, current_price: f64) -> Self {
        Self {
            symbol: symbol.trim().to_uppercase(),
            quantity,
            avg_cost,
            current_price,
            sector: None,
            market_cap: MarketCap::Unknown,
            gain_type: None,
            investment: None,
            market_value: None,
            reported_pnl: None,
        }
    }

    pub fn with_sector(mut self, sector: &str) -> Self {
        self.sector = Some(sector.to_string());
        self
    }

    pub fn with_market_cap(mut self, cap: MarketCap) -> Self {
        self.market_cap = cap;
        self
    }

    pub fn with_gain_type(mut self, gain: GainType) -> Self {
        self.gain_type = Some(gain);
        self
    }

    pub fn investment_value(&self) -> f64 {
        self.investment.unwrap_or(self.avg_cost * self.quantity)
    }

    pub fn current_value(&self) -> f64 {
        self.market_value.unwrap_or(self.current_price * self.quantity)
    }

    /// Unrealized profit (positive) or loss (negative).
    pub fn pnl(&self) -> f64 {
        self.reported_pnl
            .unwrap_or_else(|| self.current_value() - self.investment_value())
    }

    pub fn pnl_pct(&self) -> f64 {
        let invested = self.investment_value();
        if invested == 0.0 {
            return 0.0;
        }
        self.pnl() / invested * 100.0
    }

    /// Loss as a positive amount; negative when the position is in profit.
    pub fn loss_amount(&self) -> f64 {
        -self.pnl()
    }

    /// Gain needed from the current price to get back to cost, in percent.
    /// `None` for a total loss.
    pub fn recovery_needed_pct(&self) -> Option<f64> {
        let pl = self.pnl_pct();
        if pl >= 0.0 {
            return Some(0.0);
        }
        if pl <= -100.0 {
            return None;
        }
        Some(pl.abs() / (100.0 + pl) * 100.0)
    }
}

/// Severity bucket for an unrealized loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum LossBucket {
    /// loss of 50% or more
    Severe,
    /// 35-50%
    High,
    /// 20-35%
    Moderate,
    /// under 20%, or a gain
    Minor,
}

impl LossBucket {
    pub const ALL: [LossBucket; 4] = [
        LossBucket::Severe,
        LossBucket::High,
        LossBucket::Moderate,
        LossBucket::Minor,
    ];

    pub fn from_pnl_pct(pct: f64) -> Self {
        if pct <= -50.0 {
            LossBucket::Severe
        } else if pct <= -35.0 {
            LossBucket::High
        } else if pct <= -20.0 {
            LossBucket::Moderate
        } else {
            LossBucket::Minor
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            LossBucket::Severe => "Severe Losses (>50%)",
            LossBucket::High => "High Losses (35-50%)",
            LossBucket::Moderate => "Moderate Losses (20-35%)",
            LossBucket::Minor => "Minor Losses (<20%)",
        }
    }
}

/// Outcome of selling the worst positions and keeping the rest.
#[derive(Debug, Clone, Serialize)]
pub struct ExitScenario {
    pub exited: Vec<String>,
    pub remaining_value: f64,
    pub remaining_investment: f64,
    pub loss_booked: f64,
    pub remaining_loss_pct: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Portfolio {
    pub holdings: Vec<Holding>,
}

impl Portfolio {
    pub fn new(holdings: Vec<Holding>) -> Self {
        Self { holdings }
    }

    pub fn len(&self) -> usize {
        self.holdings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.holdings.is_empty()
    }

    pub fn total_invested(&self) -> f64 {
        self.holdings.iter().map(Holding::investment_value).sum()
    }

    pub fn total_current_value(&self) -> f64 {
        self.holdings.iter().map(Holding::current_value).sum()
    }

    pub fn total_pnl(&self) -> f64 {
        self.holdings.iter().map(Holding::pnl).sum()
    }

    pub fn total_pnl_pct(&self) -> f64 {
        let invested = self.total_invested();
        if invested == 0.0 {
            return 0.0;
        }
        self.total_pnl() / invested * 100.0
    }

    /// Share of total investment held in `holding`, in percent.
    pub fn position_weight(&self, holding: &Holding) -> f64 {
        let total = self.total_invested();
        if total == 0.0 {
            return 0.0;
        }
        holding.investment_value() / total * 100.0
    }

    pub fn weight_of(&self, symbol: &str) -> f64 {
        self.holdings
            .iter()
            .find(|h| h.symbol == symbol)
            .map(|h| self.position_weight(h))
            .unwrap_or(0.0)
    }

    pub fn in_bucket(&self, bucket: LossBucket) -> Vec<&Holding> {
        self.holdings
            .iter()
            .filter(|h| LossBucket::from_pnl_pct(h.pnl_pct()) == bucket)
            .collect()
    }

    /// `n` positions with the lowest P&L percent, worst first.
    pub fn worst_performers(&self, n: usize) -> Vec<&Holding> {
        let mut sorted: Vec<&Holding> = self.holdings.iter().collect();
        sorted.sort_by(|a, b| a.pnl_pct().total_cmp(&b.pnl_pct()));
        sorted.truncate(n);
        sorted
    }

    /// Positions above `threshold` percent of invested capital.
    pub fn concentrated(&self, threshold: f64) -> Vec<(&Holding, f64)> {
        self.holdings
            .iter()
            .map(|h| (h, self.position_weight(h)))
            .filter(|(_, w)| *w > threshold)
            .collect()
    }

    pub fn count_gain_type(&self, gain: GainType) -> usize {
        self.holdings
            .iter()
            .filter(|h| h.gain_type == Some(gain))
            .count()
    }

    pub fn exit_worst(&self, n: usize) -> ExitScenario {
        let worst = self.worst_performers(n);
        let exited_value: f64 = worst.iter().map(|h| h.current_value()).sum();
        let exited_investment: f64 = worst.iter().map(|h| h.investment_value()).sum();
        let loss_booked: f64 = worst.iter().map(|h| h.loss_amount()).sum();

        let remaining_value = self.total_current_value() - exited_value;
        let remaining_investment = self.total_invested() - exited_investment;
        let remaining_loss_pct = if remaining_investment > 0.0 {
            (remaining_investment - remaining_value) / remaining_investment * 100.0
        } else {
            0.0
        };

        ExitScenario {
            exited: worst.iter().map(|h| h.symbol.clone()).collect(),
            remaining_value,
            remaining_investment,
            loss_booked,
            remaining_loss_pct,
        }
    }
}

/// The thirteen-stock portfolio the console reports run against by default.
pub fn demo_portfolio() -> Portfolio {
    use GainType::{Ltcg, Stcg};
    use MarketCap::{Large, Mid, Small};

    let rows: [(&str, &str, MarketCap, f64, f64, f64, GainType); 13] = [
        ("CDSL", "Financial Services", Large, 289.0, 1723.0, 1419.9, Stcg),
        ("CHENNPETRO", "Oil & Gas", Mid, 312.0, 1209.98, 825.55, Ltcg),
        ("COCHINSHIP", "Capital Goods", Small, 46.0, 2230.0, 1548.9, Stcg),
        ("ENGINERSIN", "Capital Goods", Small, 90.0, 276.1, 193.88, Ltcg),
        ("FACT", "Chemicals", Large, 858.0, 1150.3, 868.3, Ltcg),
        ("GSFC", "Chemicals", Small, 384.0, 275.0, 173.45, Ltcg),
        ("KALYANKJIL", "Consumer Discretionary", Small, 126.0, 784.8, 495.45, Ltcg),
        ("MOIL", "Metals & Mining", Mid, 1000.0, 530.5, 340.4, Ltcg),
        ("NETWEB", "Technology", Small, 117.0, 3481.8, 3273.0, Stcg),
        ("NOVAAGRI", "Agriculture", Small, 1111.0, 91.64, 36.62, Ltcg),
        ("PROTEAN", "Technology/Services", Small, 11.0, 2180.0, 710.9, Ltcg),
        ("RITES", "Capital Goods", Mid, 264.0, 381.0, 226.65, Ltcg),
        ("SCILAL", "Pharmaceuticals", Small, 3000.0, 103.7, 46.44, Ltcg),
    ];

    Portfolio::new(
        rows.iter()
            .map(|(sym, sector, cap, qty, cost, price, gain)| {
                Holding::new(sym, *qty, *cost, *price)
                    .with_sector(sector)
                    .with_market_cap(*cap)
                    .with_gain_type(*gain)
            })
            .collect(),
    )
}

/// Small three-stock sample served by `/api/demo-data`.
pub fn api_demo_portfolio() -> Portfolio {
    Portfolio::new(vec![
        Holding::new("RELIANCE", 100.0, 2500.0, 2400.0),
        Holding::new("TCS", 50.0, 3200.0, 3500.0),
        Holding::new("INFY", 200.0, 1500.0, 1600.0),
    ])
}

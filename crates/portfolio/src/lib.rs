mod config;
mod market;
mod records;
mod risk;
mod state;

pub use config::{ConfigError, PortfolioConfig, PortfolioConfigInput};
pub use market::{is_tradable_price, PricePoint};
pub use records::{EquityPoint, TradeReason, TradeRecord, TradeSide};
pub use risk::RiskLimits;
pub use state::{Portfolio, PositionState};

pub mod chain;
pub mod price_feed;

pub use chain::{scale_units, ChainError, EthRpcClient, TransferLog};
pub use price_feed::{PriceFeedClient, PriceFeedError, PriceQuote};

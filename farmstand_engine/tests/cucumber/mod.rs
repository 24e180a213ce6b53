mod market_world;

pub use market_world::MarketWorld;

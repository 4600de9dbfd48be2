pub mod digest;
pub mod fetcher;
pub mod similarity;

pub use digest::Aggregator;
pub use fetcher::FeedFetcher;
pub use similarity::similarity;

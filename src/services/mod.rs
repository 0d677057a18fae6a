pub mod aggregator;
pub mod filters;
pub mod llm;
pub mod providers;
pub mod ratings;
pub mod recommendations;
pub mod service_guess;

pub use aggregator::{Aggregator, SourceStats};
pub use recommendations::{Recommendation, Recommender};

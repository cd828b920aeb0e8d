pub mod classifier_traits;
pub mod repository_traits;

pub use classifier_traits::SentimentClassifier;
pub use repository_traits::BlacklistRepository;

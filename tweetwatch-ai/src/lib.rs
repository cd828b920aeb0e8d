pub mod keyword;
pub mod models;
pub mod provider;
pub mod remote;

// Re-export public APIs
pub use keyword::KeywordClassifier;
pub use models::{ClassifierConfig, ClassifyRequest, ClassifyResponse, KeywordLexicon};
pub use provider::Provider;
pub use remote::HttpClassifier;

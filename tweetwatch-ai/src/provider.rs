use std::sync::Arc;

use tracing::info;
use tweetwatch_common::error::Error;
use tweetwatch_common::traits::SentimentClassifier;

use crate::keyword::KeywordClassifier;
use crate::models::ClassifierConfig;
use crate::remote::HttpClassifier;

/// Factory for creating sentiment classifiers
pub struct Provider;

impl Provider {
    /// Builds the classifier named by `config.provider_type`.
    pub fn from_config(config: &ClassifierConfig) -> Result<Arc<dyn SentimentClassifier>, Error> {
        match config.provider_type.to_ascii_lowercase().as_str() {
            "keyword" => {
                info!("Using keyword sentiment classifier");
                Ok(Arc::new(Self::create_keyword(config)))
            }
            "http" => {
                let classifier = Self::create_http(config)?;
                info!("Using remote sentiment classifier at {}", classifier.endpoint());
                Ok(Arc::new(classifier))
            }
            other => Err(Error::Config(format!(
                "unknown classifier '{}', expected keyword or http",
                other
            ))),
        }
    }

    /// Create a keyword classifier from a configuration
    pub fn create_keyword(config: &ClassifierConfig) -> KeywordClassifier {
        KeywordClassifier::with_lexicon(config.lexicon.clone())
    }

    /// Create a remote classifier from a configuration
    pub fn create_http(config: &ClassifierConfig) -> Result<HttpClassifier, Error> {
        let url = config
            .api_base
            .as_deref()
            .ok_or_else(|| Error::Config("http classifier needs a classifier url".into()))?;
        HttpClassifier::new(url, config.timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_known_providers() {
        let cfg = ClassifierConfig::default();
        assert!(Provider::from_config(&cfg).is_ok());

        let cfg = ClassifierConfig {
            provider_type: "HTTP".into(),
            api_base: Some("http://127.0.0.1:8080/api/classify".into()),
            ..ClassifierConfig::default()
        };
        assert!(Provider::from_config(&cfg).is_ok());
    }

    #[test]
    fn http_without_url_is_a_config_error() {
        let cfg = ClassifierConfig { provider_type: "http".into(), ..ClassifierConfig::default() };
        assert!(matches!(Provider::from_config(&cfg), Err(Error::Config(_))));
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let cfg = ClassifierConfig { provider_type: "oracle".into(), ..ClassifierConfig::default() };
        assert!(matches!(Provider::from_config(&cfg), Err(Error::Config(_))));
    }
}

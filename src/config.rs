//! Runtime configuration: defaults, environment overrides, validation.
//!
//! Environment variables:
//! - `HF_TOKEN`: bearer token for the embedding endpoint (optional)
//! - `REA_EMBEDDING_URL` / `REA_EMBEDDING_MODEL`: embedding endpoint and model
//! - `MEDCRED_URL`: MEC RED search endpoint
//! - `EDUPLAY_URL`: eduplay search endpoint; set it empty to disable the source

use std::env;
use std::time::Duration;

use reqwest::Client;
use url::{Host, Url};

use crate::embedding::client::{self as hf, HfEmbedder};
use crate::search::RankOptions;
use crate::sources::{EduplayClient, MedcredClient, Source, SourceId, eduplay, medcred};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("top_k must be greater than 0")]
    ZeroTopK,

    #[error("limit must be greater than 0")]
    ZeroLimit,

    #[error("timeout must be greater than 0")]
    ZeroTimeout,

    #[error("at least one source must be enabled")]
    NoSources,

    #[error("min_similarity must be within [-1, 1], got {0}")]
    SimilarityOutOfRange(f32),

    #[error("invalid embedding URL {url}: {source}")]
    InvalidEmbeddingUrl {
        url: String,
        source: url::ParseError,
    },

    #[error("refusing to send HF_TOKEN over plain HTTP to {0}; use https or a loopback host")]
    InsecureEmbeddingUrl(String),
}

#[derive(Clone)]
pub struct Config {
    pub sources: Vec<SourceId>,
    pub rank: RankOptions,
    /// Records requested from each source.
    pub limit: usize,
    pub timeout: Duration,
    pub medcred_url: String,
    /// `None` keeps eduplay configured but returning nothing.
    pub eduplay_url: Option<String>,
    pub embedding_url: String,
    pub embedding_model: String,
    pub hf_token: Option<String>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("sources", &self.sources)
            .field("rank", &self.rank)
            .field("limit", &self.limit)
            .field("timeout", &self.timeout)
            .field("medcred_url", &self.medcred_url)
            .field("eduplay_url", &self.eduplay_url)
            .field("embedding_url", &self.embedding_url)
            .field("embedding_model", &self.embedding_model)
            .field("hf_token", &self.hf_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sources: vec![SourceId::Medcred, SourceId::Eduplay],
            rank: RankOptions::default(),
            limit: 20,
            timeout: Duration::from_secs(30),
            medcred_url: medcred::API_URL.to_string(),
            eduplay_url: Some(eduplay::API_URL.to_string()),
            embedding_url: hf::API_BASE.to_string(),
            embedding_model: hf::DEFAULT_MODEL.to_string(),
            hf_token: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|var| env::var(var).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let nonempty = |var: &str| {
            get(var)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let defaults = Self::default();
        let eduplay_url = match get("EDUPLAY_URL") {
            Some(v) if v.trim().is_empty() => None,
            Some(v) => Some(v.trim().to_string()),
            None => defaults.eduplay_url.clone(),
        };

        Self {
            medcred_url: nonempty("MEDCRED_URL").unwrap_or(defaults.medcred_url),
            eduplay_url,
            embedding_url: nonempty("REA_EMBEDDING_URL").unwrap_or(defaults.embedding_url),
            embedding_model: nonempty("REA_EMBEDDING_MODEL").unwrap_or(defaults.embedding_model),
            hf_token: nonempty("HF_TOKEN"),
            ..defaults
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rank.top_k == 0 {
            return Err(ConfigError::ZeroTopK);
        }
        if self.limit == 0 {
            return Err(ConfigError::ZeroLimit);
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.sources.is_empty() {
            return Err(ConfigError::NoSources);
        }
        if let Some(floor) = self.rank.min_similarity
            && !(-1.0..=1.0).contains(&floor)
        {
            return Err(ConfigError::SimilarityOutOfRange(floor));
        }
        self.check_embedding_url()
    }

    /// The bearer token only travels over HTTPS, or to this machine.
    fn check_embedding_url(&self) -> Result<(), ConfigError> {
        let url = Url::parse(&self.embedding_url).map_err(|source| {
            ConfigError::InvalidEmbeddingUrl {
                url: self.embedding_url.clone(),
                source,
            }
        })?;
        if self.hf_token.is_none() || url.scheme() == "https" {
            return Ok(());
        }
        let loopback = match url.host() {
            Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
            Some(Host::Ipv4(ip)) => ip.is_loopback(),
            Some(Host::Ipv6(ip)) => ip.is_loopback(),
            None => false,
        };
        if loopback {
            Ok(())
        } else {
            Err(ConfigError::InsecureEmbeddingUrl(self.embedding_url.clone()))
        }
    }

    /// Builds one adapter per enabled source, in configured order, skipping
    /// repeats.
    pub fn build_sources(&self, http: &Client) -> Vec<Source> {
        let mut seen = Vec::new();
        self.sources
            .iter()
            .filter(|id| {
                if seen.contains(*id) {
                    false
                } else {
                    seen.push(**id);
                    true
                }
            })
            .map(|id| match id {
                SourceId::Medcred => {
                    Source::Medcred(MedcredClient::new(http.clone(), &self.medcred_url))
                }
                SourceId::Eduplay => match self.eduplay_url {
                    Some(ref url) => Source::Eduplay(EduplayClient::new(http.clone(), url)),
                    None => Source::Disabled(SourceId::Eduplay),
                },
            })
            .collect()
    }

    pub fn embedder(&self, http: &Client) -> HfEmbedder {
        HfEmbedder::new(
            http.clone(),
            &self.embedding_url,
            &self.embedding_model,
            self.hf_token.clone(),
        )
    }
}

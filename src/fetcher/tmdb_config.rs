//! TMDB endpoint configuration
//!
//! Endpoint paths live in one const struct so the extractor never hand-builds
//! URLs. Per-movie endpoints are formatted from the movie id.
//!
//! # Authentication
//!
//! TMDB accepts either a v3 API key (`api_key` query parameter) or a v4
//! read-access token (`Authorization: Bearer`). [`ApiCredential::detect`] picks
//! the form from the shape of the configured secret.

use crate::ListingKind;

/// Endpoint paths for the TMDB v3 API
#[derive(Debug, Clone)]
pub struct TmdbEndpoints {
    /// Popular movies listing
    pub popular: &'static str,
    /// Top rated movies listing
    pub top_rated: &'static str,
    /// Upcoming movies listing
    pub upcoming: &'static str,
    /// Weekly trending movies listing
    pub trending: &'static str,
    /// Movie genre dictionary
    pub genre_list: &'static str,
    /// Movie detail prefix (`/movie/{id}`)
    pub movie_prefix: &'static str,
}

/// Endpoints used by the pipeline
pub const TMDB_ENDPOINTS: TmdbEndpoints = TmdbEndpoints {
    popular: "/movie/popular",
    top_rated: "/movie/top_rated",
    upcoming: "/movie/upcoming",
    trending: "/trending/movie/week",
    genre_list: "/genre/movie/list",
    movie_prefix: "/movie",
};

/// TMDB rejects `page` values above this
pub const MAX_API_PAGE: u32 = 500;

impl TmdbEndpoints {
    /// Listing endpoint for a kind
    pub fn listing(&self, kind: ListingKind) -> &'static str {
        match kind {
            ListingKind::Popular => self.popular,
            ListingKind::TopRated => self.top_rated,
            ListingKind::Upcoming => self.upcoming,
            ListingKind::Trending => self.trending,
        }
    }

    /// Detail endpoint for one movie
    pub fn movie_detail(&self, id: i64) -> String {
        format!("{}/{id}", self.movie_prefix)
    }

    /// Credits endpoint for one movie
    pub fn movie_credits(&self, id: i64) -> String {
        format!("{}/{id}/credits", self.movie_prefix)
    }
}

/// How the secret is attached to each request
#[derive(Clone, PartialEq, Eq)]
pub enum ApiCredential {
    /// v3 key sent as `api_key` query parameter
    ApiKey(String),
    /// v4 token sent as bearer authorization
    BearerToken(String),
}

impl ApiCredential {
    /// Choose the credential form from the secret's shape
    ///
    /// v4 read-access tokens are JWTs (three dot-separated segments starting
    /// with `eyJ`); v3 keys are 32 hex characters.
    pub fn detect(secret: &str) -> Self {
        let secret = secret.trim();
        if secret.starts_with("eyJ") && secret.matches('.').count() == 2 {
            ApiCredential::BearerToken(secret.to_string())
        } else {
            ApiCredential::ApiKey(secret.to_string())
        }
    }

    /// Query parameters contributed by this credential
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        match self {
            ApiCredential::ApiKey(key) => vec![("api_key".to_string(), key.clone())],
            ApiCredential::BearerToken(_) => Vec::new(),
        }
    }

    /// Headers contributed by this credential
    pub fn headers(&self) -> Vec<(String, String)> {
        match self {
            ApiCredential::ApiKey(_) => Vec::new(),
            ApiCredential::BearerToken(token) => {
                vec![("Authorization".to_string(), format!("Bearer {token}"))]
            }
        }
    }
}

impl std::fmt::Debug for ApiCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiCredential::ApiKey(_) => f.write_str("ApiKey(<redacted>)"),
            ApiCredential::BearerToken(_) => f.write_str("BearerToken(<redacted>)"),
        }
    }
}

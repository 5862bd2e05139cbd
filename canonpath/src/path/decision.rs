use http::{Method, Uri};

use super::normalizer::Normalizer;
use crate::config::RedirectConfig;

/// What a front end should do with a request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Route on `path`, which is already canonical.
    Forward { path: String },

    /// Send the client to the canonical location.
    Redirect { status: u16, location: String },
}

impl Decision {
    pub fn kind_str(&self) -> &'static str {
        match self {
            Decision::Forward { .. } => "forward",
            Decision::Redirect { .. } => "redirect",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectPolicy {
    pub enabled: bool,
    pub get_status: u16,
    pub other_status: u16,
}

impl Default for RedirectPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            get_status: 301,
            other_status: 308,
        }
    }
}

/// Asterisk-form (`OPTIONS *`) and authority-form (`CONNECT host:port`)
/// request targets carry no path to clean.
pub fn is_pathless(uri: &Uri) -> bool {
    matches!(uri.path(), "" | "*")
}

impl RedirectPolicy {
    pub fn from_config(cfg: &RedirectConfig) -> Self {
        let d = Self::default();
        Self {
            enabled: cfg.enabled.unwrap_or(d.enabled),
            get_status: cfg.get_status.unwrap_or(d.get_status),
            other_status: cfg.other_status.unwrap_or(d.other_status),
        }
    }

    /// Other methods get a status that keeps the method and body.
    pub fn status_for(&self, method: &Method) -> u16 {
        if method == Method::GET || method == Method::HEAD {
            self.get_status
        } else {
            self.other_status
        }
    }

    pub fn decide(&self, method: &Method, uri: &Uri) -> Decision {
        if is_pathless(uri) {
            return Decision::Forward {
                path: uri.path().to_string(),
            };
        }

        let norm = Normalizer::normalize_uri(uri);
        if norm.is_canonical() || !self.enabled || method == Method::CONNECT {
            return Decision::Forward {
                path: norm.path.into_owned(),
            };
        }

        Decision::Redirect {
            status: self.status_for(method),
            location: norm.location(),
        }
    }
}

use std::borrow::Cow;

use http::Uri;

use super::clean::clean_path;

pub struct Normalizer;

impl Normalizer {
    pub fn normalize_path(raw: &str) -> Cow<'_, str> {
        clean_path(raw)
    }

    /// Cleans the path of `uri`. The query is carried along untouched.
    pub fn normalize_uri(uri: &Uri) -> NormalizedPath<'_> {
        let raw = uri.path();
        NormalizedPath {
            raw,
            path: clean_path(raw),
            query: uri.query(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NormalizedPath<'a> {
    pub raw: &'a str,
    pub path: Cow<'a, str>,
    pub query: Option<&'a str>,
}

impl NormalizedPath<'_> {
    pub fn is_canonical(&self) -> bool {
        *self.path == *self.raw
    }

    /// `path[?query]`, suitable for a `Location` header.
    pub fn location(&self) -> String {
        match self.query {
            Some(q) => {
                let mut out = String::with_capacity(self.path.len() + 1 + q.len());
                out.push_str(&self.path);
                out.push('?');
                out.push_str(q);
                out
            }
            None => self.path.clone().into_owned(),
        }
    }
}

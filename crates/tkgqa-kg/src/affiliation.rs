//! Static entity affiliation graph.
//!
//! File format:
//!
//! ```json
//! {
//!   "relations": [
//!     {"type": "affiliated_with", "src": "Barack Obama", "dst": "United States"}
//!   ]
//! }
//! ```
//!
//! Only `affiliated_with` edges with both endpoints are kept. Each source maps
//! to a single affiliate; a later edge for the same source replaces the earlier one.

use std::fs;
use std::path::Path;

use ahash::AHashMap;
use serde::Deserialize;
use tracing::info;

use crate::KgError;

pub const AFFILIATED_WITH: &str = "affiliated_with";

#[derive(Debug, Clone, Default)]
pub struct AffiliationGraph {
    affiliates: AHashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct GraphFile {
    #[serde(default)]
    relations: Vec<GraphEdge>,
}

#[derive(Debug, Deserialize)]
struct GraphEdge {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    src: Option<String>,
    #[serde(default)]
    dst: Option<String>,
}

impl AffiliationGraph {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, KgError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| KgError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let graph = Self::from_json_str(&text).map_err(|source| KgError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), edges = graph.len(), "loaded affiliation graph");
        Ok(graph)
    }

    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        let file: GraphFile = serde_json::from_str(text)?;
        Ok(Self::from_edges(file.relations.into_iter().filter_map(|edge| {
            if edge.kind.as_deref() != Some(AFFILIATED_WITH) {
                return None;
            }
            Some((edge.src?, edge.dst?))
        })))
    }

    /// Build from `(src, dst)` pairs; later pairs overwrite earlier ones.
    pub fn from_edges<I, S, D>(edges: I) -> Self
    where
        I: IntoIterator<Item = (S, D)>,
        S: Into<String>,
        D: Into<String>,
    {
        let mut affiliates = AHashMap::new();
        for (src, dst) in edges {
            affiliates.insert(src.into(), dst.into());
        }
        Self { affiliates }
    }

    pub fn affiliate_of(&self, name: &str) -> Option<&str> {
        self.affiliates.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.affiliates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.affiliates.is_empty()
    }
}

//! Dependency calculation order
//!
//! The leveled order is produced by an offline dependency analysis and
//! consumed here as a trusted artifact: level 0 variables have no formula
//! dependencies, level N variables depend only on levels below N. The
//! engine does not re-validate acyclicity.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Leveled partition of variable identifiers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DependencyOrder {
    levels: Vec<Vec<String>>,
}

impl DependencyOrder {
    pub fn from_levels(levels: Vec<Vec<String>>) -> Self {
        Self { levels }
    }

    /// Variables at the given level; empty for levels beyond the analysis depth
    pub fn level(&self, n: usize) -> &[String] {
        self.levels.get(n).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of levels in the analysis
    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    /// Total number of ordered variables
    pub fn len(&self) -> usize {
        self.levels.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.iter().all(Vec::is_empty)
    }

    /// Read the analyzer's JSON artifact.
    ///
    /// The artifact is an object with `level_0` .. `level_N` keys, either at
    /// the top level or nested under `calculation_order`.
    pub fn from_analysis_json(json: &str) -> Result<Self> {
        let root: serde_json::Value =
            serde_json::from_str(json).map_err(|e| Error::InvalidOrder(e.to_string()))?;
        let map = root.get("calculation_order").unwrap_or(&root);
        let object = map
            .as_object()
            .ok_or_else(|| Error::InvalidOrder("expected a JSON object".to_string()))?;

        let mut levels = Vec::new();
        for n in 0.. {
            match object.get(&format!("level_{}", n)) {
                Some(entry) => {
                    let vars: Vec<String> = serde_json::from_value(entry.clone())
                        .map_err(|e| Error::InvalidOrder(format!("level_{}: {}", n, e)))?;
                    levels.push(vars);
                }
                None => break,
            }
        }

        if levels.is_empty() {
            return Err(Error::InvalidOrder(
                "no level_N keys found in artifact".to_string(),
            ));
        }

        Ok(Self { levels })
    }
}

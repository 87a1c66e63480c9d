// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

/// Diagnostics schema version for engine run metadata.
pub const DIAGNOSTICS_SCHEMA_VERSION: u32 = 1;

/// Structured metadata captured from one engine call.
///
/// `warnings` is the non-fatal signal channel: an achievable-yield shortfall
/// (requested recipe count exceeds what the archive supports) lands here
/// rather than failing the call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub schema_version: u32,
    pub engine_version: Option<String>,
    /// Seed used for the draw sequence, when running seeded.
    pub seed: Option<u64>,
    pub runtime_ms: Option<u64>,
    pub notes: Vec<String>,
    pub warnings: Vec<String>,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self {
            schema_version: DIAGNOSTICS_SCHEMA_VERSION,
            engine_version: Some(env!("CARGO_PKG_VERSION").to_string()),
            seed: None,
            runtime_ms: None,
            notes: vec![],
            warnings: vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Diagnostics, DIAGNOSTICS_SCHEMA_VERSION};

    #[test]
    fn default_sets_schema_and_engine_version() {
        let diagnostics = Diagnostics::default();
        assert_eq!(diagnostics.schema_version, DIAGNOSTICS_SCHEMA_VERSION);
        assert_eq!(
            diagnostics.engine_version,
            Some(env!("CARGO_PKG_VERSION").to_string())
        );
        assert!(diagnostics.seed.is_none());
        assert!(diagnostics.runtime_ms.is_none());
        assert!(diagnostics.notes.is_empty());
        assert!(diagnostics.warnings.is_empty());
    }

    #[test]
    fn diagnostics_serde_roundtrip_preserves_all_fields() {
        let diagnostics = Diagnostics {
            schema_version: DIAGNOSTICS_SCHEMA_VERSION,
            engine_version: Some(env!("CARGO_PKG_VERSION").to_string()),
            seed: Some(42),
            runtime_ms: Some(17),
            notes: vec!["trajectories=2".to_string()],
            warnings: vec!["insufficient matches: requested 5, achieved 3".to_string()],
        };
        let encoded = serde_json::to_string(&diagnostics).expect("diagnostics should serialize");
        let decoded: Diagnostics =
            serde_json::from_str(&encoded).expect("diagnostics should deserialize");
        assert_eq!(decoded, diagnostics);
    }
}

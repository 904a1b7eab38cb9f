// ═══════════════════════════════════════════════════════════════════════
// Error types — catalog validation, run setup, cascade runaway
// ═══════════════════════════════════════════════════════════════════════

/// Raised while validating raw catalog data into typed definitions.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("catalog is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{context}: unknown effect type '{effect_type}'")]
    UnknownEffectType { context: String, effect_type: String },

    #[error("{context}: unknown condition type '{condition_type}'")]
    UnknownConditionType { context: String, condition_type: String },

    #[error("{context}: unknown target mode '{mode}'")]
    UnknownTargetMode { context: String, mode: String },

    #[error("{context}: unknown resource '{resource}'")]
    UnknownResource { context: String, resource: String },

    #[error("{context}: unknown upgrade trigger '{trigger}'")]
    UnknownTrigger { context: String, trigger: String },

    #[error("{context}: missing required field '{field}'")]
    MissingField { context: String, field: &'static str },

    #[error("duplicate {kind} id '{id}'")]
    DuplicateId { kind: &'static str, id: String },

    #[error("reference to unknown {kind} '{id}'")]
    UnknownDefinition { kind: &'static str, id: String },
}

/// Raised when a run configuration does not match the catalog.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("run configuration is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("a run needs at least one die")]
    NoDice,

    #[error("die {die} names unknown dice upgrade '{id}'")]
    UnknownUpgrade { die: usize, id: String },

    #[error("unknown situation definition '{0}'")]
    UnknownSituation(String),

    #[error("unknown advisor '{0}'")]
    UnknownAdvisor(String),
}

/// A cascade that did not settle. Already-applied effects are kept.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CascadeError {
    #[error("effect queue exceeded {limit} iterations; remaining entries dropped")]
    IterationCeiling { limit: usize, changed: bool },
}

impl CascadeError {
    /// Whether anything was applied before the cascade was cut off.
    pub fn changed_state(&self) -> bool {
        match self {
            CascadeError::IterationCeiling { changed, .. } => *changed,
        }
    }
}

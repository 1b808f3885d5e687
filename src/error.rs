use thiserror::Error;

/// Error taxonomy for the dashboard pipeline.
///
/// Only two conditions are meaningful to a user: the source could not be
/// retrieved/parsed, or a loaded table does not have the columns the
/// declared schema requires. Everything else (export I/O, JSON writes)
/// is wrapped so the binary can print one message and return to the menu.
#[derive(Debug, Error)]
pub enum DashError {
    /// The source file or endpoint was unreachable or unparsable.
    /// The run halts; no partial tables are ever returned.
    #[error("failed to retrieve {source_desc}: {cause}")]
    Retrieval { source_desc: String, cause: String },

    /// A loaded table is missing required columns. Every missing column
    /// is listed, not just the first one looked up.
    #[error("table '{table}' is missing required column(s): {}", .missing.join(", "))]
    Schema { table: String, missing: Vec<String> },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DashError {
    pub fn retrieval(source_desc: impl Into<String>, cause: impl ToString) -> Self {
        DashError::Retrieval {
            source_desc: source_desc.into(),
            cause: cause.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retrieval_message_names_the_endpoint() {
        let err = DashError::retrieval("data/vendas.csv", "connection refused");
        assert_eq!(
            err.to_string(),
            "failed to retrieve data/vendas.csv: connection refused"
        );
        // The endpoint description is payload, not an error chain.
        assert!(std::error::Error::source(&err).is_none());
    }

    #[test]
    fn schema_message_lists_every_column() {
        let err = DashError::Schema {
            table: "metas".to_string(),
            missing: vec!["Meta_Receita".to_string(), "Meta_Reunioes".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "table 'metas' is missing required column(s): Meta_Receita, Meta_Reunioes"
        );
    }
}

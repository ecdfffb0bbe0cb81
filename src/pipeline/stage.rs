//! Stage identifiers and request parsing.
use crate::error::DriverError;
use serde::Serialize;
use std::fmt;

/// One of the fixed pipeline stages, declared in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    Discover,
    CollectEmails,
    EmailsToUrls,
    EnrichContacts,
    LighthouseAuditLast,
    CwvAnalyze,
    Autodoc,
    Cleanup,
}

impl StageId {
    /// Every stage in execution order; the index is the numeric alias.
    pub const ALL: [StageId; 8] = [
        StageId::Discover,
        StageId::CollectEmails,
        StageId::EmailsToUrls,
        StageId::EnrichContacts,
        StageId::LighthouseAuditLast,
        StageId::CwvAnalyze,
        StageId::Autodoc,
        StageId::Cleanup,
    ];

    pub fn token(self) -> &'static str {
        match self {
            StageId::Discover => "discover",
            StageId::CollectEmails => "collect_emails",
            StageId::EmailsToUrls => "emails_to_urls",
            StageId::EnrichContacts => "enrich_contacts",
            StageId::LighthouseAuditLast => "lighthouse_audit_last",
            StageId::CwvAnalyze => "cwv_analyze",
            StageId::Autodoc => "autodoc",
            StageId::Cleanup => "cleanup",
        }
    }

    /// Numeric alias accepted on the command line.
    pub fn alias(self) -> usize {
        self as usize
    }

    fn from_legacy(token: &str) -> Option<StageId> {
        match token {
            "enrich" => Some(StageId::EnrichContacts),
            "audit" => Some(StageId::LighthouseAuditLast),
            "compile" => Some(StageId::CwvAnalyze),
            "report" => Some(StageId::Autodoc),
            _ => None,
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// What the caller asked the driver to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageRequest {
    Single(StageId),
    All,
}

impl StageRequest {
    /// Parse a stage token, numeric alias, legacy alias, or `all`.
    pub fn parse(raw: &str) -> Result<StageRequest, DriverError> {
        let token = raw.trim();
        if token == "all" {
            return Ok(StageRequest::All);
        }
        if let Some(stage) = StageId::ALL.iter().find(|stage| stage.token() == token) {
            return Ok(StageRequest::Single(*stage));
        }
        if let Ok(index) = token.parse::<usize>() {
            if let Some(stage) = StageId::ALL.get(index) {
                return Ok(StageRequest::Single(*stage));
            }
        }
        if let Some(stage) = StageId::from_legacy(token) {
            return Ok(StageRequest::Single(stage));
        }
        Err(DriverError::Usage(format!(
            "unknown stage {raw:?}; expected one of: {} (or 0-{}), or all",
            StageId::ALL.map(StageId::token).join(", "),
            StageId::ALL.len() - 1
        )))
    }

    /// Stages to run for this request, in canonical order.
    pub fn stages(self) -> Vec<StageId> {
        match self {
            StageRequest::Single(stage) => vec![stage],
            StageRequest::All => StageId::ALL.to_vec(),
        }
    }

    pub fn is_all(self) -> bool {
        matches!(self, StageRequest::All)
    }
}

impl fmt::Display for StageRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageRequest::Single(stage) => stage.fmt(f),
            StageRequest::All => f.write_str("all"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_aliases_follow_canonical_order() {
        for (index, stage) in StageId::ALL.iter().enumerate() {
            assert_eq!(stage.alias(), index);
            assert_eq!(
                StageRequest::parse(&index.to_string()).expect("alias parses"),
                StageRequest::Single(*stage)
            );
            assert_eq!(
                StageRequest::parse(stage.token()).expect("token parses"),
                StageRequest::Single(*stage)
            );
        }
    }

    #[test]
    fn legacy_aliases_resolve() {
        assert_eq!(
            StageRequest::parse("audit").expect("parse"),
            StageRequest::Single(StageId::LighthouseAuditLast)
        );
        assert_eq!(
            StageRequest::parse("compile").expect("parse"),
            StageRequest::Single(StageId::CwvAnalyze)
        );
    }

    #[test]
    fn unknown_tokens_are_usage_errors() {
        for token in ["8", "-1", "Discover", "", "everything"] {
            let err = StageRequest::parse(token).expect_err("should reject");
            assert!(matches!(err, DriverError::Usage(_)), "token {token:?}");
            assert_eq!(err.exit_code(), crate::error::EXIT_USAGE);
        }
    }

    #[test]
    fn all_expands_in_order() {
        let stages = StageRequest::All.stages();
        let mut sorted = stages.clone();
        sorted.sort();
        assert_eq!(stages, sorted);
        assert_eq!(stages.first(), Some(&StageId::Discover));
        assert_eq!(stages.last(), Some(&StageId::Cleanup));
    }
}

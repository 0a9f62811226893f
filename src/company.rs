//! Company analysis
//!
//! Name/domain inference is pure and lives on `CompanyInfo::from_email`; this
//! module adds the external lookup that fills `industry` and `analysis` via a
//! grounded text-generation call. The lookup is failure-tolerant end to end:
//! any error or timeout leaves the inferred fields as they were.

use crate::llm::{GenerationRequest, TextGenService};
use crate::stage_machine::CompanyInfo;
use std::sync::Arc;
use std::time::Duration;

const LOOKUP_TIMEOUT: Duration = Duration::from_secs(20);
const ANALYSIS_MAX_TOKENS: u32 = 256;

/// Result of an analysis lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanyAnalysis {
    pub industry: Option<String>,
    pub analysis: String,
}

/// Ask the text-generation service for a short company blurb.
///
/// Returns `None` on any failure (timeout, provider error, empty reply); the
/// conversation proceeds without analysis.
pub async fn analyze_company(
    llm: &Arc<dyn TextGenService>,
    company: &CompanyInfo,
) -> Option<CompanyAnalysis> {
    let guidance = format!(
        "You are a B2B research assistant. In exactly two sentences, describe \
         what the company at the domain {} does and which industry it is in. \
         Start the first sentence with 'Industry: <industry>.' and keep the \
         rest factual. If the domain is unknown, say so plainly.",
        company.domain
    );
    let request = GenerationRequest::new(guidance, vec![], company.domain.clone())
        .with_grounding()
        .with_max_tokens(ANALYSIS_MAX_TOKENS);

    let reply = match tokio::time::timeout(LOOKUP_TIMEOUT, llm.generate(&request)).await {
        Ok(Ok(reply)) => reply,
        Ok(Err(e)) => {
            tracing::warn!(
                domain = %company.domain,
                error = %e,
                retryable = e.kind.is_retryable(),
                "company analysis failed"
            );
            return None;
        }
        Err(_) => {
            tracing::warn!(domain = %company.domain, "company analysis timed out");
            return None;
        }
    };

    let text = reply.text.trim();
    if text.is_empty() {
        return None;
    }

    Some(CompanyAnalysis {
        industry: extract_industry(text),
        analysis: text.to_string(),
    })
}

/// Merge an analysis into existing company info. Inferred `name` and `domain`
/// are never overwritten; `industry`/`analysis` are only filled when absent.
pub fn merge_analysis(company: &mut CompanyInfo, analysis: CompanyAnalysis) {
    if company.industry.is_none() {
        company.industry = analysis.industry;
    }
    if company.analysis.is_none() {
        company.analysis = Some(analysis.analysis);
    }
}

/// Pull the industry out of the `Industry: <x>.` prefix the prompt asks for.
fn extract_industry(text: &str) -> Option<String> {
    let rest = text.strip_prefix("Industry:")?;
    let industry = rest
        .split(['.', '\n'])
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty())?;
    Some(industry.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info() -> CompanyInfo {
        CompanyInfo::from_email("alex@acme.com").unwrap()
    }

    #[test]
    fn extract_industry_from_prefixed_reply() {
        let text = "Industry: Industrial manufacturing. Acme makes anvils and rockets.";
        assert_eq!(
            extract_industry(text).as_deref(),
            Some("Industrial manufacturing")
        );
    }

    #[test]
    fn extract_industry_absent_without_prefix() {
        assert_eq!(extract_industry("Acme makes anvils."), None);
        assert_eq!(extract_industry("Industry: ."), None);
    }

    #[test]
    fn merge_fills_blank_fields_only() {
        let mut company = info();
        merge_analysis(
            &mut company,
            CompanyAnalysis {
                industry: Some("Manufacturing".to_string()),
                analysis: "Acme makes anvils.".to_string(),
            },
        );

        assert_eq!(company.name, "acme");
        assert_eq!(company.domain, "acme.com");
        assert_eq!(company.industry.as_deref(), Some("Manufacturing"));

        // A second merge must not clobber what is already there.
        merge_analysis(
            &mut company,
            CompanyAnalysis {
                industry: Some("Something else".to_string()),
                analysis: "Different text.".to_string(),
            },
        );
        assert_eq!(company.industry.as_deref(), Some("Manufacturing"));
        assert_eq!(company.analysis.as_deref(), Some("Acme makes anvils."));
    }
}

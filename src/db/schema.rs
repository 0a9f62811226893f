//! Lead-store schema

/// SQL schema for initialization
pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS lead_summaries (
    id TEXT PRIMARY KEY,
    session_id TEXT NOT NULL,
    name TEXT,
    email TEXT,
    company_name TEXT,
    company_domain TEXT,
    industry TEXT,
    capabilities_shown TEXT NOT NULL DEFAULT '[]',
    score INTEGER NOT NULL,
    digest TEXT NOT NULL,
    follow_up_email TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_lead_summaries_session ON lead_summaries(session_id);
CREATE INDEX IF NOT EXISTS idx_lead_summaries_created ON lead_summaries(created_at DESC);
";

//! Database schema migrations.
//!
//! DDL here is restricted to a subset both PostgreSQL and SQLite accept
//! (the gateway runs against either through `sqlx::Any`): no `JSONB`,
//! server-side UUID generation, or triggers. Timestamps and monetary
//! amounts are stored as `TEXT` (RFC3339 and decimal-string respectively)
//! and parsed at the application layer, which keeps `rust_decimal`
//! round-tripping exact regardless of backend.

use crate::migration::Migration;

/// Get all migrations in order.
#[must_use]
pub fn all_migrations() -> Vec<Migration> {
    vec![
        v001_create_organizations(),
        v002_create_teams(),
        v003_create_agents(),
        v004_create_api_keys(),
        v005_create_model_pricing(),
        v006_create_budgets(),
        v007_create_api_requests(),
    ]
}

/// V001: Create organizations table.
#[must_use]
pub fn v001_create_organizations() -> Migration {
    Migration::builder(20250101000001, "create_organizations")
        .up(r"
            CREATE TABLE IF NOT EXISTS organizations (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
        ")
        .down(r"DROP TABLE IF EXISTS organizations;")
        .tag("core")
        .tag("attribution")
        .build()
}

/// V002: Create teams table.
#[must_use]
pub fn v002_create_teams() -> Migration {
    Migration::builder(20250101000002, "create_teams")
        .up(r"
            CREATE TABLE IF NOT EXISTS teams (
                id TEXT PRIMARY KEY,
                org_id TEXT REFERENCES organizations(id),
                name TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_teams_org_id ON teams(org_id);
        ")
        .down(r"DROP TABLE IF EXISTS teams;")
        .tag("core")
        .tag("attribution")
        .build()
}

/// V003: Create agents table.
#[must_use]
pub fn v003_create_agents() -> Migration {
    Migration::builder(20250101000003, "create_agents")
        .up(r"
            CREATE TABLE IF NOT EXISTS agents (
                id TEXT PRIMARY KEY,
                team_id TEXT REFERENCES teams(id),
                name TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_agents_team_id ON agents(team_id);
        ")
        .down(r"DROP TABLE IF EXISTS agents;")
        .tag("core")
        .tag("attribution")
        .build()
}

/// V004: Create api_keys table.
#[must_use]
pub fn v004_create_api_keys() -> Migration {
    Migration::builder(20250101000004, "create_api_keys")
        .up(r"
            CREATE TABLE IF NOT EXISTS api_keys (
                key_prefix TEXT PRIMARY KEY,
                key_hash TEXT NOT NULL UNIQUE,
                entity_id TEXT NOT NULL,
                revoked INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                last_used TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_api_keys_active
                ON api_keys(key_prefix) WHERE revoked = 0;
        ")
        .down(r"DROP TABLE IF EXISTS api_keys;")
        .tag("core")
        .tag("auth")
        .build()
}

/// V005: Create model_pricing table.
#[must_use]
pub fn v005_create_model_pricing() -> Migration {
    Migration::builder(20250101000005, "create_model_pricing")
        .up(r"
            CREATE TABLE IF NOT EXISTS model_pricing (
                provider TEXT NOT NULL,
                model TEXT NOT NULL,
                input_per_m TEXT NOT NULL,
                output_per_m TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (provider, model)
            );
        ")
        .down(r"DROP TABLE IF EXISTS model_pricing;")
        .tag("core")
        .tag("pricing")
        .build()
}

/// V006: Create budgets table.
#[must_use]
pub fn v006_create_budgets() -> Migration {
    Migration::builder(20250101000006, "create_budgets")
        .up(r"
            CREATE TABLE IF NOT EXISTS budgets (
                id TEXT PRIMARY KEY,
                scope TEXT NOT NULL,
                entity_id TEXT NOT NULL,
                limit_usd TEXT NOT NULL,
                spent_usd TEXT NOT NULL,
                period_seconds INTEGER NOT NULL,
                alerts_sent TEXT NOT NULL DEFAULT '[]',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE (scope, entity_id)
            );

            CREATE INDEX IF NOT EXISTS idx_budgets_scope_entity ON budgets(scope, entity_id);
        ")
        .down(r"DROP TABLE IF EXISTS budgets;")
        .tag("core")
        .tag("budget")
        .build()
}

/// V007: Create api_requests table (the time-series accounting log).
#[must_use]
pub fn v007_create_api_requests() -> Migration {
    Migration::builder(20250101000007, "create_api_requests")
        .up(r"
            CREATE TABLE IF NOT EXISTS api_requests (
                id TEXT PRIMARY KEY,
                provider TEXT NOT NULL,
                model TEXT NOT NULL,
                agent_id TEXT,
                team_id TEXT,
                org_id TEXT,
                input_tokens INTEGER NOT NULL,
                output_tokens INTEGER NOT NULL,
                total_tokens INTEGER NOT NULL,
                cost TEXT NOT NULL,
                latency_ms INTEGER NOT NULL,
                status_code INTEGER NOT NULL,
                was_routed INTEGER NOT NULL DEFAULT 0,
                original_model TEXT,
                routed_model TEXT,
                savings TEXT,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_api_requests_agent_time ON api_requests(agent_id, created_at);
            CREATE INDEX IF NOT EXISTS idx_api_requests_team_time ON api_requests(team_id, created_at);
            CREATE INDEX IF NOT EXISTS idx_api_requests_org_time ON api_requests(org_id, created_at);
            CREATE INDEX IF NOT EXISTS idx_api_requests_model_time ON api_requests(model, created_at);
            CREATE INDEX IF NOT EXISTS idx_api_requests_provider_time ON api_requests(provider, created_at);
            CREATE INDEX IF NOT EXISTS idx_api_requests_created_at ON api_requests(created_at);
        ")
        .down(r"DROP TABLE IF EXISTS api_requests;")
        .tag("core")
        .tag("analytics")
        .build()
}

/// Get migrations by tag.
#[must_use]
pub fn migrations_by_tag(tag: &str) -> Vec<Migration> {
    all_migrations()
        .into_iter()
        .filter(|m| m.tags.iter().any(|t| t == tag))
        .collect()
}

/// Get core migrations only.
#[must_use]
pub fn core_migrations() -> Vec<Migration> {
    migrations_by_tag("core")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_migrations_ordered() {
        let migrations = all_migrations();
        let mut prev_version = 0;
        for m in &migrations {
            assert!(m.version > prev_version, "out of order at {}", m.version);
            prev_version = m.version;
        }
    }

    #[test]
    fn all_migrations_have_rollback() {
        for m in all_migrations() {
            assert!(m.supports_rollback(), "migration {} has no down SQL", m.version);
        }
    }

    #[test]
    fn all_migrations_have_valid_checksums() {
        for m in all_migrations() {
            assert!(m.verify_checksum(), "bad checksum at {}", m.version);
        }
    }

    #[test]
    fn versions_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for m in all_migrations() {
            assert!(seen.insert(m.version), "duplicate version {}", m.version);
        }
    }

    #[test]
    fn migration_count_matches_schema() {
        assert_eq!(all_migrations().len(), 7);
    }
}

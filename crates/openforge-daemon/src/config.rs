use openforge_gatepass::DEFAULT_TOKEN_TTL_MS;

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Validity window for issued gate passes.
    pub token_ttl_ms: u64,
    /// Prefix for entity ids assigned at onboarding, one per event edition.
    pub entity_id_prefix: String,
    /// Upper bound on accepted HTTP request bodies.
    pub max_body_bytes: usize,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            token_ttl_ms: DEFAULT_TOKEN_TTL_MS,
            entity_id_prefix: "OF-2026".to_string(),
            max_body_bytes: 16_384,
        }
    }
}

impl DaemonConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            token_ttl_ms: read_env_u64("OPENFORGE_TOKEN_TTL_MS", defaults.token_ttl_ms),
            entity_id_prefix: std::env::var("OPENFORGE_ENTITY_PREFIX")
                .unwrap_or(defaults.entity_id_prefix),
            max_body_bytes: read_env_u64("OPENFORGE_MAX_BODY_BYTES", defaults.max_body_bytes as u64)
                as usize,
        }
    }
}

fn read_env_u64(key: &str, default_value: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|raw| raw.parse::<u64>().ok())
        .unwrap_or(default_value)
}

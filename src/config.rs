use anyhow::{bail, Context};

const DEFAULT_API_URL: &str = "https://sage.sre-ab.ru/mage/api/search";
const DEFAULT_SOURCE: &str = "oncall-deploy";

/// Settings for the Mage search call, read from the environment at startup.
/// Only the token has no default and must be provided.
#[derive(Debug, Clone)]
pub struct MageConfig {
    pub api_url: String,
    pub auth_token: String,
    /// Value of the source-identifying `x-source` request header.
    pub source: String,
}

impl MageConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let api_url = env_or("MAGE_API_URL", DEFAULT_API_URL);
        let auth_token =
            std::env::var("MAGE_AUTH_TOKEN").context("MAGE_AUTH_TOKEN is not set")?;
        if auth_token.trim().is_empty() {
            bail!("MAGE_AUTH_TOKEN is empty");
        }
        let source = env_or("MAGE_SOURCE", DEFAULT_SOURCE);

        Ok(MageConfig {
            api_url,
            auth_token,
            source,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => v,
        _ => default.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_or_falls_back_on_empty() {
        assert_eq!(env_or("ONCALL_DEPLOY_UNSET_VAR", "fallback"), "fallback");
    }
}

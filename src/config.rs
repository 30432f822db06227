use crate::{detran, gemini};
use failure::{Error, ResultExt};
use std::env;
use std::path::PathBuf;
use url::Url;

#[derive(Debug, Clone)]
pub struct Config {
    pub detran_url: Url,
    pub gemini_url: String,
    pub gemini_model: String,
    pub api_key: String,
    pub history_db: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Config, Error> {
        Config::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup<F>(var: F) -> Result<Config, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let detran_url = var("DETRAN_API_URL").unwrap_or_else(|| detran::DEFAULT_API_URL.to_string());
        let detran_url = Url::parse(&detran_url)
            .with_context(|_| format!("DETRAN_API_URL is not a valid URL: {}", detran_url))?;
        let api_key = var("GEMINI_API_KEY")
            .or_else(|| var("API_KEY"))
            .ok_or_else(|| format_err!("GEMINI_API_KEY environment variable unset"))?;
        Ok(Config {
            detran_url,
            gemini_url: var("GEMINI_API_URL").unwrap_or_else(|| gemini::DEFAULT_API_URL.to_string()),
            gemini_model: var("GEMINI_MODEL").unwrap_or_else(|| gemini::DEFAULT_MODEL.to_string()),
            api_key,
            history_db: var("HISTORY_DB")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("debts.db")),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, Error> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_only_need_api_key() {
        let config = config(&[("GEMINI_API_KEY", "secret")]).unwrap();
        assert_eq!(config.detran_url.as_str(), detran::DEFAULT_API_URL);
        assert_eq!(config.gemini_model, gemini::DEFAULT_MODEL);
        assert_eq!(config.history_db, PathBuf::from("debts.db"));
        assert_eq!(config.api_key, "secret");
    }

    #[test]
    fn api_key_falls_back_to_generic_name() {
        assert_eq!(config(&[("API_KEY", "k")]).unwrap().api_key, "k");
    }

    #[test]
    fn missing_api_key_is_error() {
        let err = config(&[]).unwrap_err();
        assert!(err.to_string().contains("GEMINI_API_KEY"));
    }

    #[test]
    fn invalid_registry_url_is_error() {
        assert!(config(&[("API_KEY", "k"), ("DETRAN_API_URL", "not a url")]).is_err());
    }

    #[test]
    fn overrides_are_used() {
        let config = config(&[
            ("API_KEY", "k"),
            ("DETRAN_API_URL", "http://localhost:8080/debitos"),
            ("GEMINI_MODEL", "gemini-2.5-flash"),
            ("HISTORY_DB", "/tmp/h.db"),
        ])
        .unwrap();
        assert_eq!(config.detran_url.host_str(), Some("localhost"));
        assert_eq!(config.gemini_model, "gemini-2.5-flash");
        assert_eq!(config.history_db, PathBuf::from("/tmp/h.db"));
    }
}

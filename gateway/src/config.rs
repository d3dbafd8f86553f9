use model::scrum_update::{BlockerStatusRule, CreateMapping};
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use zoho::{RefreshCredentials, Region, RegionUrls, DEFAULT_MODULE};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value `{value}` for {name}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialStrategy {
    Static,
    Refresh,
}

impl FromStr for CredentialStrategy {
    type Err = ();

    fn from_str(s: &str) -> Result<CredentialStrategy, ()> {
        match s {
            "static" => Ok(CredentialStrategy::Static),
            "refresh" => Ok(CredentialStrategy::Refresh),
            _ => Err(()),
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    Static(String),
    Refresh(RefreshCredentials),
    /// Requests that need Zoho fail with this description.
    Missing(String),
}

impl Credentials {
    pub fn kind(&self) -> &'static str {
        match self {
            Credentials::Static(_) => "static",
            Credentials::Refresh(_) => "refresh",
            Credentials::Missing(_) => "missing",
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Credentials::Static(_) => f.write_str("Static(<redacted>)"),
            Credentials::Refresh(credentials) => f.debug_tuple("Refresh").field(credentials).finish(),
            Credentials::Missing(reason) => f.debug_tuple("Missing").field(reason).finish(),
        }
    }
}

/// What the caller sees when Zoho answers with a non-2xx status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UpstreamErrorPolicy {
    /// Zoho's status code, with its body.
    #[default]
    Passthrough,
    /// Always 200, with Zoho's status and body embedded.
    Embed,
}

impl FromStr for UpstreamErrorPolicy {
    type Err = ();

    fn from_str(s: &str) -> Result<UpstreamErrorPolicy, ()> {
        match s {
            "passthrough" => Ok(UpstreamErrorPolicy::Passthrough),
            "embed" => Ok(UpstreamErrorPolicy::Embed),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub credentials: Credentials,
    pub urls: RegionUrls,
    pub module: String,
    pub upstream_errors: UpstreamErrorPolicy,
    pub mapping: CreateMapping,
    pub timeout: Option<Duration>,
}

impl Config {
    pub fn from_env() -> Result<Config, ConfigError> {
        Config::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from a variable lookup. Missing credentials
    /// are not an error here; they only fail the requests that need them.
    pub fn from_lookup<F>(lookup: F) -> Result<Config, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).map(|value| value.trim().to_owned()).filter(|value| !value.is_empty());
        // Secrets are accepted with or without the `ZOHO_` prefix.
        let secret = |name: &str| var(&format!("ZOHO_{}", name)).or_else(|| var(name));

        let strategy = match var("CREDENTIAL_STRATEGY") {
            Some(value) => parse("CREDENTIAL_STRATEGY", value)?,
            None if secret("REFRESH_TOKEN").is_some() => CredentialStrategy::Refresh,
            None => CredentialStrategy::Static,
        };

        let credentials = match strategy {
            CredentialStrategy::Static => match secret("ACCESS_TOKEN") {
                Some(token) => Credentials::Static(token),
                None => Credentials::Missing("ZOHO_ACCESS_TOKEN is not set".into()),
            },
            CredentialStrategy::Refresh => {
                match (secret("REFRESH_TOKEN"), secret("CLIENT_ID"), secret("CLIENT_SECRET")) {
                    (Some(refresh_token), Some(client_id), Some(client_secret)) => {
                        Credentials::Refresh(RefreshCredentials {
                            refresh_token,
                            client_id,
                            client_secret,
                        })
                    }
                    (refresh_token, client_id, client_secret) => {
                        let missing: Vec<&str> = [
                            ("ZOHO_REFRESH_TOKEN", refresh_token.is_none()),
                            ("ZOHO_CLIENT_ID", client_id.is_none()),
                            ("ZOHO_CLIENT_SECRET", client_secret.is_none()),
                        ]
                        .into_iter()
                        .filter(|(_, missing)| *missing)
                        .map(|(name, _)| name)
                        .collect();
                        Credentials::Missing(format!("{} not set", missing.join(", ")))
                    }
                }
            }
        };

        let region: Region = match var("ZOHO_REGION") {
            Some(value) => parse("ZOHO_REGION", value)?,
            None => Region::default(),
        };
        let mut urls = region.urls();
        if let Some(value) = var("REGION_BASE_URLS") {
            urls = match value.split_once(',') {
                Some((accounts, api)) if !accounts.trim().is_empty() && !api.trim().is_empty() => {
                    RegionUrls::new(accounts.trim(), api.trim())
                }
                _ => {
                    return Err(ConfigError::Invalid {
                        name: "REGION_BASE_URLS",
                        value: value.clone(),
                    })
                }
            };
        }
        if let Some(accounts) = var("ZOHO_ACCOUNTS_BASE_URL") {
            urls = RegionUrls::new(&accounts, &urls.api);
        }
        if let Some(api) = var("ZOHO_API_BASE_URL") {
            urls = RegionUrls::new(&urls.accounts, &api);
        }

        let upstream_errors = match var("UPSTREAM_ERROR_POLICY") {
            Some(value) => parse("UPSTREAM_ERROR_POLICY", value)?,
            None => UpstreamErrorPolicy::default(),
        };

        let blocker_status_rule: BlockerStatusRule = match var("BLOCKER_STATUS_RULE") {
            Some(value) => parse("BLOCKER_STATUS_RULE", value)?,
            None => BlockerStatusRule::default(),
        };
        let resolution_note_from_remarks = match var("RESOLUTION_NOTE_FROM_REMARKS") {
            Some(value) => parse("RESOLUTION_NOTE_FROM_REMARKS", value)?,
            None => false,
        };

        let timeout = match var("UPSTREAM_TIMEOUT_SECS") {
            Some(value) => Some(Duration::from_secs(parse("UPSTREAM_TIMEOUT_SECS", value)?)),
            None => None,
        };

        Ok(Config {
            credentials,
            urls,
            module: var("ZOHO_MODULE").unwrap_or_else(|| DEFAULT_MODULE.to_owned()),
            upstream_errors,
            mapping: CreateMapping {
                blocker_status_rule,
                resolution_note_from_remarks,
            },
            timeout,
        })
    }
}

fn parse<T: FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
    match value.parse() {
        Ok(parsed) => Ok(parsed),
        Err(_) => Err(ConfigError::Invalid { name, value }),
    }
}

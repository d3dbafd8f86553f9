use aws_sdk_ssm::Client as SsmClient;
use std::collections::HashMap;
use std::env;

type Error = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Settings that may be given indirectly as `<NAME>_PARAMETER`, the name of an SSM parameter.
const SECRETS: [&str; 8] = [
    "ZOHO_ACCESS_TOKEN",
    "ACCESS_TOKEN",
    "ZOHO_REFRESH_TOKEN",
    "REFRESH_TOKEN",
    "ZOHO_CLIENT_ID",
    "CLIENT_ID",
    "ZOHO_CLIENT_SECRET",
    "CLIENT_SECRET",
];

#[derive(Debug, thiserror::Error)]
pub enum ParameterError {
    #[error("SSM parameter `{0}` has no value")]
    Empty(String),
}

/// Reads the process environment once and resolves secrets stored in SSM.
pub async fn load_environment() -> Result<HashMap<String, String>, Error> {
    let mut vars: HashMap<String, String> = env::vars().collect();
    let indirect = parameter_names(&vars);
    if indirect.is_empty() {
        return Ok(vars);
    }

    let shared_config = aws_config::load_from_env().await;
    let client = SsmClient::new(&shared_config);
    for (name, parameter) in indirect {
        let value = client
            .get_parameter()
            .name(&parameter)
            .with_decryption(true)
            .send()
            .await?
            .parameter
            .and_then(|parameter| parameter.value)
            .ok_or_else(|| ParameterError::Empty(parameter.clone()))?;
        tracing::info!(name, parameter = %parameter, "Resolved setting from SSM");
        vars.insert(name.to_string(), value);
    }
    Ok(vars)
}

fn parameter_names(vars: &HashMap<String, String>) -> Vec<(&'static str, String)> {
    SECRETS
        .iter()
        .filter_map(|name| {
            vars.get(&format!("{}_PARAMETER", name))
                .map(|parameter| parameter.trim())
                .filter(|parameter| !parameter.is_empty())
                .map(|parameter| (*name, parameter.to_owned()))
        })
        .collect()
}

#[test]
fn parameter_names_test() {
    let vars: HashMap<String, String> = [
        ("ZOHO_REFRESH_TOKEN_PARAMETER", "/scrum/zoho/refresh-token"),
        ("ZOHO_CLIENT_SECRET_PARAMETER", " "),
        ("ZOHO_CLIENT_ID", "1000.CLIENT"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    assert_eq!(
        parameter_names(&vars),
        vec![("ZOHO_REFRESH_TOKEN", "/scrum/zoho/refresh-token".to_string())]
    );
}

pub mod config;
pub mod error;

use config::{Config, Credentials, UpstreamErrorPolicy};
use error::GatewayError;
use lambda_http::http::{Method, StatusCode};
use lambda_http::{Body, Request, Response};
use model::scrum_update::{CrmRecord, DashboardRow};
use serde::Serialize;
use serde_json::Value;
use zoho::{CrmApi, RecordList, UpstreamResponse};

#[derive(Serialize, Debug)]
struct ListResponse {
    data: Vec<DashboardRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    zoho_status: Option<u16>,
    #[serde(rename = "_debug", skip_serializing_if = "Option::is_none")]
    debug: Option<Value>,
}

#[derive(Serialize, Debug)]
struct CreateResponse {
    ok: bool,
    zoho: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    zoho_status: Option<u16>,
}

/// Serves the dashboard's `Scrum_Updates` requests against Zoho CRM.
pub struct Gateway<C> {
    crm: C,
    config: Config,
}

impl<C: CrmApi> Gateway<C> {
    pub fn new(crm: C, config: Config) -> Gateway<C> {
        Gateway { crm, config }
    }

    pub async fn handle(&self, request: Request) -> Response<Body> {
        tracing::info!(method = %request.method(), path = request.uri().path(), "Handling request");

        let result = match request.method() {
            &Method::OPTIONS => return response::preflight(),
            &Method::GET => self.list().await,
            &Method::POST => self.create(request.body().as_ref()).await,
            _ => Err(GatewayError::MethodNotAllowed),
        };

        result.unwrap_or_else(|error| {
            tracing::error!(status = error.status().as_u16(), %error, "Request failed");
            error.into_response()
        })
    }

    async fn access_token(&self) -> Result<String, GatewayError> {
        match &self.config.credentials {
            Credentials::Static(token) => Ok(token.clone()),
            Credentials::Refresh(credentials) => Ok(self.crm.refresh_access_token(credentials).await?),
            Credentials::Missing(reason) => Err(GatewayError::MissingCredentials(reason.clone())),
        }
    }

    async fn list(&self) -> Result<Response<Body>, GatewayError> {
        let token = self.access_token().await?;
        let upstream = self.crm.list_records(&token).await?;

        if !upstream.is_success() {
            return Ok(match self.config.upstream_errors {
                UpstreamErrorPolicy::Passthrough => response::raw(status_of(&upstream), upstream.body),
                UpstreamErrorPolicy::Embed => response::ok(ListResponse {
                    data: Vec::new(),
                    zoho_status: Some(upstream.status),
                    debug: Some(upstream.raw_json()),
                }),
            });
        }

        // Zoho answers an empty module with 204 and no body.
        let records = if upstream.body.trim().is_empty() {
            RecordList::default()
        } else {
            serde_json::from_str::<RecordList>(&upstream.body).map_err(GatewayError::UpstreamBody)?
        };

        Ok(response::ok(ListResponse {
            data: records.data.into_iter().map(DashboardRow::from_crm_record).collect(),
            zoho_status: None,
            debug: None,
        }))
    }

    async fn create(&self, body: &[u8]) -> Result<Response<Body>, GatewayError> {
        let row: DashboardRow = if body.iter().all(u8::is_ascii_whitespace) {
            DashboardRow::default()
        } else {
            serde_json::from_slice(body).map_err(GatewayError::InvalidBody)?
        };
        let record = CrmRecord::from_dashboard_row(&row, &self.config.mapping);

        let token = self.access_token().await?;
        let upstream = self.crm.insert_record(&token, &record).await?;

        if upstream.is_success() {
            return Ok(response::ok(CreateResponse {
                ok: true,
                zoho: upstream.raw_json(),
                zoho_status: None,
            }));
        }

        Ok(match self.config.upstream_errors {
            UpstreamErrorPolicy::Passthrough => response::with_status(
                status_of(&upstream),
                CreateResponse {
                    ok: false,
                    zoho: upstream.raw_json(),
                    zoho_status: None,
                },
            ),
            UpstreamErrorPolicy::Embed => response::ok(CreateResponse {
                ok: false,
                zoho: upstream.raw_json(),
                zoho_status: Some(upstream.status),
            }),
        })
    }
}

fn status_of(upstream: &UpstreamResponse) -> StatusCode {
    StatusCode::from_u16(upstream.status).unwrap_or(StatusCode::BAD_GATEWAY)
}

//! `memberdesk customers ...`: a thin JSON client for the customer API.
//!
//! The server's envelope is printed exactly as received. When the request
//! never produces a JSON reply the client prints its own
//! `{"success":false,"error":...}` so callers always see the same shape.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use memberdesk_core::config::{AppConfig, ClientConfig, LoadOptions};
use reqwest::{Client, Method};
use serde_json::{json, Map, Value};

use crate::commands::{current_thread_runtime, CommandResult};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Default, Args)]
pub struct CustomerFieldArgs {
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long, help = "ISO date such as 1990-01-01")]
    pub date_of_birth: Option<String>,
    #[arg(long)]
    pub member_number: Option<String>,
    #[arg(long)]
    pub interests: Option<String>,
}

impl CustomerFieldArgs {
    /// Absent flags are left out of the body so the server reports them.
    fn to_body(&self) -> Value {
        let mut body = Map::new();
        if let Some(name) = &self.name {
            body.insert("name".to_string(), json!(name));
        }
        if let Some(date_of_birth) = &self.date_of_birth {
            body.insert("dateOfBirth".to_string(), json!(date_of_birth));
        }
        if let Some(member_number) = &self.member_number {
            let value = match member_number.trim().parse::<i64>() {
                Ok(number) => json!(number),
                Err(_) => json!(member_number),
            };
            body.insert("memberNumber".to_string(), value);
        }
        if let Some(interests) = &self.interests {
            body.insert("interests".to_string(), json!(interests));
        }
        Value::Object(body)
    }
}

#[derive(Debug, Clone, Subcommand)]
pub enum CustomerAction {
    #[command(about = "List customers, newest first")]
    List,
    #[command(about = "Fetch one customer by id")]
    Get { id: String },
    #[command(about = "Create a customer")]
    Create(CustomerFieldArgs),
    #[command(about = "Replace every field of an existing customer")]
    Update {
        id: String,
        #[command(flatten)]
        fields: CustomerFieldArgs,
    },
    #[command(about = "Delete one customer by id")]
    Delete { id: String },
    #[command(about = "Delete every customer")]
    Purge,
}

impl CustomerAction {
    fn route(&self) -> (Method, String) {
        match self {
            Self::List => (Method::GET, "customer".to_string()),
            Self::Get { id } => (Method::GET, format!("customer/{id}")),
            Self::Create(_) => (Method::POST, "customer".to_string()),
            Self::Update { id, .. } => (Method::PUT, format!("customer/{id}")),
            Self::Delete { id } => (Method::DELETE, format!("customer/{id}")),
            Self::Purge => (Method::DELETE, "customer".to_string()),
        }
    }

    fn body(&self) -> Option<Value> {
        match self {
            Self::Create(fields) | Self::Update { fields, .. } => Some(fields.to_body()),
            _ => None,
        }
    }
}

pub fn run(action: CustomerAction) -> CommandResult {
    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => execute(&config.client, &action),
        Err(error) => failure_envelope(format!("configuration issue: {error}")),
    }
}

pub fn execute(client: &ClientConfig, action: &CustomerAction) -> CommandResult {
    let runtime = match current_thread_runtime() {
        Ok(runtime) => runtime,
        Err(error) => {
            return failure_envelope(format!("failed to initialize async runtime: {error}"));
        }
    };

    match runtime.block_on(send(client, action)) {
        Ok((raw, envelope)) => {
            let succeeded = envelope.get("success").and_then(Value::as_bool) == Some(true);
            CommandResult { exit_code: if succeeded { 0 } else { 1 }, output: raw }
        }
        Err(error) => failure_envelope(format!("{error:#}")),
    }
}

async fn send(config: &ClientConfig, action: &CustomerAction) -> Result<(String, Value)> {
    let http = Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .context("failed to build HTTP client")?;

    let (method, path) = action.route();
    let url = config.api_url(&path);
    let mut request = http.request(method.clone(), &url);
    if let Some(body) = action.body() {
        request = request.json(&body);
    }

    let response = request.send().await.with_context(|| format!("{method} {url} failed"))?;
    let status = response.status();
    let raw = response.text().await.context("failed to read response body")?;
    let envelope = serde_json::from_str::<Value>(&raw)
        .with_context(|| format!("{method} {url} returned {status} without a JSON envelope"))?;

    Ok((raw.trim().to_string(), envelope))
}

fn failure_envelope(message: String) -> CommandResult {
    CommandResult { exit_code: 1, output: json!({ "success": false, "error": message }).to_string() }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{CustomerAction, CustomerFieldArgs};
    use reqwest::Method;

    #[test]
    fn routes_cover_every_action() {
        let fields = CustomerFieldArgs::default();
        let cases = [
            (CustomerAction::List, Method::GET, "customer"),
            (CustomerAction::Get { id: "abc".into() }, Method::GET, "customer/abc"),
            (CustomerAction::Create(fields.clone()), Method::POST, "customer"),
            (
                CustomerAction::Update { id: "abc".into(), fields },
                Method::PUT,
                "customer/abc",
            ),
            (CustomerAction::Delete { id: "abc".into() }, Method::DELETE, "customer/abc"),
            (CustomerAction::Purge, Method::DELETE, "customer"),
        ];

        for (action, method, path) in cases {
            assert_eq!(action.route(), (method, path.to_string()), "{action:?}");
        }
    }

    #[test]
    fn body_sends_numeric_member_numbers_as_numbers() {
        let fields = CustomerFieldArgs {
            name: Some("Ada".into()),
            date_of_birth: Some("1990-01-01".into()),
            member_number: Some("42".into()),
            interests: Some("math".into()),
        };

        assert_eq!(
            fields.to_body(),
            json!({
                "name": "Ada",
                "dateOfBirth": "1990-01-01",
                "memberNumber": 42,
                "interests": "math"
            })
        );
    }

    #[test]
    fn body_omits_missing_flags_and_keeps_odd_numbers_as_text() {
        let fields = CustomerFieldArgs {
            member_number: Some("42.5".into()),
            ..CustomerFieldArgs::default()
        };

        assert_eq!(fields.to_body(), json!({ "memberNumber": "42.5" }));
        assert!(CustomerAction::List.body().is_none());
    }
}

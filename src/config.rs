use anyhow::{anyhow, bail, Context, Result};
use aws_config::{BehaviorVersion, SdkConfig};
use aws_sdk_dynamodb::config::Region;
use std::{path::PathBuf, str::FromStr, time::Duration};
use tracing::info;

use crate::{
    dynamodb::{Capacity, Table},
    movie::movies_table,
    provision::WaitOptions,
    writer::FailurePolicy,
};

const DEFAULT_TABLE_NAME: &str = "Movies";
const DEFAULT_DATA_FILE: &str = "moviedata.json";

/// Where the SDK gets its credentials, region and endpoint from.
///
/// Each field left as `None` falls back to the SDK's default provider chain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AwsSettings {
    pub profile: Option<String>,
    pub region: Option<String>,
    pub endpoint_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub table_name: String,
    pub data_file: PathBuf,
    pub aws: AwsSettings,
    pub capacity: Capacity,
    pub wait: WaitOptions,
    pub on_error: FailurePolicy,
}

impl Config {
    /// Reads the configuration from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let capacity = match get("MOVIES_BILLING_MODE")
            .as_deref()
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            None | Some("provisioned") => Capacity::Provisioned {
                read: parse_positive(&get, "MOVIES_READ_CAPACITY", 5)?,
                write: parse_positive(&get, "MOVIES_WRITE_CAPACITY", 5)?,
            },
            Some("on-demand") | Some("pay-per-request") => Capacity::OnDemand,
            Some(other) => bail!(
                "MOVIES_BILLING_MODE must be `provisioned` or `on-demand`, got `{other}`"
            ),
        };

        let wait = WaitOptions {
            timeout: Duration::from_secs(parse_positive(&get, "MOVIES_TABLE_WAIT_SECS", 120)?),
            initial_delay: Duration::from_millis(parse_positive(&get, "MOVIES_TABLE_POLL_MS", 500)?),
            max_delay: Duration::from_millis(parse_positive(
                &get,
                "MOVIES_TABLE_MAX_POLL_MS",
                10_000,
            )?),
        };
        if wait.max_delay < wait.initial_delay {
            bail!("MOVIES_TABLE_MAX_POLL_MS must not be smaller than MOVIES_TABLE_POLL_MS");
        }

        let on_error = match get("MOVIES_ON_ERROR") {
            Some(value) => value
                .parse::<FailurePolicy>()
                .map_err(|e| anyhow!("MOVIES_ON_ERROR: {e}"))?,
            None => FailurePolicy::default(),
        };

        Ok(Self {
            table_name: get("MOVIES_TABLE").unwrap_or_else(|| DEFAULT_TABLE_NAME.to_string()),
            data_file: get("MOVIES_DATA_FILE")
                .unwrap_or_else(|| DEFAULT_DATA_FILE.to_string())
                .into(),
            aws: AwsSettings {
                profile: get("AWS_PROFILE"),
                region: get("AWS_REGION"),
                endpoint_url: get("AWS_ENDPOINT_URL"),
            },
            capacity,
            wait,
            on_error,
        })
    }

    /// The movies table as configured.
    pub fn table(&self) -> Table {
        movies_table(self.table_name.as_str()).with_capacity(self.capacity)
    }

    /// Resolves credentials, region and endpoint into an SDK config.
    pub async fn load_sdk_config(&self) -> SdkConfig {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(profile) = &self.aws.profile {
            loader = loader.profile_name(profile);
        }
        if let Some(region) = &self.aws.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(endpoint_url) = &self.aws.endpoint_url {
            info!("Using endpoint {endpoint_url}");
            loader = loader.endpoint_url(endpoint_url);
        }
        loader.load().await
    }
}

fn parse_positive<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: FromStr + PartialOrd + Default,
    T::Err: std::error::Error + Send + Sync + 'static,
    G: Fn(&str) -> Option<String>,
{
    let Some(raw) = get(key) else {
        return Ok(default);
    };
    let value: T = raw
        .trim()
        .parse()
        .with_context(|| format!("{key} must be a positive integer, got `{raw}`"))?;
    if value <= T::default() {
        bail!("{key} must be a positive integer, got `{raw}`");
    }
    Ok(value)
}

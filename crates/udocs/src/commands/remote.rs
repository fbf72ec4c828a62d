//! Commands talking to a running udocs server.

use std::path::Path;
use std::time::Duration;

use udocs_build::pack;
use udocs_config::Config;
use ureq::http::Response;
use ureq::{Agent, Body};

use super::local::check_dir;
use super::{DirArgs, route_from_summary};
use crate::error::CliError;
use crate::output::Output;

/// Timeout for API requests in seconds.
const REQUEST_TIMEOUT: u64 = 120;

/// Upload the docs directory to the configured server.
pub(crate) fn publish(args: &DirArgs, config_path: Option<&Path>) -> Result<(), CliError> {
    let output = Output::new();
    let config = Config::load(config_path, None)?;

    check_dir(&args.dir)?;
    let route = route_from_summary(&args.dir)?;
    let tarball = pack(&args.dir)?;
    let url = api_url(&config, &route);

    tracing::info!(url = %url, bytes = tarball.len(), "Publishing guide");
    let response = agent()
        .post(&url)
        .header("Content-Type", "application/gzip")
        .send(&tarball[..])?;
    expect_status(response, &url, 201)?;

    output.success(&format!(
        "Published to {}/{route}",
        config.server.public_url()
    ));
    Ok(())
}

/// Remove the guide named by the docs directory's summary from the server.
pub(crate) fn destroy(args: &DirArgs, config_path: Option<&Path>) -> Result<(), CliError> {
    let output = Output::new();
    let config = Config::load(config_path, None)?;

    let route = route_from_summary(&args.dir)?;
    let url = api_url(&config, &route);

    tracing::info!(url = %url, "Destroying guide");
    let response = agent().delete(&url).call()?;
    expect_status(response, &url, 200)?;

    output.success(&format!("Removed {route}"));
    Ok(())
}

fn agent() -> Agent {
    Agent::config_builder()
        .timeout_global(Some(Duration::from_secs(REQUEST_TIMEOUT)))
        .http_status_as_error(false)
        .build()
        .into()
}

/// API endpoint managing `route`.
fn api_url(config: &Config, route: &str) -> String {
    format!("{}/api/{route}", config.server.public_url())
}

fn expect_status(mut response: Response<Body>, url: &str, expected: u16) -> Result<(), CliError> {
    let status = response.status().as_u16();
    if status == expected {
        return Ok(());
    }
    let body = response.body_mut().read_to_string().unwrap_or_default();
    Err(CliError::Remote {
        url: url.to_owned(),
        status,
        body: body.trim().to_owned(),
    })
}

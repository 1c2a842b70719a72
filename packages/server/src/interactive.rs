//! Interactive mode for the server.
//!
//! Prompts the user for the bind address, port and remote endpoints before
//! starting the server.

use dialoguer::{Confirm, Input};

/// Prompts for a value, falling back to `default` if the prompt fails.
fn prompt(label: &str, default: String) -> String {
    Input::new()
        .with_prompt(label)
        .default(default.clone())
        .interact_text()
        .unwrap_or(default)
}

/// Runs the server in interactive mode, prompting for configuration.
///
/// Asks for a bind address, port, geocoder URL and report API URL, sets
/// the corresponding environment variables (`BIND_ADDR`, `PORT`,
/// `GEOCODER_URL`, `REPORTS_API_URL`), and delegates to
/// [`super::run_server`]. Leaving an endpoint empty keeps the embedded
/// default.
///
/// # Errors
///
/// Returns an `std::io::Result` error if the underlying server fails to
/// start.
#[allow(clippy::future_not_send)]
pub async fn run() -> std::io::Result<()> {
    println!("Safety Map Server");
    println!();

    let bind_addr = prompt("Bind address", "127.0.0.1".to_string());
    let port = prompt("Port", "8080".to_string());
    let geocoder_url = prompt(
        "Geocoder URL (empty for default)",
        std::env::var("GEOCODER_URL").unwrap_or_default(),
    );
    let reports_api_url = prompt(
        "Report API URL (empty for default)",
        std::env::var("REPORTS_API_URL").unwrap_or_default(),
    );

    // SAFETY: We are single-threaded at this point (before server starts) and
    // these variables are only read once during server initialisation.
    unsafe {
        std::env::set_var("BIND_ADDR", &bind_addr);
        std::env::set_var("PORT", &port);
        std::env::set_var("GEOCODER_URL", &geocoder_url);
        std::env::set_var("REPORTS_API_URL", &reports_api_url);
    }

    if !Confirm::new()
        .with_prompt(format!("Start server on {bind_addr}:{port}?"))
        .default(true)
        .interact()
        .unwrap_or(true)
    {
        println!("Cancelled.");
        return Ok(());
    }

    super::run_server().await
}

use std::env;

use anyhow::Context;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    growthsim::telemetry::init_logging();

    let raw_args: Vec<String> = env::args().collect();
    if raw_args.get(1).map(|s| s.as_str()) == Some("serve") {
        let port = match raw_args.get(2) {
            Some(raw) => raw
                .parse::<u16>()
                .with_context(|| format!("invalid port {raw:?}"))?,
            None => 8080,
        };
        growthsim::api::run_http_server(port)
            .await
            .context("server error")?;
        return Ok(());
    }

    match growthsim::api::run_cli() {
        Ok(report) => {
            print!("{report}");
            Ok(())
        }
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("Usage: growthsim [OPTIONS] | growthsim serve [port]");
            std::process::exit(2);
        }
    }
}

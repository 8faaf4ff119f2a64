//! Stock Search Server
//!
//! Serves the natural-language stock search page and its JSON API.

use anyhow::Result;
use clap::Parser;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use stocksearch::config::DEFAULT_PORT;
use stocksearch::server::start_server;

#[derive(Parser)]
#[command(name = "stocksearch_server")]
#[command(about = "Natural-language stock search server")]
#[command(version)]
struct Args {
  /// Interface to bind
  #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
  host: IpAddr,

  /// Port to listen on
  #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
  port: u16,

  /// Enable verbose logging
  #[arg(short, long)]
  verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();

  // RUST_LOG wins; otherwise keep ONNX Runtime and hyper quiet
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
    if args.verbose {
      EnvFilter::new("debug,ort=warn,hyper=warn,h2=warn")
    } else {
      EnvFilter::new("stocksearch=info,tower_http=info,ort=error,hyper=warn,warn")
    }
  });

  tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

  let addr = SocketAddr::new(args.host, args.port);
  tracing::info!("Starting Stock Search server v{}", env!("CARGO_PKG_VERSION"));
  tracing::info!("Binding to address: {addr}");

  start_server(addr).await?;

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use clap::CommandFactory;

  #[test]
  fn test_args_are_well_formed() {
    Args::command().debug_assert();
  }

  #[test]
  fn test_flags_are_optional() {
    let args = Args::try_parse_from(["stocksearch_server", "--port", "8080"]).unwrap();
    assert_eq!(args.host, IpAddr::V4(Ipv4Addr::UNSPECIFIED));
    assert_eq!(args.port, 8080);
    assert!(!args.verbose);
  }
}

use anyhow::Context;
use clap::Parser;
use phloem_responder::{Responder, ResponderConfig};
use phloem_transport::{tcp_endpoint, zmq, ChannelOptions, ZmqPull, ZmqPush};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Mock decision endpoint for phloem
///
/// Connects to the harness' request (PUSH) and reply (PULL) sockets and
/// answers every `[id][domain][ip]` request with `[id][score][category]`.
#[derive(Parser, Debug)]
#[command(name = "phloem-responder")]
#[command(version, about = "Mock push/pull decision endpoint", long_about = None)]
struct Args {
    /// Host the harness is listening on
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port the harness sends requests on
    #[arg(long, default_value = "5555")]
    request_port: u16,

    /// Port the harness receives replies on
    #[arg(long, default_value = "5556")]
    reply_port: u16,

    /// Fixed service delay per request in microseconds
    #[arg(long, default_value = "0")]
    delay_us: u64,

    /// Fraction of requests dropped without a reply
    #[arg(long, default_value = "0.0")]
    drop_rate: f64,

    /// Seed for reproducible scores and drops
    #[arg(long)]
    seed: Option<u64>,

    /// Exit after this many requests (runs until interrupted otherwise)
    #[arg(long)]
    max_requests: Option<u64>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| level.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if !(0.0..=1.0).contains(&args.drop_rate) {
        anyhow::bail!("--drop-rate must be between 0.0 and 1.0, got {}", args.drop_rate);
    }

    let ctx = zmq::Context::new();
    let options = ChannelOptions { recv_timeout: Duration::from_millis(200), ..Default::default() };
    let request_endpoint = tcp_endpoint(&args.host, args.request_port);
    let reply_endpoint = tcp_endpoint(&args.host, args.reply_port);

    let requests = ZmqPull::connect(&ctx, &request_endpoint, &options)
        .with_context(|| format!("Cannot connect to {request_endpoint}"))?;
    let replies = ZmqPush::connect(&ctx, &reply_endpoint, &options)
        .with_context(|| format!("Cannot connect to {reply_endpoint}"))?;

    tracing::info!(
        "Responder pulling from {} and pushing to {} (delay {}us, drop rate {})",
        request_endpoint,
        reply_endpoint,
        args.delay_us,
        args.drop_rate
    );

    let config = ResponderConfig {
        delay: Duration::from_micros(args.delay_us),
        drop_rate: args.drop_rate,
        seed: args.seed,
        max_requests: args.max_requests,
    };
    let mut responder = Responder::new(requests, replies, config);
    let stats = responder.run()?;
    tracing::info!(
        "Responder finished: {} requests, {} replied, {} dropped, {} malformed",
        stats.requests,
        stats.replied,
        stats.dropped,
        stats.malformed
    );
    Ok(())
}

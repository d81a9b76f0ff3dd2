use anyhow::{anyhow, Context, Result};
use rpc_resolver::{
    listener::channel,
    lookup::HickoryLookup,
    register_all, ResolutionEvent, ResolverOptions,
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use structopt::StructOpt;
use tracing::info;

#[derive(Debug, StructOpt)]
#[structopt(name = "resolve", about = "Resolve an RPC target and print every update")]
struct Opt {
    /// Target such as `localhost:50051`, `dns:///example.com` or `ipv4:10.0.0.1`.
    target: String,

    /// Number of resolution passes to run.
    #[structopt(short, long, default_value = "1")]
    updates: usize,

    /// Seconds to wait between passes.
    #[structopt(short, long, default_value = "1")]
    interval: u64,

    /// Skip the TXT service config lookup.
    #[structopt(long)]
    no_service_config: bool,

    /// Per query timeout in seconds.
    #[structopt(short, long, default_value = "5")]
    timeout: u64,

    /// Query this DNS server instead of the system resolver.
    #[structopt(long)]
    dns_server: Option<SocketAddr>,
}

fn print_event(event: &ResolutionEvent) {
    match event {
        ResolutionEvent::Resolved {
            addresses,
            service_config,
            service_config_error,
        } => {
            for address in addresses {
                println!("{}", address);
            }
            if let Some(config) = service_config {
                println!("service config: {}", config);
            }
            if let Some(status) = service_config_error {
                println!("service config error: {}", status);
            }
        }
        ResolutionEvent::Failed(status) => println!("error: {}", status),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let _logger = flexi_logger::Logger::try_with_env_or_str("warn,rpc_resolver=info")?.start()?;

    let opt: Opt = Opt::from_args();
    register_all();

    let timeout = Duration::from_secs(opt.timeout);
    let mut options = ResolverOptions::default()
        .with_service_config(!opt.no_service_config)
        .with_query_timeout(timeout);
    if let Some(server) = opt.dns_server {
        options = options.with_lookup(Arc::new(HickoryLookup::with_server(server, timeout)));
    }

    let (listener, mut events) = channel();
    let authority = rpc_resolver::default_authority(&opt.target)?;
    let resolver = rpc_resolver::create_resolver(&opt.target, listener, options)
        .with_context(|| format!("Failed to create resolver for {}", opt.target))?;
    info!("Resolving {} (authority {})", opt.target, authority);

    for update in 0..opt.updates {
        if update > 0 {
            tokio::time::sleep(Duration::from_secs(opt.interval)).await;
        }
        resolver.update_resolution();

        // Failures are retried by the resolver itself; wait for a success.
        loop {
            let event = events
                .recv()
                .await
                .ok_or(anyhow!("Resolver stopped reporting"))?;
            print_event(&event);
            if matches!(event, ResolutionEvent::Resolved { .. }) {
                break;
            }
        }
    }

    resolver.destroy();
    Ok(())
}

use clap::Parser;
use quill_poet::{poet, Cli, HumanInputTool, OpenAiCompatProvider, PoetConfig};
use std::time::Duration;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter("quill_poet=debug,quill_bridge=debug,info")
        .init();

    let cli = Cli::parse();
    let cfg = PoetConfig::load(&cli.config)?;
    let api_key = cfg.api_key()?;
    info!("Loaded config from {:?}", cli.config);

    let channel = quill_bridge::open_channel(&cfg.server).await?;
    let bridge = channel.bridge().clone();

    info!("Waiting for server to start...");
    tokio::time::sleep(cfg.harness.warmup()).await;
    info!("Server started. Please connect to {} in your browser.", channel.url());
    if cfg.harness.open_browser {
        if let Err(e) = webbrowser::open(&channel.url()) {
            warn!("Could not open a browser: {e}");
        }
    }

    if cfg.harness.wait_for_client {
        info!("Waiting for a client to connect...");
        while !bridge.wait_for_connection(Duration::from_secs(30)).await {
            info!("Still waiting for a client at {}", channel.url());
        }
    }

    let provider = OpenAiCompatProvider::new(&cfg.llm, api_key)?;
    info!("Using model {}", provider.model());

    let tool = HumanInputTool::new(bridge.clone(), cfg.harness.answer_timeout());
    let agent = poet::poem_writer(tool).with_max_iterations(cfg.harness.max_iterations);
    let outcome = agent.run(&provider, &poet::poetry_task()).await?;
    info!("Final result:\n{}", outcome.output);
    if outcome.truncated {
        warn!("The final answer was cut off at the model's token limit");
    }

    bridge.send_question(poet::final_report(&outcome.output));
    info!("The final report has been sent to the client.");
    info!("The server will keep running. Press Ctrl+C to exit.");

    tokio::signal::ctrl_c().await?;
    info!("Exiting...");
    channel.shutdown().await;
    Ok(())
}

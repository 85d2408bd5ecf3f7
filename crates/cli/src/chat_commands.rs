//! Terminal channel: stdin lines in, replies on stdout.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use {
    anyhow::Result,
    async_trait::async_trait,
    tally_auto_reply::Router,
    tally_channels::InboundMessage,
    tally_config::TallyConfig,
    tally_service_traits::{ChannelOutbound, ServiceResult},
    tokio::io::{AsyncBufReadExt, BufReader},
    tracing::info,
};

struct ConsoleOutbound;

#[async_trait]
impl ChannelOutbound for ConsoleOutbound {
    async fn send_text(&self, _conversation_id: &str, text: &str) -> ServiceResult {
        println!("tally> {text}\n");
        Ok(())
    }
}

pub async fn run(config: &TallyConfig, address: &str) -> Result<()> {
    let stores = tally_ledger::open(&config.ledger).await?;
    let router = Router::new(config, stores.identity, stores.ledger)
        .with_outbound(Arc::new(ConsoleOutbound));
    info!(
        address,
        remote_nlu = config.nlu.is_usable(),
        "console chat ready, type \"sair\" to log out or Ctrl-D to quit"
    );

    let seq = AtomicU64::new(0);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let id = format!("console-{}", seq.fetch_add(1, Ordering::Relaxed));
        router
            .deliver(InboundMessage::text(id, address, line))
            .await;
    }
    Ok(())
}

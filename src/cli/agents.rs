//! `careflow agents`: list the agent directory, falling back to the built-in
//! agents when it is unreachable.

use std::sync::Arc;

use anyhow::Result;
use careflow_core::{
    thread_suggestions, LocalThreadProvider, OfflineTransport, RuntimeMultiplexer,
};

use crate::server::{build_directory, load_config};

pub async fn run() -> Result<()> {
    let config = load_config()?;
    let directory = build_directory(&config.agents)?;

    let multiplexer = RuntimeMultiplexer::new(
        config.agents.multiplexer_config(),
        Arc::new(OfflineTransport),
        Arc::new(LocalThreadProvider),
    );
    let loaded = multiplexer.refresh(directory.as_ref()).await;
    let active = multiplexer.active_id().await;

    if !loaded {
        println!("(directory unavailable, showing built-in agents)");
    }
    for agent in multiplexer.agents().await {
        let marker = if agent.id == active { "*" } else { " " };
        println!("{} {:<14} {}", marker, agent.id, agent.label);
        if !agent.description.is_empty() {
            println!("    {}", agent.description);
        }
        if !agent.system.is_empty() {
            println!("    system prompt: {} chars", agent.system.chars().count());
        }
    }

    println!();
    println!("Suggestions for {}:", active);
    for suggestion in thread_suggestions(&active) {
        println!("  - {} ({})", suggestion.title, suggestion.label);
    }
    Ok(())
}

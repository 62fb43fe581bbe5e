//! Checkpoint and Resume
//!
//! This example snapshots a machine halfway through a deployment and resumes
//! it in a fresh machine, as a restarted process would.
//!
//! Key concepts:
//! - Snapshots name states and transitions by path
//! - JSON for inspection, bincode for compact storage
//! - Queued transitions and events survive the round trip
//!
//! Run with: cargo run --example checkpoint_resume

use serde_json::json;
use statewalk::builder::{GraphBuilder, TransitionBuilder};
use statewalk::checkpoint::Snapshot;
use statewalk::engine::{Machine, RunMode};
use std::sync::Arc;

fn deployment() -> Result<GraphBuilder, statewalk::builder::BuildError> {
    GraphBuilder::new("deploy")
        .initial("pending")
        .final_state("live")
        .composite(
            "rollout",
            GraphBuilder::new("rollout")
                .initial("canary")
                .transition(TransitionBuilder::new().from("canary").to("fleet").trigger("healthy"))?
                .transition(
                    TransitionBuilder::new()
                        .from("fleet")
                        .to("live")
                        .pattern("^(done|finished)$"),
                )?,
        )
        .transition(TransitionBuilder::new().from("pending").to("rollout"))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Checkpoint and Resume ===\n");

    let graph = Arc::new(deployment()?.build()?);
    let mut machine = Machine::new(Arc::clone(&graph));
    machine.start(&mut (), &[])?;
    machine.transition(&mut (), "pending->rollout", vec![json!({"build": 812})])?;
    machine.run(&mut (), RunMode::Single)?;
    machine.event("healthy").event("finished");

    let snapshot = machine.to_snapshot();
    let json = snapshot.to_json()?;
    let bytes = snapshot.to_bytes()?;
    println!("Snapshot at {:?}", snapshot.active_state);
    println!("JSON: {} bytes, binary: {} bytes\n", json.len(), bytes.len());
    println!("{json}\n");

    // A different process builds the same definition and resumes.
    let rebuilt = Arc::new(deployment()?.build()?);
    let mut resumed = Machine::new(rebuilt);
    resumed.restore(&Snapshot::from_bytes(&bytes)?)?;
    println!("Resumed at {:?}", resumed.active_path());

    resumed.run_events(&mut ())?;
    println!("Finished at {:?}, at end: {}", resumed.active_path(), resumed.at_end());

    Ok(())
}

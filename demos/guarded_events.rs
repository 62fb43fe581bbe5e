//! Guarded Events
//!
//! This example walks an order through a hierarchical statechart.
//!
//! Key concepts:
//! - Named behaviors answered by a `Handlers` context
//! - Guards choosing between transitions that share a trigger
//! - A composite `fulfilment` state with its own start state
//! - Validation and history inspection
//!
//! Run with: cargo run --example guarded_events

use serde_json::json;
use statewalk::builder::{GraphBuilder, StateBuilder, TransitionBuilder};
use statewalk::core::Action;
use statewalk::engine::{Handlers, Machine};
use statewalk::validation::validate;
use statewalk::MachineError;
use std::sync::Arc;

// Order data the behaviors read and update
#[derive(Debug, Default)]
struct Order {
    total: u64,
    log: Vec<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Guarded Events ===\n");

    let graph = GraphBuilder::new("order")
        .initial("cart")
        .final_state("closed")
        .option(Action::Entry, "announce")
        .state(StateBuilder::new("review").entry("flag_for_review"))
        .composite(
            "fulfilment",
            GraphBuilder::new("fulfilment")
                .initial("picking")
                .transition(TransitionBuilder::new().from("picking").to("packed").trigger("pack"))?
                .transition(TransitionBuilder::new().from("packed").to("closed").trigger("ship"))?,
        )
        .transition(
            TransitionBuilder::new()
                .from("cart")
                .to("fulfilment")
                .name("auto_approve")
                .trigger("checkout")
                .guard("is_small"),
        )?
        .transition(
            TransitionBuilder::new()
                .from("cart")
                .to("review")
                .trigger("checkout")
                .guard("is_large"),
        )?
        .transition(
            TransitionBuilder::new()
                .from("review")
                .to("fulfilment")
                .trigger("approve"),
        )?
        .build()?;

    let findings = validate(&graph, graph.root());
    println!("Validation findings: {}", findings.len());
    for finding in &findings {
        println!("  - {finding}");
    }

    let mut ctx = Handlers::new(Order::default())
        .on("announce", |cx, _, state, _| {
            cx.state.log.push(format!("entered {}", state.name()));
            Ok(None)
        })
        .on("flag_for_review", |cx, _, _, _| {
            cx.state.log.push(format!("order of {} needs review", cx.state.total));
            Ok(None)
        })
        .on("is_small", |cx, _, _, _| Ok(Some(cx.state.total < 1000)))
        .on("is_large", |cx, _, _, _| Ok(Some(cx.state.total >= 1000)));

    let graph = Arc::new(graph);
    for total in [120, 4500] {
        ctx.state = Order {
            total,
            log: Vec::new(),
        };
        let mut machine = Machine::new(Arc::clone(&graph));
        machine.start(&mut ctx, &[json!(total)])?;
        machine.event("checkout").event("approve").event("pack").event("ship");

        match machine.run_events(&mut ctx) {
            Ok(outcome) => println!("\nOrder {total}: fired {} transitions", outcome.fired()),
            Err(MachineError::UnhandledEvent { message, event, .. }) => {
                println!("\nOrder {total}: stopped at '{event}': {message}");
                // small orders skip review; the events behind `approve` are still queued
                machine.run_events(&mut ctx)?;
            }
            Err(err) => return Err(err.into()),
        }

        for line in &ctx.state.log {
            println!("  {line}");
        }
        let path: Vec<String> = machine
            .history()
            .path()
            .into_iter()
            .map(|s| machine.graph().path_of_state(s))
            .collect();
        println!("  path: {}", path.join(" -> "));
        println!("  at end: {}", machine.at_end());
    }

    Ok(())
}

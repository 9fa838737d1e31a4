//! Counter State Machine
//!
//! This example demonstrates a guarded transition, a protected counter that
//! only changes through transitions, and a consumer thread reading the
//! notification stream.
//!
//! Key concepts:
//! - Guards reading mutable context
//! - Self-transitions with a context updater
//! - Error hooks that send follow-up events
//! - Draining notifications until the terminal record
//!
//! Run with: RUST_LOG=latch=debug cargo run --example counter

use latch::builder::MachineBuilder;
use latch::core::{ContextDecl, ContextUpdate, ContextValue};
use latch::engine::{StateNode, Transition};
use latch::identifiers;
use std::thread;

identifiers! {
    enum Mode {
        Inactive,
        Active,
    }
}

identifiers! {
    enum Signal {
        Activate,
        Deactivate,
        Increment,
        Fail,
    }
}

identifiers! {
    enum Key {
        Counter,
        IsReady,
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("=== Counter State Machine ===\n");

    let machine = MachineBuilder::new("counterExample")
        .initial(Mode::Inactive)
        .context(ContextDecl::protected(Key::Counter, 0))
        .context(ContextDecl::mutable(Key::IsReady, false))
        .events(Signal::ALL.iter().copied())
        .state(
            Mode::Inactive,
            StateNode::new().on(
                Signal::Activate,
                Transition::to(Mode::Active)
                    .guard(|scope, _, _| {
                        scope
                            .get(&Key::IsReady)
                            .ok()
                            .and_then(ContextValue::as_bool)
                            .unwrap_or(false)
                    })
                    .exit(|scope, _, _, _| {
                        let _ = scope.set(&Key::IsReady, false);
                    })
                    .entry(|scope, from, to, _| {
                        println!(
                            "  entry hook: left {} and entered {}",
                            scope.state_name(from),
                            scope.state_name(to)
                        );
                    }),
            ),
        )
        .state(
            Mode::Active,
            StateNode::new()
                .on(
                    Signal::Increment,
                    Transition::to(Mode::Active).update(|scope, _, _, _| {
                        let count = scope.get(&Key::Counter)?.as_int().unwrap_or(0);
                        Ok(ContextUpdate::single(Key::Counter, count + 1))
                    }),
                )
                .on(
                    Signal::Fail,
                    Transition::to(Mode::Active)
                        .update(|_, _, _, _| Err("counter overflowed".into())),
                )
                .on(Signal::Deactivate, Transition::to(Mode::Inactive))
                .on_error(|machine, current, _, error| {
                    println!(
                        "  error hook in {}: {error}",
                        machine.state_name(current)
                    );
                    let _ = machine.send_event(Signal::Deactivate);
                }),
        )
        .on_error(|machine, current, _, error| {
            println!(
                "  machine error hook in {}: {error}",
                machine.state_name(current)
            );
        })
        .build()
        .expect("counter definition is valid");

    machine.add_state_names(Mode::name_table());
    machine.add_event_names(Signal::name_table());
    machine.add_context_key_names(Key::name_table());

    let subscription = machine.subscribe();
    let consumer = thread::spawn(move || {
        for change in subscription {
            if change.is_last {
                println!("  [notify #{}] stopped in {:?}", change.seq, change.to);
            } else {
                println!(
                    "  [notify #{}] {:?} -> {:?} on {:?}",
                    change.seq, change.from, change.to, change.cause
                );
            }
        }
    });

    println!("Activate before ready: {:?}", machine.send_event(Signal::Activate));
    machine
        .set(&Key::IsReady, true)
        .expect("IsReady is mutable");
    println!("Activate when ready:   {:?}", machine.send_event(Signal::Activate));

    for _ in 0..3 {
        let _ = machine.send_event(Signal::Increment);
    }
    println!("Counter after three increments: {:?}", machine.get(&Key::Counter));
    println!("Writing the counter directly:   {:?}", machine.set(&Key::Counter, 99));

    println!("\nA failing update deactivates the machine:");
    let _ = machine.send_event(Signal::Fail);
    println!("Current state: {:?}\n", machine.current_state());

    machine.stop();
    consumer.join().expect("consumer thread panicked");

    println!("\n=== Example Complete ===");
}

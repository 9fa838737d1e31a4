//! Concurrent event submission against one shared machine.

use latch::core::{ContextDecl, ContextUpdate};
use latch::engine::{Machine, StateNode, Transition};
use latch::{MachineBuilder, NotifyPolicy, StateChange};
use std::sync::Arc;
use std::thread;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
enum Phase {
    Idle,
    Counting,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
enum Op {
    Begin,
    Bump,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
enum Key {
    Total,
}

type Tally = Machine<Phase, Op, Key>;

const THREADS: usize = 8;
const BUMPS_PER_THREAD: usize = 250;

fn tally(capacity: usize, policy: NotifyPolicy) -> Arc<Tally> {
    let machine = MachineBuilder::new("tally")
        .channel_capacity(capacity)
        .notify_policy(policy)
        .initial(Phase::Idle)
        .context(ContextDecl::protected(Key::Total, 0))
        .events([Op::Begin, Op::Bump])
        .state(
            Phase::Idle,
            StateNode::new().on(Op::Begin, Transition::to(Phase::Counting)),
        )
        .state(
            Phase::Counting,
            StateNode::new().on(
                Op::Bump,
                Transition::to(Phase::Counting).update(|scope, _, _, _| {
                    let total = scope.get(&Key::Total)?.as_int().unwrap_or(0);
                    Ok(ContextUpdate::single(Key::Total, total + 1))
                }),
            ),
        )
        .on_error(|_, _, _, _| {})
        .build()
        .unwrap();
    Arc::new(machine)
}

fn assert_ordered(changes: &[StateChange<Phase, Op>]) {
    for pair in changes.windows(2) {
        assert_eq!(pair[0].seq + 1, pair[1].seq);
    }
}

#[test]
fn parallel_bumps_are_never_lost() {
    let expected = THREADS * BUMPS_PER_THREAD;
    let machine = tally(expected + 1, NotifyPolicy::Block);
    assert_eq!(machine.send_event(Op::Begin), Ok(true));

    let workers: Vec<_> = (0..THREADS)
        .map(|_| {
            let machine = Arc::clone(&machine);
            thread::spawn(move || {
                for _ in 0..BUMPS_PER_THREAD {
                    assert_eq!(machine.send_event(Op::Bump), Ok(true));
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(
        machine.get(&Key::Total).unwrap().as_int(),
        Some(expected as i64)
    );

    let changes = machine.subscribe().drain();
    assert_eq!(changes.len(), expected + 1);
    assert_ordered(&changes);
}

#[test]
fn readers_never_see_partial_transitions() {
    let machine = tally(16, NotifyPolicy::DropWhenFull);
    machine.send_event(Op::Begin).unwrap();

    let writer = {
        let machine = Arc::clone(&machine);
        thread::spawn(move || {
            for _ in 0..1_000 {
                machine.send_event(Op::Bump).unwrap();
            }
        })
    };

    let mut last = 0;
    while !writer.is_finished() {
        let total = machine.get(&Key::Total).unwrap().as_int().unwrap_or(-1);
        assert!(total >= last);
        assert_eq!(machine.current_state(), Phase::Counting);
        last = total;
    }
    writer.join().unwrap();

    assert_eq!(machine.get(&Key::Total).unwrap().as_int(), Some(1_000));
    assert!(machine.dropped_changes() > 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn blocking_channel_with_live_consumer() {
    let expected = THREADS * BUMPS_PER_THREAD;
    // Far smaller than the number of commits: producers rely on the consumer.
    let machine = tally(4, NotifyPolicy::Block);
    machine.send_event(Op::Begin).unwrap();

    let consumer = {
        let subscription = machine.subscribe();
        tokio::task::spawn_blocking(move || subscription.collect::<Vec<_>>())
    };

    let producers: Vec<_> = (0..THREADS)
        .map(|_| {
            let machine = Arc::clone(&machine);
            tokio::task::spawn_blocking(move || {
                for _ in 0..BUMPS_PER_THREAD {
                    machine.send_event(Op::Bump).unwrap();
                }
            })
        })
        .collect();
    for producer in producers {
        producer.await.unwrap();
    }
    machine.stop();

    let changes = consumer.await.unwrap();
    assert_eq!(changes.len(), expected + 2);
    assert!(changes.last().unwrap().is_last);
    assert_eq!(changes.iter().filter(|c| c.is_last).count(), 1);
    assert_ordered(&changes);

    let bumps = changes
        .iter()
        .filter(|c| c.cause == Some(Op::Bump))
        .count();
    assert_eq!(bumps, expected);
    assert_eq!(
        machine.get(&Key::Total).unwrap().as_int(),
        Some(expected as i64)
    );
}

use futures_lite::{future::block_on, stream, StreamExt};
use gate_stream::{
    prelude::*,
    shared::{self, SharedGate},
};
use std::{thread, time::Instant};

fn main() {
    let runs: u32 = 10_000_000;
    let events = stream::iter((0..runs).map(|i| i % 3 != 2));
    let t = Instant::now();
    let unlocked = block_on(events.gate().fold(0u32, |n, locked| n + !locked as u32));
    println!(
        "cost of folding an event through a gated stream: {:#?} ({} unlocked states)",
        t.elapsed() / runs,
        unlocked
    );

    let mut gate = GateAccumulator::new();
    let t = Instant::now();
    for i in 0..runs {
        gate.fold(i % 2 == 0);
    }
    println!(
        "cost of folding an event directly: {:#?} (balance {})",
        t.elapsed() / runs,
        gate.balance()
    );

    let runs_per_thread: u32 = 1_000_000;
    let nr_threads = 4;
    let gate = SharedGate::new();
    let t = Instant::now();
    let threads: Vec<_> = (0..nr_threads)
        .map(|_| {
            let gate = gate.clone();
            thread::spawn(move || {
                for i in 0..runs_per_thread {
                    gate.fold(i % 2 == 0);
                }
            })
        })
        .collect();
    for handle in threads {
        handle.join().unwrap();
    }
    println!(
        "cost of folding an event into a contended shared gate: {:#?}",
        t.elapsed() / (runs_per_thread * nr_threads)
    );

    let (sender, receiver) = shared::bounded(1024);
    let t = Instant::now();
    let threads: Vec<_> = (0..nr_threads)
        .map(|_| {
            let sender = sender.clone();
            thread::spawn(move || {
                for i in 0..runs_per_thread {
                    block_on(sender.send(i % 2 == 0)).unwrap();
                }
            })
        })
        .collect();
    drop(sender);
    let states = block_on(receiver.count());
    for handle in threads {
        handle.join().unwrap();
    }
    println!(
        "cost of folding an event through a gate channel: {:#?} ({} states)",
        t.elapsed() / (runs_per_thread * nr_threads),
        states
    );
}

use futures_lite::{future::block_on, StreamExt};
use gate_stream::shared::{GateChannelBuilder, SharedGate};
use std::thread;
use tracing_subscriber::EnvFilter;

fn main() {
    let _ = tracing_subscriber::fmt::fmt()
        .with_env_filter(EnvFilter::from_env("GATE_STREAM_TRACE"))
        .try_init();

    let nr_producers = 4;
    let (sender, mut receiver) = GateChannelBuilder::new()
        .capacity(Some(64))
        .name("workers")
        .build();

    let producers: Vec<_> = (0..nr_producers)
        .map(|i| {
            let sender = sender.clone();
            thread::spawn(move || {
                block_on(async {
                    sender.send(true).await.unwrap();
                    println!("[Producer {i}] acquired");
                    sender.send(false).await.unwrap();
                    println!("[Producer {i}] released");
                })
            })
        })
        .collect();
    drop(sender);

    block_on(async {
        let mut transitions = 0;
        let mut previous = true;
        while let Some(locked) = receiver.next().await {
            if locked != previous {
                transitions += 1;
                previous = locked;
            }
        }
        println!(
            "Main: {} transitions, final balance {}",
            transitions,
            receiver.balance()
        );
    });

    for producer in producers {
        producer.join().unwrap();
    }

    let gate = SharedGate::new();
    let threads: Vec<_> = (0..nr_producers)
        .map(|_| {
            let gate = gate.clone();
            thread::spawn(move || {
                gate.fold(true);
                gate.fold(false)
            })
        })
        .collect();
    for t in threads {
        t.join().unwrap();
    }
    println!(
        "Main: shared gate balance {}, locked {}",
        gate.balance(),
        gate.is_locked()
    );
}

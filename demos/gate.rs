use futures_lite::{future::block_on, StreamExt};
use gate_stream::{prelude::*, subject::LocalSubject};
use tracing_subscriber::EnvFilter;

fn main() {
    let _ = tracing_subscriber::fmt::fmt()
        .with_env_filter(EnvFilter::from_env("GATE_STREAM_TRACE"))
        .try_init();

    let requests = LocalSubject::<GateError>::new();
    let operator = GateOperator::new();
    let mut door = operator.try_apply(requests.subscribe());

    block_on(async {
        let events = [true, true, false, false, false, true];
        for (i, event) in events.into_iter().enumerate() {
            requests.next(event).unwrap();
            let locked = door.next().await.unwrap().unwrap();
            let request = if event { "acquire" } else { "release" };
            let state = if locked { "locked" } else { "unlocked" };
            println!("[Request {i}] {request}: gate is {state}");
        }

        println!("Main: late subscriber joins");
        let mut late = operator.try_apply(requests.subscribe());
        requests.next(true).unwrap();
        println!(
            "Main: first subscriber sees locked={:?}, late subscriber sees locked={:?}",
            door.next().await,
            late.next().await
        );

        println!("Main: completing the request stream");
        requests.complete();
        assert!(door.next().await.is_none());
        assert!(late.next().await.is_none());
        println!("Main: {} subscriptions served", operator.subscriptions());
    })
}

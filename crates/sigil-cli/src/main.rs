use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use sigil_core::{
    CallArgs, Consumer, FireOptions, HandlerEntry, HandlerFn, InMemoryBackend, Signal,
};
use tokio::time::sleep;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // (A) A signal with a dependent event chain: report needs parse, parse
    //     needs fetch.
    let signal = Signal::named("pipeline");
    signal.register(
        HandlerEntry::new(HandlerFn::from_sync(|input: CallArgs| {
            let url = input.args.first().cloned().unwrap_or(json!("(none)"));
            println!("fetch: {url}");
            Ok(json!({ "body": "raw bytes", "from": url }))
        }))
        .for_event("fetch"),
    );
    signal.register(
        HandlerEntry::new(HandlerFn::from_sync(|input: CallArgs| {
            println!("parse: {} upstream result(s)", input.args.len());
            Ok(json!({ "records": 3 }))
        }))
        .for_event("parse")
        .depends_on(["fetch"]),
    );
    signal.register(
        HandlerEntry::new(HandlerFn::from_sync(|input: CallArgs| {
            println!("report: building from {:?}", input.args);
            Ok(json!("report ready"))
        }))
        .for_event("report")
        .depends_on(["parse"]),
    );

    // (B) Chained fire: firing "report" walks fetch -> parse -> report,
    //     feeding each step's results into the next.
    let results = signal
        .fire(
            FireOptions::event("report")
                .chained()
                .arg(json!("https://example.com/data")),
        )
        .expect("dependency graph is acyclic");
    println!("chained fire returned: {results:?}\n");

    // (C) Deferred firing through the queue backend.
    let backend = Arc::new(InMemoryBackend::new());
    signal.set_backend(backend.clone());
    let consumer = Consumer::new(backend).spawn();

    signal.register(
        HandlerEntry::new(HandlerFn::from_async(|input: CallArgs| async move {
            sleep(Duration::from_millis(50)).await;
            Ok(json!({ "queued": true, "args": input.args }))
        }))
        .for_event("background"),
    );
    signal.register(
        HandlerEntry::new(HandlerFn::from_async(|_| async {
            // long enough that cancellation always wins
            sleep(Duration::from_secs(30)).await;
            Ok(json!("never seen"))
        }))
        .for_event("background"),
    );

    let handles = signal
        .enqueue(FireOptions::event("background").arg(json!(42)))
        .await
        .expect("backend is configured");
    println!("enqueued {} jobs", handles.len());

    // Cancel the slow one, await the other.
    handles[1].cancel().await;
    println!("job {} -> {:?}", handles[0].id(), handles[0].result().await);
    println!("job {} -> {:?}", handles[1].id(), handles[1].result().await);

    consumer.shutdown_and_join().await;
}

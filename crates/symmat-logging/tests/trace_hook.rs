use std::sync::{Arc, Mutex};
use symmat_logging::{init_logging, set_trace_hook, LoggingOptions, TraceEvent};

#[test]
fn spans_and_events_reach_the_trace_hook() {
    let captured: Arc<Mutex<Vec<TraceEvent>>> = Arc::new(Mutex::new(Vec::new()));
    let hook = {
        let c = captured.clone();
        move |events: &[TraceEvent]| {
            c.lock().unwrap().extend_from_slice(events);
        }
    };
    set_trace_hook(hook);
    let _guard = init_logging(LoggingOptions {
        filter: Some("info".to_string()),
        enable_traces: true,
        pid: 7,
    });

    {
        let span = tracing::info_span!("determinant");
        let _enter = span.enter();
        tracing::info!(rows = 2u64, "inside span");
    }

    let items = captured.lock().unwrap();
    let phases: Vec<_> = items
        .iter()
        .filter(|e| e.name == "determinant")
        .map(|e| e.ph.as_str())
        .collect();
    assert_eq!(phases, vec!["B", "E"]);

    let event = items
        .iter()
        .find(|e| e.name == "inside span")
        .expect("instant event");
    assert_eq!(event.ph, "i");
    assert_eq!(event.pid, Some(7));
    let rows = event
        .args
        .as_ref()
        .and_then(|a| a.get("rows"))
        .and_then(|v| v.as_u64());
    assert_eq!(rows, Some(2));
}

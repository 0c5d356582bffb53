use std::sync::{Arc, Mutex};
use symmat_logging::{init_logging, set_log_hook, LogRecord, LoggingOptions};

#[test]
fn log_records_reach_the_hook() {
    let captured: Arc<Mutex<Vec<LogRecord>>> = Arc::new(Mutex::new(Vec::new()));
    let hook = {
        let c = captured.clone();
        move |rec: &LogRecord| {
            c.lock().unwrap().push(rec.clone());
        }
    };
    set_log_hook(hook);
    let _guard = init_logging(LoggingOptions {
        filter: Some("debug".to_string()),
        enable_traces: false,
        pid: 1,
    });

    log::debug!(target: "symmat_probe", "built node n={}", 3);
    log::trace!(target: "symmat_probe", "filtered out");

    let items = captured.lock().unwrap();
    let probe: Vec<_> = items.iter().filter(|r| r.target == "symmat_probe").collect();
    assert_eq!(probe.len(), 1);
    assert_eq!(probe[0].message, "built node n=3");
    assert_eq!(probe[0].level, "DEBUG");
    assert!(probe[0].trace_id.is_some());
    assert!(probe[0].to_json_line().contains("built node n=3"));
}

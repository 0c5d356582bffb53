use std::sync::{Arc, Mutex};
use symmat_logging::{set_log_hook, LogRecord};
use symmat_matrix::{HilbertMatrix, LoggingConfig, SymmatConfig};

#[test]
fn node_construction_is_logged() {
    let captured: Arc<Mutex<Vec<LogRecord>>> = Arc::new(Mutex::new(Vec::new()));
    let hook = {
        let c = captured.clone();
        move |rec: &LogRecord| {
            c.lock().unwrap().push(rec.clone());
        }
    };
    set_log_hook(hook);

    let config = SymmatConfig {
        logging: LoggingConfig {
            filter: Some("symmat_matrix=debug".to_string()),
            traces: false,
        },
        ..Default::default()
    };
    let _guard = config.init_logging();

    let h = HilbertMatrix::new(3).unwrap();
    let _ = h.inverse();
    let _ = h.entry(0, 0);

    let items = captured.lock().unwrap();
    let messages: Vec<&str> = items
        .iter()
        .filter(|r| r.target == "symmat_matrix::hilbert")
        .map(|r| r.message.as_str())
        .collect();
    assert!(messages.contains(&"HilbertMatrix(3) constructed"), "{messages:?}");
    assert!(messages.contains(&"HilbertMatrix(3) -> InverseHilbertMatrix"));
    // Entry construction logs at trace, below the configured level
    assert!(!messages.iter().any(|m| m.contains("entry")));
}

use std::sync::{Arc, Mutex};
use symmat_logging::{set_trace_hook, TraceEvent};
use symmat_matrix::{HilbertMatrix, LoggingConfig, MatExpr, SymmatConfig};
use symmat_symbolic::SymExpr;

#[test]
fn matrix_operations_open_spans() {
    let captured: Arc<Mutex<Vec<TraceEvent>>> = Arc::new(Mutex::new(Vec::new()));
    let hook = {
        let c = captured.clone();
        move |events: &[TraceEvent]| {
            c.lock().unwrap().extend_from_slice(events);
        }
    };
    set_trace_hook(hook);

    let config = SymmatConfig {
        logging: LoggingConfig {
            filter: Some("symmat_matrix=trace,symmat_symbolic=info".to_string()),
            traces: true,
        },
        ..Default::default()
    };
    let _guard = config.init_logging();

    let h = HilbertMatrix::new(2).unwrap();
    let det = h.determinant();
    assert_eq!(det.doit().unwrap(), SymExpr::rational(1, 12));

    let product = (MatExpr::from(h.clone()) * MatExpr::from(h.inverse())).unwrap();
    assert_eq!(product.get(0, 1).unwrap(), SymExpr::int(0));
    let _ = product.doit();

    let items = captured.lock().unwrap();
    let phases = |name: &str| -> Vec<String> {
        items
            .iter()
            .filter(|e| e.name == name)
            .map(|e| e.ph.clone())
            .collect()
    };

    assert_eq!(phases("matrix.determinant"), vec!["B", "E"]);
    assert_eq!(phases("symbolic.doit"), vec!["B", "E"]);
    // Product entries recurse over the remaining factors, so spans nest
    let entry = phases("matrix.matmul.entry");
    assert!(!entry.is_empty());
    assert_eq!(entry.first().map(String::as_str), Some("B"));
    assert_eq!(
        entry.iter().filter(|ph| *ph == "B").count(),
        entry.iter().filter(|ph| *ph == "E").count()
    );
    assert_eq!(phases("matrix.doit"), vec!["B", "E"]);

    let det_span = items
        .iter()
        .find(|e| e.name == "matrix.determinant")
        .expect("determinant span");
    assert_eq!(det_span.cat, "symmat_matrix::hilbert");
    assert!(items.iter().all(|e| e.pid == Some(std::process::id() as i64)));
}

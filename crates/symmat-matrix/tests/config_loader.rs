use once_cell::sync::Lazy;
use std::env;
use std::sync::Mutex;
use symmat_matrix::{
    ConfigLoader, ExplicitConfig, HilbertMatrix, MatExpr, MatrixError, SymmatConfig,
};
use tempfile::TempDir;

static ENV_GUARD: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

const VARS: [&str; 5] = [
    "SYMMAT_CONFIG",
    "SYMMAT_MAX_TERMS",
    "SYMMAT_MAX_EXPLICIT_DIM",
    "SYMMAT_LOG",
    "SYMMAT_TRACES",
];

fn clear_env() {
    for var in VARS {
        env::remove_var(var);
    }
}

#[test]
fn round_trip_every_format() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = SymmatConfig::default();
    config.evaluation.max_terms = 500;
    config.explicit.max_dim = 3;
    config.logging.filter = Some("warn".to_string());

    for name in ["config.toml", "config.yaml", "config.json"] {
        let path = temp_dir.path().join(name);
        ConfigLoader::save_to_file(&config, &path).unwrap();
        let loaded = ConfigLoader::load_from_file(&path).unwrap();
        assert_eq!(loaded, config, "{name}");
    }
}

#[test]
fn explicit_override_file_and_environment() {
    let _lock = ENV_GUARD.lock().unwrap();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("symmat.toml");
    std::fs::write(&path, "[explicit]\nmax_dim = 2\n\n[evaluation]\nmax_terms = 10\n").unwrap();

    env::set_var("SYMMAT_CONFIG", &path);
    let config = ConfigLoader::load().unwrap();
    assert_eq!(config.explicit.max_dim, 2);
    assert_eq!(config.evaluation.max_terms, 10);

    env::set_var("SYMMAT_MAX_TERMS", "77");
    env::set_var("SYMMAT_MAX_EXPLICIT_DIM", "not a number");
    env::set_var("SYMMAT_TRACES", "yes");
    env::set_var("SYMMAT_LOG", "symmat_matrix=trace");
    let config = ConfigLoader::load().unwrap();
    assert_eq!(config.evaluation.max_terms, 77);
    assert_eq!(config.explicit.max_dim, 2);
    assert!(config.logging.traces);
    assert_eq!(config.logging.filter.as_deref(), Some("symmat_matrix=trace"));

    clear_env();
}

#[test]
fn unreadable_file_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("broken.json");
    std::fs::write(&path, "{ not json").unwrap();
    let err = ConfigLoader::load_from_file(&path).unwrap_err();
    assert!(err.to_string().contains("Failed to parse JSON config"));
}

#[test]
fn configured_limits_apply() {
    let config: SymmatConfig = toml::from_str("[explicit]\nmax_dim = 2\n").unwrap();
    let h: MatExpr = HilbertMatrix::new(3).unwrap().into();
    assert!(matches!(
        h.as_explicit_with(&config.explicit),
        Err(MatrixError::TooLarge { limit: 2, .. })
    ));
    assert!(h.as_explicit_with(&ExplicitConfig { max_dim: 3 }).is_ok());

    let det = h.determinant().unwrap();
    let tight = symmat_symbolic::EvalOptions { max_terms: 3 };
    assert!(det.doit_with(&tight).is_err());
    assert!(det.doit_with(&config.evaluation.to_eval_options()).is_ok());
}

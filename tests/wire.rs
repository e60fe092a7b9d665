//! Compatibility of the JSON surface consumed and produced by external
//! tooling: configuration documents in, evaluation records back in through
//! `tell`, and stable field names throughout.

use arqon::{ConfigError, EvalTrace, Scale, Solver, SolverConfig};

const CONFIG_DOC: &str = r#"{
    "seed": 2024,
    "budget": 30,
    "bounds": {
        "learning_rate": {"min": 0.0001, "max": 0.1},
        "momentum": {"min": 0.0, "max": 1.0},
        "phase": {"min": 0.0, "max": 6.2831853, "scale": "Periodic"}
    },
    "probe_ratio": 0.3
}"#;

#[test]
fn test_config_document_round_trip() {
    let config = SolverConfig::from_json(CONFIG_DOC).unwrap();
    assert_eq!(config.dims(), 3);
    assert_eq!(config.bounds["phase"].scale, Scale::Periodic);
    assert_eq!(config.probe_n(), 9);

    let doc = config.to_json().unwrap();
    let back = SolverConfig::from_json(&doc).unwrap();
    assert_eq!(back.bounds, config.bounds);

    // Bound order is part of the wire contract.
    let names: Vec<&str> = back.bounds.keys().map(String::as_str).collect();
    assert_eq!(names, ["learning_rate", "momentum", "phase"]);
}

#[test]
fn test_scale_names_are_case_sensitive() {
    let doc = CONFIG_DOC.replace("Periodic", "periodic");
    assert!(matches!(
        SolverConfig::from_json(&doc),
        Err(ConfigError::Parse(_))
    ));
}

#[test]
fn test_externally_produced_results_flow_through_tell() {
    let mut solver = Solver::from_json(CONFIG_DOC).unwrap();
    let batch = solver.ask().unwrap();
    assert_eq!(batch.len(), 9);

    // Round-trip each reported record through JSON, as a remote evaluation
    // service would.
    let results: Vec<EvalTrace> = batch
        .into_iter()
        .enumerate()
        .map(|(i, params)| {
            let value = params["learning_rate"] + params["momentum"];
            let record = serde_json::json!({
                "eval_id": i as u64,
                "params": params,
                "value": value,
                "cost": 0.25
            });
            serde_json::from_value(record).unwrap()
        })
        .collect();
    solver.tell(results).unwrap();
    assert_eq!(solver.history_len(), 9);

    // A pruned record arrives with the explicit wire flag.
    let next = solver.ask().unwrap();
    let doc = serde_json::json!({
        "eval_id": 100,
        "params": &next[0],
        "value": 0.5,
        "pruned": true
    });
    let trace: EvalTrace = serde_json::from_value(doc).unwrap();
    solver.tell(vec![trace]).unwrap();
    assert_eq!(solver.history_len(), 9);
    assert_eq!(solver.history().len(), 10);
}

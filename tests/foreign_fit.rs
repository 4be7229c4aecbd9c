use std::cell::RefCell;
use std::ffi::{c_char, CString};
use std::sync::Arc;
use symbind::config::Hyperparameters;
use symbind::ffi::{invoke_predict, Engine, ForeignEngine};
use symbind::marshal::{ForeignMatrix, ForeignSlice, ForeignSliceMut, ForeignStr, RawMatrix, RawStrList};
use symbind::{evaluate, Estimator, Matrix, SymbindError};

/// Everything the stub engine saw on its last fit call.
#[derive(Debug, Clone, Default)]
struct Captured {
    x: Vec<Vec<f64>>,
    y: Vec<f64>,
    names: Vec<String>,
    floats: Vec<f64>,
    ints: Vec<i64>,
    texts: Vec<String>,
    verbose: bool,
}

thread_local! {
    static LAST_FIT: RefCell<Option<Captured>> = RefCell::new(None);
    static PROGRAM: RefCell<Option<String>> = RefCell::new(Some("mul(X0, 2)".to_string()));
}

fn last_fit() -> Captured {
    LAST_FIT.with(|c| c.borrow().clone()).expect("fit was not called")
}

fn returns(program: Option<&str>) {
    PROGRAM.with(|p| *p.borrow_mut() = program.map(str::to_string));
}

#[allow(clippy::too_many_arguments)]
unsafe extern "C" fn stub_fit(
    x: RawMatrix<'_>,
    y: ForeignSlice<'_>,
    x_names: RawStrList<'_>,
    const_max: f64,
    const_min: f64,
    eval_metric: ForeignStr<'_>,
    funcs: ForeignStr<'_>,
    loss_metric: ForeignStr<'_>,
    max_height: i64,
    min_height: i64,
    n_generations: i64,
    n_populations: i64,
    n_rounds: i64,
    p_constant: f64,
    p_full: f64,
    p_hoist_mutation: f64,
    p_point_mutation: f64,
    p_subtree_crossover: f64,
    p_subtree_mutation: f64,
    p_terminal: f64,
    parsimony_coeff: f64,
    point_mutation_rate: f64,
    population_size: i64,
    seed: i64,
    tuning_n_generations: i64,
    verbose: bool,
) -> *mut c_char {
    let captured = Captured {
        x: x.rows().iter().map(|r| r.as_slice().to_vec()).collect(),
        y: y.as_slice().to_vec(),
        names: x_names.entries().iter().map(|s| s.as_str().to_string()).collect(),
        floats: vec![
            const_max,
            const_min,
            p_constant,
            p_full,
            p_hoist_mutation,
            p_point_mutation,
            p_subtree_crossover,
            p_subtree_mutation,
            p_terminal,
            parsimony_coeff,
            point_mutation_rate,
        ],
        ints: vec![
            max_height,
            min_height,
            n_generations,
            n_populations,
            n_rounds,
            population_size,
            seed,
            tuning_n_generations,
        ],
        texts: vec![
            eval_metric.as_str().to_string(),
            funcs.as_str().to_string(),
            loss_metric.as_str().to_string(),
        ],
        verbose,
    };
    LAST_FIT.with(|c| *c.borrow_mut() = Some(captured));

    match PROGRAM.with(|p| p.borrow().clone()) {
        Some(program) => CString::new(program).unwrap().into_raw(),
        None => std::ptr::null_mut(),
    }
}

/// Doubles the first feature, adding whatever the output slot already held.
unsafe extern "C" fn stub_predict(x: RawMatrix<'_>, predict_proba: bool, y_pred: ForeignSliceMut<'_>) {
    let mut y_pred = y_pred;
    let feature = x.rows()[0].as_slice();
    for (out, v) in y_pred.as_mut_slice().iter_mut().zip(feature) {
        *out = if predict_proba { 0.5 } else { *out + 2.0 * v };
    }
}

unsafe extern "C" fn stub_free(text: *mut c_char) {
    drop(CString::from_raw(text));
}

fn stub_engine() -> Arc<ForeignEngine> {
    Arc::new(ForeignEngine::from_symbols(
        stub_fit,
        Some(stub_predict),
        Some(stub_free),
    ))
}

fn dataset() -> (Matrix, Vec<f64>) {
    let x = Matrix::new(vec![vec![0.0, 10.0], vec![1.0, 11.0], vec![2.0, 12.0]]).unwrap();
    (x, vec![0.0, 2.0, 4.0])
}

#[test]
fn test_arguments_arrive_in_order() {
    returns(Some("mul(X0, 2)"));
    let hp = Hyperparameters {
        const_max: 3.0,
        const_min: -2.0,
        eval_metric: "rmse".to_string(),
        funcs: "sum,sub,mul,div".to_string(),
        loss_metric: "mse".to_string(),
        max_height: 5,
        min_height: 2,
        n_generations: 11,
        n_populations: 3,
        n_rounds: 4,
        p_constant: 0.1,
        p_full: 0.2,
        p_hoist_mutation: 0.3,
        p_point_mutation: 0.4,
        p_subtree_crossover: 0.5,
        p_subtree_mutation: 0.6,
        p_terminal: 0.7,
        parsimony_coeff: 0.01,
        point_mutation_rate: 0.8,
        population_size: 42,
        seed: Some(1234),
        tuning_n_generations: 9,
        verbose: true,
    };
    let mut estimator = Estimator::new(hp, stub_engine());
    let (x, y) = dataset();
    let names = vec!["a".to_string(), "b".to_string()];
    estimator.fit(&x, &y, Some(&names)).unwrap();

    let seen = last_fit();
    assert_eq!(seen.x, vec![vec![0.0, 1.0, 2.0], vec![10.0, 11.0, 12.0]]);
    assert_eq!(seen.y, y);
    assert_eq!(seen.names, names);
    assert_eq!(
        seen.floats,
        vec![3.0, -2.0, 0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.01, 0.8]
    );
    assert_eq!(seen.ints, vec![5, 2, 11, 3, 4, 42, 1234, 9]);
    assert_eq!(seen.texts, vec!["rmse", "sum,sub,mul,div", "mse"]);
    assert!(seen.verbose);
}

#[test]
fn test_function_set_sent_with_canonical_names() {
    returns(Some("X0"));
    let hp = Hyperparameters {
        funcs: "sum, MUL".to_string(),
        ..Hyperparameters::default().with_seed(1)
    };
    let mut estimator = Estimator::new(hp, stub_engine());
    let (x, y) = dataset();
    estimator.fit(&x, &y, None).unwrap();
    assert_eq!(last_fit().texts[1], "sum,mul");
}

#[test]
fn test_empty_eval_metric_sends_loss_metric() {
    returns(Some("X0"));
    let hp = Hyperparameters {
        loss_metric: "mse".to_string(),
        ..Hyperparameters::default().with_seed(1)
    };
    let mut estimator = Estimator::new(hp, stub_engine());
    let (x, y) = dataset();
    estimator.fit(&x, &y, None).unwrap();

    let seen = last_fit();
    assert_eq!(seen.texts[0], "mse");
    assert_eq!(seen.names, vec!["X0", "X1"]);
}

#[test]
fn test_end_to_end_fit_predict() {
    returns(Some("mul(X0, 2)"));
    let mut estimator = Estimator::new(Hyperparameters::default().with_seed(3), stub_engine());
    let (x, y) = dataset();
    estimator.fit(&x, &y, None).unwrap();

    assert_eq!(estimator.predict(&x).unwrap(), y);
    assert_eq!(estimator.predict_foreign(&x, false).unwrap(), y);
    assert_eq!(estimator.predict_foreign(&x, true).unwrap(), vec![0.5; 3]);
}

#[test]
fn test_refit_engine_refuses_stale_foreign_predict() {
    let engine = stub_engine();
    let (x, y) = dataset();

    returns(Some("mul(X0, 2)"));
    let mut first = Estimator::new(Hyperparameters::default().with_seed(1), engine.clone());
    first.fit(&x, &y, None).unwrap();
    assert_eq!(first.predict_foreign(&x, false).unwrap(), y);

    returns(Some("X1"));
    let mut second = Estimator::new(Hyperparameters::default().with_seed(2), engine.clone());
    second.fit(&x, &y, None).unwrap();

    assert!(matches!(
        first.predict_foreign(&x, false),
        Err(SymbindError::Library(_))
    ));
    assert_eq!(first.predict(&x).unwrap(), y);
    assert!(second.predict_foreign(&x, false).is_ok());
}

#[test]
fn test_failed_refit_retires_foreign_model() {
    let (x, y) = dataset();
    let mut estimator = Estimator::new(Hyperparameters::default().with_seed(3), stub_engine());
    returns(Some("mul(X0, 2)"));
    estimator.fit(&x, &y, None).unwrap();

    returns(None);
    assert!(estimator.fit(&x, &y, None).is_err());
    assert!(matches!(
        estimator.predict_foreign(&x, false),
        Err(SymbindError::Library(_))
    ));
    assert_eq!(estimator.predict(&x).unwrap(), y);
}

#[test]
fn test_restored_model_has_no_foreign_model() {
    returns(Some("mul(X0, 2)"));
    let engine = stub_engine();
    let (x, y) = dataset();
    let mut estimator = Estimator::new(Hyperparameters::default().with_seed(4), engine.clone());
    estimator.fit(&x, &y, None).unwrap();

    let restored = Estimator::from_model(estimator.export_model().unwrap(), engine).unwrap();
    assert_eq!(restored.predict(&x).unwrap(), y);
    assert!(matches!(
        restored.predict_foreign(&x, false),
        Err(SymbindError::NotFitted)
    ));
}

#[test]
fn test_null_result_is_fit_failure() {
    let (x, y) = dataset();
    let mut estimator = Estimator::new(Hyperparameters::default().with_seed(3), stub_engine());
    returns(Some("X1"));
    estimator.fit(&x, &y, None).unwrap();

    returns(None);
    let err = estimator.fit(&x, &y, None).unwrap_err();
    assert!(matches!(err, SymbindError::FitFailed(_)));
    assert_eq!(estimator.program().unwrap().source(), "X1");
}

#[test]
fn test_empty_result_is_fit_failure() {
    returns(Some(""));
    let (x, y) = dataset();
    let mut estimator = Estimator::new(Hyperparameters::default().with_seed(3), stub_engine());
    assert!(matches!(
        estimator.fit(&x, &y, None),
        Err(SymbindError::FitFailed(_))
    ));
    assert!(!estimator.is_fitted());
}

#[test]
fn test_predict_requires_fit() {
    let estimator = Estimator::new(Hyperparameters::default(), stub_engine());
    let (x, _) = dataset();
    assert!(matches!(estimator.predict(&x), Err(SymbindError::NotFitted)));
    assert!(matches!(
        estimator.predict_foreign(&x, false),
        Err(SymbindError::NotFitted)
    ));
}

#[test]
fn test_output_view_aliases_its_buffer() {
    let features = vec![vec![1.0, 2.0, 3.0]];
    let x = ForeignMatrix::new(&features).unwrap();
    let mut buffer = vec![0.0; 3];
    let mut out = ForeignSliceMut::new(&mut buffer);

    // Written after marshaling, before the call: the engine must see it.
    out.as_mut_slice()[1] = 100.0;
    invoke_predict(stub_predict, &x, false, &mut out).unwrap();
    assert_eq!(buffer, vec![2.0, 104.0, 6.0]);
}

#[test]
fn test_same_seed_same_call() {
    returns(Some("mul(X0, 2)"));
    let (x, y) = dataset();
    let mut estimator = Estimator::new(Hyperparameters::default().with_seed(99), stub_engine());
    estimator.fit(&x, &y, None).unwrap();
    let first = last_fit();
    let first_prediction = estimator.predict(&x).unwrap();

    estimator.fit(&x, &y, None).unwrap();
    let second = last_fit();
    assert_eq!(first.ints, second.ints);
    assert_eq!(first.x, second.x);

    let second_prediction = estimator.predict(&x).unwrap();
    let bits = |v: &[f64]| v.iter().map(|f| f.to_bits()).collect::<Vec<_>>();
    assert_eq!(bits(&first_prediction), bits(&second_prediction));
    assert_eq!(evaluate("mul(X0, 2)", &x).unwrap(), y);
}

#[test]
fn test_process_wide_engine_is_initialized_once() {
    let installed = ForeignEngine::install(ForeignEngine::from_symbols(stub_fit, None, None)).unwrap();
    let global = ForeignEngine::global().unwrap();
    assert!(std::ptr::eq(installed, global));

    let again = ForeignEngine::install(ForeignEngine::from_symbols(stub_fit, None, None));
    assert!(matches!(again, Err(SymbindError::Library(_))));
    assert!(matches!(
        ForeignEngine::init("/tmp/libother.so"),
        Err(SymbindError::Library(_))
    ));

    returns(Some("sum(X0, X1)"));
    let mut estimator = Estimator::new(Hyperparameters::default().with_seed(5), Arc::new(global));
    let (x, y) = dataset();
    estimator.fit(&x, &y, None).unwrap();
    assert_eq!(estimator.predict(&x).unwrap(), vec![10.0, 12.0, 14.0]);
    assert!(!global.supports_predict());
}

use quantype::{
    ArithmeticOperator, ComparisonOperator, DataType, EngineError, Evaluator, ExpressionBuilder,
    ExplanationLocation, FunctionRegistry, SingleUnit, TableData, TypeChecker, TypeError, TypeExp,
    TypeManager, TypeState, UnitDeclaration, UnitExp, UnitExpression, UnitManager, UserError,
    Value,
};
use rust_decimal::Decimal;
use std::str::FromStr;

fn decimal(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

#[test]
fn test_unit_variable_unifies_with_metres() {
    let units = UnitManager::with_builtin_units();
    let types = TypeManager::with_builtin_types();
    let metres = units.get_unit("m").unwrap();

    let mut state = TypeState::default();
    let a = TypeExp::Number(UnitExp::var(state.fresh_unit_var()));
    state
        .unify(&a, &TypeExp::Number(UnitExp::from_unit(&metres)))
        .unwrap();
    assert_eq!(
        types.concretise(&state, &a, false).unwrap(),
        DataType::Number(metres)
    );
}

#[test]
fn test_list_variable_becomes_scalar_number() {
    let types = TypeManager::with_builtin_types();
    let mut state = TypeState::default();
    let a = state.fresh_var();
    state
        .unify(
            &TypeExp::list(a.clone()),
            &TypeExp::list(TypeExp::scalar_number()),
        )
        .unwrap();
    assert_eq!(types.concretise(&state, &a, false).unwrap(), DataType::scalar());
}

#[test]
fn test_list_and_tuple_are_different_shapes() {
    let mut state = TypeState::default();
    let x = state.fresh_var();
    let y = state.fresh_var();
    let err = state
        .unify(&TypeExp::list(x.clone()), &TypeExp::tuple(vec![x, y]))
        .unwrap_err();
    assert!(matches!(err, TypeError::Mismatch { .. }));
    assert!(err.to_string().contains("List"));
    assert!(err.to_string().contains("Tuple"));
}

#[test]
fn test_area_over_length_is_length() {
    let units = UnitManager::with_builtin_units();
    let metres = units.get_unit("m").unwrap();
    let area = metres.raised_to(2).unwrap();
    assert_eq!(area.divide(&metres), Ok(metres));
}

#[test]
fn test_hourly_pay_with_converted_duration() {
    let units = UnitManager::with_builtin_units();
    let types = TypeManager::with_builtin_types();
    let functions = FunctionRegistry::with_builtins();

    let rate = units
        .resolve(&UnitExpression::divide(
            UnitExpression::named("USD"),
            UnitExpression::named("hour"),
        ))
        .unwrap();
    let minutes = units.get_unit("min").unwrap();
    let table = TableData::new("shifts")
        .with_column("rate", DataType::Number(rate), vec![Value::number(20)])
        .with_column("worked", DataType::Number(minutes), vec![Value::number(90)]);

    let mut b = ExpressionBuilder::new();
    let rate = b.column("rate");
    let worked = b.column("worked");
    let hours = b.convert(worked, UnitExpression::named("hour"));
    let pay = b.arithmetic(rate, ArithmeticOperator::Multiply, hours);

    let checked = TypeChecker::new(&types, &units, &functions, &table)
        .check(&pay, None)
        .unwrap();
    assert_eq!(checked.result_type.to_string(), "Number{USD}");

    let recorded = Evaluator::new(&units, &functions, &table)
        .evaluate_record(&checked, 0)
        .unwrap();
    assert_eq!(recorded.value, Value::number(30));
    assert_eq!(
        recorded.explanation.description,
        "20 USD/hour * 1.5 hour = $30"
    );
    assert_eq!(
        recorded.explanation.all_locations(),
        vec![
            &ExplanationLocation::cell("shifts", "rate", 0),
            &ExplanationLocation::cell("shifts", "worked", 0),
        ]
    );
}

#[test]
fn test_declared_units_convert_through_their_definitions() {
    let mut units = UnitManager::with_builtin_units();
    let lap = SingleUnit::new("lap", "track lap", "", "").unwrap();
    let metres = units.get_unit("m").unwrap();
    let factor = num_rational::BigRational::from_integer(400.into());
    units
        .declare(UnitDeclaration::derived(lap, factor, metres, "Length"))
        .unwrap();
    let types = TypeManager::with_builtin_types();
    let functions = FunctionRegistry::with_builtins();
    let table = TableData::new("training").with_column(
        "laps",
        DataType::Number(units.get_unit("lap").unwrap()),
        vec![Value::number(25)],
    );

    let mut b = ExpressionBuilder::new();
    let laps = b.column("laps");
    let km = b.convert(laps, UnitExpression::named("km"));
    let target = b.quantity(10, UnitExpression::named("km"));
    let reached = b.comparison(km, ComparisonOperator::GreaterOrEqual, target);

    let checked = TypeChecker::new(&types, &units, &functions, &table)
        .check(&reached, Some(&DataType::Boolean))
        .unwrap();
    let value = Evaluator::new(&units, &functions, &table)
        .evaluate(&checked, 0)
        .unwrap();
    assert_eq!(value, Value::Boolean(true));
}

#[test]
fn test_errors_separate_user_mistakes_from_bugs() {
    let units = UnitManager::with_builtin_units();
    let types = TypeManager::with_builtin_types();
    let functions = FunctionRegistry::with_builtins();
    let table = TableData::new("empty");

    let mut b = ExpressionBuilder::new();
    let missing = b.column("nothing");
    let half = b.number(decimal("0.5"));
    let expr = b.arithmetic(missing, ArithmeticOperator::Add, half);

    let err = TypeChecker::new(&types, &units, &functions, &table)
        .check(&expr, None)
        .unwrap_err();
    assert!(!err.is_internal());
    assert_eq!(
        err,
        EngineError::User(UserError::UnknownColumn("nothing".to_string()))
    );
}

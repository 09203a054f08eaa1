use super::fixtures::Fixture;
use crate::checker::{ArithmeticOperator, ComparisonOperator, ExpressionBuilder};
use crate::error::{EngineError, UserError};
use crate::evaluator::operations::{arithmetic, compare, power};
use crate::evaluator::{ColumnSource, TableData};
use crate::units::UnitExpression;
use crate::value::{ExplanationLocation, TemporalValue, Value};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::str::FromStr;

fn decimal(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn evaluation_error(message: &str) -> EngineError {
    EngineError::User(UserError::Evaluation(message.to_string()))
}

#[test]
fn test_speed_per_row() {
    let fixture = Fixture::new();
    let mut b = ExpressionBuilder::new();
    let distance = b.column("distance");
    let duration = b.column("duration");
    let speed = b.arithmetic(distance, ArithmeticOperator::Divide, duration);
    let checked = fixture.check(&speed).unwrap();

    let evaluator = fixture.evaluator();
    assert_eq!(evaluator.evaluate(&checked, 0), Ok(Value::number(6)));
    assert_eq!(evaluator.evaluate(&checked, 1), Ok(Value::number(6)));
}

#[test]
fn test_arithmetic_explanation() {
    let fixture = Fixture::new();
    let mut b = ExpressionBuilder::new();
    let distance = b.column("distance");
    let duration = b.column("duration");
    let speed = b.arithmetic(distance, ArithmeticOperator::Divide, duration);
    let checked = fixture.check(&speed).unwrap();

    let recorded = fixture.evaluator().evaluate_record(&checked, 0).unwrap();
    let explanation = &recorded.explanation;
    assert_eq!(explanation.description, "12 km / 2 hour = 6 km/hour");
    assert_eq!(explanation.result_is, None);
    assert_eq!(explanation.children.len(), 2);
    assert_eq!(
        explanation.children[0].result_is,
        Some(ExplanationLocation::cell("runs", "distance", 0))
    );
    assert_eq!(
        explanation.all_locations(),
        vec![
            &ExplanationLocation::cell("runs", "distance", 0),
            &ExplanationLocation::cell("runs", "duration", 0),
        ]
    );
}

#[test]
fn test_unit_conversion() {
    let fixture = Fixture::new();
    let mut b = ExpressionBuilder::new();
    let distance = b.column("distance");
    let metres = b.convert(distance, UnitExpression::named("m"));
    let checked = fixture.check(&metres).unwrap();
    let recorded = fixture.evaluator().evaluate_record(&checked, 0).unwrap();
    assert_eq!(recorded.value, Value::number(12000));
    assert_eq!(recorded.explanation.description, "convert 12 km to m");

    let inches = b.quantity(10, UnitExpression::named("inch"));
    let cm = b.convert(inches, UnitExpression::named("cm"));
    let checked = fixture.check(&cm).unwrap();
    assert_eq!(
        fixture.evaluator().evaluate(&checked, 0),
        Ok(Value::Number(decimal("25.4")))
    );
}

#[test]
fn test_division_by_zero() {
    let fixture = Fixture::new();
    let mut b = ExpressionBuilder::new();
    let distance = b.column("distance");
    let laps = b.column("laps");
    let per_lap = b.arithmetic(distance, ArithmeticOperator::Divide, laps);
    let checked = fixture.check(&per_lap).unwrap();

    assert_eq!(fixture.evaluator().evaluate(&checked, 0), Ok(Value::number(4)));
    assert_eq!(
        fixture.evaluator().evaluate(&checked, 1),
        Err(evaluation_error("division by zero"))
    );
}

#[test]
fn test_if_points_at_the_chosen_branch() {
    let fixture = Fixture::new();
    let mut b = ExpressionBuilder::new();
    let laps = b.column("laps");
    let zero = b.number(0);
    let condition = b.comparison(laps, ComparisonOperator::Greater, zero);
    let distance = b.column("distance");
    let nothing = b.quantity(0, UnitExpression::named("km"));
    let choice = b.if_then_else(condition, distance, nothing);
    let checked = fixture.check(&choice).unwrap();
    let evaluator = fixture.evaluator();

    let taken = evaluator.evaluate_record(&checked, 0).unwrap();
    assert_eq!(taken.value, Value::number(12));
    assert_eq!(
        taken.explanation.result_is,
        Some(ExplanationLocation::cell("runs", "distance", 0))
    );
    assert_eq!(
        taken.explanation.description,
        "condition is true, so the then branch"
    );

    let skipped = evaluator.evaluate_record(&checked, 1).unwrap();
    assert_eq!(skipped.value, Value::number(0));
    assert_eq!(skipped.explanation.result_is, None);
}

#[test]
fn test_element_of_column_links_to_cell() {
    let fixture = Fixture::new();
    let mut b = ExpressionBuilder::new();
    let all = b.entire_column("distance");
    let two = b.number(2);
    let second = b.call("element", vec![all, two]);
    let checked = fixture.check(&second).unwrap();

    let recorded = fixture.evaluator().evaluate_record(&checked, 0).unwrap();
    assert_eq!(recorded.value, Value::number(30));
    assert_eq!(
        recorded.explanation.result_is,
        Some(ExplanationLocation::cell("runs", "distance", 1))
    );
    assert_eq!(
        recorded.explanation.children[0].result_is,
        Some(ExplanationLocation::column("runs", "distance"))
    );

    let nine = b.number(9);
    let all = b.entire_column("distance");
    let missing = b.call("element", vec![all, nine]);
    let checked = fixture.check(&missing).unwrap();
    let err = fixture.evaluator().evaluate(&checked, 0).unwrap_err();
    assert!(!err.is_internal());
}

#[test]
fn test_sum_uses_the_column() {
    let fixture = Fixture::new();
    let mut b = ExpressionBuilder::new();
    let all = b.entire_column("distance");
    let total = b.call("sum", vec![all]);
    let checked = fixture.check(&total).unwrap();

    let recorded = fixture.evaluator().evaluate_record(&checked, 0).unwrap();
    assert_eq!(recorded.value, Value::number(42));
    assert_eq!(
        recorded.explanation.used_locations,
        vec![ExplanationLocation::column("runs", "distance")]
    );
    assert_eq!(recorded.explanation.result_is, None);
}

#[test]
fn test_single_needs_one_row() {
    let fixture = Fixture::new();
    let mut b = ExpressionBuilder::new();
    let all = b.entire_column("laps");
    let only = b.call("single", vec![all]);
    let checked = fixture.check(&only).unwrap();
    assert_eq!(
        fixture.evaluator().evaluate(&checked, 0),
        Err(evaluation_error("list must be of size 1"))
    );
}

#[test]
fn test_structured_values() {
    let fixture = Fixture::new();
    let mut b = ExpressionBuilder::new();
    let three = b.quantity(3, UnitExpression::named("m"));
    let is = b.tag("Is", Some(three));
    let checked = fixture.check(&is).unwrap();
    assert_eq!(
        fixture.evaluator().evaluate(&checked, 0),
        Ok(Value::tag("Is", Some(Value::number(3))))
    );

    let runner = b.column("runner");
    let laps = b.column("laps");
    let record = b.record(vec![("name", runner), ("laps", laps)]);
    let checked = fixture.check(&record).unwrap();
    let value = fixture.evaluator().evaluate(&checked, 1).unwrap();
    assert_eq!(value.to_string(), "{laps: 0, name: \"Grace\"}");

    let one = b.number(1);
    let word = b.text("two");
    let pair = b.tuple(vec![one, word]);
    let checked = fixture.check(&pair).unwrap();
    let value = fixture.evaluator().evaluate(&checked, 0).unwrap();
    assert_eq!(value.to_string(), "(1, \"two\")");
}

#[test]
fn test_missing_row() {
    let fixture = Fixture::new();
    let mut b = ExpressionBuilder::new();
    let distance = b.column("distance");
    let checked = fixture.check(&distance).unwrap();
    assert_eq!(
        fixture.evaluator().evaluate(&checked, 5),
        Err(evaluation_error("column 'distance' has no value in row 5"))
    );
}

#[test]
fn test_powers() {
    assert_eq!(power(decimal("3"), 2), Ok(decimal("9")));
    assert_eq!(power(decimal("2"), -1), Ok(decimal("0.5")));
    assert_eq!(power(decimal("7"), 0), Ok(Decimal::ONE));
    assert_eq!(
        power(Decimal::ZERO, -1),
        Err(evaluation_error("division by zero"))
    );
    assert!(power(Decimal::MAX, 2).is_err());
    assert_eq!(power(decimal("2"), 10), Ok(decimal("1024")));
    assert_eq!(power(decimal("-3"), 3), Ok(decimal("-27")));
    assert_eq!(power(decimal("10"), -3), Ok(decimal("0.001")));
    assert_eq!(power(decimal("1.5"), 2), Ok(decimal("2.25")));
}

#[test]
fn test_huge_exponents_finish_quickly() {
    let start = std::time::Instant::now();
    assert_eq!(power(Decimal::ONE, 400_000_000), Ok(Decimal::ONE));
    assert_eq!(power(Decimal::ONE, i32::MIN), Ok(Decimal::ONE));
    assert_eq!(power(Decimal::NEGATIVE_ONE, i32::MAX), Ok(Decimal::NEGATIVE_ONE));
    assert_eq!(power(Decimal::NEGATIVE_ONE, i32::MIN), Ok(Decimal::ONE));
    assert_eq!(power(Decimal::ZERO, i32::MAX), Ok(Decimal::ZERO));
    assert_eq!(
        power(Decimal::ZERO, i32::MIN),
        Err(evaluation_error("division by zero"))
    );
    assert!(power(decimal("2"), i32::MAX).is_err());
    assert!(power(decimal("1.0001"), 400_000_000).is_err());
    assert!(start.elapsed() < std::time::Duration::from_secs(1));
}

#[test]
fn test_arithmetic_overflow() {
    let err = arithmetic(Decimal::MAX, ArithmeticOperator::Add, Decimal::ONE).unwrap_err();
    assert!(err.to_string().contains("overflows"));
    assert!(!err.is_internal());
}

#[test]
fn test_comparisons() {
    let a = Value::text("apple");
    let b = Value::text("banana");
    assert_eq!(compare(&a, ComparisonOperator::Less, &b), Ok(true));
    assert_eq!(compare(&a, ComparisonOperator::Equal, &a), Ok(true));
    assert_eq!(compare(&a, ComparisonOperator::NotEqual, &b), Ok(true));

    let march = Value::Temporal(TemporalValue::Date(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()));
    let april = Value::Temporal(TemporalValue::Date(NaiveDate::from_ymd_opt(2024, 4, 1).unwrap()));
    assert_eq!(
        compare(&april, ComparisonOperator::GreaterOrEqual, &march),
        Ok(true)
    );

    let month = Value::Temporal(TemporalValue::YearMonth {
        year: 2024,
        month: 3,
    });
    assert!(compare(&march, ComparisonOperator::Less, &month).is_err());
    assert!(compare(&Value::Boolean(true), ComparisonOperator::Less, &Value::Boolean(false)).is_err());
}

#[test]
fn test_table_data() {
    let table = TableData::new("t").with_column(
        "a",
        crate::types::DataType::Text,
        vec![Value::text("x"), Value::text("y"), Value::text("z")],
    );
    assert_eq!(table.row_count(), 3);
    assert_eq!(table.table_name(), "t");
    assert_eq!(table.column_value("a", 2), Some(Value::text("z")));
    assert_eq!(table.column_value("a", 3), None);
    assert_eq!(table.column_values("b"), None);
}

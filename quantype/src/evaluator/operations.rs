//! Arithmetic and comparison on runtime values
//!
//! Units are not looked at here: the checker has already made sure both
//! sides of `+`, `-` and comparisons share a unit.

use crate::checker::{ArithmeticOperator, ComparisonOperator};
use crate::error::{EngineError, EngineResult};
use crate::value::{TemporalValue, Value};
use rust_decimal::Decimal;
use std::cmp::Ordering;

pub fn arithmetic(left: Decimal, op: ArithmeticOperator, right: Decimal) -> EngineResult<Decimal> {
    let result = match op {
        ArithmeticOperator::Add => left.checked_add(right),
        ArithmeticOperator::Subtract => left.checked_sub(right),
        ArithmeticOperator::Multiply => left.checked_mul(right),
        ArithmeticOperator::Divide => {
            if right.is_zero() {
                return Err(EngineError::evaluation("division by zero"));
            }
            left.checked_div(right)
        }
    };
    result.ok_or_else(|| {
        EngineError::evaluation(format!("{} {} {} overflows", left, op, right))
    })
}

/// Whole-number power by repeated squaring.
pub fn power(base: Decimal, exponent: i32) -> EngineResult<Decimal> {
    if base.is_zero() && exponent < 0 {
        return Err(EngineError::evaluation("division by zero"));
    }
    if exponent == 0 || base == Decimal::ONE {
        return Ok(Decimal::ONE);
    }
    if base.is_zero() {
        return Ok(Decimal::ZERO);
    }
    if base == Decimal::NEGATIVE_ONE {
        return Ok(if exponent % 2 == 0 {
            Decimal::ONE
        } else {
            Decimal::NEGATIVE_ONE
        });
    }

    let overflow = || EngineError::evaluation(format!("{} ^ {} overflows", base, exponent));
    let mut remaining = exponent.unsigned_abs();
    let mut square = base;
    let mut result = Decimal::ONE;
    loop {
        if remaining & 1 == 1 {
            result = result.checked_mul(square).ok_or_else(overflow)?;
        }
        remaining >>= 1;
        if remaining == 0 {
            break;
        }
        square = square.checked_mul(square).ok_or_else(overflow)?;
    }
    if exponent > 0 {
        return Ok(result);
    }
    if result.is_zero() {
        return Err(EngineError::evaluation("division by zero"));
    }
    Decimal::ONE.checked_div(result).ok_or_else(overflow)
}

pub fn compare(left: &Value, op: ComparisonOperator, right: &Value) -> EngineResult<bool> {
    if !op.is_ordering() {
        let equal = left == right;
        return Ok(if op == ComparisonOperator::Equal {
            equal
        } else {
            !equal
        });
    }
    let ordering = order(left, right).ok_or_else(|| {
        EngineError::evaluation(format!(
            "cannot order {} values with {}",
            left.kind(),
            op
        ))
    })?;
    Ok(match op {
        ComparisonOperator::Less => ordering == Ordering::Less,
        ComparisonOperator::LessOrEqual => ordering != Ordering::Greater,
        ComparisonOperator::Greater => ordering == Ordering::Greater,
        ComparisonOperator::GreaterOrEqual => ordering != Ordering::Less,
        ComparisonOperator::Equal | ComparisonOperator::NotEqual => ordering == Ordering::Equal,
    })
}

fn order(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => Some(l.cmp(r)),
        (Value::Text(l), Value::Text(r)) => Some(l.cmp(r)),
        (Value::Temporal(l), Value::Temporal(r)) => order_temporal(l, r),
        _ => None,
    }
}

fn order_temporal(left: &TemporalValue, right: &TemporalValue) -> Option<Ordering> {
    match (left, right) {
        (TemporalValue::Date(l), TemporalValue::Date(r)) => Some(l.cmp(r)),
        (
            TemporalValue::YearMonth { year, month },
            TemporalValue::YearMonth {
                year: other_year,
                month: other_month,
            },
        ) => Some((year, month).cmp(&(other_year, other_month))),
        (TemporalValue::Time(l), TemporalValue::Time(r)) => Some(l.cmp(r)),
        (TemporalValue::DateTime(l), TemporalValue::DateTime(r)) => Some(l.cmp(r)),
        (TemporalValue::DateTimeZoned(l), TemporalValue::DateTimeZoned(r)) => Some(l.cmp(r)),
        _ => None,
    }
}

#![no_main]

use libfuzzer_sys::fuzz_target;
use quantype::{
    ArithmeticOperator, DataType, ExpressionBuilder, FunctionRegistry, TableData, TypeChecker,
    TypeManager, UnitExpression, UnitManager, Value,
};

fuzz_target!(|depth: u8| {
    let units = UnitManager::with_builtin_units();
    let types = TypeManager::with_builtin_types();
    let functions = FunctionRegistry::with_builtins();
    let metres = match units.get_unit("m") {
        Ok(unit) => DataType::Number(unit),
        Err(_) => return,
    };
    let table = TableData::new("fuzz").with_column("x", metres, vec![Value::number(1)]);

    let mut b = ExpressionBuilder::new();
    let mut expr = b.column("x");
    for i in 0..depth {
        let one = b.quantity(1, UnitExpression::named("m"));
        let op = if i % 2 == 0 {
            ArithmeticOperator::Add
        } else {
            ArithmeticOperator::Subtract
        };
        expr = b.arithmetic(expr, op, one);
    }

    // deep inputs must end in a limit error, never a stack overflow
    let _ = TypeChecker::new(&types, &units, &functions, &table).check(&expr, None);
});

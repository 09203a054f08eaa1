use crate::checker::{CheckedExpression, Expression, TypeChecker};
use crate::error::EngineResult;
use crate::evaluator::{Evaluator, TableData};
use crate::types::{DataType, TagType, TypeManager, TypeTemplate};
use crate::units::{UnitExpression, UnitManager};
use crate::value::{FunctionRegistry, Value};

/// Registries and a small table of runs shared by checker and evaluator tests.
pub(super) struct Fixture {
    pub units: UnitManager,
    pub types: TypeManager,
    pub functions: FunctionRegistry,
    pub table: TableData,
}

/// Route engine events to the test output; `RUST_LOG=quantype=trace` shows unification steps.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quantype=warn".into()),
        )
        .with_test_writer()
        .try_init();
}

impl Fixture {
    pub fn new() -> Self {
        init_tracing();
        let units = UnitManager::with_builtin_units();
        let mut types = TypeManager::with_builtin_types();
        for name in ["Door", "Valve"] {
            types
                .register_tagged_type(
                    name,
                    Vec::new(),
                    vec![TagType::unit("Open"), TagType::unit("Shut")],
                )
                .unwrap();
        }
        let seconds = DataType::Number(units.get_unit("s").unwrap());
        types
            .register_tagged_type(
                "Job",
                Vec::new(),
                vec![
                    TagType::unit("Pending"),
                    TagType::with_inner("Done", TypeTemplate::Concrete(seconds)),
                ],
            )
            .unwrap();
        types
            .register_tagged_type(
                "Parcel",
                Vec::new(),
                vec![
                    TagType::unit("Pending"),
                    TagType::with_inner("Done", TypeTemplate::Concrete(DataType::Text)),
                ],
            )
            .unwrap();

        let km = DataType::Number(units.get_unit("km").unwrap());
        let hours = DataType::Number(units.get_unit("hour").unwrap());
        let table = TableData::new("runs")
            .with_column("distance", km, vec![Value::number(12), Value::number(30)])
            .with_column("duration", hours, vec![Value::number(2), Value::number(5)])
            .with_column(
                "runner",
                DataType::Text,
                vec![Value::text("Ada"), Value::text("Grace")],
            )
            .with_column(
                "laps",
                DataType::scalar(),
                vec![Value::number(3), Value::number(0)],
            );

        Self {
            units,
            types,
            functions: FunctionRegistry::with_builtins(),
            table,
        }
    }

    pub fn checker(&self) -> TypeChecker<'_> {
        TypeChecker::new(&self.types, &self.units, &self.functions, &self.table)
    }

    pub fn check(&self, expression: &Expression) -> EngineResult<CheckedExpression> {
        self.checker().check(expression, None)
    }

    pub fn evaluator(&self) -> Evaluator<'_> {
        Evaluator::new(&self.units, &self.functions, &self.table)
    }

    pub fn unit_type(&self, expression: UnitExpression) -> DataType {
        DataType::Number(self.units.resolve(&expression).unwrap())
    }
}

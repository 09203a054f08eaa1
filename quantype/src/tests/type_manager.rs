use crate::error::{EngineError, UserError};
use crate::typeexp::{TypeExp, TypeState};
use crate::types::{DataType, TagType, TypeManager, TypeTemplate};
use crate::units::{SingleUnit, Unit};

fn metres() -> DataType {
    DataType::Number(Unit::single(SingleUnit::named("m")))
}

fn invalid(result: Result<impl std::fmt::Debug, EngineError>) -> String {
    match result {
        Err(EngineError::User(UserError::InvalidDeclaration(message))) => message,
        other => panic!("expected an invalid declaration, got {:?}", other),
    }
}

#[test]
fn test_builtin_types() {
    let types = TypeManager::with_builtin_types();
    let optional = types.lookup_tagged("Optional").unwrap();
    assert_eq!(optional.type_vars(), ["t".to_string()]);
    assert!(optional.tag("None").unwrap().inner.is_none());
    assert!(optional.tag("Is").unwrap().inner.is_some());

    let names: Vec<&str> = types.tagged_types().map(|d| d.name()).collect();
    assert_eq!(names, vec!["Comparison", "Optional"]);
}

#[test]
fn test_register_and_find_by_tag() {
    let mut types = TypeManager::with_builtin_types();
    types
        .register_tagged_type(
            "Shape",
            Vec::new(),
            vec![
                TagType::with_inner("Circle", TypeTemplate::Concrete(metres())),
                TagType::with_inner(
                    "Rectangle",
                    TypeTemplate::Tuple(vec![
                        TypeTemplate::Concrete(metres()),
                        TypeTemplate::Concrete(metres()),
                    ]),
                ),
            ],
        )
        .unwrap();

    let found: Vec<&str> = types
        .types_with_tag("Circle")
        .into_iter()
        .map(|d| d.name())
        .collect();
    assert_eq!(found, vec!["Shape"]);
    assert!(types.types_with_tag("Triangle").is_empty());
}

#[test]
fn test_recursive_type() {
    let mut types = TypeManager::with_builtin_types();
    let tree = types
        .register_tagged_type(
            "Tree",
            vec!["t".to_string()],
            vec![
                TagType::unit("Leaf"),
                TagType::with_inner(
                    "Node",
                    TypeTemplate::Tuple(vec![
                        TypeTemplate::tagged("Tree", vec![TypeTemplate::variable("t")]),
                        TypeTemplate::variable("t"),
                        TypeTemplate::tagged("Tree", vec![TypeTemplate::variable("t")]),
                    ]),
                ),
            ],
        )
        .unwrap();

    let mut state = TypeState::default();
    let (instance, args) = tree.instantiate(&mut state);
    let payload = tree.inner_type("Node", &args).unwrap().unwrap();
    let t = &args["t"];
    assert_eq!(
        payload,
        TypeExp::tuple(vec![instance.clone(), t.clone(), instance])
    );
    assert_eq!(tree.inner_type("Leaf", &args).unwrap(), None);
    assert!(tree.inner_type("Branch", &args).unwrap_err().is_internal());
}

#[test]
fn test_declaration_errors() {
    let mut types = TypeManager::with_builtin_types();
    let unit_tag = || vec![TagType::unit("Only")];

    assert!(invalid(types.register_tagged_type("shape", Vec::new(), unit_tag()))
        .contains("upper-case"));
    assert!(invalid(types.register_tagged_type("List", Vec::new(), unit_tag()))
        .contains("built-in"));
    assert!(invalid(types.register_tagged_type("Optional", Vec::new(), unit_tag()))
        .contains("already declared"));
    assert!(invalid(types.register_tagged_type("Empty", Vec::new(), Vec::new()))
        .contains("at least one tag"));
    assert!(invalid(types.register_tagged_type(
        "Pair",
        vec!["a".to_string(), "a".to_string()],
        unit_tag()
    ))
    .contains("duplicate type variable"));
    assert!(invalid(types.register_tagged_type(
        "Twice",
        Vec::new(),
        vec![TagType::unit("Same"), TagType::unit("Same")]
    ))
    .contains("duplicate tag"));
    assert!(invalid(types.register_tagged_type(
        "Box",
        Vec::new(),
        vec![TagType::with_inner("Full", TypeTemplate::variable("t"))]
    ))
    .contains("undeclared type variable"));
    assert!(invalid(types.register_tagged_type(
        "Maybe",
        vec!["t".to_string()],
        vec![TagType::with_inner(
            "Wrapped",
            TypeTemplate::tagged("Optional", Vec::new())
        )]
    ))
    .contains("takes 1 argument(s)"));
}

#[test]
fn test_unknown_referenced_type() {
    let mut types = TypeManager::with_builtin_types();
    let result = types.register_tagged_type(
        "Holder",
        Vec::new(),
        vec![TagType::with_inner(
            "Holds",
            TypeTemplate::tagged("Missing", Vec::new()),
        )],
    );
    assert_eq!(
        result.unwrap_err(),
        EngineError::User(UserError::UnknownType("Missing".to_string()))
    );
    assert!(types.lookup_tagged("Holder").is_none());
}

#[test]
fn test_template_display() {
    let template = TypeTemplate::list(TypeTemplate::tagged(
        "Optional",
        vec![TypeTemplate::Concrete(metres())],
    ));
    assert_eq!(template.to_string(), "List(Optional(Number{m}))");
}

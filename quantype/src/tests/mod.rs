mod evaluator;
mod fixtures;
mod type_manager;
mod unification;

//! Entities used by the running app: fruits on the shared list and logged runs.

pub mod fruit;
pub mod run;

pub use fruit::Fruit;
pub use run::Run;

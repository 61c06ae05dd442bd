pub mod budget;
pub mod builder;
pub mod degrade;
pub mod instruction;
pub mod report;
pub mod size;
pub mod wire;

pub use budget::{select, Outcome, Selection};
pub use builder::{BuiltPayload, PayloadBuilder, TurnFlags};
pub use report::BudgetReport;
pub use wire::WireRequest;

//! Domain types for Tranche

pub mod allocation;
pub mod bar;
pub mod instrument;
pub mod portfolio;
pub mod position;

pub use allocation::{
    Allocation, AllocationEntry, AllocationNode, DuplicatePolicy, FlatAllocations, Group,
    GroupConfig, GroupSpec,
};
pub use bar::Bar;
pub use instrument::Instrument;
pub use portfolio::Portfolio;
pub use position::{FlipPolicy, Position, PositionSnapshot, QTY_EPSILON};

/// Symbol type alias
pub type Symbol = String;

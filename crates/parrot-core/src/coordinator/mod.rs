mod coordinator;
mod state;

pub use {
    coordinator::{CoordinatorOptions, SessionCoordinator},
    state::{Phase, SessionState},
};

//! List screens: filter/pagination state machine and its binding to hooks.

mod controller;
mod debounce;
mod view;

pub use controller::{ControllerListener, ListController, WeakListController};
pub use debounce::Debouncer;
pub use view::ListView;

mod dispatch_runtime;
mod dispatch_scope;
mod in_flight;

pub use dispatch_runtime::{MessageSink, PanelDispatcher};
pub use dispatch_scope::PanelCommand;

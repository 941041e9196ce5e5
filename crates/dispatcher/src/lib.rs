pub mod cadence;
pub mod gate;
pub mod scheduler;

pub use cadence::CadenceExpression;
pub use gate::ExecutionGate;
pub use scheduler::JobDispatcher;

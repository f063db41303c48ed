mod splines_logic;

pub use splines_logic::{ReconcileSummary, SplinesEvent, SplinesLogic, SyncKey};

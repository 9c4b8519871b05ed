pub mod dispatch;
pub mod estimator;
pub mod lifecycle;
pub mod spatial;

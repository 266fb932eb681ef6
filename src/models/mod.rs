pub mod alert;
pub mod alert_rule;
pub mod monitored_address;
pub mod requests;
pub mod risk_assessment;
pub mod risk_model;

pub use alert::*;
pub use alert_rule::*;
pub use monitored_address::*;
pub use requests::*;
pub use risk_assessment::*;
pub use risk_model::*;

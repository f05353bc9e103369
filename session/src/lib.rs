pub mod model;
pub mod step;
pub mod subscription;

pub use model::{INITIAL_PRICE, SessionId, SessionState};
pub use step::price_step;
pub use subscription::SubscriptionSession;

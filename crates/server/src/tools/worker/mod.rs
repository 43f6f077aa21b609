//! Service worker event tools.

pub mod fetch;
pub mod lifecycle;
pub mod message;
pub mod push;

pub use fetch::{SwFetchParams, fetch_impl};
pub use lifecycle::{activate_impl, install_impl};
pub use message::{SwMessageParams, message_impl};
pub use push::{ClientRegisterParams, SwNotificationClickParams, SwPushParams, click_impl, push_impl, register_impl};

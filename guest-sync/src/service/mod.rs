//! Guest domain facade
//!
//! [`GuestService`] is the only entry point UI code needs: it routes writes
//! to the remote store or the pending queue, merges confirmed state with
//! pending actions and publishes the result as a [`GuestView`].

mod guest_service;
mod view;

pub use guest_service::GuestService;
pub use view::{GuestNotice, GuestView};

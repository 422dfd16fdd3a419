//! Client side of the shared-expense ledger.
//!
//! - [`Repository`] is the boundary to the remote API: every call returns a
//!   typed result or one [`DomainError`].
//! - [`Settlements`] drives payment confirmations through the ledger state
//!   machine, one round trip per transition.
//! - [`SyncLoop`] polls collections and flags id-set changes.
//! - [`Session`] owns all of the above for one signed-in user.

pub use error::{ClientError, DEFAULT_API_ERROR_MESSAGE, DomainError, Result};
pub use notification::Notification;
pub use repository::{GroupChanges, Repository};
pub use session::{DEFAULT_NOTIFICATIONS_INTERVAL, Session, SessionConfig};
pub use settlement::Settlements;
pub use sync::{ChangeSignal, GroupList, SyncCache, SyncLoop, SyncResource, UnreadNotifications};

mod convert;
mod error;
mod notification;
mod repository;
mod session;
mod settlement;
pub mod sync;
pub mod transport;

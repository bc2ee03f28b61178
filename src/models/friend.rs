use rorm::fields::types::ForeignModel;
use rorm::{DbEnum, Model, Patch};
use uuid::Uuid;

use crate::models::Account;

/// The state of a [Friendship]
#[derive(DbEnum, Copy, Clone, Debug, Eq, PartialEq)]
pub enum FriendshipState {
    /// The request has been sent, the recipient has not answered yet
    Pending,
    /// The recipient has accepted the request
    Accepted,
    /// The recipient has rejected the request
    Rejected,
}

/// The representation of a friendship between two accounts.
///
/// There is exactly one record per pair of users, regardless of direction.
/// Once the state is [FriendshipState::Accepted], the relation counts for
/// both directions.
#[derive(Model)]
pub struct Friendship {
    /// Primary key of this friendship
    #[rorm(primary_key)]
    pub uuid: Uuid,

    /// The state of the friendship
    pub state: FriendshipState,

    /// The account that sent the request
    #[rorm(on_update = "Cascade", on_delete = "Cascade")]
    pub from: ForeignModel<Account>,

    /// The account that received the request
    #[rorm(on_update = "Cascade", on_delete = "Cascade")]
    pub to: ForeignModel<Account>,

    /// The point in time the request was sent
    #[rorm(auto_create_time)]
    pub created_at: chrono::NaiveDateTime,
}

#[derive(Patch)]
#[rorm(model = "Friendship")]
pub(crate) struct FriendshipInsert {
    pub(crate) uuid: Uuid,
    pub(crate) state: FriendshipState,
    pub(crate) from: ForeignModel<Account>,
    pub(crate) to: ForeignModel<Account>,
}

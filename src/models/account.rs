use rorm::{Model, Patch};
use uuid::Uuid;

/// A user account
#[derive(Model)]
pub struct Account {
    /// The primary key of a user.
    ///
    /// This will be a uuid.
    #[rorm(primary_key)]
    pub uuid: Uuid,

    /// The username of the client
    #[rorm(max_length = 255, unique)]
    pub username: String,

    /// The name that is displayed for this user
    #[rorm(max_length = 255)]
    pub display_name: String,

    /// The email address of the user
    #[rorm(max_length = 255, unique)]
    pub email: String,

    /// The public token other users search for to send a friend request.
    ///
    /// Generated once at registration, never changed.
    #[rorm(max_length = 32, unique)]
    pub friend_code: String,

    /// An optional url to an avatar image
    #[rorm(max_length = 1024)]
    pub avatar: Option<String>,

    /// The password hash of the user.
    #[rorm(max_length = 1024)]
    pub password_hash: String,

    /// The last time the user has logged in
    pub last_login: Option<chrono::NaiveDateTime>,

    /// The point in time the account was created
    #[rorm(auto_create_time)]
    pub created_at: chrono::NaiveDateTime,
}

#[derive(Patch)]
#[rorm(model = "Account")]
pub(crate) struct AccountInsert {
    pub(crate) uuid: Uuid,
    pub(crate) username: String,
    pub(crate) display_name: String,
    pub(crate) email: String,
    pub(crate) friend_code: String,
    pub(crate) avatar: Option<String>,
    pub(crate) password_hash: String,
    pub(crate) last_login: Option<chrono::NaiveDateTime>,
}

use rorm::fields::types::{BackRef, ForeignModel};
use rorm::{field, DbEnum, Model, Patch};
use uuid::Uuid;

use crate::models::Account;

/// The kind of a [Competition]
#[derive(DbEnum, Copy, Clone, Debug, Eq, PartialEq)]
pub enum CompetitionKind {
    /// An 18 hole birdie checklist
    BirdieChecklist,
    /// A bingo board of challenges per participant
    Bingo,
}

/// A group challenge between multiple participants.
///
/// For [CompetitionKind::BirdieChecklist] 18 [CompetitionHole]s are created
/// together with the competition. For [CompetitionKind::Bingo] every
/// participant receives `board_size * board_size` [BingoSquare]s.
#[derive(Model)]
pub struct Competition {
    /// Primary key of the competition
    #[rorm(primary_key)]
    pub uuid: Uuid,

    /// Title of the competition
    #[rorm(max_length = 255)]
    pub title: String,

    /// The kind of the competition
    pub kind: CompetitionKind,

    /// Side length of the bingo board.
    ///
    /// Unused for birdie checklists.
    #[rorm(default = 5)]
    pub board_size: i16,

    /// The account that created the competition
    #[rorm(on_update = "Cascade", on_delete = "Cascade")]
    pub creator: ForeignModel<Account>,

    /// The accounts participating in this competition
    pub participants: BackRef<field!(CompetitionParticipant::F.competition)>,

    /// The point in time the competition was created
    #[rorm(auto_create_time)]
    pub created_at: chrono::NaiveDateTime,

    /// The point in time the competition was last updated
    #[rorm(auto_create_time, auto_update_time)]
    pub updated_at: chrono::NaiveDateTime,
}

#[derive(Patch)]
#[rorm(model = "Competition")]
pub(crate) struct CompetitionInsert {
    pub(crate) uuid: Uuid,
    pub(crate) title: String,
    pub(crate) kind: CompetitionKind,
    pub(crate) board_size: i16,
    pub(crate) creator: ForeignModel<Account>,
}

/// The m2m relation between competitions and accounts
#[derive(Model)]
pub struct CompetitionParticipant {
    /// Primary key of a participant
    #[rorm(primary_key)]
    pub uuid: Uuid,

    /// The competition
    #[rorm(on_update = "Cascade", on_delete = "Cascade")]
    pub competition: ForeignModel<Competition>,

    /// The participating account
    #[rorm(on_update = "Cascade", on_delete = "Cascade")]
    pub member: ForeignModel<Account>,
}

#[derive(Patch)]
#[rorm(model = "CompetitionParticipant")]
pub(crate) struct CompetitionParticipantInsert {
    pub(crate) uuid: Uuid,
    pub(crate) competition: ForeignModel<Competition>,
    pub(crate) member: ForeignModel<Account>,
}

/// One hole of a birdie checklist competition.
///
/// All 18 holes are created upfront, regardless of whether anyone ever
/// logs a birdie on them.
#[derive(Model)]
pub struct CompetitionHole {
    /// Primary key of the hole
    #[rorm(primary_key)]
    pub uuid: Uuid,

    /// The competition this hole belongs to
    #[rorm(on_update = "Cascade", on_delete = "Cascade")]
    pub competition: ForeignModel<Competition>,

    /// The number of the hole, 1 through 18
    pub hole_number: i16,
}

#[derive(Patch)]
#[rorm(model = "CompetitionHole")]
pub(crate) struct CompetitionHoleInsert {
    pub(crate) uuid: Uuid,
    pub(crate) competition: ForeignModel<Competition>,
    pub(crate) hole_number: i16,
}

/// A logged birdie on a hole of a birdie checklist.
///
/// At most one birdie exists per (hole, achiever).
#[derive(Model)]
pub struct Birdie {
    /// Primary key of the birdie
    #[rorm(primary_key)]
    pub uuid: Uuid,

    /// The hole the birdie was achieved on
    #[rorm(on_update = "Cascade", on_delete = "Cascade")]
    pub hole: ForeignModel<CompetitionHole>,

    /// The participant that achieved the birdie
    #[rorm(on_update = "Cascade", on_delete = "Cascade")]
    pub achiever: ForeignModel<Account>,

    /// An optional second participant vouching for the birdie
    #[rorm(on_update = "Cascade", on_delete = "SetNull")]
    pub attester: Option<ForeignModel<Account>>,

    /// The day the birdie was achieved
    pub achieved_at: chrono::NaiveDateTime,
}

#[derive(Patch)]
#[rorm(model = "Birdie")]
pub(crate) struct BirdieInsert {
    pub(crate) uuid: Uuid,
    pub(crate) hole: ForeignModel<CompetitionHole>,
    pub(crate) achiever: ForeignModel<Account>,
    pub(crate) attester: Option<ForeignModel<Account>>,
    pub(crate) achieved_at: chrono::NaiveDateTime,
}

/// One square of a participant's personal bingo board.
///
/// Boards are per participant: every participant of a bingo competition
/// owns `board_size * board_size` squares sampled from the challenge pool.
#[derive(Model)]
pub struct BingoSquare {
    /// Primary key of the square
    #[rorm(primary_key)]
    pub uuid: Uuid,

    /// The competition this square belongs to
    #[rorm(on_update = "Cascade", on_delete = "Cascade")]
    pub competition: ForeignModel<Competition>,

    /// The participant this square was dealt to
    #[rorm(on_update = "Cascade", on_delete = "Cascade")]
    pub owner: ForeignModel<Account>,

    /// Position of the square on the board, row-major starting at 1
    pub square_number: i16,

    /// The challenge to complete
    #[rorm(max_length = 255)]
    pub description: String,

    /// Whether the owner has completed the challenge
    #[rorm(default = false)]
    pub completed: bool,

    /// The point in time the challenge was completed
    pub completed_at: Option<chrono::NaiveDateTime>,

    /// An optional second participant vouching for the completion
    #[rorm(on_update = "Cascade", on_delete = "SetNull")]
    pub attester: Option<ForeignModel<Account>>,
}

#[derive(Patch)]
#[rorm(model = "BingoSquare")]
pub(crate) struct BingoSquareInsert {
    pub(crate) uuid: Uuid,
    pub(crate) competition: ForeignModel<Competition>,
    pub(crate) owner: ForeignModel<Account>,
    pub(crate) square_number: i16,
    pub(crate) description: String,
    pub(crate) completed: bool,
    pub(crate) completed_at: Option<chrono::NaiveDateTime>,
    pub(crate) attester: Option<ForeignModel<Account>>,
}

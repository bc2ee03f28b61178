use rorm::fields::types::{BackRef, ForeignModel};
use rorm::{field, DbEnum, Model, Patch};
use uuid::Uuid;

use crate::models::Account;

/// The state of a [Match]
#[derive(DbEnum, Copy, Clone, Debug, Eq, PartialEq)]
pub enum MatchState {
    /// The match is still being played
    Active,
    /// The players have closed the match
    Completed,
}

/// The review state of a [MatchResult]
#[derive(DbEnum, Copy, Clone, Debug, Eq, PartialEq)]
pub enum ResultState {
    /// Waiting for the counterpart player to review the result
    Pending,
    /// The counterpart accepted the result, it counts towards the tally
    Accepted,
    /// The counterpart rejected the result, it never counts
    Rejected,
}

/// A long-running 1v1 competition between two friends.
///
/// `player1_wins` / `player2_wins` are denormalized counters over all
/// accepted results and are recomputed whenever a result is accepted.
#[derive(Model)]
pub struct Match {
    /// Primary key of the match
    #[rorm(primary_key)]
    pub uuid: Uuid,

    /// Name of the match
    #[rorm(max_length = 255)]
    pub title: String,

    /// The state of the match
    pub state: MatchState,

    /// The player that created the match
    #[rorm(on_update = "Cascade", on_delete = "Cascade")]
    pub player1: ForeignModel<Account>,

    /// The challenged player
    #[rorm(on_update = "Cascade", on_delete = "Cascade")]
    pub player2: ForeignModel<Account>,

    /// Rounds won by player 1
    #[rorm(default = 0)]
    pub player1_wins: i64,

    /// Rounds won by player 2
    #[rorm(default = 0)]
    pub player2_wins: i64,

    /// The results that have been submitted for this match
    pub results: BackRef<field!(MatchResult::F.match_)>,

    /// The point in time the match was created
    #[rorm(auto_create_time)]
    pub created_at: chrono::NaiveDateTime,

    /// The point in time the match was last updated
    #[rorm(auto_create_time, auto_update_time)]
    pub updated_at: chrono::NaiveDateTime,
}

#[derive(Patch)]
#[rorm(model = "Match")]
pub(crate) struct MatchInsert {
    pub(crate) uuid: Uuid,
    pub(crate) title: String,
    pub(crate) state: MatchState,
    pub(crate) player1: ForeignModel<Account>,
    pub(crate) player2: ForeignModel<Account>,
}

/// One submitted round of a [Match].
///
/// The strokes are raw scores for a single round. A result only counts
/// towards the match tally once the player who did not submit it has
/// accepted it.
#[derive(Model)]
pub struct MatchResult {
    /// Primary key of the result
    #[rorm(primary_key)]
    pub uuid: Uuid,

    /// The match this result belongs to
    #[rorm(on_update = "Cascade", on_delete = "Cascade")]
    pub match_: ForeignModel<Match>,

    /// The player that submitted the result
    #[rorm(on_update = "Cascade", on_delete = "Cascade")]
    pub submitter: ForeignModel<Account>,

    /// Strokes of player 1 in this round
    pub player1_strokes: i64,

    /// Strokes of player 2 in this round
    pub player2_strokes: i64,

    /// The day the round was played
    pub played_at: chrono::NaiveDateTime,

    /// The review state of the result
    pub state: ResultState,

    /// The point in time the result was submitted
    #[rorm(auto_create_time)]
    pub created_at: chrono::NaiveDateTime,
}

#[derive(Patch)]
#[rorm(model = "MatchResult")]
pub(crate) struct MatchResultInsert {
    pub(crate) uuid: Uuid,
    pub(crate) match_: ForeignModel<Match>,
    pub(crate) submitter: ForeignModel<Account>,
    pub(crate) player1_strokes: i64,
    pub(crate) player2_strokes: i64,
    pub(crate) played_at: chrono::NaiveDateTime,
    pub(crate) state: ResultState,
}

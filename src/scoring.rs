//! The scoring and progress engine.
//!
//! Everything in here is a pure function over plain data. The handlers
//! load the relevant rows, map them into these types and persist whatever
//! comes out. This keeps the actual rules independent of the database
//! layer and testable without one.

use std::collections::HashSet;
use std::hash::Hash;

/// Decides which side of a round wins.
///
/// Golf is stroke play, so the default is [ScoringMode::LowerWins].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ScoringMode {
    /// The side with fewer strokes wins the round
    LowerWins,
    /// The side with the higher score wins the round
    HigherWins,
}

/// The scores of one submitted round
#[derive(Copy, Clone, Debug)]
pub struct RoundScores {
    /// Strokes of player 1
    pub player1: i64,
    /// Strokes of player 2
    pub player2: i64,
    /// Whether the counterpart player has accepted the result
    pub accepted: bool,
}

/// The denormalized running score of a match
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct MatchTally {
    /// Rounds won by player 1
    pub player1_wins: i64,
    /// Rounds won by player 2
    pub player2_wins: i64,
}

/// Folds all rounds of a match into a won-round count per player.
///
/// Only accepted rounds count. Ties count for neither side. Who submitted
/// a round has no influence on the tally.
pub fn tally_rounds(rounds: &[RoundScores], mode: ScoringMode) -> MatchTally {
    let mut tally = MatchTally::default();

    for round in rounds.iter().filter(|r| r.accepted) {
        let p1_won = match mode {
            ScoringMode::LowerWins => round.player1 < round.player2,
            ScoringMode::HigherWins => round.player1 > round.player2,
        };
        let p2_won = match mode {
            ScoringMode::LowerWins => round.player2 < round.player1,
            ScoringMode::HigherWins => round.player2 > round.player1,
        };

        if p1_won {
            tally.player1_wins += 1;
        } else if p2_won {
            tally.player2_wins += 1;
        }
    }

    tally
}

/// A participant's progress in a competition
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ProgressSummary {
    /// Number of completed holes / squares
    pub completed: usize,
    /// Number of holes / squares in total
    pub total: usize,
    /// `completed / total` in whole percent, rounded half up
    pub percentage: u8,
}

/// Builds a [ProgressSummary] from raw counts.
///
/// `completed` is clamped to `total`, a total of zero yields 0%.
pub fn progress(completed: usize, total: usize) -> ProgressSummary {
    let completed = completed.min(total);
    let percentage = if total == 0 {
        0
    } else {
        ((completed * 100 + total / 2) / total) as u8
    };

    ProgressSummary {
        completed,
        total,
        percentage,
    }
}

/// Counts the distinct keys a participant has completed and turns the count
/// into a [ProgressSummary] over `total`.
///
/// Duplicate entries for the same key are counted once. The persistence
/// layer rejects such duplicates on creation, this merely keeps the
/// aggregation correct regardless.
pub fn distinct_progress<K: Eq + Hash>(keys: impl IntoIterator<Item = K>, total: usize) -> ProgressSummary {
    let distinct: HashSet<K> = keys.into_iter().collect();
    progress(distinct.len(), total)
}

/// Sorts per-participant summaries into a leaderboard.
///
/// Ordered by descending completion count. Participants with equal
/// progress keep their original order.
pub fn leaderboard<T>(mut entries: Vec<(T, ProgressSummary)>) -> Vec<(T, ProgressSummary)> {
    entries.sort_by_key(|(_, summary)| std::cmp::Reverse(summary.completed));
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round(p1: i64, p2: i64, accepted: bool) -> RoundScores {
        RoundScores {
            player1: p1,
            player2: p2,
            accepted,
        }
    }

    #[test]
    fn tally_counts_only_accepted_rounds() {
        let rounds = [round(70, 75, true), round(74, 71, true), round(70, 73, false)];

        let tally = tally_rounds(&rounds, ScoringMode::LowerWins);
        assert_eq!(
            tally,
            MatchTally {
                player1_wins: 1,
                player2_wins: 1
            }
        );
    }

    #[test]
    fn tally_of_no_rounds_is_zero() {
        assert_eq!(tally_rounds(&[], ScoringMode::LowerWins), MatchTally::default());
    }

    #[test]
    fn tied_rounds_count_for_neither_side() {
        let rounds = [round(72, 72, true), round(68, 72, true)];

        let tally = tally_rounds(&rounds, ScoringMode::LowerWins);
        assert_eq!(
            tally,
            MatchTally {
                player1_wins: 1,
                player2_wins: 0
            }
        );
    }

    #[test]
    fn higher_wins_inverts_the_outcome() {
        let rounds = [round(70, 75, true), round(74, 71, true)];

        let tally = tally_rounds(&rounds, ScoringMode::HigherWins);
        assert_eq!(
            tally,
            MatchTally {
                player1_wins: 1,
                player2_wins: 1
            }
        );
    }

    #[test]
    fn percentage_is_rounded() {
        assert_eq!(progress(7, 18).percentage, 39);
        assert_eq!(progress(1, 18).percentage, 6);
        assert_eq!(progress(0, 18).percentage, 0);
        assert_eq!(progress(18, 18).percentage, 100);
        assert_eq!(progress(12, 25).percentage, 48);
    }

    #[test]
    fn progress_handles_empty_and_overfull_input() {
        assert_eq!(
            progress(3, 0),
            ProgressSummary {
                completed: 0,
                total: 0,
                percentage: 0
            }
        );
        // Clamped, cannot exceed 100%
        assert_eq!(progress(20, 18).completed, 18);
        assert_eq!(progress(20, 18).percentage, 100);
    }

    #[test]
    fn duplicate_entries_are_counted_once() {
        let holes = [3u8, 3, 7, 12, 7];
        let summary = distinct_progress(holes, 18);
        assert_eq!(summary.completed, 3);
        assert_eq!(summary.percentage, 17);
    }

    #[test]
    fn leaderboard_sorts_descending_and_is_stable() {
        let entries = vec![
            ("a", progress(2, 18)),
            ("b", progress(5, 18)),
            ("c", progress(2, 18)),
            ("d", progress(9, 18)),
        ];

        let names: Vec<&str> = leaderboard(entries).into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["d", "b", "a", "c"]);
    }
}

//! Match Simulation Step
//!
//! One call to [`advance`] moves a match forward by one scheduler tick:
//! maybe inject a highlight, maybe resolve a game, and cascade into set,
//! tiebreak and match resolution.

use chrono::{DateTime, Utc};

use crate::SETS_TO_WIN;
use crate::game::events::{Highlight, MatchEvent, HIGHLIGHTS};
use crate::game::state::{MatchState, MatchStatus, Side};

/// Probability that a tick tries to inject a highlight.
pub const HIGHLIGHT_CHANCE: f64 = 0.4;

/// Games needed to take a set outright.
pub const GAMES_TO_WIN_SET: u8 = 6;

/// Game score that triggers a tiebreak.
pub const TIEBREAK_AT: [u8; 2] = [6, 6];

/// What one `advance` call changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdvanceOutcome {
    /// A game was resolved this call.
    pub game_winner: Option<Side>,
    /// A set was completed this call.
    pub set_completed: bool,
    /// The match finished this call.
    pub match_ended: bool,
}

/// Advance a match by one tick, stamping events with the current time.
pub fn advance(state: &mut MatchState) -> AdvanceOutcome {
    advance_at(state, Utc::now())
}

/// Advance a match by one tick with an explicit clock reading.
///
/// No-op once the match is finished.
pub fn advance_at(state: &mut MatchState, now: DateTime<Utc>) -> AdvanceOutcome {
    let mut outcome = AdvanceOutcome::default();

    if state.is_finished() {
        return outcome;
    }

    state.tick_counter += 1;

    if state.rng.chance(HIGHLIGHT_CHANCE) {
        inject_highlight(state, now);
    }

    // Pacing gate: the modulus is redrawn from {1, 2} every call.
    let modulus = u64::from(state.rng.next_int_range(1, 2));
    if state.tick_counter % modulus == 0 {
        let winner = if state.rng.next_f64() < state.strength {
            Side::A
        } else {
            Side::B
        };
        resolve_game(state, winner, now, &mut outcome);
    }

    state.debug_check_invariants();
    outcome
}

/// Pick a highlight whose own trigger passes and credit it to a random player.
fn inject_highlight(state: &mut MatchState, now: DateTime<Utc>) {
    let triggered: Vec<&Highlight> = HIGHLIGHTS
        .iter()
        .filter(|h| state.rng.chance(h.probability))
        .collect();

    let Some(highlight) = state.rng.choose(&triggered).copied() else {
        return;
    };

    let side = if state.rng.next_int(2) == 0 { Side::A } else { Side::B };
    let event = MatchEvent::highlight(
        state.elapsed_label_at(now),
        state.player_name(side),
        highlight,
    );
    state.push_event(event);
}

/// Award a game to `winner` and cascade into tiebreak/set resolution.
pub(crate) fn resolve_game(
    state: &mut MatchState,
    winner: Side,
    now: DateTime<Utc>,
    outcome: &mut AdvanceOutcome,
) {
    let w = winner.index();
    let l = winner.opponent().index();

    state.games[w] += 1;
    outcome.game_winner = Some(winner);

    if state.games == TIEBREAK_AT {
        resolve_tiebreak(state, winner, now, outcome);
    } else if state.games[w] >= GAMES_TO_WIN_SET
        && state.games[w].saturating_sub(state.games[l]) >= 2
    {
        resolve_set(state, winner, now, outcome);
    } else {
        let event = MatchEvent::game_won(state.elapsed_label_at(now), state.player_name(winner));
        state.push_event(event);
    }
}

/// Resolve a 6-6 set in one step.
///
/// The tiebreak score is display-only and never feeds back into `games`.
fn resolve_tiebreak(
    state: &mut MatchState,
    winner: Side,
    now: DateTime<Utc>,
    outcome: &mut AdvanceOutcome,
) {
    state.push_event(MatchEvent::tiebreak_started(state.elapsed_label_at(now)));

    let score = format!("7-{}", state.rng.next_int_range(0, 6));
    let label = state.elapsed_label_at(now);
    let event = MatchEvent::tiebreak_won(label, state.player_name(winner), &score);
    state.push_event(event);

    resolve_set(state, winner, now, outcome);
}

/// Record the set from player A's side, reset games, and check for match end.
fn resolve_set(
    state: &mut MatchState,
    winner: Side,
    now: DateTime<Utc>,
    outcome: &mut AdvanceOutcome,
) {
    let score = format!("{}-{}", state.games[0], state.games[1]);
    state.set_history.push(score.clone());
    state.sets_won[winner.index()] += 1;

    let event = MatchEvent::set_won(state.elapsed_label_at(now), state.player_name(winner), &score);
    state.push_event(event);

    state.games = [0, 0];
    outcome.set_completed = true;

    if state.sets_won[winner.index()] == SETS_TO_WIN {
        state.status = MatchStatus::Finished;
        let event = MatchEvent::match_won(state.elapsed_label_at(now), state.player_name(winner));
        state.push_event(event);
        outcome.match_ended = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::events::ICON_GAME;
    use crate::game::state::ENDED_LABEL;
    use crate::MAX_VISIBLE_EVENTS;
    use proptest::prelude::*;

    /// Drive a match until it ends, with a safety cap.
    fn run_to_end(state: &mut MatchState) -> usize {
        let now = state.started_at;
        let mut calls = 0;
        while !state.is_finished() {
            advance_at(state, now);
            calls += 1;
            assert!(calls < 100_000, "match never finished");
        }
        calls
    }

    #[test]
    fn test_advance_determinism() {
        let start = Utc::now();
        let mut a = MatchState::new_at(0, "A", "B", 12345, start);
        let mut b = MatchState::new_at(0, "A", "B", 12345, start);

        for _ in 0..200 {
            advance_at(&mut a, start);
            advance_at(&mut b, start);
        }

        assert_eq!(a.sets_won, b.sets_won);
        assert_eq!(a.games, b.games);
        assert_eq!(a.set_history, b.set_history);
        assert_eq!(a.events, b.events);
    }

    #[test]
    fn test_tick_counter_increments_while_live() {
        let mut state = MatchState::new(0, "A", "B", 7);
        advance(&mut state);
        advance(&mut state);
        assert_eq!(state.tick_counter, 2);
    }

    #[test]
    fn test_plain_game_event() {
        let mut state = MatchState::new(0, "Alcaraz", "Sinner", 1);
        let mut outcome = AdvanceOutcome::default();
        let now = state.started_at;

        resolve_game(&mut state, Side::B, now, &mut outcome);

        assert_eq!(state.games, [0, 1]);
        assert_eq!(state.events[0].text, "Game won by Sinner");
        assert_eq!(outcome.game_winner, Some(Side::B));
        assert!(!outcome.set_completed);
    }

    #[test]
    fn test_six_five_is_not_a_set() {
        let mut state = MatchState::new(0, "A", "B", 1);
        state.games = [5, 5];
        let mut outcome = AdvanceOutcome::default();
        let now = state.started_at;

        resolve_game(&mut state, Side::A, now, &mut outcome);

        assert_eq!(state.games, [6, 5]);
        assert!(state.set_history.is_empty());
    }

    #[test]
    fn test_set_recorded_from_player_a_side() {
        let mut state = MatchState::new(0, "Alcaraz", "Sinner", 1);
        state.games = [4, 5];
        let mut outcome = AdvanceOutcome::default();
        let now = state.started_at;

        resolve_game(&mut state, Side::B, now, &mut outcome);

        assert_eq!(state.set_history, vec!["4-6".to_string()]);
        assert_eq!(state.sets_won, [0, 1]);
        assert_eq!(state.games, [0, 0]);
        assert_eq!(state.events[0].text, "SET won by Sinner (4-6)");
        assert!(outcome.set_completed);
    }

    #[test]
    fn test_tiebreak_resolves_to_set() {
        let mut state = MatchState::new(0, "Alcaraz", "Sinner", 1);
        state.games = [6, 5];
        let mut outcome = AdvanceOutcome::default();
        let now = state.started_at;

        // B levels at 6-6, which goes straight to the tiebreak.
        resolve_game(&mut state, Side::B, now, &mut outcome);

        assert_eq!(state.games, [0, 0]);
        assert_eq!(state.sets_won, [0, 1]);
        assert_eq!(state.set_history, vec!["6-6".to_string()]);

        // Newest first: set, tiebreak won, tiebreak started.
        assert_eq!(state.events.len(), 3);
        assert!(state.events[0].text.starts_with("SET won by Sinner"));
        assert!(state.events[1].text.starts_with("Tiebreak won by Sinner (7-"));
        assert_eq!(state.events[2].text, "Tiebreak in progress!");
        assert_eq!(state.events[2].icon, ICON_GAME);
    }

    #[test]
    fn test_tiebreak_via_advance_with_gate() {
        // Find a seed whose first advance resolves a game, then force 6-6 ahead of it.
        for seed in 0..1000u64 {
            let mut probe = MatchState::new(0, "A", "B", seed);
            let now = probe.started_at;
            let outcome = advance_at(&mut probe, now);
            let Some(winner) = outcome.game_winner else { continue };

            let mut state = MatchState::new(0, "A", "B", seed);
            state.games = match winner {
                Side::A => [5, 6],
                Side::B => [6, 5],
            };
            let outcome = advance_at(&mut state, now);

            assert!(outcome.set_completed);
            assert_eq!(state.games, [0, 0]);
            assert_eq!(state.set_history, vec!["6-6".to_string()]);
            assert!(state.events[0].text.starts_with("SET won by"));
            assert!(state.events[1].text.starts_with("Tiebreak won by"));
            assert_eq!(state.events[2].text, "Tiebreak in progress!");
            return;
        }
        panic!("no seed resolved a game on the first call");
    }

    #[test]
    fn test_match_ends_at_three_sets() {
        let mut state = MatchState::new(0, "Alcaraz", "Sinner", 1);
        state.sets_won = [2, 1];
        state.set_history = vec!["6-4".into(), "3-6".into(), "7-5".into()];
        state.games = [5, 3];
        let mut outcome = AdvanceOutcome::default();
        let now = state.started_at;

        resolve_game(&mut state, Side::A, now, &mut outcome);

        assert!(outcome.match_ended);
        assert_eq!(state.status, MatchStatus::Finished);
        assert_eq!(state.sets_won, [3, 1]);
        assert_eq!(state.events[0].text, "MATCH won by Alcaraz!");
        assert_eq!(state.events[0].time, ENDED_LABEL);
        assert_eq!(state.events[1].time, "0:00");
        assert_eq!(state.winner(), Some(Side::A));
    }

    #[test]
    fn test_finished_match_is_frozen() {
        let mut state = MatchState::new(0, "A", "B", 2024);
        run_to_end(&mut state);

        let games = state.games;
        let sets = state.sets_won;
        let history = state.set_history.clone();
        let events = state.events.clone();
        let ticks = state.tick_counter;
        let label = state.elapsed_label();

        for _ in 0..50 {
            assert_eq!(advance(&mut state), AdvanceOutcome::default());
        }

        assert_eq!(state.games, games);
        assert_eq!(state.sets_won, sets);
        assert_eq!(state.set_history, history);
        assert_eq!(state.events, events);
        assert_eq!(state.tick_counter, ticks);
        assert_eq!(state.elapsed_label(), label);
        assert_eq!(label, ENDED_LABEL);
    }

    #[test]
    fn test_run_until_player_a_wins() {
        for seed in 0..500u64 {
            let mut state = MatchState::new(0, "Alcaraz", "Sinner", seed);
            run_to_end(&mut state);
            if state.sets_won[0] != 3 {
                continue;
            }

            assert_eq!(state.status, MatchStatus::Finished);
            assert_eq!(state.set_history.len(), state.sets_played());
            assert!((3..=5).contains(&state.set_history.len()));
            assert_eq!(state.events[0].text, "MATCH won by Alcaraz!");
            return;
        }
        panic!("player A never won in 500 seeds");
    }

    proptest! {
        #[test]
        fn prop_history_matches_sets(seed in any::<u64>(), calls in 0usize..400) {
            let mut state = MatchState::new(0, "A", "B", seed);
            let now = state.started_at;
            for _ in 0..calls {
                advance_at(&mut state, now);
                prop_assert_eq!(state.set_history.len(), state.sets_played());
                prop_assert!(state.games.iter().all(|g| *g <= 6));
            }
        }

        #[test]
        fn prop_finishes_exactly_once(seed in any::<u64>()) {
            let mut state = MatchState::new(0, "A", "B", seed);
            let now = state.started_at;
            let mut finishes = 0;
            for _ in 0..2_000 {
                let was_finished = state.is_finished();
                let outcome = advance_at(&mut state, now);
                if outcome.match_ended {
                    finishes += 1;
                    prop_assert!(!was_finished);
                    prop_assert!(state.sets_won.contains(&3));
                }
                if was_finished {
                    prop_assert!(state.is_finished());
                }
            }
            prop_assert!(finishes <= 1);
            prop_assert_eq!(state.is_finished(), finishes == 1);
        }

        #[test]
        fn prop_visible_log_bounded(seed in any::<u64>(), calls in 0usize..300) {
            let mut state = MatchState::new(0, "A", "B", seed);
            for _ in 0..calls {
                advance(&mut state);
            }
            let snapshot = state.to_public_view();
            prop_assert!(snapshot.events.len() <= MAX_VISIBLE_EVENTS);
            prop_assert_eq!(&snapshot.events[..], state.recent_events());
        }

        #[test]
        fn prop_set_scores_are_a_first(seed in any::<u64>()) {
            let mut state = MatchState::new(0, "A", "B", seed);
            let now = state.started_at;
            for _ in 0..2_000 {
                advance_at(&mut state, now);
            }
            for score in &state.set_history {
                let (a, b) = score.split_once('-').unwrap();
                let (a, b): (u8, u8) = (a.parse().unwrap(), b.parse().unwrap());
                prop_assert!(a >= 6 || b >= 6);
            }
        }
    }
}

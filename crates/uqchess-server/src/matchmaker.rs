//! Human-vs-human matchmaking.
//!
//! Clients asking for a human opponent either pair immediately with the
//! oldest colour-compatible waiter or join the wait list themselves. A
//! waiting client's session is parked on its socket; pairing reaches it
//! through a oneshot carrying its resolved colour, while the `started`
//! lines for both players are pushed straight into their outbound channels
//! by the pairing session (so a paired newcomer can never get a `moved`
//! before the waiter's `started` is queued).
//!
//! The scan and the winning entry's removal happen under the wait-list
//! lock, which arbitrates the race between "partner arrived" and "waiter
//! disconnected / changed its mind": a concurrent removal that misses the
//! entry simply falls back to awaiting the oneshot. The lock is released
//! before the game lock is taken; the wait-list lock is a leaf and is
//! never held while acquiring a game's.

use std::sync::Arc;

use tokio::sync::{oneshot, Mutex};
use uqchess_protocol::{Colour, ColourPreference, Reply};

use crate::game::Game;
use crate::types::{ClientId, OutboundTx};

/// One client awaiting a human opponent.
struct Waiting {
    id: ClientId,
    preference: ColourPreference,
    game: Arc<Game>,
    out: OutboundTx,
    paired: oneshot::Sender<Colour>,
}

/// What `find_or_enqueue` did for the newcomer.
pub enum MatchOutcome {
    /// Paired with a waiter; the newcomer adopts the waiter's game.
    Paired { game: Arc<Game>, colour: Colour },
    /// No compatible waiter; the newcomer now waits with a provisional
    /// game of its own, and will learn its colour through the receiver.
    Enqueued {
        game: Arc<Game>,
        paired: oneshot::Receiver<Colour>,
    },
}

/// Resolve two colour preferences into concrete colours, waiter first.
///
/// Two `either`s give the waiter white. An `either` against a specific
/// colour takes the opposite. Identical specific colours don't pair.
pub fn resolve_colours(
    waiting: ColourPreference,
    looking: ColourPreference,
) -> Option<(Colour, Colour)> {
    use ColourPreference::*;
    match (waiting, looking) {
        (Either, Either) => Some((Colour::White, Colour::Black)),
        (Either, White) => Some((Colour::Black, Colour::White)),
        (Either, Black) => Some((Colour::White, Colour::Black)),
        (White, Either) => Some((Colour::White, Colour::Black)),
        (Black, Either) => Some((Colour::Black, Colour::White)),
        (White, Black) => Some((Colour::White, Colour::Black)),
        (Black, White) => Some((Colour::Black, Colour::White)),
        (White, White) | (Black, Black) => None,
    }
}

/// Concrete colour a preference provisionally claims while waiting;
/// `either` sits in the white seat until resolved.
pub fn provisional_colour(preference: ColourPreference) -> Colour {
    match preference {
        ColourPreference::Black => Colour::Black,
        _ => Colour::White,
    }
}

#[derive(Default)]
pub struct WaitList {
    entries: Mutex<Vec<Waiting>>,
}

impl WaitList {
    pub fn new() -> Arc<WaitList> {
        Arc::new(WaitList::default())
    }

    /// Try to pair `id` with the oldest compatible waiter; otherwise add it
    /// to the list.
    pub async fn find_or_enqueue(
        &self,
        id: ClientId,
        preference: ColourPreference,
        out: OutboundTx,
    ) -> MatchOutcome {
        let mut entries = self.entries.lock().await;

        let found = entries
            .iter()
            .enumerate()
            .find_map(|(i, w)| resolve_colours(w.preference, preference).map(|c| (i, c)));

        if let Some((index, (waiter_colour, looking_colour))) = found {
            let waiter = entries.remove(index);
            // removing the entry settles the race on its own; the list
            // lock must not be held while taking the game lock
            drop(entries);

            {
                let mut state = waiter.game.lock().await;
                let (white, black) = match waiter_colour {
                    Colour::White => (waiter.out.clone(), out.clone()),
                    Colour::Black => (out.clone(), waiter.out.clone()),
                };
                state.set_slot(Colour::White, Some(white));
                state.set_slot(Colour::Black, Some(black));
                state.started = true;
            }

            // waiter hears first, exactly as arrival order suggests
            let _ = waiter.out.send(Reply::Started(waiter_colour));
            let _ = out.send(Reply::Started(looking_colour));
            let _ = waiter.paired.send(waiter_colour);

            tracing::info!(
                waiter = waiter.id.0,
                newcomer = id.0,
                "paired into a game"
            );

            return MatchOutcome::Paired {
                game: waiter.game.clone(),
                colour: looking_colour,
            };
        }

        let (paired_tx, paired_rx) = oneshot::channel();
        let game = Game::new_waiting(provisional_colour(preference), out.clone());
        entries.push(Waiting {
            id,
            preference,
            game: game.clone(),
            out,
            paired: paired_tx,
        });

        MatchOutcome::Enqueued {
            game,
            paired: paired_rx,
        }
    }

    /// Remove `id` from the list.
    ///
    /// Returns `false` when the entry is gone, i.e. the client was paired
    /// in the meantime and its oneshot already carries a colour.
    pub async fn remove(&self, id: ClientId) -> bool {
        let mut entries = self.entries.lock().await;
        match entries.iter().position(|w| w.id == id) {
            Some(index) => {
                entries.remove(index);
                true
            }
            None => false,
        }
    }
}

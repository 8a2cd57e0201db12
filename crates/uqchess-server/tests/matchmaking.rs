// Colour resolution and wait-list pairing.

use tokio::sync::mpsc;
use uqchess_protocol::{Colour, ColourPreference, Reply};
use uqchess_server::matchmaker::{resolve_colours, MatchOutcome, WaitList};
use uqchess_server::types::{ClientId, OutboundRx, OutboundTx};

use ColourPreference::{Black, Either, White};

#[test]
fn colour_resolution_table() {
    // (waiting, looking) -> (waiting colour, looking colour)
    assert_eq!(
        resolve_colours(Either, Either),
        Some((Colour::White, Colour::Black))
    );
    assert_eq!(
        resolve_colours(Either, White),
        Some((Colour::Black, Colour::White))
    );
    assert_eq!(
        resolve_colours(Either, Black),
        Some((Colour::White, Colour::Black))
    );
    assert_eq!(
        resolve_colours(White, Either),
        Some((Colour::White, Colour::Black))
    );
    assert_eq!(
        resolve_colours(Black, Either),
        Some((Colour::Black, Colour::White))
    );
    assert_eq!(
        resolve_colours(White, Black),
        Some((Colour::White, Colour::Black))
    );
    assert_eq!(
        resolve_colours(Black, White),
        Some((Colour::Black, Colour::White))
    );
    assert_eq!(resolve_colours(White, White), None);
    assert_eq!(resolve_colours(Black, Black), None);
}

fn outbound() -> (OutboundTx, OutboundRx) {
    mpsc::unbounded_channel()
}

#[tokio::test]
async fn compatible_clients_pair() {
    let waitlist = WaitList::new();
    let (out_a, mut rx_a) = outbound();
    let (out_b, mut rx_b) = outbound();

    let first = waitlist
        .find_or_enqueue(ClientId(1), White, out_a)
        .await;
    let MatchOutcome::Enqueued { game: game_a, paired } = first else {
        panic!("first client should wait");
    };

    let second = waitlist
        .find_or_enqueue(ClientId(2), Black, out_b)
        .await;
    let MatchOutcome::Paired { game: game_b, colour } = second else {
        panic!("second client should pair");
    };
    assert_eq!(colour, Colour::Black);

    // both adopt the waiter's game, now started
    assert!(std::sync::Arc::ptr_eq(&game_a, &game_b));
    assert!(game_a.lock().await.started);

    // the waiter learns its colour through the oneshot
    assert_eq!(paired.await, Ok(Colour::White));

    assert_eq!(rx_a.recv().await, Some(Reply::Started(Colour::White)));
    assert_eq!(rx_b.recv().await, Some(Reply::Started(Colour::Black)));
}

#[tokio::test]
async fn identical_preferences_both_wait() {
    let waitlist = WaitList::new();
    let (out_a, _rx_a) = outbound();
    let (out_b, _rx_b) = outbound();

    let first = waitlist.find_or_enqueue(ClientId(1), White, out_a).await;
    assert!(matches!(first, MatchOutcome::Enqueued { .. }));

    let second = waitlist.find_or_enqueue(ClientId(2), White, out_b).await;
    assert!(matches!(second, MatchOutcome::Enqueued { .. }));
}

#[tokio::test]
async fn oldest_compatible_waiter_wins() {
    let waitlist = WaitList::new();
    let (out_a, mut rx_a) = outbound();
    let (out_b, mut rx_b) = outbound();
    let (out_c, mut rx_c) = outbound();

    // two white waiters, arrival order 1 then 2
    waitlist.find_or_enqueue(ClientId(1), White, out_a).await;
    waitlist.find_or_enqueue(ClientId(2), White, out_b).await;

    let third = waitlist.find_or_enqueue(ClientId(3), Either, out_c).await;
    let MatchOutcome::Paired { colour, .. } = third else {
        panic!("either should pair with a white waiter");
    };
    assert_eq!(colour, Colour::Black);

    // the older waiter got the game; the younger is still waiting
    assert_eq!(rx_a.recv().await, Some(Reply::Started(Colour::White)));
    assert_eq!(rx_c.recv().await, Some(Reply::Started(Colour::Black)));
    assert!(rx_b.try_recv().is_err());
}

#[tokio::test]
async fn removal_reports_whether_entry_was_present() {
    let waitlist = WaitList::new();
    let (out, _rx) = outbound();
    waitlist.find_or_enqueue(ClientId(7), Either, out).await;

    assert!(waitlist.remove(ClientId(7)).await);
    assert!(!waitlist.remove(ClientId(7)).await);
}

#[tokio::test]
async fn paired_entry_is_no_longer_removable() {
    let waitlist = WaitList::new();
    let (out_a, _rx_a) = outbound();
    let (out_b, _rx_b) = outbound();

    waitlist.find_or_enqueue(ClientId(1), Either, out_a).await;
    waitlist.find_or_enqueue(ClientId(2), Either, out_b).await;

    // client 1 was paired away, so a late removal attempt misses
    assert!(!waitlist.remove(ClientId(1)).await);
}

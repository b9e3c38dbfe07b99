mod common;

use common::SystemBuilder;
use cooprings_lib::model::data::CoinStatus;
use cooprings_lib::model::system::{FractalOutcome, System};

fn pair_system(normal: usize, bad: usize) -> System {
    SystemBuilder::new()
        .with_traders(normal, 0, bad)
        .with_config(|c| {
            c.protocol.fractal_min = 1;
            c.protocol.fractal_max = 1;
            c.protocol.verification_min = 1;
            c.protocol.verification_max = 2;
        })
        .build()
}

fn ids(system: &System) -> (String, String) {
    let ids: Vec<String> = system.trader_ids().map(str::to_string).collect();
    (ids[0].clone(), ids[1].clone())
}

#[test]
fn test_two_trader_ring_is_formed_and_paid() {
    let mut system = pair_system(2, 0);
    let (a, b) = ids(&system);

    let first = system.trader_mut(&a).unwrap().create_coin(10.0, 0).unwrap();
    let second = system.trader_mut(&b).unwrap().create_coin(5.0, 1).unwrap();

    // One coin type on its own cannot form a ring.
    assert_eq!(system.process_coin(first.clone()).unwrap(), None);
    assert_coin_status!(system, &first.id, CoinStatus::Run);

    let outcome = system.process_coin(second.clone()).unwrap();
    let Some(FractalOutcome::Accepted {
        fractal_id,
        rounds,
        paid,
    }) = outcome
    else {
        panic!("expected an accepted fractal, got {outcome:?}");
    };
    assert_eq!(rounds, 10);

    let fractal = system.fractal(&fractal_id).unwrap();
    assert_eq!(fractal.cooperation_rings.len(), 1);
    let ring = &fractal.cooperation_rings[0];
    assert_eq!(ring.member_count(), 2);
    assert_close!(ring.weight, 15.0);
    assert_eq!(ring.members, vec![first.id.clone(), second.id.clone()]);
    assert_eq!(
        ring.id,
        cooprings_core::hashing::hash_id(&ring.members),
        "ring ID must be reproducible from its members"
    );

    // The type-0 coin is the investor: 10 shared by weight, plus the prize.
    assert_close!(paid, 10.0 + 2.0);
    assert_coin_status!(system, &first.id, CoinStatus::Paid);
    assert_coin_status!(system, &second.id, CoinStatus::Paid);
    assert_replicas_agree!(system, &first.id);
    assert_replicas_agree!(system, &second.id);

    assert_eq!(system.submit_count(&b), 1);
    assert_eq!(system.accepted_count(&b), 1);
    assert_eq!(system.bad_accept_count(), 0);
}

#[test]
fn test_settled_coins_drop_ring_neighbors() {
    let mut system = pair_system(2, 0);
    let (a, b) = ids(&system);
    let first = system.trader_mut(&a).unwrap().create_coin(10.0, 0).unwrap();
    let second = system.trader_mut(&b).unwrap().create_coin(5.0, 1).unwrap();
    system.process_coin(first.clone()).unwrap();
    system.process_coin(second.clone()).unwrap();

    for id in [&first.id, &second.id] {
        let canonical = system.coin(id).unwrap();
        assert_eq!(canonical.status, CoinStatus::Paid);
        assert!(canonical.next.is_none() && canonical.prev.is_none());
        assert!(canonical.cooperation_id.is_some());
        for trader in system.traders() {
            let replica = trader.ledger().get(id).unwrap();
            assert!(
                replica.next.is_none() && replica.prev.is_none(),
                "trader {} kept neighbors on settled coin {}",
                trader.id(),
                id
            );
            assert_eq!(replica.cooperation_id, canonical.cooperation_id);
        }
    }
    assert!(system.snapshot().check_invariants().is_ok());
}

#[test]
fn test_payouts_reach_every_replica() {
    let mut system = pair_system(2, 0);
    let (a, b) = ids(&system);
    let before_a = system.trader(&a).unwrap().account();
    let before_b = system.trader(&b).unwrap().account();

    let first = system.trader_mut(&a).unwrap().create_coin(10.0, 0).unwrap();
    let second = system.trader_mut(&b).unwrap().create_coin(5.0, 1).unwrap();
    system.process_coin(first).unwrap();
    system.process_coin(second).unwrap();

    let gain_a = 10.0 * 10.0 / 15.0 + 1.0;
    let gain_b = 10.0 * 5.0 / 15.0 + 1.0;
    assert_close!(system.trader(&a).unwrap().account(), before_a + gain_a);
    assert_close!(system.trader(&b).unwrap().account(), before_b + gain_b);
    for trader in system.traders() {
        for profile in trader.known_traders() {
            let expected = if profile.id == a {
                before_a + gain_a
            } else {
                before_b + gain_b
            };
            assert_close!(profile.account, expected);
        }
    }
}

#[test]
fn test_unanimous_dissent_rolls_back_proposer() {
    let mut system = pair_system(0, 2);
    let (a, b) = ids(&system);

    let first = system.trader_mut(&a).unwrap().create_coin(3.0, 0).unwrap();
    let second = system.trader_mut(&b).unwrap().create_coin(4.0, 1).unwrap();
    system.process_coin(first.clone()).unwrap();
    let outcome = system.process_coin(second.clone()).unwrap();

    match outcome {
        Some(FractalOutcome::Rejected {
            dissent, team_size, ..
        }) => assert_eq!(dissent, team_size),
        other => panic!("expected a rejection, got {other:?}"),
    }
    assert_eq!(system.fractals().count(), 0);
    assert_eq!(system.bad_reject_count(), 1);
    assert_eq!(system.submit_count(&b), 1);
    assert_eq!(system.accepted_count(&b), 0);

    // The canonical registry never moved; the proposer freed its replica copies.
    assert_coin_status!(system, &first.id, CoinStatus::Run);
    assert_coin_status!(system, &second.id, CoinStatus::Run);
    let proposer = system.trader(&b).unwrap();
    for id in [&first.id, &second.id] {
        let coin = proposer.ledger().get(id).unwrap();
        assert_eq!(coin.status, CoinStatus::Run);
        assert!(!coin.is_linked());
    }
    assert_eq!(proposer.rings().count(), 0);
}

#[test]
fn test_replayed_coin_is_refused() {
    let mut system = pair_system(2, 0);
    let (a, _) = ids(&system);
    let coin = system.trader_mut(&a).unwrap().create_coin(1.0, 0).unwrap();
    system.process_coin(coin.clone()).unwrap();
    let err = system.process_coin(coin).unwrap_err();
    assert!(!err.is_fatal());
}

#[test]
fn test_forged_coin_is_refused() {
    let mut system = pair_system(2, 0);
    let (a, b) = ids(&system);
    let mut coin = system.trader_mut(&a).unwrap().create_coin(1.0, 0).unwrap();
    coin.owner = b.clone();
    coin.bound_to = b;
    assert!(system.process_coin(coin.clone()).is_err());
    assert!(system.coin(&coin.id).is_none());
}

#[test]
fn test_exhausted_trader_mints_nothing() {
    let mut system = pair_system(2, 0);
    let (a, _) = ids(&system);
    let account = system.trader(&a).unwrap().account();
    let outcome = system.mint_and_process(&a, account + 1.0, 0).unwrap();
    assert_eq!(outcome, cooprings_lib::model::system::MintOutcome::Exhausted);
    assert_eq!(system.coins().count(), 0);
}

use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;

use session::{INITIAL_PRICE, SubscriptionSession, price_step};

#[test]
fn price_after_k_ticks_is_initial_plus_sum_of_steps() {
    const SEED: u64 = 20_250_408;
    const ROUNDS: usize = 50;

    let mut session = SubscriptionSession::create(["BTCUSDT", "ETHUSDT"]);
    let mut rng = StdRng::seed_from_u64(SEED);

    // Replay the same draws in emission order: BTCUSDT then ETHUSDT each round.
    let mut replay = StdRng::seed_from_u64(SEED);
    let mut btc = INITIAL_PRICE;
    let mut eth = INITIAL_PRICE;
    let mut btc_steps = Vec::new();
    let mut eth_steps = Vec::new();

    for _ in 0..ROUNDS {
        let ticks = session.next_tick(&mut rng, 0);
        assert_eq!(ticks.len(), 2);

        let b = price_step(&mut replay);
        let e = price_step(&mut replay);
        btc += b;
        eth += e;
        btc_steps.push(b);
        eth_steps.push(e);

        assert_eq!(ticks[0].symbol, "BTCUSDT");
        assert_eq!(ticks[0].price, btc);
        assert_eq!(ticks[1].symbol, "ETHUSDT");
        assert_eq!(ticks[1].price, eth);
    }

    assert_eq!(session.rounds(), ROUNDS as u64);
    for s in btc_steps.iter().chain(eth_steps.iter()) {
        assert!((-1.0..=1.0).contains(s));
    }

    let btc_sum: f64 = btc_steps.iter().sum();
    let eth_sum: f64 = eth_steps.iter().sum();
    assert!((session.price("BTCUSDT").unwrap() - (INITIAL_PRICE + btc_sum)).abs() < 1e-9);
    assert!((session.price("ETHUSDT").unwrap() - (INITIAL_PRICE + eth_sum)).abs() < 1e-9);
}

#[test]
fn sessions_with_distinct_generators_diverge() {
    let mut a = SubscriptionSession::create(["BTCUSDT"]);
    let mut b = SubscriptionSession::create(["BTCUSDT"]);
    let mut rng_a = StdRng::seed_from_u64(1);
    let mut rng_b = StdRng::seed_from_u64(2);

    let walk_a: Vec<f64> = (0..20).map(|_| a.next_tick(&mut rng_a, 0)[0].price).collect();
    let walk_b: Vec<f64> = (0..20).map(|_| b.next_tick(&mut rng_b, 0)[0].price).collect();

    assert_ne!(walk_a, walk_b);
    assert_ne!(a.id(), b.id());
}

proptest! {
    #[test]
    fn each_round_moves_every_price_by_at_most_a_dollar(
        seed in any::<u64>(),
        symbols in prop::collection::vec("[A-Z]{3,8}", 0..6),
        rounds in 1usize..40,
    ) {
        let mut session = SubscriptionSession::create(symbols.clone());
        let mut rng = StdRng::seed_from_u64(seed);

        let mut unique = symbols.clone();
        unique.sort();
        unique.dedup();
        prop_assert_eq!(session.len(), unique.len());

        for _ in 0..rounds {
            let before: Vec<f64> = unique.iter().map(|s| session.price(s).unwrap()).collect();
            let ticks = session.next_tick(&mut rng, 0);
            prop_assert_eq!(ticks.len(), unique.len());

            for ((tick, sym), prev) in ticks.iter().zip(unique.iter()).zip(before.iter()) {
                prop_assert_eq!(&tick.symbol, sym);
                prop_assert!((tick.price - prev).abs() <= 1.0 + 1e-9);
            }
        }
    }
}

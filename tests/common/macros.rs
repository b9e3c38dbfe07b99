/// Asserts that the canonical coin with the given ID has the given status.
#[macro_export]
macro_rules! assert_coin_status {
    ($system:expr, $id:expr, $status:expr) => {
        let coin = $system.coin($id).expect("Coin not found in system");
        assert_eq!(
            coin.status, $status,
            "Coin {} has status {:?}, expected {:?}",
            $id, coin.status, $status
        );
    };
}

/// Asserts that every replica holds the canonical copy of a coin.
#[macro_export]
macro_rules! assert_replicas_agree {
    ($system:expr, $id:expr) => {
        let canonical = $system.coin($id).expect("Coin not found in system");
        for trader in $system.traders() {
            let replica = trader
                .ledger()
                .get($id)
                .unwrap_or_else(|| panic!("Trader {} never saw coin {}", trader.id(), $id));
            assert_eq!(
                replica.status, canonical.status,
                "Trader {} disagrees on coin {}",
                trader.id(),
                $id
            );
        }
    };
}

/// Asserts two floats are within `1e-9` of each other.
#[macro_export]
macro_rules! assert_close {
    ($left:expr, $right:expr) => {
        let (l, r): (f64, f64) = ($left, $right);
        assert!((l - r).abs() < 1e-9, "{} is not close to {}", l, r);
    };
}

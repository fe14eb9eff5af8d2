//! Optional integrations: an economy for claim prices and refunds, and a
//! placeholder service applied to outgoing messages.

use crate::player::Player;
use crate::utils::lock;
use rustc_hash::FxHashMap;
use std::sync::Mutex;
use tracing::warn;

pub trait Economy: Send + Sync {
    fn default_currency(&self) -> String;

    /// The currency with the given name, if the economy knows it.
    fn currency(&self, name: &str) -> Option<String>;

    fn balance(&self, account: u128, currency: &str) -> f64;

    /// Takes `amount` from the account. Returns false if it could not.
    fn withdraw(&self, account: u128, currency: &str, amount: f64) -> bool;

    fn deposit(&self, account: u128, currency: &str, amount: f64) -> bool;
}

/// Picks the configured currency, or the default one when the name is blank
/// or unknown.
pub fn resolve_currency(economy: &dyn Economy, name: &str) -> String {
    if name.trim().is_empty() {
        return economy.default_currency();
    }
    match economy.currency(name.trim()) {
        Some(currency) => currency,
        None => {
            warn!("Economy currency '{}' not found; using default currency.", name);
            economy.default_currency()
        }
    }
}

/// Takes `amount` if the account holds enough.
pub fn try_withdraw(economy: &dyn Economy, account: u128, currency: &str, amount: f64) -> bool {
    economy.balance(account, currency) >= amount && economy.withdraw(account, currency, amount)
}

/// An economy that keeps balances in memory.
pub struct MemoryEconomy {
    default_currency: String,
    currencies: Vec<String>,
    balances: Mutex<FxHashMap<(u128, String), f64>>,
}

impl MemoryEconomy {
    pub fn new(default_currency: &str) -> MemoryEconomy {
        MemoryEconomy {
            default_currency: default_currency.to_owned(),
            currencies: vec![default_currency.to_owned()],
            balances: Mutex::new(FxHashMap::default()),
        }
    }

    pub fn with_currency(mut self, currency: &str) -> MemoryEconomy {
        self.currencies.push(currency.to_owned());
        self
    }

    pub fn set_balance(&self, account: u128, currency: &str, amount: f64) {
        lock(&self.balances).insert((account, currency.to_owned()), amount);
    }
}

impl Default for MemoryEconomy {
    fn default() -> MemoryEconomy {
        MemoryEconomy::new("coin")
    }
}

impl Economy for MemoryEconomy {
    fn default_currency(&self) -> String {
        self.default_currency.clone()
    }

    fn currency(&self, name: &str) -> Option<String> {
        self.currencies
            .iter()
            .find(|currency| currency.eq_ignore_ascii_case(name))
            .cloned()
    }

    fn balance(&self, account: u128, currency: &str) -> f64 {
        lock(&self.balances)
            .get(&(account, currency.to_owned()))
            .copied()
            .unwrap_or(0.0)
    }

    fn withdraw(&self, account: u128, currency: &str, amount: f64) -> bool {
        if amount < 0.0 {
            return false;
        }
        let mut balances = lock(&self.balances);
        let balance = balances.entry((account, currency.to_owned())).or_insert(0.0);
        if *balance < amount {
            return false;
        }
        *balance -= amount;
        true
    }

    fn deposit(&self, account: u128, currency: &str, amount: f64) -> bool {
        if amount < 0.0 {
            return false;
        }
        *lock(&self.balances)
            .entry((account, currency.to_owned()))
            .or_insert(0.0) += amount;
        true
    }
}

/// Expands placeholders such as `%player_name%` in outgoing text.
pub trait Placeholders: Send + Sync {
    fn apply(&self, player: &dyn Player, text: &str) -> String;
}

/// Leaves text untouched.
pub struct NoPlaceholders;

impl Placeholders for NoPlaceholders {
    fn apply(&self, _player: &dyn Player, text: &str) -> String {
        text.to_owned()
    }
}

//! Pluggable shard-key calculation strategies.
//!
//! Calculators are stateless strategies selected by a stable string key from a
//! process-wide registry and instantiated once per sharding binding. The
//! resolver is agnostic to their matching semantics: a calculator may match
//! by residue class, range membership or hashing.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;
use tracing::{info, warn};

use crate::error::{DbError, DbResult};

/// A shard-key calculation strategy.
///
/// `result` maps a casted column value (rendered as a string by the column's
/// declared type) to a shard-key string. `matches` tests whether a previously
/// computed shard key belongs to this strategy's key space.
pub trait Calculator: Send + Sync {
    fn result(&self, value: &str) -> String;
    fn matches(&self, candidate: &str) -> bool;
}

/// Modulo bucketing: the shard key is `value mod n`.
///
/// A candidate matches when it names a valid residue class of `n`.
#[derive(Debug, Clone)]
pub struct ModuloCalculator {
    modulo: u64,
}

impl ModuloCalculator {
    /// Create a modulo calculator. A zero modulus is clamped to 1.
    pub fn new(modulo: u64) -> Self {
        Self {
            modulo: modulo.max(1),
        }
    }
}

impl Calculator for ModuloCalculator {
    fn result(&self, value: &str) -> String {
        match value.parse::<i64>() {
            Ok(v) => (v.rem_euclid(self.modulo as i64)).to_string(),
            // Non-numeric values hash by length, keeping the key space closed
            Err(_) => ((value.len() as u64) % self.modulo).to_string(),
        }
    }

    fn matches(&self, candidate: &str) -> bool {
        candidate
            .parse::<u64>()
            .is_ok_and(|v| v < self.modulo)
    }
}

/// Range bucketing over ascending upper bounds: the shard key is the index of
/// the first bound the value falls under, or one past the last bound.
#[derive(Debug, Clone)]
pub struct RangeCalculator {
    bounds: Vec<i64>,
}

impl RangeCalculator {
    /// Create a range calculator from ascending upper bounds.
    pub fn new(mut bounds: Vec<i64>) -> Self {
        bounds.sort_unstable();
        Self { bounds }
    }
}

impl Calculator for RangeCalculator {
    fn result(&self, value: &str) -> String {
        let v = value.parse::<i64>().unwrap_or(i64::MAX);
        let idx = self.bounds.iter().position(|b| v < *b);
        idx.unwrap_or(self.bounds.len()).to_string()
    }

    fn matches(&self, candidate: &str) -> bool {
        candidate
            .parse::<usize>()
            .is_ok_and(|v| v <= self.bounds.len())
    }
}

type CalculatorFactory = Box<dyn Fn() -> Arc<dyn Calculator> + Send + Sync>;

static GLOBAL: Lazy<CalculatorRegistry> = Lazy::new(CalculatorRegistry::new);

/// Process-wide registry of calculator strategies, keyed by a stable name.
///
/// Replaces reflective class-reference instantiation: strategies register a
/// factory once at process start and are instantiated once per binding.
pub struct CalculatorRegistry {
    factories: RwLock<HashMap<String, CalculatorFactory>>,
}

impl CalculatorRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            factories: RwLock::new(HashMap::new()),
        }
    }

    /// Register a strategy factory. A name collision overwrites and is
    /// reported, mirroring dialect registration.
    pub fn register<F>(&self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Arc<dyn Calculator> + Send + Sync + 'static,
    {
        let name = name.into();
        let mut factories = self.factories.write().expect("calculator registry poisoned");
        if factories.insert(name.clone(), Box::new(factory)).is_some() {
            warn!(calculator = %name, "Calculator re-registered; previous binding overwritten");
        } else {
            info!(calculator = %name, "Calculator registered");
        }
    }

    /// Instantiate the strategy bound to a name.
    pub fn create(&self, name: &str) -> DbResult<Arc<dyn Calculator>> {
        let factories = self.factories.read().expect("calculator registry poisoned");
        factories
            .get(name)
            .map(|factory| factory())
            .ok_or_else(|| {
                DbError::configuration(format!("Calculator strategy not registered: {name}"))
            })
    }
}

impl Default for CalculatorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Register a calculator strategy in the process-wide registry.
pub fn register_calculator<F>(name: impl Into<String>, factory: F)
where
    F: Fn() -> Arc<dyn Calculator> + Send + Sync + 'static,
{
    GLOBAL.register(name, factory);
}

/// Instantiate a calculator strategy from the process-wide registry.
pub fn create_calculator(name: &str) -> DbResult<Arc<dyn Calculator>> {
    GLOBAL.create(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modulo_result() {
        let calc = ModuloCalculator::new(4);
        assert_eq!(calc.result("9"), "1");
        assert_eq!(calc.result("8"), "0");
        assert_eq!(calc.result("-1"), "3");
    }

    #[test]
    fn test_modulo_matches_residue_space() {
        let calc = ModuloCalculator::new(4);
        assert!(calc.matches("0"));
        assert!(calc.matches("3"));
        assert!(!calc.matches("4"));
        assert!(!calc.matches("abc"));
    }

    #[test]
    fn test_modulo_consistency() {
        let calc = ModuloCalculator::new(4);
        for v in ["0", "1", "7", "9", "12345"] {
            assert!(calc.matches(&calc.result(v)));
        }
    }

    #[test]
    fn test_range_result() {
        let calc = RangeCalculator::new(vec![100, 1000]);
        assert_eq!(calc.result("5"), "0");
        assert_eq!(calc.result("100"), "1");
        assert_eq!(calc.result("999"), "1");
        assert_eq!(calc.result("5000"), "2");
    }

    #[test]
    fn test_range_matches() {
        let calc = RangeCalculator::new(vec![100, 1000]);
        assert!(calc.matches("0"));
        assert!(calc.matches("2"));
        assert!(!calc.matches("3"));
    }

    #[test]
    fn test_registry_create() {
        let registry = CalculatorRegistry::new();
        registry.register("mod4", || Arc::new(ModuloCalculator::new(4)));
        let calc = registry.create("mod4").unwrap();
        assert_eq!(calc.result("9"), "1");
    }

    #[test]
    fn test_registry_unknown_fails() {
        let registry = CalculatorRegistry::new();
        let err = registry.create("nope").err().unwrap();
        assert!(err.is_configuration());
    }
}

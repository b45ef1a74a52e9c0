//! Damage resolution and the counter / weakness relation.

use crate::config::BalanceConfig;
use shared::UnitKind;

/// Kind of the entity on the receiving end of an attack. Buildings have no
/// counter relation with any unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetClass {
    Unit(UnitKind),
    Building,
}

/// `counter_multiplier` when `attacker` counters `target`, else 1.
pub fn counter_multiplier(balance: &BalanceConfig, attacker: UnitKind, target: TargetClass) -> f32 {
    match target {
        TargetClass::Unit(kind) if balance.unit(attacker).counters.contains(&kind) => {
            balance.counter_multiplier
        }
        _ => 1.0,
    }
}

/// `weakness_multiplier` applied to the target's defense when `attacker` is
/// listed as weak to the target's kind, else 1.
pub fn weakness_multiplier(balance: &BalanceConfig, attacker: UnitKind, target: TargetClass) -> f32 {
    match target {
        TargetClass::Unit(kind) if balance.unit(attacker).weak_to.contains(&kind) => {
            balance.weakness_multiplier
        }
        _ => 1.0,
    }
}

/// `max(1, attack × counter × crit − defense × weakness)`.
pub fn compute_damage(
    balance: &BalanceConfig,
    attacker: UnitKind,
    target: TargetClass,
    target_defense: f32,
    critical: bool,
) -> f32 {
    let attack = balance.unit(attacker).attack;
    let crit = if critical {
        balance.crit_multiplier
    } else {
        1.0
    };
    let raw = attack * counter_multiplier(balance, attacker, target) * crit
        - target_defense * weakness_multiplier(balance, attacker, target);
    raw.max(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_counter_beats_unrelated_at_equal_defense() {
        let balance = BalanceConfig::default();
        for attacker in UnitKind::ALL {
            let stats = balance.unit(attacker);
            for countered in &stats.counters {
                let unrelated = UnitKind::ALL
                    .into_iter()
                    .find(|k| !stats.counters.contains(k) && !stats.weak_to.contains(k))
                    .unwrap();
                let boosted =
                    compute_damage(&balance, attacker, TargetClass::Unit(*countered), 2.0, false);
                let plain =
                    compute_damage(&balance, attacker, TargetClass::Unit(unrelated), 2.0, false);
                assert!(boosted > plain, "{:?} vs {:?}", attacker, countered);
            }
        }
    }

    #[test]
    fn test_weakness_boosts_target_defense() {
        let balance = BalanceConfig::default();
        // Infantry is weak to cavalry: cavalry's defense counts 1.5x.
        let damage = compute_damage(
            &balance,
            UnitKind::Infantry,
            TargetClass::Unit(UnitKind::Cavalry),
            2.0,
            false,
        );
        assert_approx_eq!(damage, 10.0 - 2.0 * 1.5);
    }

    #[test]
    fn test_minimum_damage_is_one() {
        let balance = BalanceConfig::default();
        let damage = compute_damage(
            &balance,
            UnitKind::Worker,
            TargetClass::Building,
            500.0,
            false,
        );
        assert_approx_eq!(damage, 1.0);
    }

    #[test]
    fn test_critical_hit() {
        let balance = BalanceConfig::default();
        let damage = compute_damage(
            &balance,
            UnitKind::Infantry,
            TargetClass::Unit(UnitKind::Archer),
            1.0,
            true,
        );
        assert_approx_eq!(damage, 10.0 * 1.5 * 1.5 - 1.0);
    }
}

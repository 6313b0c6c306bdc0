use serde::{Deserialize, Serialize};

use crate::rng::GameRandom;

/// Outcome of one invasion, with the deciding rolls.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombatResult {
    pub attacker_roll: u8,
    /// 0 when the defender had no fleets to roll for.
    pub defender_roll: u8,
    pub attacker_wins: bool,
}

/// Resolve an invasion: each side rolls one d6 per fleet and keeps its best
/// die. The attacker wins ties.
///
/// All attacker dice are drawn from `rng` before any defender die, so a fixed
/// stream gives a fixed outcome.
pub fn resolve_combat<R: GameRandom + ?Sized>(
    attacker_fleets: u32,
    defender_fleets: u32,
    rng: &mut R,
) -> CombatResult {
    debug_assert!(attacker_fleets > 0, "attacker needs at least one fleet");

    let attacker_roll = best_roll(attacker_fleets, rng);
    let defender_roll = best_roll(defender_fleets, rng);

    CombatResult {
        attacker_roll,
        defender_roll,
        attacker_wins: attacker_roll >= defender_roll,
    }
}

fn best_roll<R: GameRandom + ?Sized>(dice: u32, rng: &mut R) -> u8 {
    (0..dice).map(|_| rng.roll_d6()).max().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::testing::ScriptedDice;
    use crate::rng::GameRng;

    #[test]
    fn higher_attacker_roll_wins() {
        let result = resolve_combat(1, 1, &mut ScriptedDice::new(&[6, 3]));
        assert!(result.attacker_wins);
        assert_eq!((result.attacker_roll, result.defender_roll), (6, 3));
    }

    #[test]
    fn higher_defender_roll_repels() {
        let result = resolve_combat(1, 1, &mut ScriptedDice::new(&[1, 6]));
        assert!(!result.attacker_wins);
    }

    #[test]
    fn attacker_wins_ties() {
        for face in 1..=6 {
            let result = resolve_combat(1, 1, &mut ScriptedDice::new(&[face, face]));
            assert!(result.attacker_wins, "tie on {face} should go to attacker");
        }
    }

    #[test]
    fn only_the_best_die_counts() {
        // Attacker rolls 1, 2, 4; defender rolls 5, 3.
        let result = resolve_combat(3, 2, &mut ScriptedDice::new(&[1, 2, 4, 5, 3]));
        assert_eq!(result.attacker_roll, 4);
        assert_eq!(result.defender_roll, 5);
        assert!(!result.attacker_wins);
    }

    #[test]
    fn undefended_system_always_falls() {
        let mut rng = GameRng::seed_from_u64(11);
        for _ in 0..100 {
            let result = resolve_combat(1, 0, &mut rng);
            assert_eq!(result.defender_roll, 0);
            assert!(result.attacker_wins);
        }
    }

    #[test]
    fn combat_resolution_is_deterministic_given_seed() {
        let mut rng1 = GameRng::seed_from_u64(12345);
        let mut rng2 = GameRng::seed_from_u64(12345);
        for attackers in 1..6 {
            assert_eq!(
                resolve_combat(attackers, 3, &mut rng1),
                resolve_combat(attackers, 3, &mut rng2)
            );
        }
    }
}

//! Behavior states and the animation each one shows
//!
//! Simulation code only ever switches between these enums; the sprite-sheet
//! naming is derived from them in one place (`animation_intent`).

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Facing of an actor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    #[default]
    Down,
    Left,
    Right,
}

impl Direction {
    /// Facing for a movement delta: the dominant axis wins, ties go vertical
    pub fn from_delta(delta: Vec2) -> Self {
        if delta.x.abs() > delta.y.abs() {
            if delta.x > 0.0 { Direction::Right } else { Direction::Left }
        } else if delta.y > 0.0 {
            Direction::Down
        } else {
            Direction::Up
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }
}

/// Which half of the spin tween a coin is in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpinPhase {
    /// Growing and drifting toward the settle point
    Rise,
    /// Shrinking back to rest size
    Fall,
}

/// Coin lifecycle: Idle -> Spinning -> (Reward | Miss) -> Idle
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum CoinState {
    #[default]
    Idle,
    Spinning { phase: SpinPhase, settle_at: Vec2 },
    /// Paid out, flashing
    Reward,
    /// Landed on the empty face
    Miss,
}

impl CoinState {
    pub fn is_spinning(&self) -> bool {
        matches!(self, CoinState::Spinning { .. })
    }
}

/// Helper lifecycle: Idle -> Moving -> Attacking -> (fatigue) -> Idle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HelperState {
    #[default]
    Idle,
    Moving,
    Attacking,
    /// Late part of the fatigue window, replays the defeated cue
    Exhausted,
}

/// Slime lifecycle
///
/// Happy path: Idle -> Moving -> Attacking -> Idle (coin eaten).
/// When struck: Hit -> Dying -> Dead, then swept from the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SlimeState {
    #[default]
    Idle,
    Moving,
    Attacking { coin: u32 },
    Hit,
    Dying,
    /// Death sequence finished, awaiting sweep
    Dead,
}

/// Animation clips the renderer knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Clip {
    CoinRest,
    CoinSpin,
    CoinFlash,
    HelperIdle,
    HelperMove,
    HelperAttack,
    HelperExhausted,
    SlimeIdle,
    SlimeMove,
    SlimeAttack,
    SlimeHit,
    SlimeDeath,
}

/// What the renderer should be playing for an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnimationIntent {
    pub clip: Clip,
    /// Sheet row to use (left is drawn as right, flipped)
    pub facing: Direction,
    pub flip_x: bool,
    /// Coin sheets are per kind ("copper", "silver", "gold")
    pub sheet: Option<&'static str>,
}

impl AnimationIntent {
    fn directional(clip: Clip, direction: Direction) -> Self {
        let flip_x = direction == Direction::Left;
        let facing = if flip_x { Direction::Right } else { direction };
        Self {
            clip,
            facing,
            flip_x,
            sheet: None,
        }
    }

    /// Sprite-sheet animation key, e.g. `helper-move-right` or `goldSpin`
    pub fn key(&self) -> String {
        let dir = self.facing.as_str();
        let sheet = self.sheet.unwrap_or("copper");
        match self.clip {
            Clip::CoinRest => format!("{}Coin", sheet),
            Clip::CoinSpin => format!("{}Spin", sheet),
            Clip::CoinFlash => format!("{}Flash", sheet),
            Clip::HelperIdle => format!("helper-idle-{}", dir),
            Clip::HelperMove => format!("helper-move-{}", dir),
            Clip::HelperAttack => format!("helper-attack-{}", dir),
            Clip::HelperExhausted => "helper-death".to_string(),
            Clip::SlimeIdle => format!("slime-idle-{}", dir),
            Clip::SlimeMove => format!("slime-move-{}", dir),
            Clip::SlimeAttack => format!("slime-attack-{}", dir),
            Clip::SlimeHit => format!("slime-hit-{}", dir),
            Clip::SlimeDeath => "slime-death".to_string(),
        }
    }
}

/// Behavior state of any entity kind
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BehaviorState {
    Coin(CoinState),
    Helper(HelperState),
    Slime(SlimeState),
}

/// Pure mapping from behavior state and facing to the animation to show
pub fn animation_intent(state: BehaviorState, direction: Direction) -> AnimationIntent {
    match state {
        BehaviorState::Coin(coin) => {
            let clip = match coin {
                CoinState::Idle | CoinState::Miss => Clip::CoinRest,
                CoinState::Spinning { .. } => Clip::CoinSpin,
                CoinState::Reward => Clip::CoinFlash,
            };
            AnimationIntent {
                clip,
                facing: Direction::Down,
                flip_x: false,
                sheet: None,
            }
        }
        BehaviorState::Helper(helper) => {
            let clip = match helper {
                HelperState::Idle => Clip::HelperIdle,
                HelperState::Moving => Clip::HelperMove,
                HelperState::Attacking => Clip::HelperAttack,
                HelperState::Exhausted => Clip::HelperExhausted,
            };
            AnimationIntent::directional(clip, direction)
        }
        BehaviorState::Slime(slime) => {
            let clip = match slime {
                SlimeState::Idle => Clip::SlimeIdle,
                SlimeState::Moving => Clip::SlimeMove,
                SlimeState::Attacking { .. } => Clip::SlimeAttack,
                SlimeState::Hit => Clip::SlimeHit,
                SlimeState::Dying | SlimeState::Dead => Clip::SlimeDeath,
            };
            AnimationIntent::directional(clip, direction)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_dominant_axis() {
        assert_eq!(Direction::from_delta(Vec2::new(10.0, 3.0)), Direction::Right);
        assert_eq!(Direction::from_delta(Vec2::new(-10.0, 3.0)), Direction::Left);
        assert_eq!(Direction::from_delta(Vec2::new(1.0, 5.0)), Direction::Down);
        assert_eq!(Direction::from_delta(Vec2::new(1.0, -5.0)), Direction::Up);
        // Equal magnitudes fall to the vertical axis
        assert_eq!(Direction::from_delta(Vec2::new(4.0, -4.0)), Direction::Up);
    }

    #[test]
    fn test_left_is_flipped_right() {
        let intent = animation_intent(BehaviorState::Helper(HelperState::Moving), Direction::Left);
        assert_eq!(intent.facing, Direction::Right);
        assert!(intent.flip_x);
        assert_eq!(intent.key(), "helper-move-right");
    }

    #[test]
    fn test_intents_dedup_in_hash_set() {
        use std::collections::HashSet;

        let set: HashSet<AnimationIntent> = [Direction::Left, Direction::Right, Direction::Left]
            .into_iter()
            .map(|d| animation_intent(BehaviorState::Helper(HelperState::Moving), d))
            .collect();
        // Left is the right row flipped, so it stays distinct from right
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_keys() {
        let dying = animation_intent(BehaviorState::Slime(SlimeState::Dying), Direction::Up);
        assert_eq!(dying.key(), "slime-death");

        let attack = animation_intent(
            BehaviorState::Slime(SlimeState::Attacking { coin: 3 }),
            Direction::Down,
        );
        assert_eq!(attack.key(), "slime-attack-down");

        let spin = animation_intent(
            BehaviorState::Coin(CoinState::Spinning {
                phase: SpinPhase::Rise,
                settle_at: Vec2::ZERO,
            }),
            Direction::Down,
        );
        assert_eq!(
            AnimationIntent {
                sheet: Some("gold"),
                ..spin
            }
            .key(),
            "goldSpin"
        );
    }

    #[test]
    fn test_miss_rests() {
        let intent = animation_intent(BehaviorState::Coin(CoinState::Miss), Direction::Down);
        assert_eq!(intent.clip, Clip::CoinRest);
    }
}

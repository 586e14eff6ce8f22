//! Endless obstacle generation and cleanup
//!
//! Sequences lay down pipe pairs at fixed slot spacing as the visible
//! frontier moves right; obstacles falling behind the window are freed from
//! the front of the list. Obstacles and checkpoints are append-ordered, so
//! both stay sorted by x without ever being re-sorted.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::obstacle::{Obstacle, ObstacleKind, Pipe};
use super::rng::GameRng;
use crate::assets::PipeMetrics;
use crate::consts::{FIRST_SEQUENCE_OFFSET, SEQUENCE_RUN_LENGTH};
use crate::settings::Tuning;

/// Generator for a fixed run of obstacle slots
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObstacleSequence {
    pub start_x: f32,
    pub spacing: f32,
    /// Slots already produced
    pub produced: u32,
    pub run_length: u32,
    /// Difficulty level; gaps tighten as it rises
    pub level: u32,
    /// Spawn a successor when this run completes
    pub chain: bool,
}

impl ObstacleSequence {
    pub fn new(start_x: f32, spacing: f32, run_length: u32, level: u32) -> Self {
        Self {
            start_x,
            spacing,
            produced: 0,
            run_length,
            level,
            chain: true,
        }
    }

    pub fn slot_x(&self, slot: u32) -> f32 {
        self.start_x + slot as f32 * self.spacing
    }

    /// Where the slot after this run would sit
    pub fn end_x(&self) -> f32 {
        self.slot_x(self.run_length)
    }

    pub fn successor(&self) -> Self {
        Self::new(self.end_x(), self.spacing, self.run_length, self.level + 1)
    }

    /// Produce every slot between the start and `frontier`.
    ///
    /// Returns false once the run is complete.
    pub fn advance_to(
        &mut self,
        frontier: f32,
        rng: &mut GameRng,
        tuning: &Tuning,
        pipe: &PipeMetrics,
        field: &mut Playfield,
    ) -> bool {
        let due = ((frontier - self.start_x) / self.spacing).floor().max(0.0) as u32;
        let due = due.min(self.run_length);
        while self.produced < due {
            field.spawn_slot(self.slot_x(self.produced), self.level, rng, tuning, pipe);
            self.produced += 1;
        }
        self.produced < self.run_length
    }

    pub fn shift_x(&mut self, dx: f32) {
        self.start_x += dx;
    }
}

/// Opening between the pipe mouths of one slot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gap {
    pub x: f32,
    pub bottom: f32,
    pub top: f32,
}

impl Gap {
    pub fn center(&self) -> f32 {
        (self.bottom + self.top) * 0.5
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Playfield {
    /// Active generators
    pub sequences: Vec<ObstacleSequence>,
    /// Live obstacles (ascending x)
    pub obstacles: Vec<Obstacle>,
    /// Score checkpoints (ascending x)
    pub checkpoints: Vec<f32>,
    /// Frontier up to which obstacles have been generated
    pub spawned_to_x: f32,
    next_id: u32,
    started: bool,
}

impl Playfield {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            ..Default::default()
        }
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Begin generation ahead of the bird
    pub fn start(&mut self, bird_x: f32, pipe: &PipeMetrics) {
        self.sequences.clear();
        self.sequences.push(ObstacleSequence::new(
            bird_x + FIRST_SEQUENCE_OFFSET,
            pipe.spacing,
            SEQUENCE_RUN_LENGTH,
            0,
        ));
        self.spawned_to_x = bird_x;
        self.started = true;
    }

    fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Pipe pair plus a checkpoint at `x`
    pub fn spawn_slot(&mut self, x: f32, level: u32, rng: &mut GameRng, tuning: &Tuning, pipe: &PipeMetrics) {
        let gap = tuning.gap_for_level(level);
        let center = rng.range(tuning.gap_center_min, tuning.gap_center_max);
        let warp = rng.next_float() < tuning.warp_chance;

        let bottom = Pipe::rising(Vec3::new(x, 0.0, center - gap * 0.5), pipe.radius, warp);
        let top = Pipe::hanging(Vec3::new(x, 0.0, center + gap * 0.5), pipe.radius);
        for pipe in [bottom, top] {
            let id = self.next_entity_id();
            self.obstacles.push(Obstacle {
                id,
                kind: ObstacleKind::Pipe(pipe),
            });
        }
        self.checkpoints.push(x);
    }

    /// Advance every active sequence to a new frontier
    pub fn grow(&mut self, frontier: f32, rng: &mut GameRng, tuning: &Tuning, pipe: &PipeMetrics) {
        if !self.started || frontier <= self.spawned_to_x {
            return;
        }
        self.spawned_to_x = frontier;

        let mut active = std::mem::take(&mut self.sequences);
        let mut i = 0;
        while i < active.len() {
            if active[i].advance_to(frontier, rng, tuning, pipe, self) {
                i += 1;
                continue;
            }
            let done = active.remove(i);
            log::debug!("Obstacle sequence at x={:.1} (level {}) complete", done.start_x, done.level);
            if done.chain {
                // Lands at the end of the list and advances in this same pass
                active.push(done.successor());
            }
        }
        self.sequences = active;
    }

    /// Free obstacles wholly behind `invisible_edge`, always keeping the last one
    pub fn prune(&mut self, invisible_edge: f32) {
        let keep_last = self.obstacles.len().saturating_sub(1);
        let removable = self.obstacles[..keep_last]
            .iter()
            .take_while(|o| o.is_removable(invisible_edge))
            .count();
        if removable > 0 {
            self.obstacles.drain(..removable);
        }
    }

    /// Remove checkpoints at or behind `x`; returns how many were passed
    pub fn consume_checkpoints(&mut self, x: f32) -> u32 {
        let passed = self.checkpoints.partition_point(|&c| c <= x);
        self.checkpoints.drain(..passed);
        passed as u32
    }

    /// Difficulty level currently being generated
    pub fn frontier_level(&self) -> u32 {
        self.sequences.iter().map(|s| s.level).min().unwrap_or(0)
    }

    pub fn find(&self, id: u32) -> Option<&Obstacle> {
        self.obstacles.iter().find(|o| o.id == id)
    }

    /// Exit point for a teleport entering obstacle `id`: the next obstacle
    /// further along that can eject
    pub fn eject_point_after(&self, id: u32) -> Option<Vec3> {
        let index = self.obstacles.iter().position(|o| o.id == id)?;
        let entry_x = self.obstacles[index].x();
        self.obstacles[index + 1..]
            .iter()
            .filter(|o| o.x() > entry_x)
            .find_map(|o| o.eject_point())
    }

    /// First pipe gap whose far side is still ahead of `x`
    pub fn gap_ahead(&self, x: f32) -> Option<Gap> {
        let mut bottom = None;
        for obstacle in self.obstacles.iter().filter(|o| o.right_edge() > x) {
            let ObstacleKind::Pipe(pipe) = &obstacle.kind;
            match bottom {
                None if pipe.opens_up() => bottom = Some((obstacle.x(), pipe.mouth().z)),
                Some((gx, bz)) if !pipe.opens_up() && obstacle.x() == gx => {
                    return Some(Gap {
                        x: gx,
                        bottom: bz,
                        top: pipe.mouth().z,
                    });
                }
                _ => {}
            }
        }
        None
    }

    pub fn shift_x(&mut self, dx: f32) {
        for sequence in &mut self.sequences {
            sequence.shift_x(dx);
        }
        for obstacle in &mut self.obstacles {
            obstacle.shift_x(dx);
        }
        for checkpoint in &mut self.checkpoints {
            *checkpoint += dx;
        }
        self.spawned_to_x += dx;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn metrics() -> PipeMetrics {
        PipeMetrics {
            radius: 1.1,
            spacing: 7.0,
        }
    }

    fn is_sorted(values: &[f32]) -> bool {
        values.windows(2).all(|w| w[0] <= w[1])
    }

    #[test]
    fn test_sequence_produces_three_slots() {
        let tuning = Tuning::default();
        let mut rng = GameRng::new(5);
        let mut field = Playfield::new();
        let mut seq = ObstacleSequence::new(0.0, 7.0, 10, 0);

        assert!(seq.advance_to(21.0, &mut rng, &tuning, &metrics(), &mut field));
        assert_eq!(seq.produced, 3);
        assert_eq!(field.obstacles.len(), 6);
        assert_eq!(field.checkpoints, vec![0.0, 7.0, 14.0]);

        // Same frontier again: nothing new
        assert!(seq.advance_to(21.0, &mut rng, &tuning, &metrics(), &mut field));
        assert_eq!(field.obstacles.len(), 6);
        assert_eq!(field.checkpoints.len(), 3);
    }

    #[test]
    fn test_sequence_completes_after_run_length() {
        let tuning = Tuning::default();
        let mut rng = GameRng::new(5);
        let mut field = Playfield::new();
        let mut seq = ObstacleSequence::new(0.0, 7.0, 4, 0);
        assert!(!seq.advance_to(1000.0, &mut rng, &tuning, &metrics(), &mut field));
        assert_eq!(seq.produced, 4);
        assert_eq!(field.checkpoints.len(), 4);
    }

    #[test]
    fn test_slot_forms_gap_of_tuned_height() {
        let tuning = Tuning::default();
        let mut rng = GameRng::new(11);
        let mut field = Playfield::new();
        field.spawn_slot(10.0, 0, &mut rng, &tuning, &metrics());
        let gap = field.gap_ahead(0.0).unwrap();
        assert!((gap.top - gap.bottom - tuning.gap_height).abs() < 1e-5);
        assert!(gap.center() >= tuning.gap_center_min && gap.center() < tuning.gap_center_max);
        assert_eq!(gap.x, 10.0);
    }

    #[test]
    fn test_grow_chains_successor_sequences() {
        let tuning = Tuning::default();
        let mut rng = GameRng::new(3);
        let mut field = Playfield::new();
        field.start(0.0, &metrics());

        // Two full runs plus one slot of the third
        let far = FIRST_SEQUENCE_OFFSET + 7.0 * (SEQUENCE_RUN_LENGTH as f32 * 2.0 + 1.5);
        field.grow(far, &mut rng, &tuning, &metrics());

        assert_eq!(field.checkpoints.len(), (SEQUENCE_RUN_LENGTH * 2 + 1) as usize);
        assert_eq!(field.sequences.len(), 1);
        assert_eq!(field.sequences[0].level, 2);
        assert!(is_sorted(&field.checkpoints));
        // Even spacing across the sequence boundary
        for w in field.checkpoints.windows(2) {
            assert!((w[1] - w[0] - 7.0).abs() < 1e-3);
        }
    }

    #[test]
    fn test_grow_before_start_is_noop() {
        let tuning = Tuning::default();
        let mut rng = GameRng::new(3);
        let mut field = Playfield::new();
        field.grow(100.0, &mut rng, &tuning, &metrics());
        assert!(field.obstacles.is_empty());
    }

    #[test]
    fn test_prune_fifo_keeps_last() {
        let tuning = Tuning::default();
        let mut rng = GameRng::new(3);
        let mut field = Playfield::new();
        for i in 0..4 {
            field.spawn_slot(i as f32 * 7.0, 0, &mut rng, &tuning, &metrics());
        }
        field.prune(9.0);
        // Slots at 0 and 7 end at 1.1 and 8.1
        assert_eq!(field.obstacles.len(), 4);
        assert!((field.obstacles[0].x() - 14.0).abs() < 1e-6);

        field.prune(1000.0);
        assert_eq!(field.obstacles.len(), 1);
    }

    #[test]
    fn test_checkpoints_consumed_in_order() {
        let mut field = Playfield::new();
        field.checkpoints = vec![1.0, 2.0, 3.0];
        assert_eq!(field.consume_checkpoints(0.5), 0);
        assert_eq!(field.consume_checkpoints(2.0), 2);
        assert_eq!(field.checkpoints, vec![3.0]);
    }

    #[test]
    fn test_eject_point_comes_from_a_later_slot() {
        let tuning = Tuning::default();
        let mut rng = GameRng::new(3);
        let mut field = Playfield::new();
        field.spawn_slot(7.0, 0, &mut rng, &tuning, &metrics());
        field.spawn_slot(14.0, 0, &mut rng, &tuning, &metrics());
        let first_bottom = field.obstacles[0].id;
        let eject = field.eject_point_after(first_bottom).unwrap();
        assert!((eject.x - 14.0).abs() < 1e-6);

        let last_bottom = field.obstacles[2].id;
        assert!(field.eject_point_after(last_bottom).is_none());
    }

    proptest! {
        #[test]
        fn prop_obstacles_and_checkpoints_stay_sorted(
            seed in any::<u64>(),
            steps in proptest::collection::vec(0.0f32..40.0, 1..40),
        ) {
            let tuning = Tuning::default();
            let mut rng = GameRng::new(seed);
            let mut field = Playfield::new();
            field.start(0.0, &metrics());
            let mut frontier = 0.0;
            for step in steps {
                frontier += step;
                field.grow(frontier, &mut rng, &tuning, &metrics());
                field.prune(frontier - 45.0);
                field.consume_checkpoints(frontier - 30.0);
                let xs: Vec<f32> = field.obstacles.iter().map(|o| o.x()).collect();
                prop_assert!(is_sorted(&xs));
                prop_assert!(is_sorted(&field.checkpoints));
                prop_assert!(field.checkpoints.iter().all(|&c| c > frontier - 30.0));
            }
        }
    }
}

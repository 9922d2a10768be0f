//! Acquisition groups: stacks that share one distortion profile.

use crate::error::{DistortionError, Result};

/// Group membership of every stack plus one swap flag per group.
///
/// Groups are numbered by first appearance in the stack list; the swap flag
/// of a group selects image y instead of image x as its distortion axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquisitionGroups {
    /// Group index of each stack.
    assignment: Vec<usize>,
    swaps: Vec<bool>,
}

impl AcquisitionGroups {
    /// Build from one label per stack and one swap flag per distinct label,
    /// flags ordered by first appearance of the label.
    pub fn new<L: PartialEq + Copy>(labels: &[L], swaps: Vec<bool>) -> Result<Self> {
        let mut distinct: Vec<L> = Vec::new();
        let assignment = labels
            .iter()
            .map(|label| match distinct.iter().position(|d| d == label) {
                Some(g) => g,
                None => {
                    distinct.push(*label);
                    distinct.len() - 1
                }
            })
            .collect();

        if distinct.len() != swaps.len() {
            return Err(DistortionError::input(format!(
                "{} acquisition groups but {} swap flags",
                distinct.len(),
                swaps.len()
            )));
        }
        Ok(Self { assignment, swaps })
    }

    /// Every one of `num_stacks` stacks in a single group.
    pub fn single(num_stacks: usize, swap: bool) -> Self {
        Self {
            assignment: vec![0; num_stacks],
            swaps: vec![swap],
        }
    }

    /// Number of groups.
    pub fn num_groups(&self) -> usize {
        self.swaps.len()
    }

    /// Number of stacks covered.
    pub fn num_stacks(&self) -> usize {
        self.assignment.len()
    }

    /// Group of stack `stack`.
    pub fn group_of(&self, stack: usize) -> usize {
        self.assignment[stack]
    }

    /// Stack indices in group `group`, ascending.
    pub fn members(&self, group: usize) -> Vec<usize> {
        self.assignment
            .iter()
            .enumerate()
            .filter(|(_, g)| **g == group)
            .map(|(i, _)| i)
            .collect()
    }

    /// Swap flag of group `group`.
    pub fn swap(&self, group: usize) -> bool {
        self.swaps[group]
    }

    /// Check that the groups describe exactly `num_stacks` stacks.
    pub fn validate(&self, num_stacks: usize) -> Result<()> {
        if self.assignment.len() != num_stacks {
            return Err(DistortionError::input(format!(
                "group assignment covers {} stacks, got {}",
                self.assignment.len(),
                num_stacks
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_groups_by_first_appearance() {
        let groups = AcquisitionGroups::new(&[7, 3, 7, 3, 5], vec![false, true, false]).unwrap();
        assert_eq!(groups.num_groups(), 3);
        assert_eq!(groups.members(0), vec![0, 2]);
        assert_eq!(groups.members(1), vec![1, 3]);
        assert_eq!(groups.members(2), vec![4]);
        assert!(groups.swap(1));
        assert_eq!(groups.group_of(4), 2);
    }

    #[test]
    fn test_swap_count_must_match() {
        let result = AcquisitionGroups::new(&["a", "b"], vec![false]);
        assert!(matches!(result, Err(DistortionError::Input(_))));
    }

    #[test]
    fn test_validate_stack_count() {
        let groups = AcquisitionGroups::single(2, false);
        assert!(groups.validate(2).is_ok());
        assert!(matches!(groups.validate(3), Err(DistortionError::Input(_))));
    }
}

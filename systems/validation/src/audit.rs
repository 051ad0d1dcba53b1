use pulse_runner_core::{MapPattern, SongMap};

use crate::constants::{
    DIFFICULTY_RANGE, EDGE_DIFFICULTY_CAP, GAP_WIDTH_RANGE, MAX_BLOCK_WIDTH, MAX_DENSITY,
    MAX_DIFFICULTY_STEP, MAX_OBSTACLE_RUN, MAX_SPIKE_COUNT, MIN_SPACING,
};

/// Single rule a map fails to follow.
#[derive(Clone, Debug, PartialEq)]
pub enum Finding {
    /// A pattern field lies outside its playability bound.
    BoundViolation {
        /// Index of the offending pattern.
        index: usize,
        /// Name of the offending field.
        field: &'static str,
    },
    /// A pattern starts before its predecessor ends.
    Overlap {
        /// Index of the offending pattern.
        index: usize,
    },
    /// The opening pattern is too hard to react to.
    HardOpening {
        /// Difficulty of the opening pattern.
        difficulty: u8,
    },
    /// The closing pattern is too hard for an outro.
    HardEnding {
        /// Difficulty of the closing pattern.
        difficulty: u8,
    },
    /// Difficulty changes too abruptly between two patterns.
    DifficultyJump {
        /// Index of the later pattern.
        index: usize,
        /// Difficulty of the earlier pattern.
        from: u8,
        /// Difficulty of the later pattern.
        to: u8,
    },
    /// Too many obstacle patterns follow each other without a breather.
    MissingBreather {
        /// Index of the first obstacle pattern in the run.
        start: usize,
        /// Index of the pattern that exceeded the run limit.
        end: usize,
    },
}

impl Finding {
    /// Whether the finding breaks a rule that [`crate::validate`] repairs.
    #[must_use]
    pub const fn is_repairable(&self) -> bool {
        matches!(
            self,
            Self::BoundViolation { .. }
                | Self::Overlap { .. }
                | Self::HardOpening { .. }
                | Self::HardEnding { .. }
        )
    }
}

/// Every finding raised for a map, in timeline order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlayabilityReport {
    findings: Vec<Finding>,
}

impl PlayabilityReport {
    /// Whether the map follows every rule.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }

    /// All findings.
    #[must_use]
    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    /// Findings that repair would fix.
    pub fn repairable(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|finding| finding.is_repairable())
    }

    /// Pacing findings that remain advisory.
    pub fn advisories(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|finding| !finding.is_repairable())
    }
}

/// Checks a map against the hard bounds and the pacing guidelines.
#[must_use]
pub fn audit(map: &SongMap) -> PlayabilityReport {
    let mut findings = Vec::new();

    for (index, pattern) in map.patterns.iter().enumerate() {
        check_bounds(index, pattern, &mut findings);
    }

    for (index, pair) in map.patterns.windows(2).enumerate() {
        let (previous, next) = (&pair[0], &pair[1]);
        if next.start_ms < previous.end_ms() {
            findings.push(Finding::Overlap { index: index + 1 });
        }
        if previous.difficulty.abs_diff(next.difficulty) > MAX_DIFFICULTY_STEP {
            findings.push(Finding::DifficultyJump {
                index: index + 1,
                from: previous.difficulty,
                to: next.difficulty,
            });
        }
    }

    if let Some(first) = map.patterns.first() {
        if first.difficulty > EDGE_DIFFICULTY_CAP {
            findings.push(Finding::HardOpening {
                difficulty: first.difficulty,
            });
        }
    }
    if let Some(last) = map.patterns.last() {
        if last.difficulty > EDGE_DIFFICULTY_CAP {
            findings.push(Finding::HardEnding {
                difficulty: last.difficulty,
            });
        }
    }

    check_breathers(&map.patterns, &mut findings);

    PlayabilityReport { findings }
}

fn check_bounds(index: usize, pattern: &MapPattern, findings: &mut Vec<Finding>) {
    let mut flag = |violated: bool, field: &'static str| {
        if violated {
            findings.push(Finding::BoundViolation { index, field });
        }
    };

    flag(!(pattern.spacing >= MIN_SPACING), "spacing");
    flag(!(0.0..=MAX_DENSITY).contains(&pattern.density), "density");
    flag(
        !(DIFFICULTY_RANGE.0..=DIFFICULTY_RANGE.1).contains(&pattern.difficulty),
        "difficulty",
    );
    flag(
        pattern.spike_count.is_some_and(|count| count > MAX_SPIKE_COUNT),
        "spike_count",
    );
    flag(
        pattern
            .block_width
            .is_some_and(|width| !(width > 0.0 && width <= MAX_BLOCK_WIDTH)),
        "block_width",
    );
    flag(
        pattern
            .gap_width
            .is_some_and(|width| !(GAP_WIDTH_RANGE.0..=GAP_WIDTH_RANGE.1).contains(&width)),
        "gap_width",
    );
    flag(
        pattern
            .modifiers
            .iter()
            .any(|modifier| !(0.0..=1.0).contains(&modifier.intensity)),
        "modifier_intensity",
    );
    flag(pattern.duration_ms == 0, "duration");
}

fn check_breathers(patterns: &[MapPattern], findings: &mut Vec<Finding>) {
    let mut run_start = 0;
    let mut run_length = 0;

    for (index, pattern) in patterns.iter().enumerate() {
        if pattern.is_breather() {
            run_length = 0;
            continue;
        }
        if pattern.kind.is_restful() {
            continue;
        }

        if run_length == 0 {
            run_start = index;
        }
        run_length += 1;
        if run_length == MAX_OBSTACLE_RUN + 1 {
            findings.push(Finding::MissingBreather {
                start: run_start,
                end: index,
            });
        }
    }
}

use serde::{Deserialize, Serialize};

use crate::record::{SubjectAttendanceRecord, MAX_CLASSES};

/// Attendance at or above this percentage is always `Safe`, whatever the requirement.
pub const SAFE_THRESHOLD: u32 = 85;

/// Upper bound on the safe-bunk budget.
///
/// A 0% requirement can never be violated; the budget reports this cap
/// instead of searching forever. Every search stops here, which keeps the
/// budget monotone in the requirement.
pub const SAFE_BUNK_CAP: u32 = 365;

/// Must-attend answer when no number of attended classes reaches the requirement.
pub const UNATTAINABLE: u32 = u32::MAX;

/// Most classes the must-attend search will try before giving up.
///
/// Any record within [`MAX_CLASSES`] needs at most `99 * MAX_CLASSES`, so
/// only out-of-range records hit this.
const MUST_ATTEND_SEARCH_LIMIT: u64 = MAX_CLASSES as u64 * 100;

/// Risk band shown on the dashboard, from least to most at risk.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Safe,
    Warning,
    High,
    Critical,
}

/// Hypothetical next classes for the what-if calculator.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "classes", rename_all = "lowercase")]
pub enum Scenario {
    /// Attend the next `n` classes.
    Attend(u32),
    /// Miss the next `n` classes.
    Miss(u32),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhatIf {
    pub attended: u32,
    pub total: u32,
    pub percentage: u32,
    pub meets_requirement: bool,
}

/// Everything the dashboard renders for one subject.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Projection {
    pub percentage: u32,
    pub risk: RiskLevel,
    pub safe_bunk_budget: u32,
    pub must_attend: u32,
}

/// `attended / total * 100 >= threshold`, exact.
///
/// A record with no classes reads as 0%.
fn meets(attended: u64, total: u64, threshold: i64) -> bool {
    if threshold <= 0 {
        return true;
    }
    if total == 0 {
        return false;
    }
    attended * 100 >= threshold.unsigned_abs() * total
}

/// Rounded attendance percentage (half up); 0 when no classes were held.
pub fn attendance_percentage(record: &SubjectAttendanceRecord) -> u32 {
    percentage_of(
        u64::from(record.attended_classes),
        u64::from(record.total_classes),
    )
}

fn percentage_of(attended: u64, total: u64) -> u32 {
    if total == 0 {
        return 0;
    }
    let rounded = (attended * 200 + total) / (total * 2);
    u32::try_from(rounded).unwrap_or(u32::MAX)
}

/// Classify a subject into a risk band.
///
/// Rules, first match wins: `p ≥ 85` safe; `p ≥ required` warning;
/// `p ≥ required − 10` high; otherwise critical. A subject with no classes
/// yet is critical.
pub fn classify(record: &SubjectAttendanceRecord) -> RiskLevel {
    if record.total_classes == 0 {
        return RiskLevel::Critical;
    }

    let attended = u64::from(record.attended_classes);
    let total = u64::from(record.total_classes);
    let required = i64::from(record.required_percentage);

    if meets(attended, total, i64::from(SAFE_THRESHOLD)) {
        RiskLevel::Safe
    } else if meets(attended, total, required) {
        RiskLevel::Warning
    } else if meets(attended, total, required - 10) {
        RiskLevel::High
    } else {
        RiskLevel::Critical
    }
}

/// Largest `k` such that missing the next `k` classes keeps attendance at or
/// above the requirement, capped at [`SAFE_BUNK_CAP`].
pub fn safe_bunk_budget(record: &SubjectAttendanceRecord) -> u32 {
    if record.required_percentage == 0 {
        return SAFE_BUNK_CAP;
    }

    let attended = u64::from(record.attended_classes);
    let total = u64::from(record.total_classes);
    let required = i64::from(record.required_percentage);

    let mut bunks: u32 = 0;
    // Accept k+1 only after checking it.
    while bunks < SAFE_BUNK_CAP && meets(attended, total + u64::from(bunks) + 1, required) {
        bunks += 1;
    }
    bunks
}

/// Smallest `k` such that attending the next `k` classes brings attendance to
/// the requirement, or [`UNATTAINABLE`].
pub fn must_attend_count(record: &SubjectAttendanceRecord) -> u32 {
    let required = i64::from(record.required_percentage);
    let mut attended = u64::from(record.attended_classes);
    let mut total = u64::from(record.total_classes);

    // Above 100% can never be reached; exactly 100% only with no absences so far.
    if required > 100 || (required == 100 && attended < total) {
        return UNATTAINABLE;
    }

    let mut needed: u64 = 0;
    while !meets(attended, total, required) {
        if needed == MUST_ATTEND_SEARCH_LIMIT {
            return UNATTAINABLE;
        }
        needed += 1;
        attended += 1;
        total += 1;
    }
    u32::try_from(needed).unwrap_or(UNATTAINABLE)
}

/// What-if calculator: attendance after hypothetically attending or missing classes.
pub fn simulate(record: &SubjectAttendanceRecord, scenario: Scenario) -> WhatIf {
    let (attended, total) = match scenario {
        Scenario::Attend(n) => (
            record.attended_classes.saturating_add(n),
            record.total_classes.saturating_add(n),
        ),
        Scenario::Miss(n) => (record.attended_classes, record.total_classes.saturating_add(n)),
    };

    WhatIf {
        attended,
        total,
        percentage: percentage_of(u64::from(attended), u64::from(total)),
        meets_requirement: meets(
            u64::from(attended),
            u64::from(total),
            i64::from(record.required_percentage),
        ),
    }
}

pub fn project(record: &SubjectAttendanceRecord) -> Projection {
    Projection {
        percentage: attendance_percentage(record),
        risk: classify(record),
        safe_bunk_budget: safe_bunk_budget(record),
        must_attend: must_attend_count(record),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn rec(attended: u32, total: u32, required: u32) -> SubjectAttendanceRecord {
        SubjectAttendanceRecord {
            attended_classes: attended,
            total_classes: total,
            required_percentage: required,
        }
    }

    #[test]
    fn eighty_percent_against_seventy_five_is_warning() {
        assert_eq!(classify(&rec(8, 10, 75)), RiskLevel::Warning);
    }

    #[test]
    fn just_under_requirement_is_high() {
        // 28/38 ≈ 73.7%
        assert_eq!(classify(&rec(28, 38, 75)), RiskLevel::High);
    }

    #[test]
    fn classification_bands() {
        assert_eq!(classify(&rec(17, 20, 75)), RiskLevel::Safe); // exactly 85%
        assert_eq!(classify(&rec(13, 20, 75)), RiskLevel::High); // exactly 65%
        assert_eq!(classify(&rec(12, 20, 75)), RiskLevel::Critical); // 60%
        assert_eq!(classify(&rec(0, 10, 5)), RiskLevel::High); // 0% >= -5%
    }

    #[test]
    fn unstarted_subject() {
        for required in [0, 1, 75, 100, 150] {
            let r = rec(0, 0, required);
            assert_eq!(classify(&r), RiskLevel::Critical);
            assert_eq!(attendance_percentage(&r), 0);
        }
        assert_eq!(safe_bunk_budget(&rec(0, 0, 75)), 0);
        assert_eq!(safe_bunk_budget(&rec(0, 0, 0)), SAFE_BUNK_CAP);
        assert_eq!(must_attend_count(&rec(0, 0, 75)), 1);
        assert_eq!(must_attend_count(&rec(0, 0, 100)), 1);
        assert_eq!(must_attend_count(&rec(0, 0, 0)), 0);
    }

    #[test]
    fn safe_bunk_budget_examples() {
        // 30/40 = 75%: one more absence drops to 73.2%.
        assert_eq!(safe_bunk_budget(&rec(30, 40, 75)), 0);
        // 9/10 at 75%: 9/12 = 75% still holds, 9/13 does not.
        assert_eq!(safe_bunk_budget(&rec(9, 10, 75)), 2);
        assert_eq!(safe_bunk_budget(&rec(10, 10, 0)), SAFE_BUNK_CAP);
        assert_eq!(safe_bunk_budget(&rec(10, 10, 101)), 0);
        // Huge surplus is capped.
        assert_eq!(safe_bunk_budget(&rec(1000, 1000, 1)), SAFE_BUNK_CAP);
    }

    #[test]
    fn must_attend_examples() {
        // 6/10 at 75%: (6+k)/(10+k) >= 0.75 ⇒ k >= 6.
        assert_eq!(must_attend_count(&rec(6, 10, 75)), 6);
        assert_eq!(must_attend_count(&rec(8, 10, 75)), 0);
        assert_eq!(must_attend_count(&rec(9, 10, 100)), UNATTAINABLE);
        assert_eq!(must_attend_count(&rec(10, 10, 100)), 0);
        assert_eq!(must_attend_count(&rec(10, 10, 101)), UNATTAINABLE);
    }

    #[test]
    fn must_attend_search_is_bounded_for_unvalidated_records() {
        assert_eq!(must_attend_count(&rec(0, u32::MAX, 99)), UNATTAINABLE);
        // Already met: no search at all.
        assert_eq!(must_attend_count(&rec(u32::MAX, u32::MAX, 99)), 0);
        // The largest valid record still gets an exact answer.
        assert_eq!(must_attend_count(&rec(0, MAX_CLASSES, 99)), 99 * MAX_CLASSES);
    }

    #[test]
    fn percentage_rounds_half_up() {
        assert_eq!(attendance_percentage(&rec(28, 38, 75)), 74);
        assert_eq!(attendance_percentage(&rec(1, 8, 75)), 13); // 12.5
        assert_eq!(attendance_percentage(&rec(2, 3, 75)), 67);
    }

    #[test]
    fn what_if_scenarios() {
        let base = rec(6, 10, 75);

        let attend = simulate(&base, Scenario::Attend(6));
        assert_eq!((attend.attended, attend.total, attend.percentage), (12, 16, 75));
        assert!(attend.meets_requirement);

        let miss = simulate(&base, Scenario::Miss(2));
        assert_eq!((miss.attended, miss.total, miss.percentage), (6, 12, 50));
        assert!(!miss.meets_requirement);

        let empty = simulate(&rec(0, 0, 75), Scenario::Miss(0));
        assert_eq!(empty.percentage, 0);
    }

    #[test]
    fn projection_bundles_all_answers() {
        let p = project(&rec(8, 10, 75));
        assert_eq!(
            p,
            Projection {
                percentage: 80,
                risk: RiskLevel::Warning,
                safe_bunk_budget: 0,
                must_attend: 0,
            }
        );

        let json = serde_json::to_value(p).unwrap();
        assert_eq!(json["risk"], "warning");
        assert_eq!(json["safeBunkBudget"], 0);
    }

    fn record_strategy() -> impl Strategy<Value = SubjectAttendanceRecord> {
        (0u32..500, 0u32..500, 0u32..=100).prop_map(|(a, extra, r)| rec(a, a + extra, r))
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: more attendance (same total, same requirement) never raises risk.
        #[test]
        fn classify_is_monotone_in_attendance(r in record_strategy()) {
            prop_assume!(r.attended_classes < r.total_classes);
            let better = rec(r.attended_classes + 1, r.total_classes, r.required_percentage);
            prop_assert!(classify(&better) <= classify(&r));
        }

        /// Property: raising the requirement never grows the bunk budget.
        #[test]
        fn bunk_budget_is_monotone_in_requirement(r in record_strategy(), bump in 1u32..50) {
            let stricter = rec(r.attended_classes, r.total_classes, r.required_percentage + bump);
            prop_assert!(safe_bunk_budget(&stricter) <= safe_bunk_budget(&r));
        }

        /// Property: the budget is the largest number of absences that still meets the requirement.
        #[test]
        fn bunk_budget_is_tight(r in record_strategy()) {
            prop_assume!(r.required_percentage > 0);
            let k = safe_bunk_budget(&r);
            let a = u64::from(r.attended_classes);
            let t = u64::from(r.total_classes);
            let req = i64::from(r.required_percentage);
            if k > 0 {
                prop_assert!(meets(a, t + u64::from(k), req));
            }
            if k < SAFE_BUNK_CAP {
                prop_assert!(!meets(a, t + u64::from(k) + 1, req));
            }
        }

        /// Property: nothing to catch up on when the requirement is already met.
        #[test]
        fn must_attend_is_zero_when_already_met(r in record_strategy()) {
            prop_assume!(r.total_classes > 0);
            let met = u64::from(r.attended_classes) * 100
                >= u64::from(r.required_percentage) * u64::from(r.total_classes);
            if met {
                prop_assert_eq!(must_attend_count(&r), 0);
            }
        }

        /// Property: attending exactly the must-attend count reaches the requirement, one fewer does not.
        #[test]
        fn must_attend_is_minimal(r in record_strategy()) {
            let k = must_attend_count(&r);
            prop_assume!(k != UNATTAINABLE);
            let req = i64::from(r.required_percentage);
            let a = u64::from(r.attended_classes);
            let t = u64::from(r.total_classes);
            prop_assert!(meets(a + u64::from(k), t + u64::from(k), req));
            if k > 0 {
                prop_assert!(!meets(a + u64::from(k) - 1, t + u64::from(k) - 1, req));
            }
        }
    }
}

use crate::models::{
    AttendanceRow, AttendanceSummary, EnrollmentRow, EnrollmentSummary, GenderDistribution,
    ScopeSummary, TeacherAttendanceRow, TeacherAttendanceSummary,
};
use crate::period::{select_period_rows, PeriodSelection};

/// Rounds half away from zero to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Percentage of `part` in `whole`, rounded to two decimals. Zero when
/// `whole` is not positive.
pub fn percentage(part: i64, whole: i64) -> f64 {
    if whole <= 0 {
        return 0.0;
    }
    round2((part as f64 * 100.0) / whole as f64)
}

fn count(value: Option<i64>) -> i64 {
    value.unwrap_or(0)
}

pub fn aggregate_enrollment(rows: &[EnrollmentRow]) -> Option<EnrollmentSummary> {
    if rows.is_empty() {
        return None;
    }

    let mut boys = 0i64;
    let mut girls = 0i64;
    let mut total_students = 0i64;

    for row in rows {
        boys += count(row.normal_boys_total) + count(row.special_boys_total);
        girls += count(row.normal_girls_total) + count(row.special_girls_total);
        // Stored separately from the breakdown; the two may disagree.
        total_students += count(row.total_population);
    }

    Some(EnrollmentSummary {
        total_students,
        gender_distribution: GenderDistribution { boys, girls },
    })
}

pub fn aggregate_student_attendance(rows: &[AttendanceRow]) -> Option<AttendanceSummary> {
    if rows.is_empty() {
        return None;
    }

    let (total_enrolled, total_present) =
        rows.iter().fold((0i64, 0i64), |(enrolled, present), row| {
            (
                enrolled + count(row.total_population),
                present
                    + count(row.normal_boys_total)
                    + count(row.normal_girls_total)
                    + count(row.special_boys_total)
                    + count(row.special_girls_total),
            )
        });

    Some(AttendanceSummary {
        total_enrolled,
        total_present,
        attendance_rate: percentage(total_present, total_enrolled),
    })
}

/// Each row is one teacher-week, so `total_teachers` counts rows.
pub fn aggregate_teacher_attendance(
    rows: &[TeacherAttendanceRow],
) -> Option<TeacherAttendanceSummary> {
    if rows.is_empty() {
        return None;
    }

    let mut session_days = 0i64;
    let mut days_present = 0i64;
    let mut exercises_given = 0i64;
    let mut exercises_marked = 0i64;

    for row in rows {
        session_days += count(row.school_session_days);
        days_present += count(row.days_present);
        exercises_given += count(row.excises_given);
        exercises_marked += count(row.excises_marked);
    }

    Some(TeacherAttendanceSummary {
        total_teachers: rows.len(),
        attendance_rate: percentage(days_present, session_days),
        exercise_completion_rate: percentage(exercises_marked, exercises_given),
    })
}

/// Applies the same week selection to each metric family and reduces it.
pub fn summarize(
    enrollment: &[EnrollmentRow],
    attendance: &[AttendanceRow],
    teachers: &[TeacherAttendanceRow],
    selection: &PeriodSelection,
) -> ScopeSummary {
    ScopeSummary {
        enrollment: aggregate_enrollment(&select_period_rows(enrollment, selection)),
        student_attendance: aggregate_student_attendance(&select_period_rows(
            attendance, selection,
        )),
        teacher_attendance: aggregate_teacher_attendance(&select_period_rows(teachers, selection)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enrollment(
        normal_boys: Option<i64>,
        normal_girls: Option<i64>,
        special_boys: Option<i64>,
        special_girls: Option<i64>,
        total: Option<i64>,
    ) -> EnrollmentRow {
        EnrollmentRow {
            school_id: "S-1".to_string(),
            week: 1,
            normal_boys_total: normal_boys,
            normal_girls_total: normal_girls,
            special_boys_total: special_boys,
            special_girls_total: special_girls,
            total_population: total,
            ..Default::default()
        }
    }

    fn attendance(present: [i64; 4], enrolled: i64) -> AttendanceRow {
        AttendanceRow {
            school_id: "S-1".to_string(),
            week: 1,
            normal_boys_total: Some(present[0]),
            normal_girls_total: Some(present[1]),
            special_boys_total: Some(present[2]),
            special_girls_total: Some(present[3]),
            total_population: Some(enrolled),
            ..Default::default()
        }
    }

    fn teacher(session_days: i64, present: i64, given: i64, marked: i64) -> TeacherAttendanceRow {
        TeacherAttendanceRow {
            teacher_id: "T-1".to_string(),
            school_id: "S-1".to_string(),
            week: 1,
            school_session_days: Some(session_days),
            days_present: Some(present),
            excises_given: Some(given),
            excises_marked: Some(marked),
            ..Default::default()
        }
    }

    #[test]
    fn enrollment_splits_gender_and_passes_total_through() {
        let rows = vec![enrollment(Some(10), Some(12), Some(0), Some(0), Some(22))];
        let summary = aggregate_enrollment(&rows).expect("summary");
        assert_eq!(summary.total_students, 22);
        assert_eq!(summary.gender_distribution, GenderDistribution { boys: 10, girls: 12 });
    }

    #[test]
    fn enrollment_total_is_not_derived_from_breakdown() {
        let rows = vec![
            enrollment(Some(10), Some(12), Some(2), Some(1), Some(30)),
            enrollment(Some(5), Some(5), None, None, Some(9)),
        ];
        let summary = aggregate_enrollment(&rows).expect("summary");
        assert_eq!(summary.gender_distribution.boys, 17);
        assert_eq!(summary.gender_distribution.girls, 18);
        assert_eq!(summary.total_students, 39);
    }

    #[test]
    fn missing_counts_are_zero() {
        let rows = vec![enrollment(None, Some(4), None, None, None)];
        let summary = aggregate_enrollment(&rows).expect("summary");
        assert_eq!(summary.total_students, 0);
        assert_eq!(summary.gender_distribution, GenderDistribution { boys: 0, girls: 4 });
    }

    #[test]
    fn attendance_rate_is_present_over_enrolled() {
        let rows = vec![attendance([40, 35, 5, 5], 100)];
        let summary = aggregate_student_attendance(&rows).expect("summary");
        assert_eq!(summary.total_enrolled, 100);
        assert_eq!(summary.total_present, 85);
        assert_eq!(summary.attendance_rate, 85.0);
    }

    #[test]
    fn attendance_rate_rounds_to_two_decimals() {
        let rows = vec![attendance([2, 0, 0, 0], 3)];
        let summary = aggregate_student_attendance(&rows).expect("summary");
        assert_eq!(summary.attendance_rate, 66.67);
    }

    #[test]
    fn zero_enrolled_gives_zero_rate() {
        let rows = vec![attendance([3, 1, 0, 0], 0), attendance([0, 0, 0, 0], 0)];
        let summary = aggregate_student_attendance(&rows).expect("summary");
        assert_eq!(summary.total_present, 4);
        assert_eq!(summary.attendance_rate, 0.0);
    }

    #[test]
    fn teacher_rates_follow_session_days_and_exercises() {
        let rows = vec![teacher(20, 18, 10, 9), teacher(20, 15, 6, 3)];
        let summary = aggregate_teacher_attendance(&rows).expect("summary");
        assert_eq!(summary.total_teachers, 2);
        assert_eq!(summary.attendance_rate, 82.5);
        assert_eq!(summary.exercise_completion_rate, 75.0);
    }

    #[test]
    fn teacher_rates_guard_zero_denominators() {
        let rows = vec![teacher(0, 0, 0, 0)];
        let summary = aggregate_teacher_attendance(&rows).expect("summary");
        assert_eq!(summary.total_teachers, 1);
        assert_eq!(summary.attendance_rate, 0.0);
        assert_eq!(summary.exercise_completion_rate, 0.0);
    }

    #[test]
    fn empty_input_yields_no_summary() {
        assert_eq!(aggregate_enrollment(&[]), None);
        assert_eq!(aggregate_student_attendance(&[]), None);
        assert_eq!(aggregate_teacher_attendance(&[]), None);
    }

    #[test]
    fn reducers_are_repeatable() {
        let rows = vec![attendance([7, 8, 1, 0], 23), attendance([9, 9, 0, 1], 21)];
        let first = aggregate_student_attendance(&rows).expect("summary");
        let second = aggregate_student_attendance(&rows).expect("summary");
        assert_eq!(first.attendance_rate.to_bits(), second.attendance_rate.to_bits());
        assert_eq!(first, second);
    }

    #[test]
    fn summaries_serialize_with_camel_case_keys() {
        let summary = aggregate_enrollment(&[enrollment(Some(1), Some(2), None, None, Some(3))])
            .expect("summary");
        let json = serde_json::to_value(summary).expect("json");
        assert_eq!(json["totalStudents"], 3);
        assert_eq!(json["genderDistribution"]["girls"], 2);
    }

    #[test]
    fn summarize_uses_latest_week_unless_aggregating() {
        let mut week_one = attendance([10, 10, 0, 0], 25);
        week_one.week = 1;
        let mut week_two = attendance([12, 11, 0, 0], 25);
        week_two.week = 2;
        let rows = vec![week_two, week_one];
        let teachers = vec![teacher(5, 4, 2, 2), teacher(5, 5, 2, 1)];

        let latest = summarize(&[], &rows, &teachers, &PeriodSelection::default());
        assert_eq!(latest.enrollment, None);
        let attendance_latest = latest.student_attendance.expect("attendance");
        assert_eq!(attendance_latest.total_present, 23);
        assert_eq!(attendance_latest.attendance_rate, 92.0);
        assert_eq!(latest.teacher_attendance.expect("teachers").total_teachers, 2);

        let selection = PeriodSelection {
            aggregate: true,
            ..Default::default()
        };
        let combined = summarize(&[], &rows, &teachers, &selection)
            .student_attendance
            .expect("attendance");
        assert_eq!(combined.total_enrolled, 50);
        assert_eq!(combined.total_present, 43);
        assert_eq!(combined.attendance_rate, 86.0);
    }

    #[test]
    fn round2_is_half_away_from_zero() {
        assert_eq!(round2(12.345_6), 12.35);
        assert_eq!(round2(0.125), 0.13);
        assert_eq!(percentage(1, 8), 12.5);
    }
}

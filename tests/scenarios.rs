//! End-to-end rostering scenarios.

use std::time::Duration;

use chrono::NaiveDate;
use u_roster::config::RosterConfig;
use u_roster::cp::{RosterModelBuilder, SolverAdapter};
use u_roster::distribution::{apply_cycles, CycleDistributionBuilder};
use u_roster::models::{
    FixedAssignment, Month, Nurse, Position, RosterInput, RotationCycle, Schedule, Sector,
    SectorLimit, ShiftKind, ShiftRequest, StaffingRequirement,
};
use u_roster::scheduler::{RosterKpi, RosterScheduler};
use u_roster::RosterError;

fn d(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2022, 1, day).unwrap()
}

fn c(n: u8) -> RotationCycle {
    RotationCycle::new(n).unwrap()
}

fn general(id: &str, cycle: u8) -> Nurse {
    Nurse::new(id).with_skill("general").with_cycle(c(cycle))
}

fn general_sector() -> Vec<Sector> {
    vec![Sector::new("G")
        .with_name("General")
        .with_position(Position::new("G1", "general"))]
}

fn january(
    sectors: Vec<Sector>,
    nurses: Vec<Nurse>,
    staffing: &[StaffingRequirement],
    fixed: Vec<FixedAssignment>,
) -> Schedule {
    Schedule::new(Month::new(2022, 1).unwrap(), sectors, nurses, staffing, fixed).unwrap()
}

#[test]
fn test_two_eligible_nurses_both_assigned() {
    let schedule = january(
        general_sector(),
        vec![general("A", 3), general("B", 3)],
        &[StaffingRequirement::on("G1", d(1), ShiftKind::Day, 2)],
        vec![],
    );
    let run = RosterScheduler::new(RosterConfig::default()).run(schedule).unwrap();

    let mut assigned: Vec<&str> = run.schedule.shifts().iter().map(|s| s.nurse_id.as_str()).collect();
    assigned.sort_unstable();
    assert_eq!(assigned, vec!["A", "B"]);
    assert!(run.schedule.shifts().iter().all(|s| s.slot == 0 && s.position_id == "G1"));
}

#[test]
fn test_zero_eligible_fails_before_solving() {
    let input = RosterInput {
        year: 2022,
        month: 1,
        holidays: vec![],
        rotation_anchor: None,
        sectors: vec![
            Sector::new("G").with_position(Position::new("G1", "general")),
            Sector::new("RCP").with_position(Position::new("RCP1", "resus")),
        ],
        nurses: vec![general("A", 3)],
        staffing: vec![StaffingRequirement::on("RCP1", d(1), ShiftKind::Day, 1)],
        fixed_assignments: vec![],
    };
    match input.into_schedule() {
        Err(RosterError::InfeasibleInput {
            date,
            kind,
            position,
            eligible,
            ..
        }) => {
            assert_eq!(date, d(1));
            assert_eq!(kind, ShiftKind::Day);
            assert_eq!(position, "RCP1");
            assert_eq!(eligible, 0);
        }
        other => panic!("expected InfeasibleInput, got {other:?}"),
    }
}

#[test]
fn test_leave_on_only_cycle_day_gives_zero_shifts() {
    let staffing = [StaffingRequirement::on("G1", d(1), ShiftKind::Day, 1)];
    let probe = january(general_sector(), vec![general("L", 3)], &staffing, vec![]);
    let cycle_dates = probe.cycle_eligible_dates("L");
    assert_eq!(cycle_dates[0], d(1));

    // Leave on every cycle date except Jan 1 leaves Jan 1 as the only one.
    let mut leave: Vec<NaiveDate> = cycle_dates[1..].to_vec();
    let only = january(
        general_sector(),
        vec![Nurse { leave: leave.clone(), ..general("L", 3) }],
        &staffing,
        vec![],
    );
    assert_eq!(only.cycle_eligible_dates("L"), vec![d(1)]);

    // Now the leave covers that day too.
    leave.push(d(1));
    let schedule = january(
        general_sector(),
        vec![general("A", 3), Nurse { leave, ..general("L", 3) }],
        &staffing,
        vec![],
    );
    assert!(schedule.cycle_eligible_dates("L").is_empty());

    let instance = RosterModelBuilder::new(&RosterConfig::default()).build(&schedule);
    assert!(instance.assignment_variables().all(|(_, k)| k.nurse_id != "L"));

    let run = RosterScheduler::new(RosterConfig::default()).run(schedule).unwrap();
    assert!(run.schedule.shifts_for_nurse("L").is_empty());
    assert_eq!(run.schedule.shift_counts()["L"], 0);
    assert_eq!(run.schedule.shift_counts()["A"], 1);
}

#[test]
fn test_zero_tolerance_flips_to_infeasible() {
    let build = || {
        january(
            general_sector(),
            vec![
                general("A", 3).with_required_shifts(1),
                general("B", 3).with_required_shifts(1),
            ],
            &[StaffingRequirement::on("G1", d(1), ShiftKind::Day, 1)],
            vec![],
        )
    };

    let loose = RosterScheduler::new(RosterConfig::default().with_quota_tolerance(1))
        .run(build())
        .unwrap();
    assert_eq!(loose.schedule.shifts().len(), 1);

    let err = RosterScheduler::new(RosterConfig::default().with_quota_tolerance(0))
        .run(build())
        .unwrap_err();
    assert!(matches!(err, RosterError::SolverInfeasible { .. }));
}

#[test]
fn test_escape_path_only_when_cycle_falls_short() {
    // Cycle 1 is on duty 15 times in January; A needs 16.
    let build = || {
        january(
            general_sector(),
            vec![
                general("A", 1).with_required_shifts(16),
                general("B", 2),
                general("C", 3),
                general("D", 4),
            ],
            &[StaffingRequirement::every_slot("G1", 1)],
            vec![],
        )
    };
    let schedule = build();
    assert_eq!(schedule.cycle_eligible_timeslots("A").len(), 15);
    assert!(!schedule.escape_timeslots("A").is_empty());
    assert!(schedule.escape_timeslots("B").is_empty());

    let run = RosterScheduler::new(RosterConfig::default()).run(schedule).unwrap();
    let kpi = run.kpi();
    assert_eq!(kpi.shift_counts["A"], 16);
    assert_eq!(kpi.escape_shifts, 1);
    assert_eq!(kpi.uncovered, 0);
    let escape: Vec<_> = run.schedule.shifts().iter().filter(|s| s.off_cycle).collect();
    assert_eq!(escape[0].nurse_id, "A");

    let err = RosterScheduler::new(RosterConfig::default().with_escape_path(false))
        .run(build())
        .unwrap_err();
    assert!(matches!(err, RosterError::SolverInfeasible { .. }));
}

#[test]
fn test_escape_path_staffs_slot_without_cycle_cover() {
    // Jan 11 day is a cycle 2 slot; only A (cycle 1, quota 2) can reach it.
    let build = || {
        january(
            general_sector(),
            vec![general("A", 1).with_required_shifts(2)],
            &[
                StaffingRequirement::on("G1", d(1), ShiftKind::Night, 1),
                StaffingRequirement::on("G1", d(11), ShiftKind::Day, 1),
            ],
            vec![],
        )
    };

    let run = RosterScheduler::new(RosterConfig::default()).run(build()).unwrap();
    let mut worked: Vec<(usize, bool)> = run
        .schedule
        .shifts_for_nurse("A")
        .iter()
        .map(|s| (s.slot, s.off_cycle))
        .collect();
    worked.sort_unstable();
    assert_eq!(worked, vec![(1, false), (20, true)]);
    assert_eq!(run.kpi().uncovered, 0);

    let err = RosterScheduler::new(RosterConfig::default().with_escape_path(false))
        .run(build())
        .unwrap_err();
    assert!(matches!(err, RosterError::SolverInfeasible { .. }));
}

#[test]
fn test_fixed_assignment_honored() {
    // A is fixed on Jan 1 night, so the rest rule pushes Jan 1 day to B.
    let run = RosterScheduler::new(RosterConfig::default())
        .run(january(
            general_sector(),
            vec![general("A", 3), general("B", 3)],
            &[
                StaffingRequirement::on("G1", d(1), ShiftKind::Day, 1),
                StaffingRequirement::on("G1", d(1), ShiftKind::Night, 1),
            ],
            vec![FixedAssignment::new("A", d(1), ShiftKind::Night, "G1")],
        ))
        .unwrap();

    let a = run.schedule.shifts_for_nurse("A");
    assert_eq!(a.len(), 1);
    assert_eq!(a[0].kind, ShiftKind::Night);
    assert!(a[0].fixed);
    let b = run.schedule.shifts_for_nurse("B");
    assert_eq!(b.len(), 1);
    assert_eq!(b[0].kind, ShiftKind::Day);
}

#[test]
fn test_sector_limit_routes_nurses() {
    let sectors = vec![
        Sector::new("G").with_position(Position::new("G1", "general")),
        Sector::new("R").with_position(Position::new("R1", "resus")),
    ];
    let both = |id: &str| general(id, 3).with_skill("resus");
    let run = RosterScheduler::new(RosterConfig::default())
        .run(january(
            sectors,
            vec![both("A").with_sector_limit("R", SectorLimit { min: None, max: Some(0) }), both("B")],
            &[
                StaffingRequirement::on("G1", d(1), ShiftKind::Day, 1),
                StaffingRequirement::on("R1", d(1), ShiftKind::Day, 1),
            ],
            vec![],
        ))
        .unwrap();

    assert_eq!(run.schedule.shifts_for_nurse("A")[0].sector_id, "G");
    assert_eq!(run.schedule.shifts_for_nurse("B")[0].sector_id, "R");
}

#[test]
fn test_requests_steer_choice() {
    let run = RosterScheduler::new(RosterConfig::default())
        .run(january(
            general_sector(),
            vec![
                general("A", 3).with_request(ShiftRequest::off(d(1))),
                general("B", 3).with_request(ShiftRequest::work(d(1)).with_kind(ShiftKind::Day)),
            ],
            &[StaffingRequirement::on("G1", d(1), ShiftKind::Day, 1)],
            vec![],
        ))
        .unwrap();

    assert_eq!(run.schedule.shifts()[0].nurse_id, "B");
    assert_eq!(RosterKpi::calculate(&run.schedule).unmet_requests, 0);
}

#[test]
fn test_distribute_then_roster() {
    let mut nurses: Vec<Nurse> = (0..8)
        .map(|i| Nurse::new(format!("N{i}")).with_skill("general"))
        .collect();
    let cycles = CycleDistributionBuilder::new(&nurses)
        .solve(&SolverAdapter::default(), Duration::from_secs(30))
        .unwrap();
    apply_cycles(&mut nurses, &cycles);

    let schedule = january(
        general_sector(),
        nurses,
        &[StaffingRequirement::every_slot("G1", 2).with_kind(ShiftKind::Day)],
        vec![],
    );
    let config = RosterConfig::default().with_time_budget_secs(120);
    let run = RosterScheduler::new(config).run(schedule).unwrap();
    let kpi = run.kpi();
    assert_eq!(kpi.uncovered, 0);
    assert_eq!(kpi.total_shifts, 62);
}

#[test]
fn test_output_serializes() {
    let run = RosterScheduler::new(RosterConfig::default())
        .run(january(
            general_sector(),
            vec![general("A", 3).with_leave(d(3)), general("B", 3)],
            &[StaffingRequirement::on("G1", d(1), ShiftKind::Day, 1)],
            vec![],
        ))
        .unwrap();
    let json = serde_json::to_value(run.output()).unwrap();
    assert_eq!(json["month"], "2022-01");
    assert_eq!(json["shifts"].as_array().unwrap().len(), 1);
    assert_eq!(json["shifts"][0]["kind"], "day");
    assert_eq!(json["leave"][0]["code"], "CO");
    assert_eq!(json["leave"][0]["nurse_id"], "A");
}

#[test]
fn test_config_file() {
    let path = std::env::temp_dir().join(format!("u-roster-config-{}.toml", std::process::id()));
    std::fs::write(&path, "quota_tolerance = 2\n[weights]\nescape_path = 50.0\n").unwrap();
    let config = RosterConfig::from_file(&path).unwrap();
    std::fs::remove_file(&path).ok();
    assert_eq!(config.quota_tolerance, 2);
    assert!((config.weights.escape_path - 50.0).abs() < 1e-9);
    assert_eq!(config.time_budget(), Duration::from_secs(60));
}

#![forbid(unsafe_code)]
use chrono::{Datelike, NaiveDate, Weekday};
use giliran::{
    AvailabilityStore, DayRule, GenerateOptions, LoadReport, MemoryRepository, Period, Person,
    PersonId, PersonnelDirectory, Registry, Role, RoleRequirement, RuleTable, SchedError,
    Scheduler, Sources, SlotType, StorageError, UnavailabilityException,
};
use std::cell::Cell;

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn registry(people: Vec<Person>) -> Registry {
    Registry {
        people,
        exceptions: Vec::new(),
    }
}

fn prayers_only() -> RuleTable {
    let mut rules = RuleTable::monthly();
    rules.slot_types.retain(|s| s.key == "solat");
    rules
}

fn imams_and_bilals(imams: usize, bilals: usize) -> Vec<Person> {
    let mut out = Vec::new();
    for i in 1..=imams {
        out.push(Person::with_id(format!("imam-{i}"), format!("Imam {i}"), [Role::Imam]));
    }
    for i in 1..=bilals {
        out.push(Person::with_id(format!("bilal-{i}"), format!("Bilal {i}"), [Role::Bilal]));
    }
    out
}

#[test]
fn monthly_january_spreads_load_evenly() {
    let reg = registry(imams_and_bilals(3, 2));
    let scheduler = Scheduler::new(prayers_only(), GenerateOptions::monthly());
    let mut repo = MemoryRepository::new();

    let records = scheduler
        .generate(&Period::month(2025, 1), "admin", Sources::new(&reg, &reg), &mut repo)
        .unwrap();

    assert_eq!(records.len(), 31 * 5 * 2);
    assert_eq!(repo.records().len(), records.len());
    assert!(records.iter().all(|r| r.auto_generated && r.created_by == "admin"));

    let report = LoadReport::from_records(&records);
    assert_eq!(report.load_of(Role::Imam, &PersonId::new("imam-1")), 52);
    assert_eq!(report.load_of(Role::Imam, &PersonId::new("imam-2")), 52);
    assert_eq!(report.load_of(Role::Imam, &PersonId::new("imam-3")), 51);
    assert_eq!(report.spread(Role::Imam), Some(1));
    insta::assert_snapshot!(
        report.role_line(Role::Bilal).unwrap(),
        @"bilal: bilal-1=78 bilal-2=77"
    );
}

#[test]
fn weekly_unavailable_imam_is_skipped_for_that_slot_only() {
    let mut reg = registry(imams_and_bilals(2, 2));
    let start = day(2025, 1, 6); // lundi
    let third = day(2025, 1, 8);
    reg.exceptions
        .push(UnavailabilityException::new(PersonId::new("imam-1"), third, "Subuh"));

    let scheduler = Scheduler::weekly();
    let mut repo = MemoryRepository::new();
    let records = scheduler
        .generate(&Period::week(start), "admin", Sources::new(&reg, &reg), &mut repo)
        .unwrap();

    let subuh: Vec<_> = records
        .iter()
        .filter(|r| r.role == Role::Imam && r.slot_label.as_deref() == Some("Subuh"))
        .collect();
    assert_eq!(subuh.len(), 7);

    let blocked = subuh.iter().find(|r| r.date == third).unwrap();
    assert_eq!(blocked.person_id, Some(PersonId::new("imam-2")));

    let others: Vec<_> = subuh.iter().filter(|r| r.date != third).collect();
    let by_first = others
        .iter()
        .filter(|r| r.person_id == Some(PersonId::new("imam-1")))
        .count();
    let by_second = others.len() - by_first;
    assert_eq!(others.len(), 6);
    assert!(by_first.abs_diff(by_second) <= 1);

    let report = LoadReport::from_records(&records);
    assert!(report.spread(Role::Imam).unwrap() <= 1);
}

#[test]
fn lone_bilal_unavailable_all_day_aborts_the_run() {
    let mut reg = registry(imams_and_bilals(2, 1));
    let blocked = day(2025, 1, 8);
    for label in ["Subuh", "Zohor", "Asar", "Maghrib", "Isyak"] {
        reg.exceptions
            .push(UnavailabilityException::new(PersonId::new("bilal-1"), blocked, label));
    }

    let mut repo = MemoryRepository::new();
    let err = Scheduler::weekly()
        .generate(
            &Period::week(day(2025, 1, 6)),
            "admin",
            Sources::new(&reg, &reg),
            &mut repo,
        )
        .unwrap_err();

    match err {
        SchedError::InsufficientPersonnel {
            date,
            slot_type,
            slot_label,
            role,
        } => {
            assert_eq!(date, blocked);
            assert_eq!(slot_type, "solat");
            assert_eq!(slot_label.as_deref(), Some("Subuh"));
            assert_eq!(role, Role::Bilal);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(repo.records().is_empty());
}

#[test]
fn monthly_friday_role_without_personnel_stays_unfilled() {
    let reg = registry(imams_and_bilals(2, 2));
    let mut repo = MemoryRepository::new();
    let records = Scheduler::monthly()
        .generate(&Period::month(2025, 1), "admin", Sources::new(&reg, &reg), &mut repo)
        .unwrap();

    let khutbah: Vec<_> = records.iter().filter(|r| r.slot_type == "khutbah").collect();
    let fridays: Vec<_> = khutbah.iter().map(|r| r.date.day()).collect();
    assert_eq!(fridays, vec![3, 10, 17, 24, 31]);
    assert!(khutbah.iter().all(|r| r.is_unfilled() && r.role == Role::FridayImam));
    assert_eq!(records.len(), 31 * 5 * 2 + 5);
}

#[test]
fn second_run_without_delete_is_rejected_by_repository() {
    let reg = registry(imams_and_bilals(2, 2));
    let scheduler = Scheduler::new(prayers_only(), GenerateOptions::monthly());
    let period = Period::month(2025, 2);
    let mut repo = MemoryRepository::new();

    scheduler
        .generate(&period, "admin", Sources::new(&reg, &reg), &mut repo)
        .unwrap();
    let err = scheduler
        .generate(&period, "admin", Sources::new(&reg, &reg), &mut repo)
        .unwrap_err();
    let SchedError::Other(inner) = err else {
        panic!("expected repository error");
    };
    assert!(matches!(
        inner.downcast_ref::<StorageError>(),
        Some(StorageError::DuplicateRecord { .. })
    ));
    assert_eq!(repo.records().len(), 28 * 5 * 2);

    scheduler.clear(&period, &mut repo).unwrap();
    assert!(repo.records().is_empty());
    scheduler
        .generate(&period, "admin", Sources::new(&reg, &reg), &mut repo)
        .unwrap();
    assert_eq!(repo.records().len(), 28 * 5 * 2);
}

#[test]
fn identical_inputs_give_identical_output() {
    let mut reg = registry(imams_and_bilals(3, 3));
    reg.exceptions.push(UnavailabilityException::new(
        PersonId::new("bilal-2"),
        day(2025, 1, 7),
        "Asar",
    ));
    let period = Period::week(day(2025, 1, 6));

    let run = || {
        let mut repo = MemoryRepository::new();
        let records = Scheduler::weekly()
            .generate(&period, "admin", Sources::new(&reg, &reg), &mut repo)
            .unwrap();
        serde_json::to_vec(&records).unwrap()
    };
    assert_eq!(run(), run());
}

#[test]
fn slot_types_follow_their_day_rules() {
    let mut people = imams_and_bilals(2, 2);
    people.push(Person::with_id("qari", "Qari", [Role::WeekdayReciter]));
    people.push(Person::with_id("ustaz", "Ustaz", [Role::DailyTutor, Role::FridayImam]));
    people.push(Person::with_id("muazzin", "Muazzin", [Role::Caller]));
    let reg = registry(people);

    let mut repo = MemoryRepository::new();
    let records = Scheduler::weekly()
        .generate(
            &Period::week(day(2025, 1, 6)),
            "admin",
            Sources::new(&reg, &reg),
            &mut repo,
        )
        .unwrap();

    let tadarus: Vec<_> = records.iter().filter(|r| r.slot_type == "tadarus").collect();
    assert_eq!(tadarus.len(), 5);
    assert!(tadarus
        .iter()
        .all(|r| !matches!(r.date.weekday(), Weekday::Sat | Weekday::Sun)));

    let kuliah = records.iter().filter(|r| r.slot_type == "kuliah").count();
    assert_eq!(kuliah, 7);

    let jumaat: Vec<_> = records.iter().filter(|r| r.slot_type == "jumaat").collect();
    assert_eq!(jumaat.len(), 2);
    assert!(jumaat.iter().all(|r| r.date == day(2025, 1, 10)));
    assert!(jumaat.iter().all(|r| !r.is_unfilled()));

    // ordre : date, puis créneau et rôle dans l'ordre de la table
    for pair in records.windows(2) {
        assert!(pair[0].date <= pair[1].date);
    }
    assert_eq!(records[0].slot_label.as_deref(), Some("Subuh"));
    assert_eq!(records[0].role, Role::Imam);
    assert_eq!(records[1].role, Role::Bilal);
}

#[test]
fn only_active_holders_of_the_role_are_assigned() {
    /// Annuaire laxiste : renvoie tout le monde quel que soit le rôle.
    struct Sloppy(Vec<Person>);
    impl PersonnelDirectory for Sloppy {
        fn active_by_role(&self, _role: Role) -> anyhow::Result<Vec<Person>> {
            Ok(self.0.clone())
        }
    }

    let mut retired = Person::with_id("imam-0", "Retired", [Role::Imam]);
    retired.active = false;
    let mut people = imams_and_bilals(2, 2);
    people.push(retired);
    let directory = Sloppy(people.clone());
    let reg = registry(people);

    let scheduler = Scheduler::new(prayers_only(), GenerateOptions::monthly());
    let records = scheduler
        .assign(&Period::month(2025, 3), "admin", Sources::new(&directory, &reg))
        .unwrap();

    for rec in &records {
        let id = rec.person_id.as_ref().unwrap();
        let person = reg.find_person_by_id(id).unwrap();
        assert!(person.active);
        assert!(person.holds(rec.role));
    }
}

#[test]
fn person_is_used_once_per_slot_occurrence() {
    let rules = RuleTable {
        id: "jumaat".into(),
        name: "Jumaat".into(),
        description: None,
        week_start: Weekday::Mon,
        slot_types: vec![SlotType::new(
            "jumaat",
            DayRule::Fridays,
            vec![
                RoleRequirement::mandatory(Role::FridayImam),
                RoleRequirement::mandatory(Role::Caller),
            ],
        )],
    };
    let reg = registry(vec![
        Person::with_id("a", "Both", [Role::FridayImam, Role::Caller]),
        Person::with_id("b", "Caller", [Role::Caller]),
    ]);
    let scheduler = Scheduler::new(rules.clone(), GenerateOptions::monthly());
    let records = scheduler
        .assign(&Period::month(2025, 1), "admin", Sources::new(&reg, &reg))
        .unwrap();

    for pair in records.chunks(2) {
        assert_eq!(pair[0].person_id, Some(PersonId::new("a")));
        assert_eq!(pair[1].person_id, Some(PersonId::new("b")));
    }

    let alone = registry(vec![Person::with_id(
        "a",
        "Both",
        [Role::FridayImam, Role::Caller],
    )]);
    let err = Scheduler::new(rules, GenerateOptions::monthly())
        .assign(&Period::month(2025, 1), "admin", Sources::new(&alone, &alone))
        .unwrap_err();
    assert!(matches!(
        err,
        SchedError::InsufficientPersonnel {
            role: Role::Caller,
            ..
        }
    ));
}

#[test]
fn availability_flag_controls_exception_filtering() {
    let mut reg = registry(imams_and_bilals(1, 1));
    reg.exceptions.push(UnavailabilityException::new(
        PersonId::new("imam-1"),
        day(2025, 1, 1),
        "subuh",
    ));
    let period = Period::month(2025, 1);

    let legacy = Scheduler::new(prayers_only(), GenerateOptions::monthly());
    let records = legacy
        .assign(&period, "admin", Sources::new(&reg, &reg))
        .unwrap();
    assert_eq!(records[0].person_id, Some(PersonId::new("imam-1")));

    let strict = Scheduler::new(prayers_only(), GenerateOptions::weekly());
    let err = strict
        .assign(&period, "admin", Sources::new(&reg, &reg))
        .unwrap_err();
    assert!(matches!(err, SchedError::InsufficientPersonnel { role: Role::Imam, .. }));
}

#[test]
fn collaborators_are_queried_once_per_run() {
    struct Counting {
        inner: Registry,
        personnel_calls: Cell<usize>,
        exception_calls: Cell<usize>,
    }
    impl PersonnelDirectory for Counting {
        fn active_by_role(&self, role: Role) -> anyhow::Result<Vec<Person>> {
            self.personnel_calls.set(self.personnel_calls.get() + 1);
            self.inner.active_by_role(role)
        }
    }
    impl AvailabilityStore for Counting {
        fn exceptions(
            &self,
            role: Option<Role>,
            start: NaiveDate,
            end: NaiveDate,
        ) -> anyhow::Result<Vec<UnavailabilityException>> {
            self.exception_calls.set(self.exception_calls.get() + 1);
            assert_eq!((start, end), (day(2025, 1, 6), day(2025, 1, 12)));
            self.inner.exceptions(role, start, end)
        }
    }

    let counting = Counting {
        inner: registry(imams_and_bilals(2, 2)),
        personnel_calls: Cell::new(0),
        exception_calls: Cell::new(0),
    };
    Scheduler::weekly()
        .assign(
            &Period::week(day(2025, 1, 6)),
            "admin",
            Sources::new(&counting, &counting),
        )
        .unwrap();
    assert_eq!(counting.personnel_calls.get(), RuleTable::weekly().roles().len());
    assert_eq!(counting.exception_calls.get(), 1);

    counting.personnel_calls.set(0);
    counting.exception_calls.set(0);
    Scheduler::monthly()
        .assign(&Period::month(2025, 1), "admin", Sources::new(&counting, &counting))
        .unwrap();
    assert_eq!(counting.personnel_calls.get(), 3);
    assert_eq!(counting.exception_calls.get(), 0);
}

#[test]
fn malformed_periods_are_rejected_before_planning() {
    let reg = registry(imams_and_bilals(1, 1));
    let mut repo = MemoryRepository::new();

    let err = Scheduler::monthly()
        .generate(&Period::month(2025, 13), "admin", Sources::new(&reg, &reg), &mut repo)
        .unwrap_err();
    assert!(matches!(err, SchedError::InvalidPeriod(_)));

    // 2025-01-08 est un mercredi
    let err = Scheduler::weekly()
        .plan(&Period::week(day(2025, 1, 8)))
        .unwrap_err();
    assert!(matches!(err, SchedError::InvalidPeriod(_)));
    assert!(repo.records().is_empty());
}

#[test]
fn plan_counts_match_the_calendar() {
    let plan = Scheduler::monthly().plan(&Period::month(2024, 2)).unwrap();
    // 29 jours x 5 solat x 2 rôles + 4 vendredis
    assert_eq!(plan.len(), 29 * 5 * 2 + 4);
    assert!(plan.iter().all(|t| t.date.month() == 2));

    let weekly = Scheduler::weekly().plan(&Period::week(day(2025, 1, 6))).unwrap();
    let days: std::collections::BTreeSet<_> = weekly.iter().map(|t| t.date).collect();
    assert_eq!(days.len(), 7);
    let tadarus = weekly.iter().find(|t| t.slot_type == "tadarus").unwrap();
    assert_eq!(tadarus.slot_label, None);
    assert_eq!(tadarus.match_label, "tadarus");
    assert!(!tadarus.mandatory);
}

#[test]
fn exception_on_unlabeled_slot_matches_the_slot_key() {
    let mut people = imams_and_bilals(2, 2);
    people.push(Person::with_id("qari", "Qari", [Role::WeekdayReciter]));
    let mut reg = registry(people);
    let tuesday = day(2025, 1, 7);
    reg.exceptions
        .push(UnavailabilityException::new(PersonId::new("qari"), tuesday, "tadarus"));

    let records = Scheduler::weekly()
        .assign(&Period::week(day(2025, 1, 6)), "admin", Sources::new(&reg, &reg))
        .unwrap();

    let tadarus: Vec<_> = records.iter().filter(|r| r.slot_type == "tadarus").collect();
    assert_eq!(tadarus.len(), 5);
    for rec in tadarus {
        if rec.date == tuesday {
            assert!(rec.is_unfilled());
        } else {
            assert_eq!(rec.person_id, Some(PersonId::new("qari")));
        }
    }
}

#[test]
fn failed_regeneration_keeps_the_existing_schedule() {
    let mut reg = registry(imams_and_bilals(1, 1));
    let period = Period::month(2025, 1);
    let mut repo = MemoryRepository::new();
    Scheduler::new(prayers_only(), GenerateOptions::monthly())
        .generate(&period, "admin", Sources::new(&reg, &reg), &mut repo)
        .unwrap();
    let before = repo.records().to_vec();

    reg.exceptions.push(UnavailabilityException::new(
        PersonId::new("bilal-1"),
        day(2025, 1, 8),
        "Subuh",
    ));
    let strict = Scheduler::new(prayers_only(), GenerateOptions::weekly());
    let err = strict
        .regenerate(&period, "admin", Sources::new(&reg, &reg), &mut repo)
        .unwrap_err();
    assert!(matches!(err, SchedError::InsufficientPersonnel { role: Role::Bilal, .. }));
    assert_eq!(repo.records(), before.as_slice());

    // sans l'indisponibilité, le remplacement passe et ne duplique rien
    reg.exceptions.clear();
    let records = strict
        .regenerate(&period, "secretary", Sources::new(&reg, &reg), &mut repo)
        .unwrap();
    assert_eq!(repo.records(), records.as_slice());
    assert!(repo.records().iter().all(|r| r.created_by == "secretary"));
}

use super::*;
use crate::settings::RoomSettings;
use chrono::NaiveDate;

const CAT: &str = "deluxe";

fn d(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, day).unwrap()
}

fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    d(day).and_hms_opt(hour, minute, 0).unwrap()
}

fn stay(from: u32, to: u32) -> DateRange {
    DateRange::new(d(from), d(to))
}

fn unit_ref(number: &str) -> UnitRef {
    UnitRef::new(CAT, number)
}

fn category(id: &str, name: &str, units: &[&str]) -> Category {
    Category {
        id: id.into(),
        name: name.into(),
        kind: CategoryKind::Room,
        base_rate: 1000.0,
        extra_guest_charge: 500.0,
        taxes: TaxRates {
            cgst: 6.0,
            sgst: 6.0,
            igst: 0.0,
        },
        units: units.iter().map(|n| Unit::new(*n)).collect(),
        amenities: vec!["wifi".into()],
    }
}

fn standard_settings() -> RoomSettings {
    RoomSettings {
        check_in: Some("14:00".into()),
        check_out: Some("11:00".into()),
        weekend: vec!["Sat".into(), "Sun".into()],
        weekend_price_hike: 20.0,
    }
}

async fn engine_with(settings: RoomSettings, categories: Vec<Category>) -> (Engine, Arc<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::new());
    store.save_settings(settings).await.unwrap();
    for category in categories {
        store.save_category(category).await.unwrap();
    }
    let engine = Engine::new(store.clone(), EngineConfig::default());
    (engine, store)
}

async fn hotel() -> (Engine, Arc<InMemoryStore>) {
    engine_with(standard_settings(), vec![category(CAT, "Deluxe", &["101", "102"])]).await
}

// ── Booking lifecycle ────────────────────────────────────

#[tokio::test]
async fn booking_blocks_overlapping_stays() {
    let (engine, _) = hotel().await;
    engine
        .book_unit(&unit_ref("101"), "BK-1", stay(6, 9), None)
        .await
        .unwrap();

    let err = engine
        .book_unit(&unit_ref("101"), "BK-2", stay(8, 10), None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Unavailable {
            status: UnitStatus::Booked,
            ..
        }
    ));

    // 11:00 checkout and 14:00 check-in leave a turnover gap.
    engine
        .book_unit(&unit_ref("101"), "BK-3", stay(9, 11), None)
        .await
        .unwrap();
    assert_eq!(
        engine.unit_status(CAT, "101", stay(7, 8)).await.unwrap(),
        UnitStatus::Booked
    );
    assert_eq!(
        engine.unit_status(CAT, "102", stay(7, 8)).await.unwrap(),
        UnitStatus::Available
    );
}

#[tokio::test]
async fn booked_record_holds_clock_normalized_instants() {
    let (engine, store) = hotel().await;
    let occupancy = Occupancy {
        adults: 2,
        children: 1,
    };
    engine
        .book_unit(&unit_ref("101"), "BK-1", stay(6, 9), Some(occupancy))
        .await
        .unwrap();

    let category = store.get_category(CAT).await.unwrap().unwrap();
    let record = category.unit("101").unwrap().record("BK-1").unwrap();
    assert_eq!(record.status, RecordStatus::Booked);
    assert_eq!(record.check_in, Some(at(6, 14, 0)));
    assert_eq!(record.check_out, Some(at(9, 11, 0)));
    assert_eq!(record.occupancy, Some(occupancy));
}

#[tokio::test]
async fn duplicate_reference_is_rejected() {
    let (engine, _) = hotel().await;
    engine
        .book_unit(&unit_ref("101"), "BK-1", stay(6, 9), None)
        .await
        .unwrap();
    let err = engine
        .book_unit(&unit_ref("101"), "BK-1", stay(20, 22), None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::AlreadyExists(r) if r == "BK-1"));
}

#[tokio::test]
async fn invalid_requests_are_rejected() {
    let (engine, _) = hotel().await;
    let backwards = DateRange { from: d(9), to: d(6) };
    assert!(matches!(
        engine.book_unit(&unit_ref("101"), "BK-1", backwards, None).await,
        Err(EngineError::InvalidRange(_))
    ));
    assert!(matches!(
        engine.book_unit(&unit_ref("101"), "  ", stay(6, 9), None).await,
        Err(EngineError::InvalidInput(_))
    ));
    assert!(matches!(
        engine.book_unit(&UnitRef::new("suite", "1"), "BK-1", stay(6, 9), None).await,
        Err(EngineError::CategoryNotFound(_))
    ));
    assert!(matches!(
        engine.book_unit(&unit_ref("999"), "BK-1", stay(6, 9), None).await,
        Err(EngineError::UnitNotFound { .. })
    ));
    let year_plus = DateRange::new(d(1), d(1) + chrono::Days::new(400));
    assert!(matches!(
        engine.availability(CAT, year_plus, 1).await,
        Err(EngineError::LimitExceeded(_))
    ));
}

#[tokio::test]
async fn lifecycle_follows_transition_table() {
    let (engine, _) = hotel().await;
    let room = unit_ref("101");
    engine.book_unit(&room, "BK-1", stay(6, 9), None).await.unwrap();

    assert!(matches!(
        engine.check_out(&room, "BK-1", at(9, 10, 0)).await,
        Err(EngineError::IllegalTransition {
            from: "booked",
            to: "checkout"
        })
    ));
    assert!(matches!(
        engine.check_in(&room, "BK-404").await,
        Err(EngineError::BookingNotFound(_))
    ));

    engine.check_in(&room, "BK-1").await.unwrap();
    assert_eq!(
        engine.unit_status(CAT, "101", stay(7, 8)).await.unwrap(),
        UnitStatus::CheckedIn
    );
    assert!(matches!(
        engine.cancel_booking(&room, "BK-1").await,
        Err(EngineError::IllegalTransition { .. })
    ));
}

#[tokio::test]
async fn cancel_releases_the_unit() {
    let (engine, store) = hotel().await;
    let room = unit_ref("101");
    engine.book_unit(&room, "BK-1", stay(6, 9), None).await.unwrap();
    engine.cancel_booking(&room, "BK-1").await.unwrap();

    let category = store.get_category(CAT).await.unwrap().unwrap();
    assert!(category.unit("101").unwrap().status_records.is_empty());
    assert_eq!(
        engine.unit_status(CAT, "101", stay(7, 8)).await.unwrap(),
        UnitStatus::Available
    );
}

#[tokio::test]
async fn departed_stay_cannot_be_cancelled() {
    let (engine, store) = hotel().await;
    let room = unit_ref("101");
    engine.book_unit(&room, "BK-1", stay(6, 9), None).await.unwrap();
    engine.check_in(&room, "BK-1").await.unwrap();
    engine.check_out(&room, "BK-1", at(9, 10, 30)).await.unwrap();
    engine.reconcile(at(9, 10, 30)).await.unwrap();

    assert!(matches!(
        engine.cancel_booking(&room, "BK-1").await,
        Err(EngineError::IllegalTransition {
            from: "checkout",
            to: "available"
        })
    ));
    let category = store.get_category(CAT).await.unwrap().unwrap();
    assert!(category.unit("101").unwrap().record("BK-1").is_some());
    assert_eq!(engine.tasks(true).await.unwrap().len(), 1);
}

// ── Reconcile ────────────────────────────────────────────

#[tokio::test]
async fn checkout_to_cleaning_to_available() {
    let (engine, _) = hotel().await;
    let room = unit_ref("101");
    engine.book_unit(&room, "BK-1", stay(6, 9), None).await.unwrap();
    engine.check_in(&room, "BK-1").await.unwrap();
    engine.check_out(&room, "BK-1", at(9, 10, 30)).await.unwrap();
    assert_eq!(
        engine.unit_status(CAT, "101", stay(7, 8)).await.unwrap(),
        UnitStatus::CheckedOut
    );

    let first = engine.reconcile(at(9, 10, 30)).await.unwrap();
    assert_eq!(first.created.len(), 1);
    assert!(first.auto_completed.is_empty());
    let task = &first.created[0];
    assert_eq!(task.booking_ref, "BK-1");
    assert_eq!(task.status, TaskStatus::Pending);
    assert_eq!(task.priority, TaskPriority::Medium);
    assert_eq!(task.expected_end, at(9, 12, 30));

    // Inside the cleaning window nothing changes.
    let second = engine.reconcile(at(9, 11, 0)).await.unwrap();
    assert!(second.created.is_empty());
    assert!(second.auto_completed.is_empty());

    let third = engine.reconcile(at(9, 12, 30)).await.unwrap();
    assert_eq!(third.auto_completed.len(), 1);
    assert!(third.created.is_empty());
    assert_eq!(third.auto_completed[0].actual_end, Some(at(9, 12, 30)));
    assert_eq!(
        engine.unit_status(CAT, "101", stay(7, 8)).await.unwrap(),
        UnitStatus::Available
    );

    assert!(engine.tasks(true).await.unwrap().is_empty());
    let all = engine.tasks(false).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].status, TaskStatus::Completed);

    let quiet = engine.reconcile(at(9, 18, 0)).await.unwrap();
    assert_eq!(quiet, ReconcileReport::default());
}

#[tokio::test]
async fn staff_completion_releases_record() {
    let (engine, store) = hotel().await;
    let room = unit_ref("102");
    engine.book_unit(&room, "BK-7", stay(6, 9), None).await.unwrap();
    engine.check_in(&room, "BK-7").await.unwrap();
    engine.check_out(&room, "BK-7", at(9, 9, 0)).await.unwrap();
    let task_id = engine.reconcile(at(9, 9, 0)).await.unwrap().created[0].id;

    let started = engine
        .start_task(task_id, Some("asha".into()), at(9, 9, 15))
        .await
        .unwrap();
    assert_eq!(started.status, TaskStatus::InProgress);
    assert_eq!(started.assignee.as_deref(), Some("asha"));
    assert_eq!(started.actual_start, Some(at(9, 9, 15)));

    let done = engine
        .complete_task(task_id, Some("linen replaced".into()), at(9, 10, 0))
        .await
        .unwrap();
    assert_eq!(done.status, TaskStatus::Completed);
    assert_eq!(done.actual_end, Some(at(9, 10, 0)));
    assert_eq!(done.notes, vec!["linen replaced".to_string()]);

    let category = store.get_category(CAT).await.unwrap().unwrap();
    assert!(category.unit("102").unwrap().record("BK-7").is_none());

    assert!(matches!(
        engine.complete_task(task_id, None, at(9, 11, 0)).await,
        Err(EngineError::IllegalTransition {
            from: "completed",
            to: "completed"
        })
    ));
    // Nothing left to reconcile, including the already-finished task.
    assert_eq!(
        engine.reconcile(at(9, 18, 0)).await.unwrap(),
        ReconcileReport::default()
    );
}

#[tokio::test]
async fn unknown_task_is_reported() {
    let (engine, _) = hotel().await;
    let id = ulid::Ulid::new();
    assert!(matches!(
        engine.start_task(id, None, at(9, 9, 0)).await,
        Err(EngineError::TaskNotFound(missing)) if missing == id
    ));
}

#[tokio::test]
async fn malformed_units_are_skipped_not_fatal() {
    let mut cat = category(CAT, "Deluxe", &["101", "101", "102"]);
    cat.units[2].status_records.push(StatusRecord {
        booking_ref: None,
        check_in: Some(at(6, 14, 0)),
        check_out: Some(at(9, 10, 0)),
        status: RecordStatus::CheckOut,
        occupancy: None,
    });
    let (engine, _) = engine_with(standard_settings(), vec![cat]).await;

    let report = engine.reconcile(at(9, 10, 0)).await.unwrap();
    assert!(report.created.is_empty());
    assert_eq!(report.skipped.len(), 2);
    assert!(report
        .skipped
        .iter()
        .any(|s| s.unit_number == "101" && s.reason == SkipReason::DuplicateUnitNumber));
    assert!(report
        .skipped
        .iter()
        .any(|s| s.unit_number == "102" && s.reason == SkipReason::MissingBookingReference));
}

// ── Maintenance ──────────────────────────────────────────

#[tokio::test]
async fn maintenance_waits_for_future_departures() {
    let (engine, _) = hotel().await;
    let room = unit_ref("101");
    let now = at(5, 9, 0);
    engine.book_unit(&room, "BK-2", stay(10, 12), None).await.unwrap();

    assert_eq!(
        engine.maintenance_start(CAT, "101", now).await.unwrap(),
        Some(at(12, 11, 0))
    );
    assert_eq!(
        engine.maintenance_start(CAT, "102", now).await.unwrap(),
        Some(now)
    );
    assert_eq!(engine.maintenance_start(CAT, "999", now).await.unwrap(), None);
    assert_eq!(engine.maintenance_start("suite", "1", now).await.unwrap(), None);

    let task = engine
        .schedule_maintenance(
            &room,
            chrono::Duration::hours(4),
            TaskPriority::High,
            Some("replace AC filter".into()),
            now,
        )
        .await
        .unwrap();
    assert!(task.booking_ref.starts_with(MAINTENANCE_REF_PREFIX));
    assert_eq!(task.status, TaskStatus::Maintenance);
    assert_eq!(task.expected_start, at(12, 11, 0));
    assert_eq!(task.expected_end, at(12, 15, 0));

    assert_eq!(
        engine.unit_status(CAT, "101", stay(10, 11)).await.unwrap(),
        UnitStatus::Booked
    );
    assert_eq!(
        engine.unit_status(CAT, "101", stay(13, 14)).await.unwrap(),
        UnitStatus::Maintenance
    );
    assert!(matches!(
        engine.book_unit(&room, "BK-3", stay(12, 13), None).await,
        Err(EngineError::Unavailable {
            status: UnitStatus::Maintenance,
            ..
        })
    ));
    // Stays that end before the work starts are still bookable.
    engine.book_unit(&room, "BK-4", stay(6, 8), None).await.unwrap();

    // Maintenance never auto-completes.
    let report = engine.reconcile(at(20, 0, 0)).await.unwrap();
    assert!(report.auto_completed.is_empty());

    engine.complete_task(task.id, None, at(12, 16, 0)).await.unwrap();
    assert_eq!(
        engine.unit_status(CAT, "101", stay(13, 14)).await.unwrap(),
        UnitStatus::Available
    );
}

#[tokio::test]
async fn maintenance_duration_is_bounded() {
    let (engine, _) = hotel().await;
    for duration in [chrono::Duration::zero(), chrono::Duration::days(MAX_MAINTENANCE_DAYS + 1)] {
        assert!(matches!(
            engine
                .schedule_maintenance(&unit_ref("101"), duration, TaskPriority::Low, None, at(5, 9, 0))
                .await,
            Err(EngineError::LimitExceeded(_))
        ));
    }
}

// ── Queries ──────────────────────────────────────────────

#[tokio::test]
async fn quote_applies_weekend_hike_and_tax() {
    let (engine, _) = hotel().await;
    // Thu, Fri, Sat nights.
    let quote = engine
        .quote(
            CAT,
            stay(6, 9),
            QuoteOptions {
                discount_percent: 10.0,
                ..QuoteOptions::default()
            },
        )
        .await
        .unwrap()
        .rounded();
    let rates: Vec<f64> = quote.per_night.iter().map(|n| n.rate).collect();
    assert_eq!(rates, vec![1000.0, 1000.0, 1200.0]);
    assert_eq!(quote.subtotal, 3200.0);
    assert_eq!(quote.discount, 320.0);
    assert_eq!(quote.tax_total, 384.0);
    assert_eq!(quote.grand_total, 3264.0);

    let with_guests = engine
        .quote(
            CAT,
            stay(6, 9),
            QuoteOptions {
                extra_guests: 2,
                ..QuoteOptions::default()
            },
        )
        .await
        .unwrap()
        .rounded();
    assert_eq!(with_guests.extra_guest_charge, 1000.0);
    assert_eq!(with_guests.grand_total, 4584.0);
}

#[tokio::test]
async fn search_lists_bookable_categories_by_name() {
    let (engine, _) = engine_with(
        standard_settings(),
        vec![
            category(CAT, "Deluxe", &["101", "102"]),
            category("hall", "Banquet Hall", &["H1"]),
        ],
    )
    .await;
    for room in ["101", "102"] {
        engine
            .book_unit(&unit_ref(room), &format!("BK-{room}"), stay(6, 9), None)
            .await
            .unwrap();
    }

    let busy = engine.search(stay(7, 8), 1).await.unwrap();
    let names: Vec<&str> = busy.iter().map(|c| c.category_name.as_str()).collect();
    assert_eq!(names, vec!["Banquet Hall"]);

    let free = engine.search(stay(10, 11), 2).await.unwrap();
    let names: Vec<&str> = free.iter().map(|c| c.category_name.as_str()).collect();
    assert_eq!(names, vec!["Deluxe"]);

    let deluxe = engine.availability(CAT, stay(7, 8), 1).await.unwrap();
    assert_eq!(deluxe.available_count, 0);
    assert_eq!(deluxe.total_units, 2);
    assert!(!deluxe.bookable);
}

#[tokio::test]
async fn unit_board_reports_each_unit() {
    let (engine, _) = hotel().await;
    engine
        .book_unit(&unit_ref("102"), "BK-9", stay(6, 9), None)
        .await
        .unwrap();
    let board = engine.unit_board(CAT, DateRange::single(d(7))).await.unwrap();
    assert_eq!(
        board,
        vec![
            UnitBoardEntry {
                unit_number: "101".into(),
                status: UnitStatus::Available,
                booking_ref: None,
            },
            UnitBoardEntry {
                unit_number: "102".into(),
                status: UnitStatus::Booked,
                booking_ref: Some("BK-9".into()),
            },
        ]
    );
}

#[tokio::test]
async fn double_booked_unit_reports_first_reservation() {
    let unit = Unit::new("101")
        .with_record(StatusRecord::reservation("BK-A", at(6, 14, 0), at(9, 11, 0), RecordStatus::Booked))
        .with_record(StatusRecord::reservation("BK-B", at(7, 14, 0), at(8, 11, 0), RecordStatus::CheckIn));
    let mut cat = category(CAT, "Deluxe", &[]);
    cat.units.push(unit);
    let (engine, _) = engine_with(standard_settings(), vec![cat]).await;

    let board = engine.unit_board(CAT, stay(7, 8)).await.unwrap();
    assert_eq!(board[0].status, UnitStatus::Booked);
    assert_eq!(board[0].booking_ref.as_deref(), Some("BK-A"));
}

// ── Settings ─────────────────────────────────────────────

#[tokio::test]
async fn missing_clock_times_compare_by_date() {
    let degraded = RoomSettings {
        check_in: None,
        check_out: Some("not a time".into()),
        weekend: vec!["Funday".into()],
        weekend_price_hike: 20.0,
    };
    let (engine, _) = engine_with(degraded, vec![category(CAT, "Deluxe", &["101"])]).await;
    engine
        .book_unit(&unit_ref("101"), "BK-1", stay(6, 9), None)
        .await
        .unwrap();

    // Departure and arrival on the same date now touch at midnight.
    assert!(matches!(
        engine.book_unit(&unit_ref("101"), "BK-2", stay(9, 11), None).await,
        Err(EngineError::Unavailable { .. })
    ));
    // Unknown weekday names are dropped, so no weekend surcharge.
    let quote = engine
        .quote(CAT, stay(8, 10), QuoteOptions::default())
        .await
        .unwrap();
    assert!(quote.per_night.iter().all(|n| !n.weekend && n.rate == 1000.0));
}

#[tokio::test]
async fn oversized_cleaning_buffer_is_capped() {
    let (_, store) = hotel().await;
    let engine = Engine::new(
        store,
        EngineConfig {
            cleaning_buffer: chrono::Duration::days(100_000_000),
        },
    );
    assert_eq!(
        engine.config().cleaning_buffer,
        chrono::Duration::minutes(MAX_CLEANING_BUFFER_MINS)
    );

    let room = unit_ref("101");
    engine.book_unit(&room, "BK-1", stay(6, 9), None).await.unwrap();
    engine.check_in(&room, "BK-1").await.unwrap();
    engine.check_out(&room, "BK-1", at(9, 10, 30)).await.unwrap();
    let report = engine.reconcile(at(9, 10, 30)).await.unwrap();
    assert_eq!(report.created[0].expected_end, at(16, 10, 30));
}

#[tokio::test]
async fn non_positive_cleaning_buffer_falls_back_to_default() {
    let engine = Engine::new(
        Arc::new(InMemoryStore::new()),
        EngineConfig {
            cleaning_buffer: chrono::Duration::zero(),
        },
    );
    assert_eq!(engine.config(), &EngineConfig::default());
}

mod common;

use chrono::{Duration, Utc};
use common::{booking_request, date, TestContext};
use rentwise_rental::domain::{Booking, NewRentalHistory, RentalOutcome, ReturnStatus, VehicleType};
use rentwise_rental::{RentalConfig, RentalError};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

async fn booking(context: &TestContext, plate: &str, start: &str, end: &str) -> Booking {
    let user = context.create_user(&format!("user-{plate}")).await;
    let vehicle = context.create_vehicle(plate, VehicleType::Sedan).await;
    context
        .desk
        .create_booking(&booking_request(user.id, vehicle.id, start, end))
        .await
        .expect("Failed to create booking")
}

fn record_for(booking: &Booking, status: RentalOutcome, amount: Decimal) -> NewRentalHistory {
    NewRentalHistory {
        booking_id: booking.id,
        user_id: booking.user_id,
        vehicle_id: booking.vehicle_id,
        rental_start_date: booking.start_date,
        rental_end_date: booking.end_date,
        actual_return_date: None,
        total_amount: amount,
        status,
        notes: None,
    }
}

#[tokio::test]
async fn test_history_queries_and_revenue() {
    let context = TestContext::new().await;
    context.create_sedan_pricing().await;
    let repo = context.desk.history();

    let a = booking(&context, "RW-3001", "2024-06-03", "2024-06-05").await;
    let b = booking(&context, "RW-3002", "2024-06-10", "2024-06-16").await;
    let c = booking(&context, "RW-3003", "2024-07-01", "2024-07-02").await;

    repo.create(&record_for(&a, RentalOutcome::Completed, dec!(100.50)))
        .await
        .unwrap();
    repo.create(&record_for(&b, RentalOutcome::Completed, dec!(300)))
        .await
        .unwrap();
    repo.create(&record_for(&c, RentalOutcome::Cancelled, dec!(50)))
        .await
        .unwrap();

    assert_eq!(repo.total_revenue().await.unwrap(), dec!(400.50));
    // planned lengths of completed rentals: 2 and 6 days
    assert_eq!(repo.average_rental_duration().await.unwrap(), Some(4.0));

    assert_eq!(repo.list_completed().await.unwrap().len(), 2);
    assert_eq!(repo.list_by_user(a.user_id).await.unwrap().len(), 1);
    assert_eq!(repo.list_by_vehicle(c.vehicle_id).await.unwrap().len(), 1);

    let june: Vec<_> = repo
        .list_in_date_range(date("2024-06-01"), date("2024-06-30"))
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.booking_id)
        .collect();
    assert_eq!(june, vec![a.id, b.id]);

    let counts = repo.count_by_status().await.unwrap();
    assert_eq!(counts.get(&RentalOutcome::Completed), Some(&2));
    assert_eq!(counts.get(&RentalOutcome::Cancelled), Some(&1));
    assert_eq!(counts.get(&RentalOutcome::NoShow), None);
}

#[tokio::test]
async fn test_empty_history_statistics() {
    let context = TestContext::new().await;
    let repo = context.desk.history();

    assert_eq!(repo.total_revenue().await.unwrap(), Decimal::ZERO);
    assert_eq!(repo.average_rental_duration().await.unwrap(), None);
    assert!(repo.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_return_date_updates_classification() {
    let context = TestContext::new().await;
    context.create_sedan_pricing().await;
    let repo = context.desk.history();
    let a = booking(&context, "RW-3004", "2024-06-03", "2024-06-05").await;

    let record = repo
        .create(&record_for(&a, RentalOutcome::Completed, dec!(100)))
        .await
        .unwrap();
    assert_eq!(
        context.desk.return_status(record.id).await.unwrap(),
        ReturnStatus::NotReturned
    );

    repo.update_actual_return_date(record.id, date("2024-06-05"))
        .await
        .unwrap();
    assert_eq!(
        context.desk.return_status(record.id).await.unwrap(),
        ReturnStatus::OnTime
    );

    let early = repo
        .update_actual_return_date(record.id, date("2024-06-04"))
        .await
        .unwrap();
    assert_eq!(early.return_status().to_string(), "Early (1 days)");

    let noted = repo
        .set_notes(record.id, Some("Scratch on rear bumper"))
        .await
        .unwrap();
    assert_eq!(noted.notes.as_deref(), Some("Scratch on rear bumper"));

    let reclassified = repo
        .update_status(record.id, RentalOutcome::NoShow)
        .await
        .unwrap();
    assert!(reclassified.is_no_show());

    assert!(repo.delete(record.id).await.unwrap());
    assert!(matches!(
        context.desk.return_status(record.id).await,
        Err(RentalError::HistoryNotFound { .. })
    ));
}

#[tokio::test]
async fn test_recent_rentals_window() {
    let context = TestContext::new().await;
    context.create_sedan_pricing().await;
    let a = booking(&context, "RW-3005", "2024-06-03", "2024-06-05").await;

    context.desk.cancel_booking(a.id).await.unwrap();

    let now = Utc::now();
    assert_eq!(context.desk.recent_rentals(now).await.unwrap().len(), 1);
    assert!(context
        .desk
        .recent_rentals(now + Duration::days(31))
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_oversized_recent_window_is_an_error() {
    let mut config = RentalConfig::default();
    config.booking.recent_history_days = i64::MAX;
    let context = TestContext::with_config(config).await;

    let result = context.desk.recent_rentals(Utc::now()).await;
    assert!(matches!(result, Err(RentalError::Validation(_))));

    let result = context.desk.history().list_recent(Utc::now(), -1).await;
    assert!(matches!(result, Err(RentalError::Validation(_))));
}

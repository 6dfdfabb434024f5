mod common;

use common::{booking_request, date, TestContext};
use pretty_assertions::assert_eq;
use rentwise_rental::domain::{
    BookingStatus, PaymentStatus, RentalOutcome, RentalPeriod, ReturnStatus, VehicleStatus,
    VehicleType,
};
use rentwise_rental::{RentalConfig, RentalError};
use rust_decimal_macros::dec;
use std::sync::Arc;

#[tokio::test]
async fn test_create_booking_prices_weekday_rental() {
    let context = TestContext::new().await;
    context.create_sedan_pricing().await;
    let user = context.create_user("alice").await;
    let vehicle = context.create_vehicle("RW-1001", VehicleType::Sedan).await;

    // Monday to Thursday, three charged days
    let booking = context
        .desk
        .create_booking(&booking_request(user.id, vehicle.id, "2024-03-04", "2024-03-07"))
        .await
        .expect("Failed to create booking");

    assert_eq!(booking.total_amount, dec!(150));
    assert_eq!(booking.status, BookingStatus::Pending);
    assert_eq!(booking.payment_status, PaymentStatus::Pending);
    assert_eq!(booking.pickup_location, "Central Station");

    let stored = context.desk.bookings().get(booking.id).await.unwrap();
    assert_eq!(stored, Some(booking));
}

#[tokio::test]
async fn test_create_booking_with_insurance_and_long_term() {
    let context = TestContext::new().await;
    context.create_sedan_pricing().await;
    let user = context.create_user("bob").await;
    let vehicle = context.create_vehicle("RW-1002", VehicleType::Sedan).await;

    // ten days spanning a weekend: 50 * 1.2 * 0.9 = 54 per day, plus 15 insurance
    let mut request = booking_request(user.id, vehicle.id, "2024-03-04", "2024-03-14");
    request.include_insurance = true;
    let booking = context.desk.create_booking(&request).await.unwrap();

    assert_eq!(booking.total_amount, dec!(690));
}

#[tokio::test]
async fn test_holiday_calendar_from_config() {
    let mut config = RentalConfig::default();
    config.pricing.holidays = vec![date("2024-03-05")];
    let context = TestContext::with_config(config).await;
    context.create_sedan_pricing().await;
    let vehicle = context.create_vehicle("RW-1003", VehicleType::Sedan).await;

    let period = RentalPeriod::new(date("2024-03-04"), date("2024-03-07")).unwrap();
    let quote = context.desk.quote(vehicle.id, &period, false).await.unwrap();

    assert!(quote.flags.holiday);
    assert_eq!(quote.daily_rate, dec!(75));
    assert_eq!(quote.total, dec!(225));
}

#[tokio::test]
async fn test_quote_for_type() {
    let context = TestContext::new().await;
    context.create_sedan_pricing().await;

    let quote = context
        .desk
        .quote_for_type(VehicleType::Sedan, 10, false, false, false)
        .await
        .unwrap();
    assert_eq!(quote.daily_rate, dec!(45));
    assert_eq!(quote.total, dec!(450));
    assert_eq!(quote.discount_amount, dec!(50));

    let short = context
        .desk
        .quote_for_type(VehicleType::Sedan, 3, true, true, true)
        .await
        .unwrap();
    assert_eq!(short.daily_rate, dec!(75));
    assert_eq!(short.total, dec!(270)); // 225 + 45 insurance

    let missing = context
        .desk
        .quote_for_type(VehicleType::Van, 3, false, false, false)
        .await;
    assert!(matches!(
        missing,
        Err(RentalError::PricingNotFound { ref vehicle_type }) if vehicle_type == "van"
    ));
}

#[tokio::test]
async fn test_confirm_only_from_pending() {
    let context = TestContext::new().await;
    context.create_sedan_pricing().await;
    let user = context.create_user("carol").await;
    let vehicle = context.create_vehicle("RW-1004", VehicleType::Sedan).await;
    let booking = context
        .desk
        .create_booking(&booking_request(user.id, vehicle.id, "2024-04-01", "2024-04-03"))
        .await
        .unwrap();

    let confirmed = context.desk.confirm_booking(booking.id).await.unwrap();
    assert_eq!(confirmed.status, BookingStatus::Confirmed);

    let again = context.desk.confirm_booking(booking.id).await;
    assert!(matches!(
        again,
        Err(RentalError::InvalidStateTransition { ref from, ref to }) if from == "confirmed" && to == "confirmed"
    ));

    let stored = context.desk.bookings().get(booking.id).await.unwrap().unwrap();
    assert_eq!(stored.status, BookingStatus::Confirmed);
}

#[tokio::test]
async fn test_cancel_writes_history_and_is_terminal() {
    let context = TestContext::new().await;
    context.create_sedan_pricing().await;
    let user = context.create_user("dave").await;
    let vehicle = context.create_vehicle("RW-1005", VehicleType::Sedan).await;
    let booking = context
        .desk
        .create_booking(&booking_request(user.id, vehicle.id, "2024-04-01", "2024-04-03"))
        .await
        .unwrap();

    let cancelled = context.desk.cancel_booking(booking.id).await.unwrap();
    assert_eq!(cancelled.status, BookingStatus::Cancelled);

    let record = context
        .desk
        .history()
        .get_by_booking(booking.id)
        .await
        .unwrap()
        .expect("cancellation should be recorded");
    assert_eq!(record.status, RentalOutcome::Cancelled);
    assert_eq!(record.actual_return_date, None);
    assert_eq!(record.total_amount, booking.total_amount);

    assert!(context.desk.cancel_booking(booking.id).await.is_err());
    assert!(context.desk.confirm_booking(booking.id).await.is_err());
}

#[tokio::test]
async fn test_cancel_rejected_once_active() {
    let context = TestContext::new().await;
    context.create_sedan_pricing().await;
    let user = context.create_user("erin").await;
    let vehicle = context.create_vehicle("RW-1006", VehicleType::Sedan).await;
    let booking = context
        .desk
        .create_booking(&booking_request(user.id, vehicle.id, "2024-04-01", "2024-04-03"))
        .await
        .unwrap();
    context.desk.confirm_booking(booking.id).await.unwrap();
    context.desk.activate_booking(booking.id).await.unwrap();

    let result = context.desk.cancel_booking(booking.id).await;
    assert!(matches!(
        result,
        Err(RentalError::InvalidStateTransition { ref from, .. }) if from == "active"
    ));

    let history = context.desk.history().get_by_booking(booking.id).await.unwrap();
    assert!(history.is_none());
}

#[tokio::test]
async fn test_full_rental_returned_late() {
    let context = TestContext::new().await;
    context.create_sedan_pricing().await;
    let user = context.create_user("frank").await;
    let vehicle = context.create_vehicle("RW-1007", VehicleType::Sedan).await;
    let booking = context
        .desk
        .create_booking(&booking_request(user.id, vehicle.id, "2024-03-04", "2024-03-07"))
        .await
        .unwrap();

    context.desk.confirm_booking(booking.id).await.unwrap();
    let paid = context.desk.record_payment(booking.id).await.unwrap();
    assert_eq!(paid.payment_status, PaymentStatus::Paid);

    context.desk.activate_booking(booking.id).await.unwrap();
    let out = context.desk.vehicles().get(vehicle.id).await.unwrap().unwrap();
    assert_eq!(out.status, VehicleStatus::Rented);

    let (completed, record) = context
        .desk
        .complete_booking(booking.id, date("2024-03-09"), Some("Returned with a full tank"))
        .await
        .unwrap();
    assert_eq!(completed.status, BookingStatus::Completed);
    assert_eq!(record.status, RentalOutcome::Completed);
    assert_eq!(record.actual_return_date, Some(date("2024-03-09")));
    assert_eq!(record.notes.as_deref(), Some("Returned with a full tank"));
    assert_eq!(record.total_amount, dec!(150));

    let status = context.desk.return_status(record.id).await.unwrap();
    assert_eq!(status, ReturnStatus::Late { days: 2 });
    assert_eq!(status.to_string(), "Late (2 days)");

    let back = context.desk.vehicles().get(vehicle.id).await.unwrap().unwrap();
    assert_eq!(back.status, VehicleStatus::Available);
}

#[tokio::test]
async fn test_complete_requires_active() {
    let context = TestContext::new().await;
    context.create_sedan_pricing().await;
    let user = context.create_user("gina").await;
    let vehicle = context.create_vehicle("RW-1008", VehicleType::Sedan).await;
    let booking = context
        .desk
        .create_booking(&booking_request(user.id, vehicle.id, "2024-03-04", "2024-03-07"))
        .await
        .unwrap();
    context.desk.confirm_booking(booking.id).await.unwrap();

    let result = context
        .desk
        .complete_booking(booking.id, date("2024-03-07"), None)
        .await;
    assert!(matches!(result, Err(RentalError::InvalidStateTransition { .. })));

    context.desk.activate_booking(booking.id).await.unwrap();
    assert!(context.desk.activate_booking(booking.id).await.is_err());
}

#[tokio::test]
async fn test_no_show_requires_confirmed() {
    let context = TestContext::new().await;
    context.create_sedan_pricing().await;
    let user = context.create_user("hank").await;
    let vehicle = context.create_vehicle("RW-1009", VehicleType::Sedan).await;
    let booking = context
        .desk
        .create_booking(&booking_request(user.id, vehicle.id, "2024-03-04", "2024-03-07"))
        .await
        .unwrap();

    let pending = context.desk.record_no_show(booking.id, None).await;
    assert!(matches!(
        pending,
        Err(RentalError::InvalidStateTransition { ref from, .. }) if from == "pending"
    ));

    context.desk.confirm_booking(booking.id).await.unwrap();
    let (cancelled, record) = context
        .desk
        .record_no_show(booking.id, Some("Customer unreachable"))
        .await
        .unwrap();
    assert_eq!(cancelled.status, BookingStatus::Cancelled);
    assert!(record.is_no_show());
    assert_eq!(record.return_status(), ReturnStatus::NotReturned);
}

#[tokio::test]
async fn test_refund_requires_payment() {
    let context = TestContext::new().await;
    context.create_sedan_pricing().await;
    let user = context.create_user("iris").await;
    let vehicle = context.create_vehicle("RW-1010", VehicleType::Sedan).await;
    let booking = context
        .desk
        .create_booking(&booking_request(user.id, vehicle.id, "2024-03-04", "2024-03-07"))
        .await
        .unwrap();

    let early = context.desk.refund_payment(booking.id).await;
    assert!(matches!(
        early,
        Err(RentalError::InvalidPaymentTransition { ref from, ref to }) if from == "pending" && to == "refunded"
    ));

    context.desk.record_payment(booking.id).await.unwrap();
    let refunded = context.desk.refund_payment(booking.id).await.unwrap();
    assert_eq!(refunded.payment_status, PaymentStatus::Refunded);
    assert!(context.desk.record_payment(booking.id).await.is_err());
}

#[tokio::test]
async fn test_overlapping_bookings_rejected() {
    let context = TestContext::new().await;
    context.create_sedan_pricing().await;
    let user = context.create_user("jack").await;
    let vehicle = context.create_vehicle("RW-1011", VehicleType::Sedan).await;

    let first = context
        .desk
        .create_booking(&booking_request(user.id, vehicle.id, "2024-05-01", "2024-05-05"))
        .await
        .unwrap();

    let clash = context
        .desk
        .create_booking(&booking_request(user.id, vehicle.id, "2024-05-04", "2024-05-08"))
        .await;
    assert!(matches!(clash, Err(RentalError::VehicleUnavailable { .. })));

    // the return day of one rental can be the pick-up day of the next
    context
        .desk
        .create_booking(&booking_request(user.id, vehicle.id, "2024-05-05", "2024-05-08"))
        .await
        .expect("back-to-back booking should be accepted");

    context.desk.cancel_booking(first.id).await.unwrap();
    context
        .desk
        .create_booking(&booking_request(user.id, vehicle.id, "2024-05-02", "2024-05-04"))
        .await
        .expect("cancelled bookings no longer hold the vehicle");
}

#[tokio::test]
async fn test_create_booking_validation() {
    let context = TestContext::new().await;
    context.create_sedan_pricing().await;
    let user = context.create_user("kate").await;
    let vehicle = context.create_vehicle("RW-1012", VehicleType::Sedan).await;

    let same_day = context
        .desk
        .create_booking(&booking_request(user.id, vehicle.id, "2024-05-01", "2024-05-01"))
        .await;
    assert!(matches!(same_day, Err(RentalError::InvalidPeriod { .. })));

    let stranger = context
        .desk
        .create_booking(&booking_request(
            rentwise_rental::domain::UserId::new(999),
            vehicle.id,
            "2024-05-01",
            "2024-05-03",
        ))
        .await;
    assert!(matches!(stranger, Err(RentalError::UserNotFound { .. })));

    context
        .desk
        .vehicles()
        .update_status(vehicle.id, VehicleStatus::Maintenance)
        .await
        .unwrap();
    let in_shop = context
        .desk
        .create_booking(&booking_request(user.id, vehicle.id, "2024-05-01", "2024-05-03"))
        .await;
    assert!(matches!(in_shop, Err(RentalError::VehicleUnavailable { .. })));

    assert!(context.desk.bookings().list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_booking_without_pricing_rule_fails() {
    let context = TestContext::new().await;
    let user = context.create_user("liam").await;
    let vehicle = context.create_vehicle("RW-1013", VehicleType::Truck).await;

    let result = context
        .desk
        .create_booking(&booking_request(user.id, vehicle.id, "2024-05-01", "2024-05-03"))
        .await;
    assert!(matches!(result, Err(RentalError::PricingNotFound { .. })));
}

#[tokio::test]
async fn test_seed_default_pricing_is_idempotent() {
    let context = TestContext::new().await;
    context.create_sedan_pricing().await;
    let defaults = RentalConfig::default().pricing.defaults;

    let created = context.desk.seed_default_pricing(&defaults).await.unwrap();
    assert_eq!(created.len(), defaults.len() - 1);
    assert!(created.iter().all(|r| r.vehicle_type != VehicleType::Sedan));

    let sedan = context
        .desk
        .pricing()
        .get_by_vehicle_type(VehicleType::Sedan)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(sedan.base_daily_rate, dec!(50));

    let again = context.desk.seed_default_pricing(&defaults).await.unwrap();
    assert!(again.is_empty());
    assert_eq!(
        context.desk.pricing().count().await.unwrap(),
        VehicleType::ALL.len() as i64
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_bookings_cannot_overlap() {
    let dir = tempfile::tempdir().unwrap();
    let context = Arc::new(TestContext::on_file(&dir.path().join("rentwise.db")).await);
    context.create_sedan_pricing().await;
    let user = context.create_user("lena").await;
    let vehicle = context.create_vehicle("RW-1020", VehicleType::Sedan).await;

    let mut handles = Vec::new();
    for _ in 0..4 {
        let context = Arc::clone(&context);
        let request = booking_request(user.id, vehicle.id, "2024-05-01", "2024-05-05");
        handles.push(tokio::spawn(async move {
            context.desk.create_booking(&request).await
        }));
    }

    let mut created = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            Err(RentalError::VehicleUnavailable { .. }) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(created, 1);

    let stored = context.desk.bookings().list_by_vehicle(vehicle.id).await.unwrap();
    assert_eq!(stored.len(), 1);
}

#[tokio::test]
async fn test_cancel_from_confirmed_and_not_after_completion() {
    let context = TestContext::new().await;
    context.create_sedan_pricing().await;
    let user = context.create_user("mia").await;
    let vehicle = context.create_vehicle("RW-1021", VehicleType::Sedan).await;

    let first = context
        .desk
        .create_booking(&booking_request(user.id, vehicle.id, "2024-06-03", "2024-06-05"))
        .await
        .unwrap();
    context.desk.confirm_booking(first.id).await.unwrap();
    let cancelled = context.desk.cancel_booking(first.id).await.unwrap();
    assert_eq!(cancelled.status, BookingStatus::Cancelled);

    let second = context
        .desk
        .create_booking(&booking_request(user.id, vehicle.id, "2024-06-10", "2024-06-12"))
        .await
        .unwrap();
    context.desk.confirm_booking(second.id).await.unwrap();
    context.desk.activate_booking(second.id).await.unwrap();
    context
        .desk
        .complete_booking(second.id, date("2024-06-12"), None)
        .await
        .unwrap();

    let result = context.desk.cancel_booking(second.id).await;
    assert!(matches!(
        result,
        Err(RentalError::InvalidStateTransition { ref from, ref to }) if from == "completed" && to == "cancelled"
    ));

    let stored = context.desk.bookings().get(second.id).await.unwrap().unwrap();
    assert_eq!(stored.status, BookingStatus::Completed);
    let outcomes: Vec<_> = context
        .desk
        .history()
        .list_by_vehicle(vehicle.id)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.status)
        .collect();
    assert_eq!(outcomes.len(), 2);
    assert!(outcomes.contains(&RentalOutcome::Cancelled));
    assert!(outcomes.contains(&RentalOutcome::Completed));
}

async fn block_history_writes(context: &TestContext) {
    sqlx::query(
        "CREATE TRIGGER block_history BEFORE INSERT ON rental_history \
         BEGIN SELECT RAISE(ABORT, 'history unavailable'); END",
    )
    .execute(context.db.pool())
    .await
    .unwrap();
}

async fn unblock_history_writes(context: &TestContext) {
    sqlx::query("DROP TRIGGER block_history")
        .execute(context.db.pool())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_failed_history_write_rolls_back_cancel() {
    let context = TestContext::new().await;
    context.create_sedan_pricing().await;
    let user = context.create_user("nina").await;
    let vehicle = context.create_vehicle("RW-1022", VehicleType::Sedan).await;
    let booking = context
        .desk
        .create_booking(&booking_request(user.id, vehicle.id, "2024-06-03", "2024-06-05"))
        .await
        .unwrap();

    block_history_writes(&context).await;
    let result = context.desk.cancel_booking(booking.id).await;
    assert!(matches!(result, Err(RentalError::Database(_))));

    let stored = context.desk.bookings().get(booking.id).await.unwrap().unwrap();
    assert_eq!(stored.status, BookingStatus::Pending);

    // the retry succeeds and writes the history entry
    unblock_history_writes(&context).await;
    context.desk.cancel_booking(booking.id).await.unwrap();
    let record = context
        .desk
        .history()
        .get_by_booking(booking.id)
        .await
        .unwrap()
        .expect("cancellation should be recorded");
    assert_eq!(record.status, RentalOutcome::Cancelled);
}

#[tokio::test]
async fn test_failed_history_write_rolls_back_return() {
    let context = TestContext::new().await;
    context.create_sedan_pricing().await;
    let user = context.create_user("omar").await;
    let vehicle = context.create_vehicle("RW-1023", VehicleType::Sedan).await;
    let booking = context
        .desk
        .create_booking(&booking_request(user.id, vehicle.id, "2024-06-03", "2024-06-05"))
        .await
        .unwrap();
    context.desk.confirm_booking(booking.id).await.unwrap();
    context.desk.activate_booking(booking.id).await.unwrap();

    block_history_writes(&context).await;
    let result = context
        .desk
        .complete_booking(booking.id, date("2024-06-05"), None)
        .await;
    assert!(result.is_err());

    let stored = context.desk.bookings().get(booking.id).await.unwrap().unwrap();
    assert_eq!(stored.status, BookingStatus::Active);
    let out = context.desk.vehicles().get(vehicle.id).await.unwrap().unwrap();
    assert_eq!(out.status, VehicleStatus::Rented);

    unblock_history_writes(&context).await;
    let (completed, record) = context
        .desk
        .complete_booking(booking.id, date("2024-06-05"), None)
        .await
        .unwrap();
    assert_eq!(completed.status, BookingStatus::Completed);
    assert_eq!(record.return_status(), ReturnStatus::OnTime);
    let back = context.desk.vehicles().get(vehicle.id).await.unwrap().unwrap();
    assert_eq!(back.status, VehicleStatus::Available);
}

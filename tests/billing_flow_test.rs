mod common;

use axum::http::{Method, StatusCode};
use rust_decimal_macros::dec;
use serde_json::json;

use common::{decimal, TestApp};

/// The full "Amit" scenario: two January entries at 50/L, month totals,
/// then a soft delete and the recalculated balance.
#[tokio::test]
async fn balance_and_month_totals_follow_the_ledger() {
    let app = TestApp::new().await;

    let (status, first) = app
        .request(
            Method::POST,
            "/api/v1/entries",
            Some(json!({ "customer_name": "Amit", "quantity_ml": 1000, "date": "2024-01-05" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let customer_id = first["entry"]["customer_id"].as_i64().unwrap();
    assert_eq!(decimal(&first["new_balance"]), dec!(50.00));

    let (_, second) = app
        .request(
            Method::POST,
            "/api/v1/entries",
            Some(json!({ "customer_id": customer_id, "quantity_ml": 2000, "date": "2024-01-20" })),
        )
        .await;
    let second_id = second["entry"]["id"].as_i64().unwrap();
    assert_eq!(decimal(&second["new_balance"]), dec!(150.00));

    // January summary: 3000 ml, 3.00 L, 150.00
    let (_, detail) = app
        .request(
            Method::GET,
            &format!("/api/v1/customers/{customer_id}/months"),
            None,
        )
        .await;
    let months = detail["months"].as_array().unwrap();
    assert_eq!(months.len(), 1);
    assert_eq!(months[0]["label"], "January 2024");
    assert_eq!(months[0]["total_ml"].as_i64().unwrap(), 3000);
    assert_eq!(decimal(&months[0]["total_litres"]), dec!(3.00));
    assert_eq!(decimal(&months[0]["total_amount"]), dec!(150.00));
    assert_eq!(detail["total_entries"].as_u64().unwrap(), 2);

    // Deleting the 2000 ml entry leaves a 50.00 balance.
    let (_, deleted) = app
        .request(
            Method::POST,
            &format!("/api/v1/entries/{second_id}/delete"),
            None,
        )
        .await;
    assert_eq!(deleted["status"], "deleted");
    assert_eq!(decimal(&deleted["amount"]), dec!(100.00));
    assert_eq!(decimal(&deleted["new_balance"]), dec!(50.00));

    // The deleted entry disappears from the month view but stays restorable.
    let (_, detail) = app
        .request(
            Method::GET,
            &format!("/api/v1/customers/{customer_id}/months"),
            None,
        )
        .await;
    assert_eq!(detail["months"][0]["total_ml"].as_i64().unwrap(), 1000);

    let (_, restored) = app
        .request(
            Method::POST,
            &format!("/api/v1/entries/{second_id}/restore"),
            None,
        )
        .await;
    assert_eq!(restored["status"], "restored");
    // Delete followed by restore is balance-neutral.
    assert_eq!(decimal(&restored["new_balance"]), dec!(150.00));
}

#[tokio::test]
async fn recalculation_is_idempotent() {
    use milkbill_api::services::balance;

    let app = TestApp::new().await;
    let (_, created) = app
        .request(
            Method::POST,
            "/api/v1/entries",
            Some(json!({ "customer_name": "Mira", "quantity_ml": 750, "date": "2024-05-01" })),
        )
        .await;
    let customer_id = created["entry"]["customer_id"].as_i64().unwrap();

    // Two recalculations with no intervening mutation yield the same balance.
    let first = balance::recalculate(&*app.state.db, customer_id, dec!(50))
        .await
        .unwrap();
    let second = balance::recalculate(&*app.state.db, customer_id, dec!(50))
        .await
        .unwrap();
    assert_eq!(first, dec!(37.50));
    assert_eq!(first, second);

    let (_, customers) = app.request(Method::GET, "/api/v1/customers", None).await;
    assert_eq!(decimal(&customers[0]["balance_amount"]), dec!(37.50));
}

#[tokio::test]
async fn editing_an_entry_recalculates_the_balance() {
    let app = TestApp::new().await;

    let (_, created) = app
        .request(
            Method::POST,
            "/api/v1/entries",
            Some(json!({ "customer_name": "Lata", "quantity_ml": 1000, "date": "2024-02-01" })),
        )
        .await;
    let entry_id = created["entry"]["id"].as_i64().unwrap();

    let (status, updated) = app
        .request(
            Method::PUT,
            &format!("/api/v1/entries/{entry_id}"),
            Some(json!({ "quantity_ml": 2500 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decimal(&updated["new_balance"]), dec!(125.00));

    // Moving the date to another month regroups without changing money.
    let (_, moved) = app
        .request(
            Method::PUT,
            &format!("/api/v1/entries/{entry_id}"),
            Some(json!({ "date": "2024-03-01" })),
        )
        .await;
    assert_eq!(decimal(&moved["new_balance"]), dec!(125.00));

    let customer_id = created["entry"]["customer_id"].as_i64().unwrap();
    let (_, detail) = app
        .request(
            Method::GET,
            &format!("/api/v1/customers/{customer_id}/months"),
            None,
        )
        .await;
    let months = detail["months"].as_array().unwrap();
    assert_eq!(months.len(), 1);
    assert_eq!(months[0]["label"], "March 2024");
}

#[tokio::test]
async fn months_sort_most_recent_first_and_empty_is_empty() {
    let app = TestApp::new().await;

    let (_, created) = app
        .request(
            Method::POST,
            "/api/v1/customers",
            Some(json!({ "name": "Vikram" })),
        )
        .await;
    let id = created["id"].as_i64().unwrap();

    // A customer without entries gets an empty list, not an error.
    let (status, detail) = app
        .request(Method::GET, &format!("/api/v1/customers/{id}/months"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(detail["months"].as_array().unwrap().is_empty());

    for (date, q) in [
        ("2023-12-31", 1000),
        ("2024-02-01", 1000),
        ("2024-01-15", 1000),
    ] {
        app.request(
            Method::POST,
            "/api/v1/entries",
            Some(json!({ "customer_id": id, "quantity_ml": q, "date": date })),
        )
        .await;
    }

    let (_, detail) = app
        .request(Method::GET, &format!("/api/v1/customers/{id}/months"), None)
        .await;
    let labels: Vec<&str> = detail["months"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["label"].as_str().unwrap())
        .collect();
    assert_eq!(labels, vec!["February 2024", "January 2024", "December 2023"]);
}

#[tokio::test]
async fn bill_pdf_downloads_for_all_time_and_for_a_month() {
    let app = TestApp::new().await;

    let (_, created) = app
        .request(
            Method::POST,
            "/api/v1/entries",
            Some(json!({ "customer_name": "Prem", "quantity_ml": 1500, "date": "2024-01-10" })),
        )
        .await;
    let id = created["entry"]["customer_id"].as_i64().unwrap();

    let (status, content_type, body) = app
        .request_bytes(Method::GET, &format!("/api/v1/customers/{id}/bill-pdf"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("application/pdf"));
    assert!(body.starts_with(b"%PDF"));

    let (status, _, body) = app
        .request_bytes(
            Method::GET,
            &format!("/api/v1/customers/{id}/bill-pdf/2024/1"),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.starts_with(b"%PDF"));

    // A month with no entries still renders (empty table, zero totals).
    let (status, _, body) = app
        .request_bytes(
            Method::GET,
            &format!("/api/v1/customers/{id}/bill-pdf/2024/6"),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.starts_with(b"%PDF"));

    // Month 13 is not a period.
    let (status, _, _) = app
        .request_bytes(
            Method::GET,
            &format!("/api/v1/customers/{id}/bill-pdf/2024/13"),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn dashboard_and_monthly_summary_report_current_state() {
    let app = TestApp::new().await;
    let today = chrono::Local::now().date_naive().to_string();

    for (name, q) in [("Asha", 500), ("Binod", 1500), ("Asha", 2000)] {
        app.request(
            Method::POST,
            "/api/v1/entries",
            Some(json!({ "customer_name": name, "quantity_ml": q, "date": today })),
        )
        .await;
    }

    let (status, stats) = app.request(Method::GET, "/api/v1/dashboard", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total_customers"].as_u64().unwrap(), 2);
    assert_eq!(stats["total_ml"].as_i64().unwrap(), 4000);
    assert_eq!(decimal(&stats["total_litres"]), dec!(4.00));
    assert_eq!(decimal(&stats["total_amount"]), dec!(200.00));
    assert_eq!(decimal(&stats["total_balance"]), dec!(200.00));
    assert_eq!(stats["last_entries"].as_array().unwrap().len(), 3);

    let (status, report) = app
        .request(Method::GET, "/api/v1/reports/monthly-summary", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let rows = report["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    // Rows sort by name: Asha (2500 ml), Binod (1500 ml).
    assert_eq!(rows[0]["name"], "Asha");
    assert_eq!(rows[0]["total_ml"].as_i64().unwrap(), 2500);
    assert_eq!(decimal(&rows[0]["total_amount"]), dec!(125.00));
    assert_eq!(rows[1]["name"], "Binod");
    assert_eq!(decimal(&report["total_amount"]), dec!(200.00));
}

#[tokio::test]
async fn chart_data_is_oldest_first_litres() {
    let app = TestApp::new().await;

    let (_, created) = app
        .request(
            Method::POST,
            "/api/v1/entries",
            Some(json!({ "customer_name": "Kiran", "quantity_ml": 1000, "date": "2024-01-02" })),
        )
        .await;
    let id = created["entry"]["customer_id"].as_i64().unwrap();
    app.request(
        Method::POST,
        "/api/v1/entries",
        Some(json!({ "customer_id": id, "quantity_ml": 500, "date": "2024-01-03" })),
    )
    .await;

    let (status, chart) = app
        .request(
            Method::GET,
            &format!("/api/v1/customers/{id}/chart-data"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        chart["labels"],
        json!(["2024-01-02", "2024-01-03"])
    );
    assert_eq!(chart["data"], json!([1.0, 0.5]));
}

#[tokio::test]
async fn whatsapp_dispatch_failures_are_typed() {
    let app = TestApp::new().await;

    let (_, created) = app
        .request(
            Method::POST,
            "/api/v1/customers",
            Some(json!({ "name": "Nisha" })),
        )
        .await;
    let id = created["id"].as_i64().unwrap();

    // No WhatsApp number on record: a validation failure.
    let (status, _) = app
        .request(
            Method::POST,
            &format!("/api/v1/customers/{id}/send-whatsapp/2024/1"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    // Number present but Twilio unconfigured: an external-service failure,
    // not a crash, and nothing billing-side changed.
    let (_, _) = app
        .request(
            Method::PUT,
            &format!("/api/v1/customers/{id}"),
            Some(json!({ "name": "Nisha", "whatsapp_number": "+919999999999" })),
        )
        .await;
    let (status, _) = app
        .request(
            Method::POST,
            &format!("/api/v1/customers/{id}/send-whatsapp/2024/1"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}
